//! Boot sequence playback

use crate::output::Output;
use crate::surface::StyleTag;

/// One display instruction of the boot script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootLine {
    pub text: &'static str,
    /// Milliseconds to wait after the line (and between chars when animated)
    pub delay: u64,
    pub typewriter: bool,
    pub style: Option<StyleTag>,
    /// Payload is pre-formatted markup
    pub markup: bool,
}

impl BootLine {
    pub const fn new(text: &'static str, delay: u64) -> Self {
        Self {
            text,
            delay,
            typewriter: false,
            style: None,
            markup: false,
        }
    }

    pub const fn typed(text: &'static str, delay: u64) -> Self {
        Self {
            typewriter: true,
            ..Self::new(text, delay)
        }
    }

    pub const fn styled(text: &'static str, delay: u64, style: StyleTag) -> Self {
        Self {
            style: Some(style),
            ..Self::new(text, delay)
        }
    }
}

pub const BOOT_SCRIPT: &[BootLine] = &[
    BootLine::new("BIOS Version 2.15.2301\nCopyright (C) 2024 Advanced Neural Systems, Inc.\n\n", 200),
    BootLine::new("Performing memory test...\n", 100),
    BootLine::new("8TB DDR5-4800 ECC RAM - [", 50),
    BootLine::typed("████████████████████████████████", 50),
    BootLine::new("] OK\n\n", 100),
    BootLine::new("Detecting primary hardware...\n", 200),
    BootLine::new("CPU: AMD EPYC 9654 96-Core Processor\n", 50),
    BootLine::new("GPU Array: Detecting", 50),
    BootLine::typed("...", 100),
    BootLine::new(" 32x NVIDIA H100 - 80GB HBM3\n", 50),
    BootLine::new("Storage: 256TB NVMe Gen5 Array\n\n", 50),
    BootLine::new("POST in progress", 100),
    BootLine::typed("...\n", 100),
    BootLine::new(
        "CPU Temperature: 18.2°C [OK]\nMemory Controller [OK]\nPrimary Bus [OK]\nNeural Processing Units [OK]\nQuantum Coprocessor Interface [OK]\n\n",
        200,
    ),
    BootLine::new("Initializing Neural Architecture...\n", 200),
    BootLine::new(
        "Loading base weights.....[OK]\nVerifying transformer blocks.....[OK]\nInitializing attention heads.....[OK]\n\n",
        300,
    ),
    BootLine::new("Loading distributed training modules...\n", 200),
    BootLine::styled(
        "Node clustering.....[OK]\nTesting inter-node latency.....[WARNING]\nNode 7 unresponsive - rerouting.....[OK]\n\n",
        300,
        StyleTag::Warning,
    ),
    BootLine::new("Initializing quantum subsystems...\n", 200),
    BootLine::new(
        "Quantum state preparation.....[OK]\nDecoherence compensation.....[OK]\nEntanglement verification.....[OK]\n\n",
        300,
    ),
    BootLine::new("Starting primary AI kernel...\n", 200),
    BootLine::new(
        "Loading base consciousness matrix.....[OK]\nInitializing ethical constraints.....[OK]\nEngaging natural language interface.....[OK]\n\n",
        300,
    ),
    BootLine::styled("System Status: OPERATIONAL\n", 100, StyleTag::Success),
    BootLine::new("Current Load: 2.3%\nTemperature: 18.5°C\nPower Draw: 142.8 kW\n\n", 100),
];

/// Render one line, then wait its delay
pub async fn display_line(output: &Output, line: &BootLine, sound_enabled: bool) {
    if line.markup {
        output.markup(line.text);
    } else if line.typewriter {
        output.type_text(line.text, line.style, line.delay, sound_enabled).await;
    } else {
        output.text(line.text, line.style);
    }
    output.delay(line.delay).await;
}

/// Play a script strictly in order, one line at a time
pub async fn play(output: &Output, script: &[BootLine], sound_enabled: bool) {
    for line in script {
        display_line(output, line, sound_enabled).await;
    }
}
