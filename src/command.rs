use std::time::Duration;

/// A submitted line, classified once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Clear,
    Help,
    Status,
    Reset,
    Sound,
    /// Anything else goes to the assistant verbatim
    Query(String),
}

impl Command {
    /// Exact, case-insensitive keyword match; `raw` is assumed non-blank
    pub fn classify(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "clear" => Command::Clear,
            "help" => Command::Help,
            "status" => Command::Status,
            "reset" => Command::Reset,
            "sound" => Command::Sound,
            _ => Command::Query(raw.to_string()),
        }
    }
}

pub const HELP_TEXT: &str = "Available commands:
  clear  - Clear the terminal
  help   - Show this help message
  status - Show system status
  reset  - Rerun boot sequence
  sound  - Toggle keystroke sounds

Type any other text to interact with the AI assistant.";

pub fn status_report(uptime: Duration) -> String {
    format!(
        "System Status: OPERATIONAL\n\
         Memory Usage: 42.3%\n\
         CPU Load: 28.7%\n\
         Temperature: 19.2°C\n\
         Active Connections: 1\n\
         Uptime: {}",
        format_uptime(uptime)
    )
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn sound_report(enabled: bool) -> String {
    format!("Keystroke sounds {}", if enabled { "enabled" } else { "disabled" })
}
