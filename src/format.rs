//! Assistant reply formatting
//!
//! Turns raw assistant text into the small markup dialect understood by
//! [`crate::markup`]. The passes run in a fixed order and each one sees the
//! output of the previous one, so code-block content is still visible to the
//! list, parenthesis and unit passes.

use std::sync::OnceLock;

use regex::Regex;

/// Column at which replies are wrapped
pub const WRAP_COLUMN: usize = 80;

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").unwrap())
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^- (.*)").unwrap())
}

fn sub_bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^  - (.*)").unwrap())
}

fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").unwrap())
}

fn unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)(\s?)(°[CF]|[kMG]?[BWV]|Hz)\b").unwrap())
}

/// Format an assistant reply for display
pub fn format_response(text: &str) -> String {
    let wrapped = wrap_words(text, WRAP_COLUMN);

    let formatted = code_block_re().replace_all(&wrapped, |caps: &regex::Captures| {
        let lang = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let code = escape_html(caps[2].trim());
        format!("<div class=\"code-block {}\">{}</div>", lang, code)
    });

    let formatted = bullet_re().replace_all(&formatted, "• $1");
    let formatted = sub_bullet_re().replace_all(&formatted, "  ◦ $1");
    let formatted = paren_re().replace_all(&formatted, "<span class=\"dim\">($1)</span>");
    let formatted = unit_re().replace_all(&formatted, "<span class=\"bright\">$1</span>$2$3");

    formatted.into_owned()
}

/// Greedy word wrap
///
/// Existing newlines are hard breaks and each line is wrapped on its own.
/// Words are separated by single spaces, so runs of spaces and leading
/// indentation survive. A single word longer than `width` gets a line to
/// itself rather than being split.
pub fn wrap_words(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= width {
            lines.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        let mut started = false;

        for word in line.split(' ') {
            let word_len = word.chars().count();

            if started && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_len = word_len;
            } else {
                if started {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(word);
                current_len += word_len;
                started = true;
            }
        }
        lines.push(current);
    }

    lines.join("\n")
}

/// Escape text so it can sit inside markup verbatim
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
