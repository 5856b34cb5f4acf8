//! Terminal rendering of formatted assistant replies
//!
//! The formatter emits a tiny HTML-like dialect. Only the tags it produces are
//! recognised; anything else that looks like a tag is kept as literal text.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::surface::StyleTag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Span { class: String, children: Vec<Node> },
    CodeBlock { lang: String, children: Vec<Node> },
}

impl Node {
    /// Text content with all tags stripped
    #[cfg(test)]
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Span { children, .. } | Node::CodeBlock { children, .. } => {
                children.iter().map(Node::plain_text).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Root,
    Span(String),
    CodeBlock(String),
}

enum Tag {
    Open(Frame),
    CloseSpan,
    CloseDiv,
}

struct Open {
    frame: Frame,
    children: Vec<Node>,
}

impl Open {
    fn into_node(self) -> Option<Node> {
        match self.frame {
            Frame::Root => None,
            Frame::Span(class) => Some(Node::Span { class, children: self.children }),
            Frame::CodeBlock(lang) => Some(Node::CodeBlock { lang, children: self.children }),
        }
    }
}

/// Parse markup into a node tree
pub fn parse(markup: &str) -> Vec<Node> {
    let mut stack = vec![Open { frame: Frame::Root, children: Vec::new() }];
    let mut text = String::new();
    let mut i = 0;

    while i < markup.len() {
        let rest = &markup[i..];

        if rest.starts_with('<') {
            if let Some((tag, len)) = parse_tag(rest) {
                flush_text(&mut text, &mut stack);
                match tag {
                    Tag::Open(frame) => stack.push(Open { frame, children: Vec::new() }),
                    Tag::CloseSpan => close_to(&mut stack, |frame| matches!(frame, Frame::Span(_))),
                    Tag::CloseDiv => close_to(&mut stack, |frame| matches!(frame, Frame::CodeBlock(_))),
                }
                i += len;
                continue;
            }
        } else if rest.starts_with('&') {
            if let Some((c, len)) = parse_entity(rest) {
                text.push(c);
                i += len;
                continue;
            }
        }

        if let Some(c) = rest.chars().next() {
            text.push(c);
            i += c.len_utf8();
        }
    }

    flush_text(&mut text, &mut stack);
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn flush_text(text: &mut String, stack: &mut [Open]) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.children.push(Node::Text(std::mem::take(text)));
    }
}

fn close_top(stack: &mut Vec<Open>) {
    if let Some(node) = stack.pop().and_then(Open::into_node) {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }
}

/// Close every frame down to and including the nearest one matching
/// `is_target`. A close tag with no matching frame is dropped.
fn close_to<F: Fn(&Frame) -> bool>(stack: &mut Vec<Open>, is_target: F) {
    let Some(depth) = stack.iter().rposition(|open| is_target(&open.frame)) else {
        return;
    };
    while stack.len() > depth {
        close_top(stack);
    }
}

fn parse_tag(rest: &str) -> Option<(Tag, usize)> {
    if rest.starts_with("</span>") {
        return Some((Tag::CloseSpan, "</span>".len()));
    }
    if rest.starts_with("</div>") {
        return Some((Tag::CloseDiv, "</div>".len()));
    }

    for (prefix, is_div) in [("<span class=\"", false), ("<div class=\"", true)] {
        if let Some(after) = rest.strip_prefix(prefix) {
            let end = after.find("\">")?;
            let class = &after[..end];
            if class.contains(['<', '>', '"', '\n']) {
                return None;
            }
            let len = prefix.len() + end + "\">".len();
            if !is_div {
                return Some((Tag::Open(Frame::Span(class.to_string())), len));
            }
            let lang = class.strip_prefix("code-block")?;
            return Some((Tag::Open(Frame::CodeBlock(lang.trim().to_string())), len));
        }
    }
    None
}

fn parse_entity(rest: &str) -> Option<(char, usize)> {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
    ];
    ENTITIES
        .iter()
        .find(|(entity, _)| rest.starts_with(entity))
        .map(|(entity, c)| (*c, entity.len()))
}

/// Base style for terminal output
pub fn base_style() -> Style {
    Style::default().fg(Color::Green)
}

/// Style patch for a style tag
pub fn tag_style(tag: StyleTag) -> Style {
    match tag {
        StyleTag::Error => Style::default().fg(Color::Red),
        StyleTag::Warning => Style::default().fg(Color::Yellow),
        StyleTag::Success => Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
        StyleTag::Dim => Style::default().fg(Color::DarkGray),
        StyleTag::Bright => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    }
}

fn code_style() -> Style {
    Style::default().fg(Color::Cyan)
}

/// Accumulates styled text into terminal lines
///
/// Text is one continuous stream: only `\n` starts a new line.
#[derive(Default)]
pub struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    // A block already ended the line, so one following `\n` is absorbed
    after_block: bool,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        let text = if std::mem::take(&mut self.after_block) {
            text.strip_prefix('\n').unwrap_or(text)
        } else {
            text
        };
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.push_inline(first, style);
        }
        for part in parts {
            self.newline();
            self.push_inline(part, style);
        }
    }

    fn push_inline(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    pub fn newline(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
    }

    /// Break the line unless already at the start of one
    pub fn soft_break(&mut self) {
        if !self.current.is_empty() {
            self.newline();
        }
    }

    pub fn push_nodes(&mut self, nodes: &[Node], style: Style) {
        for node in nodes {
            match node {
                Node::Text(text) => self.push(text, style),
                Node::Span { class, children } => {
                    let patched = match StyleTag::from_class(class) {
                        Some(tag) => style.patch(tag_style(tag)),
                        None => style,
                    };
                    self.push_nodes(children, patched);
                }
                Node::CodeBlock { children, .. } => {
                    self.soft_break();
                    self.push_nodes(children, style.patch(code_style()));
                    self.soft_break();
                    self.after_block = true;
                }
            }
        }
    }

    pub fn push_markup(&mut self, markup: &str, style: Style) {
        self.push_nodes(&parse(markup), style);
    }

    /// Finish, keeping a trailing partial line
    pub fn finish(mut self) -> Vec<Line<'static>> {
        self.lines.push(Line::from(self.current));
        self.lines
    }
}
