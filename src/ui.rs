use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::markup::{base_style, tag_style, LineBuilder};
use crate::surface::{Fragment, StyleTag, Surface};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, output
    let [header_area, output_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);

    let mut surface = app.surface.lock();
    render_header(&surface, frame, header_area);
    render_output(&mut surface, &app.prompt, frame, output_area);
    drop(surface);

    app.output_height = output_area.height;
}

fn render_header(surface: &Surface, frame: &mut Frame, area: Rect) {
    let (label, style) = if surface.input.is_some() {
        (" READY ", Style::default().bg(Color::Green).fg(Color::Black))
    } else {
        (" WORKING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    };

    let title = Line::from(vec![
        Span::styled(" AI-SYSTEM-001 ", Style::default().fg(Color::Green).bold()),
        Span::styled(label, style),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

/// Lines for every fragment plus the input line, if any. Returns the index
/// of the input line and the char width of the text before its cursor.
pub fn build_lines(surface: &Surface, prompt: &str) -> (Vec<Line<'static>>, Option<(usize, usize)>) {
    let mut builder = LineBuilder::new();
    for fragment in &surface.fragments {
        match fragment {
            Fragment::Text { text, style } => {
                let style = match style {
                    Some(tag) => base_style().patch(tag_style(*tag)),
                    None => base_style(),
                };
                builder.push(text, style);
            }
            Fragment::Markup(markup) => builder.push_markup(markup, base_style()),
        }
    }

    let mut lines = builder.finish();
    let Some(input) = &surface.input else {
        return (lines, None);
    };

    // The prompt takes over an empty trailing line
    if lines.last().is_some_and(|line| line.width() == 0) {
        lines.pop();
    }
    let cursor_col = prompt.chars().count() + input.cursor.min(input.buffer.chars().count());
    lines.push(Line::from(vec![
        Span::styled(prompt.to_string(), base_style().patch(tag_style(StyleTag::Bright))),
        Span::styled(input.buffer.clone(), base_style()),
    ]));

    let input_idx = lines.len() - 1;
    (lines, Some((input_idx, cursor_col)))
}

/// Hard-wrap a line into rows of at most `width` chars
pub fn split_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in line.spans {
        let style = span.style;
        let mut chunk = String::new();
        for c in span.content.chars() {
            if used == width {
                if !chunk.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut chunk), style));
                }
                rows.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            chunk.push(c);
            used += 1;
        }
        if !chunk.is_empty() {
            current.push(Span::styled(chunk, style));
        }
    }
    rows.push(Line::from(current));
    rows
}

/// Row index as the u16 ratatui scrolls by, saturating instead of wrapping
fn to_row(n: usize) -> u16 {
    n.min(u16::MAX as usize) as u16
}

fn render_output(surface: &mut Surface, prompt: &str, frame: &mut Frame, area: Rect) {
    let width = area.width.max(1) as usize;
    let (lines, input_pos) = build_lines(surface, prompt);

    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut cursor_row = None;
    for (idx, line) in lines.into_iter().enumerate() {
        if let Some((input_idx, col)) = input_pos {
            if idx == input_idx {
                cursor_row = Some((rows.len() + col / width, col % width));
            }
        }
        rows.extend(split_line(line, width));
    }

    let max_scroll = to_row(rows.len().saturating_sub(area.height as usize));
    if surface.follow || surface.scroll >= max_scroll {
        surface.follow = true;
        surface.scroll = max_scroll;
    }
    let offset = surface.scroll;

    frame.render_widget(Paragraph::new(rows).scroll((offset, 0)), area);

    if let Some((row, col)) = cursor_row {
        let row = to_row(row);
        if row >= offset && row - offset < area.height {
            frame.set_cursor_position((area.x + col as u16, area.y + row - offset));
        }
    }
}
