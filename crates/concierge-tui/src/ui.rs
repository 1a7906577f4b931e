use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use concierge_core::knowledge::QUICK_QUESTIONS;
use concierge_core::ChatRole;
use crate::app::{role_label, App, FocusPane};

/// Terminals narrower than this hide the sidebar
const SIDEBAR_MIN_WIDTH: u16 = 100;
const SIDEBAR_WIDTH: u16 = 34;

const ACCENT: Color = Color::Yellow;
const BRAND: Color = Color::Indexed(61); // indigo

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let chat_column = if body_area.width >= SIDEBAR_MIN_WIDTH {
        let [sidebar_area, chat_column] = Layout::horizontal([
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        chat_column
    } else {
        body_area
    };

    let [chat_area, quick_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    render_chat(app, frame, chat_area);
    render_quick_questions(app, frame, quick_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::Black).fg(ACCENT);

    let title = Line::from(vec![
        Span::styled(" Kenmark ITan ", Style::default().fg(Color::White).bold()),
        Span::styled(" AI CONCIERGE ", Style::default().fg(ACCENT).bold()),
        Span::styled(format!(" {} ", app.provider_label), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(" F2 ", key_style),
        Span::raw(" Services "),
        Span::styled(" F3 ", key_style),
        Span::raw(" Support "),
        Span::styled(
            format!(" v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(BRAND).fg(Color::White));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let kb = &app.knowledge;
    let heading = Style::default().fg(ACCENT).add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::Gray);

    let mut lines = vec![
        Line::from(Span::styled("ABOUT THE COMPANY", heading)),
        Line::from(Span::styled(kb.about.clone(), muted)),
        Line::default(),
        Line::from(Span::styled("GLOBAL REACH", heading)),
        Line::from(vec![Span::styled("✉ ", Style::default().fg(ACCENT)), Span::raw(kb.contact.email.clone())]),
        Line::from(vec![Span::styled("☎ ", Style::default().fg(ACCENT)), Span::raw(kb.contact.phone.clone())]),
        Line::from(vec![Span::styled("⌂ ", Style::default().fg(ACCENT)), Span::raw(kb.website.clone())]),
        Line::default(),
        Line::from(Span::styled("KEY VERTICALS", heading)),
    ];
    lines.extend(kb.key_verticals().iter().map(|vertical| {
        Line::from(vec![
            Span::styled("› ", Style::default().fg(ACCENT)),
            Span::styled(vertical.clone(), muted),
        ])
    }));

    let sidebar = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(sidebar, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    let (height, width) = (area.height.saturating_sub(2), area.width.saturating_sub(2));
    if (height, width) != (app.chat_height, app.chat_width) {
        app.chat_height = height;
        app.chat_width = width;
        if app.follow_tail {
            app.scroll_to_bottom();
        }
    }

    let mut lines: Vec<Line> = Vec::new();

    for msg in &app.chat.messages {
        let role_style = match msg.role {
            ChatRole::User => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ChatRole::Assistant => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        };
        lines.push(Line::from(vec![
            Span::styled(role_label(msg.role), role_style),
            Span::styled(format!("  {}", msg.time_label()), Style::default().fg(Color::DarkGray)),
        ]));

        if msg.content.is_empty() {
            if app.chat.is_loading {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Processing request{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                lines.push(Line::default());
            }
        }

        for line in msg.content.lines() {
            match msg.role {
                ChatRole::User => lines.push(Line::from(line.to_string())),
                ChatRole::Assistant => lines.push(parse_markdown_line(line)),
            }
        }
        lines.push(Line::default());
    }

    if let Some(error) = &app.chat.error {
        lines.push(Line::from(vec![
            Span::styled("✗ ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.clone(), Style::default().fg(Color::LightRed).bold()),
        ]));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_quick_questions(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::QuickQuestions;
    let border_color = if focused { ACCENT } else { Color::DarkGray };

    let mut spans = Vec::new();
    for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
        let style = if focused && i == app.quick_selected {
            Style::default().bg(ACCENT).fg(Color::Black).bold()
        } else {
            Style::default().fg(Color::LightBlue)
        };
        spans.push(Span::styled(format!(" F{} ", i + 5), Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(format!(" {} ", question), style));
    }

    let quick = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Quick questions (Tab) "),
    );

    frame.render_widget(quick, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.is_loading();
    let focused = app.focus == FocusPane::Input;
    let border_color = if loading {
        Color::DarkGray
    } else if focused {
        ACCENT
    } else {
        Color::Gray
    };
    let title = if loading { " Waiting for reply... " } else { " Ask (Enter to send) " };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            "Type your query here...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let style = if loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when typing
    if focused && !loading {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.focus {
        FocusPane::Input => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
        ],
        FocusPane::QuickQuestions => vec![
            Span::styled(" ←/→ ", key_style),
            Span::styled(" pick ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" ask ", label_style),
        ],
    };
    hints.extend([
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
        Span::styled(
            "  Official Assistant • Kenmark ITan Solutions • Secure AI",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_markdown() {
        let line = parse_markdown_line("Enroll in **PMP** today");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "PMP");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_markdown_line("price: **tbd");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "price: **tbd");
    }

    #[test]
    fn test_single_asterisk_kept() {
        let line = parse_markdown_line("* bullet");
        assert_eq!(line.spans[0].content, "* bullet");
    }

    #[test]
    fn test_empty_line() {
        assert!(parse_markdown_line("").spans.is_empty());
    }
}
