use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use travelbot_core::{ChatRole, Node, Turn, TurnKind};

use crate::app::{App, InputMode, WELCOME_MESSAGE};

const BOT_NAME: &str = "TravelBot";

fn user_style() -> Style {
    Style::default().fg(Color::Cyan)
}

fn bot_style() -> Style {
    Style::default().fg(Color::Green)
}

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping (doesn't break mid-word)
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Wrap `text` behind a marker such as "• " or "12. ", indenting continuation lines.
fn wrap_with_marker(marker: &str, text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let indent = marker.chars().count();
    wrap_text_to_width(text, width.saturating_sub(indent))
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let lead = if i == 0 {
                Span::styled(marker.to_string(), style)
            } else {
                Span::raw(" ".repeat(indent))
            };
            Line::from(vec![lead, Span::raw(line)])
        })
        .collect()
}

fn plain_lines(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    text.lines()
        .flat_map(|line| wrap_text_to_width(line, width))
        .map(|line| Line::from(Span::styled(line, style)))
        .collect()
}

/// Render formatted nodes, one blank line between top-level nodes.
fn node_lines(nodes: &[Node], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        push_node(&mut lines, node, width);
    }
    lines
}

fn push_node(lines: &mut Vec<Line<'static>>, node: &Node, width: usize) {
    let marker_style = Style::default().fg(Color::Yellow);
    match node {
        Node::Heading { title, body } => {
            lines.push(Line::from(Span::styled(
                title.clone(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            for child in body {
                push_node(lines, child, width);
            }
        }
        Node::BulletList(items) => {
            for item in items {
                lines.extend(wrap_with_marker("  • ", item, width, marker_style));
            }
        }
        Node::OrderedList(items) => {
            for item in items {
                let marker = format!("  {}. ", item.number);
                lines.extend(wrap_with_marker(&marker, &item.text, width, marker_style));
            }
        }
        Node::Paragraph(text) => lines.extend(plain_lines(text, width, Style::default())),
    }
}

fn speaker_line(name: &str, style: Style, timestamp: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(name.to_string(), style.add_modifier(Modifier::BOLD)),
        Span::styled(format!(" · {}", timestamp), Style::default().fg(Color::DarkGray)),
    ])
}

fn turn_lines(app: &App, turn: &Turn, pending: bool, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match (turn.role, turn.kind) {
        (ChatRole::User, _) => {
            lines.push(speaker_line("You", user_style(), &turn.timestamp()));
            lines.extend(plain_lines(&turn.content, width, user_style()));
        }
        (ChatRole::Assistant, TurnKind::Placeholder) => {
            if pending && !app.thinking_visible(turn) {
                return lines;
            }
            lines.push(speaker_line(BOT_NAME, bot_style(), &turn.timestamp()));
            let text = if pending {
                // Animated ellipsis: cycles through ".", "..", "..."
                format!("Thinking{}", ".".repeat(app.animation_frame as usize + 1))
            } else {
                turn.content.clone()
            };
            lines.push(Line::from(Span::styled(
                text,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        (ChatRole::Assistant, TurnKind::Notice) => {
            lines.push(speaker_line(BOT_NAME, bot_style(), &turn.timestamp()));
            lines.extend(plain_lines(
                &turn.content,
                width,
                Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
            ));
        }
        (ChatRole::Assistant, TurnKind::Message) => {
            lines.push(speaker_line(BOT_NAME, bot_style(), &turn.timestamp()));
            match &turn.formatted {
                Some(formatted) => lines.extend(node_lines(formatted.nodes(), width)),
                None => lines.extend(plain_lines(&turn.content, width, Style::default())),
            }
        }
    }
    lines.push(Line::default());
    lines
}

fn chat_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        BOT_NAME,
        bot_style().add_modifier(Modifier::BOLD),
    ))];
    lines.extend(plain_lines(WELCOME_MESSAGE, width, Style::default()));
    lines.push(Line::default());

    let state = app.session.state();
    for turn in &state.turns {
        lines.extend(turn_lines(app, turn, state.is_pending(turn.id), width));
    }
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", BOT_NAME), Style::default().fg(Color::Cyan).bold()),
        Span::styled("● ", Style::default().fg(Color::LightGreen)),
        Span::styled("Online | AI Travel Assistant ", Style::default().fg(Color::White)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2);
    let lines = chat_lines(app, width);

    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    app.update_chat_layout(total, height);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.session.is_awaiting() {
        " Ask (waiting for TravelBot...) "
    } else {
        " Ask me about traveling in Sri Lanka... "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate scroll offset to keep cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text).style(user_style()).block(block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::White);

    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Normal => &[
            ("i", "type"),
            ("j/k", "scroll"),
            ("g/G", "top/bottom"),
            ("n", "new chat"),
            ("q", "quit"),
        ],
        InputMode::Editing => &[("Enter", "send"), ("Esc", "stop typing"), ("PgUp/PgDn", "scroll")],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" {}", status),
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::offline_app;
    use ratatui::{backend::TestBackend, Terminal};
    use travelbot_core::format;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_text_to_width() {
        assert_eq!(
            wrap_text_to_width("the quick brown fox", 9),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap_text_to_width("", 10), vec![""]);
        assert_eq!(wrap_text_to_width("unbreakable", 4), vec!["unbreakable"]);
    }

    #[test]
    fn test_nodes_render_with_markers() {
        let formatted = format("Day trips:\n- Galle Fort\n\n3. Yala\n5. Udawalawe");
        let lines: Vec<String> = node_lines(formatted.nodes(), 40).iter().map(line_text).collect();
        assert_eq!(
            lines,
            vec!["Day trips", "  • Galle Fort", "", "  3. Yala", "  5. Udawalawe"]
        );
    }

    #[test]
    fn test_marker_continuation_is_indented() {
        let lines: Vec<String> = wrap_with_marker("  • ", "one two three", 10, Style::default())
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(lines, vec!["  • one", "    two", "    three"]);
    }

    #[test]
    fn test_render_shows_welcome_and_turns() {
        let mut app = offline_app();
        app.session.submit("Best beaches?").unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("TravelBot"));
        assert!(screen.contains("Welcome to TravelBot!"));
        assert!(screen.contains("Best beaches?"));
        // placeholder younger than the thinking delay is hidden
        assert!(!screen.contains("Thinking"));
    }
}
