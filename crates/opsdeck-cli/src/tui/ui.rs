use opsdeck_status::{AlertOverlay, SourceBadge};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use super::app::{App, Panel};
use crate::cmd_status::format_report;

/// Render the full TUI frame.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // alert overlay
            Constraint::Min(5),    // main area
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    render_overlay(f, app, chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45), // status panels
            Constraint::Percentage(55), // history + result
        ])
        .split(chunks[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35), // history
            Constraint::Percentage(65), // result
        ])
        .split(main_chunks[1]);

    render_status(f, app, main_chunks[0]);
    render_history(f, app, right[0]);
    render_result(f, app, right[1]);
    render_status_bar(f, app, chunks[2]);
}

fn panel_style(app: &App, panel: Panel) -> Style {
    if app.active_panel == panel {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_overlay(f: &mut Frame, app: &App, area: Rect) {
    let spans: Vec<Span> = match &app.status {
        Some(view) => overlay_spans(&view.overlay),
        None => vec![Span::styled(
            " waiting for first poll...",
            Style::default().fg(Color::DarkGray),
        )],
    };
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn overlay_spans(overlay: &AlertOverlay) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw(" ")];
    for (i, badge) in overlay.badges.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(badge.render_text(), badge_style(badge)));
    }
    spans
}

fn badge_style(badge: &SourceBadge) -> Style {
    if badge.feed_error.is_some() || badge.connection_error.is_some() {
        Style::default().fg(Color::Yellow)
    } else if badge.count.is_some_and(|n| n > 0) {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if badge.count.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Status));

    let Some(view) = &app.status else {
        let msg = Paragraph::new("Loading...")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(msg, area);
        return;
    };

    let text = format_report(&view.report, view.now, view.window, view.reference);
    let items: Vec<ListItem> = text
        .lines()
        .skip(app.status_scroll)
        .map(|line| ListItem::new(Line::from(Span::styled(line.to_string(), status_line_style(line)))))
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

/// Style a line of the formatted report by its marker.
fn status_line_style(line: &str) -> Style {
    if line.starts_with("  ! ") {
        Style::default().fg(Color::Red)
    } else if line.starts_with("  > ") {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if line.starts_with("  connection error") || line.starts_with("  unavailable") {
        Style::default().fg(Color::Yellow)
    } else if line.starts_with("  - ") || line.starts_with("  loading") {
        Style::default().fg(Color::DarkGray)
    } else if !line.starts_with(' ') && !line.is_empty() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn render_history(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.search_input {
        Some(term) => format!(" History /{term}_ "),
        None => " History ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::History));

    let view = &app.history_view;
    let mut items: Vec<ListItem> = Vec::new();
    if let Some(p) = &view.placeholder {
        items.push(ListItem::new(Line::from(Span::styled(
            format!(" {}", p.text()),
            Style::default().fg(Color::DarkGray),
        ))));
    }
    for (i, row) in view.rows.iter().enumerate() {
        let style = if app.active_panel == Panel::History && i == app.history_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        items.push(ListItem::new(Line::from(Span::styled(
            format!(" [{}] {}", row.index, row.label),
            style,
        ))));
    }
    if let Some(toggle) = view.toggle_text() {
        items.push(ListItem::new(Line::from(Span::styled(
            format!(" ({toggle}: e)"),
            Style::default().fg(Color::DarkGray),
        ))));
    }
    f.render_widget(List::new(items).block(block), area);
}

fn render_result(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.result {
        Some(r) => format!(" {} ", truncate_str(&r.query, area.width.saturating_sub(4) as usize)),
        None => " Result ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Result));

    let body = match &app.result {
        Some(r) => Paragraph::new(r.text.clone())
            .wrap(Wrap { trim: false })
            .scroll((app.result_scroll.min(u16::MAX as usize) as u16, 0)),
        None => Paragraph::new("Select a history entry and press Enter")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(body.block(block), area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let pause_indicator = if app.paused { " [PAUSED]" } else { "" };
    let panel_name = match app.active_panel {
        Panel::Status => "Status",
        Panel::History => "History",
        Panel::Result => "Result",
    };
    let (text, style) = if let Some(err) = &app.error {
        (
            format!(" ERROR: {err}"),
            Style::default().fg(Color::White).bg(Color::Red),
        )
    } else {
        (
            format!(
                " opsdeck watch | {panel_name}{pause_indicator} | Tab:switch  j/k:scroll  Enter:open  e:expand  /:search  r:reload  Space:pause  q:quit"
            ),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        )
    };
    let bar = Paragraph::new(Line::from(Span::styled(text, style)));
    f.render_widget(bar, area);
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_status::SourceKind;

    fn badge(count: Option<usize>, connection_error: Option<&str>) -> SourceBadge {
        SourceBadge {
            kind: SourceKind::IncidentFeed,
            count,
            connection_error: connection_error.map(String::from),
            feed_error: None,
        }
    }

    #[test]
    fn badge_colors_follow_state() {
        assert_eq!(badge_style(&badge(Some(0), None)).fg, Some(Color::Green));
        assert_eq!(badge_style(&badge(Some(2), None)).fg, Some(Color::Red));
        assert_eq!(badge_style(&badge(Some(2), Some("timeout"))).fg, Some(Color::Yellow));
        assert_eq!(badge_style(&badge(None, None)).fg, Some(Color::DarkGray));
    }

    #[test]
    fn overlay_spans_separate_sources() {
        let overlay = AlertOverlay {
            badges: vec![badge(Some(1), None), badge(None, Some("refused"))],
        };
        let text: String = overlay_spans(&overlay)
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(text, " Incidents: 1 | Incidents: connection error");
    }

    #[test]
    fn report_lines_styled_by_marker() {
        assert_eq!(status_line_style("  ! Library: Degraded").fg, Some(Color::Red));
        assert_eq!(status_line_style("  > Today 09:00 api").fg, Some(Color::Green));
        assert!(status_line_style("Incidents (2 triggered)")
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn truncate_str_appends_ellipsis() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 5), "hello...");
    }
}
