//! Modal popup overlays

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::centered_rect_constrained;
use super::theme::{Theme, borders};
use super::widgets::{format_backend_time, truncate_to_width};
use crate::api::{ProcessingLogEntry, SortSession};
use crate::app::state::{DetailsView, EditField, FlagEditor};
use crate::constants::DETAILS_PREVIEW_LIMIT;
use crate::input::KeybindingEntry;
use crate::session::RevertRequest;

fn popup_block<'a>(title: &'a str, footer: &'a str) -> Block<'a> {
    Block::default()
        .title(format!(" {} ", title))
        .title_bottom(footer)
        .borders(Borders::ALL)
        .border_type(borders::popup())
        .border_style(Theme::border_focused())
        .style(Theme::text())
}

/// Height of wrapped text inside a popup of inner width `width`
fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = width.max(1) as usize;
    text.lines()
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum::<usize>() as u16
}

pub fn render_alert(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let height = wrapped_height(message, 52) + 4;
    let popup_area = centered_rect_constrained(area, 30, 60, 5, height);
    frame.render_widget(Clear, popup_area);

    let block = popup_block(title, " Enter to dismiss ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let paragraph = Paragraph::new(format!("\n{}", message))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

pub fn render_confirm_revert(frame: &mut Frame, area: Rect, request: &RevertRequest) {
    let prompt = request.prompt();
    let height = wrapped_height(&prompt, 52) + 4;
    let popup_area = centered_rect_constrained(area, 30, 60, 5, height);
    frame.render_widget(Clear, popup_area);

    let block = popup_block("Revert sorting", " y revert │ n cancel ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let paragraph = Paragraph::new(format!("\n{}", prompt))
        .style(Theme::text_warning())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

pub fn render_editor(frame: &mut Frame, area: Rect, editor: &FlagEditor) {
    let popup_area = centered_rect_constrained(area, 30, 64, 9, 9);
    frame.render_widget(Clear, popup_area);

    let block = popup_block("Edit flag", " Tab next field │ Enter save │ Esc cancel ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let field_width = inner.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();
    for (field, label, value) in [
        (EditField::Name, "Name", editor.name.as_str()),
        (EditField::Description, "Description", editor.description.as_str()),
    ] {
        let active = editor.field == field;
        let label_style = if active {
            Theme::text_accent().add_modifier(Modifier::BOLD)
        } else {
            Theme::text_secondary()
        };
        let (value_style, cursor) = if active {
            (Theme::input_highlight(), "│")
        } else {
            (Theme::text(), "")
        };
        // Keep the end of long input visible
        let shown = tail_to_width(value, field_width.saturating_sub(1));

        lines.push(Line::from(Span::styled(label, label_style)));
        lines.push(Line::from(vec![
            Span::raw(" "),
            Span::styled(format!("{}{}", shown, cursor), value_style),
        ]));
        lines.push(Line::from(""));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Last characters of `s` that fit in `width` columns
fn tail_to_width(s: &str, width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let mut used = 0;
    let mut tail: Vec<char> = Vec::new();
    for c in s.chars().rev() {
        let w = c.width().unwrap_or(1);
        if used + w > width {
            break;
        }
        used += w;
        tail.push(c);
    }
    tail.into_iter().rev().collect()
}

pub fn render_details(
    frame: &mut Frame,
    area: Rect,
    session: &SortSession,
    view: &DetailsView,
    scroll: usize,
) {
    let popup_area = centered_rect_constrained(area, 40, 80, 10, 24);
    frame.render_widget(Clear, popup_area);

    let block = popup_block("Session details", " j/k scroll │ Esc close ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let width = inner.width as usize;
    let mut items: Vec<ListItem> = session_summary(session)
        .into_iter()
        .map(|(label, value)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<11}", label), Theme::text_secondary()),
                Span::styled(
                    truncate_to_width(&value, width.saturating_sub(11)),
                    Theme::text(),
                ),
            ]))
        })
        .collect();
    items.push(ListItem::new(""));

    match view {
        DetailsView::Loading => {
            items.push(ListItem::new("Loading processed emails...").style(Theme::text_muted()));
        }
        DetailsView::Failed(error) => {
            items.push(
                ListItem::new(format!("Could not load details: {}", error))
                    .style(Theme::text_error()),
            );
        }
        DetailsView::Loaded(details) if details.processing_log.is_empty() => {
            items.push(ListItem::new("No emails were processed").style(Theme::text_muted()));
        }
        DetailsView::Loaded(details) => {
            let log = &details.processing_log;
            items.push(ListItem::new(Line::from(Span::styled(
                format!("Processed emails ({})", log.len()),
                Theme::text_bold(),
            ))));
            for entry in log.iter().take(DETAILS_PREVIEW_LIMIT) {
                items.push(log_item(entry, width));
            }
            if let Some(more) = more_label(log.len()) {
                items.push(ListItem::new(more).style(Theme::text_muted()));
            }
        }
    }

    let visible: Vec<ListItem> = items.into_iter().skip(scroll).collect();
    frame.render_widget(List::new(visible), inner);
}

/// Label/value rows at the top of the details popup
fn session_summary(session: &SortSession) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Status", session.status.label().to_string()),
        ("Started", format_backend_time(session.start_time.as_deref())),
        ("Duration", session.duration_label()),
        (
            "Emails",
            format!("{}/{} processed", session.processed_emails, session.total_emails),
        ),
        (
            "Flags",
            if session.flags_used.is_empty() {
                "-".to_string()
            } else {
                session.flags_used.join(", ")
            },
        ),
    ];
    if let Some(error) = session.error_message.as_deref().filter(|e| !e.is_empty()) {
        rows.push(("Error", error.to_string()));
    }
    rows
}

/// Footer for logs longer than the preview
fn more_label(total: usize) -> Option<String> {
    (total > DETAILS_PREVIEW_LIMIT)
        .then(|| format!("And {} more emails...", total - DETAILS_PREVIEW_LIMIT))
}

fn log_item(entry: &ProcessingLogEntry, width: usize) -> ListItem<'static> {
    let label = format!(" → {}", entry.label());
    let subject_width = width.saturating_sub(label.chars().count() + 2);
    let failed = entry
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("failed") || s.eq_ignore_ascii_case("error"));
    let label_style = if failed {
        Theme::text_error()
    } else {
        Theme::text_accent()
    };

    let mut lines = vec![Line::from(vec![
        Span::raw("  "),
        Span::styled(truncate_to_width(entry.subject(), subject_width), Theme::text()),
        Span::styled(label, label_style),
    ])];
    if let Some(error) = entry.error_details.as_deref().filter(|e| !e.is_empty()) {
        lines.push(Line::from(Span::styled(
            format!("    {}", truncate_to_width(error, width.saturating_sub(4))),
            Theme::text_error(),
        )));
    }
    ListItem::new(lines)
}

pub fn render_help(frame: &mut Frame, area: Rect, keys: &[KeybindingEntry], scroll: usize) {
    let mut categories: Vec<&str> = Vec::new();
    for key in keys {
        if categories.last() != Some(&key.category) {
            categories.push(key.category);
        }
    }
    let content_height = keys.len() + categories.len() * 2;

    let popup_area =
        centered_rect_constrained(area, 36, 50, 10, content_height as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = popup_block("Help", " j/k scroll │ Esc close ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut items: Vec<ListItem> = Vec::new();
    let mut current_category: Option<&str> = None;
    let key_width = 12;

    for entry in keys {
        if current_category != Some(entry.category) {
            if current_category.is_some() {
                items.push(ListItem::new(Line::from("")));
            }
            let rule = inner.width.saturating_sub(entry.category.len() as u16 + 4) as usize;
            items.push(ListItem::new(Line::from(vec![
                Span::styled(
                    format!("── {} ", entry.category),
                    Theme::text_secondary().add_modifier(Modifier::BOLD),
                ),
                Span::styled("─".repeat(rule), Theme::border()),
            ])));
            current_category = Some(entry.category);
        }

        let key_display: String = if entry.key.chars().count() > key_width {
            entry.key.chars().take(key_width).collect()
        } else {
            format!("{:width$}", entry.key, width = key_width)
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled("  ", Style::default()),
            Span::styled(key_display, Theme::text_accent()),
            Span::styled(entry.description.as_str(), Theme::text()),
        ])));
    }

    let visible: Vec<ListItem> = items.into_iter().skip(scroll).collect();
    frame.render_widget(List::new(visible), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SessionStatus;

    #[test]
    fn test_more_label_only_past_preview() {
        assert_eq!(more_label(DETAILS_PREVIEW_LIMIT), None);
        assert_eq!(
            more_label(DETAILS_PREVIEW_LIMIT + 5),
            Some("And 5 more emails...".to_string())
        );
    }

    #[test]
    fn test_session_summary_rows() {
        let session = SortSession {
            session_id: "s1".to_string(),
            status: SessionStatus::Failed,
            start_time: Some("2024-05-01T10:00:00".to_string()),
            end_time: Some("2024-05-01T10:01:30".to_string()),
            total_emails: 20,
            processed_emails: 12,
            flags_used: vec!["Urgent".to_string(), "Archive".to_string()],
            error_message: Some("quota exceeded".to_string()),
        };
        let rows = session_summary(&session);
        let get = |label: &str| rows.iter().find(|(l, _)| *l == label).map(|(_, v)| v.clone());

        assert_eq!(get("Status").as_deref(), Some("failed"));
        assert_eq!(get("Duration").as_deref(), Some("90s"));
        assert_eq!(get("Emails").as_deref(), Some("12/20 processed"));
        assert_eq!(get("Flags").as_deref(), Some("Urgent, Archive"));
        assert_eq!(get("Error").as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_tail_to_width_keeps_end() {
        assert_eq!(tail_to_width("hello world", 5), "world");
        assert_eq!(tail_to_width("hi", 5), "hi");
    }

    #[test]
    fn test_wrapped_height() {
        assert_eq!(wrapped_height("short", 10), 1);
        assert_eq!(wrapped_height("exactly ten", 10), 2);
        assert_eq!(wrapped_height("a\n\nb", 10), 3);
    }
}
