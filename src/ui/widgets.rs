//! Common UI widgets and formatting helpers

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme::Theme;
use crate::api::types::parse_timestamp;

pub use super::status_bar::{StatusInfo, display_width, status_bar, truncate_to_width};

pub fn error_bar(frame: &mut Frame, area: Rect, message: &str) {
    let text = truncate_to_width(&format!(" Error: {} ", message), area.width as usize);
    let paragraph = Paragraph::new(text).style(Theme::error_bar());
    frame.render_widget(paragraph, area);
}

/// Key hints along the bottom edge; hints that do not fit are dropped
pub fn help_bar(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let available_width = area.width as usize;

    // Format: " key desc │" (separator between hints)
    let hint_widths: Vec<usize> = hints
        .iter()
        .enumerate()
        .map(|(i, (key, desc))| {
            let base = display_width(key) + 2 + display_width(desc);
            if i + 1 < hints.len() { base + 3 } else { base + 1 }
        })
        .collect();

    let mut total_width = 0;
    let mut hints_to_show = 0;
    for width in &hint_widths {
        if total_width + width > available_width {
            break;
        }
        total_width += width;
        hints_to_show += 1;
    }
    hints_to_show = hints_to_show.max(1).min(hints.len());

    let mut spans: Vec<Span> = Vec::new();
    for (i, (key, desc)) in hints.iter().take(hints_to_show).enumerate() {
        spans.push(Span::styled(format!(" {} ", key), Theme::help_key()));
        spans.push(Span::styled(desc.to_string(), Theme::help_desc()));
        if i + 1 < hints_to_show {
            spans.push(Span::styled(" │ ", Theme::help_desc()));
        }
    }
    spans.push(Span::styled(" ", Theme::help_desc()));

    let paragraph = Paragraph::new(Line::from(spans)).style(Theme::help_bar());
    frame.render_widget(paragraph, area);
}

/// Local wall-clock time of an activity entry, `HH:MM:SS`
pub fn format_time(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

/// Backend timestamps (UTC, no offset) as local `Mon DD HH:MM`
pub fn format_backend_time(raw: Option<&str>) -> String {
    match raw.and_then(parse_timestamp) {
        Some(naive) => format_naive_utc(naive),
        None => "-".to_string(),
    }
}

fn format_naive_utc(naive: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        .with_timezone(&Local)
        .format("%b %d %H:%M")
        .to_string()
}

/// Integer percentage for progress labels, clamped to 0..=100
pub fn percent_label(percentage: Option<f64>) -> String {
    let pct = percentage.unwrap_or(0.0);
    let pct = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
    format!("{}%", pct.round() as u64)
}
