//! Status bar rendering with the connection indicator

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme::{Theme, symbols};
use crate::constants::SPINNER_FRAME_MS;

/// Status bar info for rendering
pub struct StatusInfo<'a> {
    pub connected: bool,
    /// Connection check or login in flight
    pub loading: bool,
    pub email: Option<&'a str>,
    pub active_flags: usize,
    pub recent_actions: usize,
    pub status_message: Option<&'a str>,
    pub has_error: bool,
}

/// Calculate display width of a string (accounting for Unicode)
pub fn display_width(s: &str) -> usize {
    use unicode_width::UnicodeWidthStr;
    s.width()
}

/// Truncate string to fit display width, marking the cut with "..."
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    if display_width(s) <= max_width {
        return s.to_string();
    }
    if max_width < 4 {
        return s.chars().take(max_width).collect();
    }

    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);
        if width + char_width > max_width - 3 {
            break;
        }
        width += char_width;
        result.push(c);
    }
    result.push_str("...");
    result
}

/// Label for the connection segment on the left
fn account_label(info: &StatusInfo) -> String {
    match (info.connected, info.email) {
        (true, Some(email)) => email.to_string(),
        _ if info.loading => "Checking connection...".to_string(),
        _ => "Gmail not connected".to_string(),
    }
}

/// Counters shown on the right
fn counters(info: &StatusInfo) -> String {
    let actions = match info.recent_actions {
        1 => "1 recent action".to_string(),
        n => format!("{} recent actions", n),
    };
    format!("{} active │ {} ", info.active_flags, actions)
}

pub fn status_bar(frame: &mut Frame, area: Rect, info: &StatusInfo) {
    let style = Theme::status_bar();
    let width = area.width as usize;

    let (indicator, indicator_style) = if info.loading {
        (format!(" {} ", spinner_char()), Theme::status_busy())
    } else if info.connected {
        (format!(" {} ", symbols::CONNECTED), Theme::status_connected())
    } else {
        (
            format!(" {} ", symbols::DISCONNECTED),
            Theme::status_disconnected(),
        )
    };
    let error_indicator = if info.has_error { "! " } else { "" };

    let status_msg = match info.status_message {
        Some(msg) if !msg.is_empty() => format!("{} │ ", msg),
        _ => String::new(),
    };
    let counters = counters(info);

    // The account label gives way first, then the status message
    let fixed = display_width(&indicator) + display_width(error_indicator) + display_width(&counters);
    let status_msg = truncate_to_width(&status_msg, width.saturating_sub(fixed + 12));
    let available = width.saturating_sub(fixed + display_width(&status_msg) + 2);
    let account = truncate_to_width(&account_label(info), available.max(8));

    let used = fixed + display_width(&account) + display_width(&status_msg);
    let padding = " ".repeat(width.saturating_sub(used));

    let mut spans = vec![Span::styled(indicator, indicator_style)];
    if info.has_error {
        spans.push(Span::styled(error_indicator, Theme::status_disconnected()));
    }
    spans.extend([
        Span::styled(account, style),
        Span::styled(padding, style),
        Span::styled(status_msg, Theme::status_muted()),
        Span::styled(counters, style),
    ]);

    let paragraph = Paragraph::new(Line::from(spans)).style(style);
    frame.render_widget(paragraph, area);
}

/// Get an animated spinner character for loading states
pub fn spinner_char() -> char {
    const SPINNER: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let idx = (millis / SPINNER_FRAME_MS) as usize % SPINNER.chars().count();

    SPINNER.chars().nth(idx).unwrap_or('*')
}
