//! Main dashboard: flags, sort status, activity log and remote sessions

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
};

use super::status_bar::spinner_char;
use super::theme::{Theme, borders, parse_hex_color, symbols, with_selection_bg};
use super::widgets::{
    StatusInfo, error_bar, format_backend_time, format_time, help_bar, percent_label, status_bar,
    truncate_to_width,
};
use crate::api::{SessionStatus, SortSession};
use crate::app::state::{AppState, Focus};
use crate::constants::SIDE_PANEL_PERCENT;
use crate::session::{SortPhase, SortingProgress};

/// Side panel is dropped below this width
const MIN_SPLIT_WIDTH: u16 = 90;
/// Rows of the sort status pane including borders
const SORT_PANE_HEIGHT: u16 = 6;

pub fn render_dashboard(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Status bar
            Constraint::Min(0),    // Panes
            Constraint::Length(1), // Help bar or error
        ])
        .split(frame.area());

    let status_info = StatusInfo {
        connected: state.session.connection.is_connected,
        loading: state.status.loading || state.login_pending,
        email: state.session.connection.email(),
        active_flags: state.session.flags.active_count(),
        recent_actions: state.session.history.len(),
        status_message: state.status.message.as_deref(),
        has_error: state.status.error.is_some(),
    };
    status_bar(frame, chunks[0], &status_info);

    let main = chunks[1];
    let (left, right) = if main.width >= MIN_SPLIT_WIDTH {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(100 - SIDE_PANEL_PERCENT),
                Constraint::Percentage(SIDE_PANEL_PERCENT),
            ])
            .split(main);
        (split[0], Some(split[1]))
    } else {
        (main, None)
    };

    let flag_rows = state.session.flags.len() as u16 + 2;
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(flag_rows),
            Constraint::Length(SORT_PANE_HEIGHT),
            Constraint::Min(3),
        ])
        .split(left);

    render_flags(frame, left_chunks[0], state);
    render_sort_status(frame, left_chunks[1], state);
    render_activity(frame, left_chunks[2], state);
    if let Some(area) = right {
        render_sessions(frame, area, state);
    }

    if let Some(error) = &state.status.error {
        error_bar(frame, chunks[2], error);
    } else {
        help_bar(frame, chunks[2], &hints(state));
    }
}

fn hints(state: &AppState) -> Vec<(&'static str, &'static str)> {
    let mut hints = match state.focus {
        Focus::Flags => vec![("space", "toggle"), ("e", "edit")],
        Focus::Sessions => vec![("Enter", "details")],
    };
    if state.session.connection.is_connected {
        hints.extend([("s", "sort"), ("R", "revert"), ("D", "disconnect")]);
    } else {
        hints.push(("c", "connect Gmail"));
    }
    hints.extend([("Tab", "switch pane"), ("?", "help"), ("q", "quit")]);
    hints
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Theme::border_focused()
    } else {
        Theme::border()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(borders::panel())
        .border_style(border_style)
}

fn render_flags(frame: &mut Frame, area: Rect, state: &AppState) {
    let flags = &state.session.flags;
    let title = format!(" Flags ({} active) ", flags.active_count());
    let block = pane_block(title, state.focus == Focus::Flags);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if flags.is_empty() {
        let paragraph = Paragraph::new("No flags configured").style(Theme::text_muted());
        frame.render_widget(paragraph, inner);
        return;
    }

    let width = inner.width as usize;
    let items: Vec<ListItem> = flags
        .flags()
        .iter()
        .enumerate()
        .map(|(idx, flag)| {
            let selected = state.focus == Focus::Flags && idx == state.flag_selected;
            let marker = if selected {
                symbols::SELECTED
            } else {
                symbols::UNSELECTED
            };
            let check = if flag.is_active {
                symbols::FLAG_ON
            } else {
                symbols::FLAG_OFF
            };
            let name_style = if flag.is_active {
                Theme::text_bold()
            } else {
                Theme::text()
            };

            // marker + check + dot + name + separator
            let used = 2 + 4 + 2 + flag.name.chars().count() + 3;
            let description = truncate_to_width(&flag.description, width.saturating_sub(used));

            let line = Line::from(vec![
                Span::styled(marker, with_selection_bg(Theme::text_accent(), selected)),
                Span::styled(format!("{} ", check), with_selection_bg(Theme::text(), selected)),
                Span::styled(
                    format!("{} ", symbols::CONNECTED),
                    with_selection_bg(Style::default().fg(parse_hex_color(&flag.color)), selected),
                ),
                Span::styled(flag.name.clone(), with_selection_bg(name_style, selected)),
                Span::styled(
                    if description.is_empty() {
                        String::new()
                    } else {
                        format!(" - {}", description)
                    },
                    with_selection_bg(Theme::text_muted(), selected),
                ),
            ]);
            let row_style = if selected { Theme::selected() } else { Theme::text() };
            ListItem::new(line).style(row_style)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

fn render_sort_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = pane_block(" Email Sorting ".to_string(), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let session = &state.session;
    if let SortPhase::Polling(progress) = &session.sort {
        render_progress(frame, inner, progress);
        return;
    }

    let (text, style) = match &session.sort {
        SortPhase::Starting => (format!("{} Starting sort...", spinner_char()), Theme::text()),
        SortPhase::Completed { message, .. } => {
            (format!("{} {}", symbols::SUCCESS, message), Theme::text_success())
        }
        SortPhase::Failed { message, .. } => {
            (format!("{} {}", symbols::FAILURE, message), Theme::text_error())
        }
        SortPhase::LostConnection => (
            "Lost connection while sorting. Check your sorting history for results.".to_string(),
            Theme::text_warning(),
        ),
        SortPhase::Idle | SortPhase::Polling(_) => idle_hint(state),
    };

    let paragraph = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn idle_hint(state: &AppState) -> (String, Style) {
    let session = &state.session;
    if !session.connection.is_connected {
        if state.login_pending {
            return (
                "Waiting for you to finish logging in...".to_string(),
                Theme::text_muted(),
            );
        }
        return (
            "Connect your Gmail account to start sorting (press c).".to_string(),
            Theme::text_muted(),
        );
    }
    match session.flags.active_count() {
        0 => (
            "Select at least one flag to sort by.".to_string(),
            Theme::text_muted(),
        ),
        n => (
            format!(
                "Ready to sort with {} flag{}. Press s to start.",
                n,
                if n == 1 { "" } else { "s" }
            ),
            Theme::text(),
        ),
    }
}

fn render_progress(frame: &mut Frame, area: Rect, progress: &SortingProgress) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let phase = progress
        .current_phase
        .as_deref()
        .unwrap_or(SortingProgress::PHASE_CATEGORIZING);
    let mut spans = vec![
        Span::styled(format!("{} ", spinner_char()), Theme::text_accent()),
        Span::styled(phase.to_string(), Theme::text_bold()),
    ];
    if let (Some(processed), Some(total)) = (progress.processed_emails, progress.total_emails)
        && total > 0
    {
        spans.push(Span::styled(
            format!("  {}/{} emails", processed, total),
            Theme::text_secondary(),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Theme::gauge())
        .ratio(progress.ratio().clamp(0.0, 1.0))
        .label(percent_label(progress.progress_percentage));
    frame.render_widget(gauge, rows[1]);
}

fn render_activity(frame: &mut Frame, area: Rect, state: &AppState) {
    let history = &state.session.history;
    let block = pane_block(format!(" Recent Activity ({}) ", history.len()), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if history.is_empty() {
        let paragraph = Paragraph::new("No activity yet").style(Theme::text_muted());
        frame.render_widget(paragraph, inner);
        return;
    }

    let width = inner.width as usize;
    let items: Vec<ListItem> = history
        .entries()
        .iter()
        .take(inner.height as usize)
        .map(|entry| {
            let time = format!("{} ", format_time(&entry.timestamp));
            let action = format!("{:<9}", entry.action.label());
            let name = format!("{}: ", entry.flag_name);
            let used = time.chars().count() + action.chars().count() + name.chars().count();
            ListItem::new(Line::from(vec![
                Span::styled(time, Theme::text_muted()),
                Span::styled(action, Theme::text_accent()),
                Span::styled(name, Theme::text_bold()),
                Span::styled(
                    truncate_to_width(&entry.details, width.saturating_sub(used)),
                    Theme::text_secondary(),
                ),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

fn render_sessions(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::Sessions;
    let block = pane_block(" Sorting History ".to_string(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.remote_history.is_empty() {
        let msg = if state.session.connection.is_connected {
            "No sorting sessions yet"
        } else {
            "Connect Gmail to see past sorts"
        };
        frame.render_widget(Paragraph::new(msg).style(Theme::text_muted()), inner);
        return;
    }

    // Two lines per session; keep the selection on screen
    let per_page = (inner.height as usize / 2).max(1);
    let skip = (state.session_selected + 1).saturating_sub(per_page);
    let width = inner.width as usize;

    let items: Vec<ListItem> = state
        .remote_history
        .iter()
        .enumerate()
        .skip(skip)
        .take(per_page)
        .map(|(idx, session)| {
            let selected = focused && idx == state.session_selected;
            session_item(session, selected, width)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

fn session_item(session: &SortSession, selected: bool, width: usize) -> ListItem<'static> {
    let (symbol, status_style) = match session.status {
        SessionStatus::Completed => (symbols::SUCCESS, Theme::text_success()),
        SessionStatus::Failed => (symbols::FAILURE, Theme::text_error()),
        SessionStatus::Running => ("…", Theme::text_warning()),
        SessionStatus::Unknown => ("?", Theme::text_muted()),
    };

    let first = Line::from(vec![
        Span::styled(
            format!(" {} ", symbol),
            with_selection_bg(status_style, selected),
        ),
        Span::styled(
            format_backend_time(session.start_time.as_deref()),
            with_selection_bg(Theme::text().add_modifier(Modifier::BOLD), selected),
        ),
        Span::styled(
            format!("  {}/{} emails", session.processed_emails, session.total_emails),
            with_selection_bg(Theme::text_secondary(), selected),
        ),
    ]);

    let flags = if session.flags_used.is_empty() {
        "no flags recorded".to_string()
    } else {
        session.flags_used.join(", ")
    };
    let second = Line::from(Span::styled(
        format!("   {}", truncate_to_width(&flags, width.saturating_sub(3))),
        with_selection_bg(Theme::text_muted(), selected),
    ));

    let style = if selected { Theme::selected() } else { Theme::text() };
    ListItem::new(vec![first, second]).style(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeVariant;
    use crate::flags::builtin_flags;
    use crate::session::{ConnectionState, Session};

    fn state() -> AppState {
        AppState::new(Session::new(builtin_flags()), ThemeVariant::Light)
    }

    #[test]
    fn test_idle_hint_follows_connection_and_flags() {
        let mut state = state();
        assert!(idle_hint(&state).0.starts_with("Connect your Gmail"));

        state.session.connection = ConnectionState::connected("me@example.com");
        assert_eq!(idle_hint(&state).0, "Select at least one flag to sort by.");

        state.session.toggle_flag("1");
        assert_eq!(idle_hint(&state).0, "Ready to sort with 1 flag. Press s to start.");
        state.session.toggle_flag("2");
        assert_eq!(idle_hint(&state).0, "Ready to sort with 2 flags. Press s to start.");
    }

    #[test]
    fn test_hints_offer_connect_only_when_disconnected() {
        let mut state = state();
        assert!(hints(&state).contains(&("c", "connect Gmail")));
        assert!(!hints(&state).contains(&("s", "sort")));

        state.session.connection = ConnectionState::connected("me@example.com");
        assert!(hints(&state).contains(&("s", "sort")));
        assert!(!hints(&state).contains(&("c", "connect Gmail")));
    }
}
