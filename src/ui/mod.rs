mod dashboard;
mod popups;
mod status_bar;
pub mod theme;
pub mod widgets;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::widgets::Block;

use crate::app::state::{AppState, ModalState};

/// Draw one frame: the dashboard, then the active modal on top
pub fn render(frame: &mut Frame, state: &AppState) {
    frame.render_widget(Block::default().style(theme::Theme::main_bg()), frame.area());

    dashboard::render_dashboard(frame, state);

    let area = frame.area();
    match &state.modal {
        ModalState::None => {}
        ModalState::Alert { title, message } => popups::render_alert(frame, area, title, message),
        ModalState::ConfirmRevert(request) => popups::render_confirm_revert(frame, area, request),
        ModalState::EditFlag(editor) => popups::render_editor(frame, area, editor),
        ModalState::SessionDetails { session, view } => {
            popups::render_details(frame, area, session, view, state.popup_scroll)
        }
        ModalState::Help { keybindings } => {
            popups::render_help(frame, area, keybindings, state.popup_scroll)
        }
    }
}

/// Creates a centered rect with min/max constraints for width and height.
/// The size prefers the max, shrinks to fit the area, and never drops below the min.
pub fn centered_rect_constrained(
    area: Rect,
    min_width: u16,
    max_width: u16,
    min_height: u16,
    max_height: u16,
) -> Rect {
    let w = max_width.min(area.width.saturating_sub(4)).max(min_width);
    let h = max_height
        .min(area.height.saturating_sub(4))
        .max(min_height);

    let x = area.x + area.width.saturating_sub(w) / 2;
    let y = area.y + area.height.saturating_sub(h) / 2;
    Rect::new(x, y, w.min(area.width), h.min(area.height))
}
