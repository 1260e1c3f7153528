//! Main event loop

use anyhow::Result;
use crossterm::event;
use std::time::{Duration, Instant};

use crate::api::Backend;
use crate::constants::{BUSY_INPUT_POLL_MS, IDLE_INPUT_POLL_MS};
use crate::input::{InputResult, handle_input};

use super::App;
use super::render_thread::RenderThread;

impl<B: Backend> App<B> {
    pub(crate) async fn event_loop(&mut self, render_thread: &RenderThread) -> Result<()> {
        loop {
            // Background results first so input sees fresh state
            if self.process_sort_events() {
                self.dirty = true;
            }
            if self.process_app_events() {
                self.dirty = true;
            }

            if self.tick() {
                self.dirty = true;
            }

            if self.dirty {
                // A skipped frame stays dirty and is retried next iteration
                self.dirty = !render_thread.render(self.state.clone());
            }

            let busy = self.is_busy();
            let poll_timeout = if busy {
                BUSY_INPUT_POLL_MS
            } else {
                IDLE_INPUT_POLL_MS
            };
            // Yield so spawned requests make progress between input polls
            tokio::task::yield_now().await;

            if event::poll(Duration::from_millis(poll_timeout))? {
                let evt = event::read()?;
                // Any input event (including resize) requires re-render
                self.dirty = true;
                match handle_input(evt, &self.state, &self.bindings) {
                    InputResult::Quit => break,
                    InputResult::Action(action) => self.handle_action(action).await,
                    InputResult::Char(c) => self.handle_char(c),
                    InputResult::Backspace => self.handle_backspace(),
                    InputResult::Continue => {}
                }
            } else if busy {
                // Spinner frames advance with time alone
                self.dirty = true;
            }
        }

        Ok(())
    }

    /// Time-based transitions. Returns true if anything visible changed.
    pub(crate) fn tick(&mut self) -> bool {
        let display = self.config.polling.completion_display();
        let banner = self.state.session.expire_banner(Instant::now(), display);
        let status = self.state.clear_status_if_expired();
        banner || status
    }

    fn is_busy(&self) -> bool {
        self.state.session.is_processing() || self.state.status.loading || self.state.login_pending
    }
}
