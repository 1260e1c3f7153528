//! Background render thread
//!
//! The thread owns the terminal and draws `AppState` snapshots sent by the
//! event loop, so a slow terminal never delays input handling or the
//! background request results.

use std::io::{self, Stdout};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use super::state::AppState;

type Term = Terminal<CrosstermBackend<Stdout>>;

pub enum RenderCommand {
    Render(Box<AppState>),
    Shutdown,
}

pub struct RenderThread {
    cmd_tx: SyncSender<RenderCommand>,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Put the terminal into raw/alternate-screen mode and start drawing.
    pub fn spawn() -> io::Result<Self> {
        let terminal = setup_terminal()?;

        // Capacity 1: only the newest snapshot matters
        let (cmd_tx, cmd_rx) = mpsc::sync_channel::<RenderCommand>(1);

        let handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || render_loop(terminal, cmd_rx))?;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
        })
    }

    /// Queue a snapshot without blocking. Returns false when the frame was
    /// skipped because the thread is still drawing the previous one.
    pub fn render(&self, state: AppState) -> bool {
        match self.cmd_tx.try_send(RenderCommand::Render(Box::new(state))) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Render thread busy, skipping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::error!("Render thread disconnected");
                true
            }
        }
    }

    /// Stop drawing and restore the terminal
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(RenderCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        disable_raw_mode().ok();
        return Err(e);
    }
    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            restore_terminal();
            Err(e)
        }
    }
}

fn restore_terminal() {
    disable_raw_mode().ok();
    execute!(io::stdout(), LeaveAlternateScreen).ok();
}

fn render_loop(mut terminal: Term, cmd_rx: mpsc::Receiver<RenderCommand>) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            RenderCommand::Render(state) => {
                if let Err(e) = terminal.draw(|f| crate::ui::render(f, &state)) {
                    tracing::error!("Render error: {}", e);
                }
            }
            RenderCommand::Shutdown => break,
        }
    }

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
}
