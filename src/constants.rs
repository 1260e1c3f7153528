//! Application-wide constants for tuning and configuration
//!
//! Centralizes magic numbers to make them discoverable and configurable.
//! Timing values here are the defaults; `config.toml` can override them.

/// Interval between two sorting status checks in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 2000;

/// Delay before the next status check after a failed one, in milliseconds.
pub const POLL_RETRY_DELAY_MS: u64 = 5000;

/// Consecutive failed status checks tolerated before polling gives up.
pub const MAX_POLL_RETRIES: u32 = 3;

/// Debounce delay for saving the flag list to the backend in milliseconds.
/// Each edit restarts the timer, so a burst of toggles produces one save.
pub const SAVE_DEBOUNCE_MS: u64 = 1000;

/// How long the sort completion banner stays visible, in milliseconds.
pub const COMPLETION_DISPLAY_MS: u64 = 4000;

/// Delay after a successful login redirect before re-checking the connection.
/// The backend needs a moment to persist the freshly issued credentials.
pub const AUTH_SETTLE_MS: u64 = 1000;

/// How long to wait for the browser to come back from the login page.
pub const LOGIN_TIMEOUT_SECS: u64 = 120;

/// Default HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Local port the backend redirects to after the login flow.
pub const DEFAULT_REDIRECT_PORT: u16 = 8080;

/// Status message display duration in seconds before auto-dismiss.
pub const STATUS_TTL_SECS: u64 = 5;

/// Number of processing log entries shown in the session details popup.
pub const DETAILS_PREVIEW_LIMIT: usize = 10;

// === UI Constants ===

/// Spinner animation frame duration in milliseconds.
pub const SPINNER_FRAME_MS: u128 = 80;

/// Width of the right-hand column (activity + sessions) in percent.
pub const SIDE_PANEL_PERCENT: u16 = 40;

/// Input poll timeout while a sort is running (keeps the spinner moving).
pub const BUSY_INPUT_POLL_MS: u64 = 50;

/// Input poll timeout while idle.
pub const IDLE_INPUT_POLL_MS: u64 = 150;
