//! Non-interactive subcommands
//!
//! Each command writes plain text to the given writer so it can be tested
//! against a [`FakeBackend`](crate::api::fake::FakeBackend).

use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;

use crate::api::{Backend, SessionDetails, SortSession};
use crate::config::Config;
use crate::constants::LOGIN_TIMEOUT_SECS;
use crate::flags::Flag;
use crate::session::{
    ConnectionProbe, FlagSource, GateOutcome, LoginResult, RedirectListener, RevertOutcome,
    Session, check_connection, complete_login, execute_revert,
};
use crate::ui::widgets::format_backend_time;

/// Email of the connected account, or an error telling the user to log in
async fn require_email<B: Backend>(backend: &B) -> Result<String> {
    let status = backend
        .auth_status()
        .await
        .context("Could not reach the backend")?;
    match status.email {
        Some(email) if status.is_connected && !email.is_empty() => Ok(email),
        _ => anyhow::bail!("Gmail is not connected. Run 'flagsort login' first."),
    }
}

pub async fn login<B: Backend>(backend: &B, config: &Config, out: &mut impl Write) -> Result<()> {
    let listener = RedirectListener::bind(config.backend.redirect_port).await?;
    let url = backend.login_url();

    writeln!(out, "Opening {} in your browser...", url)?;
    if let Err(e) = open::that(&url) {
        tracing::warn!("Failed to open browser: {}", e);
        writeln!(out, "Could not open a browser. Visit the URL above to continue.")?;
    }
    writeln!(out, "Waiting for the login to finish...")?;
    out.flush()?;

    let redirect = listener
        .wait(Duration::from_secs(LOGIN_TIMEOUT_SECS))
        .await?;
    let result = complete_login(backend, redirect, config.sync.auth_settle(), &config.flags).await;
    report_login(result, out)
}

fn report_login(result: LoginResult, out: &mut impl Write) -> Result<()> {
    match result {
        LoginResult::Checked(ConnectionProbe::Connected { email, .. }) => {
            writeln!(out, "Connected as {}", email)?;
            Ok(())
        }
        LoginResult::Checked(ConnectionProbe::Disconnected) => {
            anyhow::bail!("Login finished but the backend reports no connected account")
        }
        LoginResult::Checked(ConnectionProbe::Unreachable(e)) => {
            Err(e).context("Login finished but the backend could not be reached")
        }
        LoginResult::Rejected(message) => anyhow::bail!("Connection failed: {}", message),
    }
}

pub async fn logout<B: Backend>(backend: &B, out: &mut impl Write) -> Result<()> {
    backend.logout().await.context("Logout failed")?;
    writeln!(out, "Disconnected")?;
    Ok(())
}

pub async fn status<B: Backend>(backend: &B, config: &Config, out: &mut impl Write) -> Result<()> {
    let mut session = Session::new(config.flags.clone());
    match check_connection(backend, &mut session).await {
        GateOutcome::Connected { email, source, .. } => {
            writeln!(out, "Connected as {}", email)?;
            if source == FlagSource::Fallback {
                writeln!(out, "Could not load your flags, showing the defaults")?;
            }
            writeln!(out)?;
            for flag in session.flags.flags() {
                writeln!(out, "{}", format_flag_line(flag))?;
            }
        }
        GateOutcome::Disconnected => writeln!(out, "Gmail not connected")?,
        GateOutcome::Unreachable(e) => anyhow::bail!("Could not reach the backend: {}", e),
    }
    Ok(())
}

/// Revert the last completed sort. `confirm` sees the prompt and decides.
pub async fn revert<B: Backend>(
    backend: &B,
    config: &Config,
    confirm: impl FnOnce(&str) -> Result<bool>,
    out: &mut impl Write,
) -> Result<()> {
    let mut session = Session::new(config.flags.clone());
    if let GateOutcome::Unreachable(e) = check_connection(backend, &mut session).await {
        anyhow::bail!("Could not reach the backend: {}", e);
    }
    let request = session.prepare_revert()?;

    if !confirm(&request.prompt())? {
        writeln!(out, "Revert cancelled")?;
        return Ok(());
    }

    match execute_revert(backend, &mut session, request.confirm()).await {
        RevertOutcome::Reverted { message, .. } => {
            if let Some(email) = session.sync_target()
                && let Err(e) = backend.save_flags(email, session.flags.flags()).await
            {
                tracing::warn!("Failed to save flags after revert: {}", e);
            }
            writeln!(out, "{}", message)?;
            Ok(())
        }
        RevertOutcome::Failed(failure) => anyhow::bail!(failure.message()),
    }
}

pub async fn history<B: Backend>(backend: &B, out: &mut impl Write) -> Result<()> {
    let email = require_email(backend).await?;
    let sessions = backend
        .sort_history(&email)
        .await
        .context("Failed to load sorting history")?;

    if sessions.is_empty() {
        writeln!(out, "No sorting sessions yet")?;
    }
    for session in &sessions {
        writeln!(out, "{}", format_session_line(session))?;
    }
    Ok(())
}

pub async fn details<B: Backend>(
    backend: &B,
    session_id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let details = backend
        .session_details(session_id)
        .await
        .with_context(|| format!("Failed to load session {}", session_id))?;
    write_details(&details, out)
}

fn write_details(details: &SessionDetails, out: &mut impl Write) -> Result<()> {
    let log = &details.processing_log;
    writeln!(out, "{} emails processed", log.len())?;
    for entry in log {
        let status = entry.status.as_deref().unwrap_or("-");
        writeln!(out, "  [{}] {} -> {}", status, entry.subject(), entry.label())?;
        if let Some(error) = entry.error_details.as_deref().filter(|e| !e.is_empty()) {
            writeln!(out, "      {}", error)?;
        }
    }
    Ok(())
}

/// Write the default config file. An existing file is kept unless `force`.
pub fn init(force: bool, out: &mut impl Write) -> Result<()> {
    let path = Config::config_path()?;
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use 'flagsort init --force' to overwrite.",
            path.display()
        );
    }
    Config::default().save_to(&path)?;
    writeln!(out, "Wrote default configuration to {}", path.display())?;
    Ok(())
}

fn format_flag_line(flag: &Flag) -> String {
    let check = if flag.is_active { "[x]" } else { "[ ]" };
    if flag.description.is_empty() {
        format!("{} {}", check, flag.name)
    } else {
        format!("{} {} - {}", check, flag.name, flag.description)
    }
}

fn format_session_line(session: &SortSession) -> String {
    let flags = if session.flags_used.is_empty() {
        "-".to_string()
    } else {
        session.flags_used.join(", ")
    };
    format!(
        "{}  {:<9}  {}  {}/{} emails  {}  [{}]",
        session.session_id,
        session.status.label(),
        format_backend_time(session.start_time.as_deref()),
        session.processed_emails,
        session.total_emails,
        session.duration_label(),
        flags
    )
}
