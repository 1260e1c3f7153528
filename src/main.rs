mod api;
mod app;
mod cli;
mod config;
mod constants;
mod flags;
mod history;
mod input;
mod session;
mod ui;

use anyhow::Result;
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::HttpBackend;
use crate::app::App;
use crate::config::Config;

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flagsort=debug"));

    // The TUI owns the terminal, so logs go to a file in the config directory
    let log_file = Config::config_dir()
        .ok()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .map(|dir| dir.join("flagsort.log"))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"flagsort - Sort your Gmail inbox into flags from the terminal

Usage: flagsort [command]

Commands:
    (none)              Start the dashboard
    login               Connect your Gmail account in the browser
    logout              Disconnect your Gmail account
    status              Show the connection and your flags
    revert [--yes]      Undo the labels applied by the last sorting session
    history             List recent sorting sessions
    details <id>        Show what a sorting session did to each email
    init [--force]      Write the default configuration file
    help                Show this help message

Configuration file: ~/.config/flagsort/config.toml
Environment:        FLAGSORT_BACKEND_URL overrides the backend URL
"#
    );
}

/// Ask on stdin; anything but "y" declines
fn ask_yes_no(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn backend(config: &Config) -> Result<HttpBackend> {
    HttpBackend::new(&config.backend.base_url, config.backend.timeout())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str());

    if matches!(command, Some("help") | Some("--help") | Some("-h")) {
        print_usage();
        return Ok(());
    }

    setup_logging();
    let mut out = io::stdout();

    match command {
        Some("init") => {
            let force = args.get(2).is_some_and(|a| a == "--force");
            cli::init(force, &mut out)
        }
        Some("login") => {
            let config = Config::load()?;
            cli::login(&backend(&config)?, &config, &mut out).await
        }
        Some("logout") => {
            let config = Config::load()?;
            cli::logout(&backend(&config)?, &mut out).await
        }
        Some("status") => {
            let config = Config::load()?;
            cli::status(&backend(&config)?, &config, &mut out).await
        }
        Some("revert") => {
            let yes = args.get(2).is_some_and(|a| a == "--yes" || a == "-y");
            let config = Config::load()?;
            let backend = backend(&config)?;
            cli::revert(
                &backend,
                &config,
                |prompt| if yes { Ok(true) } else { ask_yes_no(prompt) },
                &mut out,
            )
            .await
        }
        Some("history") => {
            let config = Config::load()?;
            cli::history(&backend(&config)?, &mut out).await
        }
        Some("details") => {
            let Some(session_id) = args.get(2) else {
                eprintln!("Missing session id");
                print_usage();
                std::process::exit(1);
            };
            let config = Config::load()?;
            cli::details(&backend(&config)?, session_id, &mut out).await
        }
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
        None => {
            let config = Config::load()?;
            Config::ensure_dirs()?;

            crate::ui::theme::init_theme(config.ui.theme);

            let backend = Arc::new(backend(&config)?);
            tracing::info!("Starting flagsort against {}", backend.base_url());

            let mut app = App::new(config, backend);
            app.run().await
        }
    }
}
