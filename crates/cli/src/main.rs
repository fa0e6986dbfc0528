use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;

use rill_client::{HttpSource, StreamController};
use rill_core::{ENDPOINT_URL, Preferences, init_logging};
use rill_ui::App;

/// rill - a terminal chat client for a streaming text endpoint
#[derive(Parser, Debug)]
#[command(name = "rill")]
#[command(about = "Chat with a streaming generation endpoint from the terminal", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Generation endpoint URL
    #[arg(short, long, value_name = "URL", default_value = ENDPOINT_URL)]
    endpoint: String,

    /// Preferences file (default: the user config directory)
    #[arg(short, long, value_name = "PATH")]
    prefs: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging("warn").context("failed to initialize logging")?;

    let prefs_path = match cli.prefs {
        Some(path) => path,
        None => Preferences::default_path().context("failed to locate preferences")?,
    };
    let prefs = Preferences::load_from(&prefs_path);

    tracing::info!(endpoint = %cli.endpoint, "starting");

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(async {
        let source = Arc::new(HttpSource::new(cli.endpoint));
        let (controller, events) = StreamController::new(source);
        let mut app = App::new(controller, events, prefs, prefs_path);
        app.run().await.context("terminal loop failed")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_endpoint() {
        let cli = Cli::try_parse_from(["rill"]).unwrap();
        assert_eq!(cli.endpoint, ENDPOINT_URL);
        assert!(cli.prefs.is_none());
    }

    #[test]
    fn test_cli_custom_endpoint() {
        let cli = Cli::try_parse_from(["rill", "--endpoint", "http://example.test/gen"]).unwrap();
        assert_eq!(cli.endpoint, "http://example.test/gen");
    }

    #[test]
    fn test_cli_custom_prefs_path() {
        let cli = Cli::try_parse_from(["rill", "--prefs", "/tmp/prefs.toml"]).unwrap();
        assert_eq!(cli.prefs, Some(PathBuf::from("/tmp/prefs.toml")));
    }
}
