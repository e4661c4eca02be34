// Entrypoint for the CLI application.
// - Parses global flags, sets up logging and loads the app config.
// - Builds the API client and terminal UI once and hands them to the
//   dispatcher through a `Context`; the handler's result is the exit code.

use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tweetpin_cli::api::TwitterClient;
use tweetpin_cli::commands::{Context, Dispatcher, EXIT_DISPATCH};
use tweetpin_cli::config::{AppConfig, CONFIG_FILE};
use tweetpin_cli::credential::{CredentialStore, CREDENTIAL_FILE};
use tweetpin_cli::ui::{TerminalUi, Ui};

/// Command-line client for the platform's REST API.
///
/// Commands:
///   auth                  authenticate using the PIN-based method
///   search                search statuses matching a query
///   post                  post a status
///   followers [account]   list followers page by page
///   user <account>        show an account profile
///
/// Run `tweetpin <command> --help` for details on a command.
#[derive(Parser, Debug)]
#[command(name = "tweetpin", version, verbatim_doc_comment)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    /// App config file (consumer key/secret, proxy)
    #[arg(long, value_name = "FILE", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Stored access credential file
    #[arg(long, value_name = "FILE", default_value = CREDENTIAL_FILE)]
    credentials: PathBuf,

    /// Command name followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

/// Default log filter from -v/-q when RUST_LOG is unset.
fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "warn,tweetpin=debug,tweetpin_cli=debug",
        _ => "trace",
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: u8, quiet: bool) {
    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(verbose, quiet)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let dispatcher = Dispatcher::default();
    let mut ui = TerminalUi::new();

    if cli.command.is_empty() {
        ui.error(&dispatcher.usage());
        std::process::exit(EXIT_DISPATCH);
    }

    // Command help needs neither config nor credential
    if let Some(help) = dispatcher.help(&cli.command) {
        ui.output(help);
        return Ok(());
    }

    let config = AppConfig::load(&cli.config)
        .and_then(|c| c.validate().map(|_| c))
        .with_context(|| {
            format!(
                "fill in {} or set CONSUMER_KEY/CONSUMER_SECRET",
                cli.config.display()
            )
        })?;
    let mut api = TwitterClient::new(&config).context("Failed to build API client")?;
    let store = CredentialStore::new(cli.credentials);
    info!(command = %cli.command[0], "tweetpin starting");

    let code = {
        let mut ctx = Context {
            api: &mut api,
            ui: &mut ui,
            store: &store,
            config: &config,
        };
        dispatcher.run(&mut ctx, &cli.command)
    };
    ui.end_progress();
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, false), "warn");
        assert_eq!(log_filter(3, true), "error");
        assert!(log_filter(1, false).contains("tweetpin_cli=debug"));
        assert_eq!(log_filter(2, false), "trace");
    }

    #[test]
    fn test_command_args_pass_through() {
        let cli = Cli::parse_from(["tweetpin", "-v", "followers", "jack", "--help"]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.command, vec!["followers", "jack", "--help"]);
        assert_eq!(cli.credentials, PathBuf::from("credential.json"));
    }

    #[test]
    fn test_file_flags() {
        let cli = Cli::parse_from([
            "tweetpin",
            "--config",
            "/tmp/c.json",
            "--credentials",
            "/tmp/cred.json",
            "auth",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/c.json"));
        assert_eq!(cli.credentials, PathBuf::from("/tmp/cred.json"));
        assert_eq!(cli.command, vec!["auth"]);
    }

    #[test]
    fn test_command_help_answered_from_args_alone() {
        let cli = Cli::parse_from(["tweetpin", "--config", "/nonexistent/c.json", "user", "--help"]);
        let help = Dispatcher::default().help(&cli.command).unwrap();
        assert!(help.starts_with("Usage: user"));
        assert!(!cli.config.exists());
    }
}
