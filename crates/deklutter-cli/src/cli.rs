//! Command-line surface for the Deklutter client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use deklutter_api_models::{DEFAULT_SCAN_LIMIT, LookbackWindow, ScanRequest};
use deklutter_telemetry::{LogFormat, LoggingConfig, command_span, init_logging};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliDependencies, CliError, CliResult, parse_url, resolve_store};
use crate::commands::auth::{handle_capture, handle_login, handle_logout, handle_status};
use crate::commands::scan::{handle_clean, handle_scan};
use crate::commands::session::handle_session;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_API_URL: &str = "https://api.deklutter.co";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    install_logging(&cli);

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let deps = match CliDependencies::from_env(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let telemetry = deps.telemetry.clone();

    let result = dispatch(cli, &deps)
        .instrument(command_span(command_name, &trace_id))
        .await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

fn install_logging(cli: &Cli) {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("DEKLUTTER_BUILD_SHA").unwrap_or("dev"),
    };
    // A subscriber installed by an embedding process takes precedence.
    init_logging(&config).ok();
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let store = resolve_store(cli.state_dir)?;
    let token_path = store.path().to_path_buf();

    let ctx = AppContext {
        client: deps.client.clone(),
        base_url: cli.api_url,
        store: Arc::new(store),
        output: cli.output,
    };

    match cli.command {
        Command::Login(args) => handle_login(&ctx, args).await,
        Command::Capture(args) => handle_capture(&ctx, &args),
        Command::Status => handle_status(&ctx, &token_path),
        Command::Scan(args) => handle_scan(&ctx, args).await,
        Command::Clean(args) => handle_clean(&ctx, args).await,
        Command::Session(args) => handle_session(&ctx, args).await,
        Command::Logout => handle_logout(&ctx),
    }
}

#[derive(Parser)]
#[command(
    name = "deklutter",
    version,
    about = "Scan a mailbox and move clutter to trash"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "DEKLUTTER_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "DEKLUTTER_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "DEKLUTTER_STATE_DIR",
        help = "Directory holding the session token"
    )]
    pub(crate) state_dir: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "DEKLUTTER_LOG_LEVEL",
        default_value = deklutter_telemetry::DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "DEKLUTTER_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "pretty or json (defaults to pretty in debug builds)"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start provider authorization and wait for the redirect.
    Login(LoginArgs),
    /// Store the token carried by a pasted redirect URL.
    Capture(CaptureArgs),
    /// Report whether a session token is stored.
    Status,
    /// Scan recent mail and show the triage.
    Scan(ScanArgs),
    /// Scan, then move the delete set to trash after confirmation.
    Clean(CleanArgs),
    /// Interactive scan/review/clean loop.
    Session(SessionArgs),
    /// Forget the stored session token.
    Logout,
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, default_value = "web", help = "Source tag sent to the init endpoint")]
    pub(crate) source: String,
    #[arg(
        long,
        default_value = DEFAULT_LISTEN_ADDR,
        help = "Loopback address the redirect listener binds to"
    )]
    pub(crate) listen: SocketAddr,
    #[arg(long, default_value = DEFAULT_CALLBACK_PATH)]
    pub(crate) callback_path: String,
    #[arg(long, help = "Print the authorization URL and exit without listening")]
    pub(crate) no_wait: bool,
}

#[derive(Args)]
pub(crate) struct CaptureArgs {
    #[arg(value_parser = parse_url, help = "Redirect URL containing ?token=")]
    pub(crate) url: Url,
}

#[derive(Args, Clone, Copy)]
pub(crate) struct ScanArgs {
    #[arg(
        long,
        value_parser = parse_window,
        default_value = "30",
        help = "Lookback window in days: 7, 30, 90, 180 or 365"
    )]
    pub(crate) days: LookbackWindow,
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=1000),
        default_value_t = DEFAULT_SCAN_LIMIT
    )]
    pub(crate) limit: u32,
}

impl ScanArgs {
    pub(crate) fn request(self) -> CliResult<ScanRequest> {
        ScanRequest::new(self.days, self.limit)
            .ok_or_else(|| CliError::validation("limit must be at least 1"))
    }
}

#[derive(Args)]
pub(crate) struct CleanArgs {
    #[command(flatten)]
    pub(crate) scan: ScanArgs,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args)]
pub(crate) struct SessionArgs {
    #[command(flatten)]
    pub(crate) scan: ScanArgs,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Capture(_) => "capture",
        Command::Status => "status",
        Command::Scan(_) => "scan",
        Command::Clean(_) => "clean",
        Command::Session(_) => "session",
        Command::Logout => "logout",
    }
}

/// Parse a lookback window given as a day count.
pub(crate) fn parse_window(input: &str) -> Result<LookbackWindow, String> {
    let days: u16 = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid day count '{input}'"))?;
    LookbackWindow::try_from(days).map_err(|err| err.to_string())
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_defaults_match_web_client() {
        let cli = Cli::try_parse_from(["deklutter", "scan"]).expect("parse");
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.days, LookbackWindow::Month);
        assert_eq!(args.limit, 100);
        let request = args.request().expect("request");
        assert_eq!(request.days_back.days(), 30);
        assert_eq!(cli.api_url.as_str(), "https://api.deklutter.co/");
        assert_eq!(cli.timeout, 30);
    }

    #[test]
    fn unsupported_window_is_rejected() {
        assert!(Cli::try_parse_from(["deklutter", "scan", "--days", "45"]).is_err());
        assert!(Cli::try_parse_from(["deklutter", "scan", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["deklutter", "scan", "--days", "365"]).is_ok());
    }

    #[test]
    fn parse_window_reports_supported_values() {
        assert_eq!(parse_window(" 7 "), Ok(LookbackWindow::Week));
        let err = parse_window("14").expect_err("unsupported");
        assert!(err.contains("7, 30, 90, 180 or 365"));
        assert!(parse_window("week").is_err());
    }

    #[test]
    fn login_defaults_to_loopback_callback() {
        let cli = Cli::try_parse_from(["deklutter", "login"]).expect("parse");
        let Command::Login(args) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(args.source, "web");
        assert_eq!(args.listen.to_string(), "127.0.0.1:3000");
        assert_eq!(args.callback_path, "/callback");
        assert!(!args.no_wait);
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from([
            "deklutter",
            "clean",
            "--yes",
            "--output",
            "json",
            "--log-format",
            "json",
            "--state-dir",
            "/tmp/deklutter",
        ])
        .expect("parse");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/deklutter")));
        assert!(matches!(cli.command, Command::Clean(CleanArgs { yes: true, .. })));
        assert_eq!(command_label(&cli.command), "clean");
    }
}
