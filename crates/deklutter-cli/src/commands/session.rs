//! Interactive loop over a single workflow controller.
//!
//! Keeping one controller alive lets the user retry a failed scan or cleanup
//! without signing in again, and keeps a failed cleanup's triage available
//! for another attempt.

use std::io::{self, Write};

use anyhow::anyhow;
use deklutter_api_models::LookbackWindow;
use deklutter_session::{CleanupOutcome, WorkflowController};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::cli::{OutputFormat, ScanArgs, SessionArgs, parse_window};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::scan::run_scan;
use crate::output::{render_cleanup, render_scan};
use crate::prompt::TerminalPrompt;

const HELP: &str = "commands: scan [7|30|90|180|365], clean, show, logout, help, quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Scan(Option<LookbackWindow>),
    Clean,
    Show,
    Logout,
    Help,
    Quit,
}

pub(crate) fn parse_session_command(line: &str) -> Result<SessionCommand, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let argument = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments; {HELP}"));
    }

    match (command.as_str(), argument) {
        ("scan", days) => days.map(parse_window).transpose().map(SessionCommand::Scan),
        ("clean", None) => Ok(SessionCommand::Clean),
        ("show", None) => Ok(SessionCommand::Show),
        ("logout", None) => Ok(SessionCommand::Logout),
        ("help" | "?", None) => Ok(SessionCommand::Help),
        ("quit" | "exit", None) => Ok(SessionCommand::Quit),
        (other, _) => Err(format!("unknown command '{other}'; {HELP}")),
    }
}

pub(crate) async fn handle_session(ctx: &AppContext, args: SessionArgs) -> CliResult<()> {
    let mut controller = ctx.controller(TerminalPrompt::new(args.yes))?;
    let input = BufReader::new(tokio::io::stdin());
    run_session(&mut controller, ctx.output, args.scan, input).await
}

pub(crate) async fn run_session(
    controller: &mut WorkflowController,
    output: OutputFormat,
    defaults: ScanArgs,
    input: impl AsyncBufRead + Unpin,
) -> CliResult<()> {
    eprintln!("{HELP}");
    let mut window = defaults.days;
    let mut lines = input.lines();

    loop {
        eprint!("deklutter> ");
        io::stderr().flush().ok();
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to read command: {err}")))?
        else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_session_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        tracing::debug!(?command, phase = %controller.phase(), "session command");

        match command {
            SessionCommand::Scan(days) => {
                let args = ScanArgs {
                    days: days.unwrap_or(window),
                    limit: defaults.limit,
                };
                window = args.days;
                match run_scan(controller, args).await {
                    Ok(result) => render_scan(result, window, output)?,
                    Err(err) => eprintln!("error: {}", err.display_message()),
                }
            }
            SessionCommand::Clean => match controller.confirm_cleanup().await {
                Ok(outcome) => {
                    render_cleanup(&outcome, output)?;
                    if let CleanupOutcome::Failed { message } = &outcome {
                        eprintln!("error: {message}");
                    }
                }
                Err(err) => eprintln!("{err}"),
            },
            SessionCommand::Show => {
                eprintln!("state: {}", controller.phase());
                if let Some(message) = controller.state().error_message() {
                    eprintln!("last error: {message}");
                }
                match controller.state().result() {
                    Some(result) => render_scan(result, window, output)?,
                    None => eprintln!("no triage to show; run `scan` first"),
                }
            }
            SessionCommand::Logout => {
                controller.logout().map_err(CliError::workflow)?;
                println!("Signed out.");
                return Ok(());
            }
            SessionCommand::Help => eprintln!("{HELP}"),
            SessionCommand::Quit => return Ok(()),
        }
    }
    Ok(())
}
