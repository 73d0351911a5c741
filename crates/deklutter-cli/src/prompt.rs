//! Terminal implementation of the confirmation and notification ports.

use std::io::{self, BufRead, IsTerminal, Write};

use deklutter_session::{ConfirmationPort, NotificationPort};

/// Asks on stderr and reads the answer from stdin.
///
/// Without an interactive stdin the prompt declines unless `--yes` was given.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TerminalPrompt {
    assume_yes: bool,
    interactive: bool,
}

impl TerminalPrompt {
    pub(crate) fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            interactive: io::stdin().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn scripted(interactive: bool) -> Self {
        Self {
            assume_yes: false,
            interactive,
        }
    }

    fn decide(&self, message: &str, input: &mut impl BufRead, out: &mut impl Write) -> bool {
        if self.assume_yes {
            writeln!(out, "{message} [confirmed by --yes]").ok();
            return true;
        }
        if !self.interactive {
            writeln!(out, "{message}").ok();
            writeln!(out, "stdin is not interactive; pass --yes to confirm").ok();
            return false;
        }

        write!(out, "{message} [y/N] ").ok();
        out.flush().ok();
        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read confirmation");
                false
            }
        }
    }
}

impl ConfirmationPort for TerminalPrompt {
    fn ask(&self, message: &str) -> bool {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stderr();
        self.decide(message, &mut input, &mut out)
    }
}

impl NotificationPort for TerminalPrompt {
    fn inform(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
