//! Interactive confirmation for fund-moving actions.
//!
//! The console answers requests parked in a confirmation broker: each
//! request arriving on the broker's notifier is rendered on stderr, so
//! `--format json` output on stdout stays machine-readable.
//!
//! ```text
//! ═══════════════════════════════════════════════════════════════
//!   Confirmation Required: transfer
//! ═══════════════════════════════════════════════════════════════
//!
//! Confirm 'transfer' with to=0x…, amount=1.5?
//!
//! Arguments:
//!   amount: "1.5"
//!   to: "0x4444…"
//!
//! Accept? [y/N]
//! ```
//!
//! | Input | Decision |
//! |-------|----------|
//! | `y`, `yes`, `a`, `accept` | accept |
//! | `n`, `no`, `r`, `reject`, `q` | reject |
//!
//! End of input counts as a cancellation.

use colored::Colorize;
use dispatch_application::ports::confirmation::{
    ConfirmationDecision, ConfirmationError, ConfirmationRequest,
};
use dispatch_domain::ToolCallId;
use dispatch_domain::core::string::truncate;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

/// Map a line of user input to a decision. `None` means "ask again".
pub fn parse_decision(input: &str) -> Option<ConfirmationDecision> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "a" | "accept" => Some(ConfirmationDecision::Accept),
        "n" | "no" | "r" | "reject" | "q" => Some(ConfirmationDecision::Reject),
        _ => None,
    }
}

fn io_error(context: &str, e: io::Error) -> ConfirmationError {
    ConfirmationError::Unavailable(format!("{}: {}", context, e))
}

/// Terminal front-end for pending confirmations.
pub struct ConsoleConfirmation;

impl ConsoleConfirmation {
    pub fn new() -> Self {
        Self
    }

    fn render(request: &ConfirmationRequest) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("{}\n", RULE.yellow().bold()));
        out.push_str(&format!(
            "{}\n",
            format!("  Confirmation Required: {}", request.action).yellow().bold()
        ));
        out.push_str(&format!("{}\n\n", RULE.yellow().bold()));
        out.push_str(&format!("{}\n\n", request.message));

        if let Some(args) = request.args.as_object()
            && !args.is_empty()
        {
            out.push_str(&format!("{}\n", "Arguments:".cyan().bold()));
            for (key, value) in args {
                out.push_str(&format!("  {}: {}\n", key, truncate(&value.to_string(), 80)));
            }
            out.push('\n');
        }
        out
    }

    /// Ask until the answer parses. `Cancelled` at end of input.
    pub fn ask(
        request: &ConfirmationRequest,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<ConfirmationDecision, ConfirmationError> {
        write!(output, "{}", Self::render(request)).map_err(|e| io_error("Failed to write prompt", e))?;

        loop {
            write!(output, "{} ", "Accept? [y/N]".magenta().bold())
                .and_then(|_| output.flush())
                .map_err(|e| io_error("Failed to write prompt", e))?;

            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|e| io_error("Failed to read input", e))?;
            if read == 0 {
                let _ = writeln!(output);
                return Err(ConfirmationError::Cancelled);
            }

            let decision = match parse_decision(&line) {
                Some(decision) => decision,
                None if line.trim().is_empty() => ConfirmationDecision::Reject,
                None => {
                    writeln!(output, "{} Unknown answer: {}", "⚠️".yellow(), line.trim().red())
                        .and_then(|_| writeln!(output, "Answer y (accept) or n (reject)."))
                        .map_err(|e| io_error("Failed to write prompt", e))?;
                    continue;
                }
            };
            let note = match decision {
                ConfirmationDecision::Accept => "✓ Accepted".green(),
                ConfirmationDecision::Reject => "✗ Rejected".red(),
            };
            writeln!(output, "{}", note).map_err(|e| io_error("Failed to write prompt", e))?;
            return Ok(decision);
        }
    }

    /// Prompt on the terminal (stdin / stderr) without blocking the runtime.
    pub async fn prompt(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationDecision, ConfirmationError> {
        let request = request.clone();
        tokio::task::spawn_blocking(move || {
            Self::ask(&request, &mut io::stdin().lock(), &mut io::stderr())
        })
        .await
        .map_err(|e| ConfirmationError::Unavailable(e.to_string()))?
    }

    /// Answer requests one at a time until the sender side closes.
    ///
    /// `answer` receives the decision, or the error that ended the prompt.
    pub async fn serve<F>(&self, mut requests: mpsc::UnboundedReceiver<ConfirmationRequest>, answer: F)
    where
        F: Fn(&ToolCallId, Result<ConfirmationDecision, ConfirmationError>),
    {
        while let Some(request) = requests.recv().await {
            let decision = self.prompt(&request).await;
            answer(&request.tool_call_id, decision);
        }
    }
}

impl Default for ConsoleConfirmation {
    fn default() -> Self {
        Self::new()
    }
}
