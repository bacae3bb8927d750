//! Console output formatter

use super::formatter::{OutputFormatter, ThreadSummary};
use colored::{ColoredString, Colorize};
use dispatch_application::{InvocationOutcome, InvocationSummary, PlannerTool, ThreadHistory};
use dispatch_domain::core::string::truncate;
use dispatch_domain::{InvocationState, InvocationStatus};

/// Formats command results for terminal display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    fn header(title: &str) -> String {
        let line = "═".repeat(60);
        format!("{}\n  {}\n{}\n", line.cyan(), title.cyan().bold(), line.cyan())
    }

    fn status(status: Option<InvocationStatus>, state: InvocationState) -> ColoredString {
        match status {
            Some(InvocationStatus::Success) => "success".green().bold(),
            Some(InvocationStatus::Error) => "error".red().bold(),
            Some(InvocationStatus::Cancelled) => "cancelled".yellow().bold(),
            None => state.as_str().dimmed(),
        }
    }

    fn invocation_line(summary: &InvocationSummary) -> String {
        let mut line = format!(
            "  {} {} {} {}",
            "▸".dimmed(),
            summary.tool_name.bold(),
            Self::status(summary.status, summary.state),
            format!("[{}]", summary.tool_call_id).dimmed(),
        );
        if let Some(code) = &summary.error_code {
            line.push_str(&format!(" {}", code.red()));
        }
        if let Some(message) = &summary.message {
            line.push_str(&format!("\n      {}", truncate(message, 100)));
        }
        line
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn tools(&self, tools: &[PlannerTool], schema: bool) -> String {
        let mut output = Self::header("Available Actions");
        for tool in tools {
            let mut flags = Vec::new();
            if tool.requires_confirmation {
                flags.push("confirm".yellow().to_string());
            }
            if !tool.is_executable() {
                flags.push("client-side".dimmed().to_string());
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };

            output.push_str(&format!("\n{}{}\n", tool.id.green().bold(), flags));
            output.push_str(&format!("  {}\n", tool.description));
            if schema {
                let pretty = serde_json::to_string_pretty(&tool.parameters).unwrap_or_default();
                for line in pretty.lines() {
                    output.push_str(&format!("    {}\n", line.dimmed()));
                }
            }
        }
        output
    }

    fn call(&self, thread_id: &str, outcome: &InvocationOutcome) -> String {
        let result = &outcome.result;
        let record = &outcome.record;
        let mut output = String::new();

        let status = Self::status(Some(result.status()), record.state());
        output.push_str(&format!("{} {}\n", record.tool_name().bold(), status));
        output.push_str(&format!("{}\n", result.message()));

        if let Some(error) = result.error() {
            output.push_str(&format!("{} {}\n", "Code:".cyan(), error.code.red()));
            if let Some(details) = &error.details {
                output.push_str(&format!("{} {}\n", "Details:".cyan(), details));
            }
        }
        if let Some(data) = result.data() {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_default();
            output.push_str(&format!("{}\n{}\n", "Data:".cyan(), pretty));
        }

        output.push_str(&format!(
            "{}\n",
            format!("thread {} · tool call {}", thread_id, record.tool_call_id()).dimmed()
        ));
        output
    }

    fn history(&self, history: &ThreadHistory) -> String {
        let mut output = Self::header(&format!("Thread {}", history.thread_id));
        let state = if history.is_active {
            "active".green()
        } else {
            "closed".dimmed()
        };
        output.push_str(&format!("{} {} · {}\n", "Owner:".cyan(), history.user_id, state));

        for entry in &history.entries {
            output.push_str(&format!(
                "\n{} {}\n",
                format!("[{}]", entry.created_at.format("%Y-%m-%d %H:%M:%S")).dimmed(),
                entry.role.as_str().yellow().bold(),
            ));
            if !entry.content.is_empty() {
                output.push_str(&format!("  {}\n", entry.content));
            }
            for invocation in &entry.invocations {
                output.push_str(&Self::invocation_line(invocation));
                output.push('\n');
            }
        }

        let stats = &history.stats;
        output.push_str(&format!(
            "\n{} {} total, {} succeeded, {} failed, {} cancelled, {} open\n",
            "Invocations:".cyan().bold(),
            stats.total,
            stats.succeeded.to_string().green(),
            stats.failed.to_string().red(),
            stats.cancelled.to_string().yellow(),
            stats.open,
        ));
        output
    }

    fn threads(&self, threads: &[ThreadSummary]) -> String {
        if threads.is_empty() {
            return format!("{}\n", "No threads recorded.".dimmed());
        }
        let mut output = String::new();
        for thread in threads {
            let state = if thread.is_active {
                "active".green()
            } else {
                "closed".dimmed()
            };
            output.push_str(&format!(
                "{}  {}  {}  {} message(s), {} invocation(s)\n",
                thread.thread_id.bold(),
                thread.user_id,
                state,
                thread.messages,
                thread.invocations,
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_domain::{
        ConversationMessage, ConversationThread, InvocationError, InvocationResult,
        InvocationUpdate, ToolInvocationRecord,
    };
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    fn record(result: InvocationResult) -> ToolInvocationRecord {
        let mut record =
            ToolInvocationRecord::open(InvocationUpdate::call("c1", "transfer", json!({"amount": "9"})))
                .unwrap();
        record
            .apply(InvocationUpdate::result("c1", "transfer", result))
            .unwrap();
        record
    }

    #[test]
    fn test_call_shows_error_code() {
        plain();
        let result = InvocationResult::failure(
            InvocationError::new("INSUFFICIENT_FUNDS", "Insufficient funds: 1 S available")
                .with_details(json!({"available": "1"})),
        );
        let outcome = InvocationOutcome {
            record: record(result.clone()),
            result,
        };

        let text = ConsoleFormatter.call("t-1", &outcome);
        assert!(text.contains("transfer error"));
        assert!(text.contains("Code: INSUFFICIENT_FUNDS"));
        assert!(text.contains("thread t-1 · tool call c1"));
    }

    #[test]
    fn test_history_lists_invocations_and_stats() {
        plain();
        let mut thread = ConversationThread::with_id("t-9", "alice");
        thread.append(ConversationMessage::assistant("on it").with_id("m-1")).unwrap();
        thread
            .upsert_tail_invocation("m-1", InvocationUpdate::call("c1", "transfer", json!({})))
            .unwrap();
        thread
            .upsert_tail_invocation(
                "m-1",
                InvocationUpdate::result("c1", "transfer", InvocationResult::cancelled("Rejected by user")),
            )
            .unwrap();

        let text = ConsoleFormatter.history(&ThreadHistory::from_thread(&thread));
        assert!(text.contains("Thread t-9"));
        assert!(text.contains("transfer cancelled [c1]"));
        assert!(text.contains("Rejected by user"));
        assert!(text.contains("1 total, 0 succeeded, 0 failed, 1 cancelled, 0 open"));
    }

    #[test]
    fn test_empty_thread_listing() {
        plain();
        assert_eq!(ConsoleFormatter.threads(&[]), "No threads recorded.\n");
    }
}
