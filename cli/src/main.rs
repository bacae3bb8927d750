//! CLI entrypoint for action-dispatch
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use dispatch_application::{
    AuditLogger, AutoApproveConfirmation, AutoRejectConfirmation, ConfirmationPort,
    ConversationRepository, Dispatcher, InvocationScope, NoAuditLogger, PlannerCall,
    ReplayHistoryUseCase, RunInvocationUseCase, ToolAdapter,
};
use dispatch_domain::{
    ConfigIssue, ConversationThread, InvocationStatus, OutputFormat, ToolCallId,
};
use dispatch_infrastructure::{
    ConfigLoader, ConfirmationBroker, FileConfig, InMemoryConversationRepository, InMemoryLedger,
    JsonDirConversationRepository, JsonSchemaConverter, JsonlAuditLogger, builtin_registry,
};
use dispatch_presentation::{
    Cli, Command, ConsoleConfirmation, OutputFormatter, ThreadSummary, formatter_for,
    set_color_enabled,
};
use serde_json::Value;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Opening balance of the configured wallet on the demo ledger.
const DEMO_BALANCE: &str = "100";

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(async {
        match run(cli).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("error: {:#}", e);
                ExitCode::FAILURE
            }
        }
    });
    // A console prompt may still be blocked on stdin after a cancel.
    runtime.shutdown_background();
    code
}

/// Initialize tracing: stderr always, plus a non-blocking file writer when
/// `[logging] file` is set. `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("[logging] file has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!("failed to load configuration: {}", e))
}

fn report_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        eprintln!("{}", issue);
    }
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("Configuration sources (highest priority first):");
    println!("  [x] Environment (ACTION_DISPATCH_<SECTION>__<KEY>)");
    for source in ConfigLoader::sources(cli.config.as_deref()) {
        let mark = if source.found { "x" } else { " " };
        println!("  [{}] {}: {}", mark, source.label, source.path.display());
    }
    println!();
    println!("Effective configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

async fn open_repository(config: &FileConfig) -> Result<Arc<dyn ConversationRepository>> {
    match config.storage.resolved_threads_dir() {
        Some(dir) => {
            info!("Storing threads in {}", dir.display());
            Ok(Arc::new(JsonDirConversationRepository::open(dir).await?))
        }
        None => {
            info!("Storing threads in memory");
            Ok(Arc::new(InMemoryConversationRepository::new()))
        }
    }
}

fn confirmation_port(yes: bool) -> Arc<dyn ConfirmationPort> {
    if yes {
        Arc::new(AutoApproveConfirmation)
    } else if std::io::stdin().is_terminal() {
        let (broker, requests) = ConfirmationBroker::with_notifier();
        let broker = Arc::new(broker);
        let responder = Arc::clone(&broker);
        tokio::spawn(async move {
            ConsoleConfirmation::new()
                .serve(requests, |tool_call_id, decision| match decision {
                    Ok(decision) => {
                        // the request may have been withdrawn while the prompt was open
                        if let Err(e) = responder.respond(tool_call_id, decision) {
                            debug!("Answer dropped: {}", e);
                        }
                    }
                    Err(e) => {
                        debug!(tool_call_id = %tool_call_id, "Prompt ended without an answer: {}", e);
                        responder.cancel(tool_call_id);
                    }
                })
                .await;
        });
        broker as Arc<dyn ConfirmationPort>
    } else {
        warn!("stdin is not a terminal; confirmation-gated actions will be rejected");
        Arc::new(AutoRejectConfirmation)
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let _guard = init_tracing(cli.verbose, config.logging.file.as_deref())?;

    if cli.show_config {
        show_config(&cli, &config)?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let issues = config.validate();
    report_issues(&issues);
    let policy = config.dispatch_policy()?;

    let format = config.output.resolve_format(cli.format.map(OutputFormat::from));
    set_color_enabled(config.output.use_color(cli.no_color, format));
    let formatter = formatter_for(format);

    // === Dependency Injection ===
    let caller = config.context.to_caller();
    let mut ledger = InMemoryLedger::new();
    if let Some(wallet) = &caller.wallet_address {
        ledger = ledger.with_balance(wallet, DEMO_BALANCE)?;
    }
    let registry = Arc::new(builtin_registry(Arc::new(ledger))?);

    let audit: Arc<dyn AuditLogger> = match config.logging.audit_log.as_deref() {
        Some(path) => match JsonlAuditLogger::new(path) {
            Some(logger) => Arc::new(logger),
            None => Arc::new(NoAuditLogger),
        },
        None => Arc::new(NoAuditLogger),
    };
    let repository = open_repository(&config).await?;

    let yes = matches!(command, Command::Call { yes: true, .. });
    let dispatcher = Dispatcher::new(registry, confirmation_port(yes))
        .with_policy(policy)
        .with_audit_logger(Arc::clone(&audit));

    info!("Starting action-dispatch ({})", config.dispatch.mode);

    match command {
        Command::Tools { schema } => {
            let adapter = ToolAdapter::new(&dispatcher, &JsonSchemaConverter);
            print!("{}", with_newline(formatter.tools(adapter.tools(), schema)));
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            name,
            args,
            thread,
            tool_call_id,
            yes: _,
        } => {
            let args: Value = serde_json::from_str(&args).context("--args must be valid JSON")?;
            if !args.is_object() {
                bail!("--args must be a JSON object");
            }

            let thread_id = match thread {
                Some(id) => repository.load_thread(&id).await?.thread_id,
                None => {
                    let thread = ConversationThread::new(caller.user_id.clone());
                    let id = thread.thread_id.clone();
                    repository.create_thread(thread).await?;
                    id
                }
            };

            let use_case = Arc::new(
                RunInvocationUseCase::new(dispatcher, Arc::clone(&repository))
                    .with_audit_logger(audit),
            );
            let message_id = use_case.start_assistant_message(&thread_id, "").await?;
            let scope = InvocationScope {
                thread_id: thread_id.clone(),
                message_id,
                caller,
                network: config.context.network.clone(),
            };
            let call = PlannerCall::new(
                tool_call_id.map(ToolCallId::new).unwrap_or_else(ToolCallId::generate),
                name,
                args,
            );

            // Ctrl-C resolves a pending confirmation to `cancelled`.
            {
                let use_case = Arc::clone(&use_case);
                let thread_id = thread_id.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        use_case.cancel_runs(&thread_id);
                    }
                });
            }

            use_case.propose(&scope, &call).await?;
            let outcome = use_case.run(&scope, call).await?;
            print!("{}", with_newline(formatter.call(&thread_id, &outcome)));

            Ok(match outcome.result.status() {
                InvocationStatus::Success => ExitCode::SUCCESS,
                InvocationStatus::Error => ExitCode::from(1),
                InvocationStatus::Cancelled => ExitCode::from(2),
            })
        }
        Command::History { thread_id } => {
            let history = ReplayHistoryUseCase::new(repository).execute(&thread_id).await?;
            print!("{}", with_newline(formatter.history(&history)));
            Ok(ExitCode::SUCCESS)
        }
        Command::Threads { user } => {
            let threads = repository.list_threads(user.as_deref()).await?;
            let summaries: Vec<ThreadSummary> = threads.iter().map(ThreadSummary::from).collect();
            print!("{}", with_newline(formatter.threads(&summaries)));
            Ok(ExitCode::SUCCESS)
        }
        Command::Close { thread_id } => {
            RunInvocationUseCase::new(dispatcher, repository)
                .with_audit_logger(audit)
                .close_thread(&thread_id)
                .await?;
            println!("Closed thread {}", thread_id);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
