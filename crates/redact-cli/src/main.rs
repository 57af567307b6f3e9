//! Interactive driver for the redaction session.
//!
//! A plain line-oriented loop: no rendering or layout beyond stdout lines.
//! Streaming operations are driven through the controller's ticket API so
//! partial progress prints as it arrives.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use redact_core::backend::BackendClient;
use redact_core::config::Config;
use redact_core::models;
use redact_core::session::{Commit, SessionController};
use redact_core::stream::drain_outcome;

#[derive(Parser, Debug)]
#[command(
    name = "redact",
    version,
    about = "Interactive client for an AI-assisted document redaction backend"
)]
struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long, env = "REDACT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Model label for summarize/follow-up requests
    #[arg(long, env = "REDACT_MODEL")]
    model: Option<String>,

    /// List known model labels and exit
    #[arg(long)]
    list_models: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.list_models {
        for label in models::MODEL_LABELS {
            println!("{label}");
        }
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    config.validate()?;

    let (mut ctl, _updates) = SessionController::new(
        BackendClient::new(config.backend_url.as_str()),
        config.model.as_str(),
    );

    println!(
        "redact | backend {} | model {}",
        config.backend_url, config.model
    );
    match ctl.check_keys().await {
        Ok(status) if status.is_unconfigured() => {
            println!("warning: backend has no API keys configured; LLM features will fail");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "could not check backend key status"),
    }
    println!("type 'help' for commands");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }
        if let Err(err) = dispatch(&mut ctl, input).await {
            println!("error: {err}");
        }
    }
    println!("Goodbye!");
    Ok(())
}

async fn dispatch(ctl: &mut SessionController, input: &str) -> Result<()> {
    let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
    let rest = rest.trim();
    match command {
        "help" => print_help(),
        "open" => {
            if rest.is_empty() {
                println!("usage: open <path>");
                return Ok(());
            }
            let bytes =
                std::fs::read(rest).with_context(|| format!("Failed to read {rest}"))?;
            let name = std::path::Path::new(rest)
                .file_name()
                .map_or(rest.to_string(), |n| n.to_string_lossy().to_string());
            ctl.select_file(&name);
            let text = ctl.process_file(bytes).await?;
            println!("--- document ---\n{text}");
        }
        "text" => {
            if rest.is_empty() {
                println!("usage: text <content>");
                return Ok(());
            }
            ctl.enter_pasted_text(rest)?;
            let text = ctl.process_pasted_text().await?;
            println!("--- document ---\n{text}");
        }
        "entities" => {
            let entities = ctl.extract_entities().await?;
            if entities.is_empty() {
                println!("no entities found");
            }
            for (category, values) in &entities {
                println!("{category}: {}", values.join(", "));
            }
        }
        "toggle" => {
            let Some((category, value)) = rest.split_once(' ') else {
                println!("usage: toggle <category> <value>");
                return Ok(());
            };
            let value = value.trim();
            ctl.toggle_entity(category, value);
            let state = if ctl.is_entity_selected(category, value) {
                "selected"
            } else {
                "deselected"
            };
            println!("{category}/{value} {state}");
        }
        "redact" => {
            let redacted = ctl.redact_selected_entities().await?;
            println!("--- redacted ---\n{redacted}");
        }
        "span" => {
            if rest.is_empty() {
                println!("usage: span <text to redact in place>");
                return Ok(());
            }
            let updated = ctl.redact_span(rest).await?;
            println!("--- document ---\n{updated}");
        }
        "summarize" => run_summarize(ctl).await?,
        "ask" => {
            if rest.is_empty() {
                println!("usage: ask <question>");
                return Ok(());
            }
            run_follow_up(ctl, rest).await?;
        }
        "deanon" => {
            if rest.is_empty() {
                println!("usage: deanon <anonymized text>");
                return Ok(());
            }
            let restored = ctl.deanonymize(rest).await?;
            println!("--- restored ---\n{restored}");
        }
        "keys" => {
            let status = ctl.check_keys().await?;
            println!(
                "openai: {} | gemini: {}",
                if status.openai_configured { "configured" } else { "missing" },
                if status.gemini_configured { "configured" } else { "missing" },
            );
        }
        "show" => print_state(ctl),
        "reset" => {
            ctl.reset();
            println!("session reset");
        }
        _ => println!("unknown command '{command}'; type 'help'"),
    }
    Ok(())
}

async fn run_summarize(ctl: &mut SessionController) -> Result<()> {
    let ticket = ctl.begin_summary()?;
    let stream = ctl.open_summary_stream(&ticket).await?;
    let mut printer = StreamPrinter::default();
    let outcome = drain_outcome(stream, |text| {
        if ctl.publish_summary_progress(&ticket, text) == Commit::Applied {
            printer.update(text);
        }
    })
    .await;
    printer.finish();
    ctl.commit_summary(&ticket, outcome)?;
    Ok(())
}

async fn run_follow_up(ctl: &mut SessionController, question: &str) -> Result<()> {
    let ticket = ctl.begin_follow_up(question)?;
    let stream = ctl.open_follow_up_stream(&ticket).await?;
    let mut printer = StreamPrinter::default();
    let outcome = drain_outcome(stream, |text| {
        if ctl.publish_follow_up_progress(&ticket, text) == Commit::Applied {
            printer.update(text);
        }
    })
    .await;
    printer.finish();
    ctl.commit_follow_up(&ticket, outcome)?;
    Ok(())
}

/// Prints a growing display text incrementally: appends the new suffix when
/// the text grew, otherwise starts a fresh line (status overwrites).
#[derive(Default)]
struct StreamPrinter {
    printed: String,
}

impl StreamPrinter {
    fn update(&mut self, display: &str) {
        match display.strip_prefix(self.printed.as_str()) {
            Some(suffix) => print!("{suffix}"),
            None => {
                if !self.printed.is_empty() {
                    println!();
                }
                print!("{display}");
            }
        }
        let _ = std::io::stdout().flush();
        self.printed = display.to_string();
    }

    fn finish(&self) {
        if !self.printed.is_empty() {
            println!();
        }
    }
}

fn print_state(ctl: &SessionController) {
    let store = ctl.store();
    println!("mode: {}", store.input.mode());
    match store.document_text() {
        Some(text) => println!("document ({} chars):\n{text}", text.chars().count()),
        None => println!("document: none"),
    }
    if let Some(redacted) = &store.redacted_text {
        println!("redacted:\n{redacted}");
    }
    if let Some(summary) = &store.summary {
        println!("summary:\n{summary}");
    }
    let mut selected = store
        .selection
        .iter()
        .map(|(category, values)| {
            format!(
                "{category}: {}",
                values.iter().cloned().collect::<Vec<_>>().join(", ")
            )
        })
        .peekable();
    if selected.peek().is_some() {
        println!("selection:");
        for entry in selected {
            println!("  {entry}");
        }
    }
    if store.ledger.len() > 1 {
        println!("conversation:");
        for turn in &store.ledger.turns()[1..] {
            println!("  {:?}: {}", turn.role, turn.content);
        }
    }
}

fn print_help() {
    println!(
        "commands:\n\
         \x20 open <path>          upload a .txt/.pdf file and extract its text\n\
         \x20 text <content>       process pasted text\n\
         \x20 entities             extract entities from the document\n\
         \x20 toggle <cat> <value> toggle an entity in the redaction selection\n\
         \x20 redact               redact the document with the current selection\n\
         \x20 span <text>          redact a literal span in place\n\
         \x20 summarize            stream a summary of the working text\n\
         \x20 ask <question>       stream a follow-up answer about the document\n\
         \x20 deanon <text>        restore previously anonymized text\n\
         \x20 keys                 check backend API key status\n\
         \x20 show                 print session state\n\
         \x20 reset                discard the session\n\
         \x20 quit                 exit"
    );
}
