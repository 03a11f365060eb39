//! Search assistant in the terminal.

mod terminal;

use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assistant_core::{AgentError, CredentialProvider, Session, Shell};
use assistant_runtime::{AssistantConfig, open_shell};

use crate::terminal::{StdinPrompt, TerminalSink};

#[derive(Parser)]
#[command(name = "assistant", version, about = "Tool-augmented search assistant (arXiv + web)")]
struct Cli {
    /// Model id (overrides ASSISTANT_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Iteration cap per question (overrides ASSISTANT_MAX_ITERATIONS).
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Hide the agent's intermediate reasoning.
    #[arg(long)]
    quiet: bool,

    /// Ask a single question and exit.
    #[arg(long, short)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so they never mix with answers
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AssistantConfig::from_env();
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(max) = cli.max_iterations {
        config.max_iterations = max;
    }

    let sink = TerminalSink::new(!cli.quiet);
    let shell = match open_shell(&config, &CredentialProvider::groq(), &StdinPrompt, &sink) {
        Ok(shell) => shell,
        Err(AgentError::MissingCredential(_)) => return Ok(ExitCode::from(1)),
        Err(e) => return Err(e.into()),
    };

    let mut session = Session::new(config.memory_config());

    if let Some(query) = cli.query {
        ask(&shell, &mut session, &query, &sink).await;
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!("Ask a question. /history replays the conversation, /quit exits.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("you> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                shell.replay(&session, &TerminalSink::new(false).echoing_user());
                continue;
            }
            _ => {}
        }

        ask(&shell, &mut session, &line, &sink).await;
    }

    tracing::info!(
        session_id = %session.id,
        turns = session.turn_count(),
        "Session ended"
    );
    Ok(ExitCode::SUCCESS)
}

/// Run one submission. Failures are already shown as a warning and an
/// assistant turn, so they only end up in the debug log.
async fn ask(shell: &Shell, session: &mut Session, text: &str, sink: &TerminalSink) {
    if let Err(e) = shell.on_submit(session, text, sink).await {
        tracing::debug!(error = %e, "Submission failed");
    }
}
