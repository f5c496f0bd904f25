use std::sync::Arc;

use anyhow::{Context, Result};
use chat_session::escalation::ESCALATION_LABEL;
use chat_session::{
    ChatSession, DisplayEntry, EntryKind, HttpGatewayClient, Rejection, SessionEvent,
    SubmitOutcome,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::info;

/// Terminal chat with the AI assistant, with hand-off to a mentor.
#[derive(Debug, Parser)]
#[command(name = "mentor-chat", version)]
struct Cli {
    /// Gateway chat endpoint (overrides MENTOR_CHAT_GATEWAY_URL).
    #[arg(long)]
    gateway_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = match cli.gateway_url {
        Some(url) => HttpGatewayClient::new(url),
        None => HttpGatewayClient::from_env(),
    }
    .context("Failed to build gateway client")?;
    info!(gateway = %client.url(), "mentor-chat starting");

    let session = Arc::new(ChatSession::new(Arc::new(client)));
    let printer = tokio::spawn(print_events(session.subscribe()));

    println!("Ask a question. /mentor accepts a mentor hand-off, /quit exits.");

    let mut submissions = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = line.trim();
        if command == "/quit" {
            submissions.shutdown().await;
            break;
        } else if command == "/mentor" {
            if !session.accept_escalation() {
                println!("(no mentor hand-off is on offer right now)");
            }
        } else {
            while submissions.try_join_next().is_some() {}
            let session = session.clone();
            submissions.spawn(async move {
                if let SubmitOutcome::Rejected(Rejection::AlreadyAwaiting) =
                    session.submit(&line).await
                {
                    println!("(still waiting for the previous reply)");
                }
            });
        }
    }

    // Replies still in flight at end of input are printed before exiting.
    while let Some(joined) = submissions.join_next().await {
        joined.context("Submission task failed")?;
    }

    // Dropping the last handle closes the event channel once the printer has
    // drained it.
    drop(session);
    printer.await.context("Event printer failed")?;
    Ok(())
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(SessionEvent::TurnAppended(turn)) => {
                let entry = DisplayEntry::from_turn(&turn);
                match entry.kind {
                    EntryKind::User => {}
                    EntryKind::Loading => println!("ai> …"),
                    EntryKind::Assistant => println!("ai> {}", entry.text),
                }
            }
            Ok(SessionEvent::PendingResolved { turn }) => println!("ai> {}", turn.text),
            Ok(SessionEvent::EscalationOffered) => {
                println!("[{ESCALATION_LABEL}] type /mentor");
            }
            Ok(SessionEvent::EscalationAccepted) => {}
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}
