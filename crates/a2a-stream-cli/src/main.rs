//! Command line client for A2A agents that stream over SSE.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use a2a_stream::prelude::*;
use a2a_stream::init_observability;
use clap::{Parser, Subcommand};
use futures::StreamExt as _;

#[derive(Debug, Parser)]
#[command(name = "a2a-stream", version, about = "Stream agent responses over A2A message/stream")]
struct Cli {
    /// JSON-RPC endpoint of the agent.
    #[arg(long, env = "A2A_STREAM_ENDPOINT")]
    endpoint: String,
    /// Bearer access token.
    #[arg(long, env = "A2A_STREAM_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    /// Identity token sent alongside the access token.
    #[arg(long, env = "A2A_STREAM_ID_TOKEN", hide_env_values = true)]
    id_token: Option<String>,
    /// Transport strategy: auto, delegated or fallback.
    #[arg(long, env = "A2A_STREAM_TRANSPORT", default_value = "auto")]
    transport: TransportMode,
    /// Request timeout in seconds.
    #[arg(long, env = "A2A_STREAM_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one message and print events until the task finishes.
    Send {
        text: String,
        /// Continue an existing conversation.
        #[arg(long)]
        context_id: Option<String>,
        /// Print each event as one JSON line.
        #[arg(long)]
        json: bool,
    },
}

fn load_env() {
    let _ = dotenvy::from_path(format!("{}/.env", env!("CARGO_MANIFEST_DIR")));
    let _ = dotenvy::dotenv();
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    init_observability();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_session_expired() => {
            eprintln!("{err}. Refresh the access token and try again.");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StreamError> {
    let mut config = ClientConfig::new(cli.endpoint)
        .timeout(Duration::from_secs(cli.timeout_secs))
        .transport(cli.transport);
    if let Some(token) = cli.access_token {
        config = config.access_token(token);
    }
    if let Some(token) = cli.id_token {
        config = config.id_token(token);
    }
    let mut client = AgentStreamClient::new(config)?;

    match cli.command {
        Command::Send {
            text,
            context_id,
            json,
        } => {
            let mut events = client.send(text, context_id);
            let mut printer = Printer::new(std::io::stdout(), json);
            loop {
                tokio::select! {
                    next = events.next() => match next {
                        Some(event) => {
                            if let Err(e) = printer.print(&event?) {
                                tracing::warn!(error = %e, "stdout closed, aborting stream");
                                client.abort();
                                return Ok(());
                            }
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("interrupted, aborting stream");
                        client.abort();
                    }
                }
            }
            if let Err(e) = printer.finish() {
                tracing::warn!(error = %e, "failed to flush output");
            }
        }
    }
    Ok(())
}

/// Renders events, concatenating appended artifact chunks on one line.
struct Printer<W> {
    out: W,
    json: bool,
    open_line: bool,
}

impl<W: Write> Printer<W> {
    fn new(out: W, json: bool) -> Self {
        Self {
            out,
            json,
            open_line: false,
        }
    }

    fn print(&mut self, event: &ParsedEvent) -> io::Result<()> {
        if self.json {
            serde_json::to_writer(&mut self.out, event)?;
            writeln!(self.out)?;
            return self.out.flush();
        }

        if event.event_type == EventType::Artifact && event.should_append && self.open_line {
            write!(self.out, "{}", event.display_content)?;
        } else {
            if self.open_line {
                writeln!(self.out)?;
            }
            let label = match (&event.artifact_name, &event.source_agent) {
                (Some(name), Some(agent)) => format!("{} {name} @{agent}", event.event_type),
                (Some(name), None) => format!("{} {name}", event.event_type),
                _ => event.event_type.to_string(),
            };
            write!(self.out, "[{label}] {}", event.display_content)?;
        }
        self.open_line = true;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.open_line {
            self.open_line = false;
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}
