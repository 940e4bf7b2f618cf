use std::io;

use anyhow::Result;
use clap::Parser;
use console_core::{ConnectionState, ConsoleClient, ConsoleEvent, TranscriptView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the server hosting the /ws endpoint.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let client = ConsoleClient::new(&args.server_url)?;
    let mut events = client.subscribe_events();
    let mut view = TranscriptView::new(io::stdout());

    println!("WebSocket console for {}", client.endpoint());
    println!("/toggle to connect or disconnect, /status for the current state, /quit to exit");

    // One loop multiplexes user input against controller events, so
    // transcript appends and state changes stay serialized.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ConsoleEvent::Transcript(message)) => view.render(message)?,
                Ok(ConsoleEvent::StateChanged(state)) => print_status(state),
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("-- dropped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" | "/q" => break,
                    "/toggle" | "/t" => client.toggle().await,
                    "/status" => print_status(client.state().await),
                    _ => client.send(&line).await,
                }
            }
        }
    }

    Ok(())
}

fn print_status(state: ConnectionState) {
    let hint = match state {
        ConnectionState::Connected => "type a message to send, /toggle to disconnect",
        ConnectionState::Connecting => "waiting for the server",
        ConnectionState::Disconnected => "/toggle to connect",
    };
    println!("-- {state} ({hint})");
}
