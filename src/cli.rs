use anyhow::Result;
use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "signalpost")]
#[command(about = "WebRTC signaling relay and probe client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to a running relay, join a room, and print the signaling
    /// traffic seen from that seat
    Probe {
        /// Relay URL (e.g., ws://localhost:8080)
        #[arg(short, long, default_value = "ws://localhost:8080")]
        url: String,

        /// Room to join
        #[arg(short, long, default_value = "room1")]
        room: String,
    },
}

pub async fn run_probe(url: String, room: String) -> Result<()> {
    let ws_url = format!("{}/socket", url);
    debug!("Connecting to {}", ws_url);

    let (ws_stream, _) = match timeout(Duration::from_secs(5), connect_async(&ws_url)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => return Err(anyhow::anyhow!("Connection failed: {}", e)),
        Err(_) => {
            return Err(anyhow::anyhow!(
                "Connection timeout - is the relay running?"
            ))
        }
    };
    let (mut write, mut read) = ws_stream.split();

    // The first frame is the relay assigning this connection its id.
    let hello = timeout(Duration::from_secs(5), read.next())
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for clientId"))?
        .ok_or_else(|| anyhow::anyhow!("connection closed before clientId arrived"))??;
    if let Message::Text(text) = &hello {
        println!("<- {}", text);
    }

    let join = json!({ "type": "join", "roomId": room }).to_string();
    println!("-> {}", join);
    write.send(Message::Text(join.into())).await?;

    // Print everything the relay sends us from this seat in the room.
    while let Some(frame) = read.next().await {
        match frame? {
            Message::Text(text) => println!("<- {}", text),
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
