//! Interactive chat loop over a single dialogue session

use anyhow::{Context, Result};
use chat_context::config::AppConfig;
use chat_context::context::{TiktokenTokenizer, Tokenizer};
use chat_context::dialogue::{DialogueSession, OpenAiClient, SessionEvent};
use chat_context::logging;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from(&path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    logging::init(&config.logging).context("Failed to initialize logging")?;

    let tokenizer = match TiktokenTokenizer::for_model(&config.model.model_name) {
        Ok(tokenizer) => tokenizer,
        Err(e) => {
            warn!("{}, falling back to cl100k_base", e);
            TiktokenTokenizer::cl100k()?
        }
    };
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(tokenizer);

    let client = OpenAiClient::new(config.model).context("Failed to build completion client")?;
    info!("Using model {}", client.model());

    let mut session = DialogueSession::new(tokenizer, Arc::new(client), config.context);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"user input: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match session.handle_input(&line).await {
            Ok(SessionEvent::Cleared) => println!("start a new session"),
            Ok(SessionEvent::Reply(reply)) => println!("assistant: {}", reply),
            Err(e) => {
                error!("Request failed: {}", e);
                println!("!!! The API call failed, check the log for details");
            }
        }
    }

    Ok(())
}
