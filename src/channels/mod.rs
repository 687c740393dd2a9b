mod discord;
mod traits;

pub use discord::DiscordTransport;
pub use traits::{BotIdentity, ChatTransport, HistoryMessage, InboundMessage};

use crate::config::Config;
use crate::engine::Engine;
use crate::providers::{GeminiGenerator, TextGenerator};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

const MESSAGE_BUS_CAPACITY: usize = 100;
const LISTENER_INITIAL_BACKOFF_SECS: u64 = 2;
const LISTENER_MAX_BACKOFF_SECS: u64 = 300;

/// Keep a transport listener alive: restart it whenever it exits, with
/// exponential backoff on errors. Supervision ends when the bus closes.
fn spawn_supervised_listener(
    transport: Arc<dyn ChatTransport>,
    tx: tokio::sync::mpsc::Sender<InboundMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = LISTENER_INITIAL_BACKOFF_SECS;

        loop {
            let result = transport.listen(tx.clone()).await;

            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => {
                    tracing::warn!("{} listener exited; restarting", transport.name());
                    backoff = LISTENER_INITIAL_BACKOFF_SECS;
                }
                Err(e) => {
                    tracing::error!("{} listener error: {e}; restarting", transport.name());
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            // Double AFTER sleeping so the first restart uses the initial backoff
            backoff = backoff.saturating_mul(2).min(LISTENER_MAX_BACKOFF_SECS);
        }
    })
}

/// Connect the transport, resolve the bot identity, and run the engine loop
/// until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let transport: Arc<dyn ChatTransport> =
        Arc::new(DiscordTransport::new(config.discord_token.clone()));
    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.model.clone(),
        config.temperature,
        config.generate_timeout_secs,
    )?);

    let identity = transport
        .identity()
        .await
        .context("could not resolve the bot's Discord identity — is DISCORD_TOKEN valid?")?;
    tracing::info!(
        "connected as {} (threshold: {}, history: {})",
        identity.display_name,
        config.message_threshold,
        config.max_history
    );

    let engine = Engine::new(&config, identity, Arc::clone(&transport), generator);

    let (tx, rx) = tokio::sync::mpsc::channel::<InboundMessage>(MESSAGE_BUS_CAPACITY);
    let listener = spawn_supervised_listener(transport, tx);

    engine.run(rx).await;
    let _ = listener.await;

    Ok(())
}

/// Reachability checks for both collaborators. Prints one line per check and
/// fails if either is unreachable.
pub async fn doctor(config: &Config) -> Result<()> {
    let transport = DiscordTransport::new(config.discord_token.clone());
    let generator = GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.model.clone(),
        config.temperature,
        config.generate_timeout_secs,
    )?;

    let discord_ok = transport.health_check().await;
    println!(
        "  discord: {}",
        if discord_ok { "ok" } else { "unreachable or unauthorized" }
    );

    let gemini_ok = generator.health_check().await;
    println!(
        "  gemini:  {}",
        if gemini_ok { "ok" } else { "unreachable or unauthorized" }
    );

    if discord_ok && gemini_ok {
        Ok(())
    } else {
        anyhow::bail!("one or more health checks failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Listener that exits immediately, to exercise the supervisor restart path.
    struct FlakyTransport {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for FlakyTransport {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn identity(&self) -> anyhow::Result<BotIdentity> {
            anyhow::bail!("offline")
        }

        async fn send(&self, _channel_id: &str, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_typing(&self, _channel_id: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn fetch_recent(
            &self,
            _channel_id: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<HistoryMessage>> {
            Ok(vec![])
        }

        async fn listen(
            &self,
            _tx: tokio::sync::mpsc::Sender<InboundMessage>,
        ) -> anyhow::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connection dropped")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_restarts_failed_listener_with_backoff() {
        let transport = Arc::new(FlakyTransport {
            attempts: AtomicUsize::new(0),
        });
        let (tx, rx) = tokio::sync::mpsc::channel::<InboundMessage>(1);

        let handle = spawn_supervised_listener(
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            tx,
        );

        // First attempt happens immediately; restarts follow 2s, 4s, ... later
        tokio::time::sleep(Duration::from_secs(7)).await;
        let attempts_so_far = transport.attempts.load(Ordering::SeqCst);
        assert!(
            (2..=3).contains(&attempts_so_far),
            "expected 2-3 attempts after 7s of backoff, saw {attempts_so_far}"
        );

        // Closing the bus ends supervision after the in-flight cycle
        drop(rx);
        tokio::time::sleep(Duration::from_secs(600)).await;
        handle.abort();
    }
}
