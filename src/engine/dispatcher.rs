use super::classifier::InteractionMode;
use super::{prompt, transcript};
use crate::channels::{BotIdentity, ChatTransport};
use crate::config::PromptsConfig;
use crate::providers::{GenerateOutcome, TextGenerator};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Discord expires a typing indicator after ~10s; refresh under that.
const TYPING_REFRESH_INTERVAL_SECS: u64 = 8;

/// Runs the full flow for one triggering message: typing indicator, history
/// fetch, prompt composition, generation, and the send back into the channel.
///
/// Holds no per-call state. The caller resets the channel counter exactly
/// once per trigger before dispatching, whatever the generator ends up doing.
pub struct Responder {
    transport: Arc<dyn ChatTransport>,
    generator: Arc<dyn TextGenerator>,
    identity: BotIdentity,
    prompts: PromptsConfig,
    max_history: usize,
}

impl Responder {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        generator: Arc<dyn TextGenerator>,
        identity: BotIdentity,
        prompts: PromptsConfig,
        max_history: usize,
    ) -> Self {
        Self {
            transport,
            generator,
            identity,
            prompts,
            max_history,
        }
    }

    /// Keep the typing indicator alive until the returned token is cancelled.
    /// Best-effort: indicator failures are logged at debug and never abort
    /// the response flow.
    fn spawn_typing_task(&self, channel_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let stop_signal = token.clone();
        let transport = Arc::clone(&self.transport);
        let channel = channel_id.to_string();

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(TYPING_REFRESH_INTERVAL_SECS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = stop_signal.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = transport.send_typing(&channel).await {
                            tracing::debug!("typing indicator failed on {channel}: {e}");
                        }
                    }
                }
            }
        });

        token
    }

    pub async fn respond(&self, channel_id: &str, mode: InteractionMode) -> anyhow::Result<()> {
        let typing = self.spawn_typing_task(channel_id);
        let result = self.respond_inner(channel_id, mode).await;
        typing.cancel();
        result
    }

    async fn respond_inner(
        &self,
        channel_id: &str,
        mode: InteractionMode,
    ) -> anyhow::Result<()> {
        let history = self
            .transport
            .fetch_recent(channel_id, self.max_history)
            .await
            .with_context(|| format!("history fetch failed for channel {channel_id}"))?;

        let transcript = transcript::format_transcript(&history, self.max_history);
        let prompt_text = prompt::compose(
            &self.prompts,
            mode,
            &self.identity.display_name,
            &transcript,
        );

        match self.generator.generate(&prompt_text).await? {
            GenerateOutcome::SafetyBlocked(reason) => {
                tracing::info!(
                    channel = %channel_id,
                    "generator declined on safety grounds ({reason}); nothing sent"
                );
            }
            GenerateOutcome::Empty => {
                tracing::info!(channel = %channel_id, "generator produced no text; nothing sent");
            }
            GenerateOutcome::Text(text) => {
                self.transport
                    .send(channel_id, &text)
                    .await
                    .with_context(|| format!("send failed for channel {channel_id}"))?;
                tracing::info!(channel = %channel_id, mode = ?mode, "response sent");
            }
        }

        Ok(())
    }
}
