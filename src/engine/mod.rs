//! The response-trigger state machine: counts channel traffic, spots direct
//! interactions, and turns either into a dispatched reply.

mod classifier;
mod counters;
mod dispatcher;
mod prompt;
mod transcript;

pub use classifier::{is_direct_interaction, InteractionMode};
pub use counters::CounterStore;
pub use dispatcher::Responder;
pub use prompt::compose;
pub use transcript::format_transcript;

use crate::channels::{BotIdentity, ChatTransport, InboundMessage};
use crate::config::Config;
use crate::providers::TextGenerator;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

pub struct Engine {
    counters: CounterStore,
    threshold: u32,
    bot_user_id: String,
    bot_name_lower: String,
    responder: Arc<Responder>,
}

impl Engine {
    pub fn new(
        config: &Config,
        identity: BotIdentity,
        transport: Arc<dyn ChatTransport>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let responder = Arc::new(Responder::new(
            transport,
            generator,
            identity.clone(),
            config.prompts.clone(),
            config.max_history,
        ));

        Self {
            counters: CounterStore::new(),
            threshold: config.message_threshold,
            bot_user_id: identity.user_id,
            bot_name_lower: config.bot_name_lower(),
            responder,
        }
    }

    /// Classify and count one message, in arrival order. Returns the mode to
    /// dispatch in, or `None` when the message only advances the counter.
    ///
    /// A direct interaction resets the counter without counting toward the
    /// periodic threshold; a periodic trigger resets it the instant it would
    /// reach the threshold. Either way the counter is back in
    /// `[0, threshold)` before this returns.
    fn trigger_for(&self, msg: &InboundMessage) -> Option<InteractionMode> {
        if msg.author_is_bot {
            return None;
        }

        if is_direct_interaction(msg, &self.bot_user_id, &self.bot_name_lower) {
            self.counters.reset(&msg.channel_id);
            return Some(InteractionMode::Direct);
        }

        let count = self.counters.increment(&msg.channel_id);
        tracing::debug!(
            channel = %msg.channel_id,
            count,
            threshold = self.threshold,
            "message counted"
        );

        if count >= self.threshold {
            self.counters.reset(&msg.channel_id);
            Some(InteractionMode::Periodic)
        } else {
            None
        }
    }

    /// Consume the inbound bus until it closes. Counting happens here, one
    /// message at a time; dispatches run on spawned tasks so one channel's
    /// slow generator call never holds up the rest.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundMessage>) {
        let mut workers = JoinSet::new();

        while let Some(msg) = rx.recv().await {
            if let Some(mode) = self.trigger_for(&msg) {
                tracing::info!(
                    message = %msg.id,
                    channel = %msg.channel_id,
                    mode = ?mode,
                    "trigger fired, dispatching response"
                );

                let responder = Arc::clone(&self.responder);
                let channel_id = msg.channel_id.clone();
                workers.spawn(async move {
                    if let Err(e) = responder.respond(&channel_id, mode).await {
                        tracing::warn!(channel = %channel_id, "response abandoned: {e:#}");
                    }
                });
            }

            while let Some(result) = workers.try_join_next() {
                if let Err(e) = result {
                    tracing::error!("response worker crashed: {e}");
                }
            }
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("response worker crashed: {e}");
            }
        }
    }
}
