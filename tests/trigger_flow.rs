//! End-to-end trigger behavior through the public engine API, with in-memory
//! transport and generator doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tertulia::channels::{BotIdentity, ChatTransport, HistoryMessage, InboundMessage};
use tertulia::engine::Engine;
use tertulia::providers::{GenerateOutcome, TextGenerator};
use tertulia::Config;
use tokio::sync::mpsc;

struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn identity(&self) -> anyhow::Result<BotIdentity> {
        Ok(identity())
    }

    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .push((channel_id.to_string(), text.to_string()));
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
        Ok(vec![
            HistoryMessage {
                author_name: "bob".into(),
                content: Some("latest message".into()),
            },
            HistoryMessage {
                author_name: "alice".into(),
                content: None,
            },
            HistoryMessage {
                author_name: "alice".into(),
                content: Some("earliest message".into()),
            },
        ])
    }

    async fn listen(&self, _tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        Ok(())
    }
}

struct ScriptedGenerator {
    outcome: GenerateOutcome,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<GenerateOutcome> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.outcome.clone())
    }
}

fn identity() -> BotIdentity {
    BotIdentity {
        user_id: "900".into(),
        display_name: "rex".into(),
    }
}

fn config() -> Config {
    Config {
        discord_token: "t".into(),
        gemini_api_key: "k".into(),
        bot_name: "rex".into(),
        message_threshold: 3,
        max_history: 10,
        ..Config::default()
    }
}

fn chat(channel: &str, author: &str, content: &str) -> InboundMessage {
    InboundMessage {
        id: uuid::Uuid::new_v4().to_string(),
        author_id: author.into(),
        author_name: author.into(),
        author_is_bot: false,
        channel_id: channel.into(),
        content: Some(content.into()),
        mentions: vec![],
    }
}

async fn run_engine(
    messages: Vec<InboundMessage>,
    outcome: GenerateOutcome,
) -> (Arc<RecordingTransport>, Arc<ScriptedGenerator>) {
    let transport = Arc::new(RecordingTransport {
        sent: Mutex::new(Vec::new()),
    });
    let generator = Arc::new(ScriptedGenerator {
        outcome,
        prompts: Mutex::new(Vec::new()),
    });

    let engine = Engine::new(
        &config(),
        identity(),
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        Arc::clone(&generator) as Arc<dyn TextGenerator>,
    );

    let (tx, rx) = mpsc::channel(32);
    for msg in messages {
        tx.send(msg).await.unwrap();
    }
    drop(tx);
    engine.run(rx).await;

    (transport, generator)
}

#[tokio::test]
async fn periodic_trigger_fires_once_per_threshold() {
    let messages = (0..7).map(|i| chat("c1", "alice", &format!("msg {i}"))).collect();
    let (transport, generator) =
        run_engine(messages, GenerateOutcome::Text("hello there".into())).await;

    // threshold 3, 7 messages: fires at the 3rd and 6th
    assert_eq!(transport.sent.lock().len(), 2);
    let prompts = generator.prompts.lock();
    assert_eq!(prompts.len(), 2);
    // Transcript is oldest-first with the empty entry dropped
    assert!(prompts[0].contains("earliest message"));
    assert!(prompts[0].contains("alice: earliest message\nbob: latest message"));
}

#[tokio::test]
async fn name_drop_triggers_direct_mode_immediately() {
    let messages = vec![chat("c1", "alice", "oye REX, ¿qué opinas?")];
    let (transport, generator) =
        run_engine(messages, GenerateOutcome::Text("pues flipas".into())).await;

    assert_eq!(
        transport.sent.lock().clone(),
        vec![("c1".to_string(), "pues flipas".to_string())]
    );
    // Direct template, not the 40-word periodic one
    assert!(!generator.prompts.lock()[0].contains("40 words"));
}

#[tokio::test]
async fn safety_blocked_trigger_sends_nothing_but_still_resets() {
    let mut messages: Vec<InboundMessage> =
        (0..3).map(|i| chat("c1", "alice", &format!("msg {i}"))).collect();
    // After the blocked trigger the count restarts; two more messages stay quiet
    messages.push(chat("c1", "bob", "more"));
    messages.push(chat("c1", "bob", "chatter"));

    let (transport, generator) =
        run_engine(messages, GenerateOutcome::SafetyBlocked("SAFETY".into())).await;

    assert!(transport.sent.lock().is_empty());
    // Exactly one generation attempt: the counter was reset by the trigger,
    // so messages 4 and 5 only count to 2 of 3
    assert_eq!(generator.prompts.lock().len(), 1);
}

#[tokio::test]
async fn channels_trigger_independently() {
    let mut messages = Vec::new();
    for i in 0..2 {
        messages.push(chat("c1", "alice", &format!("a{i}")));
        messages.push(chat("c2", "bob", &format!("b{i}")));
    }
    // c1 reaches 3 first; c2 stays at 2
    messages.push(chat("c1", "alice", "third"));

    let (transport, _) = run_engine(messages, GenerateOutcome::Text("hi".into())).await;

    let sent = transport.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "c1");
}

#[tokio::test]
async fn bot_authored_messages_never_count() {
    let mut messages: Vec<InboundMessage> = (0..5)
        .map(|i| {
            let mut msg = chat("c1", "otherbot", &format!("beep {i}"));
            msg.author_is_bot = true;
            msg
        })
        .collect();
    messages.push(chat("c1", "alice", "human here"));

    let (transport, generator) =
        run_engine(messages, GenerateOutcome::Text("hi".into())).await;

    // Five bot messages contributed nothing; one human message counts 1 of 3
    assert!(transport.sent.lock().is_empty());
    assert!(generator.prompts.lock().is_empty());
}
