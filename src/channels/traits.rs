use async_trait::async_trait;

/// A message delivered by the transport's event stream.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Bus-local id, used to correlate log lines for one message.
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_is_bot: bool,
    pub channel_id: String,
    /// Absent for attachment-only or intent-filtered messages.
    pub content: Option<String>,
    /// User ids mentioned in the message. Empty when the platform sent none.
    pub mentions: Vec<String>,
}

/// One entry of a channel's recent history, as fetched on demand.
/// Sequences are most-recent-first, the order Discord returns them.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub author_name: String,
    pub content: Option<String>,
}

/// The connected bot account, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub user_id: String,
    pub display_name: String,
}

/// Chat transport seam — implement for any messaging platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Resolve the bot's own account id and display name.
    async fn identity(&self) -> anyhow::Result<BotIdentity>;

    /// Send a message into a channel.
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()>;

    /// Fire a one-shot "typing" indicator. Platforms expire these quickly;
    /// callers refresh on an interval while composing.
    async fn send_typing(&self, channel_id: &str) -> anyhow::Result<()>;

    /// Fetch up to `limit` recent messages, most recent first.
    async fn fetch_recent(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<HistoryMessage>>;

    /// Start listening for incoming messages (long-running).
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Check if the transport is reachable and authenticated.
    async fn health_check(&self) -> bool {
        true
    }
}
