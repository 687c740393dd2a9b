use super::traits::{BotIdentity, ChatTransport, HistoryMessage, InboundMessage};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord's maximum message length for regular messages
const DISCORD_MAX_MESSAGE_LENGTH: usize = 4000;

/// Discord transport — Gateway WebSocket for real-time events, REST for
/// sends, typing, history, and identity.
pub struct DiscordTransport {
    bot_token: String,
    client: reqwest::Client,
}

impl DiscordTransport {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }
}

/// Split a message into chunks that respect Discord's 4000 character limit.
/// Prefers newline breaks, then spaces, then a hard split.
fn split_for_send(message: &str) -> Vec<String> {
    if message.len() <= DISCORD_MAX_MESSAGE_LENGTH {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        let chunk_end = if remaining.len() <= DISCORD_MAX_MESSAGE_LENGTH {
            remaining.len()
        } else {
            // The hard split point must land on a char boundary; 4000 bytes
            // can fall inside a multibyte character
            let hard_limit = floor_char_boundary(remaining, DISCORD_MAX_MESSAGE_LENGTH);
            let search_area = &remaining[..hard_limit];
            if let Some(pos) = search_area.rfind('\n') {
                // Skip newlines too close to the start; the chunk would be tiny
                if pos >= DISCORD_MAX_MESSAGE_LENGTH / 2 {
                    pos + 1
                } else {
                    search_area.rfind(' ').map_or(hard_limit, |p| p + 1)
                }
            } else if let Some(pos) = search_area.rfind(' ') {
                pos + 1
            } else {
                hard_limit
            }
        };

        chunks.push(remaining[..chunk_end].to_string());
        remaining = &remaining[chunk_end..];
    }

    chunks
}

/// Largest index ≤ `max` that lands on a UTF-8 char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Parse one MESSAGE_CREATE dispatch payload into an `InboundMessage`.
/// Returns `None` for events missing an author (e.g. webhook edge cases).
fn parse_message_create(d: &serde_json::Value) -> Option<InboundMessage> {
    let author = d.get("author")?;
    let author_id = author.get("id").and_then(|i| i.as_str())?.to_string();
    let author_name = author
        .get("username")
        .and_then(|u| u.as_str())
        .unwrap_or("unknown")
        .to_string();
    let author_is_bot = author
        .get("bot")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    let channel_id = d
        .get("channel_id")
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();

    // Content may be absent (attachment-only messages, missing intent)
    let content = d
        .get("content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(String::from);

    let mentions = d
        .get("mentions")
        .and_then(|m| m.as_array())
        .map(|users| {
            users
                .iter()
                .filter_map(|u| u.get("id").and_then(|i| i.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(InboundMessage {
        id: Uuid::new_v4().to_string(),
        author_id,
        author_name,
        author_is_bot,
        channel_id,
        content,
        mentions,
    })
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    fn name(&self) -> &str {
        "discord"
    }

    async fn identity(&self) -> anyhow::Result<BotIdentity> {
        let resp = self
            .client
            .get(format!("{API_BASE}/users/@me"))
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Discord identity lookup failed ({status})");
        }

        let me: serde_json::Value = resp.json().await?;
        let user_id = me
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or_else(|| anyhow::anyhow!("Discord /users/@me returned no id"))?
            .to_string();
        let display_name = me
            .get("username")
            .and_then(|u| u.as_str())
            .unwrap_or("bot")
            .to_string();

        Ok(BotIdentity {
            user_id,
            display_name,
        })
    }

    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        let chunks = split_for_send(text);

        for (i, chunk) in chunks.iter().enumerate() {
            let url = format!("{API_BASE}/channels/{channel_id}/messages");
            let body = json!({ "content": chunk });

            let resp = self
                .client
                .post(&url)
                .header("Authorization", self.auth_header())
                .json(&body)
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let err = resp
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
                anyhow::bail!("Discord send message failed ({status}): {err}");
            }

            // Small delay between chunks to avoid rate limiting
            if i < chunks.len() - 1 {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
        }

        Ok(())
    }

    async fn send_typing(&self, channel_id: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(format!("{API_BASE}/channels/{channel_id}/typing"))
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("Discord typing indicator failed ({})", resp.status());
        }
        Ok(())
    }

    async fn fetch_recent(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<HistoryMessage>> {
        let url = format!("{API_BASE}/channels/{channel_id}/messages?limit={limit}");
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Discord history fetch failed ({status})");
        }

        // Discord returns newest-first; keep that order, the formatter reverses
        let raw: Vec<serde_json::Value> = resp.json().await?;
        let history = raw
            .iter()
            .map(|m| HistoryMessage {
                author_name: m
                    .get("author")
                    .and_then(|a| a.get("username"))
                    .and_then(|u| u.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                content: m
                    .get("content")
                    .and_then(|c| c.as_str())
                    .filter(|c| !c.is_empty())
                    .map(String::from),
            })
            .collect();

        Ok(history)
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let own_id = self.identity().await.map(|id| id.user_id).unwrap_or_default();

        // Get Gateway URL
        let gw_resp: serde_json::Value = self
            .client
            .get(format!("{API_BASE}/gateway/bot"))
            .header("Authorization", self.auth_header())
            .send()
            .await?
            .json()
            .await?;

        let gw_url = gw_resp
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or("wss://gateway.discord.gg");

        let ws_url = format!("{gw_url}/?v=10&encoding=json");
        tracing::info!("Discord: connecting to gateway...");

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Read Hello (opcode 10)
        let hello = read.next().await.ok_or(anyhow::anyhow!("No hello"))??;
        let hello_data: serde_json::Value = serde_json::from_str(&hello.to_string())?;
        let heartbeat_interval = hello_data
            .get("d")
            .and_then(|d| d.get("heartbeat_interval"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(41250);

        // Send Identify (opcode 2)
        let identify = json!({
            "op": 2,
            "d": {
                "token": self.bot_token,
                "intents": 37377, // GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT | DIRECT_MESSAGES
                "properties": {
                    "os": "linux",
                    "browser": "tertulia",
                    "device": "tertulia"
                }
            }
        });
        write.send(Message::Text(identify.to_string().into())).await?;

        tracing::info!("Discord: connected and identified");

        // Last sequence number, for heartbeats. Only touched in this loop.
        let mut sequence: i64 = -1;

        // Heartbeat timer sends a tick; the heartbeat itself is assembled in
        // the select! loop where `sequence` lives.
        let (hb_tx, mut hb_rx) = tokio::sync::mpsc::channel::<()>(1);
        let hb_interval = heartbeat_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(hb_interval));
            loop {
                interval.tick().await;
                if hb_tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = hb_rx.recv() => {
                    let d = if sequence >= 0 { json!(sequence) } else { json!(null) };
                    let hb = json!({"op": 1, "d": d});
                    if write.send(Message::Text(hb.to_string().into())).await.is_err() {
                        break;
                    }
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(Message::Text(t))) => t,
                        Some(Ok(Message::Close(_))) | None => break,
                        _ => continue,
                    };

                    let event: serde_json::Value = match serde_json::from_str(&msg) {
                        Ok(e) => e,
                        Err(_) => continue,
                    };

                    if let Some(s) = event.get("s").and_then(serde_json::Value::as_i64) {
                        sequence = s;
                    }

                    let op = event.get("op").and_then(serde_json::Value::as_u64).unwrap_or(0);

                    match op {
                        // Op 1: Server requests an immediate heartbeat
                        1 => {
                            let d = if sequence >= 0 { json!(sequence) } else { json!(null) };
                            let hb = json!({"op": 1, "d": d});
                            if write.send(Message::Text(hb.to_string().into())).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        // Op 7: Reconnect
                        7 => {
                            tracing::warn!("Discord: received Reconnect (op 7), closing for restart");
                            break;
                        }
                        // Op 9: Invalid Session
                        9 => {
                            tracing::warn!("Discord: received Invalid Session (op 9), closing for restart");
                            break;
                        }
                        _ => {}
                    }

                    let event_type = event.get("t").and_then(|t| t.as_str()).unwrap_or("");
                    if event_type != "MESSAGE_CREATE" {
                        continue;
                    }

                    let Some(d) = event.get("d") else {
                        continue;
                    };

                    let Some(inbound) = parse_message_create(d) else {
                        continue;
                    };

                    // Never feed our own messages back into the engine
                    if inbound.author_id == own_id {
                        continue;
                    }

                    if tx.send(inbound).await.is_err() {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{API_BASE}/users/@me"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
