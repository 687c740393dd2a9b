use crate::channels::InboundMessage;

/// Why the bot is responding. Threaded explicitly through the dispatcher so
/// both trigger paths stay symmetric and independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    /// The bot was mentioned or named; respond in persona.
    Direct,
    /// The channel hit the message threshold; contribute unprompted.
    Periodic,
}

/// A message is a direct interaction when it mentions the bot's account or
/// contains the configured bot name anywhere in its lowercased content.
///
/// The substring check is deliberately loose: the bot name inside an
/// unrelated longer word still matches. That imprecision is inherited
/// behavior and kept as-is rather than silently tightened.
pub fn is_direct_interaction(
    msg: &InboundMessage,
    bot_user_id: &str,
    bot_name_lower: &str,
) -> bool {
    if msg.mentions.iter().any(|id| id == bot_user_id) {
        return true;
    }

    match msg.content.as_deref() {
        Some(content) if !bot_name_lower.is_empty() => {
            content.to_lowercase().contains(bot_name_lower)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: Option<&str>, mentions: Vec<&str>) -> InboundMessage {
        InboundMessage {
            id: "m1".into(),
            author_id: "42".into(),
            author_name: "alice".into(),
            author_is_bot: false,
            channel_id: "c1".into(),
            content: content.map(String::from),
            mentions: mentions.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn mention_of_bot_is_direct() {
        let msg = message(Some("what do you think?"), vec!["7"]);
        assert!(is_direct_interaction(&msg, "7", "rex"));
    }

    #[test]
    fn mention_of_someone_else_is_not_direct() {
        let msg = message(Some("what do you think?"), vec!["99"]);
        assert!(!is_direct_interaction(&msg, "7", "rex"));
    }

    #[test]
    fn name_substring_match_is_case_insensitive() {
        let msg = message(Some("hey Rex, what's up"), vec![]);
        assert!(is_direct_interaction(&msg, "7", "rex"));

        let shouty = message(Some("HEY REX!"), vec![]);
        assert!(is_direct_interaction(&shouty, "7", "rex"));
    }

    #[test]
    fn name_inside_longer_word_still_matches() {
        // Known false positive of the substring heuristic
        let msg = message(Some("tyrannosaurus rexes were huge"), vec![]);
        assert!(is_direct_interaction(&msg, "7", "rex"));
    }

    #[test]
    fn absent_content_is_not_direct() {
        let msg = message(None, vec![]);
        assert!(!is_direct_interaction(&msg, "7", "rex"));
    }

    #[test]
    fn unrelated_content_is_not_direct() {
        let msg = message(Some("nice weather today"), vec![]);
        assert!(!is_direct_interaction(&msg, "7", "rex"));
    }

    #[test]
    fn empty_bot_name_never_substring_matches() {
        // Guard: an empty needle would match everything
        let msg = message(Some("anything at all"), vec![]);
        assert!(!is_direct_interaction(&msg, "7", ""));
    }
}
