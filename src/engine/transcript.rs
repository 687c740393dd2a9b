use crate::channels::HistoryMessage;

/// Render a most-recent-first history window as an oldest-first
/// `"author: content"` transcript, one message per line.
///
/// Messages without content (attachment-only, intent-filtered) are dropped.
/// An all-empty window renders as an empty string; prompt composition still
/// proceeds with an empty transcript segment.
pub fn format_transcript(most_recent_first: &[HistoryMessage], limit: usize) -> String {
    most_recent_first
        .iter()
        .take(limit)
        .rev()
        .filter_map(|msg| {
            msg.content
                .as_deref()
                .filter(|content| !content.is_empty())
                .map(|content| format!("{}: {}", msg.author_name, content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
