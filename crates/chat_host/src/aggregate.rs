//! Folding stream chunks into the reply message.

use shared::agent_api::HistoryEntry;
use shared::chat::{ChatMessage, GroundingChunk, GroundingSource};

/// Append sources from `chunks` that carry a uri not already in `sources`.
/// Arrival order is kept. Returns how many were added.
pub fn merge_sources(sources: &mut Vec<GroundingSource>, chunks: &[GroundingChunk]) -> usize {
    let before = sources.len();
    for source in chunks.iter().filter_map(GroundingChunk::source) {
        if !sources.iter().any(|existing| existing.uri == source.uri) {
            sources.push(source);
        }
    }
    sources.len() - before
}

/// Apply one delta to the reply. Grounding is skipped for image turns.
pub fn apply_chunk(
    message: &mut ChatMessage,
    text: &str,
    grounding: &[GroundingChunk],
    with_grounding: bool,
) {
    message.text.push_str(text);
    if with_grounding && !grounding.is_empty() {
        merge_sources(&mut message.sources, grounding);
    }
}

/// Reduce prior messages to what is replayed to the provider.
pub fn history_from(messages: &[ChatMessage]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .map(|m| HistoryEntry {
            role: m.role,
            text: m.text.clone(),
        })
        .collect()
}
