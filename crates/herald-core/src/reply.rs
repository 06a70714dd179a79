//! Reply pipeline: usage/cost metadata and transport-safe chunking.

use crate::completion::CompletionResult;

/// Sentinel used in place of a dollar figure when the gateway reported no
/// billable cost (local inference, unmetered deployments).
pub const NO_COST_NOTE: &str = "No billable cost for this request";

/// Build the user-facing body and the usage metadata line for a completion
/// result.
///
/// The body is the response text prefixed with `"Here's {label}:\n\n"`. The
/// metadata line reports the request cost to four decimal places plus the
/// prompt/completion token counts; without a cost it carries
/// [`NO_COST_NOTE`] and the same token suffix.
pub fn normalize(result: &CompletionResult, label: &str) -> (String, String) {
    let body = format!("Here's {label}:\n\n{}", result.body);
    let metadata = match result.cost {
        Some(cost) => format!(
            "Cost of request: ${cost:.4} (Prompt tokens: {}, Completion tokens: {})",
            result.prompt_tokens, result.completion_tokens
        ),
        None => format!(
            "{NO_COST_NOTE} (Prompt tokens: {}, Completion tokens: {})",
            result.prompt_tokens, result.completion_tokens
        ),
    };
    (body, metadata)
}

/// Split `message` into chunks of at most `limit` characters, breaking only
/// at line boundaries.
///
/// Lines accumulate until adding the next one (plus its newline) would pass
/// the limit; each closed chunk is trimmed, and trim-empty chunks are
/// dropped. A single line longer than the limit is emitted alone in its own
/// oversized chunk rather than split mid-line, so the surrounding lines
/// still go through even if the platform rejects that one send.
pub fn chunk(message: &str, limit: usize) -> Vec<String> {
    debug_assert!(limit > 0, "chunk limit must be positive");

    let mut chunks = Vec::new();
    let mut acc = String::new();
    // Lengths are chars, not bytes: platform limits count characters.
    let mut acc_len = 0usize;

    for line in message.split('\n') {
        let line_len = line.chars().count();
        if !acc.is_empty() && acc_len + line_len + 1 > limit {
            close_chunk(&mut chunks, &acc);
            acc.clear();
            acc_len = 0;
        }
        acc.push_str(line);
        acc.push('\n');
        acc_len += line_len + 1;
    }
    close_chunk(&mut chunks, &acc);
    chunks
}

fn close_chunk(chunks: &mut Vec<String>, acc: &str) {
    let trimmed = acc.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cost: Option<f64>) -> CompletionResult {
        CompletionResult {
            body: "All good.".to_string(),
            prompt_tokens: 5,
            completion_tokens: 10,
            cost,
        }
    }

    #[test]
    fn metadata_line_reports_cost_to_four_decimals() {
        let (_, metadata) = normalize(&result(Some(0.1234)), "a summary of the current plans");
        assert_eq!(
            metadata,
            "Cost of request: $0.1234 (Prompt tokens: 5, Completion tokens: 10)"
        );
    }

    #[test]
    fn metadata_line_pads_short_costs() {
        let (_, metadata) = normalize(&result(Some(0.015)), "the answer to your question");
        assert_eq!(
            metadata,
            "Cost of request: $0.0150 (Prompt tokens: 5, Completion tokens: 10)"
        );
    }

    #[test]
    fn metadata_line_without_cost_uses_note() {
        let (_, metadata) = normalize(&result(None), "a summary of the current plans");
        assert_eq!(
            metadata,
            "No billable cost for this request (Prompt tokens: 5, Completion tokens: 10)"
        );
        assert!(!metadata.contains('$'));
    }

    #[test]
    fn frames_body_with_label() {
        let (body, _) = normalize(&result(Some(0.1)), "a short story based on your prompt");
        assert_eq!(body, "Here's a short story based on your prompt:\n\nAll good.");
    }

    #[test]
    fn short_message_is_single_chunk() {
        assert_eq!(chunk("short message", 1900), vec!["short message"]);
    }

    #[test]
    fn blank_input_yields_no_chunks() {
        assert!(chunk("", 1900).is_empty());
        assert!(chunk("  \n\n \n", 1900).is_empty());
    }

    #[test]
    fn rejoining_chunks_preserves_lines() {
        let lines: Vec<String> = (0..120).map(|i| format!("line-{i:03} with some text")).collect();
        let message = lines.join("\n");
        let chunks = chunk(&message, 100);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join("\n"), message);
    }

    #[test]
    fn chunks_stay_within_limit() {
        let message = (0..80)
            .map(|i| format!("entry {i}: some plan details"))
            .collect::<Vec<_>>()
            .join("\n");
        for chunk in chunk(&message, 90) {
            assert!(chunk.chars().count() <= 90, "chunk over limit: {chunk:?}");
        }
    }

    #[test]
    fn thousand_short_lines_split_into_bounded_chunks() {
        let message = "a\n".repeat(1000);
        let chunks = chunk(&message, 1900);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1900));
        let total_lines: usize = chunks.iter().map(|c| c.lines().count()).sum();
        assert_eq!(total_lines, 1000);
    }

    #[test]
    fn long_single_line_passes_through_unsplit() {
        let line = "x".repeat(3000);
        assert_eq!(chunk(&line, 1900), vec![line]);
    }

    #[test]
    fn oversized_line_is_emitted_alone() {
        let big = "y".repeat(2500);
        let message = format!("short\n{big}\ntail");
        let chunks = chunk(&message, 1900);
        assert_eq!(chunks, vec!["short".to_string(), big, "tail".to_string()]);
    }

    #[test]
    fn limit_counts_chars_not_bytes() {
        let line = "é".repeat(5);
        let message = format!("{line}\n{line}\n{line}");
        let chunks = chunk(&message, 12);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }
}
