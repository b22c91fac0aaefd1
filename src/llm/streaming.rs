//! SSE parsing helpers shared by the streaming model calls.
//!
//! `reqwest::Response::chunk()` hands back arbitrary byte slices; these
//! helpers buffer them and split out complete events. OpenAI-compatible
//! streams are data-only (`data: {...}` lines, `data: [DONE]` sentinel).

/// Drain complete data-only SSE events from `buffer`, leaving any
/// trailing partial event in place for the next network chunk.
///
/// Returns the `data:` payloads in stream order; multi-line data fields
/// within one event are joined with newlines per the SSE spec.
pub fn parse_data_only_sse_events(buffer: &mut String) -> Vec<String> {
    let mut events = Vec::new();

    // Events are separated by a blank line.
    while let Some(boundary) = buffer.find("\n\n") {
        let raw_event: String = buffer.drain(..boundary + 2).collect();
        let data_lines: Vec<&str> = raw_event
            .lines()
            .filter_map(|line| {
                line.strip_prefix("data:").map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            })
            .collect();
        if !data_lines.is_empty() {
            events.push(data_lines.join("\n"));
        }
    }

    events
}

/// Marks the end of an OpenAI-compatible stream.
pub fn is_done_sentinel(data: &str) -> bool {
    data.trim() == "[DONE]"
}

/// Pull the text delta out of one OpenAI chat-completions stream event:
/// `choices[0].delta.content`. Absent for role headers and finish events.
pub fn extract_chat_delta(data: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(data).ok()?;
    json.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Strip a markdown code fence wrapper from a model response, if present.
/// Some models fence their JSON even when asked not to.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop an optional language tag on the opening fence line.
    let inner = match inner.split_once('\n') {
        Some((_lang, rest)) => rest,
        None => inner,
    };
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}
