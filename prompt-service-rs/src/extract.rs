//! Output extraction
//!
//! Upstream responses come in several shapes depending on the provider and on
//! which tools ran: a flat `output_text` string, an array of text segments, a
//! list of heterogeneous `output` items (messages, tool calls, refusals) or a
//! legacy chat-completions `choices` list. Each shape has its own strategy and
//! the strategies are tried in order until one yields non-blank text.
//!
//! Finding nothing is a normal result (a tool-call-only response, for
//! example) and is reported as an empty string.

use serde_json::Value;

/// One extraction strategy
type Strategy = fn(&Value) -> Option<String>;

/// Which typed parts count as a match, and where their payload lives
struct PartKind {
    types: &'static [&'static str],
    fields: &'static [&'static str],
}

const TEXT: PartKind = PartKind {
    types: &["output_text", "text"],
    fields: &["text"],
};

const REFUSAL: PartKind = PartKind {
    types: &["refusal"],
    fields: &["refusal", "text"],
};

const TEXT_STRATEGIES: &[Strategy] = &[
    flat_output_text,
    output_text_segments,
    output_item_text,
    chat_choice_text,
];

const REFUSAL_STRATEGIES: &[Strategy] = &[
    flat_refusal,
    refusal_segments,
    output_item_refusal,
    chat_choice_refusal,
];

/// Final text of a response, or `""` when it carries none
pub fn extract_output_text(response: &Value) -> String {
    first_match(TEXT_STRATEGIES, response)
}

/// Refusal text of a response, or `""` when it carries none
pub fn extract_refusal(response: &Value) -> String {
    first_match(REFUSAL_STRATEGIES, response)
}

/// Types of the entries of the `output` list, in order
pub fn output_item_types(response: &Value) -> Vec<String> {
    output_items(response)
        .iter()
        .map(|item| {
            item.get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        })
        .collect()
}

/// Whether the model ran a web search while producing this response
pub fn has_web_search_call(response: &Value) -> bool {
    output_items(response).iter().any(|item| {
        item.get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| kind == "web_search_call")
    })
}

fn first_match(strategies: &[Strategy], response: &Value) -> String {
    strategies
        .iter()
        .find_map(|strategy| strategy(response))
        .unwrap_or_default()
}

fn output_items(response: &Value) -> &[Value] {
    response
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Trim, drop blanks and join with newlines; `None` when nothing is left
fn join_non_blank<I, S>(pieces: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kept: Vec<String> = pieces
        .into_iter()
        .map(|piece| piece.as_ref().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n"))
    }
}

/// Plain string, or the `{"value": "..."}` wrapper some providers use
fn string_payload(value: &Value) -> Option<&str> {
    value
        .as_str()
        .or_else(|| value.get("value").and_then(Value::as_str))
}

fn part_payload<'a>(part: &'a Value, kind: &PartKind) -> Option<&'a str> {
    let part_type = part.get("type").and_then(Value::as_str)?;
    if !kind.types.contains(&part_type) {
        return None;
    }

    kind.fields
        .iter()
        .find_map(|field| part.get(*field).and_then(string_payload))
}

fn flat_field(response: &Value, field: &str) -> Option<String> {
    join_non_blank(response.get(field).and_then(Value::as_str))
}

fn segment_field(response: &Value, field: &str) -> Option<String> {
    let segments = response.get(field)?.as_array()?;
    join_non_blank(segments.iter().filter_map(Value::as_str))
}

fn typed_output_parts(response: &Value, kind: &PartKind) -> Option<String> {
    let mut found = Vec::new();

    for item in output_items(response) {
        if let Some(payload) = part_payload(item, kind) {
            found.push(payload);
        }

        if let Some(parts) = item.get("content").and_then(Value::as_array) {
            found.extend(parts.iter().filter_map(|part| part_payload(part, kind)));
        }
    }

    join_non_blank(found)
}

fn chat_choice_field(response: &Value, kind: &PartKind, field: &str) -> Option<String> {
    let choices = response.get("choices")?.as_array()?;
    let mut found = Vec::new();

    for message in choices.iter().filter_map(|choice| choice.get("message")) {
        match message.get(field) {
            Some(Value::String(content)) => found.push(content.as_str()),
            Some(Value::Array(parts)) => {
                found.extend(parts.iter().filter_map(|part| part_payload(part, kind)))
            }
            _ => {}
        }
    }

    join_non_blank(found)
}

fn flat_output_text(response: &Value) -> Option<String> {
    flat_field(response, "output_text")
}

fn output_text_segments(response: &Value) -> Option<String> {
    segment_field(response, "output_text")
}

fn output_item_text(response: &Value) -> Option<String> {
    typed_output_parts(response, &TEXT)
}

fn chat_choice_text(response: &Value) -> Option<String> {
    chat_choice_field(response, &TEXT, "content")
}

fn flat_refusal(response: &Value) -> Option<String> {
    flat_field(response, "refusal")
}

fn refusal_segments(response: &Value) -> Option<String> {
    segment_field(response, "refusals")
}

fn output_item_refusal(response: &Value) -> Option<String> {
    typed_output_parts(response, &REFUSAL)
}

fn chat_choice_refusal(response: &Value) -> Option<String> {
    chat_choice_field(response, &REFUSAL, "refusal")
}
