//! Turns raw completion text into a single displayable answer.
//!
//! Stages run in a fixed order: emptiness guard, code fence, envelope
//! unwrapping, emphasis markers, artifact tokens, final guard.

use serde_json::Value;

/// Returned whenever no usable answer survives normalization
pub const FALLBACK_MESSAGE: &str =
    "I apologize, but I couldn't generate a proper response. Can you send that message again?";

/// Strings that parse or read as "nothing" even though they are non-empty
pub const NULL_LIKE_TOKENS: [&str; 6] = ["\"\"", "''", "{}", "[]", "null", "undefined"];

/// Conversation boundary sentinels leaked by DeepSeek models.
/// Both the full-width and the ASCII bracket spellings show up in the wild.
pub const ARTIFACT_TOKENS: [&str; 4] = [
    "<\u{FF5C}begin\u{2581}of\u{2581}sentence\u{FF5C}>",
    "<|begin_of_sentence|>",
    "<\u{FF5C}end\u{2581}of\u{2581}sentence\u{FF5C}>",
    "<|end_of_sentence|>",
];

/// Hard ceiling on JSON parse attempts in the unwrap loop
pub const MAX_UNWRAP_ATTEMPTS: usize = 5;

const FENCE_MARKER: &str = "```";
const ANSWER_KEY: &str = "answer";

/// Result of the envelope unwrap loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped {
    pub text: String,
    /// Number of JSON parse attempts made, never above `MAX_UNWRAP_ATTEMPTS`
    pub attempts: usize,
}

/// What to do with the working string after one unwrap step
enum Step {
    Continue(String),
    Done(String),
    Stop,
}

/// Trim whitespace and byte-order marks from both ends
fn trim_text(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// Normalize a raw completion into display-ready text.
///
/// Never fails and never returns empty or null-like text; in those cases the
/// fallback message is returned instead.
pub fn normalize(raw: &str) -> String {
    let trimmed = trim_text(raw);
    if trimmed.is_empty() {
        tracing::debug!(reason = "empty_input", "Substituting fallback message");
        return FALLBACK_MESSAGE.to_string();
    }

    let defenced = strip_code_fence(trimmed);
    let unwrapped = unwrap_envelopes(&defenced);
    tracing::debug!(attempts = unwrapped.attempts, "Envelope unwrapping finished");

    let plain = strip_emphasis(&unwrapped.text);
    let cleaned = strip_artifacts(&plain);

    if is_null_like(&cleaned) {
        tracing::debug!(reason = "null_like_result", "Substituting fallback message");
        return FALLBACK_MESSAGE.to_string();
    }
    cleaned
}

/// Drop the first and last line when the text opens with a code fence.
/// Applied once; nested fences are left alone.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = trim_text(text);
    if !trimmed.starts_with(FENCE_MARKER) {
        return trimmed.to_string();
    }

    let lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() <= 2 {
        return String::new();
    }
    trim_text(&lines[1..lines.len() - 1].join("\n")).to_string()
}

/// Peel JSON envelopes off `text` for at most `MAX_UNWRAP_ATTEMPTS` parses.
///
/// Parse failure means the text is already plain and ends the loop. Running
/// out of attempts keeps whatever was computed last.
pub fn unwrap_envelopes(text: &str) -> Unwrapped {
    let mut working = text.to_string();
    let mut attempts = 0;

    while attempts < MAX_UNWRAP_ATTEMPTS {
        attempts += 1;

        let parsed: Value = match serde_json::from_str(&working) {
            Ok(value) => value,
            Err(_) => break,
        };

        match unwrap_step(parsed) {
            Step::Continue(next) => working = next,
            Step::Done(next) => {
                working = next;
                break;
            }
            Step::Stop => break,
        }
    }

    Unwrapped { text: working, attempts }
}

fn unwrap_step(parsed: Value) -> Step {
    match parsed {
        Value::Object(mut map) => {
            if let Some(extracted) = map.remove(ANSWER_KEY) {
                return extract_payload(extracted);
            }
            if map.len() == 1 {
                return match map.into_iter().next() {
                    Some((_, only)) => extract_payload(only),
                    None => Step::Stop,
                };
            }
            Step::Stop
        }
        // A one-element array has exactly one key, its index
        Value::Array(mut items) if items.len() == 1 => match items.pop() {
            Some(only) => extract_payload(only),
            None => Step::Stop,
        },
        Value::String(inner) => {
            let inner = trim_text(&inner).to_string();
            if looks_like_json(&inner) {
                Step::Continue(inner)
            } else {
                Step::Done(inner)
            }
        }
        _ => Step::Stop,
    }
}

/// Handle the value pulled out of an envelope
fn extract_payload(value: Value) -> Step {
    match value {
        Value::String(s) => {
            let s = trim_text(&s).to_string();
            if looks_like_json(&s) {
                Step::Continue(s)
            } else {
                Step::Done(s)
            }
        }
        // null re-encodes to "null", which the final guard catches
        nested @ (Value::Object(_) | Value::Array(_) | Value::Null) => {
            Step::Continue(integral_floats_as_ints(nested).to_string())
        }
        // numbers and booleans leave the working string as it was
        _ => Step::Stop,
    }
}

/// Write whole-valued floats as integers (`1.0` becomes `1`), the way
/// JavaScript serializers print numbers. Only values exactly representable
/// as integers (magnitude below 2^53) are rewritten.
fn integral_floats_as_ints(value: Value) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Value::from(f as i64),
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_floats_as_ints).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, integral_floats_as_ints(v)))
                .collect(),
        ),
        other => other,
    }
}

fn looks_like_json(text: &str) -> bool {
    (text.starts_with('{') && text.ends_with('}'))
        || (text.starts_with('[') && text.ends_with(']'))
}

/// Remove bold then italic asterisks. Other markdown is kept.
pub fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace('*', "")
}

/// Remove every artifact token, then trim
pub fn strip_artifacts(text: &str) -> String {
    let stripped = ARTIFACT_TOKENS
        .iter()
        .fold(text.to_string(), |acc, token| acc.replace(token, ""));
    trim_text(&stripped).to_string()
}

/// True for blank text or an exact null-like token
pub fn is_null_like(text: &str) -> bool {
    let trimmed = trim_text(text);
    trimmed.is_empty() || NULL_LIKE_TOKENS.contains(&trimmed)
}
