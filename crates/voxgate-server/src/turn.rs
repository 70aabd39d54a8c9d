//! Normalization of the carrier's per-turn webhook body.

use serde_json::Value;

/// One caller turn as posted by the carrier.
///
/// Every field is optional: carriers omit fields freely and test tools post
/// whatever they like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundTurn {
    /// Transcribed caller speech (`SpeechResult`).
    pub speech_result: Option<String>,
    /// Carrier call identifier (`CallSid`).
    pub call_sid: Option<String>,
    /// Caller number (`From`).
    pub from: Option<String>,
    /// Dialed number (`To`).
    pub to: Option<String>,
}

impl InboundTurn {
    /// Parses a webhook body.
    ///
    /// JSON bodies (by content type, or by a leading `{`) are read as an
    /// object; everything else is read as form-encoded. A body that fits
    /// neither yields an empty turn.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Self {
        let declared_json = content_type
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false);
        let looks_like_json = body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{');

        if declared_json || looks_like_json {
            match serde_json::from_slice::<Value>(body) {
                Ok(value) => Self::from_json(&value),
                Err(e) => {
                    tracing::warn!(error = %e, "turn body is not valid JSON, treating as empty");
                    Self::default()
                }
            }
        } else {
            Self::from_form(body)
        }
    }

    /// Reads a form-encoded body. Repeated keys keep the last value.
    pub fn from_form(body: &[u8]) -> Self {
        let mut turn = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            if let Some(slot) = turn.slot(&key) {
                *slot = Some(value.into_owned());
            }
        }
        turn
    }

    /// Reads a JSON object. Strings are kept, numbers and booleans are
    /// stringified, anything else counts as absent.
    pub fn from_json(value: &Value) -> Self {
        let mut turn = Self::default();
        if let Value::Object(fields) = value {
            for (key, value) in fields {
                if let Some(slot) = turn.slot(key) {
                    *slot = coerce(value);
                }
            }
        }
        turn
    }

    /// Trimmed caller speech; empty when nothing was recognized.
    pub fn speech(&self) -> &str {
        self.speech_result.as_deref().unwrap_or_default().trim()
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "SpeechResult" => Some(&mut self.speech_result),
            "CallSid" => Some(&mut self.call_sid),
            "From" => Some(&mut self.from),
            "To" => Some(&mut self.to),
            _ => None,
        }
    }
}

fn coerce(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
