//! Voice response documents for the carrier webhook protocol.
//!
//! A [`VoiceResponse`] is an ordered list of [`Verb`]s that the carrier
//! executes top to bottom: speak some text, listen for speech and post it
//! back to a callback URL, or hang up. Documents are built from typed
//! values and serialized in one place, so every piece of dynamic text
//! (caller speech, model output, URLs) passes through [`escape`] before it
//! lands in the markup.
//!
//! Serialization is infallible: once a `VoiceResponse` exists it always
//! renders to a well-formed document.

use std::borrow::Cow;
use std::fmt::{self, Write};

/// Content type the carrier expects on every webhook response.
pub const CONTENT_TYPE: &str = "text/xml";

/// XML declaration prepended to every document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Speech recognition locale used for every listen instruction.
pub const LANGUAGE: &str = "en-US";

/// Whether `c` is allowed in an XML 1.0 document (the `Char` production).
///
/// `char` already excludes surrogates, so only C0 controls other than tab,
/// LF and CR, plus U+FFFE and U+FFFF, are left out.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

/// Escapes the five XML special characters and drops characters XML
/// cannot carry at all.
///
/// Borrows the input unchanged when it contains nothing to escape.
pub fn escape(input: &str) -> Cow<'_, str> {
    if !input
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\'') || !is_xml_char(c))
    {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other if is_xml_char(other) => out.push(other),
            _ => {}
        }
    }
    Cow::Owned(out)
}

/// A spoken line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Say {
    /// Carrier voice identifier, e.g. `Polly.Joanna`.
    pub voice: String,
    /// Text to speak.
    pub text: String,
}

impl Say {
    pub fn new(voice: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            text: text.into(),
        }
    }
}

/// A listen instruction: capture speech in the [`LANGUAGE`] locale,
/// transcribe it, and POST the result to `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    /// Absolute callback URL the carrier posts the recognized speech to.
    pub action: String,
    /// Prompts spoken while listening.
    pub prompts: Vec<Say>,
}

impl Gather {
    /// Speech gather posting to `action`, with automatic end-of-speech
    /// detection.
    pub fn speech(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            prompts: Vec::new(),
        }
    }

    /// Adds a nested prompt.
    pub fn prompt(mut self, say: Say) -> Self {
        self.prompts.push(say);
        self
    }
}

/// One instruction in a voice response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say(Say),
    Gather(Gather),
    Hangup,
}

/// An ordered voice response document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a spoken line.
    pub fn say(mut self, voice: impl Into<String>, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(Say::new(voice, text)));
        self
    }

    /// Appends a listen instruction.
    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    /// Appends a hangup.
    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Serializes the document, declaration included.
    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

fn write_say(f: &mut impl Write, say: &Say, indent: &str) -> fmt::Result {
    writeln!(
        f,
        r#"{indent}<Say voice="{}">{}</Say>"#,
        escape(&say.voice),
        escape(&say.text)
    )
}

impl fmt::Display for VoiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{XML_DECLARATION}")?;
        if self.verbs.is_empty() {
            return f.write_str("<Response/>");
        }

        f.write_str("<Response>\n")?;
        for verb in &self.verbs {
            match verb {
                Verb::Say(say) => write_say(f, say, "  ")?,
                Verb::Gather(gather) => {
                    writeln!(
                        f,
                        r#"  <Gather input="speech" language="{LANGUAGE}" action="{}" method="POST" speechTimeout="auto">"#,
                        escape(&gather.action)
                    )?;
                    for prompt in &gather.prompts {
                        write_say(f, prompt, "    ")?;
                    }
                    f.write_str("  </Gather>\n")?;
                }
                Verb::Hangup => f.write_str("  <Hangup/>\n")?,
            }
        }
        f.write_str("</Response>")
    }
}
