//! Turn-by-turn call documents.
//!
//! Every response the carrier receives is one of five shapes:
//!
//! | Situation                  | Document                                         |
//! |----------------------------|--------------------------------------------------|
//! | call starts                | greeting, listen, goodbye, hangup                |
//! | nothing recognized         | "did not catch that", listen, goodbye, hangup    |
//! | caller asked to end        | reply, hangup                                    |
//! | anything else              | reply, listen ("Anything else?"), goodbye, hangup|
//! | handler failed             | fixed apology in a generic voice, hangup         |
//!
//! The trailing goodbye and hangup after a listen instruction only run when
//! the carrier's listen times out without posting back.

use regex::Regex;
use std::sync::LazyLock;
use voxgate_twiml::{Gather, Say, VoiceResponse};

/// Path the carrier posts each recognized utterance to.
pub const CONTINUE_PATH: &str = "/api/voice/continue";

/// Path the carrier calls when a new call comes in.
pub const INCOMING_PATH: &str = "/api/voice/incoming";

/// Voice used by the failure document, available in every carrier region.
pub const FALLBACK_VOICE: &str = "alice";

pub const FALLBACK_MESSAGE: &str = "I am having trouble right now. Please call back later.";

const FIRST_PROMPT: &str = "Please tell me what you need.";
const NO_RESPONSE_GOODBYE: &str = "I did not catch that. Goodbye.";
const NO_INPUT_MESSAGE: &str = "I did not catch that. Please say that again.";
const NO_INPUT_PROMPT: &str = "What can I help you with?";
const FOLLOW_UP_PROMPT: &str = "Anything else?";
const GOODBYE: &str = "Goodbye.";

static TERMINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(goodbye|bye|hang up|that['’]s all|that is all)\b")
        .expect("termination pattern is valid")
});

/// Whether the caller asked to end the call.
///
/// Whole-word, case-insensitive match against the closing phrases.
pub fn is_termination(text: &str) -> bool {
    TERMINATION.is_match(text)
}

/// The document sent when handling a turn failed.
///
/// Built from constants only, so it cannot itself fail.
pub fn fallback_document() -> VoiceResponse {
    VoiceResponse::new()
        .say(FALLBACK_VOICE, FALLBACK_MESSAGE)
        .hangup()
}

/// Builds the documents for one call, given the voice and the base URL the
/// carrier reached us on.
#[derive(Debug, Clone)]
pub struct CallScript<'a> {
    voice: &'a str,
    callback: String,
}

impl<'a> CallScript<'a> {
    pub fn new(voice: &'a str, base_url: &str) -> Self {
        Self {
            voice,
            callback: format!("{}{}", base_url.trim_end_matches('/'), CONTINUE_PATH),
        }
    }

    /// Absolute URL listen instructions post back to.
    pub fn callback(&self) -> &str {
        &self.callback
    }

    fn listen(&self, prompt: &str) -> Gather {
        Gather::speech(self.callback.as_str()).prompt(Say::new(self.voice, prompt))
    }

    /// First document of a call.
    pub fn greeting(&self, greeting: &str) -> VoiceResponse {
        VoiceResponse::new()
            .say(self.voice, greeting)
            .gather(self.listen(FIRST_PROMPT))
            .say(self.voice, NO_RESPONSE_GOODBYE)
            .hangup()
    }

    /// Re-prompt after a turn with no recognized speech.
    pub fn no_input(&self) -> VoiceResponse {
        VoiceResponse::new()
            .say(self.voice, NO_INPUT_MESSAGE)
            .gather(self.listen(NO_INPUT_PROMPT))
            .say(self.voice, GOODBYE)
            .hangup()
    }

    /// Speaks the reply and ends the call.
    pub fn closing(&self, reply: &str) -> VoiceResponse {
        VoiceResponse::new().say(self.voice, reply).hangup()
    }

    /// Speaks the reply and listens for the next utterance.
    pub fn continuing(&self, reply: &str) -> VoiceResponse {
        VoiceResponse::new()
            .say(self.voice, reply)
            .gather(self.listen(FOLLOW_UP_PROMPT))
            .say(self.voice, GOODBYE)
            .hangup()
    }
}
