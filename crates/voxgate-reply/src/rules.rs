//! Built-in responder used when no completion service is configured.

use chrono::NaiveDateTime;

pub const GREETING_REPLY: &str = "Hello! How can I help you today?";
pub const FAREWELL_REPLY: &str = "Goodbye! Have a great day.";
pub const CAPABILITY_REPLY: &str =
    "I can help with general questions, appointments, and basic info. What do you need?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Greeting,
    Time,
    Date,
    Farewell,
}

/// Checked in order; the first rule with a matching keyword wins.
const RULES: &[(&[&str], Rule)] = &[
    (&["hello", "hi"], Rule::Greeting),
    (&["time"], Rule::Time),
    (&["date", "day"], Rule::Date),
    (&["goodbye", "bye"], Rule::Farewell),
];

impl Rule {
    fn render(self, now: NaiveDateTime) -> String {
        match self {
            Rule::Greeting => GREETING_REPLY.to_string(),
            Rule::Time => format!("It is {}.", now.format("%I:%M %p")),
            Rule::Date => format!("Today is {}.", now.format("%-m/%-d/%Y")),
            Rule::Farewell => FAREWELL_REPLY.to_string(),
        }
    }
}

/// Picks a reply by case-insensitive keyword containment.
///
/// `now` is the local wall-clock time used by the time and date rules.
pub fn reply(text: &str, now: NaiveDateTime) -> String {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, rule)| rule.render(now))
        .unwrap_or_else(|| CAPABILITY_REPLY.to_string())
}
