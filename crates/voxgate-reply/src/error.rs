use thiserror::Error;

/// Failures the reply engine cannot turn into a spoken reply on its own.
///
/// Upstream status errors and empty completions are *not* represented
/// here; they resolve to fixed apology strings instead.
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}
