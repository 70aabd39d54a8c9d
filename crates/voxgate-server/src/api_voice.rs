//! Carrier voice webhooks.
//!
//! - `/api/voice/incoming` answers a new call with a greeting and a listen
//!   instruction.
//! - `/api/voice/continue` receives each recognized utterance, replies, and
//!   either listens again or hangs up.
//!
//! Both always answer `200 text/xml`. A carrier that gets an error status or
//! an unparseable body drops the call without a word, so failures are turned
//! into [`fallback_document`] here instead of bubbling up as HTTP errors.

use crate::base_url::resolve_base_url;
use crate::call_flow::{fallback_document, is_termination, CallScript};
use crate::turn::InboundTurn;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use voxgate_reply::ReplyError;
use voxgate_twiml::{VoiceResponse, CONTENT_TYPE};

/// Failures while handling a continuation turn.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("failed to read request body: {0}")]
    Body(#[from] BytesRejection),

    #[error("reply generation failed: {0}")]
    Reply(#[from] ReplyError),
}

/// Wraps a document in a `200 text/xml` response.
pub fn xml_response(doc: &VoiceResponse) -> Response {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], doc.to_xml()).into_response()
}

fn respond_to_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "voice handler panicked, sending fallback document");
    xml_response(&fallback_document())
}

/// Layer that turns a panicking voice handler into the fallback document.
pub fn error_boundary() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(respond_to_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}

/// Handler for `/api/voice/incoming`.
pub async fn incoming_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let base_url = resolve_base_url(&headers, &state.config.server.fallback_host);
    let script = CallScript::new(&state.config.assistant.voice, &base_url);

    tracing::info!(callback = script.callback(), "answering new call");
    xml_response(&script.greeting(&state.config.assistant.greeting))
}

/// Handler for `/api/voice/continue`.
///
/// Accepts any method; a request without a body is an empty turn.
pub async fn continue_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match continue_call(&state, &headers, body).await {
        Ok(doc) => xml_response(&doc),
        Err(e) => {
            tracing::error!(error = %e, "continuation turn failed, sending fallback document");
            xml_response(&fallback_document())
        }
    }
}

/// Decides the next document for one caller turn.
async fn continue_call(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<VoiceResponse, CallError> {
    let base_url = resolve_base_url(headers, &state.config.server.fallback_host);
    let script = CallScript::new(&state.config.assistant.voice, &base_url);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let turn = InboundTurn::from_body(content_type, &body?);
    let call_sid = turn.call_sid.as_deref().unwrap_or_default();
    let user_text = turn.speech();

    if user_text.is_empty() {
        tracing::info!(call_sid, branch = "no_input", "no speech recognized, prompting again");
        return Ok(script.no_input());
    }

    tracing::debug!(call_sid, speech = user_text, "caller said");
    let reply = state.replies.reply(user_text).await?;

    if is_termination(user_text) {
        tracing::info!(call_sid, branch = "closing", "caller ended the call");
        return Ok(script.closing(&reply));
    }

    tracing::info!(call_sid, branch = "continuing", "replied, listening for more");
    Ok(script.continuing(&reply))
}
