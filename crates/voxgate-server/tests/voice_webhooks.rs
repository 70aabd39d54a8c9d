use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use voxgate_reply::rules::{CAPABILITY_REPLY, FAREWELL_REPLY, GREETING_REPLY};
use voxgate_reply::TROUBLE_REPLY;
use voxgate_server::{app, config::Config, AppState};

const FORM: &str = "application/x-www-form-urlencoded";

const FALLBACK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say voice="alice">I am having trouble right now. Please call back later.</Say>
  <Hangup/>
</Response>"#;

fn rule_based_app() -> Router {
    app(AppState::from_config(Config::default(), reqwest::Client::new()))
}

fn completion_app(endpoint: String) -> Router {
    let mut config = Config::default();
    config.completion.api_key = Some("sk-test".to_string());
    config.completion.endpoint = endpoint;
    app(AppState::from_config(config, reqwest::Client::new()))
}

/// Serves a fake completion endpoint that counts hits and answers with
/// whatever `respond` builds from the user's message.
async fn fake_completion<F>(hits: Arc<AtomicUsize>, respond: F) -> String
where
    F: Fn(String) -> Response + Clone + Send + Sync + 'static,
{
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let hits = hits.clone();
            let respond = respond.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let user = body["messages"][1]["content"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                respond(user)
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/v1/chat/completions", addr)
}

fn echo(user: String) -> Response {
    Json(json!({ "choices": [{ "message": { "content": format!("You said {}", user) } }] }))
        .into_response()
}

fn continue_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/voice/continue")
        .header(header::HOST, "voice.example.com")
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends `req` and returns the XML body after checking status and content type.
async fn send(app: Router, req: Request<Body>) -> String {
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/xml"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let response = rule_based_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn incoming_call_greets_and_listens() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/voice/incoming")
        .header("x-forwarded-host", "public.example.com")
        .header("x-forwarded-proto", "https")
        .header(header::HOST, "internal:3000")
        .body(Body::empty())
        .unwrap();

    let xml = send(rule_based_app(), req).await;
    let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say voice="Polly.Joanna">Hi, this is your assistant. How can I help you today?</Say>
  <Gather input="speech" language="en-US" action="https://public.example.com/api/voice/continue" method="POST" speechTimeout="auto">
    <Say voice="Polly.Joanna">Please tell me what you need.</Say>
  </Gather>
  <Say voice="Polly.Joanna">I did not catch that. Goodbye.</Say>
  <Hangup/>
</Response>"#;
    assert_eq!(xml, expected);
}

#[tokio::test]
async fn incoming_call_accepts_get_and_uses_configured_voice() {
    let mut config = Config::default();
    config.assistant.voice = "Polly.Matthew".to_string();
    config.assistant.greeting = "Thanks for calling Acme.".to_string();
    config.server.fallback_host = "acme.example".to_string();
    let app = app(AppState::from_config(config, reqwest::Client::new()));

    let req = Request::builder()
        .uri("/api/voice/incoming")
        .body(Body::empty())
        .unwrap();
    let xml = send(app, req).await;
    assert!(xml.contains(r#"<Say voice="Polly.Matthew">Thanks for calling Acme.</Say>"#));
    assert!(xml.contains(r#"action="https://acme.example/api/voice/continue""#));
}

#[tokio::test]
async fn empty_speech_reprompts_without_calling_reply_engine() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = fake_completion(hits.clone(), echo).await;

    for body in ["", "SpeechResult=", "SpeechResult=+++%09", "CallSid=CA1&From=%2B1555"] {
        let xml = send(completion_app(endpoint.clone()), continue_request(body)).await;
        assert!(xml.contains("I did not catch that. Please say that again."));
        assert!(xml.contains(r#"action="https://voice.example.com/api/voice/continue""#));
        assert!(xml.contains("What can I help you with?"));
        assert!(xml.trim_end().ends_with("<Hangup/>\n</Response>"));
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn continue_accepts_get_and_reprompts() {
    let req = Request::builder()
        .method("GET")
        .uri("/api/voice/continue")
        .header(header::HOST, "voice.example.com")
        .body(Body::empty())
        .unwrap();

    let xml = send(rule_based_app(), req).await;
    assert!(xml.contains("I did not catch that. Please say that again."));
    assert!(xml.contains(r#"action="https://voice.example.com/api/voice/continue""#));
    assert!(xml.contains("What can I help you with?"));
}

#[tokio::test]
async fn termination_phrase_speaks_reply_and_hangs_up() {
    let xml = send(rule_based_app(), continue_request("SpeechResult=OK+goodbye")).await;
    let expected = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say voice="Polly.Joanna">{}</Say>
  <Hangup/>
</Response>"#,
        FAREWELL_REPLY
    );
    assert_eq!(xml, expected);
}

#[tokio::test]
async fn multi_word_termination_phrase_has_no_listen() {
    let xml = send(rule_based_app(), continue_request("SpeechResult=That+is+all")).await;
    assert_eq!(xml.matches("<Say ").count(), 1);
    assert!(xml.contains(CAPABILITY_REPLY));
    assert!(!xml.contains("<Gather"));
    assert!(xml.contains("<Hangup/>"));
}

#[tokio::test]
async fn ordinary_speech_replies_and_listens_again() {
    let xml = send(
        rule_based_app(),
        continue_request("SpeechResult=tell+me+a+joke&CallSid=CA42"),
    )
    .await;
    let expected = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say voice="Polly.Joanna">{}</Say>
  <Gather input="speech" language="en-US" action="https://voice.example.com/api/voice/continue" method="POST" speechTimeout="auto">
    <Say voice="Polly.Joanna">Anything else?</Say>
  </Gather>
  <Say voice="Polly.Joanna">Goodbye.</Say>
  <Hangup/>
</Response>"#,
        CAPABILITY_REPLY
    );
    assert_eq!(xml, expected);
}

#[tokio::test]
async fn json_body_is_accepted() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/voice/continue")
        .header("x-forwarded-host", "proxy.example.com")
        .header("x-forwarded-proto", "http")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"SpeechResult":"hello there","CallSid":7}"#))
        .unwrap();

    let xml = send(rule_based_app(), req).await;
    assert!(xml.contains(GREETING_REPLY));
    assert!(xml.contains(r#"action="http://proxy.example.com/api/voice/continue""#));
}

#[tokio::test]
async fn completion_reply_is_escaped_into_document() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = fake_completion(hits.clone(), echo).await;

    let xml = send(
        completion_app(endpoint),
        continue_request("SpeechResult=Tom+%26+Jerry+%3C3"),
    )
    .await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(xml.contains("You said Tom &amp; Jerry &lt;3"));
    assert!(xml.contains("<Gather"));
}

#[tokio::test]
async fn completion_server_error_is_spoken_as_apology() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = fake_completion(hits.clone(), |_| {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
    .await;

    let xml = send(
        completion_app(endpoint),
        continue_request("SpeechResult=book+a+table"),
    )
    .await;
    assert!(xml.contains(TROUBLE_REPLY));
    assert!(xml.contains("Anything else?"));
}

#[tokio::test]
async fn unreachable_completion_service_yields_fallback_document() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let xml = send(
        completion_app(format!("http://{}/v1/chat/completions", addr)),
        continue_request("SpeechResult=book+a+table"),
    )
    .await;
    assert_eq!(xml, FALLBACK_XML);
}

#[tokio::test]
async fn garbage_completion_body_yields_fallback_document() {
    let hits = Arc::new(AtomicUsize::new(0));
    let endpoint = fake_completion(hits.clone(), |_| "<html>oops</html>".into_response()).await;

    let xml = send(
        completion_app(endpoint),
        continue_request("SpeechResult=book+a+table"),
    )
    .await;
    assert_eq!(xml, FALLBACK_XML);
}

#[tokio::test]
async fn oversized_body_yields_fallback_document() {
    let body = format!("SpeechResult={}", "a".repeat(128 * 1024));
    let xml = send(rule_based_app(), continue_request(&body)).await;
    assert_eq!(xml, FALLBACK_XML);
}

#[tokio::test]
async fn panicking_handler_yields_fallback_document() {
    async fn explode() -> &'static str {
        panic!("handler blew up")
    }

    let app = Router::new()
        .route("/api/voice/continue", post(explode))
        .layer(voxgate_server::api_voice::error_boundary());

    let xml = send(app, continue_request("SpeechResult=hi")).await;
    assert_eq!(xml, FALLBACK_XML);
}
