//! HTTP server: signed slash command intake.
//!
//! Slack expects an acknowledgement within three seconds, so the handler
//! verifies and acks immediately and builds the digest on a spawned task.

use crate::digest::DigestService;
use crate::messaging::traits::{Presenter, Workspace};
use crate::SlashCommand;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Requests older (or newer) than this are rejected as replays.
const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Shared state of the HTTP handlers.
pub struct ServerState<W, P> {
    pub digest: Arc<DigestService<W, P>>,
    pub signing_secret: String,
    /// The one slash command this instance answers.
    pub command: String,
}

/// Why an inbound request was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("missing or unreadable header {0}")]
    MissingHeader(&'static str),

    #[error("request timestamp is outside the accepted window")]
    Stale,

    #[error("signature does not match")]
    BadSignature,

    #[error("missing form field {0}")]
    MissingField(&'static str),
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct CommandReply {
    response_type: &'static str,
    text: String,
}

/// Routes: `POST /slack/events` and `GET /health`.
pub fn router<W: Workspace, P: Presenter>(state: Arc<ServerState<W, P>>) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events::<W, P>))
        .route("/health", get(health))
        .with_state(state)
}

/// Start the HTTP server on the given address.
pub async fn start_http_server<W: Workspace, P: Presenter>(
    bind: SocketAddr,
    state: Arc<ServerState<W, P>>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with error");
        }
    });

    Ok(handle)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn slack_events<W: Workspace, P: Presenter>(
    State(state): State<Arc<ServerState<W, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let now = chrono::Utc::now().timestamp();
    if let Err(error) = verify_signature(&state.signing_secret, &headers, &body, now) {
        tracing::warn!(%error, "rejected slack request");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let form: HashMap<String, String> = form_urlencoded::parse(&body).into_owned().collect();

    // Slack's periodic certificate check carries no command.
    if form.contains_key("ssl_check") {
        return StatusCode::OK.into_response();
    }

    let command = match parse_command(&form) {
        Ok(command) => command,
        Err(error) => {
            tracing::warn!(%error, "malformed slash command payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if command.command != state.command {
        tracing::warn!(
            command = %command.command,
            user_id = %command.user_id,
            "slash command not configured, ignoring"
        );
        return Json(CommandReply {
            response_type: "ephemeral",
            text: format!("`{}` is not configured on this instance.", command.command),
        })
        .into_response();
    }

    tracing::info!(
        command = %command.command,
        user_id = %command.user_id,
        channel_id = %command.channel_id,
        "slash command received"
    );

    let digest = state.digest.clone();
    tokio::spawn(async move {
        digest.handle(&command).await;
    });

    // Ack with an empty body; the digest arrives as a modal.
    StatusCode::OK.into_response()
}

/// Check Slack's v0 request signature.
pub fn verify_signature(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<(), RequestError> {
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(RequestError::MissingHeader(TIMESTAMP_HEADER))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(RequestError::MissingHeader(SIGNATURE_HEADER))?;

    let sent_at: i64 = timestamp.parse().map_err(|_| RequestError::Stale)?;
    if (now - sent_at).abs() > MAX_REQUEST_AGE_SECS {
        return Err(RequestError::Stale);
    }

    let expected = signature
        .strip_prefix("v0=")
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
        .ok_or(RequestError::BadSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| RequestError::BadSignature)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| RequestError::BadSignature)
}

/// Build a [`SlashCommand`] from decoded form fields.
pub fn parse_command(form: &HashMap<String, String>) -> Result<SlashCommand, RequestError> {
    let field = |name: &'static str| {
        form.get(name)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or(RequestError::MissingField(name))
    };

    Ok(SlashCommand {
        command: field("command")?,
        user_id: field("user_id")?,
        channel_id: field("channel_id")?,
        trigger_id: field("trigger_id")?,
        text: form.get("text").cloned().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DigestConfig;
    use crate::digest::testing::{FakePresenter, FakeWorkspace};

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    fn sign(timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("any key length");
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn signed_headers(timestamp: i64, body: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, timestamp.to_string().parse().expect("header"));
        headers.insert(SIGNATURE_HEADER, sign(timestamp, body).parse().expect("header"));
        headers
    }

    fn form_body(command: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("command", command)
            .append_pair("user_id", "U1")
            .append_pair("channel_id", "C9")
            .append_pair("trigger_id", "13345224609.738474920.8088930838d88f008e0")
            .append_pair("text", "")
            .finish()
    }

    fn state(presenter: Arc<FakePresenter>) -> Arc<ServerState<FakeWorkspace, FakePresenter>> {
        let workspace = FakeWorkspace::new().with_channel_pages(vec![vec![("C1", "general")]]);
        let digest = DigestService::new(
            Arc::new(workspace),
            presenter,
            DigestConfig {
                timezone: Some(chrono_tz::UTC),
                ..DigestConfig::default()
            },
        );
        Arc::new(ServerState {
            digest: Arc::new(digest),
            signing_secret: SECRET.into(),
            command: "/today-alerts".into(),
        })
    }

    fn request(body: String, timestamp: i64, signature: Option<String>) -> Request<Body> {
        let signature = signature.unwrap_or_else(|| sign(timestamp, &body));
        Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("content-type", "application/x-www-form-urlencoded")
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .expect("request")
    }

    #[test]
    fn accepts_a_valid_signature() {
        let now = 1_531_420_618;
        let body = "token=x&command=%2Ftoday-alerts";
        let headers = signed_headers(now, body);
        assert_eq!(verify_signature(SECRET, &headers, body.as_bytes(), now), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_stale_timestamp() {
        let now = 1_531_420_618;
        let headers = signed_headers(now, "command=%2Ftoday-alerts");

        assert_eq!(
            verify_signature(SECRET, &headers, b"command=%2Fother", now),
            Err(RequestError::BadSignature)
        );
        assert_eq!(
            verify_signature(SECRET, &headers, b"command=%2Ftoday-alerts", now + 301),
            Err(RequestError::Stale)
        );
        assert_eq!(
            verify_signature(SECRET, &HeaderMap::new(), b"", now),
            Err(RequestError::MissingHeader(TIMESTAMP_HEADER))
        );
    }

    #[test]
    fn parse_command_requires_trigger_id() {
        let body = form_body("/today-alerts");
        let mut form: HashMap<String, String> =
            form_urlencoded::parse(body.as_bytes()).into_owned().collect();
        let command = parse_command(&form).expect("complete form");
        assert_eq!(command.user_id, "U1");
        assert_eq!(command.channel_id, "C9");

        form.remove("trigger_id");
        assert_eq!(parse_command(&form), Err(RequestError::MissingField("trigger_id")));
    }

    #[tokio::test]
    async fn signed_command_is_acked_and_opens_a_modal() {
        let presenter = Arc::new(FakePresenter::default());
        let app = router(state(presenter.clone()));
        let now = chrono::Utc::now().timestamp();

        let response = app
            .oneshot(request(form_body("/today-alerts"), now, None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        for _ in 0..100 {
            if !presenter.modals().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let modals = presenter.modals();
        assert_eq!(modals.len(), 1);
        assert_eq!(modals[0].1.title, "Today’s Mentions");
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let presenter = Arc::new(FakePresenter::default());
        let app = router(state(presenter.clone()));
        let now = chrono::Utc::now().timestamp();

        let response = app
            .oneshot(request(form_body("/today-alerts"), now, Some("v0=deadbeef".into())))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(presenter.modals().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_gets_ephemeral_reply() {
        let presenter = Arc::new(FakePresenter::default());
        let app = router(state(presenter.clone()));
        let now = chrono::Utc::now().timestamp();

        let response = app
            .oneshot(request(form_body("/something-else"), now, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        let reply: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(reply["response_type"], "ephemeral");
        assert!(reply["text"].as_str().unwrap_or_default().contains("not configured"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(state(Arc::new(FakePresenter::default())));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
