/// Synchronous HTTP client for the assistant backend.
///
/// Thin wrapper over `ureq`: one method per endpoint, a shared base URL and
/// request deadline, and no state beyond that. Created once per command
/// invocation (or once per interactive session) and reused for every call.
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::ParleyConfig;

use super::wire::{
    ChatReply, ChatRequest, EnergyMode, HealthSnapshot, ModeAck, ModeRequest, SafetyStatus,
    ShutdownAck,
};

/// Canned reply substituted when the chat endpoint cannot produce one.
///
/// Kept in the assistant's voice so the fallback reads like any other turn
/// of the conversation.
const FALLBACK_ANSWER: &str = "I'm having some technical difficulties right now. \
     Let me still try to help you - what specific information are you looking for?";

// ---------------------------------------------------------------------------
// Send outcome
// ---------------------------------------------------------------------------

/// Result of a chat submission.
///
/// Chat never fails outright: when the backend is unreachable or returns
/// garbage, the client substitutes a canned SAFE reply. The two cases stay
/// distinguishable so callers can log or annotate degraded turns instead of
/// relying on blanket error catching.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// A reply authored by the backend, including replies carried inside an
    /// HTTP error response (the backend labels refusals that way).
    Reply(ChatReply),
    /// The canned substitute; the backend never saw or answered the message.
    Fallback(ChatReply),
}

impl SendOutcome {
    /// The reply payload, whichever way it was produced.
    pub fn reply(&self) -> &ChatReply {
        match self {
            Self::Reply(reply) | Self::Fallback(reply) => reply,
        }
    }

    /// Consume the outcome, yielding the reply payload.
    pub fn into_reply(self) -> ChatReply {
        match self {
            Self::Reply(reply) | Self::Fallback(reply) => reply,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Build a client from the resolved configuration.
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self::new(&config.backend.base_url, config.backend.timeout_ms)
    }

    /// Build a client for an explicit base URL and timeout.
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit a chat message and return the labeled reply.
    ///
    /// Never errors. Absorption order on failure:
    ///
    /// 1. An HTTP error response whose body still parses as a [`ChatReply`]
    ///    is used as-is; the backend expresses refusals through error
    ///    statuses while still authoring the answer text.
    /// 2. Anything else (transport failure, deadline, unparseable body)
    ///    becomes the canned SAFE fallback.
    pub fn send_message(&self, message: &str, lang: &str) -> SendOutcome {
        let url = self.endpoint("/api/chat");
        let body = ChatRequest { message, lang };

        let result = ureq::post(&url).timeout(self.timeout).send_json(&body);

        match result {
            Ok(resp) => match resp.into_json::<ChatReply>() {
                Ok(reply) => SendOutcome::Reply(reply),
                Err(_) => SendOutcome::Fallback(fallback_reply()),
            },
            Err(ureq::Error::Status(_, resp)) => match resp.into_json::<ChatReply>() {
                Ok(reply) => SendOutcome::Reply(reply),
                Err(_) => SendOutcome::Fallback(fallback_reply()),
            },
            Err(_) => SendOutcome::Fallback(fallback_reply()),
        }
    }

    /// Fetch the backend health snapshot.
    pub fn health(&self) -> Result<HealthSnapshot> {
        let url = self.endpoint("/api/health");

        let resp = ureq::get(&url)
            .timeout(self.timeout)
            .call()
            .context("health request failed")?;

        resp.into_json()
            .context("failed to parse health response")
    }

    /// Switch the backend energy mode.
    pub fn set_mode(&self, mode: EnergyMode) -> Result<ModeAck> {
        let url = self.endpoint("/api/mode");

        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .send_json(&ModeRequest { mode })
            .context("mode request failed")?;

        resp.into_json().context("failed to parse mode response")
    }

    /// Request an audited backend shutdown.
    pub fn shutdown(&self) -> Result<ShutdownAck> {
        let url = self.endpoint("/api/shutdown");

        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .call()
            .context("shutdown request failed")?;

        resp.into_json()
            .context("failed to parse shutdown response")
    }

    /// The base URL this client targets, for display.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Build the canned SAFE-status substitute reply.
fn fallback_reply() -> ChatReply {
    ChatReply {
        answer: FALLBACK_ANSWER.to_string(),
        status: SafetyStatus::Safe,
        audit_id: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_strips_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/", 10_000);
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.endpoint("/api/chat"), "http://localhost:8000/api/chat");
    }

    #[test]
    fn client_from_default_config() {
        let config = ParleyConfig::default();
        let client = ApiClient::from_config(&config);
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn fallback_reply_is_safe_with_no_audit_id() {
        let reply = fallback_reply();
        assert_eq!(reply.status, SafetyStatus::Safe);
        assert!(reply.audit_id.is_none());
        assert!(!reply.answer.is_empty());
    }

    #[test]
    fn send_outcome_accessors() {
        let outcome = SendOutcome::Fallback(fallback_reply());
        assert!(outcome.is_fallback());
        assert_eq!(outcome.reply().status, SafetyStatus::Safe);

        let outcome = SendOutcome::Reply(ChatReply {
            answer: "hi".into(),
            status: SafetyStatus::Denied,
            audit_id: Some("aud-1".into()),
        });
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.into_reply().audit_id.as_deref(), Some("aud-1"));
    }
}
