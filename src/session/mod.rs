/// In-memory chat session state.
///
/// [`ChatSession`] is the single owner of everything the conversation view
/// needs: the ordered message list, the phase machine, the active energy
/// mode and language, and the last health snapshot. All transitions are
/// pure (no I/O, no clock reads beyond timestamping appended messages), so
/// the full state machine is unit-testable without a backend.
///
/// # Phase machine
///
/// ```text
/// Idle --begin_submit--> AwaitingResponse --record_reply--> Idle
/// Idle --begin_control--> AwaitingResponse --finish_*/abort_control--> Idle | Shutdown
/// any  --apply_health("shutdown")--> Shutdown
/// ```
///
/// `Shutdown` is terminal: every submit and control attempt is rejected
/// until the process restarts. `AwaitingResponse` covers chat submissions
/// and control actions alike, so at most one backend call is ever in flight
/// per session and mode-toggle/shutdown cannot re-enter each other.
use chrono::{DateTime, Utc};

use crate::api::{EnergyMode, HealthSnapshot, SafetyStatus, SendOutcome};

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    /// The answering persona.
    Assistant,
    /// The moderating persona; also the voice of system notices.
    Guardian,
}

impl Sender {
    /// Display label for rendering.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
            Self::Guardian => "Guardian",
        }
    }
}

/// One entry in the conversation. Immutable once appended.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Session-local identifier, monotonically increasing.
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub status: SafetyStatus,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Phase machine
// ---------------------------------------------------------------------------

/// Where the session is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready for input.
    Idle,
    /// One backend call is in flight; further actions are rejected.
    AwaitingResponse,
    /// The backend shut down. Terminal.
    Shutdown,
}

/// Why a chat submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// Input was empty or whitespace-only.
    Blank,
    /// A request is already in flight.
    Busy,
    /// The session is shut down.
    Shutdown,
}

/// Why a control action (mode toggle, shutdown) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRejection {
    /// A request is already in flight.
    Busy,
    /// The session is shut down.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The chat view's state container.
#[derive(Debug)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    phase: Phase,
    mode: EnergyMode,
    lang: String,
    health: Option<HealthSnapshot>,
    next_id: u64,
}

impl ChatSession {
    /// Create a fresh session in the given UI language.
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            phase: Phase::Idle,
            mode: EnergyMode::Normal,
            lang: lang.into(),
            health: None,
            next_id: 1,
        }
    }

    // -- Accessors --

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_shutdown(&self) -> bool {
        self.phase == Phase::Shutdown
    }

    pub fn mode(&self) -> EnergyMode {
        self.mode
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    pub fn health(&self) -> Option<&HealthSnapshot> {
        self.health.as_ref()
    }

    // -- Chat submission --

    /// Start a chat submission.
    ///
    /// On acceptance the trimmed text is appended as a user message, the
    /// session enters [`Phase::AwaitingResponse`], and the text to send is
    /// returned. Blank input, an in-flight request, and a shut-down session
    /// are all rejected without touching the message list.
    pub fn begin_submit(&mut self, input: &str) -> Result<String, SubmitRejection> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SubmitRejection::Blank);
        }
        match self.phase {
            Phase::AwaitingResponse => return Err(SubmitRejection::Busy),
            Phase::Shutdown => return Err(SubmitRejection::Shutdown),
            Phase::Idle => {}
        }

        let text = text.to_string();
        self.append(text.clone(), Sender::User, SafetyStatus::Safe);
        self.phase = Phase::AwaitingResponse;
        Ok(text)
    }

    /// Record the reply to an accepted submission and return to idle.
    ///
    /// FLAGGED replies are attributed to the guardian persona; every other
    /// status to the assistant. Returns a copy of the appended message.
    pub fn record_reply(&mut self, outcome: &SendOutcome) -> ChatMessage {
        let reply = outcome.reply();
        let sender = match reply.status {
            SafetyStatus::Flagged => Sender::Guardian,
            SafetyStatus::Safe | SafetyStatus::Denied => Sender::Assistant,
        };
        let msg = self.append(reply.answer.clone(), sender, reply.status);
        if self.phase == Phase::AwaitingResponse {
            self.phase = Phase::Idle;
        }
        msg
    }

    // -- Control actions (mode toggle, shutdown) --

    /// Reserve the session for a control action.
    ///
    /// Control actions share the same in-flight gate as chat submissions,
    /// so a slow mode toggle cannot overlap a shutdown or another toggle.
    pub fn begin_control(&mut self) -> Result<(), ControlRejection> {
        match self.phase {
            Phase::AwaitingResponse => Err(ControlRejection::Busy),
            Phase::Shutdown => Err(ControlRejection::Shutdown),
            Phase::Idle => {
                self.phase = Phase::AwaitingResponse;
                Ok(())
            }
        }
    }

    /// Release the control gate without changing any other state.
    ///
    /// The failure branch of mode toggle and shutdown: the action did not
    /// happen, so the session looks exactly as it did before.
    pub fn abort_control(&mut self) {
        if self.phase == Phase::AwaitingResponse {
            self.phase = Phase::Idle;
        }
    }

    /// Apply a confirmed mode change and return the notice appended for it.
    pub fn finish_mode_change(&mut self, mode: EnergyMode) -> ChatMessage {
        self.mode = mode;
        let text = match mode {
            EnergyMode::Peak => {
                "Energy mode changed to peak. The system is running at reduced capacity."
            }
            EnergyMode::Normal => {
                "Energy mode changed to normal. The system is restored to full capacity."
            }
        };
        let msg = self.append(text.to_string(), Sender::Guardian, SafetyStatus::Safe);
        if self.phase == Phase::AwaitingResponse {
            self.phase = Phase::Idle;
        }
        msg
    }

    /// Apply a confirmed shutdown: append the audit confirmation and enter
    /// the terminal phase.
    pub fn finish_shutdown(&mut self, message: &str, audit_id: &str) -> ChatMessage {
        let text = format!("{message} Audit ID: {audit_id}");
        let msg = self.append(text, Sender::Guardian, SafetyStatus::Safe);
        self.phase = Phase::Shutdown;
        msg
    }

    // -- Health --

    /// Adopt the backend's reported state from a health snapshot.
    ///
    /// Updates the displayed mode (unrecognized mode strings keep the
    /// current one) and enters the terminal phase when the backend reports
    /// itself shut down.
    pub fn apply_health(&mut self, health: &HealthSnapshot) {
        if let Some(mode) = EnergyMode::parse(&health.mode) {
            self.mode = mode;
        }
        if health.is_shutdown() {
            self.phase = Phase::Shutdown;
        }
        self.health = Some(health.clone());
    }

    // -- Internal --

    fn append(&mut self, text: String, sender: Sender, status: SafetyStatus) -> ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        let msg = ChatMessage {
            id,
            text,
            sender,
            status,
            timestamp: Utc::now(),
        };
        self.messages.push(msg.clone());
        msg
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatReply;

    fn reply(status: SafetyStatus) -> SendOutcome {
        SendOutcome::Reply(ChatReply {
            answer: "reply text".to_string(),
            status,
            audit_id: None,
        })
    }

    #[test]
    fn submit_appends_user_then_reply_in_order() {
        let mut session = ChatSession::new("en");
        let sent = session.begin_submit("  hello there  ").unwrap();
        assert_eq!(sent, "hello there");
        assert_eq!(session.phase(), Phase::AwaitingResponse);

        session.record_reply(&reply(SafetyStatus::Safe));
        assert_eq!(session.phase(), Phase::Idle);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "hello there");
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert!(messages[0].id < messages[1].id);
    }

    #[test]
    fn blank_submit_is_rejected() {
        let mut session = ChatSession::new("en");
        assert_eq!(session.begin_submit(""), Err(SubmitRejection::Blank));
        assert_eq!(session.begin_submit("   \t "), Err(SubmitRejection::Blank));
        assert!(session.messages().is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn submit_while_awaiting_is_rejected() {
        let mut session = ChatSession::new("en");
        session.begin_submit("first").unwrap();
        let before = session.messages().len();

        assert_eq!(session.begin_submit("second"), Err(SubmitRejection::Busy));
        assert_eq!(session.messages().len(), before);
    }

    #[test]
    fn flagged_reply_routes_to_guardian() {
        let mut session = ChatSession::new("en");
        session.begin_submit("tell me the restricted procedures").unwrap();
        let msg = session.record_reply(&reply(SafetyStatus::Flagged));
        assert_eq!(msg.sender, Sender::Guardian);
        assert_eq!(msg.status, SafetyStatus::Flagged);
    }

    #[test]
    fn safe_and_denied_replies_route_to_assistant() {
        let mut session = ChatSession::new("en");
        session.begin_submit("hi").unwrap();
        assert_eq!(
            session.record_reply(&reply(SafetyStatus::Safe)).sender,
            Sender::Assistant
        );
        session.begin_submit("hi again").unwrap();
        assert_eq!(
            session.record_reply(&reply(SafetyStatus::Denied)).sender,
            Sender::Assistant
        );
    }

    #[test]
    fn shutdown_is_terminal_for_submissions() {
        let mut session = ChatSession::new("en");
        session.begin_control().unwrap();
        session.finish_shutdown("System shutdown complete.", "aud-7");

        assert_eq!(session.phase(), Phase::Shutdown);
        assert_eq!(
            session.begin_submit("anyone there?"),
            Err(SubmitRejection::Shutdown)
        );
        assert_eq!(session.begin_control(), Err(ControlRejection::Shutdown));
        assert_eq!(session.phase(), Phase::Shutdown);
    }

    #[test]
    fn shutdown_notice_carries_audit_id() {
        let mut session = ChatSession::new("en");
        session.begin_control().unwrap();
        let msg = session.finish_shutdown("System shutdown complete.", "aud-99");
        assert_eq!(msg.sender, Sender::Guardian);
        assert!(msg.text.contains("Audit ID: aud-99"));
    }

    #[test]
    fn mode_change_updates_mode_and_appends_one_notice() {
        let mut session = ChatSession::new("en");
        assert_eq!(session.mode(), EnergyMode::Normal);

        session.begin_control().unwrap();
        let target = session.mode().toggled();
        assert_eq!(target, EnergyMode::Peak);

        let msg = session.finish_mode_change(target);
        assert_eq!(msg.sender, Sender::Guardian);
        assert!(msg.text.contains("peak"));

        assert_eq!(session.mode(), EnergyMode::Peak);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn control_is_debounced_while_awaiting() {
        let mut session = ChatSession::new("en");
        session.begin_submit("question").unwrap();
        assert_eq!(session.begin_control(), Err(ControlRejection::Busy));
    }

    #[test]
    fn abort_control_leaves_state_unchanged() {
        let mut session = ChatSession::new("en");
        session.begin_control().unwrap();
        session.abort_control();

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.mode(), EnergyMode::Normal);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn apply_health_adopts_mode_and_shutdown_flag() {
        let mut session = ChatSession::new("en");
        let health: HealthSnapshot = serde_json::from_str(
            r#"{"ok":true,"status":"running","mode":"peak","timestamp":"t"}"#,
        )
        .unwrap();
        session.apply_health(&health);
        assert_eq!(session.mode(), EnergyMode::Peak);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.health().is_some());

        let health: HealthSnapshot = serde_json::from_str(
            r#"{"ok":true,"status":"shutdown","mode":"garbled","timestamp":"t"}"#,
        )
        .unwrap();
        session.apply_health(&health);
        // unrecognized mode string keeps the previous mode
        assert_eq!(session.mode(), EnergyMode::Peak);
        assert_eq!(session.phase(), Phase::Shutdown);
    }

    #[test]
    fn lang_is_passed_through_verbatim() {
        let mut session = ChatSession::new("ht");
        assert_eq!(session.lang(), "ht");
        session.set_lang("fr");
        assert_eq!(session.lang(), "fr");
    }
}
