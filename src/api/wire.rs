/// Request and response types for the backend's HTTP/JSON contract.
///
/// These map field-for-field onto the backend's wire format. Optional fields
/// (`audit_id`, `message`) deserialize to `None` when absent so that older
/// backend builds remain compatible.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shared enums
// ---------------------------------------------------------------------------

/// Moderation label the backend attaches to every exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SafetyStatus {
    /// The exchange passed moderation.
    Safe,
    /// The guardian intervened; the reply comes from the guardian persona.
    Flagged,
    /// The request was refused outright.
    Denied,
}

impl std::fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "SAFE"),
            Self::Flagged => write!(f, "FLAGGED"),
            Self::Denied => write!(f, "DENIED"),
        }
    }
}

/// Backend operational mode. `Peak` means the grid is constrained and the
/// backend runs at reduced capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyMode {
    #[default]
    Normal,
    Peak,
}

impl EnergyMode {
    /// Parse a mode string as the backend reports it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "peak" => Some(Self::Peak),
            _ => None,
        }
    }

    /// The mode a toggle switches to.
    pub fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Peak,
            Self::Peak => Self::Normal,
        }
    }
}

impl std::fmt::Display for EnergyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Peak => write!(f, "peak"),
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

/// Request body for `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub lang: &'a str,
}

/// Labeled reply from `POST /api/chat`.
///
/// `audit_id` is present only when the backend logged the exchange for audit
/// review (typically FLAGGED and DENIED outcomes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    pub status: SafetyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Response body from `GET /api/health`.
///
/// `status` is a free-form string; the value `"shutdown"` indicates the
/// backend has stopped accepting requests. `services` maps each backend
/// component to its own status string (ordered for stable rendering).
#[derive(Debug, Clone, Deserialize)]
pub struct HealthSnapshot {
    pub ok: bool,
    pub status: String,
    pub mode: String,
    pub timestamp: String,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

impl HealthSnapshot {
    /// Whether the backend reports itself as shut down.
    pub fn is_shutdown(&self) -> bool {
        self.status == "shutdown"
    }
}

// ---------------------------------------------------------------------------
// POST /api/mode
// ---------------------------------------------------------------------------

/// Request body for `POST /api/mode`.
#[derive(Debug, Serialize)]
pub struct ModeRequest {
    pub mode: EnergyMode,
}

/// Response body from `POST /api/mode`.
///
/// `ok: false` with a `message` means the backend rejected the change (e.g.
/// an unrecognized mode); `mode` then still carries the active mode.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeAck {
    pub ok: bool,
    pub mode: String,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /api/shutdown
// ---------------------------------------------------------------------------

/// Response body from `POST /api/shutdown`.
///
/// `audit_id` correlates the shutdown with the backend's audit log entry.
/// A refused shutdown comes back as `ok: false` with an explanatory message.
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownAck {
    pub ok: bool,
    pub message: String,
    pub audit_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
