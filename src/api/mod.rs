/// HTTP client for the moderated assistant backend.
///
/// The backend exposes four endpoints under `/api/`:
///
/// - `POST /api/chat` — submit a message, receive a labeled reply
/// - `GET /api/health` — system health snapshot
/// - `POST /api/mode` — switch the energy mode (`normal` / `peak`)
/// - `POST /api/shutdown` — request an audited shutdown
///
/// The client is synchronous (`ureq`) with a fixed per-request deadline and
/// no retries. Failure handling is two-tiered:
///
/// 1. **Chat** never errors. A transport or server failure is absorbed into
///    a canned SAFE-status apology so the conversation keeps flowing; the
///    caller can still tell the two apart via [`SendOutcome`].
/// 2. **Health / mode / shutdown** propagate errors to the caller, which
///    decides whether to surface or log them.
pub mod client;
pub mod wire;

pub use client::{ApiClient, SendOutcome};
pub use wire::{ChatReply, EnergyMode, HealthSnapshot, ModeAck, SafetyStatus, ShutdownAck};
