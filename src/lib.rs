//! Terminal chat client for a moderation-aware assistant backend.
//!
//! The backend pairs an answering assistant with a moderating guardian:
//! every exchange comes back labeled SAFE, FLAGGED, or DENIED, and the
//! guardian also owns the energy-mode switch and the audited shutdown.
//! Parley wraps the backend's four HTTP endpoints behind a typed client,
//! keeps the conversation state in memory, and renders it in the terminal.
//!
//! Layout:
//! - [`api`] — synchronous HTTP client and wire types
//! - [`session`] — pure, testable chat state machine
//! - [`repl`] — the interactive chat loop
//! - [`cli`] — one-shot subcommand handlers
//! - [`config`] — layered TOML/env configuration
//! - [`transcript`] — local JSONL log of completed exchanges

pub mod api;
pub mod cli;
pub mod config;
pub mod repl;
pub mod session;
pub mod transcript;
