/// Local transcript of completed exchanges.
///
/// Each accepted chat submission that received a reply (including fallback
/// replies) is appended as one JSON line to `~/.parley/transcript.jsonl`.
/// All file I/O is best-effort: a failed write never disturbs the
/// conversation, and malformed lines are skipped on read.
///
/// The transcript is the only thing parley persists. The in-memory session
/// itself is discarded when the process exits.
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::SafetyStatus;
use crate::config;

// ---------------------------------------------------------------------------
// Transcript entry
// ---------------------------------------------------------------------------

/// One completed exchange in the transcript log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: String,
    pub lang: String,
    /// The user's message as sent.
    pub prompt: String,
    /// The reply text as rendered.
    pub answer: String,
    pub status: SafetyStatus,
    /// Backend audit token, when the exchange was audited.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audit_id: Option<String>,
    /// True when the answer is the canned substitute, not a backend reply.
    #[serde(default)]
    pub fallback: bool,
}

impl TranscriptEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        lang: &str,
        prompt: &str,
        answer: &str,
        status: SafetyStatus,
        audit_id: Option<String>,
        fallback: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            lang: lang.to_string(),
            prompt: prompt.to_string(),
            answer: answer.to_string(),
            status,
            audit_id,
            fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append an exchange to the transcript. Best-effort; errors are swallowed.
pub fn log_exchange(entry: &TranscriptEntry) {
    let _ = append_entry(entry);
}

fn append_entry(entry: &TranscriptEntry) -> Result<()> {
    let Some(path) = transcript_path() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read all transcript entries, oldest first.
///
/// Silently skips malformed lines. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_all_entries() -> Vec<TranscriptEntry> {
    let Some(path) = transcript_path() else {
        return Vec::new();
    };

    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let reader = BufReader::new(file);
    reader
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<TranscriptEntry>(&line).ok())
        .collect()
}

/// Read the most recent `limit` entries, oldest first.
pub fn read_recent(limit: usize) -> Vec<TranscriptEntry> {
    let mut entries = read_all_entries();
    if entries.len() > limit {
        entries.drain(..entries.len() - limit);
    }
    entries
}

/// Return the path to the transcript file.
pub fn transcript_path() -> Option<PathBuf> {
    config::parley_dir().map(|dir| dir.join("transcript.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_through_json() {
        let entry = TranscriptEntry::new(
            "fr",
            "Bonjour",
            "Bonjour! Comment puis-je aider?",
            SafetyStatus::Safe,
            None,
            false,
        );
        let json = serde_json::to_string(&entry).unwrap();
        // audit_id is omitted entirely when absent
        assert!(!json.contains("audit_id"));

        let parsed: TranscriptEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.lang, "fr");
        assert_eq!(parsed.status, SafetyStatus::Safe);
        assert!(!parsed.fallback);
    }

    #[test]
    fn entry_with_audit_id_keeps_it() {
        let entry = TranscriptEntry::new(
            "en",
            "restricted question",
            "I can't share that.",
            SafetyStatus::Denied,
            Some("aud-17".to_string()),
            false,
        );
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: TranscriptEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.audit_id.as_deref(), Some("aud-17"));
    }

    #[test]
    fn fallback_defaults_to_false_when_absent() {
        let json = r#"{"timestamp":"t","lang":"en","prompt":"p","answer":"a","status":"SAFE"}"#;
        let parsed: TranscriptEntry = serde_json::from_str(json).unwrap();
        assert!(!parsed.fallback);
    }
}
