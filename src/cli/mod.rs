//! CLI command implementations for parley's one-shot subcommands.
//!
//! Provides subcommand handlers for:
//! - `parley send "message"` — single exchange, print the labeled reply
//! - `parley health` — backend health check-list
//! - `parley mode normal|peak` — set the energy mode explicitly
//! - `parley shutdown` — audited backend shutdown
//! - `parley transcript` — show recent logged exchanges
//! - `parley config show|init|set|reset` — configuration management
//!
//! The interactive session lives in [`crate::repl`]; the formatting helpers
//! at the bottom are shared between the two.

use std::io::{self, Write};

use anyhow::Result;
use colored::{ColoredString, Colorize};

use crate::api::{ApiClient, EnergyMode, HealthSnapshot, SafetyStatus};
use crate::config;
use crate::session::{ChatSession, Sender};
use crate::transcript::{self, TranscriptEntry};

// ---------------------------------------------------------------------------
// parley send
// ---------------------------------------------------------------------------

/// Send a single message and print the labeled reply.
///
/// Exits successfully even when the reply is the offline fallback: the
/// fallback is part of the contract, not an error.
pub fn run_send(message: &str, lang: Option<String>) -> Result<()> {
    let cfg = config::load();
    let client = ApiClient::from_config(&cfg);
    let lang = lang.unwrap_or_else(|| cfg.chat.lang.clone());
    let mut session = ChatSession::new(lang);

    let text = session
        .begin_submit(message)
        .map_err(|_| anyhow::anyhow!("message is empty"))?;

    let outcome = client.send_message(&text, session.lang());
    let audit_id = outcome.reply().audit_id.clone();
    let fallback = outcome.is_fallback();
    let msg = session.record_reply(&outcome);

    println!(
        "{} {} {}",
        sender_label(msg.sender),
        status_marker(msg.status),
        msg.status.to_string().dimmed()
    );
    println!("{}", msg.text);
    if fallback {
        eprintln!(
            "{}",
            "(offline fallback: the backend did not see this message)".dimmed()
        );
    }
    if let Some(ref audit_id) = audit_id {
        eprintln!("{}", format!("audit: {audit_id}").dimmed());
    }

    if cfg.transcript.enabled {
        transcript::log_exchange(&TranscriptEntry::new(
            session.lang(),
            &text,
            &msg.text,
            msg.status,
            audit_id,
            fallback,
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// parley health
// ---------------------------------------------------------------------------

/// Fetch and render the backend health snapshot.
pub fn run_health() -> Result<()> {
    let cfg = config::load();
    let client = ApiClient::from_config(&cfg);
    let health = client.health()?;
    print_health(&health, client.base_url());
    Ok(())
}

/// Render a health snapshot as a check-list.
pub fn print_health(health: &HealthSnapshot, base_url: &str) {
    println!("{}", "Backend Health".bold().cyan());
    println!("{}", "=".repeat(40));

    print_health_item("Backend", health.ok, base_url);
    print_health_item(
        "Status",
        !health.is_shutdown(),
        &health.status,
    );
    print_health_item("Mode", true, &health.mode);
    print_health_item("Reported at", true, &health.timestamp);

    if !health.services.is_empty() {
        println!();
        println!("{}", "Services".bold().cyan());
        for (name, status) in &health.services {
            print_health_item(name, status == "operational", status);
        }
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// parley mode
// ---------------------------------------------------------------------------

/// Set the backend energy mode explicitly.
pub fn run_mode(mode: &str) -> Result<()> {
    let Some(mode) = EnergyMode::parse(mode) else {
        anyhow::bail!("invalid mode '{mode}' (valid modes: normal, peak)");
    };

    let cfg = config::load();
    let client = ApiClient::from_config(&cfg);
    let ack = client.set_mode(mode)?;

    if !ack.ok {
        let why = ack
            .message
            .unwrap_or_else(|| "the backend refused the mode change".to_string());
        anyhow::bail!("mode unchanged: {why}");
    }

    println!("{} Energy mode set to {}", "✓".green().bold(), ack.mode.bold());
    if let Some(message) = ack.message {
        println!("  {}", message.dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// parley shutdown
// ---------------------------------------------------------------------------

/// Request an audited backend shutdown.
pub fn run_shutdown(yes: bool) -> Result<()> {
    if !yes && !confirm("Ask the backend to shut down? The request is logged for audit.")? {
        println!("{}", "shutdown not requested".dimmed());
        return Ok(());
    }

    let cfg = config::load();
    let client = ApiClient::from_config(&cfg);
    let ack = client.shutdown()?;

    if !ack.ok {
        anyhow::bail!("shutdown refused: {}", ack.message);
    }

    println!("{} {}", "✓".green().bold(), ack.message);
    println!("  {} {}", "Audit ID:".bold(), ack.audit_id);
    Ok(())
}

/// Prompt for a yes/no confirmation on stdin. Defaults to no.
fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(matches!(buf.trim(), "y" | "Y" | "yes"))
}

// ---------------------------------------------------------------------------
// parley transcript
// ---------------------------------------------------------------------------

/// Show the most recent transcript entries.
pub fn run_transcript(limit: usize) -> Result<()> {
    let entries = transcript::read_recent(limit);

    if entries.is_empty() {
        println!(
            "{}",
            "No transcript yet. Completed exchanges are logged as you chat.".yellow()
        );
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{} {} {}{}",
            entry.timestamp.dimmed(),
            status_marker(entry.status),
            format!("[{}]", entry.lang).dimmed(),
            if entry.fallback {
                " (fallback)".dimmed().to_string()
            } else {
                String::new()
            }
        );
        println!("  {} {}", "you:".bold(), entry.prompt);
        println!("  {} {}", reply_prefix(entry.status), entry.answer);
        if let Some(ref audit_id) = entry.audit_id {
            println!("  {}", format!("audit: {audit_id}").dimmed());
        }
    }

    Ok(())
}

fn reply_prefix(status: SafetyStatus) -> ColoredString {
    match status {
        SafetyStatus::Flagged => "guardian:".yellow().bold(),
        SafetyStatus::Safe | SafetyStatus::Denied => "assistant:".blue().bold(),
    }
}

// ---------------------------------------------------------------------------
// parley config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective Parley Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.parley/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.parley/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".parley.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".parley.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "PARLEY_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.parley/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    println!("  {}", "Edit the file to point parley at your backend.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Colored marker for a moderation label: SAFE ✓, FLAGGED ⚠, DENIED ✗.
pub fn status_marker(status: SafetyStatus) -> ColoredString {
    match status {
        SafetyStatus::Safe => "✓".green(),
        SafetyStatus::Flagged => "⚠".yellow(),
        SafetyStatus::Denied => "✗".red(),
    }
}

/// Colored display label for a message sender.
pub fn sender_label(sender: Sender) -> ColoredString {
    match sender {
        Sender::User => "You".cyan().bold(),
        Sender::Assistant => "Assistant".blue().bold(),
        Sender::Guardian => "Guardian".yellow().bold(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_prefix_routes_flagged_to_guardian() {
        assert!(reply_prefix(SafetyStatus::Flagged)
            .to_string()
            .contains("guardian"));
        assert!(reply_prefix(SafetyStatus::Safe)
            .to_string()
            .contains("assistant"));
        assert!(reply_prefix(SafetyStatus::Denied)
            .to_string()
            .contains("assistant"));
    }

    #[test]
    fn sender_labels_match_personas() {
        assert!(sender_label(Sender::User).to_string().contains("You"));
        assert!(
            sender_label(Sender::Guardian)
                .to_string()
                .contains("Guardian")
        );
    }
}
