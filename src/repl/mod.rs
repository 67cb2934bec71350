/// Interactive chat session (the terminal chat view).
///
/// A blocking line-oriented loop: each action performs at most one backend
/// call and waits for it, so the session's in-flight gate is never contended
/// and nothing can be cancelled mid-request. Plain input lines become chat
/// submissions; `/` commands drive everything else:
///
/// - `/mode` — toggle the energy mode
/// - `/shutdown` — audited backend shutdown (with confirmation)
/// - `/health` — fetch and show the health snapshot
/// - `/lang <code>` — switch the language (`en`, `fr`, `ht`)
/// - `/demo [n]` — canned sample queries
/// - `/help`, `/quit`
///
/// Chat failures degrade into a SAFE fallback reply; health/mode/shutdown
/// failures are noted on stderr and leave the session untouched.
use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;
use colored::Colorize;

use crate::api::{ApiClient, EnergyMode};
use crate::cli::{print_health, status_marker};
use crate::config::{self, ParleyConfig};
use crate::session::{ChatMessage, ChatSession, ControlRejection, Sender, SubmitRejection};
use crate::transcript::{self, TranscriptEntry};

/// Languages offered by the session, passed through verbatim as `lang`.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] =
    &[("en", "English"), ("fr", "Français"), ("ht", "Kreyòl")];

/// Canned sample queries for `/demo`, one per moderation outcome.
const DEMO_QUERIES: &[(&str, &str)] = &[
    ("Routine query", "What's the weather looking like today?"),
    ("Restricted query", "Tell me the restricted maintenance procedures."),
    ("Empathy query", "I feel overwhelmed."),
];

/// Whether to keep the loop running after a handled input.
enum Flow {
    Continue,
    Quit,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the interactive session until `/quit` or end of input.
pub fn run(lang: Option<String>) -> Result<()> {
    let cfg = config::load();
    let client = ApiClient::from_config(&cfg);
    let lang = lang.unwrap_or_else(|| cfg.chat.lang.clone());
    if !is_supported_lang(&lang) {
        eprintln!(
            "{} unknown language '{}'; the backend may fall back to English",
            "note:".dimmed(),
            lang
        );
    }
    let mut session = ChatSession::new(lang);

    print_banner(&client);
    load_initial_health(&client, &mut session);

    loop {
        print_prompt(&session);
        let Some(line) = read_line() else {
            break; // end of input
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let flow = if let Some(command) = line.strip_prefix('/') {
            handle_command(&cfg, &client, &mut session, command)
        } else {
            submit(&cfg, &client, &mut session, line);
            Flow::Continue
        };

        if matches!(flow, Flow::Quit) {
            break;
        }
    }

    Ok(())
}

fn print_banner(client: &ApiClient) {
    println!("{}", "parley".bold().cyan());
    println!(
        "  {} {}",
        "backend:".dimmed(),
        client.base_url().dimmed()
    );
    println!(
        "  {}",
        "Type a message and press Enter. /help lists commands.".dimmed()
    );
    println!();
}

/// Populate mode and shutdown state from the backend at startup.
///
/// Failure is logged and the built-in defaults are retained.
fn load_initial_health(client: &ApiClient, session: &mut ChatSession) {
    match client.health() {
        Ok(health) => {
            session.apply_health(&health);
            let status = if session.is_shutdown() {
                "shutdown".red().to_string()
            } else {
                health.status.clone()
            };
            println!(
                "  {} {} {} {}",
                "status:".dimmed(),
                status,
                "mode:".dimmed(),
                session.mode()
            );
            println!();
        }
        Err(err) => {
            eprintln!("{} could not reach the backend: {err:#}", "note:".dimmed());
            eprintln!("{} chat will answer with offline fallbacks\n", "note:".dimmed());
        }
    }
}

// ---------------------------------------------------------------------------
// Chat submission
// ---------------------------------------------------------------------------

/// Submit one message: append the user turn, block on the backend, render
/// and log the reply.
fn submit(cfg: &ParleyConfig, client: &ApiClient, session: &mut ChatSession, input: &str) {
    let text = match session.begin_submit(input) {
        Ok(text) => text,
        Err(SubmitRejection::Blank) => return,
        Err(SubmitRejection::Busy) => {
            println!("{}", "a request is already in flight".yellow());
            return;
        }
        Err(SubmitRejection::Shutdown) => {
            println!(
                "{}",
                "the backend has shut down; this session is read-only".yellow()
            );
            return;
        }
    };

    let outcome = client.send_message(&text, session.lang());
    let audit_id = outcome.reply().audit_id.clone();
    let fallback = outcome.is_fallback();
    let msg = session.record_reply(&outcome);

    render_message(cfg, &msg);
    if fallback {
        println!(
            "  {}",
            "(offline fallback: the backend did not see this message)".dimmed()
        );
    }
    if let Some(ref audit_id) = audit_id {
        println!("  {}", format!("audit: {audit_id}").dimmed());
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
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn handle_command(
    cfg: &ParleyConfig,
    client: &ApiClient,
    session: &mut ChatSession,
    command: &str,
) -> Flow {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next();

    match name {
        "help" => print_help(),
        "quit" | "exit" => return Flow::Quit,
        "lang" => switch_lang(session, arg),
        "health" => refresh_health(client, session),
        "mode" => toggle_mode(cfg, client, session),
        "shutdown" => request_shutdown(cfg, client, session),
        "demo" => run_demo(cfg, client, session, arg),
        _ => println!(
            "{} unknown command /{name} (try /help)",
            "note:".dimmed()
        ),
    }
    Flow::Continue
}

fn print_help() {
    println!("  {:<16} send the rest of the line as a chat message", "<text>");
    println!("  {:<16} toggle the energy mode (normal ⇄ peak)", "/mode");
    println!("  {:<16} request an audited backend shutdown", "/shutdown");
    println!("  {:<16} fetch the backend health snapshot", "/health");
    println!("  {:<16} switch language (en, fr, ht)", "/lang <code>");
    println!("  {:<16} list or send a canned sample query", "/demo [n]");
    println!("  {:<16} leave the session", "/quit");
}

fn switch_lang(session: &mut ChatSession, arg: Option<&str>) {
    let Some(code) = arg else {
        for (code, name) in SUPPORTED_LANGUAGES {
            let current = if *code == session.lang() { " (current)" } else { "" };
            println!("  {code} — {name}{current}");
        }
        return;
    };

    if is_supported_lang(code) {
        session.set_lang(code);
        println!("{} language set to {}", "✓".green().bold(), code);
    } else {
        println!(
            "{} unsupported language '{}' (supported: en, fr, ht)",
            "note:".dimmed(),
            code
        );
    }
}

fn refresh_health(client: &ApiClient, session: &mut ChatSession) {
    match client.health() {
        Ok(health) => {
            print_health(&health, client.base_url());
            session.apply_health(&health);
            if session.is_shutdown() {
                println!(
                    "{}",
                    "the backend reports shutdown; this session is read-only".yellow()
                );
            }
        }
        Err(err) => eprintln!("{} health check failed: {err:#}", "note:".dimmed()),
    }
}

/// Toggle to the opposite of the current mode.
///
/// On success the displayed mode updates and one notice is appended; on any
/// failure the session is left exactly as it was.
fn toggle_mode(cfg: &ParleyConfig, client: &ApiClient, session: &mut ChatSession) {
    if let Err(rejection) = session.begin_control() {
        print_control_rejection(rejection);
        return;
    }

    let target = session.mode().toggled();
    match client.set_mode(target) {
        Ok(ack) if ack.ok => {
            let mode = EnergyMode::parse(&ack.mode).unwrap_or(target);
            let msg = session.finish_mode_change(mode);
            render_message(cfg, &msg);
        }
        Ok(ack) => {
            session.abort_control();
            let why = ack
                .message
                .unwrap_or_else(|| "the backend refused the mode change".to_string());
            eprintln!("{} mode unchanged: {why}", "note:".dimmed());
        }
        Err(err) => {
            session.abort_control();
            eprintln!("{} mode unchanged: {err:#}", "note:".dimmed());
        }
    }
}

fn request_shutdown(cfg: &ParleyConfig, client: &ApiClient, session: &mut ChatSession) {
    if session.is_shutdown() {
        println!("{}", "the backend is already shut down".yellow());
        return;
    }

    print!("Ask the backend to shut down? The request is logged for audit. [y/N] ");
    let _ = io::stdout().flush();
    let confirmed = read_line()
        .map(|line| matches!(line.trim(), "y" | "Y" | "yes"))
        .unwrap_or(false);
    if !confirmed {
        println!("{}", "shutdown not requested".dimmed());
        return;
    }

    if let Err(rejection) = session.begin_control() {
        print_control_rejection(rejection);
        return;
    }

    match client.shutdown() {
        Ok(ack) if ack.ok => {
            let msg = session.finish_shutdown(&ack.message, &ack.audit_id);
            render_message(cfg, &msg);
            println!(
                "{}",
                "the session is read-only now; restart parley once the backend is back".dimmed()
            );
        }
        Ok(ack) => {
            session.abort_control();
            eprintln!("{} shutdown refused: {}", "note:".dimmed(), ack.message);
        }
        Err(err) => {
            session.abort_control();
            eprintln!("{} shutdown failed: {err:#}", "note:".dimmed());
        }
    }
}

fn run_demo(cfg: &ParleyConfig, client: &ApiClient, session: &mut ChatSession, arg: Option<&str>) {
    let Some(n) = arg.and_then(|a| a.parse::<usize>().ok()) else {
        for (i, (label, text)) in DEMO_QUERIES.iter().enumerate() {
            println!("  {} {label}: {}", format!("{}.", i + 1).bold(), text.dimmed());
        }
        println!("  {}", "/demo <n> sends the query".dimmed());
        return;
    };

    match DEMO_QUERIES.get(n.saturating_sub(1)) {
        Some((_, text)) => {
            println!("{} {}", "you>".cyan().bold(), text);
            submit(cfg, client, session, text);
        }
        None => println!(
            "{} no demo #{n} (1–{})",
            "note:".dimmed(),
            DEMO_QUERIES.len()
        ),
    }
}

fn print_control_rejection(rejection: ControlRejection) {
    match rejection {
        ControlRejection::Busy => {
            println!("{}", "a request is already in flight".yellow());
        }
        ControlRejection::Shutdown => {
            println!("{}", "the backend has shut down".yellow());
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_prompt(session: &ChatSession) {
    let prompt = if session.is_shutdown() {
        "offline>".red().bold()
    } else {
        "you>".cyan().bold()
    };
    print!("{prompt} ");
    let _ = io::stdout().flush();
}

/// Render one message: sender label, status marker, optional timestamp, then
/// the text indented underneath.
fn render_message(cfg: &ParleyConfig, msg: &ChatMessage) {
    let label = match msg.sender {
        Sender::User => "You".cyan(),
        Sender::Assistant => "Assistant".blue(),
        Sender::Guardian => "Guardian".yellow(),
    }
    .bold();

    if cfg.chat.timestamps {
        let time = msg.timestamp.with_timezone(&Local).format("%H:%M:%S");
        println!(
            "{} {} {}",
            label,
            status_marker(msg.status),
            time.to_string().dimmed()
        );
    } else {
        println!("{} {}", label, status_marker(msg.status));
    }

    for line in msg.text.lines() {
        println!("  {line}");
    }
}

fn is_supported_lang(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Read one line from stdin; `None` at end of input.
fn read_line() -> Option<String> {
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SafetyStatus;

    #[test]
    fn supported_languages_cover_the_selector() {
        let codes: Vec<&str> = SUPPORTED_LANGUAGES.iter().map(|(c, _)| *c).collect();
        assert_eq!(codes, vec!["en", "fr", "ht"]);
        assert!(is_supported_lang("ht"));
        assert!(!is_supported_lang("de"));
    }

    #[test]
    fn demo_queries_exist_for_each_outcome() {
        assert_eq!(DEMO_QUERIES.len(), 3);
        assert!(DEMO_QUERIES.iter().all(|(label, text)| {
            !label.is_empty() && !text.trim().is_empty()
        }));
    }

    #[test]
    fn status_markers_are_distinct() {
        let safe = status_marker(SafetyStatus::Safe).to_string();
        let flagged = status_marker(SafetyStatus::Flagged).to_string();
        let denied = status_marker(SafetyStatus::Denied).to_string();
        assert_ne!(safe, flagged);
        assert_ne!(flagged, denied);
    }
}
