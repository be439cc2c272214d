//! Henshin CLI
//!
//! Usage:
//!   henshin --simulate input.json                 # Fitting simulation, result JSON on stdout
//!   henshin --simulate input.json --output out.json
//!   henshin --demo happy                          # Protocol demo, happy path
//!   henshin --demo refused --refusal-code AUDIT_MISMATCH --audit-dir ./sessions
//!   henshin --serve                               # HTTP API server

use clap::{CommandFactory, Parser, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use henshin::core::{
    generate_session_id, is_valid_session_id, log_digest, run_server, save_audit_bundle,
    AuditBundle, ProtocolStateMachine, SequenceInput,
};
use henshin::types::{AuditStatus, ConfigError, ProtocolError, ProtocolState, HAPPY_PATH};
use henshin::VERSION;

/// Note recorded by the refused demo
const DEMO_REFUSAL_NOTE: &str = "Provisional refusal during demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DemoMode {
    /// IDLE through ARCHIVED
    Happy,
    /// Walk to APPROVAL_PENDING, then refuse
    Refused,
}

#[derive(Parser, Debug)]
#[command(
    name = "henshin",
    version = VERSION,
    about = "Henshin - suit-up fitting engine and authorization protocol",
    long_about = "Henshin drives the suit-up sequence.\n\n\
                  Modes:\n  \
                  --simulate     Run body frames through the dock gate and segment followers\n  \
                  --demo         Drive the protocol state machine (happy | refused)\n  \
                  --serve        HTTP API server mode\n\n\
                  Protocol:\n  \
                  IDLE -> POSTED -> ... -> ACTIVE -> ARCHIVED\n  \
                  any non-terminal state -> REFUSED (with a refusal code)"
)]
struct Args {
    /// Simulation input document (JSON)
    #[arg(long, value_name = "PATH")]
    simulate: Option<PathBuf>,

    /// Write the simulation result here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Run a protocol demo
    #[arg(long, value_enum)]
    demo: Option<DemoMode>,

    /// Refusal code used by `--demo refused`
    #[arg(long, default_value = "INCOMPLETE_PROCEDURE")]
    refusal_code: String,

    /// Directory for audit bundles (DepositionLog.txt, AuditSummary.txt)
    #[arg(long, value_name = "DIR")]
    audit_dir: Option<PathBuf>,

    /// Session id for the demo (default: generated)
    #[arg(long)]
    session_id: Option<String>,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);
    if args.no_color {
        colored::control::set_override(false);
    }

    if args.serve {
        run_serve(&args).await;
    } else if let Some(path) = &args.simulate {
        if let Err(e) = run_simulate(path, &args) {
            let status = match e {
                ConfigError::Io(_) => 1,
                _ => 2,
            };
            fail(&e.to_string(), e.code(), status);
        }
    } else if let Some(mode) = args.demo {
        if let Err(e) = run_demo(mode, &args) {
            let status = match e {
                DemoError::BadSessionId(_) => 2,
                _ => 1,
            };
            fail(&e.to_string(), e.code(), status);
        }
    } else {
        // Nothing to do: show usage
        let _ = Args::command().print_help();
        println!();
    }
}

/// Logs go to stderr; stdout is reserved for results
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("henshin=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("henshin=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the JSON error envelope and exit
fn fail(error: &str, code: &str, status: i32) -> ! {
    let envelope = serde_json::json!({ "ok": false, "error": error, "code": code });
    println!("{}", envelope);
    std::process::exit(status);
}

// =============================================================================
// SIMULATE
// =============================================================================

fn run_simulate(path: &Path, args: &Args) -> Result<(), ConfigError> {
    let input = SequenceInput::from_path(path)?;
    let result = input.run()?;
    let json = serde_json::to_string_pretty(&result)?;

    match &args.output {
        None => println!("{}", json),
        Some(out) => {
            std::fs::write(out, json)?;
            info!(path = %out.display(), "simulation written");
            if args.json {
                let summary = serde_json::json!({
                    "ok": true,
                    "output": out.display().to_string(),
                    "equipped": result.equipped,
                    "equip_frame": result.equip_frame,
                    "frames": result.frames.len(),
                });
                println!("{}", summary);
            } else {
                let equipped = if result.equipped {
                    format!("equipped at frame {}", result.equip_frame).green()
                } else {
                    "not equipped".yellow()
                };
                println!(
                    "{} frames, {} segments, {} -> {}",
                    result.frames.len(),
                    result.segments.len(),
                    equipped,
                    out.display()
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// DEMO
// =============================================================================

#[derive(Debug, Serialize)]
struct DemoReport {
    ok: bool,
    session_id: String,
    final_state: ProtocolState,
    event_count: usize,
    audit: AuditStatus,
    log_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<AuditBundle>,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("malformed session id: {0} (expected S-YYYYMMDD-XXXX)")]
    BadSessionId(String),

    #[error("cannot write audit bundle: {0}")]
    Io(#[from] std::io::Error),
}

impl DemoError {
    fn code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.code(),
            Self::BadSessionId(_) => "R601_BAD_SESSION_ID",
            Self::Io(_) => "R408_IO",
        }
    }
}

fn drive(mode: DemoMode, refusal_code: &str) -> Result<ProtocolStateMachine, ProtocolError> {
    let mut machine = ProtocolStateMachine::new();
    match mode {
        DemoMode::Happy => {
            machine.run_happy_path()?;
        }
        DemoMode::Refused => {
            let stop = HAPPY_PATH
                .iter()
                .position(|s| *s == ProtocolState::ApprovalPending)
                .unwrap_or(HAPPY_PATH.len() - 1);
            for state in &HAPPY_PATH[1..=stop] {
                machine.transition(*state, "")?;
            }
            machine.refuse(refusal_code, DEMO_REFUSAL_NOTE)?;
        }
    }
    Ok(machine)
}

/// `--session-id` if given and well-formed, otherwise a fresh id
fn demo_session_id(requested: Option<&str>) -> Result<String, DemoError> {
    match requested {
        Some(id) if is_valid_session_id(id) => Ok(id.to_string()),
        Some(id) => Err(DemoError::BadSessionId(id.to_string())),
        None => Ok(generate_session_id(Utc::now())),
    }
}

fn run_demo(mode: DemoMode, args: &Args) -> Result<(), DemoError> {
    let session_id = demo_session_id(args.session_id.as_deref())?;
    let machine = drive(mode, &args.refusal_code)?;

    let outputs = match &args.audit_dir {
        Some(dir) => Some(save_audit_bundle(dir, &session_id, &machine)?),
        None => None,
    };

    let report = DemoReport {
        ok: true,
        session_id,
        final_state: machine.state(),
        event_count: machine.event_count(),
        audit: machine.audit_status(),
        log_sha256: log_digest(&machine),
        outputs,
    };

    if args.json {
        println!("{}", serde_json::to_string(&report).unwrap_or_default());
    } else {
        print_demo(&machine, &report);
    }
    Ok(())
}

fn print_demo(machine: &ProtocolStateMachine, report: &DemoReport) {
    println!("{}", format!("Henshin v{} - protocol demo", VERSION).bold());
    println!("Session: {}", report.session_id);
    println!();
    for event in machine.events() {
        println!("  {}", event.to_log_line().color(event.to_state.color()));
    }
    println!();
    println!(
        "Final: {}  events={}  audit={}",
        report.final_state.name().color(report.final_state.color()).bold(),
        report.event_count,
        report.audit
    );
    println!("SHA-256: {}", report.log_sha256.dimmed());
    if let Some(bundle) = &report.outputs {
        println!("Log:     {}", bundle.deposition_log.display());
        println!("Summary: {}", bundle.audit_summary.display());
    }
}

// =============================================================================
// SERVE
// =============================================================================

async fn run_serve(args: &Args) {
    println!();
    println!("{}", format!("Henshin API Server v{}", VERSION).bold());
    println!("Listening on http://{}", args.addr);
    if let Some(dir) = &args.audit_dir {
        println!("Audit bundles: {}", dir.display());
    }
    println!();

    if let Err(e) = run_server(&args.addr, args.audit_dir.clone()).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
