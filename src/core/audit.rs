//! Audit artifacts: deposition log, audit summary and log digest
//!
//! These are the machine's externally observable surface. The log is one
//! line per event; the summary reports READY once the machine is terminal.

use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use serde::Serialize;

use crate::core::{is_valid_session_id, ProtocolStateMachine};

pub const DEPOSITION_LOG_FILE: &str = "DepositionLog.txt";
pub const AUDIT_SUMMARY_FILE: &str = "AuditSummary.txt";

/// Deposition log text, newline-terminated; empty for an empty log
pub fn render_deposition_log(machine: &ProtocolStateMachine) -> String {
    machine
        .events()
        .iter()
        .map(|e| e.to_log_line() + "\n")
        .collect()
}

/// Four-line audit readiness summary
pub fn render_audit_summary(session_id: &str, machine: &ProtocolStateMachine) -> String {
    format!(
        "SESSION: {}\nFINAL_STATUS: {}\nEVENT_COUNT: {}\nAUDIT: {}\n",
        session_id,
        machine.state(),
        machine.event_count(),
        machine.audit_status()
    )
}

/// SHA-256 (hex) of the rendered deposition log
pub fn log_digest(machine: &ProtocolStateMachine) -> String {
    let mut hasher = Sha256::new();
    hasher.update(render_deposition_log(machine).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Paths written by `save_audit_bundle`
#[derive(Debug, Clone, Serialize)]
pub struct AuditBundle {
    pub deposition_log: PathBuf,
    pub audit_summary: PathBuf,
    pub log_sha256: String,
}

/// Write the log and summary under `dir/<session_id>/`.
///
/// `session_id` must be a well-formed session id; anything else could name a
/// path outside `dir` and is rejected with `InvalidInput`.
pub fn save_audit_bundle(
    dir: impl AsRef<Path>,
    session_id: &str,
    machine: &ProtocolStateMachine,
) -> std::io::Result<AuditBundle> {
    if !is_valid_session_id(session_id) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("malformed session id: {}", session_id),
        ));
    }
    let session_dir = dir.as_ref().join(session_id);
    std::fs::create_dir_all(&session_dir)?;

    let deposition_log = session_dir.join(DEPOSITION_LOG_FILE);
    std::fs::write(&deposition_log, render_deposition_log(machine))?;

    let audit_summary = session_dir.join(AUDIT_SUMMARY_FILE);
    std::fs::write(&audit_summary, render_audit_summary(session_id, machine))?;

    Ok(AuditBundle {
        deposition_log,
        audit_summary,
        log_sha256: log_digest(machine),
    })
}
