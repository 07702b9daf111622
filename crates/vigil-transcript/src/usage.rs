//! Token-usage estimation.
//!
//! The threshold decision crosses an external, non-deterministic quantity,
//! so every estimation appends an audit record — that trail is how "why did
//! (or didn't) the trigger fire" gets answered after the fact.

use std::path::Path;

use serde_json::json;
use vigil_store::AuditLog;

use crate::record::{RawRecord, Usage};
use crate::revscan::RevLines;

#[derive(Debug, Clone, Default)]
pub struct UsageEstimate {
    pub total: u64,
    pub found: bool,
    pub request_id: String,
    pub usage: Usage,
}

/// Most recent usage snapshot in the transcript.
///
/// The record carrying it is not guaranteed to be the literal last line —
/// trailing non-usage records routinely follow it — so the scan walks
/// backward past them instead of peeking at the tail.
pub fn estimate_total(path: &Path) -> UsageEstimate {
    let lines = match RevLines::open(path) {
        Ok(lines) => lines,
        Err(_) => return UsageEstimate::default(),
    };
    for line in lines {
        let Ok(rec) = serde_json::from_str::<RawRecord>(&line) else {
            continue;
        };
        if let Some(usage) = rec.usage() {
            if usage.is_empty() {
                continue;
            }
            let total = usage.total();
            let usage = usage.clone();
            return UsageEstimate {
                total,
                found: true,
                request_id: rec.request_id.unwrap_or_else(|| "unknown".into()),
                usage,
            };
        }
    }
    UsageEstimate::default()
}

/// Pure comparison; equality triggers.
pub fn should_trigger(total: u64, threshold: u64) -> bool {
    total >= threshold
}

/// Estimate and append the audit record in one step. Degenerate inputs
/// (no path, missing file, no usage anywhere) are logged with an error
/// note and report `found = false`.
pub fn estimate_and_log(path: Option<&Path>, threshold: u64, log: &AuditLog) -> UsageEstimate {
    let (estimate, error) = match path {
        None => (UsageEstimate::default(), Some("no transcript path")),
        Some(p) if !p.exists() => (UsageEstimate::default(), Some("transcript not found")),
        Some(p) => {
            let estimate = estimate_total(p);
            let error = if estimate.found {
                None
            } else {
                Some("no usage record found")
            };
            (estimate, error)
        }
    };

    let triggered = estimate.found && should_trigger(estimate.total, threshold);
    let request_id = if estimate.request_id.is_empty() {
        "N/A"
    } else {
        estimate.request_id.as_str()
    };
    let mut entry = json!({
        "ts": now_rfc3339(),
        "request_id": request_id,
        "usage": estimate.usage,
        "total": estimate.total,
        "threshold": threshold,
        "triggered": triggered,
    });
    if let Some(error) = error {
        entry["error"] = json!(error);
    }
    log.append(&entry);
    estimate
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("RFC3339 formatting should not fail")
}
