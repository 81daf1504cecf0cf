use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Shared projection types used by several payloads.
pub mod common;
/// Health check payloads.
pub mod health;
/// REST payloads for room creation and lookup, plus room snapshots.
pub mod room;
/// Validation helpers for client-supplied identifiers and names.
pub mod validation;
/// WebSocket command and event payloads.
pub mod ws;

fn format_epoch_ms(epoch_ms: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_ms) * 1_000_000)
        .ok()
        .and_then(|timestamp| timestamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}
