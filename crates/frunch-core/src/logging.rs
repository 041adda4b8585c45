//! Structured logging schema and field name constants for frunch-room.
//!
//! All crates use these constants (or the identical literal keys in
//! `tracing` macros) so log aggregation can query every loop by the same
//! field names.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, the owning loop retries on its next tick |
//! | INFO  | Lifecycle events (startup, shutdown), sync pass completions |
//! | DEBUG | Decision points (throwback chosen, worker idle, tick skipped) |
//! | TRACE | Per-entry iteration (each listed file or change) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "sync", "geocode", "rotation", "db", "remote", "server"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "synchronizer", "worker", "scheduler", "drive", "nominatim"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "full_listing", "changes", "resolve", "select_next"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Remote file id of the picture being operated on.
pub const PICTURE_ID: &str = "picture_id";

/// Sync cursor (change-feed page token).
pub const CURSOR: &str = "cursor";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of pages fetched during a sync pass.
pub const PAGE_COUNT: &str = "page_count";

/// Number of records added during a sync pass.
pub const ADDED: &str = "added";

/// Number of records removed during a sync pass.
pub const REMOVED: &str = "removed";

/// Number of candidates considered by a selection.
pub const CANDIDATES: &str = "candidates";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
