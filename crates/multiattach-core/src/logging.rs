//! Structured logging schema and field name constants for multiattach.
//!
//! All crates log through `tracing` with these field names so that registry
//! lifecycle and attach runs can be queried the same way in every backend.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, e.g. a rolled back unit of work |
//! | INFO  | Lifecycle events: wizard created/removed, attach completed |
//! | DEBUG | Decision points: validation outcomes, no-op preconditions |
//! | TRACE | Per-record iteration inside the replication loop |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP layer.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "registry", "wizard", "replication", "form", "database"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "unit_of_work", "memory_backend"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "create_wizard", "remove_wizard", "attach"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Model identifier an operation is scoped to.
pub const MODEL: &str = "model";

/// Registry entry id.
pub const ENTRY_ID: &str = "entry_id";

/// Action keyword id.
pub const KEYWORD_ID: &str = "keyword_id";

/// Attachment id being copied or inspected.
pub const ATTACHMENT_ID: &str = "attachment_id";

/// Target record id.
pub const RECORD_ID: &str = "record_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of target records handed to the replication engine.
pub const RECORD_COUNT: &str = "record_count";

/// Number of attachment copies produced.
pub const COPY_COUNT: &str = "copy_count";

/// Number of records skipped because they already own the attachment.
pub const SKIP_COUNT: &str = "skip_count";

/// Number of registry entries touched by a batch operation.
pub const ENTRY_COUNT: &str = "entry_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
