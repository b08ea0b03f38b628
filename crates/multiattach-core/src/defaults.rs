//! Centralized default constants for multiattach.
//!
//! Identifiers registered by the module installation (models, views, actions)
//! and layout constants used by the form augmenter live here so the backends
//! and the engines agree on them.

// =============================================================================
// REGISTERED IDENTIFIERS
// =============================================================================

/// Module name that owns the wizard and the attachment reference view.
pub const MODULE_NAME: &str = "multiple_attachment";

/// Model identifier of attachments.
pub const ATTACHMENT_MODEL: &str = "ir.attachment";

/// Model identifier of registry entries.
pub const REGISTRY_MODEL: &str = "multiple.attachment";

/// Model identifier of the transient wizard-start state.
pub const WIZARD_START_MODEL: &str = "multiple.attachment.wizard.start";

/// Name of the wizard action bound by every registry keyword.
pub const WIZARD_ACTION_NAME: &str = "multiple.attachment.wizard";

/// Keyword type used to expose the wizard on a model listing.
pub const FORM_ACTION_KEYWORD: &str = "form_action";

/// Record id meaning "the listing of a model" rather than one record.
pub const LISTING_RECORD_ID: i64 = -1;

// =============================================================================
// FORM AUGMENTATION
// =============================================================================

/// Element tag used as the insertion anchor in the wizard-start form.
pub const ANCHOR_TAG: &str = "separator";

/// Name of the injected attachment picker field.
pub const ATTACHMENT_FIELD: &str = "attachment";

/// Name of the injected target-records field.
pub const RECORDS_FIELD: &str = "records";

/// Column span of the attachment label and picker.
pub const ATTACHMENT_COLSPAN: u32 = 2;

/// Column span of the records list.
pub const RECORDS_COLSPAN: u32 = 4;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of connections in the pool.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default connection timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const SERVER_PORT: u16 = 3000;

/// Default request body limit in bytes.
pub const MAX_BODY_BYTES: usize = 1_048_576;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_sentinel_is_negative() {
        assert_eq!(LISTING_RECORD_ID, -1);
    }

    #[test]
    fn test_colspans_fill_a_four_column_form() {
        assert_eq!(ATTACHMENT_COLSPAN * 2, RECORDS_COLSPAN);
    }
}
