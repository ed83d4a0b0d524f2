//! Process exit codes

/// Command completed and found nothing to report
pub const EXIT_SUCCESS: i32 = 0;

/// Command completed but reported missing fields, validation issues or a
/// visibility fixpoint that was not reached
pub const EXIT_WARNING: i32 = 1;

/// Command failed: unreadable input, invalid schema or configuration
pub const EXIT_ERROR: i32 = 2;
