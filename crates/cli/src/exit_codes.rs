//! CLI Exit Code Registry
//!
//! Single source of truth for every exit code `hermes` returns.
//! Scripts rely on these values; do not renumber.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (unspecified)                                |
//! | 2    | Usage error (bad arguments, missing confirmation)          |
//! | 3    | I/O error (cannot read or write a file)                    |
//! | 4    | Format error (unreadable CSV or backup)                    |
//! | 5    | Validation error (bad order number, missing field)         |
//! | 6    | Order not found                                            |
//! | 7    | Store error (database failure, order number conflict)      |
//! | 8    | Import or restore finished, but some records failed        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError`

use hermes_core::{SaveError, StoreError};
use hermes_io::FormatError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

/// CSV without data rows, backup JSON of the wrong shape.
pub const EXIT_FORMAT: u8 = 4;

/// Order rejected by validation.
pub const EXIT_VALIDATION: u8 = 5;

/// No order with the given id.
pub const EXIT_NOT_FOUND: u8 = 6;

/// Database failure or uniqueness conflict.
pub const EXIT_STORE: u8 = 7;

/// Batch completed with per-record errors. Successful records were written.
pub const EXIT_PARTIAL: u8 = 8;

/// Map a StoreError to its exit code.
pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::NotFound(_) => EXIT_NOT_FOUND,
        StoreError::InvalidRecord(_) => EXIT_VALIDATION,
        StoreError::Conflict { .. } | StoreError::Backend(_) => EXIT_STORE,
    }
}

/// Map a FormatError to its exit code.
pub fn format_exit_code(err: &FormatError) -> u8 {
    match err {
        FormatError::Io(_) => EXIT_IO,
        FormatError::Csv(_) | FormatError::Backup(_) => EXIT_FORMAT,
    }
}

/// Map a SaveError to its exit code.
pub fn save_exit_code(err: &SaveError) -> u8 {
    match err {
        SaveError::Validation(_) => EXIT_VALIDATION,
        SaveError::Store(e) => store_exit_code(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ValidationError;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_FORMAT,
            EXIT_VALIDATION,
            EXIT_NOT_FOUND,
            EXIT_STORE,
            EXIT_PARTIAL,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn error_mapping() {
        assert_eq!(store_exit_code(&StoreError::NotFound("x".into())), EXIT_NOT_FOUND);
        assert_eq!(
            store_exit_code(&StoreError::Conflict {
                order_number: "A".into(),
                existing_id: "x".into()
            }),
            EXIT_STORE
        );
        assert_eq!(format_exit_code(&FormatError::Io("x".into())), EXIT_IO);
        assert_eq!(format_exit_code(&FormatError::Backup("x".into())), EXIT_FORMAT);
        assert_eq!(
            save_exit_code(&SaveError::Validation(ValidationError::MissingField("date"))),
            EXIT_VALIDATION
        );
    }
}
