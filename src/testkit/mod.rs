//! Testing infrastructure: inline fixtures, builders and assertion macros.
//!
//! Used by unit tests inside the crate and by the integration tests under
//! `tests/`.
//!
//! ```rust,ignore
//! use failtriage::testkit::{fixtures, FailureRecordBuilder};
//! use failtriage::report::parse_report;
//!
//! let parsed = parse_report(fixtures::TESTNG_TIMEOUT, None).unwrap();
//! assert_eq!(parsed.counters.failed, 1);
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use builders::{error_entry, CiOutputBuilder, FailureRecordBuilder};
