//! # dgtrainer-error
//!
//! Unified error handling for dg-trainer, following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., NetworkFailed, OutputInvalid)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use dgtrainer_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ConfigInvalid, "ANTHROPIC_API_KEY is not set")
//!         .with_operation("config::from_env")
//!         .with_context("provider", "anthropic"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, dgtrainer_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using dg-trainer Error
pub type Result<T> = std::result::Result<T, Error>;
