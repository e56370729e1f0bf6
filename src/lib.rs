//! Rapport: contact engagement analysis over email interaction history.
//!
//! Takes a contact list and the mailbox owner's interaction history and
//! produces, per contact, an engagement category, a confidence score and the
//! metrics behind them. Large contact sets are fanned out across a bounded
//! pool of tokio tasks with weighted progress reporting.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod types;

pub mod analysis;
pub mod batch;
pub mod progress;

pub mod source;
