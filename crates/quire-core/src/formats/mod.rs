//! # Formats Module
//!
//! Binary encoding of the records kept in the embedded revision store.
//!
//! File I/O and database transactions live in `storage`; this module is pure.

mod record;

pub use record::*;
