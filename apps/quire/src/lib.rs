//! # Quire
//!
//! Command-line front end for the quire-core page resolver.

pub mod cli;
