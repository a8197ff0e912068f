//! Simple time tracking from the terminal. Entries and the running timer live in a single JSON
//! document next to a small JSON config, so both are easy to read, edit and keep in version
//! control.
//!

pub mod cli;
pub mod config;
pub mod error;
pub mod storage;
pub mod utils;
