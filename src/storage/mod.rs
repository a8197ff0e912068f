//!  Storage is organized through [database::EntryStore] on top of a [port::DocumentPort].
//!  The basic idea is:
//!   - The whole store is one JSON document, read once and written once.
//!   - Committed entries are kept in the order they were added.
//!   - At most one timer is running, kept apart from the entries until it is stopped.

pub mod database;
pub mod entities;
pub mod port;
