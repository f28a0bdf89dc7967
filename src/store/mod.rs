//! Entries are organized through [entry_store::EntryStore].
//! The basic idea is:
//!  - [repository::EntryRepository] is the source of truth, scoped by user.
//!  - The store keeps the signed in user's entries in memory, sorted with the most recent work
//!    first, and is reloaded as a whole whenever the session changes.
//!  - [repository::FileEntryRepository] keeps every user's entries in one json lines file.

pub mod entities;
pub mod entry_store;
pub mod repository;
