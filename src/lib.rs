//! Timesheet tracker for recording what was achieved every day and turning a range of days into
//! a short summary. Works from a terminal, keeping the data of every user in one local file.
//!

pub mod auth;
pub mod cli;
pub mod store;
pub mod summary;
pub mod utils;
pub mod view;
