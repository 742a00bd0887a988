//! SQLite persistence for spin history and the read-only entry mirror.

mod connection;
mod helpers;
mod migrations;
mod repositories;

pub use connection::Database;
