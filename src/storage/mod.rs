//! SQLite persistence for league state.
//!
//! `LeagueDb` owns the connection and applies the schema; the free functions
//! in [`queries`] take a `&Connection` so they compose inside transactions.

pub mod db;
pub mod queries;

pub use db::LeagueDb;
