//! League domain: configuration, data model, team balancing and the league service.

pub mod config;
pub mod league;
pub mod messages;
pub mod models;
pub mod team_balance;
