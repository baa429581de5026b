//! All Slack-specific functionality

pub mod blocks;
pub mod client;
pub mod messenger;
pub mod response_builder;

// Re-export main types for convenience
pub use client::SlackClient;
pub use messenger::{Messenger, SlackMessenger, room_channel_name};
