//! HTTP server and Slack request processing

pub mod handler;
pub mod helpers;
pub mod interactive_handler;
pub mod parsing;
pub mod server;
pub mod signature;
pub mod slash_handler;
pub mod state;

// Re-export the main entry points for convenience
pub use handler::handle_slack_request;
pub use server::{create_router, serve};
pub use state::{AppState, SharedState};
