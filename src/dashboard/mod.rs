//! Analytics dashboard module.
//!
//! Serves the sample usage analytics (query activity, topic distribution,
//! response times) as a local web page with JSON endpoints. Shares no state
//! with the chat session.

pub mod routes;
pub mod server;
pub mod state;
pub mod templates;

pub use server::start_dashboard;
pub use state::DashboardState;
