//! HTTP API over the control service: JSON listings of clusters, infobases,
//! sessions and connections.

pub mod routes;
pub mod types;
pub mod web_server;

pub use routes::ApiState;
pub use types::{ApiError, ListParams};
pub use web_server::WebServer;
