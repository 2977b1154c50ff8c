use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use warp::Filter;

use super::routes::{
    cluster_list_route, connection_list_route, handle_rejection, healthz_route,
    infobase_connection_list_route, infobase_list_route, infobase_session_list_route,
    session_list_route, ApiState,
};
use crate::control_service::ControlService;

/// HTTP front of the control service
pub struct WebServer {
    state: ApiState,
}

impl WebServer {
    /// `list_timeout` bounds every listing call, including the rac run behind it.
    pub fn new(service: Arc<ControlService>, list_timeout: Duration) -> Self {
        Self {
            state: ApiState {
                service,
                timeout: list_timeout,
            },
        }
    }

    /// Serves the API on all interfaces until the task is dropped.
    pub async fn start(&self, port: u16) {
        let routes = healthz_route()
            .or(cluster_list_route(self.state.clone()))
            .or(infobase_list_route(self.state.clone()))
            .or(session_list_route(self.state.clone()))
            .or(connection_list_route(self.state.clone()))
            .or(infobase_session_list_route(self.state.clone()))
            .or(infobase_connection_list_route(self.state.clone()))
            .recover(handle_rejection)
            .with(warp::log("racctl::http"));

        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        info!("HTTP API listening on {}", addr);
        warp::serve(routes).run(addr).await;
    }
}
