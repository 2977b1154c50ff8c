use log::{error, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{
    ApiError, ClustersResponse, ConnectionsResponse, InfobasesResponse, ListParams,
    SessionsResponse, BAD_REQUEST_MESSAGE, INTERNAL_MESSAGE,
};
use crate::control_service::ControlService;
use crate::entity::{Cluster, Infobase};
use crate::error_handling::types::{ServiceError, WebError};

/// Shared by every route: the service and the deadline of one call.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ControlService>,
    pub timeout: Duration,
}

fn with_state(state: ApiState) -> impl Filter<Extract = (ApiState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn list_params(
) -> impl Filter<Extract = (Result<ListParams, WebError>,), Error = Rejection> + Clone {
    warp::query::<HashMap<String, String>>()
        .and(warp::header::optional::<String>("login"))
        .and(warp::header::optional::<String>("password"))
        .map(
            |query: HashMap<String, String>, login: Option<String>, password: Option<String>| {
                ListParams::parse(&query, login, password)
            },
        )
}

/// Runs one service call under `timeout`. The token handed to `call` is
/// cancelled when the deadline passes or the request goes away.
pub async fn with_deadline<R, F, Fut>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<R, WebError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<R, ServiceError>>,
{
    let ctx = CancellationToken::new();
    let _cancel = ctx.clone().drop_guard();

    match tokio::time::timeout(timeout, call(ctx.clone())).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(WebError::Timeout(operation)),
    }
}

/// Turns a handler result into the JSON reply. The client only ever sees the
/// generic message, the cause goes to the log.
pub fn into_response<R: Serialize>(
    operation: &'static str,
    result: Result<R, WebError>,
) -> reply::Response {
    match result {
        Ok(body) => reply::with_status(reply::json(&body), StatusCode::OK).into_response(),
        Err(e) if e.is_bad_request() => {
            warn!("{} - {}", operation, e);
            error_reply(StatusCode::BAD_REQUEST, BAD_REQUEST_MESSAGE)
        }
        Err(e) => {
            error!("{} - {}", operation, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
        }
    }
}

fn error_reply(status: StatusCode, message: &str) -> reply::Response {
    reply::with_status(
        reply::json(&ApiError {
            message: message.to_string(),
        }),
        status,
    )
    .into_response()
}

/// Rejections that escaped the routes: unknown paths and malformed headers.
pub async fn handle_rejection(err: Rejection) -> Result<reply::Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "not found"));
    }
    warn!("Rejected request: {:?}", err);
    Ok(error_reply(StatusCode::BAD_REQUEST, BAD_REQUEST_MESSAGE))
}

/// GET /healthz
pub fn healthz_route() -> impl Filter<Extract = (StatusCode,), Error = Rejection> + Clone {
    warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| StatusCode::OK)
}

/// GET /v1/cluster/list
pub fn cluster_list_route(
    state: ApiState,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path!("v1" / "cluster" / "list")
        .and(warp::get())
        .and(list_params())
        .and(with_state(state))
        .and_then(
            |params: Result<ListParams, WebError>, state: ApiState| async move {
                let result = match params {
                    Ok(p) => {
                        let service = state.service.clone();
                        with_deadline(state.timeout, "Clusters", move |ctx| async move {
                            let clusters = service.clusters(&ctx, &p.entrypoint, p.use_cache).await?;
                            Ok::<_, ServiceError>(ClustersResponse { clusters })
                        })
                        .await
                    }
                    Err(e) => Err(e),
                };
                Ok::<_, Rejection>(into_response("Clusters", result))
            },
        )
}

/// GET /v1/cluster/:cluster/infobase/list
pub fn infobase_list_route(
    state: ApiState,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path!("v1" / "cluster" / String / "infobase" / "list")
        .and(warp::get())
        .and(list_params())
        .and(with_state(state))
        .and_then(
            |cluster_id: String, params: Result<ListParams, WebError>, state: ApiState| async move {
                let result = match params {
                    Ok(p) => {
                        let service = state.service.clone();
                        with_deadline(state.timeout, "Infobases", move |ctx| async move {
                            let cluster = Cluster::with_id(cluster_id);
                            let infobases = service
                                .infobases(
                                    &ctx,
                                    &p.entrypoint,
                                    &cluster,
                                    p.credentials.as_ref(),
                                    p.use_cache,
                                )
                                .await?;
                            Ok::<_, ServiceError>(InfobasesResponse { infobases })
                        })
                        .await
                    }
                    Err(e) => Err(e),
                };
                Ok::<_, Rejection>(into_response("Infobases", result))
            },
        )
}

async fn list_sessions(
    state: ApiState,
    cluster_id: String,
    infobase_id: Option<String>,
    params: Result<ListParams, WebError>,
) -> reply::Response {
    let result = match params {
        Ok(p) => {
            let service = state.service.clone();
            with_deadline(state.timeout, "Sessions", move |ctx| async move {
                let cluster = Cluster::with_id(cluster_id);
                let infobase = infobase_id.map(Infobase::with_id);
                let sessions = service
                    .sessions(
                        &ctx,
                        &p.entrypoint,
                        &cluster,
                        infobase.as_ref(),
                        p.credentials.as_ref(),
                        p.use_cache,
                    )
                    .await?;
                Ok::<_, ServiceError>(SessionsResponse { sessions })
            })
            .await
        }
        Err(e) => Err(e),
    };
    into_response("Sessions", result)
}

async fn list_connections(
    state: ApiState,
    cluster_id: String,
    infobase_id: Option<String>,
    params: Result<ListParams, WebError>,
) -> reply::Response {
    let result = match params {
        Ok(p) => {
            let service = state.service.clone();
            with_deadline(state.timeout, "Connections", move |ctx| async move {
                let cluster = Cluster::with_id(cluster_id);
                let infobase = infobase_id.map(Infobase::with_id);
                let connections = service
                    .connections(
                        &ctx,
                        &p.entrypoint,
                        &cluster,
                        infobase.as_ref(),
                        p.credentials.as_ref(),
                        p.use_cache,
                    )
                    .await?;
                Ok::<_, ServiceError>(ConnectionsResponse { connections })
            })
            .await
        }
        Err(e) => Err(e),
    };
    into_response("Connections", result)
}

/// GET /v1/cluster/:cluster/session/list
pub fn session_list_route(
    state: ApiState,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path!("v1" / "cluster" / String / "session" / "list")
        .and(warp::get())
        .and(list_params())
        .and(with_state(state))
        .and_then(
            |cluster_id: String, params: Result<ListParams, WebError>, state: ApiState| async move {
                Ok::<_, Rejection>(list_sessions(state, cluster_id, None, params).await)
            },
        )
}

/// GET /v1/cluster/:cluster/connection/list
pub fn connection_list_route(
    state: ApiState,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path!("v1" / "cluster" / String / "connection" / "list")
        .and(warp::get())
        .and(list_params())
        .and(with_state(state))
        .and_then(
            |cluster_id: String, params: Result<ListParams, WebError>, state: ApiState| async move {
                Ok::<_, Rejection>(list_connections(state, cluster_id, None, params).await)
            },
        )
}

/// GET /v1/cluster/:cluster/infobase/:infobase/session/list
pub fn infobase_session_list_route(
    state: ApiState,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path!("v1" / "cluster" / String / "infobase" / String / "session" / "list")
        .and(warp::get())
        .and(list_params())
        .and(with_state(state))
        .and_then(
            |cluster_id: String,
             infobase_id: String,
             params: Result<ListParams, WebError>,
             state: ApiState| async move {
                Ok::<_, Rejection>(
                    list_sessions(state, cluster_id, Some(infobase_id), params).await,
                )
            },
        )
}

/// GET /v1/cluster/:cluster/infobase/:infobase/connection/list
pub fn infobase_connection_list_route(
    state: ApiState,
) -> impl Filter<Extract = (reply::Response,), Error = Rejection> + Clone {
    warp::path!("v1" / "cluster" / String / "infobase" / String / "connection" / "list")
        .and(warp::get())
        .and(list_params())
        .and(with_state(state))
        .and_then(
            |cluster_id: String,
             infobase_id: String,
             params: Result<ListParams, WebError>,
             state: ApiState| async move {
                Ok::<_, Rejection>(
                    list_connections(state, cluster_id, Some(infobase_id), params).await,
                )
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::CtrlError;

    #[tokio::test]
    async fn test_into_response_ok() {
        let response = into_response("Clusters", Ok(ClustersResponse { clusters: vec![] }));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_into_response_maps_status() {
        let response = into_response::<ClustersResponse>("Clusters", Err(WebError::MissingEntrypoint));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let service = ServiceError::Control {
            operation: "Clusters",
            source: CtrlError::Cancelled {
                operation: "getclusters",
            },
        };
        let response = into_response::<ClustersResponse>("Clusters", Err(service.into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = into_response::<ClustersResponse>("Clusters", Err(WebError::Timeout("Clusters")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_cancels_on_expiry() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let result: Result<(), WebError> =
            with_deadline(Duration::from_secs(5), "Sessions", move |ctx| async move {
                let _ = tx.send(ctx.clone());
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(WebError::Timeout("Sessions"))));
        let ctx = rx.await.unwrap();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_with_deadline_passes_service_error() {
        let result: Result<(), WebError> =
            with_deadline(Duration::from_secs(5), "Clusters", |_ctx| async {
                Err(ServiceError::NotFound("cluster c1".to_string()))
            })
            .await;

        assert!(matches!(
            result,
            Err(WebError::Service(ServiceError::NotFound(_)))
        ));
    }
}
