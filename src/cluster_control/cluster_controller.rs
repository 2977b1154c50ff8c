use async_trait::async_trait;
use chrono::Local;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::bulk_mutator::delete_many;
use super::command_args;
use super::result_collector::{collect, execute};
use super::types::DEFAULT_DELETE_LIMIT;
use crate::entity::{Cluster, Connection, Credentials, Infobase, Session};
use crate::error_handling::types::CtrlError;
use crate::process_management::Piper;

/// Administrative operations over one cluster manager entrypoint.
///
/// Reads return every record or an error, never a partial list. Optional
/// entities are explicit: a missing infobase widens a listing to the whole
/// cluster, while the mutating calls refuse to run without their target.
#[async_trait]
pub trait ClusterControl: Send + Sync {
    async fn clusters(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
    ) -> Result<Vec<Cluster>, CtrlError>;

    async fn infobases(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        cluster_cred: Option<&Credentials>,
    ) -> Result<Vec<Infobase>, CtrlError>;

    async fn sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<Vec<Session>, CtrlError>;

    async fn connections(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<Vec<Connection>, CtrlError>;

    #[allow(clippy::too_many_arguments)]
    async fn disable_sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
        infobase_cred: Option<&Credentials>,
        lock_code: &str,
    ) -> Result<(), CtrlError>;

    #[allow(clippy::too_many_arguments)]
    async fn enable_sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
        infobase_cred: Option<&Credentials>,
        lock_code: &str,
    ) -> Result<(), CtrlError>;

    async fn delete_session(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        session: Option<&Session>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError>;

    async fn delete_sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        sessions: &[Session],
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError>;

    async fn delete_connection(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        connection: Option<&Connection>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError>;

    async fn delete_connections(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        connections: &[Connection],
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError>;
}

/// [`ClusterControl`] backed by the administrative tool.
#[derive(Clone)]
pub struct ClusterController {
    pipe: Arc<dyn Piper>,
    delete_limit: usize,
}

impl ClusterController {
    pub fn new(pipe: Arc<dyn Piper>) -> Self {
        Self {
            pipe,
            delete_limit: DEFAULT_DELETE_LIMIT,
        }
    }

    /// Overrides the number of delete commands allowed to run at once.
    pub fn with_delete_limit(mut self, limit: usize) -> Self {
        self.delete_limit = limit.max(1);
        self
    }

    pub fn delete_limit(&self) -> usize {
        self.delete_limit
    }
}

#[async_trait]
impl ClusterControl for ClusterController {
    async fn clusters(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
    ) -> Result<Vec<Cluster>, CtrlError> {
        let args = command_args::cluster_list(entrypoint);
        collect(self.pipe.as_ref(), ctx, "getclusters", &args).await
    }

    async fn infobases(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        cluster_cred: Option<&Credentials>,
    ) -> Result<Vec<Infobase>, CtrlError> {
        let args = command_args::infobase_list(entrypoint, cluster, cluster_cred);
        collect(self.pipe.as_ref(), ctx, "getinfobases", &args).await
    }

    async fn sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<Vec<Session>, CtrlError> {
        let args = command_args::session_list(entrypoint, cluster, infobase, cluster_cred);
        collect(self.pipe.as_ref(), ctx, "getsessions", &args).await
    }

    async fn connections(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<Vec<Connection>, CtrlError> {
        let args = command_args::connection_list(entrypoint, cluster, infobase, cluster_cred);
        collect(self.pipe.as_ref(), ctx, "getconnections", &args).await
    }

    async fn disable_sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
        infobase_cred: Option<&Credentials>,
        lock_code: &str,
    ) -> Result<(), CtrlError> {
        let infobase = infobase.ok_or(CtrlError::InfobaseRequired)?;

        let args = command_args::disable_sessions(
            entrypoint,
            cluster,
            infobase,
            cluster_cred,
            infobase_cred,
            lock_code,
            Local::now(),
        );
        execute(self.pipe.as_ref(), ctx, "disablesessions", &args).await?;

        info!("Sessions denied for infobase {} on {}", infobase.id, entrypoint);
        Ok(())
    }

    async fn enable_sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
        infobase_cred: Option<&Credentials>,
        lock_code: &str,
    ) -> Result<(), CtrlError> {
        let infobase = infobase.ok_or(CtrlError::InfobaseRequired)?;

        let args = command_args::enable_sessions(
            entrypoint,
            cluster,
            infobase,
            cluster_cred,
            infobase_cred,
            lock_code,
        );
        execute(self.pipe.as_ref(), ctx, "enablesessions", &args).await?;

        info!("Sessions allowed for infobase {} on {}", infobase.id, entrypoint);
        Ok(())
    }

    async fn delete_session(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        session: Option<&Session>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError> {
        let session = session.ok_or(CtrlError::SessionRequired)?;

        let args = command_args::terminate_session(entrypoint, cluster, session, cluster_cred);
        execute(self.pipe.as_ref(), ctx, "deletesession", &args).await
    }

    async fn delete_sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        sessions: &[Session],
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError> {
        let this = self.clone();
        let entrypoint = entrypoint.to_string();
        let cluster = cluster.clone();
        let cred = cluster_cred.cloned();

        delete_many(
            ctx,
            "deletesessions",
            sessions.to_vec(),
            self.delete_limit,
            move |ctx, session| {
                let (this, entrypoint, cluster, cred) =
                    (this.clone(), entrypoint.clone(), cluster.clone(), cred.clone());
                async move {
                    this.delete_session(&ctx, &entrypoint, &cluster, Some(&session), cred.as_ref())
                        .await
                }
            },
        )
        .await
    }

    async fn delete_connection(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        connection: Option<&Connection>,
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError> {
        let connection = connection.ok_or(CtrlError::ConnectionRequired)?;

        let args =
            command_args::disconnect_connection(entrypoint, cluster, connection, cluster_cred);
        execute(self.pipe.as_ref(), ctx, "deleteconnection", &args).await
    }

    async fn delete_connections(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        connections: &[Connection],
        cluster_cred: Option<&Credentials>,
    ) -> Result<(), CtrlError> {
        let this = self.clone();
        let entrypoint = entrypoint.to_string();
        let cluster = cluster.clone();
        let cred = cluster_cred.cloned();

        delete_many(
            ctx,
            "deleteconnections",
            connections.to_vec(),
            self.delete_limit,
            move |ctx, connection| {
                let (this, entrypoint, cluster, cred) =
                    (this.clone(), entrypoint.clone(), cluster.clone(), cred.clone());
                async move {
                    this.delete_connection(
                        &ctx,
                        &entrypoint,
                        &cluster,
                        Some(&connection),
                        cred.as_ref(),
                    )
                    .await
                }
            },
        )
        .await
    }
}
