use log::{debug, info, warn};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backup::Backup;
use crate::cache::CtrlCache;
use crate::cluster_control::ClusterControl;
use crate::entity::{Cluster, Connection, Credentials, Infobase, Session};
use crate::error_handling::types::{BackupError, CacheError, CtrlError, ServiceError};

/// Upper bound for a designer dump.
pub const DEFAULT_BACKUP_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Time allowed to lift the session lock after a backup attempt.
const UNLOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// What [`ControlService::backup_infobase`] should dump and where.
#[derive(Debug, Clone)]
pub struct BackupRequest<'a> {
    pub entrypoint: &'a str,
    pub cluster_id: &'a str,
    pub infobase_id: &'a str,
    pub cluster_cred: Option<&'a Credentials>,
    pub infobase_cred: Option<&'a Credentials>,
    pub output_path: &'a Path,
}

/// Cache-first listings plus the backup workflow.
pub struct ControlService {
    ctrl: Arc<dyn ClusterControl>,
    cache: Arc<dyn CtrlCache>,
    backup: Arc<dyn Backup>,
    lock_code: String,
    backup_timeout: Duration,
}

impl ControlService {
    pub fn new(
        ctrl: Arc<dyn ClusterControl>,
        cache: Arc<dyn CtrlCache>,
        backup: Arc<dyn Backup>,
        lock_code: impl Into<String>,
    ) -> Self {
        Self {
            ctrl,
            cache,
            backup,
            lock_code: lock_code.into(),
            backup_timeout: DEFAULT_BACKUP_TIMEOUT,
        }
    }

    pub fn with_backup_timeout(mut self, timeout: Duration) -> Self {
        self.backup_timeout = timeout;
        self
    }

    pub async fn clusters(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        use_cache: bool,
    ) -> Result<Vec<Cluster>, ServiceError> {
        cache_first(
            "Clusters",
            use_cache,
            || self.cache.clusters(entrypoint),
            self.ctrl.clusters(ctx, entrypoint),
            |list| self.cache.put_clusters(entrypoint, list),
        )
        .await
    }

    pub async fn infobases(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        cluster_cred: Option<&Credentials>,
        use_cache: bool,
    ) -> Result<Vec<Infobase>, ServiceError> {
        cache_first(
            "Infobases",
            use_cache,
            || self.cache.infobases(entrypoint, &cluster.id),
            self.ctrl.infobases(ctx, entrypoint, cluster, cluster_cred),
            |list| self.cache.put_infobases(entrypoint, &cluster.id, list),
        )
        .await
    }

    pub async fn sessions(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
        use_cache: bool,
    ) -> Result<Vec<Session>, ServiceError> {
        let ib_id = infobase.map(|ib| ib.id.as_str());
        cache_first(
            "Sessions",
            use_cache,
            || self.cache.sessions(entrypoint, &cluster.id, ib_id),
            self.ctrl.sessions(ctx, entrypoint, cluster, infobase, cluster_cred),
            |list| self.cache.put_sessions(entrypoint, &cluster.id, ib_id, list),
        )
        .await
    }

    pub async fn connections(
        &self,
        ctx: &CancellationToken,
        entrypoint: &str,
        cluster: &Cluster,
        infobase: Option<&Infobase>,
        cluster_cred: Option<&Credentials>,
        use_cache: bool,
    ) -> Result<Vec<Connection>, ServiceError> {
        let ib_id = infobase.map(|ib| ib.id.as_str());
        cache_first(
            "Connections",
            use_cache,
            || self.cache.connections(entrypoint, &cluster.id, ib_id),
            self.ctrl
                .connections(ctx, entrypoint, cluster, infobase, cluster_cred),
            |list| self.cache.put_connections(entrypoint, &cluster.id, ib_id, list),
        )
        .await
    }

    /// Locks the infobase, drops its sessions and connections, dumps it and
    /// lifts the lock again.
    ///
    /// The lock is lifted whatever happened after it was taken, even when `ctx`
    /// is already cancelled. Every failure after the lock is reported together.
    pub async fn backup_infobase(
        &self,
        ctx: &CancellationToken,
        req: &BackupRequest<'_>,
    ) -> Result<(), ServiceError> {
        const OP: &str = "BackupInfobase";
        let control = |source: CtrlError| ServiceError::Control {
            operation: OP,
            source,
        };

        let clusters = self.ctrl.clusters(ctx, req.entrypoint).await.map_err(control)?;
        let cluster = clusters
            .into_iter()
            .find(|c| c.id == req.cluster_id)
            .ok_or_else(|| ServiceError::NotFound(format!("cluster {}", req.cluster_id)))?;

        let infobases = self
            .ctrl
            .infobases(ctx, req.entrypoint, &cluster, req.cluster_cred)
            .await
            .map_err(control)?;
        let infobase = infobases
            .into_iter()
            .find(|ib| ib.id == req.infobase_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "infobase {} in cluster {}",
                    req.infobase_id, req.cluster_id
                ))
            })?;

        self.ctrl
            .disable_sessions(
                ctx,
                req.entrypoint,
                &cluster,
                Some(&infobase),
                req.cluster_cred,
                req.infobase_cred,
                &self.lock_code,
            )
            .await
            .map_err(control)?;

        let mut errors = Vec::new();
        if let Err(e) = self.drop_clients(ctx, req, &cluster, &infobase).await {
            errors.push(e);
        } else if let Err(e) = self.dump(ctx, req, &cluster, &infobase).await {
            errors.push(e);
        }

        // fresh token: a cancelled caller must not keep the infobase locked
        let unlock = CancellationToken::new();
        let enabled = tokio::time::timeout(
            UNLOCK_TIMEOUT,
            self.ctrl.enable_sessions(
                &unlock,
                req.entrypoint,
                &cluster,
                Some(&infobase),
                req.cluster_cred,
                req.infobase_cred,
                &self.lock_code,
            ),
        )
        .await;
        match enabled {
            Ok(Ok(())) => {}
            Ok(Err(source)) => errors.push(control(source)),
            Err(_) => errors.push(ServiceError::Timeout("EnableSessions")),
        }

        if errors.is_empty() {
            info!(
                "Infobase {} backed up to {}",
                infobase.name,
                req.output_path.display()
            );
            return Ok(());
        }
        Err(ServiceError::Workflow(errors))
    }

    // Terminates sessions and connections of the infobase. Individual delete
    // failures are logged; a failed listing aborts the workflow.
    async fn drop_clients(
        &self,
        ctx: &CancellationToken,
        req: &BackupRequest<'_>,
        cluster: &Cluster,
        infobase: &Infobase,
    ) -> Result<(), ServiceError> {
        let control = |source: CtrlError| ServiceError::Control {
            operation: "BackupInfobase",
            source,
        };

        let sessions = self
            .ctrl
            .sessions(ctx, req.entrypoint, cluster, Some(infobase), req.cluster_cred)
            .await
            .map_err(control)?;
        if let Err(e) = self
            .ctrl
            .delete_sessions(ctx, req.entrypoint, cluster, &sessions, req.cluster_cred)
            .await
        {
            warn!("Some sessions of {} survived: {}", infobase.name, e);
        }

        let connections = self
            .ctrl
            .connections(ctx, req.entrypoint, cluster, Some(infobase), req.cluster_cred)
            .await
            .map_err(control)?;
        if let Err(e) = self
            .ctrl
            .delete_connections(ctx, req.entrypoint, cluster, &connections, req.cluster_cred)
            .await
        {
            warn!("Some connections of {} survived: {}", infobase.name, e);
        }

        Ok(())
    }

    async fn dump(
        &self,
        ctx: &CancellationToken,
        req: &BackupRequest<'_>,
        cluster: &Cluster,
        infobase: &Infobase,
    ) -> Result<(), ServiceError> {
        let run = self.backup.run_backup(
            ctx,
            cluster,
            infobase,
            req.infobase_cred,
            &self.lock_code,
            req.output_path,
        );
        match tokio::time::timeout(self.backup_timeout, run).await {
            Ok(result) => result?,
            Err(_) => return Err(ServiceError::Timeout("RunBackup")),
        }

        if !req.output_path.exists() {
            return Err(BackupError::MissingOutput(req.output_path.to_path_buf()).into());
        }
        Ok(())
    }
}

async fn cache_first<T, G, F, P>(
    operation: &'static str,
    use_cache: bool,
    cached: G,
    fetch: F,
    store: P,
) -> Result<Vec<T>, ServiceError>
where
    G: FnOnce() -> Result<Option<Vec<T>>, CacheError>,
    F: Future<Output = Result<Vec<T>, CtrlError>>,
    P: FnOnce(&[T]) -> Result<(), CacheError>,
{
    if use_cache {
        match cached() {
            // an empty cached list counts as a miss
            Ok(Some(list)) if !list.is_empty() => {
                debug!("{} served from cache", operation);
                return Ok(list);
            }
            Ok(_) => {}
            Err(source) => return Err(ServiceError::Cache { operation, source }),
        }
    }

    let list = fetch
        .await
        .map_err(|source| ServiceError::Control { operation, source })?;

    store(&list).map_err(|source| ServiceError::Cache { operation, source })?;
    Ok(list)
}
