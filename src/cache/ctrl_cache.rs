use std::time::Duration;

use super::ttl_cache::{TtlCache, CLEANUP_INTERVAL};
use crate::entity::{Cluster, Connection, Infobase, Session};
use crate::error_handling::types::CacheError;

/// Scope-keyed storage for listing results.
///
/// `Ok(None)` means the scope has no live entry. Infobase filters are
/// optional; `None` is the whole-cluster scope.
pub trait CtrlCache: Send + Sync {
    fn clusters(&self, entrypoint: &str) -> Result<Option<Vec<Cluster>>, CacheError>;

    fn put_clusters(&self, entrypoint: &str, clusters: &[Cluster]) -> Result<(), CacheError>;

    fn infobases(
        &self,
        entrypoint: &str,
        cluster_id: &str,
    ) -> Result<Option<Vec<Infobase>>, CacheError>;

    fn put_infobases(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobases: &[Infobase],
    ) -> Result<(), CacheError>;

    fn sessions(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
    ) -> Result<Option<Vec<Session>>, CacheError>;

    fn put_sessions(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
        sessions: &[Session],
    ) -> Result<(), CacheError>;

    fn connections(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
    ) -> Result<Option<Vec<Connection>>, CacheError>;

    fn put_connections(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
        connections: &[Connection],
    ) -> Result<(), CacheError>;
}

pub fn clusters_key(entrypoint: &str) -> String {
    format!("{}:clusters", entrypoint)
}

pub fn infobases_key(entrypoint: &str, cluster_id: &str) -> String {
    format!("{}:clusters:{}:ibs", entrypoint, cluster_id)
}

pub fn sessions_key(entrypoint: &str, cluster_id: &str, infobase_id: Option<&str>) -> String {
    format!(
        "{}:clusters:{}:ibs:{}:ses",
        entrypoint,
        cluster_id,
        infobase_id.unwrap_or_default()
    )
}

pub fn connections_key(entrypoint: &str, cluster_id: &str, infobase_id: Option<&str>) -> String {
    format!(
        "{}:clusters:{}:ibs:{}:conns",
        entrypoint,
        cluster_id,
        infobase_id.unwrap_or_default()
    )
}

#[derive(Clone)]
enum Cached {
    Clusters(Vec<Cluster>),
    Infobases(Vec<Infobase>),
    Sessions(Vec<Session>),
    Connections(Vec<Connection>),
}

/// [`CtrlCache`] over a [`TtlCache`].
pub struct MemoryCtrlCache {
    cache: TtlCache<Cached>,
}

impl MemoryCtrlCache {
    /// Must be called inside a tokio runtime, it starts the expiry sweep.
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::with_cleanup(ttl, CLEANUP_INTERVAL),
        }
    }

    pub fn flush(&self) -> Result<(), CacheError> {
        self.cache.flush()
    }
}

impl CtrlCache for MemoryCtrlCache {
    fn clusters(&self, entrypoint: &str) -> Result<Option<Vec<Cluster>>, CacheError> {
        match self.cache.get(&clusters_key(entrypoint))? {
            Some(Cached::Clusters(list)) => Ok(Some(list)),
            _ => Ok(None),
        }
    }

    fn put_clusters(&self, entrypoint: &str, clusters: &[Cluster]) -> Result<(), CacheError> {
        self.cache
            .set(clusters_key(entrypoint), Cached::Clusters(clusters.to_vec()))
    }

    fn infobases(
        &self,
        entrypoint: &str,
        cluster_id: &str,
    ) -> Result<Option<Vec<Infobase>>, CacheError> {
        match self.cache.get(&infobases_key(entrypoint, cluster_id))? {
            Some(Cached::Infobases(list)) => Ok(Some(list)),
            _ => Ok(None),
        }
    }

    fn put_infobases(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobases: &[Infobase],
    ) -> Result<(), CacheError> {
        self.cache.set(
            infobases_key(entrypoint, cluster_id),
            Cached::Infobases(infobases.to_vec()),
        )
    }

    fn sessions(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
    ) -> Result<Option<Vec<Session>>, CacheError> {
        match self
            .cache
            .get(&sessions_key(entrypoint, cluster_id, infobase_id))?
        {
            Some(Cached::Sessions(list)) => Ok(Some(list)),
            _ => Ok(None),
        }
    }

    fn put_sessions(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
        sessions: &[Session],
    ) -> Result<(), CacheError> {
        self.cache.set(
            sessions_key(entrypoint, cluster_id, infobase_id),
            Cached::Sessions(sessions.to_vec()),
        )
    }

    fn connections(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
    ) -> Result<Option<Vec<Connection>>, CacheError> {
        match self
            .cache
            .get(&connections_key(entrypoint, cluster_id, infobase_id))?
        {
            Some(Cached::Connections(list)) => Ok(Some(list)),
            _ => Ok(None),
        }
    }

    fn put_connections(
        &self,
        entrypoint: &str,
        cluster_id: &str,
        infobase_id: Option<&str>,
        connections: &[Connection],
    ) -> Result<(), CacheError> {
        self.cache.set(
            connections_key(entrypoint, cluster_id, infobase_id),
            Cached::Connections(connections.to_vec()),
        )
    }
}
