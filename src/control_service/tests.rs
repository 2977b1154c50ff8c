#[cfg(test)]
mod tests {
    use crate::backup::Backup;
    use crate::cache::{CtrlCache, MemoryCtrlCache};
    use crate::cluster_control::ClusterControl;
    use crate::control_service::{BackupRequest, ControlService};
    use crate::entity::{Cluster, Connection, Credentials, Infobase, Session};
    use crate::error_handling::types::{BackupError, CtrlError, PipeError, ServiceError};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    type Log = Arc<Mutex<Vec<String>>>;

    fn exit_error(operation: &'static str) -> CtrlError {
        CtrlError::Wait {
            operation,
            source: PipeError::Exit {
                code: Some(1),
                stderr: String::new(),
            },
        }
    }

    #[derive(Default)]
    struct FakeControl {
        clusters: Vec<Cluster>,
        infobases: Vec<Infobase>,
        sessions: Vec<Session>,
        connections: Vec<Connection>,
        fail_lists: bool,
        fail_enable: bool,
        log: Log,
    }

    impl FakeControl {
        fn record(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }

        fn list<T: Clone>(&self, name: &'static str, items: &[T]) -> Result<Vec<T>, CtrlError> {
            self.record(name);
            if self.fail_lists {
                return Err(exit_error(name));
            }
            Ok(items.to_vec())
        }
    }

    #[async_trait]
    impl ClusterControl for FakeControl {
        async fn clusters(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
        ) -> Result<Vec<Cluster>, CtrlError> {
            self.list("clusters", &self.clusters)
        }

        async fn infobases(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            _cluster_cred: Option<&Credentials>,
        ) -> Result<Vec<Infobase>, CtrlError> {
            self.list("infobases", &self.infobases)
        }

        async fn sessions(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            _infobase: Option<&Infobase>,
            _cluster_cred: Option<&Credentials>,
        ) -> Result<Vec<Session>, CtrlError> {
            self.list("sessions", &self.sessions)
        }

        async fn connections(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            _infobase: Option<&Infobase>,
            _cluster_cred: Option<&Credentials>,
        ) -> Result<Vec<Connection>, CtrlError> {
            self.list("connections", &self.connections)
        }

        async fn disable_sessions(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            infobase: Option<&Infobase>,
            _cluster_cred: Option<&Credentials>,
            _infobase_cred: Option<&Credentials>,
            lock_code: &str,
        ) -> Result<(), CtrlError> {
            let ib = infobase.ok_or(CtrlError::InfobaseRequired)?;
            self.record(format!("disable {} {}", ib.id, lock_code));
            Ok(())
        }

        async fn enable_sessions(
            &self,
            ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            infobase: Option<&Infobase>,
            _cluster_cred: Option<&Credentials>,
            _infobase_cred: Option<&Credentials>,
            _lock_code: &str,
        ) -> Result<(), CtrlError> {
            let ib = infobase.ok_or(CtrlError::InfobaseRequired)?;
            self.record(format!("enable {} cancelled={}", ib.id, ctx.is_cancelled()));
            if self.fail_enable {
                return Err(exit_error("enablesessions"));
            }
            Ok(())
        }

        async fn delete_session(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            _session: Option<&Session>,
            _cluster_cred: Option<&Credentials>,
        ) -> Result<(), CtrlError> {
            unreachable!("the service deletes in bulk")
        }

        async fn delete_sessions(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            sessions: &[Session],
            _cluster_cred: Option<&Credentials>,
        ) -> Result<(), CtrlError> {
            self.record(format!("delete_sessions {}", sessions.len()));
            Err(CtrlError::Aggregate(vec![exit_error("deletesession")]))
        }

        async fn delete_connection(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            _connection: Option<&Connection>,
            _cluster_cred: Option<&Credentials>,
        ) -> Result<(), CtrlError> {
            unreachable!("the service deletes in bulk")
        }

        async fn delete_connections(
            &self,
            _ctx: &CancellationToken,
            _entrypoint: &str,
            _cluster: &Cluster,
            connections: &[Connection],
            _cluster_cred: Option<&Credentials>,
        ) -> Result<(), CtrlError> {
            self.record(format!("delete_connections {}", connections.len()));
            Ok(())
        }
    }

    struct FakeBackup {
        fail: bool,
        log: Log,
    }

    #[async_trait]
    impl Backup for FakeBackup {
        async fn run_backup(
            &self,
            _ctx: &CancellationToken,
            _cluster: &Cluster,
            infobase: &Infobase,
            _credentials: Option<&Credentials>,
            _lock_code: &str,
            output_path: &Path,
        ) -> Result<(), BackupError> {
            self.log.lock().unwrap().push(format!("backup {}", infobase.name));
            if self.fail {
                return Err(BackupError::Failed(exit_error("runbackup")));
            }
            std::fs::write(output_path, b"dump").unwrap();
            Ok(())
        }
    }

    fn populated(log: &Log) -> FakeControl {
        FakeControl {
            clusters: vec![Cluster {
                host: "srv".to_string(),
                port: "1541".to_string(),
                ..Cluster::with_id("c1")
            }],
            infobases: vec![Infobase {
                name: "accounting".to_string(),
                ..Infobase::with_id("ib1")
            }],
            sessions: vec![Session::with_id("s1"), Session::with_id("s2")],
            connections: vec![Connection::with_id("k1")],
            log: log.clone(),
            ..Default::default()
        }
    }

    fn service(ctrl: FakeControl, fail_backup: bool, log: &Log) -> (ControlService, Arc<MemoryCtrlCache>) {
        let cache = Arc::new(MemoryCtrlCache::new(Duration::from_secs(60)));
        let backup = FakeBackup {
            fail: fail_backup,
            log: log.clone(),
        };
        let svc = ControlService::new(Arc::new(ctrl), cache.clone(), Arc::new(backup), "12345");
        (svc, cache)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_cache_first_serves_stored_list() {
        let log = Log::default();
        let (svc, _) = service(populated(&log), false, &log);
        let ctx = CancellationToken::new();

        let first = svc.clusters(&ctx, "srv:1545", true).await.unwrap();
        let second = svc.clusters(&ctx, "srv:1545", true).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(entries(&log), ["clusters"]);
    }

    #[tokio::test]
    async fn test_without_cache_flag_always_fetches() {
        let log = Log::default();
        let (svc, cache) = service(populated(&log), false, &log);
        let ctx = CancellationToken::new();
        let cl = Cluster::with_id("c1");

        svc.infobases(&ctx, "srv:1545", &cl, None, false).await.unwrap();
        svc.infobases(&ctx, "srv:1545", &cl, None, false).await.unwrap();

        assert_eq!(entries(&log), ["infobases", "infobases"]);
        assert!(cache.infobases("srv:1545", "c1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_cached_list_is_a_miss() {
        let log = Log::default();
        let (svc, cache) = service(populated(&log), false, &log);
        let ctx = CancellationToken::new();
        let cl = Cluster::with_id("c1");
        let ib = Infobase::with_id("ib1");
        cache.put_sessions("srv:1545", "c1", Some("ib1"), &[]).unwrap();

        let sessions = svc
            .sessions(&ctx, "srv:1545", &cl, Some(&ib), None, true)
            .await
            .unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(entries(&log), ["sessions"]);
    }

    #[tokio::test]
    async fn test_control_error_is_wrapped_and_not_cached() {
        let log = Log::default();
        let ctrl = FakeControl {
            fail_lists: true,
            ..populated(&log)
        };
        let (svc, cache) = service(ctrl, false, &log);
        let ctx = CancellationToken::new();
        let cl = Cluster::with_id("c1");

        let err = svc
            .connections(&ctx, "srv:1545", &cl, None, None, true)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Control { operation: "Connections", .. }));
        assert!(err.to_string().starts_with("ControlService - Connections - pipe:"));
        assert_eq!(cache.connections("srv:1545", "c1", None).unwrap(), None);
    }

    #[tokio::test]
    async fn test_backup_workflow_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("accounting.dt");
        let log = Log::default();
        let (svc, _) = service(populated(&log), false, &log);
        let ctx = CancellationToken::new();

        svc.backup_infobase(
            &ctx,
            &BackupRequest {
                entrypoint: "srv:1545",
                cluster_id: "c1",
                infobase_id: "ib1",
                cluster_cred: None,
                infobase_cred: None,
                output_path: &output,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            entries(&log),
            [
                "clusters",
                "infobases",
                "disable ib1 12345",
                "sessions",
                "delete_sessions 2",
                "connections",
                "delete_connections 1",
                "backup accounting",
                "enable ib1 cancelled=false",
            ]
        );
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_backup_failure_still_unlocks() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("accounting.dt");
        let log = Log::default();
        let ctrl = FakeControl {
            fail_enable: true,
            ..populated(&log)
        };
        let (svc, _) = service(ctrl, true, &log);
        let ctx = CancellationToken::new();

        let err = svc
            .backup_infobase(
                &ctx,
                &BackupRequest {
                    entrypoint: "srv:1545",
                    cluster_id: "c1",
                    infobase_id: "ib1",
                    cluster_cred: None,
                    infobase_cred: None,
                    output_path: &output,
                },
            )
            .await
            .unwrap_err();

        match err {
            ServiceError::Workflow(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], ServiceError::Backup(BackupError::Failed(_))));
                assert!(matches!(errors[1], ServiceError::Control { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(entries(&log).last().map(String::as_str), Some("enable ib1 cancelled=false"));
    }

    #[tokio::test]
    async fn test_backup_unlocks_with_fresh_token_after_cancel() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = Log::default();
        let (svc, _) = service(populated(&log), false, &log);
        let ctx = CancellationToken::new();
        ctx.cancel();

        let output = dir.path().join("out.dt");
        svc.backup_infobase(
            &ctx,
            &BackupRequest {
                entrypoint: "srv:1545",
                cluster_id: "c1",
                infobase_id: "ib1",
                cluster_cred: None,
                infobase_cred: None,
                output_path: &output,
            },
        )
        .await
        .unwrap();

        assert!(entries(&log).contains(&"enable ib1 cancelled=false".to_string()));
    }

    #[tokio::test]
    async fn test_backup_unknown_infobase_never_locks() {
        let log = Log::default();
        let (svc, _) = service(populated(&log), false, &log);
        let ctx = CancellationToken::new();

        let err = svc
            .backup_infobase(
                &ctx,
                &BackupRequest {
                    entrypoint: "srv:1545",
                    cluster_id: "c1",
                    infobase_id: "missing",
                    cluster_cred: None,
                    infobase_cred: None,
                    output_path: Path::new("unused.dt"),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(!entries(&log).iter().any(|e| e.starts_with("disable")));
    }
}
