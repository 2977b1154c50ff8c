use async_trait::async_trait;
use log::info;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cluster_control::result_collector::execute;
use crate::entity::{Cluster, Credentials, Infobase};
use crate::error_handling::types::BackupError;
use crate::process_management::Piper;

/// Dumps an infobase to a file.
#[async_trait]
pub trait Backup: Send + Sync {
    async fn run_backup(
        &self,
        ctx: &CancellationToken,
        cluster: &Cluster,
        infobase: &Infobase,
        credentials: Option<&Credentials>,
        lock_code: &str,
        output_path: &Path,
    ) -> Result<(), BackupError>;
}

/// [`Backup`] through the platform client in designer batch mode.
#[derive(Clone)]
pub struct BackupRunner {
    pipe: Arc<dyn Piper>,
}

impl BackupRunner {
    pub fn new(pipe: Arc<dyn Piper>) -> Self {
        Self { pipe }
    }
}

/// Argument vector of a designer `/DumpIB` run.
pub fn dump_args(
    cluster: &Cluster,
    infobase: &Infobase,
    credentials: Option<&Credentials>,
    lock_code: &str,
    output_path: &Path,
) -> Result<Vec<String>, BackupError> {
    if cluster.host.is_empty() || cluster.port.is_empty() {
        return Err(BackupError::IncompleteTarget(format!(
            "cluster {} has no host or port",
            cluster.id
        )));
    }
    if infobase.name.is_empty() {
        return Err(BackupError::IncompleteTarget(format!(
            "infobase {} has no name",
            infobase.id
        )));
    }

    let mut args = vec![
        "CONFIG".to_string(),
        "/S".to_string(),
        format!("{}:{}\\{}", cluster.host, cluster.port, infobase.name),
    ];
    if let Some(cred) = credentials.filter(|c| !c.is_empty()) {
        args.extend([
            "/N".to_string(),
            cred.name.clone(),
            "/P".to_string(),
            cred.password.clone(),
        ]);
    }
    args.extend([
        "/UC".to_string(),
        lock_code.to_string(),
        "/DisableStartupMessages".to_string(),
        "/DumpIB".to_string(),
        output_path.display().to_string(),
    ]);
    Ok(args)
}

#[async_trait]
impl Backup for BackupRunner {
    async fn run_backup(
        &self,
        ctx: &CancellationToken,
        cluster: &Cluster,
        infobase: &Infobase,
        credentials: Option<&Credentials>,
        lock_code: &str,
        output_path: &Path,
    ) -> Result<(), BackupError> {
        let args = dump_args(cluster, infobase, credentials, lock_code, output_path)?;

        info!("Dumping infobase {} to {}", infobase.name, output_path.display());
        execute(self.pipe.as_ref(), ctx, "runbackup", &args).await?;
        info!("Infobase {} dumped", infobase.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::CtrlError;
    use crate::process_management::testing::FakePiper;

    fn target() -> (Cluster, Infobase) {
        let cluster = Cluster {
            host: "srv".to_string(),
            port: "1541".to_string(),
            ..Cluster::with_id("c1")
        };
        let infobase = Infobase {
            name: "accounting".to_string(),
            ..Infobase::with_id("ib1")
        };
        (cluster, infobase)
    }

    #[test]
    fn test_dump_args() {
        let (cluster, infobase) = target();
        let cred = Credentials::new("ibadmin", "secret");

        let args = dump_args(
            &cluster,
            &infobase,
            Some(&cred),
            "12345",
            Path::new("/backups/accounting.dt"),
        )
        .unwrap();

        assert_eq!(
            args,
            [
                "CONFIG",
                "/S",
                "srv:1541\\accounting",
                "/N",
                "ibadmin",
                "/P",
                "secret",
                "/UC",
                "12345",
                "/DisableStartupMessages",
                "/DumpIB",
                "/backups/accounting.dt",
            ]
        );
    }

    #[test]
    fn test_dump_args_without_credentials() {
        let (cluster, infobase) = target();

        let args = dump_args(&cluster, &infobase, None, "1", Path::new("out.dt")).unwrap();

        assert!(!args.contains(&"/N".to_string()));
        assert!(!args.contains(&"/P".to_string()));
    }

    #[test]
    fn test_dump_args_rejects_incomplete_target() {
        let (_, infobase) = target();

        let result = dump_args(&Cluster::with_id("c1"), &infobase, None, "1", Path::new("out.dt"));

        assert!(matches!(result, Err(BackupError::IncompleteTarget(_))));
    }

    #[tokio::test]
    async fn test_run_backup_surfaces_exit_error() {
        let (cluster, infobase) = target();
        let piper = Arc::new(FakePiper::with_output("").exit_code(101));
        let runner = BackupRunner::new(piper.clone());

        let result = runner
            .run_backup(
                &CancellationToken::new(),
                &cluster,
                &infobase,
                None,
                "12345",
                Path::new("out.dt"),
            )
            .await;

        assert!(matches!(
            result,
            Err(BackupError::Failed(CtrlError::Wait { operation: "runbackup", .. }))
        ));
        assert_eq!(piper.calls().len(), 1);
        assert_eq!(piper.calls()[0][0], "CONFIG");
    }
}
