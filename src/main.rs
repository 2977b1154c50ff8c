use clap::{Parser, Subcommand};
use log::{error, info};
use racctl::backup::BackupRunner;
use racctl::cache::MemoryCtrlCache;
use racctl::cluster_control::ClusterController;
use racctl::configuration::Config;
use racctl::control_service::{BackupRequest, ControlService};
use racctl::entity::Credentials;
use racctl::process_management::RacPipe;
use racctl::web_interface::WebServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "racctl")]
#[command(version = "0.0.2")]
#[command(about = "Administration gateway for 1C:Enterprise server clusters")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = "./config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Lock an infobase, drop its clients and dump it to a file
    Backup {
        #[arg(long)]
        entrypoint: String,
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        infobase: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "")]
        cluster_user: String,
        #[arg(long, env = "CLUSTER_PWD", default_value = "", hide_env_values = true)]
        cluster_pwd: String,
        #[arg(long, default_value = "")]
        infobase_user: String,
        #[arg(long, env = "INFOBASE_PWD", default_value = "", hide_env_values = true)]
        infobase_pwd: String,
    },
    /// Write a default configuration file
    Init,
}

fn build_service(config: &Config) -> Result<ControlService, Box<dyn std::error::Error>> {
    let rac = RacPipe::new(&config.app.path_to_rac)?;
    let client = RacPipe::new(&config.app.path_to_1c)?;

    let ctrl = ClusterController::new(Arc::new(rac))
        .with_delete_limit(config.app.max_concurrent_deletes);
    let cache = MemoryCtrlCache::new(config.cache_ttl());
    let backup = BackupRunner::new(Arc::new(client));

    Ok(
        ControlService::new(Arc::new(ctrl), Arc::new(cache), Arc::new(backup), &config.app.lock_code)
            .with_backup_timeout(config.backup_timeout()),
    )
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Init = args.command {
        Config::prepare(&args.config)?;
        info!("Default configuration written to {}", args.config.display());
        return Ok(());
    }

    let config = Config::load(&args.config)?;
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(config.log_level()?);
    }
    info!("Configuration imported from {}", args.config.display());

    let service = build_service(&config)?;

    match args.command {
        Command::Serve => {
            let server = WebServer::new(Arc::new(service), config.list_timeout());
            tokio::select! {
                _ = server.start(config.http.port) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
            }
            Ok(())
        }
        Command::Backup {
            entrypoint,
            cluster,
            infobase,
            output,
            cluster_user,
            cluster_pwd,
            infobase_user,
            infobase_pwd,
        } => {
            let cluster_cred = Credentials::new(cluster_user, cluster_pwd).non_empty();
            let infobase_cred = Credentials::new(infobase_user, infobase_pwd).non_empty();
            let req = BackupRequest {
                entrypoint: &entrypoint,
                cluster_id: &cluster,
                infobase_id: &infobase,
                cluster_cred: cluster_cred.as_ref(),
                infobase_cred: infobase_cred.as_ref(),
                output_path: &output,
            };

            let ctx = CancellationToken::new();
            let interrupt = ctx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, cancelling backup");
                    interrupt.cancel();
                }
            });

            service.backup_infobase(&ctx, &req).await?;
            Ok(())
        }
        Command::Init => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    // the configured level is applied once loaded, unless RUST_LOG is set
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .format_target(false)
        .init();
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(log::LevelFilter::Info);
    }

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
