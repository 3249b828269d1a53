use clap::Parser;
use snippet_exec::ServiceConfig;
use snippet_exec_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for per-request workspaces
    #[arg(long)]
    scratch_root: Option<PathBuf>,

    /// Maximum number of concurrent executions
    #[arg(short, long)]
    max_concurrent: Option<usize>,

    /// Default per-step timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Largest timeout a caller may request, in seconds
    #[arg(long)]
    max_timeout: Option<u64>,

    /// Per-stream output capture limit in bytes
    #[arg(long)]
    max_output: Option<usize>,

    /// CPU time limit in seconds
    #[arg(long)]
    cpu_time_limit: Option<u64>,

    /// File size limit in bytes
    #[arg(long)]
    file_size_limit: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(scratch_root) = self.scratch_root {
            config.scratch_root = scratch_root;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent = max_concurrent;
        }
        if let Some(timeout) = self.timeout {
            config.default_timeout_secs = timeout;
        }
        if let Some(max_timeout) = self.max_timeout {
            config.max_timeout_secs = max_timeout;
        }
        if let Some(max_output) = self.max_output {
            config.max_output_bytes = max_output;
        }
        if let Some(cpu_time) = self.cpu_time_limit {
            config.limits.cpu_time_secs = cpu_time;
        }
        if let Some(file_size) = self.file_size_limit {
            config.limits.file_size_bytes = file_size;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let addr = args.addr;
    let config = args.into_config()?;
    tracing::info!(
        scratch_root = %config.scratch_root.display(),
        max_concurrent = config.max_concurrent,
        "Loaded configuration"
    );

    let app = create_app(config).await?;
    run_server(app, addr).await?;

    Ok(())
}
