use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use distributed_storage::chunker::Chunker;
use distributed_storage::client::{StorageClient, UploadReport};
use distributed_storage::config::ClusterConfig;
use distributed_storage::health::{HealthMonitor, NodeId};
use distributed_storage::placement::PlacementCoordinator;
use distributed_storage::registry::protocol::DeleteFileResponse;
use distributed_storage::registry::types::now_ms;
use distributed_storage::registry::{MetadataService, Registry, handlers as metadata_handlers};
use distributed_storage::storage::ChunkStore;
use distributed_storage::storage::handlers::{self as node_handlers, StorageNode};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dfs", version, about = "Distributed chunked file storage")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "DFS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Metadata server URL (overrides the config file).
    #[arg(long, global = true)]
    metadata_url: Option<String>,

    /// Replicas per chunk (overrides the config file).
    #[arg(short = 'r', long, global = true)]
    replication_factor: Option<usize>,

    /// Chunk size in bytes (overrides the config file).
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the metadata server.
    Metadata,
    /// Run one storage node.
    Node {
        /// Node id as listed in the configuration.
        #[arg(long)]
        id: String,
        /// Chunk directory (default: <storage_dir>/<id>).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Run the metadata server and every configured node in this process.
    Run,
    /// Upload a file.
    Upload { path: PathBuf },
    /// Download a file.
    Download {
        file_id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List all files.
    List,
    /// Show a file and where its chunks live.
    Info { file_id: String },
    /// Show storage node liveness.
    Status,
    /// Delete a file.
    Delete {
        file_id: String,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = ClusterConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.metadata_url {
        config.metadata_url = url;
    }
    if let Some(replicas) = cli.replication_factor {
        config.replication_factor = replicas;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.validate()?;

    match cli.command {
        Command::Metadata => serve(&config, &[]).await,
        Command::Node { id, dir } => serve_node(&config, &id, dir).await,
        Command::Run => {
            let ids: Vec<String> = config
                .nodes
                .iter()
                .map(|node| node.node_id.to_string())
                .collect();
            serve(&config, &ids).await
        }
        Command::Upload { path } => {
            let report = client(&config)?.upload_file(&path).await?;
            print_upload(&report);
            Ok(())
        }
        Command::Download { file_id, output } => {
            let report = client(&config)?
                .download_file(&file_id, output.as_deref())
                .await?;
            println!(
                "File {} downloaded to {} ({} bytes, {} chunk(s))",
                report.file_id,
                report.path.display(),
                report.bytes,
                report.total_chunks
            );
            Ok(())
        }
        Command::List => list_files(&config).await,
        Command::Info { file_id } => file_info(&config, &file_id).await,
        Command::Status => node_status(&config).await,
        Command::Delete { file_id, yes } => delete_file(&config, &file_id, yes).await,
    }
}

fn client(config: &ClusterConfig) -> anyhow::Result<StorageClient> {
    Ok(StorageClient::new(
        &config.metadata_url,
        Chunker::new(config.chunk_size)?,
        config.replication_factor,
        config.request_timeout(),
        config.transfer_timeout(),
        &config.download_dir,
    ))
}

async fn serve_node(config: &ClusterConfig, id: &str, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = dir.unwrap_or_else(|| config.node_storage_dir(id));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut servers = JoinSet::new();
    spawn_node(config, id, dir, &mut servers, shutdown_rx).await?;
    run_until_shutdown(servers, shutdown_tx, None).await
}

/// Starts the metadata server plus the nodes named in `node_ids`, then waits for Ctrl-C.
async fn serve(config: &ClusterConfig, node_ids: &[String]) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut servers = JoinSet::new();

    for id in node_ids {
        spawn_node(config, id, config.node_storage_dir(id), &mut servers, shutdown_rx.clone())
            .await?;
    }

    let monitor = HealthMonitor::new(
        config.nodes.clone(),
        config.check_interval(),
        config.probe_timeout(),
    );
    let registry = Registry::open(&config.metadata_dir)
        .with_context(|| format!("opening registry at {:?}", config.metadata_dir))?;
    let service = MetadataService::new(
        registry,
        PlacementCoordinator::new(monitor.clone(), config.replication_factor),
        config.request_timeout(),
    );

    let addr = config.listen_addr(&config.metadata_url)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metadata server to {}", addr))?;
    tracing::info!("Metadata server listening on {}", addr);

    let app = metadata_handlers::router(service);
    let shutdown = shutdown_rx.clone();
    servers.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await
            .map_err(anyhow::Error::from)
    });

    monitor.start_monitoring();

    run_until_shutdown(servers, shutdown_tx, Some(monitor)).await
}

async fn spawn_node(
    config: &ClusterConfig,
    id: &str,
    dir: PathBuf,
    servers: &mut JoinSet<anyhow::Result<()>>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let info = config
        .node(id)
        .ok_or_else(|| anyhow!("node {} is not in the configuration", id))?;
    let store =
        ChunkStore::open(&dir).with_context(|| format!("opening chunk store at {:?}", dir))?;
    let node = StorageNode::new(NodeId::new(id), store);

    let addr = config.listen_addr(&info.url)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding node {} to {}", id, addr))?;
    tracing::info!("Storage node {} listening on {} (data in {:?})", id, addr, dir);

    let app = node_handlers::router(node);
    servers.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await
            .map_err(anyhow::Error::from)
    });
    Ok(())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

async fn run_until_shutdown(
    mut servers: JoinSet<anyhow::Result<()>>,
    shutdown_tx: watch::Sender<bool>,
    health: Option<Arc<HealthMonitor>>,
) -> anyhow::Result<()> {
    tracing::info!("Press Ctrl+C to shutdown");

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("installing Ctrl+C handler")?;
            tracing::info!("Shutting down...");
            Ok(())
        }
        Some(joined) = servers.join_next() => {
            match joined {
                Ok(Ok(())) => Err(anyhow!("server exited unexpectedly")),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(e.into()),
            }
        }
    };

    let _ = shutdown_tx.send(true);
    if let Some(health) = health {
        health.stop_monitoring().await;
    }
    while let Some(joined) = servers.join_next().await {
        if let Ok(Err(e)) = joined {
            tracing::warn!("Server stopped with error: {}", e);
        }
    }

    result
}

fn print_upload(report: &UploadReport) {
    println!(
        "File {} (ID: {}) uploaded: {} in {} chunk(s)",
        report.filename,
        report.file_id,
        human_size(report.size),
        report.chunks.len()
    );
    for chunk in report.under_replicated() {
        println!(
            "  chunk {} stored on {} of {} node(s)",
            chunk.index,
            chunk.achieved(),
            report.replication_factor
        );
        for (node_id, reason) in &chunk.failures {
            println!("    {}: {}", node_id, reason);
        }
    }
    if !report.is_fully_replicated() {
        println!("Warning: some chunks are under-replicated");
    }
}

async fn list_files(config: &ClusterConfig) -> anyhow::Result<()> {
    let files = client(config)?.list_files().await?;
    if files.is_empty() {
        println!("No files found in the system");
        return Ok(());
    }

    println!(
        "{:<32} {:<36} {:>10} {:>7} {:>10}",
        "Filename", "File ID", "Size", "Chunks", "Created"
    );
    let now = now_ms();
    for file in files {
        println!(
            "{:<32} {:<36} {:>10} {:>7} {:>10}",
            file.filename,
            file.file_id,
            human_size(file.size),
            format!("{}/{}", file.registered_chunks, file.total_chunks),
            human_age(now.saturating_sub(file.created_at))
        );
    }
    Ok(())
}

async fn file_info(config: &ClusterConfig, file_id: &str) -> anyhow::Result<()> {
    let info = client(config)?.file_info(file_id).await?;
    println!("Filename:     {}", info.file.filename);
    println!("File ID:      {}", info.file.file_id);
    println!("Size:         {}", human_size(info.file.size));
    println!("Content type: {}", info.file.content_type);
    println!(
        "Chunks:       {}/{} registered",
        info.chunks.len(),
        info.file.total_chunks
    );
    for chunk in &info.chunks {
        let nodes: Vec<&str> = chunk.nodes.iter().map(|node| node.as_str()).collect();
        println!(
            "  #{:<5} {:>10}  {}",
            chunk.index,
            human_size(chunk.size),
            nodes.join(", ")
        );
    }
    Ok(())
}

async fn node_status(config: &ClusterConfig) -> anyhow::Result<()> {
    let statuses = client(config)?.node_status().await?;
    println!("{:<12} {:<32} {}", "Node ID", "URL", "Status");
    for status in statuses {
        println!(
            "{:<12} {:<32} {}",
            status.node_id.as_str(),
            status.url,
            if status.healthy { "ONLINE" } else { "OFFLINE" }
        );
    }
    Ok(())
}

async fn delete_file(config: &ClusterConfig, file_id: &str, yes: bool) -> anyhow::Result<()> {
    let client = client(config)?;
    let info = client.file_info(file_id).await?;

    if !yes {
        print!(
            "Are you sure you want to delete '{}' (ID: {})? (y/n): ",
            info.file.filename, file_id
        );
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    let response = client.delete_file(file_id).await?;
    println!("{}", delete_summary(&info.file.filename, &response));
    Ok(())
}

fn delete_summary(filename: &str, response: &DeleteFileResponse) -> String {
    let mut line = format!(
        "File '{}' (ID: {}) deleted ({} replica(s) removed",
        filename, response.file_id, response.replicas_deleted
    );
    if response.replicas_failed > 0 {
        line.push_str(&format!(", {} left on unreachable nodes", response.replicas_failed));
    }
    line.push(')');
    line
}

fn human_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}

fn human_age(elapsed_ms: u64) -> String {
    let secs = elapsed_ms / 1000;
    match secs {
        0..60 => format!("{}s ago", secs),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}
