use pmoconfig::get_config;
use pmofolder::{
    BrowseFlag, ContentTree, FolderConfigExt, MediaIndex, ROOT_ID, refresh_in_background,
    spawn_refresh_task,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();

    // RUST_LOG prime sur host.logger.min_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level().to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ========== PHASE 1 : Index ==========

    let tree = Arc::new(ContentTree::new(&config.get_server_name()));

    // Les répertoires passés en argument remplacent folder.media_dirs (sans être sauvegardés)
    let args: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    let index = if args.is_empty() {
        config.create_media_index(tree.clone())?
    } else {
        Arc::new(MediaIndex::new(args, tree.clone()))
    };
    let handler = config.create_content_handler(tree.clone())?;

    info!("📁 Indexing {} media director(y/ies)...", index.base_dirs().len());
    for dir in index.base_dirs() {
        info!("  - {}", dir.display());
    }
    match refresh_in_background(index.clone()).await {
        Ok(Some(count)) => info!("✅ {} media item(s) indexed", count),
        Ok(None) => info!("Initial refresh already running"),
        Err(e) => warn!("⚠️ Initial refresh failed: {}", e),
    }

    let root = handler.browse(ROOT_ID, BrowseFlag::DirectChildren, 0, 0)?;
    for group in &root.containers {
        info!("  - {} ({} children)", group.title, group.child_count().unwrap_or(0));
    }

    // ========== PHASE 2 : Rafraîchissement périodique ==========

    let interval = config.get_refresh_interval()?;
    let refresh_task = if interval.is_zero() {
        info!("Periodic refresh disabled");
        None
    } else {
        Some(spawn_refresh_task(index.clone(), interval))
    };

    info!(
        "✅ {} is ready, resources served under {}",
        tree.root_title(),
        handler.resource_url("")
    );
    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    info!("🛑 Shutting down...");
    if let Some(task) = refresh_task {
        task.abort();
    }
    Ok(())
}
