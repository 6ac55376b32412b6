//! dockyard shell entry point.
//!
//! Loads the application config, opens the active layout file and drives its
//! layout controller from a Tokio event loop until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- dockyard.toml, defaults when missing
//!  └─ save_config()            -- first run only, writes the defaults out
//!  └─ TomlConfigStore::open()  -- the active layout file
//!  └─ LayoutController::init() -- load definitions, create initial views
//!  └─ event_loop::run()        -- until Shutdown
//! ```

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dockyard_shell::application::events::ShellEvent;
use dockyard_shell::application::manage_layout::{LayoutController, LayoutSettings};
use dockyard_shell::infrastructure::config_store::TomlConfigStore;
use dockyard_shell::infrastructure::event_loop;
use dockyard_shell::infrastructure::platform::headless::HeadlessPlatform;
use dockyard_shell::infrastructure::storage::config::{
    active_layout_file, config_file_path, layouts_dir, load_config, save_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("loading dockyard.toml")?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.shell.log_level)),
        )
        .init();

    info!("dockyard starting");

    // First run: leave an editable dockyard.toml behind.
    let config_path = config_file_path()?;
    if !config_path.exists() {
        match save_config(&config) {
            Ok(()) => info!("wrote default config to {}", config_path.display()),
            Err(e) => warn!("could not write default config: {e}"),
        }
    }

    let layout_path = active_layout_file(&layouts_dir()?, &config);
    if !layout_path.exists() {
        warn!("layout file {} does not exist yet, starting empty", layout_path.display());
    }
    let store = TomlConfigStore::open(&layout_path)
        .with_context(|| format!("opening {}", layout_path.display()))?;

    let (tx, rx) = event_loop::channel();
    let platform = HeadlessPlatform::single_screen(tx.clone());
    let mut controller = LayoutController::new(
        LayoutSettings::from_config(&config),
        Box::new(store),
        Box::new(platform),
    );
    let report = controller.init()?;
    info!(
        "layout {} ready: {} views created, {} rejected",
        controller.name(),
        report.created.len(),
        report.rejected.len()
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(ShellEvent::Shutdown);
        }
    });

    info!("dockyard ready.  Press Ctrl-C to exit.");
    let controller = event_loop::run(controller, tx, rx).await;

    info!("dockyard stopped ({} views left)", controller.views_count());
    Ok(())
}
