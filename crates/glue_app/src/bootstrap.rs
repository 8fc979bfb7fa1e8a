use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use glue_core::assets::AssetSource;
use glue_core::chrome::{configure_chrome, ChromeHost};
use glue_core::lifecycle::AppLifecycleController;
use glue_core::provision::FontPathRegistry;
use glue_core::{AppContext, BootstrapConfig, LifecycleState, Provisioner};
use tracing::info;

pub struct Host<'a> {
    pub assets: &'a dyn AssetSource,
    pub chrome: &'a dyn ChromeHost,
    pub registry: Box<dyn FontPathRegistry>,
    pub writable_root: PathBuf,
    pub lifecycle: Arc<LifecycleState>,
}

/// Reads `GLUE_CONFIG` (a JSON file) when set, then applies the `GLUE_*`
/// environment overrides.
pub fn load_config() -> Result<BootstrapConfig> {
    let base = match std::env::var_os("GLUE_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            BootstrapConfig::from_json_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => BootstrapConfig::default(),
    };
    base.with_env_overrides()
        .context("invalid bootstrap environment")
}

/// Provisions fonts, hides the system chrome, runs `entry` and tears the
/// lifecycle record down. Returns the entry point's status code; the caller
/// is expected to exit the process with it.
pub fn launch<F>(host: Host<'_>, config: BootstrapConfig, entry: F) -> i32
where
    F: FnOnce(&AppContext) -> i32,
{
    let Host {
        assets,
        chrome,
        registry,
        writable_root,
        lifecycle,
    } = host;
    info!(root = %writable_root.display(), "bootstrapping application");

    let hide_chrome = config.hide_chrome;
    let provisioner = Provisioner::new(config).with_registry(registry);
    provisioner.ensure_provisioned(assets, &writable_root);

    if hide_chrome {
        configure_chrome(chrome);
    }

    let context = AppContext::new(writable_root, lifecycle.clone());
    AppLifecycleController::new(lifecycle).run_and_destroy(&context, entry)
}
