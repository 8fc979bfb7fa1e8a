#[cfg(target_os = "android")]
fn main() {
    // Android entry-point handled via `glue_app::entrypoint!`.
}

#[cfg(not(target_os = "android"))]
fn main() {
    tracing_subscriber::fmt::init();
    match desktop::run() {
        Ok(status) => std::process::exit(status),
        Err(err) => {
            eprintln!("Failed to bootstrap: {err:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(target_os = "android"))]
mod desktop {
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use glue_app::bootstrap::{self, Host};
    use glue_core::assets::DirAssets;
    use glue_core::chrome::HeadlessChrome;
    use glue_core::provision::EnvRegistry;
    use glue_core::{AppContext, LifecycleState};
    use tracing::info;

    pub fn run() -> Result<i32> {
        let config = bootstrap::load_config()?;
        let asset_root = std::env::var_os("GLUE_ASSET_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("assets"));
        let writable_root = std::env::var_os("GLUE_WRITABLE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("glue"));
        std::fs::create_dir_all(&writable_root)
            .with_context(|| format!("unable to prepare {}", writable_root.display()))?;

        let assets = DirAssets::new(asset_root);
        let host = Host {
            assets: &assets,
            chrome: &HeadlessChrome,
            registry: Box::new(EnvRegistry),
            writable_root,
            lifecycle: Arc::new(LifecycleState::new()),
        };
        Ok(bootstrap::launch(host, config, report_fonts))
    }

    fn report_fonts(ctx: &AppContext) -> i32 {
        let file = std::env::var_os("FONTCONFIG_FILE").map(PathBuf::from);
        match file {
            Some(file) if file.is_file() => {
                info!(root = %ctx.writable_root().display(), file = %file.display(), "fonts ready");
                0
            }
            _ => {
                tracing::warn!("no font configuration was provisioned");
                2
            }
        }
    }
}
