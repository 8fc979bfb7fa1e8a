//! One-shot provisioning of packaged fonts into the writable root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::assets::{copy_directory, join_asset_path, AssetSource};
use crate::config::{BootstrapConfig, CompletionMarker};
use crate::fontconfig::{self, CONFIG_FILE_NAME};

pub const FONTCONFIG_PATH_VAR: &str = "FONTCONFIG_PATH";
pub const FONTCONFIG_FILE_VAR: &str = "FONTCONFIG_FILE";
pub const MARKER_FILE_NAME: &str = ".provisioned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontPaths {
    pub dir: PathBuf,
    pub file: PathBuf,
}

impl FontPaths {
    pub fn under(writable_root: &Path, fonts_subdir: &str) -> Self {
        let dir = writable_root.join(fonts_subdir);
        let file = dir.join(CONFIG_FILE_NAME);
        Self { dir, file }
    }
}

/// Receives the font paths before the font library initializes.
pub trait FontPathRegistry: Send + Sync {
    fn register(&self, paths: &FontPaths);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnvRegistry;

impl FontPathRegistry for EnvRegistry {
    fn register(&self, paths: &FontPaths) {
        std::env::set_var(FONTCONFIG_PATH_VAR, &paths.dir);
        std::env::set_var(FONTCONFIG_FILE_VAR, &paths.file);
        debug!(dir = %paths.dir.display(), file = %paths.file.display(), "font paths exported");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistry;

impl FontPathRegistry for NoopRegistry {
    fn register(&self, _paths: &FontPaths) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyProvisioned,
    /// Provisioning ran; `failures` counts the steps that were skipped.
    Provisioned { failures: usize },
}

pub struct Provisioner {
    config: BootstrapConfig,
    registry: Box<dyn FontPathRegistry>,
}

impl Provisioner {
    pub fn new(config: BootstrapConfig) -> Self {
        Self {
            config,
            registry: Box::new(EnvRegistry),
        }
    }

    pub fn with_registry(mut self, registry: Box<dyn FontPathRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn font_paths(&self, writable_root: &Path) -> FontPaths {
        FontPaths::under(writable_root, &self.config.fonts_subdir)
    }

    /// Never fails: every skipped step is logged and counted in the outcome.
    #[instrument(skip(self, assets), fields(root = %writable_root.display()))]
    pub fn ensure_provisioned<A>(&self, assets: &A, writable_root: &Path) -> ProvisionOutcome
    where
        A: AssetSource + ?Sized,
    {
        let paths = self.font_paths(writable_root);
        self.registry.register(&paths);

        if self.is_complete(&paths) {
            info!(dir = %paths.dir.display(), "fonts already provisioned");
            return ProvisionOutcome::AlreadyProvisioned;
        }

        if let Err(err) = fs::create_dir_all(&paths.dir) {
            warn!(path = %paths.dir.display(), %err, "unable to create font directory");
            return ProvisionOutcome::Provisioned { failures: 1 };
        }

        let mut failures = 0;
        match fontconfig::materialize(assets, &self.config.template_asset, &paths.dir) {
            Ok(Some(_)) => {}
            Ok(None) => warn!(asset = %self.config.template_asset, "font config template missing"),
            Err(err) => {
                warn!(%err, "failed to materialize font config");
                failures += 1;
            }
        }

        for family in &self.config.font_families {
            let source = join_asset_path(&self.config.font_asset_dir, family);
            match copy_directory(assets, &source, &paths.dir.join(family)) {
                Ok(report) => {
                    debug!(family = %family, copied = report.copied, "font family extracted");
                    failures += report.failed;
                }
                Err(err) => {
                    warn!(family = %family, %err, "failed to extract font family");
                    failures += 1;
                }
            }
        }

        if self.config.marker == CompletionMarker::File {
            if failures == 0 {
                let marker = paths.dir.join(MARKER_FILE_NAME);
                if let Err(err) = fs::write(&marker, b"") {
                    warn!(path = %marker.display(), %err, "unable to write completion marker");
                    failures += 1;
                }
            } else {
                warn!(failures, "provisioning incomplete, will retry on next launch");
            }
        }

        info!(failures, "font provisioning finished");
        ProvisionOutcome::Provisioned { failures }
    }

    fn is_complete(&self, paths: &FontPaths) -> bool {
        match self.config.marker {
            CompletionMarker::Directory => paths.dir.exists(),
            CompletionMarker::File => paths.dir.join(MARKER_FILE_NAME).is_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[derive(Default, Clone)]
    struct RecordingRegistry(Arc<Mutex<Vec<FontPaths>>>);

    impl FontPathRegistry for RecordingRegistry {
        fn register(&self, paths: &FontPaths) {
            self.0.lock().push(paths.clone());
        }
    }

    fn assets() -> MemoryAssets {
        MemoryAssets::new()
            .with("fonts/fonts.conf", "<dir></dir><cachedir></cachedir>")
            .with("fonts/dejavu/a.ttf", vec![0u8, 1, 2, 3])
            .with("fonts/tizen/b.ttf", vec![9u8; 64])
    }

    fn provisioner(marker: CompletionMarker, registry: &RecordingRegistry) -> Provisioner {
        let config = BootstrapConfig {
            marker,
            ..BootstrapConfig::default()
        };
        Provisioner::new(config).with_registry(Box::new(registry.clone()))
    }

    #[test]
    fn second_call_only_republishes_paths() {
        let temp = tempdir().expect("tempdir");
        let registry = RecordingRegistry::default();
        let provisioner = provisioner(CompletionMarker::File, &registry);

        let first = provisioner.ensure_provisioned(&assets(), temp.path());
        assert_eq!(first, ProvisionOutcome::Provisioned { failures: 0 });

        let conf = temp.path().join("fonts").join("fonts.conf");
        fs::write(&conf, "edited").expect("edit");

        let second = provisioner.ensure_provisioned(&assets(), temp.path());
        assert_eq!(second, ProvisionOutcome::AlreadyProvisioned);
        assert_eq!(fs::read_to_string(&conf).expect("read"), "edited");

        let recorded = registry.0.lock();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0], recorded[1]);
        assert_eq!(recorded[0].file, conf);
    }

    #[test]
    fn empty_directory_counts_as_done_under_directory_marker() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("fonts")).expect("mkdir");
        let registry = RecordingRegistry::default();

        let outcome = provisioner(CompletionMarker::Directory, &registry)
            .ensure_provisioned(&assets(), temp.path());

        assert_eq!(outcome, ProvisionOutcome::AlreadyProvisioned);
        assert!(!temp.path().join("fonts/fonts.conf").exists());
        assert!(!temp.path().join("fonts/dejavu").exists());
        assert_eq!(registry.0.lock().len(), 1);
    }

    #[test]
    fn empty_directory_is_reprovisioned_under_file_marker() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("fonts")).expect("mkdir");
        let registry = RecordingRegistry::default();

        let outcome = provisioner(CompletionMarker::File, &registry)
            .ensure_provisioned(&assets(), temp.path());

        assert_eq!(outcome, ProvisionOutcome::Provisioned { failures: 0 });
        assert!(temp.path().join("fonts/fonts.conf").is_file());
        assert!(temp.path().join("fonts/tizen/b.ttf").is_file());
        assert!(temp.path().join("fonts").join(MARKER_FILE_NAME).is_file());
    }

    #[test]
    fn failed_step_leaves_no_marker() {
        let temp = tempdir().expect("tempdir");
        let fonts = temp.path().join("fonts");
        fs::create_dir(&fonts).expect("mkdir");
        // A plain file where the family directory should go.
        fs::write(fonts.join("dejavu"), b"").expect("blocker");
        let registry = RecordingRegistry::default();

        let outcome = provisioner(CompletionMarker::File, &registry)
            .ensure_provisioned(&assets(), temp.path());

        assert_eq!(outcome, ProvisionOutcome::Provisioned { failures: 1 });
        assert!(fonts.join("tizen/b.ttf").is_file());
        assert!(!fonts.join(MARKER_FILE_NAME).exists());
    }

    #[test]
    fn env_registry_exports_both_variables() {
        let paths = FontPaths::under(Path::new("/data/app"), "fonts");
        EnvRegistry.register(&paths);
        assert_eq!(
            std::env::var_os(FONTCONFIG_PATH_VAR).map(PathBuf::from),
            Some(PathBuf::from("/data/app/fonts"))
        );
        assert_eq!(
            std::env::var_os(FONTCONFIG_FILE_VAR).map(PathBuf::from),
            Some(PathBuf::from("/data/app/fonts/fonts.conf"))
        );
    }
}
