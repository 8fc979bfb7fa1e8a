use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// What counts as proof that an earlier launch already provisioned fonts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMarker {
    #[default]
    File,
    Directory,
}

impl FromStr for CompletionMarker {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "directory" | "dir" => Ok(Self::Directory),
            other => Err(ConfigError::UnknownMarker(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub fonts_subdir: String,
    /// Container directory holding one sub-directory per font family.
    pub font_asset_dir: String,
    pub template_asset: String,
    pub font_families: Vec<String>,
    pub marker: CompletionMarker,
    pub hide_chrome: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            fonts_subdir: "fonts".into(),
            font_asset_dir: "fonts".into(),
            template_asset: "fonts/fonts.conf".into(),
            font_families: vec!["dejavu".into(), "tizen".into()],
            marker: CompletionMarker::default(),
            hide_chrome: true,
        }
    }
}

impl BootstrapConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded bootstrap config");
        Ok(config)
    }

    pub(crate) fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(families) = lookup("GLUE_FONT_FAMILIES") {
            let families: Vec<String> = families
                .split(',')
                .map(str::trim)
                .filter(|family| !family.is_empty())
                .map(str::to_string)
                .collect();
            if families.is_empty() {
                warn!("GLUE_FONT_FAMILIES is empty, keeping defaults");
            } else {
                self.font_families = families;
            }
        }
        if let Some(template) = lookup("GLUE_TEMPLATE_ASSET") {
            let template = template.trim();
            if !template.is_empty() {
                self.template_asset = template.to_string();
            }
        }
        if let Some(marker) = lookup("GLUE_COMPLETION_MARKER") {
            self.marker = marker.parse()?;
        }
        if let Some(flag) = lookup("GLUE_HIDE_CHROME") {
            self.hide_chrome = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        Ok(())
    }
}
