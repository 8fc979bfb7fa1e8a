use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::AssetError;

/// A read-only, path-addressed bundle of files shipped with the application.
///
/// Paths are `/`-separated and relative to the container's implicit root.
pub trait AssetSource {
    fn open(&self, path: &str) -> Option<Asset<'_>>;

    /// File names directly under `dir`, in whatever order the container
    /// reports them. A missing directory lists as empty.
    fn list_dir(&self, dir: &str) -> Vec<String>;
}

pub struct Asset<'a> {
    path: String,
    length: usize,
    reader: Box<dyn Read + 'a>,
}

impl<'a> Asset<'a> {
    pub fn new(path: impl Into<String>, length: usize, reader: impl Read + 'a) -> Self {
        Self {
            path: path.into(),
            length,
            reader: Box::new(reader),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// A short read is an error so callers never write a partial file.
    pub fn read_all(self) -> Result<Vec<u8>, AssetError> {
        let Asset {
            path,
            length,
            reader,
        } = self;
        let mut buffer = Vec::with_capacity(length);
        reader
            .take(length as u64)
            .read_to_end(&mut buffer)
            .map_err(|source| AssetError::Read {
                asset: path.clone(),
                source,
            })?;
        if buffer.len() != length {
            return Err(AssetError::Truncated {
                asset: path,
                declared: length,
                actual: buffer.len(),
            });
        }
        Ok(buffer)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    pub failed: usize,
}

/// Copies one entry to `dest`, replacing any previous file.
///
/// Returns `Ok(false)` when the entry does not exist; sparse containers are
/// allowed.
pub fn copy_asset<A>(assets: &A, source: &str, dest: &Path) -> Result<bool, AssetError>
where
    A: AssetSource + ?Sized,
{
    let Some(asset) = assets.open(source) else {
        debug!(asset = source, "asset not present, skipping");
        return Ok(false);
    };
    let buffer = asset.read_all()?;
    fs::write(dest, &buffer).map_err(|source| AssetError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    debug!(asset = source, dest = %dest.display(), bytes = buffer.len(), "asset copied");
    Ok(true)
}

/// Only a failure to create `dest_dir` aborts the pass; entries that fail
/// are logged and counted.
pub fn copy_directory<A>(
    assets: &A,
    source_dir: &str,
    dest_dir: &Path,
) -> Result<CopyReport, AssetError>
where
    A: AssetSource + ?Sized,
{
    fs::create_dir_all(dest_dir).map_err(|source| AssetError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let mut report = CopyReport::default();
    for name in assets.list_dir(source_dir) {
        let source = join_asset_path(source_dir, &name);
        match copy_asset(assets, &source, &dest_dir.join(&name)) {
            Ok(true) => report.copied += 1,
            Ok(false) => {}
            Err(err) => {
                warn!(asset = %source, %err, "failed to copy asset");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

pub(crate) fn join_asset_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl AssetSource for DirAssets {
    fn open(&self, path: &str) -> Option<Asset<'_>> {
        let full = self.resolve(path)?;
        let file = File::open(&full).ok()?;
        let metadata = file.metadata().ok()?;
        if !metadata.is_file() {
            return None;
        }
        Some(Asset::new(path, metadata.len() as usize, file))
    }

    fn list_dir(&self, dir: &str) -> Vec<String> {
        let Some(full) = self.resolve(dir) else {
            return Vec::new();
        };
        WalkDir::new(full)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), contents.into());
    }

    pub fn with(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, path: &str) -> Option<Asset<'_>> {
        let contents = self.entries.get(path)?;
        Some(Asset::new(path, contents.len(), Cursor::new(contents.as_slice())))
    }

    fn list_dir(&self, dir: &str) -> Vec<String> {
        let prefix = join_asset_path(dir, "");
        self.entries
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }
}
