use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::ArtifactWriter;
use crate::errors::GenerationError;

/// Writes artifacts below an output root, replacing files atomically.
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    root: PathBuf,
}

impl FsArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactWriter for FsArtifactWriter {
    fn write(&mut self, path: &str, content: &str) -> Result<u64, GenerationError> {
        if path.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty artifact path").into());
        }
        if !stays_below_root(Path::new(path)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("artifact path {path} escapes the output root"),
            )
            .into());
        }
        let target = self.root.join(path);
        write_bytes_atomic(&target, content.as_bytes())?;
        debug!(path = %target.display(), bytes = content.len(), "artifact written");
        Ok(content.len() as u64)
    }
}

/// Only plain relative paths are accepted; `..`, roots and prefixes are not.
fn stays_below_root(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = parent {
        sync_dir(parent)?;
    }

    Ok(())
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid artifact path {}", path.display()),
        )
    })?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}
