//! Config and media directory layout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::runtime::EnvironmentData;

/// Per-service directories under `<root>/config`.
pub const CONFIG_DIRECTORIES: [&str; 7] = [
    "qbittorrent",
    "prowlarr",
    "sonarr",
    "radarr",
    "bazarr",
    "cross-seed",
    "recyclarr",
];

/// Directories under `MEDIA_DIR`.
pub const MEDIA_DIRECTORIES: [&str; 5] = [
    "downloads/incomplete",
    "downloads/completed",
    "downloads/cross-seeds",
    "tv",
    "movies",
];

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("MEDIA_DIR is not set; cannot create media directories.")]
    MissingMediaDir,

    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Directories that were missing. In dry-run they are reported, not created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub created: Vec<PathBuf>,
    pub dry_run: bool,
}

fn ensure_dirs<'a>(
    base: &Path,
    relative: impl IntoIterator<Item = &'a str>,
    dry_run: bool,
    created: &mut Vec<PathBuf>,
) -> Result<(), LayoutError> {
    for rel in relative {
        let path = base.join(rel);
        if path.exists() {
            continue;
        }
        info!("{}Creating directory {}", if dry_run { "[dry-run] " } else { "" }, path.display());
        if !dry_run {
            fs::create_dir_all(&path).map_err(|source| LayoutError::Io {
                path: path.clone(),
                source,
            })?;
        }
        created.push(path);
    }
    Ok(())
}

/// Create the config directories under `root_dir` and the media tree under
/// `MEDIA_DIR`. Existing directories are left alone.
pub fn ensure_layout(root_dir: &Path, env: &EnvironmentData, dry_run: bool) -> Result<LayoutReport, LayoutError> {
    let media_dir = env.get("MEDIA_DIR").ok_or(LayoutError::MissingMediaDir)?;

    let mut created = Vec::new();
    ensure_dirs(&root_dir.join("config"), CONFIG_DIRECTORIES, dry_run, &mut created)?;
    ensure_dirs(Path::new(media_dir), MEDIA_DIRECTORIES, dry_run, &mut created)?;
    debug!("Layout: {} directories missing", created.len());

    Ok(LayoutReport { created, dry_run })
}
