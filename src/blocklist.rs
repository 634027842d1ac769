//! Blocklist loading.
//!
//! The blocklist is a plain text file, one package name per line. It is
//! re-read every coordinator cycle so edits take effect without a restart.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, WardenError};

/// The set of package names subject to tracking
#[derive(Debug)]
pub struct Blocklist {
    path: PathBuf,
    packages: HashSet<String>,
}

impl Blocklist {
    /// Read the blocklist at startup. An unreadable file is a fatal
    /// configuration error here, unlike in [`Blocklist::reload`].
    pub fn load(path: &Path) -> Result<Self> {
        let packages = read_packages(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            packages,
        })
    }

    /// Re-read the blocklist. On failure the previous list is kept, so a
    /// transient read error mid-run never empties the list.
    pub fn reload(&mut self) {
        match read_packages(&self.path) {
            Ok(packages) => self.packages = packages,
            Err(e) => warn!("blocklist reload failed, keeping previous list: {}", e),
        }
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn read_packages(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| WardenError::BlocklistRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
