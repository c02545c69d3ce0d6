//! Picks the logo file that represents a packaged app's window.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::candidates;
use crate::core::WindowId;
use crate::manifest::ManifestReader;
use crate::ranking::{self, DisplayContext};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },
    #[error("asset {asset}: {qualifier} value {value:?} is not a number")]
    InvalidNumber {
        qualifier: &'static str,
        value: String,
        asset: String,
    },
    #[error("package query failed: {0}")]
    Package(String),
}

impl ResolveError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Finds the install folder of the package that owns a window.
pub trait PackageLocator {
    /// `Ok(None)` when the window does not belong to a packaged app.
    fn package_root(&self, window: WindowId) -> Result<Option<PathBuf>, ResolveError>;
}

/// Supplies the display conditions a resolution is ranked against.
pub trait DisplayProbe {
    fn snapshot(&self) -> DisplayContext;
}

pub struct AssetResolver<L, M> {
    locator: L,
    manifest: M,
}

impl<L: PackageLocator, M: ManifestReader> AssetResolver<L, M> {
    pub fn new(locator: L, manifest: M) -> Self {
        Self { locator, manifest }
    }

    pub fn resolve(
        &self,
        window: WindowId,
        ctx: &DisplayContext,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let Some(root) = self.locator.package_root(window)? else {
            return Ok(None);
        };
        let Some(logo) = self.manifest.logo_asset(&root)? else {
            tracing::debug!(package=?root, "manifest declares no logo");
            return Ok(None);
        };
        resolve_in_package(&root, &logo, ctx)
    }
}

/// Enumerates the variants of `logo` under `package_root` and returns the
/// best one, or `None` when no variant exists on disk.
pub fn resolve_in_package(
    package_root: &Path,
    logo: &str,
    ctx: &DisplayContext,
) -> Result<Option<PathBuf>, ResolveError> {
    let found = candidates::enumerate(package_root, logo)?;
    if found.is_empty() {
        tracing::debug!(package=?package_root, logo=%logo, "no logo variants on disk");
        return Ok(None);
    }
    let best = ranking::best(&found, ctx).map(|c| c.path.clone());
    tracing::debug!(count = found.len(), winner=?best, "resolved package logo");
    Ok(best)
}
