//! Output tree layout and destructive refresh.
//!
//! [`OutputTree`] is the single authority on where artifacts and images
//! live and how diagrams cross-link. Jobs never assemble paths or `href`
//! values themselves, so the layout can only be wrong in one place.
//!
//! The tree is `images_<run_name>/` under the caller's output root, with
//! `commodities/`, `processes/`, and `results/` beneath it. [`prepare`]
//! deletes any previous tree before recreating it; a refreshed run never
//! mixes with stale artifacts.
//!
//! [`prepare`]: OutputTree::prepare

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tracing::info;

use crate::config::ImageFormat;
use crate::scope::{Category, ScopeKey};

/// Errors while refreshing the output tree.
#[derive(Debug, Error, Diagnostic)]
pub enum OutdirError {
    #[error("failed to remove stale output tree at {path}")]
    #[diagnostic(
        code(fluxdot::outdir::remove),
        help("Check permissions and that no other process holds files under the tree.")
    )]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output directory {path}")]
    #[diagnostic(code(fluxdot::outdir::create))]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The on-disk layout of one run's diagrams.
#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
    image_format: ImageFormat,
}

impl OutputTree {
    /// Lay out a tree named `images_<run_name>` under `output_root`.
    #[must_use]
    pub fn new(output_root: &Path, run_name: &str, image_format: ImageFormat) -> Self {
        Self {
            root: output_root.join(format!("images_{run_name}")),
            image_format,
        }
    }

    /// Derive a run name from a dataset path: the file stem, so
    /// `data/utopia.dat` becomes `utopia`.
    #[must_use]
    pub fn run_name_from_dataset(dataset: &Path) -> String {
        dataset
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_owned())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    /// Destructively refresh the tree: remove any existing content, then
    /// create the root and every category subdirectory.
    ///
    /// Idempotent; calling it twice leaves the same empty tree.
    pub fn prepare(&self) -> Result<(), OutdirError> {
        if self.root.exists() {
            info!(root = %self.root.display(), "removing stale output tree");
            fs::remove_dir_all(&self.root).map_err(|source| OutdirError::Remove {
                path: self.root.clone(),
                source,
            })?;
        }
        for category in [
            Category::Root,
            Category::Commodities,
            Category::Processes,
            Category::Results,
        ] {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir).map_err(|source| OutdirError::Create {
                path: dir.clone(),
                source,
            })?;
        }
        info!(root = %self.root.display(), "output tree ready");
        Ok(())
    }

    /// Absolute directory for a category.
    #[must_use]
    pub fn category_dir(&self, category: Category) -> PathBuf {
        match category.dir_name() {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Absolute path of the `.dot` artifact for a scope.
    #[must_use]
    pub fn artifact_path(&self, scope: &ScopeKey) -> PathBuf {
        self.category_dir(scope.category())
            .join(format!("{}.dot", scope.file_stem()))
    }

    /// Absolute path of the rendered image for a scope.
    #[must_use]
    pub fn image_path(&self, scope: &ScopeKey) -> PathBuf {
        self.category_dir(scope.category()).join(format!(
            "{}.{}",
            scope.file_stem(),
            self.image_format.extension()
        ))
    }

    /// Relative `href` from the diagram at `from` to the image of `to`.
    ///
    /// Hrefs are embedded in rendered images, so they are relative to the
    /// directory the `from` image lives in.
    #[must_use]
    pub fn href(&self, from: &ScopeKey, to: &ScopeKey) -> String {
        let file = format!("{}.{}", to.file_stem(), self.image_format.extension());
        match (from.category().dir_name(), to.category().dir_name()) {
            (from_dir, to_dir) if from_dir == to_dir => file,
            (None, Some(to_dir)) => format!("{to_dir}/{file}"),
            (Some(_), None) => format!("../{file}"),
            (Some(_), Some(to_dir)) => format!("../{to_dir}/{file}"),
            (None, None) => file,
        }
    }
}
