//! Scratch copies of the AtChem2 template, one per segment.

use crate::error::{SimError, SimResult};
use cf_config::ModelPaths;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A private copy of the template plus the mechanism file.
///
/// The directory is removed when the workspace is dropped, on success and on
/// every error path.
pub struct SegmentWorkspace {
    dir: TempDir,
    mechanism: PathBuf,
}

impl SegmentWorkspace {
    pub fn create(template: &Path, mechanism: &Path, label: &str) -> SimResult<Self> {
        if !template.is_dir() {
            return Err(SimError::MissingTemplate {
                path: template.to_path_buf(),
            });
        }
        let dir = tempfile::Builder::new()
            .prefix(&format!("atchem2_{label}_"))
            .tempdir()?;
        copy_dir_all(template, dir.path())?;

        let file_name = mechanism.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("mechanism path has no file name: {}", mechanism.display()),
            )
        })?;
        let model_dir = ModelPaths::new(dir.path()).model_dir();
        fs::create_dir_all(&model_dir)?;
        let copied = model_dir.join(file_name);
        fs::copy(mechanism, &copied)?;
        tracing::debug!(workspace = %dir.path().display(), "created segment workspace");

        Ok(Self {
            dir,
            mechanism: copied,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> ModelPaths {
        ModelPaths::new(self.dir.path())
    }

    /// Mechanism file inside the workspace.
    pub fn mechanism(&self) -> &Path {
        &self.mechanism
    }
}

/// Copy a directory tree. Symlinks are resolved and their targets copied, so the
/// workspace stays valid when the template links to relative paths outside itself.
/// Dangling links are recreated as-is on unix and skipped elsewhere.
fn copy_dir_all(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(from) else {
            continue;
        };
        let target = to.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            match fs::canonicalize(path) {
                Ok(real) if real.is_dir() => copy_dir_all(&real, &target)?,
                Ok(real) => {
                    fs::copy(real, &target)?;
                }
                Err(_) => {
                    #[cfg(unix)]
                    std::os::unix::fs::symlink(fs::read_link(path)?, &target)?;
                    tracing::debug!(link = %path.display(), "dangling symlink in template");
                }
            }
        } else {
            // fs::copy keeps permission bits, so scripts stay executable
            fs::copy(path, &target)?;
        }
    }
    Ok(())
}
