//! Request-scoped temporary directories.
//!
//! Every mix request gets its own `<prefix><uuid>` directory holding the
//! persisted tracks and the rendered output. The directory is removed by
//! [`Workspace::release`] on every pipeline exit path; dropping an
//! unreleased workspace removes it as a backstop.

use std::path::{Path, PathBuf};

use automix_common::error::{AutomixError, AutomixResult};
use automix_mix_model::{assign_file_names, Track, TrackSource};
use tokio::task::JoinSet;

/// File name of the rendered mix inside a workspace.
pub const OUTPUT_FILE_NAME: &str = "output.mp3";

/// Creates workspaces under a common root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    prefix: String,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named workspace directory.
    pub async fn acquire(&self) -> AutomixResult<Workspace> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AutomixError::io(format!("creating {}", self.root.display()), e))?;

        let dir = self
            .root
            .join(format!("{}{}", self.prefix, uuid::Uuid::new_v4()));

        // create_dir, not create_dir_all: an existing directory is never reused.
        tokio::fs::create_dir(&dir)
            .await
            .map_err(|e| AutomixError::io(format!("creating workspace {}", dir.display()), e))?;

        tracing::debug!(workspace = %dir.display(), "Workspace acquired");
        Ok(Workspace {
            dir,
            released: false,
        })
    }
}

/// An exclusively owned request directory.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path of the rendered mix.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUT_FILE_NAME)
    }

    /// Copy every track into the workspace, one task per track.
    ///
    /// Returns the persisted paths in track order. All writes finish before
    /// this returns, even when one of them fails.
    pub async fn persist_tracks(&self, tracks: Vec<Track>) -> AutomixResult<Vec<PathBuf>> {
        let names = assign_file_names(&tracks, OUTPUT_FILE_NAME);
        let count = tracks.len();

        let mut tasks = JoinSet::new();
        for (index, (track, name)) in tracks.into_iter().zip(names).enumerate() {
            let dest = self.dir.join(name);
            tasks.spawn(async move { (index, persist_source(track.into_source(), dest).await) });
        }

        let mut results: Vec<Option<AutomixResult<PathBuf>>> = (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => {
                    return Err(AutomixError::Other(anyhow::anyhow!(
                        "track persistence task failed: {err}"
                    )))
                }
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    Err(AutomixError::Other(anyhow::anyhow!(
                        "track {index} was never persisted"
                    )))
                })
            })
            .collect()
    }

    /// Remove the directory and everything in it.
    ///
    /// Never fails: removal errors are logged so they cannot mask the
    /// outcome of the request.
    pub async fn release(mut self) {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => tracing::debug!(workspace = %self.dir.display(), "Workspace released"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(workspace = %self.dir.display(), "Workspace already gone");
            }
            Err(err) => tracing::warn!(
                workspace = %self.dir.display(),
                error = %err,
                "Failed to remove workspace"
            ),
        }
        self.released = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(workspace = %self.dir.display(), "Workspace dropped without release");
        if let Err(err) = std::fs::remove_dir_all(&self.dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    workspace = %self.dir.display(),
                    error = %err,
                    "Failed to remove workspace on drop"
                );
            }
        }
    }
}

async fn persist_source(source: TrackSource, dest: PathBuf) -> AutomixResult<PathBuf> {
    let result = match source {
        TrackSource::Bytes(bytes) => tokio::fs::write(&dest, bytes).await,
        TrackSource::File(path) => tokio::fs::copy(&path, &dest).await.map(|_| ()),
    };
    result.map_err(|e| AutomixError::io(format!("persisting {}", dest.display()), e))?;
    Ok(dest)
}
