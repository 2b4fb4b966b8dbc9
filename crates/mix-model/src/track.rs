//! Input tracks and their on-disk names.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where a track's audio bytes come from.
#[derive(Debug, Clone)]
pub enum TrackSource {
    /// Bytes already held in memory (e.g. an uploaded form field).
    Bytes(Vec<u8>),
    /// A file on the local filesystem, copied into the workspace as-is.
    File(PathBuf),
}

/// One audio track of a mix request.
///
/// Tracks are immutable once constructed; the name is only used to derive
/// the persisted file name and never influences the mix itself.
#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    source: TrackSource,
}

impl Track {
    /// Track backed by in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: TrackSource::Bytes(bytes.into()),
        }
    }

    /// Track backed by a local file. The display name is the file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: TrackSource::File(path.to_path_buf()),
        }
    }

    /// Display name as supplied by the caller.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    /// Consume the track, yielding its source.
    pub fn into_source(self) -> TrackSource {
        self.source
    }

    /// Display name with every character outside `[A-Za-z0-9.-]` replaced by `_`.
    pub fn sanitized_name(&self) -> String {
        sanitize_file_name(&self.name)
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Assign a distinct workspace file name to every track, in track order.
///
/// The sanitized display name is used when it is usable. Names that are
/// empty, `.`/`..`, equal to `reserved`, or already taken by an earlier
/// track get a `<position>-` prefix, falling back to `track-<position>`.
pub fn assign_file_names(tracks: &[Track], reserved: &str) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    taken.insert(reserved.to_string());

    let mut names = Vec::with_capacity(tracks.len());
    for (index, track) in tracks.iter().enumerate() {
        let sanitized = track.sanitized_name();
        let usable = !sanitized.is_empty() && sanitized != "." && sanitized != "..";

        let mut candidate = if usable {
            sanitized.clone()
        } else {
            format!("track-{index}")
        };

        if taken.contains(&candidate) {
            candidate = if usable {
                format!("{index}-{sanitized}")
            } else {
                format!("track-{index}")
            };
        }

        // Prefixed names can still collide with a caller-chosen name.
        let mut suffix = 1;
        let base = candidate.clone();
        while taken.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }

        taken.insert(candidate.clone());
        names.push(candidate);
    }

    names
}
