use super::types::Facing;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Owned handle to a captured photo on local storage.
///
/// The temporary file is deleted when the handle is dropped. Sessions share it
/// with an in-flight upload through an `Arc`, so the file lives until the last
/// holder lets go.
#[derive(Debug)]
pub struct PhotoHandle {
    id: Uuid,
    path: PathBuf,
    facing: Facing,
    captured_at: DateTime<Utc>,
}

impl PhotoHandle {
    pub fn new(path: PathBuf, facing: Facing) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            facing,
            captured_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl Drop for PhotoHandle {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released photo {} ({:?})", self.id, self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("Photo file {:?} already gone", self.path)
            }
            Err(e) => warn!("Failed to delete photo file {:?}: {}", self.path, e),
        }
    }
}
