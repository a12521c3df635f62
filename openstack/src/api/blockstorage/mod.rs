//! Block storage (Cinder) v3 API

pub mod snapshots;
pub mod volumes;

pub use snapshots::{Snapshot, SnapshotListFilter, SnapshotsApi};
pub use volumes::{CreateVolumeRequest, UpdateVolumeRequest, Volume, VolumesApi};

use super::ServiceClient;

impl ServiceClient {
    /// Volume operations
    pub fn volumes(&self) -> VolumesApi<'_> {
        VolumesApi::new(self)
    }

    /// Snapshot operations
    pub fn snapshots(&self) -> SnapshotsApi<'_> {
        SnapshotsApi::new(self)
    }
}
