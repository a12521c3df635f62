pub mod resource_volume_v3;

pub use resource_volume_v3::VolumeV3;
