use super::{DeviceProvider, MappedDevice, ReleaseHandle, Resource, StorageError};
use external::{mdadm_create_degraded, mdadm_detail};
use std::path::{Path, PathBuf};

/// Wraps a block device into a degraded two-member software RAID array.
///
/// The array is created with a single real member; the second member is
/// expected to be added on the deployed system.
pub struct RaidDevice {
    storage:     MappedDevice,
    raid_device: Option<PathBuf>,
}

impl RaidDevice {
    pub fn new(storage: MappedDevice) -> Self { Self { storage, raid_device: None } }

    /// Assembles the degraded array on the wrapped device.
    pub fn create_degraded_raid(&mut self, raid_level: &str) -> Result<ReleaseHandle, StorageError> {
        let level = raid_level_number(raid_level)
            .ok_or_else(|| StorageError::RaidUnsupportedLevel { level: raid_level.into() })?;

        let runner = self.storage.runner().clone();
        let array = (0..9)
            .map(|id| PathBuf::from(format!("/dev/md{}", id)))
            .find(|array| !runner.exists(array))
            .ok_or(StorageError::RaidNoFreeDevice)?;

        info!("creating degraded RAID {} on {}", array.display(), self.storage.get_device().display());
        mdadm_create_degraded(&*runner, &array, level, self.storage.get_device()).map_err(
            |why| StorageError::RaidCreate { device: self.storage.get_device().into(), why },
        )?;

        self.raid_device = Some(array.clone());
        Ok(ReleaseHandle::new(Resource::Raid { array }, runner))
    }

    /// The assembled array, once `create_degraded_raid` succeeded.
    pub fn get_device(&self) -> Option<MappedDevice> {
        self.raid_device.as_ref().map(|array| MappedDevice::new(array.as_path(), &self.storage))
    }

    /// Writes the running array configuration to `path`, in mdadm.conf syntax.
    pub fn create_raid_config(&self, path: &Path) -> Result<(), StorageError> {
        let array = match self.raid_device {
            Some(ref array) => array,
            None => return Ok(()),
        };

        let runner = self.storage.runner();
        mdadm_detail(&**runner, array)
            .and_then(|config| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                misc::write(path, config)
            })
            .map_err(|why| StorageError::RaidConfig { path: path.into(), why })
    }
}

pub(crate) fn raid_level_number(level: &str) -> Option<u8> {
    match level {
        "mirroring" => Some(1),
        "striping" => Some(0),
        _ => None,
    }
}
