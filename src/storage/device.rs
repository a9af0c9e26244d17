use super::StorageError;
use external::{blkid_uuid, blockdev_size, SharedRunner};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

/// Anything that can hand out a block device.
pub trait DeviceProvider {
    /// The block device provided.
    fn get_device(&self) -> &Path;

    /// Whether the device is ultimately backed by a loop device.
    fn is_loop(&self) -> bool { false }

    /// Runner through which every query and command is issued.
    fn runner(&self) -> &SharedRunner;

    /// The file system UUID of `device`.
    fn get_uuid(&self, device: &Path) -> Result<String, StorageError> {
        blkid_uuid(&**self.runner(), device)
            .map_err(|why| StorageError::Query { device: device.to_path_buf(), why })
    }

    /// The size of `device`, in bytes.
    fn get_byte_size(&self, device: &Path) -> Result<u64, StorageError> {
        blockdev_size(&**self.runner(), device)
            .map_err(|why| StorageError::Query { device: device.to_path_buf(), why })
    }
}

/// A device node which was derived from another provider, such as a partition
/// of a disk or an opened LUKS container.
#[derive(Clone)]
pub struct MappedDevice {
    device:  PathBuf,
    is_loop: bool,
    runner:  SharedRunner,
}

impl MappedDevice {
    /// Creates a device node belonging to `provider`.
    pub fn new<P: Into<PathBuf>>(device: P, provider: &dyn DeviceProvider) -> Self {
        Self { device: device.into(), is_loop: provider.is_loop(), runner: provider.runner().clone() }
    }
}

impl DeviceProvider for MappedDevice {
    fn get_device(&self) -> &Path { &self.device }

    fn is_loop(&self) -> bool { self.is_loop }

    fn runner(&self) -> &SharedRunner { &self.runner }
}

impl fmt::Debug for MappedDevice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MappedDevice")
            .field("device", &self.device)
            .field("is_loop", &self.is_loop)
            .finish()
    }
}

/// Block devices keyed by the role they play on the disk: `root`, `boot`,
/// `efi`, `efi_csm` or `prep`.
pub type DeviceMap = BTreeMap<String, MappedDevice>;
