//! A partitioned disk and the bookkeeping of the roles its partitions play.

pub mod partitioner;

pub use self::partitioner::Partitioner;

use crate::storage::{
    DeviceMap, DeviceProvider, MappedDevice, ReleaseHandle, Resource, StorageError,
};
use disk_types::{PartitionFlag, PartitionKind, PartitionSize, PartitionTable};
use external::{fdasd_script, kpartx_add, partprobe, sgdisk_zap, SharedRunner};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

/// The value recorded for a partition id key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionId {
    /// A partition number on the disk.
    Number(u32),
    /// A value which is not a partition number, such as a RAID device.
    Synthetic(String),
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PartitionId::Number(id) => write!(f, "{}", id),
            PartitionId::Synthetic(ref value) => f.write_str(value),
        }
    }
}

/// Semantic id keys, such as `RootPart` or `BootPart`, and their values.
pub type PartitionIdMap = BTreeMap<String, PartitionId>;

/// A disk with a partition table written by one of the partitioners.
pub struct Disk {
    storage:          Box<dyn DeviceProvider>,
    partitioner:      Partitioner,
    partition_map:    BTreeMap<String, PathBuf>,
    partition_id_map: PartitionIdMap,
    partition_id:     BTreeMap<String, u32>,
}

impl Disk {
    pub fn new(table: PartitionTable, storage: Box<dyn DeviceProvider>) -> Self {
        let partitioner = Partitioner::new(table, &*storage);
        Disk {
            storage,
            partitioner,
            partition_map: BTreeMap::new(),
            partition_id_map: BTreeMap::new(),
            partition_id: BTreeMap::new(),
        }
    }

    /// The device the partition table is written to.
    pub fn storage_device(&self) -> &Path { self.storage.get_device() }

    pub fn is_loop(&self) -> bool { self.storage.is_loop() }

    pub fn table(&self) -> PartitionTable { self.partitioner.table() }

    pub fn runner(&self) -> &SharedRunner { self.storage.runner() }

    pub fn get_uuid(&self, device: &Path) -> Result<String, StorageError> {
        self.storage.get_uuid(device)
    }

    /// Destroys any partition table which may already be on the device.
    pub fn wipe(&mut self) -> Result<(), StorageError> {
        let device = self.storage.get_device();
        let runner = &**self.storage.runner();
        match self.table() {
            PartitionTable::Dasd => {
                info!("writing new VTOC to {}", device.display());
                if let Err(why) = fdasd_script(runner, device, "y\n\nw\nq\n") {
                    debug!("fdasd reported an error while wiping {}: {}", device.display(), why);
                }
                Ok(())
            }
            _ => sgdisk_zap(runner, device)
                .map_err(|why| StorageError::Wipe { device: device.to_path_buf(), why }),
        }
    }

    pub fn create_root_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.lxroot", size, PartitionKind::Linux, &[])?;
        self.add_to_map("root");
        self.add_to_id_map("RootPart", None);
        self.seed_boot_id();
        Ok(())
    }

    pub fn create_root_lvm_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.lxlvm", size, PartitionKind::Lvm, &[])?;
        self.add_to_map("root");
        self.add_to_id_map("RootPart", None);
        self.add_to_id_map("RootPartVol", Some("LVRoot"));
        self.seed_boot_id();
        Ok(())
    }

    pub fn create_root_raid_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.lxraid", size, PartitionKind::Raid, &[])?;
        self.add_to_map("root");
        self.add_to_id_map("RootPart", None);
        self.add_to_id_map("RaidPart", None);
        self.add_to_id_map("RaidDev", Some("/dev/md0"));
        self.seed_boot_id();
        Ok(())
    }

    pub fn create_boot_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.lxboot", size, PartitionKind::Linux, &[])?;
        self.add_to_map("boot");
        self.add_to_id_map("BootPart", None);
        Ok(())
    }

    pub fn create_prep_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.prep", size, PartitionKind::Prep, &[])?;
        self.add_to_map("prep");
        self.add_to_id_map("PrepPart", None);
        Ok(())
    }

    pub fn create_efi_csm_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.legacy", size, PartitionKind::Csm, &[])?;
        self.add_to_map("efi_csm");
        self.add_to_id_map("BiosGrub", None);
        Ok(())
    }

    pub fn create_efi_partition(&mut self, size: PartitionSize) -> Result<(), StorageError> {
        self.partitioner.create("p.UEFI", size, PartitionKind::Efi, &[])?;
        self.add_to_map("efi");
        self.add_to_id_map("JumpPart", None);
        Ok(())
    }

    /// Marks the PReP, boot or root partition active, in that order of preference.
    pub fn activate_boot_partition(&mut self) -> Result<(), StorageError> {
        let id = ["prep", "boot", "root"]
            .iter()
            .filter_map(|role| self.partition_id.get(*role))
            .next()
            .cloned();

        match id {
            Some(id) => {
                self.partitioner.set_flag(id, PartitionFlag::Active)?;
                let device = self.storage.get_device();
                partprobe(&**self.storage.runner(), device)
                    .map_err(|why| StorageError::PartitionMap { device: device.into(), why })
            }
            None => Ok(()),
        }
    }

    /// Mirrors the leading GPT partitions into a hybrid MBR.
    pub fn create_hybrid_mbr(&mut self) -> Result<(), StorageError> {
        self.partitioner.set_hybrid_mbr()
    }

    /// Turns the GPT into an MBR.
    pub fn create_mbr(&mut self) -> Result<(), StorageError> { self.partitioner.set_mbr() }

    /// Grows the partition table after the backing device was enlarged.
    pub fn resize_table(&mut self, entries: Option<u32>) -> Result<(), StorageError> {
        self.partitioner.resize_table(entries)
    }

    /// Makes the partition device nodes appear.
    ///
    /// Loop devices get device maps, which must be removed again through the
    /// returned handle. Other devices only have their table re-read.
    pub fn map_partitions(&mut self) -> Result<Option<ReleaseHandle>, StorageError> {
        let device = self.storage.get_device();
        let runner = self.storage.runner();
        let map_error = |why| StorageError::PartitionMap { device: device.into(), why };

        if self.storage.is_loop() {
            kpartx_add(&**runner, device).map_err(map_error)?;
            let resource = Resource::PartitionMaps { device: device.into() };
            Ok(Some(ReleaseHandle::new(resource, runner.clone())))
        } else {
            partprobe(&**runner, device).map_err(map_error)?;
            Ok(None)
        }
    }

    /// A provider for every partition role created so far.
    pub fn get_device(&self) -> DeviceMap {
        self.partition_map
            .iter()
            .map(|(role, node)| (role.clone(), MappedDevice::new(node.as_path(), &*self.storage)))
            .collect()
    }

    pub fn get_partition_id_map(&self) -> &PartitionIdMap { &self.partition_id_map }

    /// Partition numbers by role.
    pub fn get_partition_ids(&self) -> &BTreeMap<String, u32> { &self.partition_id }

    fn seed_boot_id(&mut self) {
        if !self.partition_id_map.contains_key("BootPart") {
            self.add_to_id_map("BootPart", None);
        }
    }

    fn add_to_id_map(&mut self, name: &str, value: Option<&str>) {
        let value = match value {
            Some(value) => PartitionId::Synthetic(value.into()),
            None => PartitionId::Number(self.partitioner.get_id()),
        };

        self.partition_id_map.insert(name.into(), value);
    }

    fn add_to_map(&mut self, role: &str) {
        let id = self.partitioner.get_id();
        let node = partition_node(self.storage.get_device(), self.storage.is_loop(), id);
        self.partition_map.insert(role.into(), node);
        self.partition_id.insert(role.into(), id);
    }
}

/// The device node of partition `id` on `device`.
pub fn partition_node(device: &Path, is_loop: bool, id: u32) -> PathBuf {
    if is_loop {
        let base = device.file_name().map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        return PathBuf::from(format!("/dev/mapper/{}p{}", base, id));
    }

    let device = device.to_string_lossy();
    if device.ends_with(|c: char| c.is_ascii_digit()) {
        PathBuf::from(format!("{}p{}", device, id))
    } else {
        PathBuf::from(format!("{}{}", device, id))
    }
}
