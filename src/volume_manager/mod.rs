//! Volume managers: an alternative to a single plain file system on the root
//! device, creating named volumes or subvolumes instead.

mod btrfs;
mod lvm;

pub use self::{btrfs::BtrfsVolumeManager, lvm::LvmVolumeManager};

use crate::{
    filesystem::create_dir_all,
    fstab::FstabEntry,
    storage::{DeviceMap, MappedDevice, ReleaseStack, StorageError},
    usage::{directory_size, mebibytes},
};
use disk_types::FileSystem as FileSystemType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The name of the volume which holds the root of the system.
pub const ROOT_VOLUME: &str = "LVRoot";

/// How much space a volume gets.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSize {
    /// A fixed size in MB.
    Size(u64),
    /// The MB the source tree below the volume path uses, plus these MB.
    Freespace(u64),
    /// Whatever is left of the device.
    AllFree,
}

impl Default for VolumeSize {
    fn default() -> Self { VolumeSize::Freespace(30) }
}

/// A requested volume, mounted at `realpath` of the system.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Volume {
    pub name:     String,
    #[serde(default)]
    pub realpath: String,
    #[serde(default)]
    pub size:     VolumeSize,
}

impl Volume {
    fn is_root(&self) -> bool { self.name == ROOT_VOLUME }
}

/// Volumes ordered by mount hierarchy, with the full size volume kept apart.
#[derive(Debug, PartialEq)]
pub struct CanonicalVolumes {
    pub volumes:          Vec<Volume>,
    pub full_size_volume: Option<Volume>,
}

/// Orders the volumes so that parents precede their children and singles out
/// the volume taking all remaining space. A root volume is added when missing.
pub fn canonical_volume_list(volumes: &[Volume]) -> CanonicalVolumes {
    let mut volumes = volumes.to_vec();
    if !volumes.iter().any(Volume::is_root) {
        let size = if volumes.iter().any(|v| v.size == VolumeSize::AllFree) {
            VolumeSize::default()
        } else {
            VolumeSize::AllFree
        };

        volumes.push(Volume { name: ROOT_VOLUME.into(), realpath: "/".into(), size });
    }

    let full_size_volume = volumes
        .iter()
        .position(|v| v.size == VolumeSize::AllFree)
        .map(|pos| volumes.remove(pos));

    volumes.sort_by(|a, b| {
        let depth = |v: &Volume| {
            if v.is_root() {
                0
            } else {
                v.realpath.trim_matches('/').split('/').count()
            }
        };
        depth(a).cmp(&depth(b)).then_with(|| a.realpath.cmp(&b.realpath))
    });

    CanonicalVolumes { volumes, full_size_volume }
}

/// The size in MB a volume needs for the given source tree.
pub fn volume_mbsize(volume: &Volume, root_dir: &Path, all: &[Volume]) -> u64 {
    match volume.size {
        VolumeSize::Size(mbytes) => mbytes,
        VolumeSize::AllFree => 0,
        VolumeSize::Freespace(mbytes) => {
            let used = if volume.is_root() {
                let others = all
                    .iter()
                    .filter(|v| !v.is_root())
                    .map(|v| volume_path(root_dir, &v.realpath))
                    .collect::<Vec<PathBuf>>();
                directory_size(root_dir, &others)
            } else {
                directory_size(&volume_path(root_dir, &volume.realpath), &[])
            };

            mebibytes(used) + mbytes
        }
    }
}

fn volume_path(root: &Path, realpath: &str) -> PathBuf { root.join(realpath.trim_start_matches('/')) }

/// Creates the directories of every volume path in the source tree, so that
/// they exist as mount points in the image.
fn create_volume_paths_in_root_dir(root_dir: &Path, volumes: &[Volume]) -> Result<(), StorageError> {
    for volume in volumes {
        let realpath = volume.realpath.trim_matches('/');
        if realpath.is_empty() || realpath == "swap" {
            continue;
        }

        create_dir_all(&root_dir.join(realpath))
            .map_err(|why| StorageError::VolumeCreate { volume: volume.name.clone(), why })?;
    }

    Ok(())
}

/// Which volume manager to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeManagerName {
    Lvm,
    Btrfs,
}

/// Parameters for the root volume.
#[derive(Debug, Default, Clone)]
pub struct VolumeManagerArgs {
    pub root_label:           Option<String>,
    pub root_filesystem_args: Vec<String>,
}

/// A volume manager, selected by name.
pub enum VolumeManager {
    Lvm(LvmVolumeManager),
    Btrfs(BtrfsVolumeManager),
}

impl VolumeManager {
    pub fn new<P: Into<PathBuf>>(
        name: VolumeManagerName,
        device: MappedDevice,
        root_dir: P,
        volumes: &[Volume],
        args: VolumeManagerArgs,
    ) -> Self {
        let root_dir = root_dir.into();
        match name {
            VolumeManagerName::Lvm => {
                VolumeManager::Lvm(LvmVolumeManager::new(device, root_dir, volumes, args))
            }
            VolumeManagerName::Btrfs => {
                VolumeManager::Btrfs(BtrfsVolumeManager::new(device, root_dir, volumes, args))
            }
        }
    }

    /// Prepares the device: a volume group for LVM, the top level subvolume
    /// for btrfs. Release handles are pushed to `stack`.
    pub fn setup(&mut self, name: &str, stack: &mut ReleaseStack) -> Result<(), StorageError> {
        match self {
            VolumeManager::Lvm(lvm) => lvm.setup(name, stack),
            VolumeManager::Btrfs(btrfs) => btrfs.setup(stack),
        }
    }

    pub fn create_volumes(&mut self, filesystem: FileSystemType) -> Result<(), StorageError> {
        match self {
            VolumeManager::Lvm(lvm) => lvm.create_volumes(filesystem),
            VolumeManager::Btrfs(btrfs) => btrfs.create_volumes(filesystem),
        }
    }

    pub fn mount_volumes(&mut self, stack: &mut ReleaseStack) -> Result<(), StorageError> {
        match self {
            VolumeManager::Lvm(lvm) => lvm.mount_volumes(stack),
            VolumeManager::Btrfs(_) => Ok(()),
        }
    }

    /// Devices by role; the root volume is provided as `root`.
    pub fn get_device(&self) -> DeviceMap {
        match self {
            VolumeManager::Lvm(lvm) => lvm.get_device(),
            VolumeManager::Btrfs(btrfs) => btrfs.get_device(),
        }
    }

    /// Fstab entries of the volumes besides the root.
    pub fn get_fstab(&self) -> Result<Vec<FstabEntry>, StorageError> {
        match self {
            VolumeManager::Lvm(lvm) => Ok(lvm.get_fstab()),
            VolumeManager::Btrfs(btrfs) => btrfs.get_fstab(),
        }
    }

    pub fn sync_data(&self, exclude: &[String]) -> Result<(), StorageError> {
        match self {
            VolumeManager::Lvm(lvm) => lvm.sync_data(exclude),
            VolumeManager::Btrfs(btrfs) => btrfs.sync_data(exclude),
        }
    }
}
