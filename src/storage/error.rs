use disk_types::{FileSystem, PartitionTableError};
use std::{io, path::PathBuf};

/// Errors raised while setting up the storage chain of a disk image.
#[cfg_attr(rustfmt, rustfmt_skip)]
#[derive(Debug, Fail)]
pub enum StorageError {
    #[fail(display = "unable to create filesystem {} on {:?}: {}", fs, device, why)]
    FileSystemCreate { fs: FileSystem, device: PathBuf, why: io::Error },
    #[fail(display = "unable to create LUKS device on {:?}: {}", device, why)]
    LuksCreate { device: PathBuf, why: io::Error },
    #[fail(display = "passphrase for LUKS device must not be empty")]
    LuksEmptyPassphrase,
    #[fail(display = "unable to write crypttab to {:?}: {}", path, why)]
    LuksCrypttab { path: PathBuf, why: io::Error },
    #[fail(display = "LUKS option profile '{}' is not known", os)]
    LuksUnknownProfile { os: String },
    #[fail(display = "loop file {:?} does not exist and no size was given", path)]
    LoopFileWithoutSize { path: PathBuf },
    #[fail(display = "unable to bind {:?} to a loop device: {}", path, why)]
    LoopCreate { path: PathBuf, why: io::Error },
    #[fail(display = "unable to mount {:?} at {:?}: {}", device, target, why)]
    Mount { device: PathBuf, target: PathBuf, why: io::Error },
    #[fail(display = "unable to create mount point: {}", why)]
    MountPoint { why: io::Error },
    #[fail(display = "unable to create partition {} ({}): {}", id, name, why)]
    PartitionCreate { id: u32, name: String, why: io::Error },
    #[fail(display = "unable to set {} on partition {}: {}", flag, id, why)]
    PartitionFlag { id: u32, flag: String, why: io::Error },
    #[fail(display = "unable to map partitions of {:?}: {}", device, why)]
    PartitionMap { device: PathBuf, why: io::Error },
    #[fail(display = "{}", why)]
    PartitionTable { why: PartitionTableError },
    #[fail(display = "unable to resize partition table on {:?}: {}", device, why)]
    PartitionTableResize { device: PathBuf, why: io::Error },
    #[fail(display = "unable to query {:?}: {}", device, why)]
    Query { device: PathBuf, why: io::Error },
    #[fail(display = "unable to write RAID config to {:?}: {}", path, why)]
    RaidConfig { path: PathBuf, why: io::Error },
    #[fail(display = "unable to create degraded RAID on {:?}: {}", device, why)]
    RaidCreate { device: PathBuf, why: io::Error },
    #[fail(display = "no free RAID device found in /dev/md0 to /dev/md8")]
    RaidNoFreeDevice,
    #[fail(display = "RAID level '{}' is not supported", level)]
    RaidUnsupportedLevel { level: String },
    #[fail(display = "unable to synchronize {:?} to {:?}: {}", source, target, why)]
    Sync { source: PathBuf, target: PathBuf, why: io::Error },
    #[fail(display = "source directory {:?} for data sync does not exist", source)]
    SyncSourceMissing { source: PathBuf },
    #[fail(display = "unable to create volume {}: {}", volume, why)]
    VolumeCreate { volume: String, why: io::Error },
    #[fail(display = "volumes must be mounted before data can be synced to them")]
    VolumesNotMounted,
    #[fail(display = "requested volume group {} is in use on this host", group)]
    VolumeGroupConflict { group: String },
    #[fail(display = "unable to create volume group {}: {}", group, why)]
    VolumeGroupCreate { group: String, why: io::Error },
    #[fail(display = "unable to wipe {:?}: {}", device, why)]
    Wipe { device: PathBuf, why: io::Error },
}

impl From<PartitionTableError> for StorageError {
    fn from(why: PartitionTableError) -> Self { StorageError::PartitionTable { why } }
}
