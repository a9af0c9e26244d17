//! File systems on a provided device, and syncing source trees into them.

use crate::storage::{DeviceProvider, MappedDevice, ReleaseHandle, ReleaseStack, Resource, StorageError};
use disk_types::FileSystem as FileSystemType;
use external::{mkfs, rsync, Runner, SharedRunner};
use std::{
    io,
    path::{Path, PathBuf},
};
use tempdir::TempDir;

/// A file system on a device, to be filled from a source tree.
pub struct FileSystem {
    kind:        FileSystemType,
    device:      MappedDevice,
    root_dir:    PathBuf,
    custom_args: Vec<String>,
}

impl FileSystem {
    pub fn new<P: Into<PathBuf>>(
        kind: FileSystemType,
        device: MappedDevice,
        root_dir: P,
        custom_args: Vec<String>,
    ) -> Self {
        FileSystem { kind, device, root_dir: root_dir.into(), custom_args }
    }

    pub fn kind(&self) -> FileSystemType { self.kind }

    pub fn device(&self) -> &MappedDevice { &self.device }

    /// Creates the file system on the device, with an optional label.
    pub fn create_on_device(&self, label: Option<&str>) -> Result<(), StorageError> {
        let device = self.device.get_device();
        info!("creating {} file system on {}", self.kind, device.display());
        mkfs(&**self.device.runner(), device, self.kind, label, &self.custom_args).map_err(|why| {
            StorageError::FileSystemCreate { fs: self.kind, device: device.into(), why }
        })
    }

    /// Mounts the file system and synchronizes the source tree into it,
    /// leaving out every path matching `exclude`.
    pub fn sync_data(&self, exclude: &[String]) -> Result<(), StorageError> {
        if !self.kind.is_mountable() {
            debug!("{} file systems carry no data to sync", self.kind);
            return Ok(());
        }

        let runner = self.device.runner();
        let mut mounts = ReleaseStack::default();
        let target = mount_on_temp_dir(runner, &self.device, Some(self.kind), &mut mounts)?;
        let result = sync_tree(&**runner, &self.root_dir, &target, exclude);
        for why in mounts.unwind() {
            warn!("{}", why);
        }

        result
    }
}

/// Creates a temporary mount point and mounts `device` there. The release
/// handles of the mount point and the mount are pushed to `mounts`.
pub(crate) fn mount_on_temp_dir(
    runner: &SharedRunner,
    device: &MappedDevice,
    kind: Option<FileSystemType>,
    mounts: &mut ReleaseStack,
) -> Result<PathBuf, StorageError> {
    let target = TempDir::new("distimage")
        .map(TempDir::into_path)
        .map_err(|why| StorageError::MountPoint { why })?;
    mounts.push(ReleaseHandle::new(Resource::MountDir { path: target.clone() }, runner.clone()));

    mount(runner, device.get_device(), &target, kind, mounts)?;
    Ok(target)
}

/// Mounts `device` at `target`, pushing the release handle to `mounts`.
pub(crate) fn mount(
    runner: &SharedRunner,
    device: &Path,
    target: &Path,
    kind: Option<FileSystemType>,
    mounts: &mut ReleaseStack,
) -> Result<(), StorageError> {
    runner.mount(device, target, kind.map(FileSystemType::mount_type)).map_err(|why| {
        StorageError::Mount { device: device.into(), target: target.into(), why }
    })?;

    mounts.push(ReleaseHandle::new(Resource::Mount { target: target.into() }, runner.clone()));
    Ok(())
}

/// Synchronizes `source` into `target` with rsync.
pub(crate) fn sync_tree(
    runner: &dyn Runner,
    source: &Path,
    target: &Path,
    exclude: &[String],
) -> Result<(), StorageError> {
    if !source.is_dir() {
        return Err(StorageError::SyncSourceMissing { source: source.into() });
    }

    info!("syncing {} to {}", source.display(), target.display());
    rsync(runner, source, target, exclude).map_err(|why| StorageError::Sync {
        source: source.into(),
        target: target.into(),
        why,
    })
}

/// Creates `path` and its parents.
pub(crate) fn create_dir_all(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path).map_err(|why| {
        io::Error::new(why.kind(), format!("unable to create {}: {}", path.display(), why))
    })
}
