use super::{canonical_volume_list, create_volume_paths_in_root_dir, Volume, VolumeManagerArgs};
use crate::{
    filesystem::{create_dir_all, mount_on_temp_dir, sync_tree, FileSystem},
    fstab::{FstabEntry, FstabSource},
    storage::{DeviceMap, DeviceProvider, MappedDevice, ReleaseStack, StorageError},
};
use disk_types::FileSystem as FileSystemType;
use external::{btrfs_subvolume_create, btrfs_subvolume_set_default};
use std::path::PathBuf;

const TOPLEVEL: &str = "@";

/// Creates a btrfs file system on the root device, with the system in the `@`
/// subvolume and one nested subvolume per requested volume.
pub struct BtrfsVolumeManager {
    device:     MappedDevice,
    root_dir:   PathBuf,
    volumes:    Vec<Volume>,
    args:       VolumeManagerArgs,
    mountpoint: Option<PathBuf>,
}

impl BtrfsVolumeManager {
    pub fn new(device: MappedDevice, root_dir: PathBuf, volumes: &[Volume], args: VolumeManagerArgs) -> Self {
        BtrfsVolumeManager { device, root_dir, volumes: volumes.to_vec(), args, mountpoint: None }
    }

    pub fn setup(&mut self, stack: &mut ReleaseStack) -> Result<(), StorageError> {
        FileSystem::new(
            FileSystemType::Btrfs,
            self.device.clone(),
            &self.root_dir,
            self.args.root_filesystem_args.clone(),
        )
        .create_on_device(self.args.root_label.as_ref().map(String::as_str))?;

        let runner = self.device.runner().clone();
        let mountpoint = mount_on_temp_dir(&runner, &self.device, Some(FileSystemType::Btrfs), stack)?;
        let toplevel = mountpoint.join(TOPLEVEL);

        info!("creating btrfs root subvolume {}", TOPLEVEL);
        btrfs_subvolume_create(&*runner, &toplevel)
            .and_then(|_| btrfs_subvolume_set_default(&*runner, &mountpoint))
            .map_err(|why| StorageError::VolumeCreate { volume: TOPLEVEL.into(), why })?;

        self.mountpoint = Some(mountpoint);
        Ok(())
    }

    pub fn create_volumes(&mut self, filesystem: FileSystemType) -> Result<(), StorageError> {
        let mountpoint = match self.mountpoint {
            Some(ref mountpoint) => mountpoint.join(TOPLEVEL),
            None => return Err(StorageError::VolumesNotMounted),
        };

        if filesystem != FileSystemType::Btrfs {
            warn!("btrfs volumes ignore the requested {} file system", filesystem);
        }

        create_volume_paths_in_root_dir(&self.root_dir, &self.volumes)?;
        let canonical = canonical_volume_list(&self.volumes);
        let runner = self.device.runner();

        for volume in canonical.volumes.iter().chain(canonical.full_size_volume.iter()) {
            if volume.is_root() {
                continue;
            }

            let path = mountpoint.join(volume.realpath.trim_matches('/'));
            info!("--> subvolume {}", path.display());
            let created = match path.parent() {
                Some(parent) => create_dir_all(parent),
                None => Ok(()),
            };

            created
                .and_then(|_| btrfs_subvolume_create(&**runner, &path))
                .map_err(|why| StorageError::VolumeCreate { volume: volume.name.clone(), why })?;
        }

        Ok(())
    }

    /// The whole file system is the root device.
    pub fn get_device(&self) -> DeviceMap {
        let mut map = DeviceMap::new();
        map.insert("root".into(), self.device.clone());
        map
    }

    /// Fstab entries mounting every subvolume but the root by its path below
    /// the top level subvolume.
    pub fn get_fstab(&self) -> Result<Vec<FstabEntry>, StorageError> {
        let canonical = canonical_volume_list(&self.volumes);
        let mut subvolumes = canonical
            .volumes
            .iter()
            .chain(canonical.full_size_volume.iter())
            .filter(|volume| !volume.is_root())
            .map(|volume| volume.realpath.trim_matches('/'))
            .collect::<Vec<_>>();
        if subvolumes.is_empty() {
            return Ok(Vec::new());
        }
        subvolumes.sort();

        let uuid = self.device.get_uuid(self.device.get_device())?;
        let entries = subvolumes
            .into_iter()
            .map(|path| {
                FstabEntry::new(FstabSource::Uuid(uuid.clone()), ["/", path].concat(), FileSystemType::Btrfs)
                    .options(format!("subvol={}/{}", TOPLEVEL, path))
            })
            .collect();

        Ok(entries)
    }

    pub fn sync_data(&self, exclude: &[String]) -> Result<(), StorageError> {
        match self.mountpoint {
            Some(ref mountpoint) => {
                sync_tree(&**self.device.runner(), &self.root_dir, &mountpoint.join(TOPLEVEL), exclude)
            }
            None => Err(StorageError::VolumesNotMounted),
        }
    }
}
