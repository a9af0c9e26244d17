use super::{
    canonical_volume_list, create_volume_paths_in_root_dir, volume_mbsize, Volume,
    VolumeManagerArgs, ROOT_VOLUME,
};
use crate::{
    filesystem::{create_dir_all, mount, sync_tree, FileSystem},
    fstab::{FstabEntry, FstabSource},
    storage::{DeviceMap, DeviceProvider, MappedDevice, ReleaseHandle, ReleaseStack, Resource, StorageError},
};
use disk_types::FileSystem as FileSystemType;
use external::{lvcreate, pvcreate, vgcreate, vgremove, vgs};
use std::{collections::BTreeMap, path::PathBuf};
use tempdir::TempDir;

struct VolumeMount {
    device:     PathBuf,
    mountpoint: String,
}

/// Creates an LVM volume group on the root device, with one logical volume
/// per requested volume.
pub struct LvmVolumeManager {
    device:       MappedDevice,
    root_dir:     PathBuf,
    volumes:      Vec<Volume>,
    args:         VolumeManagerArgs,
    volume_group: Option<String>,
    volume_map:   BTreeMap<String, PathBuf>,
    mount_list:   Vec<VolumeMount>,
    filesystem:   Option<FileSystemType>,
    mountpoint:   Option<PathBuf>,
}

impl LvmVolumeManager {
    pub fn new(device: MappedDevice, root_dir: PathBuf, volumes: &[Volume], args: VolumeManagerArgs) -> Self {
        LvmVolumeManager {
            device,
            root_dir,
            volumes: volumes.to_vec(),
            args,
            volume_group: None,
            volume_map: BTreeMap::new(),
            mount_list: Vec::new(),
            filesystem: None,
            mountpoint: None,
        }
    }

    pub fn setup(&mut self, group: &str, stack: &mut ReleaseStack) -> Result<(), StorageError> {
        let runner = self.device.runner().clone();
        let host_groups = vgs(&*runner).map_err(|why| StorageError::VolumeGroupCreate {
            group: group.into(),
            why,
        })?;

        if host_groups.iter().any(|vg| vg == group) {
            return Err(StorageError::VolumeGroupConflict { group: group.into() });
        }

        info!("creating volume group {}", group);
        if let Err(why) = vgremove(&*runner, group) {
            debug!("no stale volume group {} to remove: {}", group, why);
        }

        let device = self.device.get_device();
        pvcreate(&*runner, device)
            .and_then(|_| vgcreate(&*runner, group, [device].iter()))
            .map_err(|why| StorageError::VolumeGroupCreate { group: group.into(), why })?;

        stack.push(ReleaseHandle::new(Resource::VolumeGroup { name: group.into() }, runner));
        self.volume_group = Some(group.into());
        Ok(())
    }

    pub fn create_volumes(&mut self, filesystem: FileSystemType) -> Result<(), StorageError> {
        let group = match self.volume_group.clone() {
            Some(group) => group,
            None => return Ok(()),
        };

        info!("creating volumes ({})", filesystem);
        create_volume_paths_in_root_dir(&self.root_dir, &self.volumes)?;
        let canonical = canonical_volume_list(&self.volumes);
        let all = canonical
            .volumes
            .iter()
            .chain(canonical.full_size_volume.iter())
            .cloned()
            .collect::<Vec<Volume>>();

        for volume in &canonical.volumes {
            let mbsize = volume_mbsize(volume, &self.root_dir, &all);
            info!("--> volume {} with {} MB", volume.name, mbsize);
            self.create_volume(&group, volume, Some(mbsize), filesystem)?;
        }

        if let Some(ref volume) = canonical.full_size_volume {
            info!("--> fullsize volume {}", volume.name);
            self.create_volume(&group, volume, None, filesystem)?;
        }

        self.filesystem = Some(filesystem);
        Ok(())
    }

    fn create_volume(
        &mut self,
        group: &str,
        volume: &Volume,
        mbsize: Option<u64>,
        filesystem: FileSystemType,
    ) -> Result<(), StorageError> {
        let runner = self.device.runner().clone();
        lvcreate(&*runner, group, &volume.name, mbsize.map(|mb| mb * 1024 * 1024))
            .map_err(|why| StorageError::VolumeCreate { volume: volume.name.clone(), why })?;

        let node = PathBuf::from(["/dev/", group, "/", &volume.name].concat());
        self.volume_map.insert(volume.name.clone(), node.clone());

        let (label, args) = if volume.is_root() {
            (self.args.root_label.as_ref().map(String::as_str), self.args.root_filesystem_args.clone())
        } else {
            (None, Vec::new())
        };

        FileSystem::new(filesystem, MappedDevice::new(node.as_path(), &self.device), &self.root_dir, args)
            .create_on_device(label)?;

        let mount = VolumeMount { device: node, mountpoint: volume.realpath.clone() };
        if volume.is_root() {
            self.mount_list.insert(0, VolumeMount { mountpoint: "/".into(), ..mount });
        } else {
            self.mount_list.push(mount);
        }

        Ok(())
    }

    /// Mounts every volume below a temporary directory, root volume first.
    pub fn mount_volumes(&mut self, stack: &mut ReleaseStack) -> Result<(), StorageError> {
        let runner = self.device.runner().clone();
        let mountpoint = TempDir::new("distimage")
            .map(TempDir::into_path)
            .map_err(|why| StorageError::MountPoint { why })?;
        stack.push(ReleaseHandle::new(Resource::MountDir { path: mountpoint.clone() }, runner.clone()));
        self.mountpoint = Some(mountpoint.clone());

        for volume in &self.mount_list {
            let target = match volume.mountpoint.trim_matches('/') {
                "" => mountpoint.clone(),
                path => mountpoint.join(path),
            };
            create_dir_all(&target).map_err(|why| StorageError::MountPoint { why })?;
            mount(&runner, &volume.device, &target, self.filesystem, stack)?;
        }

        Ok(())
    }

    pub fn get_device(&self) -> DeviceMap {
        self.volume_map
            .iter()
            .map(|(name, node)| {
                let role = if name == ROOT_VOLUME { "root".to_owned() } else { name.clone() };
                (role, MappedDevice::new(node.as_path(), &self.device))
            })
            .collect()
    }

    /// Fstab entries of every volume but the root, by device node.
    pub fn get_fstab(&self) -> Vec<FstabEntry> {
        let filesystem = match self.filesystem {
            Some(filesystem) => filesystem,
            None => return Vec::new(),
        };

        self.mount_list
            .iter()
            .filter(|volume| volume.mountpoint != "/")
            .map(|volume| {
                let mountpoint = ["/", volume.mountpoint.trim_matches('/')].concat();
                FstabEntry::new(FstabSource::Device(volume.device.clone()), mountpoint, filesystem)
                    .check(true, 2)
            })
            .collect()
    }

    pub fn sync_data(&self, exclude: &[String]) -> Result<(), StorageError> {
        match self.mountpoint {
            Some(ref mountpoint) => sync_tree(&**self.device.runner(), &self.root_dir, mountpoint, exclude),
            None => Err(StorageError::VolumesNotMounted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume_manager::VolumeSize;
    use external::{Recorder, SharedRunner};
    use std::{path::Path, rc::Rc};

    struct Disk(SharedRunner);

    impl DeviceProvider for Disk {
        fn get_device(&self) -> &Path { Path::new("/dev/loop0") }

        fn is_loop(&self) -> bool { true }

        fn runner(&self) -> &SharedRunner { &self.0 }
    }

    fn manager(recorder: &Rc<Recorder>, root: &Path) -> LvmVolumeManager {
        let device = MappedDevice::new("/dev/mapper/loop0p2", &Disk(recorder.clone()));
        let volumes = [Volume { name: "LVhome".into(), realpath: "home".into(), size: VolumeSize::Size(100) }];
        let args = VolumeManagerArgs { root_label: Some("ROOT".into()), root_filesystem_args: vec![] };
        LvmVolumeManager::new(device, root.to_path_buf(), &volumes, args)
    }

    #[test]
    fn group_in_use_on_host() {
        let recorder = Recorder::new();
        recorder.respond("vgs", "  systemVG\n");
        let root = TempDir::new("distimage-lvm").unwrap();
        let mut stack = ReleaseStack::default();

        match manager(&recorder, root.path()).setup("systemVG", &mut stack) {
            Err(StorageError::VolumeGroupConflict { group }) => assert_eq!(group, "systemVG"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn volumes_and_mounts() {
        let recorder = Recorder::new();
        recorder.fail("vgremove");
        let root = TempDir::new("distimage-lvm").unwrap();
        let mut stack = ReleaseStack::default();
        let mut lvm = manager(&recorder, root.path());

        lvm.setup("systemVG", &mut stack).unwrap();
        lvm.create_volumes(FileSystemType::Ext4).unwrap();
        lvm.mount_volumes(&mut stack).unwrap();
        assert!(root.path().join("home").is_dir());

        let mut fstab = String::new();
        for entry in lvm.get_fstab() {
            entry.write_entry(&mut fstab);
        }
        assert_eq!(fstab, "/dev/systemVG/LVhome /home ext4 defaults 1 2\n");

        let devices = lvm.get_device();
        assert_eq!(devices["root"].get_device(), Path::new("/dev/systemVG/LVRoot"));
        assert_eq!(devices["LVhome"].get_device(), Path::new("/dev/systemVG/LVhome"));

        let lines = recorder.lines();
        assert_eq!(&lines[..6], &[
            "vgs --noheadings -o vg_name",
            "vgremove --force systemVG",
            "pvcreate -ffy /dev/mapper/loop0p2",
            "vgcreate systemVG /dev/mapper/loop0p2",
            "lvcreate -L 100 -n LVhome systemVG",
            "mkfs.ext4 -F -q /dev/systemVG/LVhome",
        ]);
        assert_eq!(&lines[6..8], &[
            "lvcreate -l +100%FREE -n LVRoot systemVG",
            "mkfs.ext4 -F -q -L ROOT /dev/systemVG/LVRoot",
        ]);

        let mounts = recorder.calls().into_iter().filter(|c| c.command() == "mount").collect::<Vec<_>>();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].argv[3], "/dev/systemVG/LVRoot");
        assert_eq!(mounts[1].argv[3], "/dev/systemVG/LVhome");
        assert!(mounts[1].argv[4].ends_with("/home"));

        // Unmounted in reverse before the group is deactivated.
        let errors = stack.unwind();
        let lines = recorder.lines();
        let tail = &lines[lines.len() - 3..];
        assert!(tail[0].starts_with("umount") && tail[0].ends_with("/home"));
        assert!(tail[1].starts_with("umount"));
        assert_eq!(tail[2], "vgchange -an systemVG");

        // The mount point still holds the home directory of the unmocked mount.
        assert_eq!(errors.len(), 1);
        let _ = std::fs::remove_dir_all(mounts[0].argv[4].clone());
    }
}
