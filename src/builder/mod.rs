//! The disk builder: partitions a loop backed image file, stacks RAID, LUKS
//! and volumes onto it, fills it from the source tree and makes it bootable.

mod config;
mod result;
mod steps;
mod traits;

pub use self::{
    config::{DiskBuildConfig, ImageType},
    result::{BuildResult, ResultEntry},
    steps::Step,
    traits::*,
};

use self::steps::apply;
use crate::{
    disk::{Disk, PartitionIdMap, Partitioner},
    disk_setup::DiskSetup,
    errors::{BuildError, Error, IoContext},
    filesystem::{create_dir_all, FileSystem},
    firmware::FirmWare,
    fstab::{Fstab, FstabEntry, FstabSource},
    identifier::ImageIdentifier,
    kernel::Kernel,
    storage::{
        luks_profile, raid_level_number, DeviceMap, DeviceProvider, LoopDevice, LuksDevice,
        MappedDevice, RaidDevice, ReleaseStack, StorageError,
    },
    volume_manager::{VolumeManager, VolumeManagerArgs, VolumeManagerName},
};
use disk_types::{FileSystem as FileSystemType, PartitionSize, PartitionTable};
use external::{qemu_img_resize, SharedRunner};
use std::path::{Path, PathBuf};

/// Paths of the source tree which never make it into the image.
const ROOT_SYNC_EXCLUDES: &[&str] = &["image", ".profile", ".kconfig", "var/cache/distimage"];

/// Where the system tree ends up: volumes, or a single file system.
enum RootSystem {
    Volumes(VolumeManager),
    Plain(FileSystem),
}

impl RootSystem {
    fn volumes(&self) -> Option<&VolumeManager> {
        match self {
            RootSystem::Volumes(volumes) => Some(volumes),
            RootSystem::Plain(_) => None,
        }
    }

    fn sync_data(&self, exclude: &[String]) -> Result<(), StorageError> {
        match self {
            RootSystem::Volumes(volumes) => volumes.sync_data(exclude),
            RootSystem::Plain(filesystem) => filesystem.sync_data(exclude),
        }
    }
}

/// What became of a requested disk format conversion.
#[derive(Debug, PartialEq)]
enum Conversion {
    NotRequested,
    Skipped(String),
    Converted,
}

/// Builds a bootable disk image from a prepared source tree.
pub struct DiskBuilder {
    config:        DiskBuildConfig,
    firmware:      FirmWare,
    runner:        SharedRunner,
    source_dir:    PathBuf,
    target_dir:    PathBuf,
    collaborators: Collaborators,
}

impl DiskBuilder {
    pub fn new<S: Into<PathBuf>, T: Into<PathBuf>>(
        config: DiskBuildConfig,
        source_dir: S,
        target_dir: T,
        runner: SharedRunner,
        collaborators: Collaborators,
    ) -> Result<Self, BuildError> {
        let firmware = config.firmware_model()?;
        Ok(DiskBuilder {
            config,
            firmware,
            runner,
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            collaborators,
        })
    }

    /// The raw disk image file.
    pub fn diskname(&self) -> PathBuf { self.target_dir.join([&self.config.name, ".raw"].concat()) }

    /// Builds the disk, then the install media or the disk format which were
    /// requested.
    pub fn create(&mut self) -> Result<BuildResult, Error> {
        let mut result = BuildResult::default();
        self.create_disk()?;
        self.create_install_media(&mut result)?;
        self.append_unpartitioned_space()?;
        let converted = self.create_disk_format(&mut result)? == Conversion::Converted;

        let config = &self.config;
        result.add(
            "disk_image",
            self.diskname(),
            !converted,
            config.bundle_compression && config.luks.is_none(),
            true,
        );

        Ok(result)
    }

    /// Builds the bootable raw disk.
    pub fn create_disk(&mut self) -> Result<(), Error> {
        let diskname = self.diskname();
        let DiskBuilder {
            ref config,
            ref firmware,
            ref runner,
            ref source_dir,
            ref mut collaborators,
            ..
        } = *self;
        let Collaborators {
            ref mut boot_image,
            ref disk_setup,
            ref mut bootloader_config,
            ref mut bootloader_install,
            ref mut system_setup,
            ..
        } = *collaborators;

        let filesystem =
            apply(Step::Validate, || validate(config, source_dir, boot_image.required()))?;

        apply(Step::BootImage, || {
            info!("preparing boot system");
            Ok(boot_image.prepare()?)
        })?;

        let mut stack = ReleaseStack::default();
        let disksize = disk_setup.get_disksize_mbytes();
        let loop_device = apply(Step::CreateDisk, || {
            info!("creating raw disk image {}", diskname.display());
            let (loop_device, handle) =
                LoopDevice::create(runner.clone(), &diskname, Some(disksize), config.target_blocksize)?;
            stack.push(handle);
            Ok(loop_device)
        })?;

        let mut disk = Disk::new(firmware.get_partition_table_type(), Box::new(loop_device));
        let mut device_map = apply(Step::Partition, || {
            build_and_map_partitions(config, firmware, &**disk_setup, &mut disk, &mut stack)
        })?;

        let raid_root = match config.mdraid {
            Some(ref level) => Some(apply(Step::Raid, || {
                let mut raid = RaidDevice::new(root_device(&device_map)?);
                stack.push(raid.create_degraded_raid(level)?);
                if let Some(device) = raid.get_device() {
                    device_map.insert("root".into(), device);
                }
                Ok(raid)
            })?),
            None => None,
        };

        let luks_root = match config.luks {
            Some(ref passphrase) => Some(apply(Step::Luks, || {
                let mut luks = LuksDevice::new(root_device(&device_map)?);
                let os = config.luks_os.as_ref().map(String::as_str);
                stack.push(luks.create_crypto_luks(passphrase, os, &config.luks_format_options)?);
                if let Some(device) = luks.get_device() {
                    device_map.insert("root".into(), device);
                }
                Ok(luks)
            })?),
            None => None,
        };

        let (system_efi, system_boot) = apply(Step::BootFilesystems, || {
            let efi = match device_map.get("efi") {
                Some(device) => {
                    info!("creating EFI(fat16) file system on {}", device.get_device().display());
                    let efi = FileSystem::new(
                        FileSystemType::Fat16,
                        device.clone(),
                        source_dir.join("boot/efi"),
                        Vec::new(),
                    );
                    efi.create_on_device(Some(&disk_setup.get_efi_label()))?;
                    Some(efi)
                }
                None => None,
            };

            let boot = match device_map.get("boot") {
                Some(device) => {
                    let kind = config.boot_filesystem.unwrap_or(filesystem);
                    info!("creating boot({}) file system on {}", kind, device.get_device().display());
                    let boot = FileSystem::new(kind, device.clone(), source_dir.join("boot"), Vec::new());
                    boot.create_on_device(Some(&disk_setup.get_boot_label()))?;
                    Some(boot)
                }
                None => None,
            };

            Ok((efi, boot))
        })?;

        let system = apply(Step::RootFilesystem, || {
            let root = root_device(&device_map)?;
            match config.volume_manager {
                Some(name) => {
                    let args = VolumeManagerArgs {
                        root_label:           Some(disk_setup.get_root_label()),
                        root_filesystem_args: config.filesystem_args.clone(),
                    };
                    let mut volumes =
                        VolumeManager::new(name, root, source_dir.as_path(), &config.volumes, args);
                    volumes.setup(&config.volume_group_name, &mut stack)?;
                    volumes.create_volumes(filesystem)?;
                    volumes.mount_volumes(&mut stack)?;
                    if let Some(root) = volumes.get_device().remove("root") {
                        device_map.insert("root".into(), root);
                    }
                    Ok(RootSystem::Volumes(volumes))
                }
                None => {
                    info!("creating root({}) file system on {}", filesystem, root.get_device().display());
                    let root = FileSystem::new(
                        filesystem,
                        root,
                        source_dir.as_path(),
                        config.filesystem_args.clone(),
                    );
                    root.create_on_device(Some(&disk_setup.get_root_label()))?;
                    Ok(RootSystem::Plain(root))
                }
            }
        })?;

        apply(Step::Fstab, || {
            info!("creating generic system etc/fstab");
            let fstab = generic_fstab(&device_map, filesystem, config, system.volumes())?;
            Ok(fstab.write(&source_dir.join("etc/fstab"))?)
        })?;

        let mbrid = ImageIdentifier::new();
        apply(Step::Metadata, || {
            let boot_root = boot_image.boot_root_directory().to_path_buf();
            write_partition_ids(&boot_root.join("config.partids"), disk.get_partition_id_map())?;

            let recovery = source_dir.join("recovery.partition.size");
            if recovery.exists() {
                info!("copying recovery metadata to boot image");
                misc::cp(&recovery, boot_root.join("recovery.partition.size"))?;
            }

            info!("creating image identifier: {}", mbrid);
            create_dir_all(&source_dir.join("boot"))?;
            mbrid.write(source_dir.join("boot/mbrid"))?;

            if let Some(ref raid) = raid_root {
                info!("creating etc/mdadm.conf in boot system");
                raid.create_raid_config(&boot_root.join("etc/mdadm.conf"))?;
            }

            if let Some(ref luks) = luks_root {
                info!("creating etc/crypttab");
                luks.create_crypttab(&source_dir.join("etc/crypttab"))?;
                info!("--> including etc/crypttab in boot system");
                boot_image.include_file(source_dir, Path::new("etc/crypttab"))?;
            }

            Ok(())
        })?;

        let initrd = apply(Step::Initrd, || Ok(boot_image.create_initrd(&mbrid)?))?;

        apply(Step::BootFiles, || {
            info!("copy boot files to system image");
            let kernel = Kernel::new(boot_image.boot_root_directory());
            info!("--> boot image kernel as first boot linux.vmx");
            kernel.copy_kernel(&source_dir.join("boot/linux.vmx"))?;

            if config.domain.as_ref().map(String::as_str) == Some("dom0") {
                info!("--> boot image xen hypervisor as xen.gz");
                kernel.copy_xen_hypervisor(&source_dir.join("boot/xen.gz"))?;
            }

            info!("--> initrd archive as first boot initrd.vmx");
            let target = source_dir.join("boot/initrd.vmx");
            misc::mv(&initrd, &target)
                .with_context(|why| format!("unable to move initrd {:?}: {}", initrd, why))?;
            Ok(())
        })?;

        let boot_device = match device_map.get("boot") {
            Some(boot) => boot.clone(),
            None => root_device(&device_map).map_err(|why| Error { step: Step::BootLoaderConfig, why })?,
        };

        apply(Step::BootLoaderConfig, || {
            info!("creating bootloader configuration");
            let ids = disk.get_partition_id_map();
            let boot_partition_id = ids
                .get("BootPart")
                .or_else(|| ids.get("RootPart"))
                .cloned()
                .ok_or(BuildError::MissingRootDevice)?;

            let boot_uuid = disk.get_uuid(boot_device.get_device())?;
            bootloader_config.setup_disk_boot_images(&boot_uuid)?;
            bootloader_config.setup_disk_image_config(&boot_uuid, ids)?;
            bootloader_config.write()?;
            Ok(system_setup.edit_boot_config(Some(filesystem), &boot_partition_id)?)
        })?;

        apply(Step::BootLoaderInstall, || {
            bootloader_install.install(disk.storage_device(), &device_map)?;
            Ok(system_setup.edit_boot_install(&diskname, boot_device.get_device())?)
        })?;

        apply(Step::Identifier, || Ok(mbrid.write_to_disk(disk.storage_device())?))?;

        apply(Step::Sync, || {
            info!("syncing system to image");
            if let Some(ref efi) = system_efi {
                info!("--> syncing EFI boot data to EFI partition");
                efi.sync_data(&[])?;
            }

            if let Some(ref boot) = system_boot {
                info!("--> syncing boot data at extra partition");
                boot.sync_data(&["efi/*".to_owned()])?;
            }

            info!("--> syncing root file system data");
            system.sync_data(&root_sync_excludes(&device_map))?;
            Ok(())
        })?;

        for why in stack.unwind() {
            warn!("{}", why);
        }

        Ok(())
    }

    fn create_install_media(&mut self, result: &mut BuildResult) -> Result<(), Error> {
        if !self.config.install_media() {
            return Ok(());
        }

        let diskname = self.diskname();
        let DiskBuilder { ref config, ref mut collaborators, .. } = *self;
        let install_media = &mut collaborators.install_media;

        apply(Step::InstallMedia, || {
            if config.install_iso || config.install_stick {
                info!("creating hybrid ISO installation image");
                let iso = install_media.create_install_iso(&diskname)?;
                result.add("installation_image", iso, true, false, true);
            }

            if config.install_pxe {
                info!("creating PXE installation archive");
                let archive = install_media.create_install_pxe_archive(&diskname)?;
                result.add("installation_pxe_archive", archive, true, false, true);
            }

            Ok(())
        })
    }

    /// Grows the finished disk by the requested unpartitioned space, and the
    /// partition table with it.
    fn append_unpartitioned_space(&mut self) -> Result<(), Error> {
        let mbytes = match self.config.unpartitioned_mbytes {
            Some(mbytes) if mbytes > 0 => mbytes,
            _ => return Ok(()),
        };

        let diskname = self.diskname();
        let DiskBuilder { ref config, ref firmware, ref runner, .. } = *self;

        apply(Step::Unpartitioned, || {
            info!("expanding disk with {} MB of unpartitioned space", mbytes);
            qemu_img_resize(&**runner, &diskname, mbytes)?;

            let mut stack = ReleaseStack::default();
            let (loop_device, handle) =
                LoopDevice::create(runner.clone(), &diskname, None, config.target_blocksize)?;
            stack.push(handle);

            let result = Partitioner::new(firmware.get_partition_table_type(), &loop_device)
                .resize_table(None);
            for why in stack.unwind() {
                warn!("{}", why);
            }

            Ok(result?)
        })
    }

    /// Converts the raw disk, unless install media were requested.
    fn create_disk_format(&mut self, result: &mut BuildResult) -> Result<Conversion, Error> {
        let format = match self.config.format {
            Some(ref format) => format.clone(),
            None => return Ok(Conversion::NotRequested),
        };

        if self.config.install_media() {
            let reason =
                format!("install media requested, skipping conversion of the disk to {}", format);
            warn!("{}", reason);
            return Ok(Conversion::Skipped(reason));
        }

        let diskname = self.diskname();
        let DiskBuilder { ref config, ref mut collaborators, .. } = *self;
        let disk_format = &mut collaborators.disk_format;

        apply(Step::DiskFormat, || {
            let image = disk_format.create_image_format(&diskname, &format)?;
            result.add("disk_format_image", image, true, config.bundle_compression, true);
            Ok(Conversion::Converted)
        })
    }
}

/// Checks the build description and the source tree before any device is
/// touched, returning the root file system.
fn validate(
    config: &DiskBuildConfig,
    source_dir: &Path,
    boot_setup: bool,
) -> Result<FileSystemType, BuildError> {
    if !config.build_type.is_disk() {
        return Err(BuildError::NotADiskImage { build_type: config.build_type.to_string() });
    }

    if !source_dir.is_dir() {
        return Err(BuildError::MissingSourceTree { path: source_dir.to_path_buf() });
    }

    if config.install_media() && config.build_type != ImageType::Oem {
        return Err(BuildError::InstallMediaRequiresOem { build_type: config.build_type.to_string() });
    }

    if !boot_setup {
        return Err(BuildError::MissingBootSetup);
    }

    if let Some(ref level) = config.mdraid {
        raid_level_number(level)
            .ok_or_else(|| StorageError::RaidUnsupportedLevel { level: level.clone() })?;
    }

    if let Some(ref passphrase) = config.luks {
        if passphrase.is_empty() {
            return Err(StorageError::LuksEmptyPassphrase.into());
        }

        if let Some(ref os) = config.luks_os {
            luks_profile(os).ok_or_else(|| StorageError::LuksUnknownProfile { os: os.clone() })?;
        }
    }

    match (config.volume_manager, config.filesystem) {
        (Some(VolumeManagerName::Btrfs), Some(fs)) if fs != FileSystemType::Btrfs => {
            Err(BuildError::VolumeManagerMismatch { manager: "btrfs".into(), filesystem: fs.to_string() })
        }
        _ => config.root_filesystem().ok_or(BuildError::MissingFilesystem),
    }
}

fn build_and_map_partitions(
    config: &DiskBuildConfig,
    firmware: &FirmWare,
    disk_setup: &dyn DiskSetup,
    disk: &mut Disk,
    stack: &mut ReleaseStack,
) -> Result<DeviceMap, BuildError> {
    disk.wipe()?;

    if firmware.legacy_bios_mode() {
        info!("--> creating EFI CSM(legacy bios) partition");
        disk.create_efi_csm_partition(PartitionSize::Megabytes(firmware.get_legacy_bios_partition_size()))?;
    }

    if firmware.efi_mode() {
        info!("--> creating EFI partition");
        disk.create_efi_partition(PartitionSize::Megabytes(firmware.get_efi_partition_size()))?;
    }

    if firmware.ofw_mode() {
        info!("--> creating PReP partition");
        disk.create_prep_partition(PartitionSize::Megabytes(firmware.get_prep_partition_size()))?;
    }

    if disk_setup.need_boot_partition() {
        info!("--> creating boot partition");
        disk.create_boot_partition(PartitionSize::Megabytes(disk_setup.boot_partition_size()))?;
    }

    if config.volume_manager == Some(VolumeManagerName::Lvm) {
        info!("--> creating LVM root partition");
        disk.create_root_lvm_partition(PartitionSize::AllFree)?;
    } else if config.mdraid.is_some() {
        info!("--> creating mdraid root partition");
        disk.create_root_raid_partition(PartitionSize::AllFree)?;
    } else {
        info!("--> creating root partition");
        disk.create_root_partition(PartitionSize::AllFree)?;
    }

    if firmware.efi_mode() && disk.table() == PartitionTable::Gpt {
        if config.force_mbr {
            info!("--> converting partition table to MBR");
            disk.create_mbr()?;
        } else if config.gpt_hybrid_mbr {
            info!("--> converting partition table to hybrid GPT/MBR");
            disk.create_hybrid_mbr()?;
        }
    }

    if firmware.bios_mode() || firmware.ofw_mode() {
        info!("--> setting active flag to primary boot partition");
        disk.activate_boot_partition()?;
    }

    if let Some(handle) = disk.map_partitions()? {
        stack.push(handle);
    }

    Ok(disk.get_device())
}

fn root_device(device_map: &DeviceMap) -> Result<MappedDevice, BuildError> {
    device_map.get("root").cloned().ok_or(BuildError::MissingRootDevice)
}

/// Writes the partition ids as shell variable assignments.
fn write_partition_ids(path: &Path, ids: &PartitionIdMap) -> Result<(), BuildError> {
    info!("creating config.partids in boot system");
    let partids = ids
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"\n", name, value))
        .collect::<String>();

    Ok(misc::write(path, partids)?)
}

/// The build time paths left out of the root sync. With a dedicated boot or
/// EFI partition, those trees are synced there instead.
fn root_sync_excludes(device_map: &DeviceMap) -> Vec<String> {
    let mut exclude = ROOT_SYNC_EXCLUDES.iter().map(|&path| String::from(path)).collect::<Vec<_>>();
    if device_map.contains_key("boot") {
        exclude.push("boot/*".into());
        exclude.push("boot/.*".into());
    }

    if device_map.contains_key("efi") {
        exclude.push("boot/efi/*".into());
        exclude.push("boot/efi/.*".into());
    }

    exclude
}

/// The fstab of the system: root, boot and EFI partitions by UUID, followed
/// by the volumes. An LVM root is mounted by its device node.
fn generic_fstab(
    device_map: &DeviceMap,
    filesystem: FileSystemType,
    config: &DiskBuildConfig,
    volumes: Option<&VolumeManager>,
) -> Result<Fstab, BuildError> {
    let mut fstab = Fstab::default();

    let root = root_device(device_map)?;
    let source = match config.volume_manager {
        Some(VolumeManagerName::Lvm) => FstabSource::Device(root.get_device().to_path_buf()),
        _ => FstabSource::Uuid(root.get_uuid(root.get_device())?),
    };
    fstab.add_entry(FstabEntry::new(source, "/", filesystem).check(false, 1));

    if let Some(boot) = device_map.get("boot") {
        let uuid = boot.get_uuid(boot.get_device())?;
        let kind = config.boot_filesystem.unwrap_or(filesystem);
        fstab.add_entry(FstabEntry::new(FstabSource::Uuid(uuid), "/boot", kind));
    }

    if let Some(efi) = device_map.get("efi") {
        let uuid = efi.get_uuid(efi.get_device())?;
        fstab.add_entry(FstabEntry::new(FstabSource::Uuid(uuid), "/boot/efi", FileSystemType::Fat16));
    }

    if let Some(volumes) = volumes {
        for entry in volumes.get_fstab()? {
            fstab.add_entry(entry);
        }
    }

    Ok(fstab)
}

#[cfg(test)]
mod tests;
