//! Collaborators which the disk builder hands work to, but which are not part
//! of the disk pipeline itself.

use crate::{
    disk::{PartitionId, PartitionIdMap},
    disk_setup::DiskSetup,
    identifier::ImageIdentifier,
    storage::DeviceMap,
};
use disk_types::FileSystem as FileSystemType;
use external::{qemu_img_convert, SharedRunner};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// The boot (initrd) system of the image.
pub trait BootImage {
    /// Whether the build description carries a boot setup.
    fn required(&self) -> bool;

    /// Prepares the tree the initrd is built from.
    fn prepare(&mut self) -> io::Result<()>;

    /// The tree the initrd is built from, which also holds the kernel.
    fn boot_root_directory(&self) -> &Path;

    /// Copies `path`, relative to `system_root`, to the same place in the
    /// boot tree, so that it ends up in the initrd.
    fn include_file(&mut self, system_root: &Path, path: &Path) -> io::Result<()> {
        let target = self.boot_root_directory().join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        misc::cp(system_root.join(path), target).map(|_| ())
    }

    /// Creates the initrd, and returns its path.
    fn create_initrd(&mut self, mbrid: &ImageIdentifier) -> io::Result<PathBuf>;
}

pub trait BootLoaderConfig {
    fn setup_disk_boot_images(&mut self, boot_uuid: &str) -> io::Result<()>;

    fn setup_disk_image_config(&mut self, boot_uuid: &str, ids: &PartitionIdMap) -> io::Result<()>;

    fn write(&mut self) -> io::Result<()>;
}

pub trait BootLoaderInstall {
    /// Installs the bootloader onto `storage`, the device of the whole disk.
    fn install(&mut self, storage: &Path, devices: &DeviceMap) -> io::Result<()>;
}

pub trait InstallMedia {
    /// Creates a hybrid ISO which installs the raw disk, and returns its path.
    fn create_install_iso(&mut self, raw: &Path) -> io::Result<PathBuf>;

    /// Creates a PXE archive which installs the raw disk, and returns its path.
    fn create_install_pxe_archive(&mut self, raw: &Path) -> io::Result<PathBuf>;
}

pub trait DiskFormat {
    /// Converts the raw disk to `format`, and returns the path of the result.
    fn create_image_format(&mut self, raw: &Path, format: &str) -> io::Result<PathBuf>;
}

/// Hooks into the image description, run after bootloader setup.
pub trait SystemSetup {
    fn edit_boot_config(
        &mut self,
        _filesystem: Option<FileSystemType>,
        _boot_partition_id: &PartitionId,
    ) -> io::Result<()> {
        Ok(())
    }

    fn edit_boot_install(&mut self, _diskname: &Path, _boot_device: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// A system setup without hooks.
pub struct NoSystemSetup;

impl SystemSetup for NoSystemSetup {}

/// Converts raw disks with `qemu-img`.
pub struct QemuImgFormat {
    runner: SharedRunner,
}

impl QemuImgFormat {
    pub fn new(runner: SharedRunner) -> Self { QemuImgFormat { runner } }
}

impl DiskFormat for QemuImgFormat {
    fn create_image_format(&mut self, raw: &Path, format: &str) -> io::Result<PathBuf> {
        let (qemu_format, options): (&str, &[&str]) = match format {
            "qcow2" => ("qcow2", &[]),
            "vmdk" => ("vmdk", &[]),
            "vhd" => ("vpc", &[]),
            "vhdx" => ("vhdx", &[]),
            "vhdfixed" => ("vpc", &["-o", "subformat=fixed"]),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unsupported disk format: {}", format),
                ))
            }
        };

        let target = raw.with_extension(format);
        info!("creating {} disk format {}", format, target.display());
        qemu_img_convert(&*self.runner, raw, &target, qemu_format, options)?;
        Ok(target)
    }
}

/// Everything the disk builder delegates to.
pub struct Collaborators {
    pub boot_image:         Box<dyn BootImage>,
    pub disk_setup:         Box<dyn DiskSetup>,
    pub bootloader_config:  Box<dyn BootLoaderConfig>,
    pub bootloader_install: Box<dyn BootLoaderInstall>,
    pub install_media:      Box<dyn InstallMedia>,
    pub disk_format:        Box<dyn DiskFormat>,
    pub system_setup:       Box<dyn SystemSetup>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use external::Recorder;

    #[test]
    fn qemu_img_formats() {
        let recorder = Recorder::new();
        let mut format = QemuImgFormat::new(recorder.clone());
        let raw = Path::new("/var/tmp/leap.x86_64.raw");

        assert_eq!(
            format.create_image_format(raw, "vhdfixed").unwrap(),
            Path::new("/var/tmp/leap.x86_64.vhdfixed")
        );
        format.create_image_format(raw, "qcow2").unwrap();
        assert!(format.create_image_format(raw, "floppy").is_err());

        assert_eq!(recorder.lines(), vec![
            "qemu-img convert -f raw /var/tmp/leap.x86_64.raw -O vpc -o subformat=fixed \
             /var/tmp/leap.x86_64.vhdfixed",
            "qemu-img convert -f raw /var/tmp/leap.x86_64.raw -O qcow2 /var/tmp/leap.x86_64.qcow2",
        ]);
    }
}
