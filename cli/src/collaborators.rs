//! Stand-ins for the boot image, bootloader and install media builders, which
//! this front end does not provide.

use distimage::{
    builder::{BootImage, BootLoaderConfig, BootLoaderInstall, InstallMedia},
    disk::PartitionIdMap,
    identifier::ImageIdentifier,
    storage::DeviceMap,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// A boot tree which was prepared beforehand, carrying its own kernel and
/// initrd below `boot/`.
pub struct PreparedBootImage {
    root:   PathBuf,
    target: PathBuf,
}

impl PreparedBootImage {
    pub fn new<R: Into<PathBuf>, T: Into<PathBuf>>(root: R, target: T) -> Self {
        PreparedBootImage { root: root.into(), target: target.into() }
    }

    fn find_initrd(&self) -> io::Result<PathBuf> {
        let boot = self.root.join("boot");
        for entry in fs::read_dir(&boot)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("initrd") || name.starts_with("initramfs") {
                return Ok(entry.path());
            }
        }

        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no initrd found in {}", boot.display()),
        ))
    }
}

impl BootImage for PreparedBootImage {
    fn required(&self) -> bool { true }

    fn prepare(&mut self) -> io::Result<()> {
        if self.root.join("boot").is_dir() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("boot tree {} has no boot directory", self.root.display()),
            ))
        }
    }

    fn boot_root_directory(&self) -> &Path { &self.root }

    fn create_initrd(&mut self, mbrid: &ImageIdentifier) -> io::Result<PathBuf> {
        let initrd = self.find_initrd()?;
        info!("using prepared initrd {} for image {}", initrd.display(), mbrid);
        let copy = self.target.join("initrd.prepared");
        fs::copy(&initrd, &copy)?;
        Ok(copy)
    }
}

/// Leaves the bootloader to a later stage of the image pipeline.
pub struct ExternalBootLoader;

impl BootLoaderConfig for ExternalBootLoader {
    fn setup_disk_boot_images(&mut self, boot_uuid: &str) -> io::Result<()> {
        info!("boot images are expected on the partition with uuid {}", boot_uuid);
        Ok(())
    }

    fn setup_disk_image_config(&mut self, boot_uuid: &str, ids: &PartitionIdMap) -> io::Result<()> {
        for (name, value) in ids {
            debug!("{} = {} (boot uuid {})", name, value, boot_uuid);
        }
        Ok(())
    }

    fn write(&mut self) -> io::Result<()> {
        warn!("bootloader configuration is not written by this front end");
        Ok(())
    }
}

impl BootLoaderInstall for ExternalBootLoader {
    fn install(&mut self, storage: &Path, devices: &DeviceMap) -> io::Result<()> {
        let roles = devices.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
        warn!("bootloader is not installed on {} (roles: {})", storage.display(), roles);
        Ok(())
    }
}

/// Refuses to build install media.
pub struct NoInstallMedia;

impl InstallMedia for NoInstallMedia {
    fn create_install_iso(&mut self, _raw: &Path) -> io::Result<PathBuf> {
        Err(io::Error::new(io::ErrorKind::Other, "install images are not supported"))
    }

    fn create_install_pxe_archive(&mut self, _raw: &Path) -> io::Result<PathBuf> {
        Err(io::Error::new(io::ErrorKind::Other, "PXE install archives are not supported"))
    }
}
