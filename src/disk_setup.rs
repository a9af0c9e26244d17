//! Decisions which have to be made before the disk can be created: whether a
//! boot partition is needed, the partition labels and the size of the disk.

use crate::{
    builder::{DiskBuildConfig, ImageType},
    firmware::FirmWare,
    usage::{directory_size, file_count, mebibytes},
    volume_manager::{VolumeManagerName, VolumeSize},
};
use disk_types::FileSystem as FileSystemType;
use std::path::{Path, PathBuf};

const MIN_VOLUME_MBYTES: u64 = 30;
const INODE_SIZE: u64 = 256;

pub trait DiskSetup {
    /// Whether the disk gets a dedicated boot partition.
    fn need_boot_partition(&self) -> bool;

    /// Size in MB of the boot partition, or zero without one.
    fn boot_partition_size(&self) -> u64;

    fn get_boot_label(&self) -> String;

    fn get_root_label(&self) -> String;

    fn get_efi_label(&self) -> String;

    /// Size in MB of the disk to create.
    fn get_disksize_mbytes(&self) -> u64;
}

/// Derives the disk setup from the build description and the source tree.
pub struct StandardDiskSetup {
    config:   DiskBuildConfig,
    firmware: FirmWare,
    root_dir: PathBuf,
}

impl StandardDiskSetup {
    pub fn new<P: Into<PathBuf>>(config: &DiskBuildConfig, firmware: FirmWare, root_dir: P) -> Self {
        StandardDiskSetup { config: config.clone(), firmware, root_dir: root_dir.into() }
    }

    /// The source tree size in MB, grown by the overhead of the file system.
    fn root_filesystem_mbytes(&self) -> u64 {
        let mbytes = mebibytes(directory_size(&self.root_dir, &[]));
        match self.config.root_filesystem() {
            Some(FileSystemType::Ext2) | Some(FileSystemType::Ext3) | Some(FileSystemType::Ext4) => {
                let inode_mbytes = mebibytes(file_count(&self.root_dir) * INODE_SIZE);
                mbytes * 3 / 2 + 2 * inode_mbytes
            }
            Some(FileSystemType::Btrfs) | Some(FileSystemType::Xfs) => mbytes * 3 / 2,
            _ => mbytes,
        }
    }

    /// MB to add so that fixed size volumes fit next to the system data.
    fn volume_mbytes(&self) -> u64 {
        self.config
            .volumes
            .iter()
            .filter(|volume| !volume.realpath.trim_matches('/').is_empty())
            .map(|volume| {
                let add = match volume.size {
                    VolumeSize::Freespace(mbytes) => mbytes + MIN_VOLUME_MBYTES,
                    VolumeSize::Size(mbytes) => {
                        let path = volume_path(&self.root_dir, &volume.realpath);
                        mbytes.saturating_sub(mebibytes(directory_size(&path, &[])))
                    }
                    VolumeSize::AllFree => return 0,
                };

                if add == 0 {
                    warn!("volume size for {} is too small, skipped", volume.realpath);
                }
                add
            })
            .sum()
    }
}

fn volume_path(root: &Path, realpath: &str) -> PathBuf { root.join(realpath.trim_start_matches('/')) }

impl DiskSetup for StandardDiskSetup {
    fn need_boot_partition(&self) -> bool {
        if let Some(requested) = self.config.bootpartition {
            return requested;
        }

        self.config.mdraid.is_some()
            || self.config.volume_manager.is_some()
            || self.config.luks.is_some()
            || match self.config.filesystem {
                Some(FileSystemType::Btrfs) | Some(FileSystemType::Xfs) => true,
                _ => false,
            }
    }

    fn boot_partition_size(&self) -> u64 {
        if self.need_boot_partition() { self.config.boot_partition_mbytes } else { 0 }
    }

    fn get_boot_label(&self) -> String { "BOOT".into() }

    fn get_root_label(&self) -> String {
        self.config.root_label.clone().unwrap_or_else(|| "ROOT".into())
    }

    fn get_efi_label(&self) -> String { "EFI".into() }

    fn get_disksize_mbytes(&self) -> u64 {
        info!("precalculating required disk size");
        let root_mbytes = self.root_filesystem_mbytes();
        info!("--> system data with file system overhead needs {} MB", root_mbytes);

        let mut parts = vec![("spare space", self.config.disk_spare_mbytes)];
        if self.config.volume_manager == Some(VolumeManagerName::Lvm)
            && self.config.build_type == ImageType::Vmx
        {
            parts.push(("volume(s) size setup", self.volume_mbytes()));
        }
        parts.push(("legacy bios boot partition", self.firmware.get_legacy_bios_partition_size()));
        parts.push(("boot partition", self.boot_partition_size()));
        parts.push(("EFI partition", self.firmware.get_efi_partition_size()));
        parts.push(("PReP partition", self.firmware.get_prep_partition_size()));

        let calculated = parts.into_iter().filter(|&(_, mbytes)| mbytes != 0).fold(
            root_mbytes,
            |total, (what, mbytes)| {
                info!("--> {} adding {} MB", what, mbytes);
                total + mbytes
            },
        );

        match self.config.disk_mbytes {
            Some(configured) => {
                info!("using configured disk size: {} MB", configured);
                if configured < calculated {
                    warn!("--> configured size smaller than calculated size: {} MB", calculated);
                }
                configured
            }
            None => {
                info!("using calculated disk size: {} MB", calculated);
                calculated
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{firmware::Firmware, volume_manager::Volume};
    use tempdir::TempDir;

    fn setup(config: &DiskBuildConfig, root: &Path) -> StandardDiskSetup {
        let firmware = FirmWare::new(&config.arch, config.firmware)
            .unwrap()
            .efi_csm(config.efi_csm)
            .sizes(config.firmware_sizes());
        StandardDiskSetup::new(config, firmware, root)
    }

    fn config() -> DiskBuildConfig {
        DiskBuildConfig { arch: "x86_64".into(), ..DiskBuildConfig::default() }
    }

    #[test]
    fn boot_partition_decision() {
        let root = Path::new("/nonexistent");
        assert!(!setup(&config(), root).need_boot_partition());

        let xfs = DiskBuildConfig { filesystem: Some(FileSystemType::Xfs), ..config() };
        assert!(setup(&xfs, root).need_boot_partition());
        assert_eq!(setup(&xfs, root).boot_partition_size(), 200);

        let luks = DiskBuildConfig { luks: Some("secret".into()), ..config() };
        assert!(setup(&luks, root).need_boot_partition());

        let forced_off = DiskBuildConfig { bootpartition: Some(false), ..xfs };
        assert!(!setup(&forced_off, root).need_boot_partition());
        assert_eq!(setup(&forced_off, root).boot_partition_size(), 0);
    }

    #[test]
    fn labels() {
        let root = Path::new("/nonexistent");
        let disk = setup(&config(), root);
        assert_eq!(disk.get_root_label(), "ROOT");
        assert_eq!(disk.get_boot_label(), "BOOT");
        assert_eq!(disk.get_efi_label(), "EFI");

        let custom = DiskBuildConfig { root_label: Some("SYSTEM".into()), ..config() };
        assert_eq!(setup(&custom, root).get_root_label(), "SYSTEM");
    }

    #[test]
    fn disk_size_estimate() {
        let root = TempDir::new("distimage-setup").unwrap();
        misc::write(root.path().join("data"), vec![0u8; 4 * 1024 * 1024]).unwrap();

        // 4 MB of xfs data, spare, boot and EFI partitions.
        let efi = DiskBuildConfig {
            firmware: Some(Firmware::Efi),
            filesystem: Some(FileSystemType::Xfs),
            ..config()
        };
        assert_eq!(setup(&efi, root.path()).get_disksize_mbytes(), 6 + 200 + 200 + 200);

        let csm = DiskBuildConfig { efi_csm: true, ..efi.clone() };
        assert_eq!(setup(&csm, root.path()).get_disksize_mbytes(), 6 + 200 + 200 + 200 + 2);

        let fixed = DiskBuildConfig { disk_mbytes: Some(100), ..efi };
        assert_eq!(setup(&fixed, root.path()).get_disksize_mbytes(), 100);
    }

    #[test]
    fn lvm_volumes_add_space() {
        let root = TempDir::new("distimage-setup").unwrap();
        let lvm = DiskBuildConfig {
            filesystem: Some(FileSystemType::Fat32),
            bootpartition: Some(false),
            disk_spare_mbytes: 0,
            volume_manager: Some(VolumeManagerName::Lvm),
            volumes: vec![
                Volume { name: "LVhome".into(), realpath: "home".into(), size: VolumeSize::Size(100) },
                Volume { name: "LVsrv".into(), realpath: "srv".into(), size: VolumeSize::Freespace(10) },
                Volume { name: "LVvar".into(), realpath: "var".into(), size: VolumeSize::AllFree },
            ],
            ..config()
        };

        assert_eq!(setup(&lvm, root.path()).get_disksize_mbytes(), 100 + 10 + MIN_VOLUME_MBYTES);
    }
}
