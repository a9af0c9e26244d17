use crate::{
    errors::{BuildError, IoContext},
    firmware::{host_arch, FirmWare, Firmware, FirmwareSizes},
    volume_manager::{Volume, VolumeManagerName},
};
use disk_types::FileSystem as FileSystemType;
use serde::{Deserialize, Serialize};
use std::{fmt, io, path::Path};

/// The kind of image a build description asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// A disk image, which may also be turned into install media.
    Oem,
    /// A disk image for virtual machines.
    Vmx,
    Iso,
    Pxe,
    Tbz,
}

impl ImageType {
    pub fn is_disk(self) -> bool {
        match self {
            ImageType::Oem | ImageType::Vmx => true,
            _ => false,
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ImageType::Oem => "oem",
            ImageType::Vmx => "vmx",
            ImageType::Iso => "iso",
            ImageType::Pxe => "pxe",
            ImageType::Tbz => "tbz",
        })
    }
}

/// Everything a disk build needs to know, as read from a JSON build description.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct DiskBuildConfig {
    #[default = "distimage"]
    pub name:                  String,
    #[default(host_arch())]
    pub arch:                  String,
    #[default(ImageType::Vmx)]
    pub build_type:            ImageType,
    /// Defaults to the firmware of the architecture.
    pub firmware:              Option<Firmware>,
    /// Adds a BIOS boot partition to EFI disks on x86.
    pub efi_csm:               bool,
    pub gpt_hybrid_mbr:        bool,
    /// Replaces the GPT of EFI disks with a plain MBR; wins over `gpt_hybrid_mbr`.
    pub force_mbr:             bool,
    pub zipl_target_type:      Option<String>,
    pub filesystem:            Option<FileSystemType>,
    pub filesystem_args:       Vec<String>,
    pub boot_filesystem:       Option<FileSystemType>,
    pub root_label:            Option<String>,
    /// Forces a dedicated boot partition on or off.
    pub bootpartition:         Option<bool>,
    #[default = 200]
    pub boot_partition_mbytes: u64,
    #[default = 200]
    pub efi_partition_mbytes:  u64,
    #[default = 2]
    pub legacy_bios_mbytes:    u64,
    #[default = 8]
    pub prep_mbytes:           u64,
    pub volume_manager:        Option<VolumeManagerName>,
    pub volumes:               Vec<Volume>,
    #[default = "systemVG"]
    pub volume_group_name:     String,
    /// `mirroring` or `striping`.
    pub mdraid:                Option<String>,
    /// The LUKS passphrase.
    pub luks:                  Option<String>,
    pub luks_os:               Option<String>,
    pub luks_format_options:   Vec<String>,
    /// `dom0` installs the xen hypervisor next to the kernel.
    pub domain:                Option<String>,
    pub install_iso:           bool,
    pub install_stick:         bool,
    pub install_pxe:           bool,
    /// Disk format to convert the raw disk to, such as `qcow2`.
    pub format:                Option<String>,
    pub target_blocksize:      Option<u32>,
    pub unpartitioned_mbytes:  Option<u64>,
    /// A fixed disk size, used instead of the estimate.
    pub disk_mbytes:           Option<u64>,
    #[default = 200]
    pub disk_spare_mbytes:     u64,
    pub bundle_compression:    bool,
}

impl DiskBuildConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = misc::open(path)?;
        serde_json::from_reader(io::BufReader::new(file))
            .map_err(io::Error::from)
            .with_context(|why| format!("invalid build description at {:?}: {}", path, why))
    }

    pub fn firmware_sizes(&self) -> FirmwareSizes {
        FirmwareSizes {
            legacy_bios: self.legacy_bios_mbytes,
            efi:         self.efi_partition_mbytes,
            prep:        self.prep_mbytes,
        }
    }

    /// The firmware model of the target architecture.
    pub fn firmware_model(&self) -> Result<FirmWare, BuildError> {
        Ok(FirmWare::new(&self.arch, self.firmware)?
            .zipl_target_type(self.zipl_target_type.clone())
            .efi_csm(self.efi_csm)
            .sizes(self.firmware_sizes()))
    }

    pub fn install_media(&self) -> bool { self.install_iso || self.install_stick || self.install_pxe }

    /// The file system of the root volume or partition.
    pub fn root_filesystem(&self) -> Option<FileSystemType> {
        match self.volume_manager {
            Some(VolumeManagerName::Btrfs) => Some(FileSystemType::Btrfs),
            _ => self.filesystem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume_manager::VolumeSize;
    use tempdir::TempDir;

    #[test]
    fn defaults() {
        let config: DiskBuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.name, "distimage");
        assert_eq!(config.build_type, ImageType::Vmx);
        assert_eq!(config.volume_group_name, "systemVG");
        assert_eq!(config.boot_partition_mbytes, 200);
        assert_eq!(config.disk_spare_mbytes, 200);
        assert_eq!(config.firmware_sizes(), FirmwareSizes::default());
        assert!(!config.efi_csm && !config.install_media());
        assert!(!config.force_mbr && !config.gpt_hybrid_mbr);
        assert_eq!(config.arch, host_arch());
    }

    #[test]
    fn description_from_file() {
        let dir = TempDir::new("distimage-config").unwrap();
        let path = dir.path().join("build.json");
        misc::write(&path, r#"{
            "name": "leap",
            "build_type": "oem",
            "firmware": "uefi",
            "filesystem": "xfs",
            "volume_manager": "lvm",
            "volumes": [
                { "name": "LVhome", "realpath": "home", "size": { "size": 1024 } },
                { "name": "LVvar", "realpath": "var", "size": "all_free" }
            ],
            "install_iso": true,
            "force_mbr": true,
            "format": "qcow2"
        }"#).unwrap();

        let config = DiskBuildConfig::from_file(&path).unwrap();
        assert_eq!(config.build_type, ImageType::Oem);
        assert_eq!(config.firmware, Some(Firmware::Uefi));
        assert_eq!(config.root_filesystem(), Some(FileSystemType::Xfs));
        assert_eq!(config.volumes[0].size, VolumeSize::Size(1024));
        assert_eq!(config.volumes[1].size, VolumeSize::AllFree);
        assert!(config.install_media() && config.force_mbr);
    }

    #[test]
    fn invalid_description() {
        let dir = TempDir::new("distimage-config").unwrap();
        let path = dir.path().join("build.json");
        misc::write(&path, r#"{ "build_type": "floppy" }"#).unwrap();
        assert!(DiskBuildConfig::from_file(&path).is_err());
    }
}
