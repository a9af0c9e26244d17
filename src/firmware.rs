//! Firmware dependent properties of a disk image.

use crate::errors::BuildError;
use disk_types::PartitionTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The firmware an image is built to boot with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    Bios,
    Efi,
    Uefi,
    Vboot,
    Ofw,
    Opal,
    Ec2,
    Ec2hvm,
}

impl Firmware {
    fn name(self) -> &'static str {
        match self {
            Firmware::Bios => "bios",
            Firmware::Efi => "efi",
            Firmware::Uefi => "uefi",
            Firmware::Vboot => "vboot",
            Firmware::Ofw => "ofw",
            Firmware::Opal => "opal",
            Firmware::Ec2 => "ec2",
            Firmware::Ec2hvm => "ec2hvm",
        }
    }
}

impl fmt::Display for Firmware {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name()) }
}

/// Sizes in MB of the firmware specific partitions.
#[derive(Debug, Clone, Copy, PartialEq, SmartDefault)]
pub struct FirmwareSizes {
    #[default = 2]
    pub legacy_bios: u64,
    #[default = 200]
    pub efi:         u64,
    #[default = 8]
    pub prep:        u64,
}

/// The architecture name of the build host, as used by [`FirmWare`].
pub fn host_arch() -> String {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        "powerpc" => "ppc",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        arch => arch,
    }
    .to_owned()
}

fn supported_firmware(arch: &str) -> &'static [Firmware] {
    use self::Firmware::*;
    match arch {
        "x86_64" => &[Efi, Uefi, Bios, Ec2hvm, Ec2],
        "i586" | "i686" => &[Bios],
        "aarch64" | "arm64" | "armv5el" | "armv5tel" | "armv6hl" | "armv6l" | "armv7hl"
        | "armv7l" => &[Efi, Uefi, Vboot],
        "ppc" => &[Ofw],
        "ppc64" | "ppc64le" => &[Ofw, Opal],
        _ => &[],
    }
}

fn default_firmware(arch: &str) -> Option<Firmware> {
    match arch {
        "x86_64" | "i586" | "i686" => Some(Firmware::Bios),
        "ppc" | "ppc64" | "ppc64le" => Some(Firmware::Ofw),
        arch if arch.starts_with("arm") || arch == "aarch64" => Some(Firmware::Efi),
        _ => None,
    }
}

/// Answers which partitions and boot modes the selected firmware calls for.
#[derive(Debug, Clone)]
pub struct FirmWare {
    arch:             String,
    firmware:         Option<Firmware>,
    zipl_target_type: Option<String>,
    efi_csm:          bool,
    sizes:            FirmwareSizes,
}

impl FirmWare {
    /// Validates `firmware` for `arch`, falling back to the default firmware
    /// of the architecture when none was requested.
    pub fn new(arch: &str, firmware: Option<Firmware>) -> Result<Self, BuildError> {
        let firmware = firmware.or_else(|| default_firmware(arch));
        if let Some(firmware) = firmware {
            if !supported_firmware(arch).contains(&firmware) {
                return Err(BuildError::UnsupportedFirmware {
                    firmware: firmware.to_string(),
                    arch:     arch.into(),
                });
            }
        } else if !arch.starts_with("s390") {
            return Err(BuildError::NoDefaultFirmware { arch: arch.into() });
        }

        Ok(FirmWare {
            arch: arch.into(),
            firmware,
            zipl_target_type: None,
            efi_csm: false,
            sizes: FirmwareSizes::default(),
        })
    }

    pub fn zipl_target_type<S: Into<String>>(mut self, target: Option<S>) -> Self {
        self.zipl_target_type = target.map(Into::into);
        self
    }

    /// Requests a BIOS boot partition next to the EFI partition on x86.
    pub fn efi_csm(mut self, efi_csm: bool) -> Self {
        self.efi_csm = efi_csm;
        self
    }

    pub fn sizes(mut self, sizes: FirmwareSizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn arch(&self) -> &str { &self.arch }

    pub fn firmware(&self) -> Option<Firmware> { self.firmware }

    pub fn get_partition_table_type(&self) -> PartitionTable {
        if self.arch.starts_with("s390") {
            match self.zipl_target_type {
                Some(ref target) if target.contains("LDL") || target.contains("CDL") => {
                    PartitionTable::Dasd
                }
                _ => PartitionTable::Msdos,
            }
        } else if self.efi_mode() {
            PartitionTable::Gpt
        } else {
            PartitionTable::Msdos
        }
    }

    /// A GPT disk which should also boot on x86 BIOS.
    pub fn legacy_bios_mode(&self) -> bool {
        self.efi_csm
            && self.get_partition_table_type() == PartitionTable::Gpt
            && ["x86_64", "i586", "i686"].contains(&self.arch.as_str())
    }

    pub fn efi_mode(&self) -> bool {
        match self.firmware {
            Some(Firmware::Efi) | Some(Firmware::Uefi) | Some(Firmware::Vboot) => true,
            _ => false,
        }
    }

    pub fn ec2_mode(&self) -> bool {
        match self.firmware {
            Some(Firmware::Ec2) | Some(Firmware::Ec2hvm) => true,
            _ => false,
        }
    }

    pub fn bios_mode(&self) -> bool { self.firmware == Some(Firmware::Bios) }

    pub fn ofw_mode(&self) -> bool { self.firmware == Some(Firmware::Ofw) }

    pub fn opal_mode(&self) -> bool { self.firmware == Some(Firmware::Opal) }

    pub fn get_legacy_bios_partition_size(&self) -> u64 {
        if self.legacy_bios_mode() { self.sizes.legacy_bios } else { 0 }
    }

    pub fn get_efi_partition_size(&self) -> u64 {
        if self.efi_mode() { self.sizes.efi } else { 0 }
    }

    pub fn get_prep_partition_size(&self) -> u64 {
        if self.ofw_mode() { self.sizes.prep } else { 0 }
    }
}
