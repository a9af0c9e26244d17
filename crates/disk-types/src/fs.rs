use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Describes a file system format, such as ext4 or fat32.
#[derive(Debug, PartialEq, Copy, Clone, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSystem {
    Btrfs,
    Ext2,
    Ext3,
    Ext4,
    Fat16,
    Fat32,
    Swap,
    Xfs,
}

impl FileSystem {
    /// The type name handed to `mount(2)` for this file system.
    pub fn mount_type(self) -> &'static str {
        match self {
            FileSystem::Fat16 | FileSystem::Fat32 => "vfat",
            fs => fs.into(),
        }
    }

    /// Whether data can be synchronized into this file system by mounting it.
    pub fn is_mountable(self) -> bool { self != FileSystem::Swap }
}

impl FromStr for FileSystem {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let type_ = match string.to_lowercase().as_str() {
            "btrfs" => FileSystem::Btrfs,
            "ext2" => FileSystem::Ext2,
            "ext3" => FileSystem::Ext3,
            "ext4" => FileSystem::Ext4,
            "fat16" => FileSystem::Fat16,
            "fat32" | "vfat" => FileSystem::Fat32,
            "swap" => FileSystem::Swap,
            "xfs" => FileSystem::Xfs,
            _ => return Err("invalid file system name"),
        };
        Ok(type_)
    }
}

impl From<FileSystem> for &'static str {
    fn from(val: FileSystem) -> Self {
        match val {
            FileSystem::Btrfs => "btrfs",
            FileSystem::Ext2 => "ext2",
            FileSystem::Ext3 => "ext3",
            FileSystem::Ext4 => "ext4",
            FileSystem::Fat16 => "fat16",
            FileSystem::Fat32 => "fat32",
            FileSystem::Swap => "swap",
            FileSystem::Xfs => "xfs",
        }
    }
}

impl fmt::Display for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let str: &'static str = (*self).into();
        f.write_str(str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat_variants_mount_as_vfat() {
        assert_eq!(FileSystem::Fat16.mount_type(), "vfat");
        assert_eq!(FileSystem::Fat32.mount_type(), "vfat");
        assert_eq!(FileSystem::Xfs.mount_type(), "xfs");
    }

    #[test]
    fn names_parse_back() {
        for fs in &[FileSystem::Btrfs, FileSystem::Ext4, FileSystem::Fat16, FileSystem::Swap] {
            assert_eq!(fs.to_string().parse::<FileSystem>(), Ok(*fs));
        }
        assert!("ntfs".parse::<FileSystem>().is_err());
    }
}
