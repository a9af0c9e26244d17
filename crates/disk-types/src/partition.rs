use std::fmt;

/// The partition type tag applied when a partition is created.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PartitionKind {
    Linux,
    Lvm,
    Raid,
    Efi,
    Csm,
    Prep,
}

/// A hint set on a partition after it was created.
///
/// Flags are best effort: a table that cannot express a flag logs and skips it.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PartitionFlag {
    /// Marks the partition as active / bootable.
    Active,
    /// Sets the partition type.
    Kind(PartitionKind),
}

impl From<PartitionKind> for PartitionFlag {
    fn from(kind: PartitionKind) -> Self { PartitionFlag::Kind(kind) }
}

impl fmt::Display for PartitionFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PartitionFlag::Active => f.write_str("f.active"),
            PartitionFlag::Kind(kind) => write!(f, "t.{}", match kind {
                PartitionKind::Linux => "linux",
                PartitionKind::Lvm => "lvm",
                PartitionKind::Raid => "raid",
                PartitionKind::Efi => "efi",
                PartitionKind::Csm => "csm",
                PartitionKind::Prep => "prep",
            }),
        }
    }
}

/// Requested size of a new partition.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PartitionSize {
    /// A fixed size, in mebibytes.
    Megabytes(u64),
    /// Everything from the current position to the end of the disk.
    AllFree,
}

impl fmt::Display for PartitionSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PartitionSize::Megabytes(mb) => write!(f, "{}M", mb),
            PartitionSize::AllFree => f.write_str("all_free"),
        }
    }
}
