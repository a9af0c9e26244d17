use crate::errors::{BuildError, Error};
use std::fmt;

/// Disk build step
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Validate,
    BootImage,
    CreateDisk,
    Partition,
    Raid,
    Luks,
    BootFilesystems,
    RootFilesystem,
    Fstab,
    Metadata,
    Initrd,
    BootFiles,
    BootLoaderConfig,
    BootLoaderInstall,
    Identifier,
    Sync,
    InstallMedia,
    Unpartitioned,
    DiskFormat,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Step::Validate => "validation",
            Step::BootImage => "boot image preparation",
            Step::CreateDisk => "disk creation",
            Step::Partition => "partitioning",
            Step::Raid => "raid",
            Step::Luks => "luks",
            Step::BootFilesystems => "boot file system",
            Step::RootFilesystem => "root file system",
            Step::Fstab => "fstab",
            Step::Metadata => "boot metadata",
            Step::Initrd => "initrd",
            Step::BootFiles => "boot files",
            Step::BootLoaderConfig => "bootloader configuration",
            Step::BootLoaderInstall => "bootloader installation",
            Step::Identifier => "disk identifier",
            Step::Sync => "data sync",
            Step::InstallMedia => "install media",
            Step::Unpartitioned => "unpartitioned space",
            Step::DiskFormat => "disk format",
        })
    }
}

/// Runs a build step, tagging its failure with the step.
pub(crate) fn apply<T, F>(step: Step, action: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, BuildError>,
{
    info!("starting {} step", step);
    action().map_err(|why| {
        error!("{} error: {}", step, why);
        Error { step, why }
    })
}
