use crate::storage::StorageError;
use disk_types::{PartitionFlag, PartitionKind, PartitionSize};
use external::{fdisk_script, sfdisk_activate, sfdisk_part_type, SharedRunner};
use std::path::PathBuf;

/// Writes DOS (MBR) partition tables through fdisk and sfdisk.
pub struct MsdosPartitioner {
    device:                  PathBuf,
    runner:                  SharedRunner,
    pub(super) partition_id: u32,
}

impl MsdosPartitioner {
    pub fn new(device: PathBuf, runner: SharedRunner) -> Self {
        Self { device, runner, partition_id: 0 }
    }

    pub(super) fn create(
        &mut self,
        name: &str,
        size: PartitionSize,
        kind: PartitionKind,
    ) -> Result<(), StorageError> {
        self.partition_id += 1;
        let id = self.partition_id;
        let script = match size {
            PartitionSize::Megabytes(mbytes) => format!("n\np\n{}\n\n+{}M\nw\nq\n", id, mbytes),
            PartitionSize::AllFree => format!("n\np\n{}\n\n\nw\nq\n", id),
        };

        // fdisk fails to re-read the table of a busy device after writing it.
        if let Err(why) = fdisk_script(&*self.runner, &self.device, &script) {
            debug!("fdisk reported an error while creating {}: {}", name, why);
        }

        self.set_flag(id, kind.into())
    }

    pub(super) fn set_flag(&mut self, id: u32, flag: PartitionFlag) -> Result<(), StorageError> {
        let result = match flag {
            PartitionFlag::Active => sfdisk_activate(&*self.runner, &self.device, id),
            PartitionFlag::Kind(kind) => match type_code(kind) {
                Some(code) => sfdisk_part_type(&*self.runner, &self.device, id, code),
                None => {
                    warn!("partition flag {} is not supported on msdos tables, ignored", flag);
                    return Ok(());
                }
            },
        };

        result.map_err(|why| StorageError::PartitionFlag { id, flag: flag.to_string(), why })
    }
}

fn type_code(kind: PartitionKind) -> Option<&'static str> {
    match kind {
        PartitionKind::Linux => Some("83"),
        PartitionKind::Lvm => Some("8e"),
        PartitionKind::Raid => Some("fd"),
        PartitionKind::Prep => Some("41"),
        PartitionKind::Efi | PartitionKind::Csm => None,
    }
}
