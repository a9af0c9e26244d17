use crate::storage::StorageError;
use disk_types::{PartitionFlag, PartitionKind, PartitionSize};
use external::{
    sgdisk_hybrid, sgdisk_info, sgdisk_mbr, sgdisk_new, sgdisk_resize_table, sgdisk_typecode,
    SharedRunner,
};
use std::path::PathBuf;

/// Writes GUID partition tables through sgdisk.
pub struct GptPartitioner {
    device:                  PathBuf,
    runner:                  SharedRunner,
    pub(super) partition_id: u32,
}

impl GptPartitioner {
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
        let mbytes = match size {
            PartitionSize::Megabytes(mbytes) => Some(mbytes),
            PartitionSize::AllFree => None,
        };

        sgdisk_new(&*self.runner, &self.device, id, name, mbytes).map_err(|why| {
            StorageError::PartitionCreate { id, name: name.into(), why }
        })?;

        self.set_flag(id, kind.into())
    }

    pub(super) fn set_flag(&mut self, id: u32, flag: PartitionFlag) -> Result<(), StorageError> {
        match flag {
            PartitionFlag::Kind(kind) => sgdisk_typecode(&*self.runner, &self.device, id, type_code(kind))
                .map_err(|why| StorageError::PartitionFlag { id, flag: flag.to_string(), why }),
            PartitionFlag::Active => {
                warn!("partition flag {} is not supported on gpt tables, ignored", flag);
                Ok(())
            }
        }
    }

    /// Creates a hybrid MBR from at most the first three partitions.
    pub(super) fn set_hybrid_mbr(&mut self) -> Result<(), StorageError> {
        let ids = (1..=self.partition_id.min(3)).collect::<Vec<u32>>();
        if ids.is_empty() {
            return Ok(());
        }

        info!("creating hybrid MBR from partitions {:?}", ids);
        sgdisk_hybrid(&*self.runner, &self.device, &ids).map_err(|why| {
            StorageError::PartitionFlag { id: ids[ids.len() - 1], flag: "hybrid mbr".into(), why }
        })
    }

    /// Replaces the GPT with an MBR carrying every partition. The EFI
    /// partition, which an MBR cannot express, is retyped to linux.
    pub(super) fn set_mbr(&mut self) -> Result<(), StorageError> {
        let ids = (1..=self.partition_id).collect::<Vec<u32>>();
        if ids.is_empty() {
            return Ok(());
        }

        let mut efi = None;
        for &id in &ids {
            let info = sgdisk_info(&*self.runner, &self.device, id).map_err(|why| {
                StorageError::Query { device: self.device.clone(), why }
            })?;
            if info.contains("(EFI System)") {
                efi = Some(id);
            }
        }

        info!("converting partition table to MBR with partitions {:?}", ids);
        sgdisk_mbr(&*self.runner, &self.device, &ids).map_err(|why| StorageError::PartitionFlag {
            id: ids[ids.len() - 1],
            flag: "mbr".into(),
            why,
        })?;

        match efi {
            Some(id) => self.set_flag(id, PartitionFlag::Kind(PartitionKind::Linux)),
            None => Ok(()),
        }
    }

    pub(super) fn resize_table(&mut self, entries: u32) -> Result<(), StorageError> {
        sgdisk_resize_table(&*self.runner, &self.device, entries).map_err(|why| {
            StorageError::PartitionTableResize { device: self.device.clone(), why }
        })
    }
}

fn type_code(kind: PartitionKind) -> &'static str {
    match kind {
        PartitionKind::Linux => "8300",
        PartitionKind::Lvm => "8E00",
        PartitionKind::Raid => "FD00",
        PartitionKind::Efi => "EF00",
        PartitionKind::Csm => "EF02",
        PartitionKind::Prep => "4100",
    }
}
