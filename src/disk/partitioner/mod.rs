//! Partition table writers.
//!
//! Every table type assigns partition numbers the same way: each `create` call
//! takes the next number, and numbers are never handed out twice.

mod dasd;
mod gpt;
mod msdos;

pub use self::{dasd::DasdPartitioner, gpt::GptPartitioner, msdos::MsdosPartitioner};

use crate::storage::{DeviceProvider, StorageError};
use disk_types::{PartitionFlag, PartitionKind, PartitionSize, PartitionTable};

macro_rules! dispatch {
    ($self:expr, $part:ident => $action:expr) => {
        match $self {
            Partitioner::Msdos($part) => $action,
            Partitioner::Gpt($part) => $action,
            Partitioner::Dasd($part) => $action,
        }
    };
}

/// A partition table writer, selected by table type.
pub enum Partitioner {
    Msdos(MsdosPartitioner),
    Gpt(GptPartitioner),
    Dasd(DasdPartitioner),
}

impl Partitioner {
    pub fn new(table: PartitionTable, storage: &dyn DeviceProvider) -> Self {
        let device = storage.get_device().to_path_buf();
        let runner = storage.runner().clone();
        match table {
            PartitionTable::Msdos => Partitioner::Msdos(MsdosPartitioner::new(device, runner)),
            PartitionTable::Gpt => Partitioner::Gpt(GptPartitioner::new(device, runner)),
            PartitionTable::Dasd => Partitioner::Dasd(DasdPartitioner::new(device, runner)),
        }
    }

    /// Selects the partitioner by table name, failing for unknown table types.
    pub fn from_name(table: &str, storage: &dyn DeviceProvider) -> Result<Self, StorageError> {
        Ok(Self::new(table.parse::<PartitionTable>()?, storage))
    }

    pub fn table(&self) -> PartitionTable {
        match *self {
            Partitioner::Msdos(_) => PartitionTable::Msdos,
            Partitioner::Gpt(_) => PartitionTable::Gpt,
            Partitioner::Dasd(_) => PartitionTable::Dasd,
        }
    }

    /// Appends a partition, tags it with `kind` and applies `flags` to it.
    pub fn create(
        &mut self,
        name: &str,
        size: PartitionSize,
        kind: PartitionKind,
        flags: &[PartitionFlag],
    ) -> Result<(), StorageError> {
        info!("creating {} partition {} with size {}", self.table(), name, size);
        dispatch!(self, part => part.create(name, size, kind))?;

        let id = self.get_id();
        for &flag in flags {
            self.set_flag(id, flag)?;
        }

        Ok(())
    }

    /// The number of the most recently created partition.
    pub fn get_id(&self) -> u32 { dispatch!(self, part => part.partition_id) }

    /// Applies a flag to partition `id`. Flags the table cannot express are
    /// skipped with a warning.
    pub fn set_flag(&mut self, id: u32, flag: PartitionFlag) -> Result<(), StorageError> {
        dispatch!(self, part => part.set_flag(id, flag))
    }

    /// Mirrors the first partitions of a GPT into a protective hybrid MBR.
    pub fn set_hybrid_mbr(&mut self) -> Result<(), StorageError> {
        match self {
            Partitioner::Gpt(part) => part.set_hybrid_mbr(),
            _ => {
                warn!("hybrid MBR is only supported on gpt tables, not {}", self.table());
                Ok(())
            }
        }
    }

    /// Converts a GPT into a plain MBR.
    pub fn set_mbr(&mut self) -> Result<(), StorageError> {
        match self {
            Partitioner::Gpt(part) => part.set_mbr(),
            _ => {
                warn!("MBR conversion is only supported on gpt tables, not {}", self.table());
                Ok(())
            }
        }
    }

    /// Grows the table to the current size of the device.
    pub fn resize_table(&mut self, entries: Option<u32>) -> Result<(), StorageError> {
        match self {
            Partitioner::Gpt(part) => part.resize_table(entries.unwrap_or(128)),
            _ => {
                debug!("{} tables need no resize", self.table());
                Ok(())
            }
        }
    }
}
