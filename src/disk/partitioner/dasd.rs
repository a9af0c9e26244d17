use crate::storage::StorageError;
use disk_types::{PartitionFlag, PartitionKind, PartitionSize};
use external::{fdasd_script, SharedRunner};
use std::path::PathBuf;

/// Writes DASD volume tables through fdasd. DASD partitions carry no type.
pub struct DasdPartitioner {
    device:                  PathBuf,
    runner:                  SharedRunner,
    pub(super) partition_id: u32,
}

impl DasdPartitioner {
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
        let end = match size {
            PartitionSize::Megabytes(mbytes) => format!("+{}M", mbytes),
            PartitionSize::AllFree => String::new(),
        };

        if let Err(why) = fdasd_script(&*self.runner, &self.device, &format!("n\np\n\n{}\nw\nq\n", end)) {
            debug!("fdasd reported an error while creating {}: {}", name, why);
        }

        debug!("partition type {:?} is not applied on dasd tables", kind);
        Ok(())
    }

    pub(super) fn set_flag(&mut self, id: u32, flag: PartitionFlag) -> Result<(), StorageError> {
        warn!("partition flag {} on partition {} is not supported on dasd tables, ignored", flag, id);
        Ok(())
    }
}
