use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Specifies which partition table layout is written to a disk.
#[derive(Debug, PartialEq, Clone, Copy, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionTable {
    Msdos,
    Gpt,
    Dasd,
}

/// A possible error when selecting the partition table.
#[derive(Debug, Fail, PartialEq)]
pub enum PartitionTableError {
    #[fail(display = "support for partition table type '{}' not implemented", table)]
    Unsupported { table: String },
}

impl FromStr for PartitionTable {
    type Err = PartitionTableError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "msdos" => Ok(PartitionTable::Msdos),
            "gpt" => Ok(PartitionTable::Gpt),
            "dasd" => Ok(PartitionTable::Dasd),
            other => Err(PartitionTableError::Unsupported { table: other.into() }),
        }
    }
}

impl fmt::Display for PartitionTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            PartitionTable::Msdos => "msdos",
            PartitionTable::Gpt => "gpt",
            PartitionTable::Dasd => "dasd",
        })
    }
}
