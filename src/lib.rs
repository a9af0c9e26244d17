//! A crate for building bootable disk images from a prepared system tree

extern crate dirs;
extern crate disk_types;
extern crate distimage_external_commands as external;
extern crate distimage_utils as misc;
extern crate failure;
#[macro_use]
extern crate failure_derive;
extern crate fern;
#[macro_use]
extern crate log;
extern crate rand;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate smart_default;
extern crate tempdir;
extern crate walkdir;

pub mod builder;
pub mod disk;
pub mod disk_setup;
pub mod errors;
pub mod filesystem;
pub mod firmware;
pub mod fstab;
pub mod identifier;
pub mod kernel;
mod logging;
pub mod storage;
pub mod usage;
pub mod volume_manager;

pub use self::{
    builder::{BuildResult, Collaborators, DiskBuildConfig, DiskBuilder, ImageType, Step},
    disk_setup::{DiskSetup, StandardDiskSetup},
    errors::{BuildError, Error},
    firmware::{FirmWare, Firmware},
    logging::log,
};
pub use disk_types::{FileSystem as FileSystemType, PartitionTable};
pub use external::{Runner, SharedRunner, System};
