use crate::{builder::Step, storage::StorageError};
use std::{fmt, io, path::PathBuf};

pub trait IoContext<T> {
    fn with_context<F: FnMut(io::Error) -> String>(self, func: F) -> io::Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_context<F: FnMut(io::Error) -> String>(self, mut func: F) -> io::Result<T> {
        self.map_err(|why| io::Error::new(why.kind(), func(why)))
    }
}

#[cfg_attr(rustfmt, rustfmt_skip)]
#[derive(Debug, Fail)]
pub enum BuildError {
    #[fail(display = "install media requires the oem build type, but {} was requested", build_type)]
    InstallMediaRequiresOem { build_type: String },
    #[fail(display = "{} does not describe a disk image", build_type)]
    NotADiskImage { build_type: String },
    #[fail(display = "system tree {:?} does not exist", path)]
    MissingSourceTree { path: PathBuf },
    #[fail(display = "no boot image setup is available for the system tree")]
    MissingBootSetup,
    #[fail(display = "no kernel found in {:?}", path)]
    MissingKernel { path: PathBuf },
    #[fail(display = "no hypervisor found in {:?}", path)]
    MissingHypervisor { path: PathBuf },
    #[fail(display = "volume manager {} cannot manage a {} root file system", manager, filesystem)]
    VolumeManagerMismatch { manager: String, filesystem: String },
    #[fail(display = "no root file system was configured")]
    MissingFilesystem,
    #[fail(display = "the disk has no root device")]
    MissingRootDevice,
    #[fail(display = "firmware {} is not supported on {}", firmware, arch)]
    UnsupportedFirmware { firmware: String, arch: String },
    #[fail(display = "no default firmware is known for {}", arch)]
    NoDefaultFirmware { arch: String },
    #[fail(display = "{}", why)]
    Storage { why: StorageError },
    #[fail(display = "{}", why)]
    Io { why: io::Error },
}

impl From<StorageError> for BuildError {
    fn from(why: StorageError) -> Self { BuildError::Storage { why } }
}

impl From<io::Error> for BuildError {
    fn from(why: io::Error) -> Self { BuildError::Io { why } }
}

/// A failed build, and the step at which it failed.
#[derive(Debug)]
pub struct Error {
    pub step: Step,
    pub why:  BuildError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} step failed: {}", self.step, self.why)
    }
}

impl std::error::Error for Error {}
