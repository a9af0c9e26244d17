//! Release handles for every OS-visible resource the storage chain acquires.
//!
//! Each acquisition hands back a [`ReleaseHandle`]. Handles are collected on a
//! [`ReleaseStack`], which releases them in the reverse order of acquisition.

use external::{
    cryptsetup_close, kpartx_delete, losetup_detach, mdadm_stop, umount_with_retry, vgdeactivate,
    CloseBy, Runner, SharedRunner,
};
use std::{fmt, fs, io, path::PathBuf};

/// A resource which must be given back to the system once the build is over.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// A loop device bound to an image file.
    Loop { device: PathBuf },
    /// Device maps of the partitions on a loop device.
    PartitionMaps { device: PathBuf },
    /// An assembled RAID array.
    Raid { array: PathBuf },
    /// An opened LUKS mapping.
    Luks { name: String },
    /// A mounted file system.
    Mount { target: PathBuf },
    /// An active volume group.
    VolumeGroup { name: String },
    /// A temporary directory used as a mount point.
    MountDir { path: PathBuf },
}

impl Resource {
    fn release(&self, runner: &dyn Runner) -> io::Result<()> {
        match *self {
            Resource::Loop { ref device } => losetup_detach(runner, device),
            Resource::PartitionMaps { ref device } => kpartx_delete(runner, device),
            Resource::Raid { ref array } => mdadm_stop(runner, array),
            Resource::Luks { ref name } => cryptsetup_close(runner, CloseBy::Name(name)),
            Resource::Mount { ref target } => umount_with_retry(runner, target),
            Resource::VolumeGroup { ref name } => vgdeactivate(runner, name),
            Resource::MountDir { ref path } => fs::remove_dir(path),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Resource::Loop { ref device } => write!(f, "loop device {}", device.display()),
            Resource::PartitionMaps { ref device } => {
                write!(f, "partition device maps of {}", device.display())
            }
            Resource::Raid { ref array } => write!(f, "RAID array {}", array.display()),
            Resource::Luks { ref name } => write!(f, "LUKS mapping {}", name),
            Resource::Mount { ref target } => write!(f, "mount at {}", target.display()),
            Resource::VolumeGroup { ref name } => write!(f, "volume group {}", name),
            Resource::MountDir { ref path } => write!(f, "mount point {}", path.display()),
        }
    }
}

/// A resource that could not be released.
#[derive(Debug, Fail)]
#[fail(display = "cleanup of {} failed, still busy: {}", resource, why)]
pub struct ReleaseError {
    pub resource: Resource,
    pub why:      io::Error,
}

/// Owns the release action of one acquired resource.
pub struct ReleaseHandle {
    resource: Resource,
    runner:   SharedRunner,
    released: bool,
}

impl ReleaseHandle {
    pub fn new(resource: Resource, runner: SharedRunner) -> Self {
        Self { resource, runner, released: false }
    }

    pub fn resource(&self) -> &Resource { &self.resource }

    pub fn is_released(&self) -> bool { self.released }

    /// Gives the resource back. Only the first call has an effect.
    pub fn release(&mut self) -> Result<(), ReleaseError> {
        if self.released {
            debug!("{} was already released", self.resource);
            return Ok(());
        }

        self.released = true;
        info!("cleaning up {}", self.resource);
        self.resource
            .release(&*self.runner)
            .map_err(|why| ReleaseError { resource: self.resource.clone(), why })
    }
}

impl fmt::Debug for ReleaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReleaseHandle")
            .field("resource", &self.resource)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for ReleaseHandle {
    fn drop(&mut self) {
        if !self.released {
            if let Err(why) = self.release() {
                warn!("{}", why);
            }
        }
    }
}

/// Release handles in the order in which their resources were acquired.
#[derive(Debug, Default)]
pub struct ReleaseStack {
    handles: Vec<ReleaseHandle>,
}

impl ReleaseStack {
    pub fn push(&mut self, handle: ReleaseHandle) { self.handles.push(handle); }

    pub fn len(&self) -> usize { self.handles.len() }

    pub fn is_empty(&self) -> bool { self.handles.is_empty() }

    /// Releases every handle, most recent first, collecting the failures.
    pub fn unwind(&mut self) -> Vec<ReleaseError> {
        let mut errors = Vec::new();
        while let Some(mut handle) = self.handles.pop() {
            if let Err(why) = handle.release() {
                errors.push(why);
            }
        }

        errors
    }
}

impl Extend<ReleaseHandle> for ReleaseStack {
    fn extend<I: IntoIterator<Item = ReleaseHandle>>(&mut self, iter: I) {
        self.handles.extend(iter);
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        for why in self.unwind() {
            warn!("{}", why);
        }
    }
}
