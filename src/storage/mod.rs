//! The storage chain of a disk image: loop device, RAID and LUKS wrappers,
//! and the release handles which tear them down again.

mod device;
mod error;
mod loop_device;
mod luks;
mod raid;
mod release;

pub use self::{
    device::{DeviceMap, DeviceProvider, MappedDevice},
    error::StorageError,
    loop_device::LoopDevice,
    luks::LuksDevice,
    raid::RaidDevice,
    release::{ReleaseError, ReleaseHandle, ReleaseStack, Resource},
};

pub(crate) use self::{luks::luks_profile, raid::raid_level_number};
