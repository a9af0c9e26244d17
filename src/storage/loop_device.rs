use super::{DeviceProvider, ReleaseHandle, Resource, StorageError};
use external::{losetup_attach, qemu_img_create, SharedRunner};
use std::path::{Path, PathBuf};

/// A loop device bound to a sparse image file.
pub struct LoopDevice {
    filename: PathBuf,
    device:   PathBuf,
    runner:   SharedRunner,
}

impl LoopDevice {
    /// Creates the image file, unless it already exists, and binds it to the
    /// next free loop device.
    ///
    /// When `filesize_mbytes` is given the file is (re)created with that size.
    /// A `blocksize` other than 512 bytes sets the logical sector size.
    pub fn create<P: Into<PathBuf>>(
        runner: SharedRunner,
        filename: P,
        filesize_mbytes: Option<u64>,
        blocksize: Option<u32>,
    ) -> Result<(Self, ReleaseHandle), StorageError> {
        let filename = filename.into();
        match filesize_mbytes {
            Some(mbytes) => {
                info!("creating {} MB sparse image at {}", mbytes, filename.display());
                qemu_img_create(&*runner, &filename, mbytes).map_err(|why| {
                    StorageError::LoopCreate { path: filename.clone(), why }
                })?;
            }
            None if !runner.exists(&filename) => {
                return Err(StorageError::LoopFileWithoutSize { path: filename });
            }
            None => (),
        }

        let device = losetup_attach(&*runner, &filename, blocksize.unwrap_or(512))
            .map_err(|why| StorageError::LoopCreate { path: filename.clone(), why })?;

        info!("bound {} to {}", filename.display(), device.display());
        let handle = ReleaseHandle::new(Resource::Loop { device: device.clone() }, runner.clone());
        Ok((LoopDevice { filename, device, runner }, handle))
    }

    /// The image file backing the loop device.
    pub fn filename(&self) -> &Path { &self.filename }
}

impl DeviceProvider for LoopDevice {
    fn get_device(&self) -> &Path { &self.device }

    fn is_loop(&self) -> bool { true }

    fn runner(&self) -> &SharedRunner { &self.runner }
}
