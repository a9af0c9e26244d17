use super::{DeviceProvider, MappedDevice, ReleaseHandle, Resource, StorageError};
use external::{cryptsetup_format, cryptsetup_open, dd_random, write_keyfile};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempdir::TempDir;

const LUKS_NAME: &str = "luksRoot";

/// Cipher options registered per target operating system.
pub(crate) fn luks_profile(os: &str) -> Option<&'static [&'static str]> {
    match os {
        "sle12" => Some(&["--cipher", "aes-xts-plain64", "--key-size", "256", "--hash", "sha1"]),
        _ => None,
    }
}

/// Wraps a block device into an opened LUKS container.
pub struct LuksDevice {
    storage:     MappedDevice,
    luks_device: Option<PathBuf>,
}

impl LuksDevice {
    pub fn new(storage: MappedDevice) -> Self { Self { storage, luks_device: None } }

    /// Fills the wrapped device with random data, formats it as LUKS and opens it.
    ///
    /// The passphrase only ever reaches cryptsetup through a key file.
    pub fn create_crypto_luks(
        &mut self,
        passphrase: &str,
        os: Option<&str>,
        options: &[String],
    ) -> Result<ReleaseHandle, StorageError> {
        if passphrase.is_empty() {
            return Err(StorageError::LuksEmptyPassphrase);
        }

        let mut format_options = Vec::with_capacity(options.len() + 6);
        if let Some(os) = os {
            let profile = luks_profile(os)
                .ok_or_else(|| StorageError::LuksUnknownProfile { os: os.into() })?;
            format_options.extend(profile.iter().map(|&opt| String::from(opt)));
        }
        format_options.extend_from_slice(options);

        let device = self.storage.get_device().to_path_buf();
        let runner = self.storage.runner().clone();
        let luks_error = |why| StorageError::LuksCreate { device: device.clone(), why };

        let bytes = self.storage.get_byte_size(&device)?;
        dd_random(&*runner, &device, bytes).map_err(luks_error)?;

        let keydir = TempDir::new("distimage-luks").map_err(luks_error)?;
        let keyfile = write_keyfile(keydir.path(), passphrase).map_err(luks_error)?;
        cryptsetup_format(&*runner, &device, &keyfile, &format_options).map_err(luks_error)?;
        cryptsetup_open(&*runner, &device, &keyfile, LUKS_NAME).map_err(luks_error)?;

        self.luks_device = Some(PathBuf::from(["/dev/mapper/", LUKS_NAME].concat()));
        Ok(ReleaseHandle::new(Resource::Luks { name: LUKS_NAME.into() }, runner))
    }

    /// The opened LUKS mapping, once `create_crypto_luks` succeeded.
    pub fn get_device(&self) -> Option<MappedDevice> {
        self.luks_device.as_ref().map(|device| MappedDevice::new(device.as_path(), &self.storage))
    }

    /// Writes a crypttab entry unlocking the container by the UUID of the
    /// underlying device.
    pub fn create_crypttab(&self, path: &Path) -> Result<(), StorageError> {
        let uuid = self.storage.get_uuid(self.storage.get_device())?;
        let entry = format!("luks UUID={}\n", uuid);

        path.parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| misc::write(path, entry))
            .map_err(|why| StorageError::LuksCrypttab { path: path.into(), why })
    }
}
