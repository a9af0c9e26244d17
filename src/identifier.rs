use crate::errors::IoContext;
use rand::Rng;
use std::{
    fmt,
    fs::OpenOptions,
    io::{self, Seek, SeekFrom, Write},
    path::Path,
};

/// Byte offset of the disk signature in the master boot record.
const MBR_ID_OFFSET: u64 = 440;

/// A random identifier which recognizes a disk image at boot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageIdentifier(u32);

impl ImageIdentifier {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id = rng.gen::<u32>();
            if id != 0 {
                return ImageIdentifier(id);
            }
        }
    }

    pub fn get_id(self) -> u32 { self.0 }

    /// Writes the identifier as text to `path`.
    pub fn write<P: AsRef<Path>>(self, path: P) -> io::Result<()> {
        misc::write(path, format!("{}\n", self))
    }

    /// Writes the identifier into the disk signature of the device or image
    /// file at `device`.
    pub fn write_to_disk(self, device: &Path) -> io::Result<()> {
        info!("writing image identifier {} to {}", self, device.display());
        let mut disk = OpenOptions::new()
            .write(true)
            .open(device)
            .with_context(|why| format!("unable to open {:?} for writing: {}", device, why))?;

        disk.seek(SeekFrom::Start(MBR_ID_OFFSET))
            .and_then(|_| disk.write_all(&self.0.to_le_bytes()))
            .and_then(|_| disk.flush())
            .with_context(|why| format!("unable to write disk signature to {:?}: {}", device, why))
    }
}

impl Default for ImageIdentifier {
    fn default() -> Self { Self::new() }
}

impl From<u32> for ImageIdentifier {
    fn from(id: u32) -> Self { ImageIdentifier(id) }
}

impl fmt::Display for ImageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "0x{:08x}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn hex_text() {
        let id = ImageIdentifier::from(0xbeef);
        assert_eq!(id.to_string(), "0x0000beef");

        let dir = TempDir::new("distimage-mbrid").unwrap();
        id.write(dir.path().join("mbrid")).unwrap();
        assert_eq!(misc::read(dir.path().join("mbrid")).unwrap(), b"0x0000beef\n");
    }

    #[test]
    fn random_ids_are_nonzero() {
        assert!((0..64).all(|_| ImageIdentifier::new().get_id() != 0));
    }

    #[test]
    fn disk_signature_is_little_endian() {
        let dir = TempDir::new("distimage-mbrid").unwrap();
        let disk = dir.path().join("disk.raw");
        misc::write(&disk, vec![0u8; 1024]).unwrap();

        ImageIdentifier::from(0x1234_5678).write_to_disk(&disk).unwrap();

        let data = misc::read(&disk).unwrap();
        assert_eq!(data.len(), 1024);
        assert_eq!(&data[440..444], &[0x78, 0x56, 0x34, 0x12]);
        assert!(data[..440].iter().chain(&data[444..]).all(|&b| b == 0));
    }
}
