//! Entries of the `etc/fstab` which is generated for the image.

use disk_types::FileSystem as FileSystemType;
use std::{
    io,
    path::{Path, PathBuf},
};

/// How an fstab entry refers to its block device.
#[derive(Debug, Clone, PartialEq)]
pub enum FstabSource {
    Uuid(String),
    Device(PathBuf),
}

/// A single line of the fstab.
#[derive(Debug, Clone, PartialEq)]
pub struct FstabEntry {
    pub source:     FstabSource,
    pub mountpoint: String,
    pub fs:         &'static str,
    pub options:    String,
    pub dump:       bool,
    pub pass:       u8,
}

impl FstabEntry {
    pub fn new<M: Into<String>>(source: FstabSource, mountpoint: M, fs: FileSystemType) -> Self {
        FstabEntry {
            source,
            mountpoint: mountpoint.into(),
            fs: fs.mount_type(),
            options: "defaults".into(),
            dump: false,
            pass: 0,
        }
    }

    pub fn options<O: Into<String>>(mut self, options: O) -> Self {
        self.options = options.into();
        self
    }

    pub fn check(mut self, dump: bool, pass: u8) -> Self {
        self.dump = dump;
        self.pass = pass;
        self
    }

    /// Appends this entry as a line to `fstab`.
    pub fn write_entry(&self, fstab: &mut String) {
        match self.source {
            FstabSource::Uuid(ref uuid) => {
                fstab.push_str("UUID=");
                fstab.push_str(uuid);
            }
            FstabSource::Device(ref device) => fstab.push_str(&device.to_string_lossy()),
        }

        fstab.push(' ');
        fstab.push_str(&self.mountpoint);
        fstab.push(' ');
        fstab.push_str(self.fs);
        fstab.push(' ');
        fstab.push_str(&self.options);
        fstab.push_str(if self.dump { " 1 " } else { " 0 " });
        fstab.push_str(&self.pass.to_string());
        fstab.push('\n');
    }
}

/// The entries of an fstab, in the order they are mounted.
#[derive(Debug, Default)]
pub struct Fstab {
    entries: Vec<FstabEntry>,
}

impl Fstab {
    pub fn add_entry(&mut self, entry: FstabEntry) { self.entries.push(entry); }

    pub fn entries(&self) -> &[FstabEntry] { &self.entries }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        let mut fstab = String::new();
        for entry in &self.entries {
            entry.write_entry(&mut fstab);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        misc::write(path, fstab)
    }
}
