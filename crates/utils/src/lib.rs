//! Miscellanious functions used by distimage and its crates.

use std::{
    ffi::{OsStr, OsString},
    fs::{self, File},
    io::{self, Read, Write},
    path::Path,
};

pub fn open<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).map_err(|why| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("unable to open file at {:?}: {}", path.as_ref(), why),
        )
    })
}

pub fn create<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::create(&path).map_err(|why| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("unable to create file at {:?}: {}", path.as_ref(), why),
        )
    })
}

pub fn cp<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> io::Result<u64> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    io::copy(&mut open(src)?, &mut create(dst)?).map_err(|why| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("failed to copy {:?} to {:?}: {}", src, dst, why),
        )
    })
}

/// Moves a file, falling back to copy and remove across file systems.
pub fn mv<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> io::Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    cp(src, dst)?;
    fs::remove_file(src).map_err(|why| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("failed to remove {:?} after copying it to {:?}: {}", src, dst, why),
        )
    })
}

pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    open(path).and_then(|mut file| {
        let mut buffer = Vec::with_capacity(file.metadata().ok().map_or(0, |x| x.len()) as usize);
        file.read_to_end(&mut buffer).map(|_| buffer)
    })
}

pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    create(path).and_then(|mut file| file.write_all(contents.as_ref()))
}

/// Concatenates an array of `&OsStr` into a new `OsString`.
pub fn concat_osstr(input: &[&OsStr]) -> OsString {
    let mut output = OsString::with_capacity(input.iter().fold(0, |acc, c| acc + c.len()));

    input.iter().for_each(|comp| output.push(comp));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn mv_replaces_source() {
        let dir = TempDir::new("distimage-utils").unwrap();
        let src = dir.path().join("initrd");
        let dst = dir.path().join("initrd.vmx");
        write(&src, b"payload").unwrap();

        mv(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(read(&dst).unwrap(), b"payload");
    }

    #[test]
    fn errors_name_the_path() {
        let why = open("/nonexistent/distimage").unwrap_err();
        assert!(why.to_string().contains("/nonexistent/distimage"));
    }
}
