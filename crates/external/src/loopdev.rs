use super::Runner;
use std::{io, path::Path, path::PathBuf};

/// Creates a sparse raw image of `mbytes` at `file`.
pub fn qemu_img_create(runner: &dyn Runner, file: &Path, mbytes: u64) -> io::Result<()> {
    runner.exec("qemu-img", None, None, &[
        "create".into(),
        file.into(),
        format!("{}M", mbytes).into(),
    ])
}

/// Grows the raw image at `file` by `mbytes`.
pub fn qemu_img_resize(runner: &dyn Runner, file: &Path, mbytes: u64) -> io::Result<()> {
    runner.exec("qemu-img", None, None, &[
        "resize".into(),
        "-f".into(),
        "raw".into(),
        file.into(),
        format!("+{}M", mbytes).into(),
    ])
}

/// Converts a raw image into another image format.
pub fn qemu_img_convert(
    runner: &dyn Runner,
    source: &Path,
    target: &Path,
    format: &str,
    options: &[&str],
) -> io::Result<()> {
    runner.exec("qemu-img", None, None, &{
        let mut args = vec!["convert".into(), "-f".into(), "raw".into()];
        args.push(source.into());
        args.push("-O".into());
        args.push(format.into());
        args.extend(options.iter().map(Into::into));
        args.push(target.into());
        args
    })
}

/// Binds `file` to the next free loop device and returns its path.
pub fn losetup_attach(runner: &dyn Runner, file: &Path, blocksize: u32) -> io::Result<PathBuf> {
    let mut args = Vec::with_capacity(5);
    if blocksize != 512 {
        args.push("-L".into());
        args.push(blocksize.to_string().into());
    }
    args.push("-f".into());
    args.push("--show".into());
    args.push(file.into());

    let output = runner.exec_with_stdout("losetup", &args)?;
    match output.trim() {
        "" => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("losetup did not report a loop device for {}", file.display()),
        )),
        device => Ok(PathBuf::from(device)),
    }
}

/// Detaches a loop device from its backing file.
pub fn losetup_detach(runner: &dyn Runner, device: &Path) -> io::Result<()> {
    runner.exec("losetup", None, None, &["-d".into(), device.into()])
}
