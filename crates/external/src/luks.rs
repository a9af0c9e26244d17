use super::Runner;
use std::{
    ffi::OsString,
    fs::Permissions,
    io::{self, Write},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

/// Writes a passphrase into `dir` as a key file readable only by its owner.
pub fn write_keyfile(dir: &Path, passphrase: &str) -> io::Result<PathBuf> {
    let path = dir.join("keyfile");
    info!("writing LUKS key file to {}", path.display());

    let mut keyfile = misc::create(&path)?;
    keyfile.set_permissions(Permissions::from_mode(0o0400))?;
    keyfile.write_all(passphrase.as_bytes())?;
    keyfile.sync_all()?;
    Ok(path)
}

/// Formats `device` as a LUKS container unlocked by `keyfile`.
pub fn cryptsetup_format(
    runner: &dyn Runner,
    device: &Path,
    keyfile: &Path,
    options: &[String],
) -> io::Result<()> {
    info!("cryptsetup is encrypting {} with {:?}", device.display(), options);
    runner.exec("cryptsetup", None, None, &{
        let mut args: Vec<OsString> = vec!["-q".into(), "--key-file".into(), keyfile.into()];
        args.extend(options.iter().map(Into::into));
        args.push("luksFormat".into());
        args.push(device.into());
        args
    })
}

/// Opens the LUKS container on `device` as `/dev/mapper/<name>`.
pub fn cryptsetup_open(
    runner: &dyn Runner,
    device: &Path,
    keyfile: &Path,
    name: &str,
) -> io::Result<()> {
    runner.exec("cryptsetup", None, None, &[
        "--key-file".into(),
        keyfile.into(),
        "luksOpen".into(),
        device.into(),
        name.into(),
    ])
}

pub enum CloseBy<'a> {
    Path(&'a Path),
    Name(&'a str),
}

/// Closes an encrypted partition.
pub fn cryptsetup_close(runner: &dyn Runner, device: CloseBy) -> io::Result<()> {
    let args = &[
        "luksClose".into(),
        match device {
            CloseBy::Path(path) => path.into(),
            CloseBy::Name(name) => name.into(),
        },
    ];
    runner.exec("cryptsetup", None, Some(&[4]), args)
}
