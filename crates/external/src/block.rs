use super::Runner;
use disk_types::FileSystem::{self, *};
use std::{
    ffi::{OsStr, OsString},
    io,
    path::Path,
};

/// Obtains the file system UUID of a block device via blkid.
pub fn blkid_uuid(runner: &dyn Runner, device: &Path) -> io::Result<String> {
    let output = runner.exec_with_stdout(
        "blkid",
        &[device.into(), "-s".into(), "UUID".into(), "-o".into(), "value".into()],
    )?;

    Ok(output.trim().to_owned())
}

/// Obtains the size of a block device, in bytes.
pub fn blockdev_size(runner: &dyn Runner, device: &Path) -> io::Result<u64> {
    let output = runner.exec_with_stdout("blockdev", &["--getsize64".into(), device.into()])?;
    output.trim().parse::<u64>().map_err(|why| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("blockdev reported an invalid size for {}: {}", device.display(), why),
        )
    })
}

/// Formats the supplied `part` device with the file system specified.
///
/// `label` is applied with the label option of the respective tool, and
/// `custom` arguments are passed through ahead of the device path.
pub fn mkfs<S: AsRef<OsStr>>(
    runner: &dyn Runner,
    part: &Path,
    kind: FileSystem,
    label: Option<&str>,
    custom: &[S],
) -> io::Result<()> {
    let (cmd, args): (&'static str, &'static [&'static str]) = match kind {
        Btrfs => ("mkfs.btrfs", &["-f"]),
        Ext2 => ("mkfs.ext2", &["-F", "-q"]),
        Ext3 => ("mkfs.ext3", &["-F", "-q"]),
        Ext4 => ("mkfs.ext4", &["-F", "-q"]),
        Fat16 => ("mkdosfs", &["-F", "16", "-I"]),
        Fat32 => ("mkdosfs", &["-F", "32", "-I"]),
        Swap => ("mkswap", &["-f"]),
        Xfs => ("mkfs.xfs", &["-f"]),
    };

    let label_flag = match kind {
        Fat16 | Fat32 => "-n",
        _ => "-L",
    };

    runner.exec(cmd, None, None, &{
        let mut args = args.iter().map(Into::into).collect::<Vec<OsString>>();
        if let Some(label) = label {
            args.push(label_flag.into());
            args.push(label.into());
        }
        args.extend(custom.iter().map(|x| x.as_ref().into()));
        args.push(part.into());
        args
    })
}

/// Overwrites `bytes` of the device with random data.
pub fn dd_random(runner: &dyn Runner, device: &Path, bytes: u64) -> io::Result<()> {
    info!("wiping {} with random data", device.display());
    runner.exec("dd", None, None, &[
        "if=/dev/urandom".into(),
        "bs=1M".into(),
        ["count=", &super::mebibytes(bytes)].concat().into(),
        misc::concat_osstr(&["of=".as_ref(), device.as_os_str()]),
    ])
}

/// Creates a btrfs subvolume at `path`.
pub fn btrfs_subvolume_create(runner: &dyn Runner, path: &Path) -> io::Result<()> {
    runner.exec("btrfs", None, None, &["subvolume".into(), "create".into(), path.into()])
}

/// Marks the subvolume at `path` as the default subvolume of its file system.
pub fn btrfs_subvolume_set_default(runner: &dyn Runner, path: &Path) -> io::Result<()> {
    let output = runner.exec_with_stdout(
        "btrfs",
        &["subvolume".into(), "list".into(), path.into()],
    )?;

    let id = output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("ID"), Some(id)) => Some((id, line.trim_end())),
                _ => None,
            }
        })
        .find(|&(_, line)| line.ends_with(" path @"))
        .map(|(id, _)| id.to_owned())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "btrfs root subvolume @ was not listed")
        })?;

    runner.exec("btrfs", None, None, &[
        "subvolume".into(),
        "set-default".into(),
        id.into(),
        path.into(),
    ])
}

/// Synchronizes `source` into `target` with rsync, skipping every `exclude`
/// pattern. Patterns are anchored at the top of the source tree.
pub fn rsync(runner: &dyn Runner, source: &Path, target: &Path, exclude: &[String]) -> io::Result<()> {
    let mut args: Vec<OsString> = ["-a", "-H", "-X", "-A", "--one-file-system", "--inplace"]
        .iter()
        .map(Into::into)
        .collect();

    for pattern in exclude {
        args.push("--exclude".into());
        args.push(["/", pattern.trim_start_matches('/')].concat().into());
    }

    let mut source = source.as_os_str().to_owned();
    if !source.to_string_lossy().ends_with('/') {
        source.push("/");
    }

    args.push(source);
    args.push(target.into());
    runner.exec("rsync", None, None, &args)
}
