use super::{mebibytes, Runner};
use std::{ffi::OsStr, io, path::Path};

/// Lists the volume groups known to the host.
pub fn vgs(runner: &dyn Runner) -> io::Result<Vec<String>> {
    let output =
        runner.exec_with_stdout("vgs", &["--noheadings".into(), "-o".into(), "vg_name".into()])?;

    Ok(output.lines().map(str::trim).filter(|vg| !vg.is_empty()).map(String::from).collect())
}

/// Used to create a logical volume on a volume group.
///
/// A size of `None` allocates every remaining extent of the group.
pub fn lvcreate(runner: &dyn Runner, group: &str, name: &str, size: Option<u64>) -> io::Result<()> {
    runner.exec(
        "lvcreate",
        None,
        None,
        &size.map_or(
            ["-l".into(), "+100%FREE".into(), "-n".into(), name.into(), group.into()],
            |size| {
                [
                    "-L".into(),
                    mebibytes(size).into(),
                    "-n".into(),
                    name.into(),
                    group.into(),
                ]
            },
        ),
    )
}

/// Used to create a physical volume on a block device.
pub fn pvcreate<P: AsRef<Path>>(runner: &dyn Runner, device: P) -> io::Result<()> {
    runner.exec("pvcreate", None, None, &["-ffy".into(), device.as_ref().into()])
}

/// Used to create a volume group from one or more physical volumes.
pub fn vgcreate<I: Iterator<Item = S>, S: AsRef<OsStr>>(
    runner: &dyn Runner,
    group: &str,
    devices: I,
) -> io::Result<()> {
    runner.exec("vgcreate", None, None, &{
        let mut args = Vec::with_capacity(16);
        args.push(group.into());
        args.extend(devices.map(|x| x.as_ref().into()));
        args
    })
}

/// Deactivates all logical volumes in the supplied volume group
pub fn vgdeactivate(runner: &dyn Runner, volume_group: &str) -> io::Result<()> {
    info!("deactivating '{}'", volume_group);
    runner.exec("vgchange", None, None, &["-an".into(), volume_group.into()])
}

/// Removes the given volume group from the system.
pub fn vgremove(runner: &dyn Runner, group: &str) -> io::Result<()> {
    runner.exec("vgremove", None, None, &["--force".into(), group.into()])
}
