use super::Runner;
use std::{io, path::Path};

/// Creates a two-member array with `device` as its only present member.
pub fn mdadm_create_degraded(
    runner: &dyn Runner,
    array: &Path,
    level: u8,
    device: &Path,
) -> io::Result<()> {
    runner.exec("mdadm", None, None, &[
        "--create".into(),
        "--run".into(),
        array.into(),
        "--level".into(),
        level.to_string().into(),
        "--raid-disks".into(),
        "2".into(),
        device.into(),
        "missing".into(),
    ])
}

/// Dumps the running array configuration, in mdadm.conf syntax.
pub fn mdadm_detail(runner: &dyn Runner, array: &Path) -> io::Result<String> {
    runner.exec_with_stdout("mdadm", &["-Db".into(), array.into()])
}

pub fn mdadm_stop(runner: &dyn Runner, array: &Path) -> io::Result<()> {
    runner.exec("mdadm", None, None, &["--stop".into(), array.into()])
}
