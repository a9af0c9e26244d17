//! Partition table tools: sgdisk, sfdisk, fdisk, fdasd, kpartx and partprobe.

use super::Runner;
use std::{ffi::OsString, io, path::Path};

/// Destroys the GPT and MBR data structures of a disk.
pub fn sgdisk_zap(runner: &dyn Runner, device: &Path) -> io::Result<()> {
    info!("wiping partition table signatures on {}", device.display());
    runner.exec("sgdisk", None, None, &["--zap-all".into(), device.into()])
}

/// Creates GPT partition `id`. A size of `None` consumes the rest of the disk.
pub fn sgdisk_new(
    runner: &dyn Runner,
    device: &Path,
    id: u32,
    name: &str,
    mbytes: Option<u64>,
) -> io::Result<()> {
    let end = mbytes.map_or_else(|| "0".to_owned(), |mb| format!("+{}M", mb));
    runner.exec("sgdisk", None, None, &[
        "-n".into(),
        format!("{}:0:{}", id, end).into(),
        "-c".into(),
        format!("{}:{}", id, name).into(),
        device.into(),
    ])
}

/// Sets the GPT type code of partition `id`.
pub fn sgdisk_typecode(runner: &dyn Runner, device: &Path, id: u32, code: &str) -> io::Result<()> {
    runner.exec("sgdisk", None, None, &[
        "-t".into(),
        format!("{}:{}", id, code).into(),
        device.into(),
    ])
}

/// Writes a hybrid MBR containing the given GPT partitions.
pub fn sgdisk_hybrid(runner: &dyn Runner, device: &Path, ids: &[u32]) -> io::Result<()> {
    let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(":");
    runner.exec("sgdisk", None, None, &["-h".into(), ids.into(), device.into()])
}

/// Converts the GPT into an MBR holding the given partitions.
pub fn sgdisk_mbr(runner: &dyn Runner, device: &Path, ids: &[u32]) -> io::Result<()> {
    let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(":");
    runner.exec("sgdisk", None, None, &["-m".into(), ids.into(), device.into()])
}

/// Details of GPT partition `id`, as printed by sgdisk.
pub fn sgdisk_info(runner: &dyn Runner, device: &Path, id: u32) -> io::Result<String> {
    runner.exec_with_stdout("sgdisk", &[format!("-i={}", id).into(), device.into()])
}

/// Relocates the backup GPT header to the end of a grown disk.
pub fn sgdisk_resize_table(runner: &dyn Runner, device: &Path, entries: u32) -> io::Result<()> {
    runner.exec("sgdisk", None, None, &[
        "--resize-table".into(),
        entries.to_string().into(),
        device.into(),
    ])
}

/// Feeds an interactive fdisk script to fdisk.
pub fn fdisk_script(runner: &dyn Runner, device: &Path, script: &str) -> io::Result<()> {
    runner.exec("fdisk", Some(script.as_bytes()), None, &[device.into()])
}

/// Feeds an interactive fdasd script to fdasd.
pub fn fdasd_script(runner: &dyn Runner, device: &Path, script: &str) -> io::Result<()> {
    runner.exec("fdasd", Some(script.as_bytes()), None, &["-f".into(), device.into()])
}

/// Marks MBR partition `id` as active.
pub fn sfdisk_activate(runner: &dyn Runner, device: &Path, id: u32) -> io::Result<()> {
    runner.exec("sfdisk", None, None, &["--activate".into(), device.into(), id.to_string().into()])
}

/// Sets the MBR type byte of partition `id`.
pub fn sfdisk_part_type(runner: &dyn Runner, device: &Path, id: u32, code: &str) -> io::Result<()> {
    runner.exec("sfdisk", None, None, &[
        "--part-type".into(),
        device.into(),
        id.to_string().into(),
        code.into(),
    ])
}

/// Creates device maps for each partition of a loop device.
pub fn kpartx_add(runner: &dyn Runner, device: &Path) -> io::Result<()> {
    runner.exec("kpartx", None, None, &kpartx_args("-a", device))
}

/// Removes the device maps created by `kpartx_add`.
pub fn kpartx_delete(runner: &dyn Runner, device: &Path) -> io::Result<()> {
    runner.exec("kpartx", None, None, &kpartx_args("-d", device))
}

fn kpartx_args(action: &str, device: &Path) -> [OsString; 3] {
    ["-s".into(), action.into(), device.into()]
}

/// Informs the kernel of partition table changes.
pub fn partprobe(runner: &dyn Runner, device: &Path) -> io::Result<()> {
    runner.exec("partprobe", None, None, &[device.into()])
}
