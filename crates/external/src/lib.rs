//! A collection of external commands used throughout the program.
//!
//! Every command is issued through a [`Runner`], so that the storage chain can
//! be driven against the real system or against a recording stand-in.

extern crate disk_types;
extern crate distimage_utils as misc;
#[macro_use]
extern crate log;
#[macro_use]
extern crate smart_default;
extern crate sys_mount;

pub mod block;
pub mod loopdev;
pub mod luks;
pub mod lvm;
pub mod raid;
#[cfg(feature = "recorder")]
pub mod recorder;
pub mod retry;
pub mod table;

pub use self::{block::*, loopdev::*, luks::*, lvm::*, raid::*, retry::Retry, table::*};
#[cfg(feature = "recorder")]
pub use self::recorder::{Call, Recorder};

use std::{
    ffi::OsString,
    io::{self, Write},
    path::Path,
    process::{Command, Stdio},
    rc::Rc,
};
use sys_mount::{unmount, Mount, UnmountFlags};

/// Issues processes and mounts on behalf of the storage chain.
pub trait Runner {
    /// Runs `cmd`, optionally feeding `stdin`, and fails unless the exit status is
    /// zero or one of `valid_codes`.
    fn exec(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        valid_codes: Option<&'static [i32]>,
        args: &[OsString],
    ) -> io::Result<()>;

    /// Runs `cmd` and returns what it wrote to stdout.
    fn exec_with_stdout(&self, cmd: &str, args: &[OsString]) -> io::Result<String>;

    fn mount(&self, source: &Path, target: &Path, fstype: Option<&str>) -> io::Result<()>;

    fn unmount(&self, target: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool { path.exists() }
}

/// The runner handle shared by every link of the storage chain.
pub type SharedRunner = Rc<dyn Runner>;

/// Executes commands on the host system.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl System {
    pub fn shared() -> SharedRunner { Rc::new(System) }
}

impl Runner for System {
    fn exec(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        valid_codes: Option<&'static [i32]>,
        args: &[OsString],
    ) -> io::Result<()> {
        info!("executing {} with {:?}", cmd, args);

        let mut child = Command::new(cmd)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .spawn()?;

        if let Some(stdin) = stdin {
            match child.stdin.as_mut() {
                Some(pipe) => pipe.write_all(stdin)?,
                None => {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin not obtained"))
                }
            }
        }

        let status = child.wait()?;
        let success = status.success()
            || valid_codes
                .map_or(false, |codes| status.code().map_or(false, |code| codes.contains(&code)));

        if success {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "{} failed with status: {}",
                    cmd,
                    match status.code() {
                        Some(code) => format!("{} ({})", code, io::Error::from_raw_os_error(code)),
                        None => "unknown".into(),
                    }
                ),
            ))
        }
    }

    fn exec_with_stdout(&self, cmd: &str, args: &[OsString]) -> io::Result<String> {
        info!("executing {} with {:?}", cmd, args);

        let output = Command::new(cmd).args(args).stderr(Stdio::piped()).output()?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "{} failed with status: {}: {}",
                    cmd,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn mount(&self, source: &Path, target: &Path, fstype: Option<&str>) -> io::Result<()> {
        info!("mounting {} to {}", source.display(), target.display());
        let mut builder = Mount::builder();
        if let Some(fstype) = fstype {
            builder = builder.fstype(fstype);
        }

        builder.mount(source, target).map(|_| ())
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        info!("unmounting {}", target.display());
        unmount(target, UnmountFlags::empty())
    }
}

/// Unmounts `target`, retrying three times one second apart while it is busy.
pub fn umount_with_retry(runner: &dyn Runner, target: &Path) -> io::Result<()> {
    Retry::default().attempts(3).interval(1000).retry_until_ok(|| runner.unmount(target))
}

fn mebibytes(bytes: u64) -> String { format!("{}", bytes / (1024 * 1024)) }
