//! A runner which records commands instead of executing them.

use super::Runner;
use std::{
    cell::RefCell,
    collections::HashSet,
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub argv: Vec<String>,
    pub stdin: Option<String>,
}

impl Call {
    pub fn command(&self) -> &str { self.argv.first().map_or("", String::as_str) }

    /// The invocation as a single space-separated line.
    pub fn line(&self) -> String { self.argv.join(" ") }
}

/// Records every command. Output and failures are matched against the
/// recorded line by prefix, the most recently registered rule winning.
#[derive(Debug, Default)]
pub struct Recorder {
    calls:    RefCell<Vec<Call>>,
    outputs:  RefCell<Vec<(String, String)>>,
    failures: RefCell<Vec<String>>,
    paths:    RefCell<HashSet<PathBuf>>,
}

impl Recorder {
    pub fn new() -> Rc<Self> { Rc::new(Self::default()) }

    /// Returns `output` as stdout of calls starting with `prefix`.
    pub fn respond(&self, prefix: &str, output: &str) {
        self.outputs.borrow_mut().push((prefix.into(), output.into()));
    }

    /// Fails calls starting with `prefix`.
    pub fn fail(&self, prefix: &str) { self.failures.borrow_mut().push(prefix.into()); }

    /// Reports `path` as existing.
    pub fn add_path<P: Into<PathBuf>>(&self, path: P) { self.paths.borrow_mut().insert(path.into()); }

    pub fn calls(&self) -> Vec<Call> { self.calls.borrow().clone() }

    pub fn lines(&self) -> Vec<String> { self.calls.borrow().iter().map(Call::line).collect() }

    /// Counts the recorded lines starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|call| call.line().starts_with(prefix)).count()
    }

    /// Position of the first recorded line starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|call| call.line().starts_with(prefix))
    }

    fn record(&self, cmd: &str, stdin: Option<&[u8]>, args: &[OsString]) -> io::Result<String> {
        let mut argv = vec![cmd.to_owned()];
        argv.extend(args.iter().map(|arg| arg.to_string_lossy().into_owned()));
        let call = Call { argv, stdin: stdin.map(|s| String::from_utf8_lossy(s).into_owned()) };
        let line = call.line();
        self.calls.borrow_mut().push(call);

        if self.failures.borrow().iter().any(|prefix| line.starts_with(prefix.as_str())) {
            return Err(io::Error::new(io::ErrorKind::Other, format!("{} failed", line)));
        }

        Ok(self
            .outputs
            .borrow()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(String::new, |(_, output)| output.clone()))
    }
}

impl Runner for Recorder {
    fn exec(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        _valid_codes: Option<&'static [i32]>,
        args: &[OsString],
    ) -> io::Result<()> {
        self.record(cmd, stdin, args).map(|_| ())
    }

    fn exec_with_stdout(&self, cmd: &str, args: &[OsString]) -> io::Result<String> {
        self.record(cmd, None, args)
    }

    fn mount(&self, source: &Path, target: &Path, fstype: Option<&str>) -> io::Result<()> {
        let mut args: Vec<OsString> = Vec::with_capacity(4);
        if let Some(fstype) = fstype {
            args.push("-t".into());
            args.push(fstype.into());
        }
        args.push(source.into());
        args.push(target.into());
        self.record("mount", None, &args).map(|_| ())
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        self.record("umount", None, &[target.into()]).map(|_| ())
    }

    fn exists(&self, path: &Path) -> bool { self.paths.borrow().contains(path) || path.exists() }
}
