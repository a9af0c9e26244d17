//! Kernel and hypervisor lookup in the boot tree.

use crate::errors::{BuildError, IoContext};
use std::{
    fs,
    path::{Path, PathBuf},
};

const KERNEL_PREFIXES: &[&str] = &["vmlinuz", "vmlinux", "Image", "zImage", "uImage"];

pub struct Kernel {
    boot_dir: PathBuf,
}

impl Kernel {
    /// Looks for kernels in the `boot` directory below `root_dir`.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Kernel { boot_dir: root_dir.as_ref().join("boot") }
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files = fs::read_dir(&self.boot_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file())
                    .collect::<Vec<PathBuf>>()
            })
            .unwrap_or_default();

        files.sort();
        files
    }

    fn file_name(path: &Path) -> String {
        path.file_name().map_or_else(String::new, |name| name.to_string_lossy().into_owned())
    }

    pub fn get_kernel(&self) -> Option<PathBuf> {
        let files = self.files();
        KERNEL_PREFIXES.iter().find_map(|prefix| {
            files.iter().find(|path| Self::file_name(path).starts_with(prefix)).cloned()
        })
    }

    pub fn get_xen_hypervisor(&self) -> Option<PathBuf> {
        self.files().into_iter().find(|path| {
            let name = Self::file_name(path);
            name.starts_with("xen") && name.ends_with(".gz")
        })
    }

    /// Copies the kernel to `target`.
    pub fn copy_kernel(&self, target: &Path) -> Result<PathBuf, BuildError> {
        let kernel =
            self.get_kernel().ok_or_else(|| BuildError::MissingKernel { path: self.boot_dir.clone() })?;
        info!("--> using kernel {}", kernel.display());
        copy(&kernel, target)
    }

    /// Copies the xen hypervisor to `target`.
    pub fn copy_xen_hypervisor(&self, target: &Path) -> Result<PathBuf, BuildError> {
        let xen = self
            .get_xen_hypervisor()
            .ok_or_else(|| BuildError::MissingHypervisor { path: self.boot_dir.clone() })?;
        info!("--> using hypervisor {}", xen.display());
        copy(&xen, target)
    }
}

fn copy(source: &Path, target: &Path) -> Result<PathBuf, BuildError> {
    misc::cp(source, target)
        .with_context(|why| format!("unable to install {:?} as {:?}: {}", source, target, why))?;
    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn boot_tree(files: &[&str]) -> TempDir {
        let root = TempDir::new("distimage-kernel").unwrap();
        fs::create_dir_all(root.path().join("boot")).unwrap();
        for file in files {
            misc::write(root.path().join("boot").join(file), file.as_bytes()).unwrap();
        }
        root
    }

    #[test]
    fn prefers_compressed_kernel() {
        let root = boot_tree(&["Image-5.3", "vmlinux-5.3", "vmlinuz-5.3", "System.map"]);
        let kernel = Kernel::new(root.path());
        assert_eq!(kernel.get_kernel(), Some(root.path().join("boot/vmlinuz-5.3")));
        assert_eq!(kernel.get_xen_hypervisor(), None);
    }

    #[test]
    fn copies_kernel_and_xen() {
        let root = boot_tree(&["zImage", "xen-4.12.gz"]);
        let target = TempDir::new("distimage-target").unwrap();
        let kernel = Kernel::new(root.path());

        let linux = kernel.copy_kernel(&target.path().join("linux.vmx")).unwrap();
        assert_eq!(misc::read(linux).unwrap(), b"zImage");
        let xen = kernel.copy_xen_hypervisor(&target.path().join("xen.gz")).unwrap();
        assert_eq!(misc::read(xen).unwrap(), b"xen-4.12.gz");
    }

    #[test]
    fn missing_kernel() {
        let root = boot_tree(&["config"]);
        let kernel = Kernel::new(root.path());
        match kernel.copy_kernel(&root.path().join("linux.vmx")) {
            Err(BuildError::MissingKernel { path }) => assert_eq!(path, root.path().join("boot")),
            other => panic!("unexpected result: {:?}", other),
        }
        match kernel.copy_xen_hypervisor(&root.path().join("xen.gz")) {
            Err(BuildError::MissingHypervisor { .. }) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
