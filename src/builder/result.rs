use crate::errors::IoContext;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

/// A file produced by a build.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResultEntry {
    pub filename:       PathBuf,
    /// Whether the file belongs in the result bundle.
    pub use_for_bundle: bool,
    pub compress:       bool,
    pub shasum:         bool,
}

/// The files a build produced, keyed by their role, such as `disk_image`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct BuildResult {
    entries: BTreeMap<String, ResultEntry>,
}

impl BuildResult {
    pub fn add<P: Into<PathBuf>>(
        &mut self,
        key: &str,
        filename: P,
        use_for_bundle: bool,
        compress: bool,
        shasum: bool,
    ) {
        let filename = filename.into();
        debug!("result {}: {}", key, filename.display());
        self.entries.insert(key.into(), ResultEntry { filename, use_for_bundle, compress, shasum });
    }

    pub fn get(&self, key: &str) -> Option<&ResultEntry> { self.entries.get(key) }

    pub fn entries(&self) -> &BTreeMap<String, ResultEntry> { &self.entries }

    pub fn to_json(&self) -> io::Result<String> {
        serde_json::to_string_pretty(self).map_err(io::Error::from)
    }

    /// Writes the result as JSON to `path`.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        self.to_json()
            .and_then(|json| misc::write(path, json))
            .with_context(|why| format!("unable to write build result to {:?}: {}", path, why))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn dumped_as_json() {
        let mut result = BuildResult::default();
        result.add("disk_image", "/var/tmp/leap.raw", true, false, true);
        result.add("installation_image", "/var/tmp/leap.install.iso", true, false, true);

        let dir = TempDir::new("distimage-result").unwrap();
        let path = dir.path().join("result.json");
        result.dump(&path).unwrap();

        let loaded: BuildResult =
            serde_json::from_slice(&misc::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, result);
        assert_eq!(loaded.get("disk_image").unwrap().filename, Path::new("/var/tmp/leap.raw"));
        assert!(loaded.get("disk_format_image").is_none());
    }
}
