use crate::model::DiscoveredInstallation;
use crate::sources::Source;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use log::{info, debug};

/// Every folder directly under the games root is a candidate install.
pub struct InstallationSource {
    pub root: PathBuf,
    pub skip: Vec<PathBuf>,
}

impl Source for InstallationSource {
    type Item = DiscoveredInstallation;

    fn scan(&self) -> Result<Vec<DiscoveredInstallation>> {
        let read_dir = fs::read_dir(&self.root)
            .with_context(|| format!("cannot list games root {}", self.root.display()))?;

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let root_path = path.canonicalize().unwrap_or(path);
            if self.skip.iter().any(|s| s == &root_path) {
                debug!("Skipping {:?}", root_path);
                continue;
            }
            if let Some(name) = root_path.file_name().and_then(|s| s.to_str()) {
                entries.push(DiscoveredInstallation {
                    name: name.to_string(),
                    root_path: root_path.clone(),
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        info!("InstallationSource: found {} folders", entries.len());
        Ok(entries)
    }
}
