use crate::model::DiscoveredShortcut;
use crate::sources::lnk::{scan_for_paths, ShellLink};
use crate::sources::Source;
use anyhow::Result;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Turns one shortcut file into a launchable target, or discards it.
pub trait LinkResolver {
    fn resolve(&self, link: &Path) -> Option<DiscoveredShortcut>;
}

pub struct ShellLinkResolver {
    pub executable_extension: String,
}

impl ShellLinkResolver {
    fn recover_from_bytes(&self, data: &[u8]) -> Option<PathBuf> {
        scan_for_paths(data, &self.executable_extension)
            .into_iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }
}

impl LinkResolver for ShellLinkResolver {
    fn resolve(&self, link: &Path) -> Option<DiscoveredShortcut> {
        let data = match fs::read(link) {
            Ok(data) => data,
            Err(e) => {
                warn!("Cannot read shortcut {:?}: {}", link, e);
                return None;
            }
        };

        let parsed = ShellLink::parse(&data).unwrap_or_default();
        let link_dir = link.parent().unwrap_or_else(|| Path::new("."));

        let target = match parsed.target(link_dir).filter(|t| t.is_file()) {
            Some(target) => target,
            None => {
                debug!("Structured target of {:?} unusable, scanning bytes", link);
                match self.recover_from_bytes(&data) {
                    Some(found) => found,
                    None => {
                        warn!("Ignoring shortcut with no existing target: {:?}", link);
                        return None;
                    }
                }
            }
        };

        let name = link.file_stem()?.to_string_lossy().to_string();
        Some(DiscoveredShortcut {
            name,
            target_executable: target.canonicalize().unwrap_or(target),
            arguments: parsed.arguments.unwrap_or_default().trim().to_string(),
        })
    }
}

/// Shortcut files in the user's curated folder.
pub struct ShortcutSource<'a> {
    pub dir: PathBuf,
    pub extension: String,
    pub resolver: &'a dyn LinkResolver,
}

impl Source for ShortcutSource<'_> {
    type Item = DiscoveredShortcut;

    fn scan(&self) -> Result<Vec<DiscoveredShortcut>> {
        if !self.dir.is_dir() {
            debug!("Shortcut folder {:?} does not exist, skipping", self.dir);
            return Ok(vec![]);
        }

        let mut links: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.extension))
                        .unwrap_or(false)
            })
            .collect();
        links.sort();

        let entries: Vec<_> = links.iter().filter_map(|link| self.resolver.resolve(link)).collect();
        info!("ShortcutSource: resolved {} of {} shortcuts", entries.len(), links.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::lnk::tests::build_link;
    use tempfile::tempdir;

    fn resolver() -> ShellLinkResolver {
        ShellLinkResolver { executable_extension: "exe".to_string() }
    }

    #[test]
    fn structured_target_with_arguments() {
        let tmp = tempdir().expect("tempdir");
        let exe = tmp.path().join("emu.exe");
        fs::write(&exe, b"MZ").expect("write exe");
        let link = tmp.path().join("Mario Kart.lnk");
        fs::write(&link, build_link(&exe.to_string_lossy(), "  -rom mk.iso ")).expect("write lnk");

        let found = resolver().resolve(&link).expect("resolved");
        assert_eq!(found.name, "Mario Kart");
        assert_eq!(found.target_executable, exe.canonicalize().expect("canon"));
        assert_eq!(found.arguments, "-rom mk.iso");
    }

    #[test]
    fn falls_back_to_byte_scan_when_target_missing() {
        let tmp = tempdir().expect("tempdir");
        let exe = tmp.path().join("real.exe");
        fs::write(&exe, b"MZ").expect("write exe");

        let mut data = build_link(&tmp.path().join("gone.exe").to_string_lossy(), "");
        data.extend_from_slice(b"\x00");
        data.extend_from_slice(exe.to_string_lossy().as_bytes());
        data.extend_from_slice(b"\x00");
        let link = tmp.path().join("Broken.lnk");
        fs::write(&link, data).expect("write lnk");

        let found = resolver().resolve(&link).expect("recovered");
        assert_eq!(found.target_executable, exe.canonicalize().expect("canon"));
        assert_eq!(found.arguments, "");
    }

    #[test]
    fn unresolvable_link_is_discarded() {
        let tmp = tempdir().expect("tempdir");
        let link = tmp.path().join("Nothing.lnk");
        fs::write(&link, b"garbage without any path").expect("write");
        assert_eq!(resolver().resolve(&link), None);
        assert_eq!(resolver().resolve(&tmp.path().join("absent.lnk")), None);
    }

    #[test]
    fn source_reads_only_link_files() {
        let tmp = tempdir().expect("tempdir");
        let exe = tmp.path().join("tool.exe");
        fs::write(&exe, b"MZ").expect("write exe");
        let dir = tmp.path().join("Shortcuts");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("B.lnk"), build_link(&exe.to_string_lossy(), "")).expect("write");
        fs::write(dir.join("A.LNK"), build_link(&exe.to_string_lossy(), "-a")).expect("write");
        fs::write(dir.join("readme.txt"), b"x").expect("write");

        let resolver = resolver();
        let source = ShortcutSource { dir, extension: "lnk".to_string(), resolver: &resolver };
        let found = source.scan().expect("scan");
        let names: Vec<_> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let missing = ShortcutSource {
            dir: tmp.path().join("nope"),
            extension: "lnk".to_string(),
            resolver: &resolver,
        };
        assert!(missing.scan().expect("scan").is_empty());
    }
}
