pub mod vdf;

use crate::error::SyncError;
use crate::model::Catalog;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persistence for the shortcut catalog.
pub trait CatalogStore {
    /// The stored catalog, or an empty one when nothing is stored yet.
    fn load(&self) -> Result<Catalog>;
    fn save(&self, catalog: &Catalog) -> Result<()>;
    fn location(&self) -> &Path;
}

pub struct VdfCatalogStore {
    path: PathBuf,
}

impl VdfCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogStore for VdfCatalogStore {
    fn load(&self) -> Result<Catalog> {
        if !self.path.exists() {
            info!("No catalog at {:?}, starting empty", self.path);
            return Ok(Catalog::default());
        }
        let bytes = fs::read(&self.path)
            .map_err(|source| SyncError::CatalogRead { path: self.path.clone(), source })?;
        let root = vdf::decode(&bytes)
            .map_err(|source| SyncError::CatalogMalformed { path: self.path.clone(), source })?;
        let catalog = Catalog::from_vdf(&root);
        debug!("Loaded {} catalog entries from {:?}", catalog.len(), self.path);
        Ok(catalog)
    }

    fn save(&self, catalog: &Catalog) -> Result<()> {
        write_atomic(&self.path, &vdf::encode(&catalog.to_vdf()))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Writes the JSON rendering of exactly what `save` would store.
pub fn write_preview(path: &Path, catalog: &Catalog) -> Result<()> {
    let content = serde_json::to_string_pretty(&catalog.to_vdf().to_json())?;
    write_atomic(path, content.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.persist(path)
        .with_context(|| format!("cannot replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VdfError;
    use crate::model::CatalogEntry;
    use tempfile::tempdir;

    fn one_entry() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.push(CatalogEntry::new(
            0x8000_0042,
            "Game",
            Path::new("/g/game.exe"),
            Path::new("/g"),
            "",
        ));
        catalog
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = tempdir().expect("tempdir");
        let store = VdfCatalogStore::new(tmp.path().join("shortcuts.vdf"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempdir().expect("tempdir");
        let store = VdfCatalogStore::new(tmp.path().join("cfg/shortcuts.vdf"));
        let catalog = one_entry();
        store.save(&catalog).expect("save");
        assert_eq!(store.load().expect("load"), catalog);
    }

    #[test]
    fn undecodable_file_is_refused() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("shortcuts.vdf");
        fs::write(&path, [0x00, b's', b'h']).expect("write");
        let err = VdfCatalogStore::new(&path).load().unwrap_err();
        assert!(err.downcast_ref::<SyncError>().is_some());
    }

    #[test]
    fn corrupt_deep_nesting_is_malformed() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("shortcuts.vdf");
        fs::write(&path, [0x00, b'k', 0].repeat(200_000)).expect("write");
        let err = VdfCatalogStore::new(&path).load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::CatalogMalformed { source: VdfError::TooDeep(_), .. })
        ));
    }

    #[test]
    fn preview_is_pretty_json_with_dense_keys() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("shortcuts.json");
        write_preview(&path, &one_entry()).expect("preview");

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(json["shortcuts"]["0"]["AppName"], "Game");
        assert_eq!(json["shortcuts"]["0"]["Exe"], "\"/g/game.exe\"");
    }

    #[test]
    fn preview_keeps_storage_order() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("shortcuts.json");
        let mut catalog = Catalog::default();
        for i in 0..12 {
            let exe = format!("/g/{i}/game.exe");
            catalog.push(CatalogEntry::new(0x8000_0000 + i, &format!("Game {i}"), Path::new(&exe), Path::new("/g"), ""));
        }
        write_preview(&path, &catalog).expect("preview");

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        let keys: Vec<&str> = json["shortcuts"].as_object().expect("map").keys().map(String::as_str).collect();
        let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(keys, expected);

        let fields: Vec<&str> = json["shortcuts"]["0"].as_object().expect("entry").keys().map(String::as_str).collect();
        assert_eq!(&fields[..4], &["appid", "AppName", "Exe", "StartDir"]);
        assert_eq!(fields.last(), Some(&"tags"));
    }
}
