use crate::identity;
use crate::store::vdf::{VdfMap, VdfValue};
use log::warn;
use std::path::{Path, PathBuf};

/// One non-Steam shortcut as stored in `shortcuts.vdf`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogEntry {
    pub identity: Option<u32>,
    pub display_name: String,
    pub executable_path: String,  // Quoted on disk: "\"C:\\Games\\x.exe\""
    pub start_directory: String,  // Quoted as well
    pub launch_options: String,
    pub icon_path: Option<String>,
    pub hidden: bool,
    pub allow_desktop_config: bool,
    pub open_vr: bool,
    pub devkit: bool,
    pub devkit_game_id: String,
    pub tags: Vec<String>,
    pub extra: VdfMap,            // Keys we don't interpret, written back untouched
}

impl CatalogEntry {
    /// A fresh entry with the flags Steam uses for a newly added shortcut.
    pub fn new(identity: u32, name: &str, exe: &Path, start_dir: &Path, launch_options: &str) -> Self {
        Self {
            identity: Some(identity),
            display_name: name.to_string(),
            executable_path: quote(exe),
            start_directory: quote(start_dir),
            launch_options: launch_options.to_string(),
            allow_desktop_config: true,
            ..Default::default()
        }
    }

    /// The executable path without surrounding quotes.
    pub fn executable(&self) -> PathBuf {
        PathBuf::from(unquote(&self.executable_path))
    }

    pub fn from_vdf(map: &VdfMap) -> Self {
        let mut entry = CatalogEntry::default();
        for (key, value) in map.iter() {
            match key.to_ascii_lowercase().as_str() {
                "appid" => entry.identity = identity::normalize(value.as_i128()),
                "appname" => entry.display_name = text(value),
                "exe" => entry.executable_path = text(value),
                "startdir" => entry.start_directory = text(value),
                "launchoptions" => entry.launch_options = text(value),
                "icon" => {
                    let icon = text(value);
                    entry.icon_path = (!icon.is_empty()).then_some(icon);
                }
                "ishidden" => entry.hidden = value.as_flag(),
                "allowdesktopconfig" => entry.allow_desktop_config = value.as_flag(),
                "openvr" => entry.open_vr = value.as_flag(),
                "devkit" => entry.devkit = value.as_flag(),
                "devkitgameid" => entry.devkit_game_id = text(value),
                "tags" => {
                    if let VdfValue::Map(tags) = value {
                        entry.tags = tags.iter().filter_map(|(_, t)| t.as_str().map(String::from)).collect();
                    }
                }
                _ => entry.extra.push(key.clone(), value.clone()),
            }
        }
        entry
    }

    pub fn to_vdf(&self) -> VdfMap {
        let mut map = VdfMap::new();
        if let Some(id) = self.identity {
            // Steam stores the unsigned id's bit pattern as int32.
            map.push("appid", VdfValue::Int(id as i32));
        }
        map.push("AppName", VdfValue::Str(self.display_name.clone()));
        map.push("Exe", VdfValue::Str(self.executable_path.clone()));
        map.push("StartDir", VdfValue::Str(self.start_directory.clone()));
        map.push("icon", VdfValue::Str(self.icon_path.clone().unwrap_or_default()));
        map.push("LaunchOptions", VdfValue::Str(self.launch_options.clone()));
        map.push("IsHidden", flag(self.hidden));
        map.push("AllowDesktopConfig", flag(self.allow_desktop_config));
        map.push("OpenVR", flag(self.open_vr));
        map.push("Devkit", flag(self.devkit));
        map.push("DevkitGameID", VdfValue::Str(self.devkit_game_id.clone()));
        for (key, value) in self.extra.iter() {
            map.push(key.clone(), value.clone());
        }
        let mut tags = VdfMap::new();
        for (i, tag) in self.tags.iter().enumerate() {
            tags.push(i.to_string(), VdfValue::Str(tag.clone()));
        }
        map.push("tags", VdfValue::Map(tags));
        map
    }
}

fn text(value: &VdfValue) -> String {
    match value {
        VdfValue::Str(s) => s.clone(),
        other => other.as_i128().map(|v| v.to_string()).unwrap_or_default(),
    }
}

fn flag(on: bool) -> VdfValue {
    VdfValue::Int(i32::from(on))
}

pub fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

pub fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

/// The ordered shortcut list. Storage keys are positions, so they stay dense.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    /// Keys as written to the store: `"0"..="n-1"`.
    pub fn keys(&self) -> Vec<String> {
        (0..self.entries.len()).map(|i| i.to_string()).collect()
    }

    pub fn from_vdf(root: &VdfMap) -> Self {
        let Some(VdfValue::Map(shortcuts)) = root.get("shortcuts") else {
            return Catalog::default();
        };

        let mut keyed: Vec<(Option<u64>, usize, &VdfMap)> = Vec::new();
        for (pos, (key, value)) in shortcuts.iter().enumerate() {
            match value {
                VdfValue::Map(map) => keyed.push((key.parse().ok(), pos, map)),
                _ => warn!("Skipping malformed catalog entry {:?}", key),
            }
        }
        // Numeric keys in numeric order, anything else after them in file order.
        keyed.sort_by_key(|(index, pos, _)| (index.is_none(), *index, *pos));

        Catalog {
            entries: keyed.into_iter().map(|(_, _, map)| CatalogEntry::from_vdf(map)).collect(),
        }
    }

    pub fn to_vdf(&self) -> VdfMap {
        let mut shortcuts = VdfMap::new();
        for (key, entry) in self.keys().into_iter().zip(&self.entries) {
            shortcuts.push(key, VdfValue::Map(entry.to_vdf()));
        }
        let mut root = VdfMap::new();
        root.push("shortcuts", VdfValue::Map(shortcuts));
        root
    }
}

/// A game folder directly under the games root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredInstallation {
    pub name: String,
    pub root_path: PathBuf,
}

/// A resolved desktop shortcut whose target exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredShortcut {
    pub name: String,
    pub target_executable: PathBuf,
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    TallGrid,
    Hero,
    Logo,
    Icon,
    WideCapsule,
}

impl ImageKind {
    pub const ALL: [ImageKind; 5] = [
        ImageKind::TallGrid,
        ImageKind::Hero,
        ImageKind::Logo,
        ImageKind::Icon,
        ImageKind::WideCapsule,
    ];

    /// File name suffix between the identity and `.png`.
    pub fn suffix(self) -> &'static str {
        match self {
            ImageKind::TallGrid => "p",
            ImageKind::Hero => "_hero",
            ImageKind::Logo => "_logo",
            ImageKind::Icon => "_icon",
            ImageKind::WideCapsule => "",
        }
    }

    pub fn file_name(self, identity: u32) -> String {
        format!("{}{}.png", identity, self.suffix())
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImageKind::TallGrid => "grid",
            ImageKind::Hero => "hero",
            ImageKind::Logo => "logo",
            ImageKind::Icon => "icon",
            ImageKind::WideCapsule => "wide",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::vdf;

    fn raw_entry(appid: VdfValue, name: &str) -> VdfMap {
        let mut m = VdfMap::new();
        m.push("appid", appid);
        m.push("appname", VdfValue::Str(name.to_string()));
        m.push("exe", VdfValue::Str("\"C:\\Games\\a.exe\"".to_string()));
        m.push("LastPlayTime", VdfValue::Int(1_700_000_000));
        m
    }

    #[test]
    fn reads_legacy_lowercase_keys_and_text_ids() {
        let entry = CatalogEntry::from_vdf(&raw_entry(VdfValue::Str("-1".into()), "A"));
        assert_eq!(entry.identity, Some(u32::MAX));
        assert_eq!(entry.display_name, "A");
        assert_eq!(entry.executable(), PathBuf::from("C:\\Games\\a.exe"));
        assert_eq!(entry.extra.get("LastPlayTime"), Some(&VdfValue::Int(1_700_000_000)));
    }

    #[test]
    fn appid_is_written_as_int32_bit_pattern() {
        let entry = CatalogEntry::new(0xF000_0001, "A", Path::new("/g/a.exe"), Path::new("/g"), "");
        let map = entry.to_vdf();
        assert_eq!(map.get("appid"), Some(&VdfValue::Int(0xF000_0001u32 as i32)));
        assert_eq!(CatalogEntry::from_vdf(&map).identity, Some(0xF000_0001));
    }

    #[test]
    fn new_entry_has_default_flags() {
        let entry = CatalogEntry::new(1, "A", Path::new("/g/a.exe"), Path::new("/g"), "-w");
        assert!(!entry.hidden);
        assert!(entry.allow_desktop_config);
        assert!(!entry.open_vr && !entry.devkit);
        assert!(entry.tags.is_empty());
        assert_eq!(entry.executable_path, "\"/g/a.exe\"");
        assert_eq!(entry.launch_options, "-w");
    }

    #[test]
    fn catalog_orders_by_numeric_key_and_skips_non_maps() {
        let mut shortcuts = VdfMap::new();
        shortcuts.push("10", VdfValue::Map(raw_entry(VdfValue::Int(3), "ten")));
        shortcuts.push("2", VdfValue::Map(raw_entry(VdfValue::Int(2), "two")));
        shortcuts.push("junk", VdfValue::Str("oops".into()));
        let mut root = VdfMap::new();
        root.push("shortcuts", VdfValue::Map(shortcuts));

        let catalog = Catalog::from_vdf(&root);
        let names: Vec<_> = catalog.entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["two", "ten"]);
        assert_eq!(catalog.keys(), vec!["0", "1"]);
    }

    #[test]
    fn catalog_survives_encode_decode() {
        let mut catalog = Catalog::default();
        let mut entry = CatalogEntry::new(0x8123_4567, "Game", Path::new("/g/game.exe"), Path::new("/g"), "");
        entry.tags = vec!["rpg".into()];
        entry.icon_path = Some("/grid/2166572391_icon.png".into());
        catalog.push(entry);

        let decoded = Catalog::from_vdf(&vdf::decode(&vdf::encode(&catalog.to_vdf())).expect("decode"));
        assert_eq!(decoded, catalog);
    }

    #[test]
    fn artifact_file_names() {
        assert_eq!(ImageKind::TallGrid.file_name(42), "42p.png");
        assert_eq!(ImageKind::Hero.file_name(42), "42_hero.png");
        assert_eq!(ImageKind::WideCapsule.file_name(42), "42.png");
    }
}
