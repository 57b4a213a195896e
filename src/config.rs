use serde::Deserialize;
use std::path::{Path, PathBuf};
use directories::{BaseDirs, ProjectDirs};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use crate::error::SyncError;

pub const API_KEY_ENV: &str = "STEAMGRIDDB_API_KEY";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub artwork: ArtworkConfig,
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PathsConfig {
    pub games_root: Option<PathBuf>,
    pub shortcuts_dir: Option<PathBuf>,
    pub steam_root: Option<PathBuf>,
    pub steam_user: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ArtworkConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "https://www.steamgriddb.com/api/v2".to_string() }
fn default_timeout_secs() -> u64 { 15 }

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ArtworkConfig {
    /// The environment variable wins over the file so keys can stay out of it.
    pub fn resolved_api_key(&self) -> Option<String> {
        env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.api_key.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Exclusion and bonus lists for main-executable selection.
#[derive(Deserialize, Debug, Clone)]
pub struct HeuristicsConfig {
    #[serde(default = "default_executable_extension")]
    pub executable_extension: String,
    #[serde(default = "default_shortcut_extension")]
    pub shortcut_extension: String,
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    #[serde(default = "default_ignore_names")]
    pub ignore_names: Vec<String>,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_preferred_dirs")]
    pub preferred_dirs: Vec<String>,
}

fn default_executable_extension() -> String { "exe".to_string() }
fn default_shortcut_extension() -> String { "lnk".to_string() }

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_ignore_dirs() -> Vec<String> {
    strings(&[
        "easyanticheat", "battleye", "redist", "_redist", "prereqs", "support", "tools",
        "crashhandler", "crashreporter", "updater", "patch", "modtools", "sdk",
        "uninstall", "installers", "debug", "fpb",
    ])
}

fn default_ignore_names() -> Vec<String> {
    strings(&[
        "install", "installhelper", "setup", "setup_x64", "setup_x86",
        "uninstall", "unins000", "unins0001", "uninstaller",
        "vcredist", "dotnetfx", "directx", "dxsetup",
        "updater", "patcher", "launcher_updater",
        "easyanticheat", "eac", "eac_launcher", "battleye",
        "beservice", "bgsvc", "aced", "unitycrashhandler64",
        "steamhelper", "steamerrorreporter", "cefclient",
        "support", "tools", "crashhandler", "crashreporter",
        "patch", "modtools", "sdk", "debug", "fpb",
    ])
}

fn default_ignore_patterns() -> Vec<String> {
    strings(&[
        r"^(setup|install|uninstal|unins|update|patch|vcredist|dxsetup)\b",
        r"unins\d{0,4}",
        r"^dotnetfx",
        r"easy[\W_]*anticheat",
        r"battle[\W_]*eye",
        r"unity[\W_]*crashhandler",
        r"steam[\W_]*(helper|errorreporter)",
        r"cef(client|helper)",
        r"crash(report|handler)",
        r"(?:_|\b)(debug|fpb|vcredist)(?:_|\b|$)",
        r"(?:_|\b)(setup|installer)(?:_|\b|$)",
    ])
}

fn default_preferred_dirs() -> Vec<String> {
    strings(&["binaries", "bin", "x64", "win64", "win32", "windowsnoeditor"])
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            executable_extension: default_executable_extension(),
            shortcut_extension: default_shortcut_extension(),
            ignore_dirs: default_ignore_dirs(),
            ignore_names: default_ignore_names(),
            ignore_patterns: default_ignore_patterns(),
            preferred_dirs: default_preferred_dirs(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "nonsteam-sync", "nonsteam-sync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Loads the config file. An explicit path must exist; the default one may not.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    Ok(config)
}

/// Every filesystem location the reconciliation pass touches.
#[derive(Debug, Clone)]
pub struct SyncPaths {
    pub games_root: PathBuf,
    pub shortcuts_dir: PathBuf,
    pub user_config_dir: PathBuf,
    pub catalog_file: PathBuf,
    pub preview_file: PathBuf,
    pub grid_dir: PathBuf,
}

impl SyncPaths {
    /// Lays out the catalog, preview and grid locations under a Steam user config dir.
    pub fn new(games_root: PathBuf, shortcuts_dir: PathBuf, user_config_dir: PathBuf) -> Self {
        Self {
            catalog_file: user_config_dir.join("shortcuts.vdf"),
            preview_file: user_config_dir.join("shortcuts.json"),
            grid_dir: user_config_dir.join("grid"),
            games_root,
            shortcuts_dir,
            user_config_dir,
        }
    }
}

fn default_steam_root() -> PathBuf {
    if cfg!(windows) {
        return PathBuf::from("C:/Program Files (x86)/Steam");
    }
    if let Some(base) = BaseDirs::new() {
        let candidates = [
            base.data_dir().join("Steam"),
            base.home_dir().join(".steam/steam"),
            base.home_dir().join("Library/Application Support/Steam"),
        ];
        if let Some(found) = candidates.iter().find(|p| p.is_dir()) {
            return found.clone();
        }
        return candidates[0].clone();
    }
    PathBuf::from(".steam/steam")
}

/// Picks `userdata/<user>/config`, or the first account folder by name.
pub fn locate_user_config(steam_root: &Path, user: Option<&str>) -> Result<PathBuf, SyncError> {
    let userdata = steam_root.join("userdata");

    if let Some(user) = user {
        let dir = userdata.join(user);
        if dir.is_dir() {
            return Ok(dir.join("config"));
        }
        return Err(SyncError::SteamUserNotFound(dir));
    }

    let mut accounts: Vec<PathBuf> = fs::read_dir(&userdata)
        .map_err(|_| SyncError::SteamUserdataMissing(userdata.clone()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    accounts.sort();

    accounts
        .into_iter()
        .next()
        .map(|account| account.join("config"))
        .ok_or(SyncError::SteamUserdataMissing(userdata))
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Default, Clone)]
pub struct PathOverrides {
    pub games_root: Option<PathBuf>,
    pub shortcuts_dir: Option<PathBuf>,
    pub steam_root: Option<PathBuf>,
    pub steam_user: Option<String>,
}

pub fn resolve_paths(config: &PathsConfig, overrides: PathOverrides) -> Result<SyncPaths> {
    let games_root = match overrides.games_root.or_else(|| config.games_root.clone()) {
        Some(root) => root,
        None => env::current_dir().context("current directory is not accessible")?,
    };
    let games_root = games_root
        .canonicalize()
        .with_context(|| format!("games root {} is not accessible", games_root.display()))?;

    let shortcuts_dir = overrides
        .shortcuts_dir
        .or_else(|| config.shortcuts_dir.clone())
        .unwrap_or_else(|| games_root.join("Shortcuts"));
    let shortcuts_dir = shortcuts_dir.canonicalize().unwrap_or(shortcuts_dir);

    let steam_root = overrides
        .steam_root
        .or_else(|| config.steam_root.clone())
        .unwrap_or_else(default_steam_root);
    let steam_user = overrides.steam_user.or_else(|| config.steam_user.clone());

    let user_config_dir = locate_user_config(&steam_root, steam_user.as_deref())?;
    let paths = SyncPaths::new(games_root, shortcuts_dir, user_config_dir);

    fs::create_dir_all(&paths.grid_dir)
        .map_err(|source| SyncError::GridDir { path: paths.grid_dir.clone(), source })?;
    Ok(paths)
}
