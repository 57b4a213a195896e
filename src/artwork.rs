use crate::config::ArtworkConfig;
use crate::model::ImageKind;
use anyhow::{Context, Result};
use image::ImageFormat;
use log::{debug, error, info, warn};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Outcome of one remote lookup. Callers decide whether to go on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(String),
}

pub trait ArtworkProvider {
    fn search_identity(&self, name: &str) -> Lookup<u64>;
    fn image_url(&self, game_id: u64, kind: ImageKind) -> Lookup<String>;
    fn download(&self, url: &str) -> Lookup<Vec<u8>>;
}

/// Used when no API key is configured.
pub struct NoArtwork;

impl ArtworkProvider for NoArtwork {
    fn search_identity(&self, _name: &str) -> Lookup<u64> {
        Lookup::NotFound
    }

    fn image_url(&self, _game_id: u64, _kind: ImageKind) -> Lookup<String> {
        Lookup::NotFound
    }

    fn download(&self, _url: &str) -> Lookup<Vec<u8>> {
        Lookup::NotFound
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, PartialEq, Deserialize)]
struct GameHit {
    id: u64,
}

#[derive(Debug, PartialEq, Deserialize)]
struct ImageHit {
    url: Option<String>,
}

pub struct SteamGridDb {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SteamGridDb {
    pub fn new(config: &ArtworkConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nonsteam-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Request paths tried in order for each image kind.
    fn queries(kind: ImageKind, game_id: u64) -> Vec<String> {
        match kind {
            ImageKind::TallGrid => vec![
                format!("grids/game/{game_id}?dimensions=600x900"),
                format!("grids/game/{game_id}"),
            ],
            ImageKind::WideCapsule => vec![
                format!("grids/game/{game_id}?dimensions=920x430"),
                format!("grids/game/{game_id}?dimensions=460x215"),
            ],
            ImageKind::Hero => vec![format!("heroes/game/{game_id}")],
            ImageKind::Logo => vec![format!("logos/game/{game_id}")],
            ImageKind::Icon => vec![format!("icons/game/{game_id}")],
        }
    }

    fn get_first<T: DeserializeOwned>(&self, url: Url) -> Lookup<T> {
        let response = match self.client.get(url.clone()).bearer_auth(&self.api_key).send() {
            Ok(r) => r,
            Err(e) => return Lookup::Failed(format!("{url}: {e}")),
        };
        let status = response.status();
        if status != StatusCode::OK {
            debug!("{} -> status {}", url, status);
        }
        match response.text() {
            Ok(body) => match classify(status, &body) {
                Lookup::Failed(e) => Lookup::Failed(format!("{url}: {e}")),
                other => other,
            },
            Err(e) => Lookup::Failed(format!("{url}: {e}")),
        }
    }
}

/// Reads one API reply: the first `data` item when the call succeeded.
fn classify<T: DeserializeOwned>(status: StatusCode, body: &str) -> Lookup<T> {
    if status != StatusCode::OK {
        return Lookup::NotFound;
    }
    match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(reply) if reply.success => match reply.data.into_iter().next() {
            Some(first) => Lookup::Found(first),
            None => Lookup::NotFound,
        },
        Ok(_) => Lookup::NotFound,
        Err(e) => Lookup::Failed(e.to_string()),
    }
}

/// First usable image URL. A failure only counts when nothing was found.
fn first_image(attempts: impl IntoIterator<Item = Lookup<ImageHit>>) -> Lookup<String> {
    let mut last_failure = None;
    for attempt in attempts {
        match attempt {
            Lookup::Found(ImageHit { url: Some(found) }) => return Lookup::Found(found),
            Lookup::Found(_) | Lookup::NotFound => {}
            Lookup::Failed(e) => last_failure = Some(e),
        }
    }
    match last_failure {
        Some(e) => Lookup::Failed(e),
        None => Lookup::NotFound,
    }
}

impl ArtworkProvider for SteamGridDb {
    fn search_identity(&self, name: &str) -> Lookup<u64> {
        let mut url = match Url::parse(&format!("{}/search/autocomplete", self.base_url)) {
            Ok(url) => url,
            Err(e) => return Lookup::Failed(e.to_string()),
        };
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.push(name);
            }
            Err(()) => return Lookup::Failed(format!("base url {} cannot hold a path", self.base_url)),
        }
        match self.get_first::<GameHit>(url) {
            Lookup::Found(hit) => Lookup::Found(hit.id),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Failed(e) => Lookup::Failed(e),
        }
    }

    fn image_url(&self, game_id: u64, kind: ImageKind) -> Lookup<String> {
        // Lazy, so later queries only run while nothing has been found.
        first_image(Self::queries(kind, game_id).into_iter().map(|query| {
            match Url::parse(&format!("{}/{}", self.base_url, query)) {
                Ok(url) => self.get_first::<ImageHit>(url),
                Err(e) => Lookup::Failed(e.to_string()),
            }
        }))
    }

    fn download(&self, url: &str) -> Lookup<Vec<u8>> {
        let response = match self.client.get(url).send() {
            Ok(r) => r,
            Err(e) => return Lookup::Failed(format!("{url}: {e}")),
        };
        if !response.status().is_success() {
            warn!("Download {} failed with status {}", url, response.status());
            return Lookup::NotFound;
        }
        match response.bytes() {
            Ok(bytes) => Lookup::Found(bytes.to_vec()),
            Err(e) => Lookup::Failed(format!("{url}: {e}")),
        }
    }
}

/// The Steam `grid` folder: one PNG per (identity, image kind).
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, identity: u32, kind: ImageKind) -> PathBuf {
        self.dir.join(kind.file_name(identity))
    }

    pub fn missing(&self, identity: u32) -> Vec<ImageKind> {
        ImageKind::ALL
            .into_iter()
            .filter(|kind| !self.path_for(identity, *kind).exists())
            .collect()
    }

    pub fn icon(&self, identity: u32) -> Option<PathBuf> {
        let path = self.path_for(identity, ImageKind::Icon);
        path.exists().then_some(path)
    }

    /// Stores an image as PNG, converting other formats first.
    pub fn store(&self, identity: u32, kind: ImageKind, bytes: &[u8]) -> Result<PathBuf> {
        let png = match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => bytes.to_vec(),
            _ => {
                let decoded = image::load_from_memory(bytes).context("not a decodable image")?;
                let mut out = Vec::new();
                decoded.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
                out
            }
        };

        let path = self.path_for(identity, kind);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&png)?;
        tmp.persist(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }

    /// Deletes artifacts whose identity is not in `valid`. Returns how many went.
    pub fn sweep_orphans(&self, valid: &HashSet<u32>) -> usize {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Cannot list artwork folder {:?}: {}", self.dir, e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(identity) = artifact_identity(&path) else {
                continue;
            };
            if valid.contains(&identity) {
                continue;
            }
            info!("Removing orphaned artwork {:?}", path);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => error!("Failed to remove {:?}: {}", path, e),
            }
        }
        removed
    }
}

/// Identity encoded in an artifact file name, if it follows the convention.
pub fn artifact_identity(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits = ["p", "_hero", "_logo", "_icon"]
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(stem);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub downloaded: usize,
    pub failed: usize,
}

/// Looks `name` up and downloads every image kind still missing for `identity`.
pub fn fill_missing(
    provider: &dyn ArtworkProvider,
    cache: &ArtifactCache,
    identity: u32,
    name: &str,
) -> FillReport {
    let mut report = FillReport::default();
    let missing = cache.missing(identity);
    if missing.is_empty() {
        return report;
    }

    let game_id = match provider.search_identity(name) {
        Lookup::Found(id) => id,
        Lookup::NotFound => {
            warn!("No artwork match for '{}'", name);
            return report;
        }
        Lookup::Failed(e) => {
            error!("Artwork search for '{}' failed: {}", name, e);
            report.failed += 1;
            return report;
        }
    };

    for kind in missing {
        let url = match provider.image_url(game_id, kind) {
            Lookup::Found(url) => url,
            Lookup::NotFound => {
                debug!("No {} image for '{}'", kind, name);
                continue;
            }
            Lookup::Failed(e) => {
                error!("Fetching {} image for '{}' failed: {}", kind, name, e);
                report.failed += 1;
                continue;
            }
        };
        let bytes = match provider.download(&url) {
            Lookup::Found(bytes) => bytes,
            Lookup::NotFound => continue,
            Lookup::Failed(e) => {
                error!("Downloading {} failed: {}", url, e);
                report.failed += 1;
                continue;
            }
        };
        match cache.store(identity, kind, &bytes) {
            Ok(path) => {
                info!("Saved {} image {:?}", kind, path);
                report.downloaded += 1;
            }
            Err(e) => {
                error!("Storing {} image for '{}' failed: {:#}", kind, name, e);
                report.failed += 1;
            }
        }
    }
    report
}
