use std::path::PathBuf;
use thiserror::Error;

/// Failures that end the run before or around the catalog store.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Steam userdata not found at {0}; set paths.steam_root or --steam-root")]
    SteamUserdataMissing(PathBuf),
    #[error("Steam account folder {0} does not exist")]
    SteamUserNotFound(PathBuf),
    #[error("cannot create artwork directory {path}: {source}")]
    GridDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog {path} is not a valid shortcuts file: {source}")]
    CatalogMalformed {
        path: PathBuf,
        #[source]
        source: VdfError,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VdfError {
    #[error("unexpected end of data at byte {0}")]
    Truncated(usize),
    #[error("unknown field type 0x{kind:02x} at byte {offset}")]
    UnknownType { kind: u8, offset: usize },
    #[error("maps nested too deeply at byte {0}")]
    TooDeep(usize),
}
