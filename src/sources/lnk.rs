//! Reading targets out of Windows `.lnk` files without the host shell.

use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use std::path::{Path, PathBuf};

const HEADER_SIZE: usize = 0x4C;

const HAS_LINK_TARGET_ID_LIST: u32 = 0x0001;
const HAS_LINK_INFO: u32 = 0x0002;
const HAS_NAME: u32 = 0x0004;
const HAS_RELATIVE_PATH: u32 = 0x0008;
const HAS_WORKING_DIR: u32 = 0x0010;
const HAS_ARGUMENTS: u32 = 0x0020;
const IS_UNICODE: u32 = 0x0080;

const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x0001;

/// What the structured part of a link file says.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShellLink {
    pub local_path: Option<String>,
    pub relative_path: Option<String>,
    pub arguments: Option<String>,
}

fn u16_at(data: &[u8], pos: usize) -> Option<u16> {
    Some(u16::from_le_bytes(data.get(pos..pos + 2)?.try_into().ok()?))
}

fn u32_at(data: &[u8], pos: usize) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(pos..pos + 4)?.try_into().ok()?))
}

fn ansi_z(data: &[u8], pos: usize) -> Option<String> {
    let rest = data.get(pos..)?;
    let end = rest.iter().position(|&b| b == 0)?;
    Some(rest[..end].iter().map(|&b| b as char).collect())
}

fn unicode_z(data: &[u8], pos: usize) -> Option<String> {
    let rest = data.get(pos..)?;
    let units: Vec<u16> = rest
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

impl ShellLink {
    /// Parses the header, LinkInfo and StringData sections. `None` if the
    /// bytes are not a shell link at all.
    pub fn parse(data: &[u8]) -> Option<ShellLink> {
        if u32_at(data, 0)? as usize != HEADER_SIZE {
            return None;
        }
        let flags = u32_at(data, 0x14)?;
        let mut pos = HEADER_SIZE;
        let mut link = ShellLink::default();

        if flags & HAS_LINK_TARGET_ID_LIST != 0 {
            pos += 2 + u16_at(data, pos)? as usize;
        }

        if flags & HAS_LINK_INFO != 0 {
            let info_size = u32_at(data, pos)? as usize;
            link.local_path = Self::local_path(data.get(pos..pos + info_size)?);
            pos += info_size;
        }

        let unicode = flags & IS_UNICODE != 0;
        let next_string = |pos: &mut usize| -> Option<String> {
            let count = u16_at(data, *pos)? as usize;
            *pos += 2;
            let bytes = if unicode { count * 2 } else { count };
            let raw = data.get(*pos..*pos + bytes)?;
            *pos += bytes;
            Some(if unicode {
                let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
                String::from_utf16_lossy(&units)
            } else {
                raw.iter().map(|&b| b as char).collect()
            })
        };

        if flags & HAS_NAME != 0 {
            next_string(&mut pos)?;
        }
        if flags & HAS_RELATIVE_PATH != 0 {
            link.relative_path = next_string(&mut pos);
        }
        if flags & HAS_WORKING_DIR != 0 {
            next_string(&mut pos)?;
        }
        if flags & HAS_ARGUMENTS != 0 {
            link.arguments = next_string(&mut pos);
        }
        Some(link)
    }

    fn local_path(info: &[u8]) -> Option<String> {
        let header_size = u32_at(info, 4)? as usize;
        let info_flags = u32_at(info, 8)?;
        if info_flags & VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
            return None;
        }

        // Unicode offsets exist only in the extended header.
        let (base, suffix) = if header_size >= 0x24 {
            (
                unicode_z(info, u32_at(info, 28)? as usize),
                unicode_z(info, u32_at(info, 32)? as usize),
            )
        } else {
            (
                ansi_z(info, u32_at(info, 16)? as usize),
                ansi_z(info, u32_at(info, 24)? as usize),
            )
        };

        let mut path = base?;
        if let Some(suffix) = suffix {
            path.push_str(&suffix);
        }
        (!path.is_empty()).then_some(path)
    }

    /// The target as an absolute path when the link names one.
    pub fn target(&self, link_dir: &Path) -> Option<PathBuf> {
        if let Some(local) = self.local_path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Some(PathBuf::from(local.trim()));
        }
        let relative = self.relative_path.as_deref()?.trim();
        (!relative.is_empty()).then(|| link_dir.join(relative))
    }
}

/// Path-looking strings ending in `.{extension}`, in discovery order, without duplicates.
///
/// The bytes are read as UTF-16LE, as Latin-1, and as raw bytes, since a
/// damaged link can carry its target in any of those forms.
pub fn scan_for_paths(data: &[u8], extension: &str) -> Vec<String> {
    let ext = regex::escape(extension);
    let mut candidates: Vec<String> = Vec::new();

    if let Ok(re) = Regex::new(&format!(r#"(?i)((?:[A-Za-z]:\\|/)[^"\r\n\x00]{{1,400}}\.{ext})"#)) {
        let units: Vec<u16> = data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        let wide = String::from_utf16_lossy(&units);
        candidates.extend(re.find_iter(&wide).map(|m| m.as_str().to_string()));

        let latin1: String = data.iter().map(|&b| b as char).collect();
        candidates.extend(re.find_iter(&latin1).map(|m| m.as_str().to_string()));
    }

    if let Ok(re) = BytesRegex::new(&format!(r#"(?i-u)((?:[A-Za-z]:\\|/)[^"\r\n\x00]{{1,400}}\.{ext})"#)) {
        candidates.extend(re.find_iter(data).map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned()));
    }

    let mut out: Vec<String> = Vec::new();
    for candidate in candidates {
        let cleaned = candidate.trim().trim_matches('"').trim().to_string();
        if !cleaned.is_empty() && !out.contains(&cleaned) {
            out.push(cleaned);
        }
    }
    out
}
