//! Binary KeyValues, the format Steam uses for `shortcuts.vdf`.

use crate::error::VdfError;
use serde_json::{Map, Value as Json};

const TYPE_MAP: u8 = 0x00;
const TYPE_STRING: u8 = 0x01;
const TYPE_INT32: u8 = 0x02;
const TYPE_FLOAT32: u8 = 0x03;
const TYPE_UINT64: u8 = 0x07;
const TYPE_END: u8 = 0x08;
const TYPE_INT64: u8 = 0x0A;

/// Nesting limit for maps; Steam's own files stay a few levels deep.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum VdfValue {
    Map(VdfMap),
    Str(String),
    Int(i32),
    Float(f32),
    UInt64(u64),
    Int64(i64),
}

/// Ordered key/value pairs; Steam relies on insertion order for some maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VdfMap(pub Vec<(String, VdfValue)>);

impl VdfMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: VdfValue) {
        self.0.push((key.into(), value));
    }

    /// Steam treats keys case-insensitively.
    pub fn get(&self, key: &str) -> Option<&VdfValue> {
        self.0.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, VdfValue)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> Json {
        let mut out = Map::new();
        for (key, value) in &self.0 {
            out.insert(key.clone(), value.to_json());
        }
        Json::Object(out)
    }
}

impl VdfValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VdfValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of numeric or decimal-text values.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            VdfValue::Int(v) => Some(i128::from(*v)),
            VdfValue::UInt64(v) => Some(i128::from(*v)),
            VdfValue::Int64(v) => Some(i128::from(*v)),
            VdfValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        self.as_i128().map(|v| v != 0).unwrap_or(false)
    }

    pub fn to_json(&self) -> Json {
        match self {
            VdfValue::Map(m) => m.to_json(),
            VdfValue::Str(s) => Json::from(s.as_str()),
            VdfValue::Int(v) => Json::from(*v),
            VdfValue::Float(v) => Json::from(f64::from(*v)),
            VdfValue::UInt64(v) => Json::from(*v),
            VdfValue::Int64(v) => Json::from(*v),
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], VdfError> {
        let end = self.pos + N;
        let slice = self.data.get(self.pos..end).ok_or(VdfError::Truncated(self.pos))?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn cstring(&mut self) -> Result<String, VdfError> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(VdfError::Truncated(self.data.len()))?;
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }

    fn map(&mut self, depth: usize) -> Result<VdfMap, VdfError> {
        if depth > MAX_DEPTH {
            return Err(VdfError::TooDeep(self.pos));
        }
        let root = depth == 0;
        let mut map = VdfMap::new();
        loop {
            let offset = self.pos;
            let kind = match self.byte() {
                Some(kind) => kind,
                // Some writers drop the final root terminator.
                None if root => return Ok(map),
                None => return Err(VdfError::Truncated(offset)),
            };
            if kind == TYPE_END {
                return Ok(map);
            }
            let key = self.cstring()?;
            let value = match kind {
                TYPE_MAP => VdfValue::Map(self.map(depth + 1)?),
                TYPE_STRING => VdfValue::Str(self.cstring()?),
                TYPE_INT32 => VdfValue::Int(i32::from_le_bytes(self.take()?)),
                TYPE_FLOAT32 => VdfValue::Float(f32::from_le_bytes(self.take()?)),
                TYPE_UINT64 => VdfValue::UInt64(u64::from_le_bytes(self.take()?)),
                TYPE_INT64 => VdfValue::Int64(i64::from_le_bytes(self.take()?)),
                other => return Err(VdfError::UnknownType { kind: other, offset }),
            };
            map.push(key, value);
        }
    }
}

pub fn decode(data: &[u8]) -> Result<VdfMap, VdfError> {
    Reader { data, pos: 0 }.map(0)
}

pub fn encode(root: &VdfMap) -> Vec<u8> {
    let mut out = Vec::new();
    write_map(&mut out, root);
    out
}

fn write_cstring(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

fn write_map(out: &mut Vec<u8>, map: &VdfMap) {
    for (key, value) in map.iter() {
        let kind = match value {
            VdfValue::Map(_) => TYPE_MAP,
            VdfValue::Str(_) => TYPE_STRING,
            VdfValue::Int(_) => TYPE_INT32,
            VdfValue::Float(_) => TYPE_FLOAT32,
            VdfValue::UInt64(_) => TYPE_UINT64,
            VdfValue::Int64(_) => TYPE_INT64,
        };
        out.push(kind);
        write_cstring(out, key);
        match value {
            VdfValue::Map(m) => write_map(out, m),
            VdfValue::Str(s) => write_cstring(out, s),
            VdfValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            VdfValue::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            VdfValue::UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
            VdfValue::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    out.push(TYPE_END);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.push(0x00);
        b.extend_from_slice(b"shortcuts\0");
        b.push(0x00);
        b.extend_from_slice(b"0\0");
        b.push(0x02);
        b.extend_from_slice(b"appid\0");
        b.extend_from_slice(&(-1_234_567_890i32).to_le_bytes());
        b.push(0x01);
        b.extend_from_slice(b"AppName\0Half-Life\0");
        b.push(0x00);
        b.extend_from_slice(b"tags\0");
        b.push(0x01);
        b.extend_from_slice(b"0\0favorite\0");
        b.push(0x08);
        b.push(0x08);
        b.push(0x08);
        b.push(0x08);
        b
    }

    #[test]
    fn decodes_steam_layout() {
        let root = decode(&sample_bytes()).expect("decode");
        let Some(VdfValue::Map(shortcuts)) = root.get("shortcuts") else {
            panic!("missing shortcuts map");
        };
        let Some(VdfValue::Map(entry)) = shortcuts.get("0") else {
            panic!("missing entry");
        };
        assert_eq!(entry.get("appid"), Some(&VdfValue::Int(-1_234_567_890)));
        assert_eq!(entry.get("AppName").and_then(VdfValue::as_str), Some("Half-Life"));
    }

    #[test]
    fn encode_reproduces_input_bytes() {
        let bytes = sample_bytes();
        let root = decode(&bytes).expect("decode");
        assert_eq!(encode(&root), bytes);
    }

    #[test]
    fn tolerates_missing_root_terminator() {
        let mut bytes = sample_bytes();
        bytes.pop();
        assert!(decode(&bytes).is_ok());
    }

    #[test]
    fn truncated_nested_map_is_an_error() {
        let bytes = sample_bytes();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(decode(cut), Err(VdfError::Truncated(_))));
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = decode(&[0x05, b'k', 0]).unwrap_err();
        assert_eq!(err, VdfError::UnknownType { kind: 0x05, offset: 0 });
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let nested = |levels: usize| {
            let mut bytes = Vec::new();
            for _ in 0..levels {
                bytes.extend_from_slice(&[0x00, b'k', 0]);
            }
            bytes.extend(std::iter::repeat_n(0x08, levels + 1));
            bytes
        };
        assert!(decode(&nested(MAX_DEPTH)).is_ok());
        assert!(matches!(decode(&nested(MAX_DEPTH + 1)), Err(VdfError::TooDeep(_))));
        assert!(matches!(decode(&nested(500_000)), Err(VdfError::TooDeep(_))));
    }

    #[test]
    fn json_view_keeps_keys() {
        let root = decode(&sample_bytes()).expect("decode");
        let json = root.to_json();
        assert_eq!(json["shortcuts"]["0"]["AppName"], "Half-Life");
        assert_eq!(json["shortcuts"]["0"]["tags"]["0"], "favorite");
    }
}
