//! Reader for the vendor's binary KeyValues schema files.
//!
//! A blob is a flat run of entries terminated by an end marker. Each entry is a
//! one byte type tag, a NUL-terminated UTF-8 name and a value. Subtree entries
//! recurse until their own end marker.

use super::node::{SchemaNode, SchemaValue};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

const TYPE_NONE: u8 = 0;
const TYPE_STRING: u8 = 1;
const TYPE_INT32: u8 = 2;
const TYPE_FLOAT32: u8 = 3;
const TYPE_POINTER: u8 = 4;
const TYPE_WIDE_STRING: u8 = 5;
const TYPE_COLOR: u8 = 6;
const TYPE_UINT64: u8 = 7;
const TYPE_END: u8 = 8;
const TYPE_ALTERNATE_END: u8 = 11;

/// Deepest subtree nesting accepted. Real schemas stay under ten levels.
pub const MAX_DEPTH: usize = 64;

/// Errors raised while decoding a binary schema blob
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema file not readable: {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected end of schema data at offset {0}")]
    UnexpectedEof(usize),

    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    #[error("Wide string values are not supported (key '{0}')")]
    UnsupportedWideString(String),

    #[error("Subtree nesting deeper than {} levels at offset {offset}", MAX_DEPTH)]
    TooDeep { offset: usize },

    #[error("Unknown value type {tag} at offset {offset}")]
    UnknownValueType { tag: u8, offset: usize },
}

/// Location of a game's schema inside the client install directory.
pub fn schema_path(install_dir: &Utf8Path, game_id: u32) -> Utf8PathBuf {
    install_dir
        .join("appcache")
        .join("stats")
        .join(format!("UserGameStatsSchema_{}.bin", game_id))
}

/// Read and parse a schema file from disk.
pub fn load_schema_file(path: &Utf8Path) -> Result<SchemaNode, SchemaError> {
    let data = fs::read(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Read {} bytes of schema from {}", data.len(), path);
    parse_schema(&data)
}

/// Parse a binary blob into an unnamed root node holding the top-level entries.
pub fn parse_schema(data: &[u8]) -> Result<SchemaNode, SchemaError> {
    let mut cursor = Cursor { data, offset: 0 };
    let mut root = SchemaNode::tree("", Vec::new());
    read_entries(&mut cursor, &mut root, 0)?;
    Ok(root)
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], SchemaError> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(SchemaError::UnexpectedEof(self.offset))?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, SchemaError> {
        Ok(self.take(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SchemaError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_string(&mut self) -> Result<String, SchemaError> {
        let start = self.offset;
        let rest = &self.data[start..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(SchemaError::UnexpectedEof(self.data.len()))?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|_| SchemaError::InvalidUtf8(start))?
            .to_string();
        self.offset = start + len + 1;
        Ok(text)
    }
}

fn read_entries(
    cursor: &mut Cursor<'_>,
    parent: &mut SchemaNode,
    depth: usize,
) -> Result<(), SchemaError> {
    loop {
        // Some blobs omit the final end marker of the root.
        if cursor.is_at_end() {
            return if depth == 0 {
                Ok(())
            } else {
                Err(SchemaError::UnexpectedEof(cursor.offset))
            };
        }

        let tag_offset = cursor.offset;
        let tag = cursor.read_u8()?;
        if tag == TYPE_END || tag == TYPE_ALTERNATE_END {
            return Ok(());
        }

        let name = cursor.read_string()?;
        let node = match tag {
            TYPE_NONE => {
                if depth >= MAX_DEPTH {
                    return Err(SchemaError::TooDeep { offset: tag_offset });
                }
                let mut subtree = SchemaNode::tree(name, Vec::new());
                read_entries(cursor, &mut subtree, depth + 1)?;
                subtree
            }
            TYPE_STRING => SchemaNode::leaf(name, SchemaValue::String(cursor.read_string()?)),
            TYPE_INT32 => SchemaNode::leaf(
                name,
                SchemaValue::Int32(i32::from_le_bytes(cursor.read_array()?)),
            ),
            TYPE_FLOAT32 => SchemaNode::leaf(
                name,
                SchemaValue::Float32(f32::from_le_bytes(cursor.read_array()?)),
            ),
            TYPE_POINTER => SchemaNode::leaf(
                name,
                SchemaValue::Pointer(u32::from_le_bytes(cursor.read_array()?)),
            ),
            TYPE_COLOR => SchemaNode::leaf(
                name,
                SchemaValue::Color(u32::from_le_bytes(cursor.read_array()?)),
            ),
            TYPE_UINT64 => SchemaNode::leaf(
                name,
                SchemaValue::UInt64(u64::from_le_bytes(cursor.read_array()?)),
            ),
            TYPE_WIDE_STRING => return Err(SchemaError::UnsupportedWideString(name)),
            other => {
                return Err(SchemaError::UnknownValueType {
                    tag: other,
                    offset: tag_offset,
                });
            }
        };
        parent.push_child(node);
    }
}

/// Serialize a tree back into the binary layout.
///
/// Used by tests and benchmarks to produce fixture blobs.
pub fn encode_schema(root: &SchemaNode) -> Vec<u8> {
    let mut out = Vec::new();
    encode_children(root, &mut out);
    out
}

fn encode_children(node: &SchemaNode, out: &mut Vec<u8>) {
    for child in node.children() {
        let (tag, payload): (u8, Vec<u8>) = match child.value() {
            SchemaValue::None => (TYPE_NONE, Vec::new()),
            SchemaValue::String(s) => (TYPE_STRING, nul_terminated(s)),
            SchemaValue::WideString(s) => (TYPE_WIDE_STRING, nul_terminated(s)),
            SchemaValue::Int32(v) => (TYPE_INT32, v.to_le_bytes().to_vec()),
            SchemaValue::Float32(v) => (TYPE_FLOAT32, v.to_le_bytes().to_vec()),
            SchemaValue::Pointer(v) => (TYPE_POINTER, v.to_le_bytes().to_vec()),
            SchemaValue::Color(v) => (TYPE_COLOR, v.to_le_bytes().to_vec()),
            SchemaValue::UInt64(v) => (TYPE_UINT64, v.to_le_bytes().to_vec()),
        };
        out.push(tag);
        out.extend(nul_terminated(child.name()));
        if tag == TYPE_NONE {
            encode_children(child, out);
        } else {
            out.extend(payload);
        }
    }
    out.push(TYPE_END);
}

fn nul_terminated(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
