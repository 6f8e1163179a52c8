//! Vendor schema tree.
//!
//! - [`SchemaNode`]: ordered, recursive key/value node with typed accessors
//! - [`parse_schema`] / [`load_schema_file`]: binary KeyValues reader
//! - [`resolve_localized`]: language-aware display string lookup

pub mod localize;
pub mod node;
pub mod reader;

pub use localize::{FALLBACK_LANGUAGE, resolve_localized};
pub use node::{SchemaNode, SchemaValue};
pub use reader::{SchemaError, encode_schema, load_schema_file, parse_schema, schema_path};
