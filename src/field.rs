//! Item values and their on-disk representation.
//!
//! | kind    | file contents                      |
//! |---------|------------------------------------|
//! | address | 8 lowercase hex digits and newline |
//! | integer | decimal and newline                |
//! | string  | the text and newline               |
//! | blob    | the raw bytes                      |

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;

use crate::errors::{ConfigError, Error, Result};
use crate::item::{Item, ItemKind};

/// The value of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Address(u32),
    Integer(u32),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ItemKind {
        match self {
            Value::Address(_) => ItemKind::Address,
            Value::Integer(_) => ItemKind::Integer,
            Value::Text(_) => ItemKind::String,
            Value::Blob(_) => ItemKind::Blob,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::Address(value) | Value::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(data) => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Parses a value given on the command line. Addresses are hexadecimal
    /// with an optional `0x` prefix, integers are decimal and strings are
    /// taken as they are. Blobs cannot be given by value.
    pub fn parse_literal(item: Item, literal: &str) -> Result<Value, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            item,
            value: literal.to_owned(),
        };
        match item.kind() {
            ItemKind::Address => parse_hex(literal.trim())
                .map(Value::Address)
                .ok_or_else(invalid),
            ItemKind::Integer => parse_decimal(literal.trim())
                .map(Value::Integer)
                .ok_or_else(invalid),
            ItemKind::String => Ok(Value::Text(literal.to_owned())),
            ItemKind::Blob => Err(ConfigError::NotAValue(item)),
        }
    }

    /// The text stored in a scalar item's file, without the newline.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Address(value) => Some(format!("{:08x}", value)),
            Value::Integer(value) => Some(value.to_string()),
            Value::Text(text) => Some(text.clone()),
            Value::Blob(_) => None,
        }
    }
}

/// A short form of a value for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// The rendered scalar.
    Scalar(String),
    /// The length of a blob.
    Bytes(usize),
}

impl Value {
    pub fn summary(&self) -> Summary {
        match self {
            Value::Blob(data) => Summary::Bytes(data.len()),
            scalar => Summary::Scalar(scalar.render().unwrap_or_default()),
        }
    }
}

fn strip_hex_prefix(token: &str) -> &str {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token)
}

fn parse_hex(token: &str) -> Option<u32> {
    let digits = strip_hex_prefix(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

fn parse_decimal(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// The values of a set of items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: BTreeMap<Item, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `item`, returning its previous value.
    pub fn insert(&mut self, item: Item, value: Value) -> Option<Value> {
        debug_assert_eq!(item.kind(), value.kind(), "wrong kind of value for {}", item);
        self.values.insert(item, value)
    }

    pub fn get(&self, item: Item) -> Option<&Value> {
        self.values.get(&item)
    }

    pub fn contains(&self, item: Item) -> bool {
        self.values.contains_key(&item)
    }

    pub fn u32(&self, item: Item) -> Option<u32> {
        self.get(item).and_then(Value::as_u32)
    }

    pub fn text(&self, item: Item) -> Option<&str> {
        self.get(item).and_then(Value::as_str)
    }

    /// Removes and returns the contents of a blob item.
    pub fn take_blob(&mut self, item: Item) -> Option<Vec<u8>> {
        match self.values.remove(&item) {
            Some(Value::Blob(data)) => Some(data),
            Some(other) => {
                self.values.insert(item, other);
                None
            }
            None => None,
        }
    }

    /// Iterates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Item, &Value)> {
        self.values.iter().map(|(item, value)| (*item, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Writes a scalar value as its one line of text.
pub fn write_scalar(path: &Path, value: &Value) -> Result<()> {
    let text = match value.render() {
        Some(text) => text,
        None => return write_blob(path, value.as_bytes().unwrap_or_default()),
    };
    File::create(path)
        .and_then(|mut file| writeln!(file, "{}", text))
        .map_err(Error::io(path))?;
    debug!("Wrote '{}' to '{}'", text, path.display());
    Ok(())
}

/// Reads a scalar value of `kind` back from its file.
pub fn read_scalar(path: &Path, kind: ItemKind) -> Result<Value> {
    let data = read_blob(path)?;
    parse_scalar(path, kind, data)
}

/// Like [`read_scalar`], but a file that cannot be opened is absent rather
/// than an error. Failing to read an opened file is still an error.
pub fn read_scalar_if_present(path: &Path, kind: ItemKind) -> Result<Option<Value>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            debug!("Cannot open '{}': {}", path.display(), error);
            return Ok(None);
        }
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(Error::io(path))?;
    parse_scalar(path, kind, data).map(Some)
}

fn parse_scalar(path: &Path, kind: ItemKind, data: Vec<u8>) -> Result<Value> {
    let format_error = |expected| Error::Format {
        path: path.to_owned(),
        expected,
    };
    let text = String::from_utf8_lossy(&data);
    let token = text.split_whitespace().next().unwrap_or("");

    match kind {
        ItemKind::Address => parse_hex(token)
            .filter(|_| strip_hex_prefix(token).len() <= 8)
            .map(Value::Address)
            .ok_or_else(|| format_error("%08x")),
        ItemKind::Integer => parse_decimal(token)
            .map(Value::Integer)
            .ok_or_else(|| format_error("%u")),
        ItemKind::String => {
            let text = std::str::from_utf8(&data).map_err(|_| format_error("UTF-8 text"))?;
            let line = text.split('\n').next().unwrap_or("");
            Ok(Value::Text(line.to_owned()))
        }
        ItemKind::Blob => Ok(Value::Blob(data.clone())),
    }
}

/// Writes raw bytes, replacing the file if it exists.
pub fn write_blob(path: &Path, data: &[u8]) -> Result<()> {
    File::create(path)
        .and_then(|mut file| file.write_all(data))
        .map_err(Error::io(path))?;
    debug!("Wrote {} bytes to '{}'", data.len(), path.display());
    Ok(())
}

/// Reads a whole file.
pub fn read_blob(path: &Path) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut data))
        .map_err(Error::io(path))?;
    Ok(data)
}

/// Like [`read_blob`], but a file that does not exist is absent rather than
/// an error.
pub fn read_blob_if_present(path: &Path) -> Result<Option<Vec<u8>>> {
    match read_blob(path) {
        Ok(data) => Ok(Some(data)),
        Err(error) if error.is_not_found() => Ok(None),
        Err(error) => Err(error),
    }
}

/// Writes `value` in the format of its kind.
pub fn write_value(path: &Path, value: &Value) -> Result<()> {
    match value {
        Value::Blob(data) => write_blob(path, data),
        scalar => write_scalar(path, scalar),
    }
}

/// Reads a value of `kind`.
pub fn read_value(path: &Path, kind: ItemKind) -> Result<Value> {
    match kind {
        ItemKind::Blob => read_blob(path).map(Value::Blob),
        scalar => read_scalar(path, scalar),
    }
}
