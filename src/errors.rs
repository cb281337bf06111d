use std::io::{Error as IoError, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

use crate::image::BootImageType;
use crate::item::Item;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised while reading a boot image into memory.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error whilst reading boot image.")]
    Io(#[from] IoError),
    #[error("No boot image header found.")]
    UnknownFormat,
    #[error("The header does not have a page size set.")]
    NoPageSize,
    #[error("Page size {0} is not a power of two.")]
    InvalidPageSize(u32),
    #[error("The {0} field is not valid UTF-8.")]
    InvalidText(Item),
    #[error("The '{0}' section extends past the end of the image.")]
    Truncated(&'static str),
    #[error("Loki image does not record the original kernel and ramdisk.")]
    UnsupportedLoki,
    #[error("Malformed Sony ELF image: {0}.")]
    BadElf(&'static str),
}

/// Errors raised while writing a boot image.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("IO error whilst writing boot image.")]
    Io(#[from] IoError),
    #[error("Page size {0} is not a power of two.")]
    InvalidPageSize(u32),
    #[error("The {item} item is {len} bytes long, the maximum is {max}.")]
    TooLong {
        item: Item,
        len: usize,
        max: usize,
    },
    #[error("Cannot create {0} images: no patcher is available for this type.")]
    Unsupported(BootImageType),
}

/// Invalid combinations of options, caught before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("An aboot image must be specified to create a Loki image.")]
    MissingAboot,
    #[error("Invalid type '{0}', expected one of: android, bump, loki, sonyelf.")]
    InvalidType(String),
    #[error("Invalid {item}: '{value}'.")]
    InvalidValue { item: Item, value: String },
    #[error("The {0} item cannot be given by value.")]
    NotAValue(Item),
    #[error("Unknown item '{0}'.")]
    UnknownItem(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on '{}'.", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("{}: expected '{expected}' format.", path.display())]
    Format {
        path: PathBuf,
        expected: &'static str,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to parse boot image.")]
    Parse(#[from] ParseError),
    #[error("Failed to create boot image.")]
    Assemble(#[from] AssembleError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(IoError) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }

    /// Whether this is an I/O error for a file that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io { source, .. } => source.kind() == ErrorKind::NotFound,
            _ => false,
        }
    }
}
