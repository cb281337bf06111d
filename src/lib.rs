//! Library for taking Android boot images apart into individual item files
//! and putting them back together again.
//!
//! Plain Android, Bump'd, Loki'd and Sony ELF boot images are understood. An
//! image is unpacked into one file per item (kernel command line, board name,
//! load addresses, kernel, ramdisk, ...) and any directory of such files can be
//! packed back into an image of a chosen type.
#![warn(
    unused_imports,
    missing_debug_implementations,
    clippy::all,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    variant_size_differences
)]

pub mod defaults;
pub mod errors;
pub mod field;
pub mod header;
pub mod image;
pub mod item;
pub mod pack;
pub mod paths;
pub mod unpack;

pub use defaults::Defaults;
pub use errors::{AssembleError, ConfigError, Error, ParseError, Result};
pub use field::{Fields, Summary, Value};
pub use image::{BootImage, BootImageType, ImageCodec, StandardCodec};
pub use item::{Item, ItemDescriptor, ItemKind};
pub use pack::{pack, Origin, PackOptions, PackReport};
pub use paths::{Overrides, Prefix, ResolvedPaths, Source};
pub use unpack::{unpack, UnpackOptions, UnpackReport};
