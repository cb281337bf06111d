use std::io::{Error as IoError, Read, Write};
use std::str::Utf8Error;

pub mod consts;
mod android_header;
mod elf_header;
mod loki_header;

pub use self::android_header::AndroidHeader;
pub use self::elf_header::{ElfHeader, ProgramHeader};
pub use self::loki_header::LokiHeader;

/// A fixed-size structure at the start of (part of) a boot image.
pub trait HeaderTrait {
    fn get_header_size(&self) -> usize;
    fn has_correct_magic(&self) -> bool;
    fn read_from<R>(src: &mut R) -> Result<Self, IoError>
    where
        Self: Sized,
        R: Read;
    fn write_to<W>(&self, dst: &mut W) -> Result<usize, IoError>
    where
        Self: Sized,
        W: Write;
}

/// The bytes of a fixed-size field up to the first NUL.
pub(crate) fn c_bytes(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Reads a NUL-terminated UTF-8 string out of a fixed-size field.
pub(crate) fn c_string(field: &[u8]) -> Result<String, Utf8Error> {
    std::str::from_utf8(c_bytes(field)).map(str::to_owned)
}

/// Copies as much of `src` as fits into `dst`, zero filling the rest.
/// Returns how many bytes were copied.
pub(crate) fn copy_truncated(dst: &mut [u8], src: &[u8]) -> usize {
    let len = src.len().min(dst.len());
    dst[..len].copy_from_slice(&src[..len]);
    dst[len..].fill(0);
    len
}
