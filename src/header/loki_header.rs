use super::consts::loki::*;
use super::HeaderTrait;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Error as IoError, Read, Write};

/// Header Loki places at offset 0x400 of a patched image, recording what the
/// Android header contained before patching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LokiHeader {
    pub magic: [u8; LOKI_MAGIC_SIZE],
    /// Non-zero for recovery images.
    pub recovery: u32,
    pub build: [u8; LOKI_BUILD_SIZE],
    pub orig_kernel_size: u32,
    pub orig_ramdisk_size: u32,
    pub ramdisk_address: u32,
}

impl LokiHeader {
    /// Old Loki versions did not record the original sizes.
    pub fn has_original_values(&self) -> bool {
        self.orig_kernel_size != 0 && self.orig_ramdisk_size != 0 && self.ramdisk_address != 0
    }
}

impl HeaderTrait for LokiHeader {
    fn get_header_size(&self) -> usize {
        LOKI_HEADER_SIZE
    }

    fn has_correct_magic(&self) -> bool {
        self.magic == LOKI_MAGIC
    }

    fn read_from<R>(src: &mut R) -> Result<Self, IoError>
    where
        Self: Sized,
        R: Read,
    {
        let mut header = Self::default();
        src.read_exact(&mut header.magic)?;
        header.recovery = src.read_u32::<LittleEndian>()?;
        src.read_exact(&mut header.build)?;
        header.orig_kernel_size = src.read_u32::<LittleEndian>()?;
        header.orig_ramdisk_size = src.read_u32::<LittleEndian>()?;
        header.ramdisk_address = src.read_u32::<LittleEndian>()?;
        Ok(header)
    }

    fn write_to<W>(&self, dst: &mut W) -> Result<usize, IoError>
    where
        Self: Sized,
        W: Write,
    {
        dst.write_all(&self.magic)?;
        dst.write_u32::<LittleEndian>(self.recovery)?;
        dst.write_all(&self.build)?;
        dst.write_u32::<LittleEndian>(self.orig_kernel_size)?;
        dst.write_u32::<LittleEndian>(self.orig_ramdisk_size)?;
        dst.write_u32::<LittleEndian>(self.ramdisk_address)?;
        Ok(LOKI_HEADER_SIZE)
    }
}

impl Default for LokiHeader {
    fn default() -> Self {
        Self {
            magic: LOKI_MAGIC,
            recovery: 0,
            build: [0; LOKI_BUILD_SIZE],
            orig_kernel_size: 0,
            orig_ramdisk_size: 0,
            ramdisk_address: 0,
        }
    }
}
