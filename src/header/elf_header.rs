use super::consts::sony::*;
use super::HeaderTrait;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Error as IoError, Read, Write};

/// 32-bit little endian ELF file header, as used by Sony boot images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfHeader {
    pub ident: [u8; EI_NIDENT],
    pub kind: u16,
    pub machine: u16,
    pub version: u32,
    /// Address execution starts at.
    pub entry: u32,
    /// File offset of the program header table.
    pub phoff: u32,
    pub shoff: u32,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    /// Number of program headers.
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl ElfHeader {
    pub fn is_supported(&self) -> bool {
        self.ident[4] == ELFCLASS32
            && self.ident[5] == ELFDATA2LSB
            && self.phentsize as usize == PROGRAM_HEADER_SIZE
    }
}

impl HeaderTrait for ElfHeader {
    fn get_header_size(&self) -> usize {
        ELF_HEADER_SIZE
    }

    fn has_correct_magic(&self) -> bool {
        self.ident[..ELF_MAGIC.len()] == ELF_MAGIC
    }

    fn read_from<R>(src: &mut R) -> Result<Self, IoError>
    where
        Self: Sized,
        R: Read,
    {
        let mut ident = [0; EI_NIDENT];
        src.read_exact(&mut ident)?;
        Ok(Self {
            ident,
            kind: src.read_u16::<LittleEndian>()?,
            machine: src.read_u16::<LittleEndian>()?,
            version: src.read_u32::<LittleEndian>()?,
            entry: src.read_u32::<LittleEndian>()?,
            phoff: src.read_u32::<LittleEndian>()?,
            shoff: src.read_u32::<LittleEndian>()?,
            flags: src.read_u32::<LittleEndian>()?,
            ehsize: src.read_u16::<LittleEndian>()?,
            phentsize: src.read_u16::<LittleEndian>()?,
            phnum: src.read_u16::<LittleEndian>()?,
            shentsize: src.read_u16::<LittleEndian>()?,
            shnum: src.read_u16::<LittleEndian>()?,
            shstrndx: src.read_u16::<LittleEndian>()?,
        })
    }

    fn write_to<W>(&self, dst: &mut W) -> Result<usize, IoError>
    where
        Self: Sized,
        W: Write,
    {
        dst.write_all(&self.ident)?;
        dst.write_u16::<LittleEndian>(self.kind)?;
        dst.write_u16::<LittleEndian>(self.machine)?;
        dst.write_u32::<LittleEndian>(self.version)?;
        dst.write_u32::<LittleEndian>(self.entry)?;
        dst.write_u32::<LittleEndian>(self.phoff)?;
        dst.write_u32::<LittleEndian>(self.shoff)?;
        dst.write_u32::<LittleEndian>(self.flags)?;
        dst.write_u16::<LittleEndian>(self.ehsize)?;
        dst.write_u16::<LittleEndian>(self.phentsize)?;
        dst.write_u16::<LittleEndian>(self.phnum)?;
        dst.write_u16::<LittleEndian>(self.shentsize)?;
        dst.write_u16::<LittleEndian>(self.shnum)?;
        dst.write_u16::<LittleEndian>(self.shstrndx)?;
        Ok(ELF_HEADER_SIZE)
    }
}

impl Default for ElfHeader {
    fn default() -> Self {
        let mut ident = [0; EI_NIDENT];
        ident[..ELF_MAGIC.len()].copy_from_slice(&ELF_MAGIC);
        ident[4] = ELFCLASS32;
        ident[5] = ELFDATA2LSB;
        ident[6] = EV_CURRENT;

        Self {
            ident,
            kind: ET_EXEC,
            machine: EM_ARM,
            version: u32::from(EV_CURRENT),
            entry: 0,
            phoff: ELF_HEADER_SIZE as u32,
            shoff: 0,
            flags: 0,
            ehsize: ELF_HEADER_SIZE as u16,
            phentsize: PROGRAM_HEADER_SIZE as u16,
            phnum: 0,
            shentsize: 0,
            shnum: 0,
            shstrndx: 0,
        }
    }
}

/// One entry of the program header table. Each entry describes one segment
/// (kernel, ramdisk, ...) of a Sony ELF image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramHeader {
    pub kind: u32,
    pub offset: u32,
    pub vaddr: u32,
    pub paddr: u32,
    pub filesz: u32,
    pub memsz: u32,
    pub flags: u32,
    pub align: u32,
}

impl ProgramHeader {
    pub fn read_from<R: Read>(src: &mut R) -> Result<Self, IoError> {
        Ok(Self {
            kind: src.read_u32::<LittleEndian>()?,
            offset: src.read_u32::<LittleEndian>()?,
            vaddr: src.read_u32::<LittleEndian>()?,
            paddr: src.read_u32::<LittleEndian>()?,
            filesz: src.read_u32::<LittleEndian>()?,
            memsz: src.read_u32::<LittleEndian>()?,
            flags: src.read_u32::<LittleEndian>()?,
            align: src.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, dst: &mut W) -> Result<usize, IoError> {
        for word in [
            self.kind,
            self.offset,
            self.vaddr,
            self.paddr,
            self.filesz,
            self.memsz,
            self.flags,
            self.align,
        ] {
            dst.write_u32::<LittleEndian>(word)?;
        }
        Ok(PROGRAM_HEADER_SIZE)
    }
}
