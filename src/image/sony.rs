use std::io::{Read, Seek, SeekFrom, Write};

use log::debug;

use super::{read_section_at, truncated, BootImage, BootImageType};
use crate::errors::{AssembleError, ParseError};
use crate::header::consts::sony::*;
use crate::header::{c_string, ElfHeader, HeaderTrait, ProgramHeader};
use crate::item::Item;

/// The segments of a Sony ELF image, told apart by program header type and
/// flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Kernel,
    Ramdisk,
    Cmdline,
    Ipl,
    Rpm,
    Appsbl,
    Sin,
}

impl Segment {
    /// In the order they are written.
    const ALL: [Segment; 7] = [
        Segment::Kernel,
        Segment::Ramdisk,
        Segment::Cmdline,
        Segment::Ipl,
        Segment::Rpm,
        Segment::Appsbl,
        Segment::Sin,
    ];

    fn classify(header: &ProgramHeader) -> Option<Segment> {
        match (header.kind, header.flags) {
            (PT_LOAD, SONY_E_FLAGS_KERNEL) => Some(Segment::Kernel),
            (PT_LOAD, SONY_E_FLAGS_RAMDISK) => Some(Segment::Ramdisk),
            (PT_LOAD, SONY_E_FLAGS_IPL) => Some(Segment::Ipl),
            (PT_LOAD, SONY_E_FLAGS_RPM) => Some(Segment::Rpm),
            (PT_LOAD, SONY_E_FLAGS_APPSBL) => Some(Segment::Appsbl),
            (SONY_E_TYPE_CMDLINE, SONY_E_FLAGS_CMDLINE) => Some(Segment::Cmdline),
            (SONY_E_TYPE_SIN, _) => Some(Segment::Sin),
            _ => None,
        }
    }

    fn kind(self) -> u32 {
        match self {
            Segment::Cmdline => SONY_E_TYPE_CMDLINE,
            Segment::Sin => SONY_E_TYPE_SIN,
            _ => PT_LOAD,
        }
    }

    fn flags(self) -> u32 {
        match self {
            Segment::Kernel | Segment::Sin => SONY_E_FLAGS_KERNEL,
            Segment::Ramdisk => SONY_E_FLAGS_RAMDISK,
            Segment::Cmdline => SONY_E_FLAGS_CMDLINE,
            Segment::Ipl => SONY_E_FLAGS_IPL,
            Segment::Rpm => SONY_E_FLAGS_RPM,
            Segment::Appsbl => SONY_E_FLAGS_APPSBL,
        }
    }

    fn item(self) -> Item {
        match self {
            Segment::Kernel => Item::Kernel,
            Segment::Ramdisk => Item::Ramdisk,
            Segment::Cmdline => Item::Cmdline,
            Segment::Ipl => Item::Ipl,
            Segment::Rpm => Item::Rpm,
            Segment::Appsbl => Item::Appsbl,
            Segment::Sin => Item::Sin,
        }
    }

    /// Written even when empty.
    fn is_required(self) -> bool {
        matches!(self, Segment::Kernel | Segment::Ramdisk)
    }

    /// The data and load address `image` has for this segment.
    fn contents(self, image: &BootImage) -> (&[u8], u32) {
        match self {
            Segment::Kernel => (image.kernel(), image.kernel_address()),
            Segment::Ramdisk => (image.ramdisk(), image.ramdisk_address()),
            Segment::Cmdline => (image.kernel_cmdline().as_bytes(), 0),
            Segment::Ipl => (image.ipl(), image.ipl_address()),
            Segment::Rpm => (image.rpm(), image.rpm_address()),
            Segment::Appsbl => (image.appsbl(), image.appsbl_address()),
            Segment::Sin => (image.sin(), 0),
        }
    }

    fn store(self, image: &mut BootImage, data: Vec<u8>, address: u32) -> Result<(), ParseError> {
        match self {
            Segment::Kernel => {
                image.set_kernel_address(address);
                image.insert_kernel(data);
            }
            Segment::Ramdisk => {
                image.set_ramdisk_address(address);
                image.insert_ramdisk(data);
            }
            Segment::Cmdline => {
                let cmdline = c_string(&data).map_err(|_| ParseError::InvalidText(Item::Cmdline))?;
                image.set_kernel_cmdline(cmdline);
            }
            Segment::Ipl => {
                image.set_ipl_address(address);
                image.insert_ipl(data);
            }
            Segment::Rpm => {
                image.set_rpm_address(address);
                image.insert_rpm(data);
            }
            Segment::Appsbl => {
                image.set_appsbl_address(address);
                image.insert_appsbl(data);
            }
            Segment::Sin => {
                image.insert_sin(data);
            }
        }
        Ok(())
    }
}

/// Reads a Sony ELF boot image.
pub(super) fn read_from<R: Read + Seek>(src: &mut R) -> Result<BootImage, ParseError> {
    let header = ElfHeader::read_from(src).map_err(truncated("ELF header"))?;
    if !header.has_correct_magic() {
        return Err(ParseError::BadElf("missing ELF magic"));
    }
    if !header.is_supported() {
        return Err(ParseError::BadElf("not a 32-bit little endian executable"));
    }

    src.seek(SeekFrom::Start(u64::from(header.phoff)))?;
    let mut program_headers = Vec::with_capacity(usize::from(header.phnum));
    for _ in 0..header.phnum {
        program_headers
            .push(ProgramHeader::read_from(src).map_err(truncated("program header table"))?);
    }

    let mut image = BootImage::default();
    image.set_image_type(BootImageType::SonyElf);
    image.set_entrypoint_address(header.entry);

    let table_end =
        u64::from(header.phoff) + u64::from(header.phnum) * PROGRAM_HEADER_SIZE as u64;
    let first_segment = program_headers.iter().map(|ph| u64::from(ph.offset)).min();
    if let Some(first_segment) = first_segment.filter(|&offset| offset > table_end) {
        let sin_header =
            read_section_at(src, table_end, first_segment - table_end, "sin header")?;
        image.insert_sin_header(sin_header);
    }

    for program_header in &program_headers {
        let segment =
            Segment::classify(program_header).ok_or(ParseError::BadElf("unknown segment"))?;
        let data = read_section_at(
            src,
            u64::from(program_header.offset),
            u64::from(program_header.filesz),
            segment.item().name(),
        )?;
        debug!(
            "Found {:?} segment at offset {:#x}, {} bytes",
            segment,
            program_header.offset,
            data.len()
        );
        segment.store(&mut image, data, program_header.vaddr)?;
    }

    Ok(image)
}

/// Writes `image` as a Sony ELF image: ELF header, program header table, sin
/// header, then the segments back to back.
pub(super) fn write_to<W: Write>(image: &BootImage, dst: &mut W) -> Result<usize, AssembleError> {
    let segments: Vec<(Segment, &[u8], u32)> = Segment::ALL
        .into_iter()
        .map(|segment| {
            let (data, address) = segment.contents(image);
            (segment, data, address)
        })
        .filter(|(segment, data, _)| segment.is_required() || !data.is_empty())
        .collect();

    let mut header = ElfHeader::default();
    header.entry = image.entrypoint_address();
    header.phnum = segments.len() as u16;

    let mut bytes_written = header.write_to(dst)?;
    let mut offset = bytes_written + segments.len() * PROGRAM_HEADER_SIZE + image.sin_header().len();
    for (segment, data, address) in &segments {
        let too_long = |len| AssembleError::TooLong {
            item: segment.item(),
            len,
            max: u32::MAX as usize,
        };
        let size = u32::try_from(data.len()).map_err(|_| too_long(data.len()))?;
        let program_header = ProgramHeader {
            kind: segment.kind(),
            offset: u32::try_from(offset).map_err(|_| too_long(offset))?,
            vaddr: *address,
            paddr: *address,
            filesz: size,
            memsz: size,
            flags: segment.flags(),
            align: 0,
        };
        bytes_written += program_header.write_to(dst)?;
        offset += data.len();
    }

    dst.write_all(image.sin_header())?;
    bytes_written += image.sin_header().len();
    for (_, data, _) in &segments {
        dst.write_all(data)?;
        bytes_written += data.len();
    }
    Ok(bytes_written)
}
