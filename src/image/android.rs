use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use log::debug;
use sha1::{Digest, Sha1};

use super::{read_section_at, truncated, BootImage, BootImageType};
use crate::errors::{AssembleError, ParseError};
use crate::header::consts::android::*;
use crate::header::consts::bump::{BUMP_MAGIC, BUMP_MAGIC_SIZE};
use crate::header::consts::loki::{LOKI_HEADER_OFFSET, LOKI_SHELLCODE_SIZE};
use crate::header::{AndroidHeader, HeaderTrait, LokiHeader};
use crate::item::Item;

/// Reads an Android, Bump'd or Loki'd boot image.
pub(super) fn read_from<R: Read + Seek>(src: &mut R) -> Result<BootImage, ParseError> {
    let header_offset = find_header(src)?;
    src.seek(SeekFrom::Start(header_offset))?;
    let mut header = AndroidHeader::read_from(src).map_err(truncated("header"))?;
    if header.page_size == 0 {
        return Err(ParseError::NoPageSize);
    }
    if !header.page_size.is_power_of_two() {
        return Err(ParseError::InvalidPageSize(header.page_size));
    }
    let cmdline = header
        .kernel_cmdline()
        .map_err(|_| ParseError::InvalidText(Item::Cmdline))?;
    let board = header
        .board_name()
        .map_err(|_| ParseError::InvalidText(Item::Board))?;
    let page_size = u64::from(header.page_size);

    let mut image_type = BootImageType::Android;
    let mut device_tree_gap = 0;
    if let Some(loki) = read_loki_header(src, header_offset)? {
        if !loki.has_original_values() {
            return Err(ParseError::UnsupportedLoki);
        }
        // Loki replaces these with values pointing at its shellcode.
        header.kernel_size = loki.orig_kernel_size;
        header.ramdisk_size = loki.orig_ramdisk_size;
        header.ramdisk_load_address = loki.ramdisk_address;
        device_tree_gap = if loki.recovery != 0 {
            page_size
        } else {
            LOKI_SHELLCODE_SIZE
        };
        image_type = BootImageType::Loki;
    }

    let mut offset = header_offset + size_in_pages(ANDROID_HEADER_SIZE as u64, page_size);
    let kernel = read_paged(src, &mut offset, header.kernel_size, page_size, "kernel")?;
    let ramdisk = read_paged(src, &mut offset, header.ramdisk_size, page_size, "ramdisk")?;
    let second = read_paged(src, &mut offset, header.second_size, page_size, "second")?;
    let device_tree = if header.device_tree_size > 0 {
        offset += device_tree_gap;
        read_paged(src, &mut offset, header.device_tree_size, page_size, "dt")?
    } else {
        Vec::new()
    };

    if image_type == BootImageType::Android && has_bump_magic(src, offset)? {
        image_type = BootImageType::Bump;
    }
    debug!(
        "Found {} header at offset {}, page size {}",
        image_type, header_offset, page_size
    );

    let mut image = BootImage::default();
    image.set_image_type(image_type);
    image.set_kernel_cmdline(cmdline);
    image.set_board_name(board);
    image.set_page_size(header.page_size);
    image.set_kernel_address(header.kernel_load_address);
    image.set_ramdisk_address(header.ramdisk_load_address);
    image.set_second_bootloader_address(header.second_load_address);
    image.set_kernel_tags_address(header.kernel_tags_address);
    image.insert_kernel(kernel);
    image.insert_ramdisk(ramdisk);
    image.insert_second_bootloader(second);
    image.insert_device_tree(device_tree);
    Ok(image)
}

/// Writes `image` as an Android boot image, followed by the Bump magic if
/// `bump` is set.
pub(super) fn write_to<W: Write>(
    image: &BootImage,
    dst: &mut W,
    bump: bool,
) -> Result<usize, AssembleError> {
    let page_size = image.page_size();
    if !page_size.is_power_of_two() {
        return Err(AssembleError::InvalidPageSize(page_size));
    }
    check_length(Item::Board, image.board_name().len(), BOOT_NAME_SIZE - 1)?;
    check_length(
        Item::Cmdline,
        image.kernel_cmdline().len(),
        BOOT_ARGS_SIZE - 1 + BOOT_EXTRA_ARGS_SIZE,
    )?;

    let sections = [
        (Item::Kernel, image.kernel()),
        (Item::Ramdisk, image.ramdisk()),
        (Item::Second, image.second_bootloader()),
        (Item::Dt, image.device_tree()),
    ];
    let mut sizes = [0u32; 4];
    for (size, (item, data)) in sizes.iter_mut().zip(sections.iter()) {
        *size = u32::try_from(data.len()).map_err(|_| AssembleError::TooLong {
            item: *item,
            len: data.len(),
            max: u32::MAX as usize,
        })?;
    }

    let mut header = AndroidHeader::default();
    header.kernel_size = sizes[0];
    header.kernel_load_address = image.kernel_address();
    header.ramdisk_size = sizes[1];
    header.ramdisk_load_address = image.ramdisk_address();
    header.second_size = sizes[2];
    header.second_load_address = image.second_bootloader_address();
    header.device_tree_size = sizes[3];
    header.kernel_tags_address = image.kernel_tags_address();
    header.page_size = page_size;
    header.set_board_name(image.board_name());
    header.set_kernel_cmdline(image.kernel_cmdline());
    header.unique_id = unique_id(&sections);

    let page_size = page_size as usize;
    let mut bytes_written = header.write_to(dst)?;
    bytes_written += write_padding(dst, bytes_written, page_size)?;
    for (_, data) in sections.iter() {
        dst.write_all(data)?;
        bytes_written += data.len();
        bytes_written += write_padding(dst, data.len(), page_size)?;
    }
    if bump {
        dst.write_all(&BUMP_MAGIC)?;
        bytes_written += BUMP_MAGIC_SIZE;
    }
    Ok(bytes_written)
}

/// Reads a section at `offset` and moves `offset` past its last page.
fn read_paged<R: Read + Seek>(
    src: &mut R,
    offset: &mut u64,
    size: u32,
    page_size: u64,
    section: &'static str,
) -> Result<Vec<u8>, ParseError> {
    let data = read_section_at(src, *offset, u64::from(size), section)?;
    *offset += size_in_pages(u64::from(size), page_size);
    Ok(data)
}

/// Finds the offset of the header magic within the first 512 bytes.
fn find_header<R: Read + Seek>(src: &mut R) -> Result<u64, ParseError> {
    src.seek(SeekFrom::Start(0))?;
    let mut buffer = Vec::with_capacity(MAX_HEADER_OFFSET);
    src.by_ref()
        .take(MAX_HEADER_OFFSET as u64)
        .read_to_end(&mut buffer)?;
    buffer
        .windows(ANDROID_MAGIC_SIZE)
        .position(|window| window == ANDROID_MAGIC)
        .map(|position| position as u64)
        .ok_or(ParseError::UnknownFormat)
}

fn read_loki_header<R: Read + Seek>(
    src: &mut R,
    header_offset: u64,
) -> Result<Option<LokiHeader>, ParseError> {
    src.seek(SeekFrom::Start(header_offset + LOKI_HEADER_OFFSET))?;
    match LokiHeader::read_from(src) {
        Ok(loki) if loki.has_correct_magic() => Ok(Some(loki)),
        Ok(_) => Ok(None),
        Err(error) if error.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn has_bump_magic<R: Read + Seek>(src: &mut R, offset: u64) -> Result<bool, ParseError> {
    src.seek(SeekFrom::Start(offset))?;
    let mut trailer = Vec::with_capacity(BUMP_MAGIC_SIZE);
    src.by_ref()
        .take(BUMP_MAGIC_SIZE as u64)
        .read_to_end(&mut trailer)?;
    Ok(trailer == BUMP_MAGIC)
}

/// The id `mkbootimg` stores: a SHA-1 over each section followed by its size.
/// The device tree only takes part when present.
fn unique_id(sections: &[(Item, &[u8]); 4]) -> [u8; UNIQUE_ID_SIZE] {
    let mut hasher = Sha1::new();
    for (item, data) in sections.iter() {
        if *item == Item::Dt && data.is_empty() {
            continue;
        }
        hasher.update(data);
        hasher.update((data.len() as u32).to_le_bytes());
    }
    let digest = hasher.finalize();

    let mut id = [0; UNIQUE_ID_SIZE];
    id[..digest.len()].copy_from_slice(&digest);
    id
}

fn check_length(item: Item, len: usize, max: usize) -> Result<(), AssembleError> {
    if len > max {
        return Err(AssembleError::TooLong { item, len, max });
    }
    Ok(())
}

/// Rounds `size` up to a whole number of pages.
fn size_in_pages(size: u64, page_size: u64) -> u64 {
    size.div_ceil(page_size) * page_size
}

fn write_padding<W: Write>(dst: &mut W, size: usize, page_size: usize) -> Result<usize, AssembleError> {
    let padding = (page_size - size % page_size) % page_size;
    dst.write_all(&vec![0; padding])?;
    Ok(padding)
}
