mod android;
mod sony;

use core::fmt;
use core::str::FromStr;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::info;

use crate::defaults::Defaults;
use crate::errors::{AssembleError, ConfigError, ParseError};
use crate::header::consts::sony::ELF_MAGIC;

/// The container formats a boot image can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BootImageType {
    /// Plain Android boot image.
    #[default]
    Android,
    /// Android boot image with the Bump signature appended.
    Bump,
    /// Android boot image patched by Loki.
    Loki,
    /// ELF executable used by Sony devices.
    SonyElf,
}

impl BootImageType {
    pub const ALL: [BootImageType; 4] = [
        BootImageType::Android,
        BootImageType::Bump,
        BootImageType::Loki,
        BootImageType::SonyElf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BootImageType::Android => "android",
            BootImageType::Bump => "bump",
            BootImageType::Loki => "loki",
            BootImageType::SonyElf => "sonyelf",
        }
    }
}

impl fmt::Display for BootImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BootImageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BootImageType::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::InvalidType(s.to_owned()))
    }
}

macro_rules! address_accessors {
    ($($(#[$doc:meta])* $field:ident, $setter:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $field(&self) -> u32 {
                self.$field
            }

            pub fn $setter(&mut self, address: u32) {
                self.$field = address;
            }
        )*
    };
}

macro_rules! blob_accessors {
    ($($(#[$doc:meta])* $field:ident, $insert:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $field(&self) -> &[u8] {
                &self.$field
            }

            /// Inserts new contents, returning the old ones.
            pub fn $insert(&mut self, mut replacement: Vec<u8>) -> Vec<u8> {
                core::mem::swap(&mut self.$field, &mut replacement);
                replacement
            }
        )*
    };
}

/// A structure representing a boot image in memory, independent of the
/// container format it was read from or will be written as.
///
/// All addresses are absolute. [`BootImage::set_addresses`] computes them from
/// a base address and offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootImage {
    image_type: BootImageType,
    kernel_cmdline: String,
    board_name: String,
    page_size: u32,
    kernel_address: u32,
    ramdisk_address: u32,
    second_bootloader_address: u32,
    kernel_tags_address: u32,
    ipl_address: u32,
    rpm_address: u32,
    appsbl_address: u32,
    entrypoint_address: u32,
    kernel: Vec<u8>,
    ramdisk: Vec<u8>,
    second_bootloader: Vec<u8>,
    device_tree: Vec<u8>,
    aboot: Vec<u8>,
    ipl: Vec<u8>,
    rpm: Vec<u8>,
    appsbl: Vec<u8>,
    sin: Vec<u8>,
    sin_header: Vec<u8>,
}

impl BootImage {
    /// Creates an empty boot image whose scalar values are taken from
    /// `defaults`.
    pub fn new(defaults: &Defaults) -> Self {
        let mut image = BootImage {
            image_type: BootImageType::Android,
            kernel_cmdline: defaults.cmdline.clone(),
            board_name: defaults.board.clone(),
            page_size: defaults.page_size,
            kernel_address: 0,
            ramdisk_address: 0,
            second_bootloader_address: 0,
            kernel_tags_address: 0,
            ipl_address: defaults.ipl_address,
            rpm_address: defaults.rpm_address,
            appsbl_address: defaults.appsbl_address,
            entrypoint_address: defaults.entrypoint,
            kernel: Vec::new(),
            ramdisk: Vec::new(),
            second_bootloader: Vec::new(),
            device_tree: Vec::new(),
            aboot: Vec::new(),
            ipl: Vec::new(),
            rpm: Vec::new(),
            appsbl: Vec::new(),
            sin: Vec::new(),
            sin_header: Vec::new(),
        };
        image.set_addresses(
            defaults.base,
            defaults.kernel_offset,
            defaults.ramdisk_offset,
            defaults.second_offset,
            defaults.tags_offset,
        );
        image
    }

    /// The type this image was read as, or the type it was built for.
    pub fn image_type(&self) -> BootImageType {
        self.image_type
    }

    pub fn set_image_type(&mut self, image_type: BootImageType) {
        self.image_type = image_type;
    }

    pub fn kernel_cmdline(&self) -> &str {
        &self.kernel_cmdline
    }

    pub fn set_kernel_cmdline(&mut self, cmdline: impl Into<String>) {
        self.kernel_cmdline = cmdline.into();
    }

    pub fn board_name(&self) -> &str {
        &self.board_name
    }

    pub fn set_board_name(&mut self, board: impl Into<String>) {
        self.board_name = board.into();
    }

    /// Returns the size of a single page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size;
    }

    /// Sets the kernel, ramdisk, second bootloader and kernel tags addresses
    /// relative to `base`. Addresses wrap around at 4 GiB.
    pub fn set_addresses(
        &mut self,
        base: u32,
        kernel_offset: u32,
        ramdisk_offset: u32,
        second_offset: u32,
        tags_offset: u32,
    ) {
        self.kernel_address = base.wrapping_add(kernel_offset);
        self.ramdisk_address = base.wrapping_add(ramdisk_offset);
        self.second_bootloader_address = base.wrapping_add(second_offset);
        self.kernel_tags_address = base.wrapping_add(tags_offset);
    }

    address_accessors! {
        /// Address the kernel is loaded to.
        kernel_address, set_kernel_address;
        /// Address the ramdisk is loaded to.
        ramdisk_address, set_ramdisk_address;
        /// Address the second bootloader is loaded to.
        second_bootloader_address, set_second_bootloader_address;
        /// Physical address of the kernel tags.
        kernel_tags_address, set_kernel_tags_address;
        ipl_address, set_ipl_address;
        rpm_address, set_rpm_address;
        appsbl_address, set_appsbl_address;
        /// Address execution of a Sony ELF image starts at.
        entrypoint_address, set_entrypoint_address;
    }

    blob_accessors! {
        kernel, insert_kernel;
        ramdisk, insert_ramdisk;
        second_bootloader, insert_second_bootloader;
        device_tree, insert_device_tree;
        /// The aboot partition a Loki image is patched against.
        aboot, insert_aboot;
        ipl, insert_ipl;
        rpm, insert_rpm;
        appsbl, insert_appsbl;
        sin, insert_sin;
        /// Data between the program header table and the first segment of a
        /// Sony ELF image.
        sin_header, insert_sin_header;
    }

    /// Reads a boot image of any supported type. The source must be seekable
    /// as the sections are located through the header.
    pub fn read_from<R: Read + Seek>(src: &mut R) -> Result<Self, ParseError> {
        let mut magic = [0u8; ELF_MAGIC.len()];
        let is_elf = match src.read_exact(&mut magic) {
            Ok(()) => magic == ELF_MAGIC,
            Err(error) if error.kind() == ErrorKind::UnexpectedEof => false,
            Err(error) => return Err(error.into()),
        };
        src.seek(SeekFrom::Start(0))?;

        if is_elf {
            sony::read_from(src)
        } else {
            android::read_from(src)
        }
    }

    /// Reads the boot image from a file.
    pub fn read_from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, ParseError> {
        let mut file_handle = BufReader::new(File::open(file_path)?);
        BootImage::read_from(&mut file_handle)
    }

    /// Writes this boot image as `target` to a `Write` target. Returns the
    /// amount of bytes written.
    pub fn write_to<W: Write>(
        &self,
        dst: &mut W,
        target: BootImageType,
    ) -> Result<usize, AssembleError> {
        match target {
            BootImageType::Android => android::write_to(self, dst, false),
            BootImageType::Bump => android::write_to(self, dst, true),
            BootImageType::Loki => Err(AssembleError::Unsupported(BootImageType::Loki)),
            BootImageType::SonyElf => sony::write_to(self, dst),
        }
    }
}

impl Default for BootImage {
    /// Creates a new boot image with no sections at all.
    fn default() -> Self {
        BootImage::new(&Defaults::default())
    }
}

/// Reading and writing of whole boot image files. The unpack and pack
/// operations only ever talk to boot images through this trait.
pub trait ImageCodec {
    fn load(&self, path: &Path) -> Result<BootImage, ParseError>;
    fn assemble(
        &self,
        image: &BootImage,
        target: BootImageType,
        path: &Path,
    ) -> Result<(), AssembleError>;
}

/// The codec for the formats this crate implements itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl ImageCodec for StandardCodec {
    fn load(&self, path: &Path) -> Result<BootImage, ParseError> {
        let image = BootImage::read_from_file(path)?;
        info!("Loaded {} image from '{}'", image.image_type(), path.display());
        Ok(image)
    }

    fn assemble(
        &self,
        image: &BootImage,
        target: BootImageType,
        path: &Path,
    ) -> Result<(), AssembleError> {
        // Render first so a rejected image leaves no file behind.
        let mut data = Vec::new();
        image.write_to(&mut data, target)?;
        File::create(path)?.write_all(&data)?;
        info!("Wrote {} byte {} image to '{}'", data.len(), target, path.display());
        Ok(())
    }
}

/// Reads `size` bytes at `offset`, reporting a short read as a truncated
/// `section`.
fn read_section_at<R: Read + Seek>(
    src: &mut R,
    offset: u64,
    size: u64,
    section: &'static str,
) -> Result<Vec<u8>, ParseError> {
    src.seek(SeekFrom::Start(offset))?;
    let mut data = Vec::new();
    src.by_ref().take(size).read_to_end(&mut data)?;
    if (data.len() as u64) < size {
        return Err(ParseError::Truncated(section));
    }
    Ok(data)
}

/// Maps an end-of-file error to a truncated `section`.
fn truncated(section: &'static str) -> impl FnOnce(std::io::Error) -> ParseError {
    move |error| match error.kind() {
        ErrorKind::UnexpectedEof => ParseError::Truncated(section),
        _ => ParseError::Io(error),
    }
}
