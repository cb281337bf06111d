use super::consts::android::*;
use super::HeaderTrait;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Error as IoError, Read, Write};
use std::str::Utf8Error;

/// Contains an Android boot image header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidHeader {
    /// Header magic. Used to make sure this is in fact a header.
    pub magic: [u8; ANDROID_MAGIC_SIZE],
    /// Kernel size, in bytes.
    pub kernel_size: u32,
    /// Address the kernel should be loaded to.
    pub kernel_load_address: u32,
    /// Ramdisk size, in bytes.
    pub ramdisk_size: u32,
    /// Address the ramdisk should be loaded to.
    pub ramdisk_load_address: u32,
    /// Size of an optional second bootloader.
    pub second_size: u32,
    /// Address the optional second bootloader should be loaded to.
    pub second_load_address: u32,
    /// Physical address of the kernel tags.
    pub kernel_tags_address: u32,
    /// The page size.
    pub page_size: u32,
    /// The size of the device tree, in bytes.
    pub device_tree_size: u32,
    /// Room for future expansion. This should always be set to 0.
    pub unused: u32,
    /// Name of the board. This is a null-terminated ASCII string.
    pub product_name: [u8; BOOT_NAME_SIZE],
    /// Arguments to pass to the kernel during boot.
    pub boot_arguments: [u8; BOOT_ARGS_SIZE],
    /// Used to uniquely identify boot images.
    pub unique_id: [u8; UNIQUE_ID_SIZE],
    /// Continuation of the boot arguments, for command lines that do not fit.
    pub extra_boot_arguments: [u8; BOOT_EXTRA_ARGS_SIZE],
}

impl AndroidHeader {
    /// Returns the complete kernel command line, including the part that
    /// spilled over into the extra arguments.
    pub fn kernel_cmdline(&self) -> Result<String, Utf8Error> {
        let mut cmdline = super::c_bytes(&self.boot_arguments).to_vec();
        if cmdline.len() >= BOOT_ARGS_SIZE - 1 {
            cmdline.extend_from_slice(super::c_bytes(&self.extra_boot_arguments));
        }
        String::from_utf8(cmdline).map_err(|error| error.utf8_error())
    }

    /// Stores a kernel command line. The first 511 bytes go into the boot
    /// arguments, up to 1024 more into the extra boot arguments, which need
    /// no terminating NUL when full. Callers make sure the command line fits.
    pub fn set_kernel_cmdline(&mut self, cmdline: &str) {
        let bytes = cmdline.as_bytes();
        let copied = super::copy_truncated(&mut self.boot_arguments[..BOOT_ARGS_SIZE - 1], bytes);
        self.boot_arguments[BOOT_ARGS_SIZE - 1] = 0;
        super::copy_truncated(&mut self.extra_boot_arguments, &bytes[copied..]);
    }

    pub fn board_name(&self) -> Result<String, Utf8Error> {
        super::c_string(&self.product_name)
    }

    pub fn set_board_name(&mut self, board: &str) {
        super::copy_truncated(&mut self.product_name[..BOOT_NAME_SIZE - 1], board.as_bytes());
        self.product_name[BOOT_NAME_SIZE - 1] = 0;
    }
}

impl HeaderTrait for AndroidHeader {
    fn get_header_size(&self) -> usize {
        ANDROID_HEADER_SIZE
    }

    fn has_correct_magic(&self) -> bool {
        self.magic == ANDROID_MAGIC
    }

    fn read_from<R>(src: &mut R) -> Result<Self, IoError>
    where
        Self: Sized,
        R: Read,
    {
        let mut header = Self::default();
        src.read_exact(&mut header.magic)?;
        header.kernel_size = src.read_u32::<LittleEndian>()?;
        header.kernel_load_address = src.read_u32::<LittleEndian>()?;
        header.ramdisk_size = src.read_u32::<LittleEndian>()?;
        header.ramdisk_load_address = src.read_u32::<LittleEndian>()?;
        header.second_size = src.read_u32::<LittleEndian>()?;
        header.second_load_address = src.read_u32::<LittleEndian>()?;
        header.kernel_tags_address = src.read_u32::<LittleEndian>()?;
        header.page_size = src.read_u32::<LittleEndian>()?;
        header.device_tree_size = src.read_u32::<LittleEndian>()?;
        header.unused = src.read_u32::<LittleEndian>()?;
        src.read_exact(&mut header.product_name)?;
        src.read_exact(&mut header.boot_arguments)?;
        src.read_exact(&mut header.unique_id)?;
        src.read_exact(&mut header.extra_boot_arguments)?;
        Ok(header)
    }

    fn write_to<W>(&self, dst: &mut W) -> Result<usize, IoError>
    where
        Self: Sized,
        W: Write,
    {
        dst.write_all(&self.magic)?;
        dst.write_u32::<LittleEndian>(self.kernel_size)?;
        dst.write_u32::<LittleEndian>(self.kernel_load_address)?;
        dst.write_u32::<LittleEndian>(self.ramdisk_size)?;
        dst.write_u32::<LittleEndian>(self.ramdisk_load_address)?;
        dst.write_u32::<LittleEndian>(self.second_size)?;
        dst.write_u32::<LittleEndian>(self.second_load_address)?;
        dst.write_u32::<LittleEndian>(self.kernel_tags_address)?;
        dst.write_u32::<LittleEndian>(self.page_size)?;
        dst.write_u32::<LittleEndian>(self.device_tree_size)?;
        dst.write_u32::<LittleEndian>(self.unused)?;
        dst.write_all(&self.product_name)?;
        dst.write_all(&self.boot_arguments)?;
        dst.write_all(&self.unique_id)?;
        dst.write_all(&self.extra_boot_arguments)?;
        Ok(ANDROID_HEADER_SIZE)
    }
}

impl Default for AndroidHeader {
    fn default() -> Self {
        Self {
            magic: ANDROID_MAGIC,
            kernel_size: 0,
            kernel_load_address: 0x10008000,
            ramdisk_size: 0,
            ramdisk_load_address: 0x11000000,
            second_size: 0,
            second_load_address: 0x10f00000,
            kernel_tags_address: 0x10000100,
            page_size: 2048,
            device_tree_size: 0,
            unused: 0,
            product_name: [0; BOOT_NAME_SIZE],
            boot_arguments: [0; BOOT_ARGS_SIZE],
            unique_id: [0; UNIQUE_ID_SIZE],
            extra_boot_arguments: [0; BOOT_EXTRA_ARGS_SIZE],
        }
    }
}
