//! Catalog of every item a boot image is unpacked into.

use core::fmt;
use core::str::FromStr;

use crate::errors::ConfigError;
use crate::image::BootImageType;

/// One unpackable part of a boot image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Item {
    Cmdline,
    Board,
    Base,
    KernelOffset,
    RamdiskOffset,
    SecondOffset,
    TagsOffset,
    IplAddress,
    RpmAddress,
    AppsblAddress,
    Entrypoint,
    PageSize,
    Kernel,
    Ramdisk,
    Second,
    Dt,
    Aboot,
    Ipl,
    Rpm,
    Appsbl,
    Sin,
    Sinhdr,
}

/// How an item is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// 32-bit address or offset, stored as 8 hexadecimal digits.
    Address,
    /// 32-bit unsigned integer, stored in decimal.
    Integer,
    /// A single line of text.
    String,
    /// Raw bytes.
    Blob,
}

impl ItemKind {
    pub fn is_scalar(self) -> bool {
        self != Blob
    }
}

/// A set of boot image types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSet(u8);

impl FormatSet {
    pub const ALL: FormatSet = FormatSet(0b1111);
    /// Plain, Bump'd and Loki'd Android images.
    pub const ANDROID: FormatSet = FormatSet(0b0111);
    pub const LOKI: FormatSet = FormatSet(0b0100);
    pub const SONY_ELF: FormatSet = FormatSet(0b1000);

    pub fn contains(self, image_type: BootImageType) -> bool {
        self.0 & Self::bit(image_type) != 0
    }

    fn bit(image_type: BootImageType) -> u8 {
        match image_type {
            BootImageType::Android => 0b0001,
            BootImageType::Bump => 0b0010,
            BootImageType::Loki => 0b0100,
            BootImageType::SonyElf => 0b1000,
        }
    }

    /// Renders the set as `[ABLS]`, with a blank for every absent type.
    pub fn legend(self) -> String {
        let letters: String = BootImageType::ALL
            .into_iter()
            .zip(['A', 'B', 'L', 'S'])
            .map(|(image_type, letter)| {
                if self.contains(image_type) {
                    letter
                } else {
                    ' '
                }
            })
            .collect();
        format!("[{}]", letters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDescriptor {
    pub item: Item,
    /// File name suffix and command line name.
    pub name: &'static str,
    pub kind: ItemKind,
    /// Image types that use this item.
    pub formats: FormatSet,
    /// Packing fails when a required blob is missing. Missing optional blobs
    /// are packed as empty.
    pub required: bool,
    /// Written out when unpacking. Input-only items are not.
    pub extracted: bool,
    pub description: &'static str,
}

const fn descriptor(
    item: Item,
    name: &'static str,
    kind: ItemKind,
    formats: FormatSet,
    description: &'static str,
) -> ItemDescriptor {
    ItemDescriptor {
        item,
        name,
        kind,
        formats,
        required: false,
        extracted: true,
        description,
    }
}

const fn required(mut descriptor: ItemDescriptor) -> ItemDescriptor {
    descriptor.required = true;
    descriptor
}

const fn input_only(mut descriptor: ItemDescriptor) -> ItemDescriptor {
    descriptor.extracted = false;
    descriptor
}

use self::ItemKind::{Address, Blob, Integer, String as Text};

/// Every item, in the order they are unpacked and packed. Indexed by `Item`.
pub static ITEMS: [ItemDescriptor; 22] = [
    descriptor(Item::Cmdline, "cmdline", Text, FormatSet::ALL, "Kernel command line"),
    descriptor(Item::Board, "board", Text, FormatSet::ANDROID, "Board name field in the header"),
    descriptor(Item::Base, "base", Address, FormatSet::ALL, "Base address for offsets"),
    descriptor(Item::KernelOffset, "kernel_offset", Address, FormatSet::ALL, "Address offset of the kernel image"),
    descriptor(Item::RamdiskOffset, "ramdisk_offset", Address, FormatSet::ALL, "Address offset of the ramdisk image"),
    descriptor(Item::SecondOffset, "second_offset", Address, FormatSet::ANDROID, "Address offset of the second bootloader image"),
    descriptor(Item::TagsOffset, "tags_offset", Address, FormatSet::ANDROID, "Address offset of the kernel tags image"),
    descriptor(Item::IplAddress, "ipl_address", Address, FormatSet::SONY_ELF, "Address of the ipl image"),
    descriptor(Item::RpmAddress, "rpm_address", Address, FormatSet::SONY_ELF, "Address of the rpm image"),
    descriptor(Item::AppsblAddress, "appsbl_address", Address, FormatSet::SONY_ELF, "Address of the appsbl image"),
    descriptor(Item::Entrypoint, "entrypoint", Address, FormatSet::SONY_ELF, "Address of the entry point"),
    descriptor(Item::PageSize, "page_size", Integer, FormatSet::ANDROID, "Page size"),
    required(descriptor(Item::Kernel, "kernel", Blob, FormatSet::ALL, "Kernel image")),
    required(descriptor(Item::Ramdisk, "ramdisk", Blob, FormatSet::ALL, "Ramdisk image")),
    descriptor(Item::Second, "second", Blob, FormatSet::ANDROID, "Second bootloader image"),
    descriptor(Item::Dt, "dt", Blob, FormatSet::ANDROID, "Device tree image"),
    input_only(descriptor(Item::Aboot, "aboot", Blob, FormatSet::LOKI, "Aboot image")),
    descriptor(Item::Ipl, "ipl", Blob, FormatSet::SONY_ELF, "Ipl image"),
    descriptor(Item::Rpm, "rpm", Blob, FormatSet::SONY_ELF, "Rpm image"),
    descriptor(Item::Appsbl, "appsbl", Blob, FormatSet::SONY_ELF, "Appsbl image"),
    descriptor(Item::Sin, "sin", Blob, FormatSet::SONY_ELF, "Sin image"),
    descriptor(Item::Sinhdr, "sinhdr", Blob, FormatSet::SONY_ELF, "Sin header"),
];

impl Item {
    pub fn descriptor(self) -> &'static ItemDescriptor {
        &ITEMS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn kind(self) -> ItemKind {
        self.descriptor().kind
    }

    /// Every item, in catalog order.
    pub fn all() -> impl Iterator<Item = Item> {
        ITEMS.iter().map(|descriptor| descriptor.item)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Item {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ITEMS
            .iter()
            .find(|descriptor| descriptor.name == s)
            .map(|descriptor| descriptor.item)
            .ok_or_else(|| ConfigError::UnknownItem(s.to_owned()))
    }
}

/// The items used by `image_type`, in catalog order.
pub fn fields_for(image_type: BootImageType) -> impl Iterator<Item = &'static ItemDescriptor> {
    ITEMS
        .iter()
        .filter(move |descriptor| descriptor.formats.contains(image_type))
}

/// The items written when unpacking, in catalog order.
pub fn extracted() -> impl Iterator<Item = &'static ItemDescriptor> {
    ITEMS.iter().filter(|descriptor| descriptor.extracted)
}
