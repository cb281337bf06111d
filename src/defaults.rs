use crate::field::Value;
use crate::item::Item;

/// Values used for items that were not supplied when packing.
///
/// Blobs have no default: a missing required blob is an error and a missing
/// optional blob is packed as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub cmdline: String,
    pub board: String,
    pub base: u32,
    pub kernel_offset: u32,
    pub ramdisk_offset: u32,
    pub second_offset: u32,
    pub tags_offset: u32,
    pub ipl_address: u32,
    pub rpm_address: u32,
    pub appsbl_address: u32,
    pub entrypoint: u32,
    pub page_size: u32,
}

impl Defaults {
    /// The fallback for `item`, or `None` for blobs.
    pub fn value_of(&self, item: Item) -> Option<Value> {
        let value = match item {
            Item::Cmdline => Value::Text(self.cmdline.clone()),
            Item::Board => Value::Text(self.board.clone()),
            Item::Base => Value::Address(self.base),
            Item::KernelOffset => Value::Address(self.kernel_offset),
            Item::RamdiskOffset => Value::Address(self.ramdisk_offset),
            Item::SecondOffset => Value::Address(self.second_offset),
            Item::TagsOffset => Value::Address(self.tags_offset),
            Item::IplAddress => Value::Address(self.ipl_address),
            Item::RpmAddress => Value::Address(self.rpm_address),
            Item::AppsblAddress => Value::Address(self.appsbl_address),
            Item::Entrypoint => Value::Address(self.entrypoint),
            Item::PageSize => Value::Integer(self.page_size),
            Item::Kernel
            | Item::Ramdisk
            | Item::Second
            | Item::Dt
            | Item::Aboot
            | Item::Ipl
            | Item::Rpm
            | Item::Appsbl
            | Item::Sin
            | Item::Sinhdr => return None,
        };
        Some(value)
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            cmdline: String::new(),
            board: String::new(),
            base: 0x10000000,
            kernel_offset: 0x00008000,
            ramdisk_offset: 0x01000000,
            second_offset: 0x00f00000,
            tags_offset: 0x00000100,
            ipl_address: 0x00000000,
            rpm_address: 0x00000000,
            appsbl_address: 0x00000000,
            entrypoint: 0x00000000,
            page_size: 2048,
        }
    }
}
