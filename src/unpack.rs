//! Splitting a boot image into one file per item.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, info};

use crate::defaults::Defaults;
use crate::errors::{Error, Result};
use crate::field::{self, Fields, Summary, Value};
use crate::image::{BootImage, BootImageType, ImageCodec};
use crate::item::{self, Item};
use crate::paths::{self, Overrides, Prefix, ResolvedPaths};

#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// The boot image to unpack.
    pub input: PathBuf,
    /// Directory the item files are written to. Created if missing.
    pub output_dir: PathBuf,
    pub prefix: Prefix,
    /// Per-item output paths, used instead of `output_dir`.
    pub outputs: BTreeMap<Item, PathBuf>,
    /// The kernel offset written out, and subtracted from the kernel address
    /// to find the base address.
    pub defaults: Defaults,
}

impl UnpackOptions {
    /// Unpacks `input` into the current directory with the image name as
    /// prefix.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        UnpackOptions {
            input: input.into(),
            output_dir: PathBuf::from("."),
            prefix: Prefix::default(),
            outputs: BTreeMap::new(),
            defaults: Defaults::default(),
        }
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn output(mut self, item: Item, path: impl Into<PathBuf>) -> Self {
        self.outputs.insert(item, path.into());
        self
    }

    /// The file every extracted item is written to.
    pub fn resolve(&self) -> ResolvedPaths {
        let prefix = self.prefix.resolve(&self.input);
        let overrides = Overrides {
            paths: self.outputs.clone(),
            values: BTreeMap::new(),
        };
        paths::resolve(
            &self.output_dir,
            &prefix,
            item::extracted().map(|descriptor| descriptor.item),
            &overrides,
        )
    }
}

/// What an unpack wrote, in catalog order.
#[derive(Debug, Clone)]
pub struct UnpackReport {
    pub image_type: BootImageType,
    pub files: Vec<(Item, PathBuf, Summary)>,
}

/// Turns the absolute addresses of `image` into the items written out. The
/// kernel offset is always the default one, so the base address is whatever
/// puts the kernel at its load address.
pub fn derive_fields(mut image: BootImage, defaults: &Defaults) -> Fields {
    let base = image.kernel_address().wrapping_sub(defaults.kernel_offset);
    let offset = |address: u32| Value::Address(address.wrapping_sub(base));

    let mut fields = Fields::new();
    fields.insert(Item::Cmdline, Value::Text(image.kernel_cmdline().to_owned()));
    fields.insert(Item::Board, Value::Text(image.board_name().to_owned()));
    fields.insert(Item::Base, Value::Address(base));
    fields.insert(Item::KernelOffset, Value::Address(defaults.kernel_offset));
    fields.insert(Item::RamdiskOffset, offset(image.ramdisk_address()));
    fields.insert(Item::SecondOffset, offset(image.second_bootloader_address()));
    fields.insert(Item::TagsOffset, offset(image.kernel_tags_address()));
    fields.insert(Item::IplAddress, Value::Address(image.ipl_address()));
    fields.insert(Item::RpmAddress, Value::Address(image.rpm_address()));
    fields.insert(Item::AppsblAddress, Value::Address(image.appsbl_address()));
    fields.insert(Item::Entrypoint, Value::Address(image.entrypoint_address()));
    fields.insert(Item::PageSize, Value::Integer(image.page_size()));

    fields.insert(Item::Kernel, Value::Blob(image.insert_kernel(Vec::new())));
    fields.insert(Item::Ramdisk, Value::Blob(image.insert_ramdisk(Vec::new())));
    fields.insert(Item::Second, Value::Blob(image.insert_second_bootloader(Vec::new())));
    fields.insert(Item::Dt, Value::Blob(image.insert_device_tree(Vec::new())));
    fields.insert(Item::Ipl, Value::Blob(image.insert_ipl(Vec::new())));
    fields.insert(Item::Rpm, Value::Blob(image.insert_rpm(Vec::new())));
    fields.insert(Item::Appsbl, Value::Blob(image.insert_appsbl(Vec::new())));
    fields.insert(Item::Sin, Value::Blob(image.insert_sin(Vec::new())));
    fields.insert(Item::Sinhdr, Value::Blob(image.insert_sin_header(Vec::new())));
    fields
}

/// Loads the image at `options.input` and writes each extracted item to its
/// file. Stops at the first file that cannot be written; files written
/// before it are left in place.
pub fn unpack<C: ImageCodec + ?Sized>(codec: &C, options: &UnpackOptions) -> Result<UnpackReport> {
    let paths = options.resolve();

    fs::create_dir_all(&options.output_dir).map_err(Error::io(&options.output_dir))?;

    let image = codec.load(&options.input)?;
    let image_type = image.image_type();
    info!("Unpacking {} image '{}'", image_type, options.input.display());

    let fields = derive_fields(image, &options.defaults);
    let mut files = Vec::with_capacity(fields.len());
    for (item, value) in fields.iter() {
        let path = match paths.path(item) {
            Some(path) => path,
            None => continue,
        };
        field::write_value(path, value)?;
        debug!("Unpacked {} to '{}'", item, path.display());
        files.push((item, path.to_owned(), value.summary()));
    }

    Ok(UnpackReport { image_type, files })
}
