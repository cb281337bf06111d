//! Building a boot image from one file per item.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::defaults::Defaults;
use crate::errors::{ConfigError, Result};
use crate::field::{self, Fields, Summary, Value};
use crate::image::{BootImage, BootImageType, ImageCodec};
use crate::item::{self, Item, ItemKind};
use crate::paths::{self, Overrides, Prefix, ResolvedPaths, Source};

#[derive(Debug, Clone)]
pub struct PackOptions {
    /// The boot image to create.
    pub output: PathBuf,
    /// Directory the item files are read from.
    pub input_dir: PathBuf,
    pub prefix: Prefix,
    pub target: BootImageType,
    pub overrides: Overrides,
    /// Used for every scalar item whose file cannot be opened.
    pub defaults: Defaults,
}

impl PackOptions {
    /// Packs an Android image to `output` from the current directory, with
    /// the image name as prefix.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        PackOptions {
            output: output.into(),
            input_dir: PathBuf::from("."),
            prefix: Prefix::default(),
            target: BootImageType::default(),
            overrides: Overrides::default(),
            defaults: Defaults::default(),
        }
    }

    pub fn input_dir(mut self, input_dir: impl Into<PathBuf>) -> Self {
        self.input_dir = input_dir.into();
        self
    }

    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn target(mut self, target: BootImageType) -> Self {
        self.target = target;
        self
    }

    pub fn input(mut self, item: Item, path: impl Into<PathBuf>) -> Self {
        self.overrides.paths.insert(item, path.into());
        self
    }

    pub fn value(mut self, item: Item, value: Value) -> Self {
        self.overrides.values.insert(item, value);
        self
    }

    /// Checks the options before any file is read.
    ///
    /// Loki images are patched against an aboot image, which must be named
    /// explicitly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target == BootImageType::Loki && !self.overrides.paths.contains_key(&Item::Aboot) {
            return Err(ConfigError::MissingAboot);
        }
        for (&item, value) in &self.overrides.values {
            if item.kind() == ItemKind::Blob {
                return Err(ConfigError::NotAValue(item));
            }
            if value.kind() != item.kind() {
                return Err(ConfigError::InvalidValue {
                    item,
                    value: format!("{:?}", value),
                });
            }
        }
        Ok(())
    }

    /// The source of every item `target` uses.
    pub fn resolve(&self) -> ResolvedPaths {
        let prefix = self.prefix.resolve(&self.output);
        paths::resolve(
            &self.input_dir,
            &prefix,
            item::fields_for(self.target).map(|descriptor| descriptor.item),
            &self.overrides,
        )
    }
}

/// Where the value of a packed item came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Given on the command line.
    Value,
    /// Read from this file.
    File(PathBuf),
    /// This file could not be opened, the default was used.
    Defaulted(PathBuf),
    /// This optional blob does not exist, it was packed as empty.
    Empty(PathBuf),
}

/// What a pack read, in catalog order.
#[derive(Debug, Clone)]
pub struct PackReport {
    pub target: BootImageType,
    pub items: Vec<(Item, Origin, Summary)>,
}

/// Loads the value of every resolved item.
///
/// A scalar whose file cannot be opened takes its default. A missing
/// optional blob is empty, a missing required blob is an error. Files that
/// exist but cannot be read or parsed are always errors.
pub fn load_fields(
    paths: &ResolvedPaths,
    defaults: &Defaults,
) -> Result<(Fields, Vec<(Item, Origin)>)> {
    let mut fields = Fields::new();
    let mut origins = Vec::new();
    for (item, source) in paths.iter() {
        let (value, origin) = match source {
            Source::Value(value) => (value.clone(), Origin::Value),
            Source::Path(path) => load_item(item, path, defaults)?,
        };
        debug!("Loaded {} ({:?})", item, origin);
        fields.insert(item, value);
        origins.push((item, origin));
    }
    Ok((fields, origins))
}

fn load_item(item: Item, path: &Path, defaults: &Defaults) -> Result<(Value, Origin)> {
    let descriptor = item.descriptor();
    if descriptor.kind.is_scalar() {
        if let Some(value) = field::read_scalar_if_present(path, descriptor.kind)? {
            return Ok((value, Origin::File(path.to_owned())));
        }
        let value = defaults
            .value_of(item)
            .unwrap_or_else(|| Value::Text(String::new()));
        return Ok((value, Origin::Defaulted(path.to_owned())));
    }

    if descriptor.required {
        let data = field::read_blob(path)?;
        return Ok((Value::Blob(data), Origin::File(path.to_owned())));
    }
    match field::read_blob_if_present(path)? {
        Some(data) => Ok((Value::Blob(data), Origin::File(path.to_owned()))),
        None => Ok((Value::Blob(Vec::new()), Origin::Empty(path.to_owned()))),
    }
}

/// Builds the in-memory image for `target`. Items missing from `fields`
/// take their defaults, missing blobs are empty.
pub fn build_image(mut fields: Fields, target: BootImageType, defaults: &Defaults) -> BootImage {
    let number = |fields: &Fields, item: Item| {
        fields
            .u32(item)
            .or_else(|| defaults.value_of(item).and_then(|value| value.as_u32()))
            .unwrap_or_default()
    };

    let mut image = BootImage::new(defaults);
    image.set_image_type(target);
    if let Some(cmdline) = fields.text(Item::Cmdline) {
        image.set_kernel_cmdline(cmdline);
    }
    if let Some(board) = fields.text(Item::Board) {
        image.set_board_name(board);
    }
    image.set_page_size(number(&fields, Item::PageSize));
    image.set_addresses(
        number(&fields, Item::Base),
        number(&fields, Item::KernelOffset),
        number(&fields, Item::RamdiskOffset),
        number(&fields, Item::SecondOffset),
        number(&fields, Item::TagsOffset),
    );
    image.set_ipl_address(number(&fields, Item::IplAddress));
    image.set_rpm_address(number(&fields, Item::RpmAddress));
    image.set_appsbl_address(number(&fields, Item::AppsblAddress));
    image.set_entrypoint_address(number(&fields, Item::Entrypoint));

    let mut blob = |item: Item| fields.take_blob(item).unwrap_or_default();
    image.insert_kernel(blob(Item::Kernel));
    image.insert_ramdisk(blob(Item::Ramdisk));
    image.insert_second_bootloader(blob(Item::Second));
    image.insert_device_tree(blob(Item::Dt));
    image.insert_aboot(blob(Item::Aboot));
    image.insert_ipl(blob(Item::Ipl));
    image.insert_rpm(blob(Item::Rpm));
    image.insert_appsbl(blob(Item::Appsbl));
    image.insert_sin(blob(Item::Sin));
    image.insert_sin_header(blob(Item::Sinhdr));
    image
}

/// Reads the items `options.target` uses and writes the boot image to
/// `options.output`. Nothing is read when the options are invalid.
pub fn pack<C: ImageCodec + ?Sized>(codec: &C, options: &PackOptions) -> Result<PackReport> {
    options.validate()?;

    let paths = options.resolve();
    let (fields, origins) = load_fields(&paths, &options.defaults)?;

    let items = origins
        .into_iter()
        .filter_map(|(item, origin)| {
            let summary = fields.get(item)?.summary();
            Some((item, origin, summary))
        })
        .collect();

    let image = build_image(fields, options.target, &options.defaults);
    info!("Packing {} image '{}'", options.target, options.output.display());
    codec.assemble(&image, options.target, &options.output)?;

    Ok(PackReport {
        target: options.target,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AssembleError, Error, ParseError};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingCodec {
        assembled: RefCell<Vec<(BootImage, BootImageType)>>,
    }

    impl ImageCodec for RecordingCodec {
        fn load(&self, _path: &Path) -> Result<BootImage, ParseError> {
            unreachable!("pack never loads")
        }

        fn assemble(
            &self,
            image: &BootImage,
            target: BootImageType,
            _path: &Path,
        ) -> Result<(), AssembleError> {
            self.assembled.borrow_mut().push((image.clone(), target));
            Ok(())
        }
    }

    fn write_items(dir: &Path, items: &[(&str, &[u8])]) {
        for (name, contents) in items {
            fs::write(dir.join(format!("boot.img-{}", name)), contents).unwrap();
        }
    }

    #[test]
    fn loki_needs_an_explicit_aboot() {
        let dir = tempdir().unwrap();
        let codec = RecordingCodec::default();
        let options = PackOptions::new(dir.path().join("boot.img"))
            .input_dir(dir.path())
            .target(BootImageType::Loki);

        let error = pack(&codec, &options).unwrap_err();
        assert!(matches!(error, Error::Config(ConfigError::MissingAboot)));
        assert!(codec.assembled.borrow().is_empty());
    }

    #[test]
    fn blobs_cannot_be_given_by_value() {
        let options = PackOptions::new("boot.img").value(Item::Kernel, Value::Blob(vec![1]));
        assert!(matches!(options.validate(), Err(ConfigError::NotAValue(Item::Kernel))));

        let options = PackOptions::new("boot.img").value(Item::PageSize, Value::Address(4096));
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidValue { item: Item::PageSize, .. })
        ));
    }

    #[test]
    fn missing_scalars_take_their_defaults() {
        let dir = tempdir().unwrap();
        write_items(dir.path(), &[("kernel", b"kernel"), ("ramdisk", b"ramdisk")]);
        let codec = RecordingCodec::default();
        let options = PackOptions::new(dir.path().join("boot.img")).input_dir(dir.path());

        let report = pack(&codec, &options).unwrap();
        let assembled = codec.assembled.borrow();
        let (image, target) = &assembled[0];
        assert_eq!(*target, BootImageType::Android);
        assert_eq!(image.kernel(), b"kernel");
        assert_eq!(image.ramdisk(), b"ramdisk");
        assert!(image.device_tree().is_empty());
        assert_eq!(image.page_size(), 2048);
        assert_eq!(image.kernel_address(), 0x10008000);
        assert_eq!(image.ramdisk_address(), 0x11000000);
        assert_eq!(image.kernel_cmdline(), "");

        let origin = |wanted: Item| {
            report
                .items
                .iter()
                .find(|(item, _, _)| *item == wanted)
                .map(|(_, origin, _)| origin.clone())
                .unwrap()
        };
        assert!(matches!(origin(Item::Base), Origin::Defaulted(_)));
        assert!(matches!(origin(Item::Kernel), Origin::File(_)));
        assert!(matches!(origin(Item::Dt), Origin::Empty(_)));
    }

    #[test]
    fn missing_kernel_is_not_found() {
        let dir = tempdir().unwrap();
        write_items(dir.path(), &[("ramdisk", b"ramdisk")]);
        let codec = RecordingCodec::default();
        let options = PackOptions::new(dir.path().join("boot.img")).input_dir(dir.path());

        let error = pack(&codec, &options).unwrap_err();
        assert!(error.is_not_found());
        assert!(codec.assembled.borrow().is_empty());
    }

    #[test]
    fn malformed_scalar_is_an_error() {
        let dir = tempdir().unwrap();
        write_items(
            dir.path(),
            &[("kernel", b"k"), ("ramdisk", b"r"), ("base", b"not hex\n")],
        );
        let options = PackOptions::new(dir.path().join("boot.img")).input_dir(dir.path());

        let error = pack(&RecordingCodec::default(), &options).unwrap_err();
        assert!(matches!(error, Error::Format { expected: "%08x", .. }));
    }

    #[test]
    fn values_win_over_files() {
        let dir = tempdir().unwrap();
        write_items(
            dir.path(),
            &[("kernel", b"k"), ("ramdisk", b"r"), ("page_size", b"2048\n")],
        );
        let codec = RecordingCodec::default();
        let options = PackOptions::new(dir.path().join("boot.img"))
            .input_dir(dir.path())
            .value(Item::PageSize, Value::Integer(4096))
            .value(Item::Cmdline, Value::Text("quiet".into()));

        let report = pack(&codec, &options).unwrap();
        let assembled = codec.assembled.borrow();
        let (image, _) = &assembled[0];
        assert_eq!(image.page_size(), 4096);
        assert_eq!(image.kernel_cmdline(), "quiet");
        assert!(report
            .items
            .contains(&(Item::PageSize, Origin::Value, Summary::Scalar("4096".into()))));
    }

    #[test]
    fn only_items_of_the_target_are_read() {
        let dir = tempdir().unwrap();
        write_items(
            dir.path(),
            &[("kernel", b"k"), ("ramdisk", b"r"), ("ipl", b"ipl"), ("dt", b"dt")],
        );
        let codec = RecordingCodec::default();
        let options = PackOptions::new(dir.path().join("boot.img")).input_dir(dir.path());

        pack(&codec, &options).unwrap();
        let assembled = codec.assembled.borrow();
        let (image, _) = &assembled[0];
        assert_eq!(image.device_tree(), b"dt");
        assert!(image.ipl().is_empty());
    }

    #[test]
    fn sony_addresses_are_set() {
        let mut fields = Fields::new();
        fields.insert(Item::IplAddress, Value::Address(0x0001_0000));
        fields.insert(Item::RpmAddress, Value::Address(0x0002_0000));
        fields.insert(Item::AppsblAddress, Value::Address(0x0003_0000));
        fields.insert(Item::Entrypoint, Value::Address(0x0000_8000));
        fields.insert(Item::Ipl, Value::Blob(vec![1]));

        let image = build_image(fields, BootImageType::SonyElf, &Defaults::default());
        assert_eq!(image.image_type(), BootImageType::SonyElf);
        assert_eq!(image.ipl_address(), 0x0001_0000);
        assert_eq!(image.rpm_address(), 0x0002_0000);
        assert_eq!(image.appsbl_address(), 0x0003_0000);
        assert_eq!(image.entrypoint_address(), 0x0000_8000);
        assert_eq!(image.ipl(), &[1]);
    }

    #[test]
    fn optional_blob_that_is_a_directory_is_an_error() {
        let dir = tempdir().unwrap();
        write_items(dir.path(), &[("kernel", b"k"), ("ramdisk", b"r")]);
        fs::create_dir(dir.path().join("boot.img-dt")).unwrap();
        let options = PackOptions::new(dir.path().join("boot.img")).input_dir(dir.path());

        let error = pack(&RecordingCodec::default(), &options).unwrap_err();
        assert!(matches!(error, Error::Io { .. }));
        assert!(!error.is_not_found());
    }
}
