use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use bootimgtool::{
    pack, unpack, AssembleError, BootImage, BootImageType, ConfigError, Error, ImageCodec, Item,
    PackOptions, ParseError, Prefix, StandardCodec, UnpackOptions, Value,
};

fn write_items(dir: &Path, prefix: &str, items: &[(&str, &[u8])]) {
    fs::create_dir_all(dir).expect("item dir");
    for (name, contents) in items {
        fs::write(dir.join(format!("{}{}", prefix, name)), contents).expect("item file");
    }
}

fn read_item(dir: &Path, prefix: &str, name: &str) -> Vec<u8> {
    fs::read(dir.join(format!("{}{}", prefix, name))).expect("unpacked item")
}

fn android_items(dir: &Path) {
    write_items(
        dir,
        "boot.img-",
        &[
            ("cmdline", b"console=ttyHSL0,115200,n8 androidboot.hardware=qcom\n"),
            ("board", b"msm8974\n"),
            ("base", b"00000000\n"),
            ("kernel_offset", b"00008000\n"),
            ("ramdisk_offset", b"02000000\n"),
            ("second_offset", b"00f00000\n"),
            ("tags_offset", b"01e00000\n"),
            ("page_size", b"2048\n"),
            ("kernel", &[0xaa; 5000]),
            ("ramdisk", &[0xbb; 3000]),
            ("dt", &[0xcc; 700]),
        ],
    );
}

/// Packs `source` into `image`, unpacks it into `unpacked` and packs that
/// into `repacked`. Returns both images.
fn round_trip(
    source: &Path,
    unpacked: &Path,
    target: BootImageType,
    image: PathBuf,
    repacked: PathBuf,
) -> (Vec<u8>, Vec<u8>) {
    let options = PackOptions::new(&image).input_dir(source).target(target);
    pack(&StandardCodec, &options).expect("pack");

    let report = unpack(
        &StandardCodec,
        &UnpackOptions::new(&image).output_dir(unpacked),
    )
    .expect("unpack");
    assert_eq!(report.image_type, target);

    let options = PackOptions::new(&repacked)
        .input_dir(unpacked)
        .prefix(Prefix::Custom("boot.img".into()))
        .target(target);
    pack(&StandardCodec, &options).expect("repack");

    (
        fs::read(image).expect("image"),
        fs::read(repacked).expect("repacked image"),
    )
}

#[test]
fn android_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    android_items(dir.path());

    let (first, second) = round_trip(
        dir.path(),
        &dir.path().join("out"),
        BootImageType::Android,
        dir.path().join("boot.img"),
        dir.path().join("repacked.img"),
    );
    assert_eq!(first.len(), 7 * 2048);
    assert_eq!(first, second);

    let out = dir.path().join("out");
    assert_eq!(read_item(&out, "boot.img-", "kernel"), vec![0xaa; 5000]);
    assert_eq!(read_item(&out, "boot.img-", "dt"), vec![0xcc; 700]);
    assert_eq!(read_item(&out, "boot.img-", "board"), b"msm8974\n");
    assert!(!out.join("boot.img-aboot").exists());
}

#[test]
fn bump_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    android_items(dir.path());

    let (first, second) = round_trip(
        dir.path(),
        &dir.path().join("out"),
        BootImageType::Bump,
        dir.path().join("boot.img"),
        dir.path().join("repacked.img"),
    );
    assert_eq!(first.len(), 7 * 2048 + 16);
    assert_eq!(first, second);
}

#[test]
fn sony_elf_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_items(
        dir.path(),
        "boot.img-",
        &[
            ("cmdline", b"console=ttyMSM0 androidboot.hardware=sony\n"),
            ("base", b"80200000\n"),
            ("ramdisk_offset", b"01400000\n"),
            ("ipl_address", b"0c000000\n"),
            ("rpm_address", b"00020000\n"),
            ("entrypoint", b"80208000\n"),
            ("kernel", &[0x11; 4096]),
            ("ramdisk", &[0x22; 1024]),
            ("ipl", &[0x33; 64]),
            ("rpm", &[0x44; 32]),
            ("sin", &[0x55; 16]),
            ("sinhdr", &[0x66; 40]),
        ],
    );

    let out = dir.path().join("out");
    let (first, second) = round_trip(
        dir.path(),
        &out,
        BootImageType::SonyElf,
        dir.path().join("boot.img"),
        dir.path().join("repacked.img"),
    );
    assert_eq!(first, second);
    assert_eq!(&first[..4], b"\x7fELF");

    assert_eq!(read_item(&out, "boot.img-", "base"), b"80200000\n");
    assert_eq!(read_item(&out, "boot.img-", "ramdisk_offset"), b"01400000\n");
    assert_eq!(read_item(&out, "boot.img-", "ipl_address"), b"0c000000\n");
    assert_eq!(read_item(&out, "boot.img-", "appsbl_address"), b"00000000\n");
    assert_eq!(read_item(&out, "boot.img-", "entrypoint"), b"80208000\n");
    assert_eq!(read_item(&out, "boot.img-", "sinhdr"), vec![0x66; 40]);
    assert!(read_item(&out, "boot.img-", "appsbl").is_empty());
}

#[test]
fn base_plus_offset_is_preserved() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_items(
        dir.path(),
        "boot.img-",
        &[
            ("base", b"80000000\n"),
            ("kernel_offset", b"00080000\n"),
            ("ramdisk_offset", b"02000000\n"),
            ("tags_offset", b"00000100\n"),
            ("kernel", b"kernel"),
            ("ramdisk", b"ramdisk"),
        ],
    );
    let image = dir.path().join("boot.img");
    pack(&StandardCodec, &PackOptions::new(&image).input_dir(dir.path())).expect("pack");

    let out = dir.path().join("out");
    unpack(&StandardCodec, &UnpackOptions::new(&image).output_dir(&out)).expect("unpack");

    // The kernel offset is always written as the default one.
    assert_eq!(read_item(&out, "boot.img-", "kernel_offset"), b"00008000\n");
    assert_eq!(read_item(&out, "boot.img-", "base"), b"80078000\n");
    assert_eq!(read_item(&out, "boot.img-", "ramdisk_offset"), b"01f88000\n");
    assert_eq!(read_item(&out, "boot.img-", "tags_offset"), b"fff88100\n");

    let parsed = BootImage::read_from_file(&image).expect("parse");
    assert_eq!(parsed.kernel_address(), 0x80080000);
    assert_eq!(parsed.ramdisk_address(), 0x82000000);
    assert_eq!(parsed.kernel_tags_address(), 0x80000100);
}

#[test]
fn kernel_and_ramdisk_alone_are_enough() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_items(
        dir.path(),
        "boot.img-",
        &[("kernel", b"kernel"), ("ramdisk", b"ramdisk")],
    );
    let image = dir.path().join("boot.img");
    pack(&StandardCodec, &PackOptions::new(&image).input_dir(dir.path())).expect("pack");

    let parsed = BootImage::read_from_file(&image).expect("parse");
    assert_eq!(parsed.kernel(), b"kernel");
    assert_eq!(parsed.ramdisk(), b"ramdisk");
    assert_eq!(parsed.page_size(), 2048);
    assert_eq!(parsed.kernel_address(), 0x10008000);
    assert_eq!(parsed.ramdisk_address(), 0x11000000);
    assert_eq!(parsed.second_bootloader_address(), 0x10f00000);
    assert_eq!(parsed.kernel_tags_address(), 0x10000100);
    assert_eq!(parsed.kernel_cmdline(), "");
    assert_eq!(parsed.board_name(), "");
    assert!(parsed.second_bootloader().is_empty());
    assert!(parsed.device_tree().is_empty());
}

#[test]
fn missing_kernel_fails_with_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_items(dir.path(), "boot.img-", &[("ramdisk", b"ramdisk")]);
    let image = dir.path().join("boot.img");

    let error = pack(&StandardCodec, &PackOptions::new(&image).input_dir(dir.path()))
        .expect_err("kernel is required");
    assert!(error.is_not_found());
    assert!(!image.exists());
}

/// Counts every call so tests can prove the codec was never reached.
#[derive(Default)]
struct CountingCodec {
    calls: Cell<usize>,
}

impl ImageCodec for CountingCodec {
    fn load(&self, path: &Path) -> Result<BootImage, ParseError> {
        self.calls.set(self.calls.get() + 1);
        StandardCodec.load(path)
    }

    fn assemble(
        &self,
        image: &BootImage,
        target: BootImageType,
        path: &Path,
    ) -> Result<(), AssembleError> {
        self.calls.set(self.calls.get() + 1);
        StandardCodec.assemble(image, target, path)
    }
}

#[test]
fn loki_without_aboot_fails_before_reading_anything() {
    let dir = tempfile::tempdir().expect("tempdir");
    let codec = CountingCodec::default();
    // The input directory does not even exist, so reading any item would
    // fail with a different error.
    let options = PackOptions::new(dir.path().join("boot.img"))
        .input_dir(dir.path().join("missing"))
        .target(BootImageType::Loki);

    let error = pack(&codec, &options).expect_err("aboot is required");
    assert!(matches!(error, Error::Config(ConfigError::MissingAboot)));
    assert_eq!(codec.calls.get(), 0);
    assert!(!dir.path().join("boot.img").exists());
}

#[test]
fn aboot_is_only_needed_for_loki() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_items(
        dir.path(),
        "boot.img-",
        &[("kernel", b"kernel"), ("ramdisk", b"ramdisk")],
    );
    let codec = CountingCodec::default();
    let options = PackOptions::new(dir.path().join("boot.img")).input_dir(dir.path());

    pack(&codec, &options).expect("android pack");
    assert_eq!(codec.calls.get(), 1);
}

#[test]
fn loki_with_aboot_reaches_the_codec() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_items(
        dir.path(),
        "boot.img-",
        &[("kernel", b"kernel"), ("ramdisk", b"ramdisk")],
    );
    let aboot = dir.path().join("aboot.img");
    fs::write(&aboot, b"aboot").expect("aboot");
    let codec = CountingCodec::default();
    let options = PackOptions::new(dir.path().join("boot.img"))
        .input_dir(dir.path())
        .target(BootImageType::Loki)
        .input(Item::Aboot, &aboot);

    let error = pack(&codec, &options).expect_err("no Loki patcher");
    assert!(matches!(
        error,
        Error::Assemble(AssembleError::Unsupported(BootImageType::Loki))
    ));
    assert_eq!(codec.calls.get(), 1);
}

#[test]
fn unpacking_twice_gives_identical_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    android_items(dir.path());
    let image = dir.path().join("boot.img");
    pack(&StandardCodec, &PackOptions::new(&image).input_dir(dir.path())).expect("pack");

    // A longer stale file must be replaced, not partly overwritten.
    let out = dir.path().join("out");
    write_items(&out, "boot.img-", &[("kernel", &[0xff; 10000])]);

    let snapshot = |report: &bootimgtool::UnpackReport| -> Vec<(Item, Vec<u8>)> {
        report
            .files
            .iter()
            .map(|(item, path, _)| (*item, fs::read(path).expect("unpacked item")))
            .collect()
    };

    let options = UnpackOptions::new(&image).output_dir(&out);
    let first = unpack(&StandardCodec, &options).expect("first unpack");
    let after_first = snapshot(&first);
    let second = unpack(&StandardCodec, &options).expect("second unpack");
    let after_second = snapshot(&second);

    assert_eq!(after_first.len(), 21);
    assert_eq!(after_first, after_second);
    assert_eq!(read_item(&out, "boot.img-", "kernel"), vec![0xaa; 5000]);
}

#[test]
fn unpack_then_pack_with_explicit_prefix() {
    let dir = tempfile::tempdir().expect("tempdir");
    android_items(dir.path());
    let original = dir.path().join("boot.img");
    pack(&StandardCodec, &PackOptions::new(&original).input_dir(dir.path())).expect("pack");

    // unpack boot.img -o out
    let out = dir.path().join("out");
    unpack(&StandardCodec, &UnpackOptions::new(&original).output_dir(&out)).expect("unpack");

    // pack new.img -i out -p boot.img
    let rebuilt = dir.path().join("new.img");
    let options = PackOptions::new(&rebuilt)
        .input_dir(&out)
        .prefix(Prefix::from_options(Some("boot.img".into()), false));
    pack(&StandardCodec, &options).expect("repack");

    assert_eq!(
        fs::read(&original).expect("original"),
        fs::read(&rebuilt).expect("rebuilt")
    );
}

#[test]
fn pack_from_overrides_and_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kernel = dir.path().join("zImage");
    let ramdisk = dir.path().join("initrd.img");
    fs::write(&kernel, [0x12; 3000]).expect("kernel");
    fs::write(&ramdisk, [0x34; 100]).expect("ramdisk");
    let image = dir.path().join("boot.img");

    // pack boot.img --value-page_size 2048 --input-kernel zImage --input-ramdisk initrd.img
    let options = PackOptions::new(&image)
        .input_dir(dir.path().join("empty"))
        .value(Item::PageSize, Value::parse_literal(Item::PageSize, "2048").expect("literal"))
        .input(Item::Kernel, &kernel)
        .input(Item::Ramdisk, &ramdisk);
    pack(&StandardCodec, &options).expect("pack");

    let parsed = BootImage::read_from_file(&image).expect("parse");
    assert_eq!(parsed.page_size(), 2048);
    assert_eq!(parsed.kernel(), &[0x12; 3000][..]);
    assert_eq!(parsed.ramdisk(), &[0x34; 100][..]);
    assert_eq!(parsed.kernel_address(), 0x10008000);
    assert_eq!(fs::metadata(&image).expect("image").len(), 4 * 2048);
}

#[test]
fn unpack_reports_unknown_images() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("garbage.img");
    fs::write(&image, vec![0x5a; 4096]).expect("garbage");

    let error = unpack(&StandardCodec, &UnpackOptions::new(&image).output_dir(dir.path()))
        .expect_err("not a boot image");
    assert!(matches!(error, Error::Parse(ParseError::UnknownFormat)));
}

#[test]
fn images_that_cannot_be_packed_again_are_not_unpacked() {
    let dir = tempfile::tempdir().expect("tempdir");
    android_items(dir.path());
    let image = dir.path().join("boot.img");
    pack(&StandardCodec, &PackOptions::new(&image).input_dir(dir.path())).expect("pack");
    let data = fs::read(&image).expect("image");

    let mut odd_page_size = data.clone();
    odd_page_size[36..40].copy_from_slice(&3000u32.to_le_bytes());
    fs::write(&image, &odd_page_size).expect("patched image");
    let error = unpack(&StandardCodec, &UnpackOptions::new(&image).output_dir(dir.path().join("a")))
        .expect_err("page size 3000");
    assert!(matches!(error, Error::Parse(ParseError::InvalidPageSize(3000))));

    let mut bad_cmdline = data;
    bad_cmdline[64..68].copy_from_slice(b"a\xffb\0");
    fs::write(&image, &bad_cmdline).expect("patched image");
    let error = unpack(&StandardCodec, &UnpackOptions::new(&image).output_dir(dir.path().join("b")))
        .expect_err("cmdline is not UTF-8");
    assert!(matches!(error, Error::Parse(ParseError::InvalidText(Item::Cmdline))));
}
