pub mod android {
    pub const ANDROID_MAGIC: [u8; ANDROID_MAGIC_SIZE] = *b"ANDROID!";
    pub const ANDROID_MAGIC_SIZE: usize = 8;
    /// The size of the header, in bytes.
    pub const ANDROID_HEADER_SIZE: usize = 1632;
    /// The magic may appear anywhere in the first 512 bytes of the image.
    pub const MAX_HEADER_OFFSET: usize = 512;
    pub const BOOT_NAME_SIZE: usize = 16;
    pub const BOOT_ARGS_SIZE: usize = 512;
    pub const BOOT_EXTRA_ARGS_SIZE: usize = 1024;
    pub const UNIQUE_ID_SIZE: usize = 32;
}

pub mod bump {
    /// Appended after the last section of a Bump'd image.
    pub const BUMP_MAGIC: [u8; BUMP_MAGIC_SIZE] = [
        0x41, 0xa9, 0xe4, 0x67, 0x74, 0x4d, 0x1d, 0x1b, 0xa4, 0x29, 0xf2, 0xec, 0xea, 0x65, 0x52,
        0x79,
    ];
    pub const BUMP_MAGIC_SIZE: usize = 16;
}

pub mod loki {
    pub const LOKI_MAGIC: [u8; LOKI_MAGIC_SIZE] = *b"LOKI";
    pub const LOKI_MAGIC_SIZE: usize = 4;
    /// Offset of the Loki header, relative to the Android header.
    pub const LOKI_HEADER_OFFSET: u64 = 0x400;
    pub const LOKI_HEADER_SIZE: usize = 148;
    pub const LOKI_BUILD_SIZE: usize = 128;
    /// Gap Loki leaves between the ramdisk and the device tree of a boot
    /// (not recovery) image.
    pub const LOKI_SHELLCODE_SIZE: u64 = 0x200;
}

pub mod sony {
    pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
    pub const EI_NIDENT: usize = 16;
    pub const ELF_HEADER_SIZE: usize = 52;
    pub const PROGRAM_HEADER_SIZE: usize = 32;

    pub const ELFCLASS32: u8 = 1;
    pub const ELFDATA2LSB: u8 = 1;
    pub const EV_CURRENT: u8 = 1;
    pub const ET_EXEC: u16 = 2;
    pub const EM_ARM: u16 = 40;

    pub const PT_LOAD: u32 = 1;
    pub const SONY_E_TYPE_CMDLINE: u32 = 4;
    pub const SONY_E_TYPE_SIN: u32 = 0x14;

    pub const SONY_E_FLAGS_KERNEL: u32 = 0x0000_0000;
    pub const SONY_E_FLAGS_RAMDISK: u32 = 0x8000_0000;
    pub const SONY_E_FLAGS_IPL: u32 = 0x4000_0000;
    pub const SONY_E_FLAGS_CMDLINE: u32 = 0x2000_0000;
    pub const SONY_E_FLAGS_RPM: u32 = 0x0100_0000;
    pub const SONY_E_FLAGS_APPSBL: u32 = 0x0200_0000;
}
