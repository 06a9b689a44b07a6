//! Fixed signatures, discriminators, and offsets for the i8xx VBIOS format.
//!
//! None of these values come from documentation; they are empirical
//! fingerprints of the VBIOS revisions this tool has been verified against
//! (845G #2686/#2720, 855GM, 865G #2831/#2919/#3144). An image that does not
//! match them is refused, never guessed at.

/// Physical address the VBIOS is shadowed to at boot.
pub const VBIOS_BASE: usize = 0xC0000;

/// Size of the shadowed VBIOS window.
pub const IMAGE_SIZE: usize = 0x10000;

/// ASCII signature marking the start of the BIOS configuration area.
/// Exact match, 16 bytes including the trailing space.
pub const CFG_SIGNATURE: &[u8; 16] = b"BIOS_DATA_BLOCK ";

/// Offset of the version field relative to the configuration area.
pub const CFG_VERSION: usize = 29;

/// Older configuration areas carry two extra bytes before the version string.
/// Version bytes below this threshold indicate the old format.
pub const CFG_OLD_FORMAT_MAX: u8 = 0x31;

/// Size of one extended mode table record.
pub const MODE_RECORD_SIZE: usize = 5;

/// Mode table sentinel record id.
pub const MODE_SENTINEL: u8 = 0xFF;

/// Mode-id prefixes that mark the start of the extended mode table.
/// `{0x30, 0x32, 0x34}` is the 855GM/865G family, `{0x30, 0x31, 0x32}` the
/// 845G family.
pub const MODE_TABLE_PREFIXES: [[u8; 3]; 2] = [[0x30, 0x32, 0x34], [0x30, 0x31, 0x32]];

// --- Layout classification fingerprints ---
//
// The first two bytes of a parameter block hold a base-resolution code on
// Kind2/Kind3 firmware. Kind1 firmware (855GM and 865G #3144) keeps nothing
// recognizable there, so the absence of a code is itself the Kind1 signal.

/// Base-resolution codes found at parameter block offset 0 (little-endian):
/// 1024x768, 800x600, 640x480.
pub const BASE_RESOLUTION_CODES: [u16; 3] = [0x2F80, 0x2464, 0x1D50];

/// Offset of the secondary discriminator field within a parameter block.
/// This is byte 28 of the 60 Hz slot under the 38-byte Kind2 stride, and the
/// first byte of the 75 Hz slot under the 28-byte Kind3 stride.
pub const DISCRIMINATOR_OFFSET: usize = 6 + 28;

/// Kind2 discriminators: the standalone `vdisp - 1` field of the legacy base
/// modes (767, 599, 479), little-endian byte pairs.
pub const KIND2_DISCRIMINATORS: [[u8; 2]; 3] = [[0xFF, 0x02], [0x57, 0x02], [0xDF, 0x01]];

/// Kind3 discriminators: low words of the 75 Hz slot pixel clocks of the
/// legacy base modes (78750, 49500, 31500 kHz), little-endian byte pairs.
pub const KIND3_DISCRIMINATORS: [[u8; 2]; 3] = [[0xBE, 0x33], [0x5C, 0xC1], [0x0C, 0x7B]];

// --- Chipset identity (bus 0, device 0, function 0 vendor/device dword) ---

/// 82845G/GL host bridge.
pub const CHIPSET_845G: u32 = 0x2560_8086;

/// 82845G/GL host bridge, alternate stepping.
pub const CHIPSET_845G_ALT: u32 = 0x2590_8086;

/// 82855GM host bridge.
pub const CHIPSET_855GM: u32 = 0x3580_8086;

/// 82865G host bridge.
pub const CHIPSET_865G: u32 = 0x2570_8086;
