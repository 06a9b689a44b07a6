//! Synthetic VBIOS image builders shared by the integration tests.
//!
//! These build the minimum structure the discovery pipeline looks for: the
//! configuration area signature, an extended mode table with a known family
//! prefix, and a parameter block carrying the fingerprints of one layout.

#![allow(dead_code)]

use vbios_patch::constants::{CFG_SIGNATURE, IMAGE_SIZE, MODE_RECORD_SIZE, MODE_SENTINEL};

pub const CFG_OFFSET: usize = 0x1A30;
pub const TABLE_OFFSET: usize = 0x4000;
pub const PARAMS_OFFSET: usize = 0x5000;

/// Mode id used for the patch target record in the synthetic table.
pub const TARGET_MODE: u8 = 0x38;

/// A blank image with the configuration area signature and an old-format
/// version string ("2720").
pub fn base_image() -> Vec<u8> {
    let mut image = vec![0u8; IMAGE_SIZE];
    image[CFG_OFFSET..CFG_OFFSET + 16].copy_from_slice(CFG_SIGNATURE);
    image[CFG_OFFSET + 29] = 0x2A;
    image[CFG_OFFSET + 31..CFG_OFFSET + 35].copy_from_slice(b"2720");
    image
}

/// Write a mode table at `table`: the three `prefix` records, then `extra`
/// records, then the sentinel. All records point at `PARAMS_OFFSET` unless
/// overridden by `extra`.
pub fn write_mode_table(image: &mut [u8], table: usize, prefix: [u8; 3], extra: &[(u8, u16)]) {
    let mut p = table;
    for id in prefix {
        write_record(image, p, id, PARAMS_OFFSET as u16);
        p += MODE_RECORD_SIZE;
    }
    for (id, offset) in extra {
        write_record(image, p, *id, *offset);
        p += MODE_RECORD_SIZE;
    }
    image[p] = MODE_SENTINEL;
}

pub fn write_record(image: &mut [u8], p: usize, id: u8, offset: u16) {
    image[p] = id;
    image[p + 1] = 8; // bits per pixel, ignored
    image[p + 2..p + 4].copy_from_slice(&offset.to_le_bytes());
    image[p + 4] = 0;
}

/// Stamp Kind2 fingerprints onto the parameter block: the 1024x768 base
/// resolution code and the 767 legacy-total discriminator.
pub fn stamp_kind2_params(image: &mut [u8], params: usize) {
    image[params..params + 2].copy_from_slice(&0x2F80u16.to_le_bytes());
    image[params + 34..params + 36].copy_from_slice(&[0xFF, 0x02]);
}

/// Stamp Kind3 fingerprints: a base resolution code plus the 78750 kHz
/// 75 Hz clock low word at the discriminator offset.
pub fn stamp_kind3_params(image: &mut [u8], params: usize) {
    image[params..params + 2].copy_from_slice(&0x2F80u16.to_le_bytes());
    image[params + 34..params + 36].copy_from_slice(&[0xBE, 0x33]);
}

/// A complete Kind2 image with the 845G-family table prefix and a target
/// mode record pointing at the parameter block.
pub fn kind2_image() -> Vec<u8> {
    let mut image = base_image();
    write_mode_table(
        &mut image,
        TABLE_OFFSET,
        [0x30, 0x31, 0x32],
        &[(TARGET_MODE, PARAMS_OFFSET as u16)],
    );
    stamp_kind2_params(&mut image, PARAMS_OFFSET);
    image
}

/// The three Kind2 slot byte ranges actually written for one parameter
/// block (slot-relative offsets 0..34 under the 38-byte stride).
pub fn kind2_written_ranges(params: usize) -> [std::ops::Range<usize>; 3] {
    [0, 1, 2].map(|t| {
        let slot = params + 6 + 38 * t;
        slot..slot + 34
    })
}
