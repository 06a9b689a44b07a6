//! Discovery of the self-describing structures inside a shadowed VBIOS image.
//!
//! Nothing in here mutates the image. All offsets are relative to the start
//! of the 64 KiB window and are recomputed on every run; the firmware stores
//! no layout metadata we could cache.

use crate::constants::{
    CFG_OLD_FORMAT_MAX, CFG_SIGNATURE, CFG_VERSION, MODE_RECORD_SIZE, MODE_SENTINEL,
    MODE_TABLE_PREFIXES,
};
use crate::error::{PatchError, Result};

/// One entry of the extended mode table: a mode id and the image-relative
/// offset of its parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRecord {
    pub mode_id: u8,
    pub offset: u16,
}

/// Find the BIOS configuration area by scanning for its ASCII signature.
///
/// Returns the offset of the first match. Absence means the image is not a
/// firmware this tool recognizes, which is fatal for the session.
pub fn find_config_block(image: &[u8]) -> Result<usize> {
    image
        .windows(CFG_SIGNATURE.len())
        .position(|w| w == CFG_SIGNATURE)
        .ok_or(PatchError::StructureNotFound("configuration area"))
}

/// Read the 4-byte ASCII version string from the configuration area.
///
/// Old-format areas (version field byte below `0x31`) carry two extra bytes
/// before the string. This is informational only; garbage bytes are rendered
/// lossily rather than rejected.
pub fn read_version(image: &[u8], cfg: usize) -> String {
    let field = cfg + CFG_VERSION;
    let start = match image.get(field) {
        Some(&b) if b < CFG_OLD_FORMAT_MAX => field + 2,
        Some(_) => field,
        None => return String::from("????"),
    };
    match image.get(start..start + 4) {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => String::from("????"),
    }
}

/// Find the extended mode table by scanning for a known 3-record prefix.
///
/// The table has no header; the only way to locate it is the signature of
/// three consecutive records whose mode ids match one of the known firmware
/// families. Returns the offset of the first record of the first match.
pub fn find_mode_table(image: &[u8]) -> Result<usize> {
    let window = 3 * MODE_RECORD_SIZE;
    if image.len() < window {
        return Err(PatchError::StructureNotFound("extended mode table"));
    }
    for p in 0..=(image.len() - window) {
        let ids = [image[p], image[p + MODE_RECORD_SIZE], image[p + 2 * MODE_RECORD_SIZE]];
        if MODE_TABLE_PREFIXES.contains(&ids) {
            return Ok(p);
        }
    }
    Err(PatchError::StructureNotFound("extended mode table"))
}

/// Walk the mode table from `table` and resolve `mode_id` to its
/// parameter-block offset.
///
/// Records are 5 bytes: id, a bits-per-pixel byte, the little-endian u16
/// block offset, and one unused byte. The walk ends at the `0xFF` sentinel;
/// first match wins. Unlike the vendor format itself, the walk refuses to run
/// past the end of the image.
pub fn resolve_mode_params(image: &[u8], table: usize, mode_id: u8) -> Result<usize> {
    let mut p = table;
    loop {
        let record = image
            .get(p..p + MODE_RECORD_SIZE)
            .ok_or(PatchError::OutOfBounds {
                offset: p,
                len: MODE_RECORD_SIZE,
            })?;
        if record[0] == MODE_SENTINEL {
            return Err(PatchError::ModeNotFound(mode_id));
        }
        if record[0] == mode_id {
            let offset = u16::from_le_bytes([record[2], record[3]]);
            tracing::debug!(mode_id, offset, "resolved mode parameter block");
            return Ok(offset as usize);
        }
        p += MODE_RECORD_SIZE;
    }
}

/// Enumerate all mode table records up to the sentinel.
pub fn list_modes(image: &[u8], table: usize) -> Result<Vec<ModeRecord>> {
    let mut records = Vec::new();
    let mut p = table;
    loop {
        let record = image
            .get(p..p + MODE_RECORD_SIZE)
            .ok_or(PatchError::OutOfBounds {
                offset: p,
                len: MODE_RECORD_SIZE,
            })?;
        if record[0] == MODE_SENTINEL {
            return Ok(records);
        }
        records.push(ModeRecord {
            mode_id: record[0],
            offset: u16::from_le_bytes([record[2], record[3]]),
        });
        p += MODE_RECORD_SIZE;
    }
}
