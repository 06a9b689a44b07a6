//! Classification of the physical timing-block layout of a parameter block.
//!
//! The VBIOS stores no layout tag. The three known layouts are told apart by
//! byte fingerprints of the firmware revisions they ship in: a closed
//! decision table, not a parser. Anything outside the table is refused
//! rather than guessed — a wrong guess corrupts the firmware silently.

use crate::constants::{
    BASE_RESOLUTION_CODES, DISCRIMINATOR_OFFSET, KIND2_DISCRIMINATORS, KIND3_DISCRIMINATORS,
};
use crate::error::{PatchError, Result};

/// One of the three known physical timing-block layouts.
///
/// - `Kind1`: 855GM and 865G #3144. 18-byte slots, nibble-packed width and
///   height bytes, no header.
/// - `Kind2`: 845G #2686/#2720. 6-byte header, 38-byte slots of packed
///   little-endian u32 fields plus standalone width/height words.
/// - `Kind3`: 865G #2831/#2919. As Kind2 but 28-byte slots without the
///   standalone fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Kind1,
    Kind2,
    Kind3,
}

impl LayoutKind {
    /// Parse the CLI override value used by the original tool (1-3).
    pub fn from_override(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Kind1),
            2 => Some(Self::Kind2),
            3 => Some(Self::Kind3),
            _ => None,
        }
    }

    /// Slot stride in bytes.
    pub fn stride(self) -> usize {
        match self {
            Self::Kind1 => 18,
            Self::Kind2 => 38,
            Self::Kind3 => 28,
        }
    }

    /// Fixed header size before the slot array.
    pub fn header_len(self) -> usize {
        match self {
            Self::Kind1 => 0,
            Self::Kind2 | Self::Kind3 => 6,
        }
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kind1 => write!(f, "1 (855GM / 865G #3144)"),
            Self::Kind2 => write!(f, "2 (845G #2686/#2720)"),
            Self::Kind3 => write!(f, "3 (865G #2831/#2919)"),
        }
    }
}

/// Classify the layout of the parameter block at `params`.
///
/// Kind2/Kind3 firmware keeps one of three legacy base-resolution codes in
/// the first two bytes of the block; Kind1 firmware does not, so a missing
/// code is itself the Kind1 signal. When a code is present, a secondary
/// two-byte field discriminates Kind2 from Kind3. A discriminator outside
/// both known sets fails with [`PatchError::LayoutUnknown`].
pub fn classify_layout(image: &[u8], params: usize) -> Result<LayoutKind> {
    let head = image.get(params..params + 2).ok_or(PatchError::OutOfBounds {
        offset: params,
        len: 2,
    })?;
    let code = u16::from_le_bytes([head[0], head[1]]);

    if !BASE_RESOLUTION_CODES.contains(&code) {
        return Ok(LayoutKind::Kind1);
    }

    let d = params + DISCRIMINATOR_OFFSET;
    let field = image.get(d..d + 2).ok_or(PatchError::OutOfBounds {
        offset: d,
        len: 2,
    })?;
    let discriminator = [field[0], field[1]];

    if KIND2_DISCRIMINATORS.contains(&discriminator) {
        Ok(LayoutKind::Kind2)
    } else if KIND3_DISCRIMINATORS.contains(&discriminator) {
        Ok(LayoutKind::Kind3)
    } else {
        Err(PatchError::LayoutUnknown { discriminator })
    }
}
