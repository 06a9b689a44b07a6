//! CRT timing values and the per-layout byte writers.
//!
//! The three layouts share no schema. Kind1 packs width/height into nibble
//! fields and leaves the detailed timings to the firmware; Kind2/Kind3 store
//! full CRT timings as packed little-endian u32 fields. All writes are plain
//! field overwrites; the only read-modify-write is the Kind1 nibble bytes,
//! which share their low nibble with unrelated firmware data.

use crate::error::{PatchError, Result};
use crate::layout::LayoutKind;

/// Refresh-rate slot within a parameter block. Every known layout carries
/// exactly these three slots, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRate {
    Hz60,
    Hz75,
    Hz85,
}

impl RefreshRate {
    pub const ALL: [RefreshRate; 3] = [RefreshRate::Hz60, RefreshRate::Hz75, RefreshRate::Hz85];

    /// Slot index within the parameter block.
    pub fn slot(self) -> usize {
        match self {
            Self::Hz60 => 0,
            Self::Hz75 => 1,
            Self::Hz85 => 2,
        }
    }
}

impl std::fmt::Display for RefreshRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hz60 => write!(f, "60Hz"),
            Self::Hz75 => write!(f, "75Hz"),
            Self::Hz85 => write!(f, "85Hz"),
        }
    }
}

/// One XFree86-style modeline: pixel clock in kHz plus the horizontal and
/// vertical display/sync/total parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingValues {
    pub clock: u32,
    pub hdisp: u32,
    pub hsyncstart: u32,
    pub hsyncend: u32,
    pub htotal: u32,
    pub vdisp: u32,
    pub vsyncstart: u32,
    pub vsyncend: u32,
    pub vtotal: u32,
}

impl TimingValues {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        clock: u32,
        hdisp: u32,
        hsyncstart: u32,
        hsyncend: u32,
        htotal: u32,
        vdisp: u32,
        vsyncstart: u32,
        vsyncend: u32,
        vtotal: u32,
    ) -> Self {
        Self {
            clock,
            hdisp,
            hsyncstart,
            hsyncend,
            htotal,
            vdisp,
            vsyncstart,
            vsyncend,
            vtotal,
        }
    }
}

/// Timing values for one target resolution, one entry per refresh slot.
#[derive(Debug, Clone, Copy)]
pub struct ModeTimings {
    pub per_rate: [TimingValues; 3],
}

/// Fixed timing lookup for the supported target resolutions.
///
/// Returns `None` for anything outside the verified set; the caller must
/// reject such requests before any write occurs.
pub fn mode_timings(width: u32, height: u32) -> Option<ModeTimings> {
    let per_rate = match (width, height) {
        (1280, 768) => [
            TimingValues::new(80140, 1280, 1343, 1479, 1679, 768, 768, 771, 794),
            TimingValues::new(102980, 1280, 1359, 1495, 1711, 768, 768, 771, 801),
            TimingValues::new(118530, 1280, 1367, 1503, 1727, 768, 768, 771, 806),
        ],
        (1024, 600) => {
            [TimingValues::new(65000, 1024, 1032, 1176, 1344, 600, 637, 643, 666); 3]
        }
        (1400, 1050) => {
            [TimingValues::new(176640, 1400, 1432, 2096, 2128, 1050, 1070, 1083, 1103); 3]
        }
        _ => return None,
    };
    Some(ModeTimings { per_rate })
}

// Kind1 slot-relative byte offsets.
const K1_X1: usize = 2;
const K1_X2: usize = 4;
const K1_Y1: usize = 5;
const K1_Y2: usize = 7;

// Kind2/Kind3 slot-relative u32 field offsets.
const T_CLOCK: usize = 0;
const T_HTOTAL: usize = 4;
const T_HBLANK: usize = 8;
const T_HSYNC: usize = 12;
const T_VTOTAL: usize = 16;
const T_VBLANK: usize = 20;
const T_VSYNC: usize = 24;
const T_H: usize = 28;
const T_W: usize = 30;

fn write_u32(image: &mut [u8], offset: usize, value: u32) -> Result<()> {
    let bytes = image
        .get_mut(offset..offset + 4)
        .ok_or(PatchError::OutOfBounds { offset, len: 4 })?;
    bytes.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

fn write_u8(image: &mut [u8], offset: usize, value: u8) -> Result<()> {
    *image
        .get_mut(offset)
        .ok_or(PatchError::OutOfBounds { offset, len: 1 })? = value;
    Ok(())
}

fn read_u8(image: &[u8], offset: usize) -> Result<u8> {
    image
        .get(offset)
        .copied()
        .ok_or(PatchError::OutOfBounds { offset, len: 1 })
}

/// Overwrite one refresh slot of the parameter block at `params` with `t`.
///
/// The byte offsets per layout are exactly those of the firmware revisions
/// this tool is verified against; see [`LayoutKind`].
pub fn write_timings(
    image: &mut [u8],
    params: usize,
    kind: LayoutKind,
    rate: RefreshRate,
    t: &TimingValues,
) -> Result<()> {
    let slot = params + kind.header_len() + kind.stride() * rate.slot();

    match kind {
        LayoutKind::Kind1 => {
            // Width and height, split into a full low byte and the high
            // nibble of a byte shared with unrelated data.
            write_u8(image, slot + K1_X1, (t.hdisp & 0xFF) as u8)?;
            let x2 = read_u8(image, slot + K1_X2)?;
            write_u8(
                image,
                slot + K1_X2,
                (x2 & 0x0F) | ((t.hdisp >> 4) & 0xF0) as u8,
            )?;
            write_u8(image, slot + K1_Y1, (t.vdisp & 0xFF) as u8)?;
            let y2 = read_u8(image, slot + K1_Y2)?;
            write_u8(
                image,
                slot + K1_Y2,
                (y2 & 0x0F) | ((t.vdisp >> 4) & 0xF0) as u8,
            )?;
        }
        LayoutKind::Kind2 | LayoutKind::Kind3 => {
            write_u32(image, slot + T_CLOCK, t.clock)?;
            write_u32(image, slot + T_HTOTAL, (t.htotal << 16) | (t.hdisp - 1))?;
            write_u32(image, slot + T_HBLANK, (t.htotal << 16) | (t.hdisp - 1))?;
            write_u32(image, slot + T_HSYNC, (t.hsyncend << 16) | t.hsyncstart)?;
            write_u32(image, slot + T_VTOTAL, (t.vtotal << 16) | (t.vdisp - 1))?;
            write_u32(image, slot + T_VBLANK, (t.vtotal << 16) | (t.vdisp - 1))?;
            write_u32(image, slot + T_VSYNC, (t.vsyncend << 16) | t.vsyncstart)?;
            if kind == LayoutKind::Kind2 {
                // The standalone height and width words overlap by two
                // bytes; the width write lands last, as in the firmware
                // revisions this layout was characterized from.
                write_u32(image, slot + T_H, t.vdisp - 1)?;
                write_u32(image, slot + T_W, t.hdisp - 1)?;
            }
        }
    }

    tracing::debug!(?kind, %rate, slot, "wrote timing slot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(image: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(image[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn unsupported_resolutions_have_no_timings() {
        assert!(mode_timings(1920, 1080).is_none());
        assert!(mode_timings(1280, 1024).is_none());
        assert!(mode_timings(1280, 768).is_some());
    }

    #[test]
    fn kind2_packs_htotal_and_hdisp() {
        let mut image = vec![0u8; 0x200];
        let t = mode_timings(1280, 768).unwrap().per_rate[0];
        write_timings(&mut image, 0x40, LayoutKind::Kind2, RefreshRate::Hz60, &t).unwrap();

        let slot = 0x40 + 6;
        assert_eq!(read_u32(&image, slot + T_CLOCK), 80140);
        let htotal = read_u32(&image, slot + T_HTOTAL);
        assert_eq!(htotal, (1679 << 16) | 1279);
        // Round-trip the packed field back to the modeline pair.
        assert_eq!((htotal >> 16, (htotal & 0xFFFF) + 1), (1679, 1280));
        assert_eq!(read_u32(&image, slot + T_HSYNC), (1479 << 16) | 1343);
        assert_eq!(read_u32(&image, slot + T_VTOTAL), (794 << 16) | 767);
        assert_eq!(read_u32(&image, slot + T_VSYNC), (771 << 16) | 768);
    }

    #[test]
    fn kind2_standalone_fields_overlap_width_wins() {
        let mut image = vec![0u8; 0x200];
        let t = mode_timings(1280, 768).unwrap().per_rate[0];
        write_timings(&mut image, 0, LayoutKind::Kind2, RefreshRate::Hz60, &t).unwrap();

        let slot = 6;
        // Height word survives in the two bytes the width write doesn't cover.
        assert_eq!(
            u16::from_le_bytes(image[slot + T_H..slot + T_H + 2].try_into().unwrap()),
            767
        );
        assert_eq!(read_u32(&image, slot + T_W), 1279);
    }

    #[test]
    fn kind3_slots_use_the_28_byte_stride() {
        let mut image = vec![0u8; 0x200];
        let t = mode_timings(1024, 600).unwrap().per_rate[1];
        write_timings(&mut image, 0x10, LayoutKind::Kind3, RefreshRate::Hz75, &t).unwrap();

        let slot = 0x10 + 6 + 28;
        assert_eq!(read_u32(&image, slot + T_CLOCK), 65000);
        assert_eq!(read_u32(&image, slot + T_VTOTAL), (666 << 16) | 599);
        // Nothing written past the end of the 28-byte slot.
        assert!(image[slot + 28..slot + 38].iter().all(|&b| b == 0));
    }

    #[test]
    fn kind1_preserves_shared_low_nibbles() {
        let mut image = vec![0u8; 0x200];
        let params = 0x20;
        let slot = params + 18 * 2; // 85Hz slot
        image[slot + K1_X2] = 0x0A;
        image[slot + K1_Y2] = 0x05;

        let t = mode_timings(1280, 768).unwrap().per_rate[2];
        write_timings(&mut image, params, LayoutKind::Kind1, RefreshRate::Hz85, &t).unwrap();

        assert_eq!(image[slot + K1_X1], 0x00); // 1280 & 0xFF
        assert_eq!(image[slot + K1_X2], 0x5A); // high nibble of 1280 >> 4, low nibble kept
        assert_eq!(image[slot + K1_Y1], 0x00); // 768 & 0xFF
        assert_eq!(image[slot + K1_Y2], 0x35); // high nibble of 768 >> 4, low nibble kept
    }

    #[test]
    fn writes_are_idempotent() {
        for kind in [LayoutKind::Kind1, LayoutKind::Kind2, LayoutKind::Kind3] {
            let mut image = vec![0x5Au8; 0x200];
            let t = mode_timings(1400, 1050).unwrap().per_rate[0];
            write_timings(&mut image, 0x40, kind, RefreshRate::Hz60, &t).unwrap();
            let once = image.clone();
            write_timings(&mut image, 0x40, kind, RefreshRate::Hz60, &t).unwrap();
            assert_eq!(image, once);
        }
    }

    #[test]
    fn truncated_block_is_out_of_bounds() {
        let mut image = vec![0u8; 0x40];
        let t = mode_timings(1280, 768).unwrap().per_rate[0];
        assert!(matches!(
            write_timings(&mut image, 0x30, LayoutKind::Kind2, RefreshRate::Hz60, &t),
            Err(PatchError::OutOfBounds { .. })
        ));
    }
}
