//! In-place patching of i8xx (845G/855GM/865G) video BIOS timing tables.
//!
//! The shadowed VBIOS carries an undocumented extended mode table mapping
//! mode ids to per-mode parameter blocks, each holding CRT timings for three
//! refresh rates. This crate locates those structures in a 64 KiB image,
//! classifies which of the known physical layouts the firmware uses, and
//! overwrites the timing slots with values for a resolution the firmware
//! never shipped with.
//!
//! The core in this library is hardware-independent: it operates on any
//! mutable 64 KiB byte buffer, which is what makes it testable against
//! synthetic images. Acquiring the live buffer (mapping `/dev/mem`,
//! detecting the chipset, unlocking the PAM shadow registers) lives in
//! [`physmap`] and [`pci`] and is wired up by the binary.

pub mod constants;
pub mod error;
pub mod image;
pub mod layout;
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub mod pci;
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub mod physmap;
pub mod timing;

use crate::error::{PatchError, Result};
use crate::image::{find_config_block, find_mode_table, read_version, resolve_mode_params};
use crate::layout::{classify_layout, LayoutKind};
use crate::timing::{mode_timings, write_timings, RefreshRate};

/// One patch request: which mode record to rewrite and with what target
/// resolution.
#[derive(Debug, Clone, Copy)]
pub struct PatchRequest {
    /// Mode id to look up in the extended mode table.
    pub mode: u8,
    pub width: u32,
    pub height: u32,
    /// Force a layout instead of inferring it from the parameter block.
    pub layout_override: Option<LayoutKind>,
}

/// What a completed patch session discovered and wrote, for display.
#[derive(Debug, Clone)]
pub struct PatchReport {
    /// Offset of the BIOS configuration area.
    pub config_block: usize,
    /// 4-byte ASCII firmware version, rendered lossily.
    pub version: String,
    /// Offset of the extended mode table.
    pub mode_table: usize,
    /// Offset of the patched parameter block.
    pub params: usize,
    /// Layout the timing writes were formatted for.
    pub layout: LayoutKind,
}

/// Run the full discovery-and-patch pipeline against `image`.
///
/// Strictly sequential: resolution lookup, configuration area, mode table,
/// parameter block, layout classification, then the three refresh-slot
/// writes (60, 75, 85 Hz). Every failure before the first slot write leaves
/// the image untouched. A failure between slot writes is surfaced with a
/// "patch may be incomplete" context, because there is no rollback.
pub fn apply_patch(image: &mut [u8], req: &PatchRequest) -> anyhow::Result<PatchReport> {
    // Reject unsupported targets before touching anything.
    let timings = mode_timings(req.width, req.height).ok_or(PatchError::UnsupportedResolution {
        width: req.width,
        height: req.height,
    })?;

    let config_block = find_config_block(image)?;
    let version = read_version(image, config_block);
    let mode_table = find_mode_table(image)?;
    let params = resolve_mode_params(image, mode_table, req.mode)?;

    let layout = match req.layout_override {
        Some(kind) => kind,
        None => classify_layout(image, params)?,
    };

    let mut written = 0usize;
    for rate in RefreshRate::ALL {
        write_timings(image, params, layout, rate, &timings.per_rate[rate.slot()]).map_err(
            |err| {
                if written > 0 {
                    anyhow::Error::new(err)
                        .context("patch may be incomplete: earlier refresh slots were written")
                } else {
                    anyhow::Error::new(err)
                }
            },
        )?;
        written += 1;
    }

    Ok(PatchReport {
        config_block,
        version,
        mode_table,
        params,
        layout,
    })
}

/// List the extended mode table records of `image` without writing anything.
pub fn list_image_modes(image: &[u8]) -> Result<Vec<image::ModeRecord>> {
    let table = find_mode_table(image)?;
    image::list_modes(image, table)
}

/// Validate that a dump file has the exact shadowed-window size.
pub fn check_image_len(len: usize) -> anyhow::Result<()> {
    if len != constants::IMAGE_SIZE {
        anyhow::bail!(
            "image is {len} bytes, expected a {} byte VBIOS dump",
            constants::IMAGE_SIZE
        );
    }
    Ok(())
}
