use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use vbios_patch::layout::LayoutKind;
use vbios_patch::timing::mode_timings;
use vbios_patch::{apply_patch, check_image_len, list_image_modes, PatchReport, PatchRequest};

#[derive(Debug, Parser)]
#[command(name = "vbios_patch")]
#[command(about = "Patch i8xx (845G/855GM/865G) VBIOS timing tables for unsupported resolutions")]
struct Cli {
    /// Mode id to patch, hexadecimal (e.g. 38 or 0x38).
    mode: Option<String>,

    /// Target width in pixels.
    x: Option<u32>,

    /// Target height in pixels.
    y: Option<u32>,

    /// Force the timing-block layout (1-3) instead of inferring it.
    /// 0 means infer, matching the original tool.
    #[arg(value_name = "TYPE")]
    layout: Option<u8>,

    /// Patch a 64 KiB VBIOS dump file instead of the live shadowed image.
    #[arg(long)]
    image: Option<PathBuf>,

    /// List the extended mode table records and exit without writing.
    #[arg(long)]
    list: bool,
}

fn parse_mode(raw: &str) -> Result<u8> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u8::from_str_radix(digits, 16).with_context(|| format!("invalid hex mode id {raw:?}"))
}

fn print_report(report: &PatchReport) {
    println!(
        "VBIOS configuration area offset: {:#06x}",
        report.config_block
    );
    println!("VBIOS version: {}", report.version);
    println!("Extended mode table offset: {:#06x}", report.mode_table);
    println!("Timing parameter block: {:#06x}", report.params);
    println!("VBIOS type: {}", report.layout);
}

fn list_modes_from(image: &[u8]) -> Result<()> {
    let records = list_image_modes(image)?;
    for record in records {
        println!("mode {:#04x}: parameter block {:#06x}", record.mode_id, record.offset);
    }
    Ok(())
}

fn patch_file(path: &Path, req: &PatchRequest) -> Result<()> {
    let mut image = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    check_image_len(image.len())?;

    let report = apply_patch(&mut image, req)?;
    print_report(&report);

    write_atomic(path, &image).with_context(|| format!("write {}", path.display()))?;
    println!("Patch complete.");
    Ok(())
}

/// Replace `path` via a temp file in the same directory, so a fault never
/// leaves a half-written dump behind.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("vbios");
    let tmp_path = parent.join(format!(".{file_name}.vbios_patch.tmp"));

    std::fs::write(&tmp_path, data)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "rename temp file {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn patch_live(req: &PatchRequest) -> Result<()> {
    use vbios_patch::constants::{IMAGE_SIZE, VBIOS_BASE};
    use vbios_patch::pci::{Chipset, IoPrivilege, PamGuard};
    use vbios_patch::physmap::PhysMap;

    let io = IoPrivilege::acquire()?;
    let chipset = Chipset::detect(&io)?;
    println!("Chipset: {chipset}");

    let mut map = PhysMap::open(VBIOS_BASE, IMAGE_SIZE)?;
    // Relocks on every exit path below, error or not.
    let _pam = PamGuard::unlock(&io, chipset);

    let report = apply_patch(map.as_mut_slice(), req)?;
    print_report(&report);
    println!("Patch complete.");
    Ok(())
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn list_live() -> Result<()> {
    use vbios_patch::constants::{IMAGE_SIZE, VBIOS_BASE};
    use vbios_patch::physmap::PhysMap;

    let map = PhysMap::open(VBIOS_BASE, IMAGE_SIZE)?;
    list_modes_from(map.as_slice())
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
fn patch_live(_req: &PatchRequest) -> Result<()> {
    bail!("live VBIOS patching is only supported on x86_64 Linux; use --image on a dump file")
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
fn list_live() -> Result<()> {
    bail!("live VBIOS access is only supported on x86_64 Linux; use --image on a dump file")
}

fn run(cli: Cli) -> Result<()> {
    if cli.list {
        return match &cli.image {
            Some(path) => {
                let image =
                    std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
                check_image_len(image.len())?;
                list_modes_from(&image)
            }
            None => list_live(),
        };
    }

    let (Some(mode), Some(x), Some(y)) = (&cli.mode, cli.x, cli.y) else {
        bail!("usage: vbios_patch <MODE> <X> <Y> [TYPE] (or --list)");
    };

    let layout_override = match cli.layout {
        None | Some(0) => None,
        Some(value) => Some(
            LayoutKind::from_override(value)
                .with_context(|| format!("layout override must be 0-3, got {value}"))?,
        ),
    };

    let req = PatchRequest {
        mode: parse_mode(mode)?,
        width: x,
        height: y,
        layout_override,
    };

    // Refuse unsupported targets before acquiring any hardware access.
    if mode_timings(req.width, req.height).is_none() {
        bail!("no timing values known for {x}x{y}");
    }

    match &cli.image {
        Some(path) => patch_file(path, &req),
        None => patch_live(&req),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
