use thiserror::Error;

pub type Result<T> = std::result::Result<T, PatchError>;

/// Unified error type for VBIOS patch operations.
///
/// Every variant is terminal for the session: there is no retry policy and no
/// partial-success mode. All discovery failures occur before any byte is
/// written; only a fault between refresh-slot writes can leave the image
/// partially patched, and the caller is expected to surface that explicitly.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("{0} not found in VBIOS image; firmware not recognized")]
    StructureNotFound(&'static str),

    #[error("mode {0:#04x} not present in the extended mode table")]
    ModeNotFound(u8),

    #[error("unrecognized timing block layout (discriminator {discriminator:02x?}); refusing to guess")]
    LayoutUnknown { discriminator: [u8; 2] },

    #[error("no timing values known for {width}x{height}")]
    UnsupportedResolution { width: u32, height: u32 },

    #[error("unsupported chipset {0:#010x}")]
    UnsupportedChipset(u32),

    #[error("firmware region unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("structure out of bounds: offset={offset} len={len}")]
    OutOfBounds { offset: usize, len: usize },
}
