//! Chipset identification and PAM shadow-register control over port-mapped
//! PCI configuration space.
//!
//! The VBIOS shadow at 0xC0000 is write-protected by the host bridge's PAM
//! registers. Which register holds the enable bits differs per chipset
//! family, so chipset identity selects the unlock sequence; it has no
//! bearing on how the firmware image itself is interpreted.

use crate::constants::{CHIPSET_845G, CHIPSET_845G_ALT, CHIPSET_855GM, CHIPSET_865G};
use crate::error::{PatchError, Result};

const PCI_CONFIG_ADDRESS: u16 = 0xCF8;

/// Config-address dword for bus 0, device 0, function 0 (the host bridge),
/// dword 0 (vendor/device id).
const HOST_BRIDGE_ID: u32 = 0x8000_0000;

/// Config-address dword selecting the 845G/865G PAM register window; the
/// C0000 segment enables sit in the data-port bytes at 0xCFD and 0xCFE.
const PAM_WINDOW_845G_865G: u32 = 0x8000_0090;

/// Config-address dword selecting the 855GM PAM register window; the C0000
/// segment enables sit in the data-port byte at 0xCFE.
const PAM_WINDOW_855GM: u32 = 0x8000_005A;

/// PAM value enabling read and write access to the shadowed segment.
const PAM_READ_WRITE: u8 = 0x33;

/// Proof that the process holds I/O port access.
///
/// The port helpers below require a reference to this token; constructing it
/// is the only place `iopl` is called.
pub struct IoPrivilege(());

impl IoPrivilege {
    pub fn acquire() -> Result<Self> {
        // Safety: raising the I/O privilege level affects only this process.
        if unsafe { libc::iopl(3) } < 0 {
            return Err(PatchError::ResourceUnavailable(format!(
                "iopl(3): {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(Self(()))
    }
}

fn config_read32(_io: &IoPrivilege, address: u32) -> u32 {
    // Safety: the caller holds IoPrivilege, so port access cannot fault.
    unsafe {
        x86::io::outl(PCI_CONFIG_ADDRESS, address);
        x86::io::inl(PCI_CONFIG_ADDRESS + 4)
    }
}

fn config_read8(_io: &IoPrivilege, address: u32, byte: u16) -> u8 {
    unsafe {
        x86::io::outl(PCI_CONFIG_ADDRESS, address);
        x86::io::inb(PCI_CONFIG_ADDRESS + 4 + byte)
    }
}

fn config_write8(_io: &IoPrivilege, address: u32, byte: u16, value: u8) {
    unsafe {
        x86::io::outl(PCI_CONFIG_ADDRESS, address);
        x86::io::outb(PCI_CONFIG_ADDRESS + 4 + byte, value);
    }
}

/// The chipset families this tool knows how to unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chipset {
    I845G,
    I855GM,
    I865G,
}

impl Chipset {
    /// Identify the host bridge. Anything outside the verified set is
    /// refused before any unlock or write happens.
    pub fn detect(io: &IoPrivilege) -> Result<Self> {
        let id = config_read32(io, HOST_BRIDGE_ID);
        match id {
            CHIPSET_845G | CHIPSET_845G_ALT => Ok(Self::I845G),
            CHIPSET_855GM => Ok(Self::I855GM),
            CHIPSET_865G => Ok(Self::I865G),
            _ => Err(PatchError::UnsupportedChipset(id)),
        }
    }
}

impl std::fmt::Display for Chipset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I845G => write!(f, "845G"),
            Self::I855GM => write!(f, "855GM"),
            Self::I865G => write!(f, "865G"),
        }
    }
}

/// Scoped write access to the VBIOS shadow.
///
/// Construction snapshots the PAM bytes and rewrites them to read-write;
/// `Drop` restores the snapshot, so the pre-session state comes back on
/// every exit path, error paths included.
pub struct PamGuard<'a> {
    io: &'a IoPrivilege,
    chipset: Chipset,
    saved: [u8; 2],
}

impl<'a> PamGuard<'a> {
    pub fn unlock(io: &'a IoPrivilege, chipset: Chipset) -> Self {
        let saved = match chipset {
            Chipset::I845G | Chipset::I865G => {
                let saved = [
                    config_read8(io, PAM_WINDOW_845G_865G, 1),
                    config_read8(io, PAM_WINDOW_845G_865G, 2),
                ];
                config_write8(io, PAM_WINDOW_845G_865G, 1, PAM_READ_WRITE);
                config_write8(io, PAM_WINDOW_845G_865G, 2, PAM_READ_WRITE);
                saved
            }
            Chipset::I855GM => {
                let saved = [config_read8(io, PAM_WINDOW_855GM, 2), 0];
                config_write8(io, PAM_WINDOW_855GM, 2, PAM_READ_WRITE);
                saved
            }
        };
        tracing::debug!(%chipset, ?saved, "unlocked VBIOS shadow");
        Self { io, chipset, saved }
    }
}

impl Drop for PamGuard<'_> {
    fn drop(&mut self) {
        match self.chipset {
            Chipset::I845G | Chipset::I865G => {
                config_write8(self.io, PAM_WINDOW_845G_865G, 1, self.saved[0]);
                config_write8(self.io, PAM_WINDOW_845G_865G, 2, self.saved[1]);
            }
            Chipset::I855GM => {
                config_write8(self.io, PAM_WINDOW_855GM, 2, self.saved[0]);
            }
        }
        tracing::debug!(chipset = %self.chipset, "restored VBIOS shadow protection");
    }
}
