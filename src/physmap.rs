//! Mapping of the shadowed VBIOS window out of `/dev/mem`.
//!
//! The mapping is the session's view of the firmware: it exists only while
//! the [`PhysMap`] is alive and is torn down on every exit path via `Drop`.

use std::os::fd::RawFd;

use crate::error::{PatchError, Result};

/// A read-write mapping of a physical memory range.
pub struct PhysMap {
    ptr: *mut u8,
    len: usize,
    fd: RawFd,
}

impl PhysMap {
    /// Map `len` bytes of physical memory starting at `base`.
    ///
    /// Requires a kernel that still exposes legacy ranges through
    /// `/dev/mem` (the VBIOS shadow at 0xC0000 is below the usual
    /// `CONFIG_STRICT_DEVMEM` cutoff).
    pub fn open(base: usize, len: usize) -> Result<Self> {
        let fd = unsafe { libc::open(c"/dev/mem".as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            return Err(PatchError::ResourceUnavailable(format!(
                "open /dev/mem: {}",
                std::io::Error::last_os_error()
            )));
        }

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                base as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(PatchError::ResourceUnavailable(format!(
                "mmap {len:#x} bytes at {base:#x}: {err}"
            )));
        }

        Ok(Self {
            ptr: ptr.cast(),
            len,
            fd,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        // Safety: ptr/len describe a live MAP_SHARED mapping owned by self.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: as above, and &mut self guarantees exclusive access
        // within this process.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for PhysMap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.cast(), self.len);
            libc::close(self.fd);
        }
    }
}
