//! Reserve-then-commit virtual memory.
//!
//! A [`Reservation`] claims address space without backing it. Ranges are
//! made usable with [`Reservation::commit`] and handed back to the OS with
//! [`Reservation::release`]; the address space stays reserved until the
//! reservation is dropped. On wasm there is no address space to reserve, so
//! the whole block is allocated up front and commit/release are no-ops.

use std::ptr::NonNull;

use log::debug;

use crate::error::{PlatformError, PlatformResult};

pub struct Reservation {
    base: NonNull<u8>,
    size: usize,
}

impl Reservation {
    /// Reserves `size` bytes of address space, rounded up to whole pages.
    pub fn reserve(size: usize) -> PlatformResult<Self> {
        if size == 0 {
            return Err(PlatformError::VirtualMemory(
                "cannot reserve zero bytes".into(),
            ));
        }
        let size = round_up(size, sys::page_size());
        let base = sys::reserve(size).ok_or_else(|| {
            PlatformError::VirtualMemory(format!("failed to reserve {size} bytes"))
        })?;
        debug!("reserved {size} bytes at {base:p}");
        Ok(Self { base, size })
    }

    /// Makes `len` bytes starting at `offset` readable and writable.
    ///
    /// The range is widened to page boundaries.
    pub fn commit(&mut self, offset: usize, len: usize) -> PlatformResult<()> {
        let (start, len) = self.page_range(offset, len)?;
        // SAFETY: `page_range` keeps the range inside the reservation.
        if unsafe { sys::commit(self.base.as_ptr().add(start), len) } {
            Ok(())
        } else {
            Err(PlatformError::VirtualMemory(format!(
                "failed to commit {len} bytes at offset {start}"
            )))
        }
    }

    /// Returns the physical memory behind a range to the OS. The range stays
    /// reserved and reads back as zeroes once committed again.
    pub fn release(&mut self, offset: usize, len: usize) -> PlatformResult<()> {
        let (start, len) = self.page_range(offset, len)?;
        // SAFETY: see `commit`.
        if unsafe { sys::release(self.base.as_ptr().add(start), len) } {
            Ok(())
        } else {
            Err(PlatformError::VirtualMemory(format!(
                "failed to release {len} bytes at offset {start}"
            )))
        }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn page_size() -> usize {
        sys::page_size()
    }

    fn page_range(&self, offset: usize, len: usize) -> PlatformResult<(usize, usize)> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.size)
            .ok_or_else(|| {
                PlatformError::VirtualMemory(format!(
                    "range {offset}+{len} is outside the {} byte reservation",
                    self.size
                ))
            })?;
        let page = sys::page_size();
        let start = offset / page * page;
        let end = round_up(end, page).min(self.size);
        Ok((start, end - start))
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // SAFETY: `base` and `size` came from `sys::reserve`.
        unsafe { sys::free(self.base, self.size) };
    }
}

fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

#[cfg(unix)]
mod sys {
    use std::ptr::{self, NonNull};

    pub fn page_size() -> usize {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            4096
        }
    }

    pub fn reserve(size: usize) -> Option<NonNull<u8>> {
        // SAFETY: anonymous private mapping with no access rights.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            None
        } else {
            NonNull::new(base.cast())
        }
    }

    pub unsafe fn commit(start: *mut u8, len: usize) -> bool {
        libc::mprotect(start.cast(), len, libc::PROT_READ | libc::PROT_WRITE) == 0
    }

    pub unsafe fn release(start: *mut u8, len: usize) -> bool {
        libc::madvise(start.cast(), len, libc::MADV_DONTNEED) == 0
    }

    pub unsafe fn free(base: NonNull<u8>, size: usize) {
        libc::munmap(base.as_ptr().cast(), size);
    }
}

#[cfg(windows)]
mod sys {
    use std::ptr::{self, NonNull};

    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE,
        PAGE_NOACCESS, PAGE_READWRITE,
    };

    pub fn page_size() -> usize {
        4096
    }

    pub fn reserve(size: usize) -> Option<NonNull<u8>> {
        // SAFETY: a null address lets the OS pick the placement.
        let base = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
        NonNull::new(base.cast())
    }

    pub unsafe fn commit(start: *mut u8, len: usize) -> bool {
        !VirtualAlloc(start as *const _, len, MEM_COMMIT, PAGE_READWRITE).is_null()
    }

    pub unsafe fn release(start: *mut u8, len: usize) -> bool {
        VirtualFree(start.cast(), len, MEM_DECOMMIT) != 0
    }

    pub unsafe fn free(base: NonNull<u8>, _size: usize) {
        VirtualFree(base.as_ptr().cast(), 0, MEM_RELEASE);
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use std::alloc::{self, Layout};
    use std::ptr::NonNull;

    const PAGE: usize = 65536;

    pub fn page_size() -> usize {
        PAGE
    }

    pub fn reserve(size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, PAGE).ok()?;
        // SAFETY: `size` is non-zero.
        NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
    }

    pub unsafe fn commit(_start: *mut u8, _len: usize) -> bool {
        true
    }

    pub unsafe fn release(_start: *mut u8, _len: usize) -> bool {
        true
    }

    pub unsafe fn free(base: NonNull<u8>, size: usize) {
        if let Ok(layout) = Layout::from_size_align(size, PAGE) {
            alloc::dealloc(base.as_ptr(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_reservations_are_rejected() {
        assert!(Reservation::reserve(0).is_err());
    }

    #[test]
    fn committed_pages_are_writable() {
        let page = Reservation::page_size();
        let mut reservation = Reservation::reserve(page * 16).unwrap();
        assert_eq!(reservation.len(), page * 16);

        reservation.commit(page, page * 2).unwrap();
        // SAFETY: the second and third pages were committed above.
        unsafe {
            let ptr = reservation.as_ptr().add(page);
            ptr.write(7);
            ptr.add(page * 2 - 1).write(9);
            assert_eq!(ptr.read(), 7);
        }

        reservation.release(page, page * 2).unwrap();
    }

    #[test]
    fn sizes_round_up_to_pages() {
        let reservation = Reservation::reserve(1).unwrap();
        assert_eq!(reservation.len(), Reservation::page_size());
    }

    #[test]
    fn ranges_outside_the_reservation_fail() {
        let page = Reservation::page_size();
        let mut reservation = Reservation::reserve(page * 2).unwrap();
        assert!(reservation.commit(page, page * 2).is_err());
        assert!(reservation.release(usize::MAX, 2).is_err());
    }
}
