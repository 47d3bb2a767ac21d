//! Platform-specific backing storage for arenas.
//!
//! Each arena reserves its buffer straight from the operating system so the
//! region is page aligned (and therefore cache-line aligned) without any
//! over-allocation:
//! - **Linux**: `mmap` / `munmap` via `rustix`
//! - **macOS**: `mach_vm_allocate` / `mach_vm_deallocate` via `mach2`
//! - **Other Unix**: `mmap` / `munmap` via `libc`
//! - **Everything else**: the process allocator with a 64-byte layout

use thiserror::Error;

/// Error type for system memory allocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("system memory allocation of {bytes} bytes failed")]
pub struct AllocFailed {
    /// Size of the rejected request.
    pub bytes: usize,
}

/// Platform-specific memory allocation functions.
pub mod sys {
    use super::AllocFailed;
    use std::ptr::NonNull;

    /// Reserve `size` bytes of read/write memory from the OS.
    ///
    /// The memory is:
    /// - Read/Write accessible
    /// - Not backed by physical pages until touched (on most OSes)
    /// - Aligned to at least the system page size
    #[cfg(target_os = "linux")]
    #[inline]
    pub fn alloc(size: usize) -> Result<NonNull<u8>, AllocFailed> {
        use rustix::mm::{mmap_anonymous, MapFlags, ProtFlags};
        use std::ptr;

        debug_assert!(size > 0);

        let mapped = unsafe {
            mmap_anonymous(
                ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE | MapFlags::NORESERVE,
            )
        };
        match mapped {
            Ok(ptr) => NonNull::new(ptr as *mut u8).ok_or(AllocFailed { bytes: size }),
            Err(_) => Err(AllocFailed { bytes: size }),
        }
    }

    /// Return a region obtained from [`alloc`] to the OS.
    ///
    /// # Safety
    /// `ptr` and `size` must describe a live region returned by [`alloc`],
    /// and the region must not be used afterwards.
    #[cfg(target_os = "linux")]
    #[inline]
    pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
        // munmap only fails for ranges we never mapped.
        let _ = rustix::mm::munmap(ptr.as_ptr().cast(), size);
    }

    #[cfg(target_vendor = "apple")]
    #[inline]
    pub fn alloc(size: usize) -> Result<NonNull<u8>, AllocFailed> {
        use mach2::kern_return::KERN_SUCCESS;
        use mach2::traps::mach_task_self;
        use mach2::vm::mach_vm_allocate;
        use mach2::vm_statistics::VM_FLAGS_ANYWHERE;
        use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

        debug_assert!(size > 0);

        let task = unsafe { mach_task_self() };
        let mut address: mach_vm_address_t = 0;
        let vm_size: mach_vm_size_t = size as mach_vm_size_t;

        let retval = unsafe { mach_vm_allocate(task, &mut address, vm_size, VM_FLAGS_ANYWHERE) };

        if retval == KERN_SUCCESS {
            NonNull::new(address as *mut u8).ok_or(AllocFailed { bytes: size })
        } else {
            Err(AllocFailed { bytes: size })
        }
    }

    #[cfg(target_vendor = "apple")]
    #[inline]
    pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
        use mach2::traps::mach_task_self;
        use mach2::vm::mach_vm_deallocate;
        use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

        let _ = mach_vm_deallocate(
            mach_task_self(),
            ptr.as_ptr() as mach_vm_address_t,
            size as mach_vm_size_t,
        );
    }

    /// Fallback for other Unix-like systems.
    #[cfg(all(not(target_os = "linux"), not(target_vendor = "apple"), unix))]
    #[inline]
    pub fn alloc(size: usize) -> Result<NonNull<u8>, AllocFailed> {
        use libc::{mmap, MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
        use std::ptr;

        debug_assert!(size > 0);

        let ptr = unsafe {
            mmap(
                ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            )
        };

        if ptr == MAP_FAILED {
            Err(AllocFailed { bytes: size })
        } else {
            NonNull::new(ptr as *mut u8).ok_or(AllocFailed { bytes: size })
        }
    }

    #[cfg(all(not(target_os = "linux"), not(target_vendor = "apple"), unix))]
    #[inline]
    pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
        let _ = libc::munmap(ptr.as_ptr().cast(), size);
    }

    /// Non-Unix targets borrow from the process allocator instead.
    #[cfg(not(unix))]
    #[inline]
    pub fn alloc(size: usize) -> Result<NonNull<u8>, AllocFailed> {
        use std::alloc::{alloc, Layout};

        let layout = Layout::from_size_align(size, crate::config::CACHE_LINE_ALIGN)
            .map_err(|_| AllocFailed { bytes: size })?;
        NonNull::new(unsafe { alloc(layout) }).ok_or(AllocFailed { bytes: size })
    }

    #[cfg(not(unix))]
    #[inline]
    pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
        use std::alloc::{dealloc, Layout};

        if let Ok(layout) = Layout::from_size_align(size, crate::config::CACHE_LINE_ALIGN) {
            dealloc(ptr.as_ptr(), layout);
        }
    }
}
