//! Per-worker bump arena.
//!
//! A bump allocator is the fastest possible allocator: it simply advances
//! an offset. Each [`Arena`] is exclusively owned by one worker, so the
//! offset is a plain `usize` rather than an atomic cursor, and memory is
//! only ever reclaimed in bulk through [`Arena::reset`].
//!
//! Allocations are addressed by typed [`Handle`]s (offset + generation)
//! instead of raw pointers. A handle minted before a `reset()` no longer
//! resolves, which turns use-after-reset into an error instead of a read
//! of recycled memory.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::platform::{sys, AllocFailed};

/// Source of process-unique arena ids, so handles cannot cross arenas.
static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The backing buffer could not be reserved from the OS.
    #[error("backing buffer of {bytes} bytes could not be reserved")]
    BackingAllocFailed {
        /// Requested capacity.
        bytes: usize,
    },
    /// The request, including alignment padding, does not fit.
    #[error("arena exhausted: requested {requested} bytes, remaining {remaining} bytes")]
    Exhausted {
        /// Bytes the request needed, padding included.
        requested: usize,
        /// Bytes left before the request.
        remaining: usize,
    },
    /// Alignment is not a power of two or is weaker than the type needs.
    #[error("invalid alignment {0}")]
    InvalidAlignment(usize),
    /// A handle minted before the last `reset()`.
    #[error("stale handle: generation {handle_generation}, current {current}")]
    StaleHandle {
        /// The generation encoded in the handle.
        handle_generation: u64,
        /// The arena's current generation.
        current: u64,
    },
    /// A handle minted by a different arena.
    #[error("handle belongs to another arena")]
    ForeignHandle,
    /// An arena must have room for at least one byte.
    #[error("arena capacity must be non-zero")]
    ZeroCapacity,
}

impl From<AllocFailed> for ArenaError {
    fn from(err: AllocFailed) -> Self {
        Self::BackingAllocFailed { bytes: err.bytes }
    }
}

/// Typed location of a value inside an [`Arena`].
///
/// Handles are `Copy` and carry no lifetime; they are validated every
/// time they are resolved.
#[must_use]
pub struct Handle<T> {
    arena_id: u64,
    generation: u64,
    offset: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Byte offset from the start of the arena buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Arena generation when this allocation was made.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena_id == other.arena_id
            && self.generation == other.generation
            && self.offset == other.offset
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle(arena={}, gen={}, off={})",
            self.arena_id, self.generation, self.offset
        )
    }
}

/// Usage snapshot of an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub capacity: usize,
    pub used: usize,
    pub generation: u64,
}

impl ArenaStats {
    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

/// Fixed-capacity, alignment-aware bump allocator over an OS-reserved buffer.
///
/// Invariant: `0 <= offset <= capacity`. Requests that would break it are
/// rejected, never truncated, and never write past the buffer.
pub struct Arena {
    /// Base of the buffer (page aligned, never changes after construction).
    base: NonNull<u8>,
    capacity: usize,
    /// Bytes handed out since the last reset, alignment padding included.
    offset: usize,
    generation: u64,
    id: u64,
}

impl Arena {
    /// Reserve an arena of `capacity` bytes.
    ///
    /// # Errors
    /// `ZeroCapacity` for an empty arena, `BackingAllocFailed` if the OS
    /// refuses the reservation.
    pub fn with_capacity(capacity: usize) -> Result<Self, ArenaError> {
        if capacity == 0 {
            return Err(ArenaError::ZeroCapacity);
        }
        let base = sys::alloc(capacity)?;
        Ok(Self {
            base,
            capacity,
            offset: 0,
            generation: 0,
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Place `value` at the natural alignment of `T`.
    #[inline]
    pub fn alloc<T: Copy>(&mut self, value: T) -> Result<Handle<T>, ArenaError> {
        self.alloc_aligned(value, align_of::<T>())
    }

    /// Place `value` at an address rounded up to `align`.
    ///
    /// `align` must be a power of two no weaker than `align_of::<T>()`.
    /// Only `T: Copy` is accepted: arena values are never dropped.
    pub fn alloc_aligned<T: Copy>(
        &mut self,
        value: T,
        align: usize,
    ) -> Result<Handle<T>, ArenaError> {
        if !align.is_power_of_two() || align < align_of::<T>() {
            return Err(ArenaError::InvalidAlignment(align));
        }

        let base = self.base.as_ptr() as usize;
        let current = base + self.offset;
        let start = current
            .checked_add(align - 1)
            .map(|addr| (addr & !(align - 1)) - base);
        let end = start.and_then(|start| start.checked_add(size_of::<T>()));

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) if end <= self.capacity => (start, end),
            _ => {
                let requested = end.map_or(usize::MAX, |end| end - self.offset);
                tracing::debug!(
                    requested,
                    align,
                    remaining = self.remaining(),
                    "arena exhausted"
                );
                return Err(ArenaError::Exhausted {
                    requested,
                    remaining: self.remaining(),
                });
            }
        };

        // Safety: `start..end` lies inside the buffer and `start` is aligned for T.
        unsafe {
            self.base.as_ptr().add(start).cast::<T>().write(value);
        }
        self.offset = end;

        Ok(Handle {
            arena_id: self.id,
            generation: self.generation,
            offset: start,
            _marker: PhantomData,
        })
    }

    /// Resolve a handle to a shared reference.
    pub fn get<T>(&self, handle: Handle<T>) -> Result<&T, ArenaError> {
        self.check(&handle)?;
        // Safety: `check` proved the handle was minted by this arena in the
        // current generation, so the slot holds an initialised, aligned T.
        Ok(unsafe { &*self.base.as_ptr().add(handle.offset).cast::<T>() })
    }

    /// Resolve a handle to a mutable reference.
    pub fn get_mut<T>(&mut self, handle: Handle<T>) -> Result<&mut T, ArenaError> {
        self.check(&handle)?;
        // Safety: as in `get`; `&mut self` guarantees exclusivity.
        Ok(unsafe { &mut *self.base.as_ptr().add(handle.offset).cast::<T>() })
    }

    /// Address a handle points at. Not validated and never dereferenced.
    #[inline]
    pub fn address_of<T>(&self, handle: Handle<T>) -> *const T {
        self.base.as_ptr().wrapping_add(handle.offset).cast::<T>()
    }

    /// Reset the bump offset to the start of the buffer.
    ///
    /// O(1). Buffer contents are left as they are; every outstanding handle
    /// becomes stale.
    #[inline]
    pub fn reset(&mut self) {
        self.offset = 0;
        self.generation += 1;
    }

    /// Returns the total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes currently allocated, padding included.
    #[inline]
    pub fn used(&self) -> usize {
        self.offset
    }

    /// Returns the number of bytes remaining.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            capacity: self.capacity,
            used: self.offset,
            generation: self.generation,
        }
    }

    fn check<T>(&self, handle: &Handle<T>) -> Result<(), ArenaError> {
        if handle.arena_id != self.id {
            return Err(ArenaError::ForeignHandle);
        }
        if handle.generation != self.generation {
            return Err(ArenaError::StaleHandle {
                handle_generation: handle.generation,
                current: self.generation,
            });
        }
        debug_assert!(handle.offset + size_of::<T>() <= self.offset);
        Ok(())
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // Safety: `base`/`capacity` came from `sys::alloc` and drop runs once.
        unsafe { sys::release(self.base, self.capacity) };
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("used", &self.offset)
            .field("generation", &self.generation)
            .finish()
    }
}

// Safety: Arena owns its buffer outright and is only reachable through
// `&mut self` for mutation, so moving it to another thread is sound.
// It is deliberately not Sync.
unsafe impl Send for Arena {}
