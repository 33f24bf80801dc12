//! Pluggable allocator hook, installed once at process startup.
//!
//! Unlike the sprite set and mixer (ordinary owned values, see `DESIGN.md`),
//! the allocator hook genuinely is process-wide state, mirroring the
//! reference engine's single injected `alloc`/`dealloc`/`realloc` triple.
//! It is an advisory install point, not a wired one: `Vec`/`vec!` inside this
//! crate always allocate through the ordinary global allocator (routing
//! every internal allocation through a `&dyn AllocHook` would need the
//! unstable `allocator_api`, which neither the teacher nor the rest of the
//! pack reaches for). A caller embedding this crate on a constrained target
//! is expected to consult `current_hook()` itself for any allocation it
//! wants to account against the same budget as `PixelSource`/`Image`/archive
//! buffers; the contract only promises the hook is set once before any
//! engine object is constructed, never reconfigured while frames are in
//! flight.

use core::alloc::Layout;
#[cfg(feature = "std")]
use std::sync::{Mutex, OnceLock};

/// A caller-supplied allocator. Mirrors the reference engine's single
/// `alloc(userdata, ptr, size) -> ptr` triple, split into three named
/// methods because that is how Rust's `core::alloc::GlobalAlloc` reads.
pub trait AllocHook: Send + Sync {
    /// # Safety
    /// `layout` must be non-zero-sized; the returned pointer (if non-null)
    /// must be valid for `layout` and freed with a matching call to `dealloc`.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8;

    /// # Safety
    /// `ptr` must have been returned by `alloc`/`realloc` on this hook with
    /// the same `layout`.
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout);

    /// # Safety
    /// `ptr` must have been returned by `alloc`/`realloc` on this hook with
    /// `old_layout`.
    unsafe fn realloc(&self, ptr: *mut u8, old_layout: Layout, new_size: usize) -> *mut u8;
}

/// Default hook, backed by the ordinary global Rust allocator.
struct SystemAlloc;

unsafe impl Send for SystemAlloc {}
unsafe impl Sync for SystemAlloc {}

impl AllocHook for SystemAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { alloc::alloc::alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { alloc::alloc::dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, old_layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { alloc::alloc::realloc(ptr, old_layout, new_size) }
    }
}

// The global singleton needs `std::sync::OnceLock`/`Mutex`; under `no_std`
// there is no process-wide install point; callers get the system allocator.
#[cfg(feature = "std")]
static GLOBAL_HOOK: OnceLock<Mutex<&'static dyn AllocHook>> = OnceLock::new();

#[cfg(feature = "std")]
fn slot() -> &'static Mutex<&'static dyn AllocHook> {
    GLOBAL_HOOK.get_or_init(|| Mutex::new(&SystemAlloc))
}

/// Installs a custom allocator hook. This crate's own buffers do not
/// consult it (see the module docs); it exists so an embedder can route its
/// *own* allocations through the same accounting as this crate's `Vec`-based
/// storage. Must be called before any engine value that allocates (archive,
/// images, sprites, sounds) is constructed; calling it again later has no
/// effect on buffers already allocated through the previous hook.
#[cfg(feature = "std")]
pub fn set_alloc_hook(hook: &'static dyn AllocHook) {
    *slot().lock().expect("alloc hook mutex poisoned") = hook;
}

/// Returns the currently installed hook, defaulting to the system allocator.
/// Advisory only — see the module docs.
#[cfg(feature = "std")]
pub fn current_hook() -> &'static dyn AllocHook {
    *slot().lock().expect("alloc hook mutex poisoned")
}

/// Returns the system allocator hook. Always available, even under
/// `no_std`, since it only needs `alloc`'s global allocator.
#[cfg(not(feature = "std"))]
pub fn current_hook() -> &'static dyn AllocHook {
    &SystemAlloc
}
