//! FFI type definitions for component rendering.
//!
//! This module defines the function pointer types exported by the generated
//! shim, the status codes the render entry returns, and an RAII guard for
//! the buffers it hands back.

/// Status code returned by the render entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RenderStatus {
    /// Component rendered; the buffer holds its markup
    Success = 0,
    /// Unrecognized failure code
    ComponentError = -2,
    /// Component panicked; the buffer holds the panic message
    Panic = -4,
}

impl From<i32> for RenderStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Success,
            -4 => Self::Panic,
            _ => Self::ComponentError,
        }
    }
}

/// Render entry: writes an owned buffer to `(out_ptr, out_len)` and returns a
/// [`RenderStatus`] code.
pub type RenderFn = unsafe extern "C" fn(*mut *mut u8, *mut usize) -> i32;

/// Deallocator for buffers produced by [`RenderFn`].
pub type FreeFn = unsafe extern "C" fn(*mut u8, usize);

/// RAII guard for a buffer allocated inside the component library.
///
/// The buffer is returned to the library's own allocator through its
/// exported free function, even if processing the bytes panics.
pub(crate) struct FfiBuffer {
    ptr: *mut u8,
    len: usize,
    free: FreeFn,
}

impl FfiBuffer {
    /// # Safety
    /// `ptr`/`len` must come from the render entry of the library that
    /// exported `free`, and that library must outlive the guard.
    pub(crate) unsafe fn new(ptr: *mut u8, len: usize, free: FreeFn) -> Self {
        Self { ptr, len, free }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        if self.ptr.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }
}

impl Drop for FfiBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                (self.free)(self.ptr, self.len);
            }
        }
    }
}
