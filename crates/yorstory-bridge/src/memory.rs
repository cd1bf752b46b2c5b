#![forbid(unsafe_code)]

//! Marshalling strings and float arrays across the guest's linear memory.
//!
//! All addressing is `(ptr, len)` pairs handed over by the guest. The
//! [`GuestMemory`] primitive owns bounds checking; the helpers here only
//! encode and decode.

use crate::error::MemoryError;

/// Access to the guest module's linear memory.
///
/// On the web this is a `WebAssembly.Memory` whose buffer is re-read on every
/// access (the guest may grow it). Natively it is a plain byte vector.
pub trait GuestMemory {
    /// Zero-copy view of a run of `f32`s, handed straight to GL uploads.
    type F32View;

    /// Current size of the memory in bytes.
    fn size(&self) -> u32;

    /// Copy `len` bytes starting at `ptr`.
    fn read_bytes(&self, ptr: u32, len: u32) -> Result<Vec<u8>, MemoryError>;

    /// Overwrite memory at `ptr` with `bytes`.
    fn write_bytes(&self, ptr: u32, bytes: &[u8]) -> Result<(), MemoryError>;

    /// View `count` little-endian `f32`s at `ptr` without copying.
    ///
    /// The view aliases guest memory: the caller must consume it before the
    /// guest runs again.
    fn f32_view(&self, ptr: u32, count: u32) -> Result<Self::F32View, MemoryError>;
}

/// Validate that `[ptr, ptr + len)` lies within a memory of `size` bytes.
pub fn check_range(ptr: u32, len: u32, size: u32) -> Result<(), MemoryError> {
    match ptr.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(MemoryError::OutOfBounds { ptr, len, size }),
    }
}

/// Decode `len` bytes at `ptr` as UTF-8.
///
/// Invalid sequences are replaced rather than rejected: a bad pointer from the
/// guest produces garbage text, not a failed call.
pub fn read_string<M: GuestMemory + ?Sized>(
    memory: &M,
    ptr: u32,
    len: u32,
) -> Result<String, MemoryError> {
    let bytes = memory.read_bytes(ptr, len)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

/// Write `text` at `ptr` if its UTF-8 encoding fits in `max_len` bytes.
///
/// Returns the number of bytes written. Oversized text writes nothing and
/// returns 0; there are no partial writes.
pub fn write_string<M: GuestMemory + ?Sized>(
    memory: &M,
    ptr: u32,
    max_len: u32,
    text: &str,
) -> Result<u32, MemoryError> {
    let bytes = text.as_bytes();
    let Ok(len) = u32::try_from(bytes.len()) else {
        return Ok(0);
    };
    if len > max_len {
        return Ok(0);
    }
    memory.write_bytes(ptr, bytes)?;
    Ok(len)
}

/// Zero-copy `f32` view used as a GL buffer upload source.
pub fn read_f32_array<M: GuestMemory + ?Sized>(
    memory: &M,
    ptr: u32,
    count: u32,
) -> Result<M::F32View, MemoryError> {
    if ptr % 4 != 0 {
        return Err(MemoryError::Misaligned { ptr, align: 4 });
    }
    let byte_len = count
        .checked_mul(4)
        .ok_or(MemoryError::OutOfBounds {
            ptr,
            len: u32::MAX,
            size: memory.size(),
        })?;
    check_range(ptr, byte_len, memory.size())?;
    memory.f32_view(ptr, count)
}
