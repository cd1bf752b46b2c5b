#![forbid(unsafe_code)]

//! [`GuestMemory`] over a `WebAssembly.Memory`.
//!
//! The memory's `buffer` is detached whenever the guest grows it, so every
//! access fetches the current buffer instead of caching a view.

use js_sys::{ArrayBuffer, Float32Array, Uint8Array, WebAssembly};
use wasm_bindgen::{JsCast, JsValue};
use yorstory_bridge::MemoryError;
use yorstory_bridge::memory::{GuestMemory, check_range};

#[derive(Clone)]
pub struct WasmMemory {
    memory: WebAssembly::Memory,
}

impl WasmMemory {
    pub fn new(memory: WebAssembly::Memory) -> Self {
        Self { memory }
    }

    /// Create a memory of exactly `pages` 64 KiB pages for `env.memory`.
    /// The maximum is pinned to the initial size, so the memory cannot grow.
    pub fn with_pages(pages: u32) -> Result<Self, JsValue> {
        let descriptor = js_sys::Object::new();
        js_sys::Reflect::set(&descriptor, &"initial".into(), &pages.into())?;
        js_sys::Reflect::set(&descriptor, &"maximum".into(), &pages.into())?;
        Ok(Self::new(WebAssembly::Memory::new(&descriptor)?))
    }

    pub fn raw(&self) -> &WebAssembly::Memory {
        &self.memory
    }

    fn buffer(&self) -> ArrayBuffer {
        self.memory.buffer().unchecked_into()
    }
}

impl GuestMemory for WasmMemory {
    type F32View = Float32Array;

    fn size(&self) -> u32 {
        self.buffer().byte_length()
    }

    fn read_bytes(&self, ptr: u32, len: u32) -> Result<Vec<u8>, MemoryError> {
        let buffer = self.buffer();
        check_range(ptr, len, buffer.byte_length())?;
        Ok(Uint8Array::new_with_byte_offset_and_length(&buffer, ptr, len).to_vec())
    }

    fn write_bytes(&self, ptr: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        let buffer = self.buffer();
        let len = u32::try_from(bytes.len()).map_err(|_| MemoryError::OutOfBounds {
            ptr,
            len: u32::MAX,
            size: buffer.byte_length(),
        })?;
        check_range(ptr, len, buffer.byte_length())?;
        Uint8Array::new_with_byte_offset_and_length(&buffer, ptr, len).copy_from(bytes);
        Ok(())
    }

    fn f32_view(&self, ptr: u32, count: u32) -> Result<Float32Array, MemoryError> {
        // Float32Array throws on an unaligned offset.
        if ptr % 4 != 0 {
            return Err(MemoryError::Misaligned { ptr, align: 4 });
        }
        let buffer = self.buffer();
        check_range(ptr, count.saturating_mul(4), buffer.byte_length())?;
        Ok(Float32Array::new_with_byte_offset_and_length(
            &buffer, ptr, count,
        ))
    }
}
