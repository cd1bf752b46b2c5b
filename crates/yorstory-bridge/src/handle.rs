#![forbid(unsafe_code)]

//! Append-only tables mapping small integer handles to native GPU objects.
//!
//! The guest never sees a GL object, only the index it was stored at. Tables
//! only grow: resources live as long as the GL context, so a handle stays
//! valid for the whole page session and is never handed out twice.

use core::fmt;

use crate::error::BridgeError;

/// What a table stores; used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Shader,
    Program,
    Buffer,
    Framebuffer,
    Renderbuffer,
    Texture,
    UniformLocation,
}

impl HandleKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shader => "shader",
            Self::Program => "program",
            Self::Buffer => "buffer",
            Self::Framebuffer => "framebuffer",
            Self::Renderbuffer => "renderbuffer",
            Self::Texture => "texture",
            Self::UniformLocation => "uniform location",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only `handle -> T` table.
#[derive(Debug, Clone)]
pub struct HandleTable<T> {
    kind: HandleKind,
    items: Vec<T>,
}

impl<T> HandleTable<T> {
    #[must_use]
    pub const fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    /// Store `item` and return its handle.
    ///
    /// Fails with [`BridgeError::CreateFailed`] once the handle space is
    /// exhausted; `item` is dropped and no handle is handed out twice.
    pub fn allocate(&mut self, item: T) -> Result<u32, BridgeError> {
        let handle = next_handle(self.kind, self.items.len())?;
        self.items.push(item);
        Ok(handle)
    }

    /// Look up a handle previously returned by [`allocate`](Self::allocate).
    pub fn resolve(&self, handle: u32) -> Result<&T, BridgeError> {
        self.items
            .get(handle as usize)
            .ok_or(BridgeError::InvalidHandle {
                kind: self.kind,
                handle,
            })
    }

    /// Resolve a bind-style handle: negative means "bind nothing".
    pub fn resolve_optional(&self, handle: i32) -> Result<Option<&T>, BridgeError> {
        match u32::try_from(handle) {
            Ok(handle) => self.resolve(handle).map(Some),
            Err(_) => Ok(None),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Handle for the entry stored after `len` existing ones.
fn next_handle(kind: HandleKind, len: usize) -> Result<u32, BridgeError> {
    u32::try_from(len).map_err(|_| BridgeError::CreateFailed(kind))
}
