#![forbid(unsafe_code)]

//! Host side of the yorstory site's WebAssembly guest.
//!
//! The guest renders the page with WebGL but owns no browser objects. Every
//! GPU object, DOM node and network request lives here, behind integer
//! handles and `(ptr, len)` views into the guest's memory. This crate holds
//! the platform-independent part: it talks to the browser only through the
//! [`GlContext`], [`GuestMemory`], [`OverlaySurface`], [`FrameHost`] and
//! [`GuestExports`] traits, so everything is testable natively.
//! `yorstory-web` supplies the `web-sys` implementations.

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod gl;
pub mod handle;
pub mod imports;
pub mod memory;
pub mod overlay;
pub mod parallax;
pub mod preload;
pub mod texture;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use bridge::{Bridge, CursorKind, HostEffect};
pub use config::{BridgeConfig, ParallaxConfig};
pub use error::{BridgeError, ConfigError, MemoryError};
pub use frame::{DriverState, FrameDriver, FrameHost, FrameReport, GuestExports, InputEvent};
pub use gl::{GlContext, GlForwarder};
pub use handle::{HandleKind, HandleTable};
pub use imports::ImportId;
pub use memory::GuestMemory;
pub use overlay::{OverlayRenderer, OverlaySurface};
pub use texture::{TextureMetadata, TextureReady, TextureStreamer};
