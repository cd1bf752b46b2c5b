#![forbid(unsafe_code)]

//! Browser frontend for the yorstory site.
//!
//! Implements the `yorstory-bridge` host traits with `web-sys` (WebGL 1, DOM,
//! `fetch`) and exports two JS entry points:
//!
//! - `wasmInit(options)`: acquire the canvas, load the site's guest module,
//!   wire its imports to the bridge, and run the animation loop.
//! - `startParallax(containerId, setsJson, options)`: the landing-page
//!   parallax carousel.
//!
//! Everything here is `wasm32`-only; the logic lives in `yorstory-bridge`
//! and is tested natively there.

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
mod fetch;
#[cfg(target_arch = "wasm32")]
mod guest;
#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
pub mod memory;
#[cfg(target_arch = "wasm32")]
mod parallax;
#[cfg(target_arch = "wasm32")]
mod wasm;
#[cfg(target_arch = "wasm32")]
mod webgl;

#[cfg(target_arch = "wasm32")]
pub use wasm::{start_parallax, wasm_init};
