#![forbid(unsafe_code)]

//! The bridge context: every piece of mutable host state in one place.
//!
//! One [`Bridge`] is built per page once the GL context exists. The web
//! frontend keeps it behind `Rc<RefCell<..>>`, services guest imports through
//! [`Bridge::call_import`](crate::imports), and drains [`HostEffect`]s (network
//! work the bridge cannot do itself) after every call into the guest.
//!
//! The bridge never calls into the guest. Anything the guest must be told
//! (a texture became ready) is returned to the caller, which makes the call
//! once its borrow of the bridge has ended: the guest re-enters the bridge
//! through imports.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, MemoryError};
use crate::gl::{GlContext, GlForwarder, consts, is_power_of_two};
use crate::memory::{self, GuestMemory};
use crate::overlay::{OverlayRenderer, OverlaySurface};
use crate::texture::{
    ChunkMark, ImageArrival, ImageRequest, MetadataRequest, TextureMetadata, TextureReady,
    TextureStreamer,
};

/// Work the bridge asks the host to perform asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEffect {
    /// Fetch texture metadata JSON and report it via
    /// [`Bridge::texture_metadata_loaded`].
    FetchMetadata(MetadataRequest),
    /// Fetch and decode an image and report it via
    /// [`Bridge::texture_image_loaded`].
    FetchImage(ImageRequest),
    /// Change the canvas cursor.
    SetCursor(CursorKind),
}

/// Cursor shapes the guest can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Default,
    Pointer,
}

impl CursorKind {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Pointer,
            _ => Self::Default,
        }
    }

    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pointer => "pointer",
        }
    }
}

/// Host-side state shared by all guest imports.
pub struct Bridge<G: GlContext, M, O> {
    pub(crate) gl: GlForwarder<G>,
    pub(crate) memory: Option<M>,
    pub(crate) overlays: OverlayRenderer<O>,
    pub(crate) textures: TextureStreamer<G::Image>,
    effects: Vec<HostEffect>,
    page_path: String,
}

impl<G, M, O> Bridge<G, M, O>
where
    G: GlContext,
    M: GuestMemory<F32View = G::F32Data>,
    O: OverlaySurface,
{
    pub fn new(gl: G, overlay_surface: O, config: &BridgeConfig) -> Self {
        Self {
            gl: GlForwarder::new(gl),
            memory: None,
            overlays: OverlayRenderer::new(
                overlay_surface,
                &config.text_class,
                &config.embed_class,
                config.left_gap_ratio,
            ),
            textures: TextureStreamer::new(config),
            effects: Vec::new(),
            page_path: String::new(),
        }
    }

    /// Make the guest's linear memory available to imports.
    pub fn attach_memory(&mut self, memory: M) {
        self.memory = Some(memory);
    }

    pub fn memory(&self) -> Result<&M, MemoryError> {
        self.memory.as_ref().ok_or(MemoryError::NotAttached)
    }

    pub fn forwarder(&self) -> &GlForwarder<G> {
        &self.gl
    }

    pub fn overlays(&self) -> &OverlayRenderer<O> {
        &self.overlays
    }

    /// Path reported to the guest by `getUri`.
    pub fn set_page_path(&mut self, path: &str) {
        path.clone_into(&mut self.page_path);
    }

    pub fn page_path(&self) -> &str {
        &self.page_path
    }

    /// Drain queued host effects in the order they were raised.
    pub fn take_effects(&mut self) -> Vec<HostEffect> {
        std::mem::take(&mut self.effects)
    }

    pub(crate) fn push_effect(&mut self, effect: HostEffect) {
        self.effects.push(effect);
    }

    pub fn read_string(&self, ptr: u32, len: u32) -> Result<String, BridgeError> {
        Ok(memory::read_string(self.memory()?, ptr, len)?)
    }

    pub fn write_string(&self, ptr: u32, max_len: u32, text: &str) -> Result<u32, BridgeError> {
        Ok(memory::write_string(self.memory()?, ptr, max_len, text)?)
    }

    /// Reset the viewport after the canvas was resized.
    pub fn resize_viewport(&self, width: u32, height: u32) {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        self.gl.gl().viewport(0, 0, w, h);
    }

    /// Allocate a texture, give it a placeholder, and start streaming `path`
    /// into it. Returns the handle immediately.
    pub fn create_and_load_texture(
        &mut self,
        path: &str,
        wrap: i32,
        filter: i32,
    ) -> Result<u32, BridgeError> {
        let texture = self.gl.create_placeholder_texture()?;
        let request = self.textures.begin(texture, path, wrap, filter);
        tracing::debug!(texture, url = %request.url, "texture metadata requested");
        self.push_effect(HostEffect::FetchMetadata(request));
        Ok(texture)
    }

    /// Allocate a texture and load `url` into it as one image, no metadata.
    pub fn create_texture_from_url(&mut self, url: &str, wrap: i32) -> Result<u32, BridgeError> {
        let texture = self.gl.create_placeholder_texture()?;
        let request = self.textures.begin_legacy(texture, url, wrap);
        self.push_effect(HostEffect::FetchImage(request));
        Ok(texture)
    }

    /// Metadata for `texture` arrived: size its storage and request pixels.
    ///
    /// A misaligned chunk size abandons the load; the texture keeps its
    /// placeholder forever.
    pub fn texture_metadata_loaded(
        &mut self,
        texture: u32,
        meta: TextureMetadata,
    ) -> Result<(), BridgeError> {
        let planned = self.textures.on_metadata(texture, meta)?;
        let width = i32::try_from(planned.width).unwrap_or(i32::MAX);
        let height = i32::try_from(planned.height).unwrap_or(i32::MAX);

        self.gl
            .configure_texture(texture, planned.wrap, planned.filter)?;
        self.gl
            .gl()
            .tex_image_2d_pixels(consts::TEXTURE_2D, width, height, None);

        for fetch in planned.fetches {
            self.push_effect(HostEffect::FetchImage(fetch));
        }
        Ok(())
    }

    /// A fetch for `texture` failed; the texture stays incomplete.
    pub fn texture_load_failed(&mut self, texture: u32, reason: &str) {
        self.textures.abandon(texture, reason);
    }

    /// A decoded image for `texture` arrived.
    ///
    /// Whole images are uploaded immediately and return the ready
    /// notification; chunks are queued for [`pump_texture_job`](Self::pump_texture_job).
    pub fn texture_image_loaded(
        &mut self,
        texture: u32,
        chunk: Option<u32>,
        image: G::Image,
        image_width: u32,
        image_height: u32,
    ) -> Result<Option<TextureReady>, BridgeError> {
        match self
            .textures
            .on_image(texture, chunk, image, image_width, image_height)?
        {
            ImageArrival::Direct { image, ready } => {
                let native = self.gl.texture(texture)?;
                self.gl.gl().bind_texture(consts::TEXTURE_2D, Some(native));
                self.gl
                    .gl()
                    .tex_sub_image_2d_image(consts::TEXTURE_2D, 0, 0, &image);
                self.finish_texture(ready)?;
                Ok(Some(ready))
            }
            ImageArrival::Legacy { image, wrap, ready } => {
                let native = self.gl.texture(texture)?;
                let gl = self.gl.gl();
                gl.bind_texture(consts::TEXTURE_2D, Some(native));
                gl.tex_image_2d_image(consts::TEXTURE_2D, &image);
                if is_power_of_two(ready.width) && is_power_of_two(ready.height) {
                    gl.generate_mipmap(consts::TEXTURE_2D);
                } else {
                    let linear = consts::LINEAR as i32;
                    gl.tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_WRAP_S, wrap);
                    gl.tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_WRAP_T, wrap);
                    gl.tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_MIN_FILTER, linear);
                    gl.tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_MAG_FILTER, linear);
                }
                Ok(Some(ready))
            }
            ImageArrival::Queued { queued } => {
                tracing::trace!(texture, chunk = ?chunk, queued, "texture chunk queued");
                Ok(None)
            }
        }
    }

    /// Upload at most one queued chunk.
    ///
    /// Returns the ready notification when that chunk was the texture's last.
    pub fn pump_texture_job(&mut self) -> Result<Option<TextureReady>, BridgeError> {
        let Some(job) = self.textures.pop_job() else {
            return Ok(None);
        };
        let native = self.gl.texture(job.texture)?;
        let y = job.destination_y();
        self.gl.gl().bind_texture(consts::TEXTURE_2D, Some(native));
        self.gl
            .gl()
            .tex_sub_image_2d_image(consts::TEXTURE_2D, 0, y, &job.image);

        match job.complete() {
            ChunkMark::Completed => {
                let ready = TextureReady {
                    texture: job.texture,
                    width: job.width,
                    height: job.height,
                };
                self.textures.finish(job.texture);
                self.finish_texture(ready)?;
                Ok(Some(ready))
            }
            ChunkMark::Pending { remaining } => {
                tracing::trace!(texture = job.texture, index = job.index, remaining, "chunk uploaded");
                Ok(None)
            }
            ChunkMark::Ignored => {
                tracing::warn!(texture = job.texture, index = job.index, "duplicate chunk ignored");
                Ok(None)
            }
        }
    }

    #[must_use]
    pub fn queued_texture_jobs(&self) -> usize {
        self.textures.queued()
    }

    fn finish_texture(&self, ready: TextureReady) -> Result<(), BridgeError> {
        if is_power_of_two(ready.width) && is_power_of_two(ready.height) {
            let native = self.gl.texture(ready.texture)?;
            self.gl.gl().bind_texture(consts::TEXTURE_2D, Some(native));
            self.gl.gl().generate_mipmap(consts::TEXTURE_2D);
        }
        tracing::debug!(
            texture = ready.texture,
            width = ready.width,
            height = ready.height,
            "texture ready"
        );
        Ok(())
    }
}
