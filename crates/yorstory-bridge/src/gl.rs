#![forbid(unsafe_code)]

//! The GL surface the guest may drive, and the handle translation around it.
//!
//! [`GlContext`] enumerates every native call the bridge forwards. Calls that
//! take or return GPU objects go through [`GlForwarder`], which keeps the
//! objects in [`HandleTable`]s and only ever shows the guest their index.

use crate::error::BridgeError;
use crate::handle::{HandleKind, HandleTable};

/// WebGL 1 enum values used by the bridge itself.
pub mod consts {
    pub const TEXTURE_2D: u32 = 0x0DE1;
    pub const TEXTURE_MAG_FILTER: u32 = 0x2800;
    pub const TEXTURE_MIN_FILTER: u32 = 0x2801;
    pub const TEXTURE_WRAP_S: u32 = 0x2802;
    pub const TEXTURE_WRAP_T: u32 = 0x2803;
    pub const LINEAR: u32 = 0x2601;
    pub const UNPACK_FLIP_Y_WEBGL: u32 = 0x9240;
    pub const FRAGMENT_SHADER: u32 = 0x8B30;
    pub const VERTEX_SHADER: u32 = 0x8B31;
    pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;
}

/// Native GL entry points reachable from the guest.
///
/// Mirrors the WebGL 1 API one method per call. Object-creating calls return
/// `None` when the context is lost.
pub trait GlContext {
    type Shader;
    type Program;
    type Buffer;
    type Framebuffer;
    type Renderbuffer;
    type Texture;
    type UniformLocation;
    /// Float upload source, matching [`GuestMemory::F32View`](crate::memory::GuestMemory::F32View).
    type F32Data;
    /// A decoded browser image.
    type Image;

    // Plain forwards.
    fn active_texture(&self, texture: u32);
    fn blend_func(&self, sfactor: u32, dfactor: u32);
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn clear(&self, mask: u32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&self, depth: f32);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn cull_face(&self, mode: u32);
    fn depth_func(&self, func: u32);
    fn depth_mask(&self, flag: bool);
    fn disable(&self, cap: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32);
    fn enable(&self, cap: u32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn front_face(&self, mode: u32);
    fn generate_mipmap(&self, target: u32);
    fn line_width(&self, width: f32);
    fn pixel_storei(&self, pname: u32, param: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn tex_parameteri(&self, target: u32, pname: u32, param: i32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn check_framebuffer_status(&self, target: u32) -> u32;
    fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32);

    // Object lifetime.
    fn create_buffer(&self) -> Option<Self::Buffer>;
    fn create_framebuffer(&self) -> Option<Self::Framebuffer>;
    fn create_renderbuffer(&self) -> Option<Self::Renderbuffer>;
    fn create_texture(&self) -> Option<Self::Texture>;
    fn create_shader(&self, ty: u32) -> Option<Self::Shader>;
    fn create_program(&self) -> Option<Self::Program>;

    // Shaders and programs.
    fn shader_source(&self, shader: &Self::Shader, source: &str);
    fn compile_shader(&self, shader: &Self::Shader);
    fn shader_compiled(&self, shader: &Self::Shader) -> bool;
    fn shader_info_log(&self, shader: &Self::Shader) -> Option<String>;
    fn attach_shader(&self, program: &Self::Program, shader: &Self::Shader);
    fn link_program(&self, program: &Self::Program);
    fn program_linked(&self, program: &Self::Program) -> bool;
    fn program_info_log(&self, program: &Self::Program) -> Option<String>;
    fn use_program(&self, program: Option<&Self::Program>);
    fn get_attrib_location(&self, program: &Self::Program, name: &str) -> i32;
    fn get_uniform_location(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;

    // Binding.
    fn bind_buffer(&self, target: u32, buffer: Option<&Self::Buffer>);
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<&Self::Framebuffer>);
    fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<&Self::Renderbuffer>);
    fn bind_texture(&self, target: u32, texture: Option<&Self::Texture>);
    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<&Self::Texture>,
        level: i32,
    );
    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<&Self::Renderbuffer>,
    );

    // Data upload.
    fn buffer_data_f32(&self, target: u32, data: &Self::F32Data, usage: u32);
    fn uniform1i(&self, location: Option<&Self::UniformLocation>, x: i32);
    fn uniform1f(&self, location: Option<&Self::UniformLocation>, x: f32);
    fn uniform1fv(&self, location: Option<&Self::UniformLocation>, data: &Self::F32Data);
    fn uniform2fv(&self, location: Option<&Self::UniformLocation>, v: [f32; 2]);
    fn uniform3fv(&self, location: Option<&Self::UniformLocation>, v: [f32; 3]);
    fn uniform4fv(&self, location: Option<&Self::UniformLocation>, v: [f32; 4]);
    fn uniform_matrix4fv(
        &self,
        location: Option<&Self::UniformLocation>,
        transpose: bool,
        data: &Self::F32Data,
    );

    // Texture storage.
    /// `texImage2D` with explicit RGBA8 pixels (or uninitialised storage for `None`).
    fn tex_image_2d_pixels(&self, target: u32, width: i32, height: i32, pixels: Option<&[u8]>);
    /// `texImage2D` from a decoded image, sizing storage to the image.
    fn tex_image_2d_image(&self, target: u32, image: &Self::Image);
    /// `texSubImage2D` from a decoded image at `(x, y)`.
    fn tex_sub_image_2d_image(&self, target: u32, x: i32, y: i32, image: &Self::Image);
}

/// One transparent RGBA8 pixel, used as the placeholder before a load lands.
pub const TRANSPARENT_PIXEL: [u8; 4] = [0, 0, 0, 0];

/// Owns the GL context and every object the guest has a handle to.
pub struct GlForwarder<G: GlContext> {
    gl: G,
    shaders: HandleTable<G::Shader>,
    programs: HandleTable<G::Program>,
    buffers: HandleTable<G::Buffer>,
    framebuffers: HandleTable<G::Framebuffer>,
    renderbuffers: HandleTable<G::Renderbuffer>,
    textures: HandleTable<G::Texture>,
    uniform_locations: HandleTable<Option<G::UniformLocation>>,
}

impl<G: GlContext> GlForwarder<G> {
    /// Wrap a live context. The import surface only exists once this is built.
    pub fn new(gl: G) -> Self {
        Self {
            gl,
            shaders: HandleTable::new(HandleKind::Shader),
            programs: HandleTable::new(HandleKind::Program),
            buffers: HandleTable::new(HandleKind::Buffer),
            framebuffers: HandleTable::new(HandleKind::Framebuffer),
            renderbuffers: HandleTable::new(HandleKind::Renderbuffer),
            textures: HandleTable::new(HandleKind::Texture),
            uniform_locations: HandleTable::new(HandleKind::UniformLocation),
        }
    }

    /// The native context, for plain forwards.
    pub fn gl(&self) -> &G {
        &self.gl
    }

    /// Compile `source` as a shader of type `ty`; a failed compile is fatal.
    pub fn compile_shader(&mut self, source: &str, ty: u32) -> Result<u32, BridgeError> {
        let shader = self
            .gl
            .create_shader(ty)
            .ok_or(BridgeError::CreateFailed(HandleKind::Shader))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        if !self.gl.shader_compiled(&shader) {
            let log = self.gl.shader_info_log(&shader).unwrap_or_default();
            tracing::error!(ty, log = %log, "shader compile failed");
            return Err(BridgeError::ShaderCompile(log));
        }
        self.shaders.allocate(shader)
    }

    /// Link a program from two compiled shaders; a failed link is fatal.
    pub fn link_program(&mut self, vertex: u32, fragment: u32) -> Result<u32, BridgeError> {
        let vs = self.shaders.resolve(vertex)?;
        let fs = self.shaders.resolve(fragment)?;
        let program = self
            .gl
            .create_program()
            .ok_or(BridgeError::CreateFailed(HandleKind::Program))?;
        self.gl.attach_shader(&program, vs);
        self.gl.attach_shader(&program, fs);
        self.gl.link_program(&program);
        if !self.gl.program_linked(&program) {
            let log = self.gl.program_info_log(&program).unwrap_or_default();
            tracing::error!(vertex, fragment, log = %log, "program link failed");
            return Err(BridgeError::ProgramLink(log));
        }
        self.programs.allocate(program)
    }

    pub fn create_buffer(&mut self) -> Result<u32, BridgeError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(BridgeError::CreateFailed(HandleKind::Buffer))?;
        self.buffers.allocate(buffer)
    }

    pub fn create_framebuffer(&mut self) -> Result<u32, BridgeError> {
        let framebuffer = self
            .gl
            .create_framebuffer()
            .ok_or(BridgeError::CreateFailed(HandleKind::Framebuffer))?;
        self.framebuffers.allocate(framebuffer)
    }

    pub fn create_renderbuffer(&mut self) -> Result<u32, BridgeError> {
        let renderbuffer = self
            .gl
            .create_renderbuffer()
            .ok_or(BridgeError::CreateFailed(HandleKind::Renderbuffer))?;
        self.renderbuffers.allocate(renderbuffer)
    }

    pub fn create_texture(&mut self) -> Result<u32, BridgeError> {
        let texture = self
            .gl
            .create_texture()
            .ok_or(BridgeError::CreateFailed(HandleKind::Texture))?;
        self.textures.allocate(texture)
    }

    pub fn bind_buffer(&self, target: u32, handle: i32) -> Result<(), BridgeError> {
        let buffer = self.buffers.resolve_optional(handle)?;
        self.gl.bind_buffer(target, buffer);
        Ok(())
    }

    pub fn bind_framebuffer(&self, target: u32, handle: i32) -> Result<(), BridgeError> {
        let framebuffer = self.framebuffers.resolve_optional(handle)?;
        self.gl.bind_framebuffer(target, framebuffer);
        Ok(())
    }

    pub fn bind_renderbuffer(&self, target: u32, handle: i32) -> Result<(), BridgeError> {
        let renderbuffer = self.renderbuffers.resolve_optional(handle)?;
        self.gl.bind_renderbuffer(target, renderbuffer);
        Ok(())
    }

    pub fn bind_texture(&self, target: u32, handle: i32) -> Result<(), BridgeError> {
        let texture = self.textures.resolve_optional(handle)?;
        self.gl.bind_texture(target, texture);
        Ok(())
    }

    pub fn use_program(&self, handle: i32) -> Result<(), BridgeError> {
        let program = self.programs.resolve_optional(handle)?;
        self.gl.use_program(program);
        Ok(())
    }

    pub fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: i32,
        level: i32,
    ) -> Result<(), BridgeError> {
        let texture = self.textures.resolve_optional(texture)?;
        self.gl
            .framebuffer_texture_2d(target, attachment, textarget, texture, level);
        Ok(())
    }

    pub fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: i32,
    ) -> Result<(), BridgeError> {
        let renderbuffer = self.renderbuffers.resolve_optional(renderbuffer)?;
        self.gl
            .framebuffer_renderbuffer(target, attachment, renderbuffer_target, renderbuffer);
        Ok(())
    }

    pub fn get_attrib_location(&self, program: u32, name: &str) -> Result<i32, BridgeError> {
        let program = self.programs.resolve(program)?;
        Ok(self.gl.get_attrib_location(program, name))
    }

    /// Uniforms the driver optimised away still get a handle; uploads to it
    /// are silently ignored, as with a `null` location in WebGL.
    pub fn get_uniform_location(&mut self, program: u32, name: &str) -> Result<u32, BridgeError> {
        let location = {
            let program = self.programs.resolve(program)?;
            self.gl.get_uniform_location(program, name)
        };
        if location.is_none() {
            tracing::debug!(program, name, "uniform location not found");
        }
        self.uniform_locations.allocate(location)
    }

    /// Native uniform location behind `handle` (`None` if optimised away).
    pub fn uniform_location(
        &self,
        handle: u32,
    ) -> Result<Option<&G::UniformLocation>, BridgeError> {
        Ok(self.uniform_locations.resolve(handle)?.as_ref())
    }

    pub fn texture(&self, handle: u32) -> Result<&G::Texture, BridgeError> {
        self.textures.resolve(handle)
    }

    /// Allocate a texture filled with one transparent pixel.
    ///
    /// Leaves the new texture bound to `TEXTURE_2D`.
    pub fn create_placeholder_texture(&mut self) -> Result<u32, BridgeError> {
        let handle = self.create_texture()?;
        let texture = self.textures.resolve(handle)?;
        self.gl.bind_texture(consts::TEXTURE_2D, Some(texture));
        self.gl.pixel_storei(consts::UNPACK_FLIP_Y_WEBGL, 1);
        self.gl
            .tex_image_2d_pixels(consts::TEXTURE_2D, 1, 1, Some(&TRANSPARENT_PIXEL));
        Ok(handle)
    }

    /// Bind `handle` to `TEXTURE_2D` and set its wrap and filter modes.
    pub fn configure_texture(&self, handle: u32, wrap: i32, filter: i32) -> Result<(), BridgeError> {
        let texture = self.textures.resolve(handle)?;
        self.gl.bind_texture(consts::TEXTURE_2D, Some(texture));
        self.gl
            .tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_WRAP_S, wrap);
        self.gl
            .tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_WRAP_T, wrap);
        self.gl
            .tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_MIN_FILTER, filter);
        self.gl
            .tex_parameteri(consts::TEXTURE_2D, consts::TEXTURE_MAG_FILTER, filter);
        Ok(())
    }

    /// Number of objects held per kind, for diagnostics.
    #[must_use]
    pub fn object_counts(&self) -> [(HandleKind, usize); 7] {
        [
            (HandleKind::Shader, self.shaders.len()),
            (HandleKind::Program, self.programs.len()),
            (HandleKind::Buffer, self.buffers.len()),
            (HandleKind::Framebuffer, self.framebuffers.len()),
            (HandleKind::Renderbuffer, self.renderbuffers.len()),
            (HandleKind::Texture, self.textures.len()),
            (HandleKind::UniformLocation, self.uniform_locations.len()),
        ]
    }
}

/// `true` when `x` is a positive power of two (mipmaps need both sides so in WebGL 1).
#[must_use]
pub const fn is_power_of_two(x: u32) -> bool {
    x.is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGl;
    use pretty_assertions::assert_eq;

    #[test]
    fn compile_and_link_hand_out_indices() {
        let mut fwd = GlForwarder::new(RecordingGl::default());
        let vs = fwd.compile_shader("void main(){}", consts::VERTEX_SHADER).unwrap();
        let fs = fwd.compile_shader("void main(){}", consts::FRAGMENT_SHADER).unwrap();
        assert_eq!((vs, fs), (0, 1));
        let program = fwd.link_program(vs, fs).unwrap();
        assert_eq!(program, 0);
        fwd.use_program(program as i32).unwrap();
        assert!(fwd.gl().calls().contains(&"useProgram(Some(0))".to_owned()));
    }

    #[test]
    fn compile_failure_surfaces_info_log() {
        let gl = RecordingGl::default();
        gl.fail_compile("ERROR: 0:3: 'foo' : undeclared identifier");
        let mut fwd = GlForwarder::new(gl);
        let err = fwd.compile_shader("bad", consts::FRAGMENT_SHADER).unwrap_err();
        assert_eq!(
            err,
            BridgeError::ShaderCompile("ERROR: 0:3: 'foo' : undeclared identifier".into())
        );
        // Nothing was allocated for the failed shader.
        assert_eq!(fwd.object_counts()[0], (HandleKind::Shader, 0));
    }

    #[test]
    fn link_failure_surfaces_info_log() {
        let gl = RecordingGl::default();
        gl.fail_link("varying mismatch");
        let mut fwd = GlForwarder::new(gl);
        let vs = fwd.compile_shader("v", consts::VERTEX_SHADER).unwrap();
        let fs = fwd.compile_shader("f", consts::FRAGMENT_SHADER).unwrap();
        assert_eq!(
            fwd.link_program(vs, fs),
            Err(BridgeError::ProgramLink("varying mismatch".into()))
        );
    }

    #[test]
    fn link_with_unknown_shader_is_invalid_handle() {
        let mut fwd = GlForwarder::new(RecordingGl::default());
        assert_eq!(
            fwd.link_program(0, 1),
            Err(BridgeError::InvalidHandle {
                kind: HandleKind::Shader,
                handle: 0
            })
        );
    }

    #[test]
    fn bind_translates_handles_and_negative_unbinds() {
        let mut fwd = GlForwarder::new(RecordingGl::default());
        let a = fwd.create_buffer().unwrap();
        let b = fwd.create_buffer().unwrap();
        fwd.bind_buffer(0x8892, b as i32).unwrap();
        fwd.bind_buffer(0x8892, -1).unwrap();
        fwd.bind_framebuffer(0x8D40, -1).unwrap();
        assert_eq!(a, 0);
        let calls = fwd.gl().calls();
        assert!(calls.contains(&"bindBuffer(34962, Some(1))".to_owned()));
        assert!(calls.contains(&"bindBuffer(34962, None)".to_owned()));
        assert!(calls.contains(&"bindFramebuffer(36160, None)".to_owned()));
    }

    #[test]
    fn missing_uniform_still_gets_a_handle() {
        let mut fwd = GlForwarder::new(RecordingGl::default());
        let vs = fwd.compile_shader("v", consts::VERTEX_SHADER).unwrap();
        let fs = fwd.compile_shader("f", consts::FRAGMENT_SHADER).unwrap();
        let p = fwd.link_program(vs, fs).unwrap();
        let found = fwd.get_uniform_location(p, "u_time").unwrap();
        let missing = fwd.get_uniform_location(p, "unused").unwrap();
        assert_eq!((found, missing), (0, 1));
        assert!(fwd.uniform_location(found).unwrap().is_some());
        assert!(fwd.uniform_location(missing).unwrap().is_none());
    }

    #[test]
    fn placeholder_texture_uploads_one_transparent_pixel() {
        let mut fwd = GlForwarder::new(RecordingGl::default());
        let t = fwd.create_placeholder_texture().unwrap();
        assert_eq!(t, 0);
        let calls = fwd.gl().calls();
        assert_eq!(
            calls,
            vec![
                "createTexture() -> 0".to_owned(),
                "bindTexture(3553, Some(0))".to_owned(),
                "pixelStorei(37440, 1)".to_owned(),
                "texImage2D(3553, 1x1, [0, 0, 0, 0])".to_owned(),
            ]
        );
    }

    #[test]
    fn power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(512));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(600));
    }
}
