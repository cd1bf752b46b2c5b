#![forbid(unsafe_code)]

//! Native stand-ins for the browser: a GL context that records calls, a
//! byte-vector guest memory, an overlay surface that records DOM operations,
//! and a scripted guest.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::Display;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, MemoryError};
use crate::frame::{FrameHost, GuestExports, InputEvent};
use crate::gl::{GlContext, consts};
use crate::memory::{GuestMemory, check_range};
use crate::overlay::{EmbedNode, OverlaySurface, TextNode};
use crate::texture::TextureReady;

/// A bridge over the recording doubles with default configuration.
#[must_use]
pub fn test_bridge() -> Bridge<RecordingGl, VecMemory, RecordingOverlay> {
    Bridge::new(
        RecordingGl::default(),
        RecordingOverlay::default(),
        &BridgeConfig::default(),
    )
}

fn opt<T: Display>(value: Option<&T>) -> String {
    match value {
        Some(v) => format!("Some({v})"),
        None => "None".to_owned(),
    }
}

/// Decoded image stand-in: only its size matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestImage {
    pub width: u32,
    pub height: u32,
}

impl TestImage {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// GL context that hands out sequential native ids per object kind and
/// logs every call in WebGL spelling.
#[derive(Debug, Default)]
pub struct RecordingGl {
    calls: RefCell<Vec<String>>,
    next_shader: Cell<u32>,
    next_program: Cell<u32>,
    next_buffer: Cell<u32>,
    next_framebuffer: Cell<u32>,
    next_renderbuffer: Cell<u32>,
    next_texture: Cell<u32>,
    compile_error: RefCell<Option<String>>,
    link_error: RefCell<Option<String>>,
}

impl RecordingGl {
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Make every later compile fail with `log`.
    pub fn fail_compile(&self, log: &str) {
        *self.compile_error.borrow_mut() = Some(log.to_owned());
    }

    /// Make every later link fail with `log`.
    pub fn fail_link(&self, log: &str) {
        *self.link_error.borrow_mut() = Some(log.to_owned());
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn next(counter: &Cell<u32>) -> u32 {
        let id = counter.get();
        counter.set(id + 1);
        id
    }
}

impl GlContext for RecordingGl {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type Framebuffer = u32;
    type Renderbuffer = u32;
    type Texture = u32;
    type UniformLocation = String;
    type F32Data = Vec<f32>;
    type Image = TestImage;

    fn active_texture(&self, texture: u32) {
        self.log(format!("activeTexture({texture})"));
    }
    fn blend_func(&self, sfactor: u32, dfactor: u32) {
        self.log(format!("blendFunc({sfactor}, {dfactor})"));
    }
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.log(format!(
            "blendFuncSeparate({src_rgb}, {dst_rgb}, {src_alpha}, {dst_alpha})"
        ));
    }
    fn clear(&self, mask: u32) {
        self.log(format!("clear({mask})"));
    }
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.log(format!("clearColor({r}, {g}, {b}, {a})"));
    }
    fn clear_depth(&self, depth: f32) {
        self.log(format!("clearDepth({depth})"));
    }
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.log(format!("colorMask({r}, {g}, {b}, {a})"));
    }
    fn cull_face(&self, mode: u32) {
        self.log(format!("cullFace({mode})"));
    }
    fn depth_func(&self, func: u32) {
        self.log(format!("depthFunc({func})"));
    }
    fn depth_mask(&self, flag: bool) {
        self.log(format!("depthMask({flag})"));
    }
    fn disable(&self, cap: u32) {
        self.log(format!("disable({cap})"));
    }
    fn disable_vertex_attrib_array(&self, index: u32) {
        self.log(format!("disableVertexAttribArray({index})"));
    }
    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.log(format!("drawArrays({mode}, {first}, {count})"));
    }
    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.log(format!("drawElements({mode}, {count}, {ty}, {offset})"));
    }
    fn enable(&self, cap: u32) {
        self.log(format!("enable({cap})"));
    }
    fn enable_vertex_attrib_array(&self, index: u32) {
        self.log(format!("enableVertexAttribArray({index})"));
    }
    fn front_face(&self, mode: u32) {
        self.log(format!("frontFace({mode})"));
    }
    fn generate_mipmap(&self, target: u32) {
        self.log(format!("generateMipmap({target})"));
    }
    fn line_width(&self, width: f32) {
        self.log(format!("lineWidth({width})"));
    }
    fn pixel_storei(&self, pname: u32, param: i32) {
        self.log(format!("pixelStorei({pname}, {param})"));
    }
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("scissor({x}, {y}, {width}, {height})"));
    }
    fn tex_parameteri(&self, target: u32, pname: u32, param: i32) {
        self.log(format!("texParameteri({target}, {pname}, {param})"));
    }
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.log(format!(
            "vertexAttribPointer({index}, {size}, {ty}, {normalized}, {stride}, {offset})"
        ));
    }
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.log(format!("viewport({x}, {y}, {width}, {height})"));
    }
    fn check_framebuffer_status(&self, target: u32) -> u32 {
        self.log(format!("checkFramebufferStatus({target})"));
        consts::FRAMEBUFFER_COMPLETE
    }
    fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32) {
        self.log(format!(
            "renderbufferStorage({target}, {internal_format}, {width}, {height})"
        ));
    }

    fn create_buffer(&self) -> Option<u32> {
        let id = Self::next(&self.next_buffer);
        self.log(format!("createBuffer() -> {id}"));
        Some(id)
    }
    fn create_framebuffer(&self) -> Option<u32> {
        let id = Self::next(&self.next_framebuffer);
        self.log(format!("createFramebuffer() -> {id}"));
        Some(id)
    }
    fn create_renderbuffer(&self) -> Option<u32> {
        let id = Self::next(&self.next_renderbuffer);
        self.log(format!("createRenderbuffer() -> {id}"));
        Some(id)
    }
    fn create_texture(&self) -> Option<u32> {
        let id = Self::next(&self.next_texture);
        self.log(format!("createTexture() -> {id}"));
        Some(id)
    }
    fn create_shader(&self, ty: u32) -> Option<u32> {
        let id = Self::next(&self.next_shader);
        self.log(format!("createShader({ty}) -> {id}"));
        Some(id)
    }
    fn create_program(&self) -> Option<u32> {
        let id = Self::next(&self.next_program);
        self.log(format!("createProgram() -> {id}"));
        Some(id)
    }

    fn shader_source(&self, shader: &u32, source: &str) {
        self.log(format!("shaderSource({shader}, {} bytes)", source.len()));
    }
    fn compile_shader(&self, shader: &u32) {
        self.log(format!("compileShader({shader})"));
    }
    fn shader_compiled(&self, _shader: &u32) -> bool {
        self.compile_error.borrow().is_none()
    }
    fn shader_info_log(&self, _shader: &u32) -> Option<String> {
        self.compile_error.borrow().clone()
    }
    fn attach_shader(&self, program: &u32, shader: &u32) {
        self.log(format!("attachShader({program}, {shader})"));
    }
    fn link_program(&self, program: &u32) {
        self.log(format!("linkProgram({program})"));
    }
    fn program_linked(&self, _program: &u32) -> bool {
        self.link_error.borrow().is_none()
    }
    fn program_info_log(&self, _program: &u32) -> Option<String> {
        self.link_error.borrow().clone()
    }
    fn use_program(&self, program: Option<&u32>) {
        self.log(format!("useProgram({})", opt(program)));
    }
    fn get_attrib_location(&self, program: &u32, name: &str) -> i32 {
        self.log(format!("getAttribLocation({program}, {name})"));
        i32::try_from(name.len()).unwrap_or(-1)
    }
    fn get_uniform_location(&self, program: &u32, name: &str) -> Option<String> {
        self.log(format!("getUniformLocation({program}, {name})"));
        (name != "unused").then(|| name.to_owned())
    }

    fn bind_buffer(&self, target: u32, buffer: Option<&u32>) {
        self.log(format!("bindBuffer({target}, {})", opt(buffer)));
    }
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<&u32>) {
        self.log(format!("bindFramebuffer({target}, {})", opt(framebuffer)));
    }
    fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<&u32>) {
        self.log(format!("bindRenderbuffer({target}, {})", opt(renderbuffer)));
    }
    fn bind_texture(&self, target: u32, texture: Option<&u32>) {
        self.log(format!("bindTexture({target}, {})", opt(texture)));
    }
    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<&u32>,
        level: i32,
    ) {
        self.log(format!(
            "framebufferTexture2D({target}, {attachment}, {textarget}, {}, {level})",
            opt(texture)
        ));
    }
    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<&u32>,
    ) {
        self.log(format!(
            "framebufferRenderbuffer({target}, {attachment}, {renderbuffer_target}, {})",
            opt(renderbuffer)
        ));
    }

    fn buffer_data_f32(&self, target: u32, data: &Vec<f32>, usage: u32) {
        self.log(format!("bufferData({target}, {data:?}, {usage})"));
    }
    fn uniform1i(&self, location: Option<&String>, x: i32) {
        self.log(format!("uniform1i({}, {x})", opt(location)));
    }
    fn uniform1f(&self, location: Option<&String>, x: f32) {
        self.log(format!("uniform1f({}, {x})", opt(location)));
    }
    fn uniform1fv(&self, location: Option<&String>, data: &Vec<f32>) {
        self.log(format!("uniform1fv({}, {data:?})", opt(location)));
    }
    fn uniform2fv(&self, location: Option<&String>, v: [f32; 2]) {
        self.log(format!("uniform2fv({}, {v:?})", opt(location)));
    }
    fn uniform3fv(&self, location: Option<&String>, v: [f32; 3]) {
        self.log(format!("uniform3fv({}, {v:?})", opt(location)));
    }
    fn uniform4fv(&self, location: Option<&String>, v: [f32; 4]) {
        self.log(format!("uniform4fv({}, {v:?})", opt(location)));
    }
    fn uniform_matrix4fv(&self, location: Option<&String>, transpose: bool, data: &Vec<f32>) {
        self.log(format!(
            "uniformMatrix4fv({}, {transpose}, {data:?})",
            opt(location)
        ));
    }

    fn tex_image_2d_pixels(&self, target: u32, width: i32, height: i32, pixels: Option<&[u8]>) {
        match pixels {
            Some(pixels) => self.log(format!("texImage2D({target}, {width}x{height}, {pixels:?})")),
            None => self.log(format!("texImage2D({target}, {width}x{height}, empty)")),
        }
    }
    fn tex_image_2d_image(&self, target: u32, image: &TestImage) {
        self.log(format!(
            "texImage2D({target}, image {}x{})",
            image.width, image.height
        ));
    }
    fn tex_sub_image_2d_image(&self, target: u32, x: i32, y: i32, image: &TestImage) {
        self.log(format!(
            "texSubImage2D({target}, {x}, {y}, {}x{})",
            image.width, image.height
        ));
    }
}

/// Guest memory backed by a byte vector.
#[derive(Debug)]
pub struct VecMemory {
    bytes: RefCell<Vec<u8>>,
}

impl VecMemory {
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            bytes: RefCell::new(vec![0; size as usize]),
        }
    }
}

impl GuestMemory for VecMemory {
    type F32View = Vec<f32>;

    fn size(&self) -> u32 {
        u32::try_from(self.bytes.borrow().len()).unwrap_or(u32::MAX)
    }

    fn read_bytes(&self, ptr: u32, len: u32) -> Result<Vec<u8>, MemoryError> {
        check_range(ptr, len, self.size())?;
        let start = ptr as usize;
        Ok(self.bytes.borrow()[start..start + len as usize].to_vec())
    }

    fn write_bytes(&self, ptr: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        check_range(ptr, len, self.size())?;
        let start = ptr as usize;
        self.bytes.borrow_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn f32_view(&self, ptr: u32, count: u32) -> Result<Vec<f32>, MemoryError> {
        let raw = self.read_bytes(ptr, count.saturating_mul(4))?;
        Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

/// A DOM operation observed by [`RecordingOverlay`].
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayOp {
    Text(String, TextNode),
    Embed(String, EmbedNode),
    Remove(String),
}

/// Overlay surface that logs operations and tracks live nodes per class.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    ops: Vec<OverlayOp>,
    live: Vec<String>,
}

impl RecordingOverlay {
    #[must_use]
    pub fn ops(&self) -> &[OverlayOp] {
        &self.ops
    }

    /// Nodes tagged `class` currently attached.
    #[must_use]
    pub fn live_count(&self, class: &str) -> usize {
        self.live.iter().filter(|c| *c == class).count()
    }
}

impl OverlaySurface for RecordingOverlay {
    fn remove_class(&mut self, class: &str) {
        self.live.retain(|c| c != class);
        self.ops.push(OverlayOp::Remove(class.to_owned()));
    }

    fn append_text(&mut self, class: &str, node: &TextNode) {
        self.live.push(class.to_owned());
        self.ops.push(OverlayOp::Text(class.to_owned(), node.clone()));
    }

    fn append_embed(&mut self, class: &str, node: &EmbedNode) {
        self.live.push(class.to_owned());
        self.ops.push(OverlayOp::Embed(class.to_owned(), node.clone()));
    }
}

/// Guest whose frames return scripted content heights (0 once exhausted).
#[derive(Debug, Default)]
pub struct RecordingGuest {
    calls: RefCell<Vec<String>>,
    heights: RefCell<VecDeque<f64>>,
    fail_frames: Cell<bool>,
    fail_texture_loaded: Cell<bool>,
}

impl RecordingGuest {
    #[must_use]
    pub fn with_heights(heights: Vec<f64>) -> Self {
        Self {
            heights: RefCell::new(heights.into()),
            ..Self::default()
        }
    }

    /// Make every later `onAnimationFrame` trap after being logged.
    pub fn fail_frames(&self) {
        self.fail_frames.set(true);
    }

    /// Make every later `onTextureLoaded` trap after being logged.
    pub fn fail_texture_loaded(&self) {
        self.fail_texture_loaded.set(true);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl GuestExports for RecordingGuest {
    fn on_init(&self) -> Result<(), BridgeError> {
        self.log("onInit()".to_owned());
        Ok(())
    }

    fn on_animation_frame(
        &self,
        width: u32,
        height: u32,
        scroll_y: f64,
        timestamp_ms: f64,
    ) -> Result<f64, BridgeError> {
        self.log(format!(
            "onAnimationFrame({width}, {height}, {scroll_y}, {timestamp_ms})"
        ));
        if self.fail_frames.get() {
            return Err(BridgeError::Guest("onAnimationFrame trapped".to_owned()));
        }
        Ok(self.heights.borrow_mut().pop_front().unwrap_or(0.0))
    }

    fn on_input(&self, event: InputEvent) -> Result<(), BridgeError> {
        self.log(match event {
            InputEvent::MouseMove { x, y } => format!("onMouseMove({x}, {y})"),
            InputEvent::MouseDown { button, x, y } => format!("onMouseDown({button}, {x}, {y})"),
            InputEvent::MouseUp { button, x, y } => format!("onMouseUp({button}, {x}, {y})"),
            InputEvent::KeyDown { key_code } => format!("onKeyDown({key_code})"),
        });
        Ok(())
    }

    fn on_texture_loaded(&self, ready: TextureReady) -> Result<(), BridgeError> {
        self.log(format!(
            "onTextureLoaded({}, {}, {})",
            ready.texture, ready.width, ready.height
        ));
        if self.fail_texture_loaded.get() {
            return Err(BridgeError::Guest("onTextureLoaded trapped".to_owned()));
        }
        Ok(())
    }
}

/// Frame host with a fixed canvas and a scripted queue of finished textures.
#[derive(Debug)]
pub struct RecordingHost {
    ready: VecDeque<TextureReady>,
    width: u32,
    height: u32,
    scroll_y: f64,
    spacer: Vec<f64>,
    failed_pumps: u32,
}

impl RecordingHost {
    #[must_use]
    pub fn new(width: u32, height: u32, scroll_y: f64) -> Self {
        Self {
            ready: VecDeque::new(),
            width,
            height,
            scroll_y,
            spacer: Vec::new(),
            failed_pumps: 0,
        }
    }

    /// Make the next `count` pumps fail with [`BridgeError::UnknownTexture`].
    pub fn fail_pumps(&mut self, count: u32) {
        self.failed_pumps = count;
    }

    pub fn push_ready(&mut self, ready: TextureReady) {
        self.ready.push_back(ready);
    }

    #[must_use]
    pub fn spacer_heights(&self) -> Vec<f64> {
        self.spacer.clone()
    }
}

impl FrameHost for RecordingHost {
    fn pump_texture_job(&mut self) -> Result<Option<TextureReady>, BridgeError> {
        if self.failed_pumps > 0 {
            self.failed_pumps -= 1;
            return Err(BridgeError::UnknownTexture(0));
        }
        Ok(self.ready.pop_front())
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_spacer_height(&mut self, height: f64) {
        self.spacer.push(height);
    }
}
