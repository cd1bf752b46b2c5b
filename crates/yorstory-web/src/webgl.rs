#![forbid(unsafe_code)]

//! [`GlContext`] over a `WebGlRenderingContext`.

use js_sys::Float32Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{
    HtmlCanvasElement, HtmlImageElement, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlRenderbuffer, WebGlRenderingContext as Gl, WebGlShader, WebGlTexture,
    WebGlUniformLocation,
};
use yorstory_bridge::GlContext;

pub struct WebGl {
    gl: Gl,
}

impl WebGl {
    /// Acquire a WebGL 1 context on `canvas`.
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let gl = canvas
            .get_context("webgl")?
            .ok_or_else(|| JsValue::from_str("WebGL is not available"))?
            .dyn_into::<Gl>()?;
        Ok(Self { gl })
    }
}

fn log_upload_error(call: &'static str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        tracing::error!(call, error = ?err, "texture upload failed");
    }
}

impl GlContext for WebGl {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type Framebuffer = WebGlFramebuffer;
    type Renderbuffer = WebGlRenderbuffer;
    type Texture = WebGlTexture;
    type UniformLocation = WebGlUniformLocation;
    type F32Data = Float32Array;
    type Image = HtmlImageElement;

    fn active_texture(&self, texture: u32) {
        self.gl.active_texture(texture);
    }
    fn blend_func(&self, sfactor: u32, dfactor: u32) {
        self.gl.blend_func(sfactor, dfactor);
    }
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.gl
            .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
    }
    fn clear(&self, mask: u32) {
        self.gl.clear(mask);
    }
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.gl.clear_color(r, g, b, a);
    }
    fn clear_depth(&self, depth: f32) {
        self.gl.clear_depth(depth);
    }
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.gl.color_mask(r, g, b, a);
    }
    fn cull_face(&self, mode: u32) {
        self.gl.cull_face(mode);
    }
    fn depth_func(&self, func: u32) {
        self.gl.depth_func(func);
    }
    fn depth_mask(&self, flag: bool) {
        self.gl.depth_mask(flag);
    }
    fn disable(&self, cap: u32) {
        self.gl.disable(cap);
    }
    fn disable_vertex_attrib_array(&self, index: u32) {
        self.gl.disable_vertex_attrib_array(index);
    }
    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.gl.draw_arrays(mode, first, count);
    }
    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.gl.draw_elements_with_i32(mode, count, ty, offset);
    }
    fn enable(&self, cap: u32) {
        self.gl.enable(cap);
    }
    fn enable_vertex_attrib_array(&self, index: u32) {
        self.gl.enable_vertex_attrib_array(index);
    }
    fn front_face(&self, mode: u32) {
        self.gl.front_face(mode);
    }
    fn generate_mipmap(&self, target: u32) {
        self.gl.generate_mipmap(target);
    }
    fn line_width(&self, width: f32) {
        self.gl.line_width(width);
    }
    fn pixel_storei(&self, pname: u32, param: i32) {
        self.gl.pixel_storei(pname, param);
    }
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.gl.scissor(x, y, width, height);
    }
    fn tex_parameteri(&self, target: u32, pname: u32, param: i32) {
        self.gl.tex_parameteri(target, pname, param);
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
        self.gl
            .vertex_attrib_pointer_with_i32(index, size, ty, normalized, stride, offset);
    }
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.gl.viewport(x, y, width, height);
    }
    fn check_framebuffer_status(&self, target: u32) -> u32 {
        self.gl.check_framebuffer_status(target)
    }
    fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32) {
        self.gl
            .renderbuffer_storage(target, internal_format, width, height);
    }

    fn create_buffer(&self) -> Option<WebGlBuffer> {
        self.gl.create_buffer()
    }
    fn create_framebuffer(&self) -> Option<WebGlFramebuffer> {
        self.gl.create_framebuffer()
    }
    fn create_renderbuffer(&self) -> Option<WebGlRenderbuffer> {
        self.gl.create_renderbuffer()
    }
    fn create_texture(&self) -> Option<WebGlTexture> {
        self.gl.create_texture()
    }
    fn create_shader(&self, ty: u32) -> Option<WebGlShader> {
        self.gl.create_shader(ty)
    }
    fn create_program(&self) -> Option<WebGlProgram> {
        self.gl.create_program()
    }

    fn shader_source(&self, shader: &WebGlShader, source: &str) {
        self.gl.shader_source(shader, source);
    }
    fn compile_shader(&self, shader: &WebGlShader) {
        self.gl.compile_shader(shader);
    }
    fn shader_compiled(&self, shader: &WebGlShader) -> bool {
        self.gl
            .get_shader_parameter(shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
    }
    fn shader_info_log(&self, shader: &WebGlShader) -> Option<String> {
        self.gl.get_shader_info_log(shader)
    }
    fn attach_shader(&self, program: &WebGlProgram, shader: &WebGlShader) {
        self.gl.attach_shader(program, shader);
    }
    fn link_program(&self, program: &WebGlProgram) {
        self.gl.link_program(program);
    }
    fn program_linked(&self, program: &WebGlProgram) -> bool {
        self.gl
            .get_program_parameter(program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
    }
    fn program_info_log(&self, program: &WebGlProgram) -> Option<String> {
        self.gl.get_program_info_log(program)
    }
    fn use_program(&self, program: Option<&WebGlProgram>) {
        self.gl.use_program(program);
    }
    fn get_attrib_location(&self, program: &WebGlProgram, name: &str) -> i32 {
        self.gl.get_attrib_location(program, name)
    }
    fn get_uniform_location(
        &self,
        program: &WebGlProgram,
        name: &str,
    ) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn bind_buffer(&self, target: u32, buffer: Option<&WebGlBuffer>) {
        self.gl.bind_buffer(target, buffer);
    }
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<&WebGlFramebuffer>) {
        self.gl.bind_framebuffer(target, framebuffer);
    }
    fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<&WebGlRenderbuffer>) {
        self.gl.bind_renderbuffer(target, renderbuffer);
    }
    fn bind_texture(&self, target: u32, texture: Option<&WebGlTexture>) {
        self.gl.bind_texture(target, texture);
    }
    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<&WebGlTexture>,
        level: i32,
    ) {
        self.gl
            .framebuffer_texture_2d(target, attachment, textarget, texture, level);
    }
    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<&WebGlRenderbuffer>,
    ) {
        self.gl
            .framebuffer_renderbuffer(target, attachment, renderbuffer_target, renderbuffer);
    }

    fn buffer_data_f32(&self, target: u32, data: &Float32Array, usage: u32) {
        self.gl
            .buffer_data_with_array_buffer_view(target, data, usage);
    }
    fn uniform1i(&self, location: Option<&WebGlUniformLocation>, x: i32) {
        self.gl.uniform1i(location, x);
    }
    fn uniform1f(&self, location: Option<&WebGlUniformLocation>, x: f32) {
        self.gl.uniform1f(location, x);
    }
    fn uniform1fv(&self, location: Option<&WebGlUniformLocation>, data: &Float32Array) {
        self.gl.uniform1fv_with_f32_sequence(location, data);
    }
    fn uniform2fv(&self, location: Option<&WebGlUniformLocation>, v: [f32; 2]) {
        self.gl.uniform2fv_with_f32_array(location, &v);
    }
    fn uniform3fv(&self, location: Option<&WebGlUniformLocation>, v: [f32; 3]) {
        self.gl.uniform3fv_with_f32_array(location, &v);
    }
    fn uniform4fv(&self, location: Option<&WebGlUniformLocation>, v: [f32; 4]) {
        self.gl.uniform4fv_with_f32_array(location, &v);
    }
    fn uniform_matrix4fv(
        &self,
        location: Option<&WebGlUniformLocation>,
        transpose: bool,
        data: &Float32Array,
    ) {
        self.gl
            .uniform_matrix4fv_with_f32_sequence(location, transpose, data);
    }

    fn tex_image_2d_pixels(&self, target: u32, width: i32, height: i32, pixels: Option<&[u8]>) {
        log_upload_error(
            "texImage2D",
            self.gl
                .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                    target,
                    0,
                    Gl::RGBA as i32,
                    width,
                    height,
                    0,
                    Gl::RGBA,
                    Gl::UNSIGNED_BYTE,
                    pixels,
                ),
        );
    }
    fn tex_image_2d_image(&self, target: u32, image: &HtmlImageElement) {
        log_upload_error(
            "texImage2D",
            self.gl.tex_image_2d_with_u32_and_u32_and_html_image_element(
                target,
                0,
                Gl::RGBA as i32,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                image,
            ),
        );
    }
    fn tex_sub_image_2d_image(&self, target: u32, x: i32, y: i32, image: &HtmlImageElement) {
        log_upload_error(
            "texSubImage2D",
            self.gl.tex_sub_image_2d_with_u32_and_u32_and_html_image_element(
                target,
                0,
                x,
                y,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                image,
            ),
        );
    }
}
