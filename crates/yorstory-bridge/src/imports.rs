#![forbid(unsafe_code)]

//! The guest's import surface (module `env`).
//!
//! Every function the guest may import is listed once in [`ImportId`] with
//! its JS name and argument count. The web frontend builds one JS function
//! per entry; each call lands in [`Bridge::call_import`] with its arguments
//! as plain numbers, exactly as wasm passes them across the JS boundary.
//!
//! Strings travel as `(ptr, len)` pairs into guest memory. Float arrays
//! travel as `(ptr, count)` and reach GL as views over that memory.

use crate::bridge::{Bridge, CursorKind, HostEffect};
use crate::error::BridgeError;
use crate::gl::{GlContext, consts};
use crate::memory::{self, GuestMemory};
use crate::overlay::{OverlaySurface, TextAlign, TextBox, TextLine, TextStyle};

macro_rules! import_table {
    ($($variant:ident => $name:literal / $arity:literal,)*) => {
        /// Every function the guest can import from `env`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ImportId {
            $($variant,)*
        }

        impl ImportId {
            pub const ALL: &'static [ImportId] = &[$(ImportId::$variant,)*];

            /// Name the guest imports this function under.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Number of arguments the guest passes.
            #[must_use]
            pub const fn arity(self) -> usize {
                match self {
                    $(Self::$variant => $arity,)*
                }
            }

            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

import_table! {
    // Host services.
    ConsoleMessage => "consoleMessage" / 3,
    GetUri => "getUri" / 2,
    SetCursor => "setCursor" / 1,

    // Overlays.
    ClearAllText => "clearAllText" / 0,
    ClearAllEmbeds => "clearAllEmbeds" / 0,
    AddText => "addText" / 5,
    AddTextLine => "addTextLine" / 10,
    AddTextBox => "addTextBox" / 13,
    AddYoutubeEmbed => "addYoutubeEmbed" / 6,

    // Textures.
    CreateTexture => "createTexture" / 3,
    CreateAndLoadTexture => "createAndLoadTexture" / 4,

    // Shaders.
    CompileShader => "compileShader" / 3,
    LinkShaderProgram => "linkShaderProgram" / 2,

    // Plain GL forwards.
    GlActiveTexture => "glActiveTexture" / 1,
    GlBlendFunc => "glBlendFunc" / 2,
    GlBlendFuncSeparate => "glBlendFuncSeparate" / 4,
    GlClear => "glClear" / 1,
    GlClearColor => "glClearColor" / 4,
    GlClearDepth => "glClearDepth" / 1,
    GlColorMask => "glColorMask" / 4,
    GlCullFace => "glCullFace" / 1,
    GlDepthFunc => "glDepthFunc" / 1,
    GlDepthMask => "glDepthMask" / 1,
    GlDisable => "glDisable" / 1,
    GlDisableVertexAttribArray => "glDisableVertexAttribArray" / 1,
    GlDrawArrays => "glDrawArrays" / 3,
    GlDrawElements => "glDrawElements" / 4,
    GlEnable => "glEnable" / 1,
    GlEnableVertexAttribArray => "glEnableVertexAttribArray" / 1,
    GlFrontFace => "glFrontFace" / 1,
    GlGenerateMipmap => "glGenerateMipmap" / 1,
    GlLineWidth => "glLineWidth" / 1,
    GlPixelStorei => "glPixelStorei" / 2,
    GlScissor => "glScissor" / 4,
    GlTexParameteri => "glTexParameteri" / 3,
    GlVertexAttribPointer => "glVertexAttribPointer" / 6,
    GlViewport => "glViewport" / 4,
    GlCheckFramebufferStatus => "glCheckFramebufferStatus" / 1,
    GlRenderbufferStorage => "glRenderbufferStorage" / 4,

    // GL calls that translate handles or read guest memory.
    GlCreateBuffer => "glCreateBuffer" / 0,
    GlCreateTexture => "glCreateTexture" / 0,
    GlCreateFramebuffer => "glCreateFramebuffer" / 0,
    GlCreateRenderbuffer => "glCreateRenderbuffer" / 0,
    GlBindBuffer => "glBindBuffer" / 2,
    GlBindTexture => "glBindTexture" / 2,
    GlBindFramebuffer => "glBindFramebuffer" / 2,
    GlBindRenderbuffer => "glBindRenderbuffer" / 2,
    GlUseProgram => "glUseProgram" / 1,
    GlFramebufferTexture2D => "glFramebufferTexture2D" / 5,
    GlFramebufferRenderbuffer => "glFramebufferRenderbuffer" / 4,
    GlBufferData => "glBufferData" / 4,
    GlGetAttribLocation => "glGetAttribLocation" / 3,
    GlGetUniformLocation => "glGetUniformLocation" / 3,
    GlUniform1i => "glUniform1i" / 2,
    GlUniform1f => "glUniform1f" / 2,
    GlUniform1fv => "glUniform1fv" / 3,
    GlUniform2fv => "glUniform2fv" / 3,
    GlUniform3fv => "glUniform3fv" / 4,
    GlUniform4fv => "glUniform4fv" / 5,
    GlUniformMatrix4fv => "glUniformMatrix4fv" / 3,
    GlTexImage2DEmpty => "glTexImage2DEmpty" / 2,
}

impl std::fmt::Display for ImportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed access to one call's numeric arguments.
struct Args<'a> {
    import: &'static str,
    values: &'a [f64],
}

impl<'a> Args<'a> {
    fn new(id: ImportId, values: &'a [f64]) -> Self {
        Self {
            import: id.name(),
            values,
        }
    }

    fn f64(&self, index: usize) -> Result<f64, BridgeError> {
        match self.values.get(index) {
            Some(v) if !v.is_nan() => Ok(*v),
            _ => Err(BridgeError::BadArgument {
                import: self.import,
                index,
            }),
        }
    }

    fn f32(&self, index: usize) -> Result<f32, BridgeError> {
        Ok(self.f64(index)? as f32)
    }

    fn i32(&self, index: usize) -> Result<i32, BridgeError> {
        Ok(self.f64(index)? as i64 as i32)
    }

    /// GL enums and pointers arrive as wasm `i32`; reinterpret the bits.
    fn u32(&self, index: usize) -> Result<u32, BridgeError> {
        Ok(self.f64(index)? as i64 as u32)
    }

    fn bool(&self, index: usize) -> Result<bool, BridgeError> {
        Ok(self.f64(index)? != 0.0)
    }
}

fn handle(h: u32) -> Option<f64> {
    Some(f64::from(h))
}

impl<G, M, O> Bridge<G, M, O>
where
    G: GlContext,
    M: GuestMemory<F32View = G::F32Data>,
    O: OverlaySurface,
{
    fn arg_string(&self, args: &Args<'_>, ptr: usize) -> Result<String, BridgeError> {
        self.read_string(args.u32(ptr)?, args.u32(ptr + 1)?)
    }

    fn arg_f32_view(&self, args: &Args<'_>, ptr: usize, count: u32) -> Result<G::F32Data, BridgeError> {
        Ok(memory::read_f32_array(self.memory()?, args.u32(ptr)?, count)?)
    }

    /// Service one guest import.
    ///
    /// Returns the value handed back to the guest, if the import has one.
    /// Errors are thrown into the guest by the web frontend.
    pub fn call_import(&mut self, id: ImportId, values: &[f64]) -> Result<Option<f64>, BridgeError> {
        let a = Args::new(id, values);
        let gl = self.gl.gl();
        match id {
            ImportId::ConsoleMessage => {
                let message = self.arg_string(&a, 1)?;
                if a.bool(0)? {
                    tracing::error!(target: "guest", "{message}");
                } else {
                    tracing::info!(target: "guest", "{message}");
                }
            }
            ImportId::GetUri => {
                let written = self.write_string(a.u32(0)?, a.u32(1)?, self.page_path())?;
                return Ok(handle(written));
            }
            ImportId::SetCursor => {
                let cursor = CursorKind::from_code(a.i32(0)?);
                self.push_effect(HostEffect::SetCursor(cursor));
            }

            ImportId::ClearAllText => self.overlays.clear_all_text(),
            ImportId::ClearAllEmbeds => self.overlays.clear_all_embeds(),
            ImportId::AddText => {
                let text = self.arg_string(&a, 0)?;
                self.overlays
                    .add_text(text, a.f64(2)?, a.f64(3)?, a.f64(4)?);
            }
            ImportId::AddTextLine => {
                let line = TextLine {
                    text: self.arg_string(&a, 0)?,
                    left: a.f64(2)?,
                    baseline_y: a.f64(3)?,
                    style: TextStyle {
                        font_size: a.f64(4)?,
                        letter_spacing: a.f64(5)?,
                        color: self.arg_string(&a, 6)?,
                        font_family: self.arg_string(&a, 8)?,
                    },
                };
                self.overlays.add_text_line(line);
            }
            ImportId::AddTextBox => {
                let text_box = TextBox {
                    text: self.arg_string(&a, 0)?,
                    left: a.f64(2)?,
                    baseline_y: a.f64(3)?,
                    width: a.f64(4)?,
                    line_height: a.f64(6)?,
                    style: TextStyle {
                        font_size: a.f64(5)?,
                        letter_spacing: a.f64(7)?,
                        color: self.arg_string(&a, 8)?,
                        font_family: self.arg_string(&a, 10)?,
                    },
                    align: TextAlign::from_code(a.i32(12)?),
                };
                self.overlays.add_text_box(text_box);
            }
            ImportId::AddYoutubeEmbed => {
                let video_id = self.arg_string(&a, 4)?;
                self.overlays
                    .add_youtube_embed(a.f64(0)?, a.f64(1)?, a.f64(2)?, a.f64(3)?, &video_id);
            }

            ImportId::CreateTexture => {
                let url = self.arg_string(&a, 0)?;
                return Ok(handle(self.create_texture_from_url(&url, a.i32(2)?)?));
            }
            ImportId::CreateAndLoadTexture => {
                let path = self.arg_string(&a, 0)?;
                let texture = self.create_and_load_texture(&path, a.i32(2)?, a.i32(3)?)?;
                return Ok(handle(texture));
            }

            ImportId::CompileShader => {
                let source = self.arg_string(&a, 0)?;
                return Ok(handle(self.gl.compile_shader(&source, a.u32(2)?)?));
            }
            ImportId::LinkShaderProgram => {
                return Ok(handle(self.gl.link_program(a.u32(0)?, a.u32(1)?)?));
            }

            ImportId::GlActiveTexture => gl.active_texture(a.u32(0)?),
            ImportId::GlBlendFunc => gl.blend_func(a.u32(0)?, a.u32(1)?),
            ImportId::GlBlendFuncSeparate => {
                gl.blend_func_separate(a.u32(0)?, a.u32(1)?, a.u32(2)?, a.u32(3)?);
            }
            ImportId::GlClear => gl.clear(a.u32(0)?),
            ImportId::GlClearColor => gl.clear_color(a.f32(0)?, a.f32(1)?, a.f32(2)?, a.f32(3)?),
            ImportId::GlClearDepth => gl.clear_depth(a.f32(0)?),
            ImportId::GlColorMask => {
                gl.color_mask(a.bool(0)?, a.bool(1)?, a.bool(2)?, a.bool(3)?);
            }
            ImportId::GlCullFace => gl.cull_face(a.u32(0)?),
            ImportId::GlDepthFunc => gl.depth_func(a.u32(0)?),
            ImportId::GlDepthMask => gl.depth_mask(a.bool(0)?),
            ImportId::GlDisable => gl.disable(a.u32(0)?),
            ImportId::GlDisableVertexAttribArray => gl.disable_vertex_attrib_array(a.u32(0)?),
            ImportId::GlDrawArrays => gl.draw_arrays(a.u32(0)?, a.i32(1)?, a.i32(2)?),
            ImportId::GlDrawElements => {
                gl.draw_elements(a.u32(0)?, a.i32(1)?, a.u32(2)?, a.i32(3)?);
            }
            ImportId::GlEnable => gl.enable(a.u32(0)?),
            ImportId::GlEnableVertexAttribArray => gl.enable_vertex_attrib_array(a.u32(0)?),
            ImportId::GlFrontFace => gl.front_face(a.u32(0)?),
            ImportId::GlGenerateMipmap => gl.generate_mipmap(a.u32(0)?),
            ImportId::GlLineWidth => gl.line_width(a.f32(0)?),
            ImportId::GlPixelStorei => gl.pixel_storei(a.u32(0)?, a.i32(1)?),
            ImportId::GlScissor => gl.scissor(a.i32(0)?, a.i32(1)?, a.i32(2)?, a.i32(3)?),
            ImportId::GlTexParameteri => gl.tex_parameteri(a.u32(0)?, a.u32(1)?, a.i32(2)?),
            ImportId::GlVertexAttribPointer => gl.vertex_attrib_pointer(
                a.u32(0)?,
                a.i32(1)?,
                a.u32(2)?,
                a.bool(3)?,
                a.i32(4)?,
                a.i32(5)?,
            ),
            ImportId::GlViewport => gl.viewport(a.i32(0)?, a.i32(1)?, a.i32(2)?, a.i32(3)?),
            ImportId::GlCheckFramebufferStatus => {
                return Ok(handle(gl.check_framebuffer_status(a.u32(0)?)));
            }
            ImportId::GlRenderbufferStorage => {
                gl.renderbuffer_storage(a.u32(0)?, a.u32(1)?, a.i32(2)?, a.i32(3)?);
            }

            ImportId::GlCreateBuffer => return Ok(handle(self.gl.create_buffer()?)),
            ImportId::GlCreateTexture => return Ok(handle(self.gl.create_texture()?)),
            ImportId::GlCreateFramebuffer => return Ok(handle(self.gl.create_framebuffer()?)),
            ImportId::GlCreateRenderbuffer => return Ok(handle(self.gl.create_renderbuffer()?)),
            ImportId::GlBindBuffer => self.gl.bind_buffer(a.u32(0)?, a.i32(1)?)?,
            ImportId::GlBindTexture => self.gl.bind_texture(a.u32(0)?, a.i32(1)?)?,
            ImportId::GlBindFramebuffer => self.gl.bind_framebuffer(a.u32(0)?, a.i32(1)?)?,
            ImportId::GlBindRenderbuffer => self.gl.bind_renderbuffer(a.u32(0)?, a.i32(1)?)?,
            ImportId::GlUseProgram => self.gl.use_program(a.i32(0)?)?,
            ImportId::GlFramebufferTexture2D => self.gl.framebuffer_texture_2d(
                a.u32(0)?,
                a.u32(1)?,
                a.u32(2)?,
                a.i32(3)?,
                a.i32(4)?,
            )?,
            ImportId::GlFramebufferRenderbuffer => {
                self.gl
                    .framebuffer_renderbuffer(a.u32(0)?, a.u32(1)?, a.u32(2)?, a.i32(3)?)?;
            }
            ImportId::GlBufferData => {
                let data = self.arg_f32_view(&a, 1, a.u32(2)?)?;
                gl.buffer_data_f32(a.u32(0)?, &data, a.u32(3)?);
            }
            ImportId::GlGetAttribLocation => {
                let name = self.arg_string(&a, 1)?;
                let location = self.gl.get_attrib_location(a.u32(0)?, &name)?;
                return Ok(Some(f64::from(location)));
            }
            ImportId::GlGetUniformLocation => {
                let name = self.arg_string(&a, 1)?;
                return Ok(handle(self.gl.get_uniform_location(a.u32(0)?, &name)?));
            }
            ImportId::GlUniform1i => {
                gl.uniform1i(self.gl.uniform_location(a.u32(0)?)?, a.i32(1)?);
            }
            ImportId::GlUniform1f => {
                gl.uniform1f(self.gl.uniform_location(a.u32(0)?)?, a.f32(1)?);
            }
            ImportId::GlUniform1fv => {
                let data = self.arg_f32_view(&a, 1, a.u32(2)?)?;
                gl.uniform1fv(self.gl.uniform_location(a.u32(0)?)?, &data);
            }
            ImportId::GlUniform2fv => {
                gl.uniform2fv(self.gl.uniform_location(a.u32(0)?)?, [a.f32(1)?, a.f32(2)?]);
            }
            ImportId::GlUniform3fv => gl.uniform3fv(
                self.gl.uniform_location(a.u32(0)?)?,
                [a.f32(1)?, a.f32(2)?, a.f32(3)?],
            ),
            ImportId::GlUniform4fv => gl.uniform4fv(
                self.gl.uniform_location(a.u32(0)?)?,
                [a.f32(1)?, a.f32(2)?, a.f32(3)?, a.f32(4)?],
            ),
            ImportId::GlUniformMatrix4fv => {
                let data = self.arg_f32_view(&a, 2, 16)?;
                gl.uniform_matrix4fv(self.gl.uniform_location(a.u32(0)?)?, a.bool(1)?, &data);
            }
            ImportId::GlTexImage2DEmpty => {
                gl.tex_image_2d_pixels(consts::TEXTURE_2D, a.i32(0)?, a.i32(1)?, None);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{OverlayOp, VecMemory, test_bridge};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for id in ImportId::ALL {
            assert!(seen.insert(id.name()), "duplicate import {id}");
            assert_eq!(ImportId::from_name(id.name()), Some(*id));
        }
        assert_eq!(ImportId::from_name("glNope"), None);
    }

    #[test]
    fn arities_match_argument_layouts() {
        assert_eq!(ImportId::AddTextLine.arity(), 10);
        assert_eq!(ImportId::AddTextBox.arity(), 13);
        assert_eq!(ImportId::GlVertexAttribPointer.arity(), 6);
        assert_eq!(ImportId::GlCreateBuffer.arity(), 0);
    }

    fn put(mem: &VecMemory, ptr: u32, text: &str) -> [f64; 2] {
        mem.write_bytes(ptr, text.as_bytes()).unwrap();
        [f64::from(ptr), text.len() as f64]
    }

    #[test]
    fn shader_imports_allocate_handles() {
        let mut bridge = test_bridge();
        let mem = VecMemory::new(256);
        let [p, l] = put(&mem, 0, "void main(){}");
        bridge.attach_memory(mem);

        let vs = bridge
            .call_import(ImportId::CompileShader, &[p, l, f64::from(consts::VERTEX_SHADER)])
            .unwrap();
        let fs = bridge
            .call_import(ImportId::CompileShader, &[p, l, f64::from(consts::FRAGMENT_SHADER)])
            .unwrap();
        assert_eq!((vs, fs), (Some(0.0), Some(1.0)));
        let program = bridge
            .call_import(ImportId::LinkShaderProgram, &[0.0, 1.0])
            .unwrap();
        assert_eq!(program, Some(0.0));
    }

    #[test]
    fn compile_failure_is_thrown() {
        let mut bridge = test_bridge();
        bridge.forwarder().gl().fail_compile("syntax error");
        let mem = VecMemory::new(64);
        let [p, l] = put(&mem, 0, "oops");
        bridge.attach_memory(mem);
        let err = bridge
            .call_import(ImportId::CompileShader, &[p, l, 35633.0])
            .unwrap_err();
        assert_eq!(err.to_string(), "Error compiling shader: syntax error");
    }

    #[test]
    fn missing_or_nan_arguments_are_rejected() {
        let mut bridge = test_bridge();
        assert_eq!(
            bridge.call_import(ImportId::GlClear, &[]),
            Err(BridgeError::BadArgument {
                import: "glClear",
                index: 0
            })
        );
        assert_eq!(
            bridge.call_import(ImportId::GlViewport, &[0.0, 0.0, f64::NAN, 1.0]),
            Err(BridgeError::BadArgument {
                import: "glViewport",
                index: 2
            })
        );
    }

    #[test]
    fn plain_forwards_pass_arguments_through() {
        let mut bridge = test_bridge();
        bridge
            .call_import(ImportId::GlClearColor, &[0.0, 0.5, 1.0, 1.0])
            .unwrap();
        bridge
            .call_import(ImportId::GlDrawArrays, &[4.0, 0.0, 6.0])
            .unwrap();
        let status = bridge
            .call_import(ImportId::GlCheckFramebufferStatus, &[36160.0])
            .unwrap();
        assert_eq!(status, Some(f64::from(consts::FRAMEBUFFER_COMPLETE)));
        let calls = bridge.forwarder().gl().calls();
        assert!(calls.contains(&"clearColor(0, 0.5, 1, 1)".to_owned()));
        assert!(calls.contains(&"drawArrays(4, 0, 6)".to_owned()));
    }

    #[test]
    fn negative_bind_is_null() {
        let mut bridge = test_bridge();
        bridge
            .call_import(ImportId::GlBindFramebuffer, &[36160.0, -1.0])
            .unwrap();
        assert!(bridge
            .forwarder()
            .gl()
            .calls()
            .contains(&"bindFramebuffer(36160, None)".to_owned()));
        assert!(matches!(
            bridge.call_import(ImportId::GlBindTexture, &[3553.0, 7.0]),
            Err(BridgeError::InvalidHandle { handle: 7, .. })
        ));
    }

    #[test]
    fn buffer_data_reads_floats_from_guest_memory() {
        let mut bridge = test_bridge();
        let mem = VecMemory::new(64);
        let bytes: Vec<u8> = [1.0f32, 2.0, 3.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        mem.write_bytes(16, &bytes).unwrap();
        bridge.attach_memory(mem);
        bridge
            .call_import(ImportId::GlBufferData, &[34962.0, 16.0, 3.0, 35044.0])
            .unwrap();
        assert!(bridge
            .forwarder()
            .gl()
            .calls()
            .contains(&"bufferData(34962, [1.0, 2.0, 3.0], 35044)".to_owned()));
    }

    #[test]
    fn uniforms_go_to_translated_locations() {
        let mut bridge = test_bridge();
        let mem = VecMemory::new(128);
        let [sp, sl] = put(&mem, 0, "s");
        let [np, nl] = put(&mem, 8, "u_time");
        bridge.attach_memory(mem);
        bridge.call_import(ImportId::CompileShader, &[sp, sl, 35633.0]).unwrap();
        bridge.call_import(ImportId::CompileShader, &[sp, sl, 35632.0]).unwrap();
        bridge.call_import(ImportId::LinkShaderProgram, &[0.0, 1.0]).unwrap();
        let loc = bridge
            .call_import(ImportId::GlGetUniformLocation, &[0.0, np, nl])
            .unwrap();
        assert_eq!(loc, Some(0.0));
        bridge.call_import(ImportId::GlUniform1f, &[0.0, 2.5]).unwrap();
        assert!(bridge
            .forwarder()
            .gl()
            .calls()
            .contains(&"uniform1f(Some(u_time), 2.5)".to_owned()));
        assert!(bridge.call_import(ImportId::GlUniform1f, &[5.0, 1.0]).is_err());
    }

    #[test]
    fn text_line_import_positions_overlay() {
        let mut bridge = test_bridge();
        let mem = VecMemory::new(128);
        let [tp, tl] = put(&mem, 0, "Hello");
        let [cp, cl] = put(&mem, 16, "#fff");
        let [fp, fl] = put(&mem, 32, "Helvetica");
        bridge.attach_memory(mem);
        bridge
            .call_import(
                ImportId::AddTextLine,
                &[tp, tl, 50.0, 100.0, 20.0, 0.0, cp, cl, fp, fl],
            )
            .unwrap();
        match &bridge.overlays().surface().ops()[0] {
            OverlayOp::Text(class, node) => {
                assert_eq!(class, "_wasmText");
                assert_eq!(node.text, "Hello");
                assert_eq!(node.top, 80.0);
                assert_eq!(node.style.color, "#fff");
                assert_eq!(node.style.font_family, "Helvetica");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn get_uri_writes_path_or_zero() {
        let mut bridge = test_bridge();
        bridge.attach_memory(VecMemory::new(64));
        bridge.set_page_path("/portfolio");
        assert_eq!(
            bridge.call_import(ImportId::GetUri, &[0.0, 64.0]).unwrap(),
            Some(10.0)
        );
        assert_eq!(bridge.read_string(0, 10).unwrap(), "/portfolio");
        assert_eq!(
            bridge.call_import(ImportId::GetUri, &[0.0, 4.0]).unwrap(),
            Some(0.0)
        );
    }

    #[test]
    fn set_cursor_becomes_effect() {
        let mut bridge = test_bridge();
        bridge.call_import(ImportId::SetCursor, &[1.0]).unwrap();
        assert_eq!(
            bridge.take_effects(),
            vec![HostEffect::SetCursor(CursorKind::Pointer)]
        );
    }

    #[test]
    fn string_imports_need_memory() {
        let mut bridge = test_bridge();
        assert!(matches!(
            bridge.call_import(ImportId::ConsoleMessage, &[0.0, 0.0, 4.0]),
            Err(BridgeError::Memory(_))
        ));
    }
}
