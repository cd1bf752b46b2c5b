#![forbid(unsafe_code)]

//! Guest module instantiation: the `env` import object and typed exports.

use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect, WebAssembly};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use yorstory_bridge::{BridgeError, GuestExports, ImportId, InputEvent, TextureReady};

use crate::app::App;
use crate::fetch::describe;
use crate::memory::WasmMemory;

/// Wraps a one-argument function so it receives all call arguments as an array.
const VARIADIC_SHIM: &str =
    "return function() { return f(Array.prototype.slice.call(arguments)); };";

fn arg_number(value: &JsValue) -> f64 {
    value
        .as_f64()
        .or_else(|| value.as_bool().map(|b| if b { 1.0 } else { 0.0 }))
        .unwrap_or(f64::NAN)
}

fn import_function(app: &Rc<App>, id: ImportId) -> Result<JsValue, JsValue> {
    let app = Rc::clone(app);
    let closure = Closure::wrap(Box::new(move |args: Array| -> Result<JsValue, JsValue> {
        let values: Vec<f64> = args.iter().map(|v| arg_number(&v)).collect();
        let result = app.bridge.borrow_mut().call_import(id, &values);
        app.dispatch_effects();
        match result {
            Ok(Some(value)) => Ok(JsValue::from_f64(value)),
            Ok(None) => Ok(JsValue::UNDEFINED),
            Err(err) => {
                tracing::error!(import = id.name(), error = %err, "import failed");
                Err(js_sys::Error::new(&err.to_string()).into())
            }
        }
    }) as Box<dyn FnMut(Array) -> Result<JsValue, JsValue>>);

    let shim = Function::new_with_args("f", VARIADIC_SHIM);
    let function = shim.call1(&JsValue::NULL, closure.as_ref())?;
    // Imports live as long as the page.
    closure.forget();
    Ok(function)
}

/// Build `{ env: { ...imports, memory? } }`.
pub fn import_object(app: &Rc<App>, memory: Option<&WasmMemory>) -> Result<Object, JsValue> {
    let env = Object::new();
    for &id in ImportId::ALL {
        Reflect::set(&env, &id.name().into(), &import_function(app, id)?)?;
    }
    if let Some(memory) = memory {
        Reflect::set(&env, &"memory".into(), memory.raw())?;
    }
    let imports = Object::new();
    Reflect::set(&imports, &"env".into(), &env)?;
    Ok(imports)
}

fn export_function(exports: &JsValue, name: &str) -> Result<Option<Function>, JsValue> {
    let value = Reflect::get(exports, &name.into())?;
    if value.is_undefined() {
        return Ok(None);
    }
    value
        .dyn_into::<Function>()
        .map(Some)
        .map_err(|_| JsValue::from_str(&format!("export {name} is not a function")))
}

fn required(exports: &JsValue, name: &str) -> Result<Function, JsValue> {
    export_function(exports, name)?
        .ok_or_else(|| JsValue::from_str(&format!("guest does not export {name}")))
}

fn guest_error(err: JsValue) -> BridgeError {
    BridgeError::Guest(describe(&err))
}

/// The guest's exported entry points.
pub struct WasmGuest {
    on_init: Function,
    on_animation_frame: Function,
    on_mouse_move: Option<Function>,
    on_mouse_down: Option<Function>,
    on_mouse_up: Option<Function>,
    on_key_down: Option<Function>,
    on_texture_loaded: Option<Function>,
}

impl WasmGuest {
    fn from_exports(exports: &JsValue) -> Result<Self, JsValue> {
        Ok(Self {
            on_init: required(exports, "onInit")?,
            on_animation_frame: required(exports, "onAnimationFrame")?,
            on_mouse_move: export_function(exports, "onMouseMove")?,
            on_mouse_down: export_function(exports, "onMouseDown")?,
            on_mouse_up: export_function(exports, "onMouseUp")?,
            on_key_down: export_function(exports, "onKeyDown")?,
            on_texture_loaded: export_function(exports, "onTextureLoaded")?,
        })
    }

    fn call(function: &Function, args: &[f64]) -> Result<JsValue, BridgeError> {
        let args: Array = args.iter().map(|&v| JsValue::from_f64(v)).collect();
        function.apply(&JsValue::NULL, &args).map_err(guest_error)
    }

    fn call_optional(function: Option<&Function>, args: &[f64]) -> Result<(), BridgeError> {
        match function {
            Some(function) => Self::call(function, args).map(drop),
            None => Ok(()),
        }
    }
}

impl GuestExports for WasmGuest {
    fn on_init(&self) -> Result<(), BridgeError> {
        Self::call(&self.on_init, &[]).map(drop)
    }

    fn on_animation_frame(
        &self,
        width: u32,
        height: u32,
        scroll_y: f64,
        timestamp_ms: f64,
    ) -> Result<f64, BridgeError> {
        let total = Self::call(
            &self.on_animation_frame,
            &[f64::from(width), f64::from(height), scroll_y, timestamp_ms],
        )?;
        Ok(total.as_f64().unwrap_or(0.0))
    }

    fn on_input(&self, event: InputEvent) -> Result<(), BridgeError> {
        match event {
            InputEvent::MouseMove { x, y } => {
                Self::call_optional(self.on_mouse_move.as_ref(), &[x, y])
            }
            InputEvent::MouseDown { button, x, y } => Self::call_optional(
                self.on_mouse_down.as_ref(),
                &[f64::from(button), x, y],
            ),
            InputEvent::MouseUp { button, x, y } => {
                Self::call_optional(self.on_mouse_up.as_ref(), &[f64::from(button), x, y])
            }
            InputEvent::KeyDown { key_code } => {
                Self::call_optional(self.on_key_down.as_ref(), &[f64::from(key_code)])
            }
        }
    }

    fn on_texture_loaded(&self, ready: TextureReady) -> Result<(), BridgeError> {
        Self::call_optional(
            self.on_texture_loaded.as_ref(),
            &[
                f64::from(ready.texture),
                f64::from(ready.width),
                f64::from(ready.height),
            ],
        )
    }
}

/// Fetch, compile and instantiate the guest.
///
/// Returns its exports and the memory imports should read: the host-created
/// one when `memory` is given, otherwise the guest's exported `memory`.
pub async fn instantiate(
    app: &Rc<App>,
    module_url: &str,
    memory: Option<WasmMemory>,
) -> Result<(WasmGuest, WasmMemory), JsValue> {
    let imports = import_object(app, memory.as_ref())?;
    let window = crate::dom::window()?;
    let source = window.fetch_with_str(module_url);
    let result = JsFuture::from(WebAssembly::instantiate_streaming(&source, &imports)).await?;
    let instance: WebAssembly::Instance = Reflect::get(&result, &"instance".into())?.dyn_into()?;
    let exports: JsValue = instance.exports().into();

    let memory = match memory {
        Some(memory) => memory,
        None => {
            let exported: WebAssembly::Memory =
                Reflect::get(&exports, &"memory".into())?
                    .dyn_into()
                    .map_err(|_| JsValue::from_str("guest exports no memory"))?;
            WasmMemory::new(exported)
        }
    };
    tracing::info!(module_url, "guest instantiated");
    Ok((WasmGuest::from_exports(&exports)?, memory))
}
