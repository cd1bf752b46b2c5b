#![forbid(unsafe_code)]

//! wasm-bindgen entry points.

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yorstory_bridge::{BridgeConfig, ParallaxConfig};

use crate::app::App;
use crate::fetch::describe;
use crate::parallax::ParallaxPage;

fn console_error(msg: &str) {
    web_sys::console::error_1(&JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

/// Serialise a JS options object so serde can read it. `undefined` and
/// `null` become the empty string, which selects the defaults.
fn options_json(options: &JsValue) -> Result<String, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(String::new());
    }
    if let Some(text) = options.as_string() {
        return Ok(text);
    }
    js_sys::JSON::stringify(options).map(String::from)
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

/// Acquire the canvas, load the guest module and run it.
///
/// Returns once the canvas and listeners are set up; the guest loads in the
/// background and failures are logged to the console.
#[wasm_bindgen(js_name = wasmInit)]
pub fn wasm_init(options: JsValue) -> Result<(), JsValue> {
    install_panic_hook();
    let config = BridgeConfig::from_json(&options_json(&options)?)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    crate::logging::init(&config.log_level);

    let app = App::new(config)?;
    app.attach_listeners()?;
    spawn_local(async move {
        if let Err(err) = app.run().await {
            tracing::error!(error = %describe(&err), "guest failed to start");
        }
    });
    Ok(())
}

/// Start the parallax carousel in `container_id` with the given image sets.
#[wasm_bindgen(js_name = startParallax)]
pub fn start_parallax(container_id: &str, sets_json: &str, options: JsValue) -> Result<(), JsValue> {
    install_panic_hook();
    let config = ParallaxConfig::from_json(&options_json(&options)?)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    crate::logging::init("info");
    ParallaxPage::start(container_id, sets_json, config)?;
    Ok(())
}
