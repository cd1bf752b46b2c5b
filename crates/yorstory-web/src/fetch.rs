#![forbid(unsafe_code)]

//! Network side of texture streaming.

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlImageElement, Response};
use yorstory_bridge::TextureMetadata;

async fn fetch_ok(url: &str) -> Result<Response, JsValue> {
    let window = crate::dom::window()?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!(
            "GET {url}: HTTP {}",
            response.status()
        )));
    }
    Ok(response)
}

/// GET `url` as text.
pub async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let response = fetch_ok(url).await?;
    let text = JsFuture::from(response.text()?).await?;
    text.as_string()
        .ok_or_else(|| JsValue::from_str("response body is not text"))
}

/// GET and parse texture metadata (`{width, height, chunkSize}`).
pub async fn fetch_metadata(url: &str) -> Result<TextureMetadata, JsValue> {
    let body = fetch_text(url).await?;
    TextureMetadata::from_json(&body).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Load and decode an image. Resolves once it can be uploaded.
pub async fn load_image(url: &str) -> Result<HtmlImageElement, JsValue> {
    let image = HtmlImageElement::new()?;
    image.set_src(url);
    JsFuture::from(image.decode()).await?;
    Ok(image)
}

/// Render a JS error for logs.
pub fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            err.dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{err:?}"))
}
