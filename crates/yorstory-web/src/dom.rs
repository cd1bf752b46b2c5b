#![forbid(unsafe_code)]

//! DOM side of the page: overlay nodes, the scroll spacer, canvas sizing.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement, HtmlIFrameElement, Window};
use yorstory_bridge::CursorKind;
use yorstory_bridge::overlay::{EmbedNode, OverlaySurface, TextNode, px};

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

pub fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

pub fn element_by_id(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element #{id}")))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("#{id} is not an HTML element")))
}

pub fn canvas_by_id(document: &Document, id: &str) -> Result<HtmlCanvasElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no canvas #{id}")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("#{id} is not a canvas")))
}

/// Remove every element carrying `class`.
pub fn remove_by_class(document: &Document, class: &str) {
    // The collection is live: removing item 0 shifts the rest down.
    let nodes = document.get_elements_by_class_name(class);
    while let Some(node) = nodes.item(0) {
        node.remove();
    }
}

/// Match the canvas backing store to the window's inner size.
pub fn fit_canvas_to_window(window: &Window, canvas: &HtmlCanvasElement) -> (u32, u32) {
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);
    (canvas.width(), canvas.height())
}

pub fn inner_height(window: &Window) -> f64 {
    window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

pub fn set_cursor(canvas: &HtmlCanvasElement, cursor: CursorKind) {
    if let Err(err) = canvas.style().set_property("cursor", cursor.as_css()) {
        tracing::warn!(error = ?err, "cursor not set");
    }
}

fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = element.style();
    for (name, value) in styles {
        style.set_property(name, value)?;
    }
    Ok(())
}

/// Appends overlay nodes under one parent element.
pub struct DomOverlay {
    document: Document,
    parent_id: String,
}

impl DomOverlay {
    pub fn new(document: Document, parent_id: &str) -> Self {
        Self {
            document,
            parent_id: parent_id.to_owned(),
        }
    }

    fn create(&self, tag: &str) -> Result<HtmlElement, JsValue> {
        self.document
            .create_element(tag)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| JsValue::from_str(tag))
    }

    fn parent(&self) -> Result<Element, JsValue> {
        self.document
            .get_element_by_id(&self.parent_id)
            .ok_or_else(|| JsValue::from_str(&format!("no overlay parent #{}", self.parent_id)))
    }

    fn build_text(&self, class: &str, node: &TextNode) -> Result<(), JsValue> {
        let div = self.create("div")?;
        div.set_class_name(class);
        let top = px(node.top);
        let left = px(node.left);
        set_styles(&div, &[("position", "absolute"), ("top", &top), ("left", &left)])?;
        if let Some(width) = node.width {
            let width = px(width);
            set_styles(
                &div,
                &[("width", &width), ("text-align", node.align.as_css())],
            )?;
        }

        let span = self.create("span")?;
        span.set_text_content(Some(&node.text));
        let font_size = px(node.style.font_size);
        let letter_spacing = px(node.style.letter_spacing);
        set_styles(
            &span,
            &[
                ("font-size", &font_size),
                ("letter-spacing", &letter_spacing),
                ("vertical-align", "baseline"),
            ],
        )?;
        if !node.style.color.is_empty() {
            set_styles(&span, &[("color", &node.style.color)])?;
        }
        if !node.style.font_family.is_empty() {
            set_styles(&span, &[("font-family", &node.style.font_family)])?;
        }
        if let Some(line_height) = node.line_height {
            let line_height = px(line_height);
            set_styles(&span, &[("line-height", &line_height)])?;
        }

        div.append_child(&span)?;
        self.parent()?.append_child(&div)?;
        Ok(())
    }

    fn build_embed(&self, class: &str, node: &EmbedNode) -> Result<(), JsValue> {
        let iframe = self
            .document
            .create_element("iframe")?
            .dyn_into::<HtmlIFrameElement>()
            .map_err(|_| JsValue::from_str("iframe"))?;
        iframe.set_class_name(class);
        iframe.set_src(&node.src);
        iframe.set_width(&node.width.to_string());
        iframe.set_height(&node.height.to_string());
        iframe.set_allow_fullscreen(true);
        iframe.set_attribute("frameborder", "0")?;
        let top = px(node.top);
        let left = px(node.left);
        let style = iframe.style();
        style.set_property("position", "absolute")?;
        style.set_property("top", &top)?;
        style.set_property("left", &left)?;
        self.parent()?.append_child(&iframe)?;
        Ok(())
    }
}

impl OverlaySurface for DomOverlay {
    fn remove_class(&mut self, class: &str) {
        remove_by_class(&self.document, class);
    }

    fn append_text(&mut self, class: &str, node: &TextNode) {
        if let Err(err) = self.build_text(class, node) {
            tracing::error!(error = ?err, "text overlay not added");
        }
    }

    fn append_embed(&mut self, class: &str, node: &EmbedNode) {
        if let Err(err) = self.build_embed(class, node) {
            tracing::error!(error = ?err, "embed overlay not added");
        }
    }
}
