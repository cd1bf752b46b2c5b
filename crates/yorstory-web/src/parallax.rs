#![forbid(unsafe_code)]

//! Landing-page parallax carousel.
//!
//! Layers are `<img>` elements inside the container, translated horizontally
//! with the pointer. Every `swapSeconds` the carousel moves to the next set,
//! but only once that set's images have been preloaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, EventTarget, HtmlElement, HtmlImageElement, MouseEvent, Window};
use yorstory_bridge::ParallaxConfig;
use yorstory_bridge::parallax::{self, Carousel, centered_left, layer_element_id, pointer_offset};
use yorstory_bridge::preload::{PreloadStep, SequencePreloader};

use crate::app::listen;
use crate::dom;

pub struct ParallaxPage {
    carousel: RefCell<Carousel>,
    preloader: RefCell<SequencePreloader>,
    // Preloaded images stay referenced so the browser keeps them decoded.
    images: RefCell<HashMap<String, HtmlImageElement>>,
    config: ParallaxConfig,
    window: Window,
    document: Document,
    container: HtmlElement,
}

impl ParallaxPage {
    pub fn start(
        container_id: &str,
        sets_json: &str,
        config: ParallaxConfig,
    ) -> Result<Rc<Self>, JsValue> {
        let to_js = |err: yorstory_bridge::ConfigError| JsValue::from_str(&err.to_string());
        let sets = parallax::parse_sets(sets_json).map_err(to_js)?;
        let carousel = Carousel::new(sets, &config).map_err(to_js)?;
        let preloader = SequencePreloader::new(carousel.preload_lists());

        let window = dom::window()?;
        let document = dom::document()?;
        let container = dom::element_by_id(&document, container_id)?;

        let page = Rc::new(Self {
            carousel: RefCell::new(carousel),
            preloader: RefCell::new(preloader),
            images: RefCell::new(HashMap::new()),
            config,
            window,
            document,
            container,
        });

        page.render_set()?;
        page.attach_pointer()?;
        let first = page.preloader.borrow_mut().start();
        page.preload(first)?;
        page.start_rotation()?;
        tracing::info!(
            sets = page.carousel.borrow().preload_lists().len(),
            "parallax started"
        );
        Ok(page)
    }

    /// Replace the layer elements with the current set's.
    fn render_set(&self) -> Result<(), JsValue> {
        dom::remove_by_class(&self.document, &self.config.image_class);

        let carousel = self.carousel.borrow();
        let set = carousel.current();
        let (color, image) = set.background.css();
        let style = self.container.style();
        style.set_property("background-color", &color)?;
        style.set_property("background-image", &image)?;

        for (index, layer) in set.layers.iter().enumerate() {
            let img = HtmlImageElement::new()?;
            img.set_id(&layer_element_id(&self.config.image_class, index));
            img.set_class_name(&self.config.image_class);
            img.style().set_property("position", "absolute")?;
            img.style().set_property("height", "100%")?;

            let container = self.container.clone();
            let target = img.clone();
            let center = Closure::once_into_js(move || {
                let left = centered_left(
                    f64::from(container.offset_width()),
                    f64::from(target.width()),
                );
                if let Err(err) = target.style().set_property("left", &format!("{left}px")) {
                    tracing::warn!(error = ?err, "parallax layer not centred");
                }
            });
            img.set_onload(Some(center.unchecked_ref()));
            img.set_src(&layer.url);
            self.container.append_child(&img)?;
        }
        drop(carousel);
        self.apply_transforms();
        tracing::debug!(set = self.carousel.borrow().current_index(), "parallax set shown");
        Ok(())
    }

    fn apply_transforms(&self) {
        let transforms = self.carousel.borrow().layer_transforms();
        for (index, transform) in transforms.iter().enumerate() {
            let id = layer_element_id(&self.config.image_class, index);
            let Some(element) = self
                .document
                .get_element_by_id(&id)
                .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            else {
                continue;
            };
            if let Err(err) = element.style().set_property("transform", transform) {
                tracing::warn!(id = %id, error = ?err, "parallax transform not applied");
            }
        }
    }

    fn attach_pointer(self: &Rc<Self>) -> Result<(), JsValue> {
        let page = Rc::clone(self);
        let window: &EventTarget = self.window.as_ref();
        listen(window, "mousemove", move |event: MouseEvent| {
            let inner_width = page
                .window
                .inner_width()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let offset = pointer_offset(f64::from(event.client_x()), inner_width);
            page.carousel.borrow_mut().set_pointer(offset);
            page.apply_transforms();
        })
    }

    fn start_rotation(self: &Rc<Self>) -> Result<(), JsValue> {
        let page = Rc::clone(self);
        let rotate = Closure::wrap(Box::new(move || {
            let ready = page.preloader.borrow().completed();
            let advanced = page.carousel.borrow_mut().advance_if_ready(ready).is_some();
            if advanced {
                if let Err(err) = page.render_set() {
                    tracing::error!(error = ?err, "parallax set not rendered");
                }
            }
        }) as Box<dyn FnMut()>);
        let millis = (self.config.swap_seconds * 1000.0).round() as i32;
        self.window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                rotate.as_ref().unchecked_ref(),
                millis,
            )?;
        rotate.forget();
        Ok(())
    }

    fn preload(self: &Rc<Self>, step: PreloadStep) -> Result<(), JsValue> {
        for list in step.completed {
            tracing::debug!(list, "parallax set preloaded");
        }
        for url in step.requests {
            let image = HtmlImageElement::new()?;
            let page = Rc::clone(self);
            let loaded_url = url.clone();
            let on_load = Closure::once_into_js(move || {
                let next = page.preloader.borrow_mut().on_loaded(&loaded_url);
                if let Err(err) = page.preload(next) {
                    tracing::error!(error = ?err, "parallax preload stopped");
                }
            });
            image.set_onload(Some(on_load.unchecked_ref()));
            image.set_src(&url);
            self.images.borrow_mut().insert(url, image);
        }
        Ok(())
    }
}
