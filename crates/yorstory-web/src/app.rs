#![forbid(unsafe_code)]

//! The running page: bridge, frame driver and guest, wired to the browser.
//!
//! Borrow discipline: a `RefCell` borrow of the bridge is never held across a
//! call into the guest, because the guest calls straight back into the bridge
//! through its imports.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Event, EventTarget, HtmlCanvasElement, HtmlElement, HtmlImageElement,
    KeyboardEvent, MouseEvent, Window,
};
use yorstory_bridge::frame::canvas_y;
use yorstory_bridge::overlay::px;
use yorstory_bridge::texture::{ImageRequest, MetadataRequest};
use yorstory_bridge::{
    Bridge, BridgeConfig, BridgeError, FrameDriver, FrameHost, GuestExports, HostEffect,
    InputEvent, TextureMetadata, TextureReady,
};

use crate::dom::{self, DomOverlay};
use crate::fetch::{self, describe};
use crate::guest::{self, WasmGuest};
use crate::memory::WasmMemory;
use crate::webgl::WebGl;

pub type PageBridge = Bridge<WebGl, WasmMemory, DomOverlay>;

pub struct App {
    pub(crate) bridge: RefCell<PageBridge>,
    driver: RefCell<FrameDriver>,
    guest: RefCell<Option<Rc<WasmGuest>>>,
    config: BridgeConfig,
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
    spacer: HtmlElement,
}

impl App {
    /// Acquire the canvas and GL context. The driver enters `Loading`.
    pub fn new(config: BridgeConfig) -> Result<Rc<Self>, JsValue> {
        let window = dom::window()?;
        let document = dom::document()?;
        let canvas = dom::canvas_by_id(&document, &config.canvas_id)?;
        let spacer = dom::element_by_id(&document, &config.spacer_id)?;

        let gl = WebGl::from_canvas(&canvas)?;
        let overlay = DomOverlay::new(document.clone(), &config.overlay_parent_id);
        let mut bridge = Bridge::new(gl, overlay, &config);
        if let Ok(path) = window.location().pathname() {
            bridge.set_page_path(&path);
        }
        let (width, height) = dom::fit_canvas_to_window(&window, &canvas);
        bridge.resize_viewport(width, height);

        let mut driver = FrameDriver::new();
        driver.begin_loading();

        Ok(Rc::new(Self {
            bridge: RefCell::new(bridge),
            driver: RefCell::new(driver),
            guest: RefCell::new(None),
            config,
            window,
            document,
            canvas,
            spacer,
        }))
    }

    /// Instantiate the guest, initialise it and start the frame loop.
    pub async fn run(self: Rc<Self>) -> Result<(), JsValue> {
        let memory = self
            .config
            .memory_pages()
            .map(WasmMemory::with_pages)
            .transpose()?;
        if let Some(pages) = self.config.memory_pages() {
            tracing::info!(pages, "allocated guest memory");
        }

        let (guest, memory) = guest::instantiate(&self, &self.config.module_url, memory).await?;
        self.bridge.borrow_mut().attach_memory(memory);
        let guest = Rc::new(guest);
        *self.guest.borrow_mut() = Some(Rc::clone(&guest));

        let started = self.driver.borrow_mut().start(&*guest);
        started.map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.start_frame_loop(guest)
    }

    fn start_frame_loop(self: &Rc<Self>, guest: Rc<WasmGuest>) -> Result<(), JsValue> {
        let next: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let first = Rc::clone(&next);
        let app = Rc::clone(self);

        *first.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            let mut host = PageHost { app: &app };
            let ticked = app
                .driver
                .borrow_mut()
                .tick(&mut host, &*guest, timestamp);
            if let Err(err) = ticked {
                tracing::error!(error = %err, "frame loop stopped");
                return;
            }
            if let Some(callback) = next.borrow().as_ref() {
                if let Err(err) = request_animation_frame(&app.window, callback) {
                    tracing::error!(error = %describe(&err), "frame loop stopped");
                }
            }
        }) as Box<dyn FnMut(f64)>));

        match first.borrow().as_ref() {
            Some(callback) => request_animation_frame(&self.window, callback),
            None => Ok(()),
        }
    }

    /// Attach input and resize listeners. Input reaching the page before the
    /// guest runs is dropped.
    pub fn attach_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let canvas: &EventTarget = self.canvas.as_ref();

        let app = Rc::clone(self);
        listen(canvas, "mousemove", move |event: MouseEvent| {
            let (x, y) = app.canvas_point(&event);
            app.forward(InputEvent::MouseMove { x, y });
        })?;
        let app = Rc::clone(self);
        listen(canvas, "mousedown", move |event: MouseEvent| {
            let (x, y) = app.canvas_point(&event);
            app.forward(InputEvent::MouseDown {
                button: event.button(),
                x,
                y,
            });
        })?;
        let app = Rc::clone(self);
        listen(canvas, "mouseup", move |event: MouseEvent| {
            let (x, y) = app.canvas_point(&event);
            app.forward(InputEvent::MouseUp {
                button: event.button(),
                x,
                y,
            });
        })?;

        let window: &EventTarget = self.window.as_ref();
        let app = Rc::clone(self);
        listen(window, "keydown", move |event: KeyboardEvent| {
            app.forward(InputEvent::KeyDown {
                key_code: event.key_code(),
            });
        })?;
        let app = Rc::clone(self);
        listen(window, "resize", move |_: Event| {
            let (width, height) = dom::fit_canvas_to_window(&app.window, &app.canvas);
            app.bridge.borrow().resize_viewport(width, height);
            tracing::debug!(width, height, "canvas resized");
        })?;
        Ok(())
    }

    fn canvas_point(&self, event: &MouseEvent) -> (f64, f64) {
        let inner_height = dom::inner_height(&self.window);
        (
            f64::from(event.client_x()),
            canvas_y(f64::from(event.client_y()), inner_height),
        )
    }

    fn forward(&self, event: InputEvent) {
        let guest = self.guest.borrow().clone();
        let Ok(driver) = self.driver.try_borrow() else {
            return;
        };
        if let Err(err) = driver.dispatch_input(guest.as_deref(), event) {
            tracing::error!(error = %err, ?event, "input handler failed");
        }
    }

    /// Perform the effects raised by the last bridge call.
    pub fn dispatch_effects(self: &Rc<Self>) {
        let effects = match self.bridge.try_borrow_mut() {
            Ok(mut bridge) => bridge.take_effects(),
            Err(_) => return,
        };
        for effect in effects {
            match effect {
                HostEffect::SetCursor(cursor) => dom::set_cursor(&self.canvas, cursor),
                HostEffect::FetchMetadata(request) => self.fetch_metadata(request),
                HostEffect::FetchImage(request) => self.fetch_image(request),
            }
        }
    }

    fn fetch_metadata(self: &Rc<Self>, request: MetadataRequest) {
        let app = Rc::clone(self);
        spawn_local(async move {
            match fetch::fetch_metadata(&request.url).await {
                Ok(meta) => app.metadata_arrived(request.texture, meta),
                Err(err) => app.load_failed(request.texture, &describe(&err)),
            }
        });
    }

    fn fetch_image(self: &Rc<Self>, request: ImageRequest) {
        let app = Rc::clone(self);
        spawn_local(async move {
            match fetch::load_image(&request.url).await {
                Ok(image) => app.image_arrived(request.texture, request.chunk, image),
                Err(err) => app.load_failed(request.texture, &describe(&err)),
            }
        });
    }

    fn load_failed(&self, texture: u32, reason: &str) {
        tracing::warn!(texture, reason, "texture fetch failed");
        self.bridge.borrow_mut().texture_load_failed(texture, reason);
    }

    fn metadata_arrived(self: &Rc<Self>, texture: u32, meta: TextureMetadata) {
        let loaded = self
            .bridge
            .borrow_mut()
            .texture_metadata_loaded(texture, meta);
        if let Err(err) = loaded {
            tracing::error!(texture, error = %err, "texture load abandoned");
        }
        self.dispatch_effects();
    }

    fn image_arrived(self: &Rc<Self>, texture: u32, chunk: Option<u32>, image: HtmlImageElement) {
        let (width, height) = (image.natural_width(), image.natural_height());
        let uploaded = self
            .bridge
            .borrow_mut()
            .texture_image_loaded(texture, chunk, image, width, height);
        match uploaded {
            Ok(Some(ready)) => self.notify_texture_ready(ready),
            Ok(None) => {}
            Err(err) => tracing::error!(texture, error = %err, "texture image dropped"),
        }
    }

    fn notify_texture_ready(self: &Rc<Self>, ready: TextureReady) {
        let guest = self.guest.borrow().clone();
        if let Some(guest) = guest {
            if let Err(err) = guest.on_texture_loaded(ready) {
                tracing::error!(texture = ready.texture, error = %err, "onTextureLoaded failed");
            }
        }
        self.dispatch_effects();
    }

    fn scroll_y(&self) -> f64 {
        let root = self
            .document
            .document_element()
            .map_or(0, |element| element.scroll_top());
        let scroll = if root != 0 {
            root
        } else {
            self.document.body().map_or(0, |body| body.scroll_top())
        };
        f64::from(scroll)
    }
}

/// [`FrameHost`] view of the page for one tick.
struct PageHost<'a> {
    app: &'a App,
}

impl FrameHost for PageHost<'_> {
    fn pump_texture_job(&mut self) -> Result<Option<TextureReady>, BridgeError> {
        self.app.bridge.borrow_mut().pump_texture_job()
    }

    fn scroll_y(&self) -> f64 {
        self.app.scroll_y()
    }

    fn canvas_size(&self) -> (u32, u32) {
        (self.app.canvas.width(), self.app.canvas.height())
    }

    fn set_spacer_height(&mut self, height: f64) {
        if let Err(err) = self.app.spacer.style().set_property("height", &px(height)) {
            tracing::warn!(error = %describe(&err), "spacer not resized");
        }
    }
}

fn request_animation_frame(window: &Window, callback: &Closure<dyn FnMut(f64)>) -> Result<(), JsValue> {
    window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map(drop)
}

/// Add a listener that lives as long as the page.
pub fn listen<E>(
    target: &EventTarget,
    name: &str,
    mut handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue>
where
    E: JsCast + 'static,
{
    let closure = Closure::wrap(Box::new(move |event: Event| {
        if let Ok(event) = event.dyn_into::<E>() {
            handler(event);
        }
    }) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
