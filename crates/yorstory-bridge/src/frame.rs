#![forbid(unsafe_code)]

//! Guest lifecycle and the per-frame schedule.
//!
//! [`FrameDriver`] owns no platform objects. The web frontend supplies the
//! page side through [`FrameHost`] and the instantiated guest through
//! [`GuestExports`], then calls [`FrameDriver::tick`] from
//! `requestAnimationFrame`.

use crate::error::BridgeError;
use crate::texture::TextureReady;

/// Lifecycle of the page's guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// Nothing acquired yet.
    #[default]
    Uninitialized,
    /// Canvas and GL context exist; the guest module is being fetched.
    Loading,
    /// The guest is instantiated and initialised; frames are running.
    Running,
}

/// Input forwarded to the guest, in canvas coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseMove { x: f64, y: f64 },
    MouseDown { button: i16, x: f64, y: f64 },
    MouseUp { button: i16, x: f64, y: f64 },
    KeyDown { key_code: u32 },
}

/// Convert a DOM client y coordinate to the canvas's bottom-left origin.
#[must_use]
pub fn canvas_y(client_y: f64, inner_height: f64) -> f64 {
    inner_height - client_y
}

/// The guest module's exports.
///
/// Input and texture callbacks are optional exports; implementations return
/// `Ok(())` when the guest does not define them.
pub trait GuestExports {
    fn on_init(&self) -> Result<(), BridgeError>;

    /// Render one frame; returns the total content height in CSS pixels.
    fn on_animation_frame(
        &self,
        width: u32,
        height: u32,
        scroll_y: f64,
        timestamp_ms: f64,
    ) -> Result<f64, BridgeError>;

    fn on_input(&self, event: InputEvent) -> Result<(), BridgeError>;

    fn on_texture_loaded(&self, ready: TextureReady) -> Result<(), BridgeError>;
}

/// Page-side services needed once per frame.
pub trait FrameHost {
    /// Upload at most one queued texture chunk.
    fn pump_texture_job(&mut self) -> Result<Option<TextureReady>, BridgeError>;
    fn scroll_y(&self) -> f64;
    fn canvas_size(&self) -> (u32, u32);
    fn set_spacer_height(&mut self, height: f64);
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    pub texture_ready: Option<TextureReady>,
    pub total_height: f64,
    pub spacer_resized: bool,
}

#[derive(Debug, Default)]
pub struct FrameDriver {
    state: DriverState,
    last_height: f64,
    frames: u64,
}

impl FrameDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Height the spacer was last resized to (0 before the first resize).
    #[must_use]
    pub fn last_height(&self) -> f64 {
        self.last_height
    }

    /// The canvas and GL context are ready. Returns `false` if called twice.
    pub fn begin_loading(&mut self) -> bool {
        if self.state != DriverState::Uninitialized {
            return false;
        }
        self.state = DriverState::Loading;
        tracing::debug!("frame driver loading");
        true
    }

    /// The guest is instantiated and its memory attached: initialise it.
    ///
    /// `onInit` runs once; later calls are ignored.
    pub fn start<X: GuestExports>(&mut self, guest: &X) -> Result<(), BridgeError> {
        if self.state == DriverState::Running {
            return Ok(());
        }
        guest.on_init()?;
        self.state = DriverState::Running;
        tracing::info!("guest initialised");
        Ok(())
    }

    /// Forward an input event. Events arriving before the guest runs are
    /// dropped, not queued. Returns whether the event was delivered.
    pub fn dispatch_input<X: GuestExports>(
        &self,
        guest: Option<&X>,
        event: InputEvent,
    ) -> Result<bool, BridgeError> {
        match guest {
            Some(guest) if self.state == DriverState::Running => {
                guest.on_input(event)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Run one animation frame.
    ///
    /// Order: pump one texture job (notifying the guest on completion), read
    /// the scroll offset, render, then resize the spacer if the content
    /// height changed to a nonzero value.
    pub fn tick<H: FrameHost, X: GuestExports>(
        &mut self,
        host: &mut H,
        guest: &X,
        timestamp_ms: f64,
    ) -> Result<FrameReport, BridgeError> {
        let mut report = FrameReport::default();
        if self.state != DriverState::Running {
            return Ok(report);
        }

        match host.pump_texture_job() {
            Ok(Some(ready)) => {
                guest.on_texture_loaded(ready)?;
                report.texture_ready = Some(ready);
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "texture job dropped"),
        }

        let scroll_y = host.scroll_y();
        let (width, height) = host.canvas_size();
        let total_height = guest.on_animation_frame(width, height, scroll_y, timestamp_ms)?;
        report.total_height = total_height;

        if total_height != 0.0 && total_height != self.last_height {
            self.last_height = total_height;
            host.set_spacer_height(total_height);
            report.spacer_resized = true;
            tracing::trace!(total_height, "spacer resized");
        }

        self.frames += 1;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingGuest, RecordingHost};
    use pretty_assertions::assert_eq;

    fn running(guest: &RecordingGuest) -> FrameDriver {
        let mut driver = FrameDriver::new();
        assert!(driver.begin_loading());
        driver.start(guest).unwrap();
        driver
    }

    #[test]
    fn lifecycle_moves_forward_once() {
        let guest = RecordingGuest::default();
        let mut driver = FrameDriver::new();
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert!(driver.begin_loading());
        assert!(!driver.begin_loading());
        driver.start(&guest).unwrap();
        driver.start(&guest).unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(guest.calls(), vec!["onInit()".to_owned()]);
    }

    #[test]
    fn input_before_guest_is_dropped() {
        let guest = RecordingGuest::default();
        let mut driver = FrameDriver::new();
        driver.begin_loading();
        let event = InputEvent::KeyDown { key_code: 32 };
        assert!(!driver.dispatch_input(None::<&RecordingGuest>, event).unwrap());
        assert!(!driver.dispatch_input(Some(&guest), event).unwrap());
        driver.start(&guest).unwrap();
        assert!(driver.dispatch_input(Some(&guest), event).unwrap());
        assert_eq!(guest.calls(), vec!["onInit()".to_owned(), "onKeyDown(32)".to_owned()]);
    }

    #[test]
    fn tick_runs_steps_in_order() {
        let guest = RecordingGuest::with_heights(vec![1200.0]);
        let mut driver = running(&guest);
        let mut host = RecordingHost::new(800, 600, 35.0);
        host.push_ready(TextureReady {
            texture: 3,
            width: 64,
            height: 64,
        });
        let report = driver.tick(&mut host, &guest, 16.0).unwrap();
        assert_eq!(report.texture_ready.map(|r| r.texture), Some(3));
        assert_eq!(
            guest.calls(),
            vec![
                "onInit()".to_owned(),
                "onTextureLoaded(3, 64, 64)".to_owned(),
                "onAnimationFrame(800, 600, 35, 16)".to_owned(),
            ]
        );
        assert_eq!(host.spacer_heights(), vec![1200.0]);
    }

    #[test]
    fn spacer_only_resized_on_nonzero_change() {
        let guest = RecordingGuest::with_heights(vec![0.0, 900.0, 900.0, 0.0, 1000.0]);
        let mut driver = running(&guest);
        let mut host = RecordingHost::new(100, 100, 0.0);
        let resized: Vec<bool> = (0..5)
            .map(|i| driver.tick(&mut host, &guest, f64::from(i)).unwrap().spacer_resized)
            .collect();
        assert_eq!(resized, vec![false, true, false, false, true]);
        assert_eq!(host.spacer_heights(), vec![900.0, 1000.0]);
        assert_eq!(driver.last_height(), 1000.0);
        assert_eq!(driver.frames(), 5);
    }

    #[test]
    fn guest_frame_error_stops_the_tick() {
        let guest = RecordingGuest::with_heights(vec![700.0]);
        let mut driver = running(&guest);
        let mut host = RecordingHost::new(320, 240, 0.0);
        guest.fail_frames();
        assert_eq!(
            driver.tick(&mut host, &guest, 5.0),
            Err(BridgeError::Guest("onAnimationFrame trapped".to_owned()))
        );
        assert_eq!(driver.frames(), 0);
        assert_eq!(driver.last_height(), 0.0);
        assert!(host.spacer_heights().is_empty());
    }

    #[test]
    fn texture_callback_error_skips_the_frame() {
        let guest = RecordingGuest::with_heights(vec![700.0]);
        let mut driver = running(&guest);
        let mut host = RecordingHost::new(320, 240, 0.0);
        host.push_ready(TextureReady {
            texture: 1,
            width: 8,
            height: 8,
        });
        guest.fail_texture_loaded();
        assert_eq!(
            driver.tick(&mut host, &guest, 5.0),
            Err(BridgeError::Guest("onTextureLoaded trapped".to_owned()))
        );
        assert_eq!(
            guest.calls(),
            vec!["onInit()".to_owned(), "onTextureLoaded(1, 8, 8)".to_owned()]
        );
        assert_eq!(driver.frames(), 0);
        assert!(host.spacer_heights().is_empty());
    }

    #[test]
    fn pump_error_still_renders() {
        let guest = RecordingGuest::with_heights(vec![500.0, 500.0]);
        let mut driver = running(&guest);
        let mut host = RecordingHost::new(320, 240, 12.0);
        host.fail_pumps(1);
        host.push_ready(TextureReady {
            texture: 2,
            width: 4,
            height: 4,
        });

        let first = driver.tick(&mut host, &guest, 1.0).unwrap();
        assert_eq!(first.texture_ready, None);
        assert!(first.spacer_resized);
        // The queued job is not lost to the failed pump.
        let second = driver.tick(&mut host, &guest, 2.0).unwrap();
        assert_eq!(second.texture_ready.map(|r| r.texture), Some(2));
        assert_eq!(
            guest.calls(),
            vec![
                "onInit()".to_owned(),
                "onAnimationFrame(320, 240, 12, 1)".to_owned(),
                "onTextureLoaded(2, 4, 4)".to_owned(),
                "onAnimationFrame(320, 240, 12, 2)".to_owned(),
            ]
        );
        assert_eq!(driver.frames(), 2);
        assert_eq!(host.spacer_heights(), vec![500.0]);
    }

    #[test]
    fn tick_before_running_does_nothing() {
        let guest = RecordingGuest::default();
        let mut driver = FrameDriver::new();
        let mut host = RecordingHost::new(1, 1, 0.0);
        assert_eq!(driver.tick(&mut host, &guest, 0.0).unwrap(), FrameReport::default());
        assert!(guest.calls().is_empty());
    }

    #[test]
    fn canvas_y_flips_origin() {
        assert_eq!(canvas_y(0.0, 900.0), 900.0);
        assert_eq!(canvas_y(900.0, 900.0), 0.0);
    }
}
