/// The counting session: one image, its view, its annotations
///
/// All input arrives as an `Event`. `Session::handle` applies it, re-runs
/// reconciliation when something changed, and returns an `Outcome` that says
/// what happened. Rendering reads `Session::frame()` afterwards; nothing in
/// here knows about the window toolkit.

use image::DynamicImage;
use std::fmt;

use super::annotations::{AnnotationStore, DragAnchor, Removal};
use super::data::{Circle, CircleId};
use super::settings::{Settings, MAX_RADIUS_RANGE, SENSITIVITY_RANGE};
use super::view::{ViewState, ViewportPoint};
use crate::detect::DetectorAdapter;
use crate::reconcile::{self, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
}

/// Keys the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    /// Zero the pan offset
    Reset,
    /// Hide circles while held
    Hide,
    Escape,
    Other,
}

/// Input to the session state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    PointerDown { button: Button, at: ViewportPoint },
    PointerMoved { at: ViewportPoint, primary_held: bool },
    PointerUp { button: Button },
    /// Positive = zoom in
    Scrolled { notches: i32 },
    KeyPressed(Key),
    KeyReleased(Key),
    SensitivityChanged(u8),
    MaxRadiusChanged(u8),
    Resized { width: u32, height: u32 },
}

/// Why an event changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOp {
    /// Removal click hit no circle
    NothingToRemove,
    /// Release without a drag in progress
    NoActiveDrag,
    /// The dragged circle was deleted underneath the drag
    StaleHandle,
    /// Zoom is already at its floor
    ZoomLimit,
    /// Event has no meaning in the current state
    Ignored,
}

/// Drag state of the manual-circle tool
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragAnchor),
}

/// Result of one transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Added { id: CircleId, circle: Circle },
    Selected { id: CircleId, circle: Circle },
    Resized { id: CircleId, radius: f64 },
    DragEnded,
    RemovedManual(Circle),
    RemovedAuto(Circle),
    Zoomed { scale: f64 },
    Panned,
    PanReset,
    HideChanged { hidden: bool },
    SensitivityChanged(u8),
    MaxRadiusChanged(u8),
    ViewResized,
    NoOp(NoOp),
    Exit,
}

impl Outcome {
    /// Whether the frame has to be recomputed and redrawn
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, Outcome::NoOp(_) | Outcome::Exit | Outcome::DragEnded)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Added { circle, .. } => {
                write!(f, "Manual circle added at ({:.1}, {:.1})", circle.x, circle.y)
            }
            Outcome::Selected { circle, .. } => {
                write!(f, "Selected manual circle for resizing at ({:.1}, {:.1})", circle.x, circle.y)
            }
            Outcome::Resized { radius, .. } => write!(f, "Radius {:.1}", radius),
            Outcome::DragEnded => write!(f, "Resize finished"),
            Outcome::RemovedManual(c) => write!(f, "Manual circle removed at ({:.1}, {:.1})", c.x, c.y),
            Outcome::RemovedAuto(c) => {
                write!(f, "Auto-detected circle removed at ({:.1}, {:.1})", c.x, c.y)
            }
            Outcome::Zoomed { scale } => write!(f, "Zoom {:.0}%", scale * 100.0),
            Outcome::Panned => write!(f, "Panned"),
            Outcome::PanReset => write!(f, "Pan reset"),
            Outcome::HideChanged { hidden: true } => write!(f, "Circles hidden"),
            Outcome::HideChanged { hidden: false } => write!(f, "Circles shown"),
            Outcome::SensitivityChanged(v) => write!(f, "Stringency {}", v),
            Outcome::MaxRadiusChanged(v) => write!(f, "Max radius {}", v),
            Outcome::ViewResized => write!(f, "Viewport resized"),
            Outcome::NoOp(NoOp::NothingToRemove) => {
                write!(f, "No circle found at the click position to remove")
            }
            Outcome::NoOp(NoOp::NoActiveDrag) => write!(f, "No circle is being resized"),
            Outcome::NoOp(NoOp::StaleHandle) => write!(f, "The circle being resized no longer exists"),
            Outcome::NoOp(NoOp::ZoomLimit) => write!(f, "Already at minimum zoom"),
            Outcome::NoOp(NoOp::Ignored) => Ok(()),
            Outcome::Exit => write!(f, "Exiting"),
        }
    }
}

/// Last detection and the inputs it was computed from
struct CachedDetection {
    scale_bits: u64,
    sensitivity: u8,
    max_radius: u8,
    circles: Vec<Circle>,
}

pub struct Session {
    image: DynamicImage,
    detector: DetectorAdapter,
    settings: Settings,
    view: ViewState,
    store: AnnotationStore,
    drag: DragState,
    sensitivity: u8,
    max_radius: u8,
    hidden: bool,
    detection: Option<CachedDetection>,
    frame: Frame,
}

impl Session {
    /// Start a session; runs the first detection immediately
    pub fn new(image: DynamicImage, detector: DetectorAdapter, settings: Settings, view_size: (u32, u32)) -> Self {
        let view = ViewState::new((image.width(), image.height()), view_size);
        let mut session = Self {
            image,
            detector,
            sensitivity: settings.sensitivity,
            max_radius: settings.max_radius,
            settings,
            view,
            store: AnnotationStore::new(),
            drag: DragState::Idle,
            hidden: false,
            detection: None,
            frame: Frame::default(),
        };
        session.refresh();
        session
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }

    pub fn max_radius(&self) -> u8 {
        self.max_radius
    }

    /// The most recent reconciled frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Apply one event and reconcile if anything changed
    pub fn handle(&mut self, event: Event) -> Outcome {
        let outcome = self.transition(event);

        match outcome {
            Outcome::NoOp(NoOp::Ignored) => {}
            Outcome::Resized { .. } | Outcome::Panned | Outcome::ViewResized => log::trace!("{}", outcome),
            _ => log::info!("{}", outcome),
        }

        if outcome.needs_redraw() {
            self.refresh();
        }
        outcome
    }

    fn transition(&mut self, event: Event) -> Outcome {
        // Hiding lasts only while the hide key keeps arriving
        if let Event::KeyPressed(key) = event {
            if key != Key::Hide && self.hidden {
                self.hidden = false;
                if key == Key::Other {
                    return Outcome::HideChanged { hidden: false };
                }
            }
        }

        match event {
            Event::PointerDown { button: Button::Primary, at } => self.select_or_add(at),
            Event::PointerDown { button: Button::Secondary, at } => self.remove_at(at),
            Event::PointerMoved { at, primary_held } => {
                if primary_held {
                    self.resize_active(at)
                } else {
                    Outcome::NoOp(NoOp::Ignored)
                }
            }
            Event::PointerUp { button: Button::Primary } => self.end_drag(),
            Event::PointerUp { button: Button::Secondary } => Outcome::NoOp(NoOp::Ignored),
            Event::Scrolled { notches } => self.zoom(notches),
            Event::KeyPressed(key) => self.key_pressed(key),
            Event::KeyReleased(Key::Hide) if self.hidden => {
                self.hidden = false;
                Outcome::HideChanged { hidden: false }
            }
            Event::KeyReleased(_) => Outcome::NoOp(NoOp::Ignored),
            Event::SensitivityChanged(value) => {
                let value = value.min(*SENSITIVITY_RANGE.end());
                if value == self.sensitivity {
                    return Outcome::NoOp(NoOp::Ignored);
                }
                self.sensitivity = value;
                Outcome::SensitivityChanged(value)
            }
            Event::MaxRadiusChanged(value) => {
                let value = value.min(*MAX_RADIUS_RANGE.end());
                if value == self.max_radius {
                    return Outcome::NoOp(NoOp::Ignored);
                }
                self.max_radius = value;
                Outcome::MaxRadiusChanged(value)
            }
            Event::Resized { width, height } => {
                if self.view.resize(width, height) {
                    Outcome::ViewResized
                } else {
                    Outcome::NoOp(NoOp::Ignored)
                }
            }
        }
    }

    /// Primary press: grab the manual circle under the pointer, or place one
    fn select_or_add(&mut self, at: ViewportPoint) -> Outcome {
        let point = self.view.to_original(at);

        if let Some(manual) = self.store.find_manual_at(point).copied() {
            if let Some(anchor) = self.store.begin_drag(manual.id, point.y) {
                self.drag = DragState::Dragging(anchor);
                return Outcome::Selected {
                    id: manual.id,
                    circle: manual.circle,
                };
            }
        }

        let radius = self.settings.default_radius;
        let id = self.store.add_manual(point, radius);
        self.drag = DragState::Dragging(DragAnchor {
            id,
            start_y: point.y,
            start_radius: radius,
        });
        Outcome::Added {
            id,
            circle: Circle::new(point.x, point.y, radius),
        }
    }

    fn resize_active(&mut self, at: ViewportPoint) -> Outcome {
        let DragState::Dragging(anchor) = self.drag else {
            return Outcome::NoOp(NoOp::Ignored);
        };

        let y = self.view.to_original(at).y;
        match self.store.resize_active(&anchor, y, self.settings.min_manual_radius) {
            Some(radius) => Outcome::Resized { id: anchor.id, radius },
            None => {
                self.drag = DragState::Idle;
                Outcome::NoOp(NoOp::StaleHandle)
            }
        }
    }

    fn end_drag(&mut self) -> Outcome {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging(_) => Outcome::DragEnded,
            DragState::Idle => Outcome::NoOp(NoOp::NoActiveDrag),
        }
    }

    /// Secondary press: remove the first reconciled circle under the pointer
    fn remove_at(&mut self, at: ViewportPoint) -> Outcome {
        let point = self.view.to_original(at);
        self.ensure_detection();
        let auto = reconcile::suppress(self.detected(), self.store.removed());

        match self.store.remove_at(point, &auto) {
            Removal::Manual(manual) => {
                if matches!(self.drag, DragState::Dragging(anchor) if anchor.id == manual.id) {
                    self.drag = DragState::Idle;
                }
                Outcome::RemovedManual(manual.circle)
            }
            Removal::Auto(circle) => Outcome::RemovedAuto(circle),
            Removal::Nothing => Outcome::NoOp(NoOp::NothingToRemove),
        }
    }

    fn zoom(&mut self, notches: i32) -> Outcome {
        if notches == 0 {
            return Outcome::NoOp(NoOp::Ignored);
        }
        if self.view.zoom(notches, self.settings.zoom_step, self.settings.min_scale) {
            Outcome::Zoomed {
                scale: self.view.scale(),
            }
        } else {
            Outcome::NoOp(NoOp::ZoomLimit)
        }
    }

    fn key_pressed(&mut self, key: Key) -> Outcome {
        let step = self.settings.pan_step;
        let (dx, dy) = match key {
            Key::Up => (0, -step),
            Key::Down => (0, step),
            Key::Left => (-step, 0),
            Key::Right => (step, 0),
            Key::Reset => {
                self.view.reset_pan();
                return Outcome::PanReset;
            }
            Key::Hide => {
                let changed = !self.hidden;
                self.hidden = true;
                return if changed {
                    Outcome::HideChanged { hidden: true }
                } else {
                    Outcome::NoOp(NoOp::Ignored)
                };
            }
            Key::Escape => return Outcome::Exit,
            Key::Other => return Outcome::NoOp(NoOp::Ignored),
        };

        self.view.pan(dx, dy);
        log::debug!("Pan offset {:?}", self.view.offset());
        Outcome::Panned
    }

    /// Re-run detection if scale or parameters moved since the last run
    fn ensure_detection(&mut self) {
        let scale_bits = self.view.scale().to_bits();
        let stale = self.detection.as_ref().map_or(true, |d| {
            d.scale_bits != scale_bits || d.sensitivity != self.sensitivity || d.max_radius != self.max_radius
        });
        if !stale {
            return;
        }

        let circles = self
            .detector
            .detect(&self.image, self.view.scale(), self.sensitivity, self.max_radius);
        self.detection = Some(CachedDetection {
            scale_bits,
            sensitivity: self.sensitivity,
            max_radius: self.max_radius,
            circles,
        });
    }

    /// Detector output from the last run
    fn detected(&self) -> &[Circle] {
        self.detection.as_ref().map_or(&[], |d| d.circles.as_slice())
    }

    /// Reconcile all sources into a new frame
    fn refresh(&mut self) {
        self.ensure_detection();
        let combined = reconcile::reconcile(self.detected(), &self.store);
        self.frame = reconcile::build_frame(combined, &self.view, self.hidden);
    }
}
