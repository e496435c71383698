use iced::keyboard::{self, key::Named};
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::reconcile::Frame;
use crate::state::session::{Button, Event, Key};
use crate::Message;

/// Ring color of every counted circle
const RING_COLOR: Color = Color { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
/// Fill color of the center marker
const CENTER_COLOR: Color = Color { r: 1.0, g: 0.5, b: 0.0, a: 1.0 };
const RING_WIDTH: f32 = 4.0;
/// Half the side of the center marker
const CENTER_HALF: f32 = 5.0;
/// Smooth-scroll distance that makes up one wheel notch
const PIXELS_PER_NOTCH: f32 = 50.0;

/// Transparent overlay on top of the image
///
/// Draws the visible circles of the current frame and turns raw mouse and
/// keyboard input into session events. Positions are canvas-relative, which
/// is exactly viewport space.
pub struct CircleOverlay<'a> {
    pub frame: &'a Frame,
}

impl Program<Message> for CircleOverlay<'_> {
    type State = PointerState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        if self.frame.hidden {
            return vec![frame.into_geometry()];
        }

        for circle in &self.frame.circles {
            let center = Point::new(circle.center.x as f32, circle.center.y as f32);

            // Small circles would fill in completely with a wide ring
            let width = RING_WIDTH.min((circle.radius as f32 / 2.0).max(1.0));
            frame.stroke(
                &Path::circle(center, circle.radius.max(1) as f32),
                Stroke::default().with_color(RING_COLOR).with_width(width),
            );
            frame.fill_rectangle(
                Point::new(center.x - CENTER_HALF, center.y - CENTER_HALF),
                Size::new(CENTER_HALF * 2.0, CENTER_HALF * 2.0),
                CENTER_COLOR,
            );
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        let viewport = (bounds.width.max(0.0) as u32, bounds.height.max(0.0) as u32);
        let captured = |event| {
            (
                canvas::event::Status::Captured,
                Some(Message::Canvas { viewport, event }),
            )
        };

        let resized = state.viewport.replace(viewport) != Some(viewport);

        match event {
            canvas::Event::Mouse(mouse_event) => {
                let position = cursor.position_in(bounds);
                match mouse_event {
                    mouse::Event::WheelScrolled { delta } => {
                        if position.is_some() {
                            let notches = match delta {
                                mouse::ScrollDelta::Lines { y, .. } => line_notches(y),
                                mouse::ScrollDelta::Pixels { y, .. } => state.pixel_notches(y),
                            };
                            if notches != 0 {
                                return captured(Event::Scrolled { notches });
                            }
                        }
                    }
                    mouse::Event::ButtonPressed(button) => {
                        if let (Some(button), Some(at)) = (map_button(button), position) {
                            if button == Button::Primary {
                                state.primary_held = true;
                            }
                            return captured(Event::PointerDown { button, at: to_viewport_point(at) });
                        }
                    }
                    mouse::Event::ButtonReleased(button) => {
                        // Releases count even outside the canvas so drags always end
                        if let Some(button) = map_button(button) {
                            if button == Button::Primary {
                                if !state.primary_held {
                                    return (canvas::event::Status::Ignored, None);
                                }
                                state.primary_held = false;
                            }
                            return captured(Event::PointerUp { button });
                        }
                    }
                    mouse::Event::CursorMoved { .. } => {
                        if state.primary_held {
                            if let Some(at) = position {
                                return captured(Event::PointerMoved {
                                    at: to_viewport_point(at),
                                    primary_held: true,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }

            canvas::Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) => {
                return captured(Event::KeyPressed(map_key(&key)));
            }

            canvas::Event::Keyboard(keyboard::Event::KeyReleased { key, .. }) => {
                return captured(Event::KeyReleased(map_key(&key)));
            }

            _ => {}
        }

        // Window resizes reach the canvas only through its bounds
        if resized {
            return captured(Event::Resized {
                width: viewport.0,
                height: viewport.1,
            });
        }
        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if state.primary_held {
            mouse::Interaction::ResizingVertically
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::Idle
        }
    }
}

/// Button state the canvas has to remember between events
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    pub primary_held: bool,
    /// Canvas size seen by the last event
    pub viewport: Option<(u32, u32)>,
    /// Smooth-scroll distance not yet turned into notches
    pub scroll_pixels: f32,
}

impl PointerState {
    /// Add a pixel scroll delta and take out the whole notches it completes
    fn pixel_notches(&mut self, y: f32) -> i32 {
        // A reversed gesture starts over instead of paying back the remainder
        if self.scroll_pixels * y < 0.0 {
            self.scroll_pixels = 0.0;
        }
        self.scroll_pixels += y;
        let notches = (self.scroll_pixels / PIXELS_PER_NOTCH).trunc();
        self.scroll_pixels -= notches * PIXELS_PER_NOTCH;
        notches as i32
    }
}

/// One notch per wheel event, whatever the reported line count
fn line_notches(y: f32) -> i32 {
    if y > 0.0 {
        1
    } else if y < 0.0 {
        -1
    } else {
        0
    }
}

fn map_button(button: mouse::Button) -> Option<Button> {
    match button {
        mouse::Button::Left => Some(Button::Primary),
        mouse::Button::Right => Some(Button::Secondary),
        _ => None,
    }
}

fn to_viewport_point(point: Point) -> cgmath::Point2<i32> {
    cgmath::Point2::new(point.x as i32, point.y as i32)
}

/// Arrow keys or WASD pan, R resets, H hides
fn map_key(key: &keyboard::Key) -> Key {
    match key.as_ref() {
        keyboard::Key::Named(Named::ArrowUp) => Key::Up,
        keyboard::Key::Named(Named::ArrowDown) => Key::Down,
        keyboard::Key::Named(Named::ArrowLeft) => Key::Left,
        keyboard::Key::Named(Named::ArrowRight) => Key::Right,
        keyboard::Key::Named(Named::Escape) => Key::Escape,
        keyboard::Key::Character(c) => match c.to_ascii_lowercase().as_str() {
            "w" => Key::Up,
            "s" => Key::Down,
            "a" => Key::Left,
            "d" => Key::Right,
            "r" => Key::Reset,
            "h" => Key::Hide,
            _ => Key::Other,
        },
        _ => Key::Other,
    }
}
