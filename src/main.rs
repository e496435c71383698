use clap::Parser;
use iced::widget::image::Handle;
use iced::widget::{canvas, column, container, row, slider, stack, text};
use iced::{window, Alignment, ContentFit, Element, Length, Size, Subscription, Task, Theme};
use image::RgbaImage;
use rfd::FileDialog;
use std::any::Any;
use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

mod detect;
mod error;
mod reconcile;
mod source;
mod state;
mod ui;

use detect::{DetectorAdapter, HoughFinder};
use error::CounterError;
use reconcile::Summary;
use state::session::{DragState, Event, NoOp, Outcome, Session};
use state::settings::{Settings, MAX_RADIUS_RANGE, SENSITIVITY_RANGE};
use ui::CircleOverlay;

const WINDOW_TITLE: &str = "Detected Circles";
const WINDOW_SIZE: (f32, f32) = (1280.0, 860.0);
const OUTER_PADDING: f32 = 4.0;
/// Window height taken by the sliders, the status line and the spacing
const CHROME_HEIGHT: f32 = 120.0;
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Count roughly circular objects in an image
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Image to open; asked for on the console when omitted
    image: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Open the window fullscreen
    #[arg(long)]
    fullscreen: bool,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Initial stringency slider value
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    sensitivity: Option<u8>,

    /// Initial max radius slider value (0 = unbounded)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=200))]
    max_radius: Option<u8>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// Input from the overlay, tagged with the canvas size it happened at
    Canvas { viewport: (u32, u32), event: Event },
    SensitivityChanged(u8),
    MaxRadiusChanged(u8),
    /// The window changed size, including fullscreen switches
    WindowResized(Size),
}

/// Main application state
struct CircleCounter {
    session: Session,
    /// Full-resolution RGBA copy of the image
    raster: RgbaImage,
    /// What is currently on screen under the overlay
    visible: Handle,
    /// Latest outcome message
    status: String,
    /// Summary last written to stdout
    last_summary: Option<Summary>,
}

impl CircleCounter {
    fn new(session: Session, fullscreen: bool) -> (Self, Task<Message>) {
        let raster = session.image().to_rgba8();
        let visible = ui::viewport::visible_handle(&raster, session.view());

        let mut app = CircleCounter {
            session,
            raster,
            visible,
            status: String::from("Left click adds, drag resizes, right click removes"),
            last_summary: None,
        };
        app.report();

        let task = if fullscreen {
            window::get_latest().and_then(|id| window::change_mode(id, window::Mode::Fullscreen))
        } else {
            Task::none()
        };
        (app, task)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Canvas { viewport, event } => {
                if viewport != self.session.view().view_size() {
                    let resize = Event::Resized {
                        width: viewport.0,
                        height: viewport.1,
                    };
                    let task = self.apply(resize);
                    if matches!(event, Event::Resized { .. }) {
                        return task;
                    }
                }
                self.apply(event)
            }
            Message::SensitivityChanged(value) => self.apply(Event::SensitivityChanged(value)),
            Message::MaxRadiusChanged(value) => self.apply(Event::MaxRadiusChanged(value)),
            Message::WindowResized(size) => {
                // Estimate only; the next canvas event carries the exact bounds
                let (width, height) = canvas_size(size);
                self.apply(Event::Resized { width, height })
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        window::resize_events().map(|(_id, size)| Message::WindowResized(size))
    }

    /// Run one session transition and redraw what it changed
    fn apply(&mut self, event: Event) -> Task<Message> {
        let outcome = self.session.handle(event);

        match outcome {
            Outcome::Exit => return iced::exit(),
            Outcome::NoOp(NoOp::Ignored) | Outcome::ViewResized => {}
            _ => self.status = outcome.to_string(),
        }

        if outcome.needs_redraw() {
            self.visible = ui::viewport::visible_handle(&self.raster, self.session.view());
            self.report();
        }
        Task::none()
    }

    /// Print the count to the console when it changed
    fn report(&mut self) {
        let summary = self.session.frame().summary;
        if self.last_summary == Some(summary) {
            return;
        }
        println!(
            "Circles: {} | Area variation: {} | Total: {}",
            summary.visible,
            format_variation(summary.area_variation),
            summary.total
        );
        self.last_summary = Some(summary);
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let sensitivity = self.session.sensitivity();
        let max_radius = self.session.max_radius();

        let controls = column![
            row![
                text("Stringency").width(Length::Fixed(110.0)),
                slider(SENSITIVITY_RANGE, sensitivity, Message::SensitivityChanged),
                text(sensitivity.to_string()).width(Length::Fixed(40.0)),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            row![
                text("Max Radius").width(Length::Fixed(110.0)),
                slider(MAX_RADIUS_RANGE, max_radius, Message::MaxRadiusChanged),
                text(max_radius.to_string()).width(Length::Fixed(40.0)),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
        ]
        .spacing(6)
        .padding(10);

        // Image and overlay share the same top-left corner and size
        let picture = container(iced::widget::image(self.visible.clone()).content_fit(ContentFit::None))
            .width(Length::Fill)
            .height(Length::Fill)
            .clip(true);
        let overlay = canvas(CircleOverlay {
            frame: self.session.frame(),
        })
        .width(Length::Fill)
        .height(Length::Fill);

        column![
            controls,
            stack![picture, overlay],
            text(self.status_line()).size(16),
        ]
        .spacing(4)
        .padding(OUTER_PADDING)
        .into()
    }

    fn status_line(&self) -> String {
        let summary = self.session.frame().summary;
        let store = self.session.store();
        let mode = match self.session.drag() {
            DragState::Dragging(_) => " | Resizing",
            DragState::Idle => "",
        };
        format!(
            "Count: {} | Area variation: {} | Total: {} ({} manual, {} removed) | Zoom: {:.0}%{} | {}",
            summary.visible,
            format_variation(summary.area_variation),
            summary.total,
            store.manual().len(),
            store.removed().len(),
            self.session.view().scale() * 100.0,
            mode,
            self.status
        )
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Canvas area left inside a window of `window` size
fn canvas_size(window: Size) -> (u32, u32) {
    (
        (window.width - 2.0 * OUTER_PADDING).max(0.0) as u32,
        (window.height - CHROME_HEIGHT).max(0.0) as u32,
    )
}

/// Human-readable text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown cause")
    }
}

fn format_variation(variation: Option<f64>) -> String {
    match variation {
        Some(value) => format!("{:.2}%", value),
        None => String::from("N/A"),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Panics are reported through the log instead of the default trace
    panic::set_hook(Box::new(|info| {
        log::error!("Unexpected failure: {}", panic_message(info.payload()));
    }));

    match panic::catch_unwind(AssertUnwindSafe(|| run(cli))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => eprintln!("Error: {}", e),
        Err(_) => eprintln!("Error: the session ended unexpectedly"),
    }

    pause();
}

/// Load the image, then hand control to the window until it closes
fn run(cli: Cli) -> Result<(), CounterError> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    }
    .with_overrides(cli.sensitivity, cli.max_radius);

    if cli.print_config {
        let json = settings.to_json().map_err(|source| CounterError::Config {
            path: cli.config.clone().unwrap_or_default(),
            source,
        })?;
        println!("{}", json);
        return Ok(());
    }

    let path = match cli.image {
        Some(path) => path,
        None => prompt_for_path()?,
    };
    let image = source::load_image_blocking(path)?;

    let finder = HoughFinder::from_settings(&settings.detection);
    let detector = DetectorAdapter::new(
        Box::new(finder),
        settings.detection.min_radius,
        settings.detection.blur_sigma,
    )
    .with_max_pixels(settings.detection.max_working_pixels);
    let session = Session::new(image, detector, settings, canvas_size(Size::from(WINDOW_SIZE)));
    let fullscreen = cli.fullscreen;

    iced::application(WINDOW_TITLE, CircleCounter::update, CircleCounter::view)
        .theme(CircleCounter::theme)
        .subscription(CircleCounter::subscription)
        .centered()
        .window_size(WINDOW_SIZE)
        .run_with(move || CircleCounter::new(session, fullscreen))?;

    Ok(())
}

/// Ask for a path on the console; an empty answer opens the file picker
fn prompt_for_path() -> Result<PathBuf, CounterError> {
    print!("Please drag/drop an image here or type/paste the path: ");
    io::stdout().flush().map_err(CounterError::Prompt)?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(CounterError::Prompt)?;

    // Drag and drop into a terminal usually quotes the path
    let answer = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if !answer.is_empty() {
        return Ok(PathBuf::from(answer));
    }

    FileDialog::new()
        .set_title("Select an image")
        .add_filter("Images", &IMAGE_EXTENSIONS[..])
        .pick_file()
        .ok_or(CounterError::NoImage)
}

fn pause() {
    print!("\nPress Enter to exit...");
    // Nothing useful to do if the console is gone
    let _ = io::stdout().flush();
    let _ = io::stdin().lock().read_line(&mut String::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "circle-counter",
            "cells.png",
            "--fullscreen",
            "--sensitivity",
            "55",
            "--max-radius",
            "0",
        ])
        .unwrap();

        assert_eq!(cli.image, Some(PathBuf::from("cells.png")));
        assert!(cli.fullscreen);
        assert_eq!(cli.sensitivity, Some(55));
        assert_eq!(cli.max_radius, Some(0));
        assert!(cli.config.is_none());
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_rejects_out_of_range_sliders() {
        assert!(Cli::try_parse_from(["circle-counter", "--sensitivity", "101"]).is_err());
        assert!(Cli::try_parse_from(["circle-counter", "--max-radius", "201"]).is_err());
    }

    #[test]
    fn test_canvas_size_leaves_room_for_controls() {
        assert_eq!(canvas_size(Size::new(1280.0, 860.0)), (1272, 740));
        assert_eq!(canvas_size(Size::new(4.0, 50.0)), (0, 0));
    }

    #[test]
    fn test_panic_payloads_become_messages() {
        let literal: Box<dyn Any + Send> = Box::new("index out of range");
        let formatted: Box<dyn Any + Send> = Box::new(String::from("radius was NaN"));
        let other: Box<dyn Any + Send> = Box::new(42u32);

        assert_eq!(panic_message(literal.as_ref()), "index out of range");
        assert_eq!(panic_message(formatted.as_ref()), "radius was NaN");
        assert_eq!(panic_message(other.as_ref()), "unknown cause");
    }

    #[test]
    fn test_variation_formatting() {
        assert_eq!(format_variation(None), "N/A");
        assert_eq!(format_variation(Some(12.3456)), "12.35%");
    }
}
