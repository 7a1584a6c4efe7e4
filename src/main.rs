//! Fledge - an audio-reactive aviary
//!
//! A microphone feeds a pitch detector; every detected note launches birds
//! of that note's color from a procedurally grown tree. Hold a note and a
//! repeating flight campaign keeps the air busy.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::Vec2;
use tracing::{info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use fledge::capture::CaptureAdapter;
use fledge::cli::Args;
use fledge::engine::AnimationEngine;
use fledge::flight::FlightController;
use fledge::monitor::{DisplayFn, PitchMonitor};
use fledge::note::frequency_to_note;
use fledge::params::{FlightParams, RenderConfig};
use fledge::rendering::RenderSystem;
use fledge::scene::Scene;
use fledge::tree::Tree;

/// Latest displayed (frequency, clarity), written by the monitor's display
/// callback and read when refreshing the window title.
type DisplayState = Rc<RefCell<Option<(f32, f32)>>>;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Simulation systems
    scene: Scene,
    engine: AnimationEngine,
    flight: FlightController,
    monitor: PitchMonitor,

    // Configuration
    render_config: RenderConfig,
    capture_window_size: usize,
    listen_on_start: bool,

    // Display feedback
    display_state: DisplayState,
    last_title: String,

    // Time tracking
    last_frame: Instant,
}

impl App {
    fn new(args: &Args) -> anyhow::Result<Self> {
        let detector_params = args.detector_params();
        detector_params.validate()?;
        let tree_params = args.tree_params();
        tree_params.validate()?;
        let flight_params = FlightParams::default();
        flight_params.validate()?;
        let render_config = RenderConfig::default();

        // Grow the tree from the bottom center of the canvas.
        let canvas = render_config.size();
        let origin = Vec2::new(canvas / 2.0, canvas - 20.0);
        let tree = Tree::generate(&tree_params, origin, &mut rand::thread_rng());
        info!("tree grown: {} leaves", tree.leaf_count());

        let engine = AnimationEngine::new(tree, flight_params.clone(), canvas);
        let flight = FlightController::new(flight_params);

        let display_state: DisplayState = Rc::new(RefCell::new(None));
        let written = Rc::clone(&display_state);
        let display: DisplayFn = Box::new(move |frequency, clarity| {
            *written.borrow_mut() = frequency.zip(clarity);
        });

        let capture_window_size = detector_params.window_size;
        let listen_on_start = detector_params.enabled;
        let monitor = PitchMonitor::new(detector_params, display);

        Ok(Self {
            window: None,
            render_system: None,
            scene: Scene::new(),
            engine,
            flight,
            monitor,
            render_config,
            capture_window_size,
            listen_on_start,
            display_state,
            last_title: String::new(),
            last_frame: Instant::now(),
        })
    }

    fn start_listening(&mut self) {
        match CaptureAdapter::setup(self.capture_window_size) {
            Ok(capture) => self.monitor.enable(Box::new(capture)),
            Err(e) => warn!("cannot start listening: {}", e),
        }
    }

    fn toggle_listening(&mut self) {
        if self.monitor.is_running() {
            self.monitor.disable();
            self.flight.stop_all();
        } else {
            self.start_listening();
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Render a single frame: pitch tick, flight tick, bird physics, paint.
    fn render_frame(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        self.monitor.tick(now, &mut self.flight);
        self.flight.tick(now, &mut self.engine);
        self.engine.advance(dt);

        self.scene.clear();
        self.engine.paint(&mut self.scene);

        if let Some(render_system) = &mut self.render_system {
            if let Err(e) = render_system.render(&self.scene) {
                warn!("render error: {:?}", e);
            }
        }

        self.update_title();
    }

    fn update_title(&mut self) {
        let title = match *self.display_state.borrow() {
            Some((frequency, clarity)) => match frequency_to_note(frequency) {
                Some(note) => format!("Fledge - {} {:.1} Hz ({:.2})", note, frequency, clarity),
                None => format!("Fledge - {:.1} Hz ({:.2})", frequency, clarity),
            },
            None if self.monitor.is_running() => "Fledge - listening".to_string(),
            None => "Fledge - muted (Space to listen)".to_string(),
        };

        if title != self.last_title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.last_title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        // Keep frames coming while listening or while birds are in the air;
        // otherwise the loop goes idle until the next input event.
        if self.monitor.is_running() || self.engine.needs_frames() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let side = self.render_config.canvas_px;
        let window_attributes = Window::default_attributes()
            .with_title("Fledge")
            .with_inner_size(winit::dpi::LogicalSize::new(side, side))
            .with_resizable(false);

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create window"),
        );

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.render_config,
        ))
        .expect("failed to initialize rendering");

        self.window = Some(window);
        self.render_system = Some(render_system);

        if self.listen_on_start {
            self.start_listening();
        }

        info!("fledge is running; Space toggles the microphone, ESC quits");
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => self.toggle_listening(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut app = App::new(&args)?;

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
