use std::error::Error;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::DisplayBuilder;
use log::LevelFilter;
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use oglkit::engine::debug::init_log;
use oglkit::engine::systems::viewer_app::{find_app, APPS};
use oglkit::engine::{GlContext, Key, KeyState, MouseButton, SceneDescription, ViewerApp};

#[derive(Parser, Debug)]
#[command(name = "oglkit", about = "Interactive OpenGL model viewer")]
struct Cli {
    /// Scene description (.json); an empty scene is shown when omitted
    scene: Option<PathBuf>,

    /// Demo to run
    #[arg(short, long, default_value = "model-loader")]
    app: String,

    #[arg(long, default_value_t = 1024)]
    width: u32,

    #[arg(long, default_value_t = 768)]
    height: u32,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the available demos and exit
    #[arg(long)]
    list: bool,
}

struct GlWindow {
    window: Window,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    gl: glow::Context,
}

fn create_gl_window(event_loop: &ActiveEventLoop, title: &str, width: u32, height: u32) -> Result<GlWindow, Box<dyn Error>> {
    let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_depth_size(24);
    let display_builder = DisplayBuilder::new().with_window_attributes(Some(
        Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height)),
    ));

    let (window, gl_config) = display_builder.build(event_loop, template, |configs| {
        // glutin only calls the picker with at least one config
        configs
            .reduce(|accum, config| if config.num_samples() > accum.num_samples() { config } else { accum })
            .expect("no OpenGL config offered")
    })?;
    let window = window.ok_or("display builder did not create a window")?;

    let display = gl_config.display();
    let raw_window_handle = window.window_handle()?.as_raw();
    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));
    let not_current = unsafe { display.create_context(&gl_config, &context_attributes)? };

    let size = window.inner_size();
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        NonZeroU32::new(size.width).ok_or("window width is zero")?,
        NonZeroU32::new(size.height).ok_or("window height is zero")?,
    );
    let surface = unsafe { display.create_window_surface(&gl_config, &attrs)? };
    let context = not_current.make_current(&surface)?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match std::ffi::CString::new(s) {
            Ok(name) => display.get_proc_address(name.as_c_str()),
            Err(_) => std::ptr::null(),
        })
    };

    Ok(GlWindow { window, surface, context, gl })
}

struct Viewer {
    // Dropped before the context it renders with.
    app: Option<Box<dyn ViewerApp>>,
    ctx: Option<GlContext>,
    gl_surface: Option<Surface<WindowSurface>>,
    gl_context: Option<PossiblyCurrentContext>,
    window: Option<Window>,
    cli: Cli,
    scene: SceneDescription,
    cursor: (f32, f32),
    last_frame_time: Option<Instant>,
    frame_dt: f32,
    error: Option<Box<dyn Error>>,
}

impl Viewer {
    fn new(cli: Cli, scene: SceneDescription) -> Self {
        Self {
            app: None,
            ctx: None,
            gl_surface: None,
            gl_context: None,
            window: None,
            cli,
            scene,
            cursor: (0.0, 0.0),
            last_frame_time: None,
            frame_dt: 0.0,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let entry = find_app(&self.cli.app).ok_or_else(|| format!("unknown app '{}'", self.cli.app))?;
        let title = format!("{} - {}", entry.name, self.scene.scene_name);
        let GlWindow { window, surface, context, gl } =
            create_gl_window(event_loop, &title, self.cli.width, self.cli.height)?;

        // SAFETY: the context was made current above and stays current on
        // this thread until the viewer drops it.
        let ctx = unsafe { GlContext::from_glow(gl) };
        let mut app = (entry.create)();
        app.init(&ctx, &self.scene)?;
        let size = window.inner_size();
        app.on_resize(&ctx, size.width, size.height);
        log::info!("Running '{}': {}", entry.name, entry.description);

        window.request_redraw();
        self.last_frame_time = Some(Instant::now());
        self.window = Some(window);
        self.gl_context = Some(context);
        self.gl_surface = Some(surface);
        self.ctx = Some(ctx);
        self.app = Some(app);
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), Box<dyn Error>> {
        let (Some(surface), Some(context), Some(ctx), Some(app)) =
            (&self.gl_surface, &self.gl_context, &self.ctx, &mut self.app)
        else {
            return Ok(());
        };
        let now = Instant::now();
        if let Some(last) = self.last_frame_time {
            self.frame_dt = (now - last).as_secs_f32();
        }
        self.last_frame_time = Some(now);

        app.render(ctx);
        if let Err(err) = ctx.check_error() {
            log::warn!("Frame finished with {}", err);
        }
        surface.swap_buffers(context)?;
        if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (Some(surface), Some(context), Some(ctx), Some(app)) =
            (&self.gl_surface, &self.gl_context, &self.ctx, &mut self.app)
        else {
            return;
        };
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            surface.resize(context, w, h);
            app.on_resize(ctx, width, height);
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Box<dyn Error>) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }

            WindowEvent::Resized(size) => self.resize(size.width, size.height),

            WindowEvent::KeyboardInput { event: KeyEvent { logical_key, state, .. }, .. } => {
                let Some(key) = Key::from_winit(&logical_key) else {
                    return;
                };
                if key == Key::Escape {
                    event_loop.exit();
                    return;
                }
                let dt = self.frame_dt;
                if let Some(app) = &mut self.app {
                    app.on_keyboard(key, KeyState::from(state), dt);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let (x, y) = self.cursor;
                if let (Some(app), Some(button)) = (&mut self.app, MouseButton::from_winit(button)) {
                    app.on_mouse_click(button, KeyState::from(state), x, y);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                if let Some(app) = &mut self.app {
                    app.on_mouse_move(self.cursor.0, self.cursor.1);
                }
            }

            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_log(cli.log_level)?;

    if cli.list {
        for entry in APPS.iter() {
            println!("{:<16} {}", entry.name, entry.description);
        }
        return Ok(());
    }

    let scene = match &cli.scene {
        Some(path) => SceneDescription::load(path)?,
        None => SceneDescription::default(),
    };

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer::new(cli, scene);
    event_loop.run_app(&mut viewer)?;

    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
