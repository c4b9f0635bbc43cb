//! Scene demo application
//!
//! Opens a window, builds a small scene (a spinning textured cube on a
//! ground grid, two point lights and debug axes) and renders it until the
//! window is closed or Escape is pressed.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use deferred_renderer::foundation::logging;
use deferred_renderer::prelude::*;
use deferred_renderer::render::{RenderableHandle, SceneHandle};

const CONFIG_PATH: &str = "demo_app/config/demo.toml";

#[derive(Debug, Default)]
struct InputState {
    quit: bool,
    resized: Option<(u32, u32)>,
    paused: bool,
}

struct DemoInput(Rc<RefCell<InputState>>);

impl EventListener for DemoInput {
    fn process_event(&mut self, event: &Event) {
        let mut state = self.0.borrow_mut();
        match event {
            Event::Quit { .. } => state.quit = true,
            Event::KeyDown { key_sym, repeat: false, .. } => match key_sym.sym {
                KeyCode::Escape => state.quit = true,
                KeyCode::Space => state.paused = !state.paused,
                _ => {}
            },
            Event::Window {
                event_type: WindowEventType::SizeChanged,
                data1,
                data2,
                ..
            } if *data1 > 0 && *data2 > 0 => {
                state.resized = Some((*data1 as u32, *data2 as u32));
            }
            _ => {}
        }
    }
}

struct SceneDemo {
    renderer: Renderer,
    scene: SceneHandle,
    cube: RenderableHandle,
    input: Rc<RefCell<InputState>>,
    last_frame: Instant,
}

impl SceneDemo {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let properties = match Properties::load_from_file(CONFIG_PATH) {
            Ok(properties) => properties,
            Err(e) => {
                log::warn!("Failed to load {CONFIG_PATH}: {e}, using defaults");
                Properties::new()
            }
        };

        let mut renderer = Renderer::new(&properties)?;
        let scene = renderer.create_render_scene();

        let checker = checker_image(64, 8);
        let texture = renderer.create_texture2d(&checker)?;

        let cube_mesh = renderer.create_static_mesh(&MeshData::cube())?;
        let cube = renderer.create_renderable_with_texture(
            scene,
            cube_mesh,
            texture,
            GraphicsData::new(Vec3::new(0.0, 1.0, 0.0), Quat::identity(), Vec3::new(1.0, 1.0, 1.0)),
            None,
        )?;

        let ground_mesh = renderer.create_static_mesh(&MeshData::grid(16, 16))?;
        let ground = renderer.create_texture2d(&Image::solid(1, 1, [90, 110, 90, 255]))?;
        renderer.create_renderable_with_texture(
            scene,
            ground_mesh,
            ground,
            GraphicsData::new(Vec3::new(-8.0, 0.0, -8.0), Quat::identity(), Vec3::new(1.0, 1.0, 1.0)),
            None,
        )?;

        let warm = renderer.create_point_light(scene, Vec3::new(3.0, 3.0, 3.0))?;
        renderer.set_light_color(scene, warm, Vec3::new(1.0, 0.8, 0.6));
        renderer.create_point_light(scene, Vec3::new(-3.0, 2.0, -2.0))?;

        renderer.create_camera(Vec3::new(2.0, 3.0, 8.0), Vec3::new(0.0, 1.0, 0.0))?;

        let input = Rc::new(RefCell::new(InputState::default()));
        renderer.add_event_listener(Box::new(DemoInput(Rc::clone(&input))));

        log::info!("Scene demo initialized");
        Ok(Self {
            renderer,
            scene,
            cube,
            input,
            last_frame: Instant::now(),
        })
    }

    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            self.renderer.process_events();

            let resized = {
                let mut state = self.input.borrow_mut();
                if state.quit {
                    break;
                }
                state.resized.take()
            };
            if let Some((width, height)) = resized {
                self.renderer.set_viewport(width, height)?;
            }

            let now = Instant::now();
            let delta = now.duration_since(self.last_frame).as_secs_f32();
            self.last_frame = now;

            if !self.input.borrow().paused {
                // Quarter turn per second
                self.renderer
                    .rotate_degrees(self.scene, self.cube, 90.0 * delta, &Vec3::y(), TransformSpace::World);
            }

            self.render_frame()?;
        }

        log::info!("Scene demo completed");
        Ok(())
    }

    fn render_frame(&mut self) -> RenderResult<()> {
        self.renderer.begin_render()?;
        self.renderer.render(self.scene)?;
        self.renderer.render_lines(&[
            Line::new(Vec3::zeros(), Vec3::x() * 2.0, Vec3::new(1.0, 0.0, 0.0)),
            Line::new(Vec3::zeros(), Vec3::y() * 2.0, Vec3::new(0.0, 1.0, 0.0)),
            Line::new(Vec3::zeros(), Vec3::z() * 2.0, Vec3::new(0.0, 0.0, 1.0)),
        ])?;
        self.renderer.end_render()
    }
}

fn checker_image(size: u32, cell: u32) -> Image {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if light { 230 } else { 40 };
            data.extend_from_slice(&[value, value, value, 255]);
        }
    }
    Image::new(size, size, ImageFormat::Rgba, data).unwrap_or_else(|_| Image::solid(1, 1, [255; 4]))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");
    log::info!("Starting scene demo");

    let mut demo = SceneDemo::new()?;
    demo.run().map_err(|e| {
        log::error!("Application error: {e}");
        e
    })
}
