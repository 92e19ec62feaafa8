use crate::{
    input::{GamepadInput, InputState},
    settings::DemoSettings,
    vulkan::{Command, Renderer, RendererSettings, VulkanContext},
};
use log::{error, info};
use nalgebra_glm as glm;
use std::{error::Error, sync::Arc, time::Instant};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

pub type AppResult = Result<(), Box<dyn Error>>;

pub struct AppState {
    pub window_dimensions: glm::Vec2,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    pub input: InputState,
}

impl AppState {
    fn new(window: &Window) -> Self {
        let size = window.inner_size();
        Self {
            window_dimensions: glm::vec2(size.width as f32, size.height as f32),
            delta_time: 0.0,
            input: InputState::default(),
        }
    }
}

pub trait App: Command {
    fn initialize(&mut self, _renderer: &mut Renderer) -> AppResult {
        Ok(())
    }

    fn update(&mut self, _state: &mut AppState) -> AppResult {
        Ok(())
    }

    fn draw(&mut self, renderer: &mut Renderer, state: &AppState) -> AppResult
    where
        Self: Sized,
    {
        renderer.render(state.window_dimensions, self)
    }
}

pub fn setup_app(
    settings: &DemoSettings,
) -> Result<(Window, EventLoop<()>, Renderer), Box<dyn Error>> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(settings.window_title.clone())
        .with_inner_size(PhysicalSize::new(
            settings.window_width,
            settings.window_height,
        ))
        .build(&event_loop)?;

    let context = Arc::new(VulkanContext::new(&window, settings.enable_validation)?);

    let size = window.inner_size();
    let renderer = Renderer::new(
        context,
        [size.width, size.height],
        RendererSettings {
            clear_colour: settings.clear_colour,
        },
    )?;

    Ok((window, event_loop, renderer))
}

pub fn run_app<T: 'static>(mut app: T, window: Window, event_loop: EventLoop<()>, renderer: Renderer)
where
    T: App,
{
    let mut renderer = Some(renderer);
    let mut state = AppState::new(&window);
    let mut gamepad = GamepadInput::new();

    if let Some(renderer) = renderer.as_mut() {
        if let Err(error) = app.initialize(renderer) {
            error!("Failed to initialize the app: {}", error);
            return;
        }
    }

    let mut last_frame = Instant::now();
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        state.input.handle_event(&event);

        let result = match event {
            Event::NewEvents { .. } => {
                let now = Instant::now();
                state.delta_time = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;
                state.input.set_gamepad(gamepad.poll());
                app.update(&mut state)
            }
            Event::WindowEvent { event, .. } => {
                match event {
                    WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                virtual_keycode: Some(VirtualKeyCode::Escape),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => *control_flow = ControlFlow::Exit,
                    WindowEvent::Resized(PhysicalSize { width, height }) => {
                        state.window_dimensions = glm::vec2(width as f32, height as f32);
                    }
                    _ => {}
                }
                Ok(())
            }
            Event::MainEventsCleared => {
                window.request_redraw();
                Ok(())
            }
            Event::RedrawRequested(_) => match renderer.as_mut() {
                Some(renderer) => app.draw(renderer, &state),
                None => Ok(()),
            },
            Event::LoopDestroyed => {
                if let Some(mut renderer) = renderer.take() {
                    renderer.release(&mut app);
                    info!("Shutdown complete");
                }
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(error) = result {
            error!("{}", error);
            *control_flow = ControlFlow::Exit;
        }
    });
}
