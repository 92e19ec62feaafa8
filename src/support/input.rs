use gilrs::{Axis, Button, Gilrs};
use log::{info, warn};
use nalgebra_glm as glm;
use std::collections::HashMap;
use winit::event::{
    DeviceEvent, ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent,
};

const STICK_DEAD_ZONE: f32 = 0.1;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GamepadAxes {
    pub left_stick: glm::Vec2,
    pub right_stick: glm::Vec2,
    pub left_trigger: f32,
    pub right_trigger: f32,
}

#[derive(Default)]
pub struct InputState {
    keystates: HashMap<VirtualKeyCode, ElementState>,
    mouse_look_active: bool,
    mouse_delta: glm::Vec2,
    gamepad: GamepadAxes,
}

impl InputState {
    pub fn handle_event<T>(&mut self, event: &Event<T>) {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(keycode),
                            state,
                            ..
                        },
                    ..
                } => self.handle_key(*keycode, *state),
                WindowEvent::MouseInput { button, state, .. } => {
                    self.handle_mouse_button(*button, *state)
                }
                WindowEvent::Focused(false) => self.clear(),
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => self.handle_mouse_motion(delta.0 as f32, delta.1 as f32),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        *self.keystates.entry(keycode).or_insert(state) = state;
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Right {
            self.mouse_look_active = state == ElementState::Pressed;
        }
    }

    /// Motion only counts while mouse look is held.
    pub fn handle_mouse_motion(&mut self, x: f32, y: f32) {
        if self.mouse_look_active {
            self.mouse_delta += glm::vec2(x, y);
        }
    }

    pub fn is_key_pressed(&self, keycode: VirtualKeyCode) -> bool {
        self.keystates.get(&keycode) == Some(&ElementState::Pressed)
    }

    pub fn take_mouse_delta(&mut self) -> glm::Vec2 {
        std::mem::replace(&mut self.mouse_delta, glm::Vec2::zeros())
    }

    pub fn gamepad(&self) -> &GamepadAxes {
        &self.gamepad
    }

    pub fn set_gamepad(&mut self, gamepad: GamepadAxes) {
        self.gamepad = gamepad;
    }

    fn clear(&mut self) {
        self.keystates.clear();
        self.mouse_look_active = false;
        self.mouse_delta = glm::Vec2::zeros();
    }
}

pub struct GamepadInput {
    gilrs: Option<Gilrs>,
}

impl GamepadInput {
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(gilrs) => {
                for (_id, gamepad) in gilrs.gamepads() {
                    info!("Gamepad connected: {}", gamepad.name());
                }
                Some(gilrs)
            }
            Err(error) => {
                warn!("Gamepad support unavailable: {}", error);
                None
            }
        };
        Self { gilrs }
    }

    pub fn poll(&mut self) -> GamepadAxes {
        let gilrs = match self.gilrs.as_mut() {
            Some(gilrs) => gilrs,
            None => return GamepadAxes::default(),
        };

        while gilrs.next_event().is_some() {}

        let gamepad = match gilrs.gamepads().find(|(_, gamepad)| gamepad.is_connected()) {
            Some((_, gamepad)) => gamepad,
            None => return GamepadAxes::default(),
        };

        let trigger = |button| {
            gamepad
                .button_data(button)
                .map(|data| data.value())
                .unwrap_or(0.0)
        };

        GamepadAxes {
            left_stick: apply_dead_zone(glm::vec2(
                gamepad.value(Axis::LeftStickX),
                gamepad.value(Axis::LeftStickY),
            )),
            right_stick: apply_dead_zone(glm::vec2(
                gamepad.value(Axis::RightStickX),
                gamepad.value(Axis::RightStickY),
            )),
            left_trigger: trigger(Button::LeftTrigger2),
            right_trigger: trigger(Button::RightTrigger2),
        }
    }
}

impl Default for GamepadInput {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_dead_zone(stick: glm::Vec2) -> glm::Vec2 {
    if glm::length(&stick) < STICK_DEAD_ZONE {
        glm::Vec2::zeros()
    } else {
        stick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_track_press_and_release() {
        let mut input = InputState::default();
        input.handle_key(VirtualKeyCode::W, ElementState::Pressed);
        assert!(input.is_key_pressed(VirtualKeyCode::W));
        assert!(!input.is_key_pressed(VirtualKeyCode::S));
        input.handle_key(VirtualKeyCode::W, ElementState::Released);
        assert!(!input.is_key_pressed(VirtualKeyCode::W));
    }

    #[test]
    fn mouse_motion_needs_the_right_button() {
        let mut input = InputState::default();
        input.handle_mouse_motion(10.0, 5.0);
        assert_eq!(input.take_mouse_delta(), glm::Vec2::zeros());

        input.handle_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.handle_mouse_motion(10.0, 5.0);
        input.handle_mouse_motion(-4.0, 1.0);
        assert_eq!(input.take_mouse_delta(), glm::vec2(6.0, 6.0));
    }

    #[test]
    fn taking_the_mouse_delta_clears_it() {
        let mut input = InputState::default();
        input.handle_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.handle_mouse_motion(3.0, 3.0);
        input.take_mouse_delta();
        assert_eq!(input.take_mouse_delta(), glm::Vec2::zeros());
    }

    #[test]
    fn releasing_the_right_button_stops_mouse_look() {
        let mut input = InputState::default();
        input.handle_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.handle_mouse_button(MouseButton::Right, ElementState::Released);
        input.handle_mouse_motion(3.0, 3.0);
        assert_eq!(input.take_mouse_delta(), glm::Vec2::zeros());
    }

    #[test]
    fn small_stick_deflection_is_ignored() {
        assert_eq!(apply_dead_zone(glm::vec2(0.05, 0.05)), glm::Vec2::zeros());
        assert_eq!(apply_dead_zone(glm::vec2(0.5, 0.0)), glm::vec2(0.5, 0.0));
    }
}
