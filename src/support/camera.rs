use crate::input::InputState;
use nalgebra_glm as glm;
use std::f32::consts::PI;
use winit::event::VirtualKeyCode;

/// Movement requested for one frame, gathered from keyboard, mouse and gamepad.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CameraInput {
    pub forward: f32,
    pub strafe: f32,
    pub vertical: f32,
    pub mouse_delta: glm::Vec2,
    pub right_stick: glm::Vec2,
}

impl CameraInput {
    pub fn from_input(input: &mut InputState) -> Self {
        let gamepad = *input.gamepad();
        let key = |input: &InputState, keycode| {
            if input.is_key_pressed(keycode) {
                1.0
            } else {
                0.0
            }
        };

        let forward = key(input, VirtualKeyCode::W) - key(input, VirtualKeyCode::S)
            + gamepad.left_stick.y;
        let strafe = key(input, VirtualKeyCode::D) - key(input, VirtualKeyCode::A)
            + gamepad.left_stick.x;
        let vertical = key(input, VirtualKeyCode::Space) - key(input, VirtualKeyCode::LShift)
            + gamepad.right_trigger
            - gamepad.left_trigger;

        Self {
            forward,
            strafe,
            vertical,
            mouse_delta: input.take_mouse_delta(),
            right_stick: gamepad.right_stick,
        }
    }
}

/// A free-flying camera in a left-handed world.
pub struct FlyCamera {
    camera_to_world: glm::Mat4,
    speed: f32,
}

impl FlyCamera {
    pub fn new(speed: f32) -> Self {
        let view = glm::look_at_lh(
            &glm::vec3(1.0, 0.25, -0.5),
            &glm::vec3(0.0, 0.02, 0.0),
            &glm::Vec3::y(),
        );
        Self::from_view(view, speed)
    }

    pub fn from_view(view: glm::Mat4, speed: f32) -> Self {
        Self {
            camera_to_world: glm::inverse(&view),
            speed,
        }
    }

    pub fn update(&mut self, input: &CameraInput, delta_time: f32, window_size: glm::Vec2) {
        let step = self.speed * delta_time;

        self.camera_to_world[(1, 3)] += input.vertical * step;

        let local_translation = glm::vec3(input.strafe * step, 0.0, input.forward * step);
        self.camera_to_world = glm::translate(&self.camera_to_world, &local_translation);

        let (width, height) = (window_size.x, window_size.y);
        let mouse_delta = if width > 0.0 && height > 0.0 {
            input.mouse_delta
        } else {
            glm::Vec2::zeros()
        };
        let thumb_speed = PI * delta_time;

        let mut pitch = -input.right_stick.y * thumb_speed;
        if height > 0.0 {
            pitch += PI / 2.0 * mouse_delta.y / height;
        }
        self.camera_to_world = glm::rotate_x(&self.camera_to_world, pitch);

        let mut yaw = input.right_stick.x * thumb_speed;
        if width > 0.0 && height > 0.0 {
            let aspect_ratio = width / height;
            yaw += PI / 2.0 * aspect_ratio * mouse_delta.x / width;
        }
        let position = self.position();
        self.camera_to_world = glm::rotation(yaw, &glm::Vec3::y()) * self.camera_to_world;
        self.set_position(&position);
    }

    pub fn view_matrix(&self) -> glm::Mat4 {
        glm::inverse(&self.camera_to_world)
    }

    pub fn camera_to_world(&self) -> &glm::Mat4 {
        &self.camera_to_world
    }

    pub fn position(&self) -> glm::Vec3 {
        glm::vec4_to_vec3(&self.camera_to_world.column(3).into_owned())
    }

    fn set_position(&mut self, position: &glm::Vec3) {
        self.camera_to_world[(0, 3)] = position.x;
        self.camera_to_world[(1, 3)] = position.y;
        self.camera_to_world[(2, 3)] = position.z;
    }

    /// Left-handed projection with depth mapped to `[0, 1]`.
    pub fn projection_matrix(
        aspect_ratio: f32,
        field_of_view_degrees: f32,
        near: f32,
        far: f32,
    ) -> glm::Mat4 {
        glm::perspective_lh_zo(aspect_ratio, field_of_view_degrees.to_radians(), near, far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WINDOW: [f32; 2] = [800.0, 600.0];

    fn window() -> glm::Vec2 {
        glm::vec2(WINDOW[0], WINDOW[1])
    }

    #[test]
    fn starts_at_the_initial_eye() {
        let camera = FlyCamera::new(1.0);
        assert_relative_eq!(camera.position(), glm::vec3(1.0, 0.25, -0.5), epsilon = 1e-5);
    }

    #[test]
    fn view_matrix_is_the_inverse_of_the_camera_transform() {
        let camera = FlyCamera::new(1.0);
        let product = camera.view_matrix() * camera.camera_to_world();
        assert_relative_eq!(product, glm::Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn vertical_motion_is_along_world_y() {
        let mut camera = FlyCamera::new(2.0);
        let input = CameraInput {
            vertical: 1.0,
            ..Default::default()
        };
        camera.update(&input, 0.5, window());
        assert_relative_eq!(camera.position(), glm::vec3(1.0, 1.25, -0.5), epsilon = 1e-5);
    }

    #[test]
    fn forward_moves_along_the_view_direction() {
        let view = glm::look_at_lh(
            &glm::vec3(0.0, 0.0, 0.0),
            &glm::vec3(0.0, 0.0, 1.0),
            &glm::Vec3::y(),
        );
        let mut camera = FlyCamera::from_view(view, 1.0);
        let input = CameraInput {
            forward: 1.0,
            ..Default::default()
        };
        camera.update(&input, 1.0, window());
        assert_relative_eq!(camera.position(), glm::vec3(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn strafe_moves_to_the_right() {
        let view = glm::look_at_lh(
            &glm::vec3(0.0, 0.0, 0.0),
            &glm::vec3(0.0, 0.0, 1.0),
            &glm::Vec3::y(),
        );
        let mut camera = FlyCamera::from_view(view, 1.0);
        let input = CameraInput {
            strafe: 1.0,
            ..Default::default()
        };
        camera.update(&input, 1.0, window());
        assert_relative_eq!(camera.position(), glm::vec3(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn yaw_keeps_the_camera_in_place() {
        let mut camera = FlyCamera::new(1.0);
        let before = camera.position();
        let input = CameraInput {
            mouse_delta: glm::vec2(120.0, 0.0),
            ..Default::default()
        };
        camera.update(&input, 0.016, window());
        assert_relative_eq!(camera.position(), before, epsilon = 1e-5);
    }

    #[test]
    fn full_width_mouse_sweep_turns_by_aspect_scaled_quarter() {
        let view = glm::look_at_lh(
            &glm::vec3(0.0, 0.0, 0.0),
            &glm::vec3(0.0, 0.0, 1.0),
            &glm::Vec3::y(),
        );
        let mut camera = FlyCamera::from_view(view, 1.0);
        let input = CameraInput {
            mouse_delta: glm::vec2(WINDOW[0], 0.0),
            ..Default::default()
        };
        camera.update(&input, 0.0, window());

        let expected_yaw = PI / 2.0 * (WINDOW[0] / WINDOW[1]);
        let forward = camera.camera_to_world() * glm::vec4(0.0, 0.0, 1.0, 0.0);
        let angle = forward.x.atan2(forward.z);
        assert_relative_eq!(angle, expected_yaw, epsilon = 1e-4);
    }

    #[test]
    fn zero_sized_window_ignores_the_mouse() {
        let mut camera = FlyCamera::new(1.0);
        let before = *camera.camera_to_world();
        let input = CameraInput {
            mouse_delta: glm::vec2(50.0, 50.0),
            ..Default::default()
        };
        camera.update(&input, 0.016, glm::vec2(0.0, 0.0));
        assert_relative_eq!(*camera.camera_to_world(), before, epsilon = 1e-6);
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let projection = FlyCamera::projection_matrix(4.0 / 3.0, 65.0, 0.01, 10000.0);
        let clip = projection * glm::vec4(0.0, 0.0, 0.01, 1.0);
        assert_relative_eq!(clip.z / clip.w, 0.0, epsilon = 1e-5);
        let clip = projection * glm::vec4(0.0, 0.0, 10000.0, 1.0);
        assert_relative_eq!(clip.z / clip.w, 1.0, epsilon = 1e-4);
    }
}
