use std::fmt;

use crate::engine::utils::input_utils::{Key, KeyState, MouseButton};
use crate::engine::utils::math::{to_radians, Matrix3, Matrix4, Quaternion, Vector3, EPSILON};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraError {
    InvalidAspect(f32),
    InvalidClipPlanes { near: f32, far: f32 },
    InvalidFov(f32),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::InvalidAspect(a) => write!(f, "Invalid aspect ratio {}", a),
            CameraError::InvalidClipPlanes { near, far } => {
                write!(f, "Invalid clip planes near={} far={} (need 0 < near < far)", near, far)
            }
            CameraError::InvalidFov(fov) => write!(f, "Invalid field of view {} degrees", fov),
        }
    }
}

impl std::error::Error for CameraError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    None,
    Rotating,
}

/// Perspective camera orbiting a focus point, driven by keyboard and an arc-ball.
///
/// `target` is the camera z axis (unit, from the focus towards the eye);
/// `right`, `up` and `target` form an orthonormal basis.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3,
    focus: Vector3,
    target: Vector3,
    up: Vector3,
    right: Vector3,

    fov: f32,
    near: f32,
    far: f32,
    aspect: f32,

    view: Matrix4,
    projection: Matrix4,

    window_width: u32,
    window_height: u32,

    state: CameraState,
    move_speed: f32,
    rotation_speed: f32,
    rotation_start: Vector3,
    rotation_end: Vector3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        let mut camera = Self {
            position: Vector3::UNIT_Z,
            focus: Vector3::zero(),
            target: Vector3::UNIT_Z,
            up: Vector3::UNIT_Y,
            right: Vector3::UNIT_X,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            window_width: 1,
            window_height: 1,
            state: CameraState::None,
            move_speed: 1.0,
            rotation_speed: 1.0,
            rotation_start: Vector3::zero(),
            rotation_end: Vector3::zero(),
        };
        camera.look_at(Vector3::UNIT_Z, Vector3::zero());
        camera.projection = Matrix4::perspective(to_radians(camera.fov), camera.aspect, camera.near, camera.far);
        camera
    }

    /// Places the eye at `position` looking at `focus`, world up being +Y.
    /// Looking straight along the Y axis leaves `right` undefined (NaN).
    pub fn look_at(&mut self, position: Vector3, focus: Vector3) {
        self.position = position;
        self.focus = focus;
        self.target = (position - focus).normalized();
        self.right = Vector3::UNIT_Y.cross(&self.target).normalized();
        self.up = self.target.cross(&self.right);
        self.update_view();
    }

    fn update_view(&mut self) {
        let rotation = Matrix4::from_matrix3(&Matrix3::from_rows(self.right, self.up, self.target));
        self.view = rotation * Matrix4::translation(-self.position);
    }

    /// Validates and applies new projection parameters (`fov` in degrees).
    pub fn update_projection_transform(&mut self, fov: f32, near: f32, far: f32, aspect: f32) -> Result<(), CameraError> {
        if !(aspect.abs() > EPSILON) || !aspect.is_finite() {
            return Err(CameraError::InvalidAspect(aspect));
        }
        if !(near > 0.0 && near < far) {
            return Err(CameraError::InvalidClipPlanes { near, far });
        }
        if !(fov > 0.0 && fov < 180.0) {
            return Err(CameraError::InvalidFov(fov));
        }
        self.fov = fov;
        self.near = near;
        self.far = far;
        self.aspect = aspect;
        self.projection = Matrix4::perspective(to_radians(fov), aspect, near, far);
        Ok(())
    }

    /// Recomputes the projection from the stored parameters.
    pub fn update_projection(&mut self) -> Result<(), CameraError> {
        self.update_projection_transform(self.fov, self.near, self.far, self.aspect)
    }

    /// Stores the window size and rebuilds the projection for its aspect
    /// ratio. A zero-sized window keeps the previous projection.
    pub fn set_window_dimension(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;
        if let Err(err) = self.update_projection_transform(self.fov, self.near, self.far, aspect) {
            log::warn!("Projection kept for {}x{} window: {}", width, height, err);
        }
    }

    /// Projection times view.
    pub fn transform(&self) -> Matrix4 {
        self.projection * self.view
    }

    // --------------------------------------------------------------------------------------------
    // Input
    // --------------------------------------------------------------------------------------------

    /// W/S move along the view direction, A/D strafe. Distances scale with `dt` seconds.
    pub fn on_keyboard(&mut self, key: Key, state: KeyState, dt: f32) {
        if state != KeyState::Press {
            return;
        }
        let step = self.move_speed * dt;
        let offset = match key {
            Key::Char(c) => match c.to_ascii_lowercase() {
                'w' => -self.target * step,
                's' => self.target * step,
                'a' => -self.right * step,
                'd' => self.right * step,
                _ => return,
            },
            Key::Up => -self.target * step,
            Key::Down => self.target * step,
            Key::Left => -self.right * step,
            Key::Right => self.right * step,
            _ => return,
        };
        self.position += offset;
        self.focus += offset;
        self.update_view();
    }

    pub fn on_mouse_click(&mut self, button: MouseButton, state: KeyState, x: f32, y: f32) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            KeyState::Press => {
                self.state = CameraState::Rotating;
                self.rotation_start = self.project_on_ball(x, y);
                self.rotation_end = self.rotation_start;
            }
            KeyState::Release => self.state = CameraState::None,
        }
    }

    pub fn on_mouse_move(&mut self, x: f32, y: f32) {
        if self.state != CameraState::Rotating {
            return;
        }
        self.rotation_end = self.project_on_ball(x, y);
        let axis = self.rotation_start.cross(&self.rotation_end);
        let angle = self.rotation_start.dot(&self.rotation_end).clamp(-1.0, 1.0).acos() * self.rotation_speed;
        self.rotation_start = self.rotation_end;
        if axis.length() < EPSILON || angle.abs() < EPSILON {
            return;
        }

        // Dragging turns the scene; the eye orbits the focus the opposite way.
        let world_axis = self.right * axis.x + self.up * axis.y + self.target * axis.z;
        let q = Quaternion::from_axis_angle(world_axis, -angle);
        self.position = self.focus + q.rotate(self.position - self.focus);
        self.right = q.rotate(self.right).normalized();
        self.up = q.rotate(self.up).normalized();
        self.target = q.rotate(self.target).normalized();
        self.update_view();
    }

    /// Maps window coordinates onto the unit arc-ball sphere.
    pub fn project_on_ball(&self, x: f32, y: f32) -> Vector3 {
        let w = self.window_width.max(1) as f32;
        let h = self.window_height.max(1) as f32;
        let px = (2.0 * x - w) / w;
        let py = (h - 2.0 * y) / h;
        let d2 = px * px + py * py;
        if d2 <= 1.0 {
            Vector3::new(px, py, (1.0 - d2).sqrt())
        } else {
            Vector3::new(px, py, 0.0).normalized()
        }
    }

    // --------------------------------------------------------------------------------------------
    // Accessors
    // --------------------------------------------------------------------------------------------

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn focus(&self) -> Vector3 {
        self.focus
    }

    pub fn target(&self) -> Vector3 {
        self.target
    }

    pub fn up(&self) -> Vector3 {
        self.up
    }

    pub fn right(&self) -> Vector3 {
        self.right
    }

    pub fn view(&self) -> &Matrix4 {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4 {
        &self.projection
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn window_dimension(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed;
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    pub fn set_rotation_speed(&mut self, speed: f32) {
        self.rotation_speed = speed;
    }
}
