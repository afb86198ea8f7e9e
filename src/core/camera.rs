use glam::{Mat4, Vec3};

/// Pitch limit in degrees, keeps the view from flipping over the poles
const PITCH_LIMIT: f32 = 89.0;

/// First-person fly camera driven by yaw/pitch in degrees
pub struct Camera {
    /// Camera position in world space
    position: Vec3,
    /// Unit view direction, derived from yaw and pitch
    front: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    /// Degrees per pointer pixel
    sensitivity: f32,
    /// Last absolute pointer position seen
    last_pointer: (f64, f64),
    /// Field of view in radians
    fov: f32,
    near_plane: f32,
    far_plane: f32,
}

impl Camera {
    /// Create a camera at `position` looking down -Z (yaw -90)
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            sensitivity: 0.1,
            last_pointer: (400.0, 300.0),
            fov: 45.0_f32.to_radians(),
            near_plane: 0.1,
            far_plane: 750_000.0,
        };
        camera.update_front();
        camera
    }

    pub fn with_projection(position: Vec3, fov: f32, near_plane: f32, far_plane: f32) -> Self {
        Self {
            fov,
            near_plane,
            far_plane,
            ..Self::new(position)
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Unit vector to the camera's right
    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    /// Get field of view in radians
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    /// Set orientation directly (degrees); pitch is clamped
    pub fn set_rotation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_front();
    }

    /// Get the view matrix for rendering
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Get the projection matrix for rendering
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov, aspect_ratio, self.near_plane, self.far_plane);
        // Flip Y for Vulkan coordinate system
        proj.y_axis.y *= -1.0;
        proj
    }

    /// Apply an absolute pointer position, turning by the offset from the
    /// previous one. Screen `y` grows downward, so it is inverted for pitch.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        let x_offset = (x - self.last_pointer.0) as f32;
        let y_offset = (self.last_pointer.1 - y) as f32;
        self.last_pointer = (x, y);
        self.rotate(x_offset, y_offset);
    }

    /// Turn by pointer offsets in pixels; positive `y_offset` looks up
    pub fn rotate(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.sensitivity;
        self.pitch = (self.pitch + y_offset * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_front();
    }

    /// Move the camera forward/backward in the direction it's facing
    pub fn move_forward(&mut self, amount: f32) {
        self.position += self.front * amount;
    }

    /// Move the camera right/left (strafe)
    pub fn move_right(&mut self, amount: f32) {
        self.position += self.right() * amount;
    }

    /// Move the camera up/down in world space
    pub fn move_up(&mut self, amount: f32) {
        self.position += self.up * amount;
    }

    fn update_front(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1000.0, 5000.0))
    }
}

impl From<&crate::config::CameraConfigData> for Camera {
    fn from(data: &crate::config::CameraConfigData) -> Self {
        let mut camera = Self::with_projection(
            data.position,
            data.fov.to_radians(),
            data.near_plane,
            data.far_plane,
        );
        camera.set_sensitivity(data.mouse_sensitivity);
        camera.set_rotation(data.yaw, data.pitch);
        camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_front_looks_down_negative_z() {
        let camera = Camera::default();
        assert!((camera.front() - Vec3::NEG_Z).length() < 1e-6);
        assert!((camera.right() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = Camera::default();
        for _ in 0..10_000 {
            camera.rotate(0.0, 100.0);
        }
        assert_eq!(camera.pitch(), 89.0);
        for _ in 0..10_000 {
            camera.rotate(0.0, -100.0);
        }
        assert_eq!(camera.pitch(), -89.0);
    }

    #[test]
    fn test_pointer_moved_uses_last_position() {
        let mut camera = Camera::default();
        camera.pointer_moved(410.0, 290.0);
        assert!((camera.yaw() - -89.0).abs() < 1e-5);
        assert!((camera.pitch() - 1.0).abs() < 1e-5);

        camera.pointer_moved(410.0, 290.0);
        assert!((camera.pitch() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_front_stays_unit() {
        let mut camera = Camera::default();
        camera.rotate(123.0, 45.0);
        assert!((camera.front().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_translation() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.move_forward(10.0);
        camera.move_right(5.0);
        camera.move_up(-2.0);
        assert!((camera.position() - Vec3::new(5.0, -2.0, -10.0)).length() < 1e-4);
    }

    #[test]
    fn test_from_config() {
        let data = crate::config::CameraConfigData::default();
        let camera = Camera::from(&data);
        assert_eq!(camera.position(), Vec3::new(0.0, 1000.0, 5000.0));
        assert!((camera.fov() - 45.0_f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.near_plane(), 0.1);
        assert_eq!(camera.far_plane(), 750_000.0);
        assert_eq!(camera.yaw(), -90.0);
    }

    #[test]
    fn test_projection_flips_y() {
        let camera = Camera::default();
        let proj = camera.projection_matrix(800.0 / 600.0);
        let expected = 1.0 / (45.0_f32.to_radians() / 2.0).tan();
        assert!((proj.y_axis.y + expected).abs() < 1e-5);
    }
}
