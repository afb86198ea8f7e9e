use anyhow::{ensure, Result};
use glam::{DVec3, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::simulation::body::{Body, RadiusScale};
use crate::simulation::constants::{
    DEFAULT_DENSITY, MASS_BUMP, NUDGE_FRACTION, POSITION_DIVISOR, SCALE_DURING_INIT, SIZE_RATIO,
    SPAWN_MASS, VELOCITY_DIVISOR,
};
use crate::simulation::interaction::SpawnSettings;
use crate::simulation::world::Integration;

/// Where the binary looks for overrides
pub const DEFAULT_CONFIG_PATH: &str = "config/spacetime.json";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub window: WindowConfigData,
    pub physics: PhysicsConfigData,
    pub grid: GridConfigData,
    pub camera: CameraConfigData,
    pub interaction: InteractionConfigData,
    /// Bodies present when the application starts
    pub bodies: Vec<BodyConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            window: WindowConfigData::default(),
            physics: PhysicsConfigData::default(),
            grid: GridConfigData::default(),
            camera: CameraConfigData::default(),
            interaction: InteractionConfigData::default(),
            bodies: default_bodies(),
        }
    }
}

impl SimConfig {
    /// Configuration with no seeded bodies
    pub fn empty() -> Self {
        Self {
            bodies: Vec::new(),
            ..Self::default()
        }
    }

    /// Load configuration from JSON file
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject scales and divisors that would make radii or steps non-finite
    pub fn validate(&self) -> Result<()> {
        let physics = &self.physics;
        for (name, value) in [
            ("physics.position_divisor", physics.position_divisor),
            ("physics.velocity_divisor", physics.velocity_divisor),
            ("physics.size_ratio", physics.size_ratio),
            ("physics.scale_during_init", physics.scale_during_init),
            ("grid.size", self.grid.size),
        ] {
            ensure!(value.is_finite() && value > 0.0, "{name} must be positive, got {value}");
        }
        ensure!(self.grid.divisions >= 1, "grid.divisions must be at least 1");
        Ok(())
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid.
    /// Nothing is written back.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded configuration from {path}");
                config
            }
            Err(e) => {
                if std::path::Path::new(path).exists() {
                    log::warn!("ignoring {path}: {e}");
                } else {
                    log::debug!("no configuration at {path}, using defaults");
                }
                Self::default()
            }
        }
    }

    pub fn radius_scale(&self) -> RadiusScale {
        RadiusScale {
            standard: self.physics.size_ratio,
            during_init: self.physics.scale_during_init,
        }
    }

    pub fn integration(&self) -> Integration {
        Integration {
            position_divisor: self.physics.position_divisor,
            velocity_divisor: self.physics.velocity_divisor,
        }
    }

    pub fn spawn_settings(&self) -> SpawnSettings {
        SpawnSettings {
            mass: self.interaction.spawn_mass,
            density: self.interaction.density,
            color: self.interaction.color,
            mass_bump: self.interaction.mass_bump,
            nudge_fraction: self.interaction.nudge_fraction,
            scale: self.radius_scale(),
        }
    }

    /// Build the seeded bodies, skipping entries with non-positive mass or density
    pub fn initial_bodies(&self) -> Vec<Body> {
        let scale = self.radius_scale();
        self.bodies
            .iter()
            .filter(|b| {
                let valid = b.mass > 0.0 && b.density > 0.0;
                if !valid {
                    log::warn!("skipping body at {:?}: mass and density must be positive", b.position);
                }
                valid
            })
            .map(|b| {
                Body::new(b.position, b.velocity, b.mass, b.density, b.color, b.glow).with_scale(scale)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfigData {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfigData {
    fn default() -> Self {
        Self {
            title: "3D_TEST".to_string(),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfigData {
    pub position_divisor: f64,
    pub velocity_divisor: f64,
    pub size_ratio: f64,
    pub scale_during_init: f64,
}

impl Default for PhysicsConfigData {
    fn default() -> Self {
        Self {
            position_divisor: POSITION_DIVISOR,
            velocity_divisor: VELOCITY_DIVISOR,
            size_ratio: SIZE_RATIO,
            scale_during_init: SCALE_DURING_INIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfigData {
    pub size: f64,
    pub divisions: usize,
    #[serde(with = "vec4_serde")]
    pub color: Vec4,
}

impl Default for GridConfigData {
    fn default() -> Self {
        Self {
            size: 20000.0,
            divisions: 25,
            color: Vec4::new(1.0, 1.0, 1.0, 0.25),
        }
    }
}

/// Camera configuration (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfigData {
    #[serde(with = "vec3_serde")]
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    /// World units per second for WASD / Space / Shift
    pub move_speed: f32,
    /// World units per second per scroll notch
    pub scroll_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraConfigData {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1000.0, 5000.0),
            yaw: -90.0,
            pitch: 0.0,
            fov: 45.0,
            near_plane: 0.1,
            far_plane: 750_000.0,
            move_speed: 10_000.0,
            scroll_speed: 250_000.0,
            mouse_sensitivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfigData {
    pub spawn_mass: f64,
    pub density: f64,
    #[serde(with = "vec4_serde")]
    pub color: Vec4,
    pub mass_bump: f64,
    pub nudge_fraction: f64,
}

impl Default for InteractionConfigData {
    fn default() -> Self {
        Self {
            spawn_mass: SPAWN_MASS,
            density: DEFAULT_DENSITY,
            color: Vec4::new(1.0, 0.0, 0.0, 1.0),
            mass_bump: MASS_BUMP,
            nudge_fraction: NUDGE_FRACTION,
        }
    }
}

/// A body seeded at start-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    #[serde(with = "dvec3_serde")]
    pub position: DVec3,
    #[serde(with = "dvec3_serde")]
    pub velocity: DVec3,
    pub mass: f64,
    #[serde(default = "default_density")]
    pub density: f64,
    #[serde(with = "vec4_serde")]
    pub color: Vec4,
    #[serde(default)]
    pub glow: bool,
}

fn default_density() -> f64 {
    DEFAULT_DENSITY
}

/// Two planets on opposite sides of a glowing star
pub fn default_bodies() -> Vec<BodyConfig> {
    let cyan = Vec4::new(0.0, 1.0, 1.0, 1.0);
    vec![
        BodyConfig {
            position: DVec3::new(-5000.0, 650.0, -350.0),
            velocity: DVec3::new(0.0, 0.0, 1500.0),
            mass: 5.97219e22,
            density: 5515.0,
            color: cyan,
            glow: false,
        },
        BodyConfig {
            position: DVec3::new(5000.0, 650.0, -350.0),
            velocity: DVec3::new(0.0, 0.0, -1500.0),
            mass: 5.97219e22,
            density: 5515.0,
            color: cyan,
            glow: false,
        },
        BodyConfig {
            position: DVec3::new(0.0, 0.0, -350.0),
            velocity: DVec3::ZERO,
            mass: 1.989e25,
            density: 5515.0,
            color: Vec4::new(1.0, 0.929, 0.176, 1.0),
            glow: true,
        },
    ]
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            mass: SPAWN_MASS,
            density: DEFAULT_DENSITY,
            color: Vec4::new(1.0, 0.0, 0.0, 1.0),
            glow: false,
        }
    }
}

/// Custom serialization for Vec3
mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Vec3Data {
        x: f32,
        y: f32,
        z: f32,
    }

    pub fn serialize<S>(vec: &Vec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Vec3Data {
            x: vec.x,
            y: vec.y,
            z: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = Vec3Data::deserialize(deserializer)?;
        Ok(Vec3::new(data.x, data.y, data.z))
    }
}

mod dvec3_serde {
    use glam::DVec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct DVec3Data {
        x: f64,
        y: f64,
        z: f64,
    }

    pub fn serialize<S>(vec: &DVec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        DVec3Data {
            x: vec.x,
            y: vec.y,
            z: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DVec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = DVec3Data::deserialize(deserializer)?;
        Ok(DVec3::new(data.x, data.y, data.z))
    }
}

/// RGBA colors as `{r, g, b, a}`
mod vec4_serde {
    use glam::Vec4;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Rgba {
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    }

    pub fn serialize<S>(color: &Vec4, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Rgba {
            r: color.x,
            g: color.y,
            b: color.z,
            a: color.w,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = Rgba::deserialize(deserializer)?;
        Ok(Vec4::new(data.r, data.g, data.b, data.a))
    }
}
