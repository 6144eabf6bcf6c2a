use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::color::{Palette, Rgb};
use crate::cube::{
    Camera3D, CubeSize, DirectionalLight, Lighting, DEFAULT_FOV_Y_DEGREES, DEFAULT_FRAME_MARGIN,
};

pub const CONFIG_ENV_VAR: &str = "CUBE_LATTICE_CONFIG";

const DEFAULT_CUBE_SIZE: i32 = 3;
const MIN_FOV_Y_DEGREES: f32 = 10.0;
const MAX_FOV_Y_DEGREES: f32 = 150.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("parse config json{}: {source}", location_suffix(.location))]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {field}: {message}")]
    Validation { field: String, message: String },
}

fn location_suffix(location: &str) -> String {
    if location.is_empty() || location == "." {
        String::new()
    } else {
        format!(" at {location}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
    /// Extra room left around the lattice when framing, `>= 1.0`.
    pub frame_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = Camera3D::default();
        Self {
            fov_y_degrees: DEFAULT_FOV_Y_DEGREES,
            yaw_degrees: camera.yaw_radians.to_degrees(),
            pitch_degrees: camera.pitch_radians.to_degrees(),
            frame_margin: DEFAULT_FRAME_MARGIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionalLightConfig {
    pub direction: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightingConfig {
    pub ambient: f32,
    pub directional: Vec<DirectionalLightConfig>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        let lighting = Lighting::default();
        Self {
            ambient: lighting.ambient,
            directional: lighting
                .directional
                .iter()
                .map(|light| DirectionalLightConfig {
                    direction: light.direction.to_array(),
                    intensity: light.intensity,
                })
                .collect(),
        }
    }
}

/// Start-up settings for the lattice surface: edge length, palette, camera
/// and lights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatticeConfig {
    pub cube_size: i32,
    pub palette: Palette,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            cube_size: DEFAULT_CUBE_SIZE,
            palette: Palette::new(vec![
                Rgb::new(220, 60, 60),
                Rgb::new(70, 180, 90),
                Rgb::new(60, 110, 220),
                Rgb::new(235, 200, 60),
            ]),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
        }
    }
}

impl LatticeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: Self =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                let location = error.path().to_string();
                ConfigError::Parse {
                    location,
                    source: error.into_inner(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        CubeSize::new(self.cube_size)
            .map_err(|error| validation_err("cube_size", error.to_string()))?;
        if self.palette.len() > usize::from(u16::MAX) + 1 {
            return Err(validation_err(
                "palette",
                format!("at most {} entries allowed", usize::from(u16::MAX) + 1),
            ));
        }

        let camera = &self.camera;
        if !camera.fov_y_degrees.is_finite()
            || !(MIN_FOV_Y_DEGREES..=MAX_FOV_Y_DEGREES).contains(&camera.fov_y_degrees)
        {
            return Err(expected_actual(
                "camera.fov_y_degrees",
                format!("{MIN_FOV_Y_DEGREES}..={MAX_FOV_Y_DEGREES}"),
                camera.fov_y_degrees,
            ));
        }
        for (field, value) in [
            ("camera.yaw_degrees", camera.yaw_degrees),
            ("camera.pitch_degrees", camera.pitch_degrees),
        ] {
            if !value.is_finite() {
                return Err(expected_actual(field, "finite number", value));
            }
        }
        if !camera.frame_margin.is_finite() || camera.frame_margin < 1.0 {
            return Err(expected_actual(
                "camera.frame_margin",
                "finite number >= 1.0",
                camera.frame_margin,
            ));
        }

        let lighting = &self.lighting;
        if !lighting.ambient.is_finite() || lighting.ambient < 0.0 {
            return Err(expected_actual(
                "lighting.ambient",
                "finite number >= 0.0",
                lighting.ambient,
            ));
        }
        for (index, light) in lighting.directional.iter().enumerate() {
            let direction = Vec3::from_array(light.direction);
            if !direction.is_finite() || direction.length_squared() <= f32::EPSILON {
                return Err(validation_err(
                    &format!("lighting.directional[{index}].direction"),
                    "must be a finite non-zero vector",
                ));
            }
            if !light.intensity.is_finite() || light.intensity < 0.0 {
                return Err(expected_actual(
                    &format!("lighting.directional[{index}].intensity"),
                    "finite number >= 0.0",
                    light.intensity,
                ));
            }
        }
        Ok(())
    }

    pub fn lighting(&self) -> Lighting {
        Lighting {
            ambient: self.lighting.ambient,
            directional: self
                .lighting
                .directional
                .iter()
                .map(|light| DirectionalLight {
                    direction: Vec3::from_array(light.direction),
                    intensity: light.intensity,
                })
                .collect(),
        }
    }

    pub fn apply_camera(&self, camera: &mut Camera3D) {
        camera.fov_y_radians = self.camera.fov_y_degrees.to_radians();
        camera.yaw_radians = self.camera.yaw_degrees.to_radians();
        camera.pitch_radians = self.camera.pitch_degrees.to_radians();
    }
}

fn validation_err(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

fn expected_actual(
    field: &str,
    expected: impl std::fmt::Display,
    actual: impl std::fmt::Display,
) -> ConfigError {
    validation_err(field, format!("expected {expected}, got {actual}"))
}

pub fn load_lattice_config(path: &Path) -> Result<LatticeConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    LatticeConfig::from_json_str(&raw)
}

/// Loads the file named by `CUBE_LATTICE_CONFIG`, or the defaults when the
/// variable is unset.
pub fn load_lattice_config_from_env() -> Result<LatticeConfig, ConfigError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(value) => {
            let path = PathBuf::from(value);
            let config = load_lattice_config(&path)?;
            info!(
                path = %path.display(),
                cube_size = config.cube_size,
                palette_len = config.palette.len(),
                "lattice_config_loaded"
            );
            Ok(config)
        }
        Err(env::VarError::NotPresent) => Ok(LatticeConfig::default()),
        Err(source) => Err(ConfigError::EnvVar {
            var: CONFIG_ENV_VAR,
            source,
        }),
    }
}
