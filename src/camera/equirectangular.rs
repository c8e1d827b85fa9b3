//! Implements the Equirectangular camera model.
//!
//! An equirectangular panorama maps the full sphere onto a rectangle:
//! horizontal position is longitude `theta` in `(-pi, pi]` spanning the
//! image width, vertical position is latitude `phi` in `[-pi/2, pi/2]`
//! spanning the image height. The mapping is affine per axis:
//!
//! ```text
//! u = (theta + pi)   * width  / (2*pi) - 0.5
//! v = (phi   + pi/2) * height /  pi    - 0.5
//! ```
//!
//! The positive z axis is the "straight ahead" direction, so `theta` is
//! measured as `atan2(x, z)` and `phi` as `asin(y)` of the unit ray. The
//! atan2/asin forms keep the mapping numerically stable at the poles.

use crate::camera::{validation, CameraModel, CameraModelError, Resolution};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fs;
use std::io::Write;
use yaml_rust::YamlLoader;

/// Represents an equirectangular (360 x 180 degree) panorama camera.
///
/// The model is fully determined by the panorama resolution; there are no
/// intrinsic parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquirectangularModel {
    /// The resolution of the panorama image, [`Resolution`] (width, height).
    pub resolution: Resolution,
}

impl EquirectangularModel {
    /// Creates a new [`EquirectangularModel`] for a panorama of the given size.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::ResolutionMustBePositive`]
    pub fn new(resolution: Resolution) -> Result<Self, CameraModelError> {
        let model = EquirectangularModel { resolution };
        model.validate_params()?;
        Ok(model)
    }

    /// Maps a world ray to fractional panorama pixel coordinates.
    ///
    /// The ray need not be normalized. The result may fall up to half a
    /// pixel outside the image (`u` in `[-0.5, width - 0.5]`, likewise for
    /// `v`); callers sample with a wrap/clamp policy rather than index
    /// directly. No bounds checking, this is the form used by the per-pixel
    /// reprojection loop.
    #[inline]
    pub fn pixel_for_ray(&self, ray: &Vector3<f64>) -> (f64, f64) {
        let theta = ray.x.atan2(ray.z);
        // Clamp guards against |y|/norm marginally exceeding 1 in floating point
        let phi = (ray.y / ray.norm()).clamp(-1.0, 1.0).asin();

        let width = self.resolution.width as f64;
        let height = self.resolution.height as f64;
        let u = (theta + PI) * (width / (2.0 * PI)) - 0.5;
        let v = (phi + FRAC_PI_2) * (height / PI) - 0.5;
        (u, v)
    }

    /// Maps fractional panorama pixel coordinates back to a unit world ray.
    #[inline]
    pub fn ray_for_pixel(&self, u: f64, v: f64) -> Vector3<f64> {
        let width = self.resolution.width as f64;
        let height = self.resolution.height as f64;
        let theta = (u + 0.5) * (2.0 * PI / width) - PI;
        let phi = (v + 0.5) * (PI / height) - FRAC_PI_2;

        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        Vector3::new(cos_phi * sin_theta, sin_phi, cos_phi * cos_theta)
    }
}

impl CameraModel for EquirectangularModel {
    /// Projects a world ray to panorama pixel coordinates.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::RayAtCameraCenter`]: the ray has zero length.
    fn project(&self, ray: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        if ray.norm() < f64::EPSILON.sqrt() {
            return Err(CameraModelError::RayAtCameraCenter);
        }
        let (u, v) = self.pixel_for_ray(ray);
        Ok(Vector2::new(u, v))
    }

    /// Unprojects panorama pixel coordinates to a unit world ray.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::PointIsOutSideImage`]: the input point lies
    ///   outside the panorama's resolution.
    fn unproject(&self, point_2d: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        if point_2d.x < 0.0
            || point_2d.x >= self.resolution.width as f64
            || point_2d.y < 0.0
            || point_2d.y >= self.resolution.height as f64
        {
            return Err(CameraModelError::PointIsOutSideImage);
        }
        Ok(self.ray_for_pixel(point_2d.x, point_2d.y))
    }

    /// Loads the panorama resolution from a YAML file with a `cam0` entry
    /// carrying a `resolution` (width, height) array.
    fn load_from_yaml(path: &str) -> Result<Self, CameraModelError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;
        let doc = &docs[0];

        let resolution_yaml = doc["cam0"]["resolution"].as_vec().ok_or_else(|| {
            CameraModelError::InvalidParams("YAML missing 'resolution' or not an array".to_string())
        })?;

        let resolution = Resolution {
            width: resolution_yaml[0].as_i64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid width: not an integer".to_string())
            })? as u32,
            height: resolution_yaml[1].as_i64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid height: not an integer".to_string())
            })? as u32,
        };

        Self::new(resolution)
    }

    /// Saves the panorama resolution to a YAML file in the format accepted
    /// by [`EquirectangularModel::load_from_yaml()`].
    fn save_to_yaml(&self, path: &str) -> Result<(), CameraModelError> {
        let yaml = serde_yaml::to_value(serde_yaml::Mapping::from_iter([(
            serde_yaml::Value::String("cam0".to_string()),
            serde_yaml::to_value(serde_yaml::Mapping::from_iter([
                (
                    serde_yaml::Value::String("camera_model".to_string()),
                    serde_yaml::Value::String("equirectangular".to_string()),
                ),
                (
                    serde_yaml::Value::String("resolution".to_string()),
                    serde_yaml::to_value(vec![self.resolution.width, self.resolution.height])
                        .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
                ),
            ]))
            .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
        )]))
        .map_err(|e| CameraModelError::YamlError(e.to_string()))?;

        let yaml_string =
            serde_yaml::to_string(&yaml).map_err(|e| CameraModelError::YamlError(e.to_string()))?;

        let mut file =
            fs::File::create(path).map_err(|e| CameraModelError::IOError(e.to_string()))?;
        file.write_all(yaml_string.as_bytes())
            .map_err(|e| CameraModelError::IOError(e.to_string()))?;

        Ok(())
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        validation::validate_resolution(&self.resolution)?;
        Ok(())
    }

    fn get_resolution(&self) -> Resolution {
        self.resolution.clone()
    }
}
