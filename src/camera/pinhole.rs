//! Implements the Pinhole camera model.
//!
//! This module provides the [`PinholeModel`] struct for representing an ideal
//! perspective camera with no lens distortion. It adheres to the [`CameraModel`]
//! trait defined in the parent `camera` module ([`crate::camera`]). The model is
//! most commonly constructed from a target field of view and output resolution
//! via [`PinholeModel::from_fov`], which is how the perspective reprojector
//! derives its virtual camera.

use crate::camera::{validation, CameraModel, CameraModelError, Intrinsics, Resolution};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use yaml_rust::YamlLoader;

/// Represents a Pinhole camera model.
///
/// Holds the intrinsic parameters (focal length, principal point) and the
/// image resolution of an ideal distortion-free perspective camera.
///
/// # Examples
///
/// ```rust
/// use pano_tools::camera::pinhole::PinholeModel;
/// use pano_tools::camera::Resolution;
///
/// // A 90 degree horizontal field of view over a 640x360 image gives a
/// // focal length of 640 / (2 * tan(45 deg)) = 320 pixels.
/// let model = PinholeModel::from_fov(90.0, Resolution { width: 640, height: 360 }).unwrap();
/// assert!((model.intrinsics.fx - 320.0).abs() < 1e-9);
/// assert!((model.intrinsics.cx - 320.0).abs() < 1e-9);
/// assert!((model.intrinsics.cy - 180.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinholeModel {
    /// The intrinsic parameters of the camera, [`Intrinsics`] (fx, fy, cx, cy).
    pub intrinsics: Intrinsics,
    /// The resolution of the camera image, [`Resolution`] (width, height).
    pub resolution: Resolution,
}

impl PinholeModel {
    /// Creates a new [`PinholeModel`] from explicit intrinsics and resolution.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::FocalLengthMustBePositive`]
    /// * [`CameraModelError::PrincipalPointMustBeFinite`]
    /// * [`CameraModelError::ResolutionMustBePositive`]
    pub fn new(intrinsics: Intrinsics, resolution: Resolution) -> Result<Self, CameraModelError> {
        let model = PinholeModel {
            intrinsics,
            resolution,
        };
        model.validate_params()?;
        Ok(model)
    }

    /// Derives a [`PinholeModel`] from a horizontal field of view and an
    /// output resolution.
    ///
    /// The focal length is `width / (2 * tan(fov / 2))` and the principal
    /// point sits at the image center `(width / 2, height / 2)`.
    ///
    /// # Arguments
    ///
    /// * `fov_degrees` - Horizontal field of view in degrees, strictly
    ///   inside `(0, 180)`.
    /// * `resolution` - Output image size in pixels, both sides non-zero.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::FieldOfViewOutOfRange`] - fov outside `(0, 180)`
    ///   or non-finite. Values at the boundary would yield an infinite or
    ///   zero focal length, which is rejected here rather than propagated.
    /// * [`CameraModelError::ResolutionMustBePositive`]
    pub fn from_fov(fov_degrees: f64, resolution: Resolution) -> Result<Self, CameraModelError> {
        validation::validate_fov_degrees(fov_degrees)?;
        validation::validate_resolution(&resolution)?;

        let fov = fov_degrees.to_radians();
        let focal_length = resolution.width as f64 / (2.0 * (fov / 2.0).tan());

        Self::new(
            Intrinsics {
                fx: focal_length,
                fy: focal_length,
                cx: resolution.width as f64 / 2.0,
                cy: resolution.height as f64 / 2.0,
            },
            resolution,
        )
    }

    /// Back-projects the pixel `(u, v)` to the camera-space ray
    /// `((u - cx) / fx, (v - cy) / fy, 1)`.
    ///
    /// Unlike [`CameraModel::unproject`] this performs no bounds checking and
    /// does not normalize; it is the form used by the per-pixel reprojection
    /// loop, where only the ray direction matters.
    #[inline]
    pub fn ray_for_pixel(&self, u: f64, v: f64) -> Vector3<f64> {
        Vector3::new(
            (u - self.intrinsics.cx) / self.intrinsics.fx,
            (v - self.intrinsics.cy) / self.intrinsics.fy,
            1.0,
        )
    }
}

impl CameraModel for PinholeModel {
    /// Projects a camera-space ray to 2D image coordinates.
    ///
    /// Applies the pinhole projection equations:
    /// `u = fx * X / Z + cx`, `v = fy * Y / Z + cy`.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::RayAtCameraCenter`]: the ray's Z-component is too
    ///   close to zero.
    /// * [`CameraModelError::ProjectionOutSideImage`]: the projected point
    ///   falls outside the camera's resolution.
    fn project(&self, ray: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        // A ray grazing the image plane has no stable projection
        if ray.z < f64::EPSILON.sqrt() {
            return Err(CameraModelError::RayAtCameraCenter);
        }
        let u = self.intrinsics.fx * ray.x / ray.z + self.intrinsics.cx;
        let v = self.intrinsics.fy * ray.y / ray.z + self.intrinsics.cy;

        if u < 0.0
            || u >= self.resolution.width as f64
            || v < 0.0
            || v >= self.resolution.height as f64
        {
            return Err(CameraModelError::ProjectionOutSideImage);
        }

        Ok(Vector2::new(u, v))
    }

    /// Unprojects a 2D image point to a unit 3D ray in camera coordinates.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::PointIsOutSideImage`]: the input point lies
    ///   outside the camera's resolution.
    fn unproject(&self, point_2d: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        if point_2d.x < 0.0
            || point_2d.x >= self.resolution.width as f64
            || point_2d.y < 0.0
            || point_2d.y >= self.resolution.height as f64
        {
            return Err(CameraModelError::PointIsOutSideImage);
        }

        let mx = (point_2d.x - self.intrinsics.cx) / self.intrinsics.fx;
        let my = (point_2d.y - self.intrinsics.cy) / self.intrinsics.fy;

        let r2 = mx * mx + my * my;
        let norm_inv = 1.0 / (1.0 + r2).sqrt();

        Ok(Vector3::new(mx * norm_inv, my * norm_inv, norm_inv))
    }

    /// Loads camera parameters from a YAML file.
    ///
    /// The file is expected to carry a `cam0` entry with `intrinsics`
    /// (fx, fy, cx, cy) and `resolution` (width, height) arrays.
    ///
    /// # Related
    /// * [`PinholeModel::save_to_yaml()`]
    fn load_from_yaml(path: &str) -> Result<Self, CameraModelError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;
        let doc = &docs[0];

        let intrinsics_yaml = doc["cam0"]["intrinsics"].as_vec().ok_or_else(|| {
            CameraModelError::InvalidParams("YAML missing 'intrinsics' or not an array".to_string())
        })?;
        let resolution_yaml = doc["cam0"]["resolution"].as_vec().ok_or_else(|| {
            CameraModelError::InvalidParams("YAML missing 'resolution' or not an array".to_string())
        })?;

        let intrinsics = Intrinsics {
            fx: intrinsics_yaml[0].as_f64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid fx: not a float".to_string())
            })?,
            fy: intrinsics_yaml[1].as_f64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid fy: not a float".to_string())
            })?,
            cx: intrinsics_yaml[2].as_f64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid cx: not a float".to_string())
            })?,
            cy: intrinsics_yaml[3].as_f64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid cy: not a float".to_string())
            })?,
        };

        let resolution = Resolution {
            width: resolution_yaml[0].as_i64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid width: not an integer".to_string())
            })? as u32,
            height: resolution_yaml[1].as_i64().ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid height: not an integer".to_string())
            })? as u32,
        };

        Self::new(intrinsics, resolution)
    }

    /// Saves the camera model's parameters to a YAML file in the format
    /// accepted by [`PinholeModel::load_from_yaml()`].
    fn save_to_yaml(&self, path: &str) -> Result<(), CameraModelError> {
        let yaml = serde_yaml::to_value(serde_yaml::Mapping::from_iter([(
            serde_yaml::Value::String("cam0".to_string()),
            serde_yaml::to_value(serde_yaml::Mapping::from_iter([
                (
                    serde_yaml::Value::String("camera_model".to_string()),
                    serde_yaml::Value::String("pinhole".to_string()),
                ),
                (
                    serde_yaml::Value::String("intrinsics".to_string()),
                    serde_yaml::to_value(vec![
                        self.intrinsics.fx,
                        self.intrinsics.fy,
                        self.intrinsics.cx,
                        self.intrinsics.cy,
                    ])
                    .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
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
        validation::validate_intrinsics(&self.intrinsics)?;
        validation::validate_resolution(&self.resolution)?;
        Ok(())
    }

    fn get_resolution(&self) -> Resolution {
        self.resolution.clone()
    }
}
