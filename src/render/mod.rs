//! Perspective reprojection of equirectangular panoramas.
//!
//! [`reproject`] is the core algorithm: for every pixel of the output
//! perspective image it back-projects a camera ray, rotates it into world
//! space, maps it through the panorama's spherical parameterization and
//! samples the panorama bilinearly. [`get_image`] is the boundary function
//! a host application calls with three channel planes and a viewing
//! direction.
//!
//! Every output pixel is computed independently from immutable inputs, so
//! the pixel loop is parallelized over output rows with rayon. Repeated
//! calls with identical inputs produce byte-identical output.

use crate::camera::{
    CameraModelError, EquirectangularModel, PinholeModel, Resolution,
};
use crate::geometry::rotation_from_angles;
use crate::image::{pack_planes, sample_bilinear, ImageError, PlaneView, RgbBuffer, CHANNELS};
use log::{debug, trace};
use nalgebra::Matrix3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Camera(#[from] CameraModelError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("Invalid render parameters: {0}")]
    InvalidParams(String),
}

/// Output parameters of a reprojection call.
///
/// The defaults match the historically hard-coded values of the original
/// pipeline: a 640x360 output with a 90 degree horizontal field of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Size of the perspective output image in pixels.
    pub output: Resolution,
    /// Horizontal field of view in degrees, strictly inside `(0, 180)`.
    pub fov_degrees: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            output: Resolution {
                width: 640,
                height: 360,
            },
            fov_degrees: 90.0,
        }
    }
}

/// Renders a rectilinear perspective view of an equirectangular panorama.
///
/// For every output pixel `(px, py)`:
/// 1. back-project to the camera ray `((px - cx) / fx, (py - cy) / fy, 1)`,
/// 2. rotate into world space with `rotation`,
/// 3. convert the rotated ray to longitude/latitude and on to fractional
///    panorama coordinates,
/// 4. sample the panorama bilinearly (columns wrap, rows clamp).
///
/// All preconditions are checked before any pixel is computed; per-pixel
/// numerical edge cases are absorbed by the sampler's wrap/clamp policy and
/// never abort the frame. The output allocation is the only side effect.
///
/// # Errors
///
/// * [`RenderError::InvalidParams`] - the rotation matrix contains
///   non-finite entries.
pub fn reproject(
    pano: &RgbBuffer,
    camera: &PinholeModel,
    rotation: &Matrix3<f64>,
) -> Result<RgbBuffer, RenderError> {
    if rotation.iter().any(|value| !value.is_finite()) {
        return Err(RenderError::InvalidParams(
            "rotation matrix must be finite".to_string(),
        ));
    }

    let sphere = EquirectangularModel::new(Resolution {
        width: pano.width(),
        height: pano.height(),
    })?;

    let output_size = camera.resolution.clone();
    let mut output = RgbBuffer::new(output_size.width, output_size.height)?;

    let row_stride = output_size.width as usize * CHANNELS;
    output
        .as_bytes_mut()
        .par_chunks_mut(row_stride)
        .enumerate()
        .for_each(|(py, row)| {
            for px in 0..output_size.width as usize {
                let ray = camera.ray_for_pixel(px as f64, py as f64);
                let world_ray = rotation * ray;
                let (u, v) = sphere.pixel_for_ray(&world_ray);
                let rgb = sample_bilinear(pano, u, v);
                row[px * CHANNELS..(px + 1) * CHANNELS].copy_from_slice(&rgb);
            }
        });

    Ok(output)
}

/// Builds a perspective view from three panorama channel planes and a
/// viewing direction.
///
/// This is the single entry point a host runtime calls: the planes are
/// interleaved into one RGB panorama, the virtual pinhole camera is derived
/// from `options`, the viewing rotation from `angles` (radians, rotations
/// about the x, y and z axes, composed as `Rx * Ry * Rz`), and the panorama
/// is reprojected. The result is row-major and channel-interleaved; see
/// [`RgbBuffer::strides`] for the exact layout contract.
///
/// # Errors
///
/// Fails fast, before any pixel work:
///
/// * [`ImageError::ShapeMismatch`] - the three planes disagree in size.
/// * [`CameraModelError::FieldOfViewOutOfRange`] /
///   [`CameraModelError::ResolutionMustBePositive`] - degenerate options.
/// * [`CameraModelError::InvalidParams`] - non-finite angles.
///
/// # Examples
///
/// ```rust
/// use pano_tools::image::PlaneView;
/// use pano_tools::render::{get_image, RenderOptions};
///
/// let plane = vec![128u8; 360 * 180];
/// let planes = [
///     PlaneView::new(&plane, 360, 180).unwrap(),
///     PlaneView::new(&plane, 360, 180).unwrap(),
///     PlaneView::new(&plane, 360, 180).unwrap(),
/// ];
/// let view = get_image(&planes, &[0.0, 0.0, 0.0], &RenderOptions::default()).unwrap();
/// assert_eq!(view.shape(), (360, 640, 3));
/// ```
pub fn get_image(
    planes: &[PlaneView<'_>; 3],
    angles: &[f64; 3],
    options: &RenderOptions,
) -> Result<RgbBuffer, RenderError> {
    let pano = pack_planes(planes)?;
    let camera = PinholeModel::from_fov(options.fov_degrees, options.output.clone())?;
    let rotation = rotation_from_angles(angles)?;

    debug!(
        "reprojecting {}x{} panorama to {}x{} at fov {} deg: focal length {:.3}, principal point ({:.1}, {:.1}), angles {:?}",
        pano.width(),
        pano.height(),
        options.output.width,
        options.output.height,
        options.fov_degrees,
        camera.intrinsics.fx,
        camera.intrinsics.cx,
        camera.intrinsics.cy,
        angles
    );
    trace!("composed rotation matrix: {rotation:.6}");

    reproject(&pano, &camera, &rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// A 360x180 panorama whose red channel encodes longitude and green
    /// channel latitude as linear gradients.
    fn gradient_planes() -> ([Vec<u8>; 3], u32, u32) {
        let (width, height) = (360u32, 180u32);
        let mut red = vec![0u8; (width * height) as usize];
        let mut green = vec![0u8; (width * height) as usize];
        let blue = vec![0u8; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                red[idx] = (x as f64 / width as f64 * 255.0) as u8;
                green[idx] = (y as f64 / height as f64 * 255.0) as u8;
            }
        }
        ([red, green, blue], width, height)
    }

    fn views<'a>(planes: &'a [Vec<u8>; 3], width: u32, height: u32) -> [PlaneView<'a>; 3] {
        [
            PlaneView::new(&planes[0], width, height).unwrap(),
            PlaneView::new(&planes[1], width, height).unwrap(),
            PlaneView::new(&planes[2], width, height).unwrap(),
        ]
    }

    #[test]
    fn test_output_shape_matches_options() {
        init_logger();
        let (planes, w, h) = gradient_planes();
        let options = RenderOptions {
            output: Resolution {
                width: 123,
                height: 77,
            },
            fov_degrees: 100.0,
        };
        let view = get_image(&views(&planes, w, h), &[0.1, -0.2, 0.3], &options).unwrap();
        assert_eq!(view.shape(), (77, 123, 3));
        assert_eq!(view.strides(), (123 * 3, 3, 1));
    }

    #[test]
    fn test_reprojection_is_deterministic() {
        init_logger();
        let (planes, w, h) = gradient_planes();
        let options = RenderOptions::default();
        let angles = [0.4, -0.7, 1.1];

        let first = get_image(&views(&planes, w, h), &angles, &options).unwrap();
        let second = get_image(&views(&planes, w, h), &angles, &options).unwrap();
        assert_eq!(first, second);
    }

    /// With no rotation, the output center looks straight ahead (longitude
    /// and latitude zero) and must reproduce the panorama's center sample.
    #[test]
    fn test_identity_rotation_center_pixel() {
        let (planes, w, h) = gradient_planes();
        let options = RenderOptions::default();

        let view = get_image(&views(&planes, w, h), &[0.0, 0.0, 0.0], &options).unwrap();

        let pano = pack_planes(&views(&planes, w, h)).unwrap();
        let expected = sample_bilinear(&pano, (w as f64 - 1.0) / 2.0, (h as f64 - 1.0) / 2.0);
        assert_eq!(view.pixel(320, 180), expected);
    }

    /// End-to-end check of the longitude mapping: at zero rotation and the
    /// default 90 degree / 640x360 output, the center red value encodes
    /// longitude zero, i.e. half the gradient range.
    #[test]
    fn test_end_to_end_longitude_gradient() {
        let (planes, w, h) = gradient_planes();
        let view = get_image(
            &views(&planes, w, h),
            &[0.0, 0.0, 0.0],
            &RenderOptions::default(),
        )
        .unwrap();

        let center = view.pixel(320, 180);
        assert!(
            (center[0] as i32 - 127).abs() <= 1,
            "center red channel should encode longitude 0, got {}",
            center[0]
        );
        assert!(
            (center[1] as i32 - 127).abs() <= 1,
            "center green channel should encode latitude 0, got {}",
            center[1]
        );
    }

    /// A half-turn yaw must look at the panorama seam, where the wrapped
    /// columns keep the output finite and within the gradient extremes.
    #[test]
    fn test_half_turn_looks_at_seam() {
        let (planes, w, h) = gradient_planes();
        let view = get_image(
            &views(&planes, w, h),
            &[0.0, std::f64::consts::PI, 0.0],
            &RenderOptions::default(),
        )
        .unwrap();

        // Looking backwards: longitude pi, the red gradient's wrap point.
        // The blend of 255-ish and 0-ish columns stays inside the range and
        // the call must not panic on the wrapped reads.
        let center = view.pixel(320, 180);
        assert!(center[1] as i32 >= 126 && center[1] as i32 <= 128);
    }

    #[test]
    fn test_mismatched_planes_fail_fast() {
        let red = vec![0u8; 360 * 180];
        let green = vec![0u8; 360 * 180];
        let blue = vec![0u8; 320 * 180];
        let planes = [
            PlaneView::new(&red, 360, 180).unwrap(),
            PlaneView::new(&green, 360, 180).unwrap(),
            PlaneView::new(&blue, 320, 180).unwrap(),
        ];
        let result = get_image(&planes, &[0.0, 0.0, 0.0], &RenderOptions::default());
        assert!(matches!(
            result,
            Err(RenderError::Image(ImageError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_degenerate_options_fail_fast() {
        let (planes, w, h) = gradient_planes();

        let bad_fov = RenderOptions {
            fov_degrees: 180.0,
            ..Default::default()
        };
        assert!(matches!(
            get_image(&views(&planes, w, h), &[0.0; 3], &bad_fov),
            Err(RenderError::Camera(
                CameraModelError::FieldOfViewOutOfRange(_)
            ))
        ));

        let bad_size = RenderOptions {
            output: Resolution {
                width: 0,
                height: 360,
            },
            ..Default::default()
        };
        assert!(matches!(
            get_image(&views(&planes, w, h), &[0.0; 3], &bad_size),
            Err(RenderError::Camera(
                CameraModelError::ResolutionMustBePositive
            ))
        ));

        assert!(matches!(
            get_image(
                &views(&planes, w, h),
                &[f64::NAN, 0.0, 0.0],
                &RenderOptions::default()
            ),
            Err(RenderError::Camera(CameraModelError::InvalidParams(_)))
        ));
    }

    #[test]
    fn test_reproject_rejects_non_finite_rotation() {
        let (planes, w, h) = gradient_planes();
        let pano = pack_planes(&views(&planes, w, h)).unwrap();
        let camera = PinholeModel::from_fov(90.0, RenderOptions::default().output).unwrap();

        let mut rotation = Matrix3::identity();
        rotation[(0, 0)] = f64::NAN;
        assert!(matches!(
            reproject(&pano, &camera, &rotation),
            Err(RenderError::InvalidParams(_))
        ));
    }
}
