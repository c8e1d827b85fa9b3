//! Rotation utilities shared by the reprojection pipeline.
//!
//! The viewing direction is given as three angles in radians, rotations
//! about the x, y and z axes. [`rotation_from_angles`] composes them into a
//! single 3x3 rotation matrix in the fixed order `Rx * Ry * Rz`. The order
//! matters: elementary rotations do not commute, and the reprojector relies
//! on this exact composition.

use crate::camera::CameraModelError;
use nalgebra::Matrix3;

/// Composes a rotation matrix from rotations about the x, y and z axes.
///
/// The result is the matrix product `Rx(a0) * Ry(a1) * Rz(a2)` where the
/// elementary rotations are
///
/// ```text
/// Rx = | 1    0     0 |   Ry = | c1  0 -s1 |   Rz = |  c2  s2  0 |
///      | 0   c0    s0 |        |  0  1   0 |        | -s2  c2  0 |
///      | 0  -s0    c0 |        | s1  0  c1 |        |   0   0  1 |
/// ```
///
/// Angles of any magnitude are accepted; they wrap naturally through the
/// trigonometric functions.
///
/// # Errors
///
/// * [`CameraModelError::InvalidParams`] - any angle is NaN or infinite.
pub fn rotation_from_angles(angles: &[f64; 3]) -> Result<Matrix3<f64>, CameraModelError> {
    if angles.iter().any(|a| !a.is_finite()) {
        return Err(CameraModelError::InvalidParams(format!(
            "rotation angles must be finite, got {angles:?}"
        )));
    }

    let (s0, c0) = angles[0].sin_cos();
    let (s1, c1) = angles[1].sin_cos();
    let (s2, c2) = angles[2].sin_cos();

    #[rustfmt::skip]
    let rx = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, c0,  s0,
        0.0, -s0, c0,
    );
    #[rustfmt::skip]
    let ry = Matrix3::new(
        c1,  0.0, -s1,
        0.0, 1.0, 0.0,
        s1,  0.0, c1,
    );
    #[rustfmt::skip]
    let rz = Matrix3::new(
        c2,  s2,  0.0,
        -s2, c2,  0.0,
        0.0, 0.0, 1.0,
    );

    Ok(rx * ry * rz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_angles_give_identity() {
        let r = rotation_from_angles(&[0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_is_orthonormal() {
        let r = rotation_from_angles(&[0.4, -1.2, 2.9]).unwrap();
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    /// Composition order is Rx * Ry * Rz; swapping the order must change
    /// the result.
    #[test]
    fn test_rotation_non_commutativity() {
        let a = 0.7;
        let b = -0.3;
        let rx_then_ry =
            rotation_from_angles(&[a, 0.0, 0.0]).unwrap() * rotation_from_angles(&[0.0, b, 0.0]).unwrap();
        let ry_then_rx =
            rotation_from_angles(&[0.0, b, 0.0]).unwrap() * rotation_from_angles(&[a, 0.0, 0.0]).unwrap();

        let diff = (rx_then_ry - ry_then_rx).abs().max();
        assert!(diff > 1e-3, "rotation composition should not commute");

        // The composed form matches the left-to-right product of the parts
        let composed = rotation_from_angles(&[a, b, 0.0]).unwrap();
        assert_relative_eq!(composed, rx_then_ry, epsilon = 1e-12);
    }

    #[test]
    fn test_angles_wrap_through_trig() {
        use std::f64::consts::PI;
        let r1 = rotation_from_angles(&[0.25, -0.5, 1.0]).unwrap();
        let r2 = rotation_from_angles(&[0.25 + 2.0 * PI, -0.5 - 2.0 * PI, 1.0 + 2.0 * PI]).unwrap();
        assert_relative_eq!(r1, r2, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_angles_rejected() {
        for angles in [
            [f64::NAN, 0.0, 0.0],
            [0.0, f64::INFINITY, 0.0],
            [0.0, 0.0, f64::NEG_INFINITY],
        ] {
            let result = rotation_from_angles(&angles);
            assert!(matches!(result, Err(CameraModelError::InvalidParams(_))));
        }
    }
}
