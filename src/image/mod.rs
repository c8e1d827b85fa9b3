//! Pixel containers and resampling.
//!
//! Callers hand the library three borrowed single-channel planes
//! ([`PlaneView`]); [`pack_planes`] interleaves them into an owned RGB
//! buffer ([`RgbBuffer`]) that the reprojector samples with
//! [`sample_bilinear`]. Input pixel data is never copied before packing and
//! never mutated; the output buffer is freshly allocated per call.

use ::image::RgbImage;

pub const CHANNELS: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("Plane size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
    #[error("Buffer length {len} does not match a {width}x{height} plane")]
    BufferLengthMismatch { len: usize, width: u32, height: u32 },
    #[error("Image dimensions must be non-zero")]
    EmptyImage,
}

/// A read-only, row-major view over a caller-owned single-channel 8-bit
/// plane. Ownership of the pixel data stays with the caller; the library
/// only borrows it for the duration of a call.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PlaneView<'a> {
    /// Wraps a borrowed byte slice as a `width x height` plane.
    ///
    /// # Errors
    ///
    /// * [`ImageError::EmptyImage`] - either dimension is zero.
    /// * [`ImageError::BufferLengthMismatch`] - `data.len() != width * height`.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage);
        }
        if data.len() != width as usize * height as usize {
            return Err(ImageError::BufferLengthMismatch {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(PlaneView {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }
}

/// An owned row-major, channel-interleaved 8-bit RGB image.
///
/// The backing buffer always holds exactly `width * height * 3` bytes with
/// strides `(width * 3, 3, 1)`, the layout host runtimes read the result
/// buffer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl RgbBuffer {
    /// Allocates a zero-filled RGB buffer.
    ///
    /// # Errors
    ///
    /// * [`ImageError::EmptyImage`] - either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage);
        }
        Ok(RgbBuffer {
            data: vec![0u8; width as usize * height as usize * CHANNELS],
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Shape as `(rows, cols, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }

    /// Byte strides as `(row, column, channel)`:
    /// `(cols * channels, channels, 1)`.
    pub fn strides(&self) -> (usize, usize, usize) {
        (self.width as usize * CHANNELS, CHANNELS, 1)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// The `(r, g, b)` triple at integer pixel coordinates. Panics when the
    /// coordinates are out of bounds, as slice indexing does.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; CHANNELS] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl From<RgbBuffer> for RgbImage {
    fn from(buffer: RgbBuffer) -> Self {
        RgbImage::from_raw(buffer.width, buffer.height, buffer.data)
            .expect("RgbBuffer holds exactly width * height * 3 bytes")
    }
}

impl From<RgbImage> for RgbBuffer {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        RgbBuffer {
            data: image.into_raw(),
            width,
            height,
        }
    }
}

/// Interleaves three single-channel planes into one RGB image, pixel
/// channel order `(r, g, b)`.
///
/// # Errors
///
/// * [`ImageError::ShapeMismatch`] - the planes disagree in size.
pub fn pack_planes(planes: &[PlaneView<'_>; 3]) -> Result<RgbBuffer, ImageError> {
    let width = planes[0].width;
    let height = planes[0].height;
    for plane in &planes[1..] {
        if plane.width != width || plane.height != height {
            return Err(ImageError::ShapeMismatch {
                expected_width: width,
                expected_height: height,
                width: plane.width,
                height: plane.height,
            });
        }
    }

    let mut packed = RgbBuffer::new(width, height)?;
    for (i, pixel) in packed.data.chunks_exact_mut(CHANNELS).enumerate() {
        pixel[0] = planes[0].data[i];
        pixel[1] = planes[1].data[i];
        pixel[2] = planes[2].data[i];
    }
    Ok(packed)
}

/// Samples an RGB image at fractional coordinates with bilinear
/// interpolation.
///
/// The four neighbors of `(u, v)` are weighted by
/// `(1-du)(1-dv)`, `du(1-dv)`, `(1-du)dv` and `du*dv`. Because an
/// equirectangular panorama is cyclic in longitude, column indices wrap
/// modulo the width; row indices clamp to `[0, height - 1]` since the poles
/// do not wrap. Coordinates arbitrarily far outside the image are therefore
/// always safe to sample.
pub fn sample_bilinear(src: &RgbBuffer, u: f64, v: f64) -> [u8; CHANNELS] {
    let width = src.width as i64;
    let height = src.height as i64;

    let u_floor = u.floor();
    let v_floor = v.floor();
    let du = u - u_floor;
    let dv = v - v_floor;
    let u0 = u_floor as i64;
    let v0 = v_floor as i64;

    // Longitude wraps, latitude clamps
    let x0 = u0.rem_euclid(width) as u32;
    let x1 = (u0 + 1).rem_euclid(width) as u32;
    let y0 = v0.clamp(0, height - 1) as u32;
    let y1 = (v0 + 1).clamp(0, height - 1) as u32;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let w00 = (1.0 - du) * (1.0 - dv);
    let w10 = du * (1.0 - dv);
    let w01 = (1.0 - du) * dv;
    let w11 = du * dv;

    let mut out = [0u8; CHANNELS];
    for c in 0..CHANNELS {
        let value = p00[c] as f64 * w00
            + p10[c] as f64 * w10
            + p01[c] as f64 * w01
            + p11[c] as f64 * w11;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}
