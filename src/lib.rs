//! Pano Tools Library
//!
//! A Rust library for reprojecting equirectangular (360 degree) panoramas
//! into rectilinear perspective views, as if a pinhole camera with a given
//! field of view were pointed in a given direction. The library provides:
//! - Pinhole and equirectangular camera models
//! - Rotation composition from per-axis viewing angles
//! - Bilinear panorama sampling with cyclic-longitude boundary handling
//! - A row-parallel perspective reprojector
//!
//! The single boundary function is [`render::get_image`]: it takes three
//! borrowed single-channel planes plus a rotation-angle triple and returns
//! one freshly allocated, channel-interleaved RGB image.

pub mod camera;
pub mod geometry;
pub mod image;
pub mod render;

// Re-export commonly used types
pub use camera::{
    CameraModel, CameraModelError, EquirectangularModel, Intrinsics, PinholeModel, Resolution,
};

pub use crate::image::{pack_planes, sample_bilinear, ImageError, PlaneView, RgbBuffer};

pub use geometry::rotation_from_angles;

pub use render::{get_image, reproject, RenderError, RenderOptions};
