//! rollcall-hw: Camera capture for the attendance daemon.
//!
//! Opens a V4L2 device, converts captured buffers to grayscale and
//! publishes the latest frame from a dedicated capture thread.

pub mod camera;
pub mod frame;
pub mod stream;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use stream::CameraStream;
