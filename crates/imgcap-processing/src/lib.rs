//! imgcap processing
//!
//! Turns host image buffers into the encoded payload sent to the captioning
//! service.

#[cfg(feature = "image")]
pub mod image;

#[cfg(feature = "image")]
pub use self::image::{encode_png, EncodedImage, ImageTensor, TensorLayout};
