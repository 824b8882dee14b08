//! Image handling for the caption node
//!
//! - Normalized float tensors as handed over by the host (tensor)
//! - PNG, base64 and data URL encoding (encoder)

pub mod encoder;
pub mod tensor;

pub use encoder::{encode_png, EncodedImage, PNG_MEDIA_TYPE};
pub use tensor::{ImageTensor, TensorLayout};
