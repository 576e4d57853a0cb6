pub mod codec;
pub mod video;

pub use codec::{
    base64_to_image, decode_base64, encode_base64, encode_image_base64, fetch_image_base64,
    image_to_bytes, resize_cover_crop, OutputFormat, DEFAULT_BYTES_MAX_SIZE, DEFAULT_MAX_SIZE,
};
pub use video::{extract_thumbnail, StreamInfo, ThumbnailExtractor};
