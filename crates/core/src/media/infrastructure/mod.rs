pub mod exif_frame_decoder;
pub mod ffmpeg_reader;
pub mod jpeg_preview_encoder;
