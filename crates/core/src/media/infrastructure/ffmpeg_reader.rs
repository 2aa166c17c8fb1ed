use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;

use crate::media::domain::video_reader::VideoReader;
use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::video_metadata::VideoMetadata;
use crate::BoxError;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24, applies the stream's display
/// rotation and wraps it in a [`Frame`].
pub struct FfmpegReader {
    input_ctx: Option<Input>,
    video_stream_index: usize,
    rotation: i32,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            rotation: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
        ffmpeg_next::init()?;
        self.close();

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
            rotation: extract_rotation(&stream),
        };

        log::debug!(
            "Opened {} ({}x{} @ {:.2} fps, {}, rotation {})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.codec,
            metadata.rotation
        );

        self.video_stream_index = video_stream_index;
        self.rotation = metadata.rotation;
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        let (decoder, scaler) = match video_decoder(ictx, self.video_stream_index) {
            Ok(pair) => pair,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        Box::new(FfmpegFrameIter {
            width: decoder.width(),
            height: decoder.height(),
            ictx,
            decoder,
            scaler,
            video_stream_index: self.video_stream_index,
            rotation: self.rotation,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        if self.input_ctx.take().is_some() {
            log::debug!("Closed video input");
        }
    }
}

fn video_decoder(
    ictx: &Input,
    stream_index: usize,
) -> Result<(ffmpeg_next::decoder::Video, scaling::Context), BoxError> {
    let stream = ictx
        .stream(stream_index)
        .ok_or("video stream disappeared after open")?;
    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = codec_ctx.decoder().video()?;

    let scaler = scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg_next::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        scaling::Flags::BILINEAR,
    )?;
    Ok((decoder, scaler))
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire video in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    rotation: i32,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, BoxError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let index = self.frame_index;
        self.frame_index += 1;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, index).rotated(self.rotation);
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Extracts the rotation angle from a video stream.
///
/// Tries stream side data (DisplayMatrix) first, then falls back to the
/// `"rotate"` metadata tag. Returns 0, 90, 180, or 270.
fn extract_rotation(stream: &ffmpeg_next::format::stream::Stream) -> i32 {
    for side_data in stream.side_data() {
        if side_data.kind() == ffmpeg_next::codec::packet::side_data::Type::DisplayMatrix {
            if let Some(angle) = parse_display_matrix(side_data.data()) {
                return normalize_rotation(angle);
            }
        }
    }

    stream
        .metadata()
        .get("rotate")
        .and_then(|s| s.parse::<i32>().ok())
        .map(normalize_rotation)
        .unwrap_or(0)
}

/// Parses a 3x3 display matrix (9 x i32, 16.16 fixed-point, little-endian)
/// into the clockwise rotation that makes the decoded frame upright.
///
/// `atan2(m[1], m[0])` is the negation of ffmpeg's counter-clockwise
/// `av_display_rotation_get`, which is the clockwise turn its autorotate
/// applies. A portrait phone clip (`[0, 1, 0, -1, ..]`) yields 90.
fn parse_display_matrix(data: &[u8]) -> Option<i32> {
    if data.len() < 36 {
        return None;
    }

    let m00 = i32::from_le_bytes(data[0..4].try_into().ok()?) as f64 / 65536.0;
    let m10 = i32::from_le_bytes(data[4..8].try_into().ok()?) as f64 / 65536.0;

    Some(m10.atan2(m00).to_degrees().round() as i32)
}

/// Snaps an angle to the nearest of 0, 90, 180, or 270.
fn normalize_rotation(angle: i32) -> i32 {
    match angle.rem_euclid(360) {
        45..=134 => 90,
        135..=224 => 180,
        225..=315 => 270,
        _ => 0,
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * CHANNELS;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}

/// Writes a short MPEG-4 clip of solid grey frames whose brightness steps
/// by 40 per frame. Also used by the pipeline tests.
#[cfg(test)]
pub(crate) fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: i32) {
    write_test_video(path, num_frames, width, height, fps, |i, _| ((i * 40) % 256) as u8);
}

/// Writes a grey MPEG-4 clip where `shade(frame_index, column)` gives the
/// brightness of every pixel in that column.
#[cfg(test)]
fn write_test_video(
    path: &Path,
    num_frames: usize,
    width: u32,
    height: u32,
    fps: i32,
    shade: impl Fn(usize, usize) -> u8,
) {
    ffmpeg_next::init().unwrap();

    let mut octx = ffmpeg_next::format::output(path).unwrap();
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
    let mut ost = octx.add_stream(Some(codec)).unwrap();

    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();
    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
    encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }

    let mut encoder = encoder_ctx
        .open_with(ffmpeg_next::Dictionary::new())
        .unwrap();
    ost.set_parameters(&encoder);
    octx.write_header().unwrap();
    let ost_time_base = octx.stream(0).unwrap().time_base();

    let mut scaler = scaling::Context::get(
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::format::Pixel::YUV420P,
        width,
        height,
        scaling::Flags::BILINEAR,
    )
    .unwrap();

    for i in 0..num_frames {
        let mut rgb_frame =
            ffmpeg_next::util::frame::video::Video::new(ffmpeg_next::format::Pixel::RGB24, width, height);
        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data_mut(0);
        for row in 0..height as usize {
            for x in 0..width as usize {
                let start = row * stride + x * 3;
                data[start..start + 3].fill(shade(i, x));
            }
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
        yuv_frame.set_pts(Some(i as i64));
        encoder.send_frame(&yuv_frame).unwrap();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }
    }

    encoder.send_eof().unwrap();
    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(0);
        encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
        encoded.write_interleaved(&mut octx).unwrap();
    }
    octx.write_trailer().unwrap();
}
