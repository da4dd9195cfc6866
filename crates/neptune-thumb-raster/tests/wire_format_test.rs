use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};

use neptune_thumb_raster::{
    ColorStreamCompressor, CompressedEncoder, ImagePipeline, LegacyEncoder, Theme, ThumbnailRole,
};

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, 255])
    })
}

#[test]
fn test_decode_then_legacy_encode() {
    let img = gradient(10, 10);
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    let pipeline = ImagePipeline::new(Theme::Dark);
    let decoded = pipeline.decode(&BASE64.encode(&bytes)).unwrap();
    let encoded = LegacyEncoder.encode(&decoded, ThumbnailRole::Gimage);

    // 10 rows, one sentinel each; 4 hex chars per pixel.
    assert_eq!(encoded.wire_text.matches("M10086 ;").count(), 10);
    let payload: String = encoded
        .wire_text
        .strip_prefix(";gimage:")
        .unwrap()
        .replace("\rM10086 ;", "")
        .replace('\r', "");
    assert_eq!(payload.len(), 10 * 10 * 4);
    assert!(payload.chars().all(|c| c.is_ascii_hexdigit()));
}

struct CountingFake {
    calls: std::cell::Cell<usize>,
}

impl ColorStreamCompressor for CountingFake {
    fn encode(&self, pixels: &[u16], width: u32, height: u32, max_colors: u32) -> (Vec<u8>, i32) {
        self.calls.set(self.calls.get() + 1);
        assert_eq!(pixels.len(), (width * height) as usize);
        assert_eq!(max_colors, 1024);
        (b"PAYLOAD".to_vec(), 7)
    }
}

#[test]
fn test_compressed_encoder_delegates_once_per_image() {
    let fake = CountingFake {
        calls: std::cell::Cell::new(0),
    };
    let encoder = CompressedEncoder::new(&fake);

    let img = gradient(4, 4);
    let encoded = encoder.encode(&img, ThumbnailRole::Simage).unwrap();
    assert_eq!(fake.calls.get(), 1);
    assert!(encoded.wire_text.contains("PAYLOAD"));
    assert!(encoded.wire_text.contains(";simage:"));
}
