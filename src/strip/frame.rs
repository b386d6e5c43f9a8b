use crate::color::Color;
use crate::config::RenderConfig;
use image::RgbImage;

/// A rendered RGB raster
pub type Frame = RgbImage;

/// Draw a strip as full-height blocks, left to right
///
/// Block `i` covers columns `[i * strip_width, (i + 1) * strip_width)`.
/// Colors past `max_blocks` are ignored; columns without a color stay black.
pub fn render<'a, I>(strip: I, config: &RenderConfig) -> Frame
where
    I: IntoIterator<Item = &'a Color>,
{
    let resolution = config.resolution();
    let width = resolution.width as usize;
    let strip_width = config.strip_width() as usize;

    let mut row = vec![0u8; width * 3];
    for (i, color) in strip.into_iter().take(config.max_blocks()).enumerate() {
        let start = i * strip_width * 3;
        let end = start + strip_width * 3;
        for px in row[start..end].chunks_exact_mut(3) {
            px.copy_from_slice(&color.to_array());
        }
    }

    let mut frame = RgbImage::new(resolution.width, resolution.height);
    for dst in frame.chunks_exact_mut(width * 3) {
        dst.copy_from_slice(&row);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorMode;
    use crate::config::Resolution;

    fn config(width: u32, height: u32, strip_width: u32) -> RenderConfig {
        RenderConfig::new(
            44_100,
            60,
            Resolution::new(width, height),
            strip_width,
            ColorMode::Hue,
        )
        .unwrap()
    }

    fn column(frame: &Frame, x: u32) -> Vec<[u8; 3]> {
        (0..frame.height()).map(|y| frame.get_pixel(x, y).0).collect()
    }

    #[test]
    fn test_blocks_span_full_height() {
        let cfg = config(6, 10, 2);
        let strip = [Color::RED, Color::new(0, 255, 0), Color::new(0, 0, 255)];
        let frame = render(&strip, &cfg);

        assert_eq!(frame.dimensions(), (6, 10));
        for x in 0..6 {
            let expected = strip[(x / 2) as usize].to_array();
            assert!(column(&frame, x).iter().all(|px| *px == expected));
        }
    }

    #[test]
    fn test_short_strip_leaves_black_on_the_right() {
        let cfg = config(8, 3, 2);
        let frame = render(&[Color::RED], &cfg);

        assert!(column(&frame, 1).iter().all(|px| *px == [255, 0, 0]));
        for x in 2..8 {
            assert!(column(&frame, x).iter().all(|px| *px == [0, 0, 0]));
        }
    }

    #[test]
    fn test_remainder_columns_stay_black() {
        // 7 / 2 = 3 blocks, column 6 is never covered
        let cfg = config(7, 2, 2);
        let strip = [Color::RED; 5];
        let frame = render(&strip, &cfg);

        assert_eq!(frame.get_pixel(5, 0).0, [255, 0, 0]);
        assert_eq!(frame.get_pixel(6, 0).0, [0, 0, 0]);
        assert_eq!(frame.get_pixel(6, 1).0, [0, 0, 0]);
    }

    #[test]
    fn test_empty_strip_is_black() {
        let cfg = config(4, 4, 1);
        let empty: [Color; 0] = [];
        let frame = render(&empty, &cfg);
        assert!(frame.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
