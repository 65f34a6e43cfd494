//! Sample-order and color-space conversions.

use crate::error::{NormalizeError, Result};
use crate::normalize::PixelView;

const OPAQUE: u8 = 0xff;

/// Conversion for the `RGBA` layout: BGR(A) samples to opaque RGBA.
pub fn rgba_recipe(view: &PixelView<'_>) -> Result<Vec<u8>> {
    bgr_to_rgba(view.data, view.channels).map_err(|err| match err {
        NormalizeError::UnsupportedChannels { channels, .. } => {
            NormalizeError::UnsupportedChannels {
                layout: "RGBA",
                channels,
            }
        }
        other => other,
    })
}

/// Conversion for the `YUV422_8BPP` layout.
///
/// Packed UYVY is expanded to full-resolution BGR, swapped to RGB, then
/// given an opaque alpha channel.
pub fn yuv422_recipe(view: &PixelView<'_>) -> Result<Vec<u8>> {
    if view.channels != 2 {
        return Err(NormalizeError::UnsupportedChannels {
            layout: "YUV422_8BPP",
            channels: view.channels,
        });
    }
    let mut rgb = uyvy_to_bgr(view.data, view.width, view.height)?;
    swap_red_blue(&mut rgb, 3);
    Ok(rgb_to_rgba(&rgb))
}

/// Output order for the `RGBA` layout: canonical RGBA goes back to the
/// producer's sample order, keeping the opaque alpha.
pub fn restore_source_order(rgba: &mut [u8]) {
    swap_red_blue(rgba, 4);
}

/// Output order for layouts whose canonical RGBA is already true RGB.
pub fn keep_canonical_order(_rgba: &mut [u8]) {}

/// Reorder 3- or 4-channel BGR(A) pixels to RGBA with alpha forced opaque.
pub fn bgr_to_rgba(src: &[u8], channels: usize) -> Result<Vec<u8>> {
    if channels != 3 && channels != 4 {
        return Err(NormalizeError::UnsupportedChannels {
            layout: "BGR",
            channels,
        });
    }
    let mut out = Vec::with_capacity(src.len() / channels * 4);
    for px in src.chunks_exact(channels) {
        out.extend_from_slice(&[px[2], px[1], px[0], OPAQUE]);
    }
    Ok(out)
}

/// Swap the first and third sample of every pixel in place.
///
/// Applying it twice restores the input.
pub fn swap_red_blue(buf: &mut [u8], channels: usize) {
    if channels < 3 {
        return;
    }
    for px in buf.chunks_exact_mut(channels) {
        px.swap(0, 2);
    }
}

/// Append an opaque alpha sample to every 3-channel pixel.
pub fn rgb_to_rgba(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() / 3 * 4);
    for px in src.chunks_exact(3) {
        out.extend_from_slice(&[px[0], px[1], px[2], OPAQUE]);
    }
    out
}

/// Expand packed 4:2:2 (`U0 Y0 V0 Y1` per macropixel) to 3-channel BGR.
///
/// Each chroma pair is shared by the two horizontally adjacent pixels.
pub fn uyvy_to_bgr(src: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(NormalizeError::OddWidth(width));
    }
    let pixels = width.saturating_mul(height);
    let mut out = Vec::with_capacity(pixels.saturating_mul(3));
    for mp in src.chunks_exact(4) {
        let (u, y0, v, y1) = (mp[0], mp[1], mp[2], mp[3]);
        for y in [y0, y1] {
            let (r, g, b) = yuv_to_rgb(y, u, v);
            out.extend_from_slice(&[b, g, r]);
        }
    }
    Ok(out)
}

/// BT.601 full-range YUV to RGB for one pixel (fixed point, 8 fractional bits).
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = i32::from(y);
    let u = i32::from(u) - 128;
    let v = i32::from(v) - 128;
    let r = (y + ((359 * v) >> 8)).clamp(0, 255) as u8;
    let g = (y - ((88 * u + 183 * v) >> 8)).clamp(0, 255) as u8;
    let b = (y + ((454 * u) >> 8)).clamp(0, 255) as u8;
    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_is_gray() {
        for y in [0u8, 16, 128, 235, 255] {
            assert_eq!(yuv_to_rgb(y, 128, 128), (y, y, y));
        }
    }

    #[test]
    fn strong_red_chroma() {
        assert_eq!(yuv_to_rgb(76, 128, 255), (254, 0, 76));
    }

    #[test]
    fn results_are_clamped() {
        let (_, _, b) = yuv_to_rgb(255, 255, 128);
        assert_eq!(b, 255);
        let (_, _, b) = yuv_to_rgb(0, 0, 128);
        assert_eq!(b, 0);
    }

    #[test]
    fn uyvy_shares_chroma_across_pixel_pair() {
        let src = [128, 10, 128, 200];
        let bgr = uyvy_to_bgr(&src, 2, 1).unwrap();
        assert_eq!(bgr, vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn uyvy_rejects_odd_width() {
        assert!(matches!(
            uyvy_to_bgr(&[128, 0, 128], 3, 1),
            Err(NormalizeError::OddWidth(3))
        ));
    }

    #[test]
    fn bgr_three_channel_gains_alpha() {
        let out = bgr_to_rgba(&[1, 2, 3, 4, 5, 6], 3).unwrap();
        assert_eq!(out, vec![3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn bgra_alpha_is_replaced() {
        let out = bgr_to_rgba(&[1, 2, 3, 0], 4).unwrap();
        assert_eq!(out, vec![3, 2, 1, 255]);
    }

    #[test]
    fn bgr_rejects_other_channel_counts() {
        assert!(matches!(
            bgr_to_rgba(&[1, 2], 2),
            Err(NormalizeError::UnsupportedChannels { channels: 2, .. })
        ));
        assert!(matches!(
            bgr_to_rgba(&[], 0),
            Err(NormalizeError::UnsupportedChannels { channels: 0, .. })
        ));
    }

    #[test]
    fn swap_is_an_involution() {
        let original: Vec<u8> = (0..=255).cycle().take(4 * 97).collect();
        let mut buf = original.clone();
        swap_red_blue(&mut buf, 4);
        assert_ne!(buf, original);
        assert_eq!(&buf[..4], &[2, 1, 0, 3]);
        swap_red_blue(&mut buf, 4);
        assert_eq!(buf, original);
    }

    #[test]
    fn rgba_round_trip_keeps_source_order() {
        let data = [10, 20, 30, 40, 50, 60, 70, 80];
        let view = PixelView {
            width: 2,
            height: 1,
            channels: 4,
            data: &data,
        };
        let mut out = rgba_recipe(&view).unwrap();
        assert_eq!(out, vec![30, 20, 10, 255, 70, 60, 50, 255]);
        restore_source_order(&mut out);
        assert_eq!(out, vec![10, 20, 30, 255, 50, 60, 70, 255]);
    }

    #[test]
    fn canonical_order_is_left_alone() {
        let mut buf = vec![254, 0, 76, 255];
        keep_canonical_order(&mut buf);
        assert_eq!(buf, vec![254, 0, 76, 255]);
    }

    #[test]
    fn yuv422_recipe_outputs_rgba() {
        let data = [128, 76, 255, 76];
        let view = PixelView {
            width: 2,
            height: 1,
            channels: 2,
            data: &data,
        };
        let out = yuv422_recipe(&view).unwrap();
        assert_eq!(out, vec![254, 0, 76, 255, 254, 0, 76, 255]);
    }

    #[test]
    fn yuv422_recipe_needs_two_channels() {
        let data = [0u8; 6];
        let view = PixelView {
            width: 2,
            height: 1,
            channels: 3,
            data: &data,
        };
        assert!(matches!(
            yuv422_recipe(&view),
            Err(NormalizeError::UnsupportedChannels {
                layout: "YUV422_8BPP",
                channels: 3,
            })
        ));
    }
}
