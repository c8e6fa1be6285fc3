//! Image content codes: difference hash over a grayscale thumbnail.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::Bits;

/// Thumbnail width; each row contributes `WIDTH - 1` = 8 comparison bits.
const WIDTH: u32 = 9;

/// Difference hash of `img` as 64-bit lanes (most significant first).
///
/// The image is reduced to a `9 x (bits / 8)` grayscale thumbnail and every
/// bit records whether a pixel is darker than its right-hand neighbour.
pub fn dhash(img: &DynamicImage, bits: Bits) -> Vec<u64> {
    let rows = u32::from(bits.get()) / (WIDTH - 1);
    let thumb = img.resize_exact(WIDTH, rows, FilterType::Triangle).to_luma8();

    let mut lanes = vec![0u64; bits.lanes()];
    let mut idx = 0usize;
    for y in 0..rows {
        for x in 0..WIDTH - 1 {
            let left = thumb.get_pixel(x, y).0[0];
            let right = thumb.get_pixel(x + 1, y).0[0];
            if left < right {
                lanes[idx / 64] |= 1u64 << (63 - idx % 64);
            }
            idx += 1;
        }
    }
    lanes
}
