//! Synthetic frames and sprites shared by the unit tests.

use image::{Rgb, RgbImage};

/// Busy, non-repeating background so no patch correlates perfectly by accident.
pub fn background(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let v = ((x * 31 + y * 17 + (x * y) % 23) % 150 + 40) as u8;
        Rgb([v, v + 30, 255 - v])
    })
}

/// A bright disc on a gradient; `seed` shifts the palette so sprites differ.
pub fn sprite(w: u32, h: u32, seed: u8) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let d = (x as i32 - w as i32 / 2).pow(2) + (y as i32 - h as i32 / 2).pow(2);
        if d < (w as i32 / 3).pow(2) {
            Rgb([250, 220u8.wrapping_sub(seed), 20u8.wrapping_add(seed)])
        } else {
            Rgb([
                ((x * 12) % 200) as u8 + 20,
                ((y * 9 + seed as u32 * 7) % 200) as u8 + 20,
                90,
            ])
        }
    })
}

pub fn dir_with(templates: &[(&str, &RgbImage)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, img) in templates {
        img.save(dir.path().join(format!("{}.png", name))).unwrap();
    }
    dir
}
