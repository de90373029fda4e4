//! Draws a captured frame into the terminal with half-block cells: every
//! cell shows two vertically stacked pixels, top as foreground and bottom as
//! background of `▀`.

use image::RgbImage;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

pub struct FramePreview<'a> {
    frame: &'a RgbImage,
}

impl<'a> FramePreview<'a> {
    pub fn new(frame: &'a RgbImage) -> Self {
        Self { frame }
    }
}

/// Largest `(cols, rows)` fitting in `area` that keeps the frame's aspect ratio.
fn fit(frame: (u32, u32), area: (u16, u16)) -> (u16, u16) {
    let (fw, fh) = (frame.0 as f64, frame.1 as f64);
    let (aw, ah) = (area.0 as f64, area.1 as f64 * 2.0);
    if fw == 0.0 || fh == 0.0 || aw == 0.0 || ah == 0.0 {
        return (0, 0);
    }
    let scale = (aw / fw).min(ah / fh);
    let cols = (fw * scale).floor().max(1.0) as u16;
    let rows = ((fh * scale) / 2.0).floor().max(1.0) as u16;
    (cols.min(area.0), rows.min(area.1))
}

fn rgb(frame: &RgbImage, x: u32, y: u32) -> Color {
    let p = frame.get_pixel(x.min(frame.width() - 1), y.min(frame.height() - 1));
    Color::Rgb(p[0], p[1], p[2])
}

impl Widget for FramePreview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (fw, fh) = self.frame.dimensions();
        let (cols, rows) = fit((fw, fh), (area.width, area.height));
        if cols == 0 || rows == 0 {
            return;
        }
        let x0 = area.x + (area.width - cols) / 2;
        let y0 = area.y + (area.height - rows) / 2;
        let pixel_rows = rows as u32 * 2;

        for row in 0..rows {
            let top = row as u32 * 2 * fh / pixel_rows;
            let bottom = (row as u32 * 2 + 1) * fh / pixel_rows;
            for col in 0..cols {
                let x = col as u32 * fw / cols as u32;
                if let Some(cell) = buf.cell_mut((x0 + col, y0 + row)) {
                    cell.set_symbol("▀")
                        .set_fg(rgb(self.frame, x, top))
                        .set_bg(rgb(self.frame, x, bottom));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn fit_keeps_aspect_ratio() {
        // 800x600 into 100x30 cells: height-bound, 60 pixel rows -> 80 cols
        assert_eq!(fit((800, 600), (100, 30)), (80, 30));
        // width-bound
        assert_eq!(fit((800, 600), (40, 100)), (40, 15));
        assert_eq!(fit((800, 600), (0, 10)), (0, 0));
    }

    #[test]
    fn cells_carry_top_and_bottom_pixels() {
        let frame = RgbImage::from_fn(2, 2, |_, y| if y == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        FramePreview::new(&frame).render(area, &mut buf);

        let cell = buf.cell((0, 0)).unwrap();
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }
}
