//! Template matching over captured frames.
//!
//! Templates are loaded from disk on every call so that a sprite can be
//! replaced while the bot is running.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::definitions::Image;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::rect::Rect;
use imageproc::template_matching::{find_extremes, match_template, Extremes, MatchTemplateMethod};

use crate::error::{Error, Result};
use crate::types::{Frame, FramePoint};

pub const SUN: &str = "sun";
pub const SEED: &str = "seed";
pub const LAWN: &str = "lawn";

/// Added once to each template dimension when building its bounding box.
pub const TEMPLATE_MARGIN: u32 = 10;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Score surface: one correlation coefficient in [-1, 1] per template position.
pub type Surface = Image<Luma<f32>>;

pub struct MatchResult {
    pub surface: Surface,
    /// Template size with the margin applied, `(width, height)`.
    pub template_size: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub location: (u32, u32),
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub top_left: FramePoint,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(top_left: FramePoint, (width, height): (u32, u32)) -> Self {
        Self { top_left, width, height }
    }

    pub fn bottom_right(&self) -> FramePoint {
        FramePoint::new(
            self.top_left.x + self.width as i32,
            self.top_left.y + self.height as i32,
        )
    }

    /// Midpoint of the two corners; this is where clicks land.
    pub fn center(&self) -> FramePoint {
        let br = self.bottom_right();
        FramePoint::new((self.top_left.x + br.x) / 2, (self.top_left.y + br.y) / 2)
    }
}

/// A located sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub name: String,
    pub bbox: BoundingBox,
    pub score: f32,
}

pub struct TemplateMatcher {
    dir: PathBuf,
}

impl TemplateMatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", name))
    }

    fn load(&self, name: &str) -> Result<RgbImage> {
        let path = self.template_path(name);
        image::open(&path)
            .map(|img| img.to_rgb8())
            .map_err(|source| Error::TemplateLoad { path, source })
    }

    /// Correlate template `name` against `frame`.
    pub fn match_template(&self, name: &str, frame: &Frame) -> Result<MatchResult> {
        let template = self.load(name)?;
        let (tw, th) = template.dimensions();
        let (fw, fh) = frame.dimensions();
        if tw == 0 || th == 0 || tw > fw || th > fh {
            return Err(Error::TemplateTooLarge {
                name: name.to_string(),
                template_w: tw,
                template_h: th,
                frame_w: fw,
                frame_h: fh,
            });
        }

        let surface = correlation_coefficient(&gray(frame), &gray(&template));
        Ok(MatchResult {
            surface,
            template_size: (tw + TEMPLATE_MARGIN, th + TEMPLATE_MARGIN),
        })
    }

    /// Best-scoring location of `name`, whatever its score.
    pub fn detect(&self, name: &str, frame: &Frame) -> Result<Detection> {
        let result = self.match_template(name, frame)?;
        let best = best_match(&result.surface);
        Ok(detection(name, best.location, best.score, result.template_size))
    }

    /// Every location of `name` scoring at least `threshold`.
    pub fn detect_all(&self, name: &str, frame: &Frame, threshold: f32) -> Result<Vec<Detection>> {
        let result = self.match_template(name, frame)?;
        Ok(all_matches(&result.surface, threshold)
            .into_iter()
            .map(|loc| {
                let score = result.surface.get_pixel(loc.0, loc.1)[0];
                detection(name, loc, score, result.template_size)
            })
            .collect())
    }
}

fn detection(name: &str, (x, y): (u32, u32), score: f32, size: (u32, u32)) -> Detection {
    Detection {
        name: name.to_string(),
        bbox: BoundingBox::new(FramePoint::new(x as i32, y as i32), size),
        score,
    }
}

/// Zero-mean normalized cross-correlation (OpenCV's `TM_CCOEFF_NORMED`).
///
/// The raw products come from imageproc's `CrossCorrelation`; the template
/// mean is taken out of them with the window sums, and each window's variance
/// comes from integral images. Windows or templates that are (nearly) flat
/// score 0.
fn correlation_coefficient(image: &GrayImage, template: &GrayImage) -> Surface {
    let (tw, th) = template.dimensions();
    let n = (tw * th) as f64;

    let t_sum: f64 = template.pixels().map(|p| p[0] as f64).sum();
    let t_mean = t_sum / n;
    let t_var: f64 = template.pixels().map(|p| (p[0] as f64 - t_mean).powi(2)).sum();

    let products = match_template(image, template, MatchTemplateMethod::CrossCorrelation);
    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);
    // Integral images carry an extra zero row and column, so (x, y) is the
    // sum of everything above and left of pixel (x, y).
    let window = |ii: &Image<Luma<u64>>, x: u32, y: u32| -> f64 {
        (ii.get_pixel(x + tw, y + th)[0] + ii.get_pixel(x, y)[0]
            - ii.get_pixel(x + tw, y)[0]
            - ii.get_pixel(x, y + th)[0]) as f64
    };

    Surface::from_fn(products.width(), products.height(), |x, y| {
        let i_sum = window(&sums, x, y);
        let i_var = window(&squares, x, y) - i_sum * i_sum / n;
        let denom = (t_var * i_var).sqrt();
        if t_var < 1.0 || i_var < 1.0 || denom <= f64::EPSILON {
            return Luma([0.0]);
        }
        let numer = products.get_pixel(x, y)[0] as f64 - t_mean * i_sum;
        Luma([(numer / denom).clamp(-1.0, 1.0) as f32])
    })
}

fn gray(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Global maximum of a non-empty surface. Ties go to the first position in
/// row-major order.
pub fn best_match(surface: &Surface) -> Match {
    let Extremes { max_value, max_value_location, .. } = find_extremes(surface);
    Match { location: max_value_location, score: max_value }
}

/// Every position scoring at least `threshold`, in row-major order.
/// Neighbouring hits on the same object are all reported.
pub fn all_matches(surface: &Surface, threshold: f32) -> Vec<(u32, u32)> {
    surface
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] >= threshold)
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Grayscale, Canny (200/200), then a light Gaussian blur.
pub fn edge_map(frame: &Frame) -> GrayImage {
    let edges = imageproc::edges::canny(&gray(frame), 200.0, 200.0);
    imageproc::filter::gaussian_blur_f32(&edges, 1.1)
}

/// Outline each detection with a 2px box.
pub fn annotate(frame: &mut Frame, detections: &[Detection]) {
    for d in detections {
        let BoundingBox { top_left, width, height } = d.bbox;
        draw_hollow_rect_mut(frame, Rect::at(top_left.x, top_left.y).of_size(width, height), BOX_COLOR);
        if width > 2 && height > 2 {
            let inner = Rect::at(top_left.x + 1, top_left.y + 1).of_size(width - 2, height - 2);
            draw_hollow_rect_mut(frame, inner, BOX_COLOR);
        }
    }
}
