use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb as Pixel, RgbImage};

use crate::capture::Frame;
use crate::config::Rgb;
use crate::error::DisplayError;

/// Geometry and border of the camera view.
#[derive(Debug, Clone, Copy)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub border_color: Rgb,
}

/// RGB24 image ready to upload as a texture.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Scale `frame` to fill the view (aspect-preserving, centre-cropped) and
/// draw the border over it.
pub fn render_frame(frame: &Frame, settings: &DisplaySettings) -> Result<DisplayImage, DisplayError> {
    if frame.width == 0 || frame.height == 0 || settings.width == 0 || settings.height == 0 {
        return Err(DisplayError::Empty);
    }
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.pixels.len() != expected {
        return Err(DisplayError::BadBuffer {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.pixels.len(),
        });
    }
    let source: RgbImage = ImageBuffer::from_raw(frame.width, frame.height, frame.to_rgb())
        .ok_or(DisplayError::Empty)?;

    let scale = f64::max(
        settings.width as f64 / frame.width as f64,
        settings.height as f64 / frame.height as f64,
    );
    let scaled_w = ((frame.width as f64 * scale).ceil() as u32).max(settings.width);
    let scaled_h = ((frame.height as f64 * scale).ceil() as u32).max(settings.height);
    let scaled = imageops::resize(&source, scaled_w, scaled_h, FilterType::Triangle);

    let x = (scaled_w - settings.width) / 2;
    let y = (scaled_h - settings.height) / 2;
    let mut view = imageops::crop_imm(&scaled, x, y, settings.width, settings.height).to_image();
    draw_border(&mut view, settings);

    Ok(DisplayImage {
        width: view.width(),
        height: view.height(),
        rgb: view.into_raw(),
    })
}

/// Light grey frame shown until the camera delivers its first image.
pub fn placeholder(settings: &DisplaySettings) -> DisplayImage {
    let mut view: RgbImage =
        ImageBuffer::from_pixel(settings.width, settings.height, Pixel([240, 240, 240]));
    draw_border(&mut view, settings);
    DisplayImage {
        width: view.width(),
        height: view.height(),
        rgb: view.into_raw(),
    }
}

fn draw_border(view: &mut RgbImage, settings: &DisplaySettings) {
    let (w, h) = view.dimensions();
    let b = settings.border_width;
    let color = Pixel([
        settings.border_color.r,
        settings.border_color.g,
        settings.border_color.b,
    ]);
    for (x, y, px) in view.enumerate_pixels_mut() {
        if x < b || y < b || x + b >= w || y + b >= h {
            *px = color;
        }
    }
}
