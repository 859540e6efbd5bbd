use pdf_writer::{Content, Name, Str};

use crate::layout::{sanitize, StandardFont, TextMeasure};

pub type Rgb = (f32, f32, f32);

pub const NAVY: Rgb = (0.05, 0.1, 0.3);
pub const GOLD: Rgb = (0.83, 0.68, 0.21);
pub const WHITE: Rgb = (1.0, 1.0, 1.0);
pub const BLACK: Rgb = (0.0, 0.0, 0.0);

pub const fn grey(level: f32) -> Rgb {
    (level, level, level)
}

/// Drawing helpers over one page's content stream.
pub struct Canvas {
    content: Content,
    page_width: f32,
}

impl Canvas {
    pub fn new(page_width: f32) -> Self {
        Self {
            content: Content::new(),
            page_width,
        }
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.content
            .set_fill_rgb(color.0, color.1, color.2)
            .rect(x, y, width, height)
            .fill_nonzero();
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32, color: Rgb) {
        self.content
            .set_stroke_rgb(color.0, color.1, color.2)
            .set_line_width(line_width)
            .rect(x, y, width, height)
            .stroke();
    }

    pub fn hline(&mut self, x1: f32, x2: f32, y: f32, line_width: f32, color: Rgb) {
        self.content
            .set_stroke_rgb(color.0, color.1, color.2)
            .set_line_width(line_width)
            .move_to(x1, y)
            .line_to(x2, y)
            .stroke();
    }

    /// Draw `text` with its baseline starting at (`x`, `y`).
    pub fn text(&mut self, text: &str, font: StandardFont, size: f32, color: Rgb, x: f32, y: f32) {
        let safe = sanitize(text);
        self.content
            .set_fill_rgb(color.0, color.1, color.2)
            .begin_text()
            .set_font(Name(font.resource_name().as_bytes()), size)
            .next_line(x, y)
            .show(Str(safe.trim().as_bytes()))
            .end_text();
    }

    /// Draw `text` horizontally centred on the page.
    pub fn centered_text(&mut self, text: &str, font: StandardFont, size: f32, color: Rgb, y: f32) {
        let safe = sanitize(text);
        let safe = safe.trim();
        let width = font.measure(safe, size);
        let x = (self.page_width - width) / 2.0;
        self.text(safe, font, size, color, x, y);
    }

    /// Place a registered image XObject into the given box.
    pub fn image(&mut self, resource: &str, x: f32, y: f32, width: f32, height: f32) {
        self.content
            .save_state()
            .transform([width, 0.0, 0.0, height, x, y])
            .x_object(Name(resource.as_bytes()))
            .restore_state();
    }

    pub fn finish(self) -> Vec<u8> {
        self.content.finish()
    }
}
