//! Glyph advance widths for the PDF standard-14 Helvetica family.
//!
//! Widths are in 1/1000 em for the printable ASCII range (0x20..=0x7E), taken
//! from the Adobe Core14 AFM files. Helvetica-Oblique shares Helvetica's
//! advances.

/// Measures rendered string width at a given font size.
pub trait TextMeasure {
    fn measure(&self, text: &str, size: f32) -> f32;
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // 'p'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,      // 'p'..'~'
];

/// Fonts used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Regular,
    Bold,
    Oblique,
}

impl StandardFont {
    pub const ALL: [StandardFont; 3] = [StandardFont::Regular, StandardFont::Bold, StandardFont::Oblique];

    /// PostScript name of the standard-14 font
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Regular => "Helvetica",
            StandardFont::Bold => "Helvetica-Bold",
            StandardFont::Oblique => "Helvetica-Oblique",
        }
    }

    /// Resource name the font is registered under on every page
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Regular => "F1",
            StandardFont::Bold => "F2",
            StandardFont::Oblique => "F3",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            StandardFont::Regular | StandardFont::Oblique => &HELVETICA,
            StandardFont::Bold => &HELVETICA_BOLD,
        }
    }

    /// Advance of one character in 1/1000 em; characters outside printable
    /// ASCII measure as a space, matching what gets drawn after sanitising.
    pub fn advance(self, c: char) -> u16 {
        let table = self.widths();
        match c {
            ' '..='~' => table[c as usize - 0x20],
            _ => table[0],
        }
    }
}

impl TextMeasure for StandardFont {
    fn measure(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.advance(c))).sum();
        units as f32 / 1000.0 * size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(StandardFont::Regular.advance(' '), 278);
        assert_eq!(StandardFont::Regular.advance('W'), 944);
        assert_eq!(StandardFont::Regular.advance('~'), 584);
        assert_eq!(StandardFont::Bold.advance('a'), 556);
        assert_eq!(StandardFont::Bold.advance('b'), 611);
        assert_eq!(StandardFont::Oblique.advance('i'), 222);
    }

    #[test]
    fn test_measure_scales_with_size() {
        let width = StandardFont::Regular.measure("Hello", 10.0);
        // H 722 + e 556 + l 222 + l 222 + o 556
        assert!((width - 22.78).abs() < 0.001);
        assert!((StandardFont::Regular.measure("Hello", 20.0) - 2.0 * width).abs() < 0.001);
    }

    #[test]
    fn test_non_ascii_measures_as_space() {
        let font = StandardFont::Regular;
        assert_eq!(font.measure("é", 12.0), font.measure(" ", 12.0));
    }
}
