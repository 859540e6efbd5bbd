//! Placement of wrapped paragraphs onto numbered body pages.
//!
//! Pagination is independent of the PDF backend: it turns paragraphs of
//! [`LayoutLine`]s into [`BodyPage`]s carrying baseline positions, and the
//! renderer only paints what it is given.

use super::LayoutLine;

/// Vertical layout of a body page, in layout units from the page bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyGeometry {
    /// Baseline of the first line on a fresh page
    pub top: f32,
    /// No baseline may leave less than one line height above this
    pub bottom_limit: f32,
    pub line_height: f32,
    pub paragraph_spacing: f32,
}

impl BodyGeometry {
    /// Height a paragraph of `line_count` lines claims, spacing included.
    pub fn block_height(&self, line_count: usize) -> f32 {
        line_count as f32 * self.line_height + self.paragraph_spacing
    }
}

/// A line with its baseline on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyPage {
    /// 1-based; the cover page is not counted
    pub number: u32,
    pub lines: Vec<PlacedLine>,
}

/// Render position threaded through paragraph placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub y: f32,
    pub page_number: u32,
    pub open: bool,
}

impl PageCursor {
    /// No page opened yet; the first placement opens page 1.
    pub fn closed() -> Self {
        Self {
            y: 0.0,
            page_number: 0,
            open: false,
        }
    }

    pub fn fits(&self, height: f32, geometry: &BodyGeometry) -> bool {
        self.open && self.y - height >= geometry.bottom_limit
    }

    pub fn next_page(self, geometry: &BodyGeometry) -> Self {
        Self {
            y: geometry.top,
            page_number: self.page_number + 1,
            open: true,
        }
    }

    pub fn advance(self, dy: f32) -> Self {
        Self { y: self.y - dy, ..self }
    }
}

/// Lay out paragraphs top to bottom, page by page.
///
/// A paragraph that does not fit in the remaining space starts a new page.
/// One too tall for even an empty page continues line by line onto the
/// following pages. At least one page is always returned.
pub fn paginate(paragraphs: &[Vec<LayoutLine>], geometry: &BodyGeometry) -> Vec<BodyPage> {
    let mut pages: Vec<BodyPage> = Vec::new();
    let mut cursor = PageCursor::closed();

    for lines in paragraphs.iter().filter(|lines| !lines.is_empty()) {
        if !cursor.fits(geometry.block_height(lines.len()), geometry) {
            cursor = open_page(cursor, geometry, &mut pages);
        }

        for line in lines {
            if !cursor.fits(geometry.line_height, geometry) {
                cursor = open_page(cursor, geometry, &mut pages);
            }
            if let Some(page) = pages.last_mut() {
                page.lines.push(PlacedLine {
                    text: line.text.clone(),
                    baseline: cursor.y,
                });
            }
            cursor = cursor.advance(geometry.line_height);
        }

        cursor = cursor.advance(geometry.paragraph_spacing);
    }

    if pages.is_empty() {
        open_page(cursor, geometry, &mut pages);
    }

    pages
}

fn open_page(cursor: PageCursor, geometry: &BodyGeometry, pages: &mut Vec<BodyPage>) -> PageCursor {
    let next = cursor.next_page(geometry);
    pages.push(BodyPage {
        number: next.page_number,
        lines: Vec::new(),
    });
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY: BodyGeometry = BodyGeometry {
        top: 100.0,
        bottom_limit: 10.0,
        line_height: 10.0,
        paragraph_spacing: 5.0,
    };

    fn paragraph(prefix: &str, count: usize) -> Vec<LayoutLine> {
        (0..count)
            .map(|i| LayoutLine {
                text: format!("{}-{}", prefix, i),
                width: 1.0,
            })
            .collect()
    }

    fn all_text(pages: &[BodyPage]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.text.clone()))
            .collect()
    }

    #[test]
    fn test_empty_body_still_has_one_page() {
        let pages = paginate(&[], &GEOMETRY);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn test_paragraph_moves_whole_to_next_page() {
        // 4 lines + spacing = 45; two fit (100 -> 55 -> 10), the third does not
        let paragraphs = vec![paragraph("a", 4), paragraph("b", 4), paragraph("c", 4)];
        let pages = paginate(&paragraphs, &GEOMETRY);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 8);
        assert_eq!(pages[1].lines[0].text, "c-0");
        assert_eq!(pages[1].lines[0].baseline, GEOMETRY.top);
    }

    #[test]
    fn test_long_body_numbers_pages_and_keeps_every_line() {
        let paragraphs: Vec<_> = (0..40).map(|i| paragraph(&format!("p{}", i), 1 + i % 4)).collect();
        let expected: Vec<String> = paragraphs.iter().flatten().map(|l| l.text.clone()).collect();

        let pages = paginate(&paragraphs, &GEOMETRY);

        assert!(pages.len() >= 2);
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page.number, index as u32 + 1);
            for line in &page.lines {
                assert!(line.baseline - GEOMETRY.line_height >= GEOMETRY.bottom_limit);
            }
        }
        assert_eq!(all_text(&pages), expected);
    }

    #[test]
    fn test_paragraphs_are_not_split_when_they_fit_a_page() {
        let paragraphs: Vec<_> = (0..12).map(|i| paragraph(&format!("p{}", i), 3)).collect();
        let pages = paginate(&paragraphs, &GEOMETRY);

        for page in &pages {
            let mut prefixes: Vec<&str> = page.lines.iter().map(|l| l.text.split('-').next().unwrap()).collect();
            prefixes.dedup();
            for prefix in prefixes {
                let on_page = page.lines.iter().filter(|l| l.text.starts_with(&format!("{}-", prefix))).count();
                assert_eq!(on_page, 3, "paragraph {} split across pages", prefix);
            }
        }
    }

    #[test]
    fn test_oversized_paragraph_continues_on_next_page() {
        let pages = paginate(&[paragraph("big", 20)], &GEOMETRY);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].lines.len(), 9);
        assert_eq!(pages[1].lines[0].text, "big-9");
        assert_eq!(all_text(&pages).len(), 20);
    }

    #[test]
    fn test_cursor_threading() {
        let cursor = PageCursor::closed();
        assert!(!cursor.fits(1.0, &GEOMETRY));

        let opened = cursor.next_page(&GEOMETRY);
        assert_eq!(opened.page_number, 1);
        assert!(opened.fits(90.0, &GEOMETRY));
        assert!(!opened.advance(85.0).fits(10.0, &GEOMETRY));
    }
}
