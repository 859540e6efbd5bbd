//! PDF transcript rendering: one cover page followed by numbered body pages.
//!
//! Layout decisions (wrapping, pagination) come from [`crate::layout`]; this
//! module only paints them with `pdf-writer`. Thumbnail problems are never
//! fatal: the cover slot is simply left empty.

use chrono::NaiveDate;
use pdf_writer::{Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use std::time::Duration;

pub mod canvas;
pub mod thumbnail;

use crate::config::RenderConfig;
use crate::layout::paginate::{paginate, BodyGeometry, BodyPage};
use crate::layout::{build_paragraphs, header_title, strip_timestamps, wrap, StandardFont, TextMeasure};
use crate::PipelineError;
use canvas::{grey, Canvas, BLACK, GOLD, NAVY, WHITE};
use thumbnail::Thumbnail;

/// ISO A4 in layout units (1/72 inch).
pub const PAGE_WIDTH: f32 = 595.27563;
pub const PAGE_HEIGHT: f32 = 841.8898;
pub const MARGIN: f32 = 60.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BODY_FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 18.0;
const PARAGRAPH_SPACING: f32 = 10.0;
const HEADER_HEIGHT: f32 = 55.0;
const FOOTER_HEIGHT: f32 = 35.0;

const THUMB_WIDTH: f32 = 350.0;
const THUMB_HEIGHT: f32 = 197.0;
const TITLE_FONT_SIZE: f32 = 16.0;
const TITLE_LEADING: f32 = 24.0;
const TITLE_MAX_LINES: usize = 3;

const THUMB_RESOURCE: &str = "Im1";

/// What the cover page says about the source media.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub title: String,
    /// Channel name, or "Uploaded File"
    pub source_label: String,
    /// ISO-8601 timestamp; only the date part is shown
    pub published_at: String,
    pub thumbnail_url: Option<String>,
    /// Display name of the spoken language, e.g. "Arabic"
    pub source_language: String,
    /// Whether the body text went through translation
    pub translated: bool,
}

impl DocumentMetadata {
    /// Date portion of the publish timestamp
    pub fn published_date(&self) -> &str {
        match self.published_at.char_indices().nth(10) {
            Some((end, _)) => &self.published_at[..end],
            None => &self.published_at,
        }
    }
}

/// Branding and language labels for rendered documents.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub product_label: String,
    pub tagline: String,
    pub target_language: String,
    pub target_language_name: String,
    pub thumbnail_timeout: Duration,
}

impl RenderSettings {
    pub fn from_config(config: &RenderConfig, target_language: &str) -> Self {
        Self {
            product_label: config.product_label.clone(),
            tagline: config.tagline.clone(),
            target_language: target_language.to_string(),
            target_language_name: crate::translate::language_name(target_language),
            thumbnail_timeout: Duration::from_secs(config.thumbnail_timeout_secs),
        }
    }

    /// Whether the cover should say the text was translated.
    fn is_translated(&self, source_language: &str) -> bool {
        !source_language.eq_ignore_ascii_case(&self.target_language_name)
            && !source_language.eq_ignore_ascii_case(&self.target_language)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default(), "en")
    }
}

pub fn body_geometry() -> BodyGeometry {
    BodyGeometry {
        top: PAGE_HEIGHT - MARGIN - HEADER_HEIGHT,
        bottom_limit: MARGIN + FOOTER_HEIGHT,
        line_height: LINE_HEIGHT,
        paragraph_spacing: PARAGRAPH_SPACING,
    }
}

/// Strip timestamps, group, wrap and paginate transcript text.
pub fn plan_body(text: &str) -> Vec<BodyPage> {
    let clean = strip_timestamps(text);
    let wrapped: Vec<_> = build_paragraphs(&clean)
        .iter()
        .map(|paragraph| wrap(&paragraph.text(), &StandardFont::Regular, BODY_FONT_SIZE, CONTENT_WIDTH))
        .collect();

    paginate(&wrapped, &body_geometry())
}

pub struct DocumentRenderer {
    settings: RenderSettings,
}

impl DocumentRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render `text` under a cover built from `metadata`; returns PDF bytes.
    pub async fn render(&self, metadata: &DocumentMetadata, text: &str) -> Result<Vec<u8>, PipelineError> {
        let thumbnail = match metadata.thumbnail_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => thumbnail::fetch(url, self.settings.thumbnail_timeout).await,
            None => None,
        };

        let settings = self.settings.clone();
        let metadata = metadata.clone();
        let text = text.to_string();
        let today = chrono::Local::now().date_naive();

        tokio::task::spawn_blocking(move || compose(&settings, &metadata, &text, thumbnail.as_ref(), today))
            .await
            .map_err(|e| PipelineError::Render(format!("renderer aborted: {}", e)))?
    }
}

/// Build the complete PDF synchronously.
pub fn compose(
    settings: &RenderSettings,
    metadata: &DocumentMetadata,
    text: &str,
    thumbnail: Option<&Thumbnail>,
    generated_on: NaiveDate,
) -> Result<Vec<u8>, PipelineError> {
    let geometry = body_geometry();
    if geometry.top - geometry.line_height < geometry.bottom_limit {
        return Err(PipelineError::Render("page has no room for body text".to_string()));
    }

    let body = plan_body(text);
    tracing::debug!("Rendering {} body page(s) for \"{}\"", body.len(), metadata.title);

    let mut next_id = 1;
    let mut alloc = || {
        let id = Ref::new(next_id);
        next_id += 1;
        id
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let font_ids: Vec<(StandardFont, Ref)> = StandardFont::ALL.iter().map(|font| (*font, alloc())).collect();
    let thumb_id = thumbnail.map(|_| alloc());

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.document_info(info_id)
        .title(TextStr(&metadata.title))
        .producer(TextStr(&settings.product_label));

    for (font, id) in &font_ids {
        pdf.type1_font(*id)
            .base_font(Name(font.base_font().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    if let (Some(thumb), Some(id)) = (thumbnail, thumb_id) {
        let mut image = pdf.image_xobject(id, &thumb.data);
        image.filter(Filter::FlateDecode);
        image.width(thumb.width as i32);
        image.height(thumb.height as i32);
        image.color_space().device_rgb();
        image.bits_per_component(8);
        image.finish();
    }

    let mut contents = vec![cover_page(settings, metadata, thumbnail.is_some(), generated_on)];
    let header = header_title(&metadata.title);
    contents.extend(body.iter().map(|page| body_page(settings, &header, page)));

    let mut page_ids = Vec::with_capacity(contents.len());
    for content in contents {
        let page_id = alloc();
        let content_id = alloc();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&content, 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
            .parent(pages_id)
            .contents(content_id);
        {
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (font, id) in &font_ids {
                    fonts.pair(Name(font.resource_name().as_bytes()), *id);
                }
            }
            if let Some(id) = thumb_id {
                resources.x_objects().pair(Name(THUMB_RESOURCE.as_bytes()), id);
            }
        }
        page.finish();
        page_ids.push(page_id);
    }

    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    Ok(pdf.finish())
}

/// Cover title wrapped to at most [`TITLE_MAX_LINES`]; overflow ends in `...`.
fn cover_title_lines(title: &str) -> Vec<String> {
    let mut lines: Vec<String> = wrap(title, &StandardFont::Bold, TITLE_FONT_SIZE, CONTENT_WIDTH)
        .into_iter()
        .map(|line| line.text)
        .collect();
    if lines.len() <= TITLE_MAX_LINES {
        return lines;
    }

    lines.truncate(TITLE_MAX_LINES);
    if let Some(last) = lines.last_mut() {
        let mut kept = last.trim_end().to_string();
        while !kept.is_empty()
            && StandardFont::Bold.measure(&format!("{}...", kept), TITLE_FONT_SIZE) > CONTENT_WIDTH
        {
            kept.pop();
        }
        *last = format!("{}...", kept.trim_end());
    }
    lines
}

fn cover_page(settings: &RenderSettings, metadata: &DocumentMetadata, has_thumbnail: bool, generated_on: NaiveDate) -> Vec<u8> {
    let mut canvas = Canvas::new(PAGE_WIDTH);

    canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, WHITE);
    canvas.fill_rect(0.0, PAGE_HEIGHT - 100.0, PAGE_WIDTH, 100.0, NAVY);
    canvas.fill_rect(0.0, PAGE_HEIGHT - 103.0, PAGE_WIDTH, 3.0, GOLD);
    canvas.centered_text(&settings.product_label, StandardFont::Bold, 32.0, WHITE, PAGE_HEIGHT - 55.0);
    canvas.centered_text(&settings.tagline, StandardFont::Regular, 13.0, GOLD, PAGE_HEIGHT - 78.0);

    let thumb_y = PAGE_HEIGHT - 310.0;
    if has_thumbnail {
        let x = (PAGE_WIDTH - THUMB_WIDTH) / 2.0;
        canvas.fill_rect(x + 4.0, thumb_y - 4.0, THUMB_WIDTH, THUMB_HEIGHT, grey(0.85));
        canvas.image(THUMB_RESOURCE, x, thumb_y, THUMB_WIDTH, THUMB_HEIGHT);
        canvas.stroke_rect(x, thumb_y, THUMB_WIDTH, THUMB_HEIGHT, 2.0, NAVY);
    }

    let divider_y = thumb_y - 30.0;
    canvas.hline(MARGIN, PAGE_WIDTH - MARGIN, divider_y, 1.5, GOLD);

    let mut y = divider_y - 30.0;
    for line in cover_title_lines(&metadata.title) {
        canvas.centered_text(&line, StandardFont::Bold, TITLE_FONT_SIZE, NAVY, y);
        y -= TITLE_LEADING;
    }

    canvas.centered_text(
        &format!("Channel:  {}", metadata.source_label),
        StandardFont::Regular,
        12.0,
        grey(0.3),
        y - 12.0,
    );
    canvas.centered_text(
        &format!("Published:  {}", metadata.published_date()),
        StandardFont::Regular,
        11.0,
        grey(0.5),
        y - 32.0,
    );
    if metadata.translated && settings.is_translated(&metadata.source_language) {
        canvas.centered_text(
            &format!(
                "Translated from: {}  to  {}",
                metadata.source_language, settings.target_language_name
            ),
            StandardFont::Oblique,
            10.0,
            (0.4, 0.4, 0.7),
            y - 50.0,
        );
    }

    canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, 40.0, NAVY);
    canvas.centered_text(
        &format!("Generated by {}  |  {}", settings.product_label, generated_on.format("%Y-%m-%d")),
        StandardFont::Regular,
        9.0,
        GOLD,
        14.0,
    );

    canvas.finish()
}

fn body_page(settings: &RenderSettings, header: &str, page: &BodyPage) -> Vec<u8> {
    let mut canvas = Canvas::new(PAGE_WIDTH);
    canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, WHITE);

    // Header
    canvas.fill_rect(0.0, PAGE_HEIGHT - 50.0, PAGE_WIDTH, 50.0, NAVY);
    canvas.fill_rect(0.0, PAGE_HEIGHT - 53.0, PAGE_WIDTH, 3.0, GOLD);
    canvas.text(&settings.product_label, StandardFont::Bold, 12.0, GOLD, MARGIN, PAGE_HEIGHT - 32.0);
    canvas.text(header, StandardFont::Regular, 9.0, grey(0.8), MARGIN + 100.0, PAGE_HEIGHT - 32.0);
    canvas.text("TRANSCRIPT", StandardFont::Bold, 11.0, NAVY, MARGIN, PAGE_HEIGHT - 75.0);
    canvas.hline(MARGIN, MARGIN + 90.0, PAGE_HEIGHT - 78.0, 1.0, GOLD);

    for line in &page.lines {
        canvas.text(&line.text, StandardFont::Regular, BODY_FONT_SIZE, BLACK, MARGIN, line.baseline);
    }

    // Footer
    canvas.hline(MARGIN, PAGE_WIDTH - MARGIN, 38.0, 0.5, grey(0.8));
    canvas.text(
        &format!("{}  |  Page {}", settings.product_label, page.number),
        StandardFont::Regular,
        9.0,
        grey(0.4),
        MARGIN,
        20.0,
    );
    canvas.text("Transcript PDF", StandardFont::Regular, 9.0, grey(0.6), PAGE_WIDTH - MARGIN - 80.0, 20.0);

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(language: &str) -> DocumentMetadata {
        DocumentMetadata {
            title: "An Unusually Long Conference Talk Title About Fearless Concurrency In Practice".to_string(),
            source_label: "RustConf".to_string(),
            published_at: "2024-09-10T16:00:00Z".to_string(),
            thumbnail_url: None,
            source_language: language.to_string(),
            translated: true,
        }
    }

    fn long_transcript(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("[00:{:02}] Sentence number {} of a transcript that keeps going for a while.", i % 60, i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    #[test]
    fn test_published_date_is_date_portion() {
        assert_eq!(metadata("English").published_date(), "2024-09-10");
        let mut short = metadata("English");
        short.published_at = "2024".to_string();
        assert_eq!(short.published_date(), "2024");
    }

    #[test]
    fn test_cover_title_is_capped_with_ellipsis() {
        let title = "Fearless Concurrency ".repeat(40);
        let lines = cover_title_lines(&title);

        assert_eq!(lines.len(), TITLE_MAX_LINES);
        assert!(lines[TITLE_MAX_LINES - 1].ends_with("..."));
        for line in &lines {
            assert!(StandardFont::Bold.measure(line, TITLE_FONT_SIZE) <= CONTENT_WIDTH, "line: {}", line);
        }

        let short = cover_title_lines("Short Title");
        assert_eq!(short, vec!["Short Title".to_string()]);

        let pdf = compose(&RenderSettings::default(), &DocumentMetadata { title, ..metadata("English") }, "text", None, date());
        assert!(pdf.is_ok());
    }

    #[test]
    fn test_plan_body_keeps_every_line_once() {
        let text = long_transcript(300);
        let pages = plan_body(&text);

        assert!(pages.len() >= 2);
        let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, (1..=pages.len() as u32).collect::<Vec<_>>());

        let rendered: String = pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        for i in 0..300 {
            let sentence = format!("Sentence number {} of a transcript", i);
            assert_eq!(rendered.matches(&sentence).count(), 1, "sentence {}", i);
        }
        assert!(!rendered.contains("[00:"));
    }

    #[test]
    fn test_body_lines_stay_inside_content_box() {
        let pages = plan_body(&long_transcript(120));
        let geometry = body_geometry();
        for page in &pages {
            for line in &page.lines {
                assert!(line.baseline <= geometry.top);
                assert!(line.baseline - LINE_HEIGHT >= geometry.bottom_limit);
            }
        }
    }

    #[test]
    fn test_compose_counts_cover_plus_body_pages() {
        let text = long_transcript(300);
        let body_pages = plan_body(&text).len();
        let pdf = compose(&RenderSettings::default(), &metadata("English"), &text, None, date()).unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
        assert!(contains(&pdf, &format!("/Count {}", body_pages + 1)));
        assert!(contains(&pdf, "/BaseFont /Helvetica-Oblique"));
        assert!(!contains(&pdf, "/Subtype /Image"));
    }

    #[test]
    fn test_compose_empty_text_has_one_body_page() {
        let pdf = compose(&RenderSettings::default(), &metadata("English"), "  \n[00:01]\n", None, date()).unwrap();
        assert!(contains(&pdf, "/Count 2"));
    }

    #[test]
    fn test_compose_embeds_thumbnail() {
        let thumb = Thumbnail::decode(&thumbnail::tests::png_bytes(8, 6)).unwrap();
        let pdf = compose(&RenderSettings::default(), &metadata("Arabic"), "hello there", Some(&thumb), date()).unwrap();

        assert!(contains(&pdf, "/Subtype /Image"));
        assert!(contains(&pdf, "/Im1"));
    }

    #[test]
    fn test_translation_notice_rule() {
        let settings = RenderSettings::default();
        assert!(!settings.is_translated("English"));
        assert!(!settings.is_translated("en"));
        assert!(settings.is_translated("Arabic"));
        assert!(settings.is_translated("Audio/Video"));
    }

    #[tokio::test]
    async fn test_render_without_thumbnail_url() {
        let renderer = DocumentRenderer::new(RenderSettings::default());
        let pdf = renderer.render(&metadata("English"), "a short body").await.unwrap();
        assert!(contains(&pdf, "/Count 2"));
    }
}
