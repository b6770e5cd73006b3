pub mod parser;
pub mod pdf;
pub mod source;
pub mod tokenizer;

pub use parser::{parse_pages, ExtractOptions, Extraction};
pub use pdf::{OcrPdf, PdfText, PlainText};
pub use source::{select_pages, usable_chars, Page, TextSource};

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::{info, warn};

/// Text and games produced by the source that was finally used.
#[derive(Debug)]
pub struct ExtractedText {
    pub source: String,
    pub pages: Vec<Page>,
    pub chars: usize,
    pub extraction: Extraction,
}

/// Ordered source chain for an input file.
///
/// PDFs are read directly first and OCR'd second (or only OCR'd when
/// `force_ocr`); anything else is treated as already-extracted text.
pub fn sources_for(input: &Path, force_ocr: bool, work_dir: &Path) -> Vec<Box<dyn TextSource>> {
    let is_pdf = input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let mut sources: Vec<Box<dyn TextSource>> = Vec::new();
    if is_pdf {
        if !force_ocr {
            sources.push(Box::new(PdfText::new(input)));
        }
        sources.push(Box::new(OcrPdf::new(input, work_dir)));
    } else {
        sources.push(Box::new(PlainText::new(input)));
    }
    sources
}

/// Walk the source chain until one yields enough usable text and at least one
/// game. A failing or thin source is logged and the next one tried; when none
/// is sufficient the richest attempt (most games, then most text) is returned.
pub async fn extract_schedule(
    sources: &[Box<dyn TextSource>],
    selection: Option<&str>,
    min_text_chars: usize,
    opts: &ExtractOptions,
) -> Result<ExtractedText> {
    let mut best: Option<ExtractedText> = None;

    for src in sources {
        let pages = match src.pages().await {
            Ok(p) => select_pages(p, selection)?,
            Err(e) => {
                warn!("Text source '{}' failed: {:#}", src.name(), e);
                continue;
            }
        };
        let chars = usable_chars(&pages);
        let extraction = parse_pages(&pages, opts);
        info!(
            "{}: {} page(s), {} characters, {} candidate game(s)",
            src.name(),
            pages.len(),
            chars,
            extraction.games.len()
        );

        let attempt = ExtractedText {
            source: src.name().to_string(),
            pages,
            chars,
            extraction,
        };
        if chars >= min_text_chars && !attempt.extraction.games.is_empty() {
            return Ok(attempt);
        }
        warn!(
            "'{}' yielded too little usable text ({} chars, {} games); trying next source",
            attempt.source,
            chars,
            attempt.extraction.games.len()
        );

        let richer = best.as_ref().map_or(true, |b| {
            (attempt.extraction.games.len(), attempt.chars) > (b.extraction.games.len(), b.chars)
        });
        if richer {
            best = Some(attempt);
        }
    }

    best.filter(|b| b.chars > 0)
        .ok_or_else(|| anyhow!("No text extracted from any source. Try --force-ocr."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned {
        name: &'static str,
        text: Option<&'static str>,
    }

    #[async_trait]
    impl TextSource for Canned {
        fn name(&self) -> &str {
            self.name
        }

        async fn pages(&self) -> Result<Vec<Page>> {
            match self.text {
                Some(t) => Ok(source::split_pages(t)),
                None => Err(anyhow!("tool missing")),
            }
        }
    }

    const GOOD: &str = "3/2/2024 at Navy L 8-9\n3/9/2024 vs Army L 13-14\n";

    #[tokio::test]
    async fn falls_back_when_direct_text_is_thin() {
        let sources: Vec<Box<dyn TextSource>> = vec![
            Box::new(Canned { name: "direct", text: Some("  \n") }),
            Box::new(Canned { name: "ocr", text: Some(GOOD) }),
        ];
        let out = extract_schedule(&sources, None, 10, &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(out.source, "ocr");
        assert_eq!(out.extraction.games.len(), 2);
    }

    #[tokio::test]
    async fn failing_source_is_skipped() {
        let sources: Vec<Box<dyn TextSource>> = vec![
            Box::new(Canned { name: "direct", text: None }),
            Box::new(Canned { name: "ocr", text: Some(GOOD) }),
        ];
        let out = extract_schedule(&sources, None, 10, &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(out.source, "ocr");
    }

    #[tokio::test]
    async fn richest_attempt_wins_when_none_is_sufficient() {
        let sources: Vec<Box<dyn TextSource>> = vec![
            Box::new(Canned { name: "direct", text: Some(GOOD) }),
            Box::new(Canned { name: "ocr", text: None }),
        ];
        let out = extract_schedule(&sources, None, 10_000, &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(out.source, "direct");
        assert_eq!(out.extraction.games.len(), 2);
    }

    #[tokio::test]
    async fn no_text_anywhere_is_an_error() {
        let sources: Vec<Box<dyn TextSource>> =
            vec![Box::new(Canned { name: "direct", text: None })];
        assert!(extract_schedule(&sources, None, 10, &ExtractOptions::default())
            .await
            .is_err());
    }

    #[test]
    fn pdf_inputs_get_direct_then_ocr() {
        let names = |v: Vec<Box<dyn TextSource>>| {
            v.iter().map(|s| s.name().to_string()).collect::<Vec<_>>()
        };
        let work = Path::new("/tmp");
        assert_eq!(
            names(sources_for(Path::new("s.PDF"), false, work)),
            vec!["pdftotext", "ocrmypdf"]
        );
        assert_eq!(names(sources_for(Path::new("s.pdf"), true, work)), vec!["ocrmypdf"]);
        assert_eq!(names(sources_for(Path::new("s.txt"), false, work)), vec!["text"]);
    }
}
