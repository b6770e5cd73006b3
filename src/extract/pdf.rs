use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::source::{split_pages, Page, TextSource};

/// Direct text layer of a PDF, via `pdftotext -layout`.
pub struct PdfText {
    path: PathBuf,
}

impl PdfText {
    pub fn new(path: &Path) -> Self {
        PdfText {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl TextSource for PdfText {
    fn name(&self) -> &str {
        "pdftotext"
    }

    async fn pages(&self) -> Result<Vec<Page>> {
        let text = pdftotext(&self.path).await?;
        Ok(split_pages(&text))
    }
}

/// OCR'd copy of a PDF. Runs `ocrmypdf` into `work_dir`, then reads the new
/// text layer.
pub struct OcrPdf {
    path: PathBuf,
    work_dir: PathBuf,
}

impl OcrPdf {
    pub fn new(path: &Path, work_dir: &Path) -> Self {
        OcrPdf {
            path: path.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn output_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "schedule".to_string());
        self.work_dir.join(format!("{}.ocr.pdf", stem))
    }
}

#[async_trait]
impl TextSource for OcrPdf {
    fn name(&self) -> &str {
        "ocrmypdf"
    }

    async fn pages(&self) -> Result<Vec<Page>> {
        let out = self.output_path();
        info!("Running OCR on {} -> {}", self.path.display(), out.display());
        let output = Command::new("ocrmypdf")
            .args(["--deskew", "--clean", "--force-ocr"])
            .arg(&self.path)
            .arg(&out)
            .output()
            .await
            .map_err(|e| tool_error("ocrmypdf", e))?;
        if !output.status.success() {
            bail!(
                "ocrmypdf failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let text = pdftotext(&out).await?;
        Ok(split_pages(&text))
    }
}

/// Already-extracted text (an OCR dump or a copy-pasted schedule).
pub struct PlainText {
    path: PathBuf,
}

impl PlainText {
    pub fn new(path: &Path) -> Self {
        PlainText {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl TextSource for PlainText {
    fn name(&self) -> &str {
        "text"
    }

    async fn pages(&self) -> Result<Vec<Page>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(split_pages(&text))
    }
}

async fn pdftotext(path: &Path) -> Result<String> {
    debug!("pdftotext -layout {}", path.display());
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .output()
        .await
        .map_err(|e| tool_error("pdftotext", e))?;
    if !output.status.success() {
        bail!(
            "pdftotext failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn tool_error(tool: &str, e: std::io::Error) -> anyhow::Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("{} not found on PATH", tool)
    } else {
        anyhow!(e).context(format!("Failed to run {}", tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_source_splits_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, "3/2/2024 at Navy L 8-9\x0c3/9/2024 vs Army L 13-14\n").unwrap();

        let pages = PlainText::new(&path).pages().await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert!(pages[1].text.contains("Army"));
    }

    #[tokio::test]
    async fn plain_text_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlainText::new(&dir.path().join("nope.txt")).pages().await;
        assert!(err.is_err());
    }

    #[test]
    fn ocr_output_lands_in_work_dir() {
        let ocr = OcrPdf::new(Path::new("/data/schedule.pdf"), Path::new("/tmp/out"));
        assert_eq!(ocr.output_path(), PathBuf::from("/tmp/out/schedule.ocr.pdf"));
    }

    #[test]
    fn missing_tool_is_named() {
        let e = tool_error("pdftotext", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(e.to_string(), "pdftotext not found on PATH");
    }
}
