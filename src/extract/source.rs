use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// One page of schedule text. `number` is 1-based in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub text: String,
}

/// Trait that every schedule text source must implement.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Return the text of every non-empty page, in document order.
    async fn pages(&self) -> Result<Vec<Page>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Split extracted text on form feeds, dropping blank pages. Page numbers
/// still count the blank ones.
pub fn split_pages(text: &str) -> Vec<Page> {
    text.split('\x0c')
        .enumerate()
        .filter(|(_, p)| !p.trim().is_empty())
        .map(|(i, p)| Page {
            number: i + 1,
            text: p.to_string(),
        })
        .collect()
}

/// Parse a page selection like `"1-3,5"` into sorted 0-based indices.
/// Pages past `total` are ignored.
pub fn parse_page_selection(list: &str, total: usize) -> Result<Vec<usize>> {
    let mut picked = BTreeSet::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (a, b) = match part.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (part, part),
        };
        let a: usize = a
            .parse()
            .with_context(|| format!("Bad page number '{}' in --pages", a))?;
        let b: usize = b
            .parse()
            .with_context(|| format!("Bad page number '{}' in --pages", b))?;
        if a == 0 || b < a {
            bail!("Bad page range '{}' in --pages (pages are 1-based)", part);
        }
        picked.extend((a..=b.min(total)).map(|p| p - 1));
    }
    Ok(picked.into_iter().collect())
}

/// Keep only the selected pages, if a selection was given.
pub fn select_pages(pages: Vec<Page>, selection: Option<&str>) -> Result<Vec<Page>> {
    let Some(list) = selection else {
        return Ok(pages);
    };
    let total = pages.iter().map(|p| p.number).max().unwrap_or(0);
    let keep = parse_page_selection(list, total)?;
    Ok(pages
        .into_iter()
        .filter(|p| keep.binary_search(&(p.number - 1)).is_ok())
        .collect())
}

/// Non-whitespace characters across pages; the "usable text" measure.
pub fn usable_chars(pages: &[Page]) -> usize {
    pages
        .iter()
        .map(|p| p.text.chars().filter(|c| !c.is_whitespace()).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_feeds_split_pages_and_blank_pages_drop() {
        let pages = split_pages("one\x0c  \n\x0cthree\x0c");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].number, 3);
        assert_eq!(pages[1].text, "three");
    }

    #[test]
    fn page_selection_ranges() {
        assert_eq!(parse_page_selection("1-3,5", 10).unwrap(), vec![0, 1, 2, 4]);
        assert_eq!(parse_page_selection("2, 2,1", 10).unwrap(), vec![0, 1]);
        assert_eq!(parse_page_selection("4-9", 5).unwrap(), vec![3, 4]);
    }

    #[test]
    fn page_selection_rejects_garbage() {
        assert!(parse_page_selection("a-3", 10).is_err());
        assert!(parse_page_selection("0", 10).is_err());
        assert!(parse_page_selection("5-2", 10).is_err());
    }

    #[test]
    fn select_keeps_document_page_numbers() {
        let pages = split_pages("a\x0cb\x0cc");
        let kept = select_pages(pages, Some("2-3")).unwrap();
        let numbers: Vec<usize> = kept.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn usable_chars_ignores_whitespace() {
        assert_eq!(usable_chars(&split_pages("a b\n c\x0c d ")), 4);
    }
}
