use anyhow::{bail, Context, Result};
use folio_search::Document;
use std::path::Path;

/// Separator between pages in plain-text extractions.
pub const PAGE_BREAK: char = '\u{0c}';

/// Loads a document from a `.json` array of page strings or from text with
/// form-feed page breaks.
///
/// Line breaks inside a page become spaces and pages that are blank after
/// trimming are dropped, so page numbers count non-empty pages only.
pub fn load_pages(path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read pages from {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let pages = if is_json {
        parse_json_pages(&raw).with_context(|| format!("Invalid page array {}", path.display()))?
    } else {
        split_text_pages(&raw)
    };
    log::debug!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(Document::from_texts(pages))
}

pub fn parse_json_pages(raw: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let Some(items) = value.as_array() else {
        bail!("expected a JSON array of page strings");
    };
    let mut pages = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            bail!("page {} is not a string", i + 1);
        };
        pages.extend(clean_page(text));
    }
    Ok(pages)
}

pub fn split_text_pages(raw: &str) -> Vec<String> {
    raw.split(PAGE_BREAK).filter_map(clean_page).collect()
}

fn clean_page(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    Some(text.replace(['\r', '\n'], " "))
}
