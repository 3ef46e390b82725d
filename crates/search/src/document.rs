use crate::normalize::normalize_text;
use once_cell::sync::OnceCell;

/// One page of a document. The index is 1-based and fixed at ingestion.
#[derive(Debug)]
pub struct Page {
    index: usize,
    text: String,
    normalized: OnceCell<String>,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            normalized: OnceCell::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Normalized text, computed on first access.
    pub fn normalized(&self) -> &str {
        self.normalized.get_or_init(|| normalize_text(&self.text))
    }
}

/// An ordered sequence of pages.
#[derive(Debug, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page::new(i + 1, text))
            .collect();
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Looks up a page by its 1-based index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        index.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_numbered_from_one() {
        let doc = Document::from_texts(["uno", "dos"]);
        let indices: Vec<usize> = doc.pages().iter().map(Page::index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(doc.page(1).map(Page::text), Some("uno"));
        assert_eq!(doc.page(2).map(Page::text), Some("dos"));
        assert!(doc.page(0).is_none());
        assert!(doc.page(3).is_none());
    }

    #[test]
    fn normalized_text_is_cached_and_raw_text_untouched() {
        let page = Page::new(1, "  Árbol\nGRANDE ");
        let first = page.normalized() as *const str;
        assert_eq!(page.normalized(), "arbol grande");
        assert_eq!(page.normalized() as *const str, first);
        assert_eq!(page.text(), "  Árbol\nGRANDE ");
    }
}
