use crate::document::Document;
use crate::error::{Result, SearchError};
use crate::exact::exact_search;
use crate::heuristic::heuristic_search;
use crate::score::descending;
use crate::semantic::SemanticSearch;
use folio_protocol::{ResultRow, SearchMode};

/// Lane selection for [`integrated_search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegratedOptions {
    pub use_heuristic: bool,
    pub use_semantic: bool,
}

impl IntegratedOptions {
    pub const fn for_mode(mode: SearchMode) -> Self {
        match mode {
            SearchMode::Exact => Self {
                use_heuristic: false,
                use_semantic: false,
            },
            SearchMode::Heuristic => Self {
                use_heuristic: true,
                use_semantic: false,
            },
            SearchMode::Semantic => Self {
                use_heuristic: false,
                use_semantic: true,
            },
        }
    }

    /// The single mode these options run.
    pub const fn mode(self) -> SearchMode {
        if self.use_semantic {
            SearchMode::Semantic
        } else if self.use_heuristic {
            SearchMode::Heuristic
        } else {
            SearchMode::Exact
        }
    }
}

/// Runs one search lane and returns its rows tagged with the lane's mode.
///
/// The lanes are exclusive: with `use_semantic` only semantic search runs and
/// `use_heuristic` is ignored; otherwise exact or heuristic search runs. The
/// merged rows are then ordered by [`ResultRow::ranking_score`], which compares
/// raw counts, relevance and similarity as plain numbers.
pub async fn integrated_search<S: AsRef<str>>(
    document: &Document,
    terms: &[S],
    options: IntegratedOptions,
    semantic: Option<&SemanticSearch<'_>>,
) -> Result<Vec<ResultRow>> {
    let mut rows: Vec<ResultRow> = match options.mode() {
        SearchMode::Exact => exact_search(document, terms)?
            .to_rows()
            .into_iter()
            .map(ResultRow::Exact)
            .collect(),
        SearchMode::Heuristic => heuristic_search(document, terms)?
            .into_iter()
            .map(ResultRow::Heuristic)
            .collect(),
        SearchMode::Semantic => {
            let semantic = semantic.ok_or_else(|| {
                SearchError::ProviderUnavailable(
                    "semantic search requested without an embedding provider".to_string(),
                )
            })?;
            semantic
                .search(document, terms)
                .await?
                .into_iter()
                .map(ResultRow::Semantic)
                .collect()
        }
    };

    rows.sort_by(|a, b| descending(a.ranking_score(), b.ranking_score()));
    log::info!(
        "Integrated search ({}) produced {} rows",
        options.mode(),
        rows.len()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_protocol::ExactRow;
    use folio_vector_store::StubEmbedder;
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::from_texts(["gato negro", "gato gato blanco", "perro"])
    }

    #[tokio::test]
    async fn exact_lane_sorts_by_occurrences() {
        let rows = integrated_search(&doc(), &["perro", "gato"], IntegratedOptions::default(), None)
            .await
            .unwrap();
        let exact: Vec<ExactRow> = rows
            .into_iter()
            .map(|row| match row {
                ResultRow::Exact(row) => row,
                other => panic!("unexpected row {other:?}"),
            })
            .collect();
        let flat: Vec<(&str, usize, usize)> = exact
            .iter()
            .map(|r| (r.term.as_str(), r.page, r.occurrences))
            .collect();
        assert_eq!(flat, vec![("gato", 2, 2), ("gato", 1, 1), ("perro", 3, 1)]);
    }

    #[tokio::test]
    async fn heuristic_lane_tags_rows() {
        let options = IntegratedOptions {
            use_heuristic: true,
            use_semantic: false,
        };
        let rows = integrated_search(&doc(), &["gato", "perro"], options, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.mode() == SearchMode::Heuristic));
        assert_eq!(rows[0].ranking_score(), 2.0);
    }

    #[tokio::test]
    async fn semantic_lane_excludes_other_modes() {
        let provider = StubEmbedder::new(32);
        let semantic = SemanticSearch::new(&provider);
        for use_heuristic in [false, true] {
            let options = IntegratedOptions {
                use_heuristic,
                use_semantic: true,
            };
            let rows = integrated_search(&doc(), &["gato"], options, Some(&semantic))
                .await
                .unwrap();
            assert_eq!(rows.len(), 3);
            assert!(rows.iter().all(|r| r.mode() == SearchMode::Semantic));
        }
    }

    #[tokio::test]
    async fn semantic_lane_requires_provider() {
        let err = integrated_search(
            &doc(),
            &["gato"],
            IntegratedOptions::for_mode(SearchMode::Semantic),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SearchError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn no_match_is_empty() {
        let rows = integrated_search(&doc(), &["jirafa"], IntegratedOptions::default(), None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn options_round_trip_modes() {
        for mode in SearchMode::ALL {
            assert_eq!(IntegratedOptions::for_mode(mode).mode(), mode);
        }
    }
}
