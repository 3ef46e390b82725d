use crate::document::Document;
use crate::error::Result;
use crate::exact::{exact_search, ExactMatches};
use crate::score::{descending, round_to};
use folio_protocol::HeuristicRow;

/// Ranks terms by `total * (1 / mean_page)`, rewarding terms that are frequent
/// and concentrated on early pages.
pub fn heuristic_search<S: AsRef<str>>(
    document: &Document,
    terms: &[S],
) -> Result<Vec<HeuristicRow>> {
    let matches = exact_search(document, terms)?;
    Ok(rank_matches(&matches))
}

/// Builds the relevance ranking from exact counts. Ties keep match order.
#[allow(clippy::cast_precision_loss)]
pub fn rank_matches(matches: &ExactMatches) -> Vec<HeuristicRow> {
    let mut ranking: Vec<HeuristicRow> = matches
        .iter()
        .map(|(term, pages)| {
            let total: usize = pages.values().sum();
            // Only matched pages are stored and they are numbered from 1, so mean_page >= 1.
            let mean_page = pages.keys().sum::<usize>() as f64 / pages.len() as f64;
            let relevance = total as f64 * (1.0 / mean_page);
            HeuristicRow {
                term: term.to_string(),
                total_frequency: total,
                pages: pages.keys().copied().collect(),
                relevance: round_to(relevance, 3),
            }
        })
        .collect();

    ranking.sort_by(|a, b| descending(a.relevance, b.relevance));
    ranking
}
