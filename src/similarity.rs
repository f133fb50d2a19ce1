//! TF-IDF weighting and soft cosine similarity over word embeddings.

use std::collections::{BTreeMap, BTreeSet};

use crate::embeddings::WordVectors;

/// Power applied to the cosine between two different terms.
pub const TERM_SIMILARITY_EXPONENT: i32 = 2;
/// Different terms are only related when their cosine exceeds this.
pub const TERM_SIMILARITY_THRESHOLD: f32 = 0.0;

/// Sparse TF-IDF vector. Ordered so that sums are computed in a fixed order.
pub type TermWeights<'a> = BTreeMap<&'a str, f32>;

/// TF-IDF vectors for each document: `count * log2(N / df)`, L2-normalized.
///
/// Terms present in every document get zero weight and are dropped.
pub fn tfidf<'a>(documents: &[&'a [String]]) -> Vec<TermWeights<'a>> {
    let total = documents.len() as f32;

    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for document in documents {
        let unique: BTreeSet<&str> = document.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    documents
        .iter()
        .map(|document| {
            let mut counts: TermWeights<'a> = BTreeMap::new();
            for term in document.iter() {
                *counts.entry(term.as_str()).or_insert(0.0) += 1.0;
            }

            let mut weights: TermWeights<'a> = counts
                .into_iter()
                .filter_map(|(term, count)| {
                    let idf = (total / document_frequency[term] as f32).log2();
                    let weight = count * idf;
                    if weight > 0.0 {
                        Some((term, weight))
                    } else {
                        None
                    }
                })
                .collect();

            let norm = weights.values().map(|w| w * w).sum::<f32>().sqrt();
            if norm > 0.0 {
                weights.values_mut().for_each(|w| *w /= norm);
            }
            weights
        })
        .collect()
}

/// Similarity between two terms: 1 for identical terms, otherwise the thresholded and
/// exponentiated embedding cosine, or 0 if either term is unknown.
pub fn term_similarity(vectors: &WordVectors, a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    match vectors.similarity(a, b) {
        Some(cosine) if cosine > TERM_SIMILARITY_THRESHOLD => cosine.powi(TERM_SIMILARITY_EXPONENT),
        _ => 0.0,
    }
}

fn soft_inner(vectors: &WordVectors, x: &TermWeights<'_>, y: &TermWeights<'_>) -> f32 {
    x.iter()
        .map(|(a, wa)| {
            y.iter()
                .map(|(b, wb)| wa * wb * term_similarity(vectors, a, b))
                .sum::<f32>()
        })
        .sum()
}

/// `xᵀSy / sqrt(xᵀSx · yᵀSy)`, clamped to [0, 1].
pub fn soft_cosine(vectors: &WordVectors, x: &TermWeights<'_>, y: &TermWeights<'_>) -> f32 {
    let norm = (soft_inner(vectors, x, x) * soft_inner(vectors, y, y)).sqrt();
    if norm <= 0.0 {
        return 0.0;
    }
    (soft_inner(vectors, x, y) / norm).max(0.0).min(1.0)
}

/// Scores every document against the query. The TF-IDF corpus is the documents plus the query.
pub fn soft_cosine_scores(
    vectors: &WordVectors,
    query: &[String],
    documents: &[Vec<String>],
) -> Vec<f32> {
    let mut corpus: Vec<&[String]> = documents.iter().map(Vec::as_slice).collect();
    corpus.push(query);

    let mut weights = tfidf(&corpus);
    let query_weights = weights.pop().unwrap_or_default();

    weights
        .iter()
        .map(|document| soft_cosine(vectors, &query_weights, document))
        .collect()
}
