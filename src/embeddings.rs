//! Word-vector models and the lazily-loading provider the semantic matcher reads from.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::*;
use once_cell::sync::OnceCell;

use crate::errors::ChatError;

/// A read-only word-vector model. Vectors are stored unit-length.
#[derive(Debug, Clone, Default)]
pub struct WordVectors {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    /// Reads word2vec text format (`<count> <dim>` header line) or raw GloVe text.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ChatError> {
        let mut model = Self::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = i + 1;
            let mut fields = line.split_whitespace();
            let word = match fields.next() {
                Some(word) => word,
                None => continue,
            };
            let values: Vec<&str> = fields.collect();

            // word2vec header: "<vocab size> <dimensions>"
            if line_number == 1 && values.len() == 1 && word.parse::<usize>().is_ok() {
                model.dim = values[0].parse().map_err(|_| ChatError::Embeddings {
                    line: line_number,
                    reason: format!("invalid dimension {:?}", values[0]),
                })?;
                continue;
            }

            let vector = values
                .iter()
                .map(|value| value.parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ChatError::Embeddings {
                    line: line_number,
                    reason: e.to_string(),
                })?;
            model.insert(word, vector).map_err(|reason| ChatError::Embeddings {
                line: line_number,
                reason,
            })?;
        }

        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Builds a model from in-memory vectors.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ChatError>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: AsRef<str>,
    {
        let mut model = Self::default();
        for (i, (word, vector)) in pairs.into_iter().enumerate() {
            model.insert(word.as_ref(), vector)
                .map_err(|reason| ChatError::Embeddings { line: i + 1, reason })?;
        }
        Ok(model)
    }

    fn insert(&mut self, word: &str, mut vector: Vec<f32>) -> Result<(), String> {
        if vector.is_empty() {
            return Err(format!("no values for {:?}", word));
        }
        if self.dim == 0 {
            self.dim = vector.len();
        } else if vector.len() != self.dim {
            return Err(format!(
                "expected {} values for {:?}, got {}",
                self.dim,
                word,
                vector.len()
            ));
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        self.vectors.insert(word.to_lowercase(), vector);
        Ok(())
    }

    /// Cosine similarity of two words, if both are known.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let a = self.vectors.get(a)?;
        let b = self.vectors.get(b)?;
        Some(a.iter().zip(b).map(|(x, y)| x * y).sum())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Hands out a word-vector model that is loaded on first use.
///
/// A provider without a path, or whose file cannot be read, reports no model. Loading is
/// attempted once; the outcome is shared by every session holding the provider.
#[derive(Debug, Default)]
pub struct EmbeddingProvider {
    path: Option<PathBuf>,
    model: OnceCell<Option<Arc<WordVectors>>>,
}

impl EmbeddingProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            model: OnceCell::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_vectors(vectors: WordVectors) -> Self {
        Self {
            path: None,
            model: OnceCell::from(Some(Arc::new(vectors))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> Option<&Arc<WordVectors>> {
        self.model
            .get_or_init(|| {
                let path = self.path.as_ref()?;
                match WordVectors::load(path) {
                    Ok(model) => {
                        info!(
                            "Loaded {} word vectors ({}d) from {}",
                            model.len(),
                            model.dim(),
                            path.display()
                        );
                        Some(Arc::new(model))
                    }
                    Err(e) => {
                        warn!(
                            "Word vectors at {} unavailable, using exact matching only: {}",
                            path.display(),
                            e
                        );
                        None
                    }
                }
            })
            .as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.get().is_some()
    }
}
