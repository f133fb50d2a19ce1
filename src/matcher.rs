use std::fmt;
use std::sync::Arc;

use log::*;

use crate::{
    embeddings::EmbeddingProvider,
    node::DialogueNode,
    similarity,
    tokenizer,
    transcript::{ChatLog, MatchEvent},
};

/// Scores at or above this resolve a semantic match.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.1;

/// Tunable matching rules.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MatchPolicy {
    /// Minimum soft cosine score (inclusive) for a semantic match.
    pub confidence_threshold: f32,
    /// Output candidates are taken unconditionally.
    pub output_always_wins: bool,
}

impl MatchPolicy {
    pub fn accepts(&self, score: f32) -> bool {
        score >= self.confidence_threshold
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            output_always_wins: true,
        }
    }
}

/// How a node was chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// An Output candidate was present and won outright.
    Forced,
    /// A keyword of the node occurs in the utterance.
    Exact(String),
    /// Nothing matched; the default or first candidate was taken.
    Fallback,
    Similarity(f32),
    /// Best semantic score, below the threshold.
    LowConfidence(f32),
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "forced"),
            Self::Exact(keyword) => write!(f, "exact({})", keyword),
            Self::Fallback => write!(f, "fallback"),
            Self::Similarity(score) => write!(f, "{:.4}", score),
            Self::LowConfidence(score) => write!(f, "low_confidence({:.4})", score),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matched<'g> {
    pub node: &'g DialogueNode,
    pub provenance: Provenance,
}

impl<'g> Matched<'g> {
    fn new(node: &'g DialogueNode, provenance: Provenance) -> Self {
        Self { node, provenance }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult<'g> {
    Matched(Matched<'g>),
    /// No candidate cleared the confidence bar. `best` is only the closest candidate; the
    /// caller owns the re-prompt and repeats its last question.
    Unresolved {
        best: &'g DialogueNode,
        score: f32,
    },
    /// There was nothing to choose from.
    NoCandidates,
}

/// Resolves an utterance to one of the candidates by keyword.
pub trait Matcher: Send + Sync {
    fn match_node<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
        default: &str,
    ) -> Option<Matched<'g>>;
}

/// A matcher that can also fall back to embedding similarity.
pub trait SemanticMatcher: Matcher {
    fn semantic_match<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
        default: &str,
    ) -> MatchResult<'g>;
}

/// The matcher a chat session drives, with its capability fixed when it is built.
pub enum MatcherHandle {
    Exact(Box<dyn Matcher>),
    Semantic(Box<dyn SemanticMatcher>),
}

impl MatcherHandle {
    pub fn resolve<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
        default: &str,
    ) -> MatchResult<'g> {
        match self {
            Self::Exact(matcher) => matcher
                .match_node(utterance, candidates, default)
                .map(MatchResult::Matched)
                .unwrap_or(MatchResult::NoCandidates),
            Self::Semantic(matcher) => matcher.semantic_match(utterance, candidates, default),
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Semantic(_))
    }
}

impl From<StringMatcher> for MatcherHandle {
    fn from(matcher: StringMatcher) -> Self {
        Self::Exact(Box::new(matcher))
    }
}

impl From<SoftCosineMatcher> for MatcherHandle {
    fn from(matcher: SoftCosineMatcher) -> Self {
        Self::Semantic(Box::new(matcher))
    }
}

/// Forced Output or longest keyword hit, if any.
fn keyword_match<'g>(
    utterance: &str,
    candidates: &[&'g DialogueNode],
    policy: &MatchPolicy,
) -> Option<Matched<'g>> {
    if policy.output_always_wins {
        if let Some(output) = candidates.iter().copied().find(|node| node.is_output()) {
            return Some(Matched::new(output, Provenance::Forced));
        }
    }

    let request = utterance.to_lowercase();
    let mut best: Option<(&'g DialogueNode, &'g str, usize)> = None;
    for &node in candidates {
        if policy.output_always_wins && node.is_output() {
            continue;
        }
        for keyword in node.keywords() {
            let len = keyword.chars().count();
            if best.map_or(false, |(_, _, best_len)| len <= best_len) {
                continue;
            }
            if request.contains(&keyword.to_lowercase()) {
                best = Some((node, keyword, len));
            }
        }
    }

    best.map(|(node, keyword, _)| Matched::new(node, Provenance::Exact(keyword.to_string())))
}

/// The `default`-named candidate, else the first one.
fn fallback<'g>(candidates: &[&'g DialogueNode], default: &str) -> Option<Matched<'g>> {
    candidates
        .iter()
        .find(|node| node.name == default)
        .or_else(|| candidates.first())
        .map(|&node| Matched::new(node, Provenance::Fallback))
}

fn exact_match<'g>(
    utterance: &str,
    candidates: &[&'g DialogueNode],
    default: &str,
    policy: &MatchPolicy,
) -> Option<Matched<'g>> {
    keyword_match(utterance, candidates, policy).or_else(|| fallback(candidates, default))
}

fn report(log: &dyn ChatLog, utterance: &str, node: &DialogueNode, provenance: &Provenance) {
    debug!("Matched {:?} -> {} ({})", utterance, node.name, provenance);
    log.record_match(&MatchEvent {
        utterance,
        node_name: &node.name,
        provenance,
    });
}

/// Keyword-only matcher.
pub struct StringMatcher {
    policy: MatchPolicy,
    log: Arc<dyn ChatLog>,
}

impl StringMatcher {
    pub fn new(policy: MatchPolicy, log: Arc<dyn ChatLog>) -> Self {
        Self { policy, log }
    }
}

impl Matcher for StringMatcher {
    fn match_node<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
        default: &str,
    ) -> Option<Matched<'g>> {
        let matched = exact_match(utterance, candidates, default, &self.policy)?;
        report(self.log.as_ref(), utterance, matched.node, &matched.provenance);
        Some(matched)
    }
}

/// Keyword matching first, then soft cosine similarity against the candidates' content.
pub struct SoftCosineMatcher {
    policy: MatchPolicy,
    embeddings: Arc<EmbeddingProvider>,
    log: Arc<dyn ChatLog>,
}

impl SoftCosineMatcher {
    pub fn new(
        policy: MatchPolicy,
        embeddings: Arc<EmbeddingProvider>,
        log: Arc<dyn ChatLog>,
    ) -> Self {
        Self {
            policy,
            embeddings,
            log,
        }
    }

    /// Best-scoring non-Output candidate, or `None` if scoring is not possible.
    fn best_by_similarity<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
    ) -> Option<(&'g DialogueNode, f32)> {
        let vectors = self.embeddings.get()?;

        let targets: Vec<&'g DialogueNode> = candidates.iter()
            .copied()
            .filter(|node| !node.is_output())
            .collect();
        if targets.is_empty() {
            return None;
        }

        let query = tokenizer::tokenize(utterance);
        let documents: Vec<Vec<String>> = targets.iter()
            .map(|node| tokenizer::tokenize_keywords(&node.content))
            .collect();
        if query.is_empty() || documents.iter().all(Vec::is_empty) {
            return None;
        }

        let scores = similarity::soft_cosine_scores(vectors, &query, &documents);
        let mut best = (targets[0], scores[0]);
        for (&node, &score) in targets.iter().zip(&scores).skip(1) {
            if score > best.1 {
                best = (node, score);
            }
        }
        debug!(
            "Similarity scores for {:?}: {:?}",
            utterance,
            targets.iter().map(|n| &n.name).zip(&scores).collect::<Vec<_>>()
        );

        Some(best)
    }
}

impl Matcher for SoftCosineMatcher {
    fn match_node<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
        default: &str,
    ) -> Option<Matched<'g>> {
        let matched = exact_match(utterance, candidates, default, &self.policy)?;
        report(self.log.as_ref(), utterance, matched.node, &matched.provenance);
        Some(matched)
    }
}

impl SemanticMatcher for SoftCosineMatcher {
    fn semantic_match<'g>(
        &self,
        utterance: &str,
        candidates: &[&'g DialogueNode],
        default: &str,
    ) -> MatchResult<'g> {
        let matched = match keyword_match(utterance, candidates, &self.policy) {
            Some(matched) => matched,
            None => match self.best_by_similarity(utterance, candidates) {
                Some((node, score)) if self.policy.accepts(score) => {
                    Matched::new(node, Provenance::Similarity(score))
                }
                Some((best, score)) => {
                    report(self.log.as_ref(), utterance, best, &Provenance::LowConfidence(score));
                    return MatchResult::Unresolved { best, score };
                }
                None => match fallback(candidates, default) {
                    Some(matched) => matched,
                    None => return MatchResult::NoCandidates,
                },
            },
        };

        report(self.log.as_ref(), utterance, matched.node, &matched.provenance);
        MatchResult::Matched(matched)
    }
}
