//! Menu knowledge base: a tiny embedded text index the cashier consults
//! before every reply.

use std::sync::Arc;

use async_trait::async_trait;
use synth_ai::{EmbeddingProvider, cosine_similarity};

use crate::error::Result;
use crate::menu::Menu;

/// Stock cashier phrases indexed alongside the menu
pub const TEMPLATE_PHRASES: &[&str] = &[
    "What would you like to order?",
    "According to your preferences",
    "I can offer you",
    "Could you please clarify",
    "What kind of drink you would like?",
    "Your order:",
    "Is everything correct?",
    "Something else?",
];

/// Nearest-neighbour text retrieval
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the `k` closest chunks to `query`, joined by spaces
    async fn retrieve(&self, query: &str, k: usize) -> Result<String>;
}

/// Corpus and chunking settings
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters of trailing words repeated at the start of the next chunk
    pub chunk_overlap: usize,
    /// Index the per-category sentences as well as bare item names
    pub include_category_summaries: bool,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            chunk_overlap: 10,
            include_category_summaries: true,
        }
    }
}

/// Concatenate template phrases, category sentences and item names
pub fn build_corpus(menu: &Menu, include_category_summaries: bool) -> String {
    let mut parts: Vec<String> = TEMPLATE_PHRASES.iter().map(|p| p.to_string()).collect();
    if include_category_summaries {
        parts.extend(menu.category_summaries());
    }
    parts.extend(menu.item_names().into_iter().map(String::from));
    parts.join(" ")
}

/// Split text on whitespace into chunks of at most `chunk_size` characters.
/// Each new chunk starts with the trailing words of the previous one, up to
/// `chunk_overlap` characters. A single word longer than `chunk_size`
/// becomes its own chunk.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    fn joined_len(words: &[&str]) -> usize {
        if words.is_empty() {
            return 0;
        }
        words.iter().map(|w| w.chars().count()).sum::<usize>() + words.len() - 1
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let fits = |current: &[&str]| {
            current.is_empty() || joined_len(current) + 1 + word_len <= chunk_size
        };

        if !fits(&current) {
            chunks.push(current.join(" "));
            while !current.is_empty() && (joined_len(&current) > chunk_overlap || !fits(&current)) {
                current.remove(0);
            }
        }
        current.push(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// In-memory embedding index over the menu corpus
pub struct MenuKnowledgeBase {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MenuKnowledgeBase {
    /// Build the corpus, chunk it and embed every chunk
    pub async fn build(
        menu: &Menu,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &KnowledgeConfig,
    ) -> Result<Self> {
        let corpus = build_corpus(menu, config.include_category_summaries);
        let chunks = split_text(&corpus, config.chunk_size, config.chunk_overlap);
        let embeddings = embedder.embed_batch(&chunks).await?;

        tracing::debug!(
            chunks = chunks.len(),
            items = menu.len(),
            "Built menu knowledge base"
        );

        Ok(Self {
            chunks,
            embeddings,
            embedder,
        })
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Rank chunks by similarity to `query`, best first. Ties keep corpus
    /// order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(&str, f32)>> {
        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(&str, f32)> = self
            .chunks
            .iter()
            .zip(self.embeddings.iter())
            .map(|(chunk, embedding)| {
                (chunk.as_str(), cosine_similarity(&query_embedding, embedding))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl Retriever for MenuKnowledgeBase {
    async fn retrieve(&self, query: &str, k: usize) -> Result<String> {
        let hits = self.search(query, k).await?;
        Ok(hits
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::tests::small_menu;
    use synth_ai::HashingEmbedder;

    #[test]
    fn test_split_with_overlap() {
        let chunks = split_text("aaaa bbbb cccc dddd", 9, 4);
        assert_eq!(chunks, vec!["aaaa bbbb", "bbbb cccc", "cccc dddd"]);
    }

    #[test]
    fn test_split_without_overlap() {
        let chunks = split_text("one two three four", 8, 0);
        assert_eq!(chunks, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_split_long_word_is_its_own_chunk() {
        let chunks = split_text("a Supercalifragilistic b", 5, 2);
        assert_eq!(chunks, vec!["a", "Supercalifragilistic", "b"]);
    }

    #[test]
    fn test_split_respects_size() {
        let text = build_corpus(&small_menu(), true);
        for chunk in split_text(&text, 100, 10) {
            assert!(chunk.chars().count() <= 100, "chunk too long: {chunk}");
        }
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_text("   ", 100, 10).is_empty());
    }

    #[test]
    fn test_corpus_contents() {
        let corpus = build_corpus(&small_menu(), false);
        assert!(corpus.starts_with("What would you like to order?"));
        assert!(corpus.ends_with("Burger Fries Cola"));
        assert!(!corpus.contains("In our menu"));

        let with_summaries = build_corpus(&small_menu(), true);
        assert!(with_summaries.contains("In our menu in the category Drinks we ONLY have: Cola."));
    }

    #[tokio::test]
    async fn test_retrieve_top_k() {
        let config = KnowledgeConfig {
            chunk_size: 30,
            chunk_overlap: 0,
            include_category_summaries: false,
        };
        let kb = MenuKnowledgeBase::build(&small_menu(), Arc::new(HashingEmbedder::default()), &config)
            .await
            .unwrap();
        assert!(kb.chunks().len() > 2);

        let hits = kb.search("Something else?", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].0.contains("Something else?"));

        let context = kb.retrieve("Fries", 2).await.unwrap();
        assert!(!context.is_empty());
        let all = kb.retrieve("Fries", 100).await.unwrap();
        assert_eq!(all.len(), kb.chunks().join(" ").len());
    }

    #[tokio::test]
    async fn test_retrieve_zero_k_is_empty() {
        let kb = MenuKnowledgeBase::build(
            &small_menu(),
            Arc::new(HashingEmbedder::new(16)),
            &KnowledgeConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(kb.retrieve("Cola", 0).await.unwrap(), "");
    }
}
