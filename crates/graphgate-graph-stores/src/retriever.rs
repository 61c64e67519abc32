//! Knowledge graph retriever.
//!
//! Turns a question into graph lookups: the LLM names the entities worth
//! looking up, the graph store returns the relation paths around them, and
//! those paths are rendered as a knowledge sequence for answer synthesis.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use graphgate_core::error::GraphResult;
use graphgate_core::traits::{GraphStore, GenerationOptions, Llm, RelMap};
use graphgate_core::types::{Message, NodeWithScore, StorageContext};

const DEFAULT_MAX_KEYWORDS: usize = 10;
const DEFAULT_TRAVERSAL_DEPTH: usize = 2;
const DEFAULT_MAX_KNOWLEDGE_SEQUENCE: usize = 30;

const KEYWORD_PREFIX: &str = "KEYWORDS:";
const KEYWORD_MAX_TOKENS: u32 = 256;

const KEYWORD_SYSTEM_PROMPT: &str = "You extract search keywords for a knowledge graph. \
    Keywords are entity names as they would appear in the graph.";

/// Retriever over a knowledge graph, bound to a graph store and an LLM.
pub struct KnowledgeGraphRetriever {
    graph_store: Arc<dyn GraphStore>,
    storage_context: StorageContext,
    llm: Arc<dyn Llm>,
    verbose: bool,
    max_keywords: usize,
    graph_traversal_depth: usize,
    max_knowledge_sequence: usize,
}

impl KnowledgeGraphRetriever {
    /// Create a retriever with default limits and verbose output off.
    pub fn new(
        graph_store: Arc<dyn GraphStore>,
        storage_context: StorageContext,
        llm: Arc<dyn Llm>,
    ) -> Self {
        Self {
            graph_store,
            storage_context,
            llm,
            verbose: false,
            max_keywords: DEFAULT_MAX_KEYWORDS,
            graph_traversal_depth: DEFAULT_TRAVERSAL_DEPTH,
            max_knowledge_sequence: DEFAULT_MAX_KNOWLEDGE_SEQUENCE,
        }
    }

    /// Log extracted entities and knowledge sequences.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Maximum number of entities to look up per question.
    pub fn with_max_keywords(mut self, max_keywords: usize) -> Self {
        self.max_keywords = max_keywords;
        self
    }

    /// Maximum number of hops followed from each entity.
    pub fn with_graph_traversal_depth(mut self, depth: usize) -> Self {
        self.graph_traversal_depth = depth;
        self
    }

    /// Maximum number of relation paths fetched per question.
    pub fn with_max_knowledge_sequence(mut self, limit: usize) -> Self {
        self.max_knowledge_sequence = limit;
        self
    }

    pub fn graph_store(&self) -> &Arc<dyn GraphStore> {
        &self.graph_store
    }

    pub fn storage_context(&self) -> &StorageContext {
        &self.storage_context
    }

    pub fn llm(&self) -> &Arc<dyn Llm> {
        &self.llm
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Retrieve the knowledge sequence relevant to `query`.
    ///
    /// Returns an empty list when the graph holds nothing about the extracted
    /// entities.
    pub async fn retrieve(&self, query: &str) -> GraphResult<Vec<NodeWithScore>> {
        let entities = self.extract_entities(query).await?;
        if self.verbose {
            info!(entities = ?entities, "Entities extracted from query");
        }
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let rel_map = self
            .graph_store
            .get_rel_map(
                &entities,
                self.graph_traversal_depth,
                self.max_knowledge_sequence,
            )
            .await?;

        let sequences = knowledge_sequences(&rel_map);
        if sequences.is_empty() {
            if self.verbose {
                info!("No knowledge sequence found for query");
            }
            return Ok(Vec::new());
        }

        let text = format!(
            "The following are knowledge sequences of max depth {} in the form of \
             `subject -[relation]-> object -[relation]-> object`:\n{}",
            self.graph_traversal_depth,
            sequences.join("\n")
        );
        if self.verbose {
            info!(knowledge_sequence = %text, "Knowledge sequence retrieved");
        }

        Ok(vec![NodeWithScore::new(text)
            .with_score(1.0)
            .with_metadata("kg_entities", serde_json::json!(entities))
            .with_metadata("kg_rel_map", serde_json::json!(rel_map))])
    }

    async fn extract_entities(&self, query: &str) -> GraphResult<Vec<String>> {
        let prompt = format!(
            "Extract up to {max} keywords from the question below. Pick the ones most \
             useful for looking up the answer in a knowledge graph and skip stopwords.\n\
             ---------------------\n{query}\n---------------------\n\
             Answer on a single line formatted as '{prefix} <keyword>, <keyword>, ...'",
            max = self.max_keywords,
            prefix = KEYWORD_PREFIX,
        );
        let options = GenerationOptions {
            temperature: Some(0.0),
            max_tokens: Some(KEYWORD_MAX_TOKENS),
        };
        let messages = [Message::system(KEYWORD_SYSTEM_PROMPT), Message::user(prompt)];

        let response = self.llm.generate(&messages, Some(options)).await?;

        let mut keywords = parse_keywords(response.content_or_empty(), self.max_keywords);
        if keywords.is_empty() && !query.trim().is_empty() {
            keywords.push(query.trim().to_string());
        }
        Ok(keywords)
    }
}

/// Parse a `KEYWORDS: a, b, c` answer, keeping the first `max` distinct keywords.
pub(crate) fn parse_keywords(response: &str, max: usize) -> Vec<String> {
    let Some(line) = response.lines().find_map(|line| {
        let line = line.trim();
        let head = line.get(..KEYWORD_PREFIX.len())?;
        head.eq_ignore_ascii_case(KEYWORD_PREFIX)
            .then(|| &line[KEYWORD_PREFIX.len()..])
    }) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    line.split(',')
        .map(|k| k.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Render each relation path as `subj -[rel]-> obj -[rel]-> obj`, ordered by subject.
pub(crate) fn knowledge_sequences(rel_map: &RelMap) -> Vec<String> {
    let mut subjects: Vec<&String> = rel_map.keys().collect();
    subjects.sort();

    let mut sequences = Vec::new();
    for subject in subjects {
        for path in &rel_map[subject] {
            let mut sequence = subject.clone();
            for hop in path.chunks(2) {
                match hop {
                    [rel, obj] => sequence.push_str(&format!(" -[{}]-> {}", rel, obj)),
                    [rel] => sequence.push_str(&format!(" -[{}]->", rel)),
                    _ => {}
                }
            }
            sequences.push(sequence);
        }
    }
    sequences
}
