//! # planpoker — Planning Poker estimation core
//!
//! Vote-consensus classification plus AI-assisted story estimation:
//! archived stories are chunked and embedded into SQLite, similar stories
//! are retrieved by cosine similarity, and a language model turns that
//! evidence into a point estimate for new stories.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and the cached
//!   AI-availability check
//! - **[`consensus`]** — Vote scale and round outcome classification
//! - **[`preprocess`]** — Text normalization and combined story text
//! - **[`chunker`]** — Fixed, sentence, paragraph, and story-aware chunking
//! - **[`embedder`]** — Embedding providers (mock, OpenAI, Ollama)
//! - **[`similarity`]** — Cosine similarity and top-K retrieval
//! - **[`db`]** — SQLite persistence for stories, votes, chunks,
//!   embeddings, and estimations
//! - **[`pipeline`]** — Idempotent chunk-and-embed over the story archive
//! - **[`estimator`]** — Evidence gathering, prompting, point extraction,
//!   and the background estimation service

pub mod chunker;
pub mod config;
pub mod consensus;
pub mod db;
pub mod embedder;
pub mod estimator;
pub mod pipeline;
pub mod preprocess;
pub mod similarity;
