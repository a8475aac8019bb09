//! Retrieval-augmented answering over the knowledge base.
//!
//! - `query`: question normalization
//! - `context_builder`: prompt context from search hits
//! - `sources`: UI citation entries with download descriptors
//! - `ask_response`: normalization of the combined ask endpoint
//! - `pipeline`: the search + generate flow behind `/ask`

pub mod ask_response;
pub mod context_builder;
pub mod pipeline;
pub mod query;
pub mod sources;

pub use ask_response::{normalize_ask_response, AskSource, NormalizedAsk};
pub use context_builder::{build_context, ContextBuilderConfig};
pub use pipeline::{AskParams, AskPipeline, AskResult};
pub use query::preprocess_query;
pub use sources::{extract_sources, FileDownload, SourceEntry, SourceOptions, UrlType};
