//! Knowledge base access: search, resource lookups, combined ask, file fetch.

pub mod ask_stream;
pub mod client;
#[cfg(test)]
pub(crate) mod fakes;
pub mod provider;
pub mod types;

pub use client::NucliaClient;
pub use provider::{
    AskRequest, ContextMessage, KnowledgeBox, PromptOverride, SearchFeature, SearchRequest,
};
pub use types::{
    DownloadedFile, FileField, ResourceDetails, ResourceKind, ResourceMetadata, SearchHit,
    SearchPayload, SearchResults,
};
