//! Question answering over a managed knowledge base.
//!
//! Two flows are exposed over HTTP: `/ask` searches the knowledge base,
//! builds a prompt context from the hits and asks the LLM; `/nuclia-ask`
//! delegates both steps to the knowledge base's own ask endpoint. Both
//! return an answer plus UI-ready source citations.

pub mod core;
pub mod kb;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
