//! # docchat RAG pipeline
//!
//! Retrieval-augmented chat over an indexed document set:
//!
//! - [`Retriever`]: query the index and turn hits into cited context
//! - [`PromptAssembler`]: system message, recent history, context and query
//! - [`ChatLoop`]: the interactive read/answer state machine
//! - [`Indexer`]: upload a document and index its pages
//! - [`clear_index`]: empty the index in bounded batches

pub mod assembler;
pub mod chat_loop;
pub mod ingest;
pub mod maintenance;
pub mod retriever;
pub mod snippet;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::PromptAssembler;
pub use chat_loop::{ChatLoop, ExitReason, LineSource, SessionOutcome, StdinLines};
pub use ingest::{IndexReport, Indexer};
pub use maintenance::{ClearReport, clear_index};
pub use retriever::{ContextSnippet, Retriever, format_context};
