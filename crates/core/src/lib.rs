//! # docchat core
//!
//! Domain types, collaborator traits, and error definitions for docchat.
//! This crate has **no I/O of its own**: it defines the model that the
//! search, storage, provider and RAG crates implement against.
//!
//! ## Collaborators
//!
//! The three hosted services the application talks to are each hidden
//! behind one trait:
//! - [`SearchIndex`] for the document index
//! - [`ObjectStore`] for raw document uploads
//! - [`Provider`] for chat completions

pub mod error;
pub mod message;
pub mod provider;
pub mod search;
pub mod storage;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Choice, PromptPayload, Provider, ProviderResponse, Usage};
pub use search::{SearchHit, SearchIndex, SearchQuery, SearchRecord};
pub use storage::ObjectStore;
