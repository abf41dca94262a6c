//! Source ingestion: language detection and directory loading
//!
//! The analysis core consumes [`SourceFile`](crate::types::SourceFile) records and
//! never touches the filesystem itself; this module is the stand-in upstream
//! collaborator used by the command-line tool.

mod language;
mod loader;

pub use language::{detect_language, is_binary_extension};
pub use loader::SourceLoader;
