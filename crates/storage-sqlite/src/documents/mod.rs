//! SQLite storage implementation for versioned aggregate documents.

mod backup;
mod model;
mod repository;

pub use backup::DumpDocument;
pub use model::DocumentDB;
pub use repository::DocumentRepository;
