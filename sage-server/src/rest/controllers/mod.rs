pub mod chat;
pub mod collection;
pub mod ingest;
