//! In-memory store of recent meter readings

mod store;

pub use store::ReadingStore;
