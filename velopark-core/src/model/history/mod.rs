mod metadata;
mod store;

pub use metadata::load_metadata;
pub use store::HistoryStore;
