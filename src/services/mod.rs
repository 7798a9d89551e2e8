mod categories;
mod clipboard;
mod collections;
mod preferences;
mod saved;

pub use categories::load_taxonomy;
pub use clipboard::copy_to_clipboard;
pub use collections::{AddOutcome, CollectionService, ALREADY_IN_COLLECTION};
pub use preferences::PreferenceStore;
pub use saved::SavedArticles;
