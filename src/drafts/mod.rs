/// Fjall-backed persistence for unsent form drafts
///
/// Drafts live in a single `drafts` partition keyed by `form-{form_id}`
/// (`anonymous-form` for forms without a name). Password fields are never
/// written. A draft is cleared once its form is submitted successfully.
///
/// ```rust,ignore
/// use scrapewatch::drafts::DraftStore;
///
/// let store = DraftStore::open("data/drafts")?;
/// store.save(Some("jobForm"), [("query", "rust developer")])?;
/// let draft = store.load(Some("jobForm"))?;
/// ```
pub mod error;
pub mod keys;
pub mod store;

pub use error::{DraftError, Result};
pub use keys::ANONYMOUS_FORM_KEY;
pub use store::{Draft, DraftStore};
