//! EIP-3076 interchange import and export
//!
//! Import is all-or-nothing: the document is fully parsed before the
//! database is touched, and every write happens in one transaction.
//! Export is its inverse over the current contents of the store.

mod export;
mod import;

pub use export::export_document;
pub use import::{import_document, ImportSummary};
