//! Service layer for the focus dashboard.
//! - `storage`: persistence facade plus the local adapter and its file-backed store.
//! - `gdrive`: the Google Drive adapter, OAuth client and session token lifecycle.
//! - `dashboard`: the state owner that loads and writes through the facade.
//! - `todoist`: the task-tracker client and response normalization.

pub mod errors;
pub mod clock;
pub mod runtime;
pub mod storage;
pub mod gdrive;
pub mod dashboard;
pub mod todoist;
