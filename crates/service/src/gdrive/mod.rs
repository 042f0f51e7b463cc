//! Google Drive backed persistence.
//!
//! The whole dashboard document lives in one JSON file created by this app
//! (`drive.file` scope). [`adapter::GDriveAdapter`] caches it in memory and writes it
//! back in full after a quiet period.

pub mod error;
pub mod token;
pub mod api;
pub mod http;
pub mod oauth;
pub mod adapter;

pub use adapter::{DriveOptions, DriveState, GDriveAdapter};
pub use api::{DriveApi, DriveClientLoader, DriveFile};
pub use error::{DriveError, SessionError};
pub use oauth::{CodeExchange, OAuthClient, TokenProvider};
pub use token::{SessionToken, TokenStore};
