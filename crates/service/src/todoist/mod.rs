//! Todoist relay: a thin REST client plus normalization of its list responses.

pub mod client;
pub mod domain;
pub mod error;
pub mod normalize;

pub use client::TodoistClient;
pub use domain::{NewTask, Project, Task};
pub use error::TodoistError;
