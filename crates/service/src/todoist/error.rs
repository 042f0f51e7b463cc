use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodoistError {
    #[error("todoist rejected the api token")]
    Unauthorized,
    #[error("todoist returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("todoist unreachable: {0}")]
    Network(String),
    #[error("unexpected todoist response: {0}")]
    Parse(String),
    #[error("invalid task id `{0}`")]
    InvalidId(String),
}

impl From<reqwest::Error> for TodoistError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TodoistError::Parse(e.to_string())
        } else {
            TodoistError::Network(e.to_string())
        }
    }
}
