use serde::{Deserialize, Serialize};

/// Task as the dashboard consumes it, independent of the upstream API version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub project_id: Option<String>,
    pub due: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub text: String,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Free-form due string, e.g. "tomorrow 9am".
    #[serde(default)]
    pub due: Option<String>,
}
