use std::fmt;
use std::str::FromStr;

/// Logical keys the dashboard persists, one storage entry each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    WidgetsEnabled,
    WidgetVisibility,
    WidgetPositions,
    CurrentSpace,
    Settings,
    TodoistConfig,
    MusicState,
    CustomSpaces,
    CustomStreams,
    Notes,
    Todos,
}

impl StateKey {
    pub const ALL: [StateKey; 11] = [
        StateKey::WidgetsEnabled,
        StateKey::WidgetVisibility,
        StateKey::WidgetPositions,
        StateKey::CurrentSpace,
        StateKey::Settings,
        StateKey::TodoistConfig,
        StateKey::MusicState,
        StateKey::CustomSpaces,
        StateKey::CustomStreams,
        StateKey::Notes,
        StateKey::Todos,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::WidgetsEnabled => "widgets-enabled",
            StateKey::WidgetVisibility => "widgets",
            StateKey::WidgetPositions => "widget-positions",
            StateKey::CurrentSpace => "current-space",
            StateKey::Settings => "settings",
            StateKey::TodoistConfig => "todoist-config",
            StateKey::MusicState => "music-state",
            StateKey::CustomSpaces => "custom-spaces",
            StateKey::CustomStreams => "custom-streams",
            StateKey::Notes => "notes",
            StateKey::Todos => "todos",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown state key `{s}`"))
    }
}
