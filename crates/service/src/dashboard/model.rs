use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetId {
    Pomodoro,
    Todo,
    Notes,
    Planner,
    Music,
}

impl WidgetId {
    pub const ALL: [WidgetId; 5] = [WidgetId::Pomodoro, WidgetId::Todo, WidgetId::Notes, WidgetId::Planner, WidgetId::Music];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClockFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHours {
    pub start: u8,
    pub end: u8,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self { start: 9, end: 17 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroDurations {
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

impl Default for PomodoroDurations {
    fn default() -> Self {
        Self { focus_minutes: 25, break_minutes: 5 }
    }
}

/// Display settings. Missing fields in stored documents fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub opacity: f64,
    pub clock_format: ClockFormat,
    pub work_hours: WorkHours,
    pub pomodoro: PomodoroDurations,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opacity: 0.85,
            clock_format: ClockFormat::default(),
            work_hours: WorkHours::default(),
            pomodoro: PomodoroDurations::default(),
        }
    }
}

impl Settings {
    /// Clamp opacity into `[0, 1]`; reject impossible hours and zero-length timers.
    pub fn normalized(mut self) -> Result<Self, ServiceError> {
        if !self.opacity.is_finite() {
            return Err(ServiceError::Validation("opacity must be a number".into()));
        }
        self.opacity = self.opacity.clamp(0.0, 1.0);
        if self.work_hours.start >= self.work_hours.end || self.work_hours.end > 24 {
            return Err(ServiceError::Validation(format!(
                "work hours {}-{} must satisfy start < end <= 24",
                self.work_hours.start, self.work_hours.end
            )));
        }
        if self.pomodoro.focus_minutes == 0 || self.pomodoro.break_minutes == 0 {
            return Err(ServiceError::Validation("pomodoro durations must be positive".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoistSettings {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicState {
    pub playing: bool,
    pub volume: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

impl Default for MusicState {
    fn default() -> Self {
        Self { playing: false, volume: 50, stream_id: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: String,
    pub name: String,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

pub const DEFAULT_SPACE: &str = "lofi-cafe";

/// Everything the dashboard remembers between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub widgets_enabled: BTreeMap<WidgetId, bool>,
    pub widget_visibility: BTreeMap<WidgetId, bool>,
    pub widget_positions: BTreeMap<WidgetId, Position>,
    pub current_space: String,
    pub settings: Settings,
    pub todoist: TodoistSettings,
    pub music: MusicState,
    pub custom_spaces: Vec<Space>,
    pub custom_streams: Vec<Stream>,
    pub notes: String,
    pub todos: Vec<TodoItem>,
}

impl Default for DashboardState {
    fn default() -> Self {
        let widgets_enabled = WidgetId::ALL.into_iter().map(|w| (w, true)).collect();
        let widget_visibility = WidgetId::ALL
            .into_iter()
            .map(|w| (w, matches!(w, WidgetId::Pomodoro | WidgetId::Todo)))
            .collect();
        let widget_positions = WidgetId::ALL
            .into_iter()
            .enumerate()
            .map(|(i, w)| (w, Position { x: 40 + 360 * (i as i32 % 3), y: 80 + 320 * (i as i32 / 3) }))
            .collect();
        Self {
            widgets_enabled,
            widget_visibility,
            widget_positions,
            current_space: DEFAULT_SPACE.to_string(),
            settings: Settings::default(),
            todoist: TodoistSettings::default(),
            music: MusicState::default(),
            custom_spaces: Vec::new(),
            custom_streams: Vec::new(),
            notes: String::new(),
            todos: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_settings_document_keeps_other_defaults() {
        let s: Settings = serde_json::from_value(json!({"opacity": 0.3, "clockFormat": "12h"})).unwrap();
        assert_eq!(s.opacity, 0.3);
        assert_eq!(s.clock_format, ClockFormat::TwelveHour);
        assert_eq!(s.work_hours, WorkHours::default());
    }

    #[test]
    fn settings_validation() {
        let clamped = Settings { opacity: 1.7, ..Settings::default() }.normalized().unwrap();
        assert_eq!(clamped.opacity, 1.0);
        let bad_hours = Settings { work_hours: WorkHours { start: 18, end: 9 }, ..Settings::default() };
        assert!(matches!(bad_hours.normalized(), Err(ServiceError::Validation(_))));
        let past_midnight = Settings { work_hours: WorkHours { start: 20, end: 25 }, ..Settings::default() };
        assert!(past_midnight.normalized().is_err());
    }

    #[test]
    fn widget_maps_serialize_with_string_keys() {
        let state = DashboardState::default();
        let v = serde_json::to_value(&state.widget_visibility).unwrap();
        assert_eq!(v, json!({"pomodoro": true, "todo": true, "notes": false, "planner": false, "music": false}));
        assert_eq!(state.widgets_enabled.len(), 5);
    }
}
