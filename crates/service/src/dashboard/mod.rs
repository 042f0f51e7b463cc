//! Dashboard state owner.
//!
//! [`Dashboard`] holds every piece of user-facing state, loads it in one batch through the
//! persistence facade, and writes back exactly one logical key per mutation.

pub mod keys;
pub mod model;
pub mod boot;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::storage::Persistence;

pub use keys::StateKey;
pub use model::{DashboardState, MusicState, Position, Settings, Space, Stream, TodoItem, TodoistSettings, WidgetId};

pub struct Dashboard {
    persistence: Arc<Persistence>,
    state: DashboardState,
    /// False while the initial batch read is being applied; write-through is off then.
    hydrated: bool,
}

fn decode<T: DeserializeOwned>(key: StateKey, value: Option<Value>) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(%key, error = %e, "stored value unreadable; using default");
            None
        }
    }
}

fn strict<T: DeserializeOwned>(key: StateKey, value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|e| ServiceError::Validation(format!("invalid `{key}`: {e}")))
}

impl Dashboard {
    /// Batch-read every logical key and apply defaults for anything missing.
    pub async fn load(persistence: Arc<Persistence>) -> Self {
        let mut dashboard = Self { persistence, state: DashboardState::default(), hydrated: false };
        dashboard.reload().await;
        dashboard
    }

    /// Re-read everything from the currently active backend, e.g. after an adapter swap.
    pub async fn reload(&mut self) {
        self.hydrated = false;
        let keys: Vec<&str> = StateKey::ALL.iter().map(|k| k.as_str()).collect();
        let mut values = self.persistence.get_many(&keys).await;
        let mut take = |key: StateKey| values.remove(key.as_str()).flatten();

        let defaults = DashboardState::default();
        let mut state = defaults.clone();
        if let Some(v) = decode(StateKey::WidgetsEnabled, take(StateKey::WidgetsEnabled)) { state.widgets_enabled = v; }
        if let Some(v) = decode(StateKey::WidgetVisibility, take(StateKey::WidgetVisibility)) { state.widget_visibility = v; }
        if let Some(v) = decode(StateKey::WidgetPositions, take(StateKey::WidgetPositions)) { state.widget_positions = v; }
        if let Some(v) = decode(StateKey::CurrentSpace, take(StateKey::CurrentSpace)) { state.current_space = v; }
        if let Some(v) = decode::<Settings>(StateKey::Settings, take(StateKey::Settings)) {
            state.settings = v.normalized().unwrap_or_else(|e| {
                warn!(error = %e, "stored settings invalid; using defaults");
                defaults.settings.clone()
            });
        }
        if let Some(v) = decode(StateKey::TodoistConfig, take(StateKey::TodoistConfig)) { state.todoist = v; }
        if let Some(v) = decode(StateKey::MusicState, take(StateKey::MusicState)) { state.music = v; }
        if let Some(v) = decode(StateKey::CustomSpaces, take(StateKey::CustomSpaces)) { state.custom_spaces = v; }
        if let Some(v) = decode(StateKey::CustomStreams, take(StateKey::CustomStreams)) { state.custom_streams = v; }
        if let Some(v) = decode(StateKey::Notes, take(StateKey::Notes)) { state.notes = v; }
        if let Some(v) = decode(StateKey::Todos, take(StateKey::Todos)) { state.todos = v; }

        // Widgets added after the document was written still get their defaults.
        for widget in WidgetId::ALL {
            state.widgets_enabled.entry(widget).or_insert(defaults.widgets_enabled[&widget]);
            state.widget_visibility.entry(widget).or_insert(defaults.widget_visibility[&widget]);
            state.widget_positions.entry(widget).or_insert(defaults.widget_positions[&widget]);
        }
        for (widget, enabled) in &state.widgets_enabled {
            if !enabled {
                state.widget_visibility.insert(*widget, false);
            }
        }

        self.state = state;
        self.hydrated = true;
        debug!(backend = %self.persistence.get_type(), "dashboard state loaded");
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// JSON value of one logical key as it would be stored.
    pub fn value_of(&self, key: StateKey) -> Value {
        let s = &self.state;
        let v = match key {
            StateKey::WidgetsEnabled => to_value(&s.widgets_enabled),
            StateKey::WidgetVisibility => to_value(&s.widget_visibility),
            StateKey::WidgetPositions => to_value(&s.widget_positions),
            StateKey::CurrentSpace => to_value(&s.current_space),
            StateKey::Settings => to_value(&s.settings),
            StateKey::TodoistConfig => to_value(&s.todoist),
            StateKey::MusicState => to_value(&s.music),
            StateKey::CustomSpaces => to_value(&s.custom_spaces),
            StateKey::CustomStreams => to_value(&s.custom_streams),
            StateKey::Notes => to_value(&s.notes),
            StateKey::Todos => to_value(&s.todos),
        };
        v.unwrap_or(Value::Null)
    }

    async fn persist(&self, key: StateKey) {
        if !self.hydrated {
            return;
        }
        self.persistence.set(key.as_str(), self.value_of(key)).await;
    }

    pub async fn set_widget_enabled(&mut self, widget: WidgetId, enabled: bool) {
        self.state.widgets_enabled.insert(widget, enabled);
        self.persist(StateKey::WidgetsEnabled).await;
        if !enabled && self.state.widget_visibility.insert(widget, false) != Some(false) {
            self.persist(StateKey::WidgetVisibility).await;
        }
    }

    fn is_enabled(&self, widget: WidgetId) -> bool {
        self.state.widgets_enabled.get(&widget).copied().unwrap_or(false)
    }

    pub async fn set_widget_visible(&mut self, widget: WidgetId, visible: bool) -> Result<(), ServiceError> {
        if visible && !self.is_enabled(widget) {
            return Err(disabled(widget));
        }
        self.state.widget_visibility.insert(widget, visible);
        self.persist(StateKey::WidgetVisibility).await;
        Ok(())
    }

    pub async fn move_widget(&mut self, widget: WidgetId, position: Position) {
        self.state.widget_positions.insert(widget, position);
        self.persist(StateKey::WidgetPositions).await;
    }

    pub async fn select_space(&mut self, space_id: &str) -> Result<(), ServiceError> {
        if space_id.trim().is_empty() {
            return Err(ServiceError::Validation("space id is empty".into()));
        }
        self.state.current_space = space_id.to_string();
        self.persist(StateKey::CurrentSpace).await;
        Ok(())
    }

    pub async fn update_settings(&mut self, settings: Settings) -> Result<(), ServiceError> {
        self.state.settings = settings.normalized()?;
        self.persist(StateKey::Settings).await;
        Ok(())
    }

    pub async fn set_todoist_config(&mut self, config: TodoistSettings) {
        self.state.todoist = config;
        self.persist(StateKey::TodoistConfig).await;
    }

    pub async fn set_music_state(&mut self, mut music: MusicState) {
        music.volume = music.volume.min(100);
        self.state.music = music;
        self.persist(StateKey::MusicState).await;
    }

    pub async fn set_custom_spaces(&mut self, spaces: Vec<Space>) {
        self.state.custom_spaces = spaces;
        self.persist(StateKey::CustomSpaces).await;
    }

    pub async fn set_custom_streams(&mut self, streams: Vec<Stream>) {
        self.state.custom_streams = streams;
        self.persist(StateKey::CustomStreams).await;
    }

    pub async fn set_notes(&mut self, notes: String) {
        self.state.notes = notes;
        self.persist(StateKey::Notes).await;
    }

    pub async fn set_todos(&mut self, todos: Vec<TodoItem>) {
        self.state.todos = todos;
        self.persist(StateKey::Todos).await;
    }

    /// Replace one logical key from raw JSON, validating it like the typed setters do.
    /// Widget maps are merged into the current ones, so a partial map leaves the other
    /// widgets untouched.
    pub async fn replace(&mut self, key: StateKey, value: Value) -> Result<(), ServiceError> {
        match key {
            StateKey::WidgetsEnabled => {
                let patch: BTreeMap<WidgetId, bool> = strict(key, value)?;
                self.state.widgets_enabled.extend(patch.iter().map(|(w, e)| (*w, *e)));
                self.persist(key).await;
                let mut hidden = false;
                for (widget, enabled) in patch {
                    if !enabled && self.state.widget_visibility.insert(widget, false) != Some(false) {
                        hidden = true;
                    }
                }
                if hidden {
                    self.persist(StateKey::WidgetVisibility).await;
                }
            }
            StateKey::WidgetVisibility => {
                let patch: BTreeMap<WidgetId, bool> = strict(key, value)?;
                if let Some((widget, _)) = patch.iter().find(|(w, visible)| **visible && !self.is_enabled(**w)) {
                    return Err(disabled(*widget));
                }
                self.state.widget_visibility.extend(patch);
                self.persist(key).await;
            }
            StateKey::WidgetPositions => {
                let patch: BTreeMap<WidgetId, Position> = strict(key, value)?;
                self.state.widget_positions.extend(patch);
                self.persist(key).await;
            }
            StateKey::CurrentSpace => self.select_space(&strict::<String>(key, value)?).await?,
            StateKey::Settings => self.update_settings(strict(key, value)?).await?,
            StateKey::TodoistConfig => self.set_todoist_config(strict(key, value)?).await,
            StateKey::MusicState => self.set_music_state(strict(key, value)?).await,
            StateKey::CustomSpaces => self.set_custom_spaces(strict(key, value)?).await,
            StateKey::CustomStreams => self.set_custom_streams(strict(key, value)?).await,
            StateKey::Notes => self.set_notes(strict(key, value)?).await,
            StateKey::Todos => self.set_todos(strict(key, value)?).await,
        }
        Ok(())
    }
}

fn disabled(widget: WidgetId) -> ServiceError {
    ServiceError::Validation(format!("widget {widget:?} is disabled"))
}

fn to_value<T: Serialize>(v: &T) -> Option<Value> {
    serde_json::to_value(v).map_err(|e| warn!(error = %e, "state value not serializable")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalAdapter, LocalKv, PreferenceStore, StorageKind};
    use serde_json::json;

    async fn local_facade(path: &std::path::Path) -> anyhow::Result<Arc<Persistence>> {
        let kv = LocalKv::new(path).await?;
        let local = Arc::new(LocalAdapter::new(kv.clone(), "focusdash"));
        Ok(Arc::new(Persistence::local(local, PreferenceStore::new(kv))))
    }

    fn tmp() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("dashboard_{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn fresh_store_loads_defaults_without_writing() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        let dash = Dashboard::load(facade.clone()).await;

        assert_eq!(facade.get_type(), StorageKind::Local);
        assert_eq!(dash.state(), &DashboardState::default());
        for key in StateKey::ALL {
            assert_eq!(facade.get(key.as_str()).await, None, "{key} should not be written on load");
        }
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn settings_write_survives_reload() -> anyhow::Result<()> {
        let path = tmp();
        let mut dash = Dashboard::load(local_facade(&path).await?).await;
        let settings = Settings { opacity: 0.4, ..Settings::default() };
        dash.update_settings(settings.clone()).await?;

        let reopened = Dashboard::load(local_facade(&path).await?).await;
        assert_eq!(reopened.state().settings, settings);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn mutation_writes_only_its_own_key() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        let mut dash = Dashboard::load(facade.clone()).await;
        dash.move_widget(WidgetId::Notes, Position { x: 5, y: 6 }).await;

        let stored = facade.get("widget-positions").await.unwrap();
        assert_eq!(stored["notes"], json!({"x": 5, "y": 6}));
        assert_eq!(facade.get("widgets").await, None);
        assert_eq!(facade.get("settings").await, None);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_and_partial_values_fall_back_to_defaults() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        facade.set("music-state", json!("not an object")).await;
        facade.set("widgets", json!({"music": true})).await;
        facade.set("settings", json!({"workHours": {"start": 20, "end": 8}})).await;

        let dash = Dashboard::load(facade).await;
        assert_eq!(dash.state().music, MusicState::default());
        assert!(dash.state().widget_visibility[&WidgetId::Music]);
        assert!(dash.state().widget_visibility[&WidgetId::Pomodoro]);
        assert_eq!(dash.state().settings, Settings::default());
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn replace_validates_before_persisting() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        let mut dash = Dashboard::load(facade.clone()).await;

        let err = dash.replace(StateKey::Settings, json!({"opacity": "high"})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(facade.get("settings").await, None);

        dash.replace(StateKey::Todos, json!([{"id": "1", "text": "write report"}])).await?;
        assert!(!dash.state().todos[0].completed);
        assert_eq!(facade.get("todos").await, Some(json!([{"id": "1", "text": "write report", "completed": false}])));

        dash.replace(StateKey::MusicState, json!({"playing": true, "volume": 300})).await.unwrap_err();
        dash.set_music_state(MusicState { playing: true, volume: 200, stream_id: None }).await;
        assert_eq!(dash.state().music.volume, 100);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn disabling_a_widget_hides_it() -> anyhow::Result<()> {
        let path = tmp();
        let mut dash = Dashboard::load(local_facade(&path).await?).await;
        dash.set_widget_enabled(WidgetId::Todo, false).await;
        assert!(!dash.state().widget_visibility[&WidgetId::Todo]);
        assert!(dash.set_widget_visible(WidgetId::Todo, true).await.is_err());
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn replace_cannot_show_a_disabled_widget() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        let mut dash = Dashboard::load(facade.clone()).await;
        dash.set_widget_enabled(WidgetId::Pomodoro, false).await;
        let stored = facade.get("widgets").await;

        let err = dash.replace(StateKey::WidgetVisibility, json!({"pomodoro": true})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(!dash.state().widget_visibility[&WidgetId::Pomodoro]);
        assert_eq!(facade.get("widgets").await, stored);

        dash.replace(StateKey::WidgetVisibility, json!({"notes": true})).await?;
        assert!(dash.state().widget_visibility[&WidgetId::Notes]);
        assert!(dash.state().widget_visibility[&WidgetId::Todo]);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn replace_merges_partial_widget_maps() -> anyhow::Result<()> {
        let path = tmp();
        let mut dash = Dashboard::load(local_facade(&path).await?).await;

        dash.replace(StateKey::WidgetsEnabled, json!({"music": true})).await?;
        assert!(dash.state().widgets_enabled[&WidgetId::Pomodoro]);
        dash.set_widget_visible(WidgetId::Pomodoro, true).await?;

        dash.replace(StateKey::WidgetPositions, json!({"notes": {"x": 1, "y": 2}})).await?;
        assert_eq!(dash.state().widget_positions[&WidgetId::Notes], Position { x: 1, y: 2 });
        assert_eq!(
            dash.state().widget_positions[&WidgetId::Todo],
            DashboardState::default().widget_positions[&WidgetId::Todo]
        );
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn disabling_through_replace_hides_the_widget() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        let mut dash = Dashboard::load(facade.clone()).await;

        dash.replace(StateKey::WidgetsEnabled, json!({"todo": false})).await?;
        assert!(!dash.state().widget_visibility[&WidgetId::Todo]);
        let stored = facade.get("widgets").await.unwrap();
        assert_eq!(stored["todo"], json!(false));
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn stored_disabled_widget_loads_hidden() -> anyhow::Result<()> {
        let path = tmp();
        let facade = local_facade(&path).await?;
        facade.set("widgets-enabled", json!({"music": false})).await;
        facade.set("widgets", json!({"music": true})).await;

        let dash = Dashboard::load(facade).await;
        assert!(!dash.state().widget_visibility[&WidgetId::Music]);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }
}
