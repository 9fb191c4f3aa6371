//! The in-memory aggregate of everything the viewer displays.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::host::{HostPayload, ThemeColors};

/// Glyph shown for any absent field.
pub const PLACEHOLDER: &str = "—";

/// Where the current snapshot came from. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Telegram,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserInfo {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub auth_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatInfo {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppInfo {
    pub platform: Option<String>,
    pub version: Option<String>,
    pub color_scheme: Option<String>,
    pub viewport_height: Option<f64>,
    pub viewport_stable_height: Option<f64>,
    pub is_expanded: Option<bool>,
    pub header_color: Option<String>,
    pub background_color: Option<String>,
}

/// Five independently optional parts. `raw` is the host's unprocessed
/// payload kept verbatim for the diagnostics dump and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Snapshot {
    pub user: Option<UserInfo>,
    pub chat: Option<ChatInfo>,
    pub theme: Option<ThemeColors>,
    pub app: Option<AppInfo>,
    pub raw: Option<Value>,
}

impl Snapshot {
    pub fn from_host(payload: &HostPayload) -> Self {
        let init = &payload.init_data_unsafe;

        let user = init.user.as_ref().map(|user| UserInfo {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            language_code: user.language_code.clone(),
            auth_date: init.auth_date,
        });

        let chat = init.chat.as_ref().map(|chat| ChatInfo {
            id: chat.id,
            kind: chat.kind.clone(),
            title: chat.title.clone(),
            username: chat.username.clone(),
        });

        let app = AppInfo {
            platform: payload.platform.clone(),
            version: payload.version.clone(),
            color_scheme: payload.color_scheme.clone(),
            viewport_height: payload.viewport_height,
            viewport_stable_height: payload.viewport_stable_height,
            is_expanded: payload.is_expanded,
            header_color: payload.header_color.clone(),
            background_color: payload.background_color.clone(),
        };

        let raw = json!({
            "initData": payload.init_data,
            "initDataUnsafe": init,
            "themeParams": payload.theme_params,
            "platform": payload.platform,
        });

        Self {
            user,
            chat,
            theme: Some(payload.theme_params.clone()),
            app: Some(app),
            raw: Some(raw),
        }
    }

    /// Static fallback fixture. Deterministic: no host reads, no randomness.
    pub fn demo() -> Self {
        Self {
            user: Some(UserInfo {
                id: Some(123_456_789),
                first_name: Some("Демо".to_string()),
                last_name: Some("Пользователь".to_string()),
                username: Some("demo_user".to_string()),
                language_code: Some("ru".to_string()),
                auth_date: None,
            }),
            chat: Some(ChatInfo {
                id: Some(-1_001_234_567_890),
                kind: Some("group".to_string()),
                title: Some("Демо чат".to_string()),
                username: Some("demo_chat".to_string()),
            }),
            theme: Some(ThemeColors {
                bg_color: Some("#18222d".to_string()),
                text_color: Some("#ffffff".to_string()),
                hint_color: Some("#999999".to_string()),
                link_color: Some("#8774e1".to_string()),
                button_color: Some("#8774e1".to_string()),
                button_text_color: Some("#ffffff".to_string()),
            }),
            app: Some(AppInfo {
                platform: Some("tdesktop".to_string()),
                version: Some("7.0".to_string()),
                color_scheme: Some("dark".to_string()),
                viewport_height: Some(640.0),
                viewport_stable_height: Some(640.0),
                is_expanded: Some(true),
                header_color: None,
                background_color: None,
            }),
            raw: Some(json!({
                "demo": true,
                "message": "Это демо данные. Запустите через Telegram для реальных данных.",
            })),
        }
    }

    /// The cheap periodic refresh: touches only the two viewport numbers,
    /// everything else stays untouched.
    pub fn refresh_volatile(&mut self, height: Option<f64>, stable_height: Option<f64>) {
        let app = self.app.get_or_insert_with(AppInfo::default);
        app.viewport_height = height;
        app.viewport_stable_height = stable_height;
    }

    /// Targeted refresh for host theme-change events.
    pub fn refresh_theme(&mut self, theme: ThemeColors) {
        self.theme = Some(theme);
    }
}

// Display helpers. Falsy values (zero, empty string) collapse to the
// placeholder, so a real 0 is indistinguishable from "unknown" in the UI.
// Known display ambiguity, kept deliberately.

pub fn display_text(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn display_int(value: Option<i64>) -> String {
    match value {
        Some(number) if number != 0 => number.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn display_number(value: Option<f64>) -> String {
    match value {
        Some(number) if number != 0.0 => {
            if number.fract() == 0.0 {
                format!("{}", number as i64)
            } else {
                number.to_string()
            }
        }
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn display_username(value: Option<&str>) -> String {
    match value {
        Some(name) if !name.is_empty() => format!("@{name}"),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn display_auth_date(value: Option<i64>) -> String {
    value
        .filter(|seconds| *seconds != 0)
        .and_then(|seconds| chrono::DateTime::from_timestamp(seconds, 0))
        .map(|moment| {
            moment
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostChat, HostUser};

    #[test]
    fn demo_fixture_is_deterministic() {
        assert_eq!(Snapshot::demo(), Snapshot::demo());
    }

    #[test]
    fn demo_fixture_matches_expected_values() {
        let snapshot = Snapshot::demo();
        let user = snapshot.user.expect("demo user should be set");
        assert_eq!(user.id, Some(123_456_789));
        assert_eq!(user.first_name.as_deref(), Some("Демо"));
        let theme = snapshot.theme.expect("demo theme should be set");
        assert_eq!(theme.bg_color.as_deref(), Some("#18222d"));
        let raw = snapshot.raw.expect("demo raw should be set");
        assert_eq!(raw["demo"], true);
    }

    #[test]
    fn refresh_volatile_touches_only_viewport_fields() {
        let mut snapshot = Snapshot::demo();
        let before = snapshot.clone();

        snapshot.refresh_volatile(Some(720.0), Some(700.0));

        let app = snapshot.app.as_ref().expect("app section should be set");
        assert_eq!(app.viewport_height, Some(720.0));
        assert_eq!(app.viewport_stable_height, Some(700.0));

        assert_eq!(snapshot.user, before.user);
        assert_eq!(snapshot.chat, before.chat);
        assert_eq!(snapshot.theme, before.theme);
        assert_eq!(snapshot.raw, before.raw);
        let before_app = before.app.expect("fixture app should be set");
        assert_eq!(app.platform, before_app.platform);
        assert_eq!(app.version, before_app.version);
        assert_eq!(app.color_scheme, before_app.color_scheme);
        assert_eq!(app.is_expanded, before_app.is_expanded);
    }

    #[test]
    fn refresh_theme_replaces_only_the_theme_section() {
        let mut snapshot = Snapshot::demo();
        let before = snapshot.clone();

        snapshot.refresh_theme(ThemeColors {
            bg_color: Some("#ffffff".to_string()),
            ..ThemeColors::default()
        });

        assert_eq!(
            snapshot
                .theme
                .as_ref()
                .and_then(|theme| theme.bg_color.as_deref()),
            Some("#ffffff")
        );
        assert_eq!(snapshot.user, before.user);
        assert_eq!(snapshot.chat, before.chat);
        assert_eq!(snapshot.app, before.app);
    }

    #[test]
    fn from_host_merges_auth_date_into_user() {
        let mut payload = HostPayload::default();
        payload.init_data_unsafe.user = Some(HostUser {
            id: Some(42),
            first_name: Some("A".to_string()),
            ..HostUser::default()
        });
        payload.init_data_unsafe.auth_date = Some(1_700_000_000);

        let snapshot = Snapshot::from_host(&payload);
        let user = snapshot.user.expect("user should be aggregated");
        assert_eq!(user.id, Some(42));
        assert_eq!(user.auth_date, Some(1_700_000_000));
        assert_eq!(user.last_name, None);
        assert_eq!(snapshot.chat, None);
    }

    #[test]
    fn from_host_keeps_raw_payload_verbatim() {
        let mut payload = HostPayload::default();
        payload.init_data = Some("query_id=abc".to_string());
        payload.platform = Some("tdesktop".to_string());
        payload.init_data_unsafe.chat = Some(HostChat {
            id: Some(-100),
            kind: Some("group".to_string()),
            ..HostChat::default()
        });

        let snapshot = Snapshot::from_host(&payload);
        let raw = snapshot.raw.expect("raw should be captured");
        assert_eq!(raw["initData"], "query_id=abc");
        assert_eq!(raw["platform"], "tdesktop");
        assert_eq!(raw["initDataUnsafe"]["chat"]["type"], "group");
        assert_eq!(raw["themeParams"]["bg_color"], Value::Null);
    }

    #[test]
    fn absent_and_falsy_values_render_the_placeholder() {
        assert_eq!(display_text(None), PLACEHOLDER);
        assert_eq!(display_text(Some("")), PLACEHOLDER);
        assert_eq!(display_text(Some("tdesktop")), "tdesktop");

        assert_eq!(display_int(None), PLACEHOLDER);
        assert_eq!(display_int(Some(0)), PLACEHOLDER);
        assert_eq!(display_int(Some(42)), "42");
        assert_eq!(display_int(Some(-1_001_234_567_890)), "-1001234567890");

        assert_eq!(display_number(None), PLACEHOLDER);
        assert_eq!(display_number(Some(0.0)), PLACEHOLDER);
        assert_eq!(display_number(Some(640.0)), "640");
        assert_eq!(display_number(Some(640.5)), "640.5");

        assert_eq!(display_auth_date(None), PLACEHOLDER);
        assert_eq!(display_auth_date(Some(0)), PLACEHOLDER);
    }

    #[test]
    fn usernames_render_with_at_prefix() {
        assert_eq!(display_username(Some("demo_user")), "@demo_user");
        assert_eq!(display_username(Some("")), PLACEHOLDER);
        assert_eq!(display_username(None), PLACEHOLDER);
    }
}
