/// Notification messages for game changes and the dispatcher they go through.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::NotificationConfig;
use crate::error::FetchError;
use crate::fetch::http;
use crate::model::{GameRef, LiveGameSnapshot};
use crate::tracker::StateChange;

const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub topic:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body:    Option<String>,
    pub data:    HashMap<String, String>,
}

/// Data-only message carrying the wire form, on the sport path topic.
pub fn game_changed_message(snapshot: &LiveGameSnapshot) -> Message {
    Message {
        topic:   snapshot.sport.clone(),
        subject: None,
        body:    None,
        data:    snapshot.encode(),
    }
}

/// User-visible start/end notification.
pub fn state_change_message(
    snapshot: &LiveGameSnapshot,
    game: &GameRef,
    change: StateChange,
    team_name: &str,
    templates: &NotificationConfig,
) -> Message {
    let (home, away) = if game.is_home {
        (team_name, game.opponent_name.as_str())
    } else {
        (game.opponent_name.as_str(), team_name)
    };
    let fill = |template: &str| {
        template
            .replace("{home_score}", &snapshot.home_score.to_string())
            .replace("{away_score}", &snapshot.visiting_score.to_string())
            .replace("{home}", home)
            .replace("{away}", away)
    };

    let subject = fill(templates.message("game_title_format"));
    let body = match change {
        StateChange::Started => templates.message("game_started_msg").to_string(),
        StateChange::Finished => format!(
            "{} {}",
            templates.message("game_ended_msg"),
            fill(templates.message("game_ended_score_format"))
        ),
    };

    let mut data = HashMap::new();
    data.insert("GameId".to_string(), snapshot.game_id.clone());
    data.insert("Path".to_string(), snapshot.sport.clone());
    data.insert("click_action".to_string(), CLICK_ACTION.to_string());

    Message {
        topic: format!("athletics.{}.notification.{}", snapshot.sport, change.as_str()),
        subject: Some(subject),
        body: Some(body),
        data,
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, message: &Message) -> Result<(), FetchError>;
}

// ── HTTP dispatcher ───────────────────────────────────────────────────────────

pub struct HttpDispatcher {
    client:  reqwest::Client,
    url:     String,
    api_key: String,
}

impl HttpDispatcher {
    pub fn new(host: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client:  http::build_client(timeout)?,
            url:     format!("{}/notifications/api/int/message", host.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for HttpDispatcher {
    async fn dispatch(&self, message: &Message) -> Result<(), FetchError> {
        let resp = self
            .client
            .post(&self.url)
            .header("INTERNAL-API-KEY", &self.api_key)
            .json(message)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Network(format!(
                "notification http_{status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        debug!("Notification sent to {}", message.topic);
        Ok(())
    }
}

/// Keeps messages in memory instead of sending them. Used in dry runs and tests.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Message>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, message: &Message) -> Result<(), FetchError> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourcePriorityConfig;
    use crate::model::{CustomData, Phase};

    fn snapshot() -> LiveGameSnapshot {
        LiveGameSnapshot {
            game_id:        "88".to_string(),
            sport:          "football".to_string(),
            has_started:    true,
            is_complete:    true,
            phase:          Phase::Final,
            clock_seconds:  -1,
            period:         4,
            home_score:     24,
            visiting_score: 10,
            custom:         CustomData::None,
        }
    }

    fn game(home: bool) -> GameRef {
        GameRef {
            game_id:         "88".to_string(),
            sport:           "football".to_string(),
            scheduled_start: None,
            is_home:         home,
            opponent_name:   "Northwestern".to_string(),
        }
    }

    #[test]
    fn test_end_message_for_home_game() {
        let cfg = SourcePriorityConfig::default();
        let msg = state_change_message(&snapshot(), &game(true), StateChange::Finished, "Illinois", &cfg.notification_config);
        assert_eq!(msg.topic, "athletics.football.notification.end");
        assert_eq!(msg.subject.as_deref(), Some("Illinois vs Northwestern"));
        assert_eq!(msg.body.as_deref(), Some("The Game had ended. Score Illinois 24 : Northwestern 10"));
        assert_eq!(msg.data["click_action"], "FLUTTER_NOTIFICATION_CLICK");
        assert_eq!(msg.data["GameId"], "88");
        assert_eq!(msg.data["Path"], "football");
    }

    #[test]
    fn test_start_message_for_away_game() {
        let cfg = SourcePriorityConfig::default();
        let msg = state_change_message(&snapshot(), &game(false), StateChange::Started, "Illinois", &cfg.notification_config);
        assert_eq!(msg.topic, "athletics.football.notification.start");
        assert_eq!(msg.subject.as_deref(), Some("Northwestern vs Illinois"));
        assert_eq!(msg.body.as_deref(), Some("The Game has started"));
    }

    #[test]
    fn test_game_changed_is_data_only() {
        let msg = game_changed_message(&snapshot());
        assert_eq!(msg.topic, "football");
        assert!(msg.subject.is_none());
        assert_eq!(msg.data["HomeScore"], "24");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("subject").is_none());
    }
}
