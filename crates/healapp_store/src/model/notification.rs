//! Scheduled reminders and per-user reminder preferences.

use super::account::UserId;
use super::{db_enum, limit_chars, read_enum, read_flag, require_text, ValidationError};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type NotificationId = i64;
pub type PreferenceId = i64;

db_enum! {
    NotificationType {
        Ovulation => "OVULATION",
        PillReminder => "PILL_REMINDER",
        PregnancyProbability => "PREGNANCY_PROBABILITY",
    }
}

db_enum! {
    NotificationStatus {
        Scheduled => "SCHEDULED",
        Sent => "SENT",
        Failed => "FAILED",
        /// Dropped because the user disabled the reminder type.
        Skipped => "SKIPPED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub content: Option<String>,
    pub kind: NotificationType,
    pub status: NotificationStatus,
    pub scheduled_at: NaiveDateTime,
    pub sent_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationType,
        title: impl Into<String>,
        scheduled_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            title: title.into(),
            content: None,
            kind,
            status: NotificationStatus::Scheduled,
            scheduled_at,
            sent_at: None,
            error_message: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        limit_chars("title", Some(&self.title), 200)
    }
}

entity_fields! {
    NotificationField {
        Id => "notification_id",
        UserId => "user_id",
        Kind => "type",
        Status => "status",
        ScheduledAt => "scheduled_at",
        SentAt => "sent_at",
    }
}

impl Entity for Notification {
    type Field = NotificationField;
    const NAME: &'static str = "notification";
    const TABLE: &'static str = "notifications";
    const PRIMARY_KEY: &'static str = "notification_id";
    const COLUMNS: &'static [&'static str] = &[
        "notification_id",
        "user_id",
        "title",
        "content",
        "type",
        "status",
        "scheduled_at",
        "sent_at",
        "error_message",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("notification_id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            kind: read_enum(row, Self::TABLE, "type")?,
            status: read_enum(row, Self::TABLE, "status")?,
            scheduled_at: row.get("scheduled_at")?,
            sent_at: row.get("sent_at")?,
            error_message: row.get("error_message")?,
        })
    }
}

/// Whether and when a user wants one kind of reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub id: PreferenceId,
    pub user_id: UserId,
    pub kind: NotificationType,
    pub remind_time: NaiveTime,
    pub enabled: bool,
}

impl NotificationPreference {
    pub fn new(user_id: UserId, kind: NotificationType, remind_time: NaiveTime) -> Self {
        Self {
            id: 0,
            user_id,
            kind,
            remind_time,
            enabled: true,
        }
    }
}

entity_fields! {
    NotificationPreferenceField {
        Id => "preference_id",
        UserId => "user_id",
        Kind => "type",
        RemindTime => "remind_time",
        Enabled => "enabled",
    }
}

impl Entity for NotificationPreference {
    type Field = NotificationPreferenceField;
    const NAME: &'static str = "notification preference";
    const TABLE: &'static str = "notification_preferences";
    const PRIMARY_KEY: &'static str = "preference_id";
    const COLUMNS: &'static [&'static str] =
        &["preference_id", "user_id", "type", "remind_time", "enabled"];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("preference_id")?,
            user_id: row.get("user_id")?,
            kind: read_enum(row, Self::TABLE, "type")?,
            remind_time: row.get("remind_time")?,
            enabled: read_flag(row, Self::TABLE, "enabled")?,
        })
    }
}
