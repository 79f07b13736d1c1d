//! Notification and reminder-preference accessors.

use super::{sqlite_accessor, Accessor, RepoResult};
use crate::model::account::UserId;
use crate::model::notification::{
    Notification, NotificationField, NotificationId, NotificationPreference,
    NotificationPreferenceField, NotificationType, PreferenceId,
};
use crate::query::{Filter, IntoValue, Sort};
use chrono::NaiveTime;
use rusqlite::params;

pub trait NotificationRepository {
    fn create(&self, notification: &Notification) -> RepoResult<NotificationId>;
    /// Notifications of a user, latest schedule first.
    fn find_by_user_newest_first(&self, user_id: UserId) -> RepoResult<Vec<Notification>>;
}

sqlite_accessor! {
    /// SQLite-backed notification accessor.
    SqliteNotificationRepository => Notification
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create(&self, notification: &Notification) -> RepoResult<NotificationId> {
        notification.validate()?;
        self.executor().insert::<Notification>(
            &[
                "user_id",
                "title",
                "content",
                "type",
                "status",
                "scheduled_at",
                "sent_at",
                "error_message",
            ],
            params![
                notification.user_id,
                notification.title,
                notification.content,
                notification.kind,
                notification.status,
                notification.scheduled_at,
                notification.sent_at,
                notification.error_message,
            ],
        )
    }

    fn find_by_user_newest_first(&self, user_id: UserId) -> RepoResult<Vec<Notification>> {
        self.find_all(
            &Filter::eq(NotificationField::UserId, user_id),
            &[Sort::desc(NotificationField::ScheduledAt)],
        )
    }
}

/// Per-user reminder settings, one row per notification type.
pub trait NotificationPreferenceRepository {
    fn create(&self, preference: &NotificationPreference) -> RepoResult<PreferenceId>;
    fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<NotificationPreference>>;
    fn find_by_user_and_type(
        &self,
        user_id: UserId,
        kind: NotificationType,
    ) -> RepoResult<Option<NotificationPreference>>;
    /// Returns the number of preferences changed.
    fn update_enabled(
        &self,
        user_id: UserId,
        kind: NotificationType,
        enabled: bool,
    ) -> RepoResult<usize>;
    /// Returns the number of preferences changed.
    fn update_remind_time(
        &self,
        user_id: UserId,
        kind: NotificationType,
        remind_time: NaiveTime,
    ) -> RepoResult<usize>;
}

sqlite_accessor! {
    /// SQLite-backed reminder-preference accessor.
    SqliteNotificationPreferenceRepository => NotificationPreference
}

fn preference_of(user_id: UserId, kind: NotificationType) -> Filter<NotificationPreferenceField> {
    Filter::eq(NotificationPreferenceField::UserId, user_id)
        .and(Filter::eq(NotificationPreferenceField::Kind, kind))
}

impl NotificationPreferenceRepository for SqliteNotificationPreferenceRepository<'_> {
    fn create(&self, preference: &NotificationPreference) -> RepoResult<PreferenceId> {
        self.executor().insert::<NotificationPreference>(
            &["user_id", "type", "remind_time", "enabled"],
            params![
                preference.user_id,
                preference.kind,
                preference.remind_time,
                preference.enabled,
            ],
        )
    }

    fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<NotificationPreference>> {
        self.find_all(
            &Filter::eq(NotificationPreferenceField::UserId, user_id),
            &[Sort::asc(NotificationPreferenceField::Kind)],
        )
    }

    fn find_by_user_and_type(
        &self,
        user_id: UserId,
        kind: NotificationType,
    ) -> RepoResult<Option<NotificationPreference>> {
        self.find_first(&preference_of(user_id, kind), &[])
    }

    fn update_enabled(
        &self,
        user_id: UserId,
        kind: NotificationType,
        enabled: bool,
    ) -> RepoResult<usize> {
        self.update_where(
            &[(NotificationPreferenceField::Enabled, enabled.into_value())],
            &preference_of(user_id, kind),
        )
    }

    fn update_remind_time(
        &self,
        user_id: UserId,
        kind: NotificationType,
        remind_time: NaiveTime,
    ) -> RepoResult<usize> {
        self.update_where(
            &[(
                NotificationPreferenceField::RemindTime,
                remind_time.into_value(),
            )],
            &preference_of(user_id, kind),
        )
    }
}
