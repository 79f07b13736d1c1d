//! Customer ratings and per-target rating summaries.
//!
//! # Invariants
//! - A score is within `1..=5`.
//! - A user holds at most one active rating per target.
//! - A target is referenced polymorphically by `(target_type, target_id)`.

use super::account::UserId;
use super::{db_enum, read_enum, read_flag, require_range, ValidationError};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{Local, NaiveDateTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type RatingId = i64;
pub type RatingSummaryId = i64;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

db_enum! {
    /// Discriminator of [`RatingTarget`].
    RatingTargetType {
        Consultant => "CONSULTANT",
        StiService => "STI_SERVICE",
        StiPackage => "STI_PACKAGE",
    }
}

/// What a rating is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingTarget {
    /// A consultant, by user id.
    Consultant(UserId),
    StiService(i64),
    StiPackage(i64),
}

impl RatingTarget {
    pub fn new(target_type: RatingTargetType, id: i64) -> Self {
        match target_type {
            RatingTargetType::Consultant => Self::Consultant(id),
            RatingTargetType::StiService => Self::StiService(id),
            RatingTargetType::StiPackage => Self::StiPackage(id),
        }
    }

    pub fn target_type(self) -> RatingTargetType {
        match self {
            Self::Consultant(_) => RatingTargetType::Consultant,
            Self::StiService(_) => RatingTargetType::StiService,
            Self::StiPackage(_) => RatingTargetType::StiPackage,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Consultant(id) | Self::StiService(id) | Self::StiPackage(id) => id,
        }
    }
}

/// One customer's score and comment for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub target: RatingTarget,
    pub rating: i64,
    pub comment: Option<String>,
    pub staff_reply: Option<String>,
    pub replied_by: Option<UserId>,
    pub replied_at: Option<NaiveDateTime>,
    /// Consultation that made the user eligible, if any.
    pub consultation_id: Option<i64>,
    /// STI test that made the user eligible, if any.
    pub sti_test_id: Option<i64>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Rating {
    pub fn new(user_id: UserId, target: RatingTarget, rating: i64) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: 0,
            user_id,
            target,
            rating,
            comment: None,
            staff_reply: None,
            replied_by: None,
            replied_at: None,
            consultation_id: None,
            sti_test_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range("rating", self.rating, MIN_SCORE, MAX_SCORE)
    }
}

entity_fields! {
    RatingField {
        Id => "rating_id",
        UserId => "user_id",
        TargetType => "target_type",
        TargetId => "target_id",
        Score => "rating",
        Comment => "comment",
        StaffReply => "staff_reply",
        RepliedBy => "replied_by",
        ConsultationId => "consultation_id",
        StiTestId => "sti_test_id",
        IsActive => "is_active",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

impl Entity for Rating {
    type Field = RatingField;
    const NAME: &'static str = "rating";
    const TABLE: &'static str = "ratings";
    const PRIMARY_KEY: &'static str = "rating_id";
    const COLUMNS: &'static [&'static str] = &[
        "rating_id",
        "user_id",
        "target_type",
        "target_id",
        "rating",
        "comment",
        "staff_reply",
        "replied_by",
        "replied_at",
        "consultation_id",
        "sti_test_id",
        "is_active",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let target_type: RatingTargetType = read_enum(row, Self::TABLE, "target_type")?;
        Ok(Self {
            id: row.get("rating_id")?,
            user_id: row.get("user_id")?,
            target: RatingTarget::new(target_type, row.get("target_id")?),
            rating: row.get("rating")?,
            comment: row.get("comment")?,
            staff_reply: row.get("staff_reply")?,
            replied_by: row.get("replied_by")?,
            replied_at: row.get("replied_at")?,
            consultation_id: row.get("consultation_id")?,
            sti_test_id: row.get("sti_test_id")?,
            is_active: read_flag(row, Self::TABLE, "is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Cached aggregate of the active ratings of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub id: RatingSummaryId,
    pub target: RatingTarget,
    pub total_ratings: i64,
    pub average_rating: f64,
    pub five_star_count: i64,
    pub four_star_count: i64,
    pub three_star_count: i64,
    pub two_star_count: i64,
    pub one_star_count: i64,
    pub last_updated: NaiveDateTime,
}

impl RatingSummary {
    /// Builds a summary from `(score, count)` pairs.
    pub fn from_counts(target: RatingTarget, counts: &[(i64, u64)]) -> Self {
        let mut stars = [0_i64; 5];
        let mut total = 0_i64;
        let mut weighted = 0_i64;
        for (score, count) in counts {
            if (MIN_SCORE..=MAX_SCORE).contains(score) {
                let count = i64::try_from(*count).unwrap_or(i64::MAX);
                stars[(*score - 1) as usize] += count;
                total += count;
                weighted += score * count;
            }
        }
        let average_rating = if total == 0 {
            0.0
        } else {
            weighted as f64 / total as f64
        };
        Self {
            id: 0,
            target,
            total_ratings: total,
            average_rating,
            five_star_count: stars[4],
            four_star_count: stars[3],
            three_star_count: stars[2],
            two_star_count: stars[1],
            one_star_count: stars[0],
            last_updated: Local::now().naive_local(),
        }
    }
}

entity_fields! {
    RatingSummaryField {
        Id => "summary_id",
        TargetType => "target_type",
        TargetId => "target_id",
        AverageRating => "average_rating",
        TotalRatings => "total_ratings",
    }
}

impl Entity for RatingSummary {
    type Field = RatingSummaryField;
    const NAME: &'static str = "rating summary";
    const TABLE: &'static str = "rating_summaries";
    const PRIMARY_KEY: &'static str = "summary_id";
    const COLUMNS: &'static [&'static str] = &[
        "summary_id",
        "target_type",
        "target_id",
        "total_ratings",
        "average_rating",
        "five_star_count",
        "four_star_count",
        "three_star_count",
        "two_star_count",
        "one_star_count",
        "last_updated",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let target_type: RatingTargetType = read_enum(row, Self::TABLE, "target_type")?;
        Ok(Self {
            id: row.get("summary_id")?,
            target: RatingTarget::new(target_type, row.get("target_id")?),
            total_ratings: row.get("total_ratings")?,
            average_rating: row.get("average_rating")?,
            five_star_count: row.get("five_star_count")?,
            four_star_count: row.get("four_star_count")?,
            three_star_count: row.get("three_star_count")?,
            two_star_count: row.get("two_star_count")?,
            one_star_count: row.get("one_star_count")?,
            last_updated: row.get("last_updated")?,
        })
    }
}
