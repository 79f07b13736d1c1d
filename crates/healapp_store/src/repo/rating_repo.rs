//! Rating and rating-summary accessors.
//!
//! # Invariants
//! - Target lookups always match `(target_type, target_id)` together.
//! - "Active" means `is_active = 1`; deactivated ratings stay for audit.

use super::{sqlite_accessor, Accessor, RepoResult};
use crate::model::account::UserId;
use crate::model::rating::{
    Rating, RatingField, RatingId, RatingSummary, RatingSummaryField, RatingSummaryId,
    RatingTarget, RatingTargetType,
};
use crate::query::{Filter, Page, PageRequest, Sort};
use log::debug;
use rusqlite::params;

/// Comments shorter than this never surface as testimonials.
const TESTIMONIAL_MIN_CHARS: i64 = 10;

/// Customer ratings of consultants, services and packages.
pub trait RatingRepository {
    fn create(&self, rating: &Rating) -> RepoResult<RatingId>;
    /// Any rating, active or not, by `user_id` for `target`.
    fn exists_by_user_and_target(&self, user_id: UserId, target: RatingTarget)
        -> RepoResult<bool>;
    fn find_by_user_and_target(
        &self,
        user_id: UserId,
        target: RatingTarget,
    ) -> RepoResult<Option<Rating>>;
    /// Active ratings of `target`, newest first.
    fn find_active_for_target(&self, target: RatingTarget) -> RepoResult<Vec<Rating>>;
    fn page_active_for_target(
        &self,
        target: RatingTarget,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>>;
    /// Active ratings written by `user_id`, newest first.
    fn page_active_by_user(
        &self,
        user_id: UserId,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>>;
    /// Active ratings of `target` without a staff reply, newest first.
    fn find_pending_reply(&self, target: RatingTarget) -> RepoResult<Vec<Rating>>;
    fn page_active_for_target_with_score(
        &self,
        target: RatingTarget,
        score: i64,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>>;
    /// Active ratings of `target` whose comment or staff reply contains `keyword`.
    fn search_target_comments(
        &self,
        target: RatingTarget,
        keyword: &str,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>>;
    /// Best-scored active ratings of `target` with a substantial comment.
    fn find_top_with_comments(&self, target: RatingTarget, limit: u32)
        -> RepoResult<Vec<Rating>>;
    /// `(score, count)` over the active ratings of `target`, score ascending.
    fn count_by_score(&self, target: RatingTarget) -> RepoResult<Vec<(i64, u64)>>;
    fn exists_active_by_user_and_consultation(
        &self,
        user_id: UserId,
        consultation_id: i64,
    ) -> RepoResult<bool>;
    fn exists_active_by_user_and_sti_test(&self, user_id: UserId, sti_test_id: i64)
        -> RepoResult<bool>;
    fn exists_active_by_user_and_target(
        &self,
        user_id: UserId,
        target: RatingTarget,
    ) -> RepoResult<bool>;
    /// Staff view over every active rating, optionally narrowed by target type and score.
    fn page_active(
        &self,
        target_type: Option<RatingTargetType>,
        score: Option<i64>,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>>;
    /// Active ratings, optionally of one target type, newest first.
    fn list_active_recent(&self, target_type: Option<RatingTargetType>)
        -> RepoResult<Vec<Rating>>;
    /// Staff search over comments and staff replies of active ratings.
    fn search_comments(
        &self,
        keyword: &str,
        target_type: Option<RatingTargetType>,
        score: Option<i64>,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>>;
    /// Best-scored active ratings across all targets with a substantial comment.
    fn find_top_testimonials(&self, limit: u32) -> RepoResult<Vec<Rating>>;
}

sqlite_accessor! {
    /// SQLite-backed rating accessor.
    SqliteRatingRepository => Rating
}

fn of_target(target: RatingTarget) -> Filter<RatingField> {
    Filter::eq(RatingField::TargetType, target.target_type())
        .and(Filter::eq(RatingField::TargetId, target.id()))
}

fn active() -> Filter<RatingField> {
    Filter::eq(RatingField::IsActive, true)
}

fn active_for(target: RatingTarget) -> Filter<RatingField> {
    of_target(target).and(active())
}

fn narrowed(target_type: Option<RatingTargetType>, score: Option<i64>) -> Filter<RatingField> {
    let mut filter = active();
    if let Some(target_type) = target_type {
        filter = filter.and(Filter::eq(RatingField::TargetType, target_type));
    }
    if let Some(score) = score {
        filter = filter.and(Filter::eq(RatingField::Score, score));
    }
    filter
}

fn comment_or_reply(keyword: &str) -> Filter<RatingField> {
    Filter::any_contains(&[RatingField::Comment, RatingField::StaffReply], keyword)
}

fn has_testimonial() -> Filter<RatingField> {
    Filter::is_not_null(RatingField::Comment)
        .and(Filter::longer_than(RatingField::Comment, TESTIMONIAL_MIN_CHARS))
}

fn best_first() -> [Sort<RatingField>; 2] {
    [
        Sort::desc(RatingField::Score),
        Sort::desc(RatingField::CreatedAt),
    ]
}

fn newest() -> [Sort<RatingField>; 1] {
    [Sort::desc(RatingField::CreatedAt)]
}

impl RatingRepository for SqliteRatingRepository<'_> {
    fn create(&self, rating: &Rating) -> RepoResult<RatingId> {
        rating.validate()?;
        self.executor().insert::<Rating>(
            &[
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
            ],
            params![
                rating.user_id,
                rating.target.target_type(),
                rating.target.id(),
                rating.rating,
                rating.comment,
                rating.staff_reply,
                rating.replied_by,
                rating.replied_at,
                rating.consultation_id,
                rating.sti_test_id,
                rating.is_active,
                rating.created_at,
                rating.updated_at,
            ],
        )
    }

    fn exists_by_user_and_target(
        &self,
        user_id: UserId,
        target: RatingTarget,
    ) -> RepoResult<bool> {
        self.exists(&Filter::eq(RatingField::UserId, user_id).and(of_target(target)))
    }

    fn find_by_user_and_target(
        &self,
        user_id: UserId,
        target: RatingTarget,
    ) -> RepoResult<Option<Rating>> {
        // Prefer the active rating when deactivated ones exist too.
        self.find_first(
            &Filter::eq(RatingField::UserId, user_id).and(of_target(target)),
            &[Sort::desc(RatingField::IsActive), Sort::desc(RatingField::CreatedAt)],
        )
    }

    fn find_active_for_target(&self, target: RatingTarget) -> RepoResult<Vec<Rating>> {
        self.find_all(&active_for(target), &newest())
    }

    fn page_active_for_target(
        &self,
        target: RatingTarget,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>> {
        self.find_page(&active_for(target), request)
    }

    fn page_active_by_user(
        &self,
        user_id: UserId,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>> {
        let filter = Filter::eq(RatingField::UserId, user_id).and(active());
        self.find_page(&filter, &request.with_sort(newest().to_vec()))
    }

    fn find_pending_reply(&self, target: RatingTarget) -> RepoResult<Vec<Rating>> {
        let filter = active_for(target).and(Filter::is_null(RatingField::StaffReply));
        self.find_all(&filter, &newest())
    }

    fn page_active_for_target_with_score(
        &self,
        target: RatingTarget,
        score: i64,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>> {
        let filter = active_for(target).and(Filter::eq(RatingField::Score, score));
        self.find_page(&filter, request)
    }

    fn search_target_comments(
        &self,
        target: RatingTarget,
        keyword: &str,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>> {
        self.find_page(&active_for(target).and(comment_or_reply(keyword)), request)
    }

    fn find_top_with_comments(
        &self,
        target: RatingTarget,
        limit: u32,
    ) -> RepoResult<Vec<Rating>> {
        self.executor().find_limited::<Rating>(
            &active_for(target).and(has_testimonial()),
            &best_first(),
            limit,
        )
    }

    fn count_by_score(&self, target: RatingTarget) -> RepoResult<Vec<(i64, u64)>> {
        self.executor()
            .group_count::<Rating, i64>(RatingField::Score, &active_for(target))
    }

    fn exists_active_by_user_and_consultation(
        &self,
        user_id: UserId,
        consultation_id: i64,
    ) -> RepoResult<bool> {
        let filter = Filter::eq(RatingField::UserId, user_id)
            .and(Filter::eq(RatingField::ConsultationId, consultation_id))
            .and(active());
        self.exists(&filter)
    }

    fn exists_active_by_user_and_sti_test(
        &self,
        user_id: UserId,
        sti_test_id: i64,
    ) -> RepoResult<bool> {
        let filter = Filter::eq(RatingField::UserId, user_id)
            .and(Filter::eq(RatingField::StiTestId, sti_test_id))
            .and(active());
        self.exists(&filter)
    }

    fn exists_active_by_user_and_target(
        &self,
        user_id: UserId,
        target: RatingTarget,
    ) -> RepoResult<bool> {
        self.exists(&Filter::eq(RatingField::UserId, user_id).and(active_for(target)))
    }

    fn page_active(
        &self,
        target_type: Option<RatingTargetType>,
        score: Option<i64>,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>> {
        self.find_page(&narrowed(target_type, score), request)
    }

    fn list_active_recent(
        &self,
        target_type: Option<RatingTargetType>,
    ) -> RepoResult<Vec<Rating>> {
        self.find_all(&narrowed(target_type, None), &newest())
    }

    fn search_comments(
        &self,
        keyword: &str,
        target_type: Option<RatingTargetType>,
        score: Option<i64>,
        request: &PageRequest<RatingField>,
    ) -> RepoResult<Page<Rating>> {
        let filter = narrowed(target_type, score).and(comment_or_reply(keyword));
        self.find_page(&filter, request)
    }

    fn find_top_testimonials(&self, limit: u32) -> RepoResult<Vec<Rating>> {
        self.executor()
            .find_limited::<Rating>(&active().and(has_testimonial()), &best_first(), limit)
    }
}

/// Cached per-target aggregates.
pub trait RatingSummaryRepository {
    /// Inserts or replaces the summary of `summary.target`; returns its id.
    fn save(&self, summary: &RatingSummary) -> RepoResult<RatingSummaryId>;
    fn find_by_target(&self, target: RatingTarget) -> RepoResult<Option<RatingSummary>>;
    fn exists_by_target(&self, target: RatingTarget) -> RepoResult<bool>;
}

sqlite_accessor! {
    /// SQLite-backed rating-summary accessor.
    SqliteRatingSummaryRepository => RatingSummary
}

fn summary_of(target: RatingTarget) -> Filter<RatingSummaryField> {
    Filter::eq(RatingSummaryField::TargetType, target.target_type())
        .and(Filter::eq(RatingSummaryField::TargetId, target.id()))
}

impl RatingSummaryRepository for SqliteRatingSummaryRepository<'_> {
    fn save(&self, summary: &RatingSummary) -> RepoResult<RatingSummaryId> {
        let id: RatingSummaryId = self.executor().conn().query_row(
            "INSERT INTO rating_summaries (
                target_type,
                target_id,
                total_ratings,
                average_rating,
                five_star_count,
                four_star_count,
                three_star_count,
                two_star_count,
                one_star_count,
                last_updated
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (target_type, target_id) DO UPDATE SET
                total_ratings = excluded.total_ratings,
                average_rating = excluded.average_rating,
                five_star_count = excluded.five_star_count,
                four_star_count = excluded.four_star_count,
                three_star_count = excluded.three_star_count,
                two_star_count = excluded.two_star_count,
                one_star_count = excluded.one_star_count,
                last_updated = excluded.last_updated
            RETURNING summary_id;",
            params![
                summary.target.target_type(),
                summary.target.id(),
                summary.total_ratings,
                summary.average_rating,
                summary.five_star_count,
                summary.four_star_count,
                summary.three_star_count,
                summary.two_star_count,
                summary.one_star_count,
                summary.last_updated,
            ],
            |row| row.get(0),
        )?;
        debug!(
            "event=rating_summary_saved module=store status=ok target_type={} target_id={} total={}",
            summary.target.target_type(),
            summary.target.id(),
            summary.total_ratings
        );
        Ok(id)
    }

    fn find_by_target(&self, target: RatingTarget) -> RepoResult<Option<RatingSummary>> {
        self.find_first(&summary_of(target), &[])
    }

    fn exists_by_target(&self, target: RatingTarget) -> RepoResult<bool> {
        self.exists(&summary_of(target))
    }
}
