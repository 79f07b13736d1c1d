//! Per-entity store accessors.
//!
//! # Responsibility
//! - Define one accessor contract per entity, named after the lookups callers need.
//! - Implement every contract over SQLite through the shared [`Accessor`] operations.
//!
//! # Invariants
//! - Accessors refuse connections whose schema is not fully migrated.
//! - Each accessor reads and writes exactly one table.
//! - Lookups return `Option`/`Vec`/`Page`; absence is never an error.
//! - Writes validate their record before any SQL runs.

mod account_repo;
mod content_repo;
mod cycle_repo;
mod engagement_repo;
mod error;
mod notification_repo;
mod rating_repo;
mod sti_repo;

pub use account_repo::{
    ConsultantProfileRepository, RoleRepository, SqliteConsultantProfileRepository,
    SqliteRoleRepository, SqliteUserRepository, UserRepository,
};
pub use content_repo::{
    BlogPostRepository, BlogSectionRepository, CategoryQuestionRepository, CategoryRepository,
    QuestionRepository, SqliteBlogPostRepository, SqliteBlogSectionRepository,
    SqliteCategoryQuestionRepository, SqliteCategoryRepository, SqliteQuestionRepository,
};
pub use cycle_repo::{
    ControlPillsRepository, MenstrualCycleRepository, PillLogRepository,
    PregnancyProbLogRepository, SqliteControlPillsRepository, SqliteMenstrualCycleRepository,
    SqlitePillLogRepository, SqlitePregnancyProbLogRepository,
};
pub use engagement_repo::{
    ConsultationRepository, PaymentCardRepository, PaymentRepository,
    SqliteConsultationRepository, SqlitePaymentCardRepository, SqlitePaymentRepository,
};
pub use error::{RepoError, RepoResult};
pub use notification_repo::{
    NotificationPreferenceRepository, NotificationRepository,
    SqliteNotificationPreferenceRepository, SqliteNotificationRepository,
};
pub use rating_repo::{
    RatingRepository, RatingSummaryRepository, SqliteRatingRepository,
    SqliteRatingSummaryRepository,
};
pub use sti_repo::{
    PackageServiceRepository, ServiceTestComponentRepository, SqlitePackageServiceRepository,
    SqliteServiceTestComponentRepository, SqliteStiPackageRepository,
    SqliteStiServiceRepository, SqliteStiTestRepository, SqliteTestResultRepository,
    SqliteTestServiceConsultantNoteRepository, StiPackageRepository, StiServiceRepository,
    StiTestRepository, TestResultRepository, TestServiceConsultantNoteRepository,
};

use crate::db::migrations::{current_version, latest_version};
use crate::query::{Entity, Executor, Field, Filter, Page, PageRequest, Sort};
use rusqlite::types::Value;
use rusqlite::Connection;

/// Generic operations every entity accessor provides.
///
/// Named lookups on the per-entity traits are compositions of these.
pub trait Accessor {
    type Field: Field;
    type Entity: Entity<Field = Self::Field>;

    fn executor(&self) -> &Executor<'_>;

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Self::Entity>> {
        self.executor().find_by_id::<Self::Entity>(id)
    }

    /// Like [`Accessor::find_by_id`], but a missing row is `NotFound`.
    fn get(&self, id: i64) -> RepoResult<Self::Entity> {
        self.find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: <Self::Entity as Entity>::NAME,
            id,
        })
    }

    fn find_first(
        &self,
        filter: &Filter<Self::Field>,
        sort: &[Sort<Self::Field>],
    ) -> RepoResult<Option<Self::Entity>> {
        self.executor().find_first::<Self::Entity>(filter, sort)
    }

    fn find_all(
        &self,
        filter: &Filter<Self::Field>,
        sort: &[Sort<Self::Field>],
    ) -> RepoResult<Vec<Self::Entity>> {
        self.executor().find_all::<Self::Entity>(filter, sort)
    }

    fn find_page(
        &self,
        filter: &Filter<Self::Field>,
        request: &PageRequest<Self::Field>,
    ) -> RepoResult<Page<Self::Entity>> {
        self.executor().find_page::<Self::Entity>(filter, request)
    }

    fn exists(&self, filter: &Filter<Self::Field>) -> RepoResult<bool> {
        self.executor().exists::<Self::Entity>(filter)
    }

    fn count(&self, filter: &Filter<Self::Field>) -> RepoResult<u64> {
        self.executor().count::<Self::Entity>(filter)
    }

    fn update_where(
        &self,
        assignments: &[(Self::Field, Value)],
        filter: &Filter<Self::Field>,
    ) -> RepoResult<usize> {
        self.executor()
            .update_where::<Self::Entity>(assignments, filter)
    }

    fn delete_where(&self, filter: &Filter<Self::Field>) -> RepoResult<usize> {
        self.executor().delete_where::<Self::Entity>(filter)
    }

    /// Returns whether a row was deleted.
    fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        self.executor().delete_by_id::<Self::Entity>(id)
    }
}

/// Declares `Sqlite<Entity>Repository` with its constructors and [`Accessor`] impl.
macro_rules! sqlite_accessor {
    ($(#[$meta:meta])* $name:ident => $entity:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<'conn> {
            exec: $crate::query::Executor<'conn>,
        }

        impl<'conn> $name<'conn> {
            /// Builds the accessor on a migrated connection with default query limits.
            pub fn try_new(conn: &'conn rusqlite::Connection) -> $crate::repo::RepoResult<Self> {
                Self::with_limits(conn, $crate::config::QueryLimits::default())
            }

            /// Builds the accessor on a migrated connection with explicit query limits.
            pub fn with_limits(
                conn: &'conn rusqlite::Connection,
                limits: $crate::config::QueryLimits,
            ) -> $crate::repo::RepoResult<Self> {
                $crate::repo::ensure_ready::<$entity>(conn)?;
                Ok(Self {
                    exec: $crate::query::Executor::new(conn, limits),
                })
            }
        }

        impl $crate::repo::Accessor for $name<'_> {
            type Field = <$entity as $crate::query::Entity>::Field;
            type Entity = $entity;

            fn executor(&self) -> &$crate::query::Executor<'_> {
                &self.exec
            }
        }
    };
}

pub(crate) use sqlite_accessor;

/// Zero affected rows on a by-id mutation becomes `NotFound`.
pub(crate) fn expect_one<E: Entity>(changed: usize, id: i64) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: E::NAME,
            id,
        });
    }
    Ok(())
}

pub(crate) fn ensure_ready<E: Entity>(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, E::TABLE)? {
        return Err(RepoError::MissingRequiredTable(E::TABLE));
    }

    for &column in E::COLUMNS {
        if !table_has_column(conn, E::TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: E::TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
