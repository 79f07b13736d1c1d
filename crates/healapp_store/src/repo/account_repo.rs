//! Role, user and consultant-profile accessors.
//!
//! # Invariants
//! - Deleted users stay in the table; natural-key lookups skip them.
//! - Role-name lookups resolve through `roles` in the same statement.

use super::{expect_one, sqlite_accessor, Accessor, RepoResult};
use crate::model::account::{
    ConsultantProfile, ConsultantProfileField, ConsultantProfileId, Role, RoleField, RoleId, User,
    UserField, UserId, UserLifecycle,
};
use crate::query::{Filter, IntoValue, Sort};
use chrono::NaiveDate;
use rusqlite::params;

pub trait RoleRepository {
    fn create(&self, role: &Role) -> RepoResult<RoleId>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
}

sqlite_accessor! {
    /// SQLite-backed role accessor.
    SqliteRoleRepository => Role
}

impl RoleRepository for SqliteRoleRepository<'_> {
    fn create(&self, role: &Role) -> RepoResult<RoleId> {
        role.validate()?;
        self.executor().insert::<Role>(
            &["role_name", "description"],
            params![role.name, role.description],
        )
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        self.find_first(&Filter::eq(RoleField::Name, name), &[])
    }
}

/// User account lookups.
///
/// Every list is unpaged and bounded by `max_unpaged_rows`.
pub trait UserRepository {
    fn create(&self, user: &User) -> RepoResult<UserId>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn exists_by_username(&self, username: &str) -> RepoResult<bool>;
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    /// Matches `login` against either the username or the email.
    fn find_by_username_or_email(&self, login: &str) -> RepoResult<Option<User>>;
    fn find_by_role(&self, role_id: RoleId) -> RepoResult<Vec<User>>;
    fn find_by_role_name(&self, role_name: &str) -> RepoResult<Vec<User>>;
    fn find_by_role_name_and_lifecycle(
        &self,
        role_name: &str,
        lifecycle: UserLifecycle,
    ) -> RepoResult<Vec<User>>;
    /// Users of `role_name` whose full name or email contains `query`.
    fn search_by_role_name(&self, role_name: &str, query: &str) -> RepoResult<Vec<User>>;
    fn search_by_role_name_lifecycle_and_name(
        &self,
        role_name: &str,
        lifecycle: UserLifecycle,
        name: &str,
    ) -> RepoResult<Vec<User>>;
    fn find_by_lifecycle(&self, lifecycle: UserLifecycle) -> RepoResult<Vec<User>>;
    fn find_by_full_name_containing(&self, name: &str) -> RepoResult<Vec<User>>;
    /// `None` when the user is missing or has no birth day recorded.
    fn find_birth_day(&self, id: UserId) -> RepoResult<Option<NaiveDate>>;
    fn count_by_role(&self, role_id: RoleId) -> RepoResult<u64>;
    fn find_by_role_and_lifecycle(
        &self,
        role_id: RoleId,
        lifecycle: UserLifecycle,
    ) -> RepoResult<Vec<User>>;
    fn find_by_role_names(&self, role_names: &[&str]) -> RepoResult<Vec<User>>;
    fn find_by_role_name_newest_first(&self, role_name: &str) -> RepoResult<Vec<User>>;
    /// Fails with `NotFound` when no user has `id`.
    fn set_lifecycle(&self, id: UserId, lifecycle: UserLifecycle) -> RepoResult<()>;
}

/// Natural keys are only unique among users that are not `Deleted`.
fn not_deleted(filter: Filter<UserField>) -> Filter<UserField> {
    filter.and(Filter::ne(UserField::Lifecycle, UserLifecycle::Deleted))
}

sqlite_accessor! {
    /// SQLite-backed user accessor.
    SqliteUserRepository => User
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;
        self.executor().insert::<User>(
            &[
                "full_name",
                "birth_day",
                "gender",
                "phone",
                "email",
                "username",
                "password_hash",
                "avatar",
                "lifecycle",
                "role_id",
                "created_date",
            ],
            params![
                user.full_name,
                user.birth_day,
                user.gender,
                user.phone,
                user.email,
                user.username,
                user.password_hash,
                user.avatar,
                user.lifecycle,
                user.role_id,
                user.created_date,
            ],
        )
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_first(&not_deleted(Filter::eq(UserField::Username, username)), &[])
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_first(&not_deleted(Filter::eq(UserField::Email, email)), &[])
    }

    fn exists_by_username(&self, username: &str) -> RepoResult<bool> {
        self.exists(&not_deleted(Filter::eq(UserField::Username, username)))
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        self.exists(&not_deleted(Filter::eq(UserField::Email, email)))
    }

    fn find_by_username_or_email(&self, login: &str) -> RepoResult<Option<User>> {
        let filter =
            Filter::eq(UserField::Username, login).or(Filter::eq(UserField::Email, login));
        self.find_first(&not_deleted(filter), &[])
    }

    fn find_by_role(&self, role_id: RoleId) -> RepoResult<Vec<User>> {
        self.find_all(&Filter::eq(UserField::RoleId, role_id), &[])
    }

    fn find_by_role_name(&self, role_name: &str) -> RepoResult<Vec<User>> {
        self.find_all(&Filter::eq(UserField::RoleName, role_name), &[])
    }

    fn find_by_role_name_and_lifecycle(
        &self,
        role_name: &str,
        lifecycle: UserLifecycle,
    ) -> RepoResult<Vec<User>> {
        let filter = Filter::eq(UserField::RoleName, role_name)
            .and(Filter::eq(UserField::Lifecycle, lifecycle));
        self.find_all(&filter, &[])
    }

    fn search_by_role_name(&self, role_name: &str, query: &str) -> RepoResult<Vec<User>> {
        let filter = Filter::eq(UserField::RoleName, role_name).and(Filter::any_contains(
            &[UserField::FullName, UserField::Email],
            query,
        ));
        self.find_all(&filter, &[])
    }

    fn search_by_role_name_lifecycle_and_name(
        &self,
        role_name: &str,
        lifecycle: UserLifecycle,
        name: &str,
    ) -> RepoResult<Vec<User>> {
        let filter = Filter::eq(UserField::RoleName, role_name)
            .and(Filter::eq(UserField::Lifecycle, lifecycle))
            .and(Filter::contains(UserField::FullName, name));
        self.find_all(&filter, &[])
    }

    fn find_by_lifecycle(&self, lifecycle: UserLifecycle) -> RepoResult<Vec<User>> {
        self.find_all(&Filter::eq(UserField::Lifecycle, lifecycle), &[])
    }

    fn find_by_full_name_containing(&self, name: &str) -> RepoResult<Vec<User>> {
        self.find_all(&Filter::contains(UserField::FullName, name), &[])
    }

    fn find_birth_day(&self, id: UserId) -> RepoResult<Option<NaiveDate>> {
        Ok(self.find_by_id(id)?.and_then(|user| user.birth_day))
    }

    fn count_by_role(&self, role_id: RoleId) -> RepoResult<u64> {
        self.count(&Filter::eq(UserField::RoleId, role_id))
    }

    fn find_by_role_and_lifecycle(
        &self,
        role_id: RoleId,
        lifecycle: UserLifecycle,
    ) -> RepoResult<Vec<User>> {
        let filter = Filter::eq(UserField::RoleId, role_id)
            .and(Filter::eq(UserField::Lifecycle, lifecycle));
        self.find_all(&filter, &[])
    }

    fn find_by_role_names(&self, role_names: &[&str]) -> RepoResult<Vec<User>> {
        self.find_all(
            &Filter::is_in(UserField::RoleName, role_names.iter().copied()),
            &[],
        )
    }

    fn find_by_role_name_newest_first(&self, role_name: &str) -> RepoResult<Vec<User>> {
        self.find_all(
            &Filter::eq(UserField::RoleName, role_name),
            &[Sort::desc(UserField::CreatedDate)],
        )
    }

    fn set_lifecycle(&self, id: UserId, lifecycle: UserLifecycle) -> RepoResult<()> {
        let changed = self.update_where(
            &[(UserField::Lifecycle, lifecycle.into_value())],
            &Filter::eq(UserField::Id, id),
        )?;
        expect_one::<User>(changed, id)
    }
}

pub trait ConsultantProfileRepository {
    fn create(&self, profile: &ConsultantProfile) -> RepoResult<ConsultantProfileId>;
    fn find_by_user_id(&self, user_id: UserId) -> RepoResult<Option<ConsultantProfile>>;
}

sqlite_accessor! {
    /// SQLite-backed consultant-profile accessor.
    SqliteConsultantProfileRepository => ConsultantProfile
}

impl ConsultantProfileRepository for SqliteConsultantProfileRepository<'_> {
    fn create(&self, profile: &ConsultantProfile) -> RepoResult<ConsultantProfileId> {
        self.executor().insert::<ConsultantProfile>(
            &[
                "user_id",
                "qualifications",
                "experience",
                "bio",
                "created_at",
                "updated_at",
            ],
            params![
                profile.user_id,
                profile.qualifications,
                profile.experience,
                profile.bio,
                profile.created_at,
                profile.updated_at,
            ],
        )
    }

    fn find_by_user_id(&self, user_id: UserId) -> RepoResult<Option<ConsultantProfile>> {
        self.find_first(&Filter::eq(ConsultantProfileField::UserId, user_id), &[])
    }
}
