//! Roles, user accounts and consultant profiles.
//!
//! # Invariants
//! - `username` and `email` are unique among users whose lifecycle is not `Deleted`.
//! - A user holds exactly one role.
//! - A user has at most one consultant profile.

use super::{
    db_enum, limit_chars, read_enum, read_opt_enum, require_match, require_text, Gender,
    ValidationError,
};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type RoleId = i64;
pub type UserId = i64;
pub type ConsultantProfileId = i64;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]{4,50}$").expect("invalid static regex")
});
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid static regex")
});
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9+]{10,15}$").expect("invalid static regex")
});

db_enum! {
    /// Account state. Replaces the pair of active/deleted booleans.
    UserLifecycle {
        Active => "ACTIVE",
        /// Blocked by staff; still owns its username and email.
        Disabled => "DISABLED",
        /// Soft-deleted; username and email become reusable.
        Deleted => "DELETED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// e.g. `CUSTOMER`, `CONSULTANT`, `STAFF`, `ADMIN`.
    pub name: String,
    pub description: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("role_name", &self.name)?;
        limit_chars("role_name", Some(&self.name), 50)
    }
}

entity_fields! {
    RoleField {
        Id => "role_id",
        Name => "role_name",
        Description => "description",
    }
}

impl Entity for Role {
    type Field = RoleField;
    const NAME: &'static str = "role";
    const TABLE: &'static str = "roles";
    const PRIMARY_KEY: &'static str = "role_id";
    const COLUMNS: &'static [&'static str] = &["role_id", "role_name", "description"];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("role_id")?,
            name: row.get("role_name")?,
            description: row.get("description")?,
        })
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub birth_day: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: String,
    pub username: String,
    /// Opaque credential hash; never interpreted here.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub lifecycle: UserLifecycle,
    pub role_id: RoleId,
    pub created_date: NaiveDateTime,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        full_name: impl Into<String>,
        password_hash: impl Into<String>,
        role_id: RoleId,
    ) -> Self {
        Self {
            id: 0,
            full_name: full_name.into(),
            birth_day: None,
            gender: None,
            phone: None,
            email: email.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            avatar: None,
            lifecycle: UserLifecycle::Active,
            role_id,
            created_date: Local::now().naive_local(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_match(
            "username",
            &self.username,
            &USERNAME_PATTERN,
            "4-50 letters, digits, `.`, `_` or `-`",
        )?;
        require_match("email", &self.email, &EMAIL_PATTERN, "an email address")?;
        require_text("full_name", &self.full_name)?;
        limit_chars("full_name", Some(&self.full_name), 100)?;
        require_text("password_hash", &self.password_hash)?;
        if let Some(phone) = self.phone.as_deref() {
            require_match("phone", phone, &PHONE_PATTERN, "10-15 digits or `+`")?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == UserLifecycle::Active
    }
}

entity_fields! {
    UserField {
        Id => "user_id",
        FullName => "full_name",
        BirthDay => "birth_day",
        Gender => "gender",
        Phone => "phone",
        Email => "email",
        Username => "username",
        Lifecycle => "lifecycle",
        RoleId => "role_id",
        /// Name of the user's role.
        RoleName => "(SELECT r.role_name FROM roles r WHERE r.role_id = users.role_id)",
        CreatedDate => "created_date",
    }
}

impl Entity for User {
    type Field = UserField;
    const NAME: &'static str = "user";
    const TABLE: &'static str = "users";
    const PRIMARY_KEY: &'static str = "user_id";
    const COLUMNS: &'static [&'static str] = &[
        "user_id",
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
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("user_id")?,
            full_name: row.get("full_name")?,
            birth_day: row.get("birth_day")?,
            gender: read_opt_enum(row, Self::TABLE, "gender")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            username: row.get("username")?,
            password_hash: row.get("password_hash")?,
            avatar: row.get("avatar")?,
            lifecycle: read_enum(row, Self::TABLE, "lifecycle")?,
            role_id: row.get("role_id")?,
            created_date: row.get("created_date")?,
        })
    }
}

/// Professional details of a user holding the consultant role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultantProfile {
    pub id: ConsultantProfileId,
    pub user_id: UserId,
    pub qualifications: Option<String>,
    pub experience: Option<String>,
    pub bio: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl ConsultantProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: 0,
            user_id,
            qualifications: None,
            experience: None,
            bio: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }
}

entity_fields! {
    ConsultantProfileField {
        Id => "profile_id",
        UserId => "user_id",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

impl Entity for ConsultantProfile {
    type Field = ConsultantProfileField;
    const NAME: &'static str = "consultant profile";
    const TABLE: &'static str = "consultant_profiles";
    const PRIMARY_KEY: &'static str = "profile_id";
    const COLUMNS: &'static [&'static str] = &[
        "profile_id",
        "user_id",
        "qualifications",
        "experience",
        "bio",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("profile_id")?,
            user_id: row.get("user_id")?,
            qualifications: row.get("qualifications")?,
            experience: row.get("experience")?,
            bio: row.get("bio")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}
