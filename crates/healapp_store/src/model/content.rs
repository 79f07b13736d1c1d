//! Editorial content: blog categories, posts and sections, and customer questions.

use super::account::UserId;
use super::{db_enum, limit_chars, read_enum, read_flag, require_range, require_text, ValidationError};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{Local, NaiveDateTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type CategoryId = i64;
pub type CategoryQuestionId = i64;
pub type BlogPostId = i64;
pub type BlogSectionId = i64;
pub type QuestionId = i64;

db_enum! {
    /// Review state of a blog post. Only `Confirmed` posts are public.
    BlogPostStatus {
        Draft => "DRAFT",
        Processing => "PROCESSING",
        Confirmed => "CONFIRMED",
        Canceled => "CANCELED",
    }
}

db_enum! {
    QuestionStatus {
        Processing => "PROCESSING",
        Confirmed => "CONFIRMED",
        Canceled => "CANCELED",
        Answered => "ANSWERED",
    }
}

/// Blog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            is_active: true,
            created_at: Local::now().naive_local(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        let chars = self.name.trim().chars().count() as i64;
        require_range("name.length", chars, 3, 100)?;
        limit_chars("description", self.description.as_deref(), 500)
    }
}

entity_fields! {
    CategoryField {
        Id => "category_id",
        Name => "name",
        IsActive => "is_active",
        CreatedAt => "created_at",
    }
}

impl Entity for Category {
    type Field = CategoryField;
    const NAME: &'static str = "category";
    const TABLE: &'static str = "categories";
    const PRIMARY_KEY: &'static str = "category_id";
    const COLUMNS: &'static [&'static str] =
        &["category_id", "name", "description", "is_active", "created_at"];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("category_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            is_active: read_flag(row, Self::TABLE, "is_active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Topic a customer files a question under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryQuestion {
    pub id: CategoryQuestionId,
    pub name: String,
    pub description: Option<String>,
}

impl CategoryQuestion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        limit_chars("name", Some(&self.name), 100)
    }
}

entity_fields! {
    CategoryQuestionField {
        Id => "category_question_id",
        Name => "name",
    }
}

impl Entity for CategoryQuestion {
    type Field = CategoryQuestionField;
    const NAME: &'static str = "question category";
    const TABLE: &'static str = "category_questions";
    const PRIMARY_KEY: &'static str = "category_question_id";
    const COLUMNS: &'static [&'static str] = &["category_question_id", "name", "description"];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("category_question_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title: String,
    pub content: String,
    pub thumbnail_image: Option<String>,
    pub category_id: CategoryId,
    pub author_id: UserId,
    pub status: BlogPostStatus,
    pub reviewer_id: Option<UserId>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub rejection_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl BlogPost {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category_id: CategoryId,
        author_id: UserId,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            content: content.into(),
            thumbnail_image: None,
            category_id,
            author_id,
            status: BlogPostStatus::Processing,
            reviewer_id: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}

entity_fields! {
    BlogPostField {
        Id => "post_id",
        Title => "title",
        Content => "content",
        CategoryId => "category_id",
        /// Name of the post's category.
        CategoryName => "(SELECT c.name FROM categories c WHERE c.category_id = blog_posts.category_id)",
        AuthorId => "author_id",
        Status => "status",
        ReviewerId => "reviewer_id",
        ReviewedAt => "reviewed_at",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

impl Entity for BlogPost {
    type Field = BlogPostField;
    const NAME: &'static str = "blog post";
    const TABLE: &'static str = "blog_posts";
    const PRIMARY_KEY: &'static str = "post_id";
    const COLUMNS: &'static [&'static str] = &[
        "post_id",
        "title",
        "content",
        "thumbnail_image",
        "category_id",
        "author_id",
        "status",
        "reviewer_id",
        "reviewed_at",
        "rejection_reason",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("post_id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            thumbnail_image: row.get("thumbnail_image")?,
            category_id: row.get("category_id")?,
            author_id: row.get("author_id")?,
            status: read_enum(row, Self::TABLE, "status")?,
            reviewer_id: row.get("reviewer_id")?,
            reviewed_at: row.get("reviewed_at")?,
            rejection_reason: row.get("rejection_reason")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Ordered body block of a blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogSection {
    pub id: BlogSectionId,
    pub post_id: BlogPostId,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub display_order: i64,
}

impl BlogSection {
    pub fn new(post_id: BlogPostId, display_order: i64) -> Self {
        Self {
            id: 0,
            post_id,
            title: None,
            content: None,
            image: None,
            display_order,
        }
    }
}

entity_fields! {
    BlogSectionField {
        Id => "section_id",
        PostId => "post_id",
        DisplayOrder => "display_order",
    }
}

impl Entity for BlogSection {
    type Field = BlogSectionField;
    const NAME: &'static str = "blog section";
    const TABLE: &'static str = "blog_sections";
    const PRIMARY_KEY: &'static str = "section_id";
    const COLUMNS: &'static [&'static str] = &[
        "section_id",
        "post_id",
        "section_title",
        "section_content",
        "section_image",
        "display_order",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("section_id")?,
            post_id: row.get("post_id")?,
            title: row.get("section_title")?,
            content: row.get("section_content")?,
            image: row.get("section_image")?,
            display_order: row.get("display_order")?,
        })
    }
}

/// Customer question, answered by a consultant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub customer_id: UserId,
    pub category_question_id: CategoryQuestionId,
    pub content: String,
    pub answer: Option<String>,
    pub status: QuestionStatus,
    pub updater_id: Option<UserId>,
    pub replier_id: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl Question {
    pub fn new(
        customer_id: UserId,
        category_question_id: CategoryQuestionId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            customer_id,
            category_question_id,
            content: content.into(),
            answer: None,
            status: QuestionStatus::Processing,
            updater_id: None,
            replier_id: None,
            rejection_reason: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content)
    }
}

entity_fields! {
    QuestionField {
        Id => "question_id",
        CustomerId => "customer_id",
        CategoryQuestionId => "category_question_id",
        Content => "content",
        Answer => "answer",
        Status => "status",
        ReplierId => "replier_id",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

impl Entity for Question {
    type Field = QuestionField;
    const NAME: &'static str = "question";
    const TABLE: &'static str = "questions";
    const PRIMARY_KEY: &'static str = "question_id";
    const COLUMNS: &'static [&'static str] = &[
        "question_id",
        "customer_id",
        "category_question_id",
        "content",
        "answer",
        "status",
        "updater_id",
        "replier_id",
        "rejection_reason",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("question_id")?,
            customer_id: row.get("customer_id")?,
            category_question_id: row.get("category_question_id")?,
            content: row.get("content")?,
            answer: row.get("answer")?,
            status: read_enum(row, Self::TABLE, "status")?,
            updater_id: row.get("updater_id")?,
            replier_id: row.get("replier_id")?,
            rejection_reason: row.get("rejection_reason")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}
