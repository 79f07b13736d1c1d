//! Category, blog and question accessors.
//!
//! # Responsibility
//! - Serve the blog listing and search screens, paged or bounded.
//! - Serve the question moderation queues.
//!
//! # Invariants
//! - Keyword searches are case-insensitive and OR-ed across their text fields.
//! - Paged lookups keep the caller's sort; named orders are stated per method.

use super::{sqlite_accessor, Accessor, RepoResult};
use crate::model::account::UserId;
use crate::model::content::{
    BlogPost, BlogPostField, BlogPostId, BlogPostStatus, BlogSection, BlogSectionField,
    BlogSectionId, Category, CategoryField, CategoryId, CategoryQuestion, CategoryQuestionField,
    CategoryQuestionId, Question, QuestionField, QuestionId, QuestionStatus,
};
use crate::query::{Filter, Page, PageRequest, Sort};
use chrono::NaiveDateTime;
use rusqlite::params;

pub trait CategoryRepository {
    fn create(&self, category: &Category) -> RepoResult<CategoryId>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    fn exists_by_name(&self, name: &str) -> RepoResult<bool>;
    fn find_active_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    fn find_active_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn find_all_active(&self) -> RepoResult<Vec<Category>>;
}

sqlite_accessor! {
    /// SQLite-backed blog category accessor.
    SqliteCategoryRepository => Category
}

impl SqliteCategoryRepository<'_> {
    fn active() -> Filter<CategoryField> {
        Filter::eq(CategoryField::IsActive, true)
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create(&self, category: &Category) -> RepoResult<CategoryId> {
        category.validate()?;
        self.executor().insert::<Category>(
            &["name", "description", "is_active", "created_at"],
            params![
                category.name,
                category.description,
                category.is_active,
                category.created_at,
            ],
        )
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        self.find_first(&Filter::eq(CategoryField::Name, name), &[])
    }

    fn exists_by_name(&self, name: &str) -> RepoResult<bool> {
        self.exists(&Filter::eq(CategoryField::Name, name))
    }

    fn find_active_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        self.find_first(&Filter::eq(CategoryField::Name, name).and(Self::active()), &[])
    }

    fn find_active_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        self.find_first(&Filter::eq(CategoryField::Id, id).and(Self::active()), &[])
    }

    fn find_all_active(&self) -> RepoResult<Vec<Category>> {
        self.find_all(&Self::active(), &[Sort::asc(CategoryField::Name)])
    }
}

pub trait CategoryQuestionRepository {
    fn create(&self, category: &CategoryQuestion) -> RepoResult<CategoryQuestionId>;
    fn exists_by_name(&self, name: &str) -> RepoResult<bool>;
}

sqlite_accessor! {
    /// SQLite-backed question category accessor.
    SqliteCategoryQuestionRepository => CategoryQuestion
}

impl CategoryQuestionRepository for SqliteCategoryQuestionRepository<'_> {
    fn create(&self, category: &CategoryQuestion) -> RepoResult<CategoryQuestionId> {
        category.validate()?;
        self.executor().insert::<CategoryQuestion>(
            &["name", "description"],
            params![category.name, category.description],
        )
    }

    fn exists_by_name(&self, name: &str) -> RepoResult<bool> {
        self.exists(&Filter::eq(CategoryQuestionField::Name, name))
    }
}

/// Blog post lookups.
///
/// `find_*` methods return bounded lists; `page_*` and `search*` methods return pages.
pub trait BlogPostRepository {
    fn create(&self, post: &BlogPost) -> RepoResult<BlogPostId>;

    fn find_by_status(&self, status: BlogPostStatus) -> RepoResult<Vec<BlogPost>>;
    fn page_by_status(
        &self,
        status: BlogPostStatus,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    fn find_by_author(&self, author_id: UserId) -> RepoResult<Vec<BlogPost>>;
    fn page_by_author(
        &self,
        author_id: UserId,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    fn find_by_author_and_status(
        &self,
        author_id: UserId,
        status: BlogPostStatus,
    ) -> RepoResult<Vec<BlogPost>>;
    fn page_by_author_and_status(
        &self,
        author_id: UserId,
        status: BlogPostStatus,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    fn find_by_category(&self, category_id: CategoryId) -> RepoResult<Vec<BlogPost>>;
    fn page_by_category(
        &self,
        category_id: CategoryId,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    fn find_by_title_containing(&self, keyword: &str) -> RepoResult<Vec<BlogPost>>;
    fn page_by_title_containing(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    fn find_by_content_containing(&self, keyword: &str) -> RepoResult<Vec<BlogPost>>;
    fn page_by_content_containing(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    /// Inclusive on both ends.
    fn find_by_created_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepoResult<Vec<BlogPost>>;
    fn page_by_created_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    fn search_title_or_content(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;
    /// Title, content or category name contains `keyword`.
    fn search(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;
    fn search_with_status(
        &self,
        status: BlogPostStatus,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;
    fn search_in_category(
        &self,
        category_id: CategoryId,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;
    fn search_in_category_with_status(
        &self,
        category_id: CategoryId,
        status: BlogPostStatus,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>>;

    /// Newest `limit` posts with `status`.
    fn find_latest_by_status(&self, status: BlogPostStatus, limit: u32)
        -> RepoResult<Vec<BlogPost>>;
}

sqlite_accessor! {
    /// SQLite-backed blog post accessor.
    SqliteBlogPostRepository => BlogPost
}

fn post_keyword(keyword: &str) -> Filter<BlogPostField> {
    Filter::any_contains(
        &[
            BlogPostField::Title,
            BlogPostField::Content,
            BlogPostField::CategoryName,
        ],
        keyword,
    )
}

fn by_author_and_status(author_id: UserId, status: BlogPostStatus) -> Filter<BlogPostField> {
    Filter::eq(BlogPostField::AuthorId, author_id).and(Filter::eq(BlogPostField::Status, status))
}

impl BlogPostRepository for SqliteBlogPostRepository<'_> {
    fn create(&self, post: &BlogPost) -> RepoResult<BlogPostId> {
        post.validate()?;
        self.executor().insert::<BlogPost>(
            &[
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
            ],
            params![
                post.title,
                post.content,
                post.thumbnail_image,
                post.category_id,
                post.author_id,
                post.status,
                post.reviewer_id,
                post.reviewed_at,
                post.rejection_reason,
                post.created_at,
                post.updated_at,
            ],
        )
    }

    fn find_by_status(&self, status: BlogPostStatus) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&Filter::eq(BlogPostField::Status, status), &[])
    }

    fn page_by_status(
        &self,
        status: BlogPostStatus,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&Filter::eq(BlogPostField::Status, status), request)
    }

    fn find_by_author(&self, author_id: UserId) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&Filter::eq(BlogPostField::AuthorId, author_id), &[])
    }

    fn page_by_author(
        &self,
        author_id: UserId,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&Filter::eq(BlogPostField::AuthorId, author_id), request)
    }

    fn find_by_author_and_status(
        &self,
        author_id: UserId,
        status: BlogPostStatus,
    ) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&by_author_and_status(author_id, status), &[])
    }

    fn page_by_author_and_status(
        &self,
        author_id: UserId,
        status: BlogPostStatus,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&by_author_and_status(author_id, status), request)
    }

    fn find_by_category(&self, category_id: CategoryId) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&Filter::eq(BlogPostField::CategoryId, category_id), &[])
    }

    fn page_by_category(
        &self,
        category_id: CategoryId,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&Filter::eq(BlogPostField::CategoryId, category_id), request)
    }

    fn find_by_title_containing(&self, keyword: &str) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&Filter::contains(BlogPostField::Title, keyword), &[])
    }

    fn page_by_title_containing(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&Filter::contains(BlogPostField::Title, keyword), request)
    }

    fn find_by_content_containing(&self, keyword: &str) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&Filter::contains(BlogPostField::Content, keyword), &[])
    }

    fn page_by_content_containing(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&Filter::contains(BlogPostField::Content, keyword), request)
    }

    fn find_by_created_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepoResult<Vec<BlogPost>> {
        self.find_all(&Filter::between(BlogPostField::CreatedAt, from, to), &[])
    }

    fn page_by_created_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&Filter::between(BlogPostField::CreatedAt, from, to), request)
    }

    fn search_title_or_content(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        let filter =
            Filter::any_contains(&[BlogPostField::Title, BlogPostField::Content], keyword);
        self.find_page(&filter, request)
    }

    fn search(
        &self,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        self.find_page(&post_keyword(keyword), request)
    }

    fn search_with_status(
        &self,
        status: BlogPostStatus,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        let filter = Filter::eq(BlogPostField::Status, status).and(post_keyword(keyword));
        self.find_page(&filter, request)
    }

    fn search_in_category(
        &self,
        category_id: CategoryId,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        let filter =
            Filter::eq(BlogPostField::CategoryId, category_id).and(post_keyword(keyword));
        self.find_page(&filter, request)
    }

    fn search_in_category_with_status(
        &self,
        category_id: CategoryId,
        status: BlogPostStatus,
        keyword: &str,
        request: &PageRequest<BlogPostField>,
    ) -> RepoResult<Page<BlogPost>> {
        let filter = Filter::eq(BlogPostField::CategoryId, category_id)
            .and(Filter::eq(BlogPostField::Status, status))
            .and(post_keyword(keyword));
        self.find_page(&filter, request)
    }

    fn find_latest_by_status(
        &self,
        status: BlogPostStatus,
        limit: u32,
    ) -> RepoResult<Vec<BlogPost>> {
        self.executor().find_limited::<BlogPost>(
            &Filter::eq(BlogPostField::Status, status),
            &[Sort::desc(BlogPostField::CreatedAt)],
            limit,
        )
    }
}

pub trait BlogSectionRepository {
    fn create(&self, section: &BlogSection) -> RepoResult<BlogSectionId>;
    /// Sections of a post in display order.
    fn find_by_post(&self, post_id: BlogPostId) -> RepoResult<Vec<BlogSection>>;
}

sqlite_accessor! {
    /// SQLite-backed blog section accessor.
    SqliteBlogSectionRepository => BlogSection
}

impl BlogSectionRepository for SqliteBlogSectionRepository<'_> {
    fn create(&self, section: &BlogSection) -> RepoResult<BlogSectionId> {
        self.executor().insert::<BlogSection>(
            &[
                "post_id",
                "section_title",
                "section_content",
                "section_image",
                "display_order",
            ],
            params![
                section.post_id,
                section.title,
                section.content,
                section.image,
                section.display_order,
            ],
        )
    }

    fn find_by_post(&self, post_id: BlogPostId) -> RepoResult<Vec<BlogSection>> {
        self.find_all(
            &Filter::eq(BlogSectionField::PostId, post_id),
            &[Sort::asc(BlogSectionField::DisplayOrder)],
        )
    }
}

/// Customer question queues. Every listing is paged.
pub trait QuestionRepository {
    fn create(&self, question: &Question) -> RepoResult<QuestionId>;
    fn page_by_status(
        &self,
        status: QuestionStatus,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    fn page_by_category(
        &self,
        category_question_id: CategoryQuestionId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    fn page_by_customer(
        &self,
        customer_id: UserId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    fn page_by_status_and_category(
        &self,
        status: QuestionStatus,
        category_question_id: CategoryQuestionId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    fn page_by_status_and_customer(
        &self,
        status: QuestionStatus,
        customer_id: UserId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    /// Answered questions whose content or answer contains `query`.
    fn search_answered(
        &self,
        query: &str,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    fn page_by_replier(
        &self,
        replier_id: UserId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>>;
    fn count_by_status(&self, status: QuestionStatus) -> RepoResult<u64>;
}

sqlite_accessor! {
    /// SQLite-backed question accessor.
    SqliteQuestionRepository => Question
}

impl QuestionRepository for SqliteQuestionRepository<'_> {
    fn create(&self, question: &Question) -> RepoResult<QuestionId> {
        question.validate()?;
        self.executor().insert::<Question>(
            &[
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
            ],
            params![
                question.customer_id,
                question.category_question_id,
                question.content,
                question.answer,
                question.status,
                question.updater_id,
                question.replier_id,
                question.rejection_reason,
                question.created_at,
                question.updated_at,
            ],
        )
    }

    fn page_by_status(
        &self,
        status: QuestionStatus,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        self.find_page(&Filter::eq(QuestionField::Status, status), request)
    }

    fn page_by_category(
        &self,
        category_question_id: CategoryQuestionId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        self.find_page(
            &Filter::eq(QuestionField::CategoryQuestionId, category_question_id),
            request,
        )
    }

    fn page_by_customer(
        &self,
        customer_id: UserId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        self.find_page(&Filter::eq(QuestionField::CustomerId, customer_id), request)
    }

    fn page_by_status_and_category(
        &self,
        status: QuestionStatus,
        category_question_id: CategoryQuestionId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        let filter = Filter::eq(QuestionField::Status, status).and(Filter::eq(
            QuestionField::CategoryQuestionId,
            category_question_id,
        ));
        self.find_page(&filter, request)
    }

    fn page_by_status_and_customer(
        &self,
        status: QuestionStatus,
        customer_id: UserId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        let filter = Filter::eq(QuestionField::Status, status)
            .and(Filter::eq(QuestionField::CustomerId, customer_id));
        self.find_page(&filter, request)
    }

    fn search_answered(
        &self,
        query: &str,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        let filter = Filter::eq(QuestionField::Status, QuestionStatus::Answered).and(
            Filter::any_contains(&[QuestionField::Content, QuestionField::Answer], query),
        );
        self.find_page(&filter, request)
    }

    fn page_by_replier(
        &self,
        replier_id: UserId,
        request: &PageRequest<QuestionField>,
    ) -> RepoResult<Page<Question>> {
        self.find_page(&Filter::eq(QuestionField::ReplierId, replier_id), request)
    }

    fn count_by_status(&self, status: QuestionStatus) -> RepoResult<u64> {
        self.count(&Filter::eq(QuestionField::Status, status))
    }
}
