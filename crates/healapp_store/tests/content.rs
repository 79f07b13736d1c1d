use chrono::{Duration, Local, NaiveDate};
use healapp_store::model::account::{Role, User, UserId};
use healapp_store::model::content::{
    BlogPost, BlogPostField, BlogPostStatus, BlogSection, Category, CategoryId, CategoryQuestion,
    Question, QuestionField, QuestionStatus,
};
use healapp_store::repo::{
    BlogPostRepository, BlogSectionRepository, CategoryQuestionRepository, CategoryRepository,
    QuestionRepository, RoleRepository, SqliteBlogPostRepository, SqliteBlogSectionRepository,
    SqliteCategoryQuestionRepository, SqliteCategoryRepository, SqliteQuestionRepository,
    SqliteRoleRepository, SqliteUserRepository, UserRepository,
};
use healapp_store::{open_db_in_memory, Accessor, Filter, PageRequest, QueryLimits, RepoError, Sort};
use rusqlite::Connection;
use std::collections::HashSet;

fn author(conn: &Connection, username: &str) -> UserId {
    let roles = SqliteRoleRepository::try_new(conn).unwrap();
    let role_id = match roles.find_by_name("STAFF").unwrap() {
        Some(role) => role.id,
        None => roles.create(&Role::new("STAFF")).unwrap(),
    };
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .create(&User::new(
            username,
            format!("{username}@example.com"),
            "Staff Writer",
            "hash",
            role_id,
        ))
        .unwrap()
}

fn category(conn: &Connection, name: &str) -> CategoryId {
    SqliteCategoryRepository::try_new(conn)
        .unwrap()
        .create(&Category::new(name))
        .unwrap()
}

fn post(title: &str, status: BlogPostStatus, category_id: CategoryId, author_id: UserId) -> BlogPost {
    let mut post = BlogPost::new(title, format!("Body of {title}"), category_id, author_id);
    post.status = status;
    post
}

#[test]
fn page_by_status_counts_only_matching_posts() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.one");
    let health = category(&conn, "Sexual health");
    let repo = SqliteBlogPostRepository::try_new(&conn).unwrap();

    repo.create(&post("Draft", BlogPostStatus::Draft, health, writer)).unwrap();
    repo.create(&post("First", BlogPostStatus::Confirmed, health, writer)).unwrap();
    repo.create(&post("Second", BlogPostStatus::Confirmed, health, writer)).unwrap();

    let page = repo
        .page_by_status(BlogPostStatus::Confirmed, &PageRequest::new(0, 10))
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 2);
    assert!(page
        .items
        .iter()
        .all(|item| item.status == BlogPostStatus::Confirmed));
    assert!(!page.has_next());
}

#[test]
fn paging_reads_one_snapshot_and_respects_caller_transaction() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.snapshot");
    let health = category(&conn, "Screening");
    let repo = SqliteBlogPostRepository::try_new(&conn).unwrap();
    repo.create(&post("Kept", BlogPostStatus::Confirmed, health, writer)).unwrap();

    let request = PageRequest::new(0, 10);
    assert_eq!(repo.page_by_status(BlogPostStatus::Confirmed, &request).unwrap().total, 1);
    assert!(conn.is_autocommit());

    let tx = conn.unchecked_transaction().unwrap();
    {
        let repo = SqliteBlogPostRepository::try_new(&tx).unwrap();
        repo.create(&post("Pending", BlogPostStatus::Confirmed, health, writer))
            .unwrap();
        let page = repo.page_by_status(BlogPostStatus::Confirmed, &request).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        assert!(!tx.is_autocommit());
    }
    tx.rollback().unwrap();

    let page = repo.page_by_status(BlogPostStatus::Confirmed, &request).unwrap();
    assert_eq!((page.total, page.items.len()), (1, 1));
}

#[test]
fn pages_are_disjoint_and_cover_the_full_result() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.two");
    let health = category(&conn, "Contraception");
    let repo = SqliteBlogPostRepository::try_new(&conn).unwrap();

    for index in 0..7 {
        repo.create(&post(
            &format!("Post {index}"),
            BlogPostStatus::Confirmed,
            health,
            writer,
        ))
        .unwrap();
    }

    let mut seen = HashSet::new();
    let mut page_index = 0;
    loop {
        let request = PageRequest::new(page_index, 3).sorted_by(Sort::asc(BlogPostField::Title));
        let page = repo.page_by_category(health, &request).unwrap();
        assert_eq!(page.total, 7);
        for item in &page.items {
            assert!(seen.insert(item.id), "post {} appeared twice", item.id);
        }
        if !page.has_next() {
            break;
        }
        page_index += 1;
    }
    assert_eq!(page_index, 2);

    let all: HashSet<_> = repo
        .find_by_category(health)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(seen, all);

    let beyond = repo
        .page_by_category(health, &PageRequest::new(5, 3))
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 7);
}

#[test]
fn oversized_page_request_is_clamped() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.three");
    let health = category(&conn, "Fertility");
    let limits = QueryLimits {
        default_page_size: 2,
        max_page_size: 3,
        max_unpaged_rows: 100,
    };
    let repo = SqliteBlogPostRepository::with_limits(&conn, limits).unwrap();
    for index in 0..5 {
        repo.create(&post(&format!("P{index}"), BlogPostStatus::Draft, health, writer))
            .unwrap();
    }

    let clamped = repo.page_by_author(writer, &PageRequest::new(0, 50)).unwrap();
    assert_eq!(clamped.size, 3);
    assert_eq!(clamped.items.len(), 3);

    let defaulted = repo.page_by_author(writer, &PageRequest::new(0, 0)).unwrap();
    assert_eq!(defaulted.size, 2);
    assert_eq!(defaulted.items.len(), 2);
}

#[test]
fn unpaged_lookup_over_cap_fails() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.four");
    let health = category(&conn, "Wellness");
    let limits = QueryLimits {
        max_unpaged_rows: 2,
        ..QueryLimits::default()
    };
    let repo = SqliteBlogPostRepository::with_limits(&conn, limits).unwrap();
    for index in 0..3 {
        repo.create(&post(&format!("W{index}"), BlogPostStatus::Draft, health, writer))
            .unwrap();
    }

    let err = repo.find_by_author(writer).unwrap_err();
    match err {
        RepoError::ResultTooLarge { table, limit } => {
            assert_eq!(table, "blog_posts");
            assert_eq!(limit, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.find_latest_by_status(BlogPostStatus::Draft, 10).unwrap().len(), 2);
}

#[test]
fn keyword_search_is_case_insensitive_and_reaches_category_name() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.five");
    let contraception = category(&conn, "Contraception");
    let fertility = category(&conn, "Fertility");
    let repo = SqliteBlogPostRepository::try_new(&conn).unwrap();

    let pill = repo
        .create(&post("Choosing a PILL", BlogPostStatus::Confirmed, contraception, writer))
        .unwrap();
    let cycle = repo
        .create(&post("Tracking your cycle", BlogPostStatus::Draft, fertility, writer))
        .unwrap();

    let request = PageRequest::new(0, 10);
    let by_title = repo.search_title_or_content("pill", &request).unwrap();
    assert_eq!(by_title.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![pill]);

    let by_category = repo.search("FERTIL", &request).unwrap();
    assert_eq!(by_category.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![cycle]);
    assert!(repo
        .search_title_or_content("fertil", &request)
        .unwrap()
        .items
        .is_empty());

    let confirmed = repo
        .search_with_status(BlogPostStatus::Confirmed, "cycle", &request)
        .unwrap();
    assert_eq!(confirmed.total, 0);
    let in_category = repo
        .search_in_category_with_status(fertility, BlogPostStatus::Draft, "cycle", &request)
        .unwrap();
    assert_eq!(in_category.total, 1);

    let wildcard = repo.find_by_title_containing("%").unwrap();
    assert!(wildcard.is_empty());
}

#[test]
fn created_between_is_inclusive() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.six");
    let health = category(&conn, "Archive");
    let repo = SqliteBlogPostRepository::try_new(&conn).unwrap();

    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let mut early = post("Early", BlogPostStatus::Confirmed, health, writer);
    early.created_at = day.and_hms_opt(8, 0, 0).unwrap();
    let mut late = post("Late", BlogPostStatus::Confirmed, health, writer);
    late.created_at = day.and_hms_opt(20, 0, 0).unwrap();
    let early_id = repo.create(&early).unwrap();
    repo.create(&late).unwrap();

    let window = repo
        .find_by_created_between(early.created_at, early.created_at + Duration::hours(1))
        .unwrap();
    assert_eq!(window.iter().map(|p| p.id).collect::<Vec<_>>(), vec![early_id]);

    let now = Local::now().naive_local();
    assert!(repo
        .page_by_created_between(now, now + Duration::days(1), &PageRequest::new(0, 5))
        .unwrap()
        .items
        .is_empty());
}

#[test]
fn sections_follow_display_order_and_cascade_with_post() {
    let conn = open_db_in_memory().unwrap();
    let writer = author(&conn, "writer.seven");
    let health = category(&conn, "Guides");
    let posts = SqliteBlogPostRepository::try_new(&conn).unwrap();
    let sections = SqliteBlogSectionRepository::try_new(&conn).unwrap();

    let post_id = posts
        .create(&post("Guide", BlogPostStatus::Confirmed, health, writer))
        .unwrap();
    for order in [3, 1, 2] {
        let mut section = BlogSection::new(post_id, order);
        section.title = Some(format!("Step {order}"));
        sections.create(&section).unwrap();
    }

    let loaded = sections.find_by_post(post_id).unwrap();
    assert_eq!(
        loaded.iter().map(|s| s.display_order).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    assert!(posts.delete_by_id(post_id).unwrap());
    assert!(sections.find_by_post(post_id).unwrap().is_empty());
}

#[test]
fn categories_filter_inactive_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();

    let mut hidden = Category::new("Hidden topic");
    hidden.is_active = false;
    let hidden_id = repo.create(&hidden).unwrap();
    repo.create(&Category::new("Visible topic")).unwrap();

    assert!(repo.exists_by_name("Hidden topic").unwrap());
    assert!(repo.find_active_by_name("Hidden topic").unwrap().is_none());
    assert!(repo.find_active_by_id(hidden_id).unwrap().is_none());
    assert_eq!(repo.find_all_active().unwrap().len(), 1);
    assert!(matches!(
        repo.create(&Category::new("ab")),
        Err(RepoError::Validation(_))
    ));
}

#[test]
fn questions_page_by_status_and_search_answers() {
    let conn = open_db_in_memory().unwrap();
    let customer = author(&conn, "customer.q");
    let consultant = author(&conn, "consultant.q");
    let topics = SqliteCategoryQuestionRepository::try_new(&conn).unwrap();
    let repo = SqliteQuestionRepository::try_new(&conn).unwrap();

    let topic = topics.create(&CategoryQuestion::new("Contraception")).unwrap();
    assert!(topics.exists_by_name("Contraception").unwrap());

    let mut answered = Question::new(customer, topic, "Is the pill safe long term?");
    answered.status = QuestionStatus::Answered;
    answered.answer = Some("Generally yes, with regular check-ups.".to_string());
    answered.replier_id = Some(consultant);
    repo.create(&answered).unwrap();
    repo.create(&Question::new(customer, topic, "When should I get tested?"))
        .unwrap();

    let request = PageRequest::new(0, 10);
    assert_eq!(repo.page_by_status(QuestionStatus::Processing, &request).unwrap().total, 1);
    assert_eq!(repo.page_by_customer(customer, &request).unwrap().total, 2);
    assert_eq!(repo.search_answered("check-ups", &request).unwrap().total, 1);
    assert_eq!(repo.search_answered("tested", &request).unwrap().total, 0);
    assert_eq!(repo.page_by_replier(consultant, &request).unwrap().total, 1);
    assert_eq!(repo.count_by_status(QuestionStatus::Answered).unwrap(), 1);
    assert_eq!(
        repo.count(&Filter::eq(QuestionField::CategoryQuestionId, topic))
            .unwrap(),
        2
    );
    assert_eq!(
        repo.page_by_status_and_category(QuestionStatus::Answered, topic, &request)
            .unwrap()
            .total,
        1
    );
}
