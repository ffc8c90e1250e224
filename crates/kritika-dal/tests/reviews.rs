use futures::TryStreamExt as _;
use kritika_dal::{
    comment::{CommentRepositoryImpl, CreateComment},
    review::{CreateReview, ReviewRepositoryImpl},
    title::TitleRepositoryImpl,
    Error,
};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username, email, role) VALUES (1, 'bob', 'bob@example.com', 'user');
INSERT INTO users (id, username, email, role) VALUES (2, 'alice', 'alice@example.com', 'moderator');

INSERT INTO category (id, name, slug) VALUES (1, 'Movies', 'movies');

INSERT INTO genre (id, name, slug) VALUES (1, 'Crime', 'crime');

INSERT INTO title (id, name, year, category_id) VALUES (1, 'Heat', 1995, 1);
INSERT INTO title (id, name, year, category_id) VALUES (2, 'Ronin', 1998, 1);

INSERT INTO title_genre (title_id, genre_id) VALUES (1, 1);
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

#[tokio::test]
async fn test_one_review_per_title_and_author() {
    let conn = init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let review = repo
        .create(
            1,
            1,
            CreateReview {
                text: "Tight".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();
    assert_eq!(review.author, "bob");
    assert_eq!(review.score, 9);

    let second = repo
        .create(
            1,
            1,
            CreateReview {
                text: "Changed my mind".to_string(),
                score: 3,
            },
        )
        .await;
    assert!(matches!(second, Err(Error::AlreadyExists(_))));

    // Same author on another title and another author on the same title are fine.
    repo.create(
        2,
        1,
        CreateReview {
            text: "Also good".to_string(),
            score: 8,
        },
    )
    .await
    .unwrap();
    repo.create(
        1,
        2,
        CreateReview {
            text: "Seen better".to_string(),
            score: 6,
        },
    )
    .await
    .unwrap();

    let reviews = repo.list_for_title(1).await.unwrap();
    assert_eq!(reviews.len(), 2);
}

#[tokio::test]
async fn test_store_constraint_stops_duplicate_insert() {
    let conn = init_db().await;

    // Bypass the repository pre-check, the unique index must hold on its own.
    sqlx::query("INSERT INTO review (title_id, author_id, text, score) VALUES (1, 1, 'a', 5)")
        .execute(&conn)
        .await
        .unwrap();
    let dup =
        sqlx::query("INSERT INTO review (title_id, author_id, text, score) VALUES (1, 1, 'b', 6)")
            .execute(&conn)
            .await;
    match dup {
        Err(sqlx::Error::Database(db)) => assert!(db.is_unique_violation()),
        other => panic!("Expected unique violation, got {:?}", other),
    }

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE title_id = 1")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_rating_is_mean_of_scores() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn);

    let title = titles.get(1).await.unwrap();
    assert_eq!(title.rating, None);

    reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Great".to_string(),
                score: 10,
            },
        )
        .await
        .unwrap();
    reviews
        .create(
            1,
            2,
            CreateReview {
                text: "Fine".to_string(),
                score: 5,
            },
        )
        .await
        .unwrap();

    let title = titles.get(1).await.unwrap();
    assert_eq!(title.rating, Some(7.5));
}

#[tokio::test]
async fn test_review_scoped_by_title() {
    let conn = init_db().await;
    let repo = ReviewRepositoryImpl::new(conn);

    let review = repo
        .create(
            1,
            1,
            CreateReview {
                text: "Tight".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();

    assert!(repo.get_for_title(1, review.id).await.is_ok());
    let wrong_title = repo.get_for_title(2, review.id).await;
    assert!(matches!(wrong_title, Err(Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_title_delete_cascades() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn.clone());

    let review = reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Tight".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();
    let comment = comments
        .create(
            review.id,
            2,
            CreateComment {
                text: "Agreed".to_string(),
            },
        )
        .await
        .unwrap();

    titles.delete(1).await.unwrap();

    assert!(matches!(
        reviews.get(review.id).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        comments.get(comment.id).await,
        Err(Error::RecordNotFound(_))
    ));

    let leftovers: i64 = sqlx::query_scalar("SELECT count(*) FROM comment")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_review_delete_cascades_comments() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn);

    let review = reviews
        .create(
            1,
            1,
            CreateReview {
                text: "Tight".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();
    comments
        .create(
            review.id,
            2,
            CreateComment {
                text: "Agreed".to_string(),
            },
        )
        .await
        .unwrap();

    reviews.delete(review.id).await.unwrap();
    let list = comments.list_for_review(review.id).await.unwrap();
    assert!(list.is_empty());
}
