use pretty_assertions::assert_eq;
use tests::prelude::*;

async fn seed(db: &Db, n: i64) -> Vec<i64> {
    let mut posts = db.model("Post").unwrap();
    let mut ids = vec![];
    for i in 0..n {
        let post = posts
            .create(json!({"data": {"title": format!("post {i:02}"), "views": i % 3}}))
            .await
            .unwrap();
        ids.push(id(&post));
    }
    ids
}

fn ids(records: &[Record]) -> Vec<i64> {
    records.iter().map(id).collect()
}

async fn sort_asc_and_desc(test: &mut DbTest) {
    let db = test.setup_db().await;
    let created = seed(&db, 10).await;
    let mut posts = db.model("Post").unwrap();

    let asc = posts
        .find_many(json!({"orderBy": {"id": "asc"}}))
        .await
        .unwrap();
    assert_eq!(ids(&asc), created);

    let desc = posts
        .find_many(json!({"orderBy": [{"id": "desc"}]}))
        .await
        .unwrap();
    let mut reversed = created.clone();
    reversed.reverse();
    assert_eq!(ids(&desc), reversed);

    // Ties on `views` are broken by the second term
    let sorted = posts
        .find_many(json!({"orderBy": [{"views": "desc"}, {"id": "asc"}], "take": 4}))
        .await
        .unwrap();
    assert_eq!(
        ids(&sorted),
        vec![created[2], created[5], created[8], created[1]]
    );
}

async fn take_and_skip(test: &mut DbTest) {
    let db = test.setup_db().await;
    let created = seed(&db, 10).await;
    let mut posts = db.model("Post").unwrap();

    let page = posts
        .find_many(json!({"orderBy": {"id": "asc"}, "take": 3, "skip": 4}))
        .await
        .unwrap();
    assert_eq!(ids(&page), created[4..7].to_vec());

    // `skip` without `take`
    let tail = posts
        .find_many(json!({"orderBy": {"id": "asc"}, "skip": 8}))
        .await
        .unwrap();
    assert_eq!(ids(&tail), created[8..].to_vec());
}

async fn cursor_starts_after_the_cursor_row(test: &mut DbTest) {
    let db = test.setup_db().await;
    let created = seed(&db, 10).await;
    let mut posts = db.model("Post").unwrap();

    let page = posts
        .find_many(json!({
            "cursor": {"id": created[3]},
            "orderBy": {"id": "asc"},
            "take": 2
        }))
        .await
        .unwrap();
    assert_eq!(ids(&page), created[4..6].to_vec());

    // An explicit `skip: 0` keeps the cursor row
    let page = posts
        .find_many(json!({
            "cursor": {"id": created[3]},
            "orderBy": {"id": "asc"},
            "take": 2,
            "skip": 0
        }))
        .await
        .unwrap();
    assert_eq!(ids(&page), created[3..5].to_vec());
}

async fn distinct_rows(test: &mut DbTest) {
    let db = test.setup_db().await;
    seed(&db, 9).await;

    let views = db
        .model("Post")
        .unwrap()
        .find_many(json!({
            "select": {"views": true},
            "distinct": ["views"],
            "orderBy": {"views": "asc"}
        }))
        .await
        .unwrap();

    let views: Vec<i64> = views
        .iter()
        .map(|r| field(r, "views").as_i64().unwrap())
        .collect();
    assert_eq!(views, [0, 1, 2]);
}

async fn order_by_relation_field(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    for (email, title) in [("zed@example.com", "first"), ("amy@example.com", "second")] {
        users
            .create(json!({"data": {"email": email, "posts": {"create": {"title": title}}}}))
            .await
            .unwrap();
    }

    let posts = db
        .model("Post")
        .unwrap()
        .find_many(json!({"orderBy": {"author": {"email": "asc"}}}))
        .await
        .unwrap();
    assert_eq!(strings(&posts, "title"), ["second", "first"]);
}

async fn invalid_pagination_arguments(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut posts = db.model("Post").unwrap();

    let err = posts.find_many(json!({"take": "3"})).await.unwrap_err();
    assert!(err.is_invalid_criteria());

    let err = posts.find_many(json!({"skip": -1})).await.unwrap_err();
    assert!(err.is_invalid_criteria());

    let err = posts.find_many(json!({"orderBy": "id"})).await.unwrap_err();
    assert!(err.is_invalid_criteria());
}

tests!(
    sort_asc_and_desc,
    take_and_skip,
    cursor_starts_after_the_cursor_row,
    distinct_rows,
    order_by_relation_field,
    invalid_pagination_arguments,
);
