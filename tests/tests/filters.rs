use tests::prelude::*;

async fn seed(db: &Db) {
    let mut posts = db.model("Post").unwrap();
    for (title, views, published) in [
        ("Rust ownership", 10, true),
        ("Rust lifetimes", 25, true),
        ("Go channels", 5, false),
        ("Zig comptime", 40, false),
    ] {
        posts
            .create(json!({"data": {"title": title, "views": views, "published": published}}))
            .await
            .unwrap();
    }
}

async fn titles(db: &Db, args: serde_json::Value) -> Vec<String> {
    let records = db.model("Post").unwrap().find_many(args).await.unwrap();
    strings(&records, "title")
        .into_iter()
        .map(String::from)
        .collect()
}

async fn comparison_operators(test: &mut DbTest) {
    let db = test.setup_db().await;
    seed(&db).await;

    let order = json!({"title": "asc"});

    assert_eq!(
        titles(&db, json!({"where": {"views": {"gt": 10}}, "orderBy": order})).await,
        ["Rust lifetimes", "Zig comptime"]
    );
    assert_eq!(
        titles(&db, json!({"where": {"views": {"gte": 10, "lte": 25}}, "orderBy": order})).await,
        ["Rust lifetimes", "Rust ownership"]
    );
    assert_eq!(
        titles(&db, json!({"where": {"views": {"not": 5}}, "orderBy": order})).await,
        ["Rust lifetimes", "Rust ownership", "Zig comptime"]
    );
    assert_eq!(
        titles(&db, json!({"where": {"views": {"notIn": [5, 10]}}, "orderBy": order})).await,
        ["Rust lifetimes", "Zig comptime"]
    );
}

async fn string_operators(test: &mut DbTest) {
    let db = test.setup_db().await;
    seed(&db).await;

    let order = json!({"title": "asc"});

    assert_eq!(
        titles(&db, json!({"where": {"title": {"startsWith": "Rust"}}, "orderBy": order})).await,
        ["Rust lifetimes", "Rust ownership"]
    );
    assert_eq!(
        titles(&db, json!({"where": {"title": {"endsWith": "channels"}}})).await,
        ["Go channels"]
    );
    assert_eq!(
        titles(&db, json!({"where": {"title": {"contains": "time"}}, "orderBy": order})).await,
        ["Rust lifetimes", "Zig comptime"]
    );
}

async fn in_with_empty_list(test: &mut DbTest) {
    let db = test.setup_db().await;
    seed(&db).await;

    assert!(titles(&db, json!({"where": {"id": {"in": []}}})).await.is_empty());
    assert_eq!(
        titles(&db, json!({"where": {"id": {"notIn": []}}})).await.len(),
        4
    );
}

async fn logical_operators(test: &mut DbTest) {
    let db = test.setup_db().await;
    seed(&db).await;

    let order = json!({"title": "asc"});

    assert_eq!(
        titles(
            &db,
            json!({
                "where": {"OR": [{"views": {"lt": 6}}, {"views": {"gt": 30}}]},
                "orderBy": order
            })
        )
        .await,
        ["Go channels", "Zig comptime"]
    );
    assert_eq!(
        titles(
            &db,
            json!({
                "where": {"AND": [{"published": true}, {"title": {"contains": "own"}}]}
            })
        )
        .await,
        ["Rust ownership"]
    );
    assert_eq!(
        titles(
            &db,
            json!({
                "where": {"NOT": [{"published": true}], "views": {"gt": 10}}
            })
        )
        .await,
        ["Zig comptime"]
    );
}

async fn null_checks(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut posts = db.model("Post").unwrap();

    posts
        .create(json!({"data": {"title": "draft"}}))
        .await
        .unwrap();
    posts
        .create(json!({"data": {"title": "written", "content": "body"}}))
        .await
        .unwrap();

    assert_eq!(
        titles(&db, json!({"where": {"content": null}})).await,
        ["draft"]
    );
    assert_eq!(
        titles(&db, json!({"where": {"content": {"not": null}}})).await,
        ["written"]
    );
}

async fn relation_filters(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    users
        .create(json!({"data": {
            "email": "writer@example.com",
            "posts": {"create": [{"title": "one", "published": true}, {"title": "two"}]}
        }}))
        .await
        .unwrap();
    users
        .create(json!({"data": {
            "email": "editor@example.com",
            "posts": {"create": [{"title": "three", "published": true}]}
        }}))
        .await
        .unwrap();
    users
        .create(json!({"data": {"email": "lurker@example.com"}}))
        .await
        .unwrap();

    let emails = |records: Vec<Record>| -> Vec<String> {
        strings(&records, "email")
            .into_iter()
            .map(String::from)
            .collect()
    };
    let order = json!({"email": "asc"});

    let found = users
        .find_many(json!({"where": {"posts": {"some": {"published": false}}}}))
        .await
        .unwrap();
    assert_eq!(emails(found), ["writer@example.com"]);

    let found = users
        .find_many(json!({"where": {"posts": {"every": {"published": true}}}, "orderBy": order}))
        .await
        .unwrap();
    assert_eq!(emails(found), ["editor@example.com", "lurker@example.com"]);

    let found = users
        .find_many(json!({"where": {"posts": {"none": {}}}}))
        .await
        .unwrap();
    assert_eq!(emails(found), ["lurker@example.com"]);

    let posts = titles(
        &db,
        json!({
            "where": {"author": {"is": {"email": "editor@example.com"}}}
        }),
    )
    .await;
    assert_eq!(posts, ["three"]);
}

async fn rejects_unknown_conditions(test: &mut DbTest) {
    let db = test.setup_db().await;

    let err = db
        .model("Post")
        .unwrap()
        .find_many(json!({"where": {"views": {"between": [1, 2]}}}))
        .await
        .unwrap_err();
    assert!(err.is_unsupported_condition());

    // Enums only take equality and membership tests
    let err = db
        .model("User")
        .unwrap()
        .find_many(json!({"where": {"role": {"gt": "USER"}}}))
        .await
        .unwrap_err();
    assert!(err.is_unsupported_operator());
}

tests!(
    comparison_operators,
    string_operators,
    in_with_empty_list,
    logical_operators,
    null_checks,
    relation_filters,
    rejects_unknown_conditions,
);
