use tests::prelude::*;

async fn upsert_creates_then_updates(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    let args = json!({
        "where": {"email": "up@example.com"},
        "create": {"email": "up@example.com", "name": "Created"},
        "update": {"name": "Updated"}
    });

    let created = users.upsert(args.clone()).await.unwrap();
    assert_eq!(field(&created, "name"), &Value::from("Created"));

    let updated = users.upsert(args).await.unwrap();
    assert_eq!(id(&updated), id(&created));
    assert_eq!(field(&updated, "name"), &Value::from("Updated"));

    let count = users.count(json!({})).await.unwrap();
    assert_eq!(count.total(), Some(1));
}

async fn upsert_with_nested_writes(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    let user = users
        .upsert(json!({
            "where": {"email": "nest@example.com"},
            "create": {"email": "nest@example.com", "posts": {"create": {"title": "from create"}}},
            "update": {"posts": {"create": {"title": "from update"}}},
            "include": {"posts": true}
        }))
        .await
        .unwrap();
    assert_eq!(field(&user, "posts").as_list().unwrap().len(), 1);

    let user = users
        .upsert(json!({
            "where": {"email": "nest@example.com"},
            "create": {"email": "nest@example.com"},
            "update": {"posts": {"create": {"title": "from update"}}},
            "include": {"posts": {"orderBy": {"title": "asc"}}}
        }))
        .await
        .unwrap();
    let titles: Vec<&str> = field(&user, "posts")
        .as_list()
        .unwrap()
        .iter()
        .map(|p| p.as_record().unwrap()["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["from create", "from update"]);
}

async fn upsert_requires_unique_where(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    let err = users
        .upsert(json!({
            "where": {"name": "Ann"},
            "create": {"email": "ann@example.com"},
            "update": {}
        }))
        .await
        .unwrap_err();
    assert!(err.is_no_unique_condition());

    let err = users
        .upsert(json!({
            "where": {"email": "ann@example.com"},
            "create": {"email": "ann@example.com"}
        }))
        .await
        .unwrap_err();
    assert!(err.is_invalid_criteria());
}

tests!(
    upsert_creates_then_updates,
    upsert_with_nested_writes,
    upsert_requires_unique_where,
);
