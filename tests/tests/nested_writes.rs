use pretty_assertions::assert_eq;
use tests::prelude::*;

async fn posts_of(db: &Db, email: &str) -> Vec<String> {
    let user = db
        .model("User")
        .unwrap()
        .find_unique(json!({
            "where": {"email": email},
            "include": {"posts": {"orderBy": {"title": "asc"}}}
        }))
        .await
        .unwrap()
        .unwrap();

    field(&user, "posts")
        .as_list()
        .unwrap()
        .iter()
        .map(|p| p.as_record().unwrap()["title"].as_str().unwrap().to_string())
        .collect()
}

async fn create_with_children_and_owner(test: &mut DbTest) {
    let db = test.setup_db().await;

    let user = db
        .model("User")
        .unwrap()
        .create(json!({
            "data": {
                "email": "ann@example.com",
                "profile": {"create": {"bio": "writes things"}},
                "posts": {"create": [{"title": "one"}, {"title": "two"}]}
            },
            "include": {"profile": true, "posts": true}
        }))
        .await
        .unwrap();

    let profile = field(&user, "profile").as_record().unwrap();
    assert_eq!(profile["userId"], Value::from(id(&user)));
    assert_eq!(field(&user, "posts").as_list().unwrap().len(), 2);

    // The owning side connects to an existing record
    let post = db
        .model("Post")
        .unwrap()
        .create(json!({
            "data": {"title": "three", "author": {"connect": {"email": "ann@example.com"}}},
            "include": {"author": true}
        }))
        .await
        .unwrap();
    assert_eq!(field(&post, "authorId"), &Value::from(id(&user)));

    assert_eq!(posts_of(&db, "ann@example.com").await, ["one", "three", "two"]);
}

async fn connect_or_create(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut posts = db.model("Post").unwrap();

    let first = posts
        .create(json!({"data": {
            "title": "first",
            "author": {"connectOrCreate": {
                "where": {"email": "coc@example.com"},
                "create": {"email": "coc@example.com", "name": "Created"}
            }}
        }}))
        .await
        .unwrap();
    let second = posts
        .create(json!({"data": {
            "title": "second",
            "author": {"connectOrCreate": {
                "where": {"email": "coc@example.com"},
                "create": {"email": "coc@example.com", "name": "Duplicate"}
            }}
        }}))
        .await
        .unwrap();

    assert_eq!(field(&first, "authorId"), field(&second, "authorId"));
    let count = db.model("User").unwrap().count(json!({})).await.unwrap();
    assert_eq!(count.total(), Some(1));
}

async fn singular_relation_takes_one_link(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {"email": "solo@example.com"}}))
        .await
        .unwrap();

    let err = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "greedy",
            "author": {
                "connect": {"email": "solo@example.com"},
                "create": {"email": "other@example.com"}
            }
        }}))
        .await
        .unwrap_err();
    assert!(err.is_multiple_connect_on_singular_relation());

    // Nothing was written
    let count = db.model("Post").unwrap().count(json!({})).await.unwrap();
    assert_eq!(count.total(), Some(0));
}

async fn connect_missing_record(test: &mut DbTest) {
    let db = test.setup_db().await;

    let err = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "dangling",
            "author": {"connect": {"email": "ghost@example.com"}}
        }}))
        .await
        .unwrap_err();
    assert!(err.is_relation_processing_failed(), "{err}");

    // Children and many-to-many links fail the same way
    let user = db
        .model("User")
        .unwrap()
        .create(json!({"data": {"email": "lonely@example.com"}}))
        .await
        .unwrap();
    let err = db
        .model("User")
        .unwrap()
        .update(json!({
            "where": {"id": id(&user)},
            "data": {"posts": {"connect": {"id": 404}}}
        }))
        .await
        .unwrap_err();
    assert!(err.is_relation_processing_failed(), "{err}");

    let err = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "uncategorized",
            "categories": {"connect": {"name": "missing"}}
        }}))
        .await
        .unwrap_err();
    assert!(err.is_relation_processing_failed(), "{err}");

    let posts = db.model("Post").unwrap().count(json!({})).await.unwrap();
    assert_eq!(posts.total(), Some(0));

    let err = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {"title": "vague", "author": {"connect": {"name": "Ghost"}}}}))
        .await
        .unwrap_err();
    assert!(err.is_no_unique_condition());
}

async fn unknown_relation_action(test: &mut DbTest) {
    let db = test.setup_db().await;

    let err = db
        .model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "act@example.com",
            "posts": {"attach": [{"id": 1}]}
        }}))
        .await
        .unwrap_err();
    assert!(err.is_unknown_criteria_key());
}

async fn post_id(db: &Db, title: &str) -> i64 {
    let post = db
        .model("Post")
        .unwrap()
        .find_first(json!({"where": {"title": title}}))
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("no post titled {title}"));
    id(&post)
}

async fn update_children(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    users
        .create(json!({"data": {
            "email": "kid@example.com",
            "posts": {"create": [{"title": "a"}, {"title": "b"}, {"title": "c"}]}
        }}))
        .await
        .unwrap();
    let a = post_id(&db, "a").await;

    users
        .update(json!({
            "where": {"email": "kid@example.com"},
            "data": {"posts": {
                "update": [{"where": {"id": a}, "data": {"title": "a2"}}],
                "updateMany": {"where": {"title": {"in": ["b", "c"]}}, "data": {"published": true}},
                "create": {"title": "d"}
            }}
        }))
        .await
        .unwrap();
    assert_eq!(posts_of(&db, "kid@example.com").await, ["a2", "b", "c", "d"]);

    let published = db
        .model("Post")
        .unwrap()
        .count(json!({"where": {"published": true}}))
        .await
        .unwrap();
    assert_eq!(published.total(), Some(2));

    let d = post_id(&db, "d").await;
    users
        .update(json!({
            "where": {"email": "kid@example.com"},
            "data": {"posts": {"deleteMany": {"published": true}, "delete": {"id": d}}}
        }))
        .await
        .unwrap();
    assert_eq!(posts_of(&db, "kid@example.com").await, ["a2"]);

    // Children are selected by a unique field
    let err = users
        .update(json!({
            "where": {"email": "kid@example.com"},
            "data": {"posts": {"delete": {"title": "a2"}}}
        }))
        .await
        .unwrap_err();
    assert!(err.is_no_unique_condition());
}

async fn disconnect_and_set_children(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    users
        .create(json!({"data": {
            "email": "set@example.com",
            "posts": {"create": [{"title": "keep"}, {"title": "drop"}]}
        }}))
        .await
        .unwrap();
    let loose = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {"title": "adopt"}}))
        .await
        .unwrap();
    let dropped = post_id(&db, "drop").await;

    users
        .update(json!({
            "where": {"email": "set@example.com"},
            "data": {"posts": {"disconnect": {"id": dropped}}}
        }))
        .await
        .unwrap();
    assert_eq!(posts_of(&db, "set@example.com").await, ["keep"]);

    let dropped = db
        .model("Post")
        .unwrap()
        .find_unique(json!({"where": {"id": dropped}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field(&dropped, "authorId"), &Value::Null);

    // Children left out of the set are removed
    users
        .update(json!({
            "where": {"email": "set@example.com"},
            "data": {"posts": {"set": [{"id": id(&loose)}]}}
        }))
        .await
        .unwrap();
    assert_eq!(posts_of(&db, "set@example.com").await, ["adopt"]);
    let keep = db
        .model("Post")
        .unwrap()
        .count(json!({"where": {"title": "keep"}}))
        .await
        .unwrap();
    assert_eq!(keep.total(), Some(0));
}

async fn disconnect_and_delete_owner(test: &mut DbTest) {
    let db = test.setup_db().await;

    let post = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "owned",
            "author": {"create": {"email": "owner@example.com"}}
        }}))
        .await
        .unwrap();
    assert!(!field(&post, "authorId").is_null());

    let post = db
        .model("Post")
        .unwrap()
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"author": {"disconnect": true}}
        }))
        .await
        .unwrap();
    assert_eq!(field(&post, "authorId"), &Value::Null);

    let post = db
        .model("Post")
        .unwrap()
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"author": {"connect": {"email": "owner@example.com"}}}
        }))
        .await
        .unwrap();
    assert!(!field(&post, "authorId").is_null());

    let post = db
        .model("Post")
        .unwrap()
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"author": {"delete": true}}
        }))
        .await
        .unwrap();
    assert_eq!(field(&post, "authorId"), &Value::Null);

    let users = db.model("User").unwrap().count(json!({})).await.unwrap();
    assert_eq!(users.total(), Some(0));
}

async fn update_owner_through_relation(test: &mut DbTest) {
    let db = test.setup_db().await;

    let post = db
        .model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "nested update",
            "author": {"create": {"email": "before@example.com"}}
        }}))
        .await
        .unwrap();

    let post = db
        .model("Post")
        .unwrap()
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"author": {"update": {"name": "Renamed"}}},
            "include": {"author": true}
        }))
        .await
        .unwrap();

    let author = field(&post, "author").as_record().unwrap();
    assert_eq!(author["name"], Value::from("Renamed"));
    assert_eq!(author["email"], Value::from("before@example.com"));
}

async fn many_to_many_writes(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut posts = db.model("Post").unwrap();

    for name in ["x", "y", "z"] {
        db.model("Category")
            .unwrap()
            .create(json!({"data": {"name": name}}))
            .await
            .unwrap();
    }

    let post = posts
        .create(json!({"data": {
            "title": "m2m",
            "categories": {"connect": [{"name": "x"}, {"name": "y"}]}
        }}))
        .await
        .unwrap();

    let names = |record: &Record| -> Vec<String> {
        let mut names: Vec<String> = field(record, "categories")
            .as_list()
            .unwrap()
            .iter()
            .map(|c| c.as_record().unwrap()["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    };
    let include = json!({"categories": true});

    // Connecting twice keeps a single link row
    let post = posts
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"categories": {"connect": {"name": "x"}, "disconnect": {"name": "y"}}},
            "include": include
        }))
        .await
        .unwrap();
    assert_eq!(names(&post), ["x"]);

    let post = posts
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"categories": {"set": [{"name": "y"}, {"name": "z"}]}},
            "include": include
        }))
        .await
        .unwrap();
    assert_eq!(names(&post), ["y", "z"]);

    let post = posts
        .update(json!({
            "where": {"id": id(&post)},
            "data": {"categories": {"delete": {"name": "z"}}},
            "include": include
        }))
        .await
        .unwrap();
    assert_eq!(names(&post), ["y"]);

    let categories = db.model("Category").unwrap().count(json!({})).await.unwrap();
    assert_eq!(categories.total(), Some(2));
}

tests!(
    create_with_children_and_owner,
    connect_or_create,
    singular_relation_takes_one_link,
    connect_missing_record,
    unknown_relation_action,
    update_children,
    disconnect_and_set_children,
    disconnect_and_delete_owner,
    update_owner_through_relation,
    many_to_many_writes,
);
