use pretty_assertions::assert_eq;
use tests::prelude::*;

fn list<'a>(record: &'a Record, name: &str) -> &'a [Value] {
    field(record, name)
        .as_list()
        .unwrap_or_else(|| panic!("`{name}` is not a list: {record:#?}"))
}

async fn include_has_many_is_batched(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    for i in 0..100 {
        users
            .create(json!({"data": {
                "email": format!("user{i}@example.com"),
                "posts": {"create": [{"title": format!("{i}-a")}, {"title": format!("{i}-b")}]}
            }}))
            .await
            .unwrap();
    }

    let mut log = test.log();
    log.clear();

    let loaded = users
        .find_many(json!({"include": {"posts": true}, "orderBy": {"id": "asc"}}))
        .await
        .unwrap();

    assert_eq!(loaded.len(), 100);
    for (i, user) in loaded.iter().enumerate() {
        let posts = list(user, "posts");
        assert_eq!(posts.len(), 2, "{user:#?}");
        let mut titles: Vec<&str> = posts
            .iter()
            .map(|p| p.as_record().unwrap()["title"].as_str().unwrap())
            .collect();
        titles.sort();
        assert_eq!(titles, [format!("{i}-a"), format!("{i}-b")]);
    }

    // One read for the users and one for all of their posts
    let selects = log.statements_starting_with("SELECT");
    assert_eq!(selects.len(), 2, "{selects:#?}");
    assert!(selects[1].contains("IN ("), "{}", selects[1]);
}

async fn include_belongs_to(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "author@example.com",
            "posts": {"create": [{"title": "with author"}]}
        }}))
        .await
        .unwrap();
    db.model("Post")
        .unwrap()
        .create(json!({"data": {"title": "orphan"}}))
        .await
        .unwrap();

    let posts = db
        .model("Post")
        .unwrap()
        .find_many(json!({
            "include": {"author": {"select": {"email": true}}},
            "orderBy": {"title": "desc"}
        }))
        .await
        .unwrap();

    assert_eq!(strings(&posts, "title"), ["with author", "orphan"]);
    let author = field(&posts[0], "author").as_record().unwrap();
    assert_eq!(author.keys().collect::<Vec<_>>(), vec!["email"]);
    assert_eq!(author["email"], Value::from("author@example.com"));
    assert_eq!(field(&posts[1], "author"), &Value::Null);
}

async fn include_through_join(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "joined@example.com",
            "posts": {"create": [{"title": "joined"}]}
        }}))
        .await
        .unwrap();

    let mut log = test.log();
    log.clear();

    let posts = db
        .model("Post")
        .unwrap()
        .find_many(json!({"include": {"author": {"join": {"type": "left"}}}}))
        .await
        .unwrap();

    let author = field(&posts[0], "author").as_record().unwrap();
    assert_eq!(author["email"], Value::from("joined@example.com"));

    let selects = log.statements_starting_with("SELECT");
    assert_eq!(selects.len(), 1, "{selects:#?}");
    assert!(selects[0].contains("LEFT JOIN"), "{}", selects[0]);
}

async fn joined_include_with_nested_select(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "picked@example.com",
            "name": "Picked",
            "posts": {"create": [{"title": "picked"}]}
        }}))
        .await
        .unwrap();

    let mut log = test.log();
    log.clear();

    let posts = db
        .model("Post")
        .unwrap()
        .find_many(json!({"include": {"author": {"join.type": "LEFT"}}}))
        .await
        .unwrap();
    let author = field(&posts[0], "author").as_record().unwrap();
    assert_eq!(author["name"], Value::from("Picked"));

    let selects = log.statements_starting_with("SELECT");
    assert_eq!(selects.len(), 1, "{selects:#?}");
    assert!(selects[0].contains("LEFT JOIN"), "{}", selects[0]);

    // A nested select narrows the joined columns
    let posts = db
        .model("Post")
        .unwrap()
        .find_many(json!({"include": {"author": {
            "join": {"type": "left"},
            "select": {"email": true}
        }}}))
        .await
        .unwrap();
    let author = field(&posts[0], "author").as_record().unwrap();
    assert_eq!(author["email"], Value::from("picked@example.com"));
    assert!(author.get("name").is_none(), "{author:#?}");
}

async fn nested_include_and_relation_counts(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "nest@example.com",
            "profile": {"create": {"bio": "hello"}},
            "posts": {"create": [
                {"title": "p1", "categories": {"create": [{"name": "rust"}, {"name": "db"}]}},
                {"title": "p2"}
            ]}
        }}))
        .await
        .unwrap();

    let user = db
        .model("User")
        .unwrap()
        .find_unique(json!({
            "where": {"email": "nest@example.com"},
            "include": {
                "profile": true,
                "posts": {
                    "orderBy": {"title": "asc"},
                    "include": {"categories": {"orderBy": {"name": "asc"}}}
                },
                "_count": {"select": {"posts": true}}
            }
        }))
        .await
        .unwrap()
        .unwrap();

    let profile = field(&user, "profile").as_record().unwrap();
    assert_eq!(profile["bio"], Value::from("hello"));

    let posts = list(&user, "posts");
    assert_eq!(posts.len(), 2);
    let first = posts[0].as_record().unwrap();
    assert_eq!(first["title"], Value::from("p1"));
    let categories: Vec<&str> = first["categories"]
        .as_list()
        .unwrap()
        .iter()
        .map(|c| c.as_record().unwrap()["name"].as_str().unwrap())
        .collect();
    assert_eq!(categories, ["db", "rust"]);
    assert_eq!(
        posts[1].as_record().unwrap()["categories"],
        Value::List(vec![])
    );

    let counts = field(&user, "_count").as_record().unwrap();
    assert_eq!(counts["posts"], Value::from(2));
}

async fn many_to_many_from_both_sides(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "tagged",
            "categories": {"create": [{"name": "a"}, {"name": "b"}]}
        }}))
        .await
        .unwrap();
    db.model("Post")
        .unwrap()
        .create(json!({"data": {
            "title": "also tagged",
            "categories": {"connect": [{"name": "a"}]}
        }}))
        .await
        .unwrap();

    let categories = db
        .model("Category")
        .unwrap()
        .find_many(json!({
            "include": {"posts": {"orderBy": {"title": "asc"}}},
            "orderBy": {"name": "asc"}
        }))
        .await
        .unwrap();

    assert_eq!(strings(&categories, "name"), ["a", "b"]);
    let titles = |record: &Record| -> Vec<String> {
        list(record, "posts")
            .iter()
            .map(|p| p.as_record().unwrap()["title"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(titles(&categories[0]), ["also tagged", "tagged"]);
    assert_eq!(titles(&categories[1]), ["tagged"]);
}

async fn select_relation_subset(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "sel@example.com",
            "posts": {"create": [{"title": "x", "published": true}, {"title": "y"}]}
        }}))
        .await
        .unwrap();

    let user = db
        .model("User")
        .unwrap()
        .find_first(json!({
            "where": {"email": "sel@example.com"},
            "select": {
                "email": true,
                "posts": {"where": {"published": true}, "select": {"title": true}}
            }
        }))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.keys().collect::<Vec<_>>(), vec!["email", "posts"]);
    let posts = list(&user, "posts");
    assert_eq!(posts.len(), 1);
    let post = posts[0].as_record().unwrap();
    assert_eq!(post.keys().collect::<Vec<_>>(), vec!["title"]);
    assert_eq!(post["title"], Value::from("x"));
}

tests!(
    include_has_many_is_batched,
    include_belongs_to,
    include_through_join,
    joined_include_with_nested_select,
    nested_include_and_relation_counts,
    many_to_many_from_both_sides,
    select_relation_subset,
);
