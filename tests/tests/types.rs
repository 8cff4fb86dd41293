use tests::prelude::*;

async fn generated_string_ids(test: &mut DbTest) {
    let db = test.setup_db().await;

    let tag = db
        .model("Tag")
        .unwrap()
        .create(json!({"data": {"label": "rust"}}))
        .await
        .unwrap();
    let uuid = field(&tag, "id").as_str().unwrap();
    assert_eq!(uuid.len(), 36, "{uuid}");
    assert_eq!(uuid.matches('-').count(), 4, "{uuid}");

    let product = db
        .model("Product")
        .unwrap()
        .create(json!({"data": {"name": "widget", "price": "9.99"}}))
        .await
        .unwrap();
    let cuid = field(&product, "id").as_str().unwrap();
    assert!(!cuid.is_empty());
    assert!(cuid.chars().next().unwrap().is_ascii_lowercase(), "{cuid}");

    // The generated key finds the record again
    let found = db
        .model("Tag")
        .unwrap()
        .find_unique(json!({"where": {"id": uuid}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field(&found, "label"), &Value::from("rust"));
}

async fn decimal_and_json_fields(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut products = db.model("Product").unwrap();

    let meta = json!({"colors": ["red", "blue"], "stock": {"warehouse": 3}});
    let product = products
        .create(json!({"data": {"name": "lamp", "price": 12.5, "meta": meta}}))
        .await
        .unwrap();

    assert_eq!(field(&product, "price").as_f64(), Some(12.5));
    assert_eq!(field(&product, "meta").to_json(), meta);

    let cheap = products
        .find_many(json!({"where": {"price": {"lt": 20}}}))
        .await
        .unwrap();
    assert_eq!(strings(&cheap, "name"), ["lamp"]);

    let err = products
        .create(json!({"data": {"name": "bad", "price": "twelve"}}))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

async fn compound_primary_key(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut memberships = db.model("Membership").unwrap();

    for (org, user, role) in [(1, 1, "owner"), (1, 2, "member"), (2, 1, "member")] {
        memberships
            .create(json!({"data": {"orgId": org, "userId": user, "role": role}}))
            .await
            .unwrap();
    }

    let found = memberships
        .find_unique(json!({"where": {"orgId_userId": {"orgId": 1, "userId": 2}}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field(&found, "role"), &Value::from("member"));

    // Both fields of the key together are unique too
    let found = memberships
        .find_unique(json!({"where": {"orgId": 2, "userId": 1}}))
        .await
        .unwrap();
    assert!(found.is_some());

    let err = memberships
        .find_unique(json!({"where": {"orgId": 1}}))
        .await
        .unwrap_err();
    assert!(err.is_no_unique_condition());

    let updated = memberships
        .update(json!({
            "where": {"orgId_userId": {"orgId": 1, "userId": 1}},
            "data": {"role": "admin"}
        }))
        .await
        .unwrap();
    assert_eq!(field(&updated, "role"), &Value::from("admin"));

    let deleted = memberships
        .delete(json!({"where": {"orgId_userId": {"orgId": 2, "userId": 1}}}))
        .await
        .unwrap();
    assert!(!deleted.is_not_found());
    let count = memberships.count(json!({})).await.unwrap();
    assert_eq!(count.total(), Some(2));
}

async fn datetime_defaults_and_updated_at(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    let user = users
        .create(json!({"data": {"email": "time@example.com"}}))
        .await
        .unwrap();
    let Value::DateTime(created) = field(&user, "createdAt").clone() else {
        panic!("createdAt is not a timestamp: {user:#?}");
    };
    let Value::DateTime(first_update) = field(&user, "updatedAt").clone() else {
        panic!("updatedAt is not a timestamp: {user:#?}");
    };
    assert!(first_update >= created);

    let user = users
        .update(json!({"where": {"id": id(&user)}, "data": {"name": "Later"}}))
        .await
        .unwrap();
    let Value::DateTime(second_update) = field(&user, "updatedAt").clone() else {
        panic!("updatedAt is not a timestamp: {user:#?}");
    };
    assert!(second_update >= first_update);
    assert_eq!(field(&user, "createdAt"), &Value::DateTime(created));
}

tests!(
    generated_string_ids,
    decimal_and_json_fields,
    compound_primary_key,
    datetime_defaults_and_updated_at,
);
