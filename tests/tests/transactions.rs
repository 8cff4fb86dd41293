use tests::prelude::*;

async fn user_count(db: &Db) -> u64 {
    db.model("User")
        .unwrap()
        .count(json!({}))
        .await
        .unwrap()
        .total()
        .unwrap()
}

async fn nested_write_is_atomic(test: &mut DbTest) {
    let db = test.setup_db().await;

    // The second post misses its required title
    let err = db
        .model("User")
        .unwrap()
        .create(json!({"data": {
            "email": "atomic@example.com",
            "posts": {"create": [{"title": "fine"}, {"content": "no title"}]}
        }}))
        .await
        .unwrap_err();
    assert!(err.is_validation(), "{err}");

    assert_eq!(user_count(&db).await, 0);
    let posts = db.model("Post").unwrap().count(json!({})).await.unwrap();
    assert_eq!(posts.total(), Some(0));

    let log = test.log();
    assert_eq!(log.transactions(), [Transaction::Start, Transaction::Rollback]);
}

async fn failed_relation_write_keeps_the_row(test: &mut DbTest) {
    let db = test.setup_db().await;
    let mut users = db.model("User").unwrap();

    let user = users
        .create(json!({"data": {"email": "same@example.com", "name": "Before"}}))
        .await
        .unwrap();

    let err = users
        .update(json!({
            "where": {"id": id(&user)},
            "data": {"name": "After", "posts": {"connect": {"id": 404}}}
        }))
        .await
        .unwrap_err();
    assert!(err.is_relation_processing_failed(), "{err}");

    let user = users
        .find_unique(json!({"where": {"id": id(&user)}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(field(&user, "name"), &Value::from("Before"));
}

async fn every_write_runs_in_a_transaction(test: &mut DbTest) {
    let db = test.setup_db().await;

    db.model("User")
        .unwrap()
        .create(json!({"data": {"email": "tx@example.com"}}))
        .await
        .unwrap();
    assert_eq!(
        test.log().transactions(),
        [Transaction::Start, Transaction::Commit]
    );

    // Reads do not open one
    test.log().clear();
    db.model("User")
        .unwrap()
        .find_many(json!({}))
        .await
        .unwrap();
    assert!(test.log().transactions().is_empty());
}

async fn commit_keeps_writes(test: &mut DbTest) {
    let db = test.setup_db().await;

    let mut tx = db.transaction().await.unwrap();
    tx.model("User")
        .unwrap()
        .create(json!({"data": {"email": "one@example.com"}}))
        .await
        .unwrap();
    tx.model("User")
        .unwrap()
        .create(json!({"data": {"email": "two@example.com"}}))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(user_count(&db).await, 2);

    // Verbs inside the transaction nest as savepoints
    assert_eq!(
        test.log().transactions(),
        [
            Transaction::Start,
            Transaction::Start,
            Transaction::Commit,
            Transaction::Start,
            Transaction::Commit,
            Transaction::Commit,
        ]
    );
}

async fn rollback_discards_writes(test: &mut DbTest) {
    let db = test.setup_db().await;

    let mut tx = db.transaction().await.unwrap();
    tx.model("User")
        .unwrap()
        .create(json!({"data": {"email": "gone@example.com"}}))
        .await
        .unwrap();
    let seen = tx
        .model("User")
        .unwrap()
        .count(json!({}))
        .await
        .unwrap();
    assert_eq!(seen.total(), Some(1));
    tx.rollback().await.unwrap();

    assert_eq!(user_count(&db).await, 0);
}

async fn failed_verb_keeps_the_transaction(test: &mut DbTest) {
    let db = test.setup_db().await;

    let mut tx = db.transaction().await.unwrap();
    tx.model("User")
        .unwrap()
        .create(json!({"data": {"email": "kept@example.com"}}))
        .await
        .unwrap();

    // Only the savepoint of the failed verb is rolled back
    let err = tx
        .model("User")
        .unwrap()
        .create(json!({"data": {"email": "kept@example.com"}}))
        .await;
    assert!(err.is_err());

    tx.commit().await.unwrap();
    assert_eq!(user_count(&db).await, 1);

    // The outer transaction still commits
    assert_eq!(
        test.log().transactions(),
        [
            Transaction::Start,
            Transaction::Start,
            Transaction::Commit,
            Transaction::Start,
            Transaction::Rollback,
            Transaction::Commit,
        ]
    );
}

async fn dropped_transaction_rolls_back(test: &mut DbTest) {
    let db = test.setup_db().await;

    {
        let mut tx = db.transaction().await.unwrap();
        tx.model("User")
            .unwrap()
            .create(json!({"data": {"email": "dropped@example.com"}}))
            .await
            .unwrap();
    }

    assert_eq!(user_count(&db).await, 0);
    assert_eq!(
        test.log().transactions().last(),
        Some(&Transaction::Rollback)
    );
}

tests!(
    nested_write_is_atomic,
    failed_relation_write_keeps_the_row,
    every_write_runs_in_a_transaction,
    commit_keeps_writes,
    rollback_discards_writes,
    failed_verb_keeps_the_transaction,
    dropped_transaction_rolls_back,
);
