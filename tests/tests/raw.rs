use quarry::driver::Dialect;
use tests::prelude::*;

fn positional(_: usize) -> String {
    "?".to_string()
}

fn numbered(n: usize) -> String {
    format!("${n}")
}

/// The table name and the n-th placeholder in the syntax of the database.
fn dialect(test: &DbTest) -> (&'static str, fn(usize) -> String) {
    match test.capability().dialect {
        Dialect::Mysql => ("`User`", positional),
        Dialect::Postgresql => ("\"User\"", numbered),
        Dialect::Sqlite => ("\"User\"", positional),
    }
}

async fn query_raw_returns_rows(test: &mut DbTest) {
    let db = test.setup_db().await;
    let (user, p) = dialect(test);

    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        db.model("User")
            .unwrap()
            .create(json!({"data": {"email": email}}))
            .await
            .unwrap();
    }

    let rows = db
        .query_raw(
            &format!("SELECT email FROM {user} WHERE email <> {} ORDER BY email", p(1)),
            vec![Value::from("b@example.com")],
        )
        .await
        .unwrap();
    assert_eq!(strings(&rows, "email"), ["a@example.com", "c@example.com"]);

    // Raw statements are sent as written
    let log = test.log();
    assert!(log.statements().iter().any(|sql| sql.contains("email <>")));
}

async fn execute_raw_returns_affected_rows(test: &mut DbTest) {
    let db = test.setup_db().await;
    let (user, p) = dialect(test);

    for email in ["x@example.com", "y@example.com"] {
        db.model("User")
            .unwrap()
            .create(json!({"data": {"email": email}}))
            .await
            .unwrap();
    }

    let affected = db
        .execute_raw(
            &format!("UPDATE {user} SET name = {} WHERE email LIKE {}", p(1), p(2)),
            vec![Value::from("Renamed"), Value::from("%@example.com")],
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let renamed = db
        .model("User")
        .unwrap()
        .count(json!({"where": {"name": "Renamed"}}))
        .await
        .unwrap();
    assert_eq!(renamed.total(), Some(2));
}

async fn raw_errors_surface(test: &mut DbTest) {
    let db = test.setup_db().await;

    let err = db
        .query_raw("SELECT * FROM no_such_table", vec![])
        .await
        .unwrap_err();
    assert!(err.is_driver_operation_failed(), "{err}");
}

tests!(
    query_raw_returns_rows,
    execute_raw_returns_affected_rows,
    raw_errors_surface,
);
