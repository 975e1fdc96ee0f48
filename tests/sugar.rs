//! End-to-end behavior of the query sugar against a recording executor:
//! filter construction, projection shapes, grouped iteration, reduction,
//! and the minimal-write update strategies with their statement counts.

use model_values::testing::RecordingExecutor;
use model_values::{
    AggregateFunc, DatabaseBackendType, GroupValues, Lookup, Manager, Model, OrmError, Q, Row,
    RowShape, Value, F,
};

struct Account {
    id: i64,
    owner: String,
    balance: i64,
}

impl Model for Account {
    fn table_name() -> &'static str {
        "bank_account"
    }
    fn from_row(row: &Row) -> Result<Self, OrmError> {
        Ok(Account {
            id: row.get("id")?,
            owner: row.get("owner")?,
            balance: row.get("balance")?,
        })
    }
}

fn objects() -> Manager<Account> {
    Manager::new()
}

fn pg() -> DatabaseBackendType {
    DatabaseBackendType::PostgreSQL
}

fn row(columns: &[&str], values: Vec<Value>) -> Row {
    Row::new(columns.iter().map(|c| (*c).to_string()).collect(), values)
}

#[test]
fn field_paths_join_with_double_underscore() {
    assert_eq!(F::new("owner").name(), "owner");
    assert_eq!(F::new("owner").f("created").name(), "owner__created");
}

#[test]
fn operator_filters_match_native_lookups() {
    assert_eq!(
        F::new("balance").gte(100),
        Q::filter("balance", Lookup::Gte(Value::Int(100)))
    );
    assert_eq!(
        F::new("owner").contains("ann"),
        Q::filter("owner", Lookup::Contains("ann".to_string()))
    );
    assert_eq!(
        F::new("balance").range(0, 10),
        Q::filter("balance", Lookup::Range(Value::Int(0), Value::Int(10)))
    );
}

#[test]
fn not_equal_to_null_is_never_always_false() {
    let qs = objects().filter(F::new("closed_at").ne(Value::Null));
    let (sql, params) = qs.to_sql(pg());
    assert_eq!(
        sql,
        "SELECT * FROM \"bank_account\" WHERE \"closed_at\" IS NOT NULL"
    );
    assert!(params.is_empty());
}

#[tokio::test]
async fn single_column_projection_yields_scalars() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![
        row(&["owner"], vec![Value::from("ann")]),
        row(&["owner"], vec![Value::from("bob")]),
    ]);
    let qs = objects().all().col("owner");
    assert_eq!(qs.shape(), RowShape::Flat);
    let rows = qs.rows(&db).await.unwrap();
    let owners: Vec<&Value> = rows.iter().map(|r| &r.values()[0]).collect();
    assert_eq!(owners, vec![&Value::from("ann"), &Value::from("bob")]);
}

#[tokio::test]
async fn two_column_projection_yields_pairs() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![row(
        &["owner", "balance"],
        vec![Value::from("ann"), Value::Int(10)],
    )]);
    let qs = objects().all().cols(&["owner", "balance"]);
    assert_eq!(qs.shape(), RowShape::Tuple);
    let rows = qs.rows(&db).await.unwrap();
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0].get_value("owner"), Some(&Value::from("ann")));
    assert_eq!(rows[0].get_value("balance"), Some(&Value::Int(10)));
}

#[test]
fn filtering_a_projection_preserves_row_shape() {
    let base = objects().all().col("owner");
    let filtered = base.filter(F::new("balance").gt(0));
    assert_eq!(filtered.shape(), RowShape::Flat);
    let (sql, _) = filtered.to_sql(pg());
    assert_eq!(
        sql,
        "SELECT \"owner\" FROM \"bank_account\" WHERE \"balance\" > $1"
    );
}

#[tokio::test]
async fn modify_skips_rows_already_in_desired_state() {
    let db = RecordingExecutor::new();
    // All rows already have the target status: the excluding update matches
    // nothing and reports zero changes.
    db.push_affected(0);
    let changed = objects()
        .all()
        .modify(&[], &[("status", Value::from("active"))], &db)
        .await
        .unwrap();
    assert_eq!(changed, 0);
    assert_eq!(
        db.statements(),
        vec!["UPDATE \"bank_account\" SET \"status\" = $1 WHERE NOT (\"status\" = $2)".to_string()]
    );
}

#[tokio::test]
async fn update_rows_writes_only_differing_rows() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![
        row(&["id", "balance"], vec![Value::Int(1), Value::Int(100)]),
        row(&["id", "balance"], vec![Value::Int(2), Value::Int(100)]),
    ]);
    let data = vec![
        // Already at the desired value: no statement may target pk 1.
        (Value::Int(1), vec![("balance", Value::Int(100))]),
        (Value::Int(2), vec![("balance", Value::Int(250))]),
    ];
    let changed = objects().update_rows(&data, &db).await.unwrap();
    assert_eq!(changed, vec![Value::Int(2)]);

    let statements = db.statements();
    assert_eq!(statements.len(), 2, "one read plus one write");
    assert!(statements[0].starts_with("SELECT"));
    assert!(statements[1].starts_with("UPDATE"));
    let params = db.parameters();
    assert_eq!(params[1], vec![Value::Int(250), Value::Int(2)]);
}

#[tokio::test]
async fn update_columns_issues_one_statement_per_distinct_value() {
    let db = RecordingExecutor::new();
    let data = vec![
        (Value::Int(1), Value::Bool(true)),
        (Value::Int(2), Value::Bool(true)),
        (Value::Int(3), Value::Bool(false)),
    ];
    let counts = objects().update_columns("flag", &data, &db).await.unwrap();
    assert_eq!(db.statement_count(), 2);
    assert_eq!(counts, vec![(Value::Bool(true), 2), (Value::Bool(false), 1)]);
}

#[tokio::test]
async fn grouped_iteration_yields_one_pair_per_contiguous_run() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![
        row(&["owner", "balance"], vec![Value::from("ann"), Value::Int(1)]),
        row(&["owner", "balance"], vec![Value::from("ann"), Value::Int(2)]),
        row(&["owner", "balance"], vec![Value::from("bob"), Value::Int(3)]),
    ]);
    let qs = objects().all().col("balance").groupby(&["owner"]);
    let pairs: Vec<_> = qs.groups(&db).await.unwrap().collect();

    // The grouped fetch orders by the group fields so runs are contiguous.
    assert!(db.statements()[0].ends_with("ORDER BY \"owner\" ASC"));

    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0, vec![Value::from("ann")]);
    assert_eq!(
        pairs[0].1,
        GroupValues::Flat(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(pairs[1].0, vec![Value::from("bob")]);
    assert_eq!(pairs[1].1, GroupValues::Flat(vec![Value::Int(3)]));
}

#[tokio::test]
async fn reduce_min_max_returns_named_pair() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![row(
        &["balance__min", "balance__max"],
        vec![Value::Int(1), Value::Int(9)],
    )]);
    let reduced = objects()
        .all()
        .cols(&["balance", "balance"])
        .reduce(&[AggregateFunc::Min, AggregateFunc::Max], &db)
        .await
        .unwrap();
    let pair = reduced.into_row().unwrap();
    assert_eq!(pair.get_value("balance__min"), Some(&Value::Int(1)));
    assert_eq!(pair.get_value("balance__max"), Some(&Value::Int(9)));
}

#[tokio::test]
async fn grouped_reduce_stays_lazy_and_annotates() {
    let db = RecordingExecutor::new();
    let reduced = objects()
        .all()
        .col("balance")
        .groupby(&["owner"])
        .reduce(&[AggregateFunc::Sum], &db)
        .await
        .unwrap();
    assert_eq!(db.statement_count(), 0);

    let per_owner = reduced.into_grouped().unwrap();
    let (sql, _) = per_owner.to_sql(pg());
    assert_eq!(
        sql,
        "SELECT \"owner\", SUM(\"balance\") AS \"balance__sum\" FROM \"bank_account\" GROUP BY \"owner\""
    );

    db.push_rows(vec![row(
        &["owner", "balance__sum"],
        vec![Value::from("ann"), Value::Int(3)],
    )]);
    let rows = per_owner.rows(&db).await.unwrap();
    assert_eq!(rows[0].get_value("balance__sum"), Some(&Value::Int(3)));
}

#[tokio::test]
async fn membership_on_cold_flat_projection_is_one_bounded_query() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![row(&["a"], vec![Value::Int(1)])]);
    let qs = objects().all().col("owner");
    assert!(qs.contains("ann", &db).await.unwrap());
    assert_eq!(db.statement_count(), 1);
    assert!(db.statements()[0].contains("LIMIT 1"));
}

#[tokio::test]
async fn manager_pk_indexing_round_trip() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![row(
        &["id", "owner", "balance"],
        vec![Value::Int(7), Value::from("ann"), Value::Int(5)],
    )]);
    let account = objects().pk(7).get(&db).await.unwrap();
    assert_eq!(account.id, 7);
    assert_eq!(account.owner, "ann");
    assert_eq!(account.balance, 5);

    db.reset();
    db.push_affected(1);
    assert_eq!(objects().delete_pk(7, &db).await.unwrap(), 1);
    assert_eq!(
        db.statements(),
        vec!["DELETE FROM \"bank_account\" WHERE \"id\" = $1".to_string()]
    );
}

#[tokio::test]
async fn changed_is_a_cheap_would_anything_change_check() {
    let db = RecordingExecutor::new();
    db.push_rows(vec![row(&["balance"], vec![Value::Int(100)])]);
    let diff = objects()
        .changed(7, &[("balance", Value::Int(250))], &db)
        .await
        .unwrap();
    assert_eq!(diff.get("balance"), Some(&Value::Int(100)));
    assert_eq!(db.statement_count(), 1);
}
