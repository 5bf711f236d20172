//! End-to-end tests of the query and write helpers against SQLite

use chrono::NaiveDate;
use sqlframe::{
    get_schema, read_frame, table_exists, tquery, uquery, write_frame, DType, DbConnection, Dialect, Frame,
    IfExists, Params, QueryRows, Series, SqlFrameError, SqliteConnection, Value,
};
use tempfile::NamedTempFile;

fn employees() -> Frame {
    let hired = |month| {
        Value::DateTime(NaiveDate::from_ymd_opt(2012, month, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
    };
    Frame::new(vec![
        Series::infer("name", vec![Value::from("Joe"), Value::from("Bob"), Value::from("Jim")]),
        Series::infer("hire_date", vec![hired(1), hired(2), hired(3)]),
        Series::infer("erank", vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
        Series::infer("score", vec![Value::Float(1.1), Value::Float(2.2), Value::Float(3.1)]),
    ])
    .unwrap()
}

fn count(con: &SqliteConnection, table: &str) -> Value {
    match tquery(&format!("SELECT COUNT(*) FROM {}", table), con, None, true).unwrap() {
        QueryRows::Scalars(values) => values[0].clone(),
        other => panic!("Expected scalars, got {:?}", other),
    }
}

#[test]
fn test_schema_example() {
    let sql = get_schema(&employees(), "test_df", Dialect::Sqlite, None).unwrap();
    insta::assert_snapshot!(sql, @r"
CREATE TABLE test_df (
  [name] TEXT,
  [hire_date] TIMESTAMP,
  [erank] INTEGER,
  [score] REAL
);
");
}

#[test]
fn test_write_then_read_round_trip() {
    let con = SqliteConnection::open_in_memory().unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();
    assert!(table_exists("test_df", &con, Dialect::Sqlite).unwrap());

    let frame = read_frame("SELECT * FROM test_df", &con, None, true).unwrap();
    assert_eq!(frame.column_names(), vec!["name", "hire_date", "erank", "score"]);
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.column("name").unwrap().dtype, DType::Text);
    assert_eq!(frame.column("hire_date").unwrap().dtype, DType::DateTime);
    assert_eq!(frame.column("erank").unwrap().dtype, DType::Integer);
    assert_eq!(frame.column("score").unwrap().dtype, DType::Float);
    assert_eq!(frame, employees());
}

#[test]
fn test_fail_policy_leaves_table_untouched() {
    let con = SqliteConnection::open_in_memory().unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();

    match write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail) {
        Err(SqlFrameError::TableExists(name)) => assert_eq!(name, "test_df"),
        other => panic!("Expected TableExists, got {:?}", other),
    }
    assert_eq!(count(&con, "test_df"), Value::Integer(3));
}

#[test]
fn test_append_policy() {
    let con = SqliteConnection::open_in_memory().unwrap();
    assert!(matches!(
        write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Append),
        Err(SqlFrameError::TableMissing(_))
    ));
    assert!(!table_exists("test_df", &con, Dialect::Sqlite).unwrap());

    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Append).unwrap();
    assert_eq!(count(&con, "test_df"), Value::Integer(6));
}

#[test]
fn test_replace_policy_recreates_table() {
    let con = SqliteConnection::open_in_memory().unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();

    let narrow = Frame::new(vec![Series::infer("only", vec![Value::from("x")])]).unwrap();
    write_frame(&narrow, "test_df", &con, Dialect::Sqlite, IfExists::Replace).unwrap();

    let frame = read_frame("SELECT * FROM test_df", &con, None, true).unwrap();
    assert_eq!(frame.column_names(), vec!["only"]);
    assert_eq!(frame.len(), 1);
}

#[test]
fn test_tquery_shapes() {
    let con = SqliteConnection::open_in_memory().unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();

    let names = tquery("SELECT name FROM test_df ORDER BY erank", &con, None, true).unwrap();
    assert_eq!(
        names,
        QueryRows::Scalars(vec![Value::from("Joe"), Value::from("Bob"), Value::from("Jim")])
    );

    let pairs = tquery("SELECT erank, name FROM test_df ORDER BY erank LIMIT 1", &con, None, true).unwrap();
    assert_eq!(pairs, QueryRows::Tuples(vec![vec![Value::Integer(1), Value::from("Joe")]]));

    let none = tquery("SELECT name FROM test_df WHERE erank > 10", &con, None, true).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_tquery_on_statement_without_rows() {
    let con = SqliteConnection::open_in_memory().unwrap();
    let rows = tquery("CREATE TABLE t (a INTEGER)", &con, None, true).unwrap();
    assert!(rows.is_empty());
    assert!(table_exists("t", &con, Dialect::Sqlite).unwrap());
}

#[test]
fn test_read_frame_index_col() {
    let con = SqliteConnection::open_in_memory().unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();

    let frame = read_frame("SELECT erank, name FROM test_df ORDER BY erank", &con, Some("erank"), true).unwrap();
    assert_eq!(frame.column_names(), vec!["name"]);
    assert_eq!(
        frame.index().unwrap().values,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );
}

#[test]
fn test_read_frame_coerces_numeric_text() {
    let con = SqliteConnection::open_in_memory().unwrap();
    uquery("CREATE TABLE prices (amount TEXT)", &con, None, true, None).unwrap();
    uquery("INSERT INTO prices VALUES ('1.25'), ('3')", &con, None, true, None).unwrap();

    let frame = read_frame("SELECT amount FROM prices", &con, None, true).unwrap();
    let amount = frame.column("amount").unwrap();
    assert_eq!(amount.dtype, DType::Float);
    assert_eq!(amount.values, vec![Value::Float(1.25), Value::Float(3.0)]);

    let raw = read_frame("SELECT amount FROM prices", &con, None, false).unwrap();
    assert_eq!(raw.column("amount").unwrap().dtype, DType::Text);
}

#[test]
fn test_uquery_commits_for_other_connections() {
    let file = NamedTempFile::new().unwrap();
    let writer = SqliteConnection::open(file.path()).unwrap();
    write_frame(&employees(), "test_df", &writer, Dialect::Sqlite, IfExists::Fail).unwrap();

    let params = Params::Positional(vec![Value::Integer(2)]);
    let changed = uquery("DELETE FROM test_df WHERE erank >= ?", &writer, None, true, Some(&params)).unwrap();
    assert_eq!(changed, 2);

    let reader = SqliteConnection::open(file.path()).unwrap();
    assert_eq!(count(&reader, "test_df"), Value::Integer(1));
}

#[test]
fn test_failed_statement_rolls_back_open_transaction() {
    let con = SqliteConnection::open_in_memory().unwrap();
    write_frame(&employees(), "test_df", &con, Dialect::Sqlite, IfExists::Fail).unwrap();

    {
        let mut cur = con.cursor().unwrap();
        cur.execute("DELETE FROM test_df", None).unwrap();
    }
    let err = uquery("UPDATE missing SET a = 1", &con, None, true, None).unwrap_err();
    assert!(matches!(err, SqlFrameError::Database(_)));

    // The pending delete was rolled back with the failed statement
    assert_eq!(count(&con, "test_df"), Value::Integer(3));
}
