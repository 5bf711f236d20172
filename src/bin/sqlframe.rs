use chrono::NaiveDate;
use sqlframe::config::{default_config_path, load_config, Config};
use sqlframe::{
    get_schema, read_frame, tquery, write_frame, Dialect, Frame, IfExists, QueryRows, Result, Series,
    SqlFrameError, SqliteConnection, Value,
};
use std::process::ExitCode;
use tracing::{error, info};

const TABLE: &str = "test_df";

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("sqlframe: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct Args {
    db_path: String,
    config: Option<String>,
    /// Overrides `write.if_exists` from the config
    if_exists: Option<IfExists>,
}

fn flag_value(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| SqlFrameError::Config(format!("{} requires a value", flag)))
}

fn parse_args(args: Vec<String>) -> Result<Args> {
    let mut parsed = Args {
        db_path: ":memory:".to_string(),
        config: None,
        if_exists: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(flag_value(&arg, iter.next())?),
            "--if-exists" => parsed.if_exists = Some(flag_value(&arg, iter.next())?.parse()?),
            flag if flag.starts_with('-') && flag != "-" => {
                return Err(SqlFrameError::Config(format!(
                    "unknown option '{}' (usage: sqlframe [DB_PATH] [--config FILE] [--if-exists POLICY])",
                    flag
                )))
            }
            _ => parsed.db_path = arg,
        }
    }
    Ok(parsed)
}

fn load(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => load_config(path),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => load_config(path),
            None => Ok(Config::default()),
        },
    }
}

/// The employee table used to exercise a full write/read round trip
fn employees() -> Result<Frame> {
    let names = ["Joe", "Bob", "Jim", "Suzy", "Cathy", "Sarah"];
    let scores = [1.1, 2.2, 3.1, 2.5, 3.6, 1.8];
    let hire_dates = (1..=6)
        .map(|month| {
            NaiveDate::from_ymd_opt(2012, month, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(Value::DateTime)
                .unwrap_or(Value::Null)
        })
        .collect();

    Frame::new(vec![
        Series::infer("name", names.iter().map(|n| Value::from(*n)).collect()),
        Series::infer("hire_date", hire_dates),
        Series::infer("erank", (1..=6).map(Value::Integer).collect()),
        Series::infer("score", scores.iter().map(|s| Value::Float(*s)).collect()),
    ])
}

fn run(args: Vec<String>) -> Result<()> {
    let args = parse_args(args)?;
    let config = load(&args)?;
    if config.write.flavor != Dialect::Sqlite {
        return Err(SqlFrameError::Config(format!(
            "write.flavor is '{}', but this tool only writes to SQLite",
            config.write.flavor
        )));
    }
    let if_exists = args.if_exists.unwrap_or(config.write.if_exists);

    info!("Opening database: {}", args.db_path);
    let con = SqliteConnection::open(&args.db_path)?;

    let frame = employees()?;
    println!("{}", get_schema(&frame, TABLE, Dialect::Sqlite, None)?);

    write_frame(&frame, TABLE, &con, Dialect::Sqlite, if_exists)?;
    let loaded = read_frame(
        &format!("SELECT * FROM {}", TABLE),
        &con,
        None,
        config.query.coerce_float,
    )?;

    println!("{}", serde_json::to_string_pretty(&loaded.to_json_records()?)?);
    println!("loaded {} rows from {}", loaded.len(), TABLE);

    let count = tquery(&format!("SELECT COUNT(*) FROM {}", TABLE), &con, None, config.query.retry)?;
    if let QueryRows::Scalars(values) = count {
        if let Some(Value::Integer(n)) = values.first() {
            println!("{} holds {} rows", TABLE, n);
        }
    }
    Ok(())
}
