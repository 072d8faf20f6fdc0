use std::process::ExitCode;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, ValueEnum};
use tracing::{Level, info};

use sql_binder::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Show {
    Plain,
    Escaped,
    Expanded,
    ExpandedEscaped,
}

impl From<Show> for SqlVariant {
    fn from(show: Show) -> Self {
        match show {
            Show::Plain => SqlVariant::Plain,
            Show::Escaped => SqlVariant::Escaped,
            Show::Expanded => SqlVariant::Expanded,
            Show::ExpandedEscaped => SqlVariant::ExpandedEscaped,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Prepare, bind and run one SQL statement against SQLite")]
struct Args {
    /// Database file (`:memory:` for a scratch database).
    #[arg(long)]
    db: String,
    /// Literal dialect used for expanded SQL.
    #[arg(long, value_enum, default_value = "sqlite")]
    dialect: DialectKind,
    /// Log every executed statement.
    #[arg(long)]
    trace: bool,
    /// Print the statement's SQL in this variant before running it.
    #[arg(long, value_enum)]
    show: Option<Show>,
    /// Open the database read-only.
    #[arg(long)]
    read_only: bool,
    #[arg(short, long)]
    verbose: bool,
    sql: String,
    /// Parameters as `type:value`, e.g. `i8:-128`, `text:abc`, `null`.
    params: Vec<String>,
}

fn parse_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

fn parse_param(arg: &str) -> Result<Value, DbError> {
    if arg == "null" {
        return Ok(Value::Null);
    }
    let (ty, raw) = arg
        .split_once(':')
        .ok_or_else(|| DbError::UnknownType(format!("expected type:value, got '{arg}'")))?;
    let bad = || DbError::TypeMismatch(format!("'{raw}' is not a valid {ty}"));
    let value = match ty {
        "bool" => Value::Bool(raw.parse().map_err(|_| bad())?),
        "i8" => Value::I8(raw.parse().map_err(|_| bad())?),
        "u8" => Value::U8(raw.parse().map_err(|_| bad())?),
        "i16" => Value::I16(raw.parse().map_err(|_| bad())?),
        "u16" => Value::U16(raw.parse().map_err(|_| bad())?),
        "i32" => Value::I32(raw.parse().map_err(|_| bad())?),
        "u32" => Value::U32(raw.parse().map_err(|_| bad())?),
        "i64" => Value::I64(raw.parse().map_err(|_| bad())?),
        "u64" => Value::U64(raw.parse().map_err(|_| bad())?),
        "float" => Value::Float(raw.parse().map_err(|_| bad())?),
        "double" => Value::Double(raw.parse().map_err(|_| bad())?),
        "text" => Value::Text(raw.to_owned()),
        "blob" => Value::Blob(parse_hex(raw).ok_or_else(bad)?),
        "date" => Value::Date(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| bad())?),
        "time" => Value::Time(NaiveTime::parse_from_str(raw, "%H:%M:%S%.f").map_err(|_| bad())?),
        "datetime" => Value::DateTime(
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map_err(|_| bad())?,
        ),
        "timestamp" => Value::Timestamp(raw.parse().map_err(|_| bad())?),
        other => return Err(DbError::UnknownType(other.to_owned())),
    };
    Ok(value)
}

fn run(args: Args) -> Result<(), DbError> {
    let mut db = SqliteOptionsBuilder::new(args.db)
        .read_only(args.read_only)
        .dialect(args.dialect)
        .open()?;
    if args.trace {
        db.enable_trace(|sql| info!(target: "sqlbind::trace", "{sql}"))?;
    }

    {
        let mut stmt = db.prepare(&args.sql)?;
        for (index, arg) in args.params.iter().enumerate() {
            stmt.bind_value(index, &parse_param(arg)?)?;
        }
        if let Some(show) = args.show {
            println!("{}", stmt.sql(show.into())?);
        }
        stmt.exec_f(|stmt, _| {
            let row: Vec<_> = stmt.row().iter().map(Value::to_json).collect();
            println!("{}", serde_json::Value::Array(row));
            RecordFlow::Continue
        })?;
        stmt.finalize()?;
    }
    db.close()
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sqlbind: {err}");
            ExitCode::FAILURE
        }
    }
}
