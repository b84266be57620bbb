//! Purpose: Hold top-level CLI command dispatch for `tsvstream`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Streaming commands run on one tokio runtime built per invocation.
//! Invariants: A decode failure aborts the command; partial counts are not reported as success.

use super::*;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tsvstream::api::{Record, RecordStream, Schema, StreamConfig, Value as FieldValue};
use tsvstream::catalog::DatasetKind;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tsvstream", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Types => {
            let mut types = Vec::new();
            for kind in DatasetKind::ALL {
                types.push(schema_json(&kind.schema()?));
            }
            emit_json(json!({ "types": types }));
            Ok(RunOutcome::ok())
        }
        Command::Count {
            record_type,
            file,
            read,
        } => {
            let config = StreamConfig::new(&file, &record_type).with_options(read.stream_options());
            let started_at = time_now();
            let started = Instant::now();
            let records = block_on(count_records(config))?;
            emit_json(json!({
                "type": record_type,
                "path": file.display().to_string(),
                "records": records,
                "started_at": started_at,
                "elapsed_ms": started.elapsed().as_millis() as u64,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Scan { dir, types, read } => {
            let kinds = if types.is_empty() {
                DatasetKind::ALL.to_vec()
            } else {
                types
                    .iter()
                    .map(|name| name.parse::<DatasetKind>())
                    .collect::<Result<Vec<_>, _>>()?
            };
            let options = read.stream_options();
            let started = Instant::now();
            let total = block_on(async {
                let mut total = 0u64;
                for kind in kinds {
                    let path = dataset_path(&dir, kind);
                    let config =
                        StreamConfig::new(&path, kind.as_str()).with_options(options.clone());
                    let type_started = Instant::now();
                    let records = count_records(config).await?;
                    total += records;
                    emit_json_line(&json!({
                        "type": kind.as_str(),
                        "path": path.display().to_string(),
                        "records": records,
                        "elapsed_ms": type_started.elapsed().as_millis() as u64,
                    }));
                }
                Ok::<_, Error>(total)
            })?;
            emit_json_line(&json!({
                "total_records": total,
                "elapsed_ms": started.elapsed().as_millis() as u64,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Cat {
            record_type,
            file,
            limit,
            matches,
            read,
        } => {
            let config = StreamConfig::new(&file, &record_type).with_options(read.stream_options());
            block_on(cat_records(config, limit, &matches))?;
            Ok(RunOutcome::ok())
        }
    }
}

fn block_on<F, T>(future: F) -> Result<T, Error>
where
    F: std::future::Future<Output = Result<T, Error>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;
    runtime.block_on(future)
}

async fn count_records(config: StreamConfig) -> Result<u64, Error> {
    let mut stream = RecordStream::open(config)?;
    while stream.next_record().await?.is_some() {}
    tracing::debug!(
        path = %stream.path().display(),
        records = stream.count(),
        peak_buffered = stream.peak_buffered(),
        "count finished"
    );
    Ok(stream.count())
}

async fn cat_records(config: StreamConfig, limit: Option<u64>, matches: &[String]) -> Result<(), Error> {
    let mut stream = RecordStream::open(config)?;
    let filters = parse_matches(stream.schema(), matches)?;
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut printed = 0u64;

    while limit.is_none_or(|limit| printed < limit) {
        let Some(record) = stream.next_record().await? else {
            break;
        };
        if !filters.iter().all(|filter| filter.matches(&record)) {
            continue;
        }
        let line = serde_json::to_string(&record).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode record")
                .with_source(err)
        })?;
        if let Err(err) = writeln!(out, "{line}") {
            return quiet_broken_pipe(err);
        }
        printed += 1;
    }
    out.flush().or_else(quiet_broken_pipe)
}

fn quiet_broken_pipe(err: io::Error) -> Result<(), Error> {
    if err.kind() == io::ErrorKind::BrokenPipe {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Io)
        .with_message("failed to write to stdout")
        .with_source(err))
}

struct MatchFilter {
    column: String,
    value: String,
}

impl MatchFilter {
    fn matches(&self, record: &Record) -> bool {
        match record.get(&self.column) {
            Some(FieldValue::List(items)) => items.iter().any(|item| item == &self.value),
            Some(value) => value.to_token() == self.value,
            None => false,
        }
    }
}

fn parse_matches(schema: &Schema, matches: &[String]) -> Result<Vec<MatchFilter>, Error> {
    matches
        .iter()
        .map(|raw| {
            let Some((column, value)) = raw.split_once('=') else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid --match '{raw}'"))
                    .with_hint("Use COLUMN=VALUE, e.g. --match tconst=tt0000001."));
            };
            if schema.position(column).is_none() {
                let names = schema
                    .columns()
                    .iter()
                    .map(|column| column.name.as_str())
                    .collect::<Vec<_>>();
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown column '{column}' for {}", schema.name()))
                    .with_hint(format!("Columns: {}.", names.join(", "))));
            }
            Ok(MatchFilter {
                column: column.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn dataset_path(dir: &Path, kind: DatasetKind) -> PathBuf {
    dir.join(format!("{}.tsv", kind.as_str())).join("data.tsv")
}

fn schema_json(schema: &Schema) -> Value {
    let columns = schema
        .columns()
        .iter()
        .map(|column| json!({ "name": column.name, "converter": column.converter.label() }))
        .collect::<Vec<_>>();
    json!({ "type": schema.name(), "columns": columns })
}

#[cfg(test)]
mod tests {
    use super::{MatchFilter, dataset_path, parse_matches};
    use std::path::Path;
    use tsvstream::api::{ErrorKind, decode_line};
    use tsvstream::catalog::{DatasetKind, schema_for};

    #[test]
    fn dataset_path_follows_dump_layout() {
        let path = dataset_path(Path::new("files"), DatasetKind::TitleRatings);
        assert_eq!(path, Path::new("files/title.ratings.tsv/data.tsv"));
    }

    #[test]
    fn match_requires_equals_and_known_column() {
        let schema = schema_for("title.ratings").expect("schema");
        let err = parse_matches(&schema, &["tconst".to_string()])
            .err()
            .expect("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = parse_matches(&schema, &["genre=Drama".to_string()])
            .err()
            .expect("usage");
        assert!(err.hint().expect("hint").contains("numVotes"));
    }

    #[test]
    fn list_columns_match_on_membership() {
        let schema = schema_for("title.basics").expect("schema");
        let record = decode_line(
            &schema,
            "tt0000001\tshort\tCarmencita\tCarmencita\t0\t1894\t\\N\t1\tDocumentary,Short",
        )
        .expect("decode");
        let filter = MatchFilter {
            column: "genres".to_string(),
            value: "Short".to_string(),
        };
        assert!(filter.matches(&record));
        let filter = MatchFilter {
            column: "startYear".to_string(),
            value: "1894".to_string(),
        };
        assert!(filter.matches(&record));
        let filter = MatchFilter {
            column: "endYear".to_string(),
            value: "1894".to_string(),
        };
        assert!(!filter.matches(&record));
    }
}
