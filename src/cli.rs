//! Minimal CLI: compile a schema descriptor → (schema | decode)
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use json_codable::facade::{self, EncodeOptions};
use json_codable::path_de;
use json_codable::schema::{compile, TypeDescription, TypeSchema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON documents through a field-descriptor schema and print their canonical encoding
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log schema compilation and skipped array elements
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a descriptor and print the resolved field table
    Schema(SchemaOut),
    /// decode documents and print their canonical re-encoding
    Decode(DecodeOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// JSON type descriptor (`{"name": .., "key_strategy": .., "fields": [..]}`)
    #[arg(long, short)]
    schema: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// pretty-print each re-encoded document
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// list array elements dropped during decoding
    #[arg(long, default_value_t = false)]
    report: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document, tagged with where it came from. A document that
/// could not be parsed or selected carries the reason instead of a value.
#[derive(Debug)]
struct Document {
    source: String,
    value: std::result::Result<Value, String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<TypeSchema> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        let description: TypeDescription = path_de::from_str_with_path(&source)
            .map_err(|error| anyhow!("invalid schema {}: {error}", self.schema.display()))?;
        compile(&description).with_context(|| format!("failed to compile schema {}", self.schema.display()))
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                documents.extend(self.split_ndjson(&source_path_str, &source));
            } else {
                documents.push(self.document(source_path_str, &source));
            }
        }
        Ok(documents)
    }

    /// One document per non-blank line; a bad line fails only itself.
    fn split_ndjson(&self, source_path: &str, source: &str) -> Vec<Document> {
        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_no, line)| self.document(format!("{source_path}:{}", line_no + 1), line))
            .collect()
    }

    fn document(&self, source: String, text: &str) -> Document {
        let value = serde_json::from_str::<Value>(text)
            .map_err(|error| format!("invalid JSON: {error}"))
            .and_then(|value| self.select(value));
        Document { source, value }
    }

    fn select(&self, value: Value) -> std::result::Result<Value, String> {
        match self.json_pointer.as_deref() {
            None => Ok(value),
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| format!("JSON pointer {pointer} selects nothing")),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let schema = target.schema_settings.load()?;
                let summary = serde_json::to_string_pretty(&schema.summary())?;
                emit(target.out.as_deref(), &summary)
            }
            Command::Decode(target) => {
                let schema = target.schema_settings.load()?;
                let documents = target.input_settings.load_documents()?;
                let options = EncodeOptions { pretty: target.pretty };

                // decode in parallel; collect keeps input order
                let results: Vec<_> = documents
                    .par_iter()
                    .map(|document| -> std::result::Result<_, String> {
                        let value = document.value.as_ref().map_err(String::clone)?;
                        facade::decode_value_with_report(&schema, value)
                            .and_then(|(instance, report)| {
                                facade::encode_instance(&schema, &instance, options).map(|text| (text, report))
                            })
                            .map_err(|error| error.to_string())
                    })
                    .collect();

                let mut lines = Vec::with_capacity(results.len());
                let mut failed = 0usize;
                for (document, result) in documents.iter().zip(results) {
                    match result {
                        Ok((text, report)) => {
                            if target.report {
                                for skipped in &report.skipped {
                                    eprintln!(
                                        "{} {}: skipped {} ({})",
                                        "~".yellow(),
                                        document.source,
                                        skipped.path,
                                        skipped.reason
                                    );
                                }
                            }
                            lines.push(text);
                        }
                        Err(error) => {
                            failed += 1;
                            eprintln!("{} {}: {error}", "✗".red(), document.source);
                        }
                    }
                }

                emit(target.out.as_deref(), &lines.join("\n"))?;
                if failed > 0 {
                    bail!("{failed} of {} documents failed to decode", documents.len());
                }
                tracing::info!(documents = documents.len(), "decoded");
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn emit(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }

    fn input_settings(json_pointer: Option<&str>) -> InputSettings {
        InputSettings { ndjson: true, json_pointer: json_pointer.map(String::from), input: vec![] }
    }

    #[test]
    fn bad_ndjson_line_fails_only_itself() {
        let source = "{\"id\":1}\n{\"id\":\n\n{\"id\":3}\n";
        let documents = input_settings(None).split_ndjson("in.ndjson", source);
        let sources: Vec<_> = documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, ["in.ndjson:1", "in.ndjson:2", "in.ndjson:4"]);
        assert_eq!(documents[0].value, Ok(serde_json::json!({ "id": 1 })));
        assert!(matches!(&documents[1].value, Err(reason) if reason.starts_with("invalid JSON")));
        assert_eq!(documents[2].value, Ok(serde_json::json!({ "id": 3 })));
    }

    #[test]
    fn pointer_miss_fails_only_that_document() {
        let source = "{\"data\":{\"id\":1}}\n{\"other\":0}\n";
        let documents = input_settings(Some("/data")).split_ndjson("in.ndjson", source);
        assert_eq!(documents[0].value, Ok(serde_json::json!({ "id": 1 })));
        assert_eq!(documents[1].value, Err("JSON pointer /data selects nothing".to_string()));
    }

    #[test]
    fn cli_parses_decode_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "json-codable", "decode", "-s", "user.json", "-i", "a.json", "b.json", "--pretty", "--report",
        ])
        .unwrap();
        match cli.cmd {
            Command::Decode(target) => {
                assert!(target.pretty && target.report);
                assert_eq!(target.input_settings.input, vec!["a.json", "b.json"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
