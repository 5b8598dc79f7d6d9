//! Runs the JSON scenarios under `fixtures/` through the public facade.
//!
//! Each fixture holds a type descriptor, one input document, and either the
//! expected canonical re-encoding (`{"ok": ..}`) or the expected error kind
//! (`{"error": "MissingRequiredField"}`).
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use json_codable::facade::{self, EncodeOptions};
use json_codable::schema::{compile, TypeDescription};
use json_codable::JsonError;

#[derive(Deserialize)]
struct Fixture {
    name: String,
    schema: TypeDescription,
    input: Value,
    expect: Expect,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum Expect {
    Ok(Value),
    Error(String),
}

fn main() -> Result<()> {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("fixtures"));
    let pattern = dir.join("*.json");
    let pattern = pattern.to_str().ok_or_else(|| anyhow!("fixture path is not UTF-8"))?;

    let mut failed = 0usize;
    let mut total = 0usize;
    for entry in glob::glob(pattern)? {
        let path = entry?;
        total += 1;
        match run_fixture(&path) {
            Ok(name) => eprintln!("✅ {name}"),
            Err(error) => {
                failed += 1;
                eprintln!("{} {}: {error:#}", "❌".red(), path.display());
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {total} fixtures failed"));
    }
    eprintln!("{}", format!("{total} fixtures passed").green());
    Ok(())
}

fn run_fixture(path: &Path) -> Result<String> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let fixture: Fixture = serde_path_to_error::deserialize(de)
        .map_err(|err| anyhow!("at JSON path {} → {}", err.path(), err.inner()))?;

    let schema = compile(&fixture.schema)?;
    let outcome = facade::decode_value_with_report(&schema, &fixture.input)
        .and_then(|(instance, _)| facade::encode_instance(&schema, &instance, EncodeOptions::default()));

    match (fixture.expect, outcome) {
        (Expect::Ok(expected), Ok(text)) => {
            let actual: Value = serde_json::from_str(&text)?;
            if actual != expected {
                return Err(anyhow!("expected {expected}, got {actual}"));
            }
            // key order is part of the contract
            let expected_text = serde_json::to_string(&expected)?;
            if text != expected_text {
                return Err(anyhow!("expected key order {expected_text}, got {text}"));
            }
        }
        (Expect::Ok(_), Err(error)) => return Err(anyhow!("unexpected error: {error}")),
        (Expect::Error(kind), Ok(text)) => return Err(anyhow!("expected {kind}, decoded {text}")),
        (Expect::Error(kind), Err(error)) => {
            if error_kind(&error) != kind {
                return Err(anyhow!("expected {kind}, got {error}"));
            }
        }
    }
    Ok(fixture.name)
}

fn error_kind(error: &JsonError) -> &'static str {
    match error {
        JsonError::MissingRequiredField(_) => "MissingRequiredField",
        JsonError::TypeMismatch { .. } => "TypeMismatch",
        JsonError::InvalidJsonSyntax(_) => "InvalidJsonSyntax",
        JsonError::InvalidStringEncoding => "InvalidStringEncoding",
        JsonError::EncodingFailed(_) => "EncodingFailed",
        JsonError::DecodingFailed(_) => "DecodingFailed",
    }
}
