//! Run-protocol plumbing: reads a JSON run document, exposes the typed
//! scenario input, and writes results either to an output directory or to
//! stdout.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Result, SirError};

pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    /// Run label carried through to the outputs. The engine is deterministic,
    /// so replicates of the same input produce the same trajectory.
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        // Not consumed by a deterministic model.
        input_json.remove("seed");
        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            replicate,
            files,
            output,
        }
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(SirError::invalid("no run document on input"));
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> Result<Self> {
        Self::from_reader(io::stdin().lock())
    }

    /// Deserializes the input section, after stripping protocol keys, into `I`.
    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value)?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    /// Hex SHA-256 of the input section. serde_json keeps object keys
    /// sorted, so the digest does not depend on key order in the document.
    pub fn fingerprint(&self) -> String {
        let canonical = Value::Object(self.input_json.clone()).to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// Reads and deserializes the TOML file registered under `key` in
    /// `model.files`. Returns `Ok(None)` when no such file is registered.
    pub fn read_toml<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(path) = self.files.get(key) else {
            return Ok(None);
        };
        debug!("reading {key} from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&raw)?))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            return output
                .get("dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from);
        }

        // Profiled output: use the default profile, else the first one.
        let profile = output
            .get("profile")
            .and_then(|v| v.as_object())
            .and_then(|profiles| profiles.get("default").or_else(|| profiles.values().next()))?;
        if profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            return profile.get("dir").and_then(|v| v.as_str()).map(PathBuf::from);
        }

        None
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(filename), data)?;
        } else {
            io::stdout().write_all(data)?;
        }
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(value)?;
        data.push(b'\n');
        self.write(filename, &data)
    }

    pub fn write_csv(&self, filename: &str, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            let file = fs::File::create(dir.join(filename))?;
            write_rows(csv::Writer::from_writer(file), headers, rows)
        } else {
            write_rows(csv::Writer::from_writer(io::stdout()), headers, rows)
        }
    }
}

fn write_rows<W: Write>(
    mut writer: csv::Writer<W>,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
