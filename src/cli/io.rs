//! JSON I/O handling for CLI
//!
//! - Output: one JSON object on stdout, `{"status":"ok","data":...}`
//! - Input files: UTF-8 JSON

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::CliResult;

/// Read and parse a JSON file
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    write_response_to(&mut stdout, data)
}

fn write_response_to<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    serde_json::to_writer(&mut *writer, &response)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_response_envelope() {
        let mut out = Vec::new();
        write_response_to(&mut out, json!({"comments": 2})).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["data"]["comments"], 2);
        assert_eq!(out.last(), Some(&b'\n'));
    }

    #[test]
    fn test_read_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("in.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let values: Vec<u32> = read_json_file(&path).unwrap();
        assert_eq!(values, vec![1, 2, 3]);

        std::fs::write(&path, "not json").unwrap();
        assert!(read_json_file::<Vec<u32>>(&path).is_err());
    }
}
