//! Persistence: write the recovered document as `<basename>.json`.
//!
//! Output is pretty-printed with four-space indentation. `serde_json` keeps
//! object keys sorted, so the same value always serialises to the same bytes
//! and re-running a batch over unchanged inputs rewrites identical files.
//!
//! Writes go to `<basename>.json.tmp` first and are renamed into place, so a
//! crash mid-write never leaves a truncated `.json` behind. An existing file
//! of the same name is replaced without confirmation.

use crate::error::FileError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `<output_dir>/<basename of source>.json`.
pub fn output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{stem}.json"))
}

/// Serialise with four-space indentation.
pub fn to_pretty_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `value` for `source` into `output_dir`, returning the final path.
pub async fn persist(value: &Value, source: &Path, output_dir: &Path) -> Result<PathBuf, FileError> {
    let path = output_path(source, output_dir);
    let write_failed = |detail: String| FileError::WriteFailed {
        path: path.clone(),
        detail,
    };

    let json = to_pretty_json(value).map_err(|e| write_failed(e.to_string()))?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| write_failed(e.to_string()))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| write_failed(e.to_string()))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e.to_string()));
    }

    debug!("Wrote {} bytes to {}", json.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_path_uses_basename() {
        assert_eq!(
            output_path(Path::new("/shots/scene_01.PNG"), Path::new("out")),
            PathBuf::from("out/scene_01.json")
        );
        assert_eq!(
            output_path(Path::new("page.v2.jpeg"), Path::new(".")),
            PathBuf::from("./page.v2.json")
        );
    }

    #[test]
    fn pretty_json_uses_four_spaces_and_sorted_keys() {
        let v = json!({"scenes": [{"time": "DAY", "location": "Kitchen"}]});
        let s = to_pretty_json(&v).unwrap();
        assert_eq!(
            s,
            "{\n    \"scenes\": [\n        {\n            \"location\": \"Kitchen\",\n            \"time\": \"DAY\"\n        }\n    ]\n}"
        );
    }

    #[test]
    fn empty_scenes_serialise_compactly() {
        let s = to_pretty_json(&json!({"scenes": []})).unwrap();
        assert_eq!(s, "{\n    \"scenes\": []\n}");
    }

    #[tokio::test]
    async fn persist_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("shot.png");

        let first = json!({"scenes": [{"location": "Roof", "characters": []}]});
        let path = persist(&first, &source, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("shot.json"));

        let second = json!({"scenes": []});
        persist(&second, &source, dir.path()).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, second);
        assert!(!dir.path().join("shot.json.tmp").exists());
    }

    #[tokio::test]
    async fn persist_creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let path = persist(&json!({"scenes": []}), Path::new("a.gif"), &out)
            .await
            .unwrap();
        assert!(path.exists());
    }
}
