use serde_json::Value;
use shiryoku_search::SearchParameters;
use std::io::Write;
use std::path::PathBuf;

pub fn params(body: Value) -> SearchParameters {
    SearchParameters::from_value(body).expect("valid request body")
}

/// Write `body` to a uniquely named temp file and return its path.
pub fn request_file(name: &str, body: &Value) -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("shiryoku-{}-{}.json", std::process::id(), name));
    let mut file = std::fs::File::create(&path)?;
    file.write_all(serde_json::to_string(body)?.as_bytes())?;
    Ok(path)
}
