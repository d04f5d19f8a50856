//! 输入文档与网的 JSON / RON 读写.
use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 请求与网文档支持的编码.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Ron,
}

impl Format {
    /// `.ron` 后缀按 RON 读取，其余一律按 JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Format::Ron,
            _ => Format::Json,
        }
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(ron::from_str(s)?)
}

pub fn from_str<T: DeserializeOwned>(s: &str, format: Format) -> Result<T, IoError> {
    match format {
        Format::Json => from_json_str(s),
        Format::Ron => from_ron_str(s),
    }
}

pub fn read_document<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    from_str(&content, Format::from_path(path))
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json_string(value)?)?;
    Ok(())
}
