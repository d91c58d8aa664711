//! Translation tables read from `<dir>/<code>.json`, the layout the site
//! serves them in.

use super::{HostError, TranslationSource};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileTranslations {
    dir: PathBuf,
}

impl FileTranslations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait(?Send)]
impl TranslationSource for FileTranslations {
    async fn fetch(&self, language: &str) -> Result<Value, HostError> {
        let path = self.dir.join(format!("{language}.json"));
        debug!(path = %path.display(), "loading translations");
        if !path.exists() {
            return Err(HostError::TranslationsNotFound {
                language: language.to_string(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_table_by_code() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("en.json"), r#"{"nav": {"home": "Home"}}"#).unwrap();
        let source = FileTranslations::new(tmp.path());

        let mut el = EventLoop::new();
        let table = el.block_on(source.fetch("en")).unwrap().unwrap();
        assert_eq!(table["nav"]["home"], "Home");
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let source = FileTranslations::new(tmp.path());
        let mut el = EventLoop::new();
        let err = el.block_on(source.fetch("ru")).unwrap().unwrap_err();
        assert!(matches!(err, HostError::TranslationsNotFound { .. }));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("sr.json"), "{ not json").unwrap();
        let source = FileTranslations::new(tmp.path());
        let mut el = EventLoop::new();
        let err = el.block_on(source.fetch("sr")).unwrap().unwrap_err();
        assert!(matches!(err, HostError::Json(_)));
    }
}
