//! Data payloads for model construction
//!
//! The bridge never interprets model data; it only delivers it. A payload
//! is either absent, an inline string, or a file the client reads before
//! crossing the boundary, so an unreadable path fails with its own error
//! instead of a native parse failure.

use crate::error::{BridgeError, Result};
use std::ffi::CString;
use std::fs;
use std::path::PathBuf;

/// What to hand `gt_model_construct` as the data argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelData {
    /// No data; the native side sees a null pointer.
    #[default]
    Empty,
    /// A string passed through as-is, typically JSON.
    Inline(String),
    /// A file whose contents are read client-side and passed through.
    File(PathBuf),
}

impl ModelData {
    /// Resolves the payload to the C string crossing the boundary, or
    /// `None` for [`ModelData::Empty`].
    pub(crate) fn into_cstring(self) -> Result<Option<CString>> {
        match self {
            Self::Empty => Ok(None),
            Self::Inline(text) => Ok(Some(CString::new(text)?)),
            Self::File(path) => {
                let text = fs::read_to_string(&path).map_err(|source| BridgeError::DataFile {
                    path: path.clone(),
                    source,
                })?;
                Ok(Some(CString::new(text)?))
            }
        }
    }
}

impl From<serde_json::Value> for ModelData {
    fn from(value: serde_json::Value) -> Self {
        Self::Inline(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_resolves_to_none() {
        assert_eq!(ModelData::Empty.into_cstring().unwrap(), None);
    }

    #[test]
    fn test_inline_passes_through() {
        let payload = ModelData::Inline(r#"{"n": 3}"#.to_string());
        let text = payload.into_cstring().unwrap().unwrap();
        assert_eq!(text.to_str().unwrap(), r#"{"n": 3}"#);
    }

    #[test]
    fn test_json_value_becomes_inline() {
        let payload = ModelData::from(json!({"model": "multi", "n": 2}));
        match &payload {
            ModelData::Inline(text) => assert!(text.contains("\"multi\"")),
            other => panic!("expected Inline, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_fails_with_path_context() {
        let payload = ModelData::File(PathBuf::from("/no/such/data.json"));
        let err = payload.into_cstring().unwrap_err();
        assert!(matches!(err, BridgeError::DataFile { .. }));
        assert!(err.to_string().contains("/no/such/data.json"));
    }

    #[test]
    fn test_interior_nul_is_a_usage_error() {
        let payload = ModelData::Inline("bad\0payload".to_string());
        assert!(matches!(
            payload.into_cstring(),
            Err(BridgeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(ModelData::default(), ModelData::Empty);
    }
}
