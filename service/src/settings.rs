use std::{collections::HashMap, time::Duration};

use core_types::SettingName;
use strum::IntoEnumIterator;

pub const DEFAULT_UPLOAD_CHUNK_SIZE_MB: usize = 3;
pub const DEFAULT_PAGE_ROW_LIMIT: u32 = 3000;
pub const DEFAULT_DELETE_BATCH_LIMIT: usize = 100;
pub const BYTES_PER_MB: usize = 1024 * 1024;

/// `None` when the byte count does not fit into `usize`.
pub fn mb_to_bytes(mb: usize) -> Option<usize> {
    mb.checked_mul(BYTES_PER_MB)
}

/// Tunables shared by the upload and bulk services.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub upload_chunk_size_mb: usize,
    pub page_row_limit: u32,
    pub delete_batch_limit: usize,
    /// Applied to every single remote call when set.
    pub remote_call_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_chunk_size_mb: DEFAULT_UPLOAD_CHUNK_SIZE_MB,
            page_row_limit: DEFAULT_PAGE_ROW_LIMIT,
            delete_batch_limit: DEFAULT_DELETE_BATCH_LIMIT,
            remote_call_timeout: None,
        }
    }
}

impl Settings {
    /// Load settings from `STORE_*` environment variables, see `SettingName::env_key`.
    pub fn from_env() -> Self {
        let map: HashMap<String, String> = SettingName::iter()
            .filter_map(|name| {
                std::env::var(name.env_key())
                    .ok()
                    .map(|value| (name.as_str().to_string(), value))
            })
            .collect();
        Settings::from(map)
    }

    /// Saturates when `upload_chunk_size_mb` was set directly to a value too large for bytes.
    pub fn upload_chunk_size_bytes(&self) -> usize {
        self.upload_chunk_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

fn parse_positive<T>(map: &HashMap<String, String>, name: SettingName) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let raw = map.get(name.as_str())?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!(
                setting = name.as_str(),
                value = raw.as_str(),
                "Ignoring invalid setting value, using default"
            );
            None
        }
    }
}

impl From<HashMap<String, String>> for Settings {
    fn from(map: HashMap<String, String>) -> Self {
        let defaults = Settings::default();
        Self {
            upload_chunk_size_mb: parse_positive(&map, SettingName::UploadChunkSizeMb)
                .filter(|mb| {
                    let fits = mb_to_bytes(*mb).is_some();
                    if !fits {
                        tracing::warn!(
                            setting = SettingName::UploadChunkSizeMb.as_str(),
                            value = *mb,
                            "Chunk size overflows, using default"
                        );
                    }
                    fits
                })
                .unwrap_or(defaults.upload_chunk_size_mb),
            page_row_limit: parse_positive(&map, SettingName::PageRowLimit)
                .unwrap_or(defaults.page_row_limit),
            delete_batch_limit: parse_positive(&map, SettingName::DeleteBatchLimit)
                .unwrap_or(defaults.delete_batch_limit),
            remote_call_timeout: parse_positive::<u64>(&map, SettingName::RemoteCallTimeoutSecs)
                .map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_map() {
        let settings = Settings::from(HashMap::new());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.upload_chunk_size_bytes(), 3 * 1024 * 1024);
    }

    #[test]
    fn test_values_from_map() {
        let map = HashMap::from([
            ("upload_chunk_size_mb".to_string(), "10".to_string()),
            ("page_row_limit".to_string(), "500".to_string()),
            ("delete_batch_limit".to_string(), "25".to_string()),
            ("remote_call_timeout_secs".to_string(), "30".to_string()),
        ]);
        let settings = Settings::from(map);
        assert_eq!(settings.upload_chunk_size_mb, 10);
        assert_eq!(settings.page_row_limit, 500);
        assert_eq!(settings.delete_batch_limit, 25);
        assert_eq!(settings.remote_call_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_and_zero_values_fall_back() {
        let map = HashMap::from([
            ("upload_chunk_size_mb".to_string(), "0".to_string()),
            ("page_row_limit".to_string(), "lots".to_string()),
        ]);
        let settings = Settings::from(map);
        assert_eq!(settings.upload_chunk_size_mb, DEFAULT_UPLOAD_CHUNK_SIZE_MB);
        assert_eq!(settings.page_row_limit, DEFAULT_PAGE_ROW_LIMIT);
    }

    #[test]
    fn test_oversized_chunk_size_falls_back() {
        let map = HashMap::from([(
            "upload_chunk_size_mb".to_string(),
            "18000000000000".to_string(),
        )]);
        let settings = Settings::from(map);
        assert_eq!(settings.upload_chunk_size_mb, DEFAULT_UPLOAD_CHUNK_SIZE_MB);
        assert_eq!(settings.upload_chunk_size_bytes(), 3 * 1024 * 1024);
    }

    #[test]
    fn test_chunk_size_bytes_saturates() {
        let settings = Settings {
            upload_chunk_size_mb: usize::MAX,
            ..Settings::default()
        };
        assert_eq!(settings.upload_chunk_size_bytes(), usize::MAX);
        assert_eq!(mb_to_bytes(usize::MAX), None);
        assert_eq!(mb_to_bytes(2), Some(2 * 1024 * 1024));
    }
}
