// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::IngestError;
use reqwest::blocking::Client;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Where a dataset snapshot comes from. Fetched once per run, never written.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    Path(PathBuf),
}

impl DataSource {
    /// `http://` and `https://` locations are URLs; anything else is a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    /// Reads the full snapshot into memory.
    ///
    /// URLs use a blocking GET without retries; any non-success status is an
    /// error.
    pub fn fetch(&self) -> Result<Vec<u8>, IngestError> {
        let started = Instant::now();
        let bytes = match self {
            Self::Url(url) => {
                let client = Client::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .timeout(REQUEST_TIMEOUT)
                    .user_agent(concat!("civstat/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                let response = client.get(url).send()?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                response.bytes()?.to_vec()
            }
            Self::Path(path) => std::fs::read(path).map_err(|source| IngestError::Io {
                path: path.clone(),
                source,
            })?,
        };
        tracing::info!(
            source = %self,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched dataset"
        );
        Ok(bytes)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<String> for DataSource {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<DataSource> for String {
    fn from(source: DataSource) -> Self {
        source.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::DataSource;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn parse_distinguishes_urls_from_paths() {
        assert_eq!(
            DataSource::parse(" https://data.example.org/a.csv "),
            DataSource::Url("https://data.example.org/a.csv".to_string())
        );
        assert_eq!(
            DataSource::parse("data/a.csv"),
            DataSource::Path(PathBuf::from("data/a.csv"))
        );
        assert_eq!(
            String::from(DataSource::parse("http://x/y")),
            "http://x/y".to_string()
        );
    }

    #[test]
    fn fetch_reads_local_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"a,b\n1,2\n").expect("write temp file");
        let source = DataSource::Path(file.path().to_path_buf());
        assert_eq!(source.fetch().expect("read temp file"), b"a,b\n1,2\n".to_vec());
    }

    #[test]
    fn fetch_reports_missing_files_as_io_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = DataSource::Path(dir.path().join("missing.csv"));
        let err = source.fetch().expect_err("missing file should fail");
        assert_eq!(err.code(), "io_error");
        assert!(err.to_string().contains("missing.csv"));
    }
}
