// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Source access seam.
//!
//! Producers open data through a [`SourceOpener`] instead of touching the
//! filesystem directly, so tests can inject failures or streams with an
//! unknown length without touching disk.

use crate::error::FetchError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An opened source: a reader plus the declared length, when known.
///
/// A known length lets the buffer factory size a single pool request up
/// front; `None` forces the geometric-growth path.
pub struct SourceStream {
    reader: Box<dyn Read + Send>,
    declared_len: Option<u64>,
}

impl SourceStream {
    pub fn new(reader: Box<dyn Read + Send>, declared_len: Option<u64>) -> Self {
        Self {
            reader,
            declared_len,
        }
    }

    /// Returns the declared length in bytes, if the source reported one.
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }

    /// Consumes the stream, yielding the reader.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("declared_len", &self.declared_len)
            .finish()
    }
}

/// Opens a source locator for reading.
pub trait SourceOpener: Send + Sync {
    fn open(&self, locator: &Path) -> Result<SourceStream, FetchError>;
}

/// Opens local files and reports their metadata length.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceOpener;

impl SourceOpener for FsSourceOpener {
    fn open(&self, locator: &Path) -> Result<SourceStream, FetchError> {
        let file = File::open(locator).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                FetchError::SourceNotFound {
                    locator: locator.display().to_string(),
                }
            } else {
                FetchError::Io {
                    locator: locator.display().to_string(),
                    source: err,
                }
            }
        })?;
        let declared_len = file.metadata().ok().map(|meta| meta.len());
        Ok(SourceStream::new(Box::new(file), declared_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_reports_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 100]).unwrap();

        let stream = FsSourceOpener.open(file.path()).unwrap();
        assert_eq!(stream.declared_len(), Some(100));

        let mut data = Vec::new();
        stream.into_reader().read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![7u8; 100]);
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err = FsSourceOpener
            .open(Path::new("/nonexistent/source.bin"))
            .unwrap_err();
        assert!(matches!(err, FetchError::SourceNotFound { .. }));
    }
}
