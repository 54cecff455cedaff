use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::IcevelError;
use crate::granule::{GranuleRecord, Source};

/// One catalog row: a decoded granule plus the directory it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub record: GranuleRecord,
    pub dir: Utf8PathBuf,
}

impl CatalogEntry {
    pub fn file_name(&self) -> String {
        self.record.file_name()
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(self.record.file_name())
    }
}

/// Exact-match attribute filter. A `None` field is unconstrained; a set
/// field must equal the record's value exactly, no partial matching.
#[derive(Debug, Clone, Default)]
pub struct GranuleFilter {
    pub source: Option<Source>,
    pub grid: Option<String>,
    pub parameter: Option<String>,
    pub version: Option<String>,
    pub extension: Option<String>,
}

impl GranuleFilter {
    pub fn matches(&self, record: &GranuleRecord) -> bool {
        if let Some(source) = self.source {
            if record.source != source {
                return false;
            }
        }
        if let Some(grid) = &self.grid {
            if &record.grid != grid {
                return false;
            }
        }
        if let Some(parameter) = &self.parameter {
            if &record.parameter != parameter {
                return false;
            }
        }
        if let Some(version) = &self.version {
            if &record.version != version {
                return false;
            }
        }
        if let Some(extension) = &self.extension {
            if &record.extension != extension {
                return false;
            }
        }
        true
    }
}

/// Scans `dir`, decodes every entry, keeps records matching `filter` and
/// returns them sorted by the 8-key comparator. Unrelated files in the
/// directory are silently dropped. Identical directory contents always
/// yield an identical sequence; the merge phase depends on this order.
pub fn build(dir: &Utf8Path, filter: &GranuleFilter) -> Result<Vec<CatalogEntry>, IcevelError> {
    let mut entries = Vec::new();
    let listing = fs::read_dir(dir.as_std_path())
        .map_err(|err| IcevelError::Filesystem(format!("list {dir}: {err}")))?;
    for item in listing {
        let item = item.map_err(|err| IcevelError::Filesystem(format!("list {dir}: {err}")))?;
        let name = item.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(record) = GranuleRecord::decode(name)? else {
            continue;
        };
        if !filter.matches(&record) {
            continue;
        }
        entries.push(CatalogEntry {
            record,
            dir: dir.to_owned(),
        });
    }

    entries.sort_by(|a, b| a.record.sort_key().cmp(&b.record.sort_key()));
    Ok(entries)
}
