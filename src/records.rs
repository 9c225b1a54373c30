use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One captured inbound HTTP exchange. Constructed once, only ever appended
/// to a capture log, never mutated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RequestRecord {
    /// Wall-clock instant at which the body was fully read, ISO-8601 on disk.
    pub timestamp: DateTime<Utc>,
    /// Method exactly as received; extension methods are stored, not rejected.
    pub method: String,
    /// Request target as received, query string included.
    pub path: String,
    /// Headers in arrival order. Duplicate names are kept; the exported JSON
    /// object carries one entry per occurrence.
    #[serde(with = "ordered_headers")]
    pub headers: Vec<(String, String)>,
    /// Body as UTF-8 text. Non-UTF-8 payloads are converted lossily; binary
    /// capture is out of scope.
    pub body: String,
}

/// Best-effort structured view of a record body.
#[derive(Debug)]
pub enum BodyPreview {
    Json(serde_json::Value),
    Raw(String),
    Empty,
}

impl RequestRecord {
    pub fn body_preview(&self) -> BodyPreview {
        if self.body.is_empty() {
            return BodyPreview::Empty;
        }
        match serde_json::from_str(&self.body) {
            Ok(value) => BodyPreview::Json(value),
            Err(_) => BodyPreview::Raw(self.body.clone()),
        }
    }
}

/// Headers serialize as a JSON object so capture files stay readable, while
/// the in-memory form keeps arrival order and duplicate names. serde_json
/// streams map entries one at a time in both directions, so duplicates
/// survive the round trip.
mod ordered_headers {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        headers: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (name, value) in headers {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        struct HeaderVisitor;

        impl<'de> Visitor<'de> for HeaderVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of header names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut headers = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, String>()? {
                    headers.push(entry);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeaderVisitor)
    }
}

/// Writes the full ordered record sequence to `path` as a pretty-printed
/// JSON array. Lossless: every field of every record is dumped.
pub fn export(records: &[RequestRecord], path: &Path) -> Result<(), Error> {
    let io_err = |source| Error::ExportIo {
        path: path.to_path_buf(),
        source,
    };
    let file = fs::File::create(path).map_err(io_err)?;
    serde_json::to_writer_pretty(&file, records).map_err(|e| io_err(io::Error::from(e)))?;
    Ok(())
}

/// Reads a previously exported capture. Fails closed: a file that cannot be
/// read or does not match the schema yields an error, never a partial log.
pub fn load(path: &Path) -> Result<Vec<RequestRecord>, Error> {
    let data = fs::read_to_string(path).map_err(|source| Error::LoadIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| Error::ExportFormat {
        path: path.to_path_buf(),
        source,
    })
}

const INSPECT_PATH_WIDTH: usize = 30;

/// Fixed-width summary table of a capture, one row per record. Display-only.
pub fn inspect(records: &[RequestRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<7}  {:<width$}  {:<8}  {}",
        "#",
        "Method",
        "Path",
        "Time",
        "Body",
        width = INSPECT_PATH_WIDTH
    );
    for (index, record) in records.iter().enumerate() {
        let path: String = record.path.chars().take(INSPECT_PATH_WIDTH).collect();
        let _ = writeln!(
            out,
            "{:>4}  {:<7}  {:<width$}  {:<8}  {} bytes",
            index + 1,
            record.method,
            path,
            record.timestamp.format("%H:%M:%S"),
            record.body.len(),
            width = INSPECT_PATH_WIDTH
        );
    }
    out
}
