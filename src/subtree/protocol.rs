// clusterconfig-core/src/subtree/protocol.rs
//
// Request:  [count: i32] then per entry
//             [prefix: i32 len + utf8] [has_version: u8] ([ticks: i64]) [force_full_update: u8]
// Response: [count: i32] then per entry
//             [prefix: i32 len + utf8] [was_modified: u8]
//             if was_modified: [has_subtree: u8]
//               if has_subtree: [is_patch: u8] [is_compressed: u8] [content: i32 len + bytes]

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::codec::buffer::{BinaryReader, BinaryWriter};
use crate::error::{Result, SettingsError};

/// Ticks (100 ns units since 0001-01-01 UTC) at the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;
/// Last tick of 9999-12-31.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

pub fn ticks_to_datetime(ticks: i64) -> Result<DateTime<Utc>> {
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(SettingsError::Malformed(format!("timestamp ticks {} out of range", ticks)));
    }
    let since_epoch = ticks - UNIX_EPOCH_TICKS;
    let seconds = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;
    DateTime::from_timestamp(seconds, nanos)
        .ok_or_else(|| SettingsError::Malformed(format!("timestamp ticks {} out of range", ticks)))
}

/// Converts to ticks, truncating below 100 ns.
pub fn datetime_to_ticks(time: &DateTime<Utc>) -> Result<i64> {
    let out_of_range = || SettingsError::InvalidArgument(format!("{} cannot be expressed in ticks", time));
    let ticks = time
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(i64::from(time.timestamp_subsec_nanos()) / NANOS_PER_TICK))
        .and_then(|t| t.checked_add(UNIX_EPOCH_TICKS))
        .ok_or_else(out_of_range)?;
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(out_of_range());
    }
    Ok(ticks)
}

/// One prefix a client asks for, with the version it already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeRequest {
    pub prefix: String,
    pub version: Option<DateTime<Utc>>,
    pub force_full_update: bool,
}

impl SubtreeRequest {
    pub fn new(prefix: impl Into<String>, version: Option<DateTime<Utc>>, force_full_update: bool) -> Self {
        Self {
            prefix: prefix.into(),
            version,
            force_full_update,
        }
    }
}

/// Server answer for one requested prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtree {
    pub was_modified: bool,
    /// False when the prefix no longer exists.
    pub has_subtree: bool,
    /// Content is a patch against the client's version rather than a full tree.
    pub is_patch: bool,
    pub is_compressed: bool,
    pub content: Vec<u8>,
}

impl Subtree {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn removed() -> Self {
        Self {
            was_modified: true,
            ..Self::default()
        }
    }

    pub fn full(content: Vec<u8>) -> Self {
        Self {
            was_modified: true,
            has_subtree: true,
            content,
            ..Self::default()
        }
    }

    pub fn patch(content: Vec<u8>) -> Self {
        Self {
            is_patch: true,
            ..Self::full(content)
        }
    }

    /// Gzips the content in place.
    pub fn compress(&mut self) -> Result<()> {
        if self.is_compressed || !self.has_subtree {
            return Ok(());
        }
        let mut encoder = GzEncoder::new(Vec::with_capacity(self.content.len() / 2), Compression::default());
        encoder.write_all(&self.content)?;
        self.content = encoder.finish()?;
        self.is_compressed = true;
        Ok(())
    }

    /// Gunzips the content in place if it is compressed.
    pub fn decompress_if_needed(&mut self) -> Result<()> {
        if !self.is_compressed {
            return Ok(());
        }
        let mut decoder = GzDecoder::new(&self.content[..]);
        let mut decompressed = Vec::with_capacity(self.content.len() * 4);
        decoder.read_to_end(&mut decompressed)?;
        trace!("Decompressed subtree from {} to {} bytes.", self.content.len(), decompressed.len());
        self.content = decompressed;
        self.is_compressed = false;
        Ok(())
    }
}

pub fn serialize_requests(requests: &[SubtreeRequest]) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    writer.write_length(requests.len())?;
    for request in requests {
        writer.write_str(&request.prefix)?;
        writer.write_bool(request.version.is_some())?;
        if let Some(version) = &request.version {
            writer.write_i64(datetime_to_ticks(version)?)?;
        }
        writer.write_bool(request.force_full_update)?;
    }
    Ok(writer.into_inner())
}

pub fn deserialize_requests(bytes: &[u8]) -> Result<Vec<SubtreeRequest>> {
    let mut reader = BinaryReader::new(bytes);
    let count = reader.read_length()?;
    let mut requests = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let prefix = reader.read_str()?.to_string();
        let version = if reader.read_bool()? {
            Some(ticks_to_datetime(reader.read_i64()?)?)
        } else {
            None
        };
        let force_full_update = reader.read_bool()?;
        requests.push(SubtreeRequest {
            prefix,
            version,
            force_full_update,
        });
    }
    Ok(requests)
}

pub fn serialize_response(subtrees: &BTreeMap<String, Subtree>) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    writer.write_length(subtrees.len())?;
    for (prefix, subtree) in subtrees {
        writer.write_str(prefix)?;
        writer.write_bool(subtree.was_modified)?;
        if !subtree.was_modified {
            continue;
        }
        writer.write_bool(subtree.has_subtree)?;
        if subtree.has_subtree {
            writer.write_bool(subtree.is_patch)?;
            writer.write_bool(subtree.is_compressed)?;
            writer.write_length(subtree.content.len())?;
            writer.write_bytes(&subtree.content)?;
        }
    }
    Ok(writer.into_inner())
}

/// Decodes a response; with `auto_decompress` every gzipped content is inflated.
pub fn deserialize_response(bytes: &[u8], auto_decompress: bool) -> Result<BTreeMap<String, Subtree>> {
    let mut reader = BinaryReader::new(bytes);
    let count = reader.read_length()?;
    let mut subtrees = BTreeMap::new();
    for _ in 0..count {
        let prefix = reader.read_str()?.to_string();
        let mut subtree = Subtree {
            was_modified: reader.read_bool()?,
            ..Subtree::default()
        };
        if subtree.was_modified {
            subtree.has_subtree = reader.read_bool()?;
            if subtree.has_subtree {
                subtree.is_patch = reader.read_bool()?;
                subtree.is_compressed = reader.read_bool()?;
                let len = reader.read_length()?;
                subtree.content = reader.read_slice(len)?.to_vec();
            }
        }
        if auto_decompress {
            subtree.decompress_if_needed()?;
        }
        subtrees.insert(prefix, subtree);
    }
    Ok(subtrees)
}
