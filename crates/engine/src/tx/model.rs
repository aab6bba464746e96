//! Model: the transaction record and its sub-records.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Kind of transaction as announced by the `Begin` record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RecordType {
    #[default]
    Unknown,
    /// `sess`
    Session,
    /// `req`
    Request,
    /// `bereq`
    BackendRequest,
    /// Any record type the log tool may add later.
    Other(String),
}

impl RecordType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "sess" => RecordType::Session,
            "req" => RecordType::Request,
            "bereq" => RecordType::BackendRequest,
            "" => RecordType::Unknown,
            other => RecordType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordType::Unknown => "",
            RecordType::Session => "sess",
            RecordType::Request => "req",
            RecordType::BackendRequest => "bereq",
            RecordType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One named checkpoint (`Start`, `Req`, `Fetch`, `Resp`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timestamp {
    pub label: String,
    pub absolute: DateTime<Utc>,
    pub since_start: Duration,
    pub since_last: Duration,
}

/// Where a TTL snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtlSource {
    /// Derived from the backend response headers.
    Rfc,
    /// Set by the policy code.
    Vcl,
    /// Hit-for-pass object.
    Hfp,
    Other(String),
}

impl TtlSource {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "RFC" => TtlSource::Rfc,
            "VCL" => TtlSource::Vcl,
            "HFP" => TtlSource::Hfp,
            other => TtlSource::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TtlSource::Rfc => "RFC",
            TtlSource::Vcl => "VCL",
            TtlSource::Hfp => "HFP",
            TtlSource::Other(tag) => tag,
        }
    }
}

impl Serialize for TtlSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Extra fields carried only by the long (10 field) TTL shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtlDetail {
    pub age: i64,
    pub date: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub max_age: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtlData {
    pub source: TtlSource,
    pub ttl: i64,
    pub grace: i64,
    pub keep: i64,
    pub reference: DateTime<Utc>,
    pub detail: Option<TtlDetail>,
    /// `cacheable` or `uncacheable`
    pub cache_status: String,
}

/// A policy state entered by `VCL_call` and left by `VCL_return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VclTransition {
    pub call: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RequestAccounting {
    pub header_bytes_received: u64,
    pub body_bytes_received: u64,
    pub header_bytes_transmitted: u64,
    pub body_bytes_transmitted: u64,
}

impl RequestAccounting {
    pub fn received(&self) -> u64 {
        self.header_bytes_received + self.body_bytes_received
    }

    pub fn transmitted(&self) -> u64 {
        self.header_bytes_transmitted + self.body_bytes_transmitted
    }
}

/// Whether a child named by a `Link` record has been seen in the store yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Pending,
    Resolved,
}

/// A transaction reconstructed from one log block.
///
/// Relationships are identifier references into a [`crate::store::Store`]:
/// `parent` is only ever written by the store, and `children` starts out with
/// every entry [`LinkState::Pending`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tx {
    pub txid: String,
    pub vxid: u64,
    pub record_type: RecordType,
    pub reason: String,
    pub method: String,
    pub host: String,
    pub url: String,
    pub status_code: i32,
    pub status_reason: String,
    pub timestamps: Vec<Timestamp>,
    pub transitions: Vec<VclTransition>,
    pub ttl: Vec<TtlData>,
    pub accounting: RequestAccounting,
    pub parent: Option<String>,
    pub children: BTreeMap<String, LinkState>,
    pub raw: Vec<String>,
}

impl Tx {
    pub fn is_session(&self) -> bool {
        self.record_type == RecordType::Session
    }

    /// Total observed duration: the sum of every checkpoint's `since_last`.
    pub fn sum_of_since_last(&self) -> Duration {
        self.timestamps.iter().map(|ts| ts.since_last).sum()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}
