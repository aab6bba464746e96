//! Line: decoding of a single whitespace-split log line by its tag.
//!
//! Every tag has a fixed field count (or a small set of them). A line whose
//! shape does not match decodes to [`VslLine::Other`] and is ignored.

use std::fmt;

use super::END_TAG;

/// Which half of the cache produced a `Req*`/`Bereq*` style record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Backend,
}

impl Side {
    fn request_prefix(self) -> &'static str {
        match self {
            Side::Client => "Req",
            Side::Backend => "Bereq",
        }
    }

    fn response_prefix(self) -> &'static str {
        match self {
            Side::Client => "Resp",
            Side::Backend => "Beresp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VslLine<'a> {
    /// `*   << Request  >> 5`
    Header { marker: &'a str, kind: &'a str, vxid: &'a str },
    /// `-   Begin          req 4 esi 1`
    Begin { record_type: &'a str, parent: &'a str, reason: &'a str, esi: Option<&'a str> },
    /// `--  Link           req 13 esi 2`
    Link { record_type: &'a str, vxid: &'a str, reason: &'a str, esi: Option<&'a str> },
    Url { side: Side, url: &'a str },
    Host { side: Side, host: &'a str },
    Method { side: Side, method: &'a str },
    Status { side: Side, code: &'a str },
    StatusReason { side: Side, reason: String },
    /// Label without its trailing `:`.
    Timestamp { label: &'a str, absolute: &'a str, since_start: &'a str, since_last: &'a str },
    /// Fields after the `TTL` tag (6 or 10 of them).
    Ttl { fields: &'a [&'a str] },
    VclCall { state: &'a str },
    VclReturn { outcome: &'a str },
    /// The six numeric fields after `ReqAcct`/`BereqAcct`.
    Acct { side: Side, fields: &'a [&'a str] },
    SessClose { reason: &'a str, duration: &'a str },
    /// `-   VSL            store overflow`
    VslOverflow,
    /// Fields after the `SessOpen` tag.
    SessOpen { fields: &'a [&'a str] },
    End,
    Other,
}

impl<'a> VslLine<'a> {
    /// Decode already split fields. `parts[1]` is the tag.
    pub fn decode(parts: &'a [&'a str]) -> Self {
        let len = parts.len();

        if len == 5 && parts[0].starts_with('*') {
            return VslLine::Header { marker: parts[0], kind: parts[2], vxid: parts[4] };
        }
        if len < 2 {
            return VslLine::Other;
        }

        match parts[1] {
            "Begin" if len > 4 => VslLine::Begin {
                record_type: parts[2],
                parent: parts[3],
                reason: parts[4],
                esi: esi_suffix(parts),
            },
            "Link" if len > 4 => VslLine::Link {
                record_type: parts[2],
                vxid: parts[3],
                reason: parts[4],
                esi: esi_suffix(parts),
            },
            "ReqURL" if len == 3 => VslLine::Url { side: Side::Client, url: parts[2] },
            "BereqURL" if len == 3 => VslLine::Url { side: Side::Backend, url: parts[2] },
            "ReqHeader" => decode_host(Side::Client, parts),
            "BereqHeader" => decode_host(Side::Backend, parts),
            "ReqMethod" if len == 3 => VslLine::Method { side: Side::Client, method: parts[2] },
            "BereqMethod" if len == 3 => VslLine::Method { side: Side::Backend, method: parts[2] },
            "RespStatus" if len == 3 => VslLine::Status { side: Side::Client, code: parts[2] },
            "BerespStatus" if len == 3 => VslLine::Status { side: Side::Backend, code: parts[2] },
            "RespReason" if len >= 3 => VslLine::StatusReason {
                side: Side::Client,
                reason: parts[2..].join(" "),
            },
            "BerespReason" if len >= 3 => VslLine::StatusReason {
                side: Side::Backend,
                reason: parts[2..].join(" "),
            },
            "Timestamp" if len == 6 => VslLine::Timestamp {
                label: parts[2].strip_suffix(':').unwrap_or(parts[2]),
                absolute: parts[3],
                since_start: parts[4],
                since_last: parts[5],
            },
            "TTL" if len == 8 || len == 12 => VslLine::Ttl { fields: &parts[2..] },
            "VCL_call" if len == 3 => VslLine::VclCall { state: parts[2] },
            "VCL_return" if len == 3 => VslLine::VclReturn { outcome: parts[2] },
            "ReqAcct" if len == 8 => VslLine::Acct { side: Side::Client, fields: &parts[2..] },
            "BereqAcct" if len == 8 => VslLine::Acct { side: Side::Backend, fields: &parts[2..] },
            "SessClose" if len == 4 => VslLine::SessClose { reason: parts[2], duration: parts[3] },
            "VSL" if len >= 4 && parts[3] == "overflow" => VslLine::VslOverflow,
            "SessOpen" if len >= 4 => VslLine::SessOpen { fields: &parts[2..] },
            END_TAG => VslLine::End,
            _ => VslLine::Other,
        }
    }
}

fn esi_suffix<'a>(parts: &[&'a str]) -> Option<&'a str> {
    if parts[4] == "esi" {
        parts.get(5).copied()
    } else {
        None
    }
}

/// `host: www.example.com` (4 fields) or `Host:www.example.com` (3 fields).
fn decode_host<'a>(side: Side, parts: &[&'a str]) -> VslLine<'a> {
    if parts.len() < 3 || !parts[2].to_ascii_lowercase().starts_with("host:") {
        return VslLine::Other;
    }
    match parts.len() {
        4 => VslLine::Host { side, host: parts[3] },
        3 => match parts[2].split(':').nth(1) {
            Some(host) if !host.is_empty() => VslLine::Host { side, host },
            _ => VslLine::Other,
        },
        _ => VslLine::Other,
    }
}

/// Canonical single-line form, decodable back into the same variant.
impl fmt::Display for VslLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VslLine::Header { marker, kind, vxid } => write!(f, "{marker} << {kind} >> {vxid}"),
            VslLine::Begin { record_type, parent, reason, esi } => {
                write!(f, "- Begin {record_type} {parent} {reason}")?;
                write_esi(f, *esi)
            }
            VslLine::Link { record_type, vxid, reason, esi } => {
                write!(f, "- Link {record_type} {vxid} {reason}")?;
                write_esi(f, *esi)
            }
            VslLine::Url { side, url } => write!(f, "- {}URL {url}", side.request_prefix()),
            VslLine::Host { side, host } => write!(f, "- {}Header host: {host}", side.request_prefix()),
            VslLine::Method { side, method } => write!(f, "- {}Method {method}", side.request_prefix()),
            VslLine::Status { side, code } => write!(f, "- {}Status {code}", side.response_prefix()),
            VslLine::StatusReason { side, reason } => {
                write!(f, "- {}Reason {reason}", side.response_prefix())
            }
            VslLine::Timestamp { label, absolute, since_start, since_last } => {
                write!(f, "- Timestamp {label}: {absolute} {since_start} {since_last}")
            }
            VslLine::Ttl { fields } => write!(f, "- TTL {}", fields.join(" ")),
            VslLine::VclCall { state } => write!(f, "- VCL_call {state}"),
            VslLine::VclReturn { outcome } => write!(f, "- VCL_return {outcome}"),
            VslLine::Acct { side, fields } => {
                write!(f, "- {}Acct {}", side.request_prefix(), fields.join(" "))
            }
            VslLine::SessClose { reason, duration } => write!(f, "- SessClose {reason} {duration}"),
            VslLine::VslOverflow => f.write_str("- VSL store overflow"),
            VslLine::SessOpen { fields } => write!(f, "- SessOpen {}", fields.join(" ")),
            VslLine::End => write!(f, "- {END_TAG}"),
            VslLine::Other => Ok(()),
        }
    }
}

fn write_esi(f: &mut fmt::Formatter<'_>, esi: Option<&str>) -> fmt::Result {
    match esi {
        Some(id) => write!(f, " {id}"),
        None => Ok(()),
    }
}
