//! Summary: one-transaction text forms used by list views and filters.

use crate::format::units::format_duration;
use crate::parser::SESSION_PLACEHOLDER;
use crate::tx::Tx;

/// Two-line summary.
///
/// ```text
/// 123 req 122 rxreq (200 OK)
/// GET www.example.com/path/to/asset
/// ```
///
/// Sessions have no status and show a non-placeholder host in parentheses.
pub fn summary(tx: &Tx) -> String {
    let parent = tx.parent_id().unwrap_or(SESSION_PLACEHOLDER);

    if tx.is_session() {
        let host = if tx.host.is_empty() || tx.host == SESSION_PLACEHOLDER {
            format!("{} ", tx.host)
        } else {
            format!("({}) ", tx.host)
        };
        return format!(
            "{} {} {} {}\n{} {}{}",
            tx.txid, tx.record_type, parent, tx.reason, tx.method, host, tx.url
        );
    }

    format!(
        "{} {} {} {} ({} {})\n{} {}{}",
        tx.txid,
        tx.record_type,
        parent,
        tx.reason,
        tx.status_code,
        tx.status_reason,
        tx.method,
        tx.host,
        tx.url
    )
}

/// `Start(0s) → Fetch(140µs) → Resp(32µs)`
pub fn timestamps_flow(tx: &Tx) -> String {
    tx.timestamps
        .iter()
        .map(|ts| format!("{}({})", ts.label, format_duration(ts.since_last)))
        .collect::<Vec<_>>()
        .join(" → ")
}

/// [`summary`] plus a third line with the total duration and the checkpoint chain.
pub fn item(tx: &Tx) -> String {
    format!(
        "{}\n{} total for {}",
        summary(tx),
        format_duration(tx.sum_of_since_last()),
        timestamps_flow(tx)
    )
}

/// Single-line text the list filter matches against.
pub fn filter_text(tx: &Tx) -> String {
    summary(tx).replace('\n', " ")
}

/// `(header, value)` rows describing a request or backend request.
/// Empty for sessions.
pub fn info_rows(tx: &Tx) -> Vec<(&'static str, String)> {
    if tx.is_session() {
        return Vec::new();
    }

    let children = if tx.children.is_empty() {
        "-".to_string()
    } else {
        tx.children.keys().cloned().collect::<Vec<_>>().join(", ")
    };

    vec![
        ("Parent", tx.parent_id().unwrap_or("-").to_string()),
        ("Reason", tx.reason.clone()),
        ("Request", format!("{} {}{}", tx.method, tx.host, tx.url)),
        ("Status", format!("{} {}", tx.status_code, tx.status_reason)),
        ("Children", children),
    ]
}

pub const TTL_HEADERS: [&str; 10] = [
    "Source", "TTL", "Grace", "Keep", "Reference", "Age", "Date", "Expires", "MaxAge", "CacheStatus",
];

/// One row per TTL snapshot. Short-form snapshots show `-` for the detail columns.
pub fn ttl_rows(tx: &Tx) -> Vec<Vec<String>> {
    tx.ttl
        .iter()
        .map(|ttl| {
            let mut row = vec![
                ttl.source.as_str().to_string(),
                ttl.ttl.to_string(),
                ttl.grace.to_string(),
                ttl.keep.to_string(),
                ttl.reference.to_rfc3339(),
            ];
            match &ttl.detail {
                Some(d) => row.extend([
                    d.age.to_string(),
                    d.date.to_rfc3339(),
                    d.expires.to_rfc3339(),
                    d.max_age.to_string(),
                ]),
                None => row.extend(std::iter::repeat("-".to_string()).take(4)),
            }
            row.push(ttl.cache_status.clone());
            row
        })
        .collect()
}
