//! Block: fold the lines of one delimited block into a transaction.

use tracing::debug;

use super::extract;
use super::line::{Side, VslLine};
use super::model::ParseError;
use super::{OVERFLOW_HOST, SESSION_PLACEHOLDER, UNTERMINATED_RETURN};
use crate::tx::{LinkState, RecordType, Tx, VclTransition};

/// Parse one block (header line through `End`) into a [`Tx`].
///
/// Only a missing header or an unparsable header vxid fails the block.
/// Malformed fields are logged and skipped.
pub fn parse_block(raw: Vec<String>) -> Result<Tx, ParseError> {
    let mut acc = TxAccumulator::default();

    for line in &raw {
        let parts: Vec<&str> = line.split_whitespace().collect();
        acc.apply(VslLine::decode(&parts))?;
    }

    let mut tx = acc.finish()?;
    tx.raw = raw;
    Ok(tx)
}

#[derive(Default)]
struct TxAccumulator {
    tx: Tx,
    header_seen: bool,
    pending_call: Option<String>,
}

impl TxAccumulator {
    fn apply(&mut self, line: VslLine<'_>) -> Result<(), ParseError> {
        let tx = &mut self.tx;

        match line {
            VslLine::Header { vxid, .. } => {
                tx.vxid = vxid
                    .parse::<u64>()
                    .map_err(|_| ParseError::InvalidVxid(vxid.to_string()))?;
                tx.txid = tx.vxid.to_string();
                self.header_seen = true;
            }
            VslLine::Begin { record_type, reason, esi, .. } => {
                tx.record_type = RecordType::from_tag(record_type);
                tx.reason = reason.to_string();
                if let Some(esi) = esi {
                    tx.txid = format!("{}_{}", tx.vxid, esi);
                }
            }
            VslLine::Link { vxid, esi, .. } => {
                let child = match esi {
                    Some(esi) => format!("{vxid}_{esi}"),
                    None => vxid.to_string(),
                };
                tx.children.insert(child, LinkState::Pending);
            }
            // Client side keeps the first value, backend side the last one.
            VslLine::Url { side, url } => {
                if side == Side::Backend || tx.url.is_empty() {
                    tx.url = url.to_string();
                }
            }
            VslLine::Host { side, host } => {
                if side == Side::Backend || tx.host.is_empty() {
                    tx.host = host.to_string();
                }
            }
            VslLine::Method { side, method } => {
                if side == Side::Backend || tx.method.is_empty() {
                    tx.method = method.to_string();
                }
            }
            VslLine::Status { code, .. } => match code.parse::<i32>() {
                Ok(code) => tx.status_code = code,
                Err(_) => debug!(txid = %tx.txid, code, "skipping unparsable status code"),
            },
            VslLine::StatusReason { reason, .. } => tx.status_reason = reason,
            VslLine::Timestamp { label, absolute, since_start, since_last } => {
                match extract::timestamp(label, absolute, since_start, since_last) {
                    Ok(ts) => tx.timestamps.push(ts),
                    Err(e) => debug!(txid = %tx.txid, error = %e, "skipping timestamp"),
                }
            }
            VslLine::Ttl { fields } => match extract::ttl(fields) {
                Ok(ttl) => tx.ttl.push(ttl),
                Err(e) => debug!(txid = %tx.txid, error = %e, "skipping TTL record"),
            },
            VslLine::VclCall { state } => {
                if let Some(open) = self.pending_call.replace(state.to_string()) {
                    tx.transitions.push(VclTransition {
                        call: open,
                        outcome: UNTERMINATED_RETURN.to_string(),
                    });
                }
            }
            VslLine::VclReturn { outcome } => match self.pending_call.take() {
                Some(call) => tx.transitions.push(VclTransition {
                    call,
                    outcome: outcome.to_string(),
                }),
                None => debug!(txid = %tx.txid, outcome, "VCL_return without VCL_call"),
            },
            VslLine::Acct { fields, .. } => match extract::accounting(fields) {
                Ok(acct) => tx.accounting = acct,
                Err(e) => debug!(txid = %tx.txid, error = %e, "skipping accounting record"),
            },
            VslLine::SessClose { reason, duration } if tx.is_session() => {
                match extract::timestamp(reason, "0", duration, duration) {
                    Ok(ts) => tx.timestamps.push(ts),
                    Err(e) => debug!(txid = %tx.txid, error = %e, "skipping session close"),
                }
            }
            VslLine::VslOverflow if tx.is_session() => tx.host = OVERFLOW_HOST.to_string(),
            VslLine::SessOpen { fields } if tx.is_session() => {
                tx.url = format!("SessOpen  {}", fields.join(" "));
            }
            _ => {}
        }

        Ok(())
    }

    fn finish(mut self) -> Result<Tx, ParseError> {
        if !self.header_seen {
            return Err(ParseError::MissingHeader);
        }

        if let Some(call) = self.pending_call.take() {
            self.tx.transitions.push(VclTransition {
                call,
                outcome: UNTERMINATED_RETURN.to_string(),
            });
        }

        let tx = &mut self.tx;
        if tx.is_session() {
            for field in [&mut tx.method, &mut tx.host, &mut tx.url] {
                if field.is_empty() {
                    *field = SESSION_PLACEHOLDER.to_string();
                }
            }
        }

        Ok(self.tx)
    }
}
