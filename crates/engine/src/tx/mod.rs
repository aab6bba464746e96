//! Tx: the transaction record shared by every other module.

pub mod model;

pub use model::{
    LinkState, RecordType, RequestAccounting, Timestamp, TtlData, TtlDetail, TtlSource, Tx,
    VclTransition,
};
