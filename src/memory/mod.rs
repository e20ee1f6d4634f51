//! Durable per-user memory: long-term facts and the turn history log.
//!
//! Both stores partition data by a sanitized user id, one file per user.

pub mod facts;
pub mod history;

pub use facts::{FactStore, FileFactStore, Facts};
pub use history::{FileHistoryStore, HistoryItem, HistoryStore, TurnKind};

/// Reduce a user id to a filesystem-safe stem.
///
/// Keeps ASCII and Unicode alphanumerics plus `-`, `_` and `:`. An id with
/// nothing left maps to `"anonymous"`.
pub fn sanitize_user_id(user_id: &str) -> String {
    let safe: String = user_id
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':'))
        .collect();
    if safe.is_empty() {
        "anonymous".to_owned()
    } else {
        safe
    }
}
