//! The user's farm activity as one list.
//!
//! Indexers report one harvest (or vest) record per pool and reward token,
//! with ids of the form `<tx hash>-<log index>`. Records of the same
//! transaction and reward token are shown as a single entry.

use std::fmt;

use amm_helpers::math::MathError;
use farm_trait::{
    Address,
    Timestamp,
};
use primitive_types::U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryMethod {
    Deposit,
    Withdraw,
    Harvest,
    /// Vested rewards claimed.
    Claim,
}

impl HistoryMethod {
    fn merges(&self) -> bool {
        matches!(self, HistoryMethod::Harvest | HistoryMethod::Claim)
    }
}

impl fmt::Display for HistoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HistoryMethod::Deposit => "deposit",
            HistoryMethod::Withdraw => "withdraw",
            HistoryMethod::Harvest => "harvest",
            HistoryMethod::Claim => "claim",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: Timestamp,
    pub method: HistoryMethod,
    pub amount: U256,
    pub stake_token: Address,
    /// Set for harvests and claims.
    pub reward_token: Option<Address>,
}

impl HistoryEntry {
    pub fn tx_hash(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }
}

/// Merges harvest and claim records of one transaction per reward token,
/// then orders newest first. Ties keep input order.
pub fn merge_history(
    records: impl IntoIterator<Item = HistoryEntry>,
) -> Result<Vec<HistoryEntry>, MathError> {
    let mut merged: Vec<HistoryEntry> = Vec::new();
    for record in records {
        if record.method.merges() {
            let existing = merged.iter_mut().find(|entry| {
                entry.method == record.method
                    && entry.reward_token == record.reward_token
                    && entry.tx_hash() == record.tx_hash()
            });
            if let Some(entry) = existing {
                entry.amount = entry
                    .amount
                    .checked_add(record.amount)
                    .ok_or(MathError::AddOverflow(20))?;
                continue
            }
        }
        merged.push(record);
    }
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(merged)
}
