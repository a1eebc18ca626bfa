//! Shared data types for statements and transactions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The toll portals this crate knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderId {
    DriveEzMd,
    EzPassNy,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::DriveEzMd => "driveEzMd",
            ProviderId::EzPassNy => "ezPassNy",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driveEzMd" => Ok(ProviderId::DriveEzMd),
            "ezPassNy" => Ok(ProviderId::EzPassNy),
            other => Err(format!("unknown provider id: {}", other)),
        }
    }
}

/// One downloaded billing document for a provider and period.
///
/// Uniquely keyed by `(provider, statement_date)`; re-acquiring the same key
/// updates the stored file path and download timestamp in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementMetadata {
    pub provider: ProviderId,
    pub statement_date: NaiveDate,
    /// Reserved; no current provider reports a billing period.
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub file_path: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

/// One toll event attributed to a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TollTransaction {
    pub provider: ProviderId,
    pub statement_date: NaiveDate,
    pub transaction_date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    pub plate: Option<String>,
    pub transponder: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Signed minor currency units; credits and adjustments are negative.
    pub amount_cents: i64,
}

/// Writable directories handed to each provider.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub download_dir: PathBuf,
    pub processed_dir: PathBuf,
}

/// Read-side aggregate row: summed amount per plate or transponder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTotal {
    pub key: String,
    pub amount_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_round_trip() {
        for id in [ProviderId::DriveEzMd, ProviderId::EzPassNy] {
            assert_eq!(id.as_str().parse::<ProviderId>().unwrap(), id);
        }
        assert!("ezPassXx".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_transaction_serializes_dates_as_iso() {
        let txn = TollTransaction {
            provider: ProviderId::EzPassNy,
            statement_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            posted_date: None,
            plate: Some("ABC123".into()),
            transponder: None,
            location: None,
            description: Some("EZPASS TOLL PLAZA".into()),
            amount_cents: 450,
        };

        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["statementDate"], "2024-03-01");
        assert_eq!(json["transactionDate"], "2024-02-14");
        assert_eq!(json["provider"], "ezPassNy");
        assert_eq!(json["amountCents"], 450);
    }
}
