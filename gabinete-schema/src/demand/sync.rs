use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::validation::{ValidationError, require_absent, require_non_blank};

/// Synchronization state of a demand with the CityHall case system.
///
/// Legal transitions:
/// - `pending -> synced` (sets `external_id`, clears `last_sync_error`)
/// - `pending -> error` (sets `last_sync_error`, keeps `external_id`)
/// - `error -> pending` (retry, clears `last_sync_error`)
/// - `synced -> pending` (re-submission)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Error,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 3] = [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }

    pub fn can_transition_to(self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::Synced)
                | (SyncStatus::Pending, SyncStatus::Error)
                | (SyncStatus::Error, SyncStatus::Pending)
                | (SyncStatus::Synced, SyncStatus::Pending)
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new(
                    "sync_status",
                    format!("unknown sync status `{s}`, expected pending, synced or error"),
                )
            })
    }
}

impl TryFrom<String> for SyncStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, ValidationError> {
        value.parse()
    }
}

/// Wire shape before the status string is checked against the enumeration.
#[derive(Deserialize)]
struct RawDemandCityHallSync {
    external_id: Option<String>,
    sync_status: Option<String>,
    last_sync_error: Option<String>,
}

impl TryFrom<RawDemandCityHallSync> for DemandCityHallSync {
    type Error = ValidationError;

    fn try_from(raw: RawDemandCityHallSync) -> Result<Self, Self::Error> {
        let sync_status = match raw.sync_status {
            Some(status) => status.parse()?,
            None => SyncStatus::default(),
        };
        Ok(Self {
            external_id: raw.external_id,
            sync_status,
            last_sync_error: raw.last_sync_error,
        })
    }
}

/// Narrow write payload used by the external-sync worker.
///
/// `from_json` reports an unknown `sync_status` as a `ValidationError` on that field; `validate`
/// enforces which of the other two fields each state may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDemandCityHallSync")]
pub struct DemandCityHallSync {
    /// Protocol number assigned by CityHall. Only accepted together with `synced`.
    pub external_id: Option<String>,
    pub sync_status: SyncStatus,
    /// Diagnostic text. Required with `error`, rejected otherwise.
    pub last_sync_error: Option<String>,
}

impl DemandCityHallSync {
    /// Decodes a worker payload, keeping the offending field name on failure.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        let raw: RawDemandCityHallSync = serde_json::from_value(value)
            .map_err(|e| ValidationError::new("body", e.to_string()))?;
        let sync = Self::try_from(raw)?;
        sync.validate()?;
        Ok(sync)
    }

    pub fn pending() -> Self {
        Self::default()
    }

    pub fn synced(external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            sync_status: SyncStatus::Synced,
            last_sync_error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            external_id: None,
            sync_status: SyncStatus::Error,
            last_sync_error: Some(error.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let external_id = self.external_id.as_deref();
        let last_sync_error = self.last_sync_error.as_deref();
        match self.sync_status {
            SyncStatus::Synced => {
                require_non_blank("external_id", external_id)?;
                require_absent("last_sync_error", last_sync_error, "when sync_status is synced")
            }
            SyncStatus::Error => {
                require_non_blank("last_sync_error", last_sync_error)?;
                require_absent("external_id", external_id, "when sync_status is error")
            }
            SyncStatus::Pending => {
                require_absent("external_id", external_id, "when sync_status is pending")?;
                require_absent("last_sync_error", last_sync_error, "when sync_status is pending")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_outside_the_enumeration() {
        let err = serde_json::from_str::<DemandCityHallSync>(r#"{"sync_status":"done"}"#);
        assert!(err.is_err());

        let ok: DemandCityHallSync = serde_json::from_str("{}").unwrap();
        assert_eq!(ok.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn unknown_status_names_the_field() {
        let err = DemandCityHallSync::from_json(serde_json::json!({ "sync_status": "done" }))
            .unwrap_err();
        assert_eq!(err.field, "sync_status");
        assert!(err.message.contains("done"));

        assert_eq!("synced".parse::<SyncStatus>().unwrap(), SyncStatus::Synced);
        assert_eq!("ERROR".parse::<SyncStatus>().unwrap_err().field, "sync_status");

        let wrong_shape = DemandCityHallSync::from_json(serde_json::json!({ "external_id": 7 }))
            .unwrap_err();
        assert_eq!(wrong_shape.field, "body");

        let synced = DemandCityHallSync::from_json(
            serde_json::json!({ "sync_status": "synced", "external_id": "PROT-2024-001" }),
        )
        .unwrap();
        assert_eq!(synced, DemandCityHallSync::synced("PROT-2024-001"));

        let missing_id =
            DemandCityHallSync::from_json(serde_json::json!({ "sync_status": "synced" }))
                .unwrap_err();
        assert_eq!(missing_id.field, "external_id");
    }

    #[test]
    fn field_presence_follows_the_state() {
        assert!(DemandCityHallSync::synced("PROT-2024-001").validate().is_ok());
        assert!(DemandCityHallSync::failed("timeout").validate().is_ok());
        assert!(DemandCityHallSync::pending().validate().is_ok());

        let missing_id = DemandCityHallSync {
            sync_status: SyncStatus::Synced,
            ..Default::default()
        };
        assert_eq!(missing_id.validate().unwrap_err().field, "external_id");

        let missing_error = DemandCityHallSync {
            sync_status: SyncStatus::Error,
            ..Default::default()
        };
        assert_eq!(missing_error.validate().unwrap_err().field, "last_sync_error");

        let pending_with_error = DemandCityHallSync {
            last_sync_error: Some("stale".into()),
            ..Default::default()
        };
        assert_eq!(
            pending_with_error.validate().unwrap_err().field,
            "last_sync_error"
        );

        let error_with_id = DemandCityHallSync {
            external_id: Some("PROT-9".into()),
            ..DemandCityHallSync::failed("boom")
        };
        assert_eq!(error_with_id.validate().unwrap_err().field, "external_id");
    }

    #[test]
    fn transitions() {
        use SyncStatus::*;
        assert!(Pending.can_transition_to(Synced));
        assert!(Pending.can_transition_to(Error));
        assert!(Error.can_transition_to(Pending));
        assert!(Synced.can_transition_to(Pending));

        assert!(!Error.can_transition_to(Synced));
        assert!(!Synced.can_transition_to(Error));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Synced.can_transition_to(Synced));
    }
}
