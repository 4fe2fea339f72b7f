//! Structured records and the documents derived from them.

use assistant_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eight record kinds held by the structured store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "apartments")]
    Apartment,
    #[serde(rename = "places")]
    Place,
    #[serde(rename = "whatsapp_groups")]
    WhatsAppGroup,
    #[serde(rename = "insurances")]
    Insurance,
    #[serde(rename = "general_info")]
    GeneralInfo,
    #[serde(rename = "banks")]
    Bank,
    #[serde(rename = "telecom_providers")]
    TelecomProvider,
    #[serde(rename = "useful_apps")]
    UsefulApp,
}

impl RecordKind {
    /// Every kind, in the order the index lists them.
    pub const ALL: [RecordKind; 8] = [
        RecordKind::Apartment,
        RecordKind::Place,
        RecordKind::WhatsAppGroup,
        RecordKind::Insurance,
        RecordKind::GeneralInfo,
        RecordKind::Bank,
        RecordKind::TelecomProvider,
        RecordKind::UsefulApp,
    ];

    /// Table name in the record store, also used as the document source kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Apartment => "apartments",
            Self::Place => "places",
            Self::WhatsAppGroup => "whatsapp_groups",
            Self::Insurance => "insurances",
            Self::GeneralInfo => "general_info",
            Self::Bank => "banks",
            Self::TelecomProvider => "telecom_providers",
            Self::UsefulApp => "useful_apps",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for RecordKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.table_name() == s)
            .ok_or_else(|| AppError::Schema(format!("Unknown record kind: '{}'", s)))
    }
}

/// Identity and timestamps shared by every record kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordMeta {
    /// Metadata for a record created now.
    pub fn new(id: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub available_from: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub rooms: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub details_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// One of "€", "€€", "€€€"
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatsAppGroup {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insurance {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub company_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub free_student_plan_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelecomProvider {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsefulApp {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub app_store_url: Option<String>,
    #[serde(default)]
    pub play_store_url: Option<String>,
}

/// A structured fact of one of the known kinds.
///
/// Serialized with an internal `kind` tag holding the table name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    #[serde(rename = "apartments")]
    Apartment(Apartment),
    #[serde(rename = "places")]
    Place(Place),
    #[serde(rename = "whatsapp_groups")]
    WhatsAppGroup(WhatsAppGroup),
    #[serde(rename = "insurances")]
    Insurance(Insurance),
    #[serde(rename = "general_info")]
    GeneralInfo(GeneralInfo),
    #[serde(rename = "banks")]
    Bank(Bank),
    #[serde(rename = "telecom_providers")]
    TelecomProvider(TelecomProvider),
    #[serde(rename = "useful_apps")]
    UsefulApp(UsefulApp),
}

impl Record {
    /// Decode an untyped record of the form `{"kind": "<table>", ...}`.
    ///
    /// Unknown or missing kinds and attribute values that do not fit the
    /// kind's schema are reported as `AppError::Schema`.
    pub fn from_value(value: serde_json::Value) -> AppResult<Self> {
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| AppError::Schema("Record is missing a 'kind' field".to_string()))?;
        let kind = RecordKind::from_str(kind)?;

        serde_json::from_value(value)
            .map_err(|e| AppError::Schema(format!("Invalid {} record: {}", kind, e)))
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Apartment(_) => RecordKind::Apartment,
            Self::Place(_) => RecordKind::Place,
            Self::WhatsAppGroup(_) => RecordKind::WhatsAppGroup,
            Self::Insurance(_) => RecordKind::Insurance,
            Self::GeneralInfo(_) => RecordKind::GeneralInfo,
            Self::Bank(_) => RecordKind::Bank,
            Self::TelecomProvider(_) => RecordKind::TelecomProvider,
            Self::UsefulApp(_) => RecordKind::UsefulApp,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Self::Apartment(r) => &r.meta,
            Self::Place(r) => &r.meta,
            Self::WhatsAppGroup(r) => &r.meta,
            Self::Insurance(r) => &r.meta,
            Self::GeneralInfo(r) => &r.meta,
            Self::Bank(r) => &r.meta,
            Self::TelecomProvider(r) => &r.meta,
            Self::UsefulApp(r) => &r.meta,
        }
    }

    pub fn id(&self) -> i64 {
        self.meta().id
    }
}

/// Where a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceKind {
    /// The sentinel document of an index built from an empty store.
    Placeholder,
    Record(RecordKind),
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placeholder => "empty",
            Self::Record(kind) => kind.table_name(),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for SourceKind {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "empty" {
            return Ok(Self::Placeholder);
        }
        RecordKind::from_str(&value).map(Self::Record)
    }
}

/// Text sentinel stored when the index is built from no records.
pub const PLACEHOLDER_TEXT: &str = "No data available yet";

/// Searchable text form of exactly one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source_kind: SourceKind,
    pub record_id: i64,
}

impl Document {
    /// The single document of an index over an empty store.
    pub fn placeholder() -> Self {
        Self {
            text: PLACEHOLDER_TEXT.to_string(),
            source_kind: SourceKind::Placeholder,
            record_id: 0,
        }
    }

    /// `(source_kind, record_id)` pair, unique within one index generation.
    pub fn provenance(&self) -> (SourceKind, i64) {
        (self.source_kind, self.record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trips_through_table_name() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_str(kind.table_name()).unwrap(), kind);
        }
    }

    #[test]
    fn test_from_value_apartment() {
        let record = Record::from_value(json!({
            "kind": "apartments",
            "id": 7,
            "created_at": "2024-10-01T08:00:00Z",
            "updated_at": "2024-10-02T08:00:00Z",
            "title": "Altstadt Studio",
            "address": "Domstraße 1",
            "price": 450.0
        }))
        .unwrap();

        assert_eq!(record.kind(), RecordKind::Apartment);
        assert_eq!(record.id(), 7);
        match record {
            Record::Apartment(apt) => {
                assert_eq!(apt.price, Some(450.0));
                assert!(apt.rooms.is_none());
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_from_value_listing_without_address() {
        let record = Record::from_value(json!({
            "kind": "apartments",
            "id": 8,
            "created_at": "2024-10-01T08:00:00Z",
            "updated_at": "2024-10-01T08:00:00Z",
            "title": "WG Zimmer Sanderau",
            "price": 380.0
        }))
        .unwrap();

        match record {
            Record::Apartment(apt) => {
                assert_eq!(apt.title.as_deref(), Some("WG Zimmer Sanderau"));
                assert!(apt.address.is_none());
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_from_value_null_title() {
        let record = Record::from_value(json!({
            "kind": "apartments",
            "id": 9,
            "created_at": "2024-10-01T08:00:00Z",
            "updated_at": "2024-10-01T08:00:00Z",
            "title": null,
            "price": 380.0
        }))
        .unwrap();

        match record {
            Record::Apartment(apt) => {
                assert!(apt.title.is_none());
                assert_eq!(apt.price, Some(380.0));
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_from_value_nameless_records_of_every_kind() {
        for kind in RecordKind::ALL {
            let record = Record::from_value(json!({
                "kind": kind.table_name(),
                "id": 1,
                "created_at": "2024-10-01T08:00:00Z",
                "updated_at": "2024-10-01T08:00:00Z"
            }))
            .unwrap();
            assert_eq!(record.kind(), kind);
        }
    }

    #[test]
    fn test_from_value_unknown_kind() {
        let err = Record::from_value(json!({"kind": "castles", "id": 1})).unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
        assert!(err.to_string().contains("castles"));
    }

    #[test]
    fn test_from_value_missing_kind() {
        let err = Record::from_value(json!({"id": 1, "name": "x"})).unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn test_from_value_wrong_attribute_type() {
        let err = Record::from_value(json!({
            "kind": "banks",
            "id": 1,
            "created_at": "2024-10-01T08:00:00Z",
            "updated_at": "2024-10-01T08:00:00Z",
            "name": "Sparkasse",
            "free_student_plan_available": "sometimes"
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn test_source_kind_serializes_as_table_name() {
        let doc = Document {
            text: "Bank: Sparkasse".to_string(),
            source_kind: SourceKind::Record(RecordKind::Bank),
            record_id: 3,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["source_kind"], "banks");

        let placeholder = serde_json::to_value(Document::placeholder()).unwrap();
        assert_eq!(placeholder["source_kind"], "empty");
        assert_eq!(placeholder["record_id"], 0);
    }

    #[test]
    fn test_source_kind_rejects_unknown() {
        let result: Result<Document, _> =
            serde_json::from_str(r#"{"text":"x","source_kind":"castles","record_id":1}"#);
        assert!(result.is_err());
    }
}
