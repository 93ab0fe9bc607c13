use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{Calendar, Holiday, holidays};

pub const DOCUMENT_VERSION: u32 = 1;

pub type AssignmentSet = BTreeMap<NaiveDate, Vec<String>>;
pub type CommentMap = BTreeMap<NaiveDate, String>;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub calendars: Vec<Calendar>,
    #[serde(default)]
    pub assignments: AssignmentSet,
    #[serde(default)]
    pub comments: CommentMap,
    #[serde(default, deserialize_with = "holidays::deserialize_lenient")]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub active_id: Option<String>,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            calendars: Vec::new(),
            assignments: AssignmentSet::new(),
            comments: CommentMap::new(),
            holidays: Vec::new(),
            active_id: None,
            version: DOCUMENT_VERSION,
        }
    }
}

impl Document {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn calendar(&self, id: &str) -> Option<&Calendar> {
        self.calendars.iter().find(|calendar| calendar.id == id)
    }

    pub fn has_calendar(&self, id: &str) -> bool {
        self.calendar(id).is_some()
    }

    pub fn apply_patch(&mut self, patch: DocumentPatch) {
        if let Some(calendars) = patch.calendars {
            self.calendars = calendars;
        }
        if let Some(assignments) = patch.assignments {
            self.assignments = assignments;
        }
        if let Some(comments) = patch.comments {
            self.comments = comments;
        }
        if let Some(holidays) = patch.holidays {
            self.holidays = holidays;
        }
        if let Some(active_id) = patch.active_id {
            self.active_id = active_id;
        }
        self.version = patch.version.unwrap_or(DOCUMENT_VERSION);
    }
}

/// Top-level keys accepted by a `PUT` to the persistence endpoint.
///
/// `active_id` distinguishes an absent key (`None`) from an explicit `null`
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendars: Option<Vec<Calendar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignments: Option<AssignmentSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<CommentMap>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present_holidays"
    )]
    pub holidays: Option<Vec<Holiday>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub active_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn deserialize_present_holidays<'de, D>(deserializer: D) -> Result<Option<Vec<Holiday>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    holidays::deserialize_lenient(deserializer).map(Some)
}

impl From<Document> for DocumentPatch {
    fn from(document: Document) -> Self {
        Self {
            calendars: Some(document.calendars),
            assignments: Some(document.assignments),
            comments: Some(document.comments),
            holidays: Some(document.holidays),
            active_id: Some(document.active_id),
            version: Some(document.version),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPayload {
    #[serde(default)]
    pub calendars: Vec<Calendar>,
    #[serde(default)]
    pub assignments: AssignmentSet,
    #[serde(default)]
    pub comments: CommentMap,
    #[serde(default, deserialize_with = "holidays::deserialize_lenient")]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub active_id: Option<String>,
}

impl ImportPayload {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

impl From<ExportedDocument> for ImportPayload {
    fn from(exported: ExportedDocument) -> Self {
        Self {
            calendars: exported.calendars,
            assignments: exported.assignments,
            comments: exported.comments,
            holidays: exported.holidays,
            active_id: exported.active_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedDocument {
    pub calendars: Vec<Calendar>,
    pub assignments: AssignmentSet,
    pub active_id: Option<String>,
    pub comments: CommentMap,
    pub holidays: Vec<Holiday>,
    pub exported_at: DateTime<Utc>,
    pub version: u32,
}

impl ExportedDocument {
    pub fn new(document: &Document, exported_at: DateTime<Utc>) -> Self {
        Self {
            calendars: document.calendars.clone(),
            assignments: document.assignments.clone(),
            active_id: document.active_id.clone(),
            comments: document.comments.clone(),
            holidays: document.holidays.clone(),
            exported_at,
            version: DOCUMENT_VERSION,
        }
    }

    pub fn file_name(&self) -> String {
        format!("tinymonth-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::HolidayKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn default_document_is_empty_version_one() {
        let document = Document::default();

        assert!(document.calendars.is_empty());
        assert!(document.assignments.is_empty());
        assert_eq!(document.active_id, None);
        assert_eq!(document.version, 1);
    }

    #[test]
    fn missing_fields_are_normalized_on_parse() {
        let document = Document::from_json(r#"{ "calendars": [] }"#).unwrap();

        assert_eq!(document, Document::default());
    }

    #[test]
    fn parses_camel_case_document() {
        let json = r##"{
            "calendars": [{ "id": "zurich", "name": "Zurich", "color": "#ff0000" }],
            "assignments": { "2024-06-02": ["zurich"] },
            "comments": { "2024-06-02": "Lake swim" },
            "activeId": "zurich",
            "version": 1
        }"##;

        let document = Document::from_json(json).unwrap();

        assert_eq!(document.active_id.as_deref(), Some("zurich"));
        assert_eq!(document.assignments[&date(2024, 6, 2)], vec!["zurich"]);
        assert_eq!(document.comments[&date(2024, 6, 2)], "Lake swim");
        assert!(document.has_calendar("zurich"));
    }

    #[test]
    fn malformed_date_key_is_rejected() {
        let result = Document::from_json(r#"{ "assignments": { "june": ["a"] } }"#);

        assert!(result.is_err());
    }

    #[test]
    fn foreign_holidays_do_not_block_the_document() {
        let json = r##"{
            "calendars": [{ "id": "zurich", "name": "Zurich", "color": "#00ff00" }],
            "assignments": { "2024-06-02": ["zurich"] },
            "holidays": [
                { "date": "2024-05-01", "name": "May Day", "type": "public" },
                { "date": "sometime", "name": "Broken", "type": "fixed" }
            ],
            "activeId": "zurich"
        }"##;

        let document = Document::from_json(json).unwrap();

        assert!(document.has_calendar("zurich"));
        assert_eq!(document.assignments[&date(2024, 6, 2)], vec!["zurich"]);
        assert_eq!(document.holidays.len(), 1);
        assert_eq!(document.holidays[0].kind, HolidayKind::Other);
    }

    #[test]
    fn patch_reads_holidays_leniently() {
        let patch: DocumentPatch =
            serde_json::from_str(r#"{ "holidays": [{ "date": "x", "name": "Broken", "type": "fixed" }] }"#).unwrap();

        assert_eq!(patch.holidays, Some(Vec::new()));
    }

    #[test]
    fn serializes_active_id_as_camel_case() {
        let document = Document {
            active_id: Some("work".to_string()),
            ..Document::default()
        };

        let json = serde_json::to_value(&document).unwrap();

        assert_eq!(json["activeId"], "work");
        assert_eq!(json["version"], 1);
    }

    #[test]
    fn patch_replaces_only_present_keys() {
        let mut document = Document {
            calendars: vec![Calendar::new("Work", "#000000")],
            active_id: Some("work".to_string()),
            version: 3,
            ..Document::default()
        };
        let patch: DocumentPatch =
            serde_json::from_str(r#"{ "assignments": { "2024-01-05": ["work"] } }"#).unwrap();

        document.apply_patch(patch);

        assert_eq!(document.calendars.len(), 1);
        assert_eq!(document.active_id.as_deref(), Some("work"));
        assert_eq!(document.assignments[&date(2024, 1, 5)], vec!["work"]);
        assert_eq!(document.version, 1);
    }

    #[test]
    fn patch_with_explicit_null_clears_active_id() {
        let mut document = Document {
            active_id: Some("work".to_string()),
            ..Document::default()
        };
        let patch: DocumentPatch = serde_json::from_str(r#"{ "activeId": null }"#).unwrap();

        document.apply_patch(patch);

        assert_eq!(document.active_id, None);
    }

    #[test]
    fn import_payload_defaults_missing_collections() {
        let payload = ImportPayload::from_json(r#"{ "calendars": [] }"#).unwrap();

        assert!(payload.assignments.is_empty());
        assert!(payload.comments.is_empty());
        assert!(payload.holidays.is_empty());
        assert_eq!(payload.active_id, None);
    }

    #[test]
    fn export_file_name_uses_export_date() {
        let exported_at = Utc.with_ymd_and_hms(2024, 6, 3, 10, 15, 0).unwrap();
        let exported = ExportedDocument::new(&Document::default(), exported_at);

        assert_eq!(exported.file_name(), "tinymonth-export-2024-06-03.json");
    }

    #[test]
    fn export_carries_timestamp_and_version() {
        let document = Document {
            holidays: holidays::generate(2024..=2024),
            version: 7,
            ..Document::default()
        };
        let exported_at = Utc.with_ymd_and_hms(2024, 6, 3, 10, 15, 0).unwrap();

        let json = serde_json::to_value(ExportedDocument::new(&document, exported_at)).unwrap();

        assert_eq!(json["exportedAt"], "2024-06-03T10:15:00Z");
        assert_eq!(json["version"], 1);
        assert_eq!(json["holidays"].as_array().map(Vec::len), Some(15));
    }
}
