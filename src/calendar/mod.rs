pub mod calendar_type;
pub mod document;
pub mod holidays;

pub use calendar_type::{Calendar, CalendarUpdate, DEFAULT_CALENDAR_COLOR, slugify, display_name_from_id};
pub use document::{
    AssignmentSet, CommentMap, Document, DocumentPatch, ExportedDocument, ImportPayload, DOCUMENT_VERSION,
};
pub use holidays::{Holiday, HolidayKind, DEFAULT_HOLIDAY_YEARS};
