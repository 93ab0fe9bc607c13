use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use thiserror::Error;

use crate::calendar::{
    AssignmentSet, Calendar, CalendarUpdate, CommentMap, Document, ExportedDocument, Holiday, ImportPayload,
    DEFAULT_HOLIDAY_YEARS, holidays,
};
use crate::input::DragSelector;
use crate::storage::DocumentStore;
use crate::sync::SyncEngine;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Calendar name must not be empty")]
    EmptyCalendarName,
    #[error("A calendar with id '{0}' already exists")]
    DuplicateCalendar(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Loading,
    Ready,
}

/// Owner of the in-memory document.
///
/// Mutators update the document synchronously and hand a full snapshot to the
/// [`SyncEngine`], which persists it in the background.
pub struct AppState {
    document: Document,
    lifecycle: Lifecycle,
    holiday_years: RangeInclusive<i32>,
    sync: SyncEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            document: Document::default(),
            lifecycle: Lifecycle::Loading,
            holiday_years: DEFAULT_HOLIDAY_YEARS,
            sync: SyncEngine::new(store),
        }
    }

    pub fn with_holiday_years(mut self, years: RangeInclusive<i32>) -> Self {
        self.holiday_years = years;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_loading(&self) -> bool {
        self.lifecycle == Lifecycle::Loading
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.document.calendars
    }

    pub fn active_id(&self) -> Option<&str> {
        self.document.active_id.as_deref()
    }

    pub fn active_calendar(&self) -> Option<&Calendar> {
        self.active_id().and_then(|id| self.document.calendar(id))
    }

    pub fn assignments(&self) -> &AssignmentSet {
        &self.document.assignments
    }

    pub fn comments(&self) -> &CommentMap {
        &self.document.comments
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.document.holidays
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    pub async fn load(&mut self) {
        match self.sync.fetch().await {
            Ok(mut document) => {
                document.holidays = holidays::generate(self.holiday_years.clone());
                tracing::info!(
                    "Loaded {} calendars, {} assigned dates and {} comments from {}",
                    document.calendars.len(),
                    document.assignments.len(),
                    document.comments.len(),
                    self.sync.store().describe()
                );
                self.document = document;
                self.persist();
            }
            Err(e) => {
                tracing::error!("Failed to load data, keeping current state: {}", e);
            }
        }
        self.lifecycle = Lifecycle::Ready;
    }

    /// Waits for all background writes issued so far.
    pub async fn settle(&mut self) {
        self.sync.settle().await;
    }

    fn persist(&mut self) {
        self.sync.persist(self.document.clone());
    }

    pub fn set_active_calendar(&mut self, id: &str) {
        self.document.active_id = Some(id.to_string());
        self.persist();
    }

    pub fn add_calendar(&mut self, name: &str, color: &str) -> Result<Calendar, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::EmptyCalendarName);
        }

        let calendar = Calendar::new(name, color);
        if self.document.has_calendar(&calendar.id) {
            tracing::warn!("Refusing to add calendar with duplicate id {}", calendar.id);
            return Err(AppError::DuplicateCalendar(calendar.id));
        }

        self.document.calendars.push(calendar.clone());
        self.document.active_id = Some(calendar.id.clone());
        self.persist();
        Ok(calendar)
    }

    pub fn update_calendar(&mut self, id: &str, update: &CalendarUpdate) -> bool {
        let Some(calendar) = self.document.calendars.iter_mut().find(|c| c.id == id) else {
            tracing::warn!("No calendar with id {} to update", id);
            return false;
        };

        calendar.apply(update);
        self.persist();
        true
    }

    pub fn clear_all_calendars(&mut self) {
        self.document.calendars.clear();
        self.document.active_id = None;
        self.persist();
    }

    pub fn get_assignments(&self, date: NaiveDate) -> &[String] {
        self.document
            .assignments
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_assigned(&self, date: NaiveDate, calendar_id: &str) -> bool {
        self.get_assignments(date).iter().any(|id| id == calendar_id)
    }

    pub fn calendars_for_date(&self, date: NaiveDate) -> Vec<&Calendar> {
        self.get_assignments(date)
            .iter()
            .filter_map(|id| self.document.calendar(id))
            .collect()
    }

    fn insert_assignment(&mut self, date: NaiveDate, calendar_id: &str) -> bool {
        let assigned = self.document.assignments.entry(date).or_default();
        if assigned.iter().any(|id| id == calendar_id) {
            return false;
        }
        assigned.push(calendar_id.to_string());
        true
    }

    fn delete_assignment(&mut self, date: NaiveDate, calendar_id: &str) -> bool {
        let Some(assigned) = self.document.assignments.get_mut(&date) else {
            return false;
        };

        let before = assigned.len();
        assigned.retain(|id| id != calendar_id);
        let removed = assigned.len() != before;
        if assigned.is_empty() {
            self.document.assignments.remove(&date);
        }
        removed
    }

    pub fn add_assignment(&mut self, date: NaiveDate, calendar_id: &str) {
        if self.insert_assignment(date, calendar_id) {
            self.persist();
        }
    }

    pub fn remove_assignment(&mut self, date: NaiveDate, calendar_id: &str) {
        if self.delete_assignment(date, calendar_id) {
            self.persist();
        }
    }

    /// Single-cell toggle. Returns whether the calendar is assigned afterwards.
    pub fn toggle_assignment(&mut self, date: NaiveDate, calendar_id: &str) -> bool {
        if self.is_assigned(date, calendar_id) {
            self.remove_assignment(date, calendar_id);
            false
        } else {
            self.add_assignment(date, calendar_id);
            true
        }
    }

    /// Batch toggle where the first date decides the direction for every date.
    pub fn toggle_multiple_assignments(&mut self, dates: &[NaiveDate], calendar_id: &str) {
        let Some(&first) = dates.first() else {
            return;
        };

        let should_add = !self.is_assigned(first, calendar_id);
        let mut changed = false;
        for &date in dates {
            changed |= if should_add {
                self.insert_assignment(date, calendar_id)
            } else {
                self.delete_assignment(date, calendar_id)
            };
        }

        tracing::debug!(
            "{} {} on {} dates starting {}",
            if should_add { "Assigned" } else { "Unassigned" },
            calendar_id,
            dates.len(),
            first
        );

        if changed {
            self.persist();
        }
    }

    /// Commits a drag gesture: one date toggles a single cell, more toggle the batch.
    pub fn apply_drag(&mut self, drag: &DragSelector) -> usize {
        let Some(calendar_id) = drag.calendar_id().map(str::to_string) else {
            return 0;
        };

        let range = drag.compute_range();
        match range.as_slice() {
            [] => {}
            [date] => {
                self.toggle_assignment(*date, &calendar_id);
            }
            dates => self.toggle_multiple_assignments(dates, &calendar_id),
        }
        range.len()
    }

    pub fn replace_all_assignments(&mut self, assignments: AssignmentSet) {
        self.document.assignments = normalize_assignments(assignments);
        self.persist();
    }

    pub fn clear_all_assignments(&mut self) {
        self.replace_all_assignments(AssignmentSet::new());
    }

    pub fn annual_day_count(&self, calendar_id: &str, year: i32) -> usize {
        self.document
            .assignments
            .iter()
            .filter(|(date, ids)| date.year() == year && ids.iter().any(|id| id == calendar_id))
            .count()
    }

    pub fn annual_stats(&self, year: i32) -> Vec<(&Calendar, usize)> {
        self.document
            .calendars
            .iter()
            .map(|calendar| (calendar, self.annual_day_count(&calendar.id, year)))
            .collect()
    }

    pub fn get_comment(&self, date: NaiveDate) -> &str {
        self.document.comments.get(&date).map(String::as_str).unwrap_or("")
    }

    pub fn set_comment(&mut self, date: NaiveDate, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.remove_comment(date);
            return;
        }

        self.document.comments.insert(date, text.to_string());
        self.persist();
    }

    pub fn remove_comment(&mut self, date: NaiveDate) {
        if self.document.comments.remove(&date).is_some() {
            self.persist();
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        holidays::is_holiday(&self.document.holidays, date)
    }

    pub fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        self.document
            .holidays
            .iter()
            .find(|holiday| holiday.date == date)
            .map(|holiday| holiday.name.as_str())
    }

    pub fn import_data(&mut self, payload: ImportPayload) {
        let ImportPayload {
            calendars,
            assignments,
            comments,
            holidays: imported_holidays,
            active_id,
        } = payload;

        self.document.calendars = calendars;
        self.document.assignments = normalize_assignments(assignments);
        self.document.comments = comments
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .collect();
        self.document.holidays = if imported_holidays.is_empty() {
            holidays::generate(self.holiday_years.clone())
        } else {
            imported_holidays
        };
        if active_id.is_some() {
            self.document.active_id = active_id;
        }

        tracing::info!(
            "Imported {} calendars and {} assigned dates",
            self.document.calendars.len(),
            self.document.assignments.len()
        );
        self.persist();
    }

    pub fn export_data(&self) -> ExportedDocument {
        ExportedDocument::new(&self.document, Utc::now())
    }
}

fn normalize_assignments(assignments: AssignmentSet) -> AssignmentSet {
    assignments
        .into_iter()
        .filter_map(|(date, ids)| {
            let mut seen = BTreeSet::new();
            let unique: Vec<String> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
            (!unique.is_empty()).then_some((date, unique))
        })
        .collect()
}
