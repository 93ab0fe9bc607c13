use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        anchor: NaiveDate,
        current: NaiveDate,
        calendar_id: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragSelector {
    state: DragState,
}

impl DragSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn calendar_id(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging { calendar_id, .. } => Some(calendar_id),
            DragState::Idle => None,
        }
    }

    pub fn start_drag(&mut self, date: NaiveDate, calendar_id: impl Into<String>) {
        self.state = DragState::Dragging {
            anchor: date,
            current: date,
            calendar_id: calendar_id.into(),
        };
    }

    pub fn update_drag(&mut self, date: NaiveDate) {
        if let DragState::Dragging { current, .. } = &mut self.state {
            *current = date;
        }
    }

    pub fn end_drag(&mut self) {
        self.state = DragState::Idle;
    }

    /// Pointer released anywhere, not necessarily over the grid.
    pub fn release_anywhere(&mut self) {
        if self.is_dragging() {
            self.end_drag();
        }
    }

    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.state {
            DragState::Dragging { anchor, current, .. } => {
                if anchor <= current {
                    Some((anchor, current))
                } else {
                    Some((current, anchor))
                }
            }
            DragState::Idle => None,
        }
    }

    pub fn compute_range(&self) -> Vec<NaiveDate> {
        match self.bounds() {
            Some((start, end)) => start.iter_days().take_while(|date| *date <= end).collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.bounds()
            .is_some_and(|(start, end)| date >= start && date <= end)
    }
}
