use crate::clock::{to_display, CanonicalTime, DisplayTime, Hour12, Meridiem, Minute};

/// Edit-session state for one time value: the picker-style control that lets
/// a caller change hour, minute, or meridiem independently while the stored
/// value stays a 24-hour string.
///
/// The owner of the canonical value constructs a `TimeField` from it, applies
/// one selection per user interaction, and persists whatever the selection
/// returns. Every selection returns a complete canonical value recomputed
/// from the full triple, never a partial edit. Dropping the field discards
/// the triple; the caller's canonical string is the durable state.
#[derive(Debug, Clone)]
pub struct TimeField {
    display: DisplayTime,
}

impl TimeField {
    pub fn new(value: Option<&str>) -> TimeField {
        TimeField {
            display: to_display(value),
        }
    }

    /// External value change: the owner swapped the underlying record (for
    /// example switched which day's routine is being edited). Re-derives the
    /// triple from the new value, discarding any in-progress edit.
    pub fn sync(&mut self, value: Option<&str>) {
        self.display = to_display(value);
    }

    pub fn display(&self) -> DisplayTime {
        self.display
    }

    pub fn select_hour(&mut self, hour12: Hour12) -> CanonicalTime {
        self.display.hour12 = hour12;
        self.emit()
    }

    pub fn select_minute(&mut self, minute: Minute) -> CanonicalTime {
        self.display.minute = minute;
        self.emit()
    }

    /// Selecting the already-active meridiem is value-idempotent but still
    /// emits, matching the other two selectors.
    pub fn set_meridiem(&mut self, meridiem: Meridiem) -> CanonicalTime {
        self.display.meridiem = meridiem;
        self.emit()
    }

    fn emit(&self) -> CanonicalTime {
        self.display.to_canonical()
    }
}
