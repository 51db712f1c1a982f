use std::fmt;
use std::str::FromStr;

/// Rendered for unset times on read-only surfaces.
pub const UNSET_PLACEHOLDER: &str = "--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn as_str(self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }

    pub fn parse(s: &str) -> Option<Meridiem> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Some(Meridiem::Am),
            "PM" => Some(Meridiem::Pm),
            _ => None,
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 12-hour clock hour, 1..=12. Constructed only through `new`, so a held
/// value is always a valid picker option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hour12(u8);

impl Hour12 {
    pub fn new(v: u8) -> Option<Hour12> {
        (1..=12).contains(&v).then_some(Hour12(v))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The fixed option set a time picker offers: 01..12.
    pub fn options() -> impl Iterator<Item = Hour12> {
        (1..=12).map(Hour12)
    }
}

impl fmt::Display for Hour12 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Minute of the hour, 0..=59.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minute(u8);

impl Minute {
    pub fn new(v: u8) -> Option<Minute> {
        (v <= 59).then_some(Minute(v))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The fixed option set a time picker offers: 00..59, no quantization.
    pub fn options() -> impl Iterator<Item = Minute> {
        (0..=59).map(Minute)
    }
}

impl fmt::Display for Minute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// The stored/wire time representation: a 24-hour `HH:MM` value. This is the
/// only form that ever reaches SQLite or a response body; 12-hour triples are
/// edit-session state that always reduces back to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalTime {
    hour: u8,
    minute: u8,
}

impl CanonicalTime {
    pub const MIDNIGHT: CanonicalTime = CanonicalTime { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Option<CanonicalTime> {
        (hour <= 23 && minute <= 59).then_some(CanonicalTime { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }
}

impl fmt::Display for CanonicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseTimeError;

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected a zero-padded 24-hour HH:MM time")
    }
}

impl std::error::Error for ParseTimeError {}

impl FromStr for CanonicalTime {
    type Err = ParseTimeError;

    /// Accepts exactly the 5-character zero-padded form. Anything looser
    /// ("8:05", trailing text, out-of-range fields) is rejected so stored
    /// values stay byte-comparable.
    fn from_str(s: &str) -> Result<CanonicalTime, ParseTimeError> {
        let b = s.as_bytes();
        if b.len() != 5 || b[2] != b':' {
            return Err(ParseTimeError);
        }
        if !b[0].is_ascii_digit()
            || !b[1].is_ascii_digit()
            || !b[3].is_ascii_digit()
            || !b[4].is_ascii_digit()
        {
            return Err(ParseTimeError);
        }
        let hour = (b[0] - b'0') * 10 + (b[1] - b'0');
        let minute = (b[3] - b'0') * 10 + (b[4] - b'0');
        CanonicalTime::new(hour, minute).ok_or(ParseTimeError)
    }
}

/// The three-part 12-hour representation a time picker edits. Field types
/// make every representable triple reduce to a valid `CanonicalTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTime {
    pub hour12: Hour12,
    pub minute: Minute,
    pub meridiem: Meridiem,
}

impl Default for DisplayTime {
    /// Midnight shown the 12-hour way: 12:00 AM.
    fn default() -> DisplayTime {
        DisplayTime {
            hour12: Hour12(12),
            minute: Minute(0),
            meridiem: Meridiem::Am,
        }
    }
}

impl DisplayTime {
    pub fn from_canonical(t: CanonicalTime) -> DisplayTime {
        let meridiem = if t.hour() >= 12 {
            Meridiem::Pm
        } else {
            Meridiem::Am
        };
        // 0 and 12 both land on 12 o'clock.
        let h = t.hour() % 12;
        let h = if h == 0 { 12 } else { h };
        DisplayTime {
            hour12: Hour12(h),
            minute: Minute(t.minute()),
            meridiem,
        }
    }

    pub fn to_canonical(self) -> CanonicalTime {
        let mut hour = self.hour12.0;
        match self.meridiem {
            Meridiem::Pm if hour != 12 => hour += 12,
            Meridiem::Am if hour == 12 => hour = 0,
            _ => {}
        }
        CanonicalTime {
            hour,
            minute: self.minute.0,
        }
    }
}

impl fmt::Display for DisplayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.hour12, self.minute, self.meridiem)
    }
}

/// Derive the editable triple from a stored value. Unset values get the
/// fixed 12:00 AM default; a malformed stored value degrades to the same
/// default rather than carrying garbage into the picker.
pub fn to_display(raw: Option<&str>) -> DisplayTime {
    match raw {
        Some(s) if !s.is_empty() => s
            .parse::<CanonicalTime>()
            .map(DisplayTime::from_canonical)
            .unwrap_or_default(),
        _ => DisplayTime::default(),
    }
}

/// One-way formatter for read-only surfaces: `"HH:MM AM|PM"`. Never fails —
/// unset values render as the placeholder and a malformed stored value is
/// passed back verbatim so the caller still has something to show.
pub fn format_display(raw: Option<&str>) -> String {
    let Some(s) = raw.filter(|s| !s.is_empty()) else {
        return UNSET_PLACEHOLDER.to_string();
    };
    match s.parse::<CanonicalTime>() {
        Ok(t) => DisplayTime::from_canonical(t).to_string(),
        Err(_) => s.to_string(),
    }
}
