//! Course listings as returned by the portal, plus the filtering, sorting and
//! export the course page offers.

use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

/// Placeholder for a missing day or time.
pub const TBA: &str = "TBA";

/// One course section, with the portal's field names on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Course {
    /// Code with faculty initials, e.g. `CSE110-MRK`
    #[serde(deserialize_with = "string_or_number")]
    pub course_code: String,
    #[serde(deserialize_with = "string_or_number")]
    pub section: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub seat_capacity: i64,
    #[serde(default)]
    pub seat_taken: i64,
    #[serde(default)]
    pub seats_left: i64,
    /// Raw schedule, e.g. `MW 10:10 AM-11:40 AM`
    #[serde(default)]
    pub time_slot_name: Option<String>,
    #[serde(default)]
    pub room_code: Option<String>,
}

impl Course {
    pub fn schedule(&self) -> Schedule {
        Schedule::parse(self.time_slot_name.as_deref())
    }

    /// Course code without the faculty initials: `CSE110-MRK` -> `CSE110`.
    pub fn clean_code(&self) -> &str {
        self.course_code
            .split('-')
            .next()
            .unwrap_or_default()
            .trim()
    }

    pub fn room(&self) -> &str {
        self.room_code.as_deref().unwrap_or(TBA)
    }

    pub fn is_available(&self) -> bool {
        self.seats_left > 0
    }

    /// Lower-cased text the tag search runs against.
    fn search_text(&self) -> String {
        let schedule = self.schedule();
        [
            self.course_code.as_str(),
            self.section.as_str(),
            self.short_name.as_str(),
            schedule.days.as_str(),
            schedule.time.as_str(),
            self.room(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// A department the portal offers courses for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "AcademicDepartmentId", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "AcademicDepartmentName")]
    pub name: String,
}

impl Department {
    /// Name without the redundant `Department of ` prefix.
    pub fn display_name(&self) -> &str {
        const PREFIX: &str = "department of ";
        let name = self.name.trim();
        match name.get(..PREFIX.len()) {
            Some(head) if head.eq_ignore_ascii_case(PREFIX) => name[PREFIX.len()..].trim(),
            _ => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    #[serde(rename = "SemesterId", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "SemesterName")]
    pub name: String,
}

/// The portal sends ids and sections as numbers or strings depending on the
/// endpoint; normalise to strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// Meeting days and time parsed out of a raw time slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Full day names joined with `, `, or `TBA`
    pub days: String,
    /// Everything after the day codes, or `TBA`
    pub time: String,
}

impl Schedule {
    pub fn tba() -> Self {
        Self {
            days: TBA.to_string(),
            time: TBA.to_string(),
        }
    }

    /// `"MW 10:10 AM-11:40 AM"` -> days `MONDAY, WEDNESDAY`, time
    /// `10:10 AM-11:40 AM`. Unknown day letters are dropped.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some("N/A") => return Self::tba(),
            Some(raw) => raw,
        };

        let mut parts = raw.split_whitespace();
        let Some(codes) = parts.next() else {
            return Self::tba();
        };

        let days: Vec<&str> = codes.chars().filter_map(day_name).collect();
        let time = parts.collect::<Vec<_>>().join(" ");

        Self {
            days: if days.is_empty() {
                TBA.to_string()
            } else {
                days.join(", ")
            },
            time: if time.is_empty() {
                TBA.to_string()
            } else {
                time
            },
        }
    }
}

fn day_name(code: char) -> Option<&'static str> {
    match code {
        'A' => Some("SATURDAY"),
        'S' => Some("SUNDAY"),
        'M' => Some("MONDAY"),
        'T' => Some("TUESDAY"),
        'W' => Some("WEDNESDAY"),
        'R' => Some("THURSDAY"),
        'F' => Some("FRIDAY"),
        _ => None,
    }
}

/// Ordering applied to a course list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Code,
    /// Most seats left first
    SeatsLeft,
    Name,
    Time,
}

impl SortKey {
    fn compare(self, a: &Course, b: &Course) -> Ordering {
        match self {
            SortKey::Code => a.course_code.cmp(&b.course_code),
            SortKey::SeatsLeft => b.seats_left.cmp(&a.seats_left),
            SortKey::Name => a.short_name.cmp(&b.short_name),
            SortKey::Time => a.schedule().time.cmp(&b.schedule().time),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(SortKey::Code),
            "seats-left" => Ok(SortKey::SeatsLeft),
            "name" => Ok(SortKey::Name),
            "time" => Ok(SortKey::Time),
            other => Err(format!(
                "unknown sort key `{other}` (expected code, seats-left, name or time)"
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Code => "code",
            SortKey::SeatsLeft => "seats-left",
            SortKey::Name => "name",
            SortKey::Time => "time",
        })
    }
}

/// Filters and ordering for a course list.
#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    /// Keep only sections with seats left
    pub available_only: bool,
    /// Keep sections matching any tag, case-insensitively
    pub tags: Vec<String>,
    pub sort: Option<SortKey>,
}

impl CourseQuery {
    pub fn matches(&self, course: &Course) -> bool {
        if self.available_only && !course.is_available() {
            return false;
        }
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        if tags.is_empty() {
            return true;
        }
        let text = course.search_text();
        tags.iter().any(|tag| text.contains(tag.as_str()))
    }

    /// Filter then sort. The sort is stable, so ties keep portal order.
    pub fn apply<'a>(&self, courses: &'a [Course]) -> Vec<&'a Course> {
        let mut selected: Vec<&Course> = courses.iter().filter(|c| self.matches(c)).collect();
        if let Some(key) = self.sort {
            selected.sort_by(|a, b| key.compare(a, b));
        }
        selected
    }
}

/// Flat row used for both exports.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Code")]
    code: &'a str,
    #[serde(rename = "Section")]
    section: &'a str,
    #[serde(rename = "Course Name")]
    name: &'a str,
    #[serde(rename = "Seats Taken")]
    seats_taken: i64,
    #[serde(rename = "Seat Capacity")]
    seat_capacity: i64,
    #[serde(rename = "Seats Left")]
    seats_left: i64,
    #[serde(rename = "Days")]
    days: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Room")]
    room: &'a str,
}

impl<'a> From<&'a Course> for ExportRow<'a> {
    fn from(course: &'a Course) -> Self {
        let Schedule { days, time } = course.schedule();
        Self {
            code: course.clean_code(),
            section: &course.section,
            name: &course.short_name,
            seats_taken: course.seat_taken,
            seat_capacity: course.seat_capacity,
            seats_left: course.seats_left,
            days,
            time,
            room: course.room(),
        }
    }
}

pub fn write_csv<W: io::Write>(courses: &[&Course], writer: W) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for course in courses {
        writer.serialize(ExportRow::from(*course))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: io::Write>(courses: &[&Course], writer: W) -> serde_json::Result<()> {
    let rows: Vec<ExportRow<'_>> = courses.iter().map(|c| ExportRow::from(*c)).collect();
    serde_json::to_writer_pretty(writer, &rows)
}
