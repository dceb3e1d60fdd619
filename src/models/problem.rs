//! The scheduling problem: every read-only input of one run.

use serde::{Deserialize, Serialize};

use super::{
    Channel, Employee, EmploymentGroup, ForecastRow, OperatingHours, PriorityWindow,
    ShiftTemplate, SkillGroup, TimeIndex,
};

/// An input section the schema reserves for future use.
///
/// Reserved sections are kept verbatim so later versions can give them
/// meaning without a schema break; the model ignores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Reserved {
    /// The section was not supplied.
    #[default]
    Absent,
    /// The section was supplied and is ignored.
    Ignored(Vec<serde_json::Value>),
}

impl Reserved {
    /// Wraps raw section entries.
    pub fn from_entries(entries: Vec<serde_json::Value>) -> Self {
        if entries.is_empty() {
            Self::Absent
        } else {
            Self::Ignored(entries)
        }
    }

    /// Number of ignored entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Ignored(entries) => entries.len(),
        }
    }

    /// Whether nothing was supplied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All inputs of one scheduling run.
///
/// Constructed once, then only read. Collections keep input order; the
/// model relies on that order for deterministic variable numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Horizon index.
    pub time: TimeIndex,
    /// Contact channels.
    pub channels: Vec<Channel>,
    /// Skill groups demand is forecast for.
    pub skill_groups: Vec<SkillGroup>,
    /// Employment contracts.
    pub employment_groups: Vec<EmploymentGroup>,
    /// Schedulable employees.
    pub employees: Vec<Employee>,
    /// Shift templates.
    pub templates: Vec<ShiftTemplate>,
    /// Raw forecast rows.
    pub forecast: Vec<ForecastRow>,
    /// Priority windows, in definition order.
    pub priority_windows: Vec<PriorityWindow>,
    /// Stream opening hours (informational).
    pub operating_hours: Vec<OperatingHours>,
    /// Reserved `agent_groups` section.
    pub agent_groups: Reserved,
    /// Reserved `skills` section.
    pub skills: Reserved,
}

impl Problem {
    /// Creates an empty problem over a horizon.
    pub fn new(time: TimeIndex) -> Self {
        Self {
            time,
            channels: Vec::new(),
            skill_groups: Vec::new(),
            employment_groups: Vec::new(),
            employees: Vec::new(),
            templates: Vec::new(),
            forecast: Vec::new(),
            priority_windows: Vec::new(),
            operating_hours: Vec::new(),
            agent_groups: Reserved::Absent,
            skills: Reserved::Absent,
        }
    }

    /// Adds a skill group.
    pub fn with_skill_group(mut self, group: SkillGroup) -> Self {
        self.skill_groups.push(group);
        self
    }

    /// Adds an employment group.
    pub fn with_employment_group(mut self, group: EmploymentGroup) -> Self {
        self.employment_groups.push(group);
        self
    }

    /// Adds an employee.
    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.employees.push(employee);
        self
    }

    /// Adds a shift template.
    pub fn with_template(mut self, template: ShiftTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Adds a forecast row.
    pub fn with_forecast(mut self, row: ForecastRow) -> Self {
        self.forecast.push(row);
        self
    }

    /// Adds a priority window (later windows win ties).
    pub fn with_priority_window(mut self, window: PriorityWindow) -> Self {
        self.priority_windows.push(window);
        self
    }

    /// Finds a skill group by ID.
    pub fn skill_group(&self, id: &str) -> Option<&SkillGroup> {
        self.skill_groups.iter().find(|g| g.id == id)
    }

    /// Finds an employment group by ID.
    pub fn employment_group(&self, id: &str) -> Option<&EmploymentGroup> {
        self.employment_groups.iter().find(|g| g.id == id)
    }

    /// Finds an employee by ID.
    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    /// Finds a template by ID.
    pub fn template(&self, id: &str) -> Option<&ShiftTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Whether a stream is open at a bucket, per `operating_hours`.
    ///
    /// `None` when the stream has no operating hours defined.
    pub fn is_stream_open(&self, direction: &str, channel: &str, day: u32, bucket: u32) -> Option<bool> {
        let weekday = self.time.day_of_week(day);
        let minute = self.time.bucket_start_minute(bucket);
        let mut defined = false;
        for hours in self
            .operating_hours
            .iter()
            .filter(|h| h.stream.matches(direction, channel))
        {
            defined = true;
            if hours.is_open(weekday, minute) {
                return Some(true);
            }
        }
        defined.then_some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClockWindow, DaySet, HoursRange, Stream};
    use chrono::NaiveDate;

    fn problem() -> Problem {
        let time = TimeIndex::standard(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        Problem::new(time)
            .with_skill_group(SkillGroup::new("sales", "Sales"))
            .with_employment_group(EmploymentGroup::new(
                "FT",
                HoursRange::new(0.0, 40.0),
                HoursRange::new(8.0, 8.0),
            ))
            .with_employee(Employee::new("e1", "FT").with_skill_groups(["sales"]))
            .with_template(ShiftTemplate::new("D8", 480, 480))
    }

    #[test]
    fn test_lookups() {
        let p = problem();
        assert_eq!(p.skill_group("sales").map(|g| g.name.as_str()), Some("Sales"));
        assert!(p.employment_group("FT").is_some());
        assert!(p.employee("e1").is_some());
        assert!(p.template("D8").is_some());
        assert!(p.employee("nobody").is_none());
    }

    #[test]
    fn test_reserved_sections() {
        assert!(Reserved::from_entries(vec![]).is_empty());
        let r = Reserved::from_entries(vec![serde_json::json!({"id": "AG1"})]);
        assert_eq!(r.len(), 1);
        assert!(matches!(r, Reserved::Ignored(_)));
    }

    #[test]
    fn test_stream_open() {
        let mut p = problem();
        p.operating_hours.push(OperatingHours {
            stream: Stream::new("inbound", "voice"),
            window: ClockWindow::new(480, 1200),
            days: DaySet::all(),
        });
        assert_eq!(p.is_stream_open("inbound", "voice", 0, 16), Some(true));
        assert_eq!(p.is_stream_open("inbound", "voice", 0, 2), Some(false));
        assert_eq!(p.is_stream_open("inbound", "chat", 0, 16), None);
    }
}
