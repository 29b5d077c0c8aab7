//! Read-only tables handed from the compiler core to the writers.
//!
//! Every row is already in runtime terms: procedure references are entry
//! numbers (or `-1`), addresses are protocol codes and names are truncated.

use crate::processor::ast::ValueType;
use crate::processor::codegen::Code;
use crate::tables::codes::DeviceCategory;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CalendarRow {
    pub date: NaiveDate,
    pub epoch_seconds: i64,
    /// Seconds after midnight.
    pub sunrise: i32,
    pub sunset: i32,
    pub flags: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HouseCodeRow {
    pub name: String,
    pub letter: char,
    pub code: i32,
    pub off: i64,
    pub on: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceRow {
    pub room: String,
    pub name: String,
    pub category: DeviceCategory,
    pub type_code: i32,
    pub house_code: i32,
    /// `-1` for hub-addressed devices.
    pub unit_code: i32,
    pub hub_address: String,
    pub off: i64,
    pub on: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableRow {
    pub name: String,
    pub ty: ValueType,
    pub initial: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub procedure: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceRow {
    pub description: String,
    /// Seconds after midnight; `-1` sunrise, `-2` sunset.
    pub fire_time: i64,
    pub days: u32,
    pub events: Vec<EventRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerRow {
    pub name: String,
    pub sequences: Vec<SequenceRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcedureRow {
    pub name: String,
    #[serde(flatten)]
    pub code: Code,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeoutRow {
    pub name: String,
    pub duration: i64,
    pub off: i64,
}

/// Fully processed output handed to `writer`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedProject {
    pub calendar: Vec<CalendarRow>,
    pub house_codes: Vec<HouseCodeRow>,
    pub devices: Vec<DeviceRow>,
    pub variables: Vec<VariableRow>,
    pub timers: Vec<TimerRow>,
    pub procedures: Vec<ProcedureRow>,
    pub timeouts: Vec<TimeoutRow>,
}

impl ProcessedProject {
    /// Row counts in stream order.
    pub fn section_counts(&self) -> [usize; 7] {
        [
            self.calendar.len(),
            self.house_codes.len(),
            self.devices.len(),
            self.variables.len(),
            self.timers.len(),
            self.procedures.len(),
            self.timeouts.len(),
        ]
    }
}
