//! The compiler core.
//!
//! Source text goes through two parser passes over one shared `Session`;
//! if the second pass reports no errors, the symbol tables and procedure
//! bodies are lowered into the read-only `ProcessedProject` the writers
//! consume.
pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod symbols;

use crate::calendar::{Calendar, PooleTable};
use crate::config::Config;
use crate::model::{
    CalendarRow, DeviceRow, EventRow, HouseCodeRow, ProcedureRow, ProcessedProject, SequenceRow, TimeoutRow, TimerRow,
    VariableRow,
};
use crate::tables::codes::{self, NO_HUB_ADDRESS};
use diagnostics::{Diagnostics, Pass};
use symbols::{DeviceAddress, EntryKind, SymbolId, SymbolKind, SymbolTable};

/// Written wherever a procedure binding is absent.
pub const NO_PROCEDURE: i64 = -1;

/// State carried from the first pass to the second and on to code
/// generation.  Each pass gets its own lexer and parser.
#[derive(Debug)]
pub struct Session {
    pub symbols: SymbolTable,
    pub calendar: Calendar,
    pub diagnostics: Diagnostics,
}

impl Session {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            symbols: SymbolTable::new(),
            calendar,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Calendar pinned to 2024-03-01 so day declarations are reproducible.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Self::new(Calendar::new(start, &PooleTable))
    }
}

/// Result of compiling one source file.  `project` is present only when no
/// errors were reported.
#[derive(Debug)]
pub struct Compilation {
    pub diagnostics: Diagnostics,
    pub project: Option<ProcessedProject>,
}

/// Runs both passes over `source`.
pub fn compile(source: &str, session: &mut Session) {
    for pass in [Pass::First, Pass::Second] {
        log::info!("{pass:?} pass");
        parser::Parser::new(source, pass, session).parse();
    }
    log::info!(
        "{} procedures, {} devices, {} variables, {} timers",
        session.symbols.entry_count(EntryKind::Procedure),
        session.symbols.entry_count(EntryKind::Device),
        session.symbols.entry_count(EntryKind::Variable),
        session.symbols.timers().len()
    );
}

/// Compiles `source` and, when it is error free, builds the output tables.
pub fn run(source: &str, config: &Config) -> Compilation {
    let calendar = match config.calendar_start {
        Some(start) => Calendar::new(start, &PooleTable),
        None => Calendar::around(chrono::Local::now().date_naive()),
    };
    let mut session = Session::new(calendar);
    compile(source, &mut session);

    if session.diagnostics.has_errors() {
        log::info!("{} errors, no code generated", session.diagnostics.error_count());
        return Compilation {
            diagnostics: session.diagnostics,
            project: None,
        };
    }

    if !session.calendar.complete() {
        log::info!("calendar completed without seasons");
    }
    log::info!("calendar starts {}", session.calendar.start());

    let project = project(&session, config.identifier_limit);
    Compilation {
        diagnostics: session.diagnostics,
        project: Some(project),
    }
}

/// Lowers the session's tables, in entry order, into writer rows.
pub fn project(session: &Session, identifier_limit: usize) -> ProcessedProject {
    let symbols = &session.symbols;
    let name = |text: &str| truncate(text, identifier_limit);

    let calendar = session
        .calendar
        .days()
        .iter()
        .map(|day| CalendarRow {
            date: day.date,
            epoch_seconds: day.epoch_seconds(),
            sunrise: day.sunrise,
            sunset: day.sunset,
            flags: day.flags.bits(),
        })
        .collect();

    let house_codes = symbols
        .entries(EntryKind::HouseCode)
        .filter_map(|s| match &s.kind {
            SymbolKind::HouseCode(h) => Some(HouseCodeRow {
                name: name(&s.name),
                letter: h.letter,
                code: codes::house_code(h.letter).unwrap_or(-1),
                off: procedure_entry(symbols, h.off),
                on: procedure_entry(symbols, h.on),
            }),
            _ => None,
        })
        .collect();

    let devices = symbols
        .entries(EntryKind::Device)
        .filter_map(|s| match &s.kind {
            SymbolKind::Device(d) => {
                let (unit_code, hub_address) = match &d.address {
                    DeviceAddress::Unit(unit) => (codes::unit_code(*unit).unwrap_or(-1), NO_HUB_ADDRESS.to_string()),
                    DeviceAddress::Hub(address) => (-1, address.clone()),
                };
                Some(DeviceRow {
                    room: symbols.get(d.room).name.clone(),
                    name: name(&s.name),
                    category: d.category,
                    type_code: d.category.code(),
                    house_code: codes::house_code(d.house).unwrap_or(-1),
                    unit_code,
                    hub_address,
                    off: procedure_entry(symbols, d.off),
                    on: procedure_entry(symbols, d.on),
                })
            }
            _ => None,
        })
        .collect();

    let variables = symbols
        .entries(EntryKind::Variable)
        .filter_map(|s| match s.kind {
            SymbolKind::Variable { initial } => Some(VariableRow {
                name: name(&s.name),
                ty: s.ty,
                initial,
            }),
            _ => None,
        })
        .collect();

    let timers = symbols
        .timers()
        .iter()
        .map(|timer| TimerRow {
            name: name(&timer.description),
            sequences: timer
                .sequences
                .iter()
                .map(|sequence| SequenceRow {
                    description: name(&sequence.description),
                    fire_time: sequence.fire_time,
                    days: sequence.days.bits(),
                    events: sequence
                        .events
                        .iter()
                        .map(|event| EventRow {
                            procedure: procedure_entry(symbols, Some(event.procedure)),
                            offset: event.offset,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    let procedures = symbols
        .entries(EntryKind::Procedure)
        .filter_map(|s| match &s.kind {
            SymbolKind::Procedure { body } => Some(ProcedureRow {
                name: name(&s.name),
                code: codegen::generate(body),
            }),
            _ => None,
        })
        .collect();

    let timeouts = symbols
        .entries(EntryKind::Timeout)
        .filter_map(|s| match &s.kind {
            SymbolKind::Timeout(t) => Some(TimeoutRow {
                name: name(&s.name),
                duration: t.duration,
                off: procedure_entry(symbols, t.off),
            }),
            _ => None,
        })
        .collect();

    ProcessedProject {
        calendar,
        house_codes,
        devices,
        variables,
        timers,
        procedures,
        timeouts,
    }
}

fn procedure_entry(symbols: &SymbolTable, binding: Option<SymbolId>) -> i64 {
    match binding.map(|id| symbols.get(id)) {
        Some(symbol) if matches!(symbol.kind, SymbolKind::Procedure { .. }) => symbol.entry as i64,
        _ => NO_PROCEDURE,
    }
}

fn truncate(name: &str, limit: usize) -> String {
    name.chars().take(limit).collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::{compile, errors, warnings};
    use super::*;

    #[test]
    fn entries_follow_declaration_order() {
        let s = compile(
            "ROOM Kitchen, Hall;\n\
             DEVICE LAMP Kitchen.Light A 1;\nDEVICE LAMP Hall.Light A 2;\nDEVICE APPLIANCE Hall.Fan A 3;\n\
             PROCEDURE First; END;\nPROCEDURE Second; END;",
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));

        let devices: Vec<(String, usize)> = s
            .symbols
            .entries(EntryKind::Device)
            .map(|d| (d.name.clone(), d.entry))
            .collect();
        assert_eq!(
            devices,
            vec![("Light".to_string(), 0), ("Light".to_string(), 1), ("Fan".to_string(), 2)]
        );
        let procedures: Vec<usize> = s.symbols.entries(EntryKind::Procedure).map(|p| p.entry).collect();
        assert_eq!(procedures, vec![0, 1]);
    }

    #[test]
    fn project_rows_carry_mapped_codes() {
        let s = compile(
            "ROOM Kitchen;\n\
             PROCEDURE Dark; END;\nPROCEDURE Light; END;\n\
             HOUSECODE Downstairs B OFFPROCEDURE Dark ONPROCEDURE Light;\n\
             DEVICE LAMP Kitchen.Ceiling B 13 ONPROCEDURE Light;\n\
             DEVICE HUELAMP Kitchen.Spot B \"00:17:88:01:00:bd:c7:b9-0b\";\n\
             TIMEOUT Linger 00:10;\nBOOL quiet = TRUE;",
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        let p = project(&s, 30);

        assert_eq!(p.house_codes[0].code, 0x0E);
        assert_eq!((p.house_codes[0].off, p.house_codes[0].on), (0, 1));

        assert_eq!(p.devices[0].unit_code, 0x00);
        assert_eq!(p.devices[0].hub_address, NO_HUB_ADDRESS);
        assert_eq!((p.devices[0].off, p.devices[0].on), (NO_PROCEDURE, 1));
        assert_eq!(p.devices[1].unit_code, -1);
        assert_eq!(p.devices[1].hub_address, "00:17:88:01:00:bd:c7:b9-0b");

        assert_eq!(p.timeouts[0].duration, 600);
        assert_eq!(p.timeouts[0].off, NO_PROCEDURE);
        assert_eq!(p.variables[0].initial, 1);
        assert_eq!(p.calendar.len(), crate::calendar::WINDOW_DAYS);
    }

    #[test]
    fn names_are_truncated_for_the_runtime() {
        let s = compile("PROCEDURE AVeryLongProcedureName; END;");
        let p = project(&s, 8);
        assert_eq!(p.procedures[0].name, "AVeryLon");
    }

    #[test]
    fn errors_suppress_code_generation() {
        let config = Config::default();
        let compilation = run("PROCEDURE Main; CALL Nowhere; END;", &config);
        assert!(compilation.project.is_none());
        assert_eq!(compilation.diagnostics.error_count(), 1);
    }

    #[test]
    fn warnings_do_not_block_output() {
        let s = compile("INT spare = 0;");
        assert!(errors(&s).is_empty());
        assert!(warnings(&s).contains(&"'spare' not used".to_string()));
    }
}
