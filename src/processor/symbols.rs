//! Symbol table shared by both passes.
//!
//! Symbols live in one arena and are addressed by `SymbolId`.  Each kind
//! additionally keeps its own entry table; a symbol's `entry` is its index
//! there and is what ends up in the generated stream.  Entries are handed
//! out in declaration order and never reused.
//!
//! Top-level names are unique across kinds.  Device names are scoped by
//! their room and are reached through `device_in`.

use super::ast::{Statement, ValueType};
use super::diagnostics::Pass;
use crate::calendar::DayFlags;
use crate::tables::codes::DeviceCategory;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Room,
    HouseCode,
    Device,
    Timeout,
    Variable,
    Const,
    Enum,
    EnumMember,
    Procedure,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    Unit(i64),
    Hub(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Room {
    pub devices: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HouseCode {
    pub letter: char,
    pub off: Option<SymbolId>,
    pub on: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub category: DeviceCategory,
    pub room: SymbolId,
    pub house: char,
    pub address: DeviceAddress,
    pub off: Option<SymbolId>,
    pub on: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeout {
    /// Seconds.
    pub duration: i64,
    pub off: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Room(Room),
    HouseCode(HouseCode),
    Device(Device),
    Timeout(Timeout),
    /// Boolean and integer variables share one entry table.
    Variable { initial: i64 },
    Const(i64),
    Enum,
    EnumMember(i64),
    Procedure { body: Vec<Statement> },
    Undefined,
}

impl SymbolKind {
    pub fn entry_kind(&self) -> EntryKind {
        match self {
            SymbolKind::Room(_) => EntryKind::Room,
            SymbolKind::HouseCode(_) => EntryKind::HouseCode,
            SymbolKind::Device(_) => EntryKind::Device,
            SymbolKind::Timeout(_) => EntryKind::Timeout,
            SymbolKind::Variable { .. } => EntryKind::Variable,
            SymbolKind::Const(_) => EntryKind::Const,
            SymbolKind::Enum => EntryKind::Enum,
            SymbolKind::EnumMember(_) => EntryKind::EnumMember,
            SymbolKind::Procedure { .. } => EntryKind::Procedure,
            SymbolKind::Undefined => EntryKind::Undefined,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.entry_kind() {
            EntryKind::Room => "room",
            EntryKind::HouseCode => "house code",
            EntryKind::Device => "device",
            EntryKind::Timeout => "timeout",
            EntryKind::Variable => "variable",
            EntryKind::Const => "constant",
            EntryKind::Enum => "enumeration",
            EntryKind::EnumMember => "enumeration member",
            EntryKind::Procedure => "procedure",
            EntryKind::Undefined => "undefined identifier",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub line: usize,
    pub pass: Pass,
    pub entry: usize,
    pub ty: ValueType,
    pub uses: u32,
    pub kind: SymbolKind,
}

/// Timers are identified by their description and are only recorded on the
/// second pass, so they sit outside the name map.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub description: String,
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub description: String,
    /// Seconds after midnight, or `SUNRISE` / `SUNSET`.
    pub fire_time: i64,
    pub days: DayFlags,
    pub events: Vec<Event>,
}

impl Sequence {
    pub const SUNRISE: i64 = -1;
    pub const SUNSET: i64 = -2;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub procedure: SymbolId,
    /// Seconds relative to the sequence's firing time.
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declared {
    New(SymbolId),
    /// Second-pass sighting of a first-pass declaration.
    Matched(SymbolId),
}

impl Declared {
    pub fn id(&self) -> SymbolId {
        match self {
            Declared::New(id) | Declared::Matched(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    pub previous_line: usize,
    pub previous_pass: Pass,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    names: HashMap<String, SymbolId>,
    entries: HashMap<EntryKind, Vec<SymbolId>>,
    timers: Vec<Timer>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, name: &str, line: usize, pass: Pass, ty: ValueType, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        let table = self.entries.entry(kind.entry_kind()).or_default();
        let entry = table.len();
        table.push(id);
        self.symbols.push(Symbol {
            name: name.to_string(),
            line,
            pass,
            entry,
            ty,
            uses: 0,
            kind,
        });
        id
    }

    /// Same name, same line, declared on the first pass and seen again on
    /// the second: the declaration is being re-walked, not repeated.
    fn is_rewalk(existing: &Symbol, line: usize, pass: Pass, kind: &SymbolKind) -> bool {
        pass == Pass::Second
            && existing.pass == Pass::First
            && existing.line == line
            && existing.kind.entry_kind() == kind.entry_kind()
    }

    /// Declares a top-level name.
    pub fn declare(
        &mut self,
        name: &str,
        line: usize,
        pass: Pass,
        ty: ValueType,
        kind: SymbolKind,
    ) -> Result<Declared, Duplicate> {
        match self.names.get(name).copied() {
            None => {
                let id = self.allocate(name, line, pass, ty, kind);
                self.names.insert(name.to_string(), id);
                Ok(Declared::New(id))
            }
            Some(id) => {
                let existing = &self.symbols[id.0];
                if Self::is_rewalk(existing, line, pass, &kind) {
                    Ok(Declared::Matched(id))
                } else if existing.kind == SymbolKind::Undefined {
                    let id = self.allocate(name, line, pass, ty, kind);
                    self.names.insert(name.to_string(), id);
                    Ok(Declared::New(id))
                } else {
                    Err(Duplicate {
                        previous_line: existing.line,
                        previous_pass: existing.pass,
                    })
                }
            }
        }
    }

    /// Declares a device inside `room`.
    ///
    /// On the second pass a device the first pass parked under a
    /// `placeholder_room` is moved into `room`, keeping its entry.  Clashes
    /// involving such a device are only visible now and are reported as
    /// second-pass duplicates.
    pub fn declare_device(
        &mut self,
        room: SymbolId,
        name: &str,
        line: usize,
        pass: Pass,
        device: Device,
    ) -> Result<Declared, Duplicate> {
        let kind = SymbolKind::Device(device);
        let parked = match pass {
            Pass::Second => self.parked_device(name, line),
            Pass::First => None,
        };
        if let Some(id) = self.device_in(room, name) {
            let existing = &self.symbols[id.0];
            return match parked {
                None if Self::is_rewalk(existing, line, pass, &kind) => Ok(Declared::Matched(id)),
                None => Err(Duplicate {
                    previous_line: existing.line,
                    previous_pass: existing.pass,
                }),
                Some(_) => Err(Duplicate {
                    previous_line: existing.line,
                    previous_pass: Pass::Second,
                }),
            };
        }

        let (id, declared) = match parked {
            Some(id) => {
                let symbol = &mut self.symbols[id.0];
                symbol.kind = kind;
                symbol.pass = pass;
                (id, Declared::Matched(id))
            }
            None => {
                let id = self.allocate(name, line, pass, ValueType::DeviceState, kind);
                (id, Declared::New(id))
            }
        };
        let entry = self.symbols[id.0].entry;
        let at = match &self.symbols[room.0].kind {
            SymbolKind::Room(r) => r.devices.partition_point(|d| self.symbols[d.0].entry < entry),
            _ => 0,
        };
        if let SymbolKind::Room(r) = &mut self.symbols[room.0].kind {
            r.devices.insert(at, id);
        }
        Ok(declared)
    }

    /// Stand-in room for a device declared before its room, so the device
    /// takes its entry in file order.  Not reachable by name.
    pub fn placeholder_room(&mut self, name: &str, line: usize) -> SymbolId {
        self.allocate(name, line, Pass::First, ValueType::Unknown, SymbolKind::Undefined)
    }

    fn parked_device(&self, name: &str, line: usize) -> Option<SymbolId> {
        self.entries.get(&EntryKind::Device)?.iter().copied().find(|&id| {
            let symbol = &self.symbols[id.0];
            symbol.name == name
                && symbol.line == line
                && matches!(&symbol.kind, SymbolKind::Device(d) if self.symbols[d.room.0].kind == SymbolKind::Undefined)
        })
    }

    /// Records an unresolvable name so later references resolve quietly.
    pub fn declare_undefined(&mut self, name: &str, line: usize, pass: Pass) -> SymbolId {
        match self.names.get(name) {
            Some(&id) => id,
            None => {
                let id = self.allocate(name, line, pass, ValueType::Unknown, SymbolKind::Undefined);
                self.names.insert(name.to_string(), id);
                id
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    pub fn device_in(&self, room: SymbolId, name: &str) -> Option<SymbolId> {
        match &self.symbols[room.0].kind {
            SymbolKind::Room(r) => r.devices.iter().copied().find(|&d| self.symbols[d.0].name == name),
            _ => None,
        }
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn note_use(&mut self, id: SymbolId) {
        self.symbols[id.0].uses += 1;
    }

    pub fn entry_of(&self, id: SymbolId) -> usize {
        self.symbols[id.0].entry
    }

    /// Symbols of one kind, in entry order.
    pub fn entries(&self, kind: EntryKind) -> impl Iterator<Item = &Symbol> {
        self.entries
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|id| &self.symbols[id.0])
    }

    pub fn entry_count(&self, kind: EntryKind) -> usize {
        self.entries.get(&kind).map_or(0, Vec::len)
    }

    /// `room.device` for devices, the plain name otherwise.
    pub fn qualified_name(&self, id: SymbolId) -> String {
        let symbol = &self.symbols[id.0];
        match &symbol.kind {
            SymbolKind::Device(d) => format!("{}.{}", self.symbols[d.room.0].name, symbol.name),
            _ => symbol.name.clone(),
        }
    }

    /// Declared symbols nothing refers to, in declaration order.  House
    /// codes and enumerations are routinely declared for documentation only.
    pub fn unused(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.uses == 0
                    && !matches!(
                        s.kind,
                        SymbolKind::HouseCode(_)
                            | SymbolKind::Enum
                            | SymbolKind::EnumMember(_)
                            | SymbolKind::Undefined
                    )
            })
            .map(|(i, _)| SymbolId(i))
    }

    pub fn add_timer(&mut self, timer: Timer) {
        self.timers.push(timer);
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }
}
