//! Top-level declarations.  Each function starts on the declaring keyword
//! and stops before the terminating `;`.

use super::{Parsed, Parser, TokenSet};
use crate::calendar::{self, DayFlags};
use crate::processor::ast::ValueType;
use crate::processor::diagnostics::Pass;
use crate::processor::lexer::{Token, TokenKind};
use crate::processor::symbols::{
    Declared, Device, DeviceAddress, EntryKind, Event, HouseCode, Room, Sequence, SymbolId,
    SymbolKind, Timeout, Timer,
};
use crate::tables::codes::{self, DeviceCategory};

const LATEST_TIME_OF_DAY: i64 = 23 * 3600 + 59 * 60 + 59;
const EARLIEST_EVENT_OFFSET: i64 = -12 * 3600;

const DAY_MASKS: &[TokenKind] = &[
    TokenKind::Mon,
    TokenKind::Tue,
    TokenKind::Wed,
    TokenKind::Thu,
    TokenKind::Fri,
    TokenKind::Sat,
    TokenKind::Sun,
    TokenKind::All,
    TokenKind::Working,
    TokenKind::NonWorking,
    TokenKind::FirstWorking,
    TokenKind::NonFirstWorking,
];

fn day_mask(kind: TokenKind) -> DayFlags {
    match kind {
        TokenKind::Mon => DayFlags::MON,
        TokenKind::Tue => DayFlags::TUE,
        TokenKind::Wed => DayFlags::WED,
        TokenKind::Thu => DayFlags::THU,
        TokenKind::Fri => DayFlags::FRI,
        TokenKind::Sat => DayFlags::SAT,
        TokenKind::Sun => DayFlags::SUN,
        TokenKind::All => DayFlags::ALL_DAYS,
        TokenKind::Working => DayFlags::WORK,
        TokenKind::NonWorking => DayFlags::NON_WORK,
        TokenKind::FirstWorking => DayFlags::FIRST_WORK,
        TokenKind::NonFirstWorking => DayFlags::NON_FIRST_WORK,
        _ => DayFlags::NONE,
    }
}

fn device_category(kind: TokenKind) -> Option<DeviceCategory> {
    match kind {
        TokenKind::Appliance => Some(DeviceCategory::Appliance),
        TokenKind::Lamp => Some(DeviceCategory::Lamp),
        TokenKind::ApplianceLamp => Some(DeviceCategory::ApplianceLamp),
        TokenKind::HueLamp => Some(DeviceCategory::HueLamp),
        TokenKind::Sensor => Some(DeviceCategory::Sensor),
        TokenKind::Remote => Some(DeviceCategory::Remote),
        _ => None,
    }
}

impl Parser<'_, '_> {
    /// Declares a top-level name, reporting clashes.  `None` means the
    /// declaration is a duplicate and should be parsed but not recorded.
    fn declare(&mut self, name: &Token, ty: ValueType, kind: SymbolKind) -> Option<Declared> {
        let what = kind.describe();
        match self
            .session
            .symbols
            .declare(&name.text, name.line, self.pass, ty, kind)
        {
            Ok(declared) => {
                if let Declared::New(_) = declared {
                    log::debug!("declared {what} '{}' on line {}", name.text, name.line);
                }
                Some(declared)
            }
            Err(dup) => {
                self.duplicate(name, what, dup);
                None
            }
        }
    }

    /// `OFFPROCEDURE name` / `ONPROCEDURE name` when `keyword` is next.
    fn optional_binding(&mut self, keyword: TokenKind) -> Parsed<Option<SymbolId>> {
        if !self.accept(keyword) {
            return Ok(None);
        }
        let name = self.expect(TokenKind::Identifier)?;
        Ok(self.resolve_procedure(&name))
    }

    fn required_binding(&mut self, keyword: TokenKind) -> Parsed<Option<SymbolId>> {
        self.expect(keyword)?;
        let name = self.expect(TokenKind::Identifier)?;
        Ok(self.resolve_procedure(&name))
    }

    /// `ROOM a, b, c`
    pub(super) fn room_declaration(&mut self) -> Parsed<()> {
        self.advance();
        loop {
            let name = self.expect(TokenKind::Identifier)?;
            self.declare(&name, ValueType::Unknown, SymbolKind::Room(Room::default()));
            if !self.accept(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    /// `HOUSECODE name letter OFFPROCEDURE p ONPROCEDURE q`
    pub(super) fn house_code_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let name = self.expect(TokenKind::Identifier)?;
        let letter_token = self.expect(TokenKind::HouseLetter)?;
        let off = self.required_binding(TokenKind::OffProcedure)?;
        let on = self.required_binding(TokenKind::OnProcedure)?;
        let letter = letter_token.text.chars().next().unwrap_or('A');

        let taken = self.session.symbols.entries(EntryKind::HouseCode).find_map(|s| match &s.kind {
            SymbolKind::HouseCode(h) if h.letter == letter && s.name != name.text => Some(s.line),
            _ => None,
        });
        if let Some(line) = taken {
            let location = self.location_of(&letter_token);
            self.session.diagnostics.pass1_error(
                self.pass,
                location,
                format!("house code '{letter}' already used on line {line}"),
            );
        }

        let house = HouseCode { letter, off, on };
        if let Some(Declared::Matched(id)) =
            self.declare(&name, ValueType::Unknown, SymbolKind::HouseCode(house.clone()))
        {
            self.session.symbols.get_mut(id).kind = SymbolKind::HouseCode(house);
        }
        Ok(())
    }

    /// `DEVICE category room.name letter (unit | "hub address")
    ///  [OFFPROCEDURE p] [ONPROCEDURE q]`
    pub(super) fn device_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let Some(category) = device_category(self.token.kind) else {
            return Err(self.syntax_error(&[
                TokenKind::Lamp,
                TokenKind::Appliance,
                TokenKind::ApplianceLamp,
                TokenKind::HueLamp,
                TokenKind::Sensor,
                TokenKind::Remote,
            ]));
        };
        self.advance();
        let room = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::Dot)?;
        let name = self.expect(TokenKind::Identifier)?;
        let letter = self.expect(TokenKind::HouseLetter)?;

        let address = if category.is_hub_addressed() {
            let hub = self.expect(TokenKind::Str)?;
            if !codes::is_hub_address(&hub.text) {
                self.error_at(
                    &hub,
                    format!("hub address must be of form '{}'", codes::NO_HUB_ADDRESS),
                );
            }
            DeviceAddress::Hub(hub.text)
        } else {
            let unit = self.expect(TokenKind::Integer)?;
            if codes::unit_code(unit.value).is_none() {
                self.error_at(
                    &unit,
                    format!("unit code must be in range {}..{}", codes::FIRST_UNIT, codes::LAST_UNIT),
                );
            }
            DeviceAddress::Unit(unit.value)
        };

        let off = self.optional_binding(TokenKind::OffProcedure)?;
        let on = self.optional_binding(TokenKind::OnProcedure)?;

        let room_id = match self.resolve(&room, &[EntryKind::Room]) {
            Some(id) => id,
            None if self.pass == Pass::First && self.session.symbols.lookup(&room.text).is_none() => {
                self.session.symbols.placeholder_room(&room.text, room.line)
            }
            None => return Ok(()),
        };
        let device = Device {
            category,
            room: room_id,
            house: letter.text.chars().next().unwrap_or('A'),
            address,
            off,
            on,
        };
        match self
            .session
            .symbols
            .declare_device(room_id, &name.text, name.line, self.pass, device.clone())
        {
            Ok(declared) => {
                let id = declared.id();
                if let Declared::Matched(_) = declared {
                    self.session.symbols.get_mut(id).kind = SymbolKind::Device(device);
                }
                // sensors trigger procedures rather than being driven by them
                if category == DeviceCategory::Sensor && self.pass == Pass::Second {
                    self.session.symbols.note_use(id);
                }
            }
            Err(dup) => {
                let qualified = Token {
                    text: format!("{}.{}", room.text, name.text),
                    ..name
                };
                self.duplicate(&qualified, "device", dup);
            }
        }
        Ok(())
    }

    /// `TIMEOUT name time [OFFPROCEDURE p]`
    pub(super) fn timeout_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let name = self.expect(TokenKind::Identifier)?;
        let duration = self.expect(TokenKind::Time)?;
        if duration.value <= 0 {
            self.error_at(&duration, "timeout duration must be positive");
        }
        let off = self.optional_binding(TokenKind::OffProcedure)?;

        let timeout = Timeout {
            duration: duration.value,
            off,
        };
        if let Some(Declared::Matched(id)) =
            self.declare(&name, ValueType::Boolean, SymbolKind::Timeout(timeout.clone()))
        {
            self.session.symbols.get_mut(id).kind = SymbolKind::Timeout(timeout);
        }
        Ok(())
    }

    /// `BOOL name = TRUE|FALSE` or `INT name = value`
    pub(super) fn variable_declaration(&mut self) -> Parsed<()> {
        let is_bool = self.advance().is(TokenKind::Bool);
        let name = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::Assign)?;

        let (ty, initial) = if is_bool {
            let value = match self.token.kind {
                TokenKind::True => 1,
                TokenKind::False => 0,
                _ => return Err(self.syntax_error(&[TokenKind::True, TokenKind::False])),
            };
            self.advance();
            (ValueType::Boolean, value)
        } else {
            (ValueType::Integer, self.constant_integer()?)
        };

        if let Some(Declared::Matched(id)) = self.declare(&name, ty, SymbolKind::Variable { initial }) {
            self.session.symbols.get_mut(id).kind = SymbolKind::Variable { initial };
        }
        Ok(())
    }

    /// `CONST name = value`
    pub(super) fn const_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let name = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::Assign)?;
        let value = self.constant_integer()?;
        if let Some(Declared::Matched(id)) = self.declare(&name, ValueType::Integer, SymbolKind::Const(value)) {
            self.session.symbols.get_mut(id).kind = SymbolKind::Const(value);
        }
        Ok(())
    }

    /// `[-] (integer | constant | enum member)`
    fn constant_integer(&mut self) -> Parsed<i64> {
        let sign = if self.accept(TokenKind::Minus) { -1 } else { 1 };
        match self.token.kind {
            TokenKind::Integer => Ok(sign * self.advance().value),
            TokenKind::Identifier | TokenKind::HouseLetter => {
                let name = self.advance();
                let value = self
                    .resolve(&name, &[EntryKind::Const, EntryKind::EnumMember])
                    .map_or(0, |id| match self.session.symbols.get(id).kind {
                        SymbolKind::Const(v) | SymbolKind::EnumMember(v) => v,
                        _ => 0,
                    });
                Ok(sign * value)
            }
            _ => Err(self.syntax_error(&[TokenKind::Integer, TokenKind::Identifier])),
        }
    }

    /// `ENUM name ( a, b, c )`; members count up from zero.
    pub(super) fn enum_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let name = self.expect(TokenKind::Identifier)?;
        self.declare(&name, ValueType::Integer, SymbolKind::Enum);
        self.expect(TokenKind::LParen)?;
        let mut value = 0;
        loop {
            let member = self.expect(TokenKind::Identifier)?;
            self.declare(&member, ValueType::Integer, SymbolKind::EnumMember(value));
            value += 1;
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(())
    }

    /// `PROCEDURE name [;] statement* END`
    pub(super) fn procedure_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let name = self.expect(TokenKind::Identifier)?;
        let declared = self.declare(&name, ValueType::Unknown, SymbolKind::Procedure { body: Vec::new() });
        self.accept(TokenKind::Semicolon);

        let body = self.statement_list(&[TokenKind::End]);
        self.expect(TokenKind::End)?;

        if self.pass == Pass::Second {
            if let Some(declared) = declared {
                self.session.symbols.get_mut(declared.id()).kind = SymbolKind::Procedure { body };
            }
        }
        Ok(())
    }

    /// `DAY date {HOLIDAY | BST | GMT}`
    pub(super) fn day_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let date = self.expect(TokenKind::Date)?;
        let mut flags = DayFlags::NONE;
        loop {
            flags |= match self.token.kind {
                TokenKind::Holiday => DayFlags::NON_WORK,
                TokenKind::Bst => DayFlags::BST,
                TokenKind::Gmt => DayFlags::GMT,
                _ => break,
            };
            self.advance();
        }
        if flags == DayFlags::NONE {
            return Err(self.syntax_error(&[TokenKind::Holiday, TokenKind::Bst, TokenKind::Gmt]));
        }
        if flags.contains(DayFlags::SEASONS) {
            self.error_at(&date, "a day cannot start both BST and GMT");
        }

        if self.pass == Pass::Second {
            let in_window = calendar::date_from_epoch_days(date.value)
                .is_some_and(|d| self.session.calendar.set_day(d, flags));
            if !in_window {
                self.warning_at(&date, format!("{} is outside the calendar, ignored", date.text));
            }
        }
        Ok(())
    }

    /// `TIMER "description" [;] sequence* END`
    pub(super) fn timer_declaration(&mut self) -> Parsed<()> {
        self.advance();
        let description = self.expect(TokenKind::Str)?;
        self.accept(TokenKind::Semicolon);

        let mut sequences = Vec::new();
        while self.at(TokenKind::Sequence) {
            match self.sequence() {
                Ok(sequence) => sequences.push(sequence),
                Err(_) => self.recover(&TokenSet::of(&[TokenKind::Sequence, TokenKind::End])),
            }
        }
        self.expect(TokenKind::End)?;

        if self.pass == Pass::Second {
            self.session.symbols.add_timer(Timer {
                description: description.text,
                sequences,
            });
        }
        Ok(())
    }

    /// `SEQUENCE "description" (SUNRISE | SUNSET | time) day+ [;] event*`
    fn sequence(&mut self) -> Parsed<Sequence> {
        self.advance();
        let description = self.expect(TokenKind::Str)?;
        let fire_time = match self.token.kind {
            TokenKind::Sunrise => Sequence::SUNRISE,
            TokenKind::Sunset => Sequence::SUNSET,
            TokenKind::Time => {
                let value = self.token.value;
                if !(0..=LATEST_TIME_OF_DAY).contains(&value) {
                    self.error("sequence time not in range 00:00 .. 23:59");
                }
                value
            }
            _ => {
                return Err(self.syntax_error(&[TokenKind::Sunrise, TokenKind::Sunset, TokenKind::Time]));
            }
        };
        self.advance();

        if !self.at_any(DAY_MASKS) {
            return Err(self.syntax_error(DAY_MASKS));
        }
        let mut days = DayFlags::NONE;
        while self.at_any(DAY_MASKS) {
            days |= day_mask(self.advance().kind);
        }
        self.accept(TokenKind::Semicolon);

        let mut events = Vec::new();
        while self.at(TokenKind::Event) {
            match self.event() {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(_) => self.recover(&TokenSet::of(&[
                    TokenKind::Event,
                    TokenKind::Sequence,
                    TokenKind::End,
                ])),
            }
        }

        Ok(Sequence {
            description: description.text,
            fire_time,
            days,
            events,
        })
    }

    /// `EVENT time procedure ;`
    fn event(&mut self) -> Parsed<Option<Event>> {
        self.advance();
        let offset = self.expect(TokenKind::Time)?;
        if !(EARLIEST_EVENT_OFFSET..=LATEST_TIME_OF_DAY).contains(&offset.value) {
            self.error_at(&offset, "event time not in range -12:00 .. 23:59");
        }
        let name = self.expect(TokenKind::Identifier)?;
        let procedure = self.resolve_procedure(&name);
        self.expect(TokenKind::Semicolon)?;
        Ok(procedure.map(|procedure| Event {
            procedure,
            offset: offset.value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::calendar::DayFlags;
    use crate::processor::symbols::{DeviceAddress, EntryKind, Sequence, SymbolKind};
    use crate::processor::test_support::{compile, errors, program_warnings};
    use crate::tables::codes::DeviceCategory;

    #[test]
    fn test_declaration_errors() {
        let test_cases = vec![
            ("ROOM Kitchen;\nDEVICE LAMP Kitchen.Light A 17;", "unit code must be in range 1..16"),
            (
                "ROOM Hall;\nDEVICE HUELAMP Hall.Bulb B \"00:17:88\";",
                "hub address must be of form '00:00:00:00:00:00:00:00-00'",
            ),
            ("DEVICE LAMP Nowhere.Light A 1;", "unknown identifier 'Nowhere'"),
            ("PROCEDURE Go; END;\nDEVICE LAMP Go.Light A 1;", "'Go' is a procedure, which is not allowed here"),
            ("TIMEOUT T 00:00;", "timeout duration must be positive"),
            ("BOOL b = 1;", "expected one of TRUE, FALSE, found '1'"),
            ("DAY 01/01/2024;", "expected one of HOLIDAY, BST, GMT, found ';'"),
        ];

        for (src, expected) in test_cases {
            let s = compile(src);
            assert_eq!(errors(&s), vec![expected.to_string()], "source: {src}");
        }
    }

    #[test]
    fn duplicate_declarations_reported_once() {
        let test_cases = vec![
            ("ROOM Kitchen;\nROOM Kitchen;", "room 'Kitchen' already declared on line 1"),
            ("ROOM Kitchen, Kitchen;", "room 'Kitchen' already declared on line 1"),
            (
                "ROOM Kitchen;\nDEVICE LAMP Kitchen.Light A 1;\nDEVICE LAMP Kitchen.Light A 2;",
                "device 'Kitchen.Light' already declared on line 2",
            ),
            ("INT x = 1;\nBOOL x = TRUE;", "variable 'x' already declared on line 1"),
            ("PROCEDURE Go; END;\nROOM Go;", "room 'Go' already declared on line 1"),
        ];

        for (src, expected) in test_cases {
            let s = compile(src);
            assert_eq!(errors(&s), vec![expected.to_string()], "source: {src}");
        }
    }

    #[test]
    fn house_letters_are_unique() {
        let s = compile(
            "PROCEDURE AllOff; END;\nPROCEDURE AllOn; END;\n\
             HOUSECODE Main A OFFPROCEDURE AllOff ONPROCEDURE AllOn;\n\
             HOUSECODE Garage A OFFPROCEDURE AllOff ONPROCEDURE AllOn;",
        );
        assert_eq!(errors(&s), vec!["house code 'A' already used on line 3"]);
    }

    #[test]
    fn house_letters_clash_on_one_line() {
        let s = compile(
            "PROCEDURE AllOff; END;\nPROCEDURE AllOn; END;\n\
             HOUSECODE Main A OFFPROCEDURE AllOff ONPROCEDURE AllOn; \
             HOUSECODE Garage A OFFPROCEDURE AllOff ONPROCEDURE AllOn;",
        );
        assert_eq!(errors(&s), vec!["house code 'A' already used on line 3"]);
    }

    #[test]
    fn device_forward_references_procedures() {
        let s = compile(
            "ROOM Kitchen;\n\
             DEVICE LAMP Kitchen.Light A 1 OFFPROCEDURE LightsOut ONPROCEDURE LightsOn;\n\
             PROCEDURE LightsOut; END;\n\
             PROCEDURE LightsOn; END;",
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));

        let device = s.symbols.entries(EntryKind::Device).next().unwrap();
        let SymbolKind::Device(d) = &device.kind else { panic!("not a device") };
        assert_eq!(d.category, DeviceCategory::Lamp);
        assert_eq!(d.address, DeviceAddress::Unit(1));
        let off = d.off.map(|id| s.symbols.entry_of(id));
        let on = d.on.map(|id| s.symbols.entry_of(id));
        assert_eq!((off, on), (Some(0), Some(1)));
    }

    #[test]
    fn device_in_room_declared_later() {
        let s = compile("DEVICE APPLIANCE Garage.Heater C 3;\nROOM Garage;");
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        assert_eq!(s.symbols.entry_count(EntryKind::Device), 1);
        assert_eq!(program_warnings(&s), vec!["'Garage.Heater' not used"]);
    }

    #[test]
    fn sensors_count_as_used() {
        let s = compile("ROOM Porch;\nDEVICE SENSOR Porch.Motion D 4;");
        assert!(program_warnings(&s).is_empty(), "{:?}", program_warnings(&s));
    }

    #[test]
    fn constants_and_enums() {
        let s = compile(
            "CONST Base = 40;\nCONST Limit = -Base;\nENUM Mode (Home, Away, Night);\nINT level = Night;\n",
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        let value = |name: &str| s.symbols.get(s.symbols.lookup(name).unwrap()).kind.clone();
        assert_eq!(value("Limit"), SymbolKind::Const(-40));
        assert_eq!(value("Away"), SymbolKind::EnumMember(1));
        assert_eq!(value("level"), SymbolKind::Variable { initial: 2 });
        // enum groups and members never warn; unused constants and variables do
        assert_eq!(program_warnings(&s), vec!["'Limit' not used", "'level' not used"]);
    }

    #[test]
    fn constant_declared_after_its_use_resolves_on_second_pass() {
        let s = compile("INT start = Later;\nCONST Later = 7;");
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        let start = s.symbols.get(s.symbols.lookup("start").unwrap());
        assert_eq!(start.kind, SymbolKind::Variable { initial: 7 });
    }

    #[test]
    fn day_declarations_reach_the_calendar() {
        // test sessions start their calendar on 2024-03-01
        let s = compile("DAY 04/03/2024 HOLIDAY;\nDAY 31/03/2024 BST;\nDAY 01/01/2000 GMT;");
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        assert_eq!(program_warnings(&s), vec!["01/01/2000 is outside the calendar, ignored"]);
        let flags = s.calendar.days()[3].flags;
        assert!(flags.contains(DayFlags::NON_WORK));
        assert!(s.calendar.days()[30].flags.contains(DayFlags::BST));
    }

    #[test]
    fn timers_collect_sequences_and_events() {
        let s = compile(
            "PROCEDURE Wake; END;\nPROCEDURE Sleep; END;\n\
             TIMER \"Bedroom\";\n\
             SEQUENCE \"Weekdays\" 07:00 WORKING;\n\
               EVENT 00:00 Wake;\n\
               EVENT 00:30 Sleep;\n\
             SEQUENCE \"Evening\" SUNSET SAT SUN;\n\
               EVENT -00:15 Sleep;\n\
             END;",
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        let timers = s.symbols.timers();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].description, "Bedroom");
        let seq = &timers[0].sequences;
        assert_eq!(seq.len(), 2);
        assert_eq!((seq[0].fire_time, seq[0].days), (7 * 3600, DayFlags::WORK));
        assert_eq!(seq[0].events.len(), 2);
        assert_eq!(seq[1].fire_time, Sequence::SUNSET);
        assert_eq!(seq[1].days, DayFlags::SAT | DayFlags::SUN);
        assert_eq!(seq[1].events[0].offset, -15 * 60);
        assert!(program_warnings(&s).is_empty(), "{:?}", program_warnings(&s));
    }

    #[test]
    fn timer_ranges_are_checked() {
        let s = compile(
            "PROCEDURE Go; END;\n\
             TIMER \"t\"; SEQUENCE \"s\" 24:00 ALL;\nEVENT -13:00 Go;\nEND;",
        );
        assert_eq!(
            errors(&s),
            vec![
                "sequence time not in range 00:00 .. 23:59",
                "event time not in range -12:00 .. 23:59",
            ]
        );
    }

    #[test]
    fn broken_event_does_not_derail_the_timer() {
        let s = compile(
            "PROCEDURE Go; END;\n\
             TIMER \"t\"; SEQUENCE \"s\" SUNRISE ALL;\nEVENT Go 07:00;\nEVENT 01:00 Go;\nEND;\nROOM After;",
        );
        assert_eq!(errors(&s), vec!["expected time, found 'Go'"]);
        assert_eq!(s.symbols.timers()[0].sequences[0].events.len(), 1);
        assert!(s.symbols.lookup("After").is_some());
    }
}
