//! Statements inside procedure bodies and `IF` branches.

use super::{DECLARATION_STARTS, Parsed, Parser, TokenSet};
use crate::processor::ast::{DeviceCommand, DeviceCommandBuilder, DeviceTarget, Statement, Step, ValueType};
use crate::processor::diagnostics::Pass;
use crate::processor::lexer::{Token, TokenKind};
use crate::processor::symbols::{EntryKind, SymbolId, SymbolKind};
use crate::tables::codes::DeviceCategory;
use crate::tables::device_states;

const STATEMENT_STARTS: &[TokenKind] = &[
    TokenKind::If,
    TokenKind::Call,
    TokenKind::SetDevice,
    TokenKind::Reset,
    TokenKind::RefreshDevices,
    TokenKind::ResynchClock,
    TokenKind::Assert,
    TokenKind::Identifier,
    TokenKind::HouseLetter,
];

const DEVICE_COMMANDS: &[TokenKind] = &[TokenKind::DeviceState, TokenKind::Colour, TokenKind::ColourLoop];

/// Twelve hours.
const DEFAULT_ON_DURATION: i64 = 12 * 3600;

/// `room.LAMP` / `room.APPLIANCE` membership.
fn in_group(group: TokenKind, category: DeviceCategory, command: &DeviceCommand) -> bool {
    match group {
        TokenKind::Lamp => match category {
            DeviceCategory::Lamp | DeviceCategory::HueLamp => true,
            DeviceCategory::ApplianceLamp => device_states::is_on_or_off(command.state),
            _ => false,
        },
        _ => matches!(
            category,
            DeviceCategory::Appliance | DeviceCategory::Lamp | DeviceCategory::ApplianceLamp
        ),
    }
}

impl Parser<'_, '_> {
    /// Statements up to (not including) one of `terminators`, a declaration
    /// keyword or the end of the file.
    pub(super) fn statement_list(&mut self, terminators: &[TokenKind]) -> Vec<Statement> {
        let followers = TokenSet::of(terminators)
            .with(STATEMENT_STARTS)
            .with(DECLARATION_STARTS);
        let mut statements = Vec::new();

        while !self.at(TokenKind::Eof) && !self.at_any(terminators) && !self.at_any(DECLARATION_STARTS) {
            let parsed = self
                .statement(terminators, &followers)
                .and_then(|s| self.expect(TokenKind::Semicolon).map(|_| s));
            match parsed {
                Ok(statement) => statements.push(statement),
                Err(_) => self.recover(&followers),
            }
        }
        statements
    }

    fn statement(&mut self, terminators: &[TokenKind], followers: &TokenSet) -> Parsed<Statement> {
        let stop = followers.with(&[TokenKind::Semicolon]);
        match self.token.kind {
            TokenKind::If => self.if_statement(terminators, &stop),
            TokenKind::Call => {
                self.advance();
                let name = self.expect(TokenKind::Identifier)?;
                let procedure = self.resolve_procedure(&name);
                Ok(Statement::Call {
                    procedure: self.entry(procedure),
                })
            }
            TokenKind::SetDevice => self.set_device(),
            TokenKind::Reset => self.reset_timeout(),
            TokenKind::RefreshDevices => {
                self.advance();
                Ok(Statement::RefreshDevices)
            }
            TokenKind::ResynchClock => {
                self.advance();
                Ok(Statement::ResynchClock)
            }
            TokenKind::Assert => {
                let keyword = self.advance();
                let condition = self.expression(&stop);
                self.expect_type(&keyword, &condition, ValueType::Boolean, "ASSERT condition");
                Ok(Statement::Assert(condition))
            }
            TokenKind::Identifier | TokenKind::HouseLetter => self.variable_statement(&stop),
            _ => Err(self.syntax_error(&[
                TokenKind::If,
                TokenKind::Call,
                TokenKind::SetDevice,
                TokenKind::Reset,
                TokenKind::RefreshDevices,
                TokenKind::ResynchClock,
                TokenKind::Assert,
                TokenKind::Identifier,
            ])),
        }
    }

    /// `IF cond THEN ... [ELSE ...] ENDIF`
    fn if_statement(&mut self, terminators: &[TokenKind], stop: &TokenSet) -> Parsed<Statement> {
        let keyword = self.advance();
        let condition = self.expression(&stop.with(&[TokenKind::Then]));
        self.expect_type(&keyword, &condition, ValueType::Boolean, "IF condition");
        self.expect(TokenKind::Then)?;

        let mut inner = terminators.to_vec();
        inner.extend([TokenKind::Else, TokenKind::EndIf]);
        let then_branch = self.statement_list(&inner);
        let else_branch = if self.accept(TokenKind::Else) {
            inner.retain(|&k| k != TokenKind::Else);
            Some(self.statement_list(&inner))
        } else {
            None
        };
        self.expect(TokenKind::EndIf)?;

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `var = expr`, `var++` or `var--`.
    fn variable_statement(&mut self, stop: &TokenSet) -> Parsed<Statement> {
        let name = self.advance();
        let id = self.resolve(&name, &[EntryKind::Variable]);
        let ty = id.map_or(ValueType::Unknown, |id| self.session.symbols.get(id).ty);
        let variable = self.entry(id);

        match self.token.kind {
            TokenKind::Assign => {
                self.advance();
                let value = self.expression(stop);
                let what = format!("value assigned to '{}'", name.text);
                self.expect_type(&name, &value, ty, &what);
                Ok(Statement::Assignment { variable, value })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = self.advance();
                if !ty.matches(ValueType::Integer) {
                    self.error_at(
                        &op,
                        format!("'{}' needs an integer variable, '{}' is {}", op.text, name.text, ty.name()),
                    );
                }
                let step = if op.is(TokenKind::PlusPlus) {
                    Step::Increment
                } else {
                    Step::Decrement
                };
                Ok(Statement::IncrementDecrement { variable, step })
            }
            _ => Err(self.syntax_error(&[TokenKind::Assign, TokenKind::PlusPlus, TokenKind::MinusMinus])),
        }
    }

    /// `RESET timeout [DURATION t]`
    fn reset_timeout(&mut self) -> Parsed<Statement> {
        self.advance();
        let name = self.expect(TokenKind::Identifier)?;
        let id = self.resolve(&name, &[EntryKind::Timeout]);
        let mut duration = match id.map(|id| &self.session.symbols.get(id).kind) {
            Some(SymbolKind::Timeout(t)) => t.duration,
            _ => 0,
        };
        if self.accept(TokenKind::Duration) {
            let time = self.expect(TokenKind::Time)?;
            if time.value <= 0 {
                self.error_at(&time, "timeout duration must be positive");
            }
            duration = time.value;
        }
        Ok(Statement::ResetTimeout {
            timeout: self.entry(id),
            duration,
        })
    }

    /// `SETDEVICE room.(device | LAMP | APPLIANCE) command {, command}
    ///  [DELAYED t] [DURATION t]`
    fn set_device(&mut self) -> Parsed<Statement> {
        self.advance();
        let room = self.expect(TokenKind::Identifier)?;
        let room_id = self.resolve(&room, &[EntryKind::Room]);
        self.expect(TokenKind::Dot)?;
        let target = match self.token.kind {
            TokenKind::Lamp | TokenKind::Appliance | TokenKind::Identifier | TokenKind::HouseLetter => {
                self.advance()
            }
            _ => {
                return Err(self.syntax_error(&[TokenKind::Identifier, TokenKind::Lamp, TokenKind::Appliance]));
            }
        };

        let mut builder = DeviceCommandBuilder::new();
        loop {
            if !self.at_any(DEVICE_COMMANDS) {
                return Err(self.syntax_error(DEVICE_COMMANDS));
            }
            let token = self.advance();
            let applied = match token.kind {
                TokenKind::DeviceState => builder.state(token.value as i32),
                TokenKind::Colour => builder.colour(token.value as i32),
                _ => builder.colour_loop(),
            };
            if let Err(message) = applied {
                self.error_at(&token, message);
            }
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        let has_state = builder.has_state();
        let command = builder.build();

        let delay = if self.accept(TokenKind::Delayed) {
            self.expect(TokenKind::Time)?.value
        } else {
            0
        };
        let default_duration = if has_state && !command.is_off() {
            DEFAULT_ON_DURATION
        } else {
            0
        };
        let duration = if self.at(TokenKind::Duration) {
            let keyword = self.advance();
            let time = self.expect(TokenKind::Time)?;
            if !has_state {
                self.error_at(&keyword, "DURATION needs a device state");
            }
            time.value
        } else {
            default_duration
        };
        if has_state && !command.is_off() && duration < delay {
            self.error_at(&target, "duration must be greater than the initial delay");
        }

        let devices = match room_id {
            Some(room_id) => self.select_devices(&room, room_id, &target, &command),
            None => Vec::new(),
        };
        Ok(Statement::SetDevice {
            devices,
            command,
            delay,
            duration,
        })
    }

    fn select_devices(
        &mut self,
        room: &Token,
        room_id: SymbolId,
        target: &Token,
        command: &DeviceCommand,
    ) -> Vec<DeviceTarget> {
        if target.is(TokenKind::Lamp) || target.is(TokenKind::Appliance) {
            let SymbolKind::Room(r) = &self.session.symbols.get(room_id).kind else {
                return Vec::new();
            };
            let selected: Vec<DeviceTarget> = r
                .devices
                .iter()
                .filter_map(|&id| {
                    let symbol = self.session.symbols.get(id);
                    match &symbol.kind {
                        SymbolKind::Device(d) if in_group(target.kind, d.category, command) => Some(DeviceTarget {
                            entry: symbol.entry,
                            category: d.category,
                        }),
                        _ => None,
                    }
                })
                .collect();
            if selected.is_empty() {
                let group = if target.is(TokenKind::Lamp) { "lamps" } else { "appliances" };
                self.warning_at(target, format!("no {group} in room '{}'", room.text));
            }
            return selected;
        }

        let qualified = format!("{}.{}", room.text, target.text);
        let Some(id) = self.session.symbols.device_in(room_id, &target.text) else {
            self.error_at(target, format!("unknown device '{qualified}'"));
            return Vec::new();
        };
        if self.pass == Pass::Second {
            self.session.symbols.note_use(id);
        }
        let symbol = self.session.symbols.get(id);
        let entry = symbol.entry;
        let SymbolKind::Device(device) = &symbol.kind else {
            return Vec::new();
        };
        let category = device.category;

        match category {
            DeviceCategory::Sensor => {
                self.error_at(target, format!("'{qualified}' is a sensor and cannot be set"));
            }
            DeviceCategory::Remote => {
                self.error_at(target, format!("'{qualified}' is a remote and cannot be set"));
            }
            DeviceCategory::Appliance
                if !device_states::is_on_or_off(command.state) && command.state != device_states::UNKNOWN =>
            {
                self.error_at(target, format!("appliance '{qualified}' can only be switched ON or OFF"));
            }
            _ => {}
        }
        vec![DeviceTarget { entry, category }]
    }
}
