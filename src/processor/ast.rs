//! Expression and statement trees for procedure bodies, as built by the
//! parser and read by the code generator.
//!
//! References to declared objects are held as entry numbers, the only
//! identifiers that survive into the generated stream.

use crate::tables::codes::DeviceCategory;
use crate::tables::device_states;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueType {
    Boolean,
    Integer,
    DeviceState,
    Time,
    Date,
    /// Result of a reference that could not be resolved.  Accepted by every
    /// type check so one bad name produces one diagnostic.
    Unknown,
}

impl ValueType {
    pub fn matches(self, other: ValueType) -> bool {
        self == other || self == ValueType::Unknown || other == ValueType::Unknown
    }

    fn is_comparable(self) -> bool {
        matches!(
            self,
            ValueType::Integer
                | ValueType::DeviceState
                | ValueType::Time
                | ValueType::Date
                | ValueType::Unknown
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::DeviceState => "device state",
            ValueType::Time => "time",
            ValueType::Date => "date",
            ValueType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    /// The operand must have this type, and so does the result.
    pub fn operand_type(self) -> ValueType {
        match self {
            UnaryOp::Not => ValueType::Boolean,
            UnaryOp::Negate => ValueType::Integer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
        }
    }

    fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }

    pub fn result_type(self) -> ValueType {
        if self.is_logical() || self.is_comparison() {
            ValueType::Boolean
        } else {
            ValueType::Integer
        }
    }

    /// Operand rules: logical operators take booleans, arithmetic takes
    /// integers, comparisons take two operands of one comparable type.
    pub fn accepts(self, left: ValueType, right: ValueType) -> bool {
        if self.is_logical() {
            left.matches(ValueType::Boolean) && right.matches(ValueType::Boolean)
        } else if self.is_comparison() {
            left.is_comparable() && right.is_comparable() && left.matches(right)
        } else {
            left.matches(ValueType::Integer) && right.matches(ValueType::Integer)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// Integer, time, date, colour or device-state constant.
    Constant(i64),
    Boolean(bool),
    Device(usize),
    Timeout(usize),
    Variable(usize),
    /// Named constant or enum member, folded to its value.
    Const(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Literal(Literal),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub kind: ExprKind,
    pub ty: ValueType,
}

impl Expression {
    pub fn literal(literal: Literal, ty: ValueType) -> Self {
        Self {
            kind: ExprKind::Literal(literal),
            ty,
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::literal(Literal::Constant(value), ValueType::Integer)
    }

    pub fn boolean(value: bool) -> Self {
        Self::literal(Literal::Boolean(value), ValueType::Boolean)
    }

    /// Stand-in after a parse error.
    pub fn unknown() -> Self {
        Self::literal(Literal::Constant(0), ValueType::Unknown)
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self {
            kind: ExprKind::Unary(op, Box::new(operand)),
            ty: op.operand_type(),
        }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self {
            kind: ExprKind::Binary(op, Box::new(left), Box::new(right)),
            ty: op.result_type(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    Increment,
    Decrement,
}

/// A device picked out by a `SETDEVICE` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceTarget {
    pub entry: usize,
    pub category: DeviceCategory,
}

/// What a `SETDEVICE` asks of each device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceCommand {
    pub state: i32,
    pub colour: i32,
    pub colour_loop: bool,
}

impl DeviceCommand {
    pub fn is_off(&self) -> bool {
        self.state == device_states::OFF
    }

    /// State actually sent to a device of `category`.  Appliance-lamps
    /// cannot dim, so any dim level switches them on.
    pub fn state_for(&self, category: DeviceCategory) -> i32 {
        if category == DeviceCategory::ApplianceLamp
            && !device_states::is_on_or_off(self.state)
            && self.state != device_states::UNKNOWN
        {
            device_states::ON
        } else {
            self.state
        }
    }
}

/// Collects the comma-separated commands of one `SETDEVICE`.  Each kind of
/// command may appear once.
#[derive(Debug, Default)]
pub struct DeviceCommandBuilder {
    state: Option<i32>,
    colour: Option<i32>,
    colour_loop: bool,
}

impl DeviceCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&mut self, state: i32) -> Result<(), &'static str> {
        if self.state.replace(state).is_some() {
            return Err("device state given twice");
        }
        Ok(())
    }

    pub fn colour(&mut self, rgb: i32) -> Result<(), &'static str> {
        if self.colour.replace(rgb).is_some() {
            return Err("colour given twice");
        }
        Ok(())
    }

    pub fn colour_loop(&mut self) -> Result<(), &'static str> {
        if std::mem::replace(&mut self.colour_loop, true) {
            return Err("COLOURLOOP given twice");
        }
        Ok(())
    }

    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    pub fn build(self) -> DeviceCommand {
        DeviceCommand {
            state: self.state.unwrap_or(device_states::UNKNOWN),
            colour: self.colour.unwrap_or(0),
            colour_loop: self.colour_loop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    /// `IF cond THEN ... [ELSE ...] ENDIF`
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },

    /// `var = expr`
    Assignment { variable: usize, value: Expression },

    /// `var++` / `var--`
    IncrementDecrement { variable: usize, step: Step },

    /// `CALL proc`
    Call { procedure: usize },

    /// `SETDEVICE room.target commands [DELAYED t] [DURATION t]`; one
    /// instruction per selected device.
    SetDevice {
        devices: Vec<DeviceTarget>,
        command: DeviceCommand,
        delay: i64,
        duration: i64,
    },

    /// `RESET timeout [DURATION t]`
    ResetTimeout { timeout: usize, duration: i64 },

    /// `REFRESHDEVICES`
    RefreshDevices,

    /// `RESYNCHCLOCK`
    ResynchClock,

    /// `ASSERT expr` – stops the runtime when the condition is false.
    Assert(Expression),
}
