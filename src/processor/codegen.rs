//! Lowers procedure bodies to runtime instructions.
//!
//! Code is produced in two walks over the same tree.  The sizing functions
//! (`*_words`, `*_instructions`) predict what the emitter will produce
//! without producing it; the emitter uses them to fill in forward jump
//! offsets.  Every encoding below therefore appears twice and the two must
//! agree.
//!
//! | construct            | words                       |
//! |----------------------|-----------------------------|
//! | push                 | 2                           |
//! | unary / binary op    | operands + 1                |
//! | `IF`                 | cond + 2 + then [+ 2 + else]|
//! | assignment           | expr + 2                    |
//! | `++` / `--`          | 5                           |
//! | `CALL`               | 2                           |
//! | `SETDEVICE`          | 7 per device                |
//! | `RESET`              | 3                           |
//! | refresh / resynch    | 1                           |
//! | `ASSERT`             | cond + 3                    |

use super::ast::{BinaryOp, ExprKind, Expression, Literal, Statement, Step, UnaryOp};
use serde::Serialize;
use std::fmt;

/// Instruction set of the runtime.  The discriminant is the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum Opcode {
    Stop = 0,
    PushDeviceState = 1,
    SetDeviceState = 2,
    GetTimeoutState = 3,
    ResetTimeout = 4,
    AbsoluteInteger = 5,
    DecrementInteger = 6,
    IncrementInteger = 7,
    Add = 8,
    Subtract = 9,
    Multiply = 10,
    Divide = 11,
    Modulus = 12,
    NegateInteger = 13,
    LessThan = 14,
    LessThanEqual = 15,
    Equal = 16,
    GreaterThanEqual = 17,
    GreaterThan = 18,
    NotEqual = 19,
    NotBoolean = 20,
    Or = 21,
    And = 22,
    PushConstant = 23,
    PushVariableValue = 24,
    StoreVariable = 25,
    JumpUnconditional = 26,
    JumpIfTrue = 27,
    JumpIfFalse = 28,
    CallSystemProcedure = 29,
    CallUserProcedure = 30,
    ReturnFromUserProcedure = 31,
    SetRefreshDevices = 32,
    SetResynchClock = 33,
}

impl Opcode {
    pub fn code(self) -> i32 {
        self as i32
    }

    fn for_unary(op: UnaryOp) -> Self {
        match op {
            UnaryOp::Not => Opcode::NotBoolean,
            UnaryOp::Negate => Opcode::NegateInteger,
        }
    }

    fn for_binary(op: BinaryOp) -> Self {
        match op {
            BinaryOp::And => Opcode::And,
            BinaryOp::Or => Opcode::Or,
            BinaryOp::Equal => Opcode::Equal,
            BinaryOp::NotEqual => Opcode::NotEqual,
            BinaryOp::Less => Opcode::LessThan,
            BinaryOp::LessEqual => Opcode::LessThanEqual,
            BinaryOp::Greater => Opcode::GreaterThan,
            BinaryOp::GreaterEqual => Opcode::GreaterThanEqual,
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Subtract => Opcode::Subtract,
            BinaryOp::Multiply => Opcode::Multiply,
            BinaryOp::Divide => Opcode::Divide,
            BinaryOp::Modulus => Opcode::Modulus,
        }
    }
}

/// One line of the runtime stream: an opcode and its operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<i64>,
}

impl Instruction {
    fn new(opcode: Opcode, operands: &[i64]) -> Self {
        Self {
            opcode,
            operands: operands.to_vec(),
        }
    }

    pub fn words(&self) -> usize {
        1 + self.operands.len()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.code())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// A procedure body lowered to instructions, with the counts the runtime
/// stream announces ahead of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Code {
    pub instruction_count: usize,
    pub word_count: usize,
    pub instructions: Vec<Instruction>,
}

pub fn generate(body: &[Statement]) -> Code {
    let mut instructions = Vec::new();
    emit_list(body, &mut instructions);
    Code {
        instruction_count: list_instructions(body),
        word_count: list_words(body),
        instructions,
    }
}

/* ---------------------------------------------------------------------- */
/* sizing                                                                  */
/* ---------------------------------------------------------------------- */

const PUSH_WORDS: usize = 2;
const OPERATOR_WORDS: usize = 1;
const JUMP_WORDS: usize = 2;
const SET_DEVICE_WORDS: usize = 7;

pub fn expression_words(expression: &Expression) -> usize {
    match &expression.kind {
        ExprKind::Literal(_) => PUSH_WORDS,
        ExprKind::Unary(_, operand) => expression_words(operand) + OPERATOR_WORDS,
        ExprKind::Binary(_, left, right) => expression_words(left) + expression_words(right) + OPERATOR_WORDS,
    }
}

pub fn statement_words(statement: &Statement) -> usize {
    match statement {
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut words = expression_words(condition) + JUMP_WORDS + list_words(then_branch);
            if let Some(else_branch) = else_branch {
                words += JUMP_WORDS + list_words(else_branch);
            }
            words
        }
        Statement::Assignment { value, .. } => expression_words(value) + 2,
        Statement::IncrementDecrement { .. } => 5,
        Statement::Call { .. } => 2,
        Statement::SetDevice { devices, .. } => SET_DEVICE_WORDS * devices.len(),
        Statement::ResetTimeout { .. } => 3,
        Statement::RefreshDevices | Statement::ResynchClock => 1,
        Statement::Assert(condition) => expression_words(condition) + JUMP_WORDS + 1,
    }
}

pub fn list_words(list: &[Statement]) -> usize {
    list.iter().map(statement_words).sum()
}

pub fn expression_instructions(expression: &Expression) -> usize {
    match &expression.kind {
        ExprKind::Literal(_) => 1,
        ExprKind::Unary(_, operand) => expression_instructions(operand) + 1,
        ExprKind::Binary(_, left, right) => expression_instructions(left) + expression_instructions(right) + 1,
    }
}

pub fn statement_instructions(statement: &Statement) -> usize {
    match statement {
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut count = expression_instructions(condition) + 1 + list_instructions(then_branch);
            if let Some(else_branch) = else_branch {
                count += 1 + list_instructions(else_branch);
            }
            count
        }
        Statement::Assignment { value, .. } => expression_instructions(value) + 1,
        Statement::IncrementDecrement { .. } => 3,
        Statement::SetDevice { devices, .. } => devices.len(),
        Statement::Call { .. }
        | Statement::ResetTimeout { .. }
        | Statement::RefreshDevices
        | Statement::ResynchClock => 1,
        Statement::Assert(condition) => expression_instructions(condition) + 2,
    }
}

pub fn list_instructions(list: &[Statement]) -> usize {
    list.iter().map(statement_instructions).sum()
}

/* ---------------------------------------------------------------------- */
/* emission                                                                */
/* ---------------------------------------------------------------------- */

pub fn emit_list(list: &[Statement], out: &mut Vec<Instruction>) {
    for statement in list {
        emit_statement(statement, out);
    }
}

fn emit_statement(statement: &Statement, out: &mut Vec<Instruction>) {
    match statement {
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            emit_expression(condition, out);
            let mut skip = list_words(then_branch);
            if else_branch.is_some() {
                skip += JUMP_WORDS;
            }
            out.push(Instruction::new(Opcode::JumpIfFalse, &[skip as i64]));
            emit_list(then_branch, out);
            if let Some(else_branch) = else_branch {
                let skip = list_words(else_branch);
                out.push(Instruction::new(Opcode::JumpUnconditional, &[skip as i64]));
                emit_list(else_branch, out);
            }
        }
        Statement::Assignment { variable, value } => {
            emit_expression(value, out);
            out.push(Instruction::new(Opcode::StoreVariable, &[*variable as i64]));
        }
        Statement::IncrementDecrement { variable, step } => {
            let op = match step {
                Step::Increment => Opcode::IncrementInteger,
                Step::Decrement => Opcode::DecrementInteger,
            };
            out.push(Instruction::new(Opcode::PushVariableValue, &[*variable as i64]));
            out.push(Instruction::new(op, &[]));
            out.push(Instruction::new(Opcode::StoreVariable, &[*variable as i64]));
        }
        Statement::Call { procedure } => {
            out.push(Instruction::new(Opcode::CallUserProcedure, &[*procedure as i64]));
        }
        Statement::SetDevice {
            devices,
            command,
            delay,
            duration,
        } => {
            for device in devices {
                out.push(Instruction::new(
                    Opcode::SetDeviceState,
                    &[
                        device.entry as i64,
                        command.state_for(device.category) as i64,
                        command.colour as i64,
                        command.colour_loop as i64,
                        *delay,
                        *duration,
                    ],
                ));
            }
        }
        Statement::ResetTimeout { timeout, duration } => {
            out.push(Instruction::new(Opcode::ResetTimeout, &[*timeout as i64, *duration]));
        }
        Statement::RefreshDevices => out.push(Instruction::new(Opcode::SetRefreshDevices, &[])),
        Statement::ResynchClock => out.push(Instruction::new(Opcode::SetResynchClock, &[])),
        Statement::Assert(condition) => {
            emit_expression(condition, out);
            out.push(Instruction::new(Opcode::JumpIfTrue, &[1]));
            out.push(Instruction::new(Opcode::Stop, &[]));
        }
    }
}

fn emit_expression(expression: &Expression, out: &mut Vec<Instruction>) {
    match &expression.kind {
        ExprKind::Literal(literal) => out.push(push(literal)),
        ExprKind::Unary(op, operand) => {
            emit_expression(operand, out);
            out.push(Instruction::new(Opcode::for_unary(*op), &[]));
        }
        ExprKind::Binary(op, left, right) => {
            emit_expression(left, out);
            emit_expression(right, out);
            out.push(Instruction::new(Opcode::for_binary(*op), &[]));
        }
    }
}

fn push(literal: &Literal) -> Instruction {
    match literal {
        Literal::Constant(value) | Literal::Const(value) => Instruction::new(Opcode::PushConstant, &[*value]),
        Literal::Boolean(value) => Instruction::new(Opcode::PushConstant, &[*value as i64]),
        Literal::Variable(entry) => Instruction::new(Opcode::PushVariableValue, &[*entry as i64]),
        Literal::Device(entry) => Instruction::new(Opcode::PushDeviceState, &[*entry as i64]),
        Literal::Timeout(entry) => Instruction::new(Opcode::GetTimeoutState, &[*entry as i64]),
    }
}
