//! Expressions, loosest binding first:
//!
//! ```text
//! expression  ::= or_expr { AND or_expr }
//! or_expr     ::= comparison { OR comparison }
//! comparison  ::= additive [ ( == | != | < | <= | > | >= ) additive ]
//! additive    ::= term { ( + | - ) term }
//! term        ::= factor { ( * | / | % ) factor }
//! factor      ::= literal | name | room.device | NOT factor | - factor
//!               | ( expression )
//! ```
//!
//! Every level passes its caller's stop set, plus its own operators, down
//! to `factor`, which skips to that set after a malformed operand.

use super::{Parser, TokenSet};
use crate::processor::ast::{BinaryOp, Expression, Literal, UnaryOp, ValueType};
use crate::processor::lexer::{Token, TokenKind};
use crate::processor::symbols::{EntryKind, SymbolKind};

const COMPARISONS: &[TokenKind] = &[
    TokenKind::EqualEqual,
    TokenKind::NotEqual,
    TokenKind::Less,
    TokenKind::LessEqual,
    TokenKind::Greater,
    TokenKind::GreaterEqual,
];
const ADDITIVE: &[TokenKind] = &[TokenKind::Plus, TokenKind::Minus];
const MULTIPLICATIVE: &[TokenKind] = &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent];

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::NotEqual => BinaryOp::NotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Subtract,
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::Percent => BinaryOp::Modulus,
        _ => return None,
    })
}

fn operand_rule(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::And | BinaryOp::Or => "boolean",
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulus => {
            "integer"
        }
        _ => "of one comparable type",
    }
}

impl Parser<'_, '_> {
    pub(super) fn expression(&mut self, stop: &TokenSet) -> Expression {
        let here = stop.with(&[TokenKind::And]);
        let mut left = self.or_expression(&here);
        while self.at(TokenKind::And) {
            let op = self.advance();
            let right = self.or_expression(&here);
            left = self.binary(&op, left, right);
        }
        left
    }

    fn or_expression(&mut self, stop: &TokenSet) -> Expression {
        let here = stop.with(&[TokenKind::Or]);
        let mut left = self.comparison(&here);
        while self.at(TokenKind::Or) {
            let op = self.advance();
            let right = self.comparison(&here);
            left = self.binary(&op, left, right);
        }
        left
    }

    /// Comparisons do not chain.
    fn comparison(&mut self, stop: &TokenSet) -> Expression {
        let here = stop.with(COMPARISONS);
        let left = self.additive(&here);
        if !self.at_any(COMPARISONS) {
            return left;
        }
        let op = self.advance();
        let right = self.additive(stop);
        self.binary(&op, left, right)
    }

    fn additive(&mut self, stop: &TokenSet) -> Expression {
        let here = stop.with(ADDITIVE);
        let mut left = self.term(&here);
        while self.at_any(ADDITIVE) {
            let op = self.advance();
            let right = self.term(&here);
            left = self.binary(&op, left, right);
        }
        left
    }

    fn term(&mut self, stop: &TokenSet) -> Expression {
        let here = stop.with(MULTIPLICATIVE);
        let mut left = self.factor(&here);
        while self.at_any(MULTIPLICATIVE) {
            let op = self.advance();
            let right = self.factor(&here);
            left = self.binary(&op, left, right);
        }
        left
    }

    fn factor(&mut self, stop: &TokenSet) -> Expression {
        let expression = match self.token.kind {
            TokenKind::Integer => Expression::integer(self.advance().value),
            TokenKind::True | TokenKind::False => Expression::boolean(self.advance().is(TokenKind::True)),
            TokenKind::DeviceState => {
                Expression::literal(Literal::Constant(self.advance().value), ValueType::DeviceState)
            }
            TokenKind::Time => Expression::literal(Literal::Constant(self.advance().value), ValueType::Time),
            TokenKind::Date => Expression::literal(Literal::Constant(self.advance().value), ValueType::Date),
            TokenKind::Identifier | TokenKind::HouseLetter => self.reference(),
            TokenKind::Not | TokenKind::Minus => {
                let op = self.advance();
                let operand = self.factor(stop);
                self.unary(&op, operand)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression(&stop.with(&[TokenKind::RParen]));
                if self.expect(TokenKind::RParen).is_err() {
                    self.skip_to(stop);
                }
                inner
            }
            _ => {
                let found = self.token.text.clone();
                self.error(format!(
                    "expected literal constant, variable, or '(' expression ')', found '{found}'"
                ));
                self.skip_to(stop);
                return Expression::unknown();
            }
        };

        if !stop.contains(self.token.kind) {
            let found = self.token.text.clone();
            self.error(format!("unexpected '{found}' in expression"));
            self.skip_to(stop);
        }
        expression
    }

    /// `name` or `room.device`.
    fn reference(&mut self) -> Expression {
        let name = self.advance();
        if self.accept(TokenKind::Dot) {
            let Ok(device) = self.expect(TokenKind::Identifier) else {
                return Expression::unknown();
            };
            return match self.resolve_device(&name, &device) {
                Some(id) => Expression::literal(
                    Literal::Device(self.session.symbols.entry_of(id)),
                    ValueType::DeviceState,
                ),
                None => Expression::unknown(),
            };
        }

        let expected = [
            EntryKind::Variable,
            EntryKind::Const,
            EntryKind::EnumMember,
            EntryKind::Timeout,
        ];
        let Some(id) = self.resolve(&name, &expected) else {
            return Expression::unknown();
        };
        let symbol = self.session.symbols.get(id);
        match symbol.kind {
            SymbolKind::Variable { .. } => Expression::literal(Literal::Variable(symbol.entry), symbol.ty),
            SymbolKind::Timeout(_) => Expression::literal(Literal::Timeout(symbol.entry), ValueType::Boolean),
            SymbolKind::Const(value) | SymbolKind::EnumMember(value) => {
                Expression::literal(Literal::Const(value), ValueType::Integer)
            }
            _ => Expression::unknown(),
        }
    }

    fn unary(&mut self, op: &Token, operand: Expression) -> Expression {
        let (unary, symbol) = match op.kind {
            TokenKind::Not => (UnaryOp::Not, "NOT"),
            _ => (UnaryOp::Negate, "-"),
        };
        let wanted = unary.operand_type();
        if !operand.ty.matches(wanted) {
            self.error_at(
                op,
                format!("operand of '{symbol}' must be {}, found {}", wanted.name(), operand.ty.name()),
            );
        }
        Expression::unary(unary, operand)
    }

    fn binary(&mut self, op: &Token, left: Expression, right: Expression) -> Expression {
        let Some(binary) = binary_op(op.kind) else {
            return Expression::unknown();
        };
        if !binary.accepts(left.ty, right.ty) {
            self.error_at(
                op,
                format!(
                    "operands of '{}' must be {}, found {} and {}",
                    binary.symbol(),
                    operand_rule(binary),
                    left.ty.name(),
                    right.ty.name()
                ),
            );
        }
        Expression::binary(binary, left, right)
    }

    /// Reports `what` when `expression` is not of type `wanted`.
    pub(super) fn expect_type(&mut self, at: &Token, expression: &Expression, wanted: ValueType, what: &str) {
        if !expression.ty.matches(wanted) {
            self.error_at(at, format!("{what} must be {}, found {}", wanted.name(), expression.ty.name()));
        }
    }
}
