//! Recursive-descent parser and semantic analyser.
//!
//! A `Parser` walks the whole source once.  The driver runs two of them over
//! the same text, sharing one `Session`:
//!
//! * `Pass::First` registers every declaration so later names can be
//!   referred to before they appear.  Only duplicate declarations are
//!   reported.
//! * `Pass::Second` re-walks the grammar, matches each declaration to the
//!   symbol the first pass made, resolves every reference, builds procedure
//!   bodies and reports everything else.
//!
//! Syntax errors are recovered by skipping to a follower token, so a single
//! malformed declaration or statement produces a single diagnostic.
//
//  program     ::= [ RULES ident ';' ] declaration* [ END '.' ]
//  declaration ::= ROOM | HOUSECODE | DEVICE | TIMEOUT | BOOL | INT | CONST
//                | ENUM | PROCEDURE | DAY | TIMER  ... ';'

mod declarations;
mod expressions;
mod statements;

use super::Session;
use super::diagnostics::{Location, Pass};
use super::lexer::{self, Lexer, Token, TokenKind};
use super::symbols::{Duplicate, EntryKind, SymbolId, SymbolKind};

/// A diagnostic has already been recorded; the caller should recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reported;

pub type Parsed<T> = Result<T, Reported>;

/// Tokens at which recovery may stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet(Vec<TokenKind>);

impl TokenSet {
    pub fn of(kinds: &[TokenKind]) -> Self {
        Self(kinds.to_vec())
    }

    pub fn with(&self, kinds: &[TokenKind]) -> Self {
        let mut set = self.0.clone();
        set.extend(kinds.iter().copied().filter(|k| !self.0.contains(k)));
        Self(set)
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        self.0.contains(&kind)
    }
}

const DECLARATION_STARTS: &[TokenKind] = &[
    TokenKind::Room,
    TokenKind::HouseCode,
    TokenKind::Device,
    TokenKind::Timeout,
    TokenKind::Bool,
    TokenKind::Int,
    TokenKind::Const,
    TokenKind::Enum,
    TokenKind::Procedure,
    TokenKind::Day,
    TokenKind::Timer,
];

pub struct Parser<'s, 'src> {
    lexer: Lexer<'src>,
    token: Token,
    pass: Pass,
    session: &'s mut Session,
}

impl<'s, 'src> Parser<'s, 'src> {
    pub fn new(source: &'src str, pass: Pass, session: &'s mut Session) -> Self {
        let mut lexer = Lexer::new(source);
        let token = lexer.next_token();
        let mut parser = Self {
            lexer,
            token,
            pass,
            session,
        };
        parser.skip_bad_tokens();
        parser
    }

    /// Parses the whole program.  On the second pass this also runs the
    /// end-of-compilation checks.
    pub fn parse(mut self) {
        let framed = self.accept(TokenKind::Rules);
        if framed {
            let header = self
                .expect(TokenKind::Identifier)
                .and_then(|_| self.expect(TokenKind::Semicolon));
            if header.is_err() {
                self.recover(&TokenSet::of(DECLARATION_STARTS));
            }
        }

        while !self.at(TokenKind::Eof) && !(framed && self.at(TokenKind::End)) {
            let parsed = match self.token.kind {
                TokenKind::Room => self.room_declaration(),
                TokenKind::HouseCode => self.house_code_declaration(),
                TokenKind::Device => self.device_declaration(),
                TokenKind::Timeout => self.timeout_declaration(),
                TokenKind::Bool | TokenKind::Int => self.variable_declaration(),
                TokenKind::Const => self.const_declaration(),
                TokenKind::Enum => self.enum_declaration(),
                TokenKind::Procedure => self.procedure_declaration(),
                TokenKind::Day => self.day_declaration(),
                TokenKind::Timer => self.timer_declaration(),
                _ => Err(self.syntax_error(DECLARATION_STARTS)),
            };
            let terminated = parsed.and_then(|_| self.expect(TokenKind::Semicolon));
            if terminated.is_err() {
                self.recover(&TokenSet::of(DECLARATION_STARTS));
            }
        }

        if framed {
            let trailer = self
                .expect(TokenKind::End)
                .and_then(|_| self.expect(TokenKind::Dot));
            if trailer.is_ok() && !self.at(TokenKind::Eof) {
                self.syntax_error(&[TokenKind::Eof]);
            }
        }

        if self.pass == Pass::Second {
            self.finish();
        }
    }

    /// Usage sweep and calendar sanity check, after the second pass.
    fn finish(&mut self) {
        let unused: Vec<SymbolId> = self.session.symbols.unused().collect();
        for id in unused {
            let name = self.session.symbols.qualified_name(id);
            let line = self.session.symbols.get(id).line;
            self.session
                .diagnostics
                .warning(self.pass, Location::line_only(line), format!("'{name}' not used"));
        }
        if !self.session.calendar.has_season_changes() {
            let line = self.lexer.line();
            self.session.diagnostics.warning(
                self.pass,
                Location::line_only(line),
                "no BST/GMT changeover days defined",
            );
        }
    }

    /* ------------------------------------------------------------------ */
    /* token handling                                                      */
    /* ------------------------------------------------------------------ */

    fn at(&self, kind: TokenKind) -> bool {
        self.token.is(kind)
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.token.kind)
    }

    /// Single letters A..P lex as house letters but are also valid names.
    fn at_name(&self) -> bool {
        self.at(TokenKind::Identifier) || self.at(TokenKind::HouseLetter)
    }

    /// Moves to the next token and returns the one just passed.
    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        let previous = std::mem::replace(&mut self.token, next);
        self.skip_bad_tokens();
        previous
    }

    /// Lexical errors are reported where they occur and then ignored.
    fn skip_bad_tokens(&mut self) {
        while let TokenKind::Error(e) = self.token.kind {
            self.error(e.message());
            self.token = self.lexer.next_token();
        }
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Parsed<Token> {
        if self.at(kind) || (kind == TokenKind::Identifier && self.at_name()) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(&[kind]))
        }
    }

    /// Discards tokens until one in `followers` (or a `;`, which is
    /// consumed) or the end of the file.
    fn recover(&mut self, followers: &TokenSet) {
        while !self.at(TokenKind::Eof) && !followers.contains(self.token.kind) {
            if self.accept(TokenKind::Semicolon) {
                return;
            }
            self.advance();
        }
    }

    fn skip_to(&mut self, stop: &TokenSet) {
        while !self.at(TokenKind::Eof) && !stop.contains(self.token.kind) {
            self.advance();
        }
    }

    /* ------------------------------------------------------------------ */
    /* diagnostics                                                         */
    /* ------------------------------------------------------------------ */

    fn location_of(&self, token: &Token) -> Location {
        Location {
            line: token.line,
            column: token.start,
            source_line: Some(self.lexer.line_text(token.line)),
            pointer: Some(lexer::pointer_under(token.start, token.end)),
        }
    }

    fn location(&self) -> Location {
        Location {
            line: self.token.line,
            column: self.token.start,
            source_line: Some(self.lexer.current_line_text()),
            pointer: Some(self.lexer.pointer()),
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let location = self.location();
        self.session.diagnostics.error(self.pass, location, message);
    }

    fn error_at(&mut self, token: &Token, message: impl Into<String>) {
        let location = self.location_of(token);
        self.session.diagnostics.error(self.pass, location, message);
    }

    fn warning_at(&mut self, token: &Token, message: impl Into<String>) {
        let location = self.location_of(token);
        self.session.diagnostics.warning(self.pass, location, message);
    }

    fn syntax_error(&mut self, expected: &[TokenKind]) -> Reported {
        let wanted: Vec<&str> = expected.iter().map(|k| k.describe()).collect();
        let found = match self.token.kind {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("'{}'", self.token.text),
        };
        let message = match wanted.as_slice() {
            [one] => format!("expected {one}, found {found}"),
            many => format!("expected one of {}, found {found}", many.join(", ")),
        };
        self.error(message);
        Reported
    }

    /// Duplicates are reported by the pass that first sees both
    /// declarations.  Normally that is the first pass; a declaration the
    /// first pass could not register is checked on the second.
    fn duplicate(&mut self, token: &Token, what: &str, dup: Duplicate) {
        let message = format!(
            "{what} '{}' already declared on line {}",
            token.text, dup.previous_line
        );
        let location = self.location_of(token);
        match dup.previous_pass {
            Pass::First => self.session.diagnostics.pass1_error(self.pass, location, message),
            Pass::Second => self.session.diagnostics.error(self.pass, location, message),
        }
    }

    /* ------------------------------------------------------------------ */
    /* name resolution                                                     */
    /* ------------------------------------------------------------------ */

    /// Resolves a reference to a top-level name of one of the `expected`
    /// kinds.  Unknown names are reported once and then remembered as
    /// undefined; a name of the wrong kind is reported every time.
    fn resolve(&mut self, token: &Token, expected: &[EntryKind]) -> Option<SymbolId> {
        let Some(id) = self.session.symbols.lookup(&token.text) else {
            self.error_at(token, format!("unknown identifier '{}'", token.text));
            if self.pass == Pass::Second {
                self.session
                    .symbols
                    .declare_undefined(&token.text, token.line, self.pass);
            }
            return None;
        };

        let kind = &self.session.symbols.get(id).kind;
        if *kind == SymbolKind::Undefined {
            return None;
        }
        if !expected.contains(&kind.entry_kind()) {
            let found = kind.describe();
            let article = if found.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
            self.error_at(token, format!("'{}' is {article} {found}, which is not allowed here", token.text));
            return None;
        }
        if self.pass == Pass::Second {
            self.session.symbols.note_use(id);
        }
        Some(id)
    }

    fn resolve_procedure(&mut self, token: &Token) -> Option<SymbolId> {
        self.resolve(token, &[EntryKind::Procedure])
    }

    /// `room.device` in a statement or expression.
    fn resolve_device(&mut self, room: &Token, device: &Token) -> Option<SymbolId> {
        let room_id = self.resolve(room, &[EntryKind::Room])?;
        match self.session.symbols.device_in(room_id, &device.text) {
            Some(id) => {
                if self.pass == Pass::Second {
                    self.session.symbols.note_use(id);
                }
                Some(id)
            }
            None => {
                self.error_at(device, format!("unknown device '{}.{}'", room.text, device.text));
                None
            }
        }
    }

    fn entry(&self, id: Option<SymbolId>) -> usize {
        id.map_or(0, |id| self.session.symbols.entry_of(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::processor::test_support::{compile, errors, warnings};

    #[test]
    fn empty_source_compiles() {
        let s = compile("");
        assert!(errors(&s).is_empty());
        assert_eq!(warnings(&s), vec!["no BST/GMT changeover days defined"]);
    }

    #[test]
    fn rules_frame_is_optional_but_must_close() {
        let s = compile("RULES Home;\nROOM Kitchen;\nEND.");
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));

        let s = compile("RULES Home;\nROOM Kitchen;\n");
        assert_eq!(errors(&s), vec!["expected END, found end of file"]);

        let s = compile("RULES Home;\nROOM Kitchen;\nEND.\nROOM Hall;");
        assert_eq!(errors(&s), vec!["expected end of file, found 'ROOM'"]);
    }

    #[test]
    fn unknown_top_level_token_reports_once() {
        let s = compile("ROOM Kitchen;\nbanana split here;\nROOM Hall;");
        assert_eq!(errors(&s).len(), 1, "{:?}", errors(&s));
        assert!(errors(&s)[0].starts_with("expected one of ROOM"));
    }

    #[test]
    fn malformed_declaration_yields_one_diagnostic() {
        let s = compile("DEVICE LAMP Kitchen Light A 1 OFFPROCEDURE;\nROOM Kitchen;");
        assert_eq!(errors(&s), vec!["expected '.', found 'Light'"]);
    }

    #[test]
    fn single_letters_are_names_where_a_name_is_expected() {
        let s = compile("PROCEDURE P; END;\nPROCEDURE Q; CALL P; END;\nTIMEOUT A 00:10 OFFPROCEDURE Q;");
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        assert!(s.symbols.lookup("P").is_some());
    }

    #[test]
    fn lexical_errors_are_reported_and_skipped() {
        let s = compile("ROOM Kitchen # ;");
        assert_eq!(errors(&s), vec!["bad token"]);
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let s = compile("ROOM Kitchen\nROOM Hall;");
        assert_eq!(errors(&s), vec!["expected ';', found 'ROOM'"]);
        // recovery resumes at the next declaration
        assert!(s.symbols.lookup("Hall").is_some());
    }
}
