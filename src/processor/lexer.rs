//! Hand-written lexer for the rules language.
//!
//! The lexer turns the source buffer into `Token`s one at a time.  Keywords
//! are recognised here (case-insensitively), as are colour names, device
//! states and bare house letters, so the parser only ever switches on
//! `TokenKind`.
//
//  Lexical items (informal):
//
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]*
//      Integer  ::= [0-9]+
//      Time     ::= '-'? [0-9]+ ':' [0-9]{2} (':' [0-9]{2})?
//      Date     ::= [0-9]{1,2} '/' [0-9]{1,2} '/' [0-9]{4}
//      String   ::= '"' [^"\n]* '"'
//      Comment  ::= '//' .* end-of-line
//
//  Classification order for words: reserved word, colour, device state,
//  single letter A-P (house code), identifier.

use crate::calendar;
use crate::tables::{colours, device_states};
use chrono::NaiveDate;

/// Appended to the buffer so the scanner never has to test for end of input
/// separately from looking at a character.
const EOF_SENTINEL: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexError {
    UnexpectedChar,
    UnterminatedString,
    MalformedTime,
    MalformedDate,
    IntegerOverflow,
    TimeOverflow,
}

impl LexError {
    pub fn message(self) -> &'static str {
        match self {
            LexError::UnexpectedChar => "bad token",
            LexError::UnterminatedString => "string not terminated before end of line",
            LexError::MalformedTime => "time must be of form 'hh:mm' or 'hh:mm:ss'",
            LexError::MalformedDate => "date must be of form 'dd/mm/yyyy'",
            LexError::IntegerOverflow => "integer too large",
            LexError::TimeOverflow => "time too large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // literals
    Identifier,
    Integer,
    Time,
    Date,
    Str,
    Colour,
    DeviceState,
    HouseLetter,
    True,
    False,

    // declarations
    Rules,
    Room,
    HouseCode,
    Device,
    Lamp,
    Appliance,
    ApplianceLamp,
    HueLamp,
    Sensor,
    Remote,
    Timeout,
    Bool,
    Int,
    Const,
    Enum,
    Procedure,
    End,
    OffProcedure,
    OnProcedure,

    // calendar and timers
    Day,
    Holiday,
    Bst,
    Gmt,
    Timer,
    Sequence,
    Event,
    Sunrise,
    Sunset,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
    All,
    Working,
    NonWorking,
    FirstWorking,
    NonFirstWorking,

    // statements
    If,
    Then,
    Else,
    EndIf,
    Call,
    SetDevice,
    ColourLoop,
    Delayed,
    Duration,
    Reset,
    RefreshDevices,
    ResynchClock,
    Assert,

    // operators
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    PlusPlus,
    MinusMinus,
    Assign,

    // punctuation
    Semicolon,
    Comma,
    Dot,
    LParen,
    RParen,

    Error(LexError),
    Eof,
}

impl TokenKind {
    /// How the token is spelled in diagnostics.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Identifier => "identifier",
            Integer => "integer",
            Time => "time",
            Date => "date",
            Str => "string",
            Colour => "colour",
            DeviceState => "device state",
            HouseLetter => "house code letter",
            Semicolon => "';'",
            Comma => "','",
            Dot => "'.'",
            LParen => "'('",
            RParen => "')'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Less => "'<'",
            LessEqual => "'<='",
            Greater => "'>'",
            GreaterEqual => "'>='",
            EqualEqual => "'=='",
            NotEqual => "'!='",
            PlusPlus => "'++'",
            MinusMinus => "'--'",
            Assign => "'='",
            Error(_) => "bad token",
            Eof => "end of file",
            other => KEYWORDS
                .iter()
                .find(|&&(_, kind)| kind == other)
                .map(|&(word, _)| word)
                .unwrap_or("keyword"),
        }
    }
}

/// Reserved words, matched ignoring case.
static KEYWORDS: &[(&str, TokenKind)] = &[
    ("RULES", TokenKind::Rules),
    ("ROOM", TokenKind::Room),
    ("HOUSECODE", TokenKind::HouseCode),
    ("DEVICE", TokenKind::Device),
    ("LAMP", TokenKind::Lamp),
    ("APPLIANCE", TokenKind::Appliance),
    ("APPLIANCELAMP", TokenKind::ApplianceLamp),
    ("HUELAMP", TokenKind::HueLamp),
    ("SENSOR", TokenKind::Sensor),
    ("REMOTE", TokenKind::Remote),
    ("TIMEOUT", TokenKind::Timeout),
    ("BOOL", TokenKind::Bool),
    ("FLAG", TokenKind::Bool),
    ("INT", TokenKind::Int),
    ("CONST", TokenKind::Const),
    ("ENUM", TokenKind::Enum),
    ("PROCEDURE", TokenKind::Procedure),
    ("END", TokenKind::End),
    ("OFFPROCEDURE", TokenKind::OffProcedure),
    ("ONPROCEDURE", TokenKind::OnProcedure),
    ("DAY", TokenKind::Day),
    ("HOLIDAY", TokenKind::Holiday),
    ("BST", TokenKind::Bst),
    ("GMT", TokenKind::Gmt),
    ("TIMER", TokenKind::Timer),
    ("SEQUENCE", TokenKind::Sequence),
    ("EVENT", TokenKind::Event),
    ("SUNRISE", TokenKind::Sunrise),
    ("SUNSET", TokenKind::Sunset),
    ("MON", TokenKind::Mon),
    ("TUE", TokenKind::Tue),
    ("WED", TokenKind::Wed),
    ("THU", TokenKind::Thu),
    ("FRI", TokenKind::Fri),
    ("SAT", TokenKind::Sat),
    ("SUN", TokenKind::Sun),
    ("ALL", TokenKind::All),
    ("WORKING", TokenKind::Working),
    ("NONWORKING", TokenKind::NonWorking),
    ("FIRSTWORKING", TokenKind::FirstWorking),
    ("NONFIRSTWORKING", TokenKind::NonFirstWorking),
    ("IF", TokenKind::If),
    ("THEN", TokenKind::Then),
    ("ELSE", TokenKind::Else),
    ("ENDIF", TokenKind::EndIf),
    ("CALL", TokenKind::Call),
    ("SETDEVICE", TokenKind::SetDevice),
    ("COLOURLOOP", TokenKind::ColourLoop),
    ("COLORLOOP", TokenKind::ColourLoop),
    ("DELAYED", TokenKind::Delayed),
    ("DURATION", TokenKind::Duration),
    ("RESET", TokenKind::Reset),
    ("REFRESHDEVICES", TokenKind::RefreshDevices),
    ("RESYNCHCLOCK", TokenKind::ResynchClock),
    ("ASSERT", TokenKind::Assert),
    ("AND", TokenKind::And),
    ("OR", TokenKind::Or),
    ("NOT", TokenKind::Not),
    ("TRUE", TokenKind::True),
    ("FALSE", TokenKind::False),
];

fn keyword(word: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
        .map(|&(_, kind)| kind)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Integer value, time in seconds, date in days since 1970-01-01,
    /// colour as `0xRRGGBB`, device-state code or house letter index.
    pub value: i64,
    pub line: usize,
    /// Zero-based character columns `[start, end)` on `line`.
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

#[derive(Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    line_start: usize,
    last_start: usize,
    last_end: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut chars: Vec<char> = src.chars().collect();
        chars.push(EOF_SENTINEL);
        Self {
            src,
            chars,
            pos: 0,
            line: 1,
            line_start: 0,
            last_start: 0,
            last_end: 0,
        }
    }

    fn peek_char(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars
            .get(self.pos + offset)
            .copied()
            .unwrap_or(EOF_SENTINEL)
    }

    fn next_char(&mut self) -> char {
        let c = self.peek_char();
        if !self.at_end() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.line_start = self.pos;
            }
        }
        c
    }

    fn at_end(&self) -> bool {
        self.pos + 1 >= self.chars.len()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while !self.at_end() && pred(self.peek_char()) {
            buf.push(self.next_char());
        }
    }

    fn skip_blanks_and_comments(&mut self) {
        loop {
            let c = self.peek_char();
            if self.at_end() {
                return;
            }
            if c.is_whitespace() {
                self.next_char();
            } else if c == '/' && self.peek_at(1) == '/' {
                while !self.at_end() && self.peek_char() != '\n' {
                    self.next_char();
                }
            } else {
                return;
            }
        }
    }

    /// Text of the line the most recent token sits on.
    pub fn current_line_text(&self) -> String {
        self.chars[self.line_start..]
            .iter()
            .take_while(|&&c| c != '\n' && c != EOF_SENTINEL)
            .filter(|&&c| c != '\r')
            .collect()
    }

    /// Text of an earlier line, for diagnostics about tokens already
    /// consumed.
    pub fn line_text(&self, line: usize) -> String {
        self.src
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim_end_matches('\r')
            .to_string()
    }

    /// Dots up to the most recent token and carets under it.
    pub fn pointer(&self) -> String {
        pointer_under(self.last_start, self.last_end)
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_blanks_and_comments();

        let start_pos = self.pos;
        let line = self.line;
        let column = self.pos - self.line_start;

        let (kind, text, value) = self.scan();

        self.last_start = column;
        self.last_end = column + (self.pos - start_pos);
        Token {
            kind,
            text,
            value,
            line,
            start: self.last_start,
            end: self.last_end,
        }
    }

    fn scan(&mut self) -> (TokenKind, String, i64) {
        if self.at_end() {
            return (TokenKind::Eof, String::new(), 0);
        }
        let c = self.next_char();
        let single = |kind| (kind, c.to_string(), 0);

        match c {
            c if c.is_ascii_alphabetic() || c == '_' => self.read_word(c),
            c if c.is_ascii_digit() => self.read_number(c, false),
            '-' if self.peek_char().is_ascii_digit() && self.digits_then_colon() => {
                self.read_number('-', true)
            }
            '"' => self.read_string(),
            ';' => single(TokenKind::Semicolon),
            ',' => single(TokenKind::Comma),
            '.' => single(TokenKind::Dot),
            '(' => single(TokenKind::LParen),
            ')' => single(TokenKind::RParen),
            '*' => single(TokenKind::Star),
            '/' => single(TokenKind::Slash),
            '%' => single(TokenKind::Percent),
            '+' => self.pair('+', TokenKind::PlusPlus, TokenKind::Plus, c),
            '-' => self.pair('-', TokenKind::MinusMinus, TokenKind::Minus, c),
            '=' => self.pair('=', TokenKind::EqualEqual, TokenKind::Assign, c),
            '!' => self.pair('=', TokenKind::NotEqual, TokenKind::Not, c),
            '<' => self.pair('=', TokenKind::LessEqual, TokenKind::Less, c),
            '>' => self.pair('=', TokenKind::GreaterEqual, TokenKind::Greater, c),
            '&' => self.pair('&', TokenKind::And, TokenKind::Error(LexError::UnexpectedChar), c),
            '|' => self.pair('|', TokenKind::Or, TokenKind::Error(LexError::UnexpectedChar), c),
            other => (
                TokenKind::Error(LexError::UnexpectedChar),
                other.to_string(),
                0,
            ),
        }
    }

    /// One character of lookahead for the two-character operators.
    fn pair(
        &mut self,
        second: char,
        double: TokenKind,
        single: TokenKind,
        first: char,
    ) -> (TokenKind, String, i64) {
        if self.peek_char() == second {
            self.next_char();
            (double, format!("{first}{second}"), 0)
        } else {
            (single, first.to_string(), 0)
        }
    }

    fn digits_then_colon(&self) -> bool {
        let mut offset = 0;
        while self.peek_at(offset).is_ascii_digit() {
            offset += 1;
        }
        self.peek_at(offset) == ':'
    }

    fn read_word(&mut self, first: char) -> (TokenKind, String, i64) {
        let mut word = String::new();
        word.push(first);
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut word);

        if let Some(kind) = keyword(&word) {
            return (kind, word, 0);
        }
        if let Some(rgb) = colours::lookup(&word) {
            return (TokenKind::Colour, word, rgb as i64);
        }
        if let Some(state) = device_states::lookup(&word) {
            return (TokenKind::DeviceState, word, state as i64);
        }
        let mut chars = word.chars();
        if let (Some(letter @ 'A'..='P'), None) = (chars.next(), chars.next()) {
            return (TokenKind::HouseLetter, word, (letter as u8 - b'A') as i64);
        }
        (TokenKind::Identifier, word, 0)
    }

    /// Integers turn into times on `:` and into dates on `/`.
    fn read_number(&mut self, first: char, negative_time: bool) -> (TokenKind, String, i64) {
        let mut text = String::new();
        text.push(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut text);

        if self.peek_char() == ':' {
            self.consume_while(|c| c.is_ascii_digit() || c == ':', &mut text);
            return match parse_time(&text) {
                Ok(seconds) => (TokenKind::Time, text, seconds),
                Err(e) => (TokenKind::Error(e), text, 0),
            };
        }
        if negative_time {
            return (TokenKind::Error(LexError::MalformedTime), text, 0);
        }
        if self.peek_char() == '/' && self.peek_at(1).is_ascii_digit() {
            self.consume_while(|c| c.is_ascii_digit() || c == '/', &mut text);
            return match parse_date(&text) {
                Some(days) => (TokenKind::Date, text, days),
                None => (TokenKind::Error(LexError::MalformedDate), text, 0),
            };
        }
        match text.parse::<i32>() {
            Ok(value) => (TokenKind::Integer, text, value as i64),
            Err(_) => (TokenKind::Error(LexError::IntegerOverflow), text, 0),
        }
    }

    fn read_string(&mut self) -> (TokenKind, String, i64) {
        let mut text = String::new();
        self.consume_while(|c| c != '"' && c != '\n', &mut text);
        if self.peek_char() == '"' {
            self.next_char();
            (TokenKind::Str, text, 0)
        } else {
            (TokenKind::Error(LexError::UnterminatedString), text, 0)
        }
    }
}

pub fn pointer_under(start: usize, end: usize) -> String {
    let width = end.saturating_sub(start).max(1);
    format!("{}{}", ".".repeat(start), "^".repeat(width))
}

/// `[-]h:mm[:ss]` to seconds, bounded like integer literals.
fn parse_time(text: &str) -> Result<i64, LexError> {
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text),
    };
    let parts: Vec<&str> = body.split(':').collect();
    if !(2..=3).contains(&parts.len()) || parts[1..].iter().any(|p| p.len() != 2) {
        return Err(LexError::MalformedTime);
    }
    let field = |p: &str| p.parse::<i64>().map_err(|_| LexError::MalformedTime);
    let minutes = field(parts[1])?;
    let seconds = match parts.get(2) {
        Some(s) => field(s)?,
        None => 0,
    };
    if minutes >= 60 || seconds >= 60 {
        return Err(LexError::MalformedTime);
    }
    let hours: i64 = parts[0].parse().map_err(|_| LexError::TimeOverflow)?;
    let total = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .filter(|&t| t <= i64::from(i32::MAX))
        .ok_or(LexError::TimeOverflow)?;
    Ok(sign * total)
}

/// `dd/mm/yyyy` to days since 1970-01-01.
fn parse_date(text: &str) -> Option<i64> {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(calendar::epoch_days)
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        (!token.is(TokenKind::Eof)).then_some(token)
    }
}
