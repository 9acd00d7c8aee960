// SPDX: CC0-1.0

use crate::Number;
use core::fmt;

/// Byte range of a token within the line it was read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn get<'src>(&self, src: &'src str) -> &'src str {
        &src[self.start..self.end()]
    }

    /// 1-based column of the span start, counted in characters.
    pub fn column(&self, src: &str) -> usize {
        src[..self.start].chars().count() + 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolId {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    OpenParen,
    CloseParen,
    Comma,
    Assign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Or,
    And,
    Not,
    Question,
    Colon,
}

impl SymbolId {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Caret => "^",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Comma => ",",
            Self::Assign => "=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Or => "||",
            Self::And => "&&",
            Self::Not => "!",
            Self::Question => "?",
            Self::Colon => ":",
        }
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    InvalidNumber,
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "Invalid character."),
            Self::InvalidNumber => write!(f, "Invalid number."),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokTyp {
    Number(Number),
    Ident,
    Symbol(SymbolId),
    /// End of the string, end of the line, or `;`.
    End,
    Error(LexErrTyp),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tok {
    pub typ: TokTyp,
    pub span: Span,
}

impl Tok {
    pub fn is_symbol(&self, id: SymbolId) -> bool {
        self.typ == TokTyp::Symbol(id)
    }

    pub const fn is_end(&self) -> bool {
        matches!(self.typ, TokTyp::End)
    }
}

const fn is_horizontal_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r')
}

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

const fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn digit_at(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx).is_some_and(u8::is_ascii_digit)
}

fn skip_digits(bytes: &[u8], mut idx: usize) -> usize {
    while digit_at(bytes, idx) {
        idx += 1;
    }
    idx
}

/// Reads the token starting at or after `pos` and returns it together with the
/// position just past it.
///
/// The end-of-input token does not consume anything, so calling again at the
/// returned position yields it again.
pub fn advance(src: &str, pos: usize) -> (Tok, usize) {
    let bytes = src.as_bytes();
    let mut start = pos;
    while bytes.get(start).copied().is_some_and(is_horizontal_space) {
        start += 1;
    }

    let tok = |typ, end: usize| {
        (
            Tok {
                typ,
                span: Span::new(start, end - start),
            },
            end,
        )
    };

    let Some(&b) = bytes.get(start) else {
        return tok(TokTyp::End, start);
    };
    let next = bytes.get(start + 1).copied();

    if b.is_ascii_digit() || (b == b'.' && digit_at(bytes, start + 1)) {
        let mut end = skip_digits(bytes, start);
        if bytes.get(end) == Some(&b'.') && digit_at(bytes, end + 1) {
            end = skip_digits(bytes, end + 1);
        }
        if let Some(b'e' | b'E') = bytes.get(end) {
            let mut exp = end + 1;
            if let Some(b'+' | b'-') = bytes.get(exp) {
                exp += 1;
            }
            if digit_at(bytes, exp) {
                end = skip_digits(bytes, exp);
            }
        }
        return match src[start..end].parse::<Number>() {
            Ok(val) => tok(TokTyp::Number(val), end),
            Err(_) => tok(TokTyp::Error(LexErrTyp::InvalidNumber), end),
        };
    }

    if is_ident_start(b) {
        let mut end = start + 1;
        while bytes.get(end).copied().is_some_and(is_ident_continue) {
            end += 1;
        }
        return tok(TokTyp::Ident, end);
    }

    let (sym, len) = match (b, next) {
        (b'\n' | b';', _) => return tok(TokTyp::End, start),
        (b'+', _) => (SymbolId::Plus, 1),
        (b'-', _) => (SymbolId::Minus, 1),
        (b'*', _) => (SymbolId::Star, 1),
        (b'/', _) => (SymbolId::Slash, 1),
        (b'%', _) => (SymbolId::Percent, 1),
        (b'^', _) => (SymbolId::Caret, 1),
        (b'(', _) => (SymbolId::OpenParen, 1),
        (b')', _) => (SymbolId::CloseParen, 1),
        (b',', _) => (SymbolId::Comma, 1),
        (b'?', _) => (SymbolId::Question, 1),
        (b':', _) => (SymbolId::Colon, 1),
        (b'=', Some(b'=')) => (SymbolId::Equal, 2),
        (b'=', _) => (SymbolId::Assign, 1),
        (b'!', Some(b'=')) => (SymbolId::NotEqual, 2),
        (b'!', _) => (SymbolId::Not, 1),
        (b'<', Some(b'=')) => (SymbolId::LessEqual, 2),
        (b'<', _) => (SymbolId::Less, 1),
        (b'>', Some(b'=')) => (SymbolId::GreaterEqual, 2),
        (b'>', _) => (SymbolId::Greater, 1),
        (b'|', Some(b'|')) => (SymbolId::Or, 2),
        (b'&', Some(b'&')) => (SymbolId::And, 2),
        _ => {
            // keep the span on a character boundary
            let width = src[start..].chars().next().map_or(1, char::len_utf8);
            return tok(TokTyp::Error(LexErrTyp::InvalidChar), start + width);
        }
    };
    tok(TokTyp::Symbol(sym), start + len)
}

/// Iterator over the tokens of one line, ending with the end-of-input token
/// or the first error.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    done: bool,
}

impl<'src> Lexer<'src> {
    pub const fn new(src: &'src str) -> Self {
        Self {
            src,
            pos: 0,
            done: false,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Tok;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (tok, pos) = advance(self.src, self.pos);
        self.pos = pos;
        if let TokTyp::End | TokTyp::Error(_) = tok.typ {
            self.done = true;
        }
        Some(tok)
    }
}
