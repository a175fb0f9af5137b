//! Turns Jsonnet source text into a stream of tokens with source positions.
//!
//! Grounded on the teacher's general approach to diagnostics (one error enum,
//! `Display` written by hand, a position attached to every value) and on the
//! hand-rolled lexer shape used across the example pack's compiler front
//! ends (cursor-based scanning, a `kind` + `lexeme` + `span` token record).

use std::rc::Rc;

use crate::span::{FileName, Pos, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Keyword {
    #[strum(serialize = "assert")]
    Assert,
    #[strum(serialize = "else")]
    Else,
    #[strum(serialize = "error")]
    Error,
    #[strum(serialize = "false")]
    False,
    #[strum(serialize = "for")]
    For,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "import")]
    Import,
    #[strum(serialize = "importstr")]
    ImportStr,
    #[strum(serialize = "importbin")]
    ImportBin,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "local")]
    Local,
    #[strum(serialize = "null")]
    Null,
    #[strum(serialize = "self")]
    SelfKw,
    #[strum(serialize = "super")]
    Super,
    #[strum(serialize = "tailstrict")]
    TailStrict,
    #[strum(serialize = "then")]
    Then,
    #[strum(serialize = "true")]
    True,
}

impl Keyword {
    fn from_ident(s: &str) -> Option<Self> {
        Some(match s {
            "assert" => Self::Assert,
            "else" => Self::Else,
            "error" => Self::Error,
            "false" => Self::False,
            "for" => Self::For,
            "function" => Self::Function,
            "if" => Self::If,
            "import" => Self::Import,
            "importstr" => Self::ImportStr,
            "importbin" => Self::ImportBin,
            "in" => Self::In,
            "local" => Self::Local,
            "null" => Self::Null,
            "self" => Self::SelfKw,
            "super" => Self::Super,
            "tailstrict" => Self::TailStrict,
            "then" => Self::Then,
            "true" => Self::True,
            _ => return None,
        })
    }
}

/// Every distinct token the lexer can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(String),
    Number(f64),
    String(String),
    /// `$`
    Dollar,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semi,
    Dot,
    Colon,
    ColonColon,
    ColonColonColon,
    Plus,
    PlusColon,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AmpAmp,
    PipePipe,
    EqEq,
    BangEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Tilde,
    Eq,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword(k) => write!(f, "{k}"),
            Self::Ident(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Dollar => write!(f, "$"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Semi => write!(f, ";"),
            Self::Dot => write!(f, "."),
            Self::Colon => write!(f, ":"),
            Self::ColonColon => write!(f, "::"),
            Self::ColonColonColon => write!(f, ":::"),
            Self::Plus => write!(f, "+"),
            Self::PlusColon => write!(f, "+:"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::Bang => write!(f, "!"),
            Self::AmpAmp => write!(f, "&&"),
            Self::PipePipe => write!(f, "||"),
            Self::EqEq => write!(f, "=="),
            Self::BangEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Amp => write!(f, "&"),
            Self::Pipe => write!(f, "|"),
            Self::Caret => write!(f, "^"),
            Self::Shl => write!(f, "<<"),
            Self::Shr => write!(f, ">>"),
            Self::Tilde => write!(f, "~"),
            Self::Eq => write!(f, "="),
            Self::Eof => write!(f, "<eof>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// A malformed token. Carries the offending position; the message describes
/// what went wrong (unterminated string/comment, invalid escape, invalid
/// number, stray character) per spec.md §4.1.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: lex error: {}", self.span, self.message)
    }
}

pub struct Lexer<'a> {
    src: &'a [u8],
    text: &'a str,
    file: FileName,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, file: impl Into<FileName>) -> Self {
        Self { src: text.as_bytes(), text, file: file.into(), pos: 0, line: 1, column: 1 }
    }

    fn here(&self) -> Pos {
        Pos { line: self.line, column: self.column, offset: self.pos as u32 }
    }

    fn span_from(&self, start: Pos) -> Span {
        Span::new(self.file.clone(), start, self.here())
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn err(&self, start: Pos, message: impl Into<String>) -> LexError {
        LexError { message: message.into(), span: self.span_from(start) }
    }

    /// Produces the full token stream, stopping at the first lex error.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.bump();
                }
                Some(b'#') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => return Err(self.err(start, "unterminated block comment")),
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.here();
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, span: self.span_from(start) });
        };

        let kind = match c {
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semi),
            b'.' => self.single(TokenKind::Dot),
            b'$' => self.single(TokenKind::Dollar),
            b'~' => self.single(TokenKind::Tilde),
            b'^' => self.single(TokenKind::Caret),
            b'?' => return Err(self.err(start, "stray character '?'")),
            b':' => {
                self.bump();
                if self.peek() == Some(b':') {
                    self.bump();
                    if self.peek() == Some(b':') {
                        self.bump();
                        TokenKind::ColonColonColon
                    } else {
                        TokenKind::ColonColon
                    }
                } else {
                    TokenKind::Colon
                }
            }
            b'+' => {
                self.bump();
                if self.peek() == Some(b':') {
                    self.bump();
                    TokenKind::PlusColon
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b'%' => self.single(TokenKind::Percent),
            b'&' => {
                self.bump();
                if self.peek() == Some(b'&') {
                    self.bump();
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            b'|' if self.peek_at(1) == Some(b'|') && self.peek_at(2) == Some(b'|') => {
                self.bump();
                self.bump();
                self.bump();
                TokenKind::String(self.lex_block_string(start)?)
            }
            b'|' => {
                self.bump();
                if self.peek() == Some(b'|') {
                    self.bump();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            b'!' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                }
            }
            b'=' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'<' => {
                self.bump();
                match self.peek() {
                    Some(b'=') => {
                        self.bump();
                        TokenKind::Lte
                    }
                    Some(b'<') => {
                        self.bump();
                        TokenKind::Shl
                    }
                    _ => TokenKind::Lt,
                }
            }
            b'>' => {
                self.bump();
                match self.peek() {
                    Some(b'=') => {
                        self.bump();
                        TokenKind::Gte
                    }
                    Some(b'>') => {
                        self.bump();
                        TokenKind::Shr
                    }
                    _ => TokenKind::Gt,
                }
            }
            b'"' | b'\'' => self.lex_quoted(start, c)?,
            b'@' => self.lex_verbatim_or_block(start)?,
            b'0'..=b'9' => self.lex_number(start)?,
            c if c.is_ascii_alphabetic() || c == b'_' => self.lex_ident_or_keyword(start),
            other => return Err(self.err(start, format!("stray character '{}'", other as char))),
        };
        Ok(Token { kind, span: self.span_from(start) })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn lex_ident_or_keyword(&mut self, start: Pos) -> TokenKind {
        let begin = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.bump();
        }
        let text = &self.text[begin..self.pos];
        match Keyword::from_ident(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => {
                let _ = start;
                TokenKind::Ident(text.to_owned())
            }
        }
    }

    fn lex_number(&mut self, start: Pos) -> Result<TokenKind, LexError> {
        let begin = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        if self.peek() == Some(b'.') {
            if !matches!(self.peek_at(1), Some(b'0'..=b'9')) {
                return Err(self.err(start, "expected digit after decimal point"));
            }
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                lookahead += 1;
            }
            if !matches!(self.peek_at(lookahead), Some(b'0'..=b'9')) {
                return Err(self.err(start, "expected digit in exponent"));
            }
            self.bump();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.bump();
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        let text = &self.text[begin..self.pos];
        text.parse::<f64>().map(TokenKind::Number).map_err(|_| self.err(start, "invalid number literal"))
    }

    fn lex_quoted(&mut self, start: Pos, quote: u8) -> Result<TokenKind, LexError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err(start, "unterminated string literal")),
                Some(b'\n') => return Err(self.err(start, "unterminated string literal (newline in string)")),
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    out.push(self.lex_escape(start, quote)?);
                }
                Some(_) => {
                    out.push(self.bump_char());
                }
            }
        }
        Ok(TokenKind::String(out))
    }

    /// Reads one UTF-8 scalar starting at `self.pos`, advancing the cursor
    /// by its byte length while keeping line/column bookkeeping accurate.
    fn bump_char(&mut self) -> char {
        let rest = &self.text[self.pos..];
        let c = rest.chars().next().expect("checked non-empty by caller");
        for _ in 0..c.len_utf8() {
            self.bump();
        }
        c
    }

    fn lex_escape(&mut self, start: Pos, quote: u8) -> Result<char, LexError> {
        let Some(c) = self.peek() else {
            return Err(self.err(start, "unterminated escape sequence"));
        };
        let escaped = match c {
            b'"' => '"',
            b'\'' => '\'',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                self.bump();
                let mut value: u32 = 0;
                for _ in 0..4 {
                    let d = self.peek().ok_or_else(|| self.err(start, "truncated \\u escape"))?;
                    let digit = (d as char).to_digit(16).ok_or_else(|| self.err(start, "invalid hex digit in \\u escape"))?;
                    value = value * 16 + digit;
                    self.bump();
                }
                return char::from_u32(value).ok_or_else(|| self.err(start, "invalid unicode code point in \\u escape"));
            }
            other if other == quote => other as char,
            other => return Err(self.err(start, format!("invalid escape sequence '\\{}'", other as char))),
        };
        self.bump();
        Ok(escaped)
    }

    fn lex_verbatim_or_block(&mut self, start: Pos) -> Result<TokenKind, LexError> {
        self.bump(); // consume '@'
        if self.peek() == Some(b'|') && self.peek_at(1) == Some(b'|') && self.peek_at(2) == Some(b'|') {
            // not standard jsonnet, treat '@|||' as invalid
            return Err(self.err(start, "unexpected '@' before block string"));
        }
        match self.peek() {
            Some(quote @ (b'\'' | b'"')) => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.err(start, "unterminated verbatim string")),
                        Some(c) if c == quote => {
                            if self.peek_at(1) == Some(quote) {
                                self.bump();
                                self.bump();
                                out.push(quote as char);
                            } else {
                                self.bump();
                                break;
                            }
                        }
                        Some(_) => out.push(self.bump_char()),
                    }
                }
                Ok(TokenKind::String(out))
            }
            _ => Err(self.err(start, "expected quote after '@'")),
        }
    }

    /// Lexes the body of a `|||`-delimited block string, per spec.md §4.1.
    /// Called from `next_token` once the opening `|||` has been consumed;
    /// reads through the rest of the header line, the body, and the closing
    /// `|||`, stripping the smallest indentation shared by every non-blank
    /// body line.
    fn lex_block_string(&mut self, start: Pos) -> Result<String, LexError> {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.bump();
        }
        match self.peek() {
            Some(b'\n') => {
                self.bump();
            }
            _ => return Err(self.err(start, "expected newline after |||")),
        }

        let mut raw_lines: Vec<String> = Vec::new();
        loop {
            let line_start = self.pos;
            loop {
                match self.peek() {
                    None => return Err(self.err(start, "unterminated block string (missing closing |||)")),
                    Some(b'\n') => break,
                    Some(_) => {
                        self.bump();
                    }
                }
            }
            let line = self.text[line_start..self.pos].to_owned();
            if line.trim() == "|||" {
                self.bump(); // consume the newline that ends the closing "|||" line, if any
                break;
            }
            raw_lines.push(line);
            match self.peek() {
                Some(b'\n') => {
                    self.bump();
                }
                None => return Err(self.err(start, "unterminated block string (missing closing |||)")),
                _ => {}
            }
        }

        let indent = raw_lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);

        let mut out = String::new();
        for line in &raw_lines {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                let stripped = if line.len() >= indent { &line[indent..] } else { line.trim_start() };
                out.push_str(stripped);
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, "test.jsonnet").tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_tokens() {
        assert_eq!(
            lex("{ a: 1, b: 2 }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Ident("a".into()),
                TokenKind::Colon,
                TokenKind::Number(1.0),
                TokenKind::Comma,
                TokenKind::Ident("b".into()),
                TokenKind::Colon,
                TokenKind::Number(2.0),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn visibility_markers() {
        assert_eq!(
            lex("a::b:::c+:d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::ColonColon,
                TokenKind::Ident("b".into()),
                TokenKind::ColonColonColon,
                TokenKind::Ident("c".into()),
                TokenKind::PlusColon,
                TokenKind::Ident("d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(lex("null nullable"), vec![
            TokenKind::Keyword(Keyword::Null),
            TokenKind::Ident("nullable".into()),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(lex(r#""a\nbA""#), vec![TokenKind::String("a\nbA".into()), TokenKind::Eof]);
    }

    #[test]
    fn verbatim_string() {
        assert_eq!(lex(r#"@'it''s'"#), vec![TokenKind::String("it's".into()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_errors() {
        let err = Lexer::new("\"abc", "t").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn numbers() {
        assert_eq!(lex("1 2.5 1e10 1.5e-3"), vec![
            TokenKind::Number(1.0),
            TokenKind::Number(2.5),
            TokenKind::Number(1e10),
            TokenKind::Number(1.5e-3),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn block_string_strips_common_indentation() {
        let src = "|||\n  line one\n    line two\n  |||\n";
        assert_eq!(lex(src), vec![TokenKind::String("line one\n  line two\n".into()), TokenKind::Eof]);
    }

    #[test]
    fn block_string_blank_lines_dont_affect_indentation() {
        let src = "|||\n  a\n\n  b\n|||\n";
        assert_eq!(lex(src), vec![TokenKind::String("a\n\nb\n".into()), TokenKind::Eof]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(lex("1 // comment\n+ 2 # also\n/* block */+3"), vec![
            TokenKind::Number(1.0),
            TokenKind::Plus,
            TokenKind::Number(2.0),
            TokenKind::Plus,
            TokenKind::Number(3.0),
            TokenKind::Eof,
        ]);
    }
}
