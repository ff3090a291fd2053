//! Main scanner implementation for AGS script.
//!
//! The [`Scanner`] converts source text into a stream of [`Token`]s. It
//! dispatches on the first character of each token, decodes literal values
//! on the fly, and checks that `()`, `[]` and `{}` nest properly, so the
//! parser never has to deal with unbalanced brackets.
//!
//! All token text is copied into the arena, allowing the source string to be
//! freed after scanning completes.

use bumpalo::Bump;
use ordered_float::OrderedFloat;

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, TokenValue, lookup_keyword};
use super::token_list::TokenList;
use agscript_core::{CompileError, ScanError, Span};

/// String literals starting with this prefix mark the start of a new
/// section; the remainder of the literal is the section name.
pub const NEW_SECTION_PREFIX: &str = "__NEWSCRIPTSTART_";

/// Largest integer magnitude the scanner accepts. It only fits into an
/// `int` when negated, which the parser checks.
pub const INT_LITERAL_MAX: i64 = 2_147_483_648;

/// An opening bracket that still waits for its partner.
#[derive(Debug, Clone, Copy)]
struct OpenBracket {
    opener: char,
    closer: char,
    line: u32,
    section: u16,
}

/// Scanner for AGS script source code.
///
/// The `'src` lifetime is the source string being scanned (temporary).
/// The `'ast` lifetime is the arena where token text is allocated (persists).
pub struct Scanner<'src, 'ast> {
    /// Low-level character cursor.
    cursor: Cursor<'src>,
    /// Arena for allocating token lexemes and decoded strings.
    arena: &'ast Bump,
    /// Names of the sections seen so far; index 0 is the unnamed start.
    sections: Vec<String>,
    /// Index of the current section.
    section: u16,
    /// Brackets opened but not closed yet.
    open_brackets: Vec<OpenBracket>,
    /// Set once EOF or an error has been delivered.
    finished: bool,
}

impl<'src, 'ast> Scanner<'src, 'ast> {
    /// Create a new scanner for the given source text.
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            sections: vec![String::new()],
            section: 0,
            open_brackets: Vec::new(),
            finished: false,
        }
    }

    /// Scan the whole input into a [`TokenList`].
    ///
    /// The first scan error stops scanning; it is reported in the section
    /// where it occurred.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn scan_all(mut self) -> Result<TokenList<'ast>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            match self.next_token() {
                Ok(token) => {
                    let eof = token.kind == TokenKind::Eof;
                    tokens.push(token);
                    if eof {
                        break;
                    }
                }
                Err(err) => return Err(CompileError::from_scan(&err, self.current_section())),
            }
        }
        log::trace!("scanned {} tokens in {} section(s)", tokens.len(), self.sections.len());
        Ok(TokenList::new(tokens, self.sections))
    }

    /// Name of the section currently being scanned.
    pub fn current_section(&self) -> &str {
        &self.sections[self.section as usize]
    }

    /// Consume and return the next token.
    ///
    /// After the end of input this keeps returning [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Result<Token<'ast>, ScanError> {
        loop {
            self.skip_whitespace_and_comments()?;

            if self.cursor.is_eof() {
                return self.make_eof();
            }

            let start = self.start();
            let Some(c) = self.cursor.peek() else {
                return self.make_eof();
            };

            // Dispatch based on first character
            let token = match c {
                '"' => {
                    let token = self.scan_string(start)?;
                    if let TokenValue::Str(bytes) = token.value
                        && let Some(name) = bytes.strip_prefix(NEW_SECTION_PREFIX.as_bytes())
                    {
                        self.start_section(String::from_utf8_lossy(name).into_owned());
                        continue;
                    }
                    token
                }
                '\'' => self.scan_char(start)?,
                c if c.is_ascii_digit() => self.scan_number(start)?,
                '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(start)?,
                c if is_ident_start(c) => self.scan_identifier(start),
                _ => self.scan_operator(start)?,
            };

            self.check_nesting(&token)?;
            return Ok(token);
        }
    }

    // =========================================
    // Internal: positions and token creation
    // =========================================

    fn start(&self) -> Start {
        Start {
            line: self.cursor.line(),
            col: self.cursor.column(),
            offset: self.cursor.offset(),
        }
    }

    fn span_from(&self, start: Start) -> Span {
        Span::new(start.line, start.col, self.cursor.offset() - start.offset)
    }

    fn start_section(&mut self, name: String) {
        log::trace!("new section '{}'", name);
        self.sections.push(name);
        self.section = (self.sections.len() - 1) as u16;
        self.cursor.set_line(0);
    }

    /// Create an EOF token, failing if brackets are still open.
    fn make_eof(&mut self) -> Result<Token<'ast>, ScanError> {
        if let Some(open) = self.open_brackets.pop() {
            return Err(ScanError::UnclosedOpener {
                opener: open.opener,
                span: Span::point(open.line, 0),
            });
        }
        self.finished = true;
        let span = Span::point(self.cursor.line(), self.cursor.column());
        Ok(Token::new(TokenKind::Eof, "", span, self.section))
    }

    /// Create a token from start position to current position.
    /// Copies the lexeme into the arena.
    fn make_token(&self, kind: TokenKind, start: Start) -> Token<'ast> {
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(start.offset));
        Token::new(kind, lexeme, self.span_from(start), self.section)
    }

    // =========================================
    // Scanning: Whitespace and comments
    // =========================================

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ScanError> {
        loop {
            self.cursor.eat_while(|c| c.is_ascii_whitespace());

            if self.cursor.check_str("//") {
                self.cursor.eat_while(|c| c != '\n');
                continue;
            }

            if self.cursor.check_str("/*") {
                let start = self.start();
                self.cursor.advance();
                self.cursor.advance();
                loop {
                    if self.cursor.is_eof() {
                        return Err(ScanError::UnterminatedComment {
                            span: self.span_from(start),
                        });
                    }
                    if self.cursor.check_str("*/") {
                        self.cursor.advance();
                        self.cursor.advance();
                        break;
                    }
                    self.cursor.advance();
                }
                continue;
            }

            return Ok(());
        }
    }

    // =========================================
    // Scanning: Char and string literals
    // =========================================

    /// Scan a char literal. It is delivered as an integer literal whose
    /// value is the character code.
    fn scan_char(&mut self, start: Start) -> Result<Token<'ast>, ScanError> {
        self.cursor.advance(); // opening '\''

        let Some(ch) = self.cursor.advance() else {
            return Err(ScanError::UnfinishedCharLiteral {
                span: self.span_from(start),
            });
        };

        let code = if ch == '\\' {
            if self.cursor.peek() == Some('[') {
                return Err(ScanError::BracketEscapeInCharLiteral {
                    span: self.span_from(start),
                });
            }
            self.scan_escape(start)? as i64
        } else {
            ch as i64
        };

        match self.cursor.advance() {
            None => Err(ScanError::MissingApostrophe {
                span: self.span_from(start),
            }),
            Some('\'') => {
                let token = self.make_token(TokenKind::IntLiteral, start);
                Ok(token.with_value(TokenValue::Int(code)))
            }
            Some(found) => Err(ScanError::ExpectedApostrophe {
                found,
                span: self.span_from(start),
            }),
        }
    }

    /// Decode the escape sequence following a backslash that has already
    /// been consumed.
    fn scan_escape(&mut self, start: Start) -> Result<u8, ScanError> {
        let Some(ch) = self.cursor.advance() else {
            return Err(ScanError::UnfinishedEscape {
                span: self.span_from(start),
            });
        };

        Ok(match ch {
            '0'..='7' => {
                // Up to three octal digits, as long as the value fits a byte
                let mut value = ch as u32 - '0' as u32;
                for _ in 0..2 {
                    match self.cursor.peek() {
                        Some(d @ '0'..='7') if value * 8 + (d as u32 - '0' as u32) <= 255 => {
                            value = value * 8 + (d as u32 - '0' as u32);
                            self.cursor.advance();
                        }
                        _ => break,
                    }
                }
                value as u8
            }
            'x' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    match self.cursor.peek().and_then(|d| d.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            self.cursor.advance();
                        }
                        None => break,
                    }
                }
                value as u8
            }
            '\'' | '"' | '\\' | '?' => ch as u8,
            'a' => 0x07,
            'b' => 0x08,
            'e' => 0x1b,
            'f' => 0x0c,
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            'v' => 0x0b,
            other => {
                return Err(ScanError::UnknownEscape {
                    ch: other,
                    span: self.span_from(start),
                });
            }
        })
    }

    /// Scan a string literal. `\[` is kept as the two characters it is
    /// written with; the engine turns it into a literal `[`.
    fn scan_string(&mut self, start: Start) -> Result<Token<'ast>, ScanError> {
        self.cursor.advance(); // opening '"'
        let mut bytes = Vec::new();

        loop {
            match self.cursor.peek() {
                None => {
                    return Err(ScanError::UnterminatedString {
                        span: self.span_from(start),
                    });
                }
                Some('\n' | '\r') => {
                    return Err(ScanError::LineBreakInString {
                        span: self.span_from(start),
                    });
                }
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('\n' | '\r') => {
                            return Err(ScanError::LineBreakInString {
                                span: self.span_from(start),
                            });
                        }
                        Some('[') => {
                            self.cursor.advance();
                            bytes.extend_from_slice(b"\\[");
                        }
                        _ => bytes.push(self.scan_escape(start)?),
                    }
                }
                Some(c) => {
                    self.cursor.advance();
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }

        let value = TokenValue::Str(self.arena.alloc_slice_copy(&bytes));
        Ok(self.make_token(TokenKind::StringLiteral, start).with_value(value))
    }

    // =========================================
    // Scanning: Numbers
    // =========================================

    /// Scan an integer or float literal.
    ///
    /// A literal becomes a float as soon as it contains a `.` or an
    /// exponent; `7.`, `.77` and `7.e-7` are all floats.
    fn scan_number(&mut self, start: Start) -> Result<Token<'ast>, ScanError> {
        let mut is_float = false;
        let mut seen_exponent = false;

        if self.cursor.eat('.') {
            is_float = true;
        }

        while let Some(c) = self.cursor.peek() {
            match c {
                '0'..='9' => {
                    self.cursor.advance();
                }
                '.' if !is_float => {
                    is_float = true;
                    self.cursor.advance();
                }
                'e' | 'E' if !seen_exponent => {
                    is_float = true;
                    seen_exponent = true;
                    self.cursor.advance();
                    if matches!(self.cursor.peek(), Some('-' | '+')) {
                        self.cursor.advance();
                    }
                }
                _ => break,
            }
        }

        let text = self.cursor.slice_from(start.offset);
        let span = self.span_from(start);

        if is_float {
            let malformed = || ScanError::MalformedNumber {
                text: text.to_string(),
                span,
            };
            let wide: f64 = text.parse().map_err(|_| malformed())?;
            if !wide.is_finite() || wide.abs() > f32::MAX as f64 {
                return Err(ScanError::NumberOutOfRange {
                    text: text.to_string(),
                    span,
                });
            }
            let value: f32 = text.parse().map_err(|_| malformed())?;
            let token = self.make_token(TokenKind::FloatLiteral, start);
            return Ok(token.with_value(TokenValue::Float(OrderedFloat(value))));
        }

        let value = match text.parse::<i64>() {
            Ok(value) if value <= INT_LITERAL_MAX => value,
            _ => {
                return Err(ScanError::NumberOutOfRange {
                    text: text.to_string(),
                    span,
                });
            }
        };
        Ok(self.make_token(TokenKind::IntLiteral, start).with_value(TokenValue::Int(value)))
    }

    // =========================================
    // Scanning: Identifiers and keywords
    // =========================================

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self, start: Start) -> Token<'ast> {
        self.cursor.eat_while(is_ident_continue);
        let lexeme = self.cursor.slice_from(start.offset);
        let kind = lookup_keyword(lexeme).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    // =========================================
    // Scanning: Operators
    // =========================================

    /// Scan an operator or punctuation token.
    ///
    /// Uses tuple matching on (first_char, peek) to minimize repeated peek() calls.
    fn scan_operator(&mut self, start: Start) -> Result<Token<'ast>, ScanError> {
        let Some(c) = self.cursor.advance() else {
            return self.make_eof();
        };
        let next = self.cursor.peek();

        let kind = match (c, next) {
            // Single character tokens (no lookahead needed)
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            ('{', _) => TokenKind::LeftBrace,
            ('}', _) => TokenKind::RightBrace,
            (';', _) => TokenKind::Semicolon,
            (',', _) => TokenKind::Comma,
            ('~', _) => TokenKind::Tilde,
            ('?', _) => TokenKind::Question,

            ('.', Some('.')) => {
                self.cursor.advance();
                if !self.cursor.eat('.') {
                    return Err(ScanError::BadDots {
                        span: self.span_from(start),
                    });
                }
                TokenKind::Ellipsis
            }
            ('.', _) => TokenKind::Dot,

            (':', Some(':')) => { self.cursor.advance(); TokenKind::ColonColon }
            (':', _) => TokenKind::Colon,

            ('+', Some('+')) => { self.cursor.advance(); TokenKind::PlusPlus }
            ('+', Some('=')) => { self.cursor.advance(); TokenKind::PlusEqual }
            ('+', _) => TokenKind::Plus,

            ('-', Some('-')) => { self.cursor.advance(); TokenKind::MinusMinus }
            ('-', Some('=')) => { self.cursor.advance(); TokenKind::MinusEqual }
            ('-', _) => TokenKind::Minus,

            ('*', Some('=')) => { self.cursor.advance(); TokenKind::StarEqual }
            ('*', _) => TokenKind::Star,

            ('/', Some('=')) => { self.cursor.advance(); TokenKind::SlashEqual }
            ('/', _) => TokenKind::Slash,

            ('%', Some('=')) => { self.cursor.advance(); TokenKind::PercentEqual }
            ('%', _) => TokenKind::Percent,

            ('=', Some('=')) => { self.cursor.advance(); TokenKind::EqualEqual }
            ('=', _) => TokenKind::Equal,

            ('!', Some('=')) => { self.cursor.advance(); TokenKind::BangEqual }
            ('!', _) => TokenKind::Bang,

            ('<', Some('=')) => { self.cursor.advance(); TokenKind::LessEqual }
            ('<', Some('<')) => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    TokenKind::LessLessEqual
                } else {
                    TokenKind::LessLess
                }
            }
            ('<', _) => TokenKind::Less,

            ('>', Some('=')) => { self.cursor.advance(); TokenKind::GreaterEqual }
            ('>', Some('>')) => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    TokenKind::GreaterGreaterEqual
                } else {
                    TokenKind::GreaterGreater
                }
            }
            ('>', _) => TokenKind::Greater,

            ('&', Some('=')) => { self.cursor.advance(); TokenKind::AmpEqual }
            ('&', Some('&')) => { self.cursor.advance(); TokenKind::AmpAmp }
            ('&', _) => TokenKind::Amp,

            ('|', Some('=')) => { self.cursor.advance(); TokenKind::PipeEqual }
            ('|', Some('|')) => { self.cursor.advance(); TokenKind::PipePipe }
            ('|', _) => TokenKind::Pipe,

            ('^', Some('=')) => { self.cursor.advance(); TokenKind::CaretEqual }
            ('^', _) => TokenKind::Caret,

            // Unrecognized character
            _ => {
                return Err(ScanError::IllegalChar {
                    ch: c,
                    span: self.span_from(start),
                });
            }
        };

        Ok(self.make_token(kind, start))
    }

    // =========================================
    // Bracket nesting
    // =========================================

    fn check_nesting(&mut self, token: &Token<'ast>) -> Result<(), ScanError> {
        let closer = match token.kind {
            TokenKind::LeftParen => Some(')'),
            TokenKind::LeftBracket => Some(']'),
            TokenKind::LeftBrace => Some('}'),
            _ => None,
        };
        if let Some(closer) = closer {
            self.open_brackets.push(OpenBracket {
                opener: token.lexeme.chars().next().unwrap_or('('),
                closer,
                line: token.span.line,
                section: token.section,
            });
            return Ok(());
        }

        let found = match token.kind {
            TokenKind::RightParen => ')',
            TokenKind::RightBracket => ']',
            TokenKind::RightBrace => '}',
            _ => return Ok(()),
        };

        let Some(open) = self.open_brackets.pop() else {
            return Err(ScanError::UnmatchedCloser {
                closer: found,
                span: token.span,
            });
        };
        if open.closer == found {
            return Ok(());
        }

        let location = if open.section != token.section {
            format!("in {}, line {}", self.sections[open.section as usize], open.line)
        } else if open.line == token.span.line {
            "on this line".to_string()
        } else {
            format!("on line {}", open.line)
        };
        Err(ScanError::MismatchedCloser {
            closer: found,
            opener: open.opener,
            location,
            span: token.span,
        })
    }
}

/// Where the token being scanned started.
#[derive(Debug, Clone, Copy)]
struct Start {
    line: u32,
    col: u32,
    offset: u32,
}

/// Yields tokens up to (not including) EOF; a scan error is yielded once
/// and ends the iteration.
impl<'src, 'ast> Iterator for Scanner<'src, 'ast> {
    type Item = Result<Token<'ast>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => None,
            Ok(token) => Some(Ok(token)),
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to collect all tokens from source.
    fn tokenize(source: &str) -> Vec<(TokenKind, String)> {
        let arena = Bump::new();
        Scanner::new(source, &arena)
            .map(|t| t.expect("scan error"))
            .map(|t| (t.kind, t.lexeme.to_string()))
            .collect()
    }

    /// Helper to get token kinds only.
    fn token_kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        Scanner::new(source, &arena).map(|t| t.expect("scan error").kind).collect()
    }

    fn scan_error(source: &str) -> ScanError {
        let arena = Bump::new();
        Scanner::new(source, &arena)
            .find_map(|t| t.err())
            .expect("expected a scan error")
    }

    fn first_value(source: &str) -> TokenValue<'static> {
        let arena = Box::leak(Box::new(Bump::new()));
        let mut scanner = Scanner::new(source, arena);
        scanner.next_token().expect("scan error").value
    }

    // =========================================
    // Basic tokens
    // =========================================

    #[test]
    fn empty_source() {
        let arena = Bump::new();
        let mut scanner = Scanner::new("", &arena);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn whitespace_and_comments_only() {
        assert!(tokenize("  // line\n /* block\n comment */ \t\r\n").is_empty());
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            tokenize("managed struct Foo extends Bar"),
            vec![
                (TokenKind::Managed, "managed".to_string()),
                (TokenKind::Struct, "struct".to_string()),
                (TokenKind::Identifier, "Foo".to_string()),
                (TokenKind::Extends, "extends".to_string()),
                (TokenKind::Identifier, "Bar".to_string()),
            ]
        );
    }

    #[test]
    fn line_numbers() {
        let arena = Bump::new();
        let lines: Vec<u32> = Scanner::new("a\nb\n\nc", &arena).map(|t| t.unwrap().line()).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    // =========================================
    // Operators
    // =========================================

    #[test]
    fn compound_operators() {
        assert_eq!(
            token_kinds("<<= >>= << >> <= >= == != && || ++ -- :: ..."),
            vec![
                TokenKind::LessLessEqual,
                TokenKind::GreaterGreaterEqual,
                TokenKind::LessLess,
                TokenKind::GreaterGreater,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::ColonColon,
                TokenKind::Ellipsis,
            ]
        );
    }

    #[test]
    fn elvis_is_two_tokens() {
        assert_eq!(token_kinds("a ?: b"), vec![
            TokenKind::Identifier,
            TokenKind::Question,
            TokenKind::Colon,
            TokenKind::Identifier,
        ]);
    }

    #[test]
    fn two_dots_are_rejected() {
        assert!(matches!(scan_error("a..b"), ScanError::BadDots { .. }));
    }

    #[test]
    fn illegal_character() {
        let err = scan_error("int $x;");
        assert_eq!(err.to_string(), "The character '$' is not legal in this context");
    }

    // =========================================
    // Numbers
    // =========================================

    #[test]
    fn integer_literals() {
        assert_eq!(first_value("42"), TokenValue::Int(42));
        assert_eq!(first_value("2147483648"), TokenValue::Int(2_147_483_648));
    }

    #[test]
    fn integer_out_of_range_cites_text() {
        let err = scan_error("x = 2147483649;");
        assert_eq!(err.to_string(), "Numeric literal '2147483649' is out of range");
    }

    #[test]
    fn float_literal_forms() {
        for (text, expected) in [("7.", 7.0f32), (".77", 0.77), ("7E2", 700.0), ("7.e-7", 7e-7), ("007.e-07", 7e-7)] {
            assert_eq!(first_value(text), TokenValue::Float(OrderedFloat(expected)), "{}", text);
        }
    }

    #[test]
    fn float_out_of_range() {
        assert!(matches!(scan_error("1e39"), ScanError::NumberOutOfRange { .. }));
    }

    #[test]
    fn malformed_float() {
        assert!(matches!(scan_error("1e"), ScanError::MalformedNumber { .. }));
    }

    // =========================================
    // Char and string literals
    // =========================================

    #[test]
    fn char_literal_becomes_int() {
        let arena = Bump::new();
        let token = Scanner::new("'A'", &arena).next_token().unwrap();
        assert_eq!(token.kind, TokenKind::IntLiteral);
        assert_eq!(token.value, TokenValue::Int(65));
        assert_eq!(first_value("'\\n'"), TokenValue::Int(10));
        assert_eq!(first_value("'\\x41'"), TokenValue::Int(65));
        assert_eq!(first_value("'\\101'"), TokenValue::Int(65));
    }

    #[test]
    fn char_literal_errors() {
        assert!(matches!(scan_error("'"), ScanError::UnfinishedCharLiteral { .. }));
        assert!(matches!(scan_error("'\\[' "), ScanError::BracketEscapeInCharLiteral { .. }));
        assert!(matches!(scan_error("'a"), ScanError::MissingApostrophe { .. }));
        assert_eq!(scan_error("'ab'").to_string(), "Expected apostrophe, but found 'b' instead");
    }

    #[test]
    fn string_escapes() {
        assert_eq!(first_value(r#""a\tb""#), TokenValue::Str(b"a\tb"));
        assert_eq!(first_value(r#""x\[y""#), TokenValue::Str(b"x\\[y"));
        assert_eq!(first_value(r#""q\"q""#), TokenValue::Str(b"q\"q"));
    }

    #[test]
    fn string_errors() {
        assert!(matches!(scan_error("\"abc"), ScanError::UnterminatedString { .. }));
        assert!(matches!(scan_error("\"ab\ncd\""), ScanError::LineBreakInString { .. }));
        assert_eq!(
            scan_error(r#""\q""#).to_string(),
            "Found unknown escape sequence '\\q' in string."
        );
    }

    // =========================================
    // Sections
    // =========================================

    #[test]
    fn section_marker_resets_line() {
        let arena = Bump::new();
        let list = Scanner::new("a\nb\n\"__NEWSCRIPTSTART_room1\"\nc", &arena).scan_all().unwrap();
        let c = list.get(2);
        assert_eq!(c.lexeme, "c");
        assert_eq!(c.line(), 1);
        assert_eq!(list.section_name(c.section), "room1");
        assert_eq!(list.section_name(list.get(0).section), "");
    }

    #[test]
    fn scan_error_reports_section() {
        let arena = Bump::new();
        let err = Scanner::new("\"__NEWSCRIPTSTART_glob\"\n\n  @", &arena).scan_all().unwrap_err();
        assert_eq!(err.section, "glob");
        assert_eq!(err.line, 2);
        assert!(err.is_lexical());
    }

    // =========================================
    // Bracket nesting
    // =========================================

    #[test]
    fn unmatched_closer() {
        assert_eq!(
            scan_error("a )").to_string(),
            "There isn't any opening symbol that matches the closing ')'"
        );
    }

    #[test]
    fn mismatched_closer_same_line() {
        assert_eq!(
            scan_error("( ]").to_string(),
            "Found ']', this does not match the '(' on this line"
        );
    }

    #[test]
    fn mismatched_closer_other_line() {
        assert_eq!(
            scan_error("{\n\n ( ) ]").to_string(),
            "Found ']', this does not match the '{' on line 1"
        );
    }

    #[test]
    fn unclosed_opener_at_eof() {
        assert!(matches!(scan_error("{ ( )"), ScanError::UnclosedOpener { opener: '{', .. }));
    }
}
