//! Token types and definitions for the AGS script scanner.

use agscript_core::Span;
use ordered_float::OrderedFloat;
use std::fmt;

/// A token from the source code.
///
/// The `'ast` lifetime refers to the arena where the lexeme and any decoded
/// string literal are allocated, so the source text can be dropped once
/// scanning has finished.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token (allocated in arena).
    pub lexeme: &'ast str,
    /// Literal value, if the token is a literal.
    pub value: TokenValue<'ast>,
    /// Location in source.
    pub span: Span,
    /// Index into [`TokenList::sections`](super::TokenList::sections).
    pub section: u16,
}

impl<'ast> Token<'ast> {
    /// Create a new token without a literal value.
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span, section: u16) -> Self {
        Self {
            kind,
            lexeme,
            value: TokenValue::None,
            span,
            section,
        }
    }

    #[inline]
    pub fn with_value(mut self, value: TokenValue<'ast>) -> Self {
        self.value = value;
        self
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.span.line
    }

    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// The decoded value of a literal token.
///
/// Char literals are delivered as [`TokenValue::Int`]; string literals as
/// the raw bytes after escape processing (the pool is byte-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenValue<'ast> {
    #[default]
    None,
    /// Magnitude of an integer literal. May be 2147483648, which only fits
    /// when negated; the parser checks that.
    Int(i64),
    Float(OrderedFloat<f32>),
    Str(&'ast [u8]),
}

/// All token types of the AGS script language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Integer literal: `42`, or a char literal `'A'`
    IntLiteral,
    /// Float literal: `3.14`, `7E2`, `.5`
    FloatLiteral,
    /// String literal: `"hello"`
    StringLiteral,

    // =========================================
    // Identifiers
    // =========================================
    /// User-defined identifier
    Identifier,

    // =========================================
    // Keywords - Types
    // =========================================
    /// `void`
    Void,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `string` (legacy fixed-buffer string)
    String,

    // =========================================
    // Keywords - Values
    // =========================================
    /// `null`
    Null,
    /// `this`
    This,

    // =========================================
    // Keywords - Control Flow
    // =========================================
    /// `if`
    If,
    /// `else`
    Else,
    /// `for`
    For,
    /// `while`
    While,
    /// `do`
    Do,
    /// `switch`
    Switch,
    /// `case`
    Case,
    /// `default`
    Default,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return`
    Return,
    /// `fallthrough`
    Fallthrough,

    // =========================================
    // Keywords - Declarations and qualifiers
    // =========================================
    /// `struct`
    Struct,
    /// `enum`
    Enum,
    /// `extends`
    Extends,
    /// `attribute`
    Attribute,
    /// `managed`
    Managed,
    /// `builtin`
    Builtin,
    /// `autoptr`
    Autoptr,
    /// `internalstring`
    Internalstring,
    /// `const`
    Const,
    /// `readonly`
    Readonly,
    /// `protected`
    Protected,
    /// `writeprotected`
    Writeprotected,
    /// `static`
    Static,
    /// `import`
    Import,
    /// `_tryimport`
    TryImport,
    /// `export`
    Export,
    /// `noloopcheck`
    Noloopcheck,
    /// `new`
    New,

    // =========================================
    // Operators - Arithmetic
    // =========================================
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,

    // =========================================
    // Operators - Bitwise
    // =========================================
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `<<`
    LessLess,
    /// `>>`
    GreaterGreater,

    // =========================================
    // Operators - Logical and comparison
    // =========================================
    /// `!`
    Bang,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // =========================================
    // Operators - Assignment
    // =========================================
    /// `=`
    Equal,
    /// `+=`
    PlusEqual,
    /// `-=`
    MinusEqual,
    /// `*=`
    StarEqual,
    /// `/=`
    SlashEqual,
    /// `%=`
    PercentEqual,
    /// `&=`
    AmpEqual,
    /// `|=`
    PipeEqual,
    /// `^=`
    CaretEqual,
    /// `<<=`
    LessLessEqual,
    /// `>>=`
    GreaterGreaterEqual,

    // =========================================
    // Punctuation
    // =========================================
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `::`
    ColonColon,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Check if this token kind is a keyword.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Void | Char
                | Short
                | Int
                | Long
                | Float
                | String
                | Null
                | This
                | If
                | Else
                | For
                | While
                | Do
                | Switch
                | Case
                | Default
                | Break
                | Continue
                | Return
                | Fallthrough
                | Struct
                | Enum
                | Extends
                | Attribute
                | Managed
                | Builtin
                | Autoptr
                | Internalstring
                | Const
                | Readonly
                | Protected
                | Writeprotected
                | Static
                | Import
                | TryImport
                | Export
                | Noloopcheck
                | New
        )
    }

    /// Check if this token kind is a literal.
    pub fn is_literal(self) -> bool {
        matches!(self, TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral)
    }

    /// Built-in type keywords.
    pub fn is_primitive_type(self) -> bool {
        use TokenKind::*;
        matches!(self, Void | Char | Short | Int | Long | Float | String)
    }

    /// Assignment operators, including compound ones.
    pub fn is_assignment(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal
                | PlusEqual
                | MinusEqual
                | StarEqual
                | SlashEqual
                | PercentEqual
                | AmpEqual
                | PipeEqual
                | CaretEqual
                | LessLessEqual
                | GreaterGreaterEqual
        )
    }

    /// The fixed spelling of this token kind, or a description for
    /// token kinds that carry variable text.
    pub fn text(self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral => "integer literal",
            FloatLiteral => "float literal",
            StringLiteral => "string literal",
            Identifier => "identifier",
            Void => "void",
            Char => "char",
            Short => "short",
            Int => "int",
            Long => "long",
            Float => "float",
            String => "string",
            Null => "null",
            This => "this",
            If => "if",
            Else => "else",
            For => "for",
            While => "while",
            Do => "do",
            Switch => "switch",
            Case => "case",
            Default => "default",
            Break => "break",
            Continue => "continue",
            Return => "return",
            Fallthrough => "fallthrough",
            Struct => "struct",
            Enum => "enum",
            Extends => "extends",
            Attribute => "attribute",
            Managed => "managed",
            Builtin => "builtin",
            Autoptr => "autoptr",
            Internalstring => "internalstring",
            Const => "const",
            Readonly => "readonly",
            Protected => "protected",
            Writeprotected => "writeprotected",
            Static => "static",
            Import => "import",
            TryImport => "_tryimport",
            Export => "export",
            Noloopcheck => "noloopcheck",
            New => "new",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            PlusPlus => "++",
            MinusMinus => "--",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            LessLess => "<<",
            GreaterGreater => ">>",
            Bang => "!",
            AmpAmp => "&&",
            PipePipe => "||",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Equal => "=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            PercentEqual => "%=",
            AmpEqual => "&=",
            PipeEqual => "|=",
            CaretEqual => "^=",
            LessLessEqual => "<<=",
            GreaterGreaterEqual => ">>=",
            Question => "?",
            Colon => ":",
            ColonColon => "::",
            Dot => ".",
            Ellipsis => "...",
            Comma => ",",
            Semicolon => ";",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Map a keyword string to its [`TokenKind`], or `None` if not a keyword.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        // Types
        "void" => Void,
        "char" => Char,
        "short" => Short,
        "int" => Int,
        "long" => Long,
        "float" => Float,
        "string" => String,

        // Values
        "null" => Null,
        "this" => This,

        // Control flow
        "if" => If,
        "else" => Else,
        "for" => For,
        "while" => While,
        "do" => Do,
        "switch" => Switch,
        "case" => Case,
        "default" => Default,
        "break" => Break,
        "continue" => Continue,
        "return" => Return,
        "fallthrough" => Fallthrough,

        // Declarations
        "struct" => Struct,
        "enum" => Enum,
        "extends" => Extends,
        "attribute" => Attribute,
        "managed" => Managed,
        "builtin" => Builtin,
        "autoptr" => Autoptr,
        "internalstring" => Internalstring,
        "const" => Const,
        "readonly" => Readonly,
        "protected" => Protected,
        "writeprotected" => Writeprotected,
        "static" => Static,
        "import" => Import,
        "_tryimport" => TryImport,
        "export" => Export,
        "noloopcheck" => Noloopcheck,
        "new" => New,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(lookup_keyword("if"), Some(TokenKind::If));
        assert_eq!(lookup_keyword("_tryimport"), Some(TokenKind::TryImport));
        assert_eq!(lookup_keyword("writeprotected"), Some(TokenKind::Writeprotected));
        assert_eq!(lookup_keyword("bool"), None);
        assert_eq!(lookup_keyword("String"), None);
    }

    #[test]
    fn token_categories() {
        assert!(TokenKind::Managed.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
        assert!(TokenKind::StringLiteral.is_literal());
        assert!(TokenKind::Short.is_primitive_type());
        assert!(!TokenKind::Struct.is_primitive_type());
        assert!(TokenKind::LessLessEqual.is_assignment());
        assert!(!TokenKind::EqualEqual.is_assignment());
    }

    #[test]
    fn keyword_text_round_trips() {
        for kind in [TokenKind::Attribute, TokenKind::Noloopcheck, TokenKind::New, TokenKind::Fallthrough] {
            assert_eq!(lookup_keyword(kind.text()), Some(kind));
        }
    }

    #[test]
    fn token_new() {
        let token = Token::new(TokenKind::Identifier, "foo", Span::new(1, 1, 3), 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.lexeme, "foo");
        assert_eq!(token.value, TokenValue::None);
        assert_eq!(token.line(), 1);
    }

    #[test]
    fn token_debug_format() {
        let token = Token::new(TokenKind::Identifier, "test", Span::new(1, 5, 4), 0);
        assert_eq!(format!("{:?}", token), "Identifier(\"test\" @ 1:5)");
    }

    #[test]
    fn display_uses_spelling() {
        assert_eq!(TokenKind::GreaterGreaterEqual.to_string(), ">>=");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }
}
