//! AGS script scanner crate.
//!
//! This crate turns script source into the token list the compiler walks.
//! It includes:
//! - Token kinds for every keyword, operator and literal of the language
//! - Decoding of int, float, char and string literals, with range checks
//! - Section markers (`"__NEWSCRIPTSTART_name"`) that restart line counting
//! - Bracket matching, so unbalanced `()`, `[]` and `{}` fail early
//!
//! # Example
//!
//! ```
//! use agscript_parser::{Scanner, TokenKind};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let tokens = Scanner::new("int x = 'A';", &arena).scan_all().unwrap();
//! assert_eq!(tokens.get(0).kind, TokenKind::Int);
//! assert_eq!(tokens.len(), 6); // five tokens plus EOF
//! ```

pub mod scanner;

pub use scanner::{Scanner, Token, TokenKind, TokenList, TokenValue};
