//! Lexical analysis for AGS script.

mod cursor;
#[allow(clippy::module_inception)]
mod scanner;
mod token;
mod token_list;

pub use scanner::{INT_LITERAL_MAX, NEW_SECTION_PREFIX, Scanner};
pub use token::{Token, TokenKind, TokenValue, lookup_keyword};
pub use token_list::TokenList;
