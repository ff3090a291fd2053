//! The scanned token sequence the parser walks over.

use super::token::{Token, TokenKind};

/// All tokens of one compilation, terminated by a single EOF token.
///
/// The parser moves over the list with an index rather than consuming it,
/// so a stretch of tokens can be visited more than once (call arguments are
/// compiled last-to-first by jumping back and forth).
#[derive(Debug, Clone)]
pub struct TokenList<'ast> {
    tokens: Vec<Token<'ast>>,
    sections: Vec<String>,
}

impl<'ast> TokenList<'ast> {
    /// Build a list. An EOF token is appended if `tokens` lacks one.
    pub fn new(mut tokens: Vec<Token<'ast>>, sections: Vec<String>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let (span, section) = tokens.last().map(|t| (t.span, t.section)).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span, section));
        }
        let sections = if sections.is_empty() { vec![String::new()] } else { sections };
        Self { tokens, sections }
    }

    /// Number of tokens including the final EOF.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }

    /// The token at `idx`; positions past the end yield the EOF token.
    pub fn get(&self, idx: usize) -> Token<'ast> {
        let last = self.tokens.len() - 1;
        self.tokens[idx.min(last)]
    }

    pub fn tokens(&self) -> &[Token<'ast>] {
        &self.tokens
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn section_name(&self, section: u16) -> &str {
        self.sections.get(section as usize).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agscript_core::Span;

    #[test]
    fn eof_is_appended_and_sticky() {
        let list = TokenList::new(vec![Token::new(TokenKind::Identifier, "a", Span::new(1, 1, 1), 0)], vec![]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).kind, TokenKind::Eof);
        assert_eq!(list.get(99).kind, TokenKind::Eof);
        assert!(!list.is_empty());
        assert_eq!(list.section_name(0), "");
        assert_eq!(list.section_name(7), "");
    }

    #[test]
    fn empty_list_has_only_eof() {
        let list = TokenList::new(Vec::new(), vec!["main".to_string()]);
        assert!(list.is_empty());
        assert_eq!(list.get(0).kind, TokenKind::Eof);
        assert_eq!(list.section_name(0), "main");
    }
}
