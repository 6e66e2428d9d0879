//! Lexer implementation.

use logos::Logos;

#[derive(Debug, Copy, Clone, Logos, PartialEq)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*)")]
pub enum Token<'source> {
    #[token("@terminal")]
    KwTerminal,

    #[token("@nonterminal")]
    KwNonterminal,

    #[token("@start")]
    KwStart,

    #[token("@rule")]
    KwRule,

    #[token("@empty")]
    KwEmpty,

    #[token(":=")]
    ColonEq,

    #[token("|")]
    VertBar,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[regex(r"[A-Za-z_][A-Za-z0-9_']*")]
    Ident(&'source str),

    /// A quoted terminal symbol, without the quotes.
    #[regex(r"'[^' \t\r\n]+'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Literal(&'source str),
}

/// A token with the line number where it starts.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lexeme<'source> {
    pub token: Token<'source>,
    pub line: usize,
}

/// Split the source into tokens.
///
/// Returns the line number of the first unrecognized character on failure.
pub fn tokenize(source: &str) -> Result<Vec<Lexeme<'_>>, usize> {
    let mut lexemes = vec![];
    let mut line = 1;
    let mut offset = 0;
    for (token, span) in Token::lexer(source).spanned() {
        line += source[offset..span.start].matches('\n').count();
        offset = span.start;
        match token {
            Ok(token) => lexemes.push(Lexeme { token, line }),
            Err(()) => return Err(line),
        }
    }
    Ok(lexemes)
}
