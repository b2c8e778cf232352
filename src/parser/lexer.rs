//! Lexer shared by the markup language and the structural query language

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Template keywords
    #[token("template")]
    Template,
    #[token("from")]
    From,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // Selector punctuation
    #[token(".")]
    Dot,
    #[token("#")]
    Hash,
    #[token(">")]
    Greater,
    #[token("=")]
    Equals,
    #[token("*")]
    Star,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    String(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    // Significant only in queries, where it is the descendant combinator
    #[regex(r"[ \t\n\r]+")]
    Whitespace,

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

/// Tokenize input. Unrecognised characters come back as `Err(())` with their span.
pub fn lex(input: &str) -> impl Iterator<Item = (Result<Token, ()>, Span)> + '_ {
    Token::lexer(input).spanned()
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input)
            .filter_map(|(tok, _)| tok.ok())
            .filter(|t| *t != Token::Whitespace)
            .collect()
    }

    #[test]
    fn test_template_keywords() {
        assert_eq!(
            tokens(r#"template "row" from "row.view""#),
            vec![
                Token::Template,
                Token::String("row".to_string()),
                Token::From,
                Token::String("row.view".to_string()),
            ]
        );
    }

    #[test]
    fn test_hyphenated_identifiers() {
        assert_eq!(
            tokens("div.list-container"),
            vec![
                Token::Ident("div".to_string()),
                Token::Dot,
                Token::Ident("list-container".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            tokens("templates fromage"),
            vec![
                Token::Ident("templates".to_string()),
                Token::Ident("fromage".to_string()),
            ]
        );
    }

    #[test]
    fn test_selector_punctuation() {
        assert_eq!(
            tokens("ul > li#row-1[data-kind=income], *"),
            vec![
                Token::Ident("ul".to_string()),
                Token::Greater,
                Token::Ident("li".to_string()),
                Token::Hash,
                Token::Ident("row-1".to_string()),
                Token::BracketOpen,
                Token::Ident("data-kind".to_string()),
                Token::Equals,
                Token::Ident("income".to_string()),
                Token::BracketClose,
                Token::Comma,
                Token::Star,
            ]
        );
    }

    #[test]
    fn test_whitespace_is_a_token() {
        let raw: Vec<_> = lex(".a .b").filter_map(|(t, _)| t.ok()).collect();
        assert_eq!(raw[2], Token::Whitespace);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""say \"hi\"\n""#),
            vec![Token::String("say \"hi\"\n".to_string())]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("12 3.50"),
            vec![Token::Number("12".to_string()), Token::Number("3.50".to_string())]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("ul // trailing\n/* block */ li"),
            vec![Token::Ident("ul".to_string()), Token::Ident("li".to_string())]
        );
    }

    #[test]
    fn test_unknown_character_is_error() {
        let errors: Vec<_> = lex("a ~ b").filter(|(t, _)| t.is_err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1, 2..3);
    }
}
