//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::{lex, Token};
use crate::ParseError;

/// Parse a markup page: template declarations and initial host content
pub fn parse(input: &str) -> Result<Page, Vec<ParseError>> {
    let len = input.len();
    let tokens = tokenize(input)?
        .into_iter()
        .filter(|(t, _)| *t != Token::Whitespace);

    // Turn the token iterator into a stream that chumsky can use
    let token_stream =
        Stream::from_iter(tokens).map((len..len).into(), |(t, s): (_, _)| (t, s));

    page_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Parse markup content without template declarations (rich binding content)
pub fn parse_fragment(input: &str) -> Result<Vec<Spanned<MarkupNode>>, Vec<ParseError>> {
    let len = input.len();
    let tokens = tokenize(input)?
        .into_iter()
        .filter(|(t, _)| *t != Token::Whitespace);

    let token_stream =
        Stream::from_iter(tokens).map((len..len).into(), |(t, s): (_, _)| (t, s));

    markup_parser()
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Parse a structural query such as `.list > li#row1, .empty`
pub fn parse_query(input: &str) -> Result<Query, Vec<ParseError>> {
    let len = input.len();
    let tokens = normalize_query_whitespace(tokenize(input)?);

    let token_stream = Stream::from_iter(tokens.into_iter())
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    query_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Run the lexer, turning unrecognised characters into syntax errors
fn tokenize(input: &str) -> Result<Vec<(Token, SimpleSpan)>, Vec<ParseError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (tok, span) in lex(input) {
        match tok {
            Ok(tok) => tokens.push((tok, span.into())),
            Err(()) => errors.push(ParseError::Syntax {
                message: format!("Unexpected character '{}'", &input[span.clone()]),
                span,
                expected: vec![],
            }),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Keep whitespace only where it acts as the descendant combinator
fn normalize_query_whitespace(tokens: Vec<(Token, SimpleSpan)>) -> Vec<(Token, SimpleSpan)> {
    let mut out: Vec<(Token, SimpleSpan)> = Vec::with_capacity(tokens.len());
    let mut bracket_depth = 0usize;

    for (tok, span) in tokens {
        match tok {
            Token::Whitespace => {
                let after_separator = matches!(
                    out.last(),
                    None | Some((Token::Greater | Token::Comma | Token::Whitespace, _))
                );
                if bracket_depth > 0 || after_separator {
                    continue;
                }
            }
            Token::Greater | Token::Comma => {
                if matches!(out.last(), Some((Token::Whitespace, _))) {
                    out.pop();
                }
            }
            Token::BracketOpen => bracket_depth += 1,
            Token::BracketClose => bracket_depth = bracket_depth.saturating_sub(1),
            _ => {}
        }
        out.push((tok, span));
    }

    if matches!(out.last(), Some((Token::Whitespace, _))) {
        out.pop();
    }
    out
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn markup_parser<'a, I>(
) -> impl Parser<'a, I, Spanned<MarkupNode>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let string_literal = select! {
        Token::String(s) => s,
    };

    let attribute_value = select! {
        Token::String(s) => s,
        Token::Ident(s) => s,
        Token::Number(n) => n,
    };

    // `[name: value, flag]`
    let attribute = identifier
        .clone()
        .then(just(Token::Colon).ignore_then(attribute_value).or_not())
        .map_with(|(name, value), e| {
            Spanned::new(AttributeDecl { name, value }, span_range(&e.span()))
        });

    let attribute_block = attribute
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    recursive(|node| {
        let element = identifier
            .clone()
            .then(just(Token::Hash).ignore_then(identifier.clone()).or_not())
            .then(
                just(Token::Dot)
                    .ignore_then(identifier.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then(attribute_block.or_not())
            .then(
                node.repeated()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
                    .or_not(),
            )
            .map(|((((tag, id), classes), attributes), children)| {
                MarkupNode::Element(ElementDecl {
                    tag,
                    id,
                    classes,
                    attributes: attributes.unwrap_or_default(),
                    children: children.unwrap_or_default(),
                })
            });

        let text = string_literal.map(MarkupNode::Text);

        choice((element, text))
            .map_with(|n, e| Spanned::new(n, span_range(&e.span())))
            .boxed()
    })
}

fn page_parser<'a, I>() -> impl Parser<'a, I, Page, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let string_literal = select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let node = markup_parser();

    // `template "name" from "path"` or `template "name" { body }`
    let template_decl = just(Token::Template)
        .ignore_then(string_literal.clone())
        .then(choice((
            just(Token::From)
                .ignore_then(string_literal)
                .map(|path| (TemplateSource::File, Some(path), None)),
            node.clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
                .map(|body| (TemplateSource::Inline, None, Some(body))),
        )))
        .map(|(name, (source, path, body))| TemplateDecl {
            name: Spanned::new(Identifier::new(name.node), name.span),
            source,
            path,
            body,
        })
        .map_with(|decl, e| Spanned::new(Statement::Template(decl), span_range(&e.span())));

    let statement = choice((
        template_decl,
        node.map(|n| Spanned::new(Statement::Node(n.node), n.span)),
    ));

    statement
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|statements| Page { statements })
}

fn query_parser<'a, I>() -> impl Parser<'a, I, Query, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Ident(s) => Identifier::new(s),
    };

    let attribute_value = select! {
        Token::Ident(s) => s,
        Token::String(s) => s,
        Token::Number(n) => n,
    };

    let attribute = name
        .clone()
        .then(just(Token::Equals).ignore_then(attribute_value).or_not())
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
        .map(|(name, value)| SimpleSelector::Attribute(AttributeMatcher { name, value }));

    let simple = choice((
        just(Token::Hash)
            .ignore_then(name.clone())
            .map(SimpleSelector::Id),
        just(Token::Dot)
            .ignore_then(name.clone())
            .map(SimpleSelector::Class),
        attribute,
    ));

    let tag = choice((
        just(Token::Star).to(TagMatch::Any),
        name.map(TagMatch::Name),
    ));

    let compound = choice((
        tag.then(simple.clone().repeated().collect::<Vec<_>>())
            .map(|(tag, parts)| fold_compound(Some(tag), parts)),
        simple
            .repeated()
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|parts| fold_compound(None, parts)),
    ));

    let combinator = choice((
        just(Token::Greater).to(Combinator::Child),
        just(Token::Whitespace).to(Combinator::Descendant),
    ));

    let selector = compound
        .clone()
        .then(combinator.then(compound).repeated().collect::<Vec<_>>())
        .map(|(head, tail)| Selector { head, tail });

    selector
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|selectors| Query { selectors })
}

fn fold_compound(tag: Option<TagMatch>, parts: Vec<SimpleSelector>) -> Compound {
    let mut compound = Compound {
        tag,
        ..Compound::default()
    };
    for part in parts {
        match part {
            SimpleSelector::Id(id) => compound.ids.push(id),
            SimpleSelector::Class(class) => compound.classes.push(class),
            SimpleSelector::Attribute(attr) => compound.attributes.push(attr),
        }
    }
    compound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Spanned<MarkupNode>) -> &ElementDecl {
        match &node.node {
            MarkupNode::Element(e) => e,
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_bare_element() {
        let page = parse("ul").expect("Should parse");
        assert_eq!(page.statements.len(), 1);
        match &page.statements[0].node {
            Statement::Node(MarkupNode::Element(e)) => {
                assert_eq!(e.tag.node.as_str(), "ul");
                assert!(e.id.is_none());
                assert!(e.classes.is_empty());
                assert!(e.children.is_empty());
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_element_with_id_classes_and_attributes() {
        let page = parse(r#"li#row1.row.row--expanded [data-kind: "income", hidden, colspan: 2]"#)
            .expect("Should parse");
        match &page.statements[0].node {
            Statement::Node(MarkupNode::Element(e)) => {
                assert_eq!(e.id.as_ref().unwrap().node.as_str(), "row1");
                let classes: Vec<_> = e.classes.iter().map(|c| c.node.as_str()).collect();
                assert_eq!(classes, vec!["row", "row--expanded"]);
                assert_eq!(e.attributes.len(), 3);
                assert_eq!(e.attributes[0].node.value.as_deref(), Some("income"));
                assert_eq!(e.attributes[1].node.value, None);
                assert_eq!(e.attributes[2].node.value.as_deref(), Some("2"));
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_nested_children_and_text() {
        let page = parse(r#"div.card { span.name { "Alice" } "loose text" }"#).expect("Should parse");
        match &page.statements[0].node {
            Statement::Node(MarkupNode::Element(e)) => {
                assert_eq!(e.children.len(), 2);
                let span = element(&e.children[0]);
                assert_eq!(span.children[0].node, MarkupNode::Text("Alice".to_string()));
                assert_eq!(e.children[1].node, MarkupNode::Text("loose text".to_string()));
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_inline_template() {
        let input = r#"
            template "row-tpl" {
                li.row {
                    span.name
                }
            }
            ul.list
        "#;
        let page = parse(input).expect("Should parse");
        assert_eq!(page.statements.len(), 2);
        let templates: Vec<_> = page.templates().collect();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name.node.as_str(), "row-tpl");
        assert_eq!(templates[0].source, TemplateSource::Inline);
        assert_eq!(templates[0].body.as_ref().unwrap().len(), 1);
        assert_eq!(page.content().len(), 1);
    }

    #[test]
    fn test_parse_file_template() {
        let page = parse(r#"template "dialog" from "dialog.view""#).expect("Should parse");
        let decl = page.templates().next().unwrap();
        assert_eq!(decl.source, TemplateSource::File);
        assert_eq!(decl.path.as_ref().unwrap().node, "dialog.view");
        assert!(decl.body.is_none());
    }

    #[test]
    fn test_parse_reserved_keyword_as_tag() {
        let errors = parse("from").unwrap_err();
        assert!(errors[0].to_string().contains("reserved keyword"));
    }

    #[test]
    fn test_parse_unbalanced_braces() {
        assert!(parse("div { span").is_err());
    }

    #[test]
    fn test_parse_unknown_character() {
        let errors = parse("div ~ span").unwrap_err();
        assert!(errors[0].to_string().contains("Unexpected character '~'"));
    }

    #[test]
    fn test_parse_fragment() {
        let nodes = parse_fragment(r#"b { "bold" } " tail""#).expect("Should parse");
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].node.is_element());
    }

    #[test]
    fn test_parse_fragment_rejects_templates() {
        assert!(parse_fragment(r#"template "x" { div }"#).is_err());
    }

    #[test]
    fn test_parse_query_compound() {
        let query = parse_query("li#row1.row[data-kind=income]").expect("Should parse");
        assert_eq!(query.selectors.len(), 1);
        let compound = &query.selectors[0].head;
        assert_eq!(compound.tag, Some(TagMatch::Name(Identifier::new("li"))));
        assert_eq!(compound.ids, vec![Identifier::new("row1")]);
        assert_eq!(compound.classes, vec![Identifier::new("row")]);
        assert_eq!(compound.attributes[0].value.as_deref(), Some("income"));
    }

    #[test]
    fn test_parse_query_combinators() {
        let query = parse_query("  .modal  button[ type = submit ] > span ").expect("Should parse");
        let selector = &query.selectors[0];
        assert_eq!(selector.tail.len(), 2);
        assert_eq!(selector.tail[0].0, Combinator::Descendant);
        assert_eq!(selector.tail[1].0, Combinator::Child);
        assert_eq!(
            selector.subject().tag,
            Some(TagMatch::Name(Identifier::new("span")))
        );
        assert_eq!(selector.tail[0].1.attributes[0].value.as_deref(), Some("submit"));
    }

    #[test]
    fn test_parse_query_group() {
        let query = parse_query(".a , .b,*").expect("Should parse");
        assert_eq!(query.selectors.len(), 3);
        assert_eq!(query.selectors[2].head.tag, Some(TagMatch::Any));
    }

    #[test]
    fn test_parse_query_rejects_garbage() {
        assert!(parse_query("").is_err());
        assert!(parse_query(".").is_err());
        assert!(parse_query("a >").is_err());
        assert!(parse_query("{ }").is_err());
    }
}
