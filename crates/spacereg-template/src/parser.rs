//! Template parser
//!
//! Grammar of an action between `{{` and `}}`:
//!
//! ```text
//! pipeline := command ('|' command)*
//! command  := operand | function operand*
//! operand  := string | integer | variable | '(' pipeline ')'
//! ```
//!
//! A pipe passes the value on its left as the last argument of the call on
//! its right. Every function name, variable path, arity and argument type is
//! checked here, so rendering can only fail on absent data.

use crate::error::TemplateError;
use crate::function::{Function, Value, ValueType};
use crate::variable::Variable;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Piece of a compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    Action(Expr),
}

/// Typed expression tree of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Var(Variable),
    Lit(Value),
    Call { func: Function, args: Vec<Expr> },
}

impl Expr {
    fn value_type(&self) -> ValueType {
        match self {
            Self::Lit(Value::Int(_)) => ValueType::Int,
            Self::Var(_) | Self::Lit(Value::Str(_)) | Self::Call { .. } => ValueType::Str,
        }
    }

    pub(crate) fn visit_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Self::Var(v) => out.push(*v),
            Self::Lit(_) => {}
            Self::Call { args, .. } => args.iter().for_each(|a| a.visit_variables(out)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Pipe,
    LParen,
    RParen,
    Close,
    End,
}

/// Split template source into text and parsed actions
pub(crate) fn parse(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = source[cursor..].find(OPEN) {
        let open = cursor + offset;
        if open > cursor {
            segments.push(Segment::Text(source[cursor..open].to_string()));
        }
        let mut parser = ActionParser {
            src: source,
            pos: open + OPEN.len(),
            depth: 0,
        };
        let expr = parser.parse_pipeline()?;
        parser.expect_close(open)?;
        segments.push(Segment::Action(expr));
        cursor = parser.pos;
    }
    if cursor < source.len() {
        segments.push(Segment::Text(source[cursor..].to_string()));
    }
    Ok(segments)
}

/// Deepest `(` nesting accepted inside one action
const MAX_NESTING: usize = 32;

struct ActionParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl ActionParser<'_> {
    fn skip_whitespace(&mut self) {
        let remaining = self.src[self.pos..].trim_start().len();
        self.pos = self.src.len() - remaining;
    }

    fn next_token(&mut self) -> Result<(usize, Token), TemplateError> {
        self.skip_whitespace();
        let start = self.pos;
        let src = self.src;
        let rest = &src[start..];
        let Some(c) = rest.chars().next() else {
            return Ok((start, Token::End));
        };
        if rest.starts_with(CLOSE) {
            self.pos += CLOSE.len();
            return Ok((start, Token::Close));
        }
        let token = match c {
            '|' => {
                self.pos += 1;
                Token::Pipe
            }
            '(' => {
                self.pos += 1;
                Token::LParen
            }
            ')' => {
                self.pos += 1;
                Token::RParen
            }
            '"' => Token::Str(self.lex_string(start)?),
            '-' | '0'..='9' => Token::Int(self.lex_int(start)?),
            c if is_ident_char(c) => {
                let len = rest
                    .find(|ch: char| !is_ident_char(ch))
                    .unwrap_or(rest.len());
                self.pos += len;
                Token::Ident(self.src[start..self.pos].to_string())
            }
            other => {
                return Err(TemplateError::parse(
                    start,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        Ok((start, token))
    }

    fn peek_token(&mut self) -> Result<Token, TemplateError> {
        let saved = self.pos;
        let (_, token) = self.next_token()?;
        self.pos = saved;
        Ok(token)
    }

    fn lex_string(&mut self, start: usize) -> Result<String, TemplateError> {
        let src = self.src;
        let mut out = String::new();
        let mut chars = src[self.pos..].char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, esc @ ('"' | '\\'))) => out.push(esc),
                    Some((j, other)) => {
                        return Err(TemplateError::parse(
                            start + j,
                            format!("unknown escape '\\{other}'"),
                        ))
                    }
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(TemplateError::parse(start, "unterminated string literal"))
    }

    fn lex_int(&mut self, start: usize) -> Result<i64, TemplateError> {
        let src = self.src;
        let rest = &src[self.pos..];
        let digits_from = usize::from(rest.starts_with('-'));
        let len = rest[digits_from..]
            .find(|ch: char| !ch.is_ascii_digit())
            .map_or(rest.len(), |n| n + digits_from);
        if len == digits_from {
            return Err(TemplateError::parse(start, "expected digits after '-'"));
        }
        let text = &rest[..len];
        let value = text
            .parse::<i64>()
            .map_err(|e| TemplateError::parse(start, format!("invalid integer '{text}': {e}")))?;
        self.pos += len;
        Ok(value)
    }

    fn expect_close(&mut self, open: usize) -> Result<(), TemplateError> {
        match self.next_token()? {
            (_, Token::Close) => Ok(()),
            (_, Token::End) => Err(TemplateError::parse(open, "unclosed action")),
            (pos, token) => Err(TemplateError::parse(
                pos,
                format!("expected '}}}}', found {token:?}"),
            )),
        }
    }

    fn parse_pipeline(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.parse_command(None)?;
        while self.peek_token()? == Token::Pipe {
            self.next_token()?;
            expr = self.parse_command(Some(expr))?;
        }
        Ok(expr)
    }

    fn parse_command(&mut self, piped: Option<Expr>) -> Result<Expr, TemplateError> {
        let (pos, token) = self.next_token()?;
        if let Token::Ident(name) = &token {
            if !Variable::looks_like_variable(name) {
                let func =
                    Function::from_name(name).ok_or_else(|| TemplateError::UnknownFunction {
                        name: name.clone(),
                        position: pos,
                    })?;
                let mut args = Vec::new();
                while !ends_command(&self.peek_token()?) {
                    args.push(self.parse_operand()?);
                }
                args.extend(piped);
                check_call(func, &args)?;
                return Ok(Expr::Call { func, args });
            }
        }
        if piped.is_some() {
            return Err(TemplateError::parse(
                pos,
                "pipeline stage must be a function call",
            ));
        }
        let expr = self.operand_from(pos, token)?;
        if !ends_command(&self.peek_token()?) {
            return Err(TemplateError::parse(
                self.pos,
                "unexpected argument after operand",
            ));
        }
        Ok(expr)
    }

    fn parse_operand(&mut self) -> Result<Expr, TemplateError> {
        let (pos, token) = self.next_token()?;
        self.operand_from(pos, token)
    }

    fn operand_from(&mut self, pos: usize, token: Token) -> Result<Expr, TemplateError> {
        match token {
            Token::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Token::Int(i) => Ok(Expr::Lit(Value::Int(i))),
            Token::Ident(name) if Variable::looks_like_variable(&name) => Variable::parse(&name)
                .map(Expr::Var)
                .ok_or(TemplateError::UnknownVariable {
                    path: name,
                    position: pos,
                }),
            Token::Ident(name) => match Function::from_name(&name) {
                Some(func) => Err(TemplateError::Arity {
                    name: func.name(),
                    expected: func.params().len(),
                    actual: 0,
                }),
                None => Err(TemplateError::UnknownFunction {
                    name,
                    position: pos,
                }),
            },
            Token::LParen => {
                if self.depth >= MAX_NESTING {
                    return Err(TemplateError::parse(pos, "parentheses nested too deeply"));
                }
                self.depth += 1;
                let expr = self.parse_pipeline()?;
                self.depth -= 1;
                match self.next_token()? {
                    (_, Token::RParen) => Ok(expr),
                    (close_pos, _) => Err(TemplateError::parse(close_pos, "expected ')'")),
                }
            }
            Token::Close | Token::End => Err(TemplateError::parse(pos, "empty action")),
            Token::Pipe | Token::RParen => Err(TemplateError::parse(pos, "expected operand")),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn ends_command(token: &Token) -> bool {
    matches!(
        token,
        Token::Pipe | Token::RParen | Token::Close | Token::End
    )
}

fn check_call(func: Function, args: &[Expr]) -> Result<(), TemplateError> {
    let params = func.params();
    if args.len() != params.len() {
        return Err(TemplateError::Arity {
            name: func.name(),
            expected: params.len(),
            actual: args.len(),
        });
    }
    for (index, (arg, expected)) in args.iter().zip(params).enumerate() {
        let actual = arg.value_type();
        if actual != *expected {
            return Err(TemplateError::Type {
                name: func.name(),
                index,
                expected: expected.name(),
                actual: actual.name(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{SpaceField, UserField};
    use assert_matches::assert_matches;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse("/projects").unwrap(),
            vec![Segment::Text("/projects".into())]
        );
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn test_variable_action() {
        let segments = parse("/projects/{{ .Space.Name }}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("/projects/".into()),
                Segment::Action(Expr::Var(Variable::Space(SpaceField::Name))),
            ]
        );
    }

    #[test]
    fn test_pipe_appends_last_argument() {
        let segments = parse("{{ Space.Owner.Username | substr 0 1 }}").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Action(Expr::Call {
                func: Function::Substr,
                args: vec![
                    Expr::Lit(Value::Int(0)),
                    Expr::Lit(Value::Int(1)),
                    Expr::Var(Variable::Space(SpaceField::Owner(UserField::Username))),
                ],
            })]
        );
    }

    #[test]
    fn test_parenthesized_argument() {
        let segments = parse(r#"{{ replace " " "_" (lower Space.Name) }}"#).unwrap();
        assert_matches!(
            &segments[0],
            Segment::Action(Expr::Call { func: Function::Replace, args }) if args.len() == 3
        );
    }

    #[test]
    fn test_string_escapes() {
        let segments = parse(r#"{{ default "a\"b" Space.Name }}"#).unwrap();
        assert_matches!(
            &segments[0],
            Segment::Action(Expr::Call { args, .. })
                if args[0] == Expr::Lit(Value::Str("a\"b".into()))
        );
    }

    #[test]
    fn test_unknown_function_rejected() {
        assert_matches!(
            parse("{{ exec \"rm\" }}"),
            Err(TemplateError::UnknownFunction { name, position: 3 }) if name == "exec"
        );
    }

    #[test]
    fn test_unknown_variable_rejected() {
        assert_matches!(
            parse("{{ .Space.Quota }}"),
            Err(TemplateError::UnknownVariable { path, .. }) if path == ".Space.Quota"
        );
    }

    #[test]
    fn test_arity_and_types_checked() {
        assert_matches!(
            parse("{{ substr 0 Space.Name }}"),
            Err(TemplateError::Arity { name: "substr", expected: 3, actual: 2 })
        );
        assert_matches!(
            parse("{{ substr \"0\" 1 Space.Name }}"),
            Err(TemplateError::Type { name: "substr", index: 0, .. })
        );
        assert_matches!(
            parse("{{ lower }}"),
            Err(TemplateError::Arity { name: "lower", actual: 0, .. })
        );
        assert_matches!(
            parse("{{ substr 0 1 lower }}"),
            Err(TemplateError::Arity { name: "lower", .. })
        );
    }

    #[test]
    fn test_malformed_actions() {
        assert_matches!(parse("/a/{{ Space.Name"), Err(TemplateError::Parse { position: 3, .. }));
        assert_matches!(parse("{{ }}"), Err(TemplateError::Parse { .. }));
        assert_matches!(parse("{{ Space.Name Space.Name }}"), Err(TemplateError::Parse { .. }));
        assert_matches!(parse("{{ Space.Name | Space.Name }}"), Err(TemplateError::Parse { .. }));
        assert_matches!(parse("{{ \"open }}"), Err(TemplateError::Parse { .. }));
        assert_matches!(parse("{{ (lower Space.Name }}"), Err(TemplateError::Parse { .. }));
        assert_matches!(parse("{{ Space.Name # }}"), Err(TemplateError::Parse { .. }));
    }

    #[test]
    fn test_nesting_depth_bounded() {
        let nested = |depth: usize| {
            format!(
                "{{{{ {}Space.Name{} }}}}",
                "(lower ".repeat(depth),
                ")".repeat(depth)
            )
        };
        assert!(parse(&nested(MAX_NESTING)).is_ok());
        assert_matches!(
            parse(&nested(MAX_NESTING + 1)),
            Err(TemplateError::Parse { .. })
        );
        let hostile = format!("{{{{ {} }}}}", "(".repeat(100_000));
        assert_matches!(parse(&hostile), Err(TemplateError::Parse { .. }));
    }

    #[test]
    fn test_negative_integer_literal() {
        let segments = parse("{{ substr 2 -1 Space.Name }}").unwrap();
        assert_matches!(
            &segments[0],
            Segment::Action(Expr::Call { args, .. }) if args[1] == Expr::Lit(Value::Int(-1))
        );
    }
}
