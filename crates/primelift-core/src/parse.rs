//! Whitespace/parenthesis S-expression frontend.
//!
//! Tokenization has three cases: `(`, `)`, and any run of characters that is
//! neither whitespace nor a parenthesis. Parsing is a single stack-based
//! pass. Only `declare-const` and `assert` commands are meaningful; other
//! top-level commands (`set-logic`, `check-sat`, ...) are ignored.

use indexmap::IndexSet;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::{ConstraintModel, OpTag, Term};

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unbalanced parenthesis")]
    #[diagnostic(code(primelift::parse::unbalanced))]
    Unbalanced {
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("unknown operator `{symbol}`")]
    #[diagnostic(code(primelift::parse::unknown_operator))]
    UnknownOperator {
        symbol: String,
        #[label("not one of = + - * > < >= <=")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("`{atom}` is neither a declared constant nor an integer literal")]
    #[diagnostic(code(primelift::parse::unknown_atom))]
    UnknownAtom {
        atom: String,
        #[label("undeclared")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("operator `{symbol}` needs at least two operands")]
    #[diagnostic(code(primelift::parse::arity))]
    Arity {
        symbol: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("malformed `{command}` command")]
    #[diagnostic(code(primelift::parse::malformed_command))]
    MalformedCommand {
        command: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

#[derive(Debug, Clone)]
enum Sexpr {
    Atom { text: String, offset: usize },
    List { items: Vec<Sexpr>, offset: usize },
}

impl Sexpr {
    fn offset(&self) -> usize {
        match self {
            Sexpr::Atom { offset, .. } | Sexpr::List { offset, .. } => *offset,
        }
    }

    fn len(&self) -> usize {
        match self {
            Sexpr::Atom { text, .. } => text.len(),
            Sexpr::List { .. } => 1,
        }
    }
}

/// Parse one source file into its constraint model.
pub fn parse_script(source: &str, filename: &str) -> Result<ConstraintModel, ParseError> {
    let ctx = SourceContext { source, filename };
    let toplevel = parse_sexprs(&ctx)?;
    lower(&ctx, &toplevel)
}

struct SourceContext<'a> {
    source: &'a str,
    filename: &'a str,
}

impl SourceContext<'_> {
    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename, self.source.to_string())
    }

    fn span(&self, offset: usize, len: usize) -> SourceSpan {
        SourceSpan::from(offset..offset + len.max(1))
    }
}

fn parse_sexprs(ctx: &SourceContext<'_>) -> Result<Vec<Sexpr>, ParseError> {
    // `current` collects the innermost open list; `parents` holds each
    // enclosing list together with its open-paren offset.
    let mut current: Vec<Sexpr> = Vec::new();
    let mut parents: Vec<(usize, Vec<Sexpr>)> = Vec::new();
    let mut chars = ctx.source.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            ';' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => parents.push((offset, std::mem::take(&mut current))),
            ')' => {
                let Some((open_offset, mut parent)) = parents.pop() else {
                    return Err(ParseError::Unbalanced {
                        span: ctx.span(offset, 1),
                        src: ctx.named_source(),
                    });
                };
                let items = std::mem::take(&mut current);
                parent.push(Sexpr::List {
                    items,
                    offset: open_offset,
                });
                current = parent;
            }
            c if c.is_whitespace() => {}
            _ => {
                let mut text = String::new();
                text.push(ch);
                while let Some((_, c)) = chars.peek() {
                    if c.is_whitespace() || *c == '(' || *c == ')' || *c == ';' {
                        break;
                    }
                    text.push(*c);
                    chars.next();
                }
                current.push(Sexpr::Atom { text, offset });
            }
        }
    }

    if let Some((open_offset, _)) = parents.last() {
        return Err(ParseError::Unbalanced {
            span: ctx.span(*open_offset, 1),
            src: ctx.named_source(),
        });
    }
    Ok(current)
}

fn lower(ctx: &SourceContext<'_>, toplevel: &[Sexpr]) -> Result<ConstraintModel, ParseError> {
    // First pass: the variable set is derived from every declare-const
    // before any assert body is resolved.
    let mut vars: IndexSet<String> = IndexSet::new();
    for command in toplevel {
        if let Some(("declare-const", items)) = command_head(command) {
            match items.get(1) {
                Some(Sexpr::Atom { text, .. }) => {
                    vars.insert(text.clone());
                }
                _ => {
                    return Err(ParseError::MalformedCommand {
                        command: "declare-const".into(),
                        span: ctx.span(command.offset(), command.len()),
                        src: ctx.named_source(),
                    })
                }
            }
        }
    }

    let mut asserts = Vec::new();
    for command in toplevel {
        if let Some(("assert", items)) = command_head(command) {
            let body = items.get(1).ok_or_else(|| ParseError::MalformedCommand {
                command: "assert".into(),
                span: ctx.span(command.offset(), command.len()),
                src: ctx.named_source(),
            })?;
            asserts.push(lower_term(ctx, &vars, body)?);
        }
    }

    Ok(ConstraintModel { vars, asserts })
}

fn command_head(command: &Sexpr) -> Option<(&str, &[Sexpr])> {
    match command {
        Sexpr::List { items, .. } => match items.first() {
            Some(Sexpr::Atom { text, .. }) => Some((text.as_str(), items.as_slice())),
            _ => None,
        },
        _ => None,
    }
}

fn lower_term(
    ctx: &SourceContext<'_>,
    vars: &IndexSet<String>,
    sexpr: &Sexpr,
) -> Result<Term, ParseError> {
    match sexpr {
        Sexpr::Atom { text, offset } => {
            if vars.contains(text.as_str()) {
                Ok(Term::Var(text.clone()))
            } else if is_integer_literal(text) {
                Ok(Term::Lit(text.clone()))
            } else {
                Err(ParseError::UnknownAtom {
                    atom: text.clone(),
                    span: ctx.span(*offset, text.len()),
                    src: ctx.named_source(),
                })
            }
        }
        Sexpr::List { items, offset } => {
            let (symbol, head_offset) = match items.first() {
                Some(Sexpr::Atom { text, offset }) => (text.as_str(), *offset),
                _ => {
                    return Err(ParseError::UnknownOperator {
                        symbol: "(".into(),
                        span: ctx.span(*offset, 1),
                        src: ctx.named_source(),
                    })
                }
            };
            let op = OpTag::from_symbol(symbol).ok_or_else(|| ParseError::UnknownOperator {
                symbol: symbol.to_string(),
                span: ctx.span(head_offset, symbol.len()),
                src: ctx.named_source(),
            })?;
            if items.len() < 3 {
                return Err(ParseError::Arity {
                    symbol: symbol.to_string(),
                    span: ctx.span(head_offset, symbol.len()),
                    src: ctx.named_source(),
                });
            }
            let operands = items[1..]
                .iter()
                .map(|item| lower_term(ctx, vars, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Term::App(op, operands))
        }
    }
}

/// Literal shape check only; range checking happens at encode time.
fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
