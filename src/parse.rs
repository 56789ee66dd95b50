// SPDX: CC0-1.0

// recursive descent over the token stream:
//
//   expression := term (('+' | '-') term)*
//   term       := factor (('*' | '/') factor)*
//   factor     := ('+' | '-') factor | atom implicit? ('^' factor)?
//   atom       := number | ident | ident '(' expression ')' | '(' expression ')'
//   implicit   := <ident or '(' follows> factor

use crate::{
    eval::{Expr, ExprTyp, Ident, Idents, OperatorTyp},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, Tok, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};

/// Deepest chain of nested factors (parentheses, signs, powers, implicit
/// products) the parser descends into.
pub const MAX_NESTING: usize = 256;
/// Longest token stream accepted, which bounds the height of left-leaning
/// sums and products.
pub const MAX_TOKENS: usize = 2048;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    UnknownIdent,
    MissingArgs { fun: &'static str },
    Unexpected(TokTyp),
    UnexpectedEnd,
    TrailingInput,
    Empty,
    TooDeep,
    TooLong,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::UnknownIdent => write!(f, "unknown identifier"),
            Self::MissingArgs { fun } => {
                write!(f, "function '{fun}' must be followed by a parenthesized argument")
            }
            Self::Unexpected(typ) => write!(f, "unexpected {typ}"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::TrailingInput => write!(f, "unexpected input after complete expression"),
            Self::Empty => write!(f, "empty expression"),
            Self::TooDeep => write!(f, "expression nested more than {MAX_NESTING} levels deep"),
            Self::TooLong => write!(f, "expression longer than {MAX_TOKENS} tokens"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at column {}", self.typ, self.loc.start() + 1)
    }
}

impl std::error::Error for ParseErr {}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Expr, ParseErr> {
    let end = SubStr::end_of(lex.src());
    let toks = lex.collect::<Result<Vec<Tok>, LexErr>>()?;
    if toks.is_empty() {
        return Err(ParseErr {
            typ: ParseErrTyp::Empty,
            loc: end,
        });
    }
    if let Some(tok) = toks.get(MAX_TOKENS) {
        return Err(ParseErr {
            typ: ParseErrTyp::TooLong,
            loc: tok.loc.clone(),
        });
    }

    let mut parser = Parser {
        toks,
        pos: 0,
        depth: 0,
        idents,
        end,
    };
    let expr = parser.expression()?;
    if let Some(tok) = parser.toks.get(parser.pos) {
        let typ = match tok.typ {
            TokTyp::CloseParen => ParseErrTyp::ParenMismatch,
            _ => ParseErrTyp::TrailingInput,
        };
        return Err(ParseErr {
            typ,
            loc: tok.loc.clone(),
        });
    }
    Ok(expr)
}

struct Parser<'i> {
    toks: Vec<Tok>,
    pos: usize,
    depth: usize,
    idents: &'i Idents,
    end: SubStr,
}

impl Parser<'_> {
    fn peek(&self) -> Option<TokTyp> {
        self.toks.get(self.pos).map(|tok| tok.typ)
    }

    fn bump(&mut self) -> Result<Tok, ParseErr> {
        let tok = self.toks.get(self.pos).cloned().ok_or_else(|| ParseErr {
            typ: ParseErrTyp::UnexpectedEnd,
            loc: self.end.clone(),
        })?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat_op(&mut self, accept: &[OperatorTyp]) -> Option<OperatorTyp> {
        match self.peek() {
            Some(TokTyp::Op(op)) if accept.contains(&op) => {
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseErr> {
        let mut lhs = self.term()?;
        while let Some(op) = self.eat_op(&[OperatorTyp::Add, OperatorTyp::Sub]) {
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ParseErr> {
        let mut lhs = self.factor()?;
        while let Some(op) = self.eat_op(&[OperatorTyp::Mul, OperatorTyp::Div]) {
            let rhs = self.factor()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, ParseErr> {
        if self.depth >= MAX_NESTING {
            let loc = match self.toks.get(self.pos) {
                Some(tok) => tok.loc.clone(),
                None => self.end.clone(),
            };
            return Err(ParseErr {
                typ: ParseErrTyp::TooDeep,
                loc,
            });
        }
        self.depth += 1;
        let ret = self.nested_factor();
        self.depth -= 1;
        ret
    }

    fn nested_factor(&mut self) -> Result<Expr, ParseErr> {
        let tok = self.bump()?;
        let atom = match tok.typ {
            TokTyp::Op(OperatorTyp::Add) => return self.factor(),
            TokTyp::Op(OperatorTyp::Sub) => {
                let inner = self.factor()?;
                let loc = tok.loc.merge(&inner.loc);
                return Ok(Expr {
                    typ: ExprTyp::Neg(Box::new(inner)),
                    loc,
                });
            }
            TokTyp::OpenParen => {
                let inner = self.expression()?;
                let close = self.close_paren(&tok)?;
                Expr {
                    typ: inner.typ,
                    loc: tok.loc.merge(&close.loc),
                }
            }
            TokTyp::Number => Expr {
                typ: ExprTyp::Val(parse_num(&tok)?),
                loc: tok.loc,
            },
            TokTyp::Ident => self.ident(tok)?,
            typ => {
                return Err(ParseErr {
                    typ: match typ {
                        TokTyp::CloseParen => ParseErrTyp::ParenMismatch,
                        _ => ParseErrTyp::Unexpected(typ),
                    },
                    loc: tok.loc,
                })
            }
        };

        let atom = self.implicit(atom)?;
        if self.eat_op(&[OperatorTyp::Pow]).is_some() {
            let exp = self.factor()?;
            return Ok(Expr::binary(OperatorTyp::Pow, atom, exp));
        }
        Ok(atom)
    }

    /// Every atom passes through here: a following identifier or `(` is an
    /// operator-free product, as in `2x`, `3(x+1)` or `(x+1)sin(x)`.
    fn implicit(&mut self, lhs: Expr) -> Result<Expr, ParseErr> {
        match self.peek() {
            Some(TokTyp::Ident | TokTyp::OpenParen) => {
                let rhs = self.factor()?;
                Ok(Expr::binary(OperatorTyp::Mul, lhs, rhs))
            }
            _ => Ok(lhs),
        }
    }

    fn close_paren(&mut self, open: &Tok) -> Result<Tok, ParseErr> {
        match self.peek() {
            Some(TokTyp::CloseParen) => self.bump(),
            _ => Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: open.loc.clone(),
            }),
        }
    }

    fn ident(&mut self, tok: Tok) -> Result<Expr, ParseErr> {
        let ident = match self.idents.get(&tok.loc.clone().into()) {
            Some(ident) => *ident,
            None => {
                let (head, rest) = self.split_ident(&tok).ok_or_else(|| ParseErr {
                    typ: ParseErrTyp::UnknownIdent,
                    loc: tok.loc.clone(),
                })?;
                // re-read the remainder as its own token right after the head
                self.toks.insert(self.pos, rest);
                return self.ident(head);
            }
        };

        let typ = match ident {
            Ident::Var(var) => ExprTyp::Var(var),
            Ident::Const(val) => ExprTyp::Val(val),
            Ident::Fun(fun) => {
                if self.peek() != Some(TokTyp::OpenParen) {
                    return Err(ParseErr {
                        typ: ParseErrTyp::MissingArgs { fun: fun.name },
                        loc: tok.loc,
                    });
                }
                let open = self.bump()?;
                let arg = self.expression()?;
                let close = self.close_paren(&open)?;
                return Ok(Expr {
                    typ: ExprTyp::Call {
                        fun,
                        arg: Box::new(arg),
                    },
                    loc: tok.loc.merge(&close.loc),
                });
            }
        };
        Ok(Expr { typ, loc: tok.loc })
    }

    /// Split an unknown name into the longest leading variable or constant and
    /// an alphabetic remainder, so `xsin` reads as `x sin` and `pix` as `pi x`.
    fn split_ident(&self, tok: &Tok) -> Option<(Tok, Tok)> {
        let text = tok.loc.get();
        (1..text.len())
            .rev()
            .filter(|&idx| text.as_bytes()[idx].is_ascii_alphabetic())
            .find_map(|idx| {
                let (head, rest) = tok.loc.clone().split_at(idx);
                match self.idents.get(&head.clone().into()) {
                    Some(Ident::Var(_) | Ident::Const(_)) => Some((
                        Tok {
                            typ: TokTyp::Ident,
                            loc: head,
                        },
                        Tok {
                            typ: TokTyp::Ident,
                            loc: rest,
                        },
                    )),
                    _ => None,
                }
            })
    }
}

fn parse_num(tok: &Tok) -> Result<Number, ParseErr> {
    tok.loc.get().parse().map_err(|err| ParseErr {
        typ: ParseErrTyp::ParseNum(err),
        loc: tok.loc.clone(),
    })
}
