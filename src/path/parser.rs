//! Filter expression parser.
//!
//! Logical combination (`or`/`and`/`not`) is resolved by precedence
//! climbing over the token stream — the iterative cousin of a classic
//! shunting-yard pass, adapted here because `pr` and `not` are unary while
//! the remaining relational operators are binary, which a pure
//! output-queue shunting-yard doesn't handle as directly. Each relational
//! comparison (`path op literal`) is parsed as one leaf before logical
//! combination begins, matching the grammar's precedence: relational >
//! `not` > `and` > `or`.

use super::ast::{Expr, Literal, LogicalOp, PathNode, RelationalOp};
use super::lexer::{lex, Token};
use crate::error::ScimError;

pub fn parse_filter(input: &str) -> Result<Expr, ScimError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ScimError::invalid_filter(
            "trailing tokens after filter expression",
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<Expr, ScimError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.bump();
            let right = self.parse_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Some(Box::new(right)));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ScimError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.bump();
            let right = self.parse_not()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Some(Box::new(right)));
        }
        Ok(left)
    }

    /// `not` is right-associative and unary, per spec §4.D.
    fn parse_not(&mut self) -> Result<Expr, ScimError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.bump();
            let inner = self.parse_not()?;
            return Ok(Expr::Logical(LogicalOp::Not, Box::new(inner), None));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ScimError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.bump();
            let inner = self.parse_or()?;
            match self.bump() {
                Some(Token::RParen) => Ok(Expr::Parenthesis(Box::new(inner))),
                _ => Err(ScimError::invalid_filter("expected closing ')'")),
            }
        } else {
            self.parse_relational()
        }
    }

    fn parse_path(&mut self) -> Result<PathNode, ScimError> {
        let mut segments = Vec::new();
        loop {
            match self.bump() {
                Some(Token::Ident(name)) => segments.push(name),
                _ => return Err(ScimError::invalid_filter("expected attribute path")),
            }
            if matches!(self.peek(), Some(Token::Dot)) {
                self.bump();
                continue;
            }
            break;
        }
        let mut node = PathNode::leaf(segments.pop().expect("at least one segment"));
        while let Some(name) = segments.pop() {
            node = PathNode {
                name,
                filter: None,
                next: Some(Box::new(node)),
            };
        }
        Ok(node)
    }

    fn parse_relational(&mut self) -> Result<Expr, ScimError> {
        let path = self.parse_path()?;
        let op = match self.bump() {
            Some(Token::Eq) => RelationalOp::Eq,
            Some(Token::Ne) => RelationalOp::Ne,
            Some(Token::Co) => RelationalOp::Co,
            Some(Token::Sw) => RelationalOp::Sw,
            Some(Token::Ew) => RelationalOp::Ew,
            Some(Token::Gt) => RelationalOp::Gt,
            Some(Token::Ge) => RelationalOp::Ge,
            Some(Token::Lt) => RelationalOp::Lt,
            Some(Token::Le) => RelationalOp::Le,
            Some(Token::Pr) => return Ok(Expr::Relational(RelationalOp::Pr, path, None)),
            _ => return Err(ScimError::invalid_filter("expected relational operator")),
        };
        let literal = match self.bump() {
            Some(Token::Str(s)) => Literal::Str(s),
            Some(Token::Bool(b)) => Literal::Bool(b),
            Some(Token::Int(i)) => Literal::Integer(i),
            Some(Token::Dec(d)) => Literal::Decimal(d),
            _ => return Err(ScimError::invalid_filter("expected literal operand")),
        };
        Ok(Expr::Relational(op, path, Some(literal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_relational() {
        let expr = parse_filter(r#"userName eq "imulab""#).unwrap();
        match expr {
            Expr::Relational(RelationalOp::Eq, path, Some(Literal::Str(s))) => {
                assert_eq!(path.name, "userName");
                assert_eq!(s, "imulab");
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_filter(r#"a pr or b pr and c pr"#).unwrap();
        // a OR (b AND c)
        match expr {
            Expr::Logical(LogicalOp::Or, _, Some(right)) => {
                assert!(matches!(*right, Expr::Logical(LogicalOp::And, _, _)));
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn not_is_unary_and_right_associative() {
        let expr = parse_filter(r#"not a pr"#).unwrap();
        assert!(matches!(expr, Expr::Logical(LogicalOp::Not, _, None)));
    }

    #[test]
    fn parenthesis_overrides_precedence() {
        let expr = parse_filter(r#"(a pr or b pr) and c pr"#).unwrap();
        match expr {
            Expr::Logical(LogicalOp::And, left, Some(_)) => {
                assert!(matches!(*left, Expr::Parenthesis(_)));
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }
}
