//! Tokenizer for filter expressions (spec §4.D).

use crate::error::ScimError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Dec(f64),
    Bool(bool),
    And,
    Or,
    Not,
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
    Pr,
    LParen,
    RParen,
    Dot,
}

fn keyword(ident: &str) -> Option<Token> {
    Some(match ident.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "eq" => Token::Eq,
        "ne" => Token::Ne,
        "co" => Token::Co,
        "sw" => Token::Sw,
        "ew" => Token::Ew,
        "gt" => Token::Gt,
        "ge" => Token::Ge,
        "lt" => Token::Lt,
        "le" => Token::Le,
        "pr" => Token::Pr,
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        _ => return None,
    })
}

pub fn lex(input: &str) -> Result<Vec<Token>, ScimError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '[' | ']' => {
                return Err(ScimError::invalid_filter(
                    "nested filters are not permitted in a relational left operand",
                ));
            }
            '"' => {
                i += 1;
                let mut s = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '"' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        '\\' if i + 1 < chars.len() => {
                            s.push(match chars[i + 1] {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '"' => '"',
                                '\\' => '\\',
                                other => other,
                            });
                            i += 2;
                        }
                        other => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(ScimError::invalid_filter("unterminated string literal"));
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() || (c == '-' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()) => {
                let start = i;
                if c == '-' {
                    i += 1;
                }
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let v: f64 = text
                        .parse()
                        .map_err(|_| ScimError::invalid_filter(format!("bad number '{text}'")))?;
                    tokens.push(Token::Dec(v));
                } else {
                    let v: i64 = text
                        .parse()
                        .map_err(|_| ScimError::invalid_filter(format!("bad number '{text}'")))?;
                    tokens.push(Token::Int(v));
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '$' || c == ':' || c == '-' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric()
                        || chars[i] == '_'
                        || chars[i] == '$'
                        || chars[i] == ':'
                        || chars[i] == '-')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(keyword(&text).unwrap_or(Token::Ident(text)));
            }
            other => {
                return Err(ScimError::invalid_filter(format!(
                    "unexpected character '{other}'"
                )))
            }
        }
    }
    Ok(tokens)
}
