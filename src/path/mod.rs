//! The path/filter compiler (spec §4.D, module D).

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Literal, LogicalOp, PathNode, RelationalOp};
pub use parser::parse_filter;

use crate::error::ScimError;
use crate::schema::UrnRegistry;

/// Compiles a SCIM attribute path into a linked [`PathNode`] AST.
///
/// Splits off a leading URN prefix (the longest registered URN that is a
/// colon-terminated prefix of `input`) before segmenting the remainder on
/// `.`; within the URN prefix, dots are not separators (spec §4.D).
pub fn compile_path(input: &str, urns: &UrnRegistry) -> Result<PathNode, ScimError> {
    let (urn_prefix, rest) = split_urn_prefix(input, urns);
    let mut segments = split_segments(rest)?;
    if segments.is_empty() {
        return Err(ScimError::invalid_path("empty path"));
    }

    let mut filters = Vec::with_capacity(segments.len());
    for (_, filter_text) in &segments {
        filters.push(match filter_text {
            Some(text) => Some(Box::new(parser::parse_filter(text)?)),
            None => None,
        });
    }

    let (last_name, _) = segments.pop().unwrap();
    let last_filter = filters.pop().unwrap();
    let mut node = PathNode {
        name: last_name,
        filter: last_filter,
        next: None,
    };
    while let Some((name, _)) = segments.pop() {
        let filter = filters.pop().unwrap();
        node = PathNode {
            name,
            filter,
            next: Some(Box::new(node)),
        };
    }

    if let Some(urn) = urn_prefix {
        node = PathNode {
            name: urn,
            filter: None,
            next: Some(Box::new(node)),
        };
    }

    Ok(node)
}

fn split_urn_prefix<'a>(input: &'a str, urns: &UrnRegistry) -> (Option<String>, &'a str) {
    match urns.longest_prefix(input) {
        Some(prefix) => {
            let prefix_len = prefix.len();
            (Some(prefix.to_string()), &input[prefix_len + 1..])
        }
        None => (None, input),
    }
}

/// Splits a dot-separated path into `(name, bracketed filter text)` pairs,
/// respecting quoted strings and nested brackets inside a filter segment.
fn split_segments(input: &str) -> Result<Vec<(String, Option<String>)>, ScimError> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut filter: Option<String> = None;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '.' => {
                segments.push((std::mem::take(&mut current), filter.take()));
                i += 1;
            }
            '[' => {
                let mut depth = 1;
                let mut buf = String::new();
                let mut in_string = false;
                i += 1;
                while i < chars.len() && depth > 0 {
                    let ch = chars[i];
                    if in_string {
                        buf.push(ch);
                        if ch == '\\' && i + 1 < chars.len() {
                            buf.push(chars[i + 1]);
                            i += 1;
                        } else if ch == '"' {
                            in_string = false;
                        }
                    } else {
                        match ch {
                            '"' => {
                                in_string = true;
                                buf.push(ch);
                            }
                            '[' => {
                                depth += 1;
                                buf.push(ch);
                            }
                            ']' => {
                                depth -= 1;
                                if depth > 0 {
                                    buf.push(ch);
                                }
                            }
                            _ => buf.push(ch),
                        }
                    }
                    i += 1;
                }
                if depth != 0 {
                    return Err(ScimError::invalid_path("unterminated filter segment"));
                }
                filter = Some(buf);
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }
    segments.push((current, filter));
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_plain_dotted_path() {
        let urns = UrnRegistry::new();
        let node = compile_path("name.familyName", &urns).unwrap();
        assert_eq!(node.name, "name");
        assert_eq!(node.next.unwrap().name, "familyName");
    }

    #[test]
    fn compiles_filtered_segment() {
        let urns = UrnRegistry::new();
        let node = compile_path(r#"emails[value eq "foo@bar.com"].type"#, &urns).unwrap();
        assert_eq!(node.name, "emails");
        assert!(node.filter.is_some());
        assert_eq!(node.next.unwrap().name, "type");
    }

    #[test]
    fn urn_prefix_is_not_dot_split() {
        let mut urns = UrnRegistry::new();
        urns.register("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User");
        let node = compile_path(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
            &urns,
        )
        .unwrap();
        assert_eq!(
            node.name,
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"
        );
        assert_eq!(node.next.unwrap().name, "employeeNumber");
    }
}
