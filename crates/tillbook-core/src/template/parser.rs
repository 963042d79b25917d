//! Tokenizer and block builder for the placeholder syntax.
//!
//! Parsing is a single left-to-right scan with an explicit stack of open
//! blocks. Each frame collects the nodes of its body; a closing tag pops the
//! frame and attaches it to its parent.

use crate::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const EACH: &str = "each";

/// One compiled piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    /// Literal text copied to the output as is.
    Text(String),
    /// `{{key}}`
    Var(String),
    /// `{{#key}}…{{/key}}`
    Section { key: String, body: Vec<Node> },
    /// `{{#each key}}…{{/each}}`
    Each { key: String, body: Vec<Node> },
}

/// A tag as written, before block matching.
#[derive(Debug, PartialEq, Eq)]
enum Tag<'a> {
    Var(&'a str),
    OpenSection(&'a str),
    OpenEach(&'a str),
    Close(&'a str),
}

enum BlockKind {
    Section,
    Each,
}

struct Frame {
    kind: BlockKind,
    key: String,
    offset: usize,
    body: Vec<Node>,
}

impl Frame {
    /// The name a closing tag must carry.
    fn close_name(&self) -> &str {
        match self.kind {
            BlockKind::Section => &self.key,
            BlockKind::Each => EACH,
        }
    }

    fn into_node(self) -> Node {
        match self.kind {
            BlockKind::Section => Node::Section {
                key: self.key,
                body: self.body,
            },
            BlockKind::Each => Node::Each {
                key: self.key,
                body: self.body,
            },
        }
    }
}

/// Classifies the inside of a `{{ }}` pair. `offset` points at the `{{`.
fn classify(inner: &str, offset: usize) -> Result<Tag<'_>, TemplateError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(TemplateError::EmptyTag { offset });
    }
    if inner.contains('{') || inner.contains('}') {
        return Err(TemplateError::InvalidTag {
            tag: inner.to_string(),
            offset,
        });
    }

    if let Some(rest) = inner.strip_prefix('#') {
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(TemplateError::EmptyTag { offset });
        }
        if rest == EACH {
            return Err(TemplateError::MissingListKey { offset });
        }
        if let Some(key) = rest.strip_prefix(EACH) {
            if key.starts_with(char::is_whitespace) {
                return Ok(Tag::OpenEach(key.trim()));
            }
        }
        return Ok(Tag::OpenSection(rest));
    }

    if let Some(rest) = inner.strip_prefix('/') {
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(TemplateError::EmptyTag { offset });
        }
        return Ok(Tag::Close(rest));
    }

    Ok(Tag::Var(inner))
}

/// Compiles template source into a node tree.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut cursor = 0;

    while let Some(found) = source[cursor..].find(OPEN) {
        let open_at = cursor + found;
        let inner_start = open_at + OPEN.len();
        let close_rel = source[inner_start..]
            .find(CLOSE)
            .ok_or(TemplateError::UnterminatedTag { offset: open_at })?;
        let inner_end = inner_start + close_rel;

        let current = stack.last_mut().map(|f| &mut f.body).unwrap_or(&mut root);
        if open_at > cursor {
            current.push(Node::Text(source[cursor..open_at].to_string()));
        }

        match classify(&source[inner_start..inner_end], open_at)? {
            Tag::Var(key) => current.push(Node::Var(key.to_string())),
            Tag::OpenSection(key) => stack.push(Frame {
                kind: BlockKind::Section,
                key: key.to_string(),
                offset: open_at,
                body: Vec::new(),
            }),
            Tag::OpenEach(key) => stack.push(Frame {
                kind: BlockKind::Each,
                key: key.to_string(),
                offset: open_at,
                body: Vec::new(),
            }),
            Tag::Close(name) => {
                let frame = stack.pop().ok_or_else(|| TemplateError::UnmatchedClose {
                    name: name.to_string(),
                    offset: open_at,
                })?;
                if frame.close_name() != name {
                    return Err(TemplateError::MismatchedClose {
                        expected: frame.close_name().to_string(),
                        found: name.to_string(),
                        offset: open_at,
                    });
                }
                let node = frame.into_node();
                stack.last_mut().map(|f| &mut f.body).unwrap_or(&mut root).push(node);
            }
        }

        cursor = inner_end + CLOSE.len();
    }

    if let Some(frame) = stack.pop() {
        return Err(TemplateError::UnclosedBlock {
            name: frame.close_name().to_string(),
            offset: frame.offset,
        });
    }

    if cursor < source.len() {
        root.push(Node::Text(source[cursor..].to_string()));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_trims_whitespace() {
        assert_eq!(classify(" name ", 0).unwrap(), Tag::Var("name"));
        assert_eq!(classify("# paid", 0).unwrap(), Tag::OpenSection("paid"));
        assert_eq!(classify("#each  items ", 0).unwrap(), Tag::OpenEach("items"));
        assert_eq!(classify("/ each", 0).unwrap(), Tag::Close("each"));
    }

    #[test]
    fn test_each_prefix_is_not_a_list_block() {
        // a section whose key merely starts with "each"
        assert_eq!(classify("#eachPrice", 0).unwrap(), Tag::OpenSection("eachPrice"));
    }

    #[test]
    fn test_parse_builds_tree() {
        let nodes = parse("A{{#each items}}<{{name}}>{{/each}}B").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("A".to_string()),
                Node::Each {
                    key: "items".to_string(),
                    body: vec![
                        Node::Text("<".to_string()),
                        Node::Var("name".to_string()),
                        Node::Text(">".to_string()),
                    ],
                },
                Node::Text("B".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_offsets() {
        assert_eq!(
            parse("ab{{name").unwrap_err(),
            TemplateError::UnterminatedTag { offset: 2 }
        );
        assert_eq!(parse("{{ }}").unwrap_err(), TemplateError::EmptyTag { offset: 0 });
        assert_eq!(
            parse("x{{#each}}{{/each}}").unwrap_err(),
            TemplateError::MissingListKey { offset: 1 }
        );
        assert_eq!(
            parse("{{/x}}").unwrap_err(),
            TemplateError::UnmatchedClose {
                name: "x".to_string(),
                offset: 0
            }
        );
        assert_eq!(
            parse("{{#a}}{{/b}}").unwrap_err(),
            TemplateError::MismatchedClose {
                expected: "a".to_string(),
                found: "b".to_string(),
                offset: 6
            }
        );
        assert_eq!(
            parse("..{{#each items}}").unwrap_err(),
            TemplateError::UnclosedBlock {
                name: "each".to_string(),
                offset: 2
            }
        );
        assert!(matches!(
            parse("{{a{b}}").unwrap_err(),
            TemplateError::InvalidTag { .. }
        ));
    }

    #[test]
    fn test_lone_braces_are_text() {
        let nodes = parse("a } b }} c").unwrap();
        assert_eq!(nodes, vec![Node::Text("a } b }} c".to_string())]);
    }
}
