//! Plain-text extraction from parsed HTML.
//!
//! Every subtree produces its own [`Extracted`] value and the parent joins its
//! children's text with single spaces, so `<p>A</p><p>B</p>` becomes `"A B"`.
//! `script` and `style` subtrees contribute nothing.

use ego_tree::iter::Children;
use ego_tree::NodeRef;
use scraper::{Html, Node};
use thiserror::Error;

/// Elements whose subtrees never reach the extracted text or title.
const SKIPPED_TAGS: &[&str] = &["script", "style"];

/// Nesting depth past which a document is rejected instead of walked.
pub const MAX_DEPTH: usize = 4096;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("markup nesting exceeds {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub text: String,
}

/// Parse `html` and extract its title and visible text.
pub fn extract_html(html: &str) -> Result<Extracted, ExtractError> {
    let document = Html::parse_document(html);
    extract(document.tree.root())
}

/// Walk the tree rooted at `root`.
pub fn extract(root: NodeRef<'_, Node>) -> Result<Extracted, ExtractError> {
    let part = walk(root)?;
    Ok(Extracted { title: part.title.unwrap_or_default(), text: part.text })
}

struct Part {
    title: Option<String>,
    text: String,
}

impl Part {
    fn empty() -> Self {
        Part { title: None, text: String::new() }
    }
}

/// An element whose children are still being visited.
struct Frame<'a> {
    node: NodeRef<'a, Node>,
    children: Children<'a, Node>,
    parts: Vec<Part>,
}

impl Frame<'_> {
    fn finish(self) -> Part {
        let own_title = match self.node.value() {
            Node::Element(el) if el.name() == "title" => first_text(self.node),
            _ => None,
        };
        let title = own_title.or_else(|| self.parts.iter().find_map(|c| c.title.clone()));
        let text = self
            .parts
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join(" ");
        Part { title, text }
    }
}

enum Visit<'a> {
    Leaf(Part),
    Branch(Frame<'a>),
}

fn visit(node: NodeRef<'_, Node>) -> Visit<'_> {
    match node.value() {
        Node::Text(text) => {
            let text: &str = text;
            Visit::Leaf(Part { title: None, text: text.to_string() })
        }
        Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => Visit::Leaf(Part::empty()),
        Node::Element(_) | Node::Document | Node::Fragment => {
            Visit::Branch(Frame { node, children: node.children(), parts: Vec::new() })
        }
        _ => Visit::Leaf(Part::empty()),
    }
}

/// Post-order walk on an explicit stack; each finished subtree hands its
/// [`Part`] to its parent.
fn walk(root: NodeRef<'_, Node>) -> Result<Part, ExtractError> {
    let mut stack = match visit(root) {
        Visit::Leaf(part) => return Ok(part),
        Visit::Branch(frame) => vec![frame],
    };
    while let Some(mut frame) = stack.pop() {
        match frame.children.next() {
            Some(child) => match visit(child) {
                Visit::Leaf(part) => {
                    frame.parts.push(part);
                    stack.push(frame);
                }
                Visit::Branch(next) => {
                    if stack.len() + 1 >= MAX_DEPTH {
                        return Err(ExtractError::TooDeep(MAX_DEPTH));
                    }
                    stack.push(frame);
                    stack.push(next);
                }
            },
            None => {
                let part = frame.finish();
                match stack.last_mut() {
                    Some(parent) => parent.parts.push(part),
                    None => return Ok(part),
                }
            }
        }
    }
    Ok(Part::empty())
}

fn first_text(node: NodeRef<'_, Node>) -> Option<String> {
    node.descendants().find_map(|n| match n.value() {
        Node::Text(text) => {
            let text: &str = text;
            Some(text.to_string())
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_text_is_space_separated() {
        let out = extract_html("<p>A</p><p>B</p>").unwrap();
        assert!(out.text.contains("A B"));
        assert!(!out.text.contains("AB"));
    }

    #[test]
    fn title_is_captured() {
        let out = extract_html("<html><head><title>Hello There</title></head><body>x</body></html>").unwrap();
        assert_eq!(out.title, "Hello There");
    }

    #[test]
    fn no_title_is_empty() {
        assert_eq!(extract_html("<p>body only</p>").unwrap().title, "");
    }

    #[test]
    fn deeply_nested_pages_are_walked() {
        let html = format!("{}deep text{}", "<div>".repeat(2000), "</div>".repeat(2000));
        let out = extract_html(&html).unwrap();
        assert_eq!(out.text.trim(), "deep text");
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let html = "<div>".repeat(MAX_DEPTH + 8);
        assert!(matches!(extract_html(&html), Err(ExtractError::TooDeep(_))));
    }
}
