//! Mutable DOM helpers built on `kuchiki`.
//!
//! Card text is edited structurally: parse the markup, rewrite element
//! handles, serialize once.

use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

use crate::error::{Error, Result};

/// A parsed HTML document.
pub(crate) struct Document {
    root: NodeRef,
}

impl Document {
    /// Parse a complete page.
    pub(crate) fn parse(html: &str) -> Self {
        Self {
            root: kuchiki::parse_html().one(html),
        }
    }

    /// All elements matching `selector`, in document order.
    pub(crate) fn select(&self, selector: &str) -> Result<Vec<NodeDataRef<ElementData>>> {
        select(&self.root, selector)
    }

    /// The first element matching `selector`.
    pub(crate) fn select_first(&self, selector: &str) -> Result<Option<NodeDataRef<ElementData>>> {
        select_first(&self.root, selector)
    }
}

/// A parsed markup fragment, such as one side of a card.
pub(crate) struct Fragment {
    body: NodeRef,
}

impl Fragment {
    /// Parse card markup.
    ///
    /// The markup is opened inside `<body>` so leading whitespace and
    /// head-level elements such as `<style>` stay part of the fragment.
    pub(crate) fn parse(html: &str) -> Self {
        let document = kuchiki::parse_html().one(format!("<body>{}", html));
        let body = document
            .select_first("body")
            .map(|body| body.as_node().clone())
            .unwrap_or(document);
        Self { body }
    }

    /// All elements matching `selector`, in document order.
    pub(crate) fn select(&self, selector: &str) -> Result<Vec<NodeDataRef<ElementData>>> {
        select(&self.body, selector)
    }

    /// The first element matching `selector`.
    pub(crate) fn select_first(&self, selector: &str) -> Result<Option<NodeDataRef<ElementData>>> {
        select_first(&self.body, selector)
    }

    /// Serialize the fragment back to markup.
    pub(crate) fn to_html(&self) -> String {
        inner_html(&self.body)
    }
}

/// All elements below `node` matching `selector`, in document order.
pub(crate) fn select(node: &NodeRef, selector: &str) -> Result<Vec<NodeDataRef<ElementData>>> {
    node.select(selector)
        .map(|matches| matches.collect())
        .map_err(|()| Error::InvalidSelector(selector.to_string()))
}

/// The first element below `node` matching `selector`.
pub(crate) fn select_first(
    node: &NodeRef,
    selector: &str,
) -> Result<Option<NodeDataRef<ElementData>>> {
    Ok(select(node, selector)?.into_iter().next())
}

/// Markup of the node's children.
pub(crate) fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

/// Markup of the node itself.
pub(crate) fn outer_html(node: &NodeRef) -> String {
    node.to_string()
}

/// Value of an attribute on an element.
pub(crate) fn attr(element: &NodeDataRef<ElementData>, name: &str) -> Option<String> {
    element.attributes.borrow().get(name).map(String::from)
}

/// Append a class to an element unless it already carries it.
pub(crate) fn add_class(element: &NodeDataRef<ElementData>, class: &str) {
    if class.trim().is_empty() {
        return;
    }
    let mut attributes = element.attributes.borrow_mut();
    let current = attributes.get("class").unwrap_or_default().to_string();
    let mut classes: Vec<&str> = current.split_whitespace().collect();
    for name in class.split_whitespace() {
        if !classes.contains(&name) {
            classes.push(name);
        }
    }
    let joined = classes.join(" ");
    attributes.insert("class", joined);
}

/// Replace an element with its children.
pub(crate) fn unwrap(node: &NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        node.insert_before(child);
    }
    node.detach();
}

/// Replace an element with a text node.
pub(crate) fn replace_with_text(node: &NodeRef, text: &str) {
    node.insert_before(NodeRef::new_text(text));
    node.detach();
}

/// Apply `edit` to every text node below `node`.
pub(crate) fn edit_text(node: &NodeRef, edit: impl Fn(&str) -> String) {
    for descendant in node.descendants() {
        if let Some(text) = descendant.as_text() {
            let edited = edit(&text.borrow());
            *text.borrow_mut() = edited;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_roundtrip_keeps_markup() {
        let fragment = Fragment::parse("<p>A <b>bold</b> move</p><ul><li>x</li></ul>");
        assert_eq!(fragment.to_html(), "<p>A <b>bold</b> move</p><ul><li>x</li></ul>");
    }

    #[test]
    fn test_fragment_roundtrip_keeps_leading_head_elements() {
        let html = "  <style>.k{color:red}</style><p><img src=\"a.png\"></p>";
        assert_eq!(Fragment::parse(html).to_html(), html);
    }

    #[test]
    fn test_unwrap_keeps_children() {
        let fragment = Fragment::parse("<p>one <code>two <i>three</i></code> four</p>");
        let code = fragment.select_first("code").unwrap().unwrap();
        unwrap(code.as_node());
        assert_eq!(fragment.to_html(), "<p>one two <i>three</i> four</p>");
    }

    #[test]
    fn test_replace_with_text_escapes() {
        let fragment = Fragment::parse("a <strong>b</strong> c");
        let strong = fragment.select_first("strong").unwrap().unwrap();
        replace_with_text(strong.as_node(), "{{type:Input}}");
        assert_eq!(fragment.to_html(), "a {{type:Input}} c");
    }

    #[test]
    fn test_add_class_deduplicates() {
        let document = Document::parse("<details class=\"toggle\"></details>");
        let details = document.select_first("details").unwrap().unwrap();
        add_class(&details, "toggle");
        add_class(&details, "blue");
        add_class(&details, "");
        assert_eq!(attr(&details, "class").as_deref(), Some("toggle blue"));
    }

    #[test]
    fn test_invalid_selector() {
        let fragment = Fragment::parse("<p>x</p>");
        assert!(matches!(
            fragment.select("p[["),
            Err(Error::InvalidSelector(_))
        ));
    }
}
