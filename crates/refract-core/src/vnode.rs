use std::fmt;

use crate::props::Props;
use crate::state::Scope;

/// Signature shared by every component function: the session scope
/// (for state hooks) and the props the caller attached, returning the
/// subtree the component renders.
pub type ComponentFn = fn(&mut Scope<'_>, &Props) -> VNode;

/// Identity of an element node. Primitive tags compare by name,
/// component tags by function reference; when the identity at a
/// position changes, the reconciler replaces the host subtree
/// wholesale instead of updating it.
#[derive(Clone)]
pub enum Tag {
    Primitive(String),
    Component(ComponentFn),
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tag::Primitive(a), Tag::Primitive(b)) => a == b,
            (Tag::Component(a), Tag::Component(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Primitive(name) => f.debug_tuple("Primitive").field(name).finish(),
            Tag::Component(func) => write!(f, "Component({:#x})", *func as usize),
        }
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Primitive(name.to_string())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Primitive(name)
    }
}

impl From<ComponentFn> for Tag {
    fn from(func: ComponentFn) -> Self {
        Tag::Component(func)
    }
}

/// Immutable description of one tree position: a text value or an
/// element. Every render pass builds a brand-new tree; nothing is
/// mutated in place afterwards, and identity across passes is purely
/// positional.
#[derive(Debug, Clone)]
pub enum VNode {
    Text(String),
    Element(VElement),
}

#[derive(Debug, Clone)]
pub struct VElement {
    pub tag: Tag,
    pub props: Props,
    pub children: Vec<VNode>,
}

impl VNode {
    pub fn text(value: impl Into<String>) -> VNode {
        VNode::Text(value.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, VNode::Text(_))
    }
}

/// Builds an element node. Pass `Props::new()` when the element
/// carries none; children are usually collected with [`children!`].
pub fn el(tag: impl Into<Tag>, props: Props, children: Vec<VNode>) -> VNode {
    VNode::Element(VElement {
        tag: tag.into(),
        props,
        children,
    })
}

/// Builds a component-tagged node. The renderer resolves it by calling
/// the function with these props. A component invocation takes no
/// child list, so none is accepted here.
pub fn component(func: ComponentFn, props: Props) -> VNode {
    VNode::Element(VElement {
        tag: Tag::Component(func),
        props,
        children: Vec::new(),
    })
}

/// Conversion used by [`children!`]: anything that can stand in a
/// child list. `Option` lets a call site drop a child conditionally;
/// `None` entries are filtered out instead of rendered.
pub trait IntoChild {
    fn into_child(self) -> Option<VNode>;
}

impl IntoChild for VNode {
    fn into_child(self) -> Option<VNode> {
        Some(self)
    }
}

impl IntoChild for String {
    fn into_child(self) -> Option<VNode> {
        Some(VNode::Text(self))
    }
}

impl IntoChild for &str {
    fn into_child(self) -> Option<VNode> {
        Some(VNode::Text(self.to_string()))
    }
}

impl<C: IntoChild> IntoChild for Option<C> {
    fn into_child(self) -> Option<VNode> {
        self.and_then(IntoChild::into_child)
    }
}

/// Collects a heterogeneous child list: nodes, plain strings, and
/// `Option`s of either may be mixed freely.
#[macro_export]
macro_rules! children {
    ($($child:expr),* $(,)?) => {{
        let entries: ::std::vec::Vec<::std::option::Option<$crate::VNode>> =
            ::std::vec![$($crate::IntoChild::into_child($child)),*];
        entries
            .into_iter()
            .flatten()
            .collect::<::std::vec::Vec<$crate::VNode>>()
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(_scope: &mut Scope<'_>, _props: &Props) -> VNode {
        VNode::text("first")
    }

    fn second(_scope: &mut Scope<'_>, _props: &Props) -> VNode {
        VNode::text("second")
    }

    #[test]
    fn children_macro_filters_absent_entries() {
        let kids = children![
            el("span", Props::new(), vec![]),
            "plain text",
            None::<VNode>,
            Some("tail"),
        ];
        assert_eq!(kids.len(), 3);
        assert!(matches!(&kids[0], VNode::Element(element) if element.tag == Tag::from("span")));
        assert!(matches!(&kids[1], VNode::Text(text) if text == "plain text"));
        assert!(matches!(&kids[2], VNode::Text(text) if text == "tail"));
    }

    #[test]
    fn children_macro_accepts_an_empty_list() {
        let kids = children![];
        assert!(kids.is_empty());
    }

    #[test]
    fn primitive_tags_compare_by_name() {
        assert_eq!(Tag::from("div"), Tag::from("div"));
        assert_ne!(Tag::from("div"), Tag::from("span"));
    }

    #[test]
    fn component_tags_compare_by_function_reference() {
        assert_eq!(Tag::Component(first), Tag::Component(first));
        assert_ne!(Tag::Component(first), Tag::Component(second));
        assert_ne!(Tag::Component(first), Tag::from("first"));
    }

    #[test]
    fn component_nodes_carry_no_children() {
        let node = component(first, Props::new().attr("label", "x"));
        match node {
            VNode::Element(element) => {
                assert_eq!(element.tag, Tag::Component(first));
                assert!(element.children.is_empty());
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }
}
