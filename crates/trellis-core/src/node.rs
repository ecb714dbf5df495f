//! Renderable node trees.
//!
//! A [`Node`] describes markup without producing it. Trees are built fresh
//! (or shared read-only) and handed to [`crate::render`], which evaluates
//! components lazily while walking the tree.

use crate::context::Context;
use crate::error::ComponentError;
use crate::locale::LocaleText;
use std::fmt;
use std::sync::Arc;

/// Function backing an invocable component.
pub type ComponentFn =
    Arc<dyn Fn(&Props<'_>, &mut Context) -> Result<Node, ComponentError> + Send + Sync>;

/// Something renderable.
#[derive(Clone, Debug, Default)]
pub enum Node {
    /// Renders nothing.
    #[default]
    Empty,
    /// Text content, escaped on output.
    Text(String),
    /// A number, written in its decimal form.
    Number(f64),
    /// Markup inserted verbatim. The producer is responsible for its safety.
    Raw(String),
    /// Children rendered in order without a wrapping element.
    Fragment(Vec<Node>),
    Element(Element),
    Component(Component),
}

/// A single markup element described by a selector such as `div#main.card`.
#[derive(Clone, Debug)]
pub struct Element {
    pub selector: String,
    pub attrs: Attributes,
    pub children: Option<Vec<Node>>,
}

/// An invocable unit evaluated at render time.
#[derive(Clone, Debug)]
pub struct Component {
    pub kind: ComponentKind,
    pub attrs: Attributes,
    pub children: Option<Vec<Node>>,
}

#[derive(Clone)]
pub enum ComponentKind {
    /// Deliver buffered output before the rest of the tree is computed.
    Flush,
    Invoke(ComponentFn),
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Flush => f.write_str("Flush"),
            ComponentKind::Invoke(_) => f.write_str("Invoke(..)"),
        }
    }
}

/// Attribute value with explicit output rules per variant.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum AttributeValue {
    /// `null` / `undefined`: the attribute is omitted.
    #[default]
    Absent,
    /// `true` renders the bare name, `false` omits the attribute.
    Bool(bool),
    Str(String),
    Number(f64),
    /// Structured value written as a JSON literal.
    Json(serde_json::Value),
    /// Resolved for the viewer's locale before output.
    Locale(LocaleText),
}

/// Ordered attribute mapping. Setting an existing name replaces its value in
/// place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let index = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

/// What a component function receives: its attributes plus the reserved
/// `children` entry.
#[derive(Debug, Clone, Copy)]
pub struct Props<'a> {
    pub attrs: &'a Attributes,
    pub children: Option<&'a [Node]>,
}

impl<'a> Props<'a> {
    pub fn get(&self, name: &str) -> Option<&'a AttributeValue> {
        self.attrs.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&'a str> {
        match self.attrs.get(name)? {
            AttributeValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when the attribute is present and truthy.
    pub fn flag(&self, name: &str) -> bool {
        match self.attrs.get(name) {
            None | Some(AttributeValue::Absent) | Some(AttributeValue::Bool(false)) => false,
            Some(AttributeValue::Number(n)) => *n != 0.0 && !n.is_nan(),
            Some(AttributeValue::Str(s)) => !s.is_empty(),
            Some(AttributeValue::Json(v)) => {
                !matches!(v, serde_json::Value::Null | serde_json::Value::Bool(false))
            }
            Some(_) => true,
        }
    }

    pub fn children(&self) -> &'a [Node] {
        self.children.unwrap_or(&[])
    }

    /// Children wrapped as a fragment, for passing them on unchanged.
    pub fn children_node(&self) -> Node {
        match self.children {
            Some(children) => Node::Fragment(children.to_vec()),
            None => Node::Empty,
        }
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn raw(markup: impl Into<String>) -> Self {
        Node::Raw(markup.into())
    }

    pub fn number(value: impl Into<f64>) -> Self {
        Node::Number(value.into())
    }

    pub fn fragment<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Node::Fragment(children.into_iter().map(Into::into).collect())
    }

    /// The reserved flush marker.
    pub fn flush() -> Self {
        Node::Component(Component {
            kind: ComponentKind::Flush,
            attrs: Attributes::new(),
            children: None,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

/// Start building an element from its selector.
pub fn el(selector: impl Into<String>) -> Element {
    Element {
        selector: selector.into(),
        attrs: Attributes::new(),
        children: None,
    }
}

impl Element {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn attrs(mut self, attrs: Attributes) -> Self {
        for (name, value) in attrs.0 {
            self.attrs.set(name, value);
        }
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(children.into_iter().map(Into::into));
        self
    }
}

/// Wrap a function as a component node builder.
pub fn component<F>(f: F) -> Component
where
    F: Fn(&Props<'_>, &mut Context) -> Result<Node, ComponentError> + Send + Sync + 'static,
{
    Component {
        kind: ComponentKind::Invoke(Arc::new(f)),
        attrs: Attributes::new(),
        children: None,
    }
}

impl Component {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(children.into_iter().map(Into::into));
        self
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Component> for Node {
    fn from(component: Component) -> Self {
        Node::Component(component)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<&String> for Node {
    fn from(text: &String) -> Self {
        Node::Text(text.clone())
    }
}

impl From<bool> for Node {
    fn from(_: bool) -> Self {
        Node::Empty
    }
}

impl From<Vec<Node>> for Node {
    fn from(children: Vec<Node>) -> Self {
        Node::Fragment(children)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map_or(Node::Empty, Into::into)
    }
}

macro_rules! number_conversions {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Node::Number(value as f64)
                }
            }

            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    AttributeValue::Number(value as f64)
                }
            }
        )*
    };
}

number_conversions!(i32, i64, u32, u64, usize, f32, f64);

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        AttributeValue::Str(value.clone())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<LocaleText> for AttributeValue {
    fn from(value: LocaleText) -> Self {
        AttributeValue::Locale(value)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        AttributeValue::Json(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeValue::Absent, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_set_replaces_in_place() {
        let mut attrs = Attributes::new().with("a", 1).with("b", "x");
        attrs.set("a", true);
        let names: Vec<_> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(attrs.get("a"), Some(&AttributeValue::Bool(true)));
    }

    #[test]
    fn test_attributes_remove() {
        let mut attrs: Attributes = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(attrs.remove("a"), Some(AttributeValue::Str("1".into())));
        assert_eq!(attrs.remove("a"), None);
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_option_conversions() {
        assert!(Node::from(None::<&str>).is_empty());
        assert_eq!(AttributeValue::from(None::<String>), AttributeValue::Absent);
        assert_eq!(AttributeValue::from(Some("x")), AttributeValue::Str("x".into()));
    }

    #[test]
    fn test_props_flag_truthiness() {
        let attrs = Attributes::new()
            .with("on", true)
            .with("off", false)
            .with("zero", 0)
            .with("empty", "")
            .with("word", "yes");
        let props = Props {
            attrs: &attrs,
            children: None,
        };
        assert!(props.flag("on"));
        assert!(!props.flag("off"));
        assert!(!props.flag("zero"));
        assert!(!props.flag("empty"));
        assert!(props.flag("word"));
        assert!(!props.flag("missing"));
        assert!(props.children().is_empty());
    }

    #[test]
    fn test_element_builder_collects_children() {
        let element = el("ul").child(el("li").child("a")).children(["b", "c"]);
        assert_eq!(element.children.as_ref().map(Vec::len), Some(3));
    }
}
