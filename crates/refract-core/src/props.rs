use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// Scalar value of an attribute prop. Hosts receive attributes as
/// strings; the typed form is kept so the reconciler can compare
/// values without formatting them first.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(value) => f.write_str(value),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Float(value) => write!(f, "{value}"),
            AttrValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Event callback attached to an element. Clones share the underlying
/// closure, so a handler built once keeps its identity when the same
/// `Props` value is cloned into several passes.
#[derive(Clone)]
pub struct EventHandler(Rc<RefCell<dyn FnMut()>>);

impl EventHandler {
    pub fn new(handler: impl FnMut() + 'static) -> Self {
        EventHandler(Rc::new(RefCell::new(handler)))
    }

    pub fn call(&self) {
        let mut handler = self.0.borrow_mut();
        (*handler)();
    }

    pub fn ptr_eq(a: &EventHandler, b: &EventHandler) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

/// One prop entry: a host attribute or an event listener. The split is
/// decided while the props are built, so the reconciler matches on the
/// variant instead of sniffing name prefixes.
#[derive(Debug, Clone)]
pub enum PropValue {
    Attribute(AttrValue),
    Listener(EventHandler),
}

/// Ordered name-to-entry mapping attached to an element node. Entries
/// keep insertion order, which keeps the host mutation sequence
/// deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: IndexMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute entry. Inserting under an existing name
    /// overwrites the value but keeps the original position.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.entries
            .insert(name.into(), PropValue::Attribute(value.into()));
        self
    }

    /// Adds an event listener. `name` may be a bare event name
    /// ("click") or the camel-case handler convention ("onClick");
    /// see [`normalize_event_name`] for the exact rule.
    pub fn on(self, name: &str, handler: impl FnMut() + 'static) -> Self {
        self.listener(name, EventHandler::new(handler))
    }

    /// Adds a pre-built listener, keeping the callback's identity.
    pub fn listener(mut self, name: &str, handler: EventHandler) -> Self {
        self.entries
            .insert(normalize_event_name(name), PropValue::Listener(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Lower-cases an event name, stripping a leading `on` when an
/// upper-case letter follows it: `onClick` and `Click` both become
/// `click`, while names that genuinely start with `on` (`online`)
/// pass through unchanged.
pub fn normalize_event_name(name: &str) -> String {
    let stripped = match name.strip_prefix("on") {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => rest,
        _ => name,
    };
    stripped.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn strips_handler_prefix_only_before_upper_case() {
        assert_eq!(normalize_event_name("onClick"), "click");
        assert_eq!(normalize_event_name("Click"), "click");
        assert_eq!(normalize_event_name("click"), "click");
        assert_eq!(normalize_event_name("onDoubleClick"), "doubleclick");
        assert_eq!(normalize_event_name("online"), "online");
    }

    #[test]
    fn attribute_values_format_as_host_strings() {
        assert_eq!(AttrValue::from("x").to_string(), "x");
        assert_eq!(AttrValue::from(3_i64).to_string(), "3");
        assert_eq!(AttrValue::from(1.5).to_string(), "1.5");
        assert_eq!(AttrValue::from(true).to_string(), "true");
    }

    #[test]
    fn overwriting_an_entry_keeps_its_position() {
        let props = Props::new()
            .attr("id", "a")
            .attr("class", "b")
            .attr("id", "c");
        let names: Vec<&str> = props.names().collect();
        assert_eq!(names, ["id", "class"]);
        match props.get("id") {
            Some(PropValue::Attribute(value)) => assert_eq!(value, &AttrValue::from("c")),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn listener_entries_are_stored_under_the_event_name() {
        let props = Props::new().on("onClick", || {});
        assert!(matches!(props.get("click"), Some(PropValue::Listener(_))));
        assert!(props.get("onClick").is_none());
    }

    #[test]
    fn handler_clones_share_the_same_closure() {
        let hits = Rc::new(Cell::new(0));
        let handler = EventHandler::new({
            let hits = hits.clone();
            move || hits.set(hits.get() + 1)
        });
        let clone = handler.clone();
        clone.call();
        handler.call();
        assert_eq!(hits.get(), 2);
        assert!(EventHandler::ptr_eq(&handler, &clone));
    }
}
