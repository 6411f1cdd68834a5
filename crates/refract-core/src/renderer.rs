use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::host::{HostError, HostId, HostTree};
use crate::props::{PropValue, Props};
use crate::state::{Driver, Scope, SlotTable};
use crate::vnode::{ComponentFn, Tag, VNode};

/// Committed shape of one tree position: what the previous pass
/// constructed, decorated with the host node it occupies. Component
/// positions keep their resolved output so the next pass has a
/// concrete subtree to diff against.
enum Instance {
    Text {
        id: HostId,
        value: String,
    },
    Element {
        id: HostId,
        tag: String,
        props: Props,
        children: Vec<Instance>,
    },
    Component {
        func: ComponentFn,
        output: Box<Instance>,
    },
}

impl Instance {
    fn host_id(&self) -> HostId {
        match self {
            Instance::Text { id, .. } => *id,
            Instance::Element { id, .. } => *id,
            Instance::Component { output, .. } => output.host_id(),
        }
    }
}

/// Session configuration. With `strict_hooks` on (the default) the
/// session panics when the number of hook calls changes between
/// passes, since call-order drift corrupts slot assignment; turning it
/// off restores silent tolerance.
#[derive(Debug, Clone, Copy)]
pub struct RootOptions {
    pub strict_hooks: bool,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self { strict_hooks: true }
    }
}

struct RootInner<H: HostTree> {
    host: RefCell<H>,
    anchor: HostId,
    root: ComponentFn,
    options: RootOptions,
    slots: RefCell<SlotTable>,
    committed: RefCell<Option<Instance>>,
    rendering: Cell<bool>,
    pending: RefCell<VecDeque<(usize, Rc<dyn Any>)>>,
    passes: Cell<u64>,
    weak_self: Weak<RootInner<H>>,
}

/// Resets the rendering flag when a pass ends, on the error and panic
/// paths included.
struct RenderGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> RenderGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl<H: HostTree + 'static> RootInner<H> {
    /// Runs one pass, then drains writes queued by setters that fired
    /// while rendering. Each queued write gets its own full pass;
    /// writes are never batched.
    fn flush(&self) -> Result<(), HostError> {
        self.render_pass()?;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some((slot, value)) = next else {
                break;
            };
            self.slots.borrow_mut().write(slot, value);
            self.render_pass()?;
        }
        Ok(())
    }

    fn render_pass(&self) -> Result<(), HostError> {
        let pass = self.passes.get() + 1;
        self.passes.set(pass);
        log::trace!("render pass {pass}");

        let guard = RenderGuard::enter(&self.rendering);
        self.slots.borrow_mut().begin_pass();

        let driver: Weak<dyn Driver> = self.weak_self.clone();
        let mut scope = Scope::new(&self.slots, driver);
        let tree = (self.root)(&mut scope, &Props::new());

        let previous = self.committed.borrow_mut().take();
        let mut host = self.host.borrow_mut();
        let next = match previous {
            Some(previous) => patch(&mut *host, &mut scope, self.anchor, 0, previous, &tree)?,
            None => {
                let instance = materialize(&mut *host, &mut scope, &tree)?;
                host.append_child(self.anchor, instance.host_id())?;
                instance
            }
        };
        drop(host);
        *self.committed.borrow_mut() = Some(next);

        let (previous_count, observed) = self.slots.borrow_mut().end_pass();
        if self.options.strict_hooks {
            if let Some(expected) = previous_count {
                if expected != observed {
                    panic!(
                        "state hook count changed between render passes ({expected} then {observed}); hooks must run in the same order every render"
                    );
                }
            }
        }
        drop(guard);
        Ok(())
    }
}

impl<H: HostTree + 'static> Driver for RootInner<H> {
    fn apply_set(&self, slot: usize, value: Rc<dyn Any>) {
        if self.rendering.get() {
            self.pending.borrow_mut().push_back((slot, value));
            return;
        }
        self.slots.borrow_mut().write(slot, value);
        if let Err(err) = self.flush() {
            log::error!("re-render after state update failed: {err}");
        }
    }
}

/// Handle to a mounted application. Clones share the session; the
/// session (slot store, committed tree, host adapter) lives until the
/// last clone is dropped, after which surviving setters become
/// no-ops.
pub struct RenderRoot<H: HostTree> {
    inner: Rc<RootInner<H>>,
}

impl<H: HostTree> Clone for RenderRoot<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: HostTree + 'static> RenderRoot<H> {
    /// Runs `f` with shared access to the host tree.
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.host.borrow())
    }

    /// Runs `f` with exclusive access to the host tree. Do not invoke
    /// event handlers from inside `f`: a handler that fires a setter
    /// re-enters the session while the borrow is held. Clone the
    /// handler out first, the way refract-testing dispatches.
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }

    pub fn anchor(&self) -> HostId {
        self.inner.anchor
    }

    /// Render passes performed so far, the initial mount included.
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }
}

/// Mounts `root` under `anchor` and performs the initial render pass
/// before returning. The session takes ownership of the host adapter.
/// The anchor is assumed to have no other children; the mounted tree
/// occupies its first child position.
pub fn mount<H: HostTree + 'static>(
    host: H,
    anchor: HostId,
    root: ComponentFn,
) -> Result<RenderRoot<H>, HostError> {
    mount_with(host, anchor, root, RootOptions::default())
}

pub fn mount_with<H: HostTree + 'static>(
    host: H,
    anchor: HostId,
    root: ComponentFn,
    options: RootOptions,
) -> Result<RenderRoot<H>, HostError> {
    let inner = Rc::new_cyclic(|weak| RootInner {
        host: RefCell::new(host),
        anchor,
        root,
        options,
        slots: RefCell::new(SlotTable::new()),
        committed: RefCell::new(None),
        rendering: Cell::new(false),
        pending: RefCell::new(VecDeque::new()),
        passes: Cell::new(0),
        weak_self: weak.clone(),
    });
    inner.flush()?;
    Ok(RenderRoot { inner })
}

/// Builds host nodes for `node` bottom-up and returns the detached
/// instance; the caller attaches it. Component tags resolve by
/// invoking the function and materializing its output.
fn materialize<H: HostTree>(
    host: &mut H,
    scope: &mut Scope<'_>,
    node: &VNode,
) -> Result<Instance, HostError> {
    match node {
        VNode::Text(value) => {
            let id = host.create_text(value)?;
            Ok(Instance::Text {
                id,
                value: value.clone(),
            })
        }
        VNode::Element(element) => match &element.tag {
            Tag::Primitive(name) => {
                let id = host.create_element(name)?;
                apply_props(host, id, &element.props)?;
                let mut children = Vec::with_capacity(element.children.len());
                for child in &element.children {
                    let instance = materialize(host, scope, child)?;
                    host.append_child(id, instance.host_id())?;
                    children.push(instance);
                }
                Ok(Instance::Element {
                    id,
                    tag: name.clone(),
                    props: element.props.clone(),
                    children,
                })
            }
            Tag::Component(func) => {
                let rendered = func(scope, &element.props);
                let output = materialize(host, scope, &rendered)?;
                Ok(Instance::Component {
                    func: *func,
                    output: Box::new(output),
                })
            }
        },
    }
}

/// Patches the host node at `index` under `parent` to match `new`,
/// reusing the committed instance where identity allows. Text
/// mismatches and identity changes replace the host subtree wholesale;
/// matching identity updates in place.
fn patch<H: HostTree>(
    host: &mut H,
    scope: &mut Scope<'_>,
    parent: HostId,
    index: usize,
    old: Instance,
    new: &VNode,
) -> Result<Instance, HostError> {
    match (old, new) {
        (Instance::Text { id, value }, VNode::Text(text)) => {
            if value == *text {
                Ok(Instance::Text { id, value })
            } else {
                replace(host, scope, parent, index, new)
            }
        }
        (Instance::Text { .. }, VNode::Element(_))
        | (Instance::Element { .. } | Instance::Component { .. }, VNode::Text(_)) => {
            replace(host, scope, parent, index, new)
        }
        (
            Instance::Element {
                id,
                tag,
                props,
                children,
            },
            VNode::Element(element),
        ) => match &element.tag {
            Tag::Primitive(name) if *name == tag => {
                diff_props(host, id, &props, &element.props)?;
                let children = reconcile_children(host, scope, id, children, &element.children)?;
                Ok(Instance::Element {
                    id,
                    tag,
                    props: element.props.clone(),
                    children,
                })
            }
            _ => replace(host, scope, parent, index, new),
        },
        (Instance::Component { func, output }, VNode::Element(element)) => match &element.tag {
            // The same component at the same position is re-invoked
            // with the new props and its output diffed against what it
            // produced last pass; components are transparent in the
            // host tree.
            Tag::Component(next) if *next as usize == func as usize => {
                let rendered = next(scope, &element.props);
                let output = patch(host, scope, parent, index, *output, &rendered)?;
                Ok(Instance::Component {
                    func,
                    output: Box::new(output),
                })
            }
            _ => replace(host, scope, parent, index, new),
        },
    }
}

fn replace<H: HostTree>(
    host: &mut H,
    scope: &mut Scope<'_>,
    parent: HostId,
    index: usize,
    new: &VNode,
) -> Result<Instance, HostError> {
    let instance = materialize(host, scope, new)?;
    host.replace_child(parent, index, instance.host_id())?;
    Ok(instance)
}

/// Children match purely by index. Constructed child lists have no
/// holes, so removals only occur as a trailing run; they are issued in
/// descending order to keep each index valid while the host list
/// shrinks.
fn reconcile_children<H: HostTree>(
    host: &mut H,
    scope: &mut Scope<'_>,
    parent: HostId,
    old: Vec<Instance>,
    new: &[VNode],
) -> Result<Vec<Instance>, HostError> {
    let old_len = old.len();
    let new_len = new.len();
    let mut committed = Vec::with_capacity(new_len);
    let mut previous = old.into_iter();

    for (index, node) in new.iter().enumerate() {
        match previous.next() {
            Some(old_child) => {
                committed.push(patch(host, scope, parent, index, old_child, node)?);
            }
            None => {
                let instance = materialize(host, scope, node)?;
                host.append_child(parent, instance.host_id())?;
                committed.push(instance);
            }
        }
    }
    for index in (new_len..old_len).rev() {
        host.remove_child(parent, index)?;
    }
    Ok(committed)
}

/// First mount of an element's props: everything is written.
fn apply_props<H: HostTree>(host: &mut H, id: HostId, props: &Props) -> Result<(), HostError> {
    for (name, value) in props.iter() {
        match value {
            PropValue::Attribute(value) => host.set_attribute(id, name, &value.to_string())?,
            PropValue::Listener(handler) => host.add_listener(id, name, handler.clone())?,
        }
    }
    Ok(())
}

/// Removed names drop their attribute or listener. Listeners are
/// always reinstalled without comparing callback identity; attributes
/// are rewritten only when the value changed.
fn diff_props<H: HostTree>(
    host: &mut H,
    id: HostId,
    old: &Props,
    new: &Props,
) -> Result<(), HostError> {
    for (name, value) in old.iter() {
        if new.get(name).is_none() {
            match value {
                PropValue::Attribute(_) => host.remove_attribute(id, name)?,
                PropValue::Listener(_) => host.remove_listener(id, name)?,
            }
        }
    }
    for (name, value) in new.iter() {
        match value {
            PropValue::Listener(handler) => {
                // Clear whatever held this name before; a pass must
                // never stack a second listener under one event.
                match old.get(name) {
                    Some(PropValue::Listener(_)) => host.remove_listener(id, name)?,
                    Some(PropValue::Attribute(_)) => host.remove_attribute(id, name)?,
                    None => {}
                }
                host.add_listener(id, name, handler.clone())?;
            }
            PropValue::Attribute(value) => match old.get(name) {
                Some(PropValue::Attribute(previous)) if previous == value => {}
                Some(PropValue::Listener(_)) => {
                    host.remove_listener(id, name)?;
                    host.set_attribute(id, name, &value.to_string())?;
                }
                _ => host.set_attribute(id, name, &value.to_string())?,
            },
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
