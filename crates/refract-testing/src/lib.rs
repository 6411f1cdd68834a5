//! Testing utilities for Refract applications.
//!
//! [`TestRoot`] mounts a component over the in-memory host and drives
//! it the way an embedder would: dispatching events, querying the tree
//! that resulted, and inspecting the exact host writes a pass made.

use refract_core::{
    mount_with, ComponentFn, EventHandler, HostId, HostOp, HostTree, MemoryHost, RenderRoot,
    RootOptions,
};

pub mod prelude {
    pub use crate::TestRoot;
    pub use refract_core::{children, component, el, Props, Scope, VNode};
}

/// A mounted application over [`MemoryHost`], with the anchor element
/// it was attached under.
pub struct TestRoot {
    root: RenderRoot<MemoryHost>,
    anchor: HostId,
}

impl TestRoot {
    /// Mounts `app` under a fresh `root` element with default options.
    pub fn mount(app: ComponentFn) -> TestRoot {
        Self::mount_with(app, RootOptions::default())
    }

    pub fn mount_with(app: ComponentFn, options: RootOptions) -> TestRoot {
        let mut host = MemoryHost::new();
        let anchor = host
            .create_element("root")
            .expect("creating the anchor cannot fail on an empty host");
        let root = mount_with(host, anchor, app, options).expect("initial mount failed");
        TestRoot { root, anchor }
    }

    pub fn anchor(&self) -> HostId {
        self.anchor
    }

    /// Render passes performed so far, the initial mount included.
    pub fn passes(&self) -> u64 {
        self.root.passes()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&MemoryHost) -> R) -> R {
        self.root.with_host(f)
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut MemoryHost) -> R) -> R {
        self.root.with_host_mut(f)
    }

    /// Fires the listener registered for `event` on `target`, if one
    /// exists. The handler is cloned out before it runs, so a setter
    /// inside it may re-enter the session safely.
    pub fn dispatch(&self, target: HostId, event: &str) -> bool {
        let handler: Option<EventHandler> = self.root.with_host(|host| host.listener(target, event));
        match handler {
            Some(handler) => {
                handler.call();
                true
            }
            None => false,
        }
    }

    /// Dispatches a `click` event, panicking when no listener is
    /// installed.
    pub fn click(&self, target: HostId) {
        assert!(
            self.dispatch(target, "click"),
            "no click listener on host node {target}"
        );
    }

    /// First node with the given element tag, in depth-first order
    /// from the anchor.
    pub fn find_by_tag(&self, tag: &str) -> Option<HostId> {
        self.root.with_host(|host| find_in(host, self.anchor, tag))
    }

    /// The node's own text, or the concatenated text of its direct
    /// text children.
    pub fn text_content(&self, id: HostId) -> String {
        self.root.with_host(|host| {
            if let Some(text) = host.text_of(id) {
                return text.to_string();
            }
            host.children_of(id)
                .iter()
                .filter_map(|child| host.text_of(*child))
                .collect()
        })
    }

    /// Structural dump of everything under the anchor.
    pub fn dump(&self) -> String {
        self.root.with_host(|host| host.dump_tree(self.anchor))
    }

    /// Drains the host's journal; call between actions to assert the
    /// writes one update produced.
    pub fn take_ops(&self) -> Vec<HostOp> {
        self.root.with_host_mut(|host| host.take_ops())
    }
}

fn find_in(host: &MemoryHost, from: HostId, tag: &str) -> Option<HostId> {
    if host.tag_of(from) == Some(tag) {
        return Some(from);
    }
    for child in host.children_of(from) {
        if let Some(found) = find_in(host, *child, tag) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use refract_core::{children, el, Props, Scope, VNode};

    fn hello(_scope: &mut Scope<'_>, _props: &Props) -> VNode {
        el("p", Props::new(), children!["hello"])
    }

    #[test]
    fn mounts_and_queries_the_tree() {
        let root = TestRoot::mount(hello);
        let p = root.find_by_tag("p").unwrap();
        assert_eq!(root.text_content(p), "hello");
        assert!(root.dump().contains("\"hello\""));
        assert_eq!(root.passes(), 1);
    }

    #[test]
    fn dispatch_reports_missing_listeners() {
        let root = TestRoot::mount(hello);
        let p = root.find_by_tag("p").unwrap();
        assert!(!root.dispatch(p, "click"));
    }

    #[test]
    fn find_misses_return_none() {
        let root = TestRoot::mount(hello);
        assert_eq!(root.find_by_tag("table"), None);
    }
}
