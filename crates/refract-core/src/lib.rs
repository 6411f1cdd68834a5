//! Refract core: a small declarative UI runtime.
//!
//! A component function describes its interface as an immutable tree
//! of [`VNode`]s. Mounting the root component materializes that tree
//! into an external display tree behind the [`HostTree`] adapter.
//! State written through a [`Setter`] re-renders the root synchronously
//! and patches the host tree by positional diffing, reusing host nodes
//! whose identity did not change.
//!
//! ```
//! use refract_core::{children, el, mount, HostTree, MemoryHost, Props, Scope, VNode};
//!
//! fn app(scope: &mut Scope<'_>, _props: &Props) -> VNode {
//!     let (count, set_count) = scope.use_state(0_i32);
//!     el(
//!         "div",
//!         Props::new(),
//!         children![
//!             el("h1", Props::new(), children![format!("Count: {count}")]),
//!             el(
//!                 "button",
//!                 Props::new().on("click", move || set_count.set(count + 1)),
//!                 children!["Increment"],
//!             ),
//!         ],
//!     )
//! }
//!
//! let mut host = MemoryHost::new();
//! let anchor = host.create_element("root")?;
//! let root = mount(host, anchor, app)?;
//! root.with_host(|host| assert!(host.dump_tree(anchor).contains("Count: 0")));
//! # Ok::<(), refract_core::HostError>(())
//! ```

mod host;
mod props;
mod renderer;
mod state;
mod vnode;

pub use host::{HostError, HostId, HostOp, HostTree, MemoryHost};
pub use props::{normalize_event_name, AttrValue, EventHandler, PropValue, Props};
pub use renderer::{mount, mount_with, RenderRoot, RootOptions};
pub use state::{Scope, Setter};
pub use vnode::{component, el, ComponentFn, IntoChild, Tag, VElement, VNode};
