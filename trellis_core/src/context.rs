// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mounted render roots.
//!
//! A [`Context`] binds a [`RenderTree`] to a widget host and an [`Engine`].
//! Its root node sizes itself from the engine's viewport and composes under
//! the engine's root transform; every attached node below it is wired as
//!
//! ```text
//!  parent size ──┐
//!                ├─ lift2 ─▶ size ──┐
//!  size spec ────┘                  │
//!  parent layout ──┐                │
//!  local layout ───┼─ lift3 ◀───────┘
//!                  ▼
//!               layout
//! ```
//!
//! Surface nodes additionally mark a dirty channel whenever their size or
//! layout emits. One flush task per frame, queued on the engine's dirty
//! phase, drains the marks, allocates widgets on first use and writes the
//! changed properties through a [`WidgetOutput`] per widget.
//!
//! Intrinsic axes close a loop through the host: a size commit that reads a
//! new measurement stores it and re-resolves the node, which settles within
//! the same frame because both the resolver and the commit layer skip
//! unchanged values.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::{Size, Vec2};
use understory_dirty::{Channel, CycleHandling, DirtyTracker};

use crate::commit::{CommitConfig, WidgetOutput};
use crate::dirty;
use crate::engine::Engine;
use crate::error::NodeError;
use crate::events::{ListenerId, NodeEvent, Notifier};
use crate::host::{SharedHost, WidgetHost, WidgetId, WidgetProperty};
use crate::layout::{LayoutSpec, compose_layout};
use crate::node::{Binding, LayoutKey, SizeKey, SpecNode, SpecValue};
use crate::size::{Dimension, NodeSize, SizeResolver, SizeSpec};
use crate::stream::{Stream, Subscription, SubscriptionSet, lift2, lift3};
use crate::transform::{Transform, TransformParts};
use crate::tree::{NodeId, RenderTree};

/// A render root mounted on a widget host.
pub struct Context {
    shared: Rc<Shared>,
    tree: RenderTree,
    root: NodeId,
    root_size: Stream<NodeSize>,
    root_parent_layout: Stream<LayoutSpec>,
    engine_subs: SubscriptionSet,
    mounted: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("nodes", &self.tree.len())
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

/// State reachable from stream listeners and queued tasks.
struct Shared {
    engine: Engine,
    host: SharedHost,
    commits: RefCell<CommitQueue>,
    events: Notifier<(NodeId, NodeEvent)>,
}

struct CommitQueue {
    dirty: DirtyTracker<u32>,
    surfaces: BTreeMap<u32, Surface>,
    container: WidgetId,
    config: CommitConfig,
    flush_scheduled: bool,
}

struct Surface {
    node: NodeId,
    kind: String,
    widget: Option<WidgetId>,
    output: WidgetOutput,
    size: Stream<NodeSize>,
    layout: Stream<LayoutSpec>,
    spec: Stream<SizeSpec>,
    measured: Rc<Cell<Option<Size>>>,
}

/// Work that must run after every borrow is released.
enum Followup {
    Notify(NodeId, NodeEvent),
    Remeasure(Stream<SizeSpec>),
}

impl Context {
    /// Mounts a new render root whose widgets are allocated inside
    /// `container`, and registers it with `engine`.
    #[must_use]
    pub fn new(engine: &Engine, host: SharedHost, container: WidgetId, config: CommitConfig) -> Self {
        let shared = Rc::new(Shared {
            engine: engine.clone(),
            host,
            commits: RefCell::new(CommitQueue {
                dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
                surfaces: BTreeMap::new(),
                container,
                config,
                flush_scheduled: false,
            }),
            events: Notifier::new(),
        });

        let mut tree = RenderTree::new();
        let root = tree.create_node(None);

        let root_size = Stream::new();
        let mut engine_subs = SubscriptionSet::new();
        let target = root_size.downgrade();
        engine_subs.push(engine.viewport().subscribe(move |phase, size: &Size| {
            if let Some(target) = target.upgrade() {
                target.emit(phase, Some(NodeSize::from(*size)));
            }
        }));
        let root_parent_layout = lift2(
            &engine.root_transform(),
            &root_size,
            |transform: &Transform, size: &NodeSize| {
                Some(LayoutSpec {
                    transform: *transform,
                    ..LayoutSpec::root(*size)
                })
            },
        );

        let mut cx = Self {
            shared,
            tree,
            root,
            root_size,
            root_parent_layout,
            engine_subs,
            mounted: true,
        };
        let (size, layout) = (cx.root_size.clone(), cx.root_parent_layout.clone());
        cx.wire(root, &size, &layout);

        // A viewport settled before this root existed is not replayed.
        if !cx.root_size.is_open() {
            if let Some(viewport) = engine.viewport().get() {
                cx.root_size.set(NodeSize::from(viewport));
            }
        }
        engine.register_root();
        cx
    }

    /// The engine this root is registered with.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.shared.engine
    }

    /// The root node. It fills the viewport unless sized otherwise.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read access to the node storage.
    #[must_use]
    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    /// Whether the root is still mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // -- Tree building -------------------------------------------------------

    /// Creates a detached grouping node.
    pub fn create_node(&mut self) -> NodeId {
        self.tree.create_node(None)
    }

    /// Creates a detached surface node backed by a widget of `kind`.
    pub fn create_surface(&mut self, kind: &str) -> NodeId {
        self.tree.create_node(Some(kind))
    }

    /// Appends `child` (and its subtree) under `parent`.
    ///
    /// If `parent` is attached to the root, the subtree is wired and
    /// resolves on the next post-tick phase.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `child` already has a parent, or
    /// `child` is an ancestor of `parent`.
    pub fn add(&mut self, parent: NodeId, child: NodeId) {
        self.tree.add_child(parent, child);
        if self.tree.size_stream(parent).is_none() {
            return;
        }
        for id in self.tree.descendants(child) {
            let Some(parent) = self.tree.parent(id) else {
                continue;
            };
            let (Some(size), Some(layout)) = (
                self.tree.size_stream(parent).cloned(),
                self.tree.layout_stream(parent).cloned(),
            ) else {
                continue;
            };
            self.wire(id, &size, &layout);
        }

        let spec = self.tree.size_node(child).stream().downgrade();
        self.shared.engine.defer_post_tick(move || {
            if let Some(spec) = spec.upgrade() {
                spec.touch();
            }
        });
    }

    /// Removes `node` and its subtree, releasing every widget in it.
    ///
    /// All handles into the subtree go stale.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or `node` is the root.
    pub fn remove(&mut self, node: NodeId) {
        self.tree.validate(node);
        assert!(node != self.root, "cannot remove the root node; unmount instead");
        self.destroy_subtree(node);
    }

    /// Removes every node, releases all widgets, and deregisters from the
    /// engine. Further use of this context's handles panics.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.destroy_subtree(self.root);
        self.root_parent_layout.detach();
        self.engine_subs.clear();
        self.shared.engine.deregister_root();
    }

    // -- Setters -------------------------------------------------------------

    /// Sets the per-axis sizing policy.
    pub fn set_size(&mut self, node: NodeId, size: impl Into<Binding<[Dimension; 2]>>) {
        self.tree.size_node_mut(node).set_size(size);
    }

    /// Sets the per-axis fraction of the parent size.
    pub fn set_proportions(
        &mut self,
        node: NodeId,
        proportions: impl Into<Binding<[Option<f64>; 2]>>,
    ) {
        self.tree.size_node_mut(node).set_proportions(proportions);
    }

    /// Sets the per-axis margins.
    pub fn set_margins(&mut self, node: NodeId, margins: impl Into<Binding<[f64; 2]>>) {
        self.tree.size_node_mut(node).set_margins(margins);
    }

    /// Sets the `width / height` ratio for aspect-derived axes.
    pub fn set_aspect_ratio(&mut self, node: NodeId, ratio: impl Into<Binding<Option<f64>>>) {
        self.tree.size_node_mut(node).set_aspect_ratio(ratio);
    }

    /// Sets the local transform.
    pub fn set_transform(&mut self, node: NodeId, transform: impl Into<Binding<Transform>>) {
        self.tree.layout_node_mut(node).set_transform(transform);
    }

    /// Sets the local opacity. The widget's opacity is rewritten on the next
    /// commit even if the composed value is unchanged.
    pub fn set_opacity(&mut self, node: NodeId, opacity: impl Into<Binding<f64>>) {
        self.force_rewrite(node, LayoutKey::Opacity);
        self.tree.layout_node_mut(node).set_opacity(opacity);
    }

    /// Sets the transform origin as a fraction of the node size. The widget's
    /// origin is rewritten on the next commit.
    pub fn set_origin(&mut self, node: NodeId, origin: impl Into<Binding<Vec2>>) {
        self.force_rewrite(node, LayoutKey::Origin);
        self.tree.layout_node_mut(node).set_origin(origin);
    }

    /// Sets the alignment point as a fraction of the parent size.
    pub fn set_align(&mut self, node: NodeId, align: impl Into<Binding<Option<Vec2>>>) {
        self.tree.layout_node_mut(node).set_align(align);
    }

    /// Sets one input by its boundary key name.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::UnknownKey`] for a key neither node kind has, and
    /// [`NodeError::ValueMismatch`] if `value` has the wrong shape.
    pub fn set_key(&mut self, node: NodeId, key: &str, value: SpecValue) -> Result<(), NodeError> {
        if SizeKey::parse(key).is_ok() {
            return self.tree.size_node_mut(node).set_key(key, value);
        }
        let layout_key = LayoutKey::parse(key)?;
        self.tree.layout_node_mut(node).set_key(key, value)?;
        self.force_rewrite(node, layout_key);
        Ok(())
    }

    // -- Queries -------------------------------------------------------------

    /// The last resolved size of a node.
    #[must_use]
    pub fn size(&self, node: NodeId) -> Option<NodeSize> {
        self.tree.size(node)
    }

    /// The last composed absolute layout of a node.
    #[must_use]
    pub fn layout(&self, node: NodeId) -> Option<LayoutSpec> {
        self.tree.layout(node)
    }

    /// The widget backing a surface node, once deployed.
    #[must_use]
    pub fn widget(&self, node: NodeId) -> Option<WidgetId> {
        self.tree.validate(node);
        self.shared
            .commits
            .borrow()
            .surfaces
            .get(&node.idx)
            .and_then(|s| s.widget)
    }

    /// Registers a listener for surface lifecycle events.
    pub fn on_event(&self, mut listener: impl FnMut(NodeId, NodeEvent) + 'static) -> ListenerId {
        self.shared
            .events
            .listen(move |&(node, event): &(NodeId, NodeEvent)| listener(node, event))
    }

    /// Unregisters an event listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.events.remove(id)
    }

    // -- Internals -----------------------------------------------------------

    /// Builds the size and layout streams of `id` under the given parent
    /// streams.
    fn wire(&mut self, id: NodeId, parent_size: &Stream<NodeSize>, parent_layout: &Stream<LayoutSpec>) {
        let idx = id.idx;
        let spec = self.tree.size_node(id).stream().clone();
        let local = self.tree.layout_node(id).stream().clone();

        let measured = Rc::new(Cell::new(None));
        let last_measured = Rc::clone(&measured);
        let mut resolver = SizeResolver::new();
        let size = lift2(parent_size, &spec, move |parent: &NodeSize, spec: &SizeSpec| {
            resolver.resolve(spec, *parent, last_measured.get())
        });
        let layout = lift3(parent_layout, &local, &size, |parent, local, size: &NodeSize| {
            compose_layout(local, Some(parent), Some(*size))
        });

        let mut subs = SubscriptionSet::new();
        if let Some(kind) = self.tree.kind(id) {
            let kind = String::from(kind);
            subs.push(self.mark_on(&size, idx, dirty::SIZE));
            subs.push(self.mark_on(&layout, idx, dirty::LAYOUT));
            let mut commits = self.shared.commits.borrow_mut();
            let output = WidgetOutput::new(commits.config);
            commits.surfaces.insert(
                idx,
                Surface {
                    node: id,
                    kind,
                    widget: None,
                    output,
                    size: size.clone(),
                    layout: layout.clone(),
                    spec,
                    measured,
                },
            );
        }
        self.tree.set_outputs(idx, size, layout, subs);
    }

    fn mark_on<T: Clone + 'static>(
        &self,
        stream: &Stream<T>,
        idx: u32,
        channel: Channel,
    ) -> Subscription {
        let shared = Rc::downgrade(&self.shared);
        stream.subscribe(move |_, _| {
            if let Some(shared) = shared.upgrade() {
                shared.mark(idx, channel);
            }
        })
    }

    fn force_rewrite(&self, node: NodeId, key: LayoutKey) {
        self.tree.validate(node);
        let mut commits = self.shared.commits.borrow_mut();
        let Some(surface) = commits.surfaces.get_mut(&node.idx) else {
            return;
        };
        match key {
            LayoutKey::Opacity => surface.output.mark_opacity_dirty(),
            LayoutKey::Origin => surface.output.mark_origin_dirty(),
            LayoutKey::Transform | LayoutKey::Align => {}
        }
    }

    /// Destroys `node` and its descendants, children before parents.
    fn destroy_subtree(&mut self, node: NodeId) {
        let order = self.tree.descendants(node);
        let mut followups = Vec::new();
        for id in order.iter().rev() {
            self.shared.release(id.idx, &mut followups);
            self.tree.destroy_node(*id);
        }
        self.shared.run(followups);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl Shared {
    /// Marks `idx` dirty on `channel` and makes sure a flush is queued.
    fn mark(self: &Rc<Self>, idx: u32, channel: Channel) {
        let mut commits = self.commits.borrow_mut();
        commits.dirty.mark(idx, channel);
        if core::mem::replace(&mut commits.flush_scheduled, true) {
            return;
        }
        drop(commits);
        let shared = Rc::downgrade(self);
        self.engine.defer_dirty(move || {
            if let Some(shared) = shared.upgrade() {
                shared.flush();
            }
        });
    }

    /// Commits every marked surface: sizes first, then layouts.
    fn flush(&self) {
        let mut followups = Vec::new();
        {
            let mut commits = self.commits.borrow_mut();
            commits.flush_scheduled = false;
            let sizes: Vec<u32> = commits
                .dirty
                .drain(dirty::SIZE)
                .deterministic()
                .run()
                .collect();
            let layouts: Vec<u32> = commits
                .dirty
                .drain(dirty::LAYOUT)
                .deterministic()
                .run()
                .collect();
            let mut host = self.host.borrow_mut();
            for idx in sizes {
                commits.commit_size(&mut *host, idx, &mut followups);
            }
            for idx in layouts {
                commits.commit_layout(&mut *host, idx, &mut followups);
            }
        }
        self.run(followups);
    }

    /// Hides and deallocates the widget of `idx`, if it has one.
    fn release(&self, idx: u32, followups: &mut Vec<Followup>) {
        let mut commits = self.commits.borrow_mut();
        commits.dirty.remove_key(idx);
        let Some(surface) = commits.surfaces.remove(&idx) else {
            return;
        };
        let Some(widget) = surface.widget else {
            return;
        };
        let mut host = self.host.borrow_mut();
        host.set(widget, WidgetProperty::Visible(false));
        host.set(widget, WidgetProperty::Opacity(0.0));
        host.set(widget, WidgetProperty::Width(0.0));
        host.set(widget, WidgetProperty::Height(0.0));
        host.set(widget, WidgetProperty::Transform(TransformParts::IDENTITY));
        host.deallocate(widget);
        followups.push(Followup::Notify(surface.node, NodeEvent::Recall(widget)));
    }

    fn run(&self, followups: Vec<Followup>) {
        for followup in followups {
            match followup {
                Followup::Notify(node, event) => self.events.notify(&(node, event)),
                Followup::Remeasure(spec) => spec.touch(),
            }
        }
    }
}

impl CommitQueue {
    /// Returns the widget of `idx`, allocating and showing it on first use.
    fn deploy(
        &mut self,
        host: &mut dyn WidgetHost,
        idx: u32,
        followups: &mut Vec<Followup>,
    ) -> Option<WidgetId> {
        let container = self.container;
        let surface = self.surfaces.get_mut(&idx)?;
        if let Some(widget) = surface.widget {
            return Some(widget);
        }
        let widget = host.allocate(&surface.kind, container);
        host.set(widget, WidgetProperty::Visible(true));
        surface.widget = Some(widget);
        followups.push(Followup::Notify(surface.node, NodeEvent::Deploy(widget)));
        Some(widget)
    }

    fn commit_size(&mut self, host: &mut dyn WidgetHost, idx: u32, followups: &mut Vec<Followup>) {
        let Some(size) = self.surfaces.get(&idx).and_then(|s| s.size.get()) else {
            return;
        };
        let Some(widget) = self.deploy(host, idx, followups) else {
            return;
        };
        let Some(surface) = self.surfaces.get_mut(&idx) else {
            return;
        };
        let Some(effective) = surface.output.commit_size(host, widget, size) else {
            return;
        };
        followups.push(Followup::Notify(surface.node, NodeEvent::Resize(effective)));
        let intrinsic = size.width.is_intrinsic() || size.height.is_intrinsic();
        if intrinsic && surface.measured.get() != Some(effective) {
            surface.measured.set(Some(effective));
            followups.push(Followup::Remeasure(surface.spec.clone()));
        }
    }

    fn commit_layout(&mut self, host: &mut dyn WidgetHost, idx: u32, followups: &mut Vec<Followup>) {
        let Some(layout) = self.surfaces.get(&idx).and_then(|s| s.layout.get()) else {
            return;
        };
        let Some(widget) = self.deploy(host, idx, followups) else {
            return;
        };
        if let Some(surface) = self.surfaces.get_mut(&idx) {
            surface.output.commit_layout(host, widget, &layout);
        }
    }
}
