// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node lifecycle notifications.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Size;

use crate::host::WidgetId;

/// Something that happened to a surface node's widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeEvent {
    /// The committed size changed. Intrinsic axes carry the host measurement.
    Resize(Size),
    /// A widget was allocated and shown.
    Deploy(WidgetId),
    /// The widget was hidden and released.
    Recall(WidgetId),
}

/// Handle to a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

/// A list of callbacks invoked in registration order.
pub struct Notifier<E> {
    listeners: RefCell<Vec<(ListenerId, Callback<E>)>>,
    next_id: Cell<u64>,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<E> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl<E> Notifier<E> {
    /// Creates a notifier with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`.
    pub fn listen(&self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let callback: Callback<E> = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((id, callback));
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    /// Calls every listener with `event`.
    ///
    /// Listeners may register or remove listeners; changes apply from the
    /// next notification.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, c)| Rc::clone(c))
            .collect();
        for callback in snapshot {
            if let Ok(mut callback) = callback.try_borrow_mut() {
                callback(event);
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_run_in_order_until_removed() {
        let notifier = Notifier::<NodeEvent>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        let first = notifier.listen(move |e| l.borrow_mut().push((1, *e)));
        let l = Rc::clone(&log);
        notifier.listen(move |e| l.borrow_mut().push((2, *e)));

        notifier.notify(&NodeEvent::Deploy(WidgetId(7)));
        assert!(notifier.remove(first));
        assert!(!notifier.remove(first));
        notifier.notify(&NodeEvent::Recall(WidgetId(7)));

        assert_eq!(
            *log.borrow(),
            [
                (1, NodeEvent::Deploy(WidgetId(7))),
                (2, NodeEvent::Deploy(WidgetId(7))),
                (2, NodeEvent::Recall(WidgetId(7))),
            ]
        );
    }

    #[test]
    fn listener_added_during_notify_waits_for_next_event() {
        let notifier = Rc::new(Notifier::<u32>::new());
        let hits = Rc::new(Cell::new(0));

        let n = Rc::clone(&notifier);
        let h = Rc::clone(&hits);
        notifier.listen(move |_| {
            let h = Rc::clone(&h);
            n.listen(move |_| h.set(h.get() + 1));
        });

        notifier.notify(&1);
        assert_eq!(hits.get(), 0);
        notifier.notify(&2);
        assert_eq!(hits.get(), 1);
    }
}
