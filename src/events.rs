//! Named event registry with ordered, failure-isolated dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Event emitted once per fired frame.
pub const UPDATE: &str = "update";

type Listener<A> = Box<dyn FnMut(&A) -> Result<(), String>>;

/// A listener failure caught during dispatch.
///
/// These are never propagated to the caller of [`EventHub::emit`]; they are
/// logged and collected in the returned [`DispatchReport`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    /// The listener panicked.
    #[error("listener #{index} for '{event}' panicked: {message}")]
    Panicked {
        event: String,
        index: usize,
        message: String,
    },
    /// The listener returned an error.
    #[error("listener #{index} for '{event}' failed: {message}")]
    Failed {
        event: String,
        index: usize,
        message: String,
    },
}

/// Outcome of one [`EventHub::emit`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of listeners invoked, including the ones that failed.
    pub invoked: usize,
    /// Failures in dispatch order.
    pub failures: Vec<ListenerError>,
}

impl DispatchReport {
    /// Number of listeners that panicked or returned an error.
    #[inline]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns `true` when every invoked listener completed normally.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publish/subscribe registry mapping event names to ordered listeners.
///
/// Listeners are invoked synchronously in registration order. Registering the
/// same closure twice yields two invocations per dispatch.
///
/// ## Example
///
/// ```rust
/// use rune_loop::EventHub;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let mut hub: EventHub<u32> = EventHub::new();
///
/// let log = seen.clone();
/// hub.on("tick", move |n: &u32| log.borrow_mut().push(*n));
///
/// hub.emit("tick", &1);
/// hub.emit("tick", &2);
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// ```
pub struct EventHub<A> {
    listeners: HashMap<String, Vec<Listener<A>>>,
}

impl<A> Default for EventHub<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventHub<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventHub").field("listeners", &counts).finish()
    }
}

impl<A> EventHub<A> {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }

    /// Append a listener for `event`.
    pub fn on<F>(&mut self, event: &str, mut listener: F)
    where
        F: FnMut(&A) + 'static,
    {
        self.push(
            event,
            Box::new(move |args| {
                listener(args);
                Ok(())
            }),
        );
    }

    /// Append a fallible listener for `event`.
    ///
    /// An `Err` returned from the listener is reported like a panic: logged,
    /// recorded in the [`DispatchReport`], and otherwise ignored.
    pub fn try_on<F, E>(&mut self, event: &str, mut listener: F)
    where
        F: FnMut(&A) -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        self.push(
            event,
            Box::new(move |args| listener(args).map_err(|e| e.to_string())),
        );
    }

    fn push(&mut self, event: &str, listener: Listener<A>) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Invoke every listener registered for `event`, in registration order.
    ///
    /// Emitting an event nobody listens to is a no-op.
    pub fn emit(&mut self, event: &str, args: &A) -> DispatchReport {
        let mut report = DispatchReport::default();
        let Some(listeners) = self.listeners.get_mut(event) else {
            return report;
        };

        for (index, listener) in listeners.iter_mut().enumerate() {
            report.invoked += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(args)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(message)) => ListenerError::Failed {
                    event: event.to_string(),
                    index,
                    message,
                },
                Err(payload) => ListenerError::Panicked {
                    event: event.to_string(),
                    index,
                    message: panic_message(payload.as_ref()),
                },
            };
            log::warn!("{}", failure);
            report.failures.push(failure);
        }

        report
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Names of all events with at least one listener.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.listeners
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Returns `true` when no listener is registered for any event.
    pub fn is_empty(&self) -> bool {
        self.listeners.values().all(Vec::is_empty)
    }

    /// Drop every listener for `event`. Intended for host teardown.
    pub fn clear(&mut self, event: &str) {
        self.listeners.remove(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&u32)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |tag: &str| {
                let log = log.clone();
                let tag = tag.to_string();
                Box::new(move |n: &u32| log.borrow_mut().push(format!("{}:{}", tag, n)))
                    as Box<dyn FnMut(&u32)>
            }
        };
        (log, make)
    }

    #[test]
    fn test_emit_in_registration_order() {
        let (log, make) = recorder();
        let mut hub: EventHub<u32> = EventHub::new();
        hub.on("update", make("a"));
        hub.on("update", make("b"));
        hub.on("other", make("x"));

        let report = hub.emit("update", &7);
        assert_eq!(report.invoked, 2);
        assert!(report.is_clean());
        assert_eq!(*log.borrow(), vec!["a:7", "b:7"]);
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let mut hub: EventHub<u32> = EventHub::new();
        let report = hub.emit("update", &1);
        assert_eq!(report, DispatchReport::default());
        assert!(hub.is_empty());
    }

    #[test]
    fn test_duplicate_registration_runs_twice() {
        let count = Rc::new(RefCell::new(0));
        let mut hub: EventHub<()> = EventHub::new();
        for _ in 0..2 {
            let count = count.clone();
            hub.on("update", move |_: &()| *count.borrow_mut() += 1);
        }
        hub.emit("update", &());
        assert_eq!(*count.borrow(), 2);
        assert_eq!(hub.listener_count("update"), 2);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let (log, make) = recorder();
        let mut hub: EventHub<u32> = EventHub::new();
        hub.on("update", make("before"));
        hub.on("update", |_: &u32| panic!("boom"));
        hub.on("update", make("after"));

        let report = hub.emit("update", &3);
        assert_eq!(report.invoked, 3);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            &report.failures[0],
            ListenerError::Panicked { index: 1, message, .. } if message == "boom"
        ));
        assert_eq!(*log.borrow(), vec!["before:3", "after:3"]);

        // The failing listener stays registered.
        let report = hub.emit("update", &4);
        assert_eq!(report.failed(), 1);
        assert_eq!(log.borrow().len(), 4);
    }

    #[test]
    fn test_fallible_listener_error_is_reported() {
        let mut hub: EventHub<u32> = EventHub::new();
        hub.try_on("update", |n: &u32| {
            if *n > 1 {
                Err(format!("too big: {}", n))
            } else {
                Ok(())
            }
        });

        assert!(hub.emit("update", &1).is_clean());
        let report = hub.emit("update", &5);
        assert_eq!(
            report.failures,
            vec![ListenerError::Failed {
                event: "update".into(),
                index: 0,
                message: "too big: 5".into(),
            }]
        );
    }

    #[test]
    fn test_clear_and_event_names() {
        let (_, make) = recorder();
        let mut hub: EventHub<u32> = EventHub::new();
        hub.on("update", make("a"));
        hub.on("resize", make("b"));

        let mut names: Vec<&str> = hub.event_names().collect();
        names.sort();
        assert_eq!(names, vec!["resize", "update"]);

        hub.clear("resize");
        assert_eq!(hub.listener_count("resize"), 0);
        assert!(!hub.is_empty());
    }
}
