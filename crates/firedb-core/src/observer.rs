//! Observer registration and event fan-out.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use futures_core::Stream;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

/// Identity of a registered observer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObserverId {
    /// Caller-chosen name; registering the same name twice is a no-op.
    Named(String),
    /// Handle issued for anonymous registrations.
    Handle(Uuid),
}

impl ObserverId {
    pub fn named(name: impl Into<String>) -> Self {
        ObserverId::Named(name.into())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverId::Named(name) => write!(f, "{}", name),
            ObserverId::Handle(id) => write!(f, "#{}", id),
        }
    }
}

/// Returns `false` once the listener can no longer receive events.
type Listener<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Registered listeners for one event type, notified in registration order.
pub struct ObserverRegistry<E> {
    listeners: RwLock<Vec<(ObserverId, Listener<E>)>>,
}

impl<E> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<E> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named observer.
    ///
    /// Returns `false` and keeps the existing listener if the name is
    /// already registered.
    pub fn register<F>(&self, name: impl Into<String>, listener: F) -> bool
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ObserverId::named(name);
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        trace!(observer = %id, "Registering observer");
        listeners.push((id, Arc::new(move |event: &E| {
            listener(event);
            true
        })));
        true
    }

    /// Register an anonymous observer and return its handle.
    pub fn subscribe<F>(&self, listener: F) -> ObserverId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.attach(move |event: &E| {
            listener(event);
            true
        })
    }

    fn attach<F>(&self, listener: F) -> ObserverId
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let id = ObserverId::Handle(Uuid::new_v4());
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners.push((id.clone(), Arc::new(listener)));
        id
    }

    /// Remove an observer. Returns `true` if it was registered.
    pub fn unregister(&self, id: &ObserverId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| existing != id);
        listeners.len() != before
    }

    /// Remove every observer.
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every observer.
    ///
    /// Listeners run outside the registry lock, so they may register or
    /// unregister observers themselves. Streams whose receiver was dropped
    /// are removed.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<(ObserverId, Listener<E>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let gone: Vec<ObserverId> = snapshot
            .into_iter()
            .filter(|(_, listener)| !listener(event))
            .map(|(id, _)| id)
            .collect();

        if !gone.is_empty() {
            trace!(count = gone.len(), "Removing closed observer streams");
            self.listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| !gone.contains(id));
        }
    }
}

impl<E: Clone + Send + 'static> ObserverRegistry<E> {
    /// Subscribe with a stream of events instead of a callback.
    ///
    /// The stream ends once the observer is unregistered or the registry is
    /// dropped. Dropping the stream unregisters it at the next notification.
    pub fn stream(&self) -> (ObserverId, impl Stream<Item = E> + Send + 'static) {
        let (tx, mut rx) = mpsc::unbounded_channel::<E>();
        let id = self.attach(move |event: &E| tx.send(event.clone()).is_ok());

        let stream = async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        };

        (id, stream)
    }
}

impl<E> fmt::Debug for ObserverRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ObserverRegistry")
            .field(
                "observers",
                &listeners.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Box<dyn Fn(&String) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_factory = seen.clone();
        let factory = move |tag: &'static str| -> Box<dyn Fn(&String) + Send + Sync> {
            let seen = seen_for_factory.clone();
            Box::new(move |event: &String| seen.lock().unwrap().push(format!("{}:{}", tag, event)))
        };
        (seen, factory)
    }

    #[test]
    fn notifies_in_registration_order() {
        let registry = ObserverRegistry::<String>::new();
        let (seen, make) = recorder();

        registry.register("menu", make("menu"));
        registry.register("footer", make("footer"));
        registry.notify(&"USER 1".to_string());

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["menu:USER 1".to_string(), "footer:USER 1".to_string()]
        );
    }

    #[test]
    fn named_registration_is_idempotent() {
        let registry = ObserverRegistry::<String>::new();
        let (seen, make) = recorder();

        assert!(registry.register("menu", make("first")));
        assert!(!registry.register("menu", make("second")));
        assert_eq!(registry.len(), 1);

        registry.notify(&"e".to_string());
        assert_eq!(*seen.lock().unwrap(), vec!["first:e".to_string()]);
    }

    #[test]
    fn unregister_and_clear() {
        let registry = ObserverRegistry::<String>::new();
        let (seen, make) = recorder();

        let handle = registry.subscribe(make("anon"));
        registry.register("menu", make("menu"));
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(&handle));
        assert!(!registry.unregister(&handle));
        registry.notify(&"a".to_string());
        assert_eq!(*seen.lock().unwrap(), vec!["menu:a".to_string()]);

        registry.clear();
        assert!(registry.is_empty());
        registry.notify(&"b".to_string());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn listeners_may_reenter_registry() {
        let registry = Arc::new(ObserverRegistry::<String>::new());
        let inner = registry.clone();
        registry.register("self-removing", move |_: &String| {
            inner.unregister(&ObserverId::named("self-removing"));
        });

        registry.notify(&"x".to_string());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stream_yields_events() {
        let registry = ObserverRegistry::<String>::new();
        let (id, stream) = registry.stream();
        let mut stream = Box::pin(stream);

        registry.notify(&"one".to_string());
        registry.notify(&"two".to_string());
        assert_eq!(stream.next().await.as_deref(), Some("one"));
        assert_eq!(stream.next().await.as_deref(), Some("two"));

        registry.unregister(&id);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn dropped_stream_is_unregistered_on_next_notify() {
        let registry = ObserverRegistry::<String>::new();
        let (seen, make) = recorder();
        registry.register("menu", make("menu"));

        let (_id, stream) = registry.stream();
        assert_eq!(registry.len(), 2);
        drop(stream);

        registry.notify(&"a".to_string());
        assert_eq!(registry.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["menu:a".to_string()]);
    }
}
