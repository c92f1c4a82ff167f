//! The event bus and component lifecycle orchestrator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::component::Component;
use crate::events::{Event, EventType, Payload};

/// An event handler. Handlers are awaited sequentially in registration
/// order; a failing handler is logged and does not stop the remaining
/// handlers.
pub type Callback = Arc<dyn Fn(Event) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Owns the component registry and the event dispatcher.
///
/// All dispatch happens on one cooperative executor; publishing awaits
/// every registered handler before returning.
pub struct Engine {
    components: Mutex<Vec<Arc<dyn Component>>>,
    callbacks: RwLock<HashMap<EventType, Vec<Callback>>>,
    quit: Notify,
    quitting: AtomicBool,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            components: Mutex::new(Vec::new()),
            callbacks: RwLock::new(HashMap::new()),
            quit: Notify::new(),
            quitting: AtomicBool::new(false),
        }
    }

    /// Register a component. Idempotent: registering the same instance
    /// twice keeps a single entry. Components are pinned for the lifetime
    /// of the engine.
    pub fn register_component(&self, component: Arc<dyn Component>) {
        let mut components = self.components.lock();
        if components.iter().any(|c| Arc::ptr_eq(c, &component)) {
            return;
        }
        info!(component = component.name(), "registered component");
        components.push(component);
    }

    /// Register a handler for one event type. Handlers registered under
    /// [`EventType::All`] receive every event.
    pub fn register_callback(&self, event_type: EventType, callback: Callback) {
        self.callbacks.write().entry(event_type).or_default().push(callback);
    }

    /// Whether a `Quit` event has been observed.
    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    /// Publish an event: schedule delivery to every handler registered for
    /// `event_type` plus the wildcard handlers, awaiting each in turn.
    ///
    /// A payload variant that does not match the declared type is a
    /// programmer error and fails fast. Handler failures are logged and the
    /// remaining handlers still run; a `Quit` observed mid-dispatch stops
    /// the remaining handlers at the next boundary.
    pub async fn publish(&self, event_type: EventType, payload: Payload) -> Result<()> {
        ensure!(
            payload.matches(event_type),
            "payload {payload:?} does not match event type {event_type:?}"
        );

        if event_type == EventType::Quit {
            self.quitting.store(true, Ordering::SeqCst);
            self.quit.notify_waiters();
        }

        let event = Event::new(event_type, payload);
        let handlers: Vec<Callback> = {
            let callbacks = self.callbacks.read();
            let mut handlers = callbacks.get(&event_type).cloned().unwrap_or_default();
            if event_type != EventType::All {
                handlers.extend(callbacks.get(&EventType::All).cloned().unwrap_or_default());
            }
            handlers
        };

        for handler in handlers {
            if event_type != EventType::Quit && self.is_quitting() {
                debug!(?event_type, "quit observed, skipping remaining handlers");
                break;
            }
            if let Err(e) = handler(event.clone()).await {
                let chain = format!("{e:#}");
                error!(?event_type, error = %chain, "event handler failed");
            }
        }
        Ok(())
    }

    /// Initialize every component sequentially in registration order, then
    /// spawn every component's `run` as an independent task. Resolves when
    /// all tasks resolve, or when a `Quit` event is observed (remaining
    /// tasks are then cancelled at their next suspension point).
    ///
    /// Initialization failures are fatal and propagate to the caller.
    pub async fn run(&self) -> Result<()> {
        let components: Vec<Arc<dyn Component>> = self.components.lock().clone();

        for component in &components {
            info!(component = component.name(), "initializing");
            component.clone().init().await?;
        }

        let mut tasks = JoinSet::new();
        for component in components {
            let name = component.name().to_owned();
            tasks.spawn(async move {
                if let Err(e) = component.run().await {
                    let chain = format!("{e:#}");
                    error!(component = name, error = %chain, "component task failed");
                }
            });
        }

        let shutdown = self.quit.notified();
        tokio::pin!(shutdown);
        // register the waiter now so a Quit between here and the first
        // poll is not lost
        shutdown.as_mut().enable();
        let mut aborting = false;

        loop {
            // the flag also covers a Quit published before the waiter below
            // was registered
            if self.is_quitting() && !aborting {
                info!("quit event observed, cancelling component tasks");
                aborting = true;
                tasks.abort_all();
            }
            tokio::select! {
                _ = shutdown.as_mut(), if !aborting => {}
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => error!(error = %e, "component task panicked"),
                },
            }
        }

        info!("engine stopped");
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Message, Tick};
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn collector(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Callback {
        Arc::new(move |_event| {
            let log = log.clone();
            async move {
                log.lock().push(tag);
                Ok(())
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn dispatch_runs_handlers_in_registration_order() {
        let engine = Engine::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        engine.register_callback(EventType::Tick, collector(log.clone(), "first"));
        engine.register_callback(EventType::Tick, collector(log.clone(), "second"));

        engine
            .publish(EventType::Tick, Payload::Tick(Tick::default()))
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn wildcard_handlers_receive_every_event() {
        let engine = Engine::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        engine.register_callback(EventType::All, collector(log.clone(), "all"));

        engine
            .publish(EventType::Tick, Payload::Tick(Tick::default()))
            .await
            .unwrap();
        engine
            .publish(EventType::Message, Payload::Message(Message::new("x")))
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["all", "all"]);
    }

    #[tokio::test]
    async fn mismatched_payload_is_rejected_at_publish() {
        let engine = Engine::new();
        let result = engine
            .publish(EventType::Book, Payload::Tick(Tick::default()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_the_rest() {
        let engine = Engine::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        engine.register_callback(
            EventType::Tick,
            Arc::new(|_| async { anyhow::bail!("boom") }.boxed()),
        );
        engine.register_callback(EventType::Tick, collector(log.clone(), "survivor"));

        engine
            .publish(EventType::Tick, Payload::Tick(Tick::default()))
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["survivor"]);
    }

    #[tokio::test]
    async fn quit_cancels_subsequent_handlers() {
        let engine = Arc::new(Engine::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let quitter = engine.clone();
        engine.register_callback(
            EventType::Tick,
            Arc::new(move |_| {
                let engine = quitter.clone();
                async move { engine.publish(EventType::Quit, Payload::Quit).await }.boxed()
            }),
        );
        let counter = ran.clone();
        engine.register_callback(
            EventType::Tick,
            Arc::new(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            }),
        );

        engine
            .publish(EventType::Tick, Payload::Tick(Tick::default()))
            .await
            .unwrap();
        assert!(engine.is_quitting());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        park: bool,
    }

    #[async_trait::async_trait]
    impl Component for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn init(self: Arc<Self>) -> Result<()> {
            self.log.lock().push(format!("init:{}", self.name));
            Ok(())
        }

        async fn run(self: Arc<Self>) -> Result<()> {
            self.log.lock().push(format!("run:{}", self.name));
            if self.park {
                futures::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_initializes_in_registration_order() {
        let engine = Engine::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        engine.register_component(Arc::new(Recorder { name: "a", log: log.clone(), park: false }));
        engine.register_component(Arc::new(Recorder { name: "b", log: log.clone(), park: false }));

        engine.run().await.unwrap();
        let log = log.lock();
        assert_eq!(log[0], "init:a");
        assert_eq!(log[1], "init:b");
        assert!(log.contains(&"run:a".to_string()));
        assert!(log.contains(&"run:b".to_string()));
    }

    #[tokio::test]
    async fn component_registration_is_idempotent() {
        let engine = Engine::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::new(Recorder { name: "a", log: log.clone(), park: false });
        engine.register_component(recorder.clone());
        engine.register_component(recorder);

        engine.run().await.unwrap();
        assert_eq!(log.lock().iter().filter(|l| l.as_str() == "init:a").count(), 1);
    }

    #[tokio::test]
    async fn quit_event_stops_parked_components() {
        let engine = Arc::new(Engine::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        engine.register_component(Arc::new(Recorder { name: "parked", log: log.clone(), park: true }));

        let publisher = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            publisher.publish(EventType::Quit, Payload::Quit).await.unwrap();
        });

        tokio::time::timeout(std::time::Duration::from_secs(2), engine.run())
            .await
            .expect("engine should stop after quit")
            .unwrap();
    }
}
