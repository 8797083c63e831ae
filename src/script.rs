//! Bounded browser-script execution and event readiness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::Domain;
use crate::driver::{Driver, ScriptArg};
use crate::errors::LocatorError;

/// Runs browser scripts with a deadline
pub struct ScriptExecutor<D: Driver> {
    driver: Arc<D>,
    timeout: Duration,
}

impl<D: Driver> Clone for ScriptExecutor<D> {
    fn clone(&self) -> Self {
        ScriptExecutor {
            driver: Arc::clone(&self.driver),
            timeout: self.timeout,
        }
    }
}

impl<D: Driver> ScriptExecutor<D> {
    pub fn new(driver: Arc<D>, timeout: Duration) -> Self {
        ScriptExecutor { driver, timeout }
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run with the default deadline
    pub async fn execute(
        &self,
        script: &str,
        args: Vec<ScriptArg<D::Element>>,
    ) -> Result<Value, LocatorError> {
        self.execute_with_timeout(script, args, self.timeout).await
    }

    /// Run `script` on a worker task and stop waiting after `timeout`.
    ///
    /// The worker is detached, not cancelled, when the deadline passes.
    pub async fn execute_with_timeout(
        &self,
        script: &str,
        args: Vec<ScriptArg<D::Element>>,
        timeout: Duration,
    ) -> Result<Value, LocatorError> {
        let driver = Arc::clone(&self.driver);
        let owned = script.to_string();
        let worker = tokio::spawn(async move { driver.execute(&owned, args).await });

        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(LocatorError::Driver(format!(
                "script worker failed: {}",
                join_error
            ))),
            Err(_) => {
                warn!("Script did not return within {:?}", timeout);
                Err(LocatorError::Timeout(format!(
                    "script did not return within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

/// Marker shared by the injected callbacks and the poll script
const LISTENER_PREFIX: &str = "rsprobe_evt_";

/// Samples every registered listener flag in one round trip and clears the
/// ones that fired.
pub const EVENT_POLL_SCRIPT: &str = r#"
var ids = arguments[0]; var fired = [];
for (var i = 0; i < ids.length; i++) {
    if (window[ids[i]] === true) { window[ids[i]] = false; fired.push(ids[i]); }
}
return fired;
"#;

const ATTACH_HTML: &str = r#"
var el = arguments[0], id = arguments[1], evt = arguments[2];
window[id] = false;
window[id + '_h'] = function() { window[id] = true; };
el.addEventListener(evt, window[id + '_h']);
"#;

const DETACH_HTML: &str = r#"
var el = arguments[0], id = arguments[1], evt = arguments[2];
if (window[id + '_h']) { el.removeEventListener(evt, window[id + '_h']); }
delete window[id]; delete window[id + '_h'];
"#;

const ATTACH_DOJO: &str = r#"
var el = arguments[0], id = arguments[1], evt = arguments[2];
window[id] = false;
var w = dijit.byId(el.id);
var h = function() { window[id] = true; };
window[id + '_h'] = w ? w.on(evt, h) : dojo.connect(el, 'on' + evt, h);
"#;

const DETACH_DOJO: &str = r#"
var id = arguments[1];
var h = window[id + '_h'];
if (h && h.remove) { h.remove(); } else if (h) { dojo.disconnect(h); }
delete window[id]; delete window[id + '_h'];
"#;

const ATTACH_SAP: &str = r#"
var el = arguments[0], id = arguments[1], evt = arguments[2];
window[id] = false;
window[id + '_h'] = function() { window[id] = true; };
sap.ui.getCore().byId(el.id).attachBrowserEvent(evt, window[id + '_h']);
"#;

const DETACH_SAP: &str = r#"
var el = arguments[0], id = arguments[1], evt = arguments[2];
var c = sap.ui.getCore().byId(el.id);
if (c && window[id + '_h']) { c.detachBrowserEvent(evt, window[id + '_h']); }
delete window[id]; delete window[id + '_h'];
"#;

fn attach_script(domain: Domain) -> &'static str {
    match domain {
        Domain::Html => ATTACH_HTML,
        Domain::Dojo => ATTACH_DOJO,
        Domain::Sap => ATTACH_SAP,
    }
}

fn detach_script(domain: Domain) -> &'static str {
    match domain {
        Domain::Html => DETACH_HTML,
        Domain::Dojo => DETACH_DOJO,
        Domain::Sap => DETACH_SAP,
    }
}

/// A browser event callback registered through an [`EventHub`]
pub struct EventListener<E> {
    id: String,
    element: E,
    event: String,
    domain: Domain,
    fired: watch::Receiver<u64>,
}

impl<E> EventListener<E> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Number of times the event has been observed so far
    pub fn fired_count(&self) -> u64 {
        *self.fired.borrow()
    }

    /// Wait until the event fires again. Returns false on timeout or when
    /// the listener has been removed.
    pub async fn wait_fired(&mut self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.fired.changed()).await,
            Ok(Ok(()))
        )
    }
}

type Registry = Arc<Mutex<HashMap<String, watch::Sender<u64>>>>;

/// Owns one shared poller task for every registered listener
pub struct EventHub<D: Driver> {
    executor: ScriptExecutor<D>,
    interval: Duration,
    listeners: Registry,
    poller: Option<JoinHandle<()>>,
}

impl<D: Driver> EventHub<D> {
    pub fn new(executor: ScriptExecutor<D>, interval: Duration) -> Self {
        EventHub {
            executor,
            // A zero period would make the ticker panic
            interval: interval.max(Duration::from_millis(1)),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            poller: None,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Inject a callback for `event` on `element` and start observing it
    pub async fn add_listener(
        &mut self,
        element: &D::Element,
        domain: Domain,
        event: &str,
    ) -> Result<EventListener<D::Element>, LocatorError> {
        let id = format!("{}{}", LISTENER_PREFIX, uuid::Uuid::new_v4().simple());
        self.executor
            .execute(
                attach_script(domain),
                vec![
                    ScriptArg::Element(element.clone()),
                    ScriptArg::Value(json!(id)),
                    ScriptArg::Value(json!(event)),
                ],
            )
            .await?;

        let (tx, rx) = watch::channel(0u64);
        self.listeners
            .lock()
            .map_err(|_| LocatorError::Driver("listener registry poisoned".to_string()))?
            .insert(id.clone(), tx);
        self.ensure_poller();
        debug!("Listening for '{}' as {}", event, id);

        Ok(EventListener {
            id,
            element: element.clone(),
            event: event.to_string(),
            domain,
            fired: rx,
        })
    }

    /// Stop observing and detach the injected callback
    pub async fn remove_listener(
        &mut self,
        listener: EventListener<D::Element>,
    ) -> Result<(), LocatorError> {
        let now_empty = match self.listeners.lock() {
            Ok(mut map) => {
                map.remove(&listener.id);
                map.is_empty()
            }
            Err(_) => false,
        };
        if now_empty && let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.executor
            .execute(
                detach_script(listener.domain),
                vec![
                    ScriptArg::Element(listener.element),
                    ScriptArg::Value(json!(listener.id)),
                    ScriptArg::Value(json!(listener.event)),
                ],
            )
            .await
            .map(|_| ())
    }

    /// Stop the poller. Listeners not removed beforehand stop firing.
    pub fn shutdown(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        if let Ok(mut map) = self.listeners.lock() {
            map.clear();
        }
    }

    fn ensure_poller(&mut self) {
        if self.poller.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }
        let executor = self.executor.clone();
        let listeners = Arc::clone(&self.listeners);
        let interval = self.interval;
        info!("Starting event poller every {:?}", interval);

        self.poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let ids: Vec<String> = match listeners.lock() {
                    Ok(map) => map.keys().cloned().collect(),
                    Err(_) => break,
                };
                if ids.is_empty() {
                    continue;
                }
                let fired = match executor
                    .execute(EVENT_POLL_SCRIPT, vec![ScriptArg::Value(json!(ids))])
                    .await
                {
                    Ok(Value::Array(fired)) => fired,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("Event poll failed: {}", e);
                        continue;
                    }
                };
                if let Ok(map) = listeners.lock() {
                    for id in fired.iter().filter_map(Value::as_str) {
                        if let Some(tx) = map.get(id) {
                            tx.send_modify(|count| *count += 1);
                        }
                    }
                }
            }
        }));
    }
}

impl<D: Driver> Drop for EventHub<D> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;
