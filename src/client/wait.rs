//! Wait for a watched resource to satisfy a predicate.
use serde_json::Value;

use super::stream::{EventType, StreamEvent};
use crate::{Client, Error, Result};

/// A decision function evaluated against every added, modified, or deleted
/// resource seen on a watch stream.
///
/// Note that this is auto-implemented for functions of type
/// `fn(&Value, EventType) -> bool`.
///
/// # Usage
///
/// ```rust
/// use kubelink::client::{Condition, EventType};
/// use serde_json::Value;
///
/// fn phase_is(wanted: &str) -> impl Condition + '_ {
///     move |obj: &Value, _event: EventType| obj["status"]["phase"] == wanted
/// }
/// ```
pub trait Condition {
    /// Whether `object` satisfies the condition.
    fn matches(&self, object: &Value, event: EventType) -> bool;
}

impl<F: Fn(&Value, EventType) -> bool> Condition for F {
    fn matches(&self, object: &Value, event: EventType) -> bool {
        (self)(object, event)
    }
}

impl Client {
    /// Watch `url` until `cond` holds for an event, resolving with the
    /// matching resource.
    ///
    /// The condition is evaluated exactly once per added, modified, or
    /// deleted event, in arrival order. A failure to open the watch
    /// propagates as-is; nothing was opened, so there is nothing to tear
    /// down. After a successful open the stream is torn down exactly once:
    /// on the first match, on a stream error, or when the stream closes
    /// without a match ([`Error::WatchClosed`]).
    ///
    /// # Caveats
    ///
    /// There is no built-in timeout. A condition that never holds leaves
    /// the future pending until the stream dies or the caller drops it;
    /// wrap the call in `tokio::time::timeout` when a deadline is wanted.
    pub async fn wait_for<C: Condition>(&self, cond: C, url: &str) -> Result<Value> {
        let mut watcher = self.watch(url).await?;
        while let Some(event) = watcher.recv().await {
            let (object, event_type) = match event {
                Ok(StreamEvent::Added(object)) => (object, EventType::Added),
                Ok(StreamEvent::Modified(object)) => (object, EventType::Modified),
                Ok(StreamEvent::Deleted(object)) => (object, EventType::Deleted),
                Ok(_) => continue,
                Err(e) => {
                    watcher.unwatch();
                    return Err(e);
                }
            };
            if cond.matches(&object, event_type) {
                watcher.unwatch();
                return Ok(object);
            }
        }
        watcher.unwatch();
        Err(Error::WatchClosed)
    }
}
