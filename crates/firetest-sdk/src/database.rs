use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, trace};

use firetest_fabric::{ChangeEvent, ChangeNotifier, HybridLogicalClock, NotifierConfig, Subscription};
use firetest_store::{encode, Node, PathTree};
use firetest_types::{DbPath, PushName};

/// An in-memory realtime database.
///
/// Paths are sanitized on the way in, so `/foo/bar.json`, `foo/bar/` and
/// `foo/bar` address the same location.
///
/// Mutations serialize on a write lock around the tree. The change event is
/// captured while the lock is held and broadcast on a detached task after it
/// is released, so writers never wait on subscribers.
pub struct Database {
    tree: RwLock<PathTree>,
    notifier: Arc<ChangeNotifier>,
    clock: HybridLogicalClock,
}

impl Database {
    pub fn new() -> Self {
        Self::with_config(NotifierConfig::default())
    }

    pub fn with_config(config: NotifierConfig) -> Self {
        Self {
            tree: RwLock::new(PathTree::new()),
            notifier: Arc::new(ChangeNotifier::new(config)),
            clock: HybridLogicalClock::new(),
        }
    }

    // ---- Reads ----

    /// The value at `path`, or `None` if nothing exists there.
    ///
    /// The root always exists; an empty database reads as `Some(Value::Null)`.
    pub fn read(&self, path: &str) -> Option<Value> {
        let path = DbPath::sanitize(path);
        self.tree.read().expect("tree lock poisoned").read(&path)
    }

    /// The whole tree as one value.
    pub fn snapshot(&self) -> Value {
        self.tree.read().expect("tree lock poisoned").snapshot()
    }

    /// Run `f` against the tree under the read lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&PathTree) -> R) -> R {
        f(&self.tree.read().expect("tree lock poisoned"))
    }

    // ---- Writes ----

    /// Overwrite the data at `path` and everything below it. Writing nothing
    /// (`null`, `{}` or `[]`) to a path other than the root deletes it, and is
    /// silent when the path does not exist.
    pub fn write(&self, path: &str, value: Value) {
        let path = DbPath::sanitize(path);
        let node = encode(value).compacted();
        let event = {
            let mut tree = self.tree.write().expect("tree lock poisoned");
            if node.is_empty() && !path.is_root() {
                if !tree.del(&path) {
                    trace!(path = %path, "empty write to missing path");
                    return;
                }
            } else {
                tree.add(&path, node);
            }
            ChangeEvent::put(path.clone(), resulting_node(&tree, &path), self.clock.now())
        };
        debug!(path = %path, "write");
        self.notifier.notify(event);
    }

    /// Write the enumerated children of `value` at `path`, leaving the others
    /// untouched. Children are replaced, not merged recursively, and a `null`
    /// child removes that child. A `null` value deletes `path`.
    pub fn merge(&self, path: &str, value: Value) {
        if value.is_null() {
            self.delete(path);
            return;
        }

        let path = DbPath::sanitize(path);
        let patch = encode(value);
        let event = {
            let mut tree = self.tree.write().expect("tree lock poisoned");
            tree.update(&path, patch.clone());
            ChangeEvent::patch(path.clone(), Some(patch), self.clock.now())
        };
        debug!(path = %path, "merge");
        self.notifier.notify(event);
    }

    /// Remove the data at `path` and everything below it. Deleting a path
    /// that does not exist does nothing.
    pub fn delete(&self, path: &str) {
        let path = DbPath::sanitize(path);
        let event = {
            let mut tree = self.tree.write().expect("tree lock poisoned");
            if !tree.del(&path) {
                trace!(path = %path, "delete of missing path");
                return;
            }
            ChangeEvent::put(path.clone(), None, self.clock.now())
        };
        debug!(path = %path, "delete");
        self.notifier.notify(event);
    }

    /// Store `value` under a newly generated child of `path` and return the
    /// child's name.
    pub fn create_child(&self, path: &str, value: Value) -> PushName {
        let name = PushName::from_anchor(self.clock.now());
        let child = DbPath::sanitize(path).child(name.as_str());
        self.write(child.as_str(), value);
        name
    }

    // ---- Subscriptions ----

    /// Receive every change at or below `prefix`.
    pub async fn subscribe(&self, prefix: &str) -> Subscription {
        self.notifier.watch(DbPath::sanitize(prefix)).await
    }

    pub async fn unsubscribe(&self, subscription: Subscription) {
        self.notifier.unwatch(subscription).await;
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// The subtree left at `path`, treating an emptied root as removed.
fn resulting_node(tree: &PathTree, path: &DbPath) -> Option<Node> {
    tree.get(path).filter(|node| !node.is_empty()).cloned()
}
