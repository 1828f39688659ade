//! Hierarchical progress reporting.
//!
//! Listeners form a tree kept in a single arena. A parent hands each child a
//! fixed allocation of its own work units; the child reports in its own units
//! and every update is rescaled into the parent's units before it is forwarded:
//!
//! ```text
//! allocated_work_done = work_done * allocation / total_work
//! ```
//!
//! `done()` tops the child up to its full allocation, so after a subtree is
//! done its parent has seen exactly the allocation it gave away.

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};

/// Total work value for phases whose size is not known in advance.
pub const UNKNOWN: Option<u64> = None;

/// Receives the progress of the root listener.
pub trait ProgressSink: Send + Sync {
    fn start(&self, message: &str, total_work: Option<u64>);
    fn message(&self, message: &str);
    /// Not cumulative: work done since the previous call.
    fn update(&self, work_done: u64);
    fn done(&self);
}

#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    allocation: u64,
    total_work: Option<u64>,
    work_done: u64,
    allocated_work_done: u64,
    done: bool,
}

impl Node {
    fn new(parent: Option<usize>, allocation: u64) -> Self {
        Self {
            parent,
            allocation,
            total_work: UNKNOWN,
            work_done: 0,
            allocated_work_done: 0,
            done: false,
        }
    }
}

enum Event {
    Start(String, Option<u64>),
    Message(String),
    Update(u64),
    Done,
}

struct Tree {
    sink: Arc<dyn ProgressSink>,
    nodes: Mutex<Vec<Node>>,
}

impl Tree {
    fn nodes(&self) -> MutexGuard<'_, Vec<Node>> {
        // a panicking sink must not wedge every other listener
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, events: Vec<Event>) {
        for event in events {
            match event {
                Event::Start(message, total) => self.sink.start(&message, total),
                Event::Message(message) => self.sink.message(&message),
                Event::Update(work) => self.sink.update(work),
                Event::Done => self.sink.done(),
            }
        }
    }
}

/// Walk `delta` up from `id`, rescaling at every level.
fn propagate(nodes: &mut [Node], mut id: usize, mut delta: u64, events: &mut Vec<Event>) {
    loop {
        let node = &mut nodes[id];
        node.work_done = node.work_done.saturating_add(delta);
        let Some(parent) = node.parent else {
            events.push(Event::Update(delta));
            return;
        };
        let total = match node.total_work {
            Some(total) if total > 0 => total,
            // nothing to rescale against, done() settles the allocation
            _ => return,
        };
        let capped = node.work_done.min(total);
        let scaled = (capped as u128 * node.allocation as u128 / total as u128) as u64;
        let normalized = scaled.saturating_sub(node.allocated_work_done);
        if normalized == 0 {
            return;
        }
        node.allocated_work_done += normalized;
        id = parent;
        delta = normalized;
    }
}

/// Handle on one node of a progress tree. Cloning yields another handle on
/// the same node.
#[derive(Clone)]
pub struct ProgressListener {
    tree: Arc<Tree>,
    id: usize,
}

impl ProgressListener {
    /// Create the root of a new tree reporting to `sink`.
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            tree: Arc::new(Tree {
                sink,
                nodes: Mutex::new(vec![Node::new(None, 0)]),
            }),
            id: 0,
        }
    }

    /// A root listener that reports nowhere.
    pub fn noop() -> Self {
        Self::new(Arc::new(NullProgressSink))
    }

    pub fn start(&self, message: &str, total_work: Option<u64>) {
        let event = {
            let mut nodes = self.tree.nodes();
            let node = &mut nodes[self.id];
            node.total_work = total_work;
            if node.parent.is_none() {
                Event::Start(message.to_string(), total_work)
            } else {
                Event::Message(message.to_string())
            }
        };
        self.tree.emit(vec![event]);
    }

    /// Report work done since the previous call, in this listener's units.
    pub fn update(&self, work_done: u64) {
        if work_done == 0 {
            return;
        }
        let mut events = Vec::new();
        {
            let mut nodes = self.tree.nodes();
            propagate(&mut nodes, self.id, work_done, &mut events);
        }
        self.tree.emit(events);
    }

    /// Forward a status message to the root.
    pub fn message(&self, message: &str) {
        self.tree.emit(vec![Event::Message(message.to_string())]);
    }

    /// Finish this node, reporting whatever is left of its allocation.
    pub fn done(&self) {
        let mut events = Vec::new();
        {
            let mut nodes = self.tree.nodes();
            let node = &mut nodes[self.id];
            if node.done {
                return;
            }
            node.done = true;
            match node.parent {
                None => events.push(Event::Done),
                Some(parent) => {
                    let remaining = node.allocation.saturating_sub(node.allocated_work_done);
                    node.allocated_work_done = node.allocation;
                    if remaining > 0 {
                        propagate(&mut nodes, parent, remaining, &mut events);
                    }
                }
            }
        }
        self.tree.emit(events);
    }

    /// Create a child that owns `allocation` units of this listener's total.
    pub fn new_child(&self, allocation: u64) -> ProgressListener {
        let mut nodes = self.tree.nodes();
        nodes.push(Node::new(Some(self.id), allocation));
        ProgressListener {
            tree: Arc::clone(&self.tree),
            id: nodes.len() - 1,
        }
    }

    /// Units of the parent's allocation this node has reported so far.
    pub fn allocated_work_done(&self) -> u64 {
        self.tree.nodes()[self.id].allocated_work_done
    }

    /// Raw work reported to this node, in its own units.
    pub fn work_done(&self) -> u64 {
        self.tree.nodes()[self.id].work_done
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn start(&self, _message: &str, _total_work: Option<u64>) {}
    fn message(&self, _message: &str) {}
    fn update(&self, _work_done: u64) {}
    fn done(&self) {}
}

/// Logs phase messages at `info` and completion in 10% steps at `debug`.
#[derive(Debug, Default)]
pub struct LogProgressSink {
    state: Mutex<LogProgressState>,
}

#[derive(Debug, Default)]
struct LogProgressState {
    total: Option<u64>,
    done: u64,
    last_decile: u64,
}

impl ProgressSink for LogProgressSink {
    fn start(&self, message: &str, total_work: Option<u64>) {
        info!("{}", message);
        if let Ok(mut state) = self.state.lock() {
            *state = LogProgressState {
                total: total_work,
                ..Default::default()
            };
        }
    }

    fn message(&self, message: &str) {
        info!("{}", message.trim_end());
    }

    fn update(&self, work_done: u64) {
        let Ok(mut state) = self.state.lock() else { return };
        state.done = state.done.saturating_add(work_done);
        if let Some(total) = state.total.filter(|t| *t > 0) {
            let decile = state.done.min(total) * 10 / total;
            if decile > state.last_decile {
                state.last_decile = decile;
                debug!("{}% complete", decile * 10);
            }
        }
    }

    fn done(&self) {
        info!("Done");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ProgressSink;
    use std::sync::Mutex;

    /// Records everything the root reports.
    #[derive(Default)]
    pub struct RecordingSink {
        pub starts: Mutex<Vec<(String, Option<u64>)>>,
        pub messages: Mutex<Vec<String>>,
        pub updates: Mutex<Vec<u64>>,
        pub done_calls: Mutex<usize>,
    }

    impl RecordingSink {
        pub fn total(&self) -> u64 {
            self.updates.lock().unwrap().iter().sum()
        }
    }

    impl ProgressSink for RecordingSink {
        fn start(&self, message: &str, total_work: Option<u64>) {
            self.starts.lock().unwrap().push((message.to_string(), total_work));
        }
        fn message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
        fn update(&self, work_done: u64) {
            self.updates.lock().unwrap().push(work_done);
        }
        fn done(&self) {
            *self.done_calls.lock().unwrap() += 1;
        }
    }
}
