//! A lazy, memoized build graph.
//!
//! Nothing is scheduled up front. A node's rule runs when something first asks
//! for its key and finds out what it depends on by asking for more keys
//! through its [Task]. Every key is evaluated at most once per run; anyone
//! else asking for it waits on the same slot.
//!
//! Nodes that write files are journaled. On the next run such a node is
//! skipped when its files are untouched and everything it asked for last time
//! still has the same signature.

use std::{
    collections::{HashMap, HashSet},
    fmt::{Debug, Display},
    hash::Hash,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use crossbeam_channel::Sender;
use log::{debug, error, trace, warn};
use parking_lot::{Condvar, Mutex};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::Error,
    journal::{Dependency, Journal, Record, Signature},
};

/// What to do for each key of a graph.
pub trait Rules: Sized + Send + Sync + 'static {
    type Key: Clone
        + Eq
        + Hash
        + Debug
        + Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    type Value: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// The files the node for `key` writes.
    ///
    /// Nodes without files are recomputed every run and compared by value.
    fn outputs(&self, key: &Self::Key) -> Vec<PathBuf>;

    fn exec(&self, key: &Self::Key, task: &Task<Self>) -> Result<Self::Value, Error>;

    /// Whether a journal record for `key` that this run never touched can be forgotten.
    fn obsolete(&self, _key: &Self::Key, _task: &Task<Self>) -> bool {
        false
    }
}

enum NodeState<V> {
    Evaluating,
    Settled { value: V, signature: Signature },
    Failed(Arc<Error>),
}

struct Slot<V> {
    state: Mutex<NodeState<V>>,
    settled: Condvar,
}

impl<V: Clone> Slot<V> {
    fn new() -> Slot<V> {
        Slot {
            state: Mutex::new(NodeState::Evaluating),
            settled: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<(V, Signature), Arc<Error>> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                NodeState::Settled { value, signature } => {
                    return Ok((value.clone(), signature.clone()))
                }
                NodeState::Failed(e) => return Err(e.clone()),
                NodeState::Evaluating => (),
            }
            self.settled.wait(&mut state);
        }
    }

    fn settle(&self, state: NodeState<V>) {
        *self.state.lock() = state;
        self.settled.notify_all();
    }
}

/// Limits how many external processes run at once.
struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
}

struct Permit<'a>(&'a Semaphore);

impl Semaphore {
    fn new(permits: usize) -> Semaphore {
        Semaphore {
            available: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) -> Permit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        Permit(self)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.0.available.lock() += 1;
        self.0.released.notify_one();
    }
}

struct Inner<R: Rules> {
    rules: R,
    slots: Mutex<HashMap<R::Key, Arc<Slot<R::Value>>>>,
    /// Node => the keys it is currently waiting for
    waits: Mutex<HashMap<R::Key, Vec<R::Key>>>,
    previous: Journal<R::Key, R::Value>,
    current: Mutex<Journal<R::Key, R::Value>>,
    invalidated: Mutex<Vec<R::Key>>,
    processes: Semaphore,
    jobs: usize,
    /// Worker threads currently evaluating a node
    workers: AtomicUsize,
    max_workers: usize,
    /// The first fatal failure; everything evaluated after it fails with it
    fatal: Mutex<Option<Arc<Error>>>,
    executed: Mutex<Vec<R::Key>>,
    reused: AtomicUsize,
}

impl<R: Rules> Inner<R> {
    /// Evaluate or wait for every one of `keys`.
    ///
    /// Waits for all of them even when one fails, then reports the first
    /// failure in request order.
    fn request(
        self: &Arc<Self>,
        keys: &[R::Key],
        waiter: Option<&R::Key>,
    ) -> Result<Vec<(R::Value, Signature)>, Error> {
        if let Some(waiter) = waiter {
            self.wait_for(waiter, keys)?;
        }
        let result = self.schedule_and_wait(keys);
        if let Some(waiter) = waiter {
            self.waits.lock().remove(waiter);
        }
        result
    }

    /// Record that `waiter` waits for `keys`, unless that would wait on itself.
    fn wait_for(&self, waiter: &R::Key, keys: &[R::Key]) -> Result<(), Error> {
        let mut waits = self.waits.lock();
        for key in keys {
            if let Some(path) = path_between(&waits, key, waiter) {
                let mut cycle = vec![waiter.to_string()];
                cycle.extend(path.iter().map(ToString::to_string));
                return Err(Error::Cycle(cycle));
            }
        }
        waits.insert(waiter.clone(), keys.to_vec());
        Ok(())
    }

    fn schedule_and_wait(
        self: &Arc<Self>,
        keys: &[R::Key],
    ) -> Result<Vec<(R::Value, Signature)>, Error> {
        let mut claimed = Vec::new();
        let slots: Vec<_> = {
            let mut slots = self.slots.lock();
            keys.iter()
                .map(|key| {
                    slots
                        .entry(key.clone())
                        .or_insert_with(|| {
                            let slot = Arc::new(Slot::new());
                            claimed.push((key.clone(), slot.clone()));
                            slot
                        })
                        .clone()
                })
                .collect()
        };

        // The first claim runs on this thread, the rest on workers while
        // there are any to spare, otherwise here after the first.
        let mut inline = Vec::new();
        for (i, (key, slot)) in claimed.into_iter().enumerate() {
            if i == 0 || !self.reserve_worker() {
                inline.push((key, slot));
                continue;
            }
            let inner = self.clone();
            let spawned = thread::Builder::new().spawn({
                let key = key.clone();
                let slot = slot.clone();
                move || {
                    inner.evaluate(key, &slot);
                    inner.workers.fetch_sub(1, Ordering::AcqRel);
                }
            });
            if let Err(e) = spawned {
                warn!("Unable to start a worker for {key}, evaluating it in place: {e}");
                self.workers.fetch_sub(1, Ordering::AcqRel);
                inline.push((key, slot));
            }
        }
        for (key, slot) in inline {
            self.evaluate(key, &slot);
        }

        let mut values = Vec::with_capacity(slots.len());
        let mut first_failure = None;
        for slot in slots {
            match slot.wait() {
                Ok(value) => values.push(value),
                Err(e) => {
                    first_failure.get_or_insert(e);
                }
            }
        }
        match first_failure {
            Some(e) => Err(Error::Dependency(e)),
            None => Ok(values),
        }
    }

    fn reserve_worker(&self) -> bool {
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_workers).then_some(n + 1)
            })
            .is_ok()
    }

    fn evaluate(self: &Arc<Self>, key: R::Key, slot: &Slot<R::Value>) {
        let outputs = self.rules.outputs(&key);
        let fatal = self.fatal.lock().clone();
        let result = match fatal {
            Some(fatal) => {
                trace!("Aborting {key}");
                Err(Error::Dependency(fatal))
            }
            None => self.reuse_or_run(&key, &outputs),
        };
        let state = match result {
            Ok((value, signature)) => NodeState::Settled { value, signature },
            Err(e) => {
                let e = match e {
                    Error::Dependency(e) => e,
                    e => Arc::new(e),
                };
                if e.is_fatal() {
                    let mut fatal = self.fatal.lock();
                    if fatal.is_none() {
                        error!("{key} failed, stopping the build: {e}");
                        *fatal = Some(e.clone());
                    }
                }
                if !outputs.is_empty() {
                    self.invalidated.lock().push(key.clone());
                }
                NodeState::Failed(e)
            }
        };
        slot.settle(state);
    }

    fn reuse_or_run(
        self: &Arc<Self>,
        key: &R::Key,
        outputs: &[PathBuf],
    ) -> Result<(R::Value, Signature), Error> {
        if !outputs.is_empty() {
            if let Some(reused) = self.try_reuse(key, outputs) {
                return Ok(reused);
            }
        }

        trace!("Run {key}");
        let task = Task::new(self.clone(), Some(key.clone()));
        let value = match std::panic::catch_unwind(AssertUnwindSafe(|| self.rules.exec(key, &task)))
        {
            Ok(result) => result?,
            Err(err) => return Err(Error::Panic(get_panic_message(err))),
        };

        if outputs.is_empty() {
            return Ok((value.clone(), Signature::of_value(&value)?));
        }
        let signature = Signature::of_outputs(outputs)?;
        self.executed.lock().push(key.clone());
        self.current.lock().insert(Record {
            key: key.clone(),
            signature: signature.clone(),
            volatile: task.volatile.load(Ordering::Acquire),
            value: value.clone(),
            depends: task.depends.into_inner(),
        });
        Ok((value, signature))
    }

    /// The value from the last run, if nothing it was made from changed since.
    fn try_reuse(
        self: &Arc<Self>,
        key: &R::Key,
        outputs: &[PathBuf],
    ) -> Option<(R::Value, Signature)> {
        let previous = self.previous.get(key)?;
        if previous.volatile {
            debug!("{key} is volatile");
            return None;
        }
        let Some(signature) = Signature::of_files(outputs) else {
            debug!("{key} is missing output");
            return None;
        };
        if signature != previous.signature {
            debug!("{key} output was modified");
            return None;
        }
        // Groups are checked in the order they were asked for; a group may only
        // make sense once the ones before it are unchanged.
        for group in previous.depends.iter() {
            let keys: Vec<_> = group.iter().map(|dep| dep.key.clone()).collect();
            let current = match self.request(&keys, Some(key)) {
                Ok(current) => current,
                Err(e) => {
                    debug!("{key} has a failing dependency: {e}");
                    return None;
                }
            };
            if let Some((dep, _)) = group
                .iter()
                .zip(current)
                .find(|(dep, (_, signature))| !dep.ordering_only && &dep.signature != signature)
            {
                debug!("{key} is stale, {} changed", dep.key);
                return None;
            }
        }
        debug!("Reusing {key}");
        self.reused.fetch_add(1, Ordering::AcqRel);
        self.current.lock().insert(previous.clone());
        Some((previous.value.clone(), signature))
    }
}

/// Find a chain of waits leading from `from` to `to`, both included.
fn path_between<K: Clone + Eq + Hash>(
    waits: &HashMap<K, Vec<K>>,
    from: &K,
    to: &K,
) -> Option<Vec<K>> {
    let mut seen = HashSet::new();
    let mut stack = vec![vec![from.clone()]];
    while let Some(path) = stack.pop() {
        let Some(last) = path.last() else {
            continue;
        };
        if last == to {
            return Some(path);
        }
        if !seen.insert(last.clone()) {
            continue;
        }
        for next in waits.get(last).into_iter().flatten() {
            let mut longer = path.clone();
            longer.push(next.clone());
            stack.push(longer);
        }
    }
    None
}

// taken from std:
// <https://github.com/rust-lang/rust/blob/d5a82bbd26e1ad8b7401f6a718a9c57c96905483/library/std/src/panicking.rs#L247-L253>
fn get_panic_message(msg: Box<dyn std::any::Any + Send + 'static>) -> String {
    match msg.downcast_ref::<&'static str>() {
        Some(s) => s.to_string(),
        None => match msg.downcast_ref::<String>() {
            Some(s) => s.to_owned(),
            None => "Box<dyn Any>".to_owned(),
        },
    }
}

/// A rule's handle on the graph while it runs.
pub struct Task<R: Rules> {
    inner: Arc<Inner<R>>,
    key: Option<R::Key>,
    depends: Mutex<Vec<Vec<Dependency<R::Key>>>>,
    volatile: AtomicBool,
}

impl<R: Rules> Task<R> {
    fn new(inner: Arc<Inner<R>>, key: Option<R::Key>) -> Task<R> {
        Task {
            inner,
            key,
            depends: Mutex::new(Vec::new()),
            volatile: AtomicBool::new(false),
        }
    }

    /// Values for `keys`, evaluated concurrently; this node is rebuilt when any of them change.
    pub fn need(&self, keys: &[R::Key]) -> Result<Vec<R::Value>, Error> {
        self.request(keys, false)
    }

    pub fn need_one(&self, key: R::Key) -> Result<R::Value, Error> {
        self.need(std::slice::from_ref(&key))?
            .pop()
            .ok_or(Error::UnexpectedValue("a value per key"))
    }

    /// Make sure `keys` are built before this node continues, without depending on their content.
    pub fn order(&self, keys: &[R::Key]) -> Result<(), Error> {
        self.request(keys, true).map(|_| ())
    }

    /// Run this node every time, regardless of the journal.
    pub fn volatile(&self) {
        self.volatile.store(true, Ordering::Release);
    }

    /// Run `f` once a process slot is free.
    pub fn throttled<T>(&self, f: impl FnOnce() -> T) -> T {
        let _permit = self.inner.processes.acquire();
        f()
    }

    fn request(&self, keys: &[R::Key], ordering_only: bool) -> Result<Vec<R::Value>, Error> {
        let results = self.inner.request(keys, self.key.as_ref())?;
        let mut values = Vec::with_capacity(results.len());
        let mut group = Vec::with_capacity(results.len());
        for (key, (value, signature)) in keys.iter().zip(results) {
            group.push(Dependency {
                key: key.clone(),
                ordering_only,
                signature,
            });
            values.push(value);
        }
        self.depends.lock().push(group);
        Ok(values)
    }
}

/// What happened to the targets of [Graph::build].
#[derive(Debug)]
pub struct BuildReport<K> {
    pub built: Vec<K>,
    pub failed: Vec<(K, Arc<Error>)>,
    /// Targets never started because an earlier one failed
    pub skipped: Vec<K>,
    /// File-producing nodes whose rule ran
    pub executed: Vec<K>,
    /// File-producing nodes taken from the journal
    pub reused: usize,
}

impl<K> BuildReport<K> {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Worker threads per job; most of them spend their time waiting on other nodes.
const WORKERS_PER_JOB: usize = 4;

pub struct Graph<R: Rules> {
    inner: Arc<Inner<R>>,
}

impl<R: Rules> Graph<R> {
    /// A graph that reuses what `previous` recorded and runs up to `jobs` processes at once.
    pub fn new(rules: R, previous: Journal<R::Key, R::Value>, jobs: usize) -> Graph<R> {
        let jobs = jobs.max(1);
        Graph {
            inner: Arc::new(Inner {
                rules,
                slots: Default::default(),
                waits: Default::default(),
                previous,
                current: Mutex::new(Journal::new()),
                invalidated: Default::default(),
                processes: Semaphore::new(jobs),
                jobs,
                workers: AtomicUsize::new(0),
                max_workers: jobs * WORKERS_PER_JOB,
                fatal: Mutex::new(None),
                executed: Default::default(),
                reused: AtomicUsize::new(0),
            }),
        }
    }

    pub fn rules(&self) -> &R {
        &self.inner.rules
    }

    /// Values for `keys`, from outside any rule.
    pub fn need(&self, keys: &[R::Key]) -> Result<Vec<R::Value>, Error> {
        Ok(self
            .inner
            .request(keys, None)?
            .into_iter()
            .map(|(value, _)| value)
            .collect())
    }

    /// Build `targets`, at most `jobs` at a time.
    ///
    /// Once a target fails no further targets are started; the ones already
    /// running are allowed to finish.
    pub fn build(&self, targets: &[R::Key]) -> BuildReport<R::Key> {
        let (send, recv) = crossbeam_channel::unbounded::<(R::Key, Result<(), Error>)>();
        let mut report = BuildReport {
            built: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            executed: Vec::new(),
            reused: 0,
        };
        let mut pending = targets.iter();
        let mut running = 0;
        loop {
            while running < self.inner.jobs && report.failed.is_empty() {
                let Some(key) = pending.next() else {
                    break;
                };
                trace!("Start {key}");
                let spawned = thread::Builder::new().spawn({
                    let inner = self.inner.clone();
                    let send = send.clone();
                    let key = key.clone();
                    move || complete(&inner, key, &send)
                });
                running += 1;
                if let Err(e) = spawned {
                    warn!("Unable to start a thread for {key}, building it in place: {e}");
                    complete(&self.inner, key.clone(), &send);
                }
            }
            if running == 0 {
                break;
            }
            let Ok((key, result)) = recv.recv() else {
                error!("Completion channel closed with {running} targets running");
                break;
            };
            running -= 1;
            match result {
                Ok(()) => report.built.push(key),
                Err(Error::Dependency(e)) => report.failed.push((key, e)),
                Err(e) => report.failed.push((key, Arc::new(e))),
            }
        }
        report.skipped = pending.cloned().collect();
        report.executed = self.inner.executed.lock().clone();
        report.reused = self.inner.reused.load(Ordering::Acquire);
        report
    }

    /// The journal to save: this run's records over the previous ones that
    /// still mean something.
    pub fn journal(&self) -> Journal<R::Key, R::Value> {
        let mut journal = self.inner.previous.clone();
        for key in self.inner.invalidated.lock().iter() {
            journal.remove(key);
        }
        let current = self.inner.current.lock().clone();
        let task = Task::new(self.inner.clone(), None);
        journal.retain(|key| {
            if current.get(key).is_some() || !self.inner.rules.obsolete(key, &task) {
                return true;
            }
            debug!("Forgetting {key}");
            false
        });
        journal.merge(current);
        journal
    }
}

/// Build a top level target and report how it went.
fn complete<R: Rules>(
    inner: &Arc<Inner<R>>,
    key: R::Key,
    send: &Sender<(R::Key, Result<(), Error>)>,
) {
    let result = inner.request(std::slice::from_ref(&key), None).map(|_| ());
    if let Err(e) = send.send((key.clone(), result)) {
        error!("Unable to write {key} to completion channel: {e}");
    }
}
