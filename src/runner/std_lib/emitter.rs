//! The base publish/subscribe primitive every instance carries.
//!
//! Five operations: `on`, `off`, `trigger`, `listen_to`, `stop_listening`.
//! Handlers registered through `listen_to` run with the listener as `this`
//! and are remembered on the listener, so `stop_listening` (and `destroy`) can
//! unhook them from their sources later. Handlers subscribed to `"all"` run
//! after the specific ones and receive the event name as their first argument.

use indexmap::IndexMap;

use crate::runner::ds::error::KernelResult;
use crate::runner::ds::method::Method;
use crate::runner::ds::object::{ObjectRef, WeakObjectRef};
use crate::runner::ds::value::Value;

pub const ALL_EVENTS: &str = "all";

#[derive(Clone)]
struct Subscription {
    handler: Method,
    context: Option<WeakObjectRef>,
}

#[derive(Clone)]
struct Listening {
    source: WeakObjectRef,
    event: String,
    handler: Method,
}

#[derive(Default)]
pub struct EventTable {
    handlers: IndexMap<String, Vec<Subscription>>,
    listening: Vec<Listening>,
}

impl EventTable {
    fn add(&mut self, event: &str, subscription: Subscription) {
        self.handlers
            .entry(event.to_string())
            .or_insert_with(Vec::new)
            .push(subscription);
    }

    /// Drops matching subscriptions and hands them back with their event names.
    fn remove(
        &mut self,
        event: Option<&str>,
        handler: Option<&Method>,
        context: Option<&WeakObjectRef>,
    ) -> Vec<(String, Subscription)> {
        let mut removed = vec![];
        for (name, subs) in self.handlers.iter_mut() {
            if event.map(|e| e != name.as_str()).unwrap_or(false) {
                continue;
            }
            let (gone, kept): (Vec<Subscription>, Vec<Subscription>) =
                subs.drain(..).partition(|s| {
                    let handler_matches = handler.map(|h| h.same(&s.handler)).unwrap_or(true);
                    let context_matches = match (context, &s.context) {
                        (None, _) => true,
                        (Some(c), Some(sc)) => WeakObjectRef::ptr_eq(sc, c),
                        (Some(_), None) => false,
                    };
                    handler_matches && context_matches
                });
            *subs = kept;
            removed.extend(gone.into_iter().map(|s| (name.clone(), s)));
        }
        self.handlers.retain(|_, subs| !subs.is_empty());
        removed
    }

    /// Forgets what this table's owner listens to on `source` for `event` with `handler`.
    fn forget_listening(&mut self, source: &ObjectRef, event: &str, handler: &Method) {
        self.listening
            .retain(|l| !(l.source.points_to(source) && l.event == event && l.handler.same(handler)));
    }

    fn snapshot(&self, event: &str) -> Vec<Subscription> {
        self.handlers.get(event).cloned().unwrap_or_default()
    }

    /// Number of handlers for `event`, or for every event when `None`.
    pub fn handler_count(&self, event: Option<&str>) -> usize {
        match event {
            Some(e) => self.handlers.get(e).map(|s| s.len()).unwrap_or(0),
            None => self.handlers.values().map(|s| s.len()).sum(),
        }
    }

    /// Event names that currently have handlers, in subscription order.
    pub fn events(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn listening_count(&self) -> usize {
        self.listening.len()
    }
}

pub trait Emitter {
    fn on(&self, event: &str, handler: Method);

    /// Removes handlers. `None` matches every event / every handler.
    fn off(&self, event: Option<&str>, handler: Option<&Method>);

    fn trigger(&self, event: &str, args: Vec<Value>) -> KernelResult<()>;

    fn listen_to(&self, source: &ObjectRef, event: &str, handler: Method);

    /// Unhooks what this object listens to. `None` matches everything.
    fn stop_listening(
        &self,
        source: Option<&ObjectRef>,
        event: Option<&str>,
        handler: Option<&Method>,
    );
}

impl Emitter for ObjectRef {
    fn on(&self, event: &str, handler: Method) {
        self.with_events(|t| {
            t.add(
                event,
                Subscription {
                    handler,
                    context: None,
                },
            )
        });
    }

    fn off(&self, event: Option<&str>, handler: Option<&Method>) {
        let removed = self.with_events(|t| t.remove(event, handler, None));
        // listeners keep a record of each subscription they made here
        for (name, sub) in removed {
            if let Some(listener) = sub.context.as_ref().and_then(|c| c.upgrade()) {
                listener.with_events(|t| t.forget_listening(self, &name, &sub.handler));
            }
        }
    }

    fn trigger(&self, event: &str, args: Vec<Value>) -> KernelResult<()> {
        let (subs, all) = self.with_events(|t| {
            let all = if event == ALL_EVENTS {
                vec![]
            } else {
                t.snapshot(ALL_EVENTS)
            };
            (t.snapshot(event), all)
        });
        for sub in subs {
            dispatch(self, &sub, args.clone())?;
        }
        if !all.is_empty() {
            let mut all_args = Vec::with_capacity(args.len() + 1);
            all_args.push(Value::from(event));
            all_args.extend(args);
            for sub in all {
                dispatch(self, &sub, all_args.clone())?;
            }
        }
        Ok(())
    }

    fn listen_to(&self, source: &ObjectRef, event: &str, handler: Method) {
        source.with_events(|t| {
            t.add(
                event,
                Subscription {
                    handler: handler.clone(),
                    context: Some(self.downgrade()),
                },
            )
        });
        self.with_events(|t| {
            t.listening.retain(|l| l.source.upgrade().is_some());
            t.listening.push(Listening {
                source: source.downgrade(),
                event: event.to_string(),
                handler,
            })
        });
    }

    fn stop_listening(
        &self,
        source: Option<&ObjectRef>,
        event: Option<&str>,
        handler: Option<&Method>,
    ) {
        let removed: Vec<Listening> = self.with_events(|t| {
            let (removed, kept): (Vec<Listening>, Vec<Listening>) =
                t.listening.drain(..).partition(|l| {
                    source.map(|s| l.source.points_to(s)).unwrap_or(true)
                        && event.map(|e| e == l.event).unwrap_or(true)
                        && handler.map(|h| h.same(&l.handler)).unwrap_or(true)
                });
            t.listening = kept;
            removed
        });
        let me = self.downgrade();
        for l in removed {
            if let Some(src) = l.source.upgrade() {
                src.with_events(|t| {
                    t.remove(Some(&l.event), Some(&l.handler), Some(&me));
                });
            }
        }
    }
}

/// Runs one handler. Handlers whose listener is gone are skipped.
fn dispatch(emitter: &ObjectRef, sub: &Subscription, args: Vec<Value>) -> KernelResult<()> {
    let this = match &sub.context {
        None => emitter.clone(),
        Some(ctx) => match ctx.upgrade() {
            Some(listener) => listener,
            None => return Ok(()),
        },
    };
    sub.handler.call(&this, args)?;
    Ok(())
}
