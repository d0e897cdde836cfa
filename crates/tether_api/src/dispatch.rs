use std::collections::HashMap;

use crate::events::{EventKind, StreamEvent};
use crate::sse::RawFrame;

type Handler<C> = Box<dyn FnMut(&mut C, StreamEvent) + Send>;

/// Per-kind handler registry for decoded stream events.
///
/// Handlers run synchronously, in frame arrival order. After a `done` event
/// has been handled the dispatcher refuses further frames, so anything still
/// buffered in the connection is never dispatched.
pub struct EventDispatcher<C> {
    handlers: HashMap<EventKind, Handler<C>>,
    done: bool,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            done: false,
        }
    }

    /// Register the handler for one event kind, replacing any previous one.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&mut C, StreamEvent) + Send + 'static,
    ) -> &mut Self {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Parse and dispatch one frame. Returns `false` once consumption should
    /// stop; malformed frames are skipped and consumption continues.
    pub fn dispatch_frame(&mut self, ctx: &mut C, frame: &RawFrame) -> bool {
        if self.done {
            return false;
        }

        match StreamEvent::from_frame(frame) {
            Some(event) => self.dispatch(ctx, event),
            None => true,
        }
    }

    /// Dispatch an already-parsed event.
    pub fn dispatch(&mut self, ctx: &mut C, event: StreamEvent) -> bool {
        if self.done {
            return false;
        }

        let kind = event.kind();
        if let Some(handler) = self.handlers.get_mut(&kind) {
            handler(ctx, event);
        }

        if kind == EventKind::Done {
            self.done = true;
        }

        !self.done
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use crate::events::{EventKind, StreamEvent};
    use crate::sse::RawFrame;

    use super::EventDispatcher;

    fn frame(event: &str, data: &str) -> RawFrame {
        RawFrame {
            event: Some(event.to_string()),
            data: data.to_string(),
        }
    }

    #[test]
    fn handlers_fire_in_arrival_order() {
        let mut dispatcher: EventDispatcher<Vec<String>> = EventDispatcher::new();
        dispatcher.on(EventKind::Text, |seen, event| {
            if let StreamEvent::Text { content } = event {
                seen.push(content);
            }
        });

        let mut seen = Vec::new();
        assert!(dispatcher.dispatch_frame(&mut seen, &frame("text", "\"a\"")));
        assert!(dispatcher.dispatch_frame(&mut seen, &frame("text", "\"b\"")));
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn malformed_frame_is_skipped_without_stopping() {
        let mut dispatcher: EventDispatcher<()> = EventDispatcher::new();
        assert!(dispatcher.dispatch_frame(&mut (), &frame("text", "not json")));
        assert!(!dispatcher.is_done());
    }

    #[test]
    fn done_halts_dispatch_immediately() {
        let mut dispatcher: EventDispatcher<Vec<&'static str>> = EventDispatcher::new();
        dispatcher.on(EventKind::Done, |seen, _| seen.push("done"));
        dispatcher.on(EventKind::Text, |seen, _| seen.push("text"));

        let mut seen = Vec::new();
        assert!(!dispatcher.dispatch_frame(&mut seen, &frame("done", "{}")));
        assert!(!dispatcher.dispatch_frame(&mut seen, &frame("text", "\"late\"")));
        assert_eq!(seen, vec!["done"]);
        assert!(dispatcher.is_done());
    }

    #[test]
    fn unhandled_kinds_are_consumed_quietly() {
        let mut dispatcher: EventDispatcher<()> = EventDispatcher::new();
        assert!(dispatcher.dispatch_frame(&mut (), &frame("thinking", "{}")));
    }
}
