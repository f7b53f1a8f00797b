//! Reader tracing.
//!
//! Every reader entry and exit is reported to a host-supplied sink,
//! correlated parent-to-child so a consumer can rebuild the call tree.
//! Sinks must tolerate being called mid-failure and must not mutate parser
//! state; a sink that fails aborts the parse with a host error.

use std::rc::Rc;

use crate::error::{ParseErrorKind, ParseResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TracePhase {
    Entry,
    Exit,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TraceEvent {
    /// Correlation id of the enclosing reader, if any.
    pub correlation_parent: Option<u64>,
    pub correlation_id: u64,
    pub phase: TracePhase,
    pub reader: &'static str,
    pub metadata: Option<&'static str>,
}

pub trait TraceSink {
    /// Report one event. An error here unwinds the parse as
    /// [`ParseErrorKind::Unknown`].
    fn emit(&self, event: &TraceEvent) -> Result<(), Box<dyn std::error::Error>>;
}

impl<F: Fn(&TraceEvent)> TraceSink for F {
    fn emit(&self, event: &TraceEvent) -> Result<(), Box<dyn std::error::Error>> {
        self(event);
        Ok(())
    }
}

/// Handle returned by [`Trace::enter`]; passed back on exit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TraceHandle {
    correlation_id: u64,
    depth: usize,
}

/// Correlation bookkeeping for one parse state.
///
/// Errors unwind without emitting exits; the stack self-heals because exit
/// truncates to the handle's depth rather than popping blindly.
pub(crate) struct Trace {
    sink: Option<Rc<dyn TraceSink>>,
    next_correlation_id: u64,
    stack: Vec<u64>,
}

impl Trace {
    pub(crate) fn new(sink: Option<Rc<dyn TraceSink>>) -> Self {
        Self {
            sink,
            next_correlation_id: 0,
            stack: Vec::new(),
        }
    }

    pub(crate) fn enter(&mut self, reader: &'static str) -> ParseResult<TraceHandle> {
        let correlation_id = self.next_correlation_id;
        self.next_correlation_id += 1;
        let handle = TraceHandle {
            correlation_id,
            depth: self.stack.len(),
        };
        if let Some(sink) = &self.sink {
            sink.emit(&TraceEvent {
                correlation_parent: self.stack.last().copied(),
                correlation_id,
                phase: TracePhase::Entry,
                reader,
                metadata: None,
            })
            .map_err(|error| ParseErrorKind::Unknown(error.to_string()))?;
        }
        self.stack.push(correlation_id);
        Ok(handle)
    }

    pub(crate) fn exit(&mut self, handle: TraceHandle, reader: &'static str) -> ParseResult<()> {
        self.stack.truncate(handle.depth);
        if let Some(sink) = &self.sink {
            sink.emit(&TraceEvent {
                correlation_parent: self.stack.last().copied(),
                correlation_id: handle.correlation_id,
                phase: TracePhase::Exit,
                reader,
                metadata: None,
            })
            .map_err(|error| ParseErrorKind::Unknown(error.to_string()))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trace")
            .field("sink", &self.sink.is_some())
            .field("next_correlation_id", &self.next_correlation_id)
            .field("stack", &self.stack)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn entries_and_exits_correlate() {
        let events: Rc<RefCell<Vec<TraceEvent>>> = Rc::default();
        let captured = events.clone();
        let sink = move |event: &TraceEvent| captured.borrow_mut().push(event.clone());
        let mut trace = Trace::new(Some(Rc::new(sink)));

        let outer = trace.enter("outer").unwrap();
        let inner = trace.enter("inner").unwrap();
        trace.exit(inner, "inner").unwrap();
        trace.exit(outer, "outer").unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].correlation_parent, None);
        assert_eq!(events[1].correlation_parent, Some(events[0].correlation_id));
        assert_eq!(events[2].phase, TracePhase::Exit);
        assert_eq!(events[3].correlation_parent, None);
    }

    #[test]
    fn failing_sinks_become_host_errors() {
        struct Failing;
        impl TraceSink for Failing {
            fn emit(&self, _event: &TraceEvent) -> Result<(), Box<dyn std::error::Error>> {
                Err("sink unavailable".into())
            }
        }
        let mut trace = Trace::new(Some(Rc::new(Failing)));
        let error = trace.enter("reader").unwrap_err();
        assert!(matches!(error, ParseErrorKind::Unknown(_)));
    }
}
