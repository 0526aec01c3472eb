use loopgraph_model::Message;

/// What to do after the model produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Run the pending tool calls, then call the model again.
    Continue,
    /// The run is complete.
    Stop,
}

/// Decides whether the run goes on, by looking at the latest message only.
///
/// Any message carrying pending tool calls continues the run, whatever
/// its role or content; everything else, including an empty
/// conversation, stops it.
#[inline]
pub fn decide(latest: Option<&Message>) -> Decision {
    match latest {
        Some(msg) if !msg.pending_tool_calls().is_empty() => Decision::Continue,
        _ => Decision::Stop,
    }
}
