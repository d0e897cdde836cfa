//! Chat stream consumption: progress signals multiplexed around literal
//! assistant text.

use std::io::Write;

use tether_api::{
    CancellationSignal, ChatRequest, EventDispatcher, EventKind, RelayClient, StreamEvent,
};

use crate::error::EngineError;
use crate::progress::ProgressTracker;

struct ChatCtx<'a, W: Write, O: Write> {
    progress: &'a mut ProgressTracker<W>,
    out: &'a mut O,
}

/// Stream one chat exchange to completion.
///
/// Progress events drive the status line; `text` events pause it, write the
/// literal content, and resume; `done` clears everything and ends the read
/// loop even if the connection still has bytes buffered. On any error the
/// status line is torn down before the error propagates so the terminal is
/// never left with a dangling spinner.
pub async fn run_chat<W, O>(
    client: &RelayClient,
    request: &ChatRequest,
    progress: &mut ProgressTracker<W>,
    out: &mut O,
    cancellation: Option<&CancellationSignal>,
) -> Result<(), EngineError>
where
    W: Write + Send,
    O: Write + Send,
{
    let result = {
        let mut dispatcher = build_dispatcher::<W, O>();
        let mut ctx = ChatCtx {
            progress: &mut *progress,
            out,
        };

        client
            .stream_chat(request, cancellation, &mut dispatcher, &mut ctx)
            .await
    };

    progress.finish();
    result.map_err(EngineError::from)
}

fn build_dispatcher<'a, W, O>() -> EventDispatcher<ChatCtx<'a, W, O>>
where
    W: Write + Send,
    O: Write + Send,
{
    let mut dispatcher = EventDispatcher::new();

    dispatcher.on(EventKind::ToolCall, |ctx: &mut ChatCtx<W, O>, event| {
        if let StreamEvent::ToolCall { tool } = event {
            ctx.progress.tool_started(&tool);
        }
    });
    dispatcher.on(EventKind::ToolResult, |ctx: &mut ChatCtx<W, O>, event| {
        if let StreamEvent::ToolResult { tool } = event {
            ctx.progress.tool_finished(&tool);
        }
    });
    dispatcher.on(
        EventKind::SubagentSpawned,
        |ctx: &mut ChatCtx<W, O>, event| {
            if let StreamEvent::SubagentSpawned { label, subtype } = event {
                ctx.progress.subagent_spawned(&label, subtype.as_deref());
            }
        },
    );
    dispatcher.on(
        EventKind::SubagentCompleted,
        |ctx: &mut ChatCtx<W, O>, event| {
            if let StreamEvent::SubagentCompleted { label } = event {
                ctx.progress.subagent_finished(&label);
            }
        },
    );
    dispatcher.on(
        EventKind::SubagentFailed,
        |ctx: &mut ChatCtx<W, O>, event| {
            if let StreamEvent::SubagentFailed { label } = event {
                ctx.progress.subagent_finished(&label);
            }
        },
    );
    dispatcher.on(
        EventKind::SubtypeChange,
        |ctx: &mut ChatCtx<W, O>, event| {
            if let StreamEvent::SubtypeChange { subtype } = event {
                ctx.progress.set_subtype(&subtype);
            }
        },
    );
    dispatcher.on(EventKind::Thinking, |ctx: &mut ChatCtx<W, O>, event| {
        if let StreamEvent::Thinking { text } = event {
            ctx.progress
                .set_notice(text.unwrap_or_else(|| "thinking".to_string()));
        }
    });
    dispatcher.on(EventKind::TaskStarted, |ctx: &mut ChatCtx<W, O>, event| {
        if let StreamEvent::TaskStarted { task } = event {
            ctx.progress.set_notice(task);
        }
    });
    dispatcher.on(EventKind::TaskCompleted, |ctx: &mut ChatCtx<W, O>, _| {
        ctx.progress.clear_notice();
    });
    dispatcher.on(EventKind::Text, |ctx: &mut ChatCtx<W, O>, event| {
        if let StreamEvent::Text { content } = event {
            ctx.progress.pause();
            ctx.progress.clear_notice();
            let _ = ctx.out.write_all(content.as_bytes());
            let _ = ctx.out.flush();
            ctx.progress.resume();
        }
    });
    dispatcher.on(EventKind::Done, |ctx: &mut ChatCtx<W, O>, _| {
        ctx.progress.finish();
    });

    dispatcher
}
