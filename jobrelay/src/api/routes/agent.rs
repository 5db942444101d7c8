//! Agent-facing prompt route.
//!
//! Forwards the prompt to the LLM with the `enqueue_job` tool attached,
//! relays any tool call to the dispatch endpoint, and streams progress to
//! the caller as server-sent events. The upstream LLM call is a single
//! request; SSE is the bridge's own event framing.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::models::{AgentEvent, PromptRequest};
use crate::api::server::AppState;
use crate::dispatch::{self, EnqueueJobCall};
use crate::llm::ContentBlock;

/// Create the agent router.
pub fn router() -> Router<AppState> {
    Router::new().route("/prompt", post(prompt))
}

/// Bridge a prompt to the LLM and stream the outcome.
async fn prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::channel::<AgentEvent>(16);

    tokio::spawn(run_agent(state, request.prompt, tx));

    let stream = futures::stream::poll_fn(move |cx| rx.poll_recv(cx)).map(
        |event| -> Result<Event, Infallible> {
            Ok(Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data("{}")))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// The bridge pipeline. Every outcome, including failure, is reported as an
/// event; the stream always terminates with `Done`.
async fn run_agent(state: AppState, prompt: String, tx: mpsc::Sender<AgentEvent>) {
    let tools = [dispatch::enqueue_job_tool()];

    let reply = match state.llm.complete(&prompt, &tools).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "LLM request failed");
            let _ = tx
                .send(AgentEvent::Error {
                    message: e.to_string(),
                })
                .await;
            let _ = tx.send(AgentEvent::Done).await;
            return;
        }
    };

    for block in reply.blocks {
        match block {
            ContentBlock::Text { text } => {
                let _ = tx.send(AgentEvent::Text { text }).await;
            }
            ContentBlock::ToolUse { name, input, .. } => {
                let _ = tx
                    .send(AgentEvent::ToolCall {
                        name: name.clone(),
                        input: input.clone(),
                    })
                    .await;

                if name != dispatch::ENQUEUE_JOB_TOOL {
                    warn!(tool = %name, "model called an unknown tool");
                    let _ = tx
                        .send(AgentEvent::Error {
                            message: format!("unknown tool: {name}"),
                        })
                        .await;
                    continue;
                }

                let call = match EnqueueJobCall::from_tool_input(&input) {
                    Ok(call) => call,
                    Err(e) => {
                        let _ = tx
                            .send(AgentEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                        continue;
                    }
                };

                match state.dispatch.enqueue(&call).await {
                    Ok(ack) => {
                        info!(job_id = %ack.job_id, "tool call relayed, job enqueued");
                        let _ = tx
                            .send(AgentEvent::JobEnqueued { job_id: ack.job_id })
                            .await;
                    }
                    Err(e) => {
                        warn!(error = %e, "dispatch relay failed");
                        let _ = tx
                            .send(AgentEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                    }
                }
            }
        }
    }

    let _ = tx.send(AgentEvent::Done).await;
}
