use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::time::{Instant, MissedTickBehavior, sleep_until};

use murmur_interface::{ControlMessage, FinishCause, ListenParams, StreamResponse, TokenUpdate};
use murmur_transcript::{Transcript, Word, words_from_update};

use crate::ring::UpdateRing;

type WsSender = SplitSink<WebSocket, Message>;

const OVERFLOW_WARN_PERIOD: Duration = Duration::from_secs(5);

async fn send_ws(sender: &mut WsSender, value: &StreamResponse) -> bool {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!("failed to serialize ws response: {error}");
            return false;
        }
    };

    sender.send(Message::Text(payload.into())).await.is_ok()
}

enum LoopAction {
    Continue,
    Break,
}

/// State of an active feedback session (the client's long-running listen
/// request): a hard deadline, the running concatenation of everything heard
/// since it began, and the history of feedback payloads already sent.
struct ListenSession {
    deadline: Instant,
    batch_idx: u32,
    running: String,
    history: Vec<String>,
}

struct Throttle {
    period: Duration,
    last: Option<std::time::Instant>,
}

impl Throttle {
    fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    fn ready(&mut self) -> bool {
        let now = std::time::Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// One merge session per connection.
///
/// The socket's receive side is the producer: it deserializes updates into
/// the ring and never blocks on the merge. The drain timer is the consumer:
/// it empties the ring, merges every batch, and pushes one snapshot. While
/// a listen session is active the ring is additionally drained as soon as
/// it turns non-empty, so feedback latency is bounded by the poll interval
/// rather than the drain timer.
pub(crate) async fn handle_socket(socket: WebSocket, params: ListenParams) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let ring: UpdateRing<Vec<Word>> = UpdateRing::new(params.ring_capacity);
    let mut transcript = Transcript::new(params.allowed_gaps);
    let mut listen: Option<ListenSession> = None;
    let mut overflow_warn = Throttle::new(OVERFLOW_WARN_PERIOD);

    let mut drain = tokio::time::interval(Duration::from_millis(params.drain_interval_ms.max(1)));
    drain.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let poll_interval = Duration::from_millis(params.poll_interval_ms.max(1));

    loop {
        let deadline = listen.as_ref().map(|l| l.deadline);
        let action = tokio::select! {
            _ = drain.tick() => {
                drain_and_merge(&mut ws_sender, &ring, &mut transcript, &mut listen).await
            }
            _ = ring.wait_nonempty(poll_interval), if listen.is_some() => {
                drain_and_merge(&mut ws_sender, &ring, &mut transcript, &mut listen).await
            }
            _ = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() => {
                finish_listen(
                    &mut ws_sender,
                    &mut listen,
                    FinishCause::TimedOut,
                    "Inference timed out.",
                )
                .await
            }
            msg = ws_receiver.next() => {
                handle_message(msg, &ring, &mut ws_sender, &mut listen, &mut overflow_warn).await
            }
        };

        if matches!(action, LoopAction::Break) {
            break;
        }
    }

    // A still-active session at socket teardown counts as a success.
    if listen.is_some() {
        let _ = finish_listen(
            &mut ws_sender,
            &mut listen,
            FinishCause::Succeeded,
            "Inference succeeded.",
        )
        .await;
    }

    let _ = ws_sender.close().await;
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400)
}

/// Drain the ring, merge every batch, then serialize once. Merge and
/// serialize run back-to-back on this task, so snapshots never observe a
/// half-applied batch.
async fn drain_and_merge(
    ws_sender: &mut WsSender,
    ring: &UpdateRing<Vec<Word>>,
    transcript: &mut Transcript,
    listen: &mut Option<ListenSession>,
) -> LoopAction {
    let mut merged = 0usize;
    let mut drained_text = String::new();

    while let Some(words) = ring.dequeue() {
        merged += 1;
        if listen.is_some() {
            for word in words.iter().filter(|w| !w.is_segment()) {
                drained_text.push_str(&word.text());
            }
        }
        transcript.merge_update(words);
    }

    if merged == 0 {
        return LoopAction::Continue;
    }

    tracing::debug!(
        batches = merged,
        words = transcript.len(),
        stale = transcript.stale_word_id(),
        "updates_merged"
    );

    let snapshot = transcript.snapshot();
    if !send_ws(
        ws_sender,
        &StreamResponse::TranscriptResponse {
            transcript: snapshot,
        },
    )
    .await
    {
        return LoopAction::Break;
    }

    if let Some(session) = listen.as_mut() {
        session.running.push_str(&drained_text);
        session.history.push(session.running.clone());
        let response = StreamResponse::FeedbackResponse {
            transcription: session.running.clone(),
            batch_idx: session.batch_idx,
        };
        session.batch_idx += 1;
        if !send_ws(ws_sender, &response).await {
            return LoopAction::Break;
        }
    }

    LoopAction::Continue
}

async fn finish_listen(
    ws_sender: &mut WsSender,
    listen: &mut Option<ListenSession>,
    cause: FinishCause,
    info: &str,
) -> LoopAction {
    let Some(session) = listen.take() else {
        return LoopAction::Continue;
    };

    tracing::info!(?cause, drains = session.history.len(), "listen_session_finished");

    let response = StreamResponse::ResultResponse {
        transcriptions: session.history,
        info: info.to_string(),
        cause,
    };
    if send_ws(ws_sender, &response).await {
        LoopAction::Continue
    } else {
        LoopAction::Break
    }
}

async fn handle_message(
    msg: Option<Result<Message, axum::Error>>,
    ring: &UpdateRing<Vec<Word>>,
    ws_sender: &mut WsSender,
    listen: &mut Option<ListenSession>,
    overflow_warn: &mut Throttle,
) -> LoopAction {
    let Some(msg) = msg else {
        tracing::info!("websocket_stream_ended");
        return LoopAction::Break;
    };
    let msg = match msg {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("websocket_receive_error: {}", e);
            return LoopAction::Break;
        }
    };

    match msg {
        Message::Text(text) => {
            if let Ok(ctrl) = serde_json::from_str::<ControlMessage>(&text) {
                return handle_control(ctrl, ws_sender, listen).await;
            }
            match serde_json::from_str::<TokenUpdate>(&text) {
                Ok(update) => enqueue_update(&update, ring, overflow_warn),
                Err(e) => {
                    tracing::warn!(error = %e, "unrecognized_text_frame_skipped");
                    LoopAction::Continue
                }
            }
        }
        Message::Close(_) => LoopAction::Break,
        _ => LoopAction::Continue,
    }
}

fn enqueue_update(
    update: &TokenUpdate,
    ring: &UpdateRing<Vec<Word>>,
    overflow_warn: &mut Throttle,
) -> LoopAction {
    let words = match words_from_update(update) {
        Ok(words) => words,
        Err(e) => {
            tracing::warn!(error = %e, "malformed_update_skipped");
            return LoopAction::Continue;
        }
    };

    if words.is_empty() {
        return LoopAction::Continue;
    }

    if !ring.enqueue(words) {
        if overflow_warn.ready() {
            tracing::warn!("transcription buffer full, dropping update");
        }
    } else if ring.almost_full() && overflow_warn.ready() {
        tracing::warn!("transcription buffer almost full");
    }

    LoopAction::Continue
}

async fn handle_control(
    ctrl: ControlMessage,
    ws_sender: &mut WsSender,
    listen: &mut Option<ListenSession>,
) -> LoopAction {
    match ctrl {
        ControlMessage::Listen { max_duration_ms } => {
            if listen.is_some() {
                let response = StreamResponse::ErrorResponse {
                    error_message: "listen session already active".to_string(),
                };
                return if send_ws(ws_sender, &response).await {
                    LoopAction::Continue
                } else {
                    LoopAction::Break
                };
            }

            tracing::info!(max_duration_ms, "listen_session_started");
            *listen = Some(ListenSession {
                deadline: Instant::now() + Duration::from_millis(max_duration_ms),
                batch_idx: 0,
                running: String::new(),
                history: Vec::new(),
            });
            LoopAction::Continue
        }
        ControlMessage::CancelListen => {
            finish_listen(ws_sender, listen, FinishCause::Cancelled, "Inference cancelled.").await
        }
        ControlMessage::KeepAlive => LoopAction::Continue,
        ControlMessage::CloseStream => LoopAction::Break,
    }
}
