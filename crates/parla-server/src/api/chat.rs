use crate::api::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures::{StreamExt, stream};
use parla_ai::{CompletionRequest, StreamResult, UiStreamRelay, convert_to_model_messages};
use parla_models::{ChatRequest, DONE_SENTINEL, UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION};

// POST /api/chat
//
// Always answers 200 with a UI message stream; model failures arrive as an
// `error` event inside the stream.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    tracing::info!(
        id = %request.id,
        messages = request.messages.len(),
        temperature = ?request.temperature,
        max_output_tokens = ?request.max_output_tokens,
        model = %request.model,
        "/api/chat"
    );

    let system_prompt = request
        .system_prompt
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or_else(|| state.default_system_prompt.clone());

    let relay = UiStreamRelay::for_history(&request.messages);
    let completion = CompletionRequest::new(convert_to_model_messages(&request.messages))
        .with_system(system_prompt)
        .with_temperature(request.temperature)
        .with_max_output_tokens(request.max_output_tokens);

    let chunks: StreamResult = match state.registry.resolve(&request.model) {
        Ok(client) => client.complete_stream(completion),
        Err(error) => Box::pin(stream::once(async move { Err(error) })),
    };

    let events = relay
        .relay(chunks)
        .map(|event| Event::default().json_data(event))
        .chain(stream::once(async {
            Ok::<_, axum::Error>(Event::default().data(DONE_SENTINEL))
        }));

    (
        [
            (
                HeaderName::from_static(UI_MESSAGE_STREAM_HEADER),
                HeaderValue::from_static(UI_MESSAGE_STREAM_VERSION),
            ),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(events),
    )
}
