use finchat_core::{Action, BackendReply, ChatClient, ChatState, Failure, Message, Sender, FALLBACK_REPLY};
use serde_json::json;
use std::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind temp port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

async fn backend_replying(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

/// Submit the input buffer and, if accepted, run the backend call to completion
/// the way the UI does. Returns whether a request was made.
async fn dispatch_input(state: &mut ChatState, client: &ChatClient) -> bool {
    let Some(dispatch) = state.update(Action::SubmitStarted) else {
        return false;
    };

    let outcome = client.ask(&dispatch.query).await;
    state.update(Action::ResponseReceived {
        ticket: dispatch.ticket,
        outcome,
    });
    true
}

/// Type `text` and submit it, checking the user message and cleared input.
async fn submit(state: &mut ChatState, client: &ChatClient, text: &str) {
    state.update(Action::InputChanged(text.to_string()));
    let before = state.messages().len();

    assert!(dispatch_input(state, client).await, "non-empty input dispatches");

    assert_eq!(state.current_input(), "");
    assert_eq!(state.messages()[before], Message::user(text));
}

fn bot_messages(state: &ChatState) -> Vec<&Message> {
    state
        .messages()
        .iter()
        .filter(|m| m.sender == Sender::Bot)
        .collect()
}

#[tokio::test]
async fn test_quote_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .and(query_param("query", "What is the price of AAPL?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ticker": "AAPL",
            "price": 150.25,
            "timestamp": "2024-01-01T00:00:00Z",
            "source": "TestFeed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri());
    let mut state = ChatState::new();
    submit(&mut state, &client, "What is the price of AAPL?").await;

    assert_eq!(state.messages().len(), 2);
    assert_eq!(
        state.messages()[1],
        Message::bot("AAPL is $150.25 as of 2024-01-01T00:00:00Z (Source: TestFeed)")
    );
}

#[tokio::test]
async fn test_message_reply() {
    let server = backend_replying(
        ResponseTemplate::new(200).set_body_json(json!({ "message": "I don't understand" })),
    )
    .await;

    let client = ChatClient::new(&server.uri());
    let mut state = ChatState::new();
    submit(&mut state, &client, "tell me a joke").await;

    assert_eq!(bot_messages(&state), vec![&Message::bot("I don't understand")]);
}

#[tokio::test]
async fn test_empty_reply_uses_fallback() {
    let server = backend_replying(ResponseTemplate::new(200).set_body_json(json!({}))).await;

    let client = ChatClient::new(&server.uri());
    let mut state = ChatState::new();
    submit(&mut state, &client, "what's the weather").await;

    assert_eq!(bot_messages(&state), vec![&Message::bot(FALLBACK_REPLY)]);
}

#[tokio::test]
async fn test_server_error_status() {
    let server = backend_replying(ResponseTemplate::new(500)).await;

    let client = ChatClient::new(&server.uri());
    assert_eq!(client.ask("price of BTC").await, Err(Failure::Status(500)));

    let mut state = ChatState::new();
    submit(&mut state, &client, "price of BTC").await;

    let bots = bot_messages(&state);
    assert_eq!(bots.len(), 1);
    assert!(bots[0].text.contains("500"));
}

#[tokio::test]
async fn test_malformed_body() {
    let server = backend_replying(ResponseTemplate::new(200).set_body_string("not json")).await;

    let client = ChatClient::new(&server.uri());
    let mut state = ChatState::new();
    submit(&mut state, &client, "price of ETH").await;

    let bots = bot_messages(&state);
    assert_eq!(bots.len(), 1);
    assert!(bots[0].text.starts_with("Error: invalid response body"));
}

#[tokio::test]
async fn test_connection_refused() {
    let client = ChatClient::new(&format!("http://127.0.0.1:{}", free_port()));

    let outcome = client.ask("price of BTC").await;
    let description = match &outcome {
        Err(Failure::Transport(description)) => description.clone(),
        other => panic!("expected transport failure, got {:?}", other),
    };

    let mut state = ChatState::new();
    submit(&mut state, &client, "price of BTC").await;

    let bots = bot_messages(&state);
    assert_eq!(bots.len(), 1);
    assert!(bots[0].text.starts_with("Error: "));
    assert!(bots[0].text.contains(&description));
    assert!(!state.is_waiting());
}

#[tokio::test]
async fn test_blank_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri());
    let mut state = ChatState::new();

    for blank in ["", "   ", "\t\n"] {
        state.update(Action::InputChanged(blank.to_string()));

        assert!(!dispatch_input(&mut state, &client).await);
        assert!(state.messages().is_empty());
        assert_eq!(state.current_input(), blank);
    }

    server.verify().await;
    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_gateway_error_body() {
    let server = backend_replying(ResponseTemplate::new(200).set_body_json(json!({
        "error": "Failed to fetch price: 502 Server Error"
    })))
    .await;

    let client = ChatClient::new(&server.uri());
    assert_eq!(
        client.ask("price of XRP").await,
        Ok(BackendReply::Rejected {
            error: "Failed to fetch price: 502 Server Error".to_string()
        })
    );
}

#[tokio::test]
async fn test_greeting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Welcome to the Finance NLP Chatbot API"
        })))
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri());
    assert_eq!(
        client.greeting().await.unwrap(),
        "Welcome to the Finance NLP Chatbot API"
    );
}
