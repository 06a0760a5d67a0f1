//! End-to-end analysis session against a mock gateway.

use mgw_client::{AnalysisSession, GatewayClient};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn session_renders_fields_incrementally_and_freezes_them() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "data:[grammar]Past tense\n\n",
                "data: used here.[phrases]go,\n\n",
                "data: went[tip]Remember go-went\n\n",
                "data: [DONE]\n\n",
            ),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let client = GatewayClient::new(server.uri());
    let tokens = client.analyze("He went home.").await.unwrap();

    let mut seen = Vec::new();
    let fields = AnalysisSession::new()
        .run(tokens, |delta| {
            seen.push((delta.name, delta.value.clone()));
        })
        .await
        .unwrap();

    // Payload trimming drops the leading spaces of continuation tokens, so
    // the frozen grammar reads "Past tenseused here." exactly as the
    // original client assembled it.
    assert_eq!(fields.grammar, "Past tenseused here.");
    assert_eq!(fields.phrases, vec!["go", "went"]);
    assert_eq!(fields.memory_tip, "Remember go-went");

    // Every reported delta was non-empty and fields only ever grew.
    assert!(seen.iter().all(|(_, value)| !value.is_empty()));
    let grammar_updates: Vec<&String> = seen
        .iter()
        .filter(|(name, _)| *name == "grammar")
        .map(|(_, value)| value)
        .collect();
    assert_eq!(grammar_updates.len(), 2);
    assert!(grammar_updates[1].starts_with(grammar_updates[0].as_str()));
}

#[tokio::test]
async fn session_survives_marker_drift() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data:The model ignored the marker protocol entirely.\n\ndata: [DONE]\n\n",
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let client = GatewayClient::new(server.uri());
    let tokens = client.analyze("text").await.unwrap();

    let fields = AnalysisSession::new().run(tokens, |_| {}).await.unwrap();
    assert!(fields.grammar.is_empty());
    assert!(fields.phrases.is_empty());
    assert!(fields.memory_tip.is_empty());
}
