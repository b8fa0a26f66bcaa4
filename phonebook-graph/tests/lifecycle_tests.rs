use std::path::Path;

use phonebook_graph::Configuration;
use phonebook_graph::PhonebookServer;
use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;
use tokio::sync::oneshot;

fn fixture_configuration() -> Configuration {
    Configuration::from_file(
        &Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/phonebook.yaml"),
    )
    .unwrap()
}

#[test_log::test(tokio::test)]
async fn serves_the_configured_endpoints() {
    let server = PhonebookServer::bind(&fixture_configuration())
        .await
        .unwrap();
    let address = server.local_addr().unwrap();
    let (shutdown, shutdown_signal) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(async move {
        let _ = shutdown_signal.await;
    }));
    let client = reqwest::Client::new();

    let health = client
        .get(format!("http://{address}/.well-known/apollo/server-health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.json::<Value>().await.unwrap(), json!({"status": "pass"}));

    let added: Value = client
        .post(format!("http://{address}/graphql"))
        .json(&json!({
            "query": "mutation { addPerson(name: \"Ada\", phone: \"1\", street: \"S\", city: \"C\") { name phone } }"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        added,
        json!({"data": {"addPerson": {"name": "Ada", "phone": "1"}}})
    );

    let counted: Value = client
        .get(format!("http://{address}/graphql"))
        .query(&[("query", "{ personCount }")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(counted, json!({"data": {"personCount": 4}}));

    // the landing page is turned off in the fixture
    let bare = client
        .get(format!("http://{address}/graphql"))
        .send()
        .await
        .unwrap();
    assert_eq!(bare.status(), StatusCode::BAD_REQUEST);

    shutdown.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_failures_are_reported() {
    let first = PhonebookServer::bind(&fixture_configuration())
        .await
        .unwrap();

    let mut configuration = fixture_configuration();
    configuration.set_listen(first.local_addr().unwrap());
    let error = PhonebookServer::bind(&configuration)
        .await
        .err()
        .expect("the address is taken");
    assert!(
        error.to_string().starts_with("could not listen on"),
        "{error}"
    );
}
