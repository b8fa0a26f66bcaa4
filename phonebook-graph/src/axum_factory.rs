//! Axum http server factory. Axum provides routing capability on top of Hyper HTTP.
use std::future::Future;
use std::net::SocketAddr;

use async_graphql::BatchRequest;
use async_graphql::Request;
use async_graphql::http::GraphiQLSource;
use async_graphql::http::parse_query_string;
use async_graphql::parser::parse_query;
use async_graphql::parser::types::DocumentOperations;
use async_graphql::parser::types::OperationType;
use axum::Json;
use axum::Router;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::configuration::Configuration;
use crate::configuration::ConfigurationError;
use crate::directory::Directory;
use crate::error::ServerError;
use crate::schema::PhonebookSchema;
use crate::schema::build_schema;

#[derive(Clone)]
struct GraphqlState {
    schema: PhonebookSchema,
    landing_page: Option<String>,
}

/// Routes the GraphQL endpoint and the health check, with CORS and request tracing.
pub fn make_router(
    schema: PhonebookSchema,
    configuration: &Configuration,
) -> Result<Router, ConfigurationError> {
    let cors = configuration.cors.clone().into_layer().map_err(|error| {
        ConfigurationError::InvalidConfiguration {
            message: "CORS configuration error",
            error,
        }
    })?;

    let server = &configuration.server;
    let landing_page = server.landing_page.then(|| {
        GraphiQLSource::build()
            .endpoint(&server.graphql_path)
            .finish()
    });

    let graphql = Router::new()
        .route(&server.graphql_path, get(handle_get).post(handle_post))
        .with_state(GraphqlState {
            schema,
            landing_page,
        });

    Ok(Router::new()
        .route(&server.health_check_path, get(health_check))
        .merge(graphql)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

async fn handle_post(
    State(state): State<GraphqlState>,
    Json(request): Json<BatchRequest>,
) -> impl IntoResponse {
    tracing::debug!("executing graphql request");
    Json(state.schema.execute_batch(request).await)
}

async fn handle_get(State(state): State<GraphqlState>, RawQuery(query): RawQuery) -> Response {
    let Some(query) = query.filter(|query| !query.is_empty()) else {
        return match state.landing_page {
            Some(page) => Html(page).into_response(),
            None => graphql_error(StatusCode::BAD_REQUEST, "GET query missing."),
        };
    };

    let request = match parse_query_string(&query) {
        Ok(request) => request,
        Err(error) => {
            return graphql_error(
                StatusCode::BAD_REQUEST,
                &format!("Invalid GraphQL request: {error}"),
            );
        }
    };

    if selects_mutation(&request) {
        return graphql_error(
            StatusCode::METHOD_NOT_ALLOWED,
            "GET supports only query operation",
        );
    }

    tracing::debug!("executing graphql request");
    Json(state.schema.execute(request).await).into_response()
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "pass" }))
}

fn graphql_error(status: StatusCode, message: &str) -> Response {
    let response = async_graphql::Response::from_errors(vec![async_graphql::ServerError::new(
        message, None,
    )]);
    (status, Json(response)).into_response()
}

// Documents that fail to parse are left to the executor, which reports the syntax error.
fn selects_mutation(request: &Request) -> bool {
    let Ok(document) = parse_query(&request.query) else {
        return false;
    };
    match document.operations {
        DocumentOperations::Single(operation) => operation.node.ty == OperationType::Mutation,
        DocumentOperations::Multiple(operations) => operations.iter().any(|(name, operation)| {
            operation.node.ty == OperationType::Mutation
                && request
                    .operation_name
                    .as_deref()
                    .is_none_or(|selected| selected == name.as_str())
        }),
    }
}

/// A bound listener and the router it will serve.
pub struct PhonebookServer {
    listener: TcpListener,
    router: Router,
    graphql_path: String,
}

impl PhonebookServer {
    /// Builds the directory and schema described by `configuration` and binds its listen address.
    pub async fn bind(configuration: &Configuration) -> Result<Self, ServerError> {
        let directory = Directory::from_configuration(configuration)?;
        let schema = build_schema(directory, configuration.server.introspection);
        let router = make_router(schema, configuration)?;

        let listen = configuration.server.listen;
        let listener = TcpListener::bind(listen)
            .await
            .map_err(|source| ServerError::Bind { listen, source })?;

        Ok(Self {
            listener,
            router,
            graphql_path: configuration.server.graphql_path.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::Serve)
    }

    /// Serves requests until `shutdown` resolves, then drains in-flight connections.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.local_addr()?;
        tracing::info!(
            "GraphQL endpoint exposed at http://{}{} 🚀",
            address,
            self.graphql_path
        );

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use http::Method;
    use http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
    use http::header::CONTENT_TYPE;
    use http::header::ORIGIN;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::configuration::Server;
    use crate::id::SequentialIdGenerator;
    use crate::person::person;
    use crate::store::PersonStore;

    fn router(configuration: &Configuration) -> Router {
        let store = PersonStore::new(vec![
            person("1", "A", None, "S", "C"),
            person("2", "B", Some("22"), "T", "D"),
        ]);
        let directory = Directory::new(Arc::new(store))
            .with_id_generator(SequentialIdGenerator::starting_at(3));
        make_router(build_schema(directory, true), configuration).unwrap()
    }

    async fn send(router: Router, request: http::Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post(path: &str, body: serde_json::Value) -> http::Request<Body> {
        http::Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> http::Request<Body> {
        http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn health_check_passes() {
        let (status, body) = send(
            router(&Configuration::default()),
            get("/.well-known/apollo/server-health"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), json!({"status": "pass"}));
    }

    #[tokio::test]
    async fn post_executes_queries_and_mutations() {
        let router = router(&Configuration::default());

        let (status, body) = send(
            router.clone(),
            post(
                "/",
                json!({"query": "mutation { addPerson(name: \"C\", street: \"U\", city: \"E\") { id } }"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), json!({"data": {"addPerson": {"id": "3"}}}));

        let (_, body) = send(router, post("/", json!({"query": "{ personCount }"}))).await;
        assert_eq!(json(&body), json!({"data": {"personCount": 3}}));
    }

    #[tokio::test]
    async fn post_accepts_batches() {
        let (status, body) = send(
            router(&Configuration::default()),
            post(
                "/",
                json!([
                    {"query": "{ personCount }"},
                    {"query": "query Find($name: String!) { findPerson(name: $name) { phone } }",
                     "variables": {"name": "B"}}
                ]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body),
            json!([
                {"data": {"personCount": 2}},
                {"data": {"findPerson": {"phone": "22"}}}
            ])
        );
    }

    #[tokio::test]
    async fn get_executes_queries() {
        let (status, body) = send(
            router(&Configuration::default()),
            get("/?query=%7B%20allPersons(phone%3A%20NO)%20%7B%20name%20%7D%20%7D"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), json!({"data": {"allPersons": [{"name": "A"}]}}));
    }

    #[tokio::test]
    async fn get_refuses_mutations() {
        let (status, body) = send(
            router(&Configuration::default()),
            get("/?query=mutation%20%7B%20editNumber(name%3A%20%22A%22%2C%20phone%3A%20%221%22)%20%7B%20id%20%7D%20%7D"),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            json(&body)["errors"][0]["message"],
            "GET supports only query operation"
        );
    }

    #[test]
    fn named_operations_are_checked_individually() {
        let document = "query Q { personCount } mutation M { editNumber(name: \"A\", phone: \"1\") { id } }";
        assert!(!selects_mutation(
            &Request::new(document).operation_name("Q")
        ));
        assert!(selects_mutation(
            &Request::new(document).operation_name("M")
        ));
        assert!(!selects_mutation(&Request::new("{ personCount")));
    }

    #[tokio::test]
    async fn landing_page_on_bare_get() {
        let (status, body) = send(router(&Configuration::default()), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("graphiql"), "{body}");
    }

    #[tokio::test]
    async fn bare_get_without_landing_page_is_an_error() {
        let configuration = Configuration::builder()
            .server(Server::builder().landing_page(false).build())
            .build();
        let (status, body) = send(router(&configuration), get("/")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["errors"][0]["message"], "GET query missing.");
    }

    #[tokio::test]
    async fn custom_graphql_path() {
        let configuration = Configuration::builder()
            .server(Server::builder().graphql_path("/graphql").build())
            .build();
        let router = router(&configuration);

        let (status, _) = send(router.clone(), post("/", json!({"query": "{ personCount }"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(router, post("/graphql", json!({"query": "{ personCount }"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), json!({"data": {"personCount": 2}}));
    }

    #[tokio::test]
    async fn cors_allows_studio_by_default() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, "https://studio.apollographql.com")
            .body(Body::from(json!({"query": "{ personCount }"}).to_string()))
            .unwrap();

        let response = router(&Configuration::default())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://studio.apollographql.com"
        );
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let mut configuration = Configuration::default();
        configuration.set_listen(SocketAddr::from(([127, 0, 0, 1], 0)));
        let server = PhonebookServer::bind(&configuration).await.unwrap();
        let address = server.local_addr().unwrap();

        let (shutdown, shutdown_signal) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(async move {
            let _ = shutdown_signal.await;
        }));

        let response: serde_json::Value = reqwest::Client::new()
            .post(format!("http://{address}/"))
            .json(&json!({"query": "{ personCount }"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response, json!({"data": {"personCount": 3}}));

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
