//! Logic for loading configuration in to an object model
mod expansion;
mod schema;

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use displaydoc::Display;
use http::HeaderValue;
use http::Method;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::AllowHeaders;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use url::Url;

pub(crate) use self::expansion::Expansion;
pub use self::schema::generate_config_schema;
pub(crate) use self::schema::validate_yaml_configuration;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file '{path}': {error}
    CannotReadFile {
        path: PathBuf,
        error: std::io::Error,
    },
    /// could not expand variable: {key}, {cause}
    CannotExpandVariable { key: String, cause: String },
    /// could not expand variable: {key}. Variables must be prefixed with one of '{supported_modes}' followed by '.' e.g. 'env.'
    UnknownExpansionMode {
        key: String,
        supported_modes: String,
    },
    /// could not expand variable as the supported modes were not valid
    InvalidExpansionModeConfig,
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_json::Error),
}

/// The configuration of the phonebook.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or from yaml with [`str::parse`], which also validates it against the generated schema.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    #[serde(default)]
    pub(crate) server: Server,

    /// Cross origin request headers.
    #[serde(default)]
    pub(crate) cors: Cors,

    /// Contents of the record store at startup.
    #[serde(default)]
    pub(crate) store: Store,

    /// Remote source read by `allPersonsApi`. When absent, `allPersonsApi` reads the local store.
    #[serde(default)]
    #[schemars(with = "PersonsApi")]
    pub(crate) persons_api: Option<PersonsApi>,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        server: Option<Server>,
        cors: Option<Cors>,
        store: Option<Store>,
        persons_api: Option<PersonsApi>,
    ) -> Self {
        Self {
            server: server.unwrap_or_default(),
            cors: cors.unwrap_or_default(),
            store: store.unwrap_or_default(),
            persons_api,
        }
    }

    /// Reads and validates a yaml configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw_yaml =
            fs::read_to_string(path).map_err(|error| ConfigurationError::CannotReadFile {
                path: path.to_path_buf(),
                error,
            })?;
        raw_yaml.parse()
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Overrides the address the server listens on.
    pub fn set_listen(&mut self, listen: SocketAddr) {
        self.server.listen = listen;
    }

    pub(crate) fn validate(self) -> Result<Self, ConfigurationError> {
        if !self.server.graphql_path.starts_with('/') {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server.graphql_path' configuration",
                error: format!(
                    "'{}' is invalid, it must be an absolute path and start with '/', you should try with '/{}'",
                    self.server.graphql_path, self.server.graphql_path
                ),
            });
        }
        if !self.server.health_check_path.starts_with('/') {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server.health_check_path' configuration",
                error: format!(
                    "'{}' is invalid, it must be an absolute path and start with '/'",
                    self.server.health_check_path
                ),
            });
        }
        if self.server.graphql_path == self.server.health_check_path {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server' configuration",
                error: format!(
                    "the graphql endpoint and the health check cannot both be served at '{}'",
                    self.server.graphql_path
                ),
            });
        }
        self.cors.ensure_usable_cors_rules().map_err(|error| {
            ConfigurationError::InvalidConfiguration {
                message: "invalid 'cors' configuration",
                error: error.to_string(),
            }
        })?;
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_yaml_configuration(s, Expansion::default()?)
    }
}

/// Configuration options pertaining to the http server component.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Server {
    /// The socket address and port to listen on
    /// Defaults to 127.0.0.1:4000
    #[serde(default = "default_listen")]
    #[schemars(with = "String")]
    pub(crate) listen: SocketAddr,

    /// The HTTP path on which GraphQL requests will be served.
    /// default: "/"
    #[serde(default = "default_graphql_path")]
    pub(crate) graphql_path: String,

    /// The HTTP path answering health checks.
    /// default: "/.well-known/apollo/server-health"
    #[serde(default = "default_health_check_path")]
    pub(crate) health_check_path: String,

    /// Enable introspection
    /// Default: true
    #[serde(default = "default_introspection")]
    pub(crate) introspection: bool,

    /// Serve GraphiQL on GET requests carrying no query
    /// Default: true
    #[serde(default = "default_landing_page")]
    pub(crate) landing_page: bool,
}

#[buildstructor::buildstructor]
impl Server {
    #[builder]
    pub fn new(
        listen: Option<SocketAddr>,
        graphql_path: Option<String>,
        health_check_path: Option<String>,
        introspection: Option<bool>,
        landing_page: Option<bool>,
    ) -> Self {
        Self {
            listen: listen.unwrap_or_else(default_listen),
            graphql_path: graphql_path.unwrap_or_else(default_graphql_path),
            health_check_path: health_check_path.unwrap_or_else(default_health_check_path),
            introspection: introspection.unwrap_or_else(default_introspection),
            landing_page: landing_page.unwrap_or_else(default_landing_page),
        }
    }
}

impl Server {
    pub fn listen(&self) -> SocketAddr {
        self.listen
    }
}

impl Default for Server {
    fn default() -> Self {
        Server::builder().build()
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_graphql_path() -> String {
    String::from("/")
}

fn default_health_check_path() -> String {
    String::from("/.well-known/apollo/server-health")
}

fn default_introspection() -> bool {
    true
}

fn default_landing_page() -> bool {
    true
}

/// Cross origin request configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Cors {
    /// Set to true to allow any origin.
    ///
    /// Defaults to false
    /// Having this set to true is the only way to allow Origin: null.
    #[serde(default)]
    pub(crate) allow_any_origin: bool,

    /// Set to true to add the `Access-Control-Allow-Credentials` header.
    #[serde(default)]
    pub(crate) allow_credentials: bool,

    /// The headers to allow.
    ///
    /// If this value is not set, the phonebook will mirror client's `Access-Control-Request-Headers`.
    #[serde(default)]
    pub(crate) allow_headers: Vec<String>,

    /// The origin(s) to allow requests from.
    /// Defaults to `https://studio.apollographql.com/` for Apollo Studio.
    #[serde(default = "default_origins")]
    pub(crate) origins: Vec<String>,

    /// Allowed request methods. Defaults to GET, POST, OPTIONS.
    #[serde(default = "default_cors_methods")]
    pub(crate) methods: Vec<String>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            methods: default_cors_methods(),
            allow_any_origin: Default::default(),
            allow_credentials: Default::default(),
            allow_headers: Default::default(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec!["https://studio.apollographql.com".into()]
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".into(), "POST".into(), "OPTIONS".into()]
}

#[cfg(test)]
#[buildstructor::buildstructor]
impl Cors {
    #[builder]
    pub(crate) fn new(
        allow_any_origin: Option<bool>,
        allow_credentials: Option<bool>,
        allow_headers: Option<Vec<String>>,
        origins: Option<Vec<String>>,
        methods: Option<Vec<String>>,
    ) -> Self {
        Self {
            allow_any_origin: allow_any_origin.unwrap_or_default(),
            allow_credentials: allow_credentials.unwrap_or_default(),
            allow_headers: allow_headers.unwrap_or_default(),
            origins: origins.unwrap_or_else(default_origins),
            methods: methods.unwrap_or_else(default_cors_methods),
        }
    }
}

impl Cors {
    pub(crate) fn into_layer(self) -> Result<CorsLayer, String> {
        self.ensure_usable_cors_rules()?;

        let allow_headers = if self.allow_headers.is_empty() {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::list(self.allow_headers.iter().filter_map(|header| {
                header
                    .parse()
                    .map_err(|_| tracing::error!("header name '{header}' is not valid"))
                    .ok()
            }))
        };
        let cors = CorsLayer::new()
            .allow_credentials(self.allow_credentials)
            .allow_headers(allow_headers)
            .allow_methods(
                self.methods
                    .iter()
                    .filter_map(|method| {
                        method
                            .parse::<Method>()
                            .map_err(|_| tracing::error!("method '{method}' is not valid"))
                            .ok()
                    })
                    .collect::<Vec<Method>>(),
            );

        if self.allow_any_origin {
            Ok(cors.allow_origin(AllowOrigin::any()))
        } else {
            Ok(cors.allow_origin(AllowOrigin::list(self.origins.iter().filter_map(
                |origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| tracing::error!("origin '{origin}' is not valid"))
                        .ok()
                },
            ))))
        }
    }

    // This is cribbed from the similarly named function in tower-http. The version there
    // asserts that CORS rules are useable, which results in a panic if they aren't. We
    // don't want the phonebook to panic in such cases, so this function returns an error
    // with a message describing what the problem is.
    fn ensure_usable_cors_rules(&self) -> Result<(), &'static str> {
        if self.origins.iter().any(|x| x == "*") {
            return Err("Invalid CORS configuration: use `allow_any_origin: true` to set `Access-Control-Allow-Origin: *`");
        }
        if self.allow_credentials {
            if self.allow_headers.iter().any(|x| x == "*") {
                return Err("Invalid CORS configuration: Cannot combine `Access-Control-Allow-Credentials: true` \
                        with `Access-Control-Allow-Headers: *`");
            }

            if self.methods.iter().any(|x| x == "*") {
                return Err("Invalid CORS configuration: Cannot combine `Access-Control-Allow-Credentials: true` \
                    with `Access-Control-Allow-Methods: *`");
            }

            if self.allow_any_origin {
                return Err("Invalid CORS configuration: Cannot combine `Access-Control-Allow-Credentials: true` \
                    with `allow_any_origin: true`");
            }
        }

        Ok(())
    }
}

/// Contents of the record store at startup.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Store {
    /// Start with the three demo contacts.
    /// Default: true
    #[serde(default = "default_seed")]
    pub(crate) seed: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> bool {
    true
}

/// A REST endpoint answering `GET` with a JSON array of people.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PersonsApi {
    /// The URL people are fetched from, e.g. http://localhost:5000/persons
    #[schemars(with = "String")]
    pub(crate) url: Url,

    /// Request timeout in human-readable format; defaults to 10s
    #[serde(
        with = "humantime_serde",
        default = "default_persons_api_timeout"
    )]
    #[schemars(with = "String")]
    pub(crate) timeout: Duration,
}

fn default_persons_api_timeout() -> Duration {
    Duration::from_secs(10)
}
