// 🏆 start.gg Client - GraphQL queries for tournament info
//
// Thin pass-through: queries go out with a bearer token, the `data` object
// comes back as untyped JSON for the frontend to render.

use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

// ============================================================================
// QUERIES
// ============================================================================

const SLAMBANA_QUERY: &str = r#"
query SlambanaQuery($page: Int!) {
    tournaments(query: {
        perPage: 5
        page: $page
        filter: {
            name: "Slambana"
        }
    }) {
        nodes {
            name
            slug
            startAt
            venueAddress
            city
            addrState
            events {
                name
                numEntrants
                teamRosterSize {
                    maxPlayers
                }
                type
            }
        }
        pageInfo {
            total
            totalPages
            page
            perPage
        }
    }
}
"#;

const TOURNAMENT_QUERY: &str = r#"
query TournamentQuery($slug: String!) {
    tournament(slug: $slug) {
        name
        events {
            name
            numEntrants
            teamRosterSize {
                maxPlayers
            }
            type
            standings(query: {
                page: 1
                perPage: 8
            }) {
                nodes {
                    placement
                    entrant {
                        name
                        participants {
                            gamerTag
                        }
                    }
                }
            }
        }
    }
}
"#;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StartGgError {
    #[error("Failed to load start.gg API token from {}: {source}", path.display())]
    Token {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("start.gg API token file {} is empty", path.display())]
    EmptyToken { path: PathBuf },

    #[error("start.gg request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL Error: {0}")]
    GraphQl(String),
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct StartGgClient {
    http: reqwest::Client,
    endpoint: String,
    token_path: PathBuf,
    token: OnceCell<String>,
}

impl StartGgClient {
    /// Token is read from `token_path` on the first query, not here
    pub fn new(endpoint: impl Into<String>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token_path: token_path.into(),
            token: OnceCell::new(),
        }
    }

    /// Client with a token already in hand
    pub fn with_token(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token_path: PathBuf::new(),
            token: OnceCell::new_with(Some(token.into())),
        }
    }

    async fn token(&self) -> Result<&str, StartGgError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let raw = tokio::fs::read_to_string(&self.token_path)
                    .await
                    .map_err(|source| StartGgError::Token {
                        path: self.token_path.clone(),
                        source,
                    })?;
                let token = raw.trim().to_string();
                if token.is_empty() {
                    return Err(StartGgError::EmptyToken {
                        path: self.token_path.clone(),
                    });
                }
                Ok(token)
            })
            .await?;
        Ok(token.as_str())
    }

    /// Run a GraphQL query and return its `data` object
    pub async fn query(&self, query: &str, variables: Value) -> Result<Value, StartGgError> {
        let token = self.token().await?;

        let body = json!({
            "query": query,
            "variables": variables,
        });

        let response: GraphQlResponse = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(errors) = response.errors {
            warn!(%errors, "start.gg returned GraphQL errors");
            return Err(StartGgError::GraphQl(errors.to_string()));
        }

        debug!("start.gg query succeeded");
        Ok(response.data.unwrap_or(Value::Null))
    }

    /// One page (5 per page) of tournaments named "Slambana"
    pub async fn slambana_tournaments(&self, page: u32) -> Result<Value, StartGgError> {
        self.query(SLAMBANA_QUERY, json!({ "page": page })).await
    }

    /// Tournament detail with top-8 standings for every event
    pub async fn tournament(&self, slug: &str) -> Result<Value, StartGgError> {
        self.query(TOURNAMENT_QUERY, json!({ "slug": slug })).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_query_sends_token_and_returns_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({ "variables": { "page": 2 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "tournaments": { "nodes": [{ "name": "Slambana 12" }] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = StartGgClient::with_token(server.uri(), "secret");
        let data = client.slambana_tournaments(2).await.unwrap();

        assert_eq!(data["tournaments"]["nodes"][0]["name"], "Slambana 12");
    }

    #[tokio::test]
    async fn test_graphql_errors_surface() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Unknown slug" }]
            })))
            .mount(&server)
            .await;

        let client = StartGgClient::with_token(server.uri(), "secret");
        let err = client.tournament("nope").await.unwrap_err();

        assert!(matches!(err, StartGgError::GraphQl(_)));
        assert!(err.to_string().contains("Unknown slug"));
    }

    #[tokio::test]
    async fn test_token_read_from_file_once() {
        let server = MockServer::start().await;
        let dir = tempfile::TempDir::new().unwrap();
        let token_path = dir.path().join("token.txt");
        std::fs::write(&token_path, "  from-file\n").unwrap();

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer from-file"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(2)
            .mount(&server)
            .await;

        let client = StartGgClient::new(server.uri(), &token_path);
        client.tournament("a").await.unwrap();

        // Later edits to the file don't matter once the token is cached
        std::fs::write(&token_path, "changed").unwrap();
        client.tournament("b").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let client = StartGgClient::new("http://127.0.0.1:9", dir.path().join("missing.txt"));

        let err = client.tournament("x").await.unwrap_err();
        assert!(matches!(err, StartGgError::Token { .. }));
    }
}
