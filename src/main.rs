//! Demo server for generated navigation resolvers.
//!
//! Serves the demo schema over GraphQL at /graphql.

use std::net::SocketAddr;
use std::str::FromStr;

use async_graphql::dynamic::Schema;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graphql_navigation::config::Config;
use graphql_navigation::demo;
use graphql_navigation::resolver::RequestContext;

/// Headers with this prefix are handed to resolve hooks, keyed by the rest
/// of the header name.
const CONTEXT_HEADER_PREFIX: &str = "x-navigation-";

#[derive(Clone)]
struct AppState {
    schema: Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphql_navigation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting navigation demo server");

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_with(options)
        .await?;
    tracing::info!(url = %config.database_url, "Database connected");

    demo::create_tables(&pool).await?;
    if config.seed_demo_data {
        demo::seed(&pool).await?;
    }

    let schema = demo::default_schema(pool)?;
    tracing::info!("GraphQL schema built");

    let app = Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { schema });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphQL playground: http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn request_context(headers: &HeaderMap) -> Option<RequestContext> {
    let values: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(CONTEXT_HEADER_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((key.to_string(), Value::String(value.to_string())))
        })
        .collect();

    (!values.is_empty()).then(|| RequestContext::new(values))
}

async fn graphql_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    if let Some(context) = request_context(&headers) {
        request = request.data(context);
    }

    state.schema.execute(request).await.into()
}

/// GraphiQL interactive playground
async fn graphiql() -> impl IntoResponse {
    axum::response::Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
