use std::env;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use clap::Parser;
use log::info;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel, bson::doc};
use simple_logger::SimpleLogger;

use auth::SessionKeys;
use config::ServiceConfig;
use email::Mailer;
use product::Product;
use state::ServiceState;
use user::User;

mod admin_handlers;
mod auth;
mod auth_handlers;
mod authentication;
mod catalog_handlers;
mod config;
mod email;
mod error;
mod product;
mod review_handlers;
mod state;
mod user;

/// Command line arguments of the service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the HTTP server binds to.
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: String,
}

/// Establishes database connection and returns the client.
async fn db_connection() -> Client {
    let uri = match env::var_os("MONGODB_URI") {
        Some(uri) => uri.into_string().unwrap(),
        None => panic!("$MONGODB_URI is not set."),
    };

    // Parse a connection string into an options struct.
    let mut client_options = ClientOptions::parse(uri).await.unwrap();

    // Manually set an option.
    client_options.app_name = Some("ShopUserService".to_string());

    // Get a handle to the deployment.
    Client::with_options(client_options).unwrap()
}

/// Creates the unique index on user emails.
///
/// Duplicate registrations then fail inside the database and surface as a
/// validation error instead of racing an application-level lookup.
async fn ensure_indexes(user_collection: &Collection<User>) {
    let email_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(IndexOptions::builder().unique(true).build())
        .build();
    user_collection
        .create_index(email_index, None)
        .await
        .expect("creating the unique email index failed");
}

/// Builds the router over all HTTP endpoints of the service.
fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/api/v1/register", post(auth_handlers::register_user))
        .route("/api/v1/login", post(auth_handlers::login_user))
        .route("/api/v1/logout", get(auth_handlers::logout_user))
        .route("/api/v1/password/forgot", post(auth_handlers::forgot_password))
        .route("/api/v1/password/reset/{token}", put(auth_handlers::reset_password))
        .route("/api/v1/password/update", put(auth_handlers::update_password))
        .route("/api/v1/me", get(auth_handlers::get_user_details))
        .route("/api/v1/me/update", put(auth_handlers::update_profile))
        .route("/api/v1/admin/users", get(admin_handlers::list_users))
        .route(
            "/api/v1/admin/user/{id}",
            get(admin_handlers::get_user)
                .put(admin_handlers::update_user_role)
                .delete(admin_handlers::delete_user),
        )
        .route("/api/v1/admin/product", post(catalog_handlers::create_product))
        .route("/api/v1/products", get(catalog_handlers::list_products))
        .route("/api/v1/product/{id}", get(catalog_handlers::get_product))
        .route("/api/v1/review", put(review_handlers::upsert_review))
        .route(
            "/api/v1/reviews",
            get(review_handlers::list_reviews).delete(review_handlers::delete_review),
        )
        .with_state(state)
}

/// Activates the logger, connects to MongoDB and starts the HTTP server.
#[tokio::main]
async fn main() -> std::io::Result<()> {
    SimpleLogger::new().init().unwrap();

    let args = Args::parse();
    let service_config = Arc::new(ServiceConfig::from_env());

    let client = db_connection().await;
    let db_client: Database = client.database("shop-database");
    let user_collection = db_client.collection::<User>("users");
    let product_collection = db_client.collection::<Product>("products");
    ensure_indexes(&user_collection).await;

    let mailer = Mailer::from_settings(&service_config.smtp)
        .expect("building the SMTP transport failed");
    let session_keys = SessionKeys::new(&service_config.jwt_secret);

    let state = ServiceState {
        user_collection,
        product_collection,
        session_keys: Arc::new(session_keys),
        mailer: Arc::new(mailer),
        config: service_config,
    };
    let app = build_router(state);

    info!("Server is working on http://{}", args.bind);
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    axum::serve(listener, app).await
}
