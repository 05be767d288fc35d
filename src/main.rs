use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::catch_panic::CatchPanicLayer;

use clubcreole::services::notification_service::EmailNotifier;
use clubcreole::web::middleware::admin as admin_middleware;
use clubcreole::web::routes::{activities, admin};
use clubcreole::web::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://clubcreole.db".to_string());
    println!("Connexion à la base : {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)
        .expect("DATABASE_URL invalide")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .expect("Connexion à la base impossible");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Migrations impossibles");

    let state = AppState {
        pool,
        notifier: EmailNotifier::from_env(),
    };

    // Management endpoints behind the admin token
    let admin_routes = Router::new()
        .route("/api/admin/activities", post(admin::create_activity_handler))
        .route(
            "/api/admin/activities/:activity_id",
            put(admin::update_activity_handler).delete(admin::delete_activity_handler),
        )
        .route(
            "/api/admin/activities/:activity_id/registrations",
            get(admin::list_registrations_handler),
        )
        .route(
            "/api/admin/activities/:activity_id/pre-registrations",
            get(admin::list_pre_registrations_handler),
        )
        .layer(middleware::from_fn(admin_middleware::require_admin_token));

    let app = Router::new()
        .route("/api/activities", get(activities::list_activities_handler))
        .route(
            "/api/activities/:activity_id",
            get(activities::activity_detail_handler),
        )
        .route(
            "/api/activities/:activity_id/registrations",
            post(activities::register_handler),
        )
        .route(
            "/api/activities/:activity_id/pre-registrations",
            post(activities::pre_register_handler),
        )
        .merge(admin_routes)
        .layer(CatchPanicLayer::new())
        .with_state(state);

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("host/port invalide");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!(
                "⚠️  Bind impossible sur {}: {}. Essai du port {}",
                addr,
                e,
                port + 1
            );
            let fallback: SocketAddr = format!("{}:{}", host, port + 1)
                .parse()
                .expect("port de repli invalide");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("Bind impossible sur le port de repli")
        }
    };

    let bound_addr = listener.local_addr().unwrap();
    println!("🌴 Club Créole API sur http://{}", bound_addr);

    axum::serve(listener, app).await.unwrap();
}
