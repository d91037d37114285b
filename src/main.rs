use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::net::SocketAddr;
use tower_http::catch_panic::CatchPanicLayer;

use meetbook::database::schema;
use meetbook::web::middleware::auth as auth_middleware;
use meetbook::web::routes::{admin, bookings, cards, health_handler, leaderboard, slots};
use meetbook::web::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Start logging
    tracing_subscriber::fmt::init();

    // 2. Connect to the database
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env");
    println!("Connecting to database: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .expect("Cannot connect to DB");
    schema::ensure_schema(&pool)
        .await
        .expect("Cannot bootstrap schema");

    let state = AppState::new(pool);

    // 3. Protected routes under one middleware layer
    let protected_routes = Router::new()
        .route(
            "/api/activities/:activity_id/days/:day",
            get(slots::day_handler),
        )
        .route(
            "/api/activities/:activity_id/open-dates",
            get(slots::open_dates_handler),
        )
        .route(
            "/api/activities/:activity_id/slots/:slot_mark/preview",
            get(slots::preview_handler),
        )
        .route(
            "/api/activities/:activity_id/slots/:slot_mark/join",
            post(bookings::book_handler),
        )
        .route("/api/joins", get(bookings::list_handler))
        .route("/api/joins/cleanup", post(bookings::cleanup_handler))
        .route("/api/joins/:join_id/cancel", post(bookings::cancel_handler))
        .route("/api/checkin", post(bookings::checkin_handler))
        .route("/api/cards", get(cards::list_handler))
        .route("/api/cards/:card_id/ledger", get(cards::ledger_handler))
        .route("/api/leaderboard", get(leaderboard::ranking_handler))
        .route(
            "/api/admin/activities/:activity_id/days/:day",
            put(admin::replace_day_slots_handler),
        )
        .route(
            "/api/admin/activities/:activity_id/slots/:slot_mark/cancel",
            post(admin::cancel_slot_handler),
        )
        .route(
            "/api/admin/joins/:join_id/cancel",
            post(admin::cancel_join_handler),
        )
        .route(
            "/api/admin/joins/:join_id/checkin",
            post(admin::checkin_handler),
        )
        .route("/api/admin/cards", post(admin::create_card_handler))
        .route(
            "/api/admin/cards/:card_id/recharge",
            post(admin::recharge_card_handler),
        )
        .route(
            "/api/admin/cards/:card_id/adjust",
            post(admin::adjust_card_handler),
        )
        .route(
            "/api/admin/leaderboard/invalidate",
            post(admin::invalidate_leaderboard_handler),
        )
        .layer(middleware::from_fn(auth_middleware::require_auth));

    // 4. Build the whole application
    let app = Router::new()
        // Public routes
        .route("/api/health", get(health_handler))
        // Protected routes
        .merge(protected_routes)
        // Layers
        .layer(CatchPanicLayer::new())
        // State
        .with_state(state);

    // 5. Start the server (with fallback port)
    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Cannot parse host/port");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!(
                "⚠️  Could not bind on {}: {}. Trying fallback {}:{}",
                addr,
                e,
                host,
                port + 1
            );
            let fallback: SocketAddr = format!("{}:{}", host, port + 1)
                .parse()
                .expect("Cannot parse fallback");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("Cannot bind on fallback port")
        }
    };

    let bound_addr = listener.local_addr().unwrap();
    println!("🚀 Server running on http://{}", bound_addr);

    axum::serve(listener, app).await.unwrap();
}
