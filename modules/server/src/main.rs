use anyhow::{Context, Result};
use auth::rest::middleware::UserAuthLayer;
use auth::rest::user::UserRestState;
use auth::services::account::AccountService;
use auth::services::mailer::Mailer;
use auth::services::password_reset::PasswordResetService;
use auth::utils::token::TokenSigner;
use axum::Router;
use catalog::rest::product::ProductRestState;
use catalog::services::media::MediaStore;
use catalog::services::product::ProductService;
use catalog::services::review::ReviewService;
use catalog::services::search::SearchService;
use framework::sqlx::DatabaseProcessor;
use ordering::rest::order::OrderRestState;
use ordering::services::checkout::CheckoutService;
use ordering::services::fulfillment::FulfillmentService;
use ordering::services::orders::OrderService;
use ordering::services::payment::PaymentGateway;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    let pool = framework::pool::connect(&config.database_url)
        .await
        .context("connecting to the database")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    let db = DatabaseProcessor::new(pool);

    let tokens = TokenSigner::new(&config.token_secret, &config.auth.token);
    let mailer = Mailer::new(&config.smtp).context("configuring the mail transport")?;

    let user_state = UserRestState {
        accounts: AccountService {
            db: db.clone(),
            tokens: tokens.clone(),
        },
        password_reset: PasswordResetService {
            db: db.clone(),
            mailer,
            config: config.auth.reset_otp.clone(),
        },
    };
    let product_state = ProductRestState {
        products: ProductService {
            db: db.clone(),
            media: MediaStore::new(config.media.clone()),
        },
        reviews: ReviewService { db: db.clone() },
        search: SearchService {
            db: db.clone(),
            config: config.catalog.clone(),
        },
    };
    let order_state = OrderRestState {
        checkout: CheckoutService {
            db: db.clone(),
            config: config.ordering.clone(),
        },
        fulfillment: FulfillmentService {
            db: db.clone(),
            gateway: config.payment.clone().map(PaymentGateway::new),
            config: config.ordering.clone(),
        },
        orders: OrderService { db },
    };

    let mut app = Router::new()
        .nest("/api/user", auth::rest::user::router(user_state))
        .nest("/api/product", catalog::rest::product::router(product_state))
        .nest("/api/order", ordering::rest::order::router(order_state))
        .layer(UserAuthLayer::new(tokens));

    if let Some(static_dir) = &config.static_dir {
        let client_bundle = ServeDir::new(static_dir)
            .not_found_service(ServeFile::new(static_dir.join("index.html")));
        app = app.fallback_service(client_bundle);
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!("server is running on {}", config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
