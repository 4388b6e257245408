mod models;
mod service;
mod config;
mod dtos;
mod error;
mod db;
mod utils;
mod middleware;
mod mail;
mod handler;
mod routes;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use crate::db::{db::DBClient, Store};
use dotenv::dotenv;
use redis::aio::ConnectionManager;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use mail::sendmail::{Mailer, SmtpMailer};
use service::{
    approval_service::ApprovalService,
    auth_service::AuthService,
    background_jobs::{self, JobQueue},
    catalog_service::CatalogService,
    document_service::DocumentService,
    report_service::ReportService,
    request_service::RequestService,
    review_service::ReviewService,
    storage::{DocumentStorage, LocalDiskStorage},
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    // Services
    pub auth_service: Arc<AuthService>,
    pub document_service: Arc<DocumentService>,
    pub approval_service: Arc<ApprovalService>,
    pub catalog_service: Arc<CatalogService>,
    pub request_service: Arc<RequestService>,
    pub review_service: Arc<ReviewService>,
    pub report_service: Arc<ReportService>,
    pub job_queue: JobQueue,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        storage: Arc<dyn DocumentStorage>,
        service_images: Arc<dyn DocumentStorage>,
        mailer: Arc<dyn Mailer>,
        cache: Option<Arc<ConnectionManager>>,
        job_queue: JobQueue,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(store.clone(), config.clone()));
        let document_service = Arc::new(DocumentService::new(store.clone(), storage));
        let approval_service = Arc::new(ApprovalService::new(store.clone()));
        let catalog_service = Arc::new(CatalogService::new(store.clone(), service_images, cache.clone()));
        let request_service = Arc::new(RequestService::new(store.clone()));
        let review_service = Arc::new(ReviewService::new(store.clone(), cache));
        let report_service = Arc::new(ReportService::new(store, mailer, config.clone()));

        Self {
            env: config,
            auth_service,
            document_service,
            approval_service,
            catalog_service,
            request_service,
            review_service,
            report_service,
            job_queue,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    dotenv().ok();

    let config = Config::init();

    // Connect to PostgreSQL
    let pool = match PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .connect(&config.database_url)
            .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        println!("🔥 Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    // Initialize DBClient with optional Redis
    let db_client = match config.redis_url {
        Some(ref redis_url) => DBClient::with_redis(pool, redis_url).await,
        None => {
            println!("ℹ️  Redis not configured - Running without cache (set REDIS_URL to enable)");
            DBClient::new(pool)
        }
    };
    println!("📊 Cache status: {}", db_client.cache_status());
    let cache = db_client.redis_client.clone();

    let mailer = match SmtpMailer::from_config(&config) {
        Ok(mailer) => mailer,
        Err(err) => {
            println!("🔥 Failed to configure the mail transport: {}", err);
            std::process::exit(1);
        }
    };

    let (job_queue, job_receiver) = JobQueue::new();

    let app_state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(db_client),
        Arc::new(LocalDiskStorage::new(&config.upload_dir)),
        Arc::new(LocalDiskStorage::new(&config.service_image_dir)),
        Arc::new(mailer),
        cache,
        job_queue.clone(),
    ));

    match app_state.auth_service.ensure_admin().await {
        Ok(true) => println!("👤 Created default admin '{}'", config.admin_username),
        Ok(false) => {}
        Err(err) => tracing::error!("Failed to ensure default admin: {}", err),
    }

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app = create_router(app_state.clone()).layer(cors);

    // Start background jobs
    tokio::spawn(background_jobs::run_worker(
        app_state.report_service.clone(),
        job_receiver,
    ));
    tokio::spawn(background_jobs::start_daily_reminder_job(job_queue.clone()));
    tokio::spawn(background_jobs::start_monthly_report_job(job_queue));

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            println!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    println!(
        "🚀 Server is running on http://localhost:{}",
        config.port
    );

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
