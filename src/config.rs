// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    pub jwt_maxage: i64,
    pub refresh_token_days: i64,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub redis_url: Option<String>,
    // Email service configurations
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,
    pub admin_email: String,
    // Bootstrap admin, created at startup when none exists
    pub admin_username: String,
    pub admin_password: String,
    pub upload_dir: String,
    pub service_image_dir: String,
    pub export_dir: String,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");

        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:5173,http://localhost:8000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            database_url,
            app_url: var_or("APP_URL", "http://localhost:8000"),
            jwt_secret,
            jwt_maxage: parsed_or("JWT_MAXAGE", 60),
            refresh_token_days: parsed_or("JWT_REFRESH_DAYS", 30),
            port: parsed_or("PORT", 8000),
            cors_origins,
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            smtp_host: var_or("SMTP_HOST", "localhost"),
            smtp_port: parsed_or("SMTP_PORT", 1025),
            smtp_username: var_or("SMTP_USERNAME", ""),
            smtp_password: var_or("SMTP_PASSWORD", ""),
            mail_from: var_or("MAIL_FROM", "HouseCare <noreply@housecare.local>"),
            admin_email: var_or("ADMIN_EMAIL", "admin@housecare.local"),
            admin_username: var_or("ADMIN_USERNAME", "admin"),
            admin_password: var_or("ADMIN_PASSWORD", "admin123"),
            upload_dir: var_or("UPLOAD_DIR", "uploads"),
            service_image_dir: var_or("SERVICE_IMAGE_DIR", "uploads/service-images"),
            export_dir: var_or("EXPORT_DIR", "exports"),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config {
            database_url: String::new(),
            app_url: "http://localhost:8000".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            refresh_token_days: 30,
            port: 8000,
            cors_origins: vec![],
            redis_url: None,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            mail_from: "HouseCare <noreply@housecare.local>".to_string(),
            admin_email: "admin@housecare.local".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            upload_dir: "uploads".to_string(),
            service_image_dir: "uploads/service-images".to_string(),
            export_dir: "exports".to_string(),
        }
    }
}
