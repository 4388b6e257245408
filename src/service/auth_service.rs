use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use super::error::ServiceError;
use crate::{
    config::Config,
    db::Store,
    dtos::userdtos::RegisterUserDto,
    error::ErrorMessage,
    models::usermodel::*,
    utils::{
        password,
        token::{self, TokenType},
    },
};

#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    config: Config,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self { store, config }
    }

    fn secret(&self) -> &[u8] {
        self.config.jwt_secret.as_bytes()
    }

    fn access_token(&self, user: &User) -> Result<String, ServiceError> {
        token::create_token(
            user,
            TokenType::Access,
            self.secret(),
            Duration::minutes(self.config.jwt_maxage),
        )
        .map_err(|e| ServiceError::Other(e.to_string()))
    }

    fn refresh_token(&self, user: &User) -> Result<String, ServiceError> {
        token::create_token(
            user,
            TokenType::Refresh,
            self.secret(),
            Duration::days(self.config.refresh_token_days),
        )
        .map_err(|e| ServiceError::Other(e.to_string()))
    }

    async fn ensure_unique(&self, username: &str, email: Option<&str>) -> Result<(), ServiceError> {
        if self.store.get_user(None, Some(username), None).await?.is_some() {
            return Err(ServiceError::Conflict(ErrorMessage::UsernameExist.to_string()));
        }
        if let Some(email) = email {
            if self.store.get_user(None, None, Some(email)).await?.is_some() {
                return Err(ServiceError::Conflict(ErrorMessage::EmailExist.to_string()));
            }
        }
        Ok(())
    }

    async fn insert(&self, new_user: NewUser) -> Result<Identity, ServiceError> {
        self.store.save_user(new_user).await.map_err(|e| {
            if crate::db::db::is_unique_violation(&e) {
                ServiceError::Conflict("Username or email already registered".to_string())
            } else {
                ServiceError::Database(e)
            }
        })
    }

    /// Customers are usable at once; professionals start unapproved with a valid service type.
    pub async fn register(&self, body: RegisterUserDto) -> Result<Identity, ServiceError> {
        let role = match body.role.as_str() {
            "customer" => UserRole::Customer,
            "professional" => UserRole::Professional,
            "admin" => {
                return Err(ServiceError::Validation(
                    "Admin accounts cannot be self-registered".to_string(),
                ))
            }
            other => {
                return Err(ServiceError::Validation(format!("Unknown role: {}", other)));
            }
        };

        let username = body.username.trim().to_string();
        let email = body.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
        self.ensure_unique(&username, email.as_deref()).await?;

        let profile = match role {
            UserRole::Professional => {
                let service_type_id = body.service_type_id.ok_or_else(|| {
                    ServiceError::Validation("Professionals must choose a service type".to_string())
                })?;
                let service = self
                    .store
                    .get_service(service_type_id)
                    .await?
                    .ok_or_else(|| ServiceError::Validation("Invalid service type".to_string()))?;
                if !service.is_active() {
                    return Err(ServiceError::Validation(
                        "Service type is not currently offered".to_string(),
                    ));
                }
                NewProfile::Professional {
                    service_type_id,
                    description: body.description.unwrap_or_default(),
                    phone_number: body.phone_number,
                    pin_code: body.pin_code,
                    experience_years: body.experience_years.unwrap_or(0),
                }
            }
            _ => NewProfile::Customer {
                address: body.address.filter(|a| !a.trim().is_empty()).ok_or_else(|| {
                    ServiceError::Validation("Customers must provide an address".to_string())
                })?,
                phone_number: body.phone_number,
                pin_code: body.pin_code,
            },
        };

        let password_hash =
            password::hash(&body.password).map_err(|e| ServiceError::Validation(e.to_string()))?;

        let identity = self
            .insert(NewUser {
                username,
                email,
                full_name: body.full_name.trim().to_string(),
                password_hash,
                profile,
            })
            .await?;

        tracing::info!(
            "Registered {} account {} (approved: {})",
            identity.user.role.to_str(),
            identity.user.username,
            identity.user.approved
        );
        Ok(identity)
    }

    /// Unapproved professionals still receive tokens, flagged `approved = false`, so they can
    /// upload their documents. Every other route rejects them in the middleware.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthTokens, ServiceError> {
        let user = match self.store.get_user(None, Some(username), None).await? {
            Some(user) => Some(user),
            None => self.store.get_user(None, None, Some(username)).await?,
        };

        let user = user
            .ok_or_else(|| ServiceError::Authentication(ErrorMessage::WrongCredentials.to_string()))?;

        let matched = password::compare(password, &user.password)
            .map_err(|_| ServiceError::Authentication(ErrorMessage::WrongCredentials.to_string()))?;
        if !matched {
            tracing::warn!("Failed login attempt for {}", username);
            return Err(ServiceError::Authentication(
                ErrorMessage::WrongCredentials.to_string(),
            ));
        }

        if !user.active {
            return Err(ServiceError::AccountInactive);
        }

        Ok(AuthTokens {
            access_token: self.access_token(&user)?,
            refresh_token: self.refresh_token(&user)?,
            user,
        })
    }

    /// Re-reads the account and re-issues an access token carrying current flags.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ServiceError> {
        let claims = token::decode_token(refresh_token, self.secret())
            .map_err(|_| ServiceError::Authentication(ErrorMessage::InvalidToken.to_string()))?;
        if claims.typ != TokenType::Refresh {
            return Err(ServiceError::Authentication(
                ErrorMessage::InvalidToken.to_string(),
            ));
        }

        let user = self
            .store
            .get_user(Some(claims.sub), None, None)
            .await?
            .ok_or_else(|| ServiceError::Authentication(ErrorMessage::UserNoLongerExist.to_string()))?;

        if !user.active {
            return Err(ServiceError::AccountInactive);
        }
        if user.role == UserRole::Professional && !user.approved {
            return Err(ServiceError::PendingApproval);
        }

        Ok(AuthTokens {
            access_token: self.access_token(&user)?,
            refresh_token: refresh_token.to_string(),
            user,
        })
    }

    pub async fn identity(&self, user_id: Uuid) -> Result<Identity, ServiceError> {
        self.store
            .get_identity(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Identity, ServiceError> {
        if let Some(email) = update.email.as_deref() {
            if let Some(other) = self.store.get_user(None, None, Some(email)).await? {
                if other.id != user_id {
                    return Err(ServiceError::Conflict(ErrorMessage::EmailExist.to_string()));
                }
            }
        }
        self.store
            .update_profile(user_id, update)
            .await
            .map_err(|e| {
                if crate::db::db::is_unique_violation(&e) {
                    ServiceError::Conflict(ErrorMessage::EmailExist.to_string())
                } else {
                    ServiceError::Database(e)
                }
            })?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    /// Creates the configured admin account when the database has none.
    pub async fn ensure_admin(&self) -> Result<bool, ServiceError> {
        if self.store.admin_exists().await? {
            return Ok(false);
        }

        let password_hash = password::hash(&self.config.admin_password)
            .map_err(|e| ServiceError::Other(e.to_string()))?;

        self.insert(NewUser {
            username: self.config.admin_username.clone(),
            email: Some(self.config.admin_email.clone()),
            full_name: "Administrator".to_string(),
            password_hash,
            profile: NewProfile::Admin,
        })
        .await?;

        tracing::info!("👤 Default admin '{}' created", self.config.admin_username);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        memory::{fixtures, MemoryStore},
        userdb::UserExt,
    };

    fn service(store: Arc<MemoryStore>) -> AuthService {
        AuthService::new(store, Config::for_tests())
    }

    fn registration(username: &str, role: &str) -> RegisterUserDto {
        RegisterUserDto {
            username: username.to_string(),
            email: Some(format!("{}@example.com", username)),
            full_name: "Test User".to_string(),
            password: "password123".to_string(),
            role: role.to_string(),
            phone_number: "5551234567".to_string(),
            pin_code: "560001".to_string(),
            address: Some("1 Main Street".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn customers_start_approved_professionals_do_not() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = fixtures::service(&store, "Plumbing", 500.0).await;
        let auth = service(store.clone());

        let customer = auth.register(registration("carol", "customer")).await.unwrap();
        assert!(customer.user.approved);
        assert!(customer.customer().is_some());

        let mut pro = registration("pete", "professional");
        pro.service_type_id = Some(plumbing.id);
        let pro = auth.register(pro).await.unwrap();
        assert!(!pro.user.approved);
        assert_eq!(pro.professional().unwrap().service_type_id, Some(plumbing.id));
    }

    #[tokio::test]
    async fn registration_rules() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());

        assert!(matches!(
            auth.register(registration("root", "admin")).await,
            Err(ServiceError::Validation(_))
        ));

        let mut pro = registration("pete", "professional");
        pro.service_type_id = Some(Uuid::new_v4());
        assert!(matches!(auth.register(pro).await, Err(ServiceError::Validation(_))));

        auth.register(registration("carol", "customer")).await.unwrap();
        assert!(matches!(
            auth.register(registration("carol", "customer")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_password_and_embeds_flags() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = fixtures::service(&store, "Plumbing", 500.0).await;
        let auth = service(store.clone());
        let mut pro = registration("pete", "professional");
        pro.service_type_id = Some(plumbing.id);
        auth.register(pro).await.unwrap();

        assert!(matches!(
            auth.login("pete", "wrong-password").await,
            Err(ServiceError::Authentication(_))
        ));

        let tokens = auth.login("pete", "password123").await.unwrap();
        let claims = token::decode_token(&tokens.access_token, b"test-secret").unwrap();
        assert_eq!(claims.role, UserRole::Professional);
        assert!(!claims.approved);
        assert_eq!(claims.typ, TokenType::Access);
    }

    #[tokio::test]
    async fn refresh_rereads_live_state() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());
        let carol = auth.register(registration("carol", "customer")).await.unwrap();
        let tokens = auth.login("carol", "password123").await.unwrap();

        // Block after issuance: the old access token still decodes as active.
        store.set_user_active(carol.user.id, false).await.unwrap();
        let stale = token::decode_token(&tokens.access_token, b"test-secret").unwrap();
        assert!(stale.active);

        assert!(matches!(
            auth.refresh(&tokens.refresh_token).await,
            Err(ServiceError::AccountInactive)
        ));

        store.set_user_active(carol.user.id, true).await.unwrap();
        let renewed = auth.refresh(&tokens.refresh_token).await.unwrap();
        assert!(token::decode_token(&renewed.access_token, b"test-secret").unwrap().active);

        assert!(matches!(
            auth.refresh(&tokens.access_token).await,
            Err(ServiceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn refresh_fails_for_pending_professional() {
        let store = Arc::new(MemoryStore::new());
        let plumbing = fixtures::service(&store, "Plumbing", 500.0).await;
        let auth = service(store.clone());
        let mut pro = registration("pete", "professional");
        pro.service_type_id = Some(plumbing.id);
        auth.register(pro).await.unwrap();

        let tokens = auth.login("pete", "password123").await.unwrap();
        assert!(matches!(
            auth.refresh(&tokens.refresh_token).await,
            Err(ServiceError::PendingApproval)
        ));
    }

    #[tokio::test]
    async fn default_admin_is_created_once() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone());
        assert!(auth.ensure_admin().await.unwrap());
        assert!(!auth.ensure_admin().await.unwrap());
        let tokens = auth.login("admin", "admin123").await.unwrap();
        assert_eq!(tokens.user.role, UserRole::Admin);
    }
}
