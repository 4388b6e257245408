use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{
    documentmodel::{ApprovalOutcome, Document, VerificationReport},
    usermodel::*,
};

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_identity(&self, user_id: Uuid) -> Result<Option<Identity>, sqlx::Error>;

    async fn save_user(&self, new_user: NewUser) -> Result<Identity, sqlx::Error>;

    async fn get_users(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error>;

    /// With `only_available`, restricts to approved and active accounts.
    async fn get_professionals(
        &self,
        service_type_id: Option<Uuid>,
        only_available: bool,
    ) -> Result<Vec<Professional>, sqlx::Error>;

    /// One page of professionals matching `search`, newest first, plus the total match count.
    async fn get_professional_page(
        &self,
        search: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Professional>, i64), sqlx::Error>;

    async fn get_professional(&self, user_id: Uuid) -> Result<Option<Professional>, sqlx::Error>;

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<Option<User>, sqlx::Error>;

    /// Clears `approved`; a given reason replaces the professional's rejection reason.
    async fn reject_user(
        &self,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Approves the account. Professionals must pass the document gate inside the same transaction.
    async fn approve_user(&self, user_id: Uuid) -> Result<ApprovalOutcome, sqlx::Error>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<Identity>, sqlx::Error>;

    async fn admin_exists(&self) -> Result<bool, sqlx::Error>;
}

#[derive(sqlx::FromRow)]
struct ProfessionalRow {
    #[sqlx(flatten)]
    user: User,
    #[sqlx(flatten)]
    profile: ProfessionalProfile,
}

impl From<ProfessionalRow> for Professional {
    fn from(row: ProfessionalRow) -> Self {
        Professional {
            user: row.user,
            profile: row.profile,
        }
    }
}

fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

impl DBClient {
    async fn load_profile(&self, user: &User) -> Result<Option<RoleProfile>, sqlx::Error> {
        let profile = match user.role {
            UserRole::Admin => Some(RoleProfile::Admin),
            UserRole::Professional => sqlx::query_as::<_, ProfessionalProfile>(
                r#"SELECT * FROM professional_profiles WHERE user_id = $1"#,
            )
            .bind(user.id)
            .fetch_optional(&self.pool)
            .await?
            .map(RoleProfile::Professional),
            UserRole::Customer => sqlx::query_as::<_, CustomerProfile>(
                r#"SELECT * FROM customer_profiles WHERE user_id = $1"#,
            )
            .bind(user.id)
            .fetch_optional(&self.pool)
            .await?
            .map(RoleProfile::Customer),
        };
        Ok(profile)
    }
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE username = $1"#)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn get_identity(&self, user_id: Uuid) -> Result<Option<Identity>, sqlx::Error> {
        let Some(user) = self.get_user(Some(user_id), None, None).await? else {
            return Ok(None);
        };
        let profile = self.load_profile(&user).await?;
        Ok(profile.map(|profile| Identity { user, profile }))
    }

    async fn save_user(&self, new_user: NewUser) -> Result<Identity, sqlx::Error> {
        let role = new_user.profile.role();
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, full_name, password, role, approved, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.password_hash)
        .bind(role)
        .bind(role.approved_on_signup())
        .fetch_one(&mut *tx)
        .await?;

        let profile = match new_user.profile {
            NewProfile::Admin => RoleProfile::Admin,
            NewProfile::Professional {
                service_type_id,
                description,
                phone_number,
                pin_code,
                experience_years,
            } => {
                let profile = sqlx::query_as::<_, ProfessionalProfile>(
                    r#"
                    INSERT INTO professional_profiles
                        (user_id, service_type_id, description, phone_number, pin_code, experience_years)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING *
                    "#,
                )
                .bind(user.id)
                .bind(service_type_id)
                .bind(description)
                .bind(phone_number)
                .bind(pin_code)
                .bind(experience_years)
                .fetch_one(&mut *tx)
                .await?;
                RoleProfile::Professional(profile)
            }
            NewProfile::Customer {
                address,
                phone_number,
                pin_code,
            } => {
                let profile = sqlx::query_as::<_, CustomerProfile>(
                    r#"
                    INSERT INTO customer_profiles (user_id, address, phone_number, pin_code)
                    VALUES ($1, $2, $3, $4)
                    RETURNING *
                    "#,
                )
                .bind(user.id)
                .bind(address)
                .bind(phone_number)
                .bind(pin_code)
                .fetch_one(&mut *tx)
                .await?;
                RoleProfile::Customer(profile)
            }
        };

        tx.commit().await?;
        Ok(Identity { user, profile })
    }

    async fn get_users(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR username ILIKE $2 OR full_name ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(role)
        .bind(search_pattern(search))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_count(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR username ILIKE $2 OR full_name ILIKE $2 OR email ILIKE $2)
            "#,
        )
        .bind(role)
        .bind(search_pattern(search))
        .fetch_one(&self.pool)
        .await
    }

    async fn get_professionals(
        &self,
        service_type_id: Option<Uuid>,
        only_available: bool,
    ) -> Result<Vec<Professional>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProfessionalRow>(
            r#"
            SELECT u.*, p.*
            FROM users u
            JOIN professional_profiles p ON p.user_id = u.id
            WHERE ($1::uuid IS NULL OR p.service_type_id = $1)
              AND (NOT $2 OR (u.approved AND u.active))
            ORDER BY p.average_rating DESC, u.created_at
            "#,
        )
        .bind(service_type_id)
        .bind(only_available)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Professional::from).collect())
    }

    async fn get_professional_page(
        &self,
        search: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Professional>, i64), sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;
        let pattern = search_pattern(search);

        let rows = sqlx::query_as::<_, ProfessionalRow>(
            r#"
            SELECT u.*, p.*
            FROM users u
            JOIN professional_profiles p ON p.user_id = u.id
            WHERE ($1::text IS NULL OR u.username ILIKE $1 OR u.full_name ILIKE $1 OR u.email ILIKE $1)
            ORDER BY u.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users u
            JOIN professional_profiles p ON p.user_id = u.id
            WHERE ($1::text IS NULL OR u.username ILIKE $1 OR u.full_name ILIKE $1 OR u.email ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Professional::from).collect(), total))
    }

    async fn get_professional(&self, user_id: Uuid) -> Result<Option<Professional>, sqlx::Error> {
        let row = sqlx::query_as::<_, ProfessionalRow>(
            r#"
            SELECT u.*, p.*
            FROM users u
            JOIN professional_profiles p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Professional::from))
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET active = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    async fn reject_user(
        &self,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET approved = FALSE, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(user), Some(reason)) = (&user, reason) {
            if user.role == UserRole::Professional {
                sqlx::query(
                    r#"UPDATE professional_profiles SET rejection_reason = $2 WHERE user_id = $1"#,
                )
                .bind(user_id)
                .bind(reason)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(user)
    }

    async fn approve_user(&self, user_id: Uuid) -> Result<ApprovalOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1 FOR UPDATE"#)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(user) = user else {
            return Ok(ApprovalOutcome::Missing);
        };

        if user.role == UserRole::Professional {
            // Users row is already locked; the profile lock serializes with document verification.
            sqlx::query(r#"SELECT user_id FROM professional_profiles WHERE user_id = $1 FOR UPDATE"#)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            let documents = sqlx::query_as::<_, Document>(
                r#"SELECT * FROM documents WHERE professional_id = $1"#,
            )
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

            let report = VerificationReport::of(&documents);
            if !report.is_complete() {
                tx.rollback().await?;
                return Ok(ApprovalOutcome::Incomplete(report));
            }

            sqlx::query(
                r#"
                UPDATE professional_profiles
                SET rejection_reason = NULL, documents_verified = TRUE
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET approved = TRUE, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ApprovalOutcome::Approved(user))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&update.full_name)
        .bind(&update.email)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        match user.role {
            UserRole::Professional => {
                sqlx::query(
                    r#"
                    UPDATE professional_profiles
                    SET phone_number = COALESCE($2, phone_number),
                        pin_code = COALESCE($3, pin_code),
                        description = COALESCE($4, description),
                        experience_years = COALESCE($5, experience_years)
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .bind(&update.phone_number)
                .bind(&update.pin_code)
                .bind(&update.description)
                .bind(update.experience_years)
                .execute(&mut *tx)
                .await?;
            }
            UserRole::Customer => {
                sqlx::query(
                    r#"
                    UPDATE customer_profiles
                    SET phone_number = COALESCE($2, phone_number),
                        pin_code = COALESCE($3, pin_code),
                        address = COALESCE($4, address)
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .bind(&update.phone_number)
                .bind(&update.pin_code)
                .bind(&update.address)
                .execute(&mut *tx)
                .await?;
            }
            UserRole::Admin => {}
        }

        tx.commit().await?;
        self.get_identity(user_id).await
    }

    async fn admin_exists(&self) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')"#)
            .fetch_one(&self.pool)
            .await
    }
}
