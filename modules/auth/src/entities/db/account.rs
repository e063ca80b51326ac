use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use time::PrimitiveDateTime;
use tracing::instrument;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, is_admin, \
     reset_token, reset_token_expires_at, reset_token_sent_at, created_at, updated_at";

#[derive(Clone, Eq, PartialEq, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<PrimitiveDateTime>,
    pub reset_token_sent_at: Option<PrimitiveDateTime>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("is_admin", &self.is_admin)
            .field("reset_token", &self.reset_token.as_ref().map(|_| "[REDACTED]"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct FindAccountByEmail {
    pub email: String,
}

impl Processor<FindAccountByEmail> for DatabaseProcessor {
    type Output = Option<Account>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindAccountByEmail", err)]
    async fn process(&self, input: FindAccountByEmail) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"SELECT {ACCOUNT_COLUMNS} FROM "auth"."account" WHERE email = $1"#
        ))
        .bind(&input.email)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindAccountById {
    pub id: Uuid,
}

impl Processor<FindAccountById> for DatabaseProcessor {
    type Output = Option<Account>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindAccountById", err)]
    async fn process(&self, input: FindAccountById) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"SELECT {ACCOUNT_COLUMNS} FROM "auth"."account" WHERE id = $1"#
        ))
        .bind(input.id)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListAccounts;

impl Processor<ListAccounts> for DatabaseProcessor {
    type Output = Vec<Account>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListAccounts", err)]
    async fn process(&self, _input: ListAccounts) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"SELECT {ACCOUNT_COLUMNS} FROM "auth"."account" ORDER BY created_at DESC"#
        ))
        .fetch_all(self.db())
        .await
    }
}

#[derive(Clone)]
pub struct RegisterAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

impl std::fmt::Debug for RegisterAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

impl Processor<RegisterAccount> for DatabaseProcessor {
    type Output = Account;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:RegisterAccount", err)]
    async fn process(&self, input: RegisterAccount) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO "auth"."account" (name, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(input.is_admin)
        .fetch_one(self.db())
        .await
    }
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Clone)]
pub struct UpdateAccountProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

impl Processor<UpdateAccountProfile> for DatabaseProcessor {
    type Output = Option<Account>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:UpdateAccountProfile", err)]
    async fn process(&self, input: UpdateAccountProfile) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE "auth"."account"
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                is_admin = COALESCE($4, is_admin),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(input.id)
        .bind(input.name)
        .bind(input.email)
        .bind(input.is_admin)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteAccount {
    pub id: Uuid,
}

impl Processor<DeleteAccount> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:DeleteAccount", err)]
    async fn process(&self, input: DeleteAccount) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM "auth"."account" WHERE id = $1"#)
            .bind(input.id)
            .execute(self.db())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Stores a freshly issued reset token, replacing any previous one.
#[derive(Clone)]
pub struct StoreResetToken {
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: PrimitiveDateTime,
    pub sent_at: PrimitiveDateTime,
}

impl std::fmt::Debug for StoreResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreResetToken")
            .field("account_id", &self.account_id)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("sent_at", &self.sent_at)
            .finish()
    }
}

impl Processor<StoreResetToken> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:StoreResetToken", err)]
    async fn process(&self, input: StoreResetToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE "auth"."account"
            SET reset_token = $2,
                reset_token_expires_at = $3,
                reset_token_sent_at = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(input.account_id)
        .bind(&input.token)
        .bind(input.expires_at)
        .bind(input.sent_at)
        .execute(self.db())
        .await
        .map(|_| ())
    }
}

/// Single-statement password reset: the token must match, belong to the
/// account with this email, and still be unexpired. A matching row gets the
/// new hash and all token columns cleared at once, so a consumed token can
/// never be replayed.
#[derive(Clone)]
pub struct ConsumeResetToken {
    pub email: String,
    pub token: String,
    pub new_password_hash: String,
    pub now: PrimitiveDateTime,
}

impl std::fmt::Debug for ConsumeResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumeResetToken")
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .field("now", &self.now)
            .finish()
    }
}

impl Processor<ConsumeResetToken> for DatabaseProcessor {
    type Output = Option<Account>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ConsumeResetToken", err)]
    async fn process(&self, input: ConsumeResetToken) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE "auth"."account"
            SET password_hash = $3,
                reset_token = NULL,
                reset_token_expires_at = NULL,
                reset_token_sent_at = NULL,
                updated_at = NOW()
            WHERE email = $1
              AND reset_token = $2
              AND reset_token_expires_at > $4
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&input.email)
        .bind(&input.token)
        .bind(&input.new_password_hash)
        .bind(input.now)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CountAccounts;

impl Processor<CountAccounts> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:CountAccounts", err)]
    async fn process(&self, _input: CountAccounts) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "auth"."account""#)
            .fetch_one(self.db())
            .await
    }
}
