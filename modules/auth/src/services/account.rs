use framework::processor::Processor;
use framework::sqlx::{is_foreign_key_violation, is_unique_violation, DatabaseProcessor};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::db::account::{
    Account, DeleteAccount, FindAccountByEmail, FindAccountById, ListAccounts, RegisterAccount,
    UpdateAccountProfile,
};
use crate::utils::password::{hash_password, verify_password};
use crate::utils::token::{AccessToken, TokenSigner};

#[derive(Clone)]
pub struct AccountService {
    pub db: DatabaseProcessor,
    pub tokens: TokenSigner,
}

#[derive(Debug)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub token: AccessToken,
}

#[derive(Clone)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUp")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug)]
pub enum SignUpResult {
    Registered(AuthenticatedAccount),
    DuplicatedEmail,
}

impl Processor<SignUp> for AccountService {
    type Output = SignUpResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: SignUp) -> Result<SignUpResult, framework::Error> {
        let password_hash = hash_password(&input.password).map_err(|e| {
            framework::Error::BusinessPanic(anyhow::anyhow!("password hashing failed: {e}"))
        })?;
        // The unique index on email is the authority here; a pre-check would
        // still race with a concurrent sign-up.
        let registered = self
            .db
            .process(RegisterAccount {
                name: input.name,
                email: input.email,
                password_hash,
                is_admin: false,
            })
            .await;
        match registered {
            Ok(account) => {
                let token = self.tokens.issue(&account)?;
                Ok(SignUpResult::Registered(AuthenticatedAccount {
                    account,
                    token,
                }))
            }
            Err(e) if is_unique_violation(&e) => Ok(SignUpResult::DuplicatedEmail),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignIn")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug)]
pub enum SignInResult {
    Success(AuthenticatedAccount),
    /// Unknown email and wrong password collapse into one variant so the
    /// endpoint cannot be used to enumerate accounts.
    WrongCredential,
}

impl Processor<SignIn> for AccountService {
    type Output = SignInResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: SignIn) -> Result<SignInResult, framework::Error> {
        let Some(account) = self
            .db
            .process(FindAccountByEmail { email: input.email })
            .await?
        else {
            return Ok(SignInResult::WrongCredential);
        };
        if verify_password(&input.password, &account.password_hash).is_err() {
            return Ok(SignInResult::WrongCredential);
        }
        let token = self.tokens.issue(&account)?;
        Ok(SignInResult::Success(AuthenticatedAccount { account, token }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchAccount {
    pub id: Uuid,
}

impl Processor<FetchAccount> for AccountService {
    type Output = Account;
    type Error = framework::Error;
    async fn process(&self, input: FetchAccount) -> Result<Account, framework::Error> {
        self.db
            .process(FindAccountById { id: input.id })
            .await?
            .ok_or(framework::Error::NotFound)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchAllAccounts;

impl Processor<FetchAllAccounts> for AccountService {
    type Output = Vec<Account>;
    type Error = framework::Error;
    async fn process(&self, _input: FetchAllAccounts) -> Result<Vec<Account>, framework::Error> {
        self.db.process(ListAccounts).await.map_err(Into::into)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug)]
pub enum UpdateProfileResult {
    Updated(Account),
    DuplicatedEmail,
    NotFound,
}

impl Processor<UpdateProfile> for AccountService {
    type Output = UpdateProfileResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: UpdateProfile) -> Result<UpdateProfileResult, framework::Error> {
        let updated = self
            .db
            .process(UpdateAccountProfile {
                id: input.id,
                name: input.name,
                email: input.email,
                is_admin: input.is_admin,
            })
            .await;
        match updated {
            Ok(Some(account)) => Ok(UpdateProfileResult::Updated(account)),
            Ok(None) => Ok(UpdateProfileResult::NotFound),
            Err(e) if is_unique_violation(&e) => Ok(UpdateProfileResult::DuplicatedEmail),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveAccount {
    pub id: Uuid,
}

impl Processor<RemoveAccount> for AccountService {
    type Output = ();
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: RemoveAccount) -> Result<(), framework::Error> {
        match self.db.process(DeleteAccount { id: input.id }).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(framework::Error::NotFound),
            Err(e) if is_foreign_key_violation(&e) => Err(framework::Error::Conflict(
                "account still has orders on record".to_owned(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
