use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use framework::processor::Processor;
use serde_json::json;
use uuid::Uuid;

use crate::entities::db::account::Account;
use crate::rest::middleware::{AdminUser, CurrentUser};
use crate::services::account::{
    AccountService, AuthenticatedAccount, FetchAccount, FetchAllAccounts, RemoveAccount, SignIn,
    SignInResult, SignUp, SignUpResult, UpdateProfile, UpdateProfileResult,
};
use crate::services::password_reset::{
    PasswordResetService, ResetPassword, ResetPasswordResult, SendResetOtp, SendResetOtpResult,
};

#[derive(Clone)]
pub struct UserRestState {
    pub accounts: AccountService,
    pub password_reset: PasswordResetService,
}

pub fn router(state: UserRestState) -> Router {
    Router::new()
        .route("/signin", post(signin))
        .route("/signup", post(signup))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/userlist", get(userlist))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(serde::Deserialize)]
struct SignUpRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedInUser {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    email: String,
    is_admin: bool,
    token: String,
}

impl From<AuthenticatedAccount> for SignedInUser {
    fn from(auth: AuthenticatedAccount) -> Self {
        Self {
            id: auth.account.id,
            name: auth.account.name,
            email: auth.account.email,
            is_admin: auth.account.is_admin,
            token: auth.token.into_inner(),
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UserView {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    email: String,
    is_admin: bool,
    created_at: time::PrimitiveDateTime,
    updated_at: time::PrimitiveDateTime,
}

impl From<Account> for UserView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            is_admin: account.is_admin,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

async fn signin(
    State(state): State<UserRestState>,
    Json(req): Json<SignInRequest>,
) -> Result<Response, framework::Error> {
    let result = state
        .accounts
        .process(SignIn {
            email: req.email,
            password: req.password,
        })
        .await?;
    match result {
        SignInResult::Success(auth) => Ok(Json(SignedInUser::from(auth)).into_response()),
        SignInResult::WrongCredential => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid email or password" })),
        )
            .into_response()),
    }
}

async fn signup(
    State(state): State<UserRestState>,
    Json(req): Json<SignUpRequest>,
) -> Result<Response, framework::Error> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(framework::Error::InvalidInput(
            "name, email and password are required".to_owned(),
        ));
    }
    let result = state
        .accounts
        .process(SignUp {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;
    match result {
        SignUpResult::Registered(auth) => {
            Ok((StatusCode::CREATED, Json(SignedInUser::from(auth))).into_response())
        }
        SignUpResult::DuplicatedEmail => {
            Err(framework::Error::Conflict("email already exists".to_owned()))
        }
    }
}

#[derive(serde::Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

async fn forgot_password(
    State(state): State<UserRestState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Response, framework::Error> {
    let result = state
        .password_reset
        .process(SendResetOtp { email: req.email })
        .await?;
    match result {
        SendResetOtpResult::MaybeSent => {
            Ok(Json(json!({ "message": "OTP sent to your email" })).into_response())
        }
        SendResetOtpResult::RateLimited => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": "an OTP was sent recently, try again later" })),
        )
            .into_response()),
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    email: String,
    token: String,
    new_password: String,
}

async fn reset_password(
    State(state): State<UserRestState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Response, framework::Error> {
    let result = state
        .password_reset
        .process(ResetPassword {
            email: req.email,
            otp: req.token,
            new_password: req.new_password,
        })
        .await?;
    match result {
        ResetPasswordResult::Success(_) => {
            Ok(Json(json!({ "message": "Password has been reset successfully" })).into_response())
        }
        ResetPasswordResult::InvalidOtp => Err(framework::Error::Conflict(
            "invalid or expired OTP".to_owned(),
        )),
    }
}

async fn userlist(
    _admin: AdminUser,
    State(state): State<UserRestState>,
) -> Result<Json<Vec<UserView>>, framework::Error> {
    let accounts = state.accounts.process(FetchAllAccounts).await?;
    Ok(Json(accounts.into_iter().map(UserView::from).collect()))
}

async fn get_user(
    _user: CurrentUser,
    State(state): State<UserRestState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, framework::Error> {
    let account = state.accounts.process(FetchAccount { id }).await?;
    Ok(Json(UserView::from(account)))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
    is_admin: Option<bool>,
}

async fn update_user(
    _user: CurrentUser,
    State(state): State<UserRestState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Response, framework::Error> {
    let result = state
        .accounts
        .process(UpdateProfile {
            id,
            name: req.name,
            email: req.email,
            is_admin: req.is_admin,
        })
        .await?;
    match result {
        UpdateProfileResult::Updated(account) => Ok(Json(
            json!({ "message": "User Updated", "user": UserView::from(account) }),
        )
        .into_response()),
        UpdateProfileResult::NotFound => Err(framework::Error::NotFound),
        UpdateProfileResult::DuplicatedEmail => {
            Err(framework::Error::Conflict("email already exists".to_owned()))
        }
    }
}

async fn delete_user(
    _admin: AdminUser,
    State(state): State<UserRestState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, framework::Error> {
    state.accounts.process(RemoveAccount { id }).await?;
    Ok(Json(json!({ "message": "User Deleted" })))
}
