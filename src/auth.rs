use std::{fmt, sync::Arc};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    models::{PublicUser, normalize_email},
    repository::UserRepository,
};

/// Lifetime of a session token. There is no refresh: clients log in again.
pub const TOKEN_TTL_HOURS: i64 = 4;

// --- Roles ---

/// Role
///
/// Access tier stored on every user and carried inside the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Aspirant,
    Student,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Aspirant => "aspirant",
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    /// Parses a stored or submitted role name. Unknown names are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aspirant" => Some(Role::Aspirant),
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    /// Staff are the roles allowed into the content administration area.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles allowed through the content administration routes.
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];

/// Roles allowed through the user management routes.
pub const SUPERADMIN_ROLES: &[Role] = &[Role::Superadmin];

// --- Token Service ---

/// Claims
///
/// Payload signed into every session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub name: String,
    pub role: Role,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Identity a token is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl From<&PublicUser> for TokenSubject {
    fn from(user: &PublicUser) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("could not sign token: {0}")]
    Signing(String),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// TokenService
///
/// Issues and validates HS256 session tokens. Stateless: nothing is persisted and
/// there is no revocation list, so a token stays valid until `exp`.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
        }
    }

    /// issue
    ///
    /// Signs a token for `subject` valid for `TOKEN_TTL_HOURS` from now.
    pub fn issue(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// issue_at
    ///
    /// Same as `issue` with a caller-supplied clock, so expiry can be exercised.
    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.id,
            name: subject.name.clone(),
            role: subject.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// validate
    ///
    /// Checks signature, algorithm and expiry (no leeway). A payload whose role is
    /// not a known `Role` fails to decode and is reported as `InvalidToken`.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidToken,
            })
    }
}

// --- Auth Gate ---

/// AuthError
///
/// Terminal states of the gate. All of them stop the request before the handler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,
    #[error("Malformed authorization header")]
    MalformedHeader,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("Insufficient permissions")]
    Forbidden,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::InvalidToken | TokenError::Signing(_) => AuthError::InvalidToken,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

/// authorize
///
/// The gate's decision, independent of any HTTP types:
/// header present, `Bearer ` prefixed, token valid, and role allowed.
/// An empty `allowed` slice admits any authenticated role.
pub fn authorize(
    header: Option<&str>,
    tokens: &TokenService,
    allowed: &[Role],
) -> Result<Claims, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?;

    let claims = tokens.validate(token.trim())?;

    if !allowed.is_empty() && !allowed.contains(&claims.role) {
        return Err(AuthError::Forbidden);
    }
    Ok(claims)
}

/// AuthGate
///
/// State for the `require_roles` middleware: which token service to trust and which
/// roles the guarded route group admits.
#[derive(Clone)]
pub struct AuthGate {
    pub tokens: TokenService,
    pub allowed: &'static [Role],
}

impl AuthGate {
    pub fn new(tokens: TokenService, allowed: &'static [Role]) -> Self {
        Self { tokens, allowed }
    }
}

/// require_roles
///
/// Route-scoped middleware. On success the decoded identity is stored in the request
/// extensions, where the `AuthUser` extractor picks it up.
pub async fn require_roles(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // A header that is not valid UTF-8 is treated as malformed rather than missing.
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    let claims = authorize(header, &gate.tokens, gate.allowed).map_err(|e| {
        tracing::debug!(reason = %e, uri = %request.uri(), "auth gate rejected request");
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// AuthUser
///
/// The identity resolved by the gate, available to handlers as an extractor.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Only resolves behind `require_roles`; anywhere else the request is rejected with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized(AuthError::MissingHeader.to_string()))
    }
}

// --- Credentials ---

/// attempt_login
///
/// Resolves an email/password pair to a user. `Ok(None)` covers every rejection
/// (unknown email, inactive account, non-login role, wrong password) so callers
/// cannot tell them apart.
pub async fn attempt_login(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
) -> ApiResult<Option<PublicUser>> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Ok(None);
    }

    let Some(record) = users.find_by_email(&email).await? else {
        return Ok(None);
    };

    if !record.is_active {
        tracing::info!(user_id = record.id, "login refused for inactive account");
        return Ok(None);
    }

    let Some(role) = Role::parse(&record.role) else {
        tracing::warn!(user_id = record.id, role = %record.role, "user has unknown role");
        return Ok(None);
    };

    if !verify_password(password, &record.password_hash).await? {
        return Ok(None);
    }

    Ok(Some(PublicUser {
        id: record.id,
        name: record.name,
        email: record.email,
        role,
    }))
}

/// Runs bcrypt verification off the async workers. A malformed hash is a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let matched =
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await?;
    Ok(matched)
}

/// Hashes a new password with bcrypt's default cost on a blocking thread.
pub async fn hash_password(password: &str) -> ApiResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}
