// src/middleware/auth_extractor.rs - bearer token extractors with role gates
use actix_web::error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized};
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Role {
    Admin = 1,
    Reader = 2,
}

impl Role {
    pub fn from_claim(value: u8) -> Option<Role> {
        match value {
            1 => Some(Role::Admin),
            2 => Some(Role::Reader),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: u8,
    pub exp: usize,
}

/// HS256 secret used to verify bearer tokens. Registered as app data.
#[derive(Clone)]
pub struct AuthSettings {
    secret: String,
}

impl AuthSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256)).map(|data| data.claims)
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role: Role,
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, Error> {
    let settings = req
        .app_data::<web::Data<AuthSettings>>()
        .ok_or_else(|| ErrorInternalServerError("auth is not configured"))?;

    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ErrorUnauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ErrorUnauthorized("Invalid header format"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| ErrorUnauthorized("Invalid auth header format"))?;

    let claims = settings.verify(token).map_err(|e| {
        warn!("rejected bearer token: {}", e);
        ErrorUnauthorized("Invalid token")
    })?;

    let role = Role::from_claim(claims.role).ok_or_else(|| ErrorForbidden("Unknown role"))?;
    Ok(AuthenticatedUser {
        user_id: claims.sub,
        role,
    })
}

/// Authenticates the request and checks the caller holds one of `allowed`.
fn gate(req: &HttpRequest, allowed: &[Role]) -> Result<AuthenticatedUser, Error> {
    let user = authenticate(req)?;
    if !allowed.contains(&user.role) {
        warn!("user {} with role {:?} denied {}", user.user_id, user.role, req.path());
        return Err(ErrorForbidden("Insufficient role"));
    }
    debug!("user {} authorized as {:?}", user.user_id, user.role);
    Ok(user)
}

/// Caller with role 1
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<AdminUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(gate(req, &[Role::Admin]).map(AdminUser))
    }
}

/// Caller with role 1 or 2
pub struct ReaderUser(pub AuthenticatedUser);

impl FromRequest for ReaderUser {
    type Error = Error;
    type Future = Ready<Result<ReaderUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(gate(req, &[Role::Admin, Role::Reader]).map(ReaderUser))
    }
}
