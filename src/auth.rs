use actix_identity::Identity;
use actix_utils::future::{ready, Ready};
use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::errors::AppError;

/// Id of the signed-in user, taken from the session identity.
///
/// Extraction fails with `401` when the request carries no valid session.
#[derive(Debug, Clone)]
pub struct SessionUser(pub String);

impl SessionUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl FromRequest for SessionUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = Identity::from_request(req, payload)
            .into_inner()
            .ok()
            .and_then(|identity| identity.id().ok())
            .map(SessionUser)
            .ok_or(AppError::Unauthorized);
        ready(user)
    }
}
