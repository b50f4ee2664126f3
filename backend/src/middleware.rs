use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, dev::Payload, http, web};
use store::Bank;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::error::ApiError;

/// The caller identified by a valid `Authorization: Bearer` token whose
/// subject is still a registered user.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn app_data<T: ?Sized + 'static>(req: &HttpRequest) -> Result<web::Data<T>, ApiError> {
    req.app_data::<web::Data<T>>().cloned().ok_or_else(|| {
        log::error!("{} is not registered as app data", std::any::type_name::<T>());
        ApiError::Internal("missing app data".into())
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = app_data::<TokenService>(req).and_then(|tokens| {
            bearer_token(req)
                .ok_or(ApiError::Unauthorized)
                .and_then(|token| tokens.decode_jwt(token))
        });
        let bank = app_data::<dyn Bank>(req);

        Box::pin(async move {
            let (claims, bank) = (claims?, bank?);
            match bank.get_user_by_id(claims.sub).await? {
                Some(user) => Ok(AuthenticatedUser { id: user.id }),
                None => {
                    log::debug!("Token subject {} is not a registered user", claims.sub);
                    Err(ApiError::Unauthorized)
                }
            }
        })
    }
}
