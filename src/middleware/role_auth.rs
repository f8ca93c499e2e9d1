use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};

use crate::middleware::auth::Claims;
use crate::models::profile::Role;

/// Role gate over the claims `AuthMiddleware` verified. Must sit inside
/// `AuthMiddleware` (wrapped before it) so claims are present. No store lookup:
/// role changes take effect when the user's token is reissued.
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    pub fn new(role: Role) -> Self {
        RequireRole { required_role: role }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequireRoleService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleService {
            service,
            required_role: self.required_role,
        }))
    }
}

pub struct RequireRoleService<S> {
    service: S,
    required_role: Role,
}

impl<S, B> Service<ServiceRequest> for RequireRoleService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();

        match claims {
            Some(claims) => {
                if claims.role == self.required_role || claims.role == Role::Admin {
                    Box::pin(self.service.call(req))
                } else {
                    warn!(
                        "Access denied for {} - requires {:?}, has {:?}",
                        claims.sub, self.required_role, claims.role
                    );
                    Box::pin(ready(Err(ErrorForbidden("Insufficient permissions"))))
                }
            }
            None => {
                debug!("No claims found in request extensions");
                Box::pin(ready(Err(ErrorUnauthorized("No authorization"))))
            }
        }
    }
}
