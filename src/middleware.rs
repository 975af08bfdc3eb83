//! Identity headers set by the gateway in front of this service.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::app_error::AppError;

pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLES_HEADER: &str = "x-user-roles";
pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

/// Email of the authenticated customer, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerEmail(pub String);

fn header<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Requires `X-User-Email` and exposes it as [`CustomerEmail`].
pub async fn customers_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let email = header(&req, USER_EMAIL_HEADER)
        .ok_or(AppError::Unauthorized)?
        .to_string();

    req.extensions_mut().insert(CustomerEmail(email));
    Ok(next.run(req).await)
}

/// Requires `X-User-Roles` to contain `ROLE_ADMIN`.
pub async fn admins_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    let roles = header(&req, USER_ROLES_HEADER).ok_or(AppError::Unauthorized)?;

    if !has_role(roles, ADMIN_ROLE) {
        return Err(AppError::Forbidden("admin role required".to_string()));
    }

    Ok(next.run(req).await)
}

fn has_role(roles: &str, role: &str) -> bool {
    roles.split(',').any(|r| r.trim() == role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_comma_separated() {
        assert!(has_role("ROLE_USER, ROLE_ADMIN", ADMIN_ROLE));
        assert!(has_role("ROLE_ADMIN", ADMIN_ROLE));
        assert!(!has_role("ROLE_ADMINISTRATOR", ADMIN_ROLE));
        assert!(!has_role("ROLE_USER", ADMIN_ROLE));
    }
}
