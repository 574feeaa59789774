// src/authz.rs
//
// Identity of the caller and the single place where role/ownership rules live.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use bson::oid::ObjectId;

use crate::error::ApiError;
use crate::models::Role;
use crate::serialize::parse_id;
use crate::token::Claims;

/// What an operation requires of its caller.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    /// Any authenticated user.
    Authenticated,
    Admin,
    /// The admin, or the user owning the resource.
    AdminOrOwner(&'a ObjectId),
}

/// The authenticated caller, resolved from bearer token claims.
#[derive(Debug, Clone, PartialEq)]
pub struct Requester {
    pub user_id: ObjectId,
    pub role: Role,
}

impl Requester {
    pub fn from_claims(claims: &Claims) -> Result<Self, ApiError> {
        let user_id =
            parse_id(&claims.user_id).ok_or_else(|| ApiError::unauthorized("Invalid token"))?;
        Ok(Self {
            user_id,
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(&self, capability: Capability<'_>) -> bool {
        match capability {
            Capability::Authenticated => true,
            Capability::Admin => self.is_admin(),
            Capability::AdminOrOwner(owner) => self.is_admin() || self.user_id == *owner,
        }
    }

    pub fn require(&self, capability: Capability<'_>) -> Result<(), ApiError> {
        if self.can(capability) {
            return Ok(());
        }
        Err(match capability {
            Capability::Admin => ApiError::forbidden("Admin only"),
            _ => ApiError::forbidden("Not allowed to access this resource"),
        })
    }
}

impl FromRequest for Requester {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.extensions().get::<Claims>() {
            Some(claims) => Requester::from_claims(claims),
            None => Err(ApiError::unauthorized("Not authenticated")),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester(role: Role) -> Requester {
        Requester {
            user_id: ObjectId::new(),
            role,
        }
    }

    #[test]
    fn admin_passes_every_check() {
        let admin = requester(Role::Admin);
        let someone_else = ObjectId::new();
        assert!(admin.can(Capability::Admin));
        assert!(admin.can(Capability::AdminOrOwner(&someone_else)));
    }

    #[test]
    fn customer_only_reaches_own_resources() {
        let customer = requester(Role::Customer);
        let other = ObjectId::new();
        assert!(customer.can(Capability::Authenticated));
        assert!(customer.can(Capability::AdminOrOwner(&customer.user_id)));
        assert!(!customer.can(Capability::AdminOrOwner(&other)));
        assert!(matches!(
            customer.require(Capability::Admin),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn claims_with_malformed_user_id_are_unauthorized() {
        let claims = Claims {
            user_id: "nope".into(),
            role: Role::Admin,
            exp: 0,
        };
        assert!(matches!(
            Requester::from_claims(&claims),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
