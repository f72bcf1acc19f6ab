// src/utils/roles.rs

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::utils::jwt::{Claims, LOGIN_PATH};

/// The fixed role table. Ids are stable and seeded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Admin = 1,
    Teacher = 2,
    Student = 3,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Teacher, Role::Student];

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }

    /// Roles a visitor may pick for themselves at registration.
    pub fn is_self_assignable(self) -> bool {
        !matches!(self, Role::Admin)
    }
}

impl TryFrom<i64> for Role {
    type Error = i64;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Role::Admin),
            2 => Ok(Role::Teacher),
            3 => Ok(Role::Student),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Admin,
    Staff,
    Student,
}

impl Dashboard {
    pub fn path(self) -> &'static str {
        match self {
            Dashboard::Admin => "/admin/dashboard",
            Dashboard::Staff => "/staff/dashboard",
            Dashboard::Student => "/student/dashboard",
        }
    }
}

impl From<Role> for Dashboard {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => Dashboard::Admin,
            Role::Teacher => Dashboard::Staff,
            Role::Student => Dashboard::Student,
        }
    }
}

/// Maps a role id to its dashboard. Unknown ids get none.
pub fn dashboard_for(role_id: i64) -> Option<Dashboard> {
    Role::try_from(role_id).ok().map(Dashboard::from)
}

/// Lets the request through only if the session's role is `required`.
/// Must run after `auth_middleware`.
async fn gate(required: Role, req: Request<Body>, next: Next) -> Response {
    let allowed = req
        .extensions()
        .get::<Claims>()
        .is_some_and(|claims| Role::try_from(claims.role) == Ok(required));

    if !allowed {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    next.run(req).await
}

pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    gate(Role::Admin, req, next).await
}

pub async fn require_teacher(req: Request<Body>, next: Next) -> Response {
    gate(Role::Teacher, req, next).await
}

pub async fn require_student(req: Request<Body>, next: Next) -> Response {
    gate(Role::Student, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_route_to_their_dashboard() {
        assert_eq!(dashboard_for(1), Some(Dashboard::Admin));
        assert_eq!(dashboard_for(2), Some(Dashboard::Staff));
        assert_eq!(dashboard_for(3), Some(Dashboard::Student));
    }

    #[test]
    fn unknown_roles_fail_closed() {
        assert_eq!(dashboard_for(0), None);
        assert_eq!(dashboard_for(4), None);
        assert_eq!(dashboard_for(-1), None);
    }

    #[test]
    fn admin_is_not_self_assignable() {
        let selectable: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.is_self_assignable())
            .collect();
        assert_eq!(selectable, vec![Role::Teacher, Role::Student]);
    }
}
