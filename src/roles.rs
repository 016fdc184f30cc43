use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    models::{PhotographerProfile, StudioProfile, USER_TYPE_PHOTOGRAPHER, USER_TYPE_STUDIO},
    principals::{photographer_for_user, studio_for_user, Principal},
};

/// What a principal may do, derived from its admin flag and attached profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Administrator,
    StudioExecutor(StudioProfile),
    PhotographerExecutor(PhotographerProfile),
    Client,
}

impl Role {
    /// The admin flag wins over profiles, and a studio over a photographer
    /// profile. Anyone else is a client.
    pub fn from_parts(
        is_admin: bool,
        studio: Option<StudioProfile>,
        photographer: Option<PhotographerProfile>,
    ) -> Self {
        if is_admin {
            return Role::Administrator;
        }
        match (studio, photographer) {
            (Some(profile), _) => Role::StudioExecutor(profile),
            (None, Some(profile)) => Role::PhotographerExecutor(profile),
            (None, None) => Role::Client,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrator)
    }

    pub fn is_executor(&self) -> bool {
        matches!(self, Role::StudioExecutor(_) | Role::PhotographerExecutor(_))
    }

    pub fn is_studio(&self) -> bool {
        matches!(self, Role::StudioExecutor(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Administrator => "admin",
            Role::StudioExecutor(_) => USER_TYPE_STUDIO,
            Role::PhotographerExecutor(_) => USER_TYPE_PHOTOGRAPHER,
            Role::Client => "client",
        }
    }
}

/// The authenticated principal together with its role, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub principal: Principal,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ActorSummary<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub role: &'static str,
}

impl Actor {
    pub fn id(&self) -> &str {
        &self.principal.id
    }

    pub fn summary(&self) -> ActorSummary<'_> {
        ActorSummary {
            id: &self.principal.id,
            email: &self.principal.email,
            role: self.role.label(),
        }
    }
}

pub async fn resolve_role(pool: &SqlitePool, principal: &Principal) -> Result<Role, sqlx::Error> {
    if principal.is_admin {
        return Ok(Role::Administrator);
    }
    let studio = studio_for_user(pool, &principal.id).await?;
    let photographer = if studio.is_none() {
        photographer_for_user(pool, &principal.id).await?
    } else {
        None
    };
    Ok(Role::from_parts(false, studio, photographer))
}

pub async fn resolve_actor(pool: &SqlitePool, principal: Principal) -> Result<Actor, sqlx::Error> {
    let role = resolve_role(pool, &principal).await?;
    Ok(Actor { principal, role })
}
