//! Application services and ports for the authorization core.

#![forbid(unsafe_code)]

mod authorization_ports;
mod authorization_service;
mod permission_service;
mod registry_ports;

pub use authorization_ports::{
    GrantChange, GrantChangeStatus, GrantPatch, GrantRepository, GrantSpec, UserRecord,
    UserRepository,
};
pub use authorization_service::AuthorizationService;
pub use permission_service::PermissionService;
pub use registry_ports::{NewPermission, PermissionRepository, PermissionUpdate, ReconcileOutcome};
