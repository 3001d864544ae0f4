// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod role;
pub mod token;
pub mod user;

pub use role::{
    MetadataKind, MetadataType, MetadataTypeRepr, MetadataValue, RoleConnection,
    RoleConnectionPayload, RoleMetadataRecord, RoleMetadataRecordPayload,
};
pub use token::{OAuth2Scope, OAuth2Tokens, TokenResponse};
pub use user::{User, UserPayload};
