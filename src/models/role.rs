// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role connection metadata: schema records and per-user values.
//!
//! A [`RoleMetadataRecord`] is a field of the application's schema; a
//! [`RoleConnection`] carries one user's values for those fields. Both
//! validate Discord's limits when built and convert to and from the wire
//! payloads used by the REST API.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};

pub const MAX_KEY_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 200;
pub const MAX_PLATFORM_NAME_LEN: usize = 50;
pub const MAX_PLATFORM_USERNAME_LEN: usize = 100;
/// Discord allows five records per application and five values per connection.
pub const MAX_METADATA: usize = 5;

const DEFAULT_DESCRIPTION: &str = "...";

/// Comparison Discord applies between a user's value and a role requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MetadataType {
    IntegerLessThanOrEqual = 1,
    IntegerGreaterThanOrEqual = 2,
    IntegerEqual = 3,
    IntegerNotEqual = 4,
    DatetimeLessThanOrEqual = 5,
    DatetimeGreaterThanOrEqual = 6,
    BooleanEqual = 7,
    BooleanNotEqual = 8,
}

/// Kind of value a [`MetadataType`] compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Integer,
    DateTime,
    Boolean,
}

impl MetadataType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn kind(self) -> MetadataKind {
        match self {
            MetadataType::IntegerLessThanOrEqual
            | MetadataType::IntegerGreaterThanOrEqual
            | MetadataType::IntegerEqual
            | MetadataType::IntegerNotEqual => MetadataKind::Integer,
            MetadataType::DatetimeLessThanOrEqual | MetadataType::DatetimeGreaterThanOrEqual => {
                MetadataKind::DateTime
            }
            MetadataType::BooleanEqual | MetadataType::BooleanNotEqual => MetadataKind::Boolean,
        }
    }
}

impl TryFrom<u8> for MetadataType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            1 => MetadataType::IntegerLessThanOrEqual,
            2 => MetadataType::IntegerGreaterThanOrEqual,
            3 => MetadataType::IntegerEqual,
            4 => MetadataType::IntegerNotEqual,
            5 => MetadataType::DatetimeLessThanOrEqual,
            6 => MetadataType::DatetimeGreaterThanOrEqual,
            7 => MetadataType::BooleanEqual,
            8 => MetadataType::BooleanNotEqual,
            other => {
                return Err(Error::validation(format!(
                    "{other} is not a valid role metadata type"
                )))
            }
        })
    }
}

impl Serialize for MetadataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for MetadataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        MetadataType::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Either a raw wire integer or a named [`MetadataType`].
///
/// Record constructors accept anything convertible into this and normalize
/// it to a [`MetadataType`], rejecting unknown integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataTypeRepr {
    Raw(u8),
    Named(MetadataType),
}

impl MetadataTypeRepr {
    pub fn normalize(self) -> Result<MetadataType> {
        match self {
            MetadataTypeRepr::Raw(value) => MetadataType::try_from(value),
            MetadataTypeRepr::Named(kind) => Ok(kind),
        }
    }
}

impl From<u8> for MetadataTypeRepr {
    fn from(value: u8) -> Self {
        MetadataTypeRepr::Raw(value)
    }
}

impl From<MetadataType> for MetadataTypeRepr {
    fn from(value: MetadataType) -> Self {
        MetadataTypeRepr::Named(value)
    }
}

/// Check a metadata key: 1-50 characters of `a-z`, `0-9` and `_`.
pub fn validate_metadata_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(Error::validation(format!(
            "{key:?} must be between 1-{MAX_KEY_LEN} characters"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(Error::validation(format!(
            "{key:?} must only contain lowercase letters, numbers, and underscores"
        )));
    }
    Ok(())
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(format!(
            "{field} must be {max} characters or less"
        )));
    }
    Ok(())
}

/// One field of the application's role connection metadata schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RoleMetadataRecordPayload", into = "RoleMetadataRecordPayload")]
pub struct RoleMetadataRecord {
    key: String,
    name: String,
    description: String,
    kind: MetadataType,
    name_localizations: Option<BTreeMap<String, String>>,
    description_localizations: Option<BTreeMap<String, String>>,
}

impl RoleMetadataRecord {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<MetadataTypeRepr>,
    ) -> Result<Self> {
        let key = key.into();
        let name = name.into();
        validate_metadata_key(&key)?;
        check_len("Metadata name", &name, MAX_NAME_LEN)?;

        Ok(Self {
            key,
            name,
            description: DEFAULT_DESCRIPTION.to_string(),
            kind: kind.into().normalize()?,
            name_localizations: None,
            description_localizations: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Result<Self> {
        let description = description.into();
        check_len("Metadata description", &description, MAX_DESCRIPTION_LEN)?;
        self.description = description;
        Ok(self)
    }

    pub fn with_name_localizations(mut self, localizations: BTreeMap<String, String>) -> Self {
        self.name_localizations = Some(localizations);
        self
    }

    pub fn with_description_localizations(
        mut self,
        localizations: BTreeMap<String, String>,
    ) -> Self {
        self.description_localizations = Some(localizations);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metadata_type(&self) -> MetadataType {
        self.kind
    }

    pub fn value_kind(&self) -> MetadataKind {
        self.kind.kind()
    }

    pub fn name_localizations(&self) -> Option<&BTreeMap<String, String>> {
        self.name_localizations.as_ref()
    }

    pub fn description_localizations(&self) -> Option<&BTreeMap<String, String>> {
        self.description_localizations.as_ref()
    }
}

impl PartialEq for RoleMetadataRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RoleMetadataRecord {}

/// Wire form of a metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMetadataRecordPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_localizations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_localizations: Option<BTreeMap<String, String>>,
}

impl TryFrom<RoleMetadataRecordPayload> for RoleMetadataRecord {
    type Error = Error;

    fn try_from(payload: RoleMetadataRecordPayload) -> Result<Self> {
        let mut record = RoleMetadataRecord::new(payload.key, payload.name, payload.kind)?;
        if let Some(description) = payload.description.filter(|d| !d.is_empty()) {
            record = record.with_description(description)?;
        }
        record.name_localizations = payload.name_localizations;
        record.description_localizations = payload.description_localizations;
        Ok(record)
    }
}

impl From<RoleMetadataRecord> for RoleMetadataRecordPayload {
    fn from(record: RoleMetadataRecord) -> Self {
        Self {
            kind: record.kind.as_u8(),
            key: record.key,
            name: record.name,
            description: Some(record.description),
            name_localizations: record.name_localizations,
            description_localizations: record.description_localizations,
        }
    }
}

/// A single metadata value for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl MetadataValue {
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataValue::Integer(_) => MetadataKind::Integer,
            MetadataValue::Boolean(_) => MetadataKind::Boolean,
            MetadataValue::DateTime(_) => MetadataKind::DateTime,
        }
    }

    /// Wire form: Discord stores every value as a string.
    pub fn to_wire(&self) -> String {
        match self {
            MetadataValue::Integer(v) => v.to_string(),
            MetadataValue::Boolean(true) => "1".to_string(),
            MetadataValue::Boolean(false) => "0".to_string(),
            MetadataValue::DateTime(v) => format_utc_rfc3339(*v),
        }
    }

    /// Decode a wire value as the given kind.
    pub fn from_wire(raw: &str, kind: MetadataKind) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            MetadataKind::Integer => raw.parse().ok().map(MetadataValue::Integer),
            MetadataKind::Boolean => match raw {
                "1" | "true" => Some(MetadataValue::Boolean(true)),
                "0" | "false" => Some(MetadataValue::Boolean(false)),
                _ => None,
            },
            MetadataKind::DateTime => parse_utc_rfc3339(raw).map(MetadataValue::DateTime),
        }
    }

    /// Decode a wire value without a schema. `"1"`/`"0"` come back as integers.
    pub fn infer_from_wire(raw: &str) -> Option<Self> {
        Self::from_wire(raw, MetadataKind::Integer)
            .or_else(|| Self::from_wire(raw, MetadataKind::DateTime))
            .or_else(|| Self::from_wire(raw, MetadataKind::Boolean))
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(value.into())
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(value: DateTime<Utc>) -> Self {
        MetadataValue::DateTime(value)
    }
}

impl Serialize for MetadataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetadataValue::Integer(v) => serializer.serialize_i64(*v),
            MetadataValue::Boolean(v) => serializer.serialize_bool(*v),
            MetadataValue::DateTime(v) => serializer.serialize_str(&format_utc_rfc3339(*v)),
        }
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Integer(i64),
            Boolean(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Integer(v) => Ok(MetadataValue::Integer(v)),
            Raw::Boolean(v) => Ok(MetadataValue::Boolean(v)),
            Raw::Text(s) => MetadataValue::infer_from_wire(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid metadata value {s:?}"))),
        }
    }
}

/// A user's linked platform and its metadata values for this application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRoleConnection", into = "StoredRoleConnection")]
pub struct RoleConnection {
    platform_name: String,
    platform_username: String,
    metadata: BTreeMap<String, MetadataValue>,
}

impl RoleConnection {
    pub fn new(
        platform_name: impl Into<String>,
        platform_username: impl Into<String>,
    ) -> Result<Self> {
        let platform_name = platform_name.into();
        let platform_username = platform_username.into();
        check_len("Platform name", &platform_name, MAX_PLATFORM_NAME_LEN)?;
        check_len(
            "Platform username",
            &platform_username,
            MAX_PLATFORM_USERNAME_LEN,
        )?;
        Ok(Self {
            platform_name,
            platform_username,
            metadata: BTreeMap::new(),
        })
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn platform_username(&self) -> &str {
        &self.platform_username
    }

    pub fn set_platform_username(&mut self, username: impl Into<String>) -> Result<&mut Self> {
        let username = username.into();
        check_len("Platform username", &username, MAX_PLATFORM_USERNAME_LEN)?;
        self.platform_username = username;
        Ok(self)
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    pub fn get_metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// Add a new value. Fails if the key exists or the connection is full.
    pub fn add_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Result<&mut Self> {
        let key = key.into();
        validate_metadata_key(&key)?;
        if self.metadata.contains_key(&key) {
            return Err(Error::validation(format!("{key:?} already exists")));
        }
        if self.metadata.len() >= MAX_METADATA {
            return Err(Error::validation(format!(
                "You can only have {MAX_METADATA} metadata values per platform"
            )));
        }
        self.metadata.insert(key, value.into());
        Ok(self)
    }

    /// Replace an existing value; does nothing when the key is absent.
    pub fn edit_metadata(&mut self, key: &str, value: impl Into<MetadataValue>) -> &mut Self {
        if let Some(existing) = self.metadata.get_mut(key) {
            *existing = value.into();
        }
        self
    }

    pub fn add_or_edit_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Result<&mut Self> {
        let key = key.into();
        if self.metadata.contains_key(&key) {
            Ok(self.edit_metadata(&key, value))
        } else {
            self.add_metadata(key, value)
        }
    }

    pub fn remove_metadata(&mut self, key: &str) -> &mut Self {
        self.metadata.remove(key);
        self
    }

    pub fn clear_metadata(&mut self) -> &mut Self {
        self.metadata.clear();
        self
    }

    pub fn to_payload(&self) -> RoleConnectionPayload {
        RoleConnectionPayload {
            platform_name: Some(self.platform_name.clone()),
            platform_username: Some(self.platform_username.clone()),
            metadata: self
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.to_wire()))
                .collect(),
        }
    }

    /// Decode a wire payload. `schema` maps keys to the kind registered for
    /// them; keys missing from it are decoded by inference.
    pub fn from_payload(
        payload: RoleConnectionPayload,
        schema: impl Fn(&str) -> Option<MetadataKind>,
    ) -> Result<Self> {
        let mut metadata = BTreeMap::new();
        for (key, raw) in payload.metadata {
            let value = match schema(&key) {
                Some(kind) => MetadataValue::from_wire(&raw, kind),
                None => MetadataValue::infer_from_wire(&raw),
            }
            .ok_or_else(|| {
                Error::validation(format!("Role metadata {key:?} has an invalid value {raw:?}"))
            })?;
            metadata.insert(key, value);
        }

        Ok(Self {
            platform_name: payload.platform_name.unwrap_or_default(),
            platform_username: payload.platform_username.unwrap_or_default(),
            metadata,
        })
    }
}

/// Serde form of a [`RoleConnection`], with typed values.
///
/// Deserializing goes back through [`RoleConnection::new`] and
/// [`RoleConnection::add_metadata`] so restored connections obey the same limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRoleConnection {
    platform_name: String,
    platform_username: String,
    #[serde(default)]
    metadata: BTreeMap<String, MetadataValue>,
}

impl TryFrom<StoredRoleConnection> for RoleConnection {
    type Error = Error;

    fn try_from(stored: StoredRoleConnection) -> Result<Self> {
        let mut connection = RoleConnection::new(stored.platform_name, stored.platform_username)?;
        for (key, value) in stored.metadata {
            connection.add_metadata(key, value)?;
        }
        Ok(connection)
    }
}

impl From<RoleConnection> for StoredRoleConnection {
    fn from(connection: RoleConnection) -> Self {
        Self {
            platform_name: connection.platform_name,
            platform_username: connection.platform_username,
            metadata: connection.metadata,
        }
    }
}

/// Wire form of a user's role connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConnectionPayload {
    pub platform_name: Option<String>,
    pub platform_username: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RoleConnectionPayload {
    /// Discord answers with nulls and an empty map for users who never linked.
    pub fn is_empty(&self) -> bool {
        self.platform_name.as_deref().unwrap_or_default().is_empty()
            && self.platform_username.as_deref().unwrap_or_default().is_empty()
            && self.metadata.is_empty()
    }
}
