// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Register the application's role connection metadata schema.
//!
//! Usage: `register-metadata [records.json]`
//!
//! Without an argument a default record set is registered. The file, if
//! given, holds a JSON array of records in Discord's wire format.

use anyhow::Context;
use linked_roles::{config::Config, LinkedRolesClient, MetadataType, RoleMetadataRecord};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("linked_roles=debug,info")),
        )
        .init();

    let config = Config::from_env()?;
    if config.client.bot_token.is_none() {
        tracing::warn!("DISCORD_TOKEN not set, using client credentials");
    }

    let records = match std::env::args().nth(1) {
        Some(path) => load_records(&path)?,
        None => default_records()?,
    };

    let client = LinkedRolesClient::new(config.client)?;
    client.start().await?;
    let result = client.register_role_metadata(&records).await;
    client.close().await;

    for record in result? {
        println!(
            "{:<16} {:<24} {:?}",
            record.key(),
            record.name(),
            record.metadata_type()
        );
    }
    Ok(())
}

fn load_records(path: &str) -> anyhow::Result<Vec<RoleMetadataRecord>> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid metadata records in {path}"))
}

fn default_records() -> linked_roles::Result<Vec<RoleMetadataRecord>> {
    Ok(vec![
        RoleMetadataRecord::new("matches", "Matches", 2u8)?
            .with_description("Number of matches this season")?,
        RoleMetadataRecord::new("winrate", "Win Rate", MetadataType::IntegerGreaterThanOrEqual)?
            .with_description("Win rate this season")?,
        RoleMetadataRecord::new(
            "combat_score",
            "Combat Score",
            MetadataType::IntegerGreaterThanOrEqual,
        )?
        .with_description("Combat score this season")?,
        RoleMetadataRecord::new(
            "last_update",
            "Last Update",
            MetadataType::DatetimeLessThanOrEqual,
        )?
        .with_description("Last time this data was updated")?,
        RoleMetadataRecord::new("verified", "Verified", MetadataType::BooleanEqual)?
            .with_description("Verified role")?,
    ])
}
