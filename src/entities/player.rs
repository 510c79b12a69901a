// 🎮 Player Entity - Tag identity + payment metadata
//
// "Tag is IDENTITY for matching (case-insensitive), stored with original casing"
//
// Problem solved:
// - "Mango", "mango", "MANGO" → same competitor when importing
// - Aliases collect the other tags a person has played under
// - Payment handles (Venmo/PayPal/Zelle) are blank until someone supplies them

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};

// ============================================================================
// PAYMENT METHODS
// ============================================================================

/// Payment handles for a player. Empty string = not provided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethods {
    #[serde(default)]
    pub venmo: String,

    #[serde(default)]
    pub paypal: String,

    #[serde(default)]
    pub zelle: String,
}

impl PaymentMethods {
    /// True when at least one handle is filled in
    pub fn has_any(&self) -> bool {
        !self.venmo.is_empty() || !self.paypal.is_empty() || !self.zelle.is_empty()
    }

    /// Field-wise overlay: incoming value wins only when non-empty
    pub fn overlay(&self, incoming: &PaymentMethods) -> PaymentMethods {
        PaymentMethods {
            venmo: prefer_non_empty(&incoming.venmo, &self.venmo),
            paypal: prefer_non_empty(&incoming.paypal, &self.paypal),
            zelle: prefer_non_empty(&incoming.zelle, &self.zelle),
        }
    }
}

pub(crate) fn prefer_non_empty(incoming: &str, existing: &str) -> String {
    if incoming.is_empty() {
        existing.to_string()
    } else {
        incoming.to_string()
    }
}

// ============================================================================
// PLAYER RECORD
// ============================================================================

/// One competitor in the roster.
///
/// Serialized shape matches the on-disk snapshot and the REST API:
/// `{ tag, aliases, paymentMethods: { venmo, paypal, zelle }, notes }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Primary gamer tag
    pub tag: String,

    /// Other tags this player is known by (no duplicates)
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default, rename = "paymentMethods")]
    pub payment_methods: PaymentMethods,

    #[serde(default)]
    pub notes: String,
}

impl PlayerRecord {
    /// Create a player with only a tag
    pub fn new(tag: impl Into<String>) -> Self {
        PlayerRecord {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_venmo(mut self, venmo: impl Into<String>) -> Self {
        self.payment_methods.venmo = venmo.into();
        self
    }

    pub fn with_paypal(mut self, paypal: impl Into<String>) -> Self {
        self.payment_methods.paypal = paypal.into();
        self
    }

    pub fn with_zelle(mut self, zelle: impl Into<String>) -> Self {
        self.payment_methods.zelle = zelle.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.add_alias(alias.into());
        self
    }

    /// Add an alias unless it's already present (case-sensitive)
    pub fn add_alias(&mut self, alias: String) {
        if !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
    }

    /// Drop repeated aliases, keeping the first occurrence of each
    pub fn dedup_aliases(&mut self) {
        let aliases = std::mem::take(&mut self.aliases);
        for alias in aliases {
            self.add_alias(alias);
        }
    }

    /// Reject records whose tag is blank after trimming
    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(RosterError::invalid_format("Player tag must not be empty"));
        }
        Ok(())
    }

    /// Case-insensitive tag comparison (import matching mode)
    pub fn tag_matches(&self, tag: &str) -> bool {
        self.tag.to_lowercase() == tag.to_lowercase()
    }

    /// Case-insensitive substring search over tag and aliases
    pub fn matches_query(&self, query: &str) -> bool {
        let lower = query.to_lowercase();

        if self.tag.to_lowercase().contains(&lower) {
            return true;
        }

        self.aliases
            .iter()
            .any(|alias| alias.to_lowercase().contains(&lower))
    }
}

// ============================================================================
// TESTS
// ============================================================================
