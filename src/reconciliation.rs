// ⚖️ Import Reconciliation - Merge uploaded rows into the roster
//
// For each raw row:
//   normalize → look up tag (case-insensitive) → merge or insert
//
// Merge rules:
//   aliases        = existing ∪ incoming (existing order first)
//   payment fields = incoming if non-empty, else existing
//   notes          = incoming if non-empty, else existing
//
// Matching runs against ONE snapshot of the roster taken before the batch.
// Decisions are computed here and applied by the store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::entities::player::{prefer_non_empty, PaymentMethods, PlayerRecord};
use crate::parser::RawCandidateRecord;

// ============================================================================
// ACCEPTED KEY SPELLINGS
// ============================================================================

const TAG_KEYS: &[&str] = &["tag", "Tag"];
const ALIAS_KEYS: &[&str] = &["aliases"];
const NOTES_KEYS: &[&str] = &["notes", "Notes"];
const PAYMENT_METHODS_KEY: &str = "paymentMethods";
const VENMO_KEYS: &[&str] = &["venmo", "Venmo"];
const PAYPAL_KEYS: &[&str] = &["paypal", "Paypal"];
const ZELLE_KEYS: &[&str] = &["zelle", "Zelle"];

// ============================================================================
// CANDIDATE RECORD
// ============================================================================

/// Strongly typed view of one uploaded row, all fields trimmed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub tag: String,
    pub aliases: Vec<String>,
    pub payment_methods: PaymentMethods,
    pub notes: String,
}

impl CandidateRecord {
    /// Normalize a raw row. Returns None when the row has no usable tag.
    ///
    /// Aliases are only read from structured JSON; spreadsheet columns named
    /// `aliases` are ignored.
    pub fn from_raw(row: &RawCandidateRecord, structured_json: bool) -> Option<Self> {
        let tag = first_text(row, TAG_KEYS);
        if tag.is_empty() {
            return None;
        }

        let aliases = if structured_json {
            read_aliases(row)
        } else {
            Vec::new()
        };

        let nested = row.get(PAYMENT_METHODS_KEY).and_then(Value::as_object);

        Some(CandidateRecord {
            tag,
            aliases,
            payment_methods: PaymentMethods {
                venmo: payment_field(row, nested, VENMO_KEYS),
                paypal: payment_field(row, nested, PAYPAL_KEYS),
                zelle: payment_field(row, nested, ZELLE_KEYS),
            },
            notes: first_text(row, NOTES_KEYS),
        })
    }

    pub fn into_player(self) -> PlayerRecord {
        let mut player = PlayerRecord::new(self.tag);
        for alias in self.aliases {
            player.add_alias(alias);
        }
        player.payment_methods = self.payment_methods;
        player.notes = self.notes;
        player
    }
}

/// Text value for a key: strings as-is, numbers/bools rendered. Empty = absent.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First non-empty value among the accepted keys, trimmed
fn first_text(row: &RawCandidateRecord, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| row.get(*key).and_then(text_value))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Nested `paymentMethods.<field>` first, then flat spellings
fn payment_field(
    row: &RawCandidateRecord,
    nested: Option<&serde_json::Map<String, Value>>,
    keys: &[&str],
) -> String {
    let nested_value = nested
        .and_then(|methods| methods.get(keys[0]))
        .and_then(text_value);

    match nested_value {
        Some(value) => value.trim().to_string(),
        None => first_text(row, keys),
    }
}

fn read_aliases(row: &RawCandidateRecord) -> Vec<String> {
    ALIAS_KEYS
        .iter()
        .find_map(|key| row.get(*key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// MERGE
// ============================================================================

/// Merge an incoming candidate into an existing record. Tag keeps the existing casing.
pub fn merge(existing: &PlayerRecord, incoming: &CandidateRecord) -> PlayerRecord {
    let mut merged = existing.clone();

    // Re-dedup existing aliases too so the result always has set semantics
    merged.aliases = Vec::new();
    for alias in existing.aliases.iter().chain(incoming.aliases.iter()) {
        merged.add_alias(alias.clone());
    }

    merged.payment_methods = existing.payment_methods.overlay(&incoming.payment_methods);
    merged.notes = prefer_non_empty(&incoming.notes, &existing.notes);
    merged
}

// ============================================================================
// DECISIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportDecision {
    /// Append a new player
    Insert(PlayerRecord),

    /// Replace the player whose tag is exactly `tag`
    Update { tag: String, player: PlayerRecord },
}

impl ImportDecision {
    pub fn player(&self) -> &PlayerRecord {
        match self {
            ImportDecision::Insert(player) => player,
            ImportDecision::Update { player, .. } => player,
        }
    }

    fn player_mut(&mut self) -> &mut PlayerRecord {
        match self {
            ImportDecision::Insert(player) => player,
            ImportDecision::Update { player, .. } => player,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Fold repeated tags within one batch into a single decision.
    ///
    /// Off: two rows with the same new tag both become inserts, and two rows
    /// hitting the same existing player are each merged against the original
    /// snapshot (the later update wins).
    pub collapse_duplicates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub decisions: Vec<ImportDecision>,
    pub new_count: usize,
    pub updated_count: usize,
    /// Rows dropped: blank tag, or spreadsheet rows for unknown players with
    /// no payment info
    pub skipped_count: usize,
}

/// Compute import decisions for a batch against a fixed roster snapshot
pub fn reconcile(
    raw_records: &[RawCandidateRecord],
    current_roster: &[PlayerRecord],
    source_is_structured_json: bool,
    options: ReconcileOptions,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    // lowercase tag → index into plan.decisions (collapse mode only)
    let mut pending: HashMap<String, usize> = HashMap::new();

    for row in raw_records {
        let candidate = match CandidateRecord::from_raw(row, source_is_structured_json) {
            Some(c) => c,
            None => {
                plan.skipped_count += 1;
                continue;
            }
        };

        let key = candidate.tag.to_lowercase();

        if options.collapse_duplicates {
            if let Some(&index) = pending.get(&key) {
                let decision = &mut plan.decisions[index];
                let merged = merge(decision.player(), &candidate);
                *decision.player_mut() = merged;
                continue;
            }
        }

        match current_roster.iter().find(|p| p.tag_matches(&candidate.tag)) {
            Some(existing) => {
                let merged = merge(existing, &candidate);
                if merged == *existing {
                    debug!(tag = %existing.tag, "import row matches existing player, no changes");
                    continue;
                }

                pending.insert(key, plan.decisions.len());
                plan.decisions.push(ImportDecision::Update {
                    tag: existing.tag.clone(),
                    player: merged,
                });
                plan.updated_count += 1;
            }
            None => {
                if !source_is_structured_json && !candidate.payment_methods.has_any() {
                    debug!(tag = %candidate.tag, "skipping spreadsheet row without payment info");
                    plan.skipped_count += 1;
                    continue;
                }

                pending.insert(key, plan.decisions.len());
                plan.decisions.push(ImportDecision::Insert(candidate.into_player()));
                plan.new_count += 1;
            }
        }
    }

    plan
}

// ============================================================================
// IMPORT REPORT
// ============================================================================

/// Outcome of an applied import batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub new_players: usize,
    pub updated_players: usize,
    pub skipped: usize,
    pub imported_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn from_plan(plan: &ReconcilePlan) -> Self {
        ImportReport {
            new_players: plan.new_count,
            updated_players: plan.updated_count,
            skipped: plan.skipped_count,
            imported_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Import: {} new, {} updated, {} skipped",
            self.new_players, self.updated_players, self.skipped
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
