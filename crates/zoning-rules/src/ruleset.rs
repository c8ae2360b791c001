//! # Rulesets
//!
//! A ruleset is static, versioned configuration: a YAML (or JSON) document
//! validated against `ruleset.schema.json`, parsed into
//! [`RulesetDocument`], then compiled into an immutable [`Ruleset`].
//! Compilation enforces every semantic constraint the schema cannot
//! express and fails with [`RuleConfigError`].
//!
//! ## Evaluation Order
//!
//! Rule kinds belong to one of two phases. Zoning-phase rules (base zone,
//! tables, layer attributes, constants, collections, proximity) run
//! first; eligibility-phase rules (TOC tier, density bonus, TOC
//! incentives) run after every zoning rule is terminal. Within a phase,
//! rules run by ascending `tier`, then ascending `priority`. A later tier
//! overrides an earlier one. `(tier, priority)` pairs are unique.
//!
//! The dispatch is a closed tagged variant ([`RuleAction`]), so the
//! evaluation order of any ruleset is auditable from the document alone.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use zoning_core::{
    sha256_digest, CanonicalBytes, ContentDigest, Jurisdiction, LayerKind, Quantity, RuleId,
    RulesetVersion,
};
use zoning_layers::AttributeValue;
use zoning_resolver::ResolutionPolicy;
use zoning_schema::{DocumentKind, SchemaValidator};

use crate::error::{RuleConfigError, RulesetError};
use crate::field::{Field, FieldType, FieldValue, TocTier};

fn default_stop_type_attribute() -> String {
    "stop_type".to_string()
}

// ─── Documents ───────────────────────────────────────────────────────

/// A ruleset as written.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesetDocument {
    /// Version label.
    pub version: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Resolver buffers and source ranks.
    #[serde(default)]
    pub resolution: ResolutionPolicy,
    /// Overlay names in precedence order, highest first.
    #[serde(default)]
    pub overlay_precedence: Vec<String>,
    /// Rules in any order.
    pub rules: Vec<RuleDocument>,
}

/// One rule as written.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDocument {
    /// Unique id.
    pub id: RuleId,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Precedence tier. Higher tiers run later and override.
    pub tier: u16,
    /// Order within the tier.
    pub priority: u32,
    /// Limit the rule to these jurisdictions. Empty means everywhere.
    #[serde(default)]
    pub jurisdictions: Vec<Jurisdiction>,
    /// What the rule does.
    #[serde(flatten)]
    pub action: ActionDocument,
}

/// A rule's action as written, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionDocument {
    /// Select the authoritative base zone.
    BaseZone {
        /// Read the zone code from this attribute instead of the
        /// designation.
        #[serde(default)]
        attribute: Option<String>,
    },
    /// Look a value up by base zone code.
    ZoneTable {
        /// Target field.
        field: Field,
        /// Zone code or prefix to value.
        values: BTreeMap<String, AttributeValue>,
    },
    /// Read a field from a layer attribute.
    LayerAttribute {
        /// Layer kind to read.
        layer: LayerKind,
        /// Only layers with this designation.
        #[serde(default)]
        designation: Option<String>,
        /// Attribute name.
        attribute: String,
        /// Target field.
        field: Field,
        /// `set` or `cap`.
        #[serde(default)]
        effect: Effect,
        /// Also consider buffer-adjacent layers.
        #[serde(default)]
        include_adjacent: bool,
    },
    /// A fixed value whenever a matching layer is present.
    Constant {
        /// Layer kind that triggers the rule.
        layer: LayerKind,
        /// Only layers with this designation.
        #[serde(default)]
        designation: Option<String>,
        /// Target field.
        field: Field,
        /// The value.
        value: AttributeValue,
        /// `set` or `cap`.
        #[serde(default)]
        effect: Effect,
        /// Also consider buffer-adjacent layers.
        #[serde(default)]
        include_adjacent: bool,
    },
    /// Collect designations (or an attribute) of matching layers.
    Collect {
        /// Layer kind.
        layer: LayerKind,
        /// Only layers with this designation.
        #[serde(default)]
        designation: Option<String>,
        /// Target list field.
        field: Field,
        /// Collect this attribute instead of the designation.
        #[serde(default)]
        attribute: Option<String>,
        /// Also consider buffer-adjacent layers.
        #[serde(default)]
        include_adjacent: bool,
    },
    /// Nearby layers with distances.
    Proximity {
        /// Layer kind.
        layer: LayerKind,
        /// Target proximity field.
        field: Field,
        /// Attribute holding the stop category.
        #[serde(default = "default_stop_type_attribute")]
        category_attribute: String,
    },
    /// TOC tier from distance to qualifying transit.
    TocTier {
        /// Layer kind holding transit stops.
        #[serde(default = "default_transit_kind")]
        layer: LayerKind,
        /// Tier thresholds.
        tiers: Vec<TierDocument>,
        /// Zone code prefixes eligible for TOC. Empty means all.
        #[serde(default)]
        eligible_zones: Vec<String>,
        /// Attribute holding the stop category.
        #[serde(default = "default_stop_type_attribute")]
        category_attribute: String,
    },
    /// Density bonus percentage.
    DensityBonus {
        /// Statutory bonus for eligible zones.
        base_percent: u32,
        /// Zone code prefixes eligible. Empty means all.
        #[serde(default)]
        eligible_zones: Vec<String>,
        /// TOC percentage by tier; the larger of this and the base applies.
        #[serde(default)]
        toc_percent: BTreeMap<TocTier, u32>,
    },
    /// Percentage increase of a numeric field by TOC tier.
    TocIncentive {
        /// Target field (`max_height` or `max_far`).
        field: Field,
        /// Increase by tier.
        percent_by_tier: BTreeMap<TocTier, u32>,
    },
}

fn default_transit_kind() -> LayerKind {
    LayerKind::TransitProximity
}

/// One TOC threshold as written.
#[derive(Debug, Clone, Deserialize)]
pub struct TierDocument {
    /// Tier number, 1..=4.
    pub tier: u8,
    /// Maximum distance to a qualifying stop.
    pub max_distance_ft: Quantity,
    /// Qualifying stop categories. Empty means any.
    #[serde(default)]
    pub stop_types: Vec<String>,
}

/// How a rule's value combines with the field's current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Replace (or conflict at equal precedence).
    #[default]
    Set,
    /// Lower to at most this value. Requires an existing value.
    Cap,
}

impl Effect {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Cap => "cap",
        }
    }
}

// ─── Compiled Ruleset ────────────────────────────────────────────────

/// Evaluation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Zone and overlay rules.
    Zoning,
    /// Derived eligibility; reads resolved zoning values.
    Eligibility,
}

/// Which matches a rule reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selector {
    /// Layer kind.
    pub layer: LayerKind,
    /// Designation filter, compared case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    /// Include buffer-adjacent matches.
    pub include_adjacent: bool,
}

/// A compiled TOC threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierThreshold {
    /// Tier granted.
    pub tier: TocTier,
    /// Maximum distance.
    pub max_distance_ft: Quantity,
    /// Qualifying categories, upper-cased. Empty means any.
    pub stop_types: Vec<String>,
}

/// A compiled rule action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    /// Select the authoritative base zone.
    BaseZone {
        /// Attribute holding the zone code.
        #[serde(skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
    },
    /// Look up by zone code: exact, then longest prefix.
    ZoneTable {
        /// Target field.
        field: Field,
        /// Upper-cased zone code or prefix to value.
        values: BTreeMap<String, FieldValue>,
    },
    /// Read a layer attribute.
    LayerAttribute {
        /// Layers read.
        selector: Selector,
        /// Attribute name.
        attribute: String,
        /// Target field.
        field: Field,
        /// Effect.
        effect: Effect,
    },
    /// Fixed value when a layer matches.
    Constant {
        /// Triggering layers.
        selector: Selector,
        /// Target field.
        field: Field,
        /// Value.
        value: FieldValue,
        /// Effect.
        effect: Effect,
    },
    /// Collect names.
    Collect {
        /// Layers read.
        selector: Selector,
        /// Target field.
        field: Field,
        /// Attribute collected instead of designation.
        #[serde(skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
    },
    /// Proximity list.
    Proximity {
        /// Layers read.
        selector: Selector,
        /// Target field.
        field: Field,
        /// Category attribute.
        category_attribute: String,
    },
    /// TOC tier.
    TocTier {
        /// Transit layers.
        selector: Selector,
        /// Thresholds, highest tier first.
        tiers: Vec<TierThreshold>,
        /// Upper-cased eligible zone prefixes.
        eligible_zones: Vec<String>,
        /// Category attribute.
        category_attribute: String,
    },
    /// Density bonus.
    DensityBonus {
        /// Base percentage.
        base_percent: u32,
        /// Upper-cased eligible zone prefixes.
        eligible_zones: Vec<String>,
        /// TOC percentage by tier.
        toc_percent: BTreeMap<TocTier, u32>,
    },
    /// TOC percentage increase.
    TocIncentive {
        /// Target field.
        field: Field,
        /// Increase by tier.
        percent_by_tier: BTreeMap<TocTier, u32>,
    },
}

impl RuleAction {
    /// Kind name as written in rulesets.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::BaseZone { .. } => "base_zone",
            Self::ZoneTable { .. } => "zone_table",
            Self::LayerAttribute { .. } => "layer_attribute",
            Self::Constant { .. } => "constant",
            Self::Collect { .. } => "collect",
            Self::Proximity { .. } => "proximity",
            Self::TocTier { .. } => "toc_tier",
            Self::DensityBonus { .. } => "density_bonus",
            Self::TocIncentive { .. } => "toc_incentive",
        }
    }

    /// Evaluation phase, derived from the kind.
    pub fn phase(&self) -> Phase {
        match self {
            Self::TocTier { .. } | Self::DensityBonus { .. } | Self::TocIncentive { .. } => {
                Phase::Eligibility
            }
            _ => Phase::Zoning,
        }
    }

    /// The field this action writes.
    pub fn field(&self) -> Field {
        match self {
            Self::BaseZone { .. } => Field::BaseZone,
            Self::TocTier { .. } => Field::TocTier,
            Self::DensityBonus { .. } => Field::DensityBonus,
            Self::ZoneTable { field, .. }
            | Self::LayerAttribute { field, .. }
            | Self::Constant { field, .. }
            | Self::Collect { field, .. }
            | Self::Proximity { field, .. }
            | Self::TocIncentive { field, .. } => *field,
        }
    }

    /// Fields this action reads before writing.
    pub fn reads(&self) -> Vec<Field> {
        match self {
            Self::ZoneTable { .. } => vec![Field::BaseZone],
            Self::LayerAttribute { field, effect: Effect::Cap, .. }
            | Self::Constant { field, effect: Effect::Cap, .. } => vec![*field],
            Self::TocTier { eligible_zones, .. } if !eligible_zones.is_empty() => {
                vec![Field::BaseZone]
            }
            Self::DensityBonus { eligible_zones, toc_percent, .. } => {
                let mut reads = Vec::new();
                if !eligible_zones.is_empty() {
                    reads.push(Field::BaseZone);
                }
                if !toc_percent.is_empty() {
                    reads.push(Field::TocTier);
                }
                reads
            }
            Self::TocIncentive { field, .. } => vec![Field::TocTier, *field],
            _ => Vec::new(),
        }
    }

    /// Layers this action reads, if any.
    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Self::LayerAttribute { selector, .. }
            | Self::Constant { selector, .. }
            | Self::Collect { selector, .. }
            | Self::Proximity { selector, .. }
            | Self::TocTier { selector, .. } => Some(selector),
            _ => None,
        }
    }
}

/// Ordering precedence: phase, then tier. Higher overrides lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Precedence {
    /// Phase.
    pub phase: Phase,
    /// Tier.
    pub tier: u16,
}

/// A compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Unique id.
    pub id: RuleId,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tier.
    pub tier: u16,
    /// Priority within the tier.
    pub priority: u32,
    /// Jurisdiction filter; empty means everywhere.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jurisdictions: Vec<Jurisdiction>,
    /// Action.
    pub action: RuleAction,
}

impl Rule {
    /// Phase of the rule.
    pub fn phase(&self) -> Phase {
        self.action.phase()
    }

    /// Override precedence.
    pub fn precedence(&self) -> Precedence {
        Precedence {
            phase: self.phase(),
            tier: self.tier,
        }
    }

    /// True when the rule applies in `jurisdiction`.
    pub fn applies_in(&self, jurisdiction: &Jurisdiction) -> bool {
        self.jurisdictions.is_empty() || self.jurisdictions.contains(jurisdiction)
    }

    fn order_key(&self) -> (Phase, u16, u32) {
        (self.phase(), self.tier, self.priority)
    }
}

/// A validated, immutable ruleset.
#[derive(Debug, Clone, Serialize)]
pub struct Ruleset {
    version: RulesetVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    resolution: ResolutionPolicy,
    overlay_precedence: Vec<String>,
    rules: Vec<Rule>,
    #[serde(skip)]
    digest: ContentDigest,
}

/// The digested content of a ruleset.
#[derive(Serialize)]
struct DigestView<'a> {
    version: &'a RulesetVersion,
    description: &'a Option<String>,
    resolution: &'a ResolutionPolicy,
    overlay_precedence: &'a [String],
    rules: &'a [Rule],
}

impl Ruleset {
    /// Validate a parsed document and compile it.
    pub fn from_value(
        value: Value,
        origin: &str,
        validator: &SchemaValidator,
    ) -> Result<Self, RulesetError> {
        validator.validate(DocumentKind::Ruleset, &value)?;
        let document: RulesetDocument =
            serde_json::from_value(value).map_err(|source| RulesetError::Decode {
                origin: origin.to_string(),
                source,
            })?;
        Ok(document.compile()?)
    }

    /// Load, validate and compile a ruleset file.
    pub fn load(path: &Path, validator: &SchemaValidator) -> Result<Self, RulesetError> {
        let value = zoning_schema::load_value(path)?;
        Self::from_value(value, &path.display().to_string(), validator)
    }

    /// Version label.
    pub fn version(&self) -> &RulesetVersion {
        &self.version
    }

    /// Description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Resolver policy.
    pub fn resolution(&self) -> &ResolutionPolicy {
        &self.resolution
    }

    /// Overlay names, highest precedence first.
    pub fn overlay_precedence(&self) -> &[String] {
        &self.overlay_precedence
    }

    /// Overlay attributes some rule caps a field with, lower-cased.
    /// Only these merge to their minimum across same-designation overlays.
    pub fn overlay_cap_attributes(&self) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter_map(|rule| match &rule.action {
                RuleAction::LayerAttribute {
                    selector,
                    attribute,
                    effect: Effect::Cap,
                    ..
                } if selector.layer == LayerKind::Overlay => Some(attribute.to_ascii_lowercase()),
                _ => None,
            })
            .collect()
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// SHA-256 over the canonical compiled ruleset.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }
}

// ─── Compilation ─────────────────────────────────────────────────────

fn upper_all(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn selector(layer: LayerKind, designation: Option<String>, include_adjacent: bool) -> Selector {
    Selector {
        layer,
        designation: designation.map(|d| d.trim().to_string()),
        include_adjacent,
    }
}

fn literal(
    rule: &RuleId,
    kind: &'static str,
    key: &str,
    field: Field,
    value: &AttributeValue,
) -> Result<FieldValue, RuleConfigError> {
    if !writable_literal(field) {
        return Err(RuleConfigError::FieldTypeMismatch {
            rule: rule.clone(),
            kind,
            field,
        });
    }
    FieldValue::parse_for(field.field_type(), &value.to_string()).map_err(|reason| {
        RuleConfigError::InvalidValue {
            rule: rule.clone(),
            key: key.to_string(),
            reason,
        }
    })
}

/// Fields a table, attribute or constant rule may write.
fn writable_literal(field: Field) -> bool {
    !matches!(field, Field::BaseZone | Field::TocTier | Field::DensityBonus)
        && matches!(
            field.field_type(),
            FieldType::Text | FieldType::Quantity | FieldType::Percent
        )
}

/// Which kinds may write which fields.
fn check_field(rule: &RuleId, action: &RuleAction) -> Result<(), RuleConfigError> {
    let field = action.field();
    let ty = field.field_type();
    let ok = match action {
        RuleAction::BaseZone { .. } | RuleAction::TocTier { .. } | RuleAction::DensityBonus { .. } => true,
        RuleAction::ZoneTable { .. }
        | RuleAction::LayerAttribute { .. }
        | RuleAction::Constant { .. } => writable_literal(field),
        RuleAction::Collect { .. } => ty == FieldType::List,
        RuleAction::Proximity { .. } => ty == FieldType::Proximity,
        RuleAction::TocIncentive { .. } => ty == FieldType::Quantity,
    };
    if !ok {
        return Err(RuleConfigError::FieldTypeMismatch {
            rule: rule.clone(),
            kind: action.kind_name(),
            field,
        });
    }
    match action {
        RuleAction::LayerAttribute { effect: Effect::Cap, .. }
        | RuleAction::Constant { effect: Effect::Cap, .. }
            if !field.is_numeric() =>
        {
            Err(RuleConfigError::NonNumericEffect {
                rule: rule.clone(),
                effect: "cap",
                field,
            })
        }
        _ => Ok(()),
    }
}

fn compile_tiers(rule: &RuleId, tiers: Vec<TierDocument>) -> Result<Vec<TierThreshold>, RuleConfigError> {
    let mut seen = BTreeSet::new();
    let mut compiled = Vec::with_capacity(tiers.len());
    for t in tiers {
        let tier = TocTier::from_number(t.tier).ok_or_else(|| RuleConfigError::InvalidTocTier {
            rule: rule.clone(),
            tier: t.tier,
        })?;
        if !seen.insert(t.tier) {
            return Err(RuleConfigError::DuplicateTocTier {
                rule: rule.clone(),
                tier: t.tier,
            });
        }
        compiled.push(TierThreshold {
            tier,
            max_distance_ft: t.max_distance_ft,
            stop_types: upper_all(t.stop_types),
        });
    }
    compiled.sort_by(|a, b| b.tier.cmp(&a.tier));
    Ok(compiled)
}

fn compile_action(rule: &RuleId, action: ActionDocument) -> Result<RuleAction, RuleConfigError> {
    let compiled = match action {
        ActionDocument::BaseZone { attribute } => RuleAction::BaseZone { attribute },
        ActionDocument::ZoneTable { field, values } => {
            let mut table = BTreeMap::new();
            for (key, value) in &values {
                table.insert(
                    key.trim().to_uppercase(),
                    literal(rule, "zone_table", key, field, value)?,
                );
            }
            RuleAction::ZoneTable {
                field,
                values: table,
            }
        }
        ActionDocument::LayerAttribute {
            layer,
            designation,
            attribute,
            field,
            effect,
            include_adjacent,
        } => RuleAction::LayerAttribute {
            selector: selector(layer, designation, include_adjacent),
            attribute,
            field,
            effect,
        },
        ActionDocument::Constant {
            layer,
            designation,
            field,
            value,
            effect,
            include_adjacent,
        } => RuleAction::Constant {
            selector: selector(layer, designation, include_adjacent),
            value: literal(rule, "constant", "value", field, &value)?,
            field,
            effect,
        },
        ActionDocument::Collect {
            layer,
            designation,
            field,
            attribute,
            include_adjacent,
        } => RuleAction::Collect {
            selector: selector(layer, designation, include_adjacent),
            field,
            attribute,
        },
        ActionDocument::Proximity {
            layer,
            field,
            category_attribute,
        } => RuleAction::Proximity {
            selector: selector(layer, None, true),
            field,
            category_attribute,
        },
        ActionDocument::TocTier {
            layer,
            tiers,
            eligible_zones,
            category_attribute,
        } => RuleAction::TocTier {
            selector: selector(layer, None, true),
            tiers: compile_tiers(rule, tiers)?,
            eligible_zones: upper_all(eligible_zones),
            category_attribute,
        },
        ActionDocument::DensityBonus {
            base_percent,
            eligible_zones,
            toc_percent,
        } => RuleAction::DensityBonus {
            base_percent,
            eligible_zones: upper_all(eligible_zones),
            toc_percent,
        },
        ActionDocument::TocIncentive {
            field,
            percent_by_tier,
        } => RuleAction::TocIncentive {
            field,
            percent_by_tier,
        },
    };
    check_field(rule, &compiled)?;
    Ok(compiled)
}

fn check_buffers(policy: &ResolutionPolicy) -> Result<(), RuleConfigError> {
    match policy.buffers_ft.iter().find(|(_, b)| **b < Quantity::ZERO) {
        Some((kind, buffer)) => Err(RuleConfigError::NegativeBuffer {
            kind: *kind,
            buffer: *buffer,
        }),
        None => Ok(()),
    }
}

/// Every TOC threshold must lie within the resolver's search buffer.
fn check_tier_reach(
    rule: &RuleId,
    action: &RuleAction,
    policy: &ResolutionPolicy,
) -> Result<(), RuleConfigError> {
    let RuleAction::TocTier { selector, tiers, .. } = action else {
        return Ok(());
    };
    let buffer = policy.buffer_ft(selector.layer);
    match tiers.iter().find(|t| t.max_distance_ft > buffer) {
        Some(t) => Err(RuleConfigError::TierBeyondBuffer {
            rule: rule.clone(),
            tier: t.tier,
            kind: selector.layer,
            distance: t.max_distance_ft,
            buffer,
        }),
        None => Ok(()),
    }
}

impl RulesetDocument {
    /// Validate and compile.
    pub fn compile(self) -> Result<Ruleset, RuleConfigError> {
        let version = RulesetVersion::new(self.version.trim())
            .map_err(|e| RuleConfigError::InvalidVersion {
                reason: e.to_string(),
            })?;

        check_buffers(&self.resolution)?;

        let mut ids = BTreeSet::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for doc in self.rules {
            if !ids.insert(doc.id.clone()) {
                return Err(RuleConfigError::DuplicateRuleId { id: doc.id });
            }
            let action = compile_action(&doc.id, doc.action)?;
            check_tier_reach(&doc.id, &action, &self.resolution)?;
            rules.push(Rule {
                id: doc.id,
                description: doc.description,
                tier: doc.tier,
                priority: doc.priority,
                jurisdictions: doc.jurisdictions,
                action,
            });
        }

        let mut slots: BTreeMap<(u16, u32), &RuleId> = BTreeMap::new();
        let mut base_rule: Option<&RuleId> = None;
        for rule in &rules {
            if let Some(first) = slots.insert((rule.tier, rule.priority), &rule.id) {
                return Err(RuleConfigError::DuplicatePrecedence {
                    tier: rule.tier,
                    priority: rule.priority,
                    first: first.clone(),
                    second: rule.id.clone(),
                });
            }
            if matches!(rule.action, RuleAction::BaseZone { .. }) {
                if let Some(first) = base_rule {
                    return Err(RuleConfigError::MultipleBaseZoneRules {
                        first: first.clone(),
                        second: rule.id.clone(),
                    });
                }
                base_rule = Some(&rule.id);
            }
        }

        rules.sort_by_key(Rule::order_key);

        let mut produced = BTreeSet::new();
        for rule in &rules {
            for field in rule.action.reads() {
                if !produced.contains(&field) {
                    return Err(RuleConfigError::UnresolvedDependency {
                        rule: rule.id.clone(),
                        field,
                    });
                }
            }
            produced.insert(rule.action.field());
        }

        let mut overlay_names = BTreeSet::new();
        let mut overlay_precedence = Vec::with_capacity(self.overlay_precedence.len());
        for name in self.overlay_precedence {
            let name = name.trim().to_string();
            if !overlay_names.insert(name.to_uppercase()) {
                return Err(RuleConfigError::DuplicateOverlayPrecedence { name });
            }
            overlay_precedence.push(name);
        }

        let digest = sha256_digest(&CanonicalBytes::new(&DigestView {
            version: &version,
            description: &self.description,
            resolution: &self.resolution,
            overlay_precedence: &overlay_precedence,
            rules: &rules,
        })?);

        Ok(Ruleset {
            version,
            description: self.description,
            resolution: self.resolution,
            overlay_precedence,
            rules,
            digest,
        })
    }
}
