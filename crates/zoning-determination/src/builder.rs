//! # Determination Builder
//!
//! Assembles the Rule Engine output, the match set and the ruleset
//! identity into a [`Determination`], derives the provenance trail and
//! warnings, validates that every reported value is traceable, and
//! computes the content-addressed id.

use std::collections::BTreeSet;

use zoning_core::{sha256_digest, CanonicalBytes, SnapshotVersion};
use zoning_locator::Parcel;
use zoning_resolver::MatchSet;
use zoning_rules::{Field, FieldValue, RuleCoreOutput, RuleState, Ruleset};

use crate::determination::{
    Determination, DeterminationBody, Eligibilities, ParcelSummary, ReportedField,
};
use crate::error::BuildError;
use crate::provenance::{overlay_field, ProvenanceEntry, ProvenanceRole, ProvenanceSource};
use crate::warning::{assessor_mismatch, Warning};

/// Build a determination.
///
/// Fails with [`BuildError::IncompleteProvenance`] when the rule output
/// reports something it cannot trace. That is unreachable when the Rule
/// Engine honors its contract.
pub fn build(
    parcel: &Parcel,
    core: RuleCoreOutput,
    matches: &MatchSet,
    ruleset: &Ruleset,
) -> Result<Determination, BuildError> {
    let snapshot = matches.snapshot_version();
    let provenance = provenance(&core, snapshot);
    let warnings = warnings(parcel, &core);

    let records = matches.records();
    validate(&core, &provenance, &records)?;

    let field = |f: Field| {
        core.field(f)
            .map(ReportedField::from)
            .unwrap_or_else(|| ReportedField {
                value: None,
                source: None,
                uncertain: false,
                unavailable: true,
            })
    };

    let partial = warnings.iter().any(Warning::marks_partial);
    let body = DeterminationBody {
        partial,
        parcel: ParcelSummary {
            apn: parcel.apn().clone(),
            address: parcel.address().to_string(),
            jurisdiction: parcel.jurisdiction().clone(),
            use_type: parcel.use_type().map(str::to_string),
            assessor_zoning: parcel.assessor_zoning().map(str::to_string),
            geometry_digest: parcel.geometry().digest()?,
        },
        as_of: matches.as_of(),
        ruleset_version: ruleset.version().clone(),
        ruleset_digest: ruleset.digest().clone(),
        layer_snapshot_version: snapshot.clone(),
        base_zone: field(Field::BaseZone),
        zone_category: field(Field::ZoneCategory),
        overlays: core.overlays.clone(),
        eligibilities: Eligibilities {
            density_bonus: field(Field::DensityBonus),
            toc_tier: field(Field::TocTier),
            max_height: field(Field::MaxHeight),
            max_far: field(Field::MaxFar),
        },
        environmental: field(Field::Environmental),
        hazards: field(Field::Hazards),
        transit_access: field(Field::TransitAccess),
        matches: records,
        superseded: core.superseded.clone(),
        rule_trace: core.evaluations,
        provenance,
        warnings,
    };

    let id = sha256_digest(&CanonicalBytes::new(&body)?);
    tracing::debug!(
        apn = %parcel.apn(),
        determination = %id,
        partial,
        "determination built"
    );
    Ok(Determination::new(id, body))
}

fn provenance(core: &RuleCoreOutput, snapshot: &SnapshotVersion) -> Vec<ProvenanceEntry> {
    let entry = |field: &str, source: ProvenanceSource, role: ProvenanceRole| ProvenanceEntry {
        field: field.to_string(),
        source,
        snapshot_version: snapshot.clone(),
        role,
    };

    let mut trail = Vec::new();
    for (field, resolved) in &core.fields {
        for c in &resolved.contributions {
            let role = ProvenanceRole::from(c.role);
            trail.push(entry(field.as_str(), ProvenanceSource::Rule(c.rule_id.clone()), role));
            for m in &c.matches {
                trail.push(entry(field.as_str(), ProvenanceSource::Match(m.clone()), role));
            }
        }
        if *field == Field::BaseZone {
            for s in &core.superseded {
                trail.push(entry(
                    field.as_str(),
                    ProvenanceSource::Match(s.match_id.clone()),
                    ProvenanceRole::Superseded,
                ));
            }
        }
    }
    for overlay in &core.overlays {
        let label = overlay_field(overlay.rank);
        for source in &overlay.sources {
            trail.push(entry(
                &label,
                ProvenanceSource::Match(source.clone()),
                ProvenanceRole::Overlay,
            ));
        }
    }
    trail
}

fn warnings(parcel: &Parcel, core: &RuleCoreOutput) -> Vec<Warning> {
    let mut out: Vec<Warning> = core
        .unavailable_kinds
        .iter()
        .map(|kind| Warning::LayerUnavailable { kind: *kind })
        .collect();

    for (field, resolved) in &core.fields {
        if resolved.is_unavailable() {
            let reason = core
                .evaluations
                .iter()
                .rev()
                .find(|e| e.field == *field && e.state == RuleState::Skipped)
                .and_then(|e| e.skip_reason);
            out.push(Warning::FieldUnavailable {
                field: *field,
                reason,
            });
        }
    }

    for (field, rules) in core.conflicts() {
        out.push(Warning::ConflictingRules { field, rules });
    }

    if let Some(tie) = &core.base_zone_tie {
        out.push(Warning::BaseZoneTie {
            chosen: tie.chosen.clone(),
            runner_up: tie.runner_up.clone(),
        });
    }

    let resolved = core.value(Field::BaseZone).and_then(FieldValue::as_text);
    if let (Some(assessor), Some(resolved)) = (parcel.assessor_zoning(), resolved) {
        out.extend(assessor_mismatch(assessor, resolved));
    }
    out
}

fn validate(
    core: &RuleCoreOutput,
    trail: &[ProvenanceEntry],
    records: &[zoning_resolver::MatchRecord],
) -> Result<(), BuildError> {
    let incomplete = |field: &str, detail: String| BuildError::IncompleteProvenance {
        field: field.to_string(),
        detail,
    };

    for (field, resolved) in &core.fields {
        if resolved.is_unavailable() {
            continue;
        }
        let traced = trail
            .iter()
            .any(|e| e.field == field.as_str() && e.role.supports_value());
        if !traced {
            return Err(incomplete(field.as_str(), "value has no provenance entry".into()));
        }
    }

    for overlay in &core.overlays {
        let label = overlay_field(overlay.rank);
        if !trail.iter().any(|e| e.field == label) {
            return Err(incomplete(&label, format!("overlay {} has no source match", overlay.name)));
        }
    }

    let match_ids: BTreeSet<&str> = records.iter().map(|r| r.match_id.as_str()).collect();
    let rule_ids: BTreeSet<&str> = core.evaluations.iter().map(|e| e.rule_id.as_str()).collect();
    for e in trail {
        let known = match &e.source {
            ProvenanceSource::Match(id) => match_ids.contains(id.as_str()),
            ProvenanceSource::Rule(id) => rule_ids.contains(id.as_str()),
        };
        if !known {
            return Err(incomplete(
                &e.field,
                format!("provenance references unknown {:?}", e.source),
            ));
        }
    }
    Ok(())
}
