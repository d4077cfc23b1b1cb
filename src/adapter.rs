use tracing::debug;

use crate::api_types::*;
use crate::error::TurnError;
use crate::models::*;

/// Decodes a raw extraction response with the adapter for `schema` and
/// checks it. Nothing here guesses the shape from the fields present.
pub fn parse_extraction(schema: ExtractionSchema, body: &str) -> Result<ExtractionBatch, TurnError> {
    let batch = match schema {
        ExtractionSchema::Flat => {
            let api: ApiFlatExtraction = serde_json::from_str(body.trim())
                .map_err(|e| TurnError::malformed(format!("flat extraction: {e}")))?;
            from_flat(api)
        }
        ExtractionSchema::Conversational => {
            let api: ApiConversationalExtraction = serde_json::from_str(body.trim())
                .map_err(|e| TurnError::malformed(format!("conversational extraction: {e}")))?;
            from_conversational(api)?
        }
    };
    validate_batch(&batch)?;

    debug!(
        "Extraction normalised - schema={:?}, workplaces={}, assets={}, worker_groups={}, activities={}, sections={}",
        schema,
        batch.workplaces.len(),
        batch.assets.len(),
        batch.worker_groups.len(),
        batch.activities.len(),
        batch.sections.len()
    );
    Ok(batch)
}

pub fn from_flat(api: ApiFlatExtraction) -> ExtractionBatch {
    ExtractionBatch {
        // the service never sends workplace photos
        workplaces: api.workplaces.into_iter().map(|w| Workplace::new(w.location_name)).collect(),
        assets: api
            .assets
            .into_iter()
            .map(|a| Asset {
                name: a.name,
                category: match a.asset_type {
                    ApiAssetType::Macchinario => AssetCategory::Machinery,
                    ApiAssetType::Impianto => AssetCategory::Plant,
                    ApiAssetType::Attrezzatura => AssetCategory::Equipment,
                    ApiAssetType::Sostanza => AssetCategory::Substance,
                },
                notes: a.notes.filter(|n| !n.trim().is_empty()),
            })
            .collect(),
        worker_groups: api
            .worker_groups
            .into_iter()
            .map(|g| WorkerGroup { name: g.name, tasks: g.tasks })
            .collect(),
        activities: api
            .activities
            .into_iter()
            .map(|a| ExtractedActivity {
                name: a.name,
                workplace: a.workplace,
                asset_refs: dedup_refs(a.assets),
                worker_group_refs: dedup_refs(a.worker_groups),
                non_conformities: a
                    .non_conformities
                    .into_iter()
                    .map(|nc| NonConformity {
                        description: nc.description,
                        risk_level: match nc.risk_level {
                            ApiRiskLevel::Basso => RiskLevel::Low,
                            ApiRiskLevel::Medio => RiskLevel::Medium,
                            ApiRiskLevel::Alto => RiskLevel::High,
                        },
                        violated_norm: nc.violated_norm.filter(|n| !n.trim().is_empty()),
                    })
                    .collect(),
            })
            .collect(),
        sections: Vec::new(),
        photo_target: api.photo_target.map(photo_target),
        reply: None,
    }
}

pub fn from_conversational(api: ApiConversationalExtraction) -> Result<ExtractionBatch, TurnError> {
    let mut sections = Vec::with_capacity(api.report.len());
    for s in api.report {
        let mut findings = Vec::with_capacity(s.findings.len());
        for f in s.findings {
            let risk_level = u8::try_from(f.risk_level)
                .ok()
                .filter(|r| (1..=10).contains(r))
                .ok_or_else(|| {
                    TurnError::malformed(format!(
                        "finding {} in section {:?}: riskLevel {} outside 1..=10",
                        f.id, s.title, f.risk_level
                    ))
                })?;
            findings.push(Finding {
                id: f.id,
                description: f.description,
                hazard: f.hazard,
                risk_level,
                regulation: f.regulation,
                recommendation: f.recommendation,
                photo: f
                    .photo
                    .and_then(|p| p.analysis)
                    .filter(|a| !a.trim().is_empty())
                    .map(|analysis| FindingPhoto { image_ref: None, analysis }),
            });
        }
        sections.push(Section { title: s.title, findings });
    }

    Ok(ExtractionBatch {
        sections,
        photo_target: api.photo_target.map(photo_target),
        reply: Some(api.conversational_response),
        ..Default::default()
    })
}

/// Schema checks a typed decode cannot express. Any failure rejects the
/// whole batch.
pub fn validate_batch(batch: &ExtractionBatch) -> Result<(), TurnError> {
    fn non_empty(what: &str, value: &str) -> Result<(), TurnError> {
        if value.trim().is_empty() {
            Err(TurnError::malformed(format!("{what} is empty")))
        } else {
            Ok(())
        }
    }

    for w in &batch.workplaces {
        non_empty("workplace locationName", &w.location_name)?;
    }
    for a in &batch.assets {
        non_empty("asset name", &a.name)?;
    }
    for g in &batch.worker_groups {
        non_empty("worker group name", &g.name)?;
    }
    for a in &batch.activities {
        non_empty("activity name", &a.name)?;
        for nc in &a.non_conformities {
            non_empty(&format!("non-conformity description of {:?}", a.name), &nc.description)?;
        }
    }
    for s in &batch.sections {
        non_empty("section title", &s.title)?;
        for f in &s.findings {
            non_empty("finding id", &f.id)?;
            if !(1..=10).contains(&f.risk_level) {
                return Err(TurnError::malformed(format!(
                    "finding {}: riskLevel {} outside 1..=10",
                    f.id, f.risk_level
                )));
            }
        }
    }
    Ok(())
}

fn photo_target(t: ApiPhotoTarget) -> PhotoTarget {
    match t.kind {
        ApiPhotoTargetKind::Finding => PhotoTarget::Finding(t.reference),
        ApiPhotoTargetKind::Workplace => PhotoTarget::Workplace(t.reference),
    }
}

fn dedup_refs(refs: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(refs.len());
    for r in refs {
        if !out.contains(&r) {
            out.push(r);
        }
    }
    out
}
