use std::collections::HashSet;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::adapter::validate_batch;
use crate::error::TurnError;
use crate::merge::{append_history, merge_named, merge_sections};
use crate::models::*;
use crate::photo::{carry_over_photos, resolve_photo, PhotoBinding, PhotoScope};

/// Inputs of one dictation/chat turn besides the extraction itself.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub seq: u64,
    pub transcript: String,
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTurn {
    pub state: ReportState,
    pub binding: PhotoBinding,
    pub reply: Option<String>,
}

fn make_activity_record_id(seq: u64, position: usize, name: &str) -> String {
    format!("{:016x}", xxh3_64(format!("{}|{}|{}", seq, position, name).as_bytes()))
}

/// Folds one extraction into the report and returns the new state.
///
/// `prev` is never touched. A batch that fails validation is rejected as a
/// whole, so the caller keeps `prev` as the current state.
pub fn apply_turn(prev: &ReportState, batch: &ExtractionBatch, turn: &TurnInput) -> Result<AppliedTurn, TurnError> {
    validate_batch(batch)?;

    let workplaces = merge_named(&prev.workplaces, &batch.workplaces);
    let assets = merge_named(&prev.assets, &batch.assets);
    let worker_groups = merge_named(&prev.worker_groups, &batch.worker_groups);

    let stamped: Vec<Activity> = batch
        .activities
        .iter()
        .enumerate()
        .map(|(i, a)| Activity {
            record_id: make_activity_record_id(turn.seq, i, &a.name),
            turn: turn.seq,
            name: a.name.clone(),
            workplace: a.workplace.clone(),
            asset_refs: a.asset_refs.clone(),
            worker_group_refs: a.worker_group_refs.clone(),
            non_conformities: a.non_conformities.clone(),
        })
        .collect();
    let activities = append_history(&prev.activities, &stamped);

    let sections = merge_sections(&prev.sections, &batch.sections);

    let mut state = ReportState {
        workplaces,
        assets,
        worker_groups,
        activities,
        sections: sections.sections,
    };

    carry_over_photos(prev, &mut state, &sections.touched);
    let known_finding_ids: HashSet<&str> = prev.all_findings().map(|(_, f)| f.id.as_str()).collect();
    let binding = resolve_photo(
        &mut state,
        &PhotoScope {
            image: turn.image.as_ref(),
            transcript: &turn.transcript,
            batch,
            touched: &sections.touched,
            known_finding_ids: &known_finding_ids,
        },
    );

    info!(
        "Turn applied - turn={}, workplaces={}, assets={}, worker_groups={}, activities={}, findings={}",
        turn.seq,
        state.workplaces.len(),
        state.assets.len(),
        state.worker_groups.len(),
        state.activities.len(),
        state.finding_count()
    );
    debug!("Photo binding - turn={}, binding={:?}", turn.seq, binding);

    Ok(AppliedTurn {
        state,
        binding,
        reply: batch.reply.clone(),
    })
}

impl ReportState {
    pub fn has_data(&self) -> bool {
        !(self.workplaces.is_empty()
            && self.assets.is_empty()
            && self.worker_groups.is_empty()
            && self.activities.is_empty()
            && self.sections.is_empty())
    }

    pub fn resolve_workplace(&self, name: &str) -> Option<&Workplace> {
        self.workplaces.iter().find(|w| w.key() == name)
    }

    pub fn resolve_asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.key() == name)
    }

    pub fn resolve_worker_group(&self, name: &str) -> Option<&WorkerGroup> {
        self.worker_groups.iter().find(|g| g.key() == name)
    }

    pub fn all_findings(&self) -> impl Iterator<Item = (&Section, &Finding)> {
        self.sections
            .iter()
            .flat_map(|s| s.findings.iter().map(move |f| (s, f)))
    }

    pub fn finding_count(&self) -> usize {
        self.sections.iter().map(|s| s.findings.len()).sum()
    }

    /// Non-conformities grouped by the workplace name their activity refers
    /// to, in order of first appearance.
    pub fn non_conformities_by_workplace(&self) -> Vec<(&str, Vec<&NonConformity>)> {
        let mut groups: Vec<(&str, Vec<&NonConformity>)> = Vec::new();
        for a in &self.activities {
            for nc in &a.non_conformities {
                match groups.iter().position(|(w, _)| *w == a.workplace) {
                    Some(i) => groups[i].1.push(nc),
                    None => groups.push((a.workplace.as_str(), vec![nc])),
                }
            }
        }
        groups
    }

    /// Manual photo added from the workplace card. Appends, never replaces.
    pub fn add_workplace_photo(&mut self, location_name: &str, image: ImageRef) -> Result<usize, TurnError> {
        let wp = self
            .workplaces
            .iter_mut()
            .find(|w| w.location_name == location_name)
            .ok_or_else(|| TurnError::UnknownWorkplace(location_name.to_string()))?;
        wp.photos.push(image);
        Ok(wp.photos.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::parse_extraction;
    use crate::api_types::ExtractionSchema;

    fn turn(seq: u64, image: Option<&str>) -> TurnInput {
        TurnInput {
            seq,
            transcript: String::new(),
            image: image.map(|s| ImageRef(s.to_string())),
        }
    }

    fn flat(body: &str) -> ExtractionBatch {
        parse_extraction(ExtractionSchema::Flat, body).unwrap()
    }

    fn conversational(body: &str) -> ExtractionBatch {
        parse_extraction(ExtractionSchema::Conversational, body).unwrap()
    }

    const SCAVO: &str = r#"{
        "workplaces": [{"locationName": "Area A"}],
        "activities": [{"name": "Scavo manuale", "workplace": "Area A", "assets": [], "workerGroups": ["Manovali"],
            "nonConformities": [{"description": "Bordo scavo non protetto", "riskLevel": "Medio"}]}]
    }"#;

    #[test]
    fn same_activity_twice_gives_two_records() {
        let s0 = ReportState::default();
        let s1 = apply_turn(&s0, &flat(SCAVO), &turn(1, None)).unwrap().state;
        let s2 = apply_turn(&s1, &flat(SCAVO), &turn(2, None)).unwrap().state;

        assert_eq!(s2.workplaces.len(), 1);
        assert_eq!(s2.activities.len(), 2);
        assert_eq!(s2.activities[0].name, "Scavo manuale");
        assert_eq!(s2.activities[1].name, "Scavo manuale");
        assert_ne!(s2.activities[0].record_id, s2.activities[1].record_id);
        assert_eq!((s2.activities[0].turn, s2.activities[1].turn), (1, 2));
    }

    #[test]
    fn photo_lands_on_finding_with_analysis() {
        let body = r#"{"conversationalResponse": "Registrato.", "report": [{"title": "Quadro elettrico", "findings": [{
            "id": "f1", "description": "Cavo a vista", "hazard": "Contatto elettrico", "riskLevel": 9,
            "regulation": "D.Lgs. 81/08, Titolo III", "recommendation": "Isolare il cavo",
            "photo": {"analysis": "cavo scoperto"}}]}]}"#;
        let out = apply_turn(&ReportState::default(), &conversational(body), &turn(1, Some("data:image/jpeg;base64,QUJD")))
            .unwrap();

        let f = &out.state.sections[0].findings[0];
        assert_eq!(f.hazard, "Contatto elettrico");
        assert_eq!(
            f.photo.as_ref().unwrap().image_ref,
            Some(ImageRef("data:image/jpeg;base64,QUJD".into()))
        );
        assert_eq!(out.reply.as_deref(), Some("Registrato."));
    }

    #[test]
    fn attached_photo_survives_later_turns() {
        let first = r#"{"conversationalResponse": "", "report": [{"title": "S", "findings": [{
            "id": "1", "description": "d", "hazard": "h", "riskLevel": 4, "regulation": "r", "recommendation": "x",
            "photo": {"analysis": "a"}}]}]}"#;
        let second = r#"{"conversationalResponse": "", "report": [{"title": "S", "findings": [{
            "id": "2", "description": "d", "hazard": "h", "riskLevel": 4, "regulation": "r", "recommendation": "x",
            "photo": {"analysis": "b"}}]}]}"#;
        let s1 = apply_turn(&ReportState::default(), &conversational(first), &turn(1, Some("one")))
            .unwrap()
            .state;
        let s2 = apply_turn(&s1, &conversational(second), &turn(2, Some("two"))).unwrap().state;
        let s3 = apply_turn(&s2, &conversational(second), &turn(3, None)).unwrap().state;

        let refs: Vec<_> = s3
            .all_findings()
            .map(|(_, f)| f.photo.as_ref().and_then(|p| p.image_ref.as_ref()).map(|r| r.as_str()))
            .collect();
        assert_eq!(refs, vec![Some("one"), Some("two"), Some("two")]);
    }

    #[test]
    fn resent_snapshot_does_not_steal_the_new_photo() {
        let cable = r#"{"id": "1", "description": "Cavo a vista", "hazard": "Contatto elettrico", "riskLevel": 8,
            "regulation": "D.Lgs. 81/08", "recommendation": "Isolare", "photo": {"analysis": "cavo scoperto"}}"#;
        let extinguisher = r#"{"id": "2", "description": "Estintore scarico", "hazard": "Incendio", "riskLevel": 6,
            "regulation": "DM 03/09/2021", "recommendation": "Ricaricare", "photo": {"analysis": "manometro a zero"}}"#;
        let first = format!(r#"{{"conversationalResponse": "", "report": [{{"title": "Cabina", "findings": [{cable}]}}]}}"#);
        let second = format!(
            r#"{{"conversationalResponse": "", "report": [{{"title": "Cabina", "findings": [{cable}, {extinguisher}]}}]}}"#
        );

        let s1 = apply_turn(&ReportState::default(), &conversational(&first), &turn(1, Some("one")))
            .unwrap()
            .state;
        let out = apply_turn(&s1, &conversational(&second), &turn(2, Some("two"))).unwrap();

        assert_eq!(
            out.binding,
            PhotoBinding::Finding { section: "Cabina".into(), finding_id: "2".into() }
        );
        let photos: Vec<_> = out
            .state
            .all_findings()
            .map(|(_, f)| (f.id.as_str(), f.photo.as_ref().and_then(|p| p.image_ref.as_ref()).map(|r| r.as_str())))
            .collect();
        assert_eq!(photos, vec![("1", Some("one")), ("1", Some("one")), ("2", Some("two"))]);
    }

    #[test]
    fn invalid_batch_leaves_prev_untouched() {
        let s1 = apply_turn(&ReportState::default(), &flat(SCAVO), &turn(1, None)).unwrap().state;
        let snapshot = s1.clone();
        let mut bad = flat(SCAVO);
        bad.activities[0].name = String::new();

        let err = apply_turn(&s1, &bad, &turn(2, Some("img"))).unwrap_err();
        assert!(matches!(err, TurnError::MalformedExtraction(_)));
        assert_eq!(s1, snapshot);
    }

    #[test]
    fn dangling_references_are_kept_verbatim() {
        let body = r#"{"activities": [{"name": "Taglio", "workplace": "Capannone 3", "assets": ["Sega circolare"],
            "workerGroups": ["Falegnami"], "nonConformities": []}]}"#;
        let s = apply_turn(&ReportState::default(), &flat(body), &turn(1, None)).unwrap().state;
        assert_eq!(s.activities[0].workplace, "Capannone 3");
        assert!(s.resolve_workplace("Capannone 3").is_none());
        assert!(s.resolve_asset("Sega circolare").is_none());
    }

    #[test]
    fn improvement_plan_groups_by_first_appearance() {
        let body = r#"{"activities": [
            {"name": "a", "workplace": "B", "assets": [], "workerGroups": [], "nonConformities": [{"description": "1", "riskLevel": "Basso"}]},
            {"name": "b", "workplace": "A", "assets": [], "workerGroups": [], "nonConformities": [{"description": "2", "riskLevel": "Alto"}]},
            {"name": "c", "workplace": "B", "assets": [], "workerGroups": [], "nonConformities": [{"description": "3", "riskLevel": "Medio"}]}
        ]}"#;
        let s = apply_turn(&ReportState::default(), &flat(body), &turn(1, None)).unwrap().state;
        let groups = s.non_conformities_by_workplace();
        let shape: Vec<(&str, usize)> = groups.iter().map(|(w, l)| (*w, l.len())).collect();
        assert_eq!(shape, vec![("B", 2), ("A", 1)]);
    }

    #[test]
    fn manual_workplace_photo_requires_known_workplace() {
        let mut s = apply_turn(&ReportState::default(), &flat(SCAVO), &turn(1, None)).unwrap().state;
        assert_eq!(s.add_workplace_photo("Area A", ImageRef("p1".into())), Ok(1));
        assert_eq!(s.add_workplace_photo("Area A", ImageRef("p2".into())), Ok(2));
        assert_eq!(
            s.add_workplace_photo("Area Z", ImageRef("p3".into())),
            Err(TurnError::UnknownWorkplace("Area Z".into()))
        );
    }
}
