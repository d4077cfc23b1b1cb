use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::merge::TouchedSection;
use crate::models::{ExtractionBatch, FindingPhoto, ImageRef, PhotoTarget, ReportState};

/// Where the turn image ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhotoBinding {
    NoImage,
    Finding { section: String, finding_id: String },
    Workplace { location_name: String },
    Unbound,
}

/// What the resolver needs to know about the turn that just merged.
pub struct PhotoScope<'a> {
    pub image: Option<&'a ImageRef>,
    pub transcript: &'a str,
    pub batch: &'a ExtractionBatch,
    pub touched: &'a [TouchedSection],
    /// Finding ids already in the report before this turn.
    pub known_finding_ids: &'a HashSet<&'a str>,
}

/// Binds the turn image to exactly one target, or to nothing.
///
/// An explicit target echoed by the extraction wins. Otherwise the newest
/// finding of this turn that carries an analysis but no image gets it, and
/// failing that the workplace the turn talked about. Findings carried over
/// from earlier turns are never candidates, and neither are re-sent records
/// of a finding id the report already knew.
pub fn resolve_photo(state: &mut ReportState, scope: &PhotoScope<'_>) -> PhotoBinding {
    let Some(image) = scope.image else {
        return PhotoBinding::NoImage;
    };

    if let Some(target) = &scope.batch.photo_target {
        if let Some(binding) = bind_explicit(state, scope, target, image) {
            debug!("Photo bound to explicit target - {:?}", binding);
            return binding;
        }
        warn!("Photo target did not resolve, falling back to positional match - target={:?}", target);
    }

    if let Some(binding) = bind_latest_finding(state, scope, image) {
        debug!("Photo bound to latest finding - {:?}", binding);
        return binding;
    }

    if let Some(name) = mentioned_workplace(state, scope) {
        if let Some(wp) = state.workplaces.iter_mut().find(|w| w.location_name == name) {
            wp.photos.push(image.clone());
            debug!("Photo appended to workplace - name={}, photos={}", name, wp.photos.len());
            return PhotoBinding::Workplace { location_name: name };
        }
    }

    warn!("Turn image has no eligible finding or workplace; left unbound");
    PhotoBinding::Unbound
}

fn bind_explicit(
    state: &mut ReportState,
    scope: &PhotoScope<'_>,
    target: &PhotoTarget,
    image: &ImageRef,
) -> Option<PhotoBinding> {
    match target {
        PhotoTarget::Finding(id) => {
            for t in scope.touched.iter().rev() {
                let section = state.sections.get_mut(t.index)?;
                let title = section.title.clone();
                let hit = section.findings[t.first_new..]
                    .iter_mut()
                    .rev()
                    .find(|f| &f.id == id && !f.has_image());
                if let Some(finding) = hit {
                    let analysis = finding
                        .photo
                        .take()
                        .map(|p| p.analysis)
                        .unwrap_or_default();
                    finding.photo = Some(FindingPhoto {
                        image_ref: Some(image.clone()),
                        analysis,
                    });
                    return Some(PhotoBinding::Finding {
                        section: title,
                        finding_id: id.clone(),
                    });
                }
            }
            None
        }
        PhotoTarget::Workplace(name) => {
            let wp = state.workplaces.iter_mut().find(|w| &w.location_name == name)?;
            wp.photos.push(image.clone());
            Some(PhotoBinding::Workplace {
                location_name: name.clone(),
            })
        }
    }
}

fn bind_latest_finding(
    state: &mut ReportState,
    scope: &PhotoScope<'_>,
    image: &ImageRef,
) -> Option<PhotoBinding> {
    for t in scope.touched.iter().rev() {
        let Some(section) = state.sections.get_mut(t.index) else {
            continue;
        };
        let title = section.title.clone();
        let hit = section.findings[t.first_new..]
            .iter_mut()
            .rev()
            .find(|f| f.awaits_photo() && !scope.known_finding_ids.contains(f.id.as_str()));
        if let Some(finding) = hit {
            if let Some(photo) = finding.photo.as_mut() {
                photo.image_ref = Some(image.clone());
            }
            return Some(PhotoBinding::Finding {
                section: title,
                finding_id: finding.id.clone(),
            });
        }
    }
    None
}

/// Gives a re-sent finding the image of the latest earlier record with the
/// same id. Only this turn's records are written. Returns how many were filled.
pub fn carry_over_photos(prev: &ReportState, state: &mut ReportState, touched: &[TouchedSection]) -> usize {
    let mut carried = 0;
    for t in touched {
        let Some(section) = state.sections.get_mut(t.index) else {
            continue;
        };
        for finding in section.findings[t.first_new..].iter_mut().filter(|f| !f.has_image()) {
            let earlier = prev
                .all_findings()
                .map(|(_, f)| f)
                .filter(|e| e.id == finding.id && e.has_image())
                .last()
                .and_then(|e| e.photo.clone());
            let Some(FindingPhoto { image_ref, analysis }) = earlier else {
                continue;
            };
            let analysis = match finding.photo.take() {
                Some(p) if !p.analysis.trim().is_empty() => p.analysis,
                _ => analysis,
            };
            finding.photo = Some(FindingPhoto { image_ref, analysis });
            carried += 1;
        }
    }
    if carried > 0 {
        debug!("Photos carried over to re-sent findings - count={}", carried);
    }
    carried
}

// whole-word occurrence: no alphanumeric character touches either end
fn mentions(text: &str, name: &str) -> bool {
    text.match_indices(name).any(|(i, m)| {
        let before = text[..i].chars().next_back();
        let after = text[i + m.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Most specific workplace reference of the turn that exists in the report.
fn mentioned_workplace(state: &ReportState, scope: &PhotoScope<'_>) -> Option<String> {
    let exists = |name: &str| state.workplaces.iter().any(|w| w.location_name == name);

    if let Some(a) = scope.batch.activities.iter().rev().find(|a| exists(&a.workplace)) {
        return Some(a.workplace.clone());
    }
    if let Some(w) = scope.batch.workplaces.iter().rev().find(|w| exists(&w.location_name)) {
        return Some(w.location_name.clone());
    }

    let transcript: String = scope.transcript.nfc().collect();
    state
        .workplaces
        .iter()
        .rev()
        .find(|w| {
            let name: String = w.location_name.nfc().collect();
            !name.is_empty() && mentions(&transcript, &name)
        })
        .map(|w| w.location_name.clone())
}
