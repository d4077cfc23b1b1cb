use std::collections::HashSet;

use crate::models::{Keyed, Section};

/// Folds `incoming` into `existing` by identity key, first write wins.
///
/// `existing` keeps its order; unseen keys from `incoming` are appended in
/// their own order. A key repeated inside `incoming` is dropped exactly as if
/// it had arrived in an earlier batch.
pub fn merge_named<T: Keyed + Clone>(existing: &[T], incoming: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = existing.to_vec();
    let mut seen: HashSet<&str> = existing.iter().map(|e| e.key()).collect();
    for item in incoming {
        if seen.insert(item.key()) {
            merged.push(item.clone());
        }
    }
    merged
}

/// Point-in-time records are never deduplicated.
pub fn append_history<T: Clone>(history: &[T], incoming: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(history.len() + incoming.len());
    out.extend_from_slice(history);
    out.extend_from_slice(incoming);
    out
}

/// Section of the merged report that received findings in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchedSection {
    pub index: usize,     // position in the merged section list
    pub first_new: usize, // findings[first_new..] arrived this turn
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMerge {
    pub sections: Vec<Section>,
    pub touched: Vec<TouchedSection>, // least recently touched first
}

/// Sections are keyed by title like any named entity, but their findings are
/// history: every incoming finding is appended to the surviving section.
pub fn merge_sections(existing: &[Section], incoming: &[Section]) -> SectionMerge {
    let mut sections: Vec<Section> = existing.to_vec();
    let mut touched: Vec<TouchedSection> = Vec::new();

    for inc in incoming {
        let index = match sections.iter().position(|s| s.key() == inc.key()) {
            Some(i) => i,
            None => {
                sections.push(Section {
                    title: inc.title.clone(),
                    findings: Vec::new(),
                });
                sections.len() - 1
            }
        };

        let first_new = match touched.iter().position(|t| t.index == index) {
            Some(pos) => touched.remove(pos).first_new,
            None => sections[index].findings.len(),
        };

        let section = &mut sections[index];
        section.findings = append_history(&section.findings, &inc.findings);
        touched.push(TouchedSection { index, first_new });
    }

    SectionMerge { sections, touched }
}
