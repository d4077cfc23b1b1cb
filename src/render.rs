// src/render.rs
use chrono::DateTime;
use chrono_tz::Tz;
use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::models::{ReportState, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
}

pub fn render(report: &ReportState, format: ExportFormat, now: DateTime<Tz>) -> String {
    match format {
        ExportFormat::Markdown => render_markdown(report),
        ExportFormat::Text => render_plain_text(report, now),
    }
}

fn refs_or_dash(mut names: impl Iterator<Item = String>) -> String {
    let joined = names.join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

// dangling references stay visible as free text
fn mark_unresolved(name: &str, known: bool) -> String {
    if known {
        name.to_string()
    } else {
        format!("{} (non censito)", name)
    }
}

pub fn render_markdown(r: &ReportState) -> String {
    let mut md = String::new();
    md.push_str("# Report Sopralluogo DVR\n\n");

    md.push_str("## 1. Luoghi di Lavoro\n");
    if r.workplaces.is_empty() {
        md.push_str("Nessuno\n");
    }
    for wp in &r.workplaces {
        if wp.photos.is_empty() {
            md.push_str(&format!("- {}\n", wp.location_name));
        } else {
            md.push_str(&format!("- {} ({} foto)\n", wp.location_name, wp.photos.len()));
        }
    }

    md.push_str("\n## 2. Macchinari, Impianti, Attrezzature, Sostanze\n");
    if r.assets.is_empty() {
        md.push_str("Nessuno\n");
    }
    for a in &r.assets {
        match &a.notes {
            Some(n) => md.push_str(&format!("- {} ({}) - {}\n", a.name, a.category.label(), n)),
            None => md.push_str(&format!("- {} ({})\n", a.name, a.category.label())),
        }
    }

    md.push_str("\n## 3. Gruppi Omogenei di Lavoratori\n");
    if r.worker_groups.is_empty() {
        md.push_str("Nessuno\n");
    }
    for g in &r.worker_groups {
        md.push_str(&format!("- {} (Mansioni: {})\n", g.name, g.tasks));
    }

    md.push_str("\n## 4. Attività e Analisi Rischi\n");
    if r.activities.is_empty() {
        md.push_str("Nessuna\n");
    }
    for act in &r.activities {
        md.push_str(&format!("### Attività: {}\n", act.name));
        md.push_str(&format!(
            "- **Luogo:** {}\n",
            mark_unresolved(&act.workplace, r.resolve_workplace(&act.workplace).is_some())
        ));
        md.push_str(&format!(
            "- **Lavoratori:** {}\n",
            refs_or_dash(
                act.worker_group_refs
                    .iter()
                    .map(|g| mark_unresolved(g, r.resolve_worker_group(g).is_some()))
            )
        ));
        md.push_str(&format!(
            "- **Attrezzature:** {}\n",
            refs_or_dash(
                act.asset_refs
                    .iter()
                    .map(|a| mark_unresolved(a, r.resolve_asset(a).is_some()))
            )
        ));
        md.push_str("**Non Conformità Rilevate:**\n");
        if act.non_conformities.is_empty() {
            md.push_str("  - Nessuna\n");
        }
        for nc in &act.non_conformities {
            md.push_str(&format!("  - **Descrizione:** {}\n", nc.description));
            md.push_str(&format!("    - **Livello Rischio:** {}\n", nc.risk_level.label()));
            if let Some(norm) = &nc.violated_norm {
                md.push_str(&format!("    - **Norma Violata:** {}\n", norm));
            }
        }
        md.push('\n');
    }

    if !r.sections.is_empty() {
        md.push_str("\n## 5. Rilievi per Sezione\n");
        for s in &r.sections {
            md.push_str(&format!("### {}\n", s.title));
            if s.findings.is_empty() {
                md.push_str("Nessun rilievo per questa sezione.\n");
            }
            for f in &s.findings {
                md.push_str(&format!("- **{}** (Rischio: {}/10) - {}\n", f.hazard, f.risk_level, f.description));
                md.push_str(&format!("  - Normativa: {}\n", f.regulation));
                md.push_str(&format!("  - Raccomandazione: {}\n", f.recommendation));
                if let Some(p) = &f.photo {
                    let attached = if p.image_ref.is_some() { "foto allegata" } else { "foto non allegata" };
                    if !p.analysis.trim().is_empty() {
                        md.push_str(&format!("  - Analisi Foto: {} ({})\n", p.analysis, attached));
                    } else if p.image_ref.is_some() {
                        md.push_str("  - Foto allegata\n");
                    }
                }
            }
            md.push('\n');
        }
    }

    md.push_str("\n---\n\n## Piano di Miglioramento\n");
    let plan = r.non_conformities_by_workplace();
    if plan.is_empty() {
        md.push_str("Nessuna non conformità rilevata.\n");
    }
    for (workplace, ncs) in plan {
        md.push_str(&format!("### Luogo: {}\n", workplace));
        for nc in ncs {
            md.push_str(&format!(
                "- [ ] **[{}]** {} (Rif: {})\n",
                nc.risk_level.label(),
                nc.description,
                nc.violated_norm.as_deref().unwrap_or("N/A")
            ));
        }
    }

    md
}

/// Colour band the report view uses for a 1..=10 risk score.
pub fn risk_band(level: u8) -> RiskLevel {
    match level {
        8..=u8::MAX => RiskLevel::High,
        5..=7 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

pub fn render_plain_text(r: &ReportState, now: DateTime<Tz>) -> String {
    let rule = "========================================";
    let thin = "----------------------------------------";
    let mut out = format!(
        "Documento di Valutazione del Rischio - {}\n\n",
        now.format("%d/%m/%Y, %H:%M:%S")
    );

    for s in &r.sections {
        out.push_str(&format!("{rule}\nSEZIONE: {}\n{rule}\n\n", s.title.to_uppercase()));
        if s.findings.is_empty() {
            out.push_str("Nessun rilievo in questa sezione.\n\n");
        }
        for (i, f) in s.findings.iter().enumerate() {
            out.push_str(&format!("RILIEVO #{}\n{thin}\n", i + 1));
            out.push_str(&format!("Descrizione: {}\n", f.description));
            out.push_str(&format!("Pericolo Identificato: {}\n", f.hazard));
            out.push_str(&format!(
                "Livello di Rischio: {}/10 ({})\n",
                f.risk_level,
                risk_band(f.risk_level).label()
            ));
            out.push_str(&format!("Normativa di Riferimento: {}\n", f.regulation));
            out.push_str(&format!("Azione Correttiva Raccomandata: {}\n", f.recommendation));
            if let Some(p) = f.photo.as_ref().filter(|p| !p.analysis.trim().is_empty()) {
                out.push_str(&format!("Analisi Foto: {}\n", p.analysis));
            }
            out.push('\n');
        }
    }

    for act in &r.activities {
        out.push_str(&format!("{rule}\nATTIVITÀ: {}\n{rule}\n\n", act.name.to_uppercase()));
        out.push_str(&format!("Luogo: {}\n", act.workplace));
        out.push_str(&format!("Lavoratori: {}\n", refs_or_dash(act.worker_group_refs.iter().cloned())));
        out.push_str(&format!("Attrezzature: {}\n", refs_or_dash(act.asset_refs.iter().cloned())));
        for (i, nc) in act.non_conformities.iter().enumerate() {
            out.push_str(&format!(
                "NON CONFORMITÀ #{} [{}]: {}\n",
                i + 1,
                nc.risk_level.label().to_uppercase(),
                nc.description
            ));
            if let Some(norm) = &nc.violated_norm {
                out.push_str(&format!("  Norma Violata: {}\n", norm));
            }
        }
        out.push('\n');
    }

    if !r.has_data() {
        out.push_str("Il report è vuoto.\n");
    }
    out
}
