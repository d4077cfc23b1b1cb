use serde::{Deserialize, Serialize};

/// Anything deduplicated by an exact, case-sensitive identity key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Opaque image reference, in practice a `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workplace {
    pub location_name: String,
    pub photos: Vec<ImageRef>,
}

impl Workplace {
    pub fn new(location_name: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
            photos: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetCategory {
    Machinery,
    Plant,
    Equipment,
    Substance,
}

impl AssetCategory {
    pub fn label(self) -> &'static str {
        match self {
            AssetCategory::Machinery => "Macchinario",
            AssetCategory::Plant => "Impianto",
            AssetCategory::Equipment => "Attrezzatura",
            AssetCategory::Substance => "Sostanza",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub category: AssetCategory,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerGroup {
    pub name: String,
    pub tasks: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Basso",
            RiskLevel::Medium => "Medio",
            RiskLevel::High => "Alto",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonConformity {
    pub description: String,
    pub risk_level: RiskLevel,
    pub violated_norm: Option<String>,
}

/// One point-in-time observation. Never coalesced with another record, even
/// when the name repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub record_id: String, // xxh3 of turn|position|name
    pub turn: u64,
    pub name: String,
    pub workplace: String,              // name reference, may dangle
    pub asset_refs: Vec<String>,        // ordered set of asset names
    pub worker_group_refs: Vec<String>, // ordered set of worker group names
    pub non_conformities: Vec<NonConformity>,
}

/// Activity as extracted for a single turn, before the engine stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedActivity {
    pub name: String,
    pub workplace: String,
    pub asset_refs: Vec<String>,
    pub worker_group_refs: Vec<String>,
    pub non_conformities: Vec<NonConformity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingPhoto {
    pub image_ref: Option<ImageRef>,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub description: String,
    pub hazard: String,
    pub risk_level: u8, // 1..=10
    pub regulation: String,
    pub recommendation: String,
    pub photo: Option<FindingPhoto>,
}

impl Finding {
    /// The extraction described photo-relevant content but no image is bound yet.
    pub fn awaits_photo(&self) -> bool {
        matches!(
            &self.photo,
            Some(FindingPhoto { image_ref: None, analysis }) if !analysis.trim().is_empty()
        )
    }

    pub fn has_image(&self) -> bool {
        matches!(&self.photo, Some(FindingPhoto { image_ref: Some(_), .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoTarget {
    Finding(String),
    Workplace(String),
}

/// Normalised result of one extraction call, whatever wire shape it came in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub workplaces: Vec<Workplace>,
    pub assets: Vec<Asset>,
    pub worker_groups: Vec<WorkerGroup>,
    pub activities: Vec<ExtractedActivity>,
    pub sections: Vec<Section>,
    pub photo_target: Option<PhotoTarget>,
    pub reply: Option<String>, // conversational variant only
}

/// Cumulative report for one inspection session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportState {
    pub workplaces: Vec<Workplace>,
    pub assets: Vec<Asset>,
    pub worker_groups: Vec<WorkerGroup>,
    pub activities: Vec<Activity>,
    pub sections: Vec<Section>,
}

impl Keyed for Workplace {
    fn key(&self) -> &str {
        &self.location_name
    }
}

impl Keyed for Asset {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for WorkerGroup {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for Section {
    fn key(&self) -> &str {
        &self.title
    }
}
