use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which response shape the configured extraction endpoint emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSchema {
    #[default]
    Flat,           // {workplaces, assets, workerGroups, activities}
    Conversational, // {conversationalResponse, report: [{title, findings}]}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiExtractionRequest {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ApiImagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImagePayload {
    pub mime_type: String,   // "image/jpeg"
    pub base64_data: String, // no data: prefix
}

/* Flat, activities-based variant */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFlatExtraction {
    #[serde(default)]
    pub workplaces: Vec<ApiWorkplace>,
    #[serde(default)]
    pub assets: Vec<ApiAsset>,
    #[serde(default)]
    pub worker_groups: Vec<ApiWorkerGroup>,
    #[serde(default)]
    pub activities: Vec<ApiActivity>,
    #[serde(default)]
    pub photo_target: Option<ApiPhotoTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWorkplace {
    pub location_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ApiAssetType {
    #[serde(rename = "Macchinario", alias = "Machinery")]
    Macchinario,
    #[serde(rename = "Impianto", alias = "Plant")]
    Impianto,
    #[serde(rename = "Attrezzatura", alias = "Equipment")]
    Attrezzatura,
    #[serde(rename = "Sostanza", alias = "Substance")]
    Sostanza,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAsset {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: ApiAssetType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiWorkerGroup {
    pub name: String,
    pub tasks: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiActivity {
    pub name: String,
    pub workplace: String,
    pub assets: Vec<String>,
    pub worker_groups: Vec<String>,
    pub non_conformities: Vec<ApiNonConformity>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ApiRiskLevel {
    #[serde(rename = "Basso", alias = "Low")]
    Basso,
    #[serde(rename = "Medio", alias = "Medium")]
    Medio,
    #[serde(rename = "Alto", alias = "High")]
    Alto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNonConformity {
    pub description: String,
    pub risk_level: ApiRiskLevel,
    #[serde(default)]
    pub violated_norm: Option<String>,
}

/* Conversational, section-based variant */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConversationalExtraction {
    pub conversational_response: String,
    pub report: Vec<ApiReportSection>,
    #[serde(default)]
    pub photo_target: Option<ApiPhotoTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReportSection {
    pub title: String,
    pub findings: Vec<ApiFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFinding {
    pub id: String,
    pub description: String,
    pub hazard: String,
    pub risk_level: i64, // range-checked by the adapter
    pub regulation: String,
    pub recommendation: String,
    #[serde(default)]
    pub photo: Option<ApiFindingPhoto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFindingPhoto {
    #[serde(default)]
    pub analysis: Option<String>,
}

/* Optional echo of which entity the turn image depicts */

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiPhotoTargetKind {
    Finding,
    Workplace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPhotoTarget {
    pub kind: ApiPhotoTargetKind,
    #[serde(rename = "ref")]
    pub reference: String,
}
