//! Core data types for the Ariadne onboarding system
//!
//! This module defines the fundamental data structures used throughout ariadne:
//! repositories, analysis artifacts, architecture maps, progress events, and
//! the skill-scoring shapes derived from them.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current timestamp as an ISO-8601 string (`2024-01-01T00:00:00.000Z`).
///
/// All timestamps in the system use this format; chronological ordering is
/// lexicographic ordering on these strings.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Analysis lifecycle status for a repository
///
/// `failed` and `completed` are both re-enterable: a new explicit trigger
/// moves either back to `analyzing`. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Kind of analysis artifact produced by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    Architecture,
    Conventions,
    Walkthrough,
    EnvSetup,
}

impl AnalysisKind {
    /// Stable string form used in storage keys and sort-key prefixes
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Architecture => "architecture",
            AnalysisKind::Conventions => "conventions",
            AnalysisKind::Walkthrough => "walkthrough",
            AnalysisKind::EnvSetup => "env-setup",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Repository record
///
/// Created on first ingestion; the status fields are mutated only by the
/// analysis orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    /// Repository identifier in "owner/name" form
    pub repo_id: String,

    /// Owning user id ("system" when unknown)
    pub user_id: String,

    /// Default branch name
    #[serde(default = "default_branch")]
    pub default_branch: String,

    pub analysis_status: AnalysisStatus,

    /// Timestamp of the last successful analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analyzed_at: Option<String>,

    /// Number of files in the most recently analyzed snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<usize>,

    /// Tech-stack summary extracted from the architecture analysis
    #[serde(default)]
    pub tech_stack: HashMap<String, String>,
}

fn default_branch() -> String {
    "main".to_string()
}

/// One source file from an ingested code index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFile {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub size: usize,
}

/// A node in the architecture map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Node category: module, service, config, entry, util
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// A directed edge between two architecture nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
}

/// Architecture map: the primary analysis artifact
///
/// Node ids are unique; edges should reference existing node ids, but
/// dangling references are tolerated (logged by consumers, never rejected).
/// Every field defaults so that partially malformed provider output still
/// deserializes into a usable structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureMap {
    #[serde(default)]
    pub nodes: Vec<ArchNode>,
    #[serde(default)]
    pub edges: Vec<ArchEdge>,
    #[serde(default)]
    pub tech_stack: HashMap<String, String>,
    #[serde(default)]
    pub summary: String,
}

impl ArchitectureMap {
    /// Degraded-but-valid stand-in used when provider output fails to parse
    pub fn degraded() -> Self {
        Self {
            summary: "Analysis unavailable.".to_string(),
            ..Self::default()
        }
    }

    /// Count edges referencing node ids absent from the node list.
    ///
    /// Dangling edges are tolerated; callers log a warning when this is
    /// non-zero.
    pub fn dangling_edge_count(&self) -> usize {
        let ids: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .count()
    }
}

/// A detected coding convention (secondary analysis artifact)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Convention {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dont_example: Option<String>,
}

/// One step of a generated walkthrough
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkthroughStep {
    #[serde(default)]
    pub step_number: u32,
    #[serde(default)]
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

/// A pre-generated guided walkthrough (secondary analysis artifact)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Walkthrough {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub steps: Vec<WalkthroughStep>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub related_modules: Vec<String>,
    /// Stamped after generation
    #[serde(default)]
    pub repo_id: String,
    #[serde(default)]
    pub generated_at: String,
}

/// One step of an environment setup guide
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStep {
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_command: Option<String>,
}

/// A detected conflict between setup sources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupConflict {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub resolution: String,
}

/// Environment setup guide (secondary analysis artifact)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSetupGuide {
    #[serde(default)]
    pub setup_steps: Vec<SetupStep>,
    #[serde(default)]
    pub conflicts: Vec<SetupConflict>,
    #[serde(default)]
    pub missing_pieces: Vec<String>,
}

/// Skill/coverage bucket used for both architecture nodes and events
///
/// The 8 standard areas are always present in any computed score set;
/// `other` absorbs unclassifiable labels and is excluded from scoring
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillArea {
    Architecture,
    Api,
    Auth,
    Database,
    Frontend,
    Infrastructure,
    Testing,
    Devops,
    Other,
}

/// The 8 standard areas, in scoring output order
pub const STANDARD_AREAS: [SkillArea; 8] = [
    SkillArea::Architecture,
    SkillArea::Api,
    SkillArea::Auth,
    SkillArea::Database,
    SkillArea::Frontend,
    SkillArea::Infrastructure,
    SkillArea::Testing,
    SkillArea::Devops,
];

impl SkillArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillArea::Architecture => "architecture",
            SkillArea::Api => "api",
            SkillArea::Auth => "auth",
            SkillArea::Database => "database",
            SkillArea::Frontend => "frontend",
            SkillArea::Infrastructure => "infrastructure",
            SkillArea::Testing => "testing",
            SkillArea::Devops => "devops",
            SkillArea::Other => "other",
        }
    }
}

impl std::fmt::Display for SkillArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recognized developer interaction kinds
///
/// The set is closed: the HTTP surface rejects anything else at
/// deserialization time, so no default weight for unknown kinds exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    WalkthroughViewed,
    QaAsked,
    ModuleExplored,
    ConventionViewed,
    EnvSetupViewed,
    AnimatedViewed,
}

impl ProgressEventKind {
    /// Scoring weight contributed by the first occurrence of each
    /// deduplication key
    pub fn weight(&self) -> u32 {
        match self {
            ProgressEventKind::WalkthroughViewed => 15,
            ProgressEventKind::QaAsked => 10,
            ProgressEventKind::ModuleExplored => 20,
            ProgressEventKind::ConventionViewed => 8,
            ProgressEventKind::EnvSetupViewed => 12,
            ProgressEventKind::AnimatedViewed => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressEventKind::WalkthroughViewed => "walkthrough_viewed",
            ProgressEventKind::QaAsked => "qa_asked",
            ProgressEventKind::ModuleExplored => "module_explored",
            ProgressEventKind::ConventionViewed => "convention_viewed",
            ProgressEventKind::EnvSetupViewed => "env_setup_viewed",
            ProgressEventKind::AnimatedViewed => "animated_viewed",
        }
    }

    /// Human-readable form used in timeline descriptions
    pub fn human_label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// One recorded developer interaction
///
/// Append-only; never mutated after recording. Events expire after a fixed
/// 90-day retention window at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub id: String,
    pub user_id: String,
    pub repo_id: String,
    pub event_type: ProgressEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<SkillArea>,
    /// ISO-8601; used for ordering
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Per-area score for one developer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScore {
    pub area: SkillArea,
    /// Integer in [0, 100]
    pub score: u32,
    pub modules_explored: usize,
    pub total_modules: usize,
    /// Empty string when the area has no events
    pub last_activity: String,
}

/// One point on a developer's reconstructed progress timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub timestamp: String,
    pub overall_score: u32,
    pub event_description: String,
}

/// Complete progress picture for one developer on one repo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperProgress {
    pub user_id: String,
    pub repo_id: String,
    /// Rounded mean of the 8 standard area scores
    pub overall_score: u32,
    pub skills: Vec<SkillScore>,
    pub total_time_spent_ms: u64,
    pub walkthroughs_completed: usize,
    pub questions_asked: usize,
    pub modules_explored: usize,
    pub conventions_viewed: usize,
    pub first_activity: String,
    pub last_activity: String,
    pub timeline: Vec<ProgressSnapshot>,
}

/// Team-wide progress roll-up for a repo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProgress {
    pub repo_id: String,
    pub members: Vec<DeveloperProgress>,
    pub average_score: u32,
    pub average_time_to_onboard: u64,
    pub top_areas: Vec<SkillScore>,
    pub weak_areas: Vec<SkillScore>,
}

/// One row of the ranked leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub overall_score: u32,
    pub total_time_spent_ms: u64,
    pub walkthroughs_completed: usize,
    pub questions_asked: usize,
    pub modules_explored: usize,
    /// "none" when the member has no skills at all
    pub strongest_area: String,
}
