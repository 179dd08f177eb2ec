//! Skill area classification
//!
//! Free-text labels (architecture node labels, event target labels) map to
//! coarse skill areas through an ordered keyword table. First match wins;
//! anything unmatched lands in `other`.

use crate::types::{ArchitectureMap, SkillArea};
use std::collections::HashMap;

/// Ordered keyword table. A mapping, not a priority list: the defined
/// vocabulary has no label matching two areas, but first-match-wins keeps
/// classification deterministic regardless.
const AREA_KEYWORDS: &[(&str, SkillArea)] = &[
    ("auth", SkillArea::Auth),
    ("authentication", SkillArea::Auth),
    ("authorization", SkillArea::Auth),
    ("login", SkillArea::Auth),
    ("session", SkillArea::Auth),
    ("jwt", SkillArea::Auth),
    ("oauth", SkillArea::Auth),
    ("api", SkillArea::Api),
    ("route", SkillArea::Api),
    ("routes", SkillArea::Api),
    ("endpoint", SkillArea::Api),
    ("controller", SkillArea::Api),
    ("handler", SkillArea::Api),
    ("middleware", SkillArea::Api),
    ("database", SkillArea::Database),
    ("db", SkillArea::Database),
    ("model", SkillArea::Database),
    ("schema", SkillArea::Database),
    ("migration", SkillArea::Database),
    ("dynamodb", SkillArea::Database),
    ("postgres", SkillArea::Database),
    ("mongo", SkillArea::Database),
    ("redis", SkillArea::Database),
    ("frontend", SkillArea::Frontend),
    ("component", SkillArea::Frontend),
    ("page", SkillArea::Frontend),
    ("view", SkillArea::Frontend),
    ("ui", SkillArea::Frontend),
    ("style", SkillArea::Frontend),
    ("css", SkillArea::Frontend),
    ("react", SkillArea::Frontend),
    ("next", SkillArea::Frontend),
    ("infra", SkillArea::Infrastructure),
    ("infrastructure", SkillArea::Infrastructure),
    ("deploy", SkillArea::Infrastructure),
    ("docker", SkillArea::Infrastructure),
    ("ci", SkillArea::Infrastructure),
    ("cd", SkillArea::Infrastructure),
    ("pipeline", SkillArea::Infrastructure),
    ("aws", SkillArea::Infrastructure),
    ("cloud", SkillArea::Infrastructure),
    ("terraform", SkillArea::Infrastructure),
    ("cdk", SkillArea::Infrastructure),
    ("sam", SkillArea::Infrastructure),
    ("test", SkillArea::Testing),
    ("testing", SkillArea::Testing),
    ("spec", SkillArea::Testing),
    ("jest", SkillArea::Testing),
    ("vitest", SkillArea::Testing),
    ("e2e", SkillArea::Testing),
    ("devops", SkillArea::Devops),
    ("monitoring", SkillArea::Devops),
    ("logging", SkillArea::Devops),
    ("observability", SkillArea::Devops),
];

/// Classify a free-text label into a skill area
pub fn classify_area(label: &str) -> SkillArea {
    let lower = label.to_lowercase();
    for (keyword, area) in AREA_KEYWORDS {
        if lower.contains(keyword) {
            return *area;
        }
    }
    SkillArea::Other
}

/// Group architecture node ids by classified area.
///
/// The per-area id counts are the coverage denominators for scoring.
pub fn areas_from_architecture(map: &ArchitectureMap) -> HashMap<SkillArea, Vec<String>> {
    let mut area_modules: HashMap<SkillArea, Vec<String>> = HashMap::new();
    for node in &map.nodes {
        area_modules
            .entry(classify_area(&node.label))
            .or_default()
            .push(node.id.clone());
    }
    area_modules
}
