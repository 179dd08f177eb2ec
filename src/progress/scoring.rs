//! Skill score computation
//!
//! Pure functions over an event list and an optional architecture map.
//! Scoring is idempotent per interaction: repeats of the same
//! `"{event_type}:{target}"` key contribute nothing beyond the first
//! occurrence. Per-area scores blend module coverage (40%) with capped
//! activity weight (60%).

use super::areas::{areas_from_architecture, classify_area};
use crate::types::{
    now_iso, ArchitectureMap, DeveloperProgress, ProgressEvent, ProgressSnapshot, SkillArea,
    SkillScore, STANDARD_AREAS,
};
use std::collections::{HashMap, HashSet};

/// Compute per-area skill scores for exactly the 8 standard areas.
///
/// Events classified into `other` still deduplicate and accumulate
/// internally but are excluded from the returned set.
pub fn compute_skill_scores(
    events: &[ProgressEvent],
    architecture: Option<&ArchitectureMap>,
) -> Vec<SkillScore> {
    let area_modules = architecture
        .map(areas_from_architecture)
        .unwrap_or_default();

    let mut interactions: HashMap<SkillArea, HashSet<String>> = HashMap::new();
    let mut raw_scores: HashMap<SkillArea, u32> = HashMap::new();
    let mut last_activity: HashMap<SkillArea, String> = HashMap::new();

    for area in STANDARD_AREAS {
        interactions.insert(area, HashSet::new());
        raw_scores.insert(area, 0);
    }

    for event in events {
        let area = event_area(event);
        let key = dedup_key(event);

        let seen = interactions.entry(area).or_default();
        if seen.insert(key) {
            *raw_scores.entry(area).or_insert(0) += event.event_type.weight();
        }

        let ts = &event.timestamp;
        match last_activity.get(&area) {
            Some(current) if current >= ts => {}
            _ => {
                last_activity.insert(area, ts.clone());
            }
        }
    }

    STANDARD_AREAS
        .iter()
        .map(|area| {
            // Denominator floors at 1 without an architecture map so
            // activity-based scoring still dominates
            let total_modules = area_modules.get(area).map(|m| m.len()).unwrap_or(0).max(1);
            let modules_explored = interactions.get(area).map(|s| s.len()).unwrap_or(0);
            let raw = raw_scores.get(area).copied().unwrap_or(0);

            let coverage_score =
                (modules_explored as f64 / total_modules as f64 * 100.0).min(100.0);
            let activity_score = (raw as f64).min(100.0);
            let score = (coverage_score * 0.4 + activity_score * 0.6).round() as u32;

            SkillScore {
                area: *area,
                score: score.min(100),
                modules_explored,
                total_modules,
                last_activity: last_activity.get(area).cloned().unwrap_or_default(),
            }
        })
        .collect()
}

/// Rounded mean of a score set; 0 for an empty set
pub fn overall_score(skills: &[SkillScore]) -> u32 {
    if skills.is_empty() {
        return 0;
    }
    let sum: u32 = skills.iter().map(|s| s.score).sum();
    (sum as f64 / skills.len() as f64).round() as u32
}

/// The event's explicit area if present, else its target label classified
fn event_area(event: &ProgressEvent) -> SkillArea {
    event
        .area
        .unwrap_or_else(|| classify_area(event.target_label.as_deref().unwrap_or("")))
}

/// Deduplication key collapsing repeated identical interactions
fn dedup_key(event: &ProgressEvent) -> String {
    let target = event
        .target_id
        .as_deref()
        .or(event.target_label.as_deref())
        .unwrap_or("");
    format!("{}:{}", event.event_type.as_str(), target)
}

/// Human-readable snapshot description for one event
fn describe(event: &ProgressEvent) -> String {
    match event.target_label.as_deref() {
        Some(label) if !label.is_empty() => {
            format!("{}: {}", event.event_type.human_label(), label)
        }
        _ => event.event_type.human_label(),
    }
}

/// Aggregate one developer's progress from their (chronologically ordered)
/// event list.
///
/// The timeline partitions the list into roughly 10 cumulative prefixes and
/// fully recomputes the score set at each boundary; the final snapshot is
/// always the true last event, so the timeline converges to the same
/// overall score a full recompute yields.
pub fn compute_developer_progress(
    user_id: &str,
    repo_id: &str,
    events: &[ProgressEvent],
    architecture: Option<&ArchitectureMap>,
) -> DeveloperProgress {
    let skills = compute_skill_scores(events, architecture);
    let overall = overall_score(&skills);

    let total_time_spent_ms: u64 = events.iter().filter_map(|e| e.duration_ms).sum();

    let walkthroughs_completed = distinct_targets(events, |e| {
        e.event_type == crate::types::ProgressEventKind::WalkthroughViewed
    });
    let modules_explored = distinct_targets(events, |e| {
        e.event_type == crate::types::ProgressEventKind::ModuleExplored
    });
    let questions_asked = events
        .iter()
        .filter(|e| e.event_type == crate::types::ProgressEventKind::QaAsked)
        .count();
    let conventions_viewed = events
        .iter()
        .filter(|e| e.event_type == crate::types::ProgressEventKind::ConventionViewed)
        .count();

    let first_activity = events
        .first()
        .map(|e| e.timestamp.clone())
        .unwrap_or_else(now_iso);
    let last_activity = events
        .last()
        .map(|e| e.timestamp.clone())
        .unwrap_or_else(now_iso);

    let mut timeline: Vec<ProgressSnapshot> = Vec::new();
    let step = (events.len() / 10).max(1);
    for i in (0..events.len()).step_by(step) {
        let prefix = &events[..=i];
        let prefix_skills = compute_skill_scores(prefix, architecture);
        let latest = &prefix[prefix.len() - 1];
        timeline.push(ProgressSnapshot {
            timestamp: latest.timestamp.clone(),
            overall_score: overall_score(&prefix_skills),
            event_description: describe(latest),
        });
    }
    // The stepped prefixes may stop short of the last event; always close
    // the timeline at the true current score
    if let Some(last) = events.last() {
        if !timeline.iter().any(|s| s.timestamp == last.timestamp) {
            timeline.push(ProgressSnapshot {
                timestamp: last.timestamp.clone(),
                overall_score: overall,
                event_description: describe(last),
            });
        }
    }

    DeveloperProgress {
        user_id: user_id.to_string(),
        repo_id: repo_id.to_string(),
        overall_score: overall,
        skills,
        total_time_spent_ms,
        walkthroughs_completed,
        questions_asked,
        modules_explored,
        conventions_viewed,
        first_activity,
        last_activity,
        timeline,
    }
}

fn distinct_targets<F: Fn(&ProgressEvent) -> bool>(events: &[ProgressEvent], pred: F) -> usize {
    events
        .iter()
        .filter(|e| pred(e))
        .map(|e| e.target_id.as_deref().unwrap_or(""))
        .collect::<HashSet<_>>()
        .len()
}
