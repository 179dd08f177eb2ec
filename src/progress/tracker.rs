//! Progress tracking service
//!
//! Validates and records interaction events, and serves the derived
//! products: developer progress, team roll-ups, and the leaderboard. A
//! failing architecture read degrades to activity-only scoring instead of
//! failing the request.

use super::areas::classify_area;
use super::scoring::compute_developer_progress;
use crate::error::{AriadneError, Result};
use crate::storage::EventStore;
use crate::types::{
    now_iso, ArchitectureMap, DeveloperProgress, LeaderboardEntry, ProgressEvent,
    ProgressEventKind, SkillArea, SkillScore, TeamProgress, STANDARD_AREAS,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Default query limit for event reads
pub const DEFAULT_EVENT_LIMIT: usize = 200;

/// Client request to record one interaction.
///
/// The event kind deserializes through the closed enum, so unrecognized
/// kinds are rejected before this struct ever exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    #[serde(default)]
    pub user_id: String,
    pub event_type: ProgressEventKind,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub target_label: Option<String>,
    #[serde(default)]
    pub area: Option<SkillArea>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Progress tracking service over an injected event store
#[derive(Clone)]
pub struct ProgressTracker {
    events: Arc<dyn EventStore>,
}

impl ProgressTracker {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Validate, stamp, and append one event
    pub async fn record_event(
        &self,
        repo_id: &str,
        request: RecordEventRequest,
    ) -> Result<ProgressEvent> {
        if request.user_id.is_empty() {
            return Err(AriadneError::InvalidEvent("userId is required".to_string()));
        }

        let area = request.area.or_else(|| {
            Some(classify_area(request.target_label.as_deref().unwrap_or("")))
        });

        let event = ProgressEvent {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id,
            repo_id: repo_id.to_string(),
            event_type: request.event_type,
            target_id: request.target_id,
            target_label: request.target_label,
            area,
            timestamp: now_iso(),
            duration_ms: request.duration_ms,
        };

        self.events.append(&event).await?;
        debug!(
            "recorded {} for {} on {}",
            event.event_type.as_str(),
            event.user_id,
            repo_id
        );
        Ok(event)
    }

    /// Raw events for one user, chronological
    pub async fn events_for_user(
        &self,
        repo_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ProgressEvent>> {
        self.events.events_for_user(repo_id, user_id, limit).await
    }

    /// One developer's full progress picture
    pub async fn developer_progress(
        &self,
        repo_id: &str,
        user_id: &str,
        architecture: Option<&ArchitectureMap>,
    ) -> Result<DeveloperProgress> {
        let events = self
            .events
            .events_for_user(repo_id, user_id, DEFAULT_EVENT_LIMIT)
            .await?;
        Ok(compute_developer_progress(
            user_id,
            repo_id,
            &events,
            architecture,
        ))
    }

    /// Team-wide roll-up across every user with recorded activity.
    ///
    /// Each member is computed independently against the same architecture
    /// map.
    pub async fn team_progress(
        &self,
        repo_id: &str,
        architecture: Option<&ArchitectureMap>,
    ) -> Result<TeamProgress> {
        let user_ids = self.events.user_ids_for_repo(repo_id).await?;

        let mut members = Vec::with_capacity(user_ids.len());
        for user_id in &user_ids {
            members.push(
                self.developer_progress(repo_id, user_id, architecture)
                    .await?,
            );
        }

        let average_score = if members.is_empty() {
            0
        } else {
            let sum: u32 = members.iter().map(|m| m.overall_score).sum();
            (sum as f64 / members.len() as f64).round() as u32
        };
        let average_time_to_onboard = if members.is_empty() {
            0
        } else {
            let sum: u64 = members.iter().map(|m| m.total_time_spent_ms).sum();
            (sum as f64 / members.len() as f64).round() as u64
        };

        let area_averages = team_area_averages(&members);
        let mut sorted = area_averages.clone();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        let top_areas: Vec<SkillScore> = sorted.iter().take(3).cloned().collect();
        let weak_areas: Vec<SkillScore> = sorted
            .iter()
            .rev()
            .take(3)
            .cloned()
            .collect();

        Ok(TeamProgress {
            repo_id: repo_id.to_string(),
            members,
            average_score,
            average_time_to_onboard,
            top_areas,
            weak_areas,
        })
    }

    /// Members ranked descending by overall score, ties broken by input
    /// order.
    pub async fn leaderboard(
        &self,
        repo_id: &str,
        architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let team = self.team_progress(repo_id, architecture).await?;

        let mut members = team.members;
        members.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));

        Ok(members
            .into_iter()
            .enumerate()
            .map(|(i, m)| LeaderboardEntry {
                rank: i + 1,
                user_id: m.user_id,
                overall_score: m.overall_score,
                total_time_spent_ms: m.total_time_spent_ms,
                walkthroughs_completed: m.walkthroughs_completed,
                questions_asked: m.questions_asked,
                modules_explored: m.modules_explored,
                strongest_area: strongest_area(&m.skills),
            })
            .collect())
    }
}

/// Per-area mean score across members; zero entries for areas no member has
fn team_area_averages(members: &[DeveloperProgress]) -> Vec<SkillScore> {
    STANDARD_AREAS
        .iter()
        .map(|area| {
            let scores: Vec<&SkillScore> = members
                .iter()
                .flat_map(|m| m.skills.iter().filter(|s| s.area == *area))
                .collect();

            let avg_score = if scores.is_empty() {
                0
            } else {
                let sum: u32 = scores.iter().map(|s| s.score).sum();
                (sum as f64 / scores.len() as f64).round() as u32
            };

            SkillScore {
                area: *area,
                score: avg_score,
                modules_explored: scores.iter().map(|s| s.modules_explored).sum(),
                total_modules: scores.first().map(|s| s.total_modules).unwrap_or(0),
                last_activity: scores
                    .iter()
                    .map(|s| s.last_activity.clone())
                    .max()
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// The member's single highest-scoring area; first wins on ties, "none"
/// when the member has no skills at all
fn strongest_area(skills: &[SkillScore]) -> String {
    let mut best: Option<&SkillScore> = None;
    for skill in skills {
        match best {
            Some(current) if current.score >= skill.score => {}
            _ => best = Some(skill),
        }
    }
    best.map(|s| s.area.as_str().to_string())
        .unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryEventStore;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(Arc::new(MemoryEventStore::new()))
    }

    fn request(user_id: &str, kind: ProgressEventKind, target: &str) -> RecordEventRequest {
        RecordEventRequest {
            user_id: user_id.to_string(),
            event_type: kind,
            target_id: Some(target.to_string()),
            target_label: Some(target.to_string()),
            area: None,
            duration_ms: Some(1000),
        }
    }

    #[tokio::test]
    async fn test_record_event_requires_user_id() {
        let tracker = tracker();
        let err = tracker
            .record_event(
                "o/r",
                RecordEventRequest {
                    user_id: String::new(),
                    event_type: ProgressEventKind::QaAsked,
                    target_id: None,
                    target_label: None,
                    area: None,
                    duration_ms: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_record_event_stamps_id_timestamp_and_area() {
        let tracker = tracker();
        let event = tracker
            .record_event(
                "o/r",
                RecordEventRequest {
                    user_id: "alice".to_string(),
                    event_type: ProgressEventKind::ModuleExplored,
                    target_id: Some("n1".to_string()),
                    target_label: Some("Auth Service".to_string()),
                    area: None,
                    duration_ms: None,
                },
            )
            .await
            .unwrap();

        assert!(!event.id.is_empty());
        assert!(!event.timestamp.is_empty());
        assert_eq!(event.area, Some(SkillArea::Auth));
    }

    #[tokio::test]
    async fn test_developer_progress_reads_recorded_events() {
        let tracker = tracker();
        for target in ["wt-1", "wt-1", "wt-2"] {
            tracker
                .record_event(
                    "o/r",
                    request("alice", ProgressEventKind::WalkthroughViewed, target),
                )
                .await
                .unwrap();
        }

        let progress = tracker.developer_progress("o/r", "alice", None).await.unwrap();
        assert_eq!(progress.walkthroughs_completed, 2);
        assert_eq!(progress.skills.len(), 8);
    }

    #[tokio::test]
    async fn test_team_progress_averages_and_extremes() {
        let tracker = tracker();
        // alice explores two modules, bob one question
        tracker
            .record_event("o/r", request("alice", ProgressEventKind::ModuleExplored, "API router"))
            .await
            .unwrap();
        tracker
            .record_event("o/r", request("alice", ProgressEventKind::ModuleExplored, "Auth service"))
            .await
            .unwrap();
        tracker
            .record_event("o/r", request("bob", ProgressEventKind::QaAsked, "API question"))
            .await
            .unwrap();

        let team = tracker.team_progress("o/r", None).await.unwrap();
        assert_eq!(team.members.len(), 2);
        assert_eq!(team.top_areas.len(), 3);
        assert_eq!(team.weak_areas.len(), 3);

        let expected: u32 = {
            let sum: u32 = team.members.iter().map(|m| m.overall_score).sum();
            (sum as f64 / team.members.len() as f64).round() as u32
        };
        assert_eq!(team.average_score, expected);

        // top descending, weak ascending
        assert!(team.top_areas[0].score >= team.top_areas[1].score);
        assert!(team.top_areas[1].score >= team.top_areas[2].score);
        assert!(team.weak_areas[0].score <= team.weak_areas[1].score);
        assert!(team.weak_areas[1].score <= team.weak_areas[2].score);
    }

    #[tokio::test]
    async fn test_empty_team() {
        let tracker = tracker();
        let team = tracker.team_progress("o/r", None).await.unwrap();
        assert!(team.members.is_empty());
        assert_eq!(team.average_score, 0);
        assert_eq!(team.average_time_to_onboard, 0);
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_descending() {
        let tracker = tracker();
        tracker
            .record_event("o/r", request("bob", ProgressEventKind::QaAsked, "API question"))
            .await
            .unwrap();
        for target in ["Auth service", "API router", "DB model"] {
            tracker
                .record_event("o/r", request("alice", ProgressEventKind::ModuleExplored, target))
                .await
                .unwrap();
        }

        let board = tracker.leaderboard("o/r", None).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, "alice");
        assert_eq!(board[0].rank, 1);
        assert!(board[0].overall_score >= board[1].overall_score);
        assert_ne!(board[0].strongest_area, "none");
    }

    #[test]
    fn test_strongest_area_first_wins_on_tie() {
        let skills = vec![
            SkillScore {
                area: SkillArea::Architecture,
                score: 10,
                modules_explored: 0,
                total_modules: 1,
                last_activity: String::new(),
            },
            SkillScore {
                area: SkillArea::Api,
                score: 10,
                modules_explored: 0,
                total_modules: 1,
                last_activity: String::new(),
            },
        ];
        assert_eq!(strongest_area(&skills), "architecture");
        assert_eq!(strongest_area(&[]), "none");
    }

    #[test]
    fn test_strongest_area_with_all_zero_scores_is_first_area() {
        // A member whose every score is zero still reports the first area by
        // stable descending order; "none" only appears with no skills at all
        let skills: Vec<SkillScore> = STANDARD_AREAS
            .iter()
            .map(|area| SkillScore {
                area: *area,
                score: 0,
                modules_explored: 0,
                total_modules: 1,
                last_activity: String::new(),
            })
            .collect();
        assert_eq!(strongest_area(&skills), "architecture");
    }
}
