use crate::{
    database::Store,
    models::{ConnectionStatus, Role, User},
    utils::AppError,
};
use serde::Serialize;
use std::collections::HashSet;

pub const SKILL_WEIGHT: u32 = 20;
pub const INTEREST_WEIGHT: u32 = 10;
pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub match_score: u32,
}

/// Compatibility of `candidate` for `user`.
///
/// Both overlaps are measured against the user's interests: what the
/// candidate can teach (skills) and what they share (interests).
pub fn score(user: &User, candidate: &User) -> u32 {
    compute_score(&user.interests, &candidate.skills, &candidate.interests)
}

pub fn compute_score(user_interests: &[String], candidate_skills: &[String], candidate_interests: &[String]) -> u32 {
    let wanted: HashSet<&str> = user_interests.iter().map(String::as_str).collect();

    let overlap = |tags: &[String]| -> u32 {
        tags.iter()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .intersection(&wanted)
            .count() as u32
    };

    let common_skills = overlap(candidate_skills);
    let common_interests = overlap(candidate_interests);

    (SKILL_WEIGHT * common_skills + INTEREST_WEIGHT * common_interests).min(MAX_SCORE)
}

/// Scores every eligible candidate and sorts by score, highest first.
/// Ties keep the order `candidates` came in.
pub fn rank_candidates(user: &User, candidates: &[User], excluded: &HashSet<String>) -> Vec<MatchResult> {
    let opposite = user.role.opposite();

    let mut matches: Vec<MatchResult> = candidates
        .iter()
        .filter(|c| c.role == opposite && c.id != user.id && !excluded.contains(&c.id))
        .map(|c| MatchResult {
            id: c.id.clone(),
            name: c.name.clone(),
            role: c.role,
            match_score: score(user, c),
        })
        .collect();

    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    matches
}

/// GET /matches - candidates for `user_id`, skipping anyone already
/// connected to them by a PENDING or ACCEPTED edge
pub async fn find_matches(store: &dyn Store, user_id: &str) -> Result<Vec<MatchResult>, AppError> {
    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let connected: HashSet<String> = store
        .list_connections_for(user_id, &[ConnectionStatus::Pending, ConnectionStatus::Accepted])
        .await?
        .iter()
        .map(|c| c.other_party(user_id).to_string())
        .collect();

    let candidates = store.list_users_by_role(user.role.opposite()).await?;

    Ok(rank_candidates(&user, &candidates, &connected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ConnectionStore, MemoryStore, UserStore};
    use crate::models::{Connection, Notification};

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn user(name: &str, role: Role, skills: &[&str], interests: &[&str]) -> User {
        User::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "hash".to_string(),
            role,
            tags(skills),
            tags(interests),
            None,
        )
    }

    #[test]
    fn test_scenario_skills_against_interests() {
        let a = user("A", Role::Mentor, &["Go"], &["ML"]);
        let b = user("B", Role::Mentee, &["ML", "Go"], &["Go"]);
        // |{ML, Go} ∩ {ML}| = 1, |{Go} ∩ {ML}| = 0
        assert_eq!(score(&a, &b), 20);
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        let a = user("A", Role::Mentor, &["Rust"], &["Databases"]);
        let b = user("B", Role::Mentee, &["Painting"], &["Music"]);
        assert_eq!(score(&a, &b), 0);
    }

    #[test]
    fn test_five_skills_saturate() {
        let wanted = ["a", "b", "c", "d", "e"];
        let a = user("A", Role::Mentee, &[], &wanted);
        let b = user("B", Role::Mentor, &wanted, &wanted);
        assert_eq!(score(&a, &b), MAX_SCORE);
    }

    #[test]
    fn test_duplicate_tags_count_once() {
        assert_eq!(compute_score(&tags(&["ML"]), &tags(&["ML", "ML"]), &[]), 20);
    }

    #[test]
    fn test_score_always_in_range() {
        let pool = ["a", "b", "c", "d", "e", "f", "g", "h"];
        for n in 0..=pool.len() {
            for m in 0..=pool.len() {
                let s = compute_score(&tags(&pool), &tags(&pool[..n]), &tags(&pool[..m]));
                assert!(s <= MAX_SCORE);
            }
        }
    }

    #[test]
    fn test_rank_filters_role_and_exclusions_and_sorts() {
        let me = user("Me", Role::Mentee, &[], &["Rust", "Go"]);
        let low = user("Low", Role::Mentor, &[], &["Go"]);
        let high = user("High", Role::Mentor, &["Rust", "Go"], &[]);
        let tie = user("Tie", Role::Mentor, &[], &["Rust"]);
        let peer = user("Peer", Role::Mentee, &["Rust"], &[]);
        let connected = user("Connected", Role::Mentor, &["Rust"], &[]);

        let excluded: HashSet<String> = [connected.id.clone()].into_iter().collect();
        let candidates = vec![low.clone(), high.clone(), tie.clone(), peer, connected];
        let ranked = rank_candidates(&me, &candidates, &excluded);

        let names: Vec<&str> = ranked.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Low", "Tie"]);
        assert_eq!(ranked[0].match_score, 40);
    }

    #[tokio::test]
    async fn test_find_matches_skips_pending_and_accepted_peers() {
        let store = MemoryStore::new();
        let me = user("Me", Role::Mentor, &[], &["ML"]);
        let pending = user("Pending", Role::Mentee, &["ML"], &[]);
        let free = user("Free", Role::Mentee, &["ML"], &[]);
        for u in [&me, &pending, &free] {
            store.insert_user(u).await.unwrap();
        }

        let conn = Connection::pending(&pending.id, &me.id);
        store
            .create_connection(&conn, &Notification::connection_request(&me.id, "Pending", &conn.id))
            .await
            .unwrap();

        let matches = find_matches(&store, &me.id).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, free.id);
        assert_eq!(matches[0].match_score, 20);

        let missing = find_matches(&store, "nobody").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
