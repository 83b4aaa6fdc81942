//! Session Counters
//!
//! The single-owner state record the orchestrator mutates as the session
//! progresses. Nothing else writes to it; presentation sinks receive cloned
//! snapshots (see [`StatusSink`](crate::sink::StatusSink)).

use chrono::{DateTime, Utc};

/// In-memory counters for the current session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Last observed energy balance (cache of remote truth, never negative)
    pub energy: u64,
    /// Games successfully submitted this session
    pub total_games: u64,
    /// Score of the most recent successful submission
    pub last_score: Option<u32>,
    /// Multiplier of the most recent successful submission
    pub last_multiplier: Option<String>,
    /// Sum of all submitted scores this session
    pub total_points: u64,
    /// When the record was last updated
    pub last_update: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Create a zeroed session record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh energy observation
    pub fn set_energy(&mut self, energy: u64) {
        self.energy = energy;
        self.touch();
    }

    /// Record a successful play submission
    ///
    /// Increments the game counter, accumulates points, and refreshes the
    /// energy balance when the submission response carried one.
    pub fn record_play(&mut self, score: u32, multiplier: &str, energy: Option<u64>) {
        self.total_games += 1;
        self.last_score = Some(score);
        self.last_multiplier = Some(multiplier.to_string());
        self.total_points += u64::from(score);
        if let Some(energy) = energy {
            self.energy = energy;
        }
        self.touch();
    }

    /// Flat labeled metrics for presentation sinks
    #[must_use]
    pub fn labeled_metrics(&self) -> Vec<(String, String)> {
        vec![
            ("Energy".to_string(), self.energy.to_string()),
            ("Total Games".to_string(), self.total_games.to_string()),
            (
                "Last Score".to_string(),
                self.last_score
                    .map_or_else(|| "N/A".to_string(), |s| s.to_string()),
            ),
            (
                "Multiplier".to_string(),
                self.last_multiplier
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
            ("Total Points".to_string(), self.total_points.to_string()),
            (
                "Last Update".to_string(),
                self.last_update
                    .map_or_else(|| "Never".to_string(), |t| t.format("%H:%M:%S").to_string()),
            ),
        ]
    }

    fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_zeroed() {
        let stats = SessionStats::new();
        assert_eq!(stats.energy, 0);
        assert_eq!(stats.total_games, 0);
        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.last_score, None);
        assert_eq!(stats.last_update, None);
    }

    #[test]
    fn test_record_play_accumulates() {
        let mut stats = SessionStats::new();

        stats.record_play(185, "1", Some(30));
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_points, 185);
        assert_eq!(stats.last_score, Some(185));
        assert_eq!(stats.last_multiplier, Some("1".to_string()));
        assert_eq!(stats.energy, 30);

        stats.record_play(190, "1", None);
        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.total_points, 375);
        // Energy untouched when the response carried none
        assert_eq!(stats.energy, 30);
    }

    #[test]
    fn test_set_energy_touches_timestamp() {
        let mut stats = SessionStats::new();
        assert!(stats.last_update.is_none());

        stats.set_energy(42);
        assert_eq!(stats.energy, 42);
        assert!(stats.last_update.is_some());
    }

    #[test]
    fn test_labeled_metrics_placeholders() {
        let stats = SessionStats::new();
        let metrics = stats.labeled_metrics();

        let lookup = |label: &str| {
            metrics
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(lookup("Energy"), "0");
        assert_eq!(lookup("Last Score"), "N/A");
        assert_eq!(lookup("Multiplier"), "N/A");
        assert_eq!(lookup("Last Update"), "Never");
    }
}
