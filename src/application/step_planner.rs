// Step planner - Picks query resolution for a look-back window
use crate::domain::error::SeriesError;
use crate::domain::series::TimeWindow;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StepTier {
    /// Largest window (inclusive) this tier covers.
    pub max_window_minutes: f64,
    pub step_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlannerPolicy {
    pub tiers: Vec<StepTier>,
    /// Floor: no request finer than this.
    pub min_step: i64,
    /// Ceiling: no request coarser than this.
    pub max_step: i64,
    /// Point budget used past the last tier.
    pub max_points: i64,
    /// Longest window a caller may ask for.
    #[serde(default = "default_max_window_minutes")]
    pub max_window_minutes: f64,
    /// Hard cap on the points of any planned window.
    #[serde(default = "default_max_window_points")]
    pub max_window_points: i64,
}

fn default_max_window_minutes() -> f64 {
    // 366 days
    527_040.0
}

fn default_max_window_points() -> i64 {
    2000
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        let tier = |max_window_minutes, step_seconds| StepTier {
            max_window_minutes,
            step_seconds,
        };
        Self {
            tiers: vec![
                tier(5.0, 15),
                tier(15.0, 15),
                tier(60.0, 60),
                tier(360.0, 300),
                tier(1440.0, 900),
                tier(10_080.0, 3600),
                tier(43_200.0, 21_600),
            ],
            min_step: 15,
            max_step: 86_400,
            max_points: 120,
            max_window_minutes: default_max_window_minutes(),
            max_window_points: default_max_window_points(),
        }
    }
}

impl PlannerPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tiers.is_empty() {
            anyhow::bail!("planner policy needs at least one tier");
        }
        if self.min_step <= 0 || self.min_step > self.max_step {
            anyhow::bail!(
                "planner step bounds must satisfy 0 < min_step <= max_step, got {}..{}",
                self.min_step,
                self.max_step
            );
        }
        if self.max_points <= 0 {
            anyhow::bail!("planner max_points must be positive, got {}", self.max_points);
        }
        if !self.max_window_minutes.is_finite() || self.max_window_minutes <= 0.0 {
            anyhow::bail!(
                "planner max_window_minutes must be a positive number, got {}",
                self.max_window_minutes
            );
        }
        if self.max_window_points <= 0 {
            anyhow::bail!(
                "planner max_window_points must be positive, got {}",
                self.max_window_points
            );
        }
        for pair in self.tiers.windows(2) {
            if pair[1].max_window_minutes <= pair[0].max_window_minutes {
                anyhow::bail!(
                    "planner tiers must increase in window: {} follows {}",
                    pair[1].max_window_minutes,
                    pair[0].max_window_minutes
                );
            }
            if pair[1].step_seconds < pair[0].step_seconds {
                anyhow::bail!(
                    "planner tiers must not decrease in step: {}s follows {}s",
                    pair[1].step_seconds,
                    pair[0].step_seconds
                );
            }
        }
        if self.tiers.iter().any(|t| t.step_seconds <= 0) {
            anyhow::bail!("planner tier steps must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StepPlanner {
    policy: PlannerPolicy,
}

impl StepPlanner {
    pub fn new(policy: PlannerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PlannerPolicy {
        &self.policy
    }

    /// Plans a window ending now.
    pub fn plan(&self, window_minutes: f64) -> Result<TimeWindow, SeriesError> {
        self.plan_at(chrono::Utc::now().timestamp(), window_minutes)
    }

    /// Plans a window ending at `now` (epoch seconds).
    ///
    /// `to` is `now` snapped down to the step grid and the span is cut to
    /// whole steps back from it, so the point count depends on the window
    /// alone and not on where `now` falls between ticks.
    pub fn plan_at(&self, now: i64, window_minutes: f64) -> Result<TimeWindow, SeriesError> {
        if !window_minutes.is_finite() || window_minutes <= 0.0 {
            return Err(SeriesError::InvalidWindow(format!(
                "window must be a positive number of minutes, got {}",
                window_minutes
            )));
        }
        if window_minutes > self.policy.max_window_minutes {
            return Err(SeriesError::InvalidWindow(format!(
                "window of {} minutes exceeds the limit of {}",
                window_minutes, self.policy.max_window_minutes
            )));
        }

        let span = (window_minutes * 60.0).round();
        if span >= i64::MAX as f64 {
            return Err(SeriesError::InvalidWindow(format!(
                "window of {} minutes is out of range",
                window_minutes
            )));
        }
        let span = span as i64;
        let step = self.step_for(window_minutes, span);

        let points = span / step + 1;
        if points > self.policy.max_window_points {
            return Err(SeriesError::InvalidWindow(format!(
                "window of {} minutes at {}s needs {} points, limit is {}",
                window_minutes, step, points, self.policy.max_window_points
            )));
        }

        let to = now.div_euclid(step).checked_mul(step);
        let from = to.and_then(|to| to.checked_sub(span / step * step));
        let (Some(from), Some(to)) = (from, to) else {
            return Err(SeriesError::InvalidWindow(format!(
                "window of {} minutes ending at {} is out of range",
                window_minutes, now
            )));
        };

        let window = TimeWindow { from, to, step };
        tracing::debug!(
            "Planned {}m window: from={} to={} step={}s ({} points)",
            window_minutes,
            window.from,
            window.to,
            window.step,
            window.len()
        );
        Ok(window)
    }

    /// Step is non-decreasing in the window, so doubling the window never
    /// more than doubles the point count.
    fn step_for(&self, window_minutes: f64, span: i64) -> i64 {
        let step = match self
            .policy
            .tiers
            .iter()
            .find(|t| window_minutes <= t.max_window_minutes)
        {
            Some(tier) => tier.step_seconds,
            None => {
                let last = self.policy.tiers.last().map(|t| t.step_seconds).unwrap_or(0);
                let budget = (span - 1) / self.policy.max_points + 1;
                let budget = budget.saturating_add(59) / 60 * 60;
                last.max(budget)
            }
        };
        step.clamp(self.policy.min_step, self.policy.max_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Multiple of every default step, so window edges land on the grid.
    const NOW: i64 = 1_728_000_000;

    fn planner() -> StepPlanner {
        StepPlanner::new(PlannerPolicy::default())
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(PlannerPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_window() {
        for minutes in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                planner().plan_at(NOW, minutes),
                Err(SeriesError::InvalidWindow(_))
            ));
        }
    }

    #[test]
    fn test_short_window_uses_finest_step() {
        let window = planner().plan_at(NOW, 5.0).unwrap();
        assert_eq!(window.step, 15);
        assert_eq!(window.to, NOW);
        assert_eq!(window.from, NOW - 300);
        assert_eq!(window.len(), 21);
    }

    #[test]
    fn test_day_window_stays_in_budget() {
        let window = planner().plan_at(NOW, 1440.0).unwrap();
        assert!(window.step >= 300);
        assert!(window.len() <= 300);
        assert_eq!(window.len(), 97);
    }

    #[test]
    fn test_doubling_never_more_than_doubles_points() {
        let planner = planner();
        for now in [NOW, NOW + 7, NOW + 899, NOW + 12_345] {
            for start in [5.0, 1.4833] {
                let mut minutes = start;
                while minutes <= 1440.0 * 64.0 {
                    let single = planner.plan_at(now, minutes).unwrap();
                    let double = planner.plan_at(now, minutes * 2.0).unwrap();
                    assert!(double.step >= single.step, "step shrank at {}m", minutes);
                    assert!(
                        double.len() <= 2 * single.len(),
                        "now={}: {}m -> {} points, {}m -> {} points",
                        now,
                        minutes,
                        single.len(),
                        minutes * 2.0,
                        double.len()
                    );
                    minutes *= 2.0;
                }
            }
        }
    }

    #[test]
    fn test_point_count_ignores_clock_phase() {
        let planner = planner();
        for minutes in [1.4833, 5.0, 17.5, 1440.0] {
            let on_grid = planner.plan_at(NOW, minutes).unwrap();
            for now in [NOW + 1, NOW + 7, NOW + 899] {
                let window = planner.plan_at(now, minutes).unwrap();
                assert_eq!(window.len(), on_grid.len(), "{}m at now={}", minutes, now);
                assert!(window.to <= now && now - window.to < window.step);
            }
        }
    }

    #[test]
    fn test_oversized_windows_are_rejected() {
        for minutes in [1e12, 1e20, 527_041.0] {
            assert!(matches!(
                planner().plan_at(NOW, minutes),
                Err(SeriesError::InvalidWindow(_))
            ));
        }
        assert!(planner().plan_at(NOW, 527_040.0).is_ok());
    }

    #[test]
    fn test_unbounded_window_limit_still_fails_cleanly() {
        let policy = PlannerPolicy {
            max_window_minutes: f64::MAX,
            ..PlannerPolicy::default()
        };
        let planner = StepPlanner::new(policy);

        // 1e12 minutes at the 86400s ceiling is ~694M points
        assert!(matches!(
            planner.plan_at(NOW, 1e12),
            Err(SeriesError::InvalidWindow(_))
        ));
        // span no longer fits in i64 seconds
        assert!(matches!(
            planner.plan_at(NOW, 1e20),
            Err(SeriesError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_point_cap_applies_inside_tiers() {
        let policy = PlannerPolicy {
            max_window_points: 50,
            ..PlannerPolicy::default()
        };
        let planner = StepPlanner::new(policy);
        assert!(planner.plan_at(NOW, 5.0).is_ok());
        assert!(matches!(
            planner.plan_at(NOW, 60.0),
            Err(SeriesError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_standard_tiers_are_monotonic() {
        let planner = planner();
        let points: Vec<usize> = [5.0, 15.0, 60.0, 1440.0]
            .iter()
            .map(|m| planner.plan_at(NOW, *m).unwrap().len())
            .collect();
        let steps: Vec<i64> = [5.0, 15.0, 60.0, 1440.0]
            .iter()
            .map(|m| planner.plan_at(NOW, *m).unwrap().step)
            .collect();

        assert_eq!(steps, vec![15, 15, 60, 900]);
        assert_eq!(points, vec![21, 61, 61, 97]);
    }

    #[test]
    fn test_past_last_tier_uses_point_budget() {
        // 90 days
        let window = planner().plan_at(NOW, 129_600.0).unwrap();
        assert_eq!(window.step, 64_800);
        assert!(window.len() <= 121);
    }

    #[test]
    fn test_step_is_clamped() {
        let policy = PlannerPolicy {
            tiers: vec![StepTier {
                max_window_minutes: 60.0,
                step_seconds: 1,
            }],
            min_step: 10,
            max_step: 600,
            max_points: 10,
            max_window_minutes: 100_000.0,
            max_window_points: 20_000,
        };
        let planner = StepPlanner::new(policy);
        assert_eq!(planner.plan_at(NOW, 30.0).unwrap().step, 10);
        assert_eq!(planner.plan_at(NOW, 100_000.0).unwrap().step, 600);
    }

    #[test]
    fn test_window_edges_snap_down() {
        let window = planner().plan_at(NOW + 7, 60.0).unwrap();
        assert_eq!(window.step, 60);
        assert_eq!(window.to, NOW);
        assert_eq!(window.from, NOW - 3600);
        assert!(window.from <= window.to);
    }

    #[test]
    fn test_policy_validation() {
        let mut policy = PlannerPolicy::default();
        policy.tiers.swap(0, 2);
        assert!(policy.validate().is_err());

        let mut policy = PlannerPolicy::default();
        policy.min_step = 0;
        assert!(policy.validate().is_err());

        let mut policy = PlannerPolicy::default();
        policy.tiers[2].step_seconds = 5;
        assert!(policy.validate().is_err());

        let policy = PlannerPolicy {
            tiers: Vec::new(),
            ..PlannerPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = PlannerPolicy {
            max_window_minutes: f64::INFINITY,
            ..PlannerPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = PlannerPolicy {
            max_window_points: 0,
            ..PlannerPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
