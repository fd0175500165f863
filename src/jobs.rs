use std::time::Duration;

use time::{Date, OffsetDateTime};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    analytics::AnalyticsEngine, auth::repo_types::User, recommendations::RecommendationService,
    state::AppState,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RollupStats {
    pub users: usize,
    pub failed_days: usize,
    pub failed_plans: usize,
}

/// Backfills analytics and generates the daily plan for each user.
/// A failing user is logged and skipped.
pub async fn rollup_users(
    analytics: &AnalyticsEngine,
    recommender: &RecommendationService,
    users: &[Uuid],
    today: Date,
) -> RollupStats {
    let days = analytics.config().backfill_days;
    let mut stats = RollupStats {
        users: users.len(),
        ..Default::default()
    };
    for &user_id in users {
        let report = analytics.backfill_from(user_id, today, days).await;
        stats.failed_days += report.failed();

        if let Err(e) = recommender.generate_daily(user_id, today).await {
            warn!(user_id = %user_id, error = %e, "daily plan generation failed");
            stats.failed_plans += 1;
        }
    }
    stats
}

#[instrument(skip(state))]
pub async fn run_once(state: &AppState) -> anyhow::Result<RollupStats> {
    let users = User::list_active_ids(&state.db).await?;
    let today = OffsetDateTime::now_utc().date();
    let stats = rollup_users(&state.analytics, &state.recommender, &users, today).await;
    info!(
        users = stats.users,
        failed_days = stats.failed_days,
        failed_plans = stats.failed_plans,
        "daily rollup finished"
    );
    Ok(stats)
}

/// First tick one full period after start, so a restart does not rerun the
/// rollup for a day that already has a plan.
fn rollup_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Runs [`run_once`] every `rollup_interval_secs`; `0` disables the job.
pub fn spawn_daily_rollup(state: AppState) -> Option<JoinHandle<()>> {
    let secs = state.config.engine.rollup_interval_secs;
    if secs == 0 {
        info!("daily rollup disabled");
        return None;
    }
    info!(interval_secs = secs, "daily rollup scheduled");
    Some(tokio::spawn(async move {
        let mut ticker = rollup_ticker(Duration::from_secs(secs));
        loop {
            ticker.tick().await;
            if let Err(e) = run_once(&state).await {
                error!(error = ?e, "daily rollup failed");
            }
        }
    }))
}
