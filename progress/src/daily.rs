use common::models::Challenge;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use crate::ProgressService;

impl ProgressService {
    /// Today's challenge. The first call of a day picks one uniformly at
    /// random from the whole catalog and flags it; later calls return it.
    pub async fn get_daily_challenge(&self) -> Option<Challenge> {
        match self.try_get_daily_challenge().await {
            Ok(challenge) => challenge,
            Err(e) => {
                error!("Error getting daily challenge: {:?}", e);
                None
            }
        }
    }

    async fn try_get_daily_challenge(&self) -> anyhow::Result<Option<Challenge>> {
        let today = self.clock.today();

        match self.store.find_daily_challenge(today).await {
            Ok(Some(existing)) => return Ok(Some(existing)),
            Ok(None) => {}
            Err(e) => warn!("Daily challenge lookup failed, picking a new one: {:?}", e),
        }

        let challenges = self.store.list_challenges().await?;
        if challenges.is_empty() {
            warn!("No challenges available for the daily pick");
            return Ok(None);
        }

        self.store.clear_daily_flags().await?;

        let Some(mut daily) = challenges.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };
        self.store.mark_daily(daily.id, today).await?;
        daily.is_daily = true;
        daily.daily_date = Some(today);

        info!("Picked challenge {} as the daily for {}", daily.id, today);
        Ok(Some(daily))
    }
}
