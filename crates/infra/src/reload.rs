//! Periodic grant reload.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use realmkit_auth::Realm;
use realmkit_core::{ConfigError, RealmError};

/// Shortest period the reload loop will tick at.
pub const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(100);

/// Call [`Realm::reload`] every `interval` until the task is aborted.
///
/// Failed reloads are logged and retried on the next tick; the realm keeps
/// serving its previous snapshot meanwhile. The loop ends by itself only if
/// the realm does not support reload at all. Intervals below
/// [`MIN_RELOAD_INTERVAL`] (including zero) are raised to it.
pub fn spawn_reload_task(realm: Arc<dyn Realm>, interval: Duration) -> JoinHandle<()> {
    let interval = effective_interval(interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; init already loaded the grants.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match realm.reload().await {
                Ok(()) => debug!(realm_type = %realm.realm_type(), "scheduled reload complete"),
                Err(RealmError::Configuration(ConfigError::Unsupported { .. })) => {
                    warn!(realm_type = %realm.realm_type(), "realm does not support reload; stopping reload task");
                    break;
                }
                Err(e) => warn!(realm_type = %realm.realm_type(), error = %e, "scheduled reload failed"),
            }
        }
    })
}

fn effective_interval(requested: Duration) -> Duration {
    if requested < MIN_RELOAD_INTERVAL {
        warn!(
            requested_ms = requested.as_millis() as u64,
            min_ms = MIN_RELOAD_INTERVAL.as_millis() as u64,
            "reload interval too short; clamping"
        );
        MIN_RELOAD_INTERVAL
    } else {
        requested
    }
}

/// Start the reload task if the realm was configured with an interval.
pub fn spawn_configured_reload(realm: &Arc<dyn Realm>) -> Option<JoinHandle<()>> {
    realm
        .reload_interval()
        .map(|interval| spawn_reload_task(Arc::clone(realm), interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use realmkit_auth::{AccountRecord, CaseSensitivity, GrantData};

    use crate::realm::MemoryRealm;
    use crate::store::MemorySource;

    #[test]
    fn short_intervals_are_clamped() {
        assert_eq!(effective_interval(Duration::ZERO), MIN_RELOAD_INTERVAL);
        assert_eq!(effective_interval(Duration::from_millis(1)), MIN_RELOAD_INTERVAL);
        assert_eq!(
            effective_interval(Duration::from_secs(30)),
            Duration::from_secs(30)
        );
    }

    #[tokio::test]
    async fn zero_interval_does_not_panic_the_task() {
        let data = GrantData::new().account(AccountRecord::new("paulo", "secret"));
        let realm: Arc<dyn Realm> = Arc::new(
            MemoryRealm::with_source(MemorySource::from_data(data, CaseSensitivity::Insensitive))
                .await
                .unwrap(),
        );

        // The memory realm cannot reload, so the loop stops after one tick.
        let handle = spawn_reload_task(realm, Duration::ZERO);
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reload task finished");
        assert!(outcome.is_ok());
    }
}
