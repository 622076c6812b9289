//! Periodic removal of recycle bin posts whose retention window has passed.
//!
//! Without the sweep, expired posts stay in the recycle bin (shown as expired)
//! until their owner purges or restores them.

use bytestory_common::{recycle::expiry_cutoff, util::PositiveDuration};
use bytestory_db::store::{DbError, SharedStore};
use time::UtcDateTime;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Purges every post that has expired at `now`, returning how many were removed.
pub async fn sweep_expired(store: &SharedStore, now: UtcDateTime) -> Result<u64, DbError> {
    store.purge_expired_posts(expiry_cutoff(now)).await
}

pub async fn run_expiry_sweep(
    store: SharedStore,
    interval: PositiveDuration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval.as_std());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = %interval.get(), "Starting expiry sweep");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match sweep_expired(&store, UtcDateTime::now()).await {
            Ok(0) => debug!("No expired posts to purge"),
            Ok(purged) => info!(purged, "Purged expired posts"),
            Err(err) => error!(error = %err, "Expiry sweep failed"),
        }
    }

    debug!("Expiry sweep stopped");
}

#[cfg(test)]
mod tests {
    use crate::sweep::{run_expiry_sweep, sweep_expired};
    use bytestory_common::{
        model::{
            post::PostDraft,
            user::{CreateUser, UserHandle},
        },
        util::PositiveDuration,
    };
    use bytestory_db::{memory::MemoryStore, store::SharedStore};
    use std::sync::Arc;
    use time::{Duration, UtcDateTime};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn only_expired_posts_are_swept() {
        let store: SharedStore = Arc::new(MemoryStore::default());
        let author = store
            .create_user(&CreateUser {
                handle: UserHandle::new("ada".to_owned()).unwrap(),
                ..CreateUser::default()
            })
            .await
            .unwrap();
        let now = UtcDateTime::now();

        let mut ids = Vec::new();
        for days_ago in [8, 7, 6] {
            let draft = PostDraft {
                title: format!("{days_ago} days"),
                content: "Body".to_owned(),
                ..PostDraft::default()
            };
            let post = store.create_post(draft, &author, now).await.unwrap();
            store
                .soft_delete_post(post.id, now - Duration::days(days_ago))
                .await
                .unwrap();
            ids.push(post.id);
        }

        assert_eq!(sweep_expired(&store, now).await.unwrap(), 2);
        assert!(store.fetch_post(ids[0]).await.unwrap().is_none());
        assert!(store.fetch_post(ids[1]).await.unwrap().is_none());
        assert!(store.fetch_post(ids[2]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_stops_on_shutdown() {
        let store: SharedStore = Arc::new(MemoryStore::default());
        let shutdown = CancellationToken::new();
        let interval = PositiveDuration::new(Duration::milliseconds(10)).unwrap();

        let sweep = tokio::spawn(run_expiry_sweep(store, interval, shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(5), sweep)
            .await
            .unwrap()
            .unwrap();
    }
}
