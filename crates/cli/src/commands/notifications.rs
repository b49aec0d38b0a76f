//! Unread-count polling.

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};
use voltcart_storefront::stores::UNREAD_POLL_INTERVAL;

use super::{CliError, Context};

/// Poll the unread count every [`UNREAD_POLL_INTERVAL`] while the session
/// holds a credential. Stops on Ctrl-C or when the session ends.
///
/// A failed poll is logged and retried on the next tick. A rejected
/// credential ends the session.
///
/// # Errors
///
/// Returns [`CliError::NotSignedIn`] when the session ends while watching,
/// otherwise the rehydration error.
pub async fn watch(ctx: &Context) -> Result<(), CliError> {
    ctx.require_user().await?;
    let mut signed_in = ctx.api.session().subscribe();
    let mut ticker = interval(UNREAD_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = None;

    loop {
        tokio::select! {
            biased;

            changed = signed_in.changed() => {
                if changed.is_err() || !*signed_in.borrow_and_update() {
                    info!("Session ended, stopping notification watch");
                    return Err(CliError::NotSignedIn);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping notification watch");
                break;
            }
            _ = ticker.tick() => poll(ctx, &mut last).await,
        }
    }
    Ok(())
}

/// One poll. Prints the count when it changed since the last print.
#[allow(clippy::print_stdout)]
async fn poll(ctx: &Context, last: &mut Option<u64>) {
    match ctx.stores.notifications.fetch_unread_count().await {
        Ok(count) if *last != Some(count) => {
            println!("{count} unread notification(s)");
            *last = Some(count);
        }
        Ok(_) => {}
        Err(e) if e.is_unauthorized() => {
            warn!(error = %e, "Credential rejected while polling, signing out");
            ctx.stores.teardown();
        }
        Err(e) => warn!(error = %e, "Unread count poll failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use voltcart_storefront::session::MemoryCredentialStore;
    use voltcart_storefront::{ApiClient, ApiConfig, SessionHandle, Stores};

    async fn context(server: &mut mockito::ServerGuard) -> Context {
        server
            .mock("GET", "/api/users/profile")
            .with_status(200)
            .with_body(r#"{"user":{"_id":"u1","name":"Asha Rao","email":"asha@example.com","role":"user"}}"#)
            .create_async()
            .await;
        let session = SessionHandle::open(MemoryCredentialStore::with_credential("tok")).unwrap();
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        let api = ApiClient::new(&config, session).unwrap();
        let stores = Stores::new(&api);
        Context { api, stores }
    }

    #[tokio::test]
    async fn test_rejected_poll_ends_watch_and_session() {
        let mut server = mockito::Server::new_async().await;
        let ctx = context(&mut server).await;
        let poll = server
            .mock("GET", "/api/notifications/unread-count")
            .with_status(401)
            .with_body(r#"{"message":"Not authorized, token failed"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = watch(&ctx).await.unwrap_err();

        poll.assert_async().await;
        assert!(matches!(err, CliError::NotSignedIn));
        assert!(!ctx.api.session().has_credential());
        assert!(ctx.api.session().user().is_none());
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_session() {
        let mut server = mockito::Server::new_async().await;
        let ctx = context(&mut server).await;
        ctx.stores.auth.init().await.unwrap();
        server
            .mock("GET", "/api/notifications/unread-count")
            .with_status(503)
            .with_body(r#"{"message":"Service temporarily unavailable"}"#)
            .create_async()
            .await;
        let mut last = Some(3);

        poll(&ctx, &mut last).await;

        assert_eq!(last, Some(3));
        assert!(ctx.api.session().has_credential());
    }
}
