//! Login and session reuse

use crate::api::{Credentials, PlatformApi, normalize_server};
use crate::error::{ProxmoxError, Result};
use homelab_cloud::{Session, SessionCache};
use tracing::{debug, info, warn};

/// A usable session for `api_server`.
///
/// The cached session is reused when it belongs to the same server, unless
/// `force` is set. Otherwise a fresh login is performed and cached.
pub async fn ensure_session<A: PlatformApi + ?Sized>(
    api: &A,
    cache: &SessionCache,
    api_server: &str,
    credentials: &Credentials,
    force: bool,
) -> Result<Session> {
    let server = normalize_server(api_server);

    if !force {
        match cache.load().await {
            Ok(Some(session)) if normalize_server(&session.api_server) == server => {
                debug!("Reusing cached session of {}", session.username);
                return Ok(session);
            }
            Ok(Some(session)) => {
                debug!("Cached session belongs to {}", session.api_server);
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable session cache: {}", e),
        }
    }

    info!("Logging in to {} as {}", server, credentials.username);
    let session = api.login(&server, credentials).await?;
    cache.save(&session).await?;
    Ok(session)
}

/// The cached session, for commands that never log in themselves
pub async fn cached_session(cache: &SessionCache) -> Result<Session> {
    cache
        .load()
        .await?
        .ok_or_else(|| ProxmoxError::NotLoggedIn(cache.path().display().to_string()))
}

/// Drop the cached session once the platform rejected it, so the next
/// invocation logs in again.
pub async fn forget_rejected<T>(cache: &SessionCache, result: Result<T>) -> Result<T> {
    if let Err(ProxmoxError::AuthenticationFailed(_)) = &result {
        warn!("Session rejected, clearing {}", cache.path().display());
        if let Err(e) = cache.clear().await {
            warn!("Failed to clear session cache: {}", e);
        }
    }
    result
}
