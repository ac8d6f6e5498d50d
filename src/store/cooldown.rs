//! Per-URL offer cooldowns and per-origin dismissals
//!
//! Both are advisory rate limiters: reads fail open and writes are best effort.

use std::sync::Arc;

use serde::Serialize;

use crate::config::CooldownConfig;
use crate::display::HiddenReason;
use crate::lane::Lane;
use crate::store::{Clock, KvStore, read_if_fresh, write_timestamp};
use crate::utils::url::{normalize_url, origin_of};

pub const COOLDOWN_PREFIX: &str = "chip_cooldown:";
pub const DISMISSED_PREFIX: &str = "chip_dismissed:";

/// The page a cooldown applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CooldownScope {
    /// Normalized URL (tracking parameters and fragment removed)
    pub url: String,
    pub origin: String,
}

impl CooldownScope {
    pub fn from_url(raw: &str) -> Self {
        Self {
            url: normalize_url(raw),
            origin: origin_of(raw),
        }
    }
}

/// Result of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CooldownCheck {
    pub blocked: bool,
    pub reason: Option<HiddenReason>,
}

impl CooldownCheck {
    pub const CLEAR: CooldownCheck = CooldownCheck {
        blocked: false,
        reason: None,
    };

    fn blocked(reason: HiddenReason) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }
}

pub fn url_key(lane: Lane, scope: &CooldownScope) -> String {
    format!("{COOLDOWN_PREFIX}{}:{}", lane.as_str(), scope.url)
}

pub fn dismissal_key(lane: Lane, origin: &str) -> String {
    format!("{DISMISSED_PREFIX}{}:{}", lane.as_str(), origin)
}

pub struct CooldownStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    url_window_ms: i64,
    dismiss_window_ms: i64,
}

impl CooldownStore {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &CooldownConfig) -> Self {
        Self {
            store,
            clock,
            url_window_ms: config.url_window_ms(),
            dismiss_window_ms: config.dismiss_window_ms(),
        }
    }

    /// URL cooldown first, then origin dismissal.
    pub async fn check_cooldowns(&self, lane: Lane, scope: &CooldownScope) -> CooldownCheck {
        let key = url_key(lane, scope);
        match read_if_fresh(self.store.as_ref(), &key, self.url_window_ms, self.clock.as_ref()).await
        {
            Ok(Some(_)) => return CooldownCheck::blocked(HiddenReason::UrlCooldown),
            Ok(None) => {}
            Err(e) => tracing::warn!("url cooldown read failed for {}, failing open: {}", key, e),
        }

        let key = dismissal_key(lane, &scope.origin);
        match read_if_fresh(
            self.store.as_ref(),
            &key,
            self.dismiss_window_ms,
            self.clock.as_ref(),
        )
        .await
        {
            Ok(Some(_)) => CooldownCheck::blocked(HiddenReason::UserDismissed),
            Ok(None) => CooldownCheck::CLEAR,
            Err(e) => {
                tracing::warn!("dismissal read failed for {}, failing open: {}", key, e);
                CooldownCheck::CLEAR
            }
        }
    }

    /// Record an offer on this URL. Call only after the chip actually rendered.
    pub async fn set_url_cooldown(&self, lane: Lane, scope: &CooldownScope) {
        let key = url_key(lane, scope);
        if let Err(e) = write_timestamp(self.store.as_ref(), &key, self.clock.as_ref()).await {
            tracing::warn!("url cooldown write dropped for {}: {}", key, e);
        }
    }

    pub async fn dismiss_on_origin(&self, lane: Lane, scope: &CooldownScope) {
        let key = dismissal_key(lane, &scope.origin);
        if let Err(e) = write_timestamp(self.store.as_ref(), &key, self.clock.as_ref()).await {
            tracing::warn!("dismissal write dropped for {}: {}", key, e);
        }
    }

    pub async fn clear_dismissal(&self, lane: Lane, origin: &str) {
        let key = dismissal_key(lane, origin);
        if let Err(e) = self.store.remove(&key).await {
            tracing::warn!("dismissal clear dropped for {}: {}", key, e);
        }
    }
}
