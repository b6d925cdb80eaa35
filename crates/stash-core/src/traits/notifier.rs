//! Outbound share notification hook.

use async_trait::async_trait;

use crate::events::ShareNotice;

/// Receives one notice per share call.
///
/// Delivery (mail, push, ...) is the implementor's concern and must not
/// block the caller: the share has already been recorded when this runs,
/// so implementations report their own failures instead of returning them.
#[async_trait]
pub trait ShareNotifier: Send + Sync + std::fmt::Debug + 'static {
    /// Announce that `notice.files` are shared with `notice.grantee_id`.
    async fn notify_share(&self, notice: ShareNotice);
}
