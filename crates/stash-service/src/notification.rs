//! Default share notifier.

use async_trait::async_trait;
use tracing::info;

use stash_core::events::ShareNotice;
use stash_core::traits::ShareNotifier;

/// Emits each share notice as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl ShareNotifier for LoggingNotifier {
    async fn notify_share(&self, notice: ShareNotice) {
        let names: Vec<&str> = notice.files.iter().map(|f| f.name.as_str()).collect();
        info!(
            grantee_id = %notice.grantee_id,
            grantee_email = %notice.grantee_email,
            grantor_id = %notice.grantor_id,
            grantor = %notice.grantor_name,
            files = ?names,
            newly_granted = notice.newly_granted,
            "Files shared"
        );
    }
}
