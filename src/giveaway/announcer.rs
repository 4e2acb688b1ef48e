use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AnnouncementRef, DrawResult, GiveawayView};

/// Outward notifications for the giveaway. Failures are reported to the caller, which
/// logs them; a failed announcement never undoes the state change behind it.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Post the announcement for a new giveaway and return a handle for later edits.
    async fn post_giveaway(&self, view: &GiveawayView) -> Result<AnnouncementRef>;

    /// Re-render an existing announcement after someone joined.
    async fn refresh_giveaway(&self, announcement: &AnnouncementRef, view: &GiveawayView) -> Result<()>;

    /// Post the winners of a closed giveaway.
    async fn post_results(&self, result: &DrawResult) -> Result<()>;
}
