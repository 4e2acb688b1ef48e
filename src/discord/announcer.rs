use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateMessage, EditMessage, Http, MessageId,
};
use tracing::debug;

use crate::config::PARTICIPATE_BUTTON_ID;
use crate::error::{AppError, Result};
use crate::giveaway::Announcer;
use crate::types::{AnnouncementRef, DrawResult, GiveawayView, ParticipantId};

const GIVEAWAY_COLOUR: u32 = 0x0099ff;
const RESULTS_COLOUR: u32 = 0x00ff00;

/// Posts giveaway announcements to a single channel through the Discord REST API.
pub struct DiscordAnnouncer {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel_id: ChannelId::new(channel_id),
        }
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn post_giveaway(&self, view: &GiveawayView) -> Result<AnnouncementRef> {
        let button = CreateButton::new(PARTICIPATE_BUTTON_ID)
            .label("Participate")
            .style(ButtonStyle::Primary);
        let message = CreateMessage::new()
            .content("@everyone A new giveaway has started!")
            .embed(giveaway_embed(view))
            .components(vec![CreateActionRow::Buttons(vec![button])]);

        let posted = self.channel_id.send_message(&self.http, message).await?;
        debug!(message_id = %posted.id, "[DISCORD] giveaway announcement posted");
        Ok(AnnouncementRef::new(posted.id.get().to_string()))
    }

    async fn refresh_giveaway(&self, announcement: &AnnouncementRef, view: &GiveawayView) -> Result<()> {
        let message_id = parse_message_id(announcement)?;
        self.channel_id
            .edit_message(&self.http, message_id, EditMessage::new().embed(giveaway_embed(view)))
            .await?;
        Ok(())
    }

    async fn post_results(&self, result: &DrawResult) -> Result<()> {
        let embed = CreateEmbed::new()
            .colour(RESULTS_COLOUR)
            .title("🎊 The giveaway is over!")
            .description(results_description(result));
        self.channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

fn parse_message_id(announcement: &AnnouncementRef) -> Result<MessageId> {
    announcement
        .as_str()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(MessageId::new)
        .ok_or_else(|| AppError::AnnouncementRef(announcement.as_str().to_string()))
}

fn giveaway_embed(view: &GiveawayView) -> CreateEmbed {
    CreateEmbed::new()
        .colour(GIVEAWAY_COLOUR)
        .title("🎉 Giveaway!")
        .description(giveaway_description(view))
        .footer(CreateEmbedFooter::new("Join now!"))
}

fn mention(id: &ParticipantId) -> String {
    format!("<@{id}>")
}

fn giveaway_description(view: &GiveawayView) -> String {
    let mut description = format!(
        "🏆 Prize: **{}**\n👥 Winners: **{}**\n👋 Participants: **{}**\n⏰ Ends: <t:{}:R>",
        view.prize,
        view.winner_count,
        view.participant_count,
        view.ends_at.timestamp(),
    );
    if let Some(last) = &view.last_participant {
        description.push_str(&format!("\n🔷 Latest participant: {}", mention(last)));
    }
    description
}

fn results_description(result: &DrawResult) -> String {
    if result.winners.is_empty() {
        return format!("🏅 Nobody won **{}**, there were no participants.", result.prize);
    }
    let mentions = result.winners.iter().map(mention).collect::<Vec<_>>().join(", ");
    format!("🏅 Winners: {mentions}")
}
