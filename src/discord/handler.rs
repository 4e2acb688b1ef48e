use std::sync::Arc;
use std::time::Duration;

use serenity::all::{
    Command, CommandInteraction, ComponentInteraction, ConnectionStage, Context,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    EventHandler, GuildId, Interaction, Ready, ResumedEvent, ShardStageUpdateEvent,
};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::config::{PARTICIPATE_BUTTON_ID, REPLY_TTL_SECS};
use crate::discord::commands::{self, StartOptions, END_COMMAND, START_COMMAND};
use crate::error::GiveawayError;
use crate::giveaway::ControllerHandle;
use crate::types::ParticipantId;

/// Gateway event handler: registers commands and routes interactions to the controller.
pub struct Handler {
    controller: ControllerHandle,
    health: Arc<HealthState>,
    guild_id: Option<GuildId>,
}

impl Handler {
    pub fn new(controller: ControllerHandle, health: Arc<HealthState>, guild_id: Option<u64>) -> Self {
        Self {
            controller,
            health,
            guild_id: guild_id.map(GuildId::new),
        }
    }

    async fn register_commands(&self, ctx: &Context) {
        let result = match self.guild_id {
            Some(guild_id) => guild_id
                .set_commands(&ctx.http, commands::definitions())
                .await
                .map(|c| c.len()),
            None => Command::set_global_commands(&ctx.http, commands::definitions())
                .await
                .map(|c| c.len()),
        };
        match result {
            Ok(count) => info!(guild = ?self.guild_id, "[DISCORD] registered {count} slash commands"),
            Err(e) => error!("[DISCORD] failed to register slash commands: {e}"),
        }
    }

    async fn on_command(&self, ctx: &Context, command: &CommandInteraction) {
        let name = command.data.name.as_str();
        if name != START_COMMAND && name != END_COMMAND {
            return;
        }

        let is_admin = command
            .member
            .as_ref()
            .and_then(|m| m.permissions)
            .is_some_and(|p| p.administrator());
        if !is_admin {
            debug!(user = %command.user.id, command = name, "[DISCORD] command denied");
            reply_ephemeral(ctx, command, &GiveawayError::PermissionDenied.to_string()).await;
            return;
        }

        if let Err(e) = command.defer_ephemeral(&ctx.http).await {
            warn!("[DISCORD] failed to defer /{name} reply: {e}");
            return;
        }

        let (text, started) = if name == START_COMMAND {
            let outcome = match StartOptions::from_options(&command.data.options).into_request() {
                Ok(request) => self.controller.start(request).await,
                Err(e) => Err(e),
            };
            (command_reply(name, &outcome), outcome.is_ok())
        } else {
            (command_reply(name, &self.controller.force_end().await), false)
        };

        if let Err(e) = command
            .edit_response(&ctx.http, EditInteractionResponse::new().content(text))
            .await
        {
            warn!("[DISCORD] failed to answer /{name}: {e}");
            return;
        }

        if started {
            let http = Arc::clone(&ctx.http);
            let command = command.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(REPLY_TTL_SECS)).await;
                if let Err(e) = command.delete_response(&http).await {
                    debug!("[DISCORD] failed to delete command reply: {e}");
                }
            });
        }
    }

    async fn on_participate(&self, ctx: &Context, component: &ComponentInteraction) {
        if let Err(e) = component.defer_ephemeral(&ctx.http).await {
            warn!("[DISCORD] failed to defer participate reply: {e}");
            return;
        }

        let participant = ParticipantId::new(component.user.id.get().to_string());
        let text = match self.controller.join(participant).await {
            Ok(joined) => format!(
                "You are taking part in the giveaway! Participants so far: {}",
                joined.participant_count
            ),
            Err(e) => e.to_string(),
        };
        if let Err(e) = component
            .edit_response(&ctx.http, EditInteractionResponse::new().content(text))
            .await
        {
            warn!("[DISCORD] failed to answer participate: {e}");
            return;
        }

        let http = Arc::clone(&ctx.http);
        let component = component.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(REPLY_TTL_SECS)).await;
            if let Err(e) = component.delete_response(&http).await {
                debug!("[DISCORD] failed to delete participate reply: {e}");
            }
        });
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "[DISCORD] connected");
        self.health.set_gateway_connected(true);
        self.register_commands(&ctx).await;
    }

    async fn resume(&self, _ctx: Context, _: ResumedEvent) {
        info!("[DISCORD] session resumed");
        self.health.set_gateway_connected(true);
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        debug!(shard = ?event.shard_id, "[DISCORD] shard stage {:?} -> {:?}", event.old, event.new);
        self.health.set_gateway_connected(event.new == ConnectionStage::Connected);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.on_command(&ctx, &command).await,
            Interaction::Component(component) if component.data.custom_id == PARTICIPATE_BUTTON_ID => {
                self.on_participate(&ctx, &component).await;
            }
            _ => {}
        }
    }
}

async fn reply_ephemeral(ctx: &Context, command: &CommandInteraction, text: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    );
    if let Err(e) = command.create_response(&ctx.http, response).await {
        warn!("[DISCORD] failed to reply to /{}: {e}", command.data.name);
    }
}

/// Text shown to the admin once the controller has answered an admin command.
fn command_reply<T>(name: &str, outcome: &Result<T, GiveawayError>) -> String {
    match outcome {
        Ok(_) if name == START_COMMAND => "A new giveaway has started!".to_string(),
        Ok(_) => "The giveaway has ended!".to_string(),
        Err(e) => e.to_string(),
    }
}
