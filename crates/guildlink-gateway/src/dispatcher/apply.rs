//! Cache effect of each event kind

use guildlink_cache::Snapshot;

use crate::events::GatewayEvent;

/// Apply one event to a snapshot; returns whether the kind touches the cache
pub fn apply_event(snapshot: &mut Snapshot, event: GatewayEvent) -> bool {
    match event {
        // === Session ===
        GatewayEvent::Ready(ready) => snapshot.apply_full_sync(*ready),
        GatewayEvent::ReadySupplemental(supplemental) => {
            let merged = supplemental.merged_presences;
            snapshot.replace_presences(merged.guilds.into_iter().flatten().chain(merged.friends));
        }
        GatewayEvent::Resumed => return false,

        // === Guilds ===
        GatewayEvent::GuildCreate(payload) => snapshot.upsert_guild(*payload),
        GatewayEvent::GuildUpdate(update) => snapshot.merge_guild_update(update),
        GatewayEvent::GuildDelete(guild) => {
            snapshot.remove_guild(guild.id);
        }

        // === Channels and threads ===
        GatewayEvent::ChannelCreate(channel) | GatewayEvent::ThreadCreate(channel) => {
            snapshot.insert_channel(channel);
        }
        GatewayEvent::ChannelUpdate(channel) | GatewayEvent::ThreadUpdate(channel) => {
            snapshot.replace_channel(channel);
        }
        GatewayEvent::ChannelDelete(channel) | GatewayEvent::ThreadDelete(channel) => {
            snapshot.remove_channel(channel.id);
        }

        // === Messages ===
        GatewayEvent::MessageCreate(message) => snapshot.push_message(message),
        GatewayEvent::MessageUpdate(update) => {
            snapshot.update_message(&update);
        }
        GatewayEvent::MessageDelete(delete) => {
            snapshot.remove_message(delete.channel_id, delete.id);
        }

        // === Members ===
        GatewayEvent::GuildMemberAdd(member) | GatewayEvent::GuildMemberUpdate(member) => {
            snapshot.upsert_member(member);
        }
        GatewayEvent::GuildMemberRemove(removed) => {
            snapshot.remove_member(removed.guild_id, removed.user.id);
        }

        // === Users and presence ===
        GatewayEvent::PresenceUpdate(presence) => snapshot.upsert_presence(presence),
        GatewayEvent::UserUpdate(user) => snapshot.set_current_user(user),
        GatewayEvent::UserSettingsUpdate(patch) => snapshot.merge_user_settings(patch),

        // Notify only
        GatewayEvent::TypingStart(_) | GatewayEvent::Unknown(_) => return false,
    }
    true
}
