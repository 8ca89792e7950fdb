//! Test fixtures and data generators
//!
//! Gateway payloads and REST bodies shared by the integration tests.

use serde_json::{json, Value};

pub const GUILD_ID: &str = "81384788765712384";
pub const CHANNEL_ID: &str = "81384788765712385";
pub const SESSION_ID: &str = "integration-session";

/// READY for one guild with one text channel and one member
pub fn ready_payload(resume_gateway_url: &str) -> Value {
    json!({
        "v": 9,
        "session_id": SESSION_ID,
        "resume_gateway_url": resume_gateway_url,
        "user": { "id": "1", "username": "tester" },
        "guilds": [{
            "id": GUILD_ID,
            "name": "Integration",
            "member_count": 2,
            "channels": [{ "id": CHANNEL_ID, "type": 0, "name": "general" }],
            "members": [{ "user": { "id": "1", "username": "tester" } }]
        }],
        "presences": [{ "user": { "id": "2" }, "status": "online" }]
    })
}

pub fn message_create(id: &str, content: &str) -> Value {
    json!({ "id": id, "channel_id": CHANNEL_ID, "content": content })
}

/// REST body for `GET /guilds/{id}`
pub fn guild_body(name: &str) -> Value {
    json!({ "id": GUILD_ID, "name": name, "owner_id": "1", "premium_tier": 2 })
}

/// REST body for `GET /guilds/{id}/channels`, second element malformed
pub fn channels_body() -> Value {
    json!([
        { "id": "900", "type": 0, "name": "announcements" },
        { "id": "not-a-snowflake", "type": 0 },
        { "id": "901", "type": 2, "name": "voice" }
    ])
}

/// REST body for `GET /guilds/{id}/roles`
pub fn roles_body() -> Value {
    json!([
        { "id": GUILD_ID, "name": "@everyone", "permissions": "104324673" },
        { "id": "700", "name": "mods", "color": 3447003, "hoist": true }
    ])
}
