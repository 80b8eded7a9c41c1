use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::GuildId;

/// An in-game guild a chat server can track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub tag: String,
    pub name: String,
}

impl Guild {
    /// Name of the chat role granted to members of this guild.
    pub fn role_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Guild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.tag, self.name)
    }
}

/// Per chat-server configuration. A server tracks zero or one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub guild: Option<Guild>,
}

impl ServerConfig {
    /// Configuration for a server nobody has configured yet.
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guild: None,
        }
    }

    pub fn with_guild(mut self, guild: Option<Guild>) -> Self {
        self.guild = guild;
        self
    }

    pub fn tracked_guild(&self) -> Option<&Guild> {
        self.guild.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_display_shows_tag() {
        let guild = Guild {
            id: GuildId::new("abc").unwrap(),
            tag: "RAID".into(),
            name: "Raiders of the Lost Ark".into(),
        };
        assert_eq!(guild.to_string(), "[RAID] Raiders of the Lost Ark");
        assert_eq!(guild.role_name(), "Raiders of the Lost Ark");
    }

    #[test]
    fn with_guild_only_touches_guild() {
        let config = ServerConfig::unconfigured("My Server");
        let guild = Guild {
            id: GuildId::new("abc").unwrap(),
            tag: "T".into(),
            name: "G".into(),
        };
        let updated = config.with_guild(Some(guild.clone()));
        assert_eq!(updated.name, "My Server");
        assert_eq!(updated.tracked_guild(), Some(&guild));
    }
}
