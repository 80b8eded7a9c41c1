//! Chat commands: the closed set the bot understands and the table that
//! declares how each one is gated.

use crate::infrastructure::ports::Permission;

/// Where a command may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Anywhere,
    /// The verification channel of a server, or a direct message.
    VerificationOrDirect,
    /// The admin channel of a server.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    Ping,
    Key,
    Guild,
    Audit,
    Servers,
    Worlds,
    Refresh,
    Purge,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldsAction {
    List,
    Add(String),
    Remove(String),
}

/// A parsed command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Key { api_key: String },
    Guild { query: Option<String> },
    Audit,
    Servers,
    Worlds(WorldsAction),
    Refresh,
    Purge { preset: Option<String> },
    Debug,
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: CommandName,
    pub names: &'static [&'static str],
    pub usage: &'static str,
    /// What the command does, phrased to follow "to".
    pub summary: &'static str,
    pub gate: Gate,
    pub permission: Option<Permission>,
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: CommandName::Ping,
        names: &["ping"],
        usage: "ping",
        summary: "check the bot is alive",
        gate: Gate::Anywhere,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Key,
        names: &["key", "verify"],
        usage: "key <apiKey>",
        summary: "link your Guild Wars 2 account",
        gate: Gate::VerificationOrDirect,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Guild,
        names: &["guild"],
        usage: "guild [name]",
        summary: "show or set the tracked guild",
        gate: Gate::Admin,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Audit,
        names: &["audit"],
        usage: "audit",
        summary: "report every member's guild and world",
        gate: Gate::Admin,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Servers,
        names: &["servers"],
        usage: "servers",
        summary: "list the servers the bot is in",
        gate: Gate::Admin,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Worlds,
        names: &["worlds"],
        usage: "worlds [add|remove <world name>]",
        summary: "manage world roles",
        gate: Gate::Admin,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Refresh,
        names: &["refresh"],
        usage: "refresh",
        summary: "update every registered member's roles",
        gate: Gate::Admin,
        permission: None,
    },
    CommandSpec {
        name: CommandName::Purge,
        names: &["purge"],
        usage: "purge [preset]",
        summary: "purge accounts",
        gate: Gate::Admin,
        permission: Some(Permission::KickMembers),
    },
    CommandSpec {
        name: CommandName::Debug,
        names: &["debug"],
        usage: "debug",
        summary: "show diagnostic information",
        gate: Gate::Admin,
        permission: None,
    },
];

/// Find the command `content` invokes, returning it with its raw arguments.
///
/// `None` for anything that is not a known command.
pub fn lookup<'a>(prefix: &str, content: &'a str) -> Option<(&'static CommandSpec, Vec<&'a str>)> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let invoked = words.next()?;
    let spec = COMMANDS
        .iter()
        .find(|spec| spec.names.iter().any(|n| n.eq_ignore_ascii_case(invoked)))?;
    Some((spec, words.collect()))
}

impl CommandSpec {
    /// Build the command from its arguments; `None` on a wrong argument count.
    pub fn build(&self, args: &[&str]) -> Option<Command> {
        let joined = || args.join(" ");
        match self.name {
            CommandName::Ping => Some(Command::Ping),
            CommandName::Key => match args {
                [key] => Some(Command::Key {
                    api_key: key.to_string(),
                }),
                _ => None,
            },
            CommandName::Guild => Some(Command::Guild {
                query: (!args.is_empty()).then(joined),
            }),
            CommandName::Audit => args.is_empty().then_some(Command::Audit),
            CommandName::Servers => args.is_empty().then_some(Command::Servers),
            CommandName::Refresh => args.is_empty().then_some(Command::Refresh),
            CommandName::Debug => args.is_empty().then_some(Command::Debug),
            CommandName::Worlds => match args {
                [] => Some(Command::Worlds(WorldsAction::List)),
                [action, name @ ..] if !name.is_empty() => {
                    let name = name.join(" ");
                    if action.eq_ignore_ascii_case("add") {
                        Some(Command::Worlds(WorldsAction::Add(name)))
                    } else if action.eq_ignore_ascii_case("remove") {
                        Some(Command::Worlds(WorldsAction::Remove(name)))
                    } else {
                        None
                    }
                }
                _ => None,
            },
            CommandName::Purge => match args {
                [] => Some(Command::Purge { preset: None }),
                [preset] => Some(Command::Purge {
                    preset: Some(preset.to_string()),
                }),
                _ => None,
            },
        }
    }

    /// Reply for a wrong argument count.
    pub fn usage_reply(&self, prefix: &str) -> String {
        format!("Invalid command\nUsage: {prefix}{}", self.usage)
    }
}
