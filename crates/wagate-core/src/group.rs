// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group management commands and their outcomes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::address::ChatAddress;
use crate::error::WagateError;
use crate::message::Media;

/// Disappearing-message timers the remote network accepts, in seconds.
pub const DISAPPEARING_TIMERS: [u32; 4] = [0, 86_400, 604_800, 7_776_000];

/// Maximum group name length, in characters.
pub const MAX_GROUP_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantAction {
    Add,
    Remove,
    Promote,
    Demote,
}

/// A group operation forwarded to the session's remote client.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupCommand {
    List,
    Info { group: ChatAddress },
    InviteInfo { code: String },
    GetInviteLink { group: ChatAddress },
    RevokeInviteLink { group: ChatAddress },
    Join { code: String },
    Create { name: String, participants: Vec<ChatAddress> },
    Leave { group: ChatAddress },
    UpdateParticipants {
        group: ChatAddress,
        participants: Vec<ChatAddress>,
        action: ParticipantAction,
    },
    SetName { group: ChatAddress, name: String },
    SetTopic { group: ChatAddress, topic: String },
    SetPhoto { group: ChatAddress, image: Media },
    SetLocked { group: ChatAddress, locked: bool },
    SetAnnounce { group: ChatAddress, announce: bool },
    SetDisappearing { group: ChatAddress, duration: u32 },
}

fn validate_group_name(name: &str) -> Result<(), WagateError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_GROUP_NAME_LEN {
        return Err(WagateError::Validation(format!(
            "name must be between 1 and {MAX_GROUP_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_participants(participants: &[ChatAddress]) -> Result<(), WagateError> {
    if participants.is_empty() {
        return Err(WagateError::Validation(
            "participants must contain at least one address".to_string(),
        ));
    }
    if participants.iter().any(ChatAddress::is_group) {
        return Err(WagateError::Validation(
            "participants must be user addresses".to_string(),
        ));
    }
    Ok(())
}

impl GroupCommand {
    /// Operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GroupCommand::List => "list",
            GroupCommand::Info { .. } => "info",
            GroupCommand::InviteInfo { .. } => "invite_info",
            GroupCommand::GetInviteLink { .. } => "get_invite_link",
            GroupCommand::RevokeInviteLink { .. } => "revoke_invite_link",
            GroupCommand::Join { .. } => "join",
            GroupCommand::Create { .. } => "create",
            GroupCommand::Leave { .. } => "leave",
            GroupCommand::UpdateParticipants { .. } => "participants",
            GroupCommand::SetName { .. } => "set_name",
            GroupCommand::SetTopic { .. } => "set_topic",
            GroupCommand::SetPhoto { .. } => "set_photo",
            GroupCommand::SetLocked { .. } => "set_locked",
            GroupCommand::SetAnnounce { .. } => "set_announce",
            GroupCommand::SetDisappearing { .. } => "set_disappearing",
        }
    }

    pub fn validate(&self) -> Result<(), WagateError> {
        match self {
            GroupCommand::InviteInfo { code } | GroupCommand::Join { code } => {
                if code.trim().is_empty() {
                    return Err(WagateError::Validation("code must not be empty".to_string()));
                }
                Ok(())
            }
            GroupCommand::Create { name, participants } => {
                validate_group_name(name)?;
                validate_participants(participants)
            }
            GroupCommand::UpdateParticipants { participants, .. } => {
                validate_participants(participants)
            }
            GroupCommand::SetName { name, .. } => validate_group_name(name),
            GroupCommand::SetPhoto { image, .. } => image.validate("image"),
            GroupCommand::SetDisappearing { duration, .. } => {
                if !DISAPPEARING_TIMERS.contains(duration) {
                    return Err(WagateError::Validation(format!(
                        "duration must be one of {DISAPPEARING_TIMERS:?}"
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupParticipant {
    pub jid: String,
    pub is_admin: bool,
    pub is_super_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_jid: String,
    pub name: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub participants: Vec<GroupParticipant>,
    pub announce: bool,
    pub locked: bool,
    pub disappearing_timer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Per-participant result of an add/remove/promote/demote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantChange {
    pub jid: String,
    pub status: String,
}

/// Result of a [`GroupCommand`].
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome {
    Groups(Vec<GroupInfo>),
    Info(GroupInfo),
    InviteLink(String),
    Joined { group_jid: String },
    Participants(Vec<ParticipantChange>),
    PictureId(String),
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> ChatAddress {
        "120363000000000001@g.us".parse().unwrap()
    }

    #[test]
    fn disappearing_timer_must_be_known() {
        let ok = GroupCommand::SetDisappearing {
            group: group(),
            duration: 604_800,
        };
        assert!(ok.validate().is_ok());
        let bad = GroupCommand::SetDisappearing {
            group: group(),
            duration: 3600,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn create_requires_user_participants() {
        let cmd = GroupCommand::Create {
            name: "team".into(),
            participants: vec![],
        };
        assert!(cmd.validate().is_err());
        let cmd = GroupCommand::Create {
            name: "team".into(),
            participants: vec![group()],
        };
        assert!(cmd.validate().is_err());
        let cmd = GroupCommand::Create {
            name: "team".into(),
            participants: vec!["5511999999999".parse().unwrap()],
        };
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn group_name_bounds() {
        let long = GroupCommand::SetName {
            group: group(),
            name: "n".repeat(101),
        };
        assert!(long.validate().is_err());
        assert_eq!(long.name(), "set_name");
    }

    #[test]
    fn group_info_is_camel_case() {
        let info = GroupInfo {
            group_jid: "1@g.us".into(),
            name: "n".into(),
            topic: String::new(),
            owner: None,
            participants: vec![GroupParticipant {
                jid: "2@s.whatsapp.net".into(),
                is_admin: true,
                is_super_admin: false,
            }],
            announce: false,
            locked: false,
            disappearing_timer: 0,
            created_at: None,
        };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["groupJid"], "1@g.us");
        assert_eq!(v["participants"][0]["isAdmin"], true);
        assert_eq!(v["disappearingTimer"], 0);
    }
}
