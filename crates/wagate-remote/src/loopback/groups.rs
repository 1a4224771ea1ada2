// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory group directory shared by every loopback account.

use std::collections::{BTreeMap, HashMap};

use wagate_core::group::{GroupParticipant, ParticipantAction, ParticipantChange};
use wagate_core::types::now_timestamp;
use wagate_core::{ChatAddress, GroupCommand, GroupInfo, GroupOutcome, WagateError};

const INVITE_PREFIX: &str = "https://chat.whatsapp.com/";

struct GroupEntry {
    info: GroupInfo,
    invite_code: String,
}

impl GroupEntry {
    fn member(&self, jid: &str) -> Option<&GroupParticipant> {
        self.info.participants.iter().find(|p| p.jid == jid)
    }

    fn is_admin(&self, jid: &str) -> bool {
        self.member(jid).is_some_and(|p| p.is_admin || p.is_super_admin)
    }
}

#[derive(Default)]
pub(crate) struct GroupDirectory {
    groups: BTreeMap<String, GroupEntry>,
    invites: HashMap<String, String>,
    seq: u64,
}

fn new_invite_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..22].to_string()
}

fn group_not_found(jid: &str) -> WagateError {
    WagateError::NotFound {
        entity: "group",
        id: jid.to_string(),
    }
}

impl GroupDirectory {
    /// Place a group in the directory and return its invite code.
    pub(crate) fn insert(&mut self, info: GroupInfo) -> String {
        let code = new_invite_code();
        self.invites.insert(code.clone(), info.group_jid.clone());
        self.groups.insert(
            info.group_jid.clone(),
            GroupEntry {
                info,
                invite_code: code.clone(),
            },
        );
        code
    }

    fn next_jid(&mut self) -> String {
        self.seq += 1;
        format!("1203630000{:08}@g.us", self.seq)
    }

    fn entry(&self, group: &ChatAddress) -> Result<&GroupEntry, WagateError> {
        let jid = group.to_string();
        self.groups.get(&jid).ok_or_else(|| group_not_found(&jid))
    }

    /// Look a group up for `me`, which must be a participant.
    fn member_entry(&mut self, group: &ChatAddress, me: &str) -> Result<&mut GroupEntry, WagateError> {
        let jid = group.to_string();
        match self.groups.get_mut(&jid) {
            Some(entry) if entry.member(me).is_some() => Ok(entry),
            _ => Err(group_not_found(&jid)),
        }
    }

    fn admin_entry(&mut self, group: &ChatAddress, me: &str) -> Result<&mut GroupEntry, WagateError> {
        let entry = self.member_entry(group, me)?;
        if !entry.is_admin(me) {
            return Err(WagateError::upstream("not a group admin"));
        }
        Ok(entry)
    }

    fn by_code(&self, code: &str) -> Result<&GroupEntry, WagateError> {
        let code = code.trim().trim_start_matches(INVITE_PREFIX);
        self.invites
            .get(code)
            .and_then(|jid| self.groups.get(jid))
            .ok_or_else(|| WagateError::NotFound {
                entity: "invite",
                id: code.to_string(),
            })
    }

    /// Execute a group command on behalf of the account `me`.
    pub(crate) fn apply(
        &mut self,
        me: &str,
        command: GroupCommand,
    ) -> Result<GroupOutcome, WagateError> {
        match command {
            GroupCommand::List => Ok(GroupOutcome::Groups(
                self.groups
                    .values()
                    .filter(|g| g.member(me).is_some())
                    .map(|g| g.info.clone())
                    .collect(),
            )),
            GroupCommand::Info { group } => {
                let entry = self.entry(&group)?;
                if entry.member(me).is_none() {
                    return Err(group_not_found(&entry.info.group_jid));
                }
                Ok(GroupOutcome::Info(entry.info.clone()))
            }
            GroupCommand::InviteInfo { code } => {
                Ok(GroupOutcome::Info(self.by_code(&code)?.info.clone()))
            }
            GroupCommand::GetInviteLink { group } => {
                let entry = self.admin_entry(&group, me)?;
                Ok(GroupOutcome::InviteLink(format!(
                    "{INVITE_PREFIX}{}",
                    entry.invite_code
                )))
            }
            GroupCommand::RevokeInviteLink { group } => {
                let code = new_invite_code();
                let entry = self.admin_entry(&group, me)?;
                let old = std::mem::replace(&mut entry.invite_code, code.clone());
                let jid = entry.info.group_jid.clone();
                self.invites.remove(&old);
                self.invites.insert(code.clone(), jid);
                Ok(GroupOutcome::InviteLink(format!("{INVITE_PREFIX}{code}")))
            }
            GroupCommand::Join { code } => {
                let jid = self.by_code(&code)?.info.group_jid.clone();
                if let Some(entry) = self.groups.get_mut(&jid)
                    && entry.member(me).is_none()
                {
                    entry.info.participants.push(GroupParticipant {
                        jid: me.to_string(),
                        is_admin: false,
                        is_super_admin: false,
                    });
                }
                Ok(GroupOutcome::Joined { group_jid: jid })
            }
            GroupCommand::Create { name, participants } => {
                let jid = self.next_jid();
                let mut members = vec![GroupParticipant {
                    jid: me.to_string(),
                    is_admin: true,
                    is_super_admin: true,
                }];
                for p in participants {
                    let p = p.to_string();
                    if !members.iter().any(|m| m.jid == p) {
                        members.push(GroupParticipant {
                            jid: p,
                            is_admin: false,
                            is_super_admin: false,
                        });
                    }
                }
                let info = GroupInfo {
                    group_jid: jid,
                    name,
                    topic: String::new(),
                    owner: Some(me.to_string()),
                    participants: members,
                    announce: false,
                    locked: false,
                    disappearing_timer: 0,
                    created_at: Some(now_timestamp()),
                };
                self.insert(info.clone());
                Ok(GroupOutcome::Info(info))
            }
            GroupCommand::Leave { group } => {
                let entry = self.member_entry(&group, me)?;
                entry.info.participants.retain(|p| p.jid != me);
                Ok(GroupOutcome::Done)
            }
            GroupCommand::UpdateParticipants {
                group,
                participants,
                action,
            } => {
                let entry = self.admin_entry(&group, me)?;
                let changes = participants
                    .iter()
                    .map(|p| {
                        let jid = p.to_string();
                        let status = update_participant(&mut entry.info.participants, &jid, action);
                        ParticipantChange {
                            jid,
                            status: status.to_string(),
                        }
                    })
                    .collect();
                Ok(GroupOutcome::Participants(changes))
            }
            GroupCommand::SetName { group, name } => {
                self.admin_entry(&group, me)?.info.name = name;
                Ok(GroupOutcome::Done)
            }
            GroupCommand::SetTopic { group, topic } => {
                self.admin_entry(&group, me)?.info.topic = topic;
                Ok(GroupOutcome::Done)
            }
            GroupCommand::SetPhoto { group, .. } => {
                self.admin_entry(&group, me)?;
                self.seq += 1;
                Ok(GroupOutcome::PictureId(format!("{}", 1_700_000_000 + self.seq)))
            }
            GroupCommand::SetLocked { group, locked } => {
                self.admin_entry(&group, me)?.info.locked = locked;
                Ok(GroupOutcome::Done)
            }
            GroupCommand::SetAnnounce { group, announce } => {
                self.admin_entry(&group, me)?.info.announce = announce;
                Ok(GroupOutcome::Done)
            }
            GroupCommand::SetDisappearing { group, duration } => {
                self.admin_entry(&group, me)?.info.disappearing_timer = duration;
                Ok(GroupOutcome::Done)
            }
        }
    }
}

/// Apply one participant change, returning a protocol-style status code.
fn update_participant(
    members: &mut Vec<GroupParticipant>,
    jid: &str,
    action: ParticipantAction,
) -> &'static str {
    let position = members.iter().position(|m| m.jid == jid);
    match (action, position) {
        (ParticipantAction::Add, Some(_)) => "409",
        (ParticipantAction::Add, None) => {
            members.push(GroupParticipant {
                jid: jid.to_string(),
                is_admin: false,
                is_super_admin: false,
            });
            "200"
        }
        (ParticipantAction::Remove, Some(i)) => {
            members.remove(i);
            "200"
        }
        (ParticipantAction::Promote, Some(i)) => {
            members[i].is_admin = true;
            "200"
        }
        (ParticipantAction::Demote, Some(i)) => {
            members[i].is_admin = false;
            "200"
        }
        (_, None) => "404",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "551100000001@s.whatsapp.net";
    const OTHER: &str = "551100000002@s.whatsapp.net";

    fn addr(s: &str) -> ChatAddress {
        s.parse().unwrap()
    }

    fn create(dir: &mut GroupDirectory) -> GroupInfo {
        match dir
            .apply(
                ME,
                GroupCommand::Create {
                    name: "team".into(),
                    participants: vec![addr(OTHER)],
                },
            )
            .unwrap()
        {
            GroupOutcome::Info(info) => info,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn creator_is_super_admin() {
        let mut dir = GroupDirectory::default();
        let info = create(&mut dir);
        assert!(info.group_jid.ends_with("@g.us"));
        assert_eq!(info.participants.len(), 2);
        assert!(info.participants[0].is_super_admin);
        assert_eq!(info.owner.as_deref(), Some(ME));
    }

    #[test]
    fn revoked_invite_no_longer_resolves() {
        let mut dir = GroupDirectory::default();
        let info = create(&mut dir);
        let group = addr(&info.group_jid);
        let GroupOutcome::InviteLink(old) = dir
            .apply(ME, GroupCommand::GetInviteLink { group: group.clone() })
            .unwrap()
        else {
            panic!("expected link");
        };
        let GroupOutcome::InviteLink(new) = dir
            .apply(ME, GroupCommand::RevokeInviteLink { group })
            .unwrap()
        else {
            panic!("expected link");
        };
        assert_ne!(old, new);
        assert!(dir.apply(OTHER, GroupCommand::InviteInfo { code: old }).is_err());
        assert!(dir.apply(OTHER, GroupCommand::InviteInfo { code: new }).is_ok());
    }

    #[test]
    fn participant_statuses() {
        let mut dir = GroupDirectory::default();
        let info = create(&mut dir);
        let outcome = dir
            .apply(
                ME,
                GroupCommand::UpdateParticipants {
                    group: addr(&info.group_jid),
                    participants: vec![addr(OTHER), addr("551100000003@s.whatsapp.net")],
                    action: ParticipantAction::Add,
                },
            )
            .unwrap();
        let GroupOutcome::Participants(changes) = outcome else {
            panic!("expected participants");
        };
        assert_eq!(changes[0].status, "409");
        assert_eq!(changes[1].status, "200");
    }

    #[test]
    fn non_admin_cannot_rename() {
        let mut dir = GroupDirectory::default();
        let info = create(&mut dir);
        let err = dir
            .apply(
                OTHER,
                GroupCommand::SetName {
                    group: addr(&info.group_jid),
                    name: "mine".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, WagateError::Upstream { .. }));
    }

    #[test]
    fn leave_then_list_is_empty() {
        let mut dir = GroupDirectory::default();
        let info = create(&mut dir);
        dir.apply(OTHER, GroupCommand::Leave { group: addr(&info.group_jid) })
            .unwrap();
        let GroupOutcome::Groups(groups) = dir.apply(OTHER, GroupCommand::List).unwrap() else {
            panic!("expected groups");
        };
        assert!(groups.is_empty());
    }
}
