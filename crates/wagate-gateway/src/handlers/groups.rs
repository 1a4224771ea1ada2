// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group routes. Every route requires a Connected session.

use axum::Json;
use axum::extract::{Path, State};
use wagate_core::{ChatAddress, GroupCommand, GroupInfo, GroupOutcome, SessionStatus, WagateError};

use super::ApiResult;
use crate::dto::{
    ActionResponse, AnnounceRequest, CreateGroupRequest, DisappearingRequest, GroupList,
    GroupQuery, GroupRef, InviteCode, InviteLink, JoinedGroup, LockedRequest, NameRequest,
    ParticipantResults, ParticipantsRequest, PhotoRequest, PictureSet, TopicRequest,
};
use crate::extract::{ApiJson, ApiQuery};
use crate::server::AppState;

fn parse_participants(raw: &[String]) -> Result<Vec<ChatAddress>, WagateError> {
    raw.iter().map(|p| p.parse()).collect()
}

fn unexpected(command: &str, outcome: &GroupOutcome) -> WagateError {
    WagateError::Internal(format!(
        "group command `{command}` returned unexpected outcome {outcome:?}"
    ))
}

async fn run(state: &AppState, id: &str, command: GroupCommand) -> Result<GroupOutcome, WagateError> {
    state.runtime.group(id, command).await
}

async fn run_info(state: &AppState, id: &str, command: GroupCommand) -> ApiResult<Json<GroupInfo>> {
    let name = command.name();
    match run(state, id, command).await? {
        GroupOutcome::Info(info) => Ok(Json(info)),
        other => Err(unexpected(name, &other).into()),
    }
}

async fn run_link(state: &AppState, id: &str, command: GroupCommand) -> ApiResult<Json<InviteLink>> {
    let name = command.name();
    match run(state, id, command).await? {
        GroupOutcome::InviteLink(link) => Ok(Json(InviteLink { link })),
        other => Err(unexpected(name, &other).into()),
    }
}

async fn run_action(
    state: &AppState,
    id: &str,
    command: GroupCommand,
    message: &str,
) -> ApiResult<Json<ActionResponse>> {
    let name = command.name();
    match run(state, id, command).await? {
        GroupOutcome::Done => Ok(Json(ActionResponse::new(
            id,
            SessionStatus::Connected,
            message,
        ))),
        other => Err(unexpected(name, &other).into()),
    }
}

/// GET /sessions/{id}/groups/list
pub async fn list_groups(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<GroupList>> {
    match run(&state, &id, GroupCommand::List).await? {
        GroupOutcome::Groups(groups) => Ok(Json(GroupList { groups })),
        other => Err(unexpected("list", &other).into()),
    }
}

/// GET /sessions/{id}/groups/info?groupJid=
pub async fn group_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<GroupQuery>,
) -> ApiResult<Json<GroupInfo>> {
    let group = ChatAddress::parse_group(&query.group_jid)?;
    run_info(&state, &id, GroupCommand::Info { group }).await
}

/// POST /sessions/{id}/groups/invite-info
pub async fn invite_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<InviteCode>,
) -> ApiResult<Json<GroupInfo>> {
    run_info(&state, &id, GroupCommand::InviteInfo { code: req.code }).await
}

/// GET /sessions/{id}/groups/invite-link?groupJid=
pub async fn get_invite_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<GroupQuery>,
) -> ApiResult<Json<InviteLink>> {
    let group = ChatAddress::parse_group(&query.group_jid)?;
    run_link(&state, &id, GroupCommand::GetInviteLink { group }).await
}

/// DELETE /sessions/{id}/groups/invite-link?groupJid=
///
/// Revokes the current link and returns its replacement.
pub async fn revoke_invite_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<GroupQuery>,
) -> ApiResult<Json<InviteLink>> {
    let group = ChatAddress::parse_group(&query.group_jid)?;
    run_link(&state, &id, GroupCommand::RevokeInviteLink { group }).await
}

/// POST /sessions/{id}/groups/join
pub async fn join_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<InviteCode>,
) -> ApiResult<Json<JoinedGroup>> {
    match run(&state, &id, GroupCommand::Join { code: req.code }).await? {
        GroupOutcome::Joined { group_jid } => Ok(Json(JoinedGroup { group_jid })),
        other => Err(unexpected("join", &other).into()),
    }
}

/// POST /sessions/{id}/groups/create
pub async fn create_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<Json<GroupInfo>> {
    let participants = parse_participants(&req.participants)?;
    run_info(
        &state,
        &id,
        GroupCommand::Create {
            name: req.name,
            participants,
        },
    )
    .await
}

/// POST /sessions/{id}/groups/leave
pub async fn leave_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<GroupRef>,
) -> ApiResult<Json<ActionResponse>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    run_action(&state, &id, GroupCommand::Leave { group }, "left group").await
}

/// POST /sessions/{id}/groups/participants
pub async fn update_participants(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ParticipantsRequest>,
) -> ApiResult<Json<ParticipantResults>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let participants = parse_participants(&req.participants)?;
    let command = GroupCommand::UpdateParticipants {
        group,
        participants,
        action: req.action,
    };
    match run(&state, &id, command).await? {
        GroupOutcome::Participants(participants) => Ok(Json(ParticipantResults { participants })),
        other => Err(unexpected("participants", &other).into()),
    }
}

/// POST /sessions/{id}/groups/name
pub async fn set_name(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<NameRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let command = GroupCommand::SetName {
        group,
        name: req.name,
    };
    run_action(&state, &id, command, "group name updated").await
}

/// POST /sessions/{id}/groups/topic
pub async fn set_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TopicRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let command = GroupCommand::SetTopic {
        group,
        topic: req.topic,
    };
    run_action(&state, &id, command, "group topic updated").await
}

/// POST /sessions/{id}/groups/photo
pub async fn set_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PhotoRequest>,
) -> ApiResult<Json<PictureSet>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let command = GroupCommand::SetPhoto {
        group,
        image: req.image,
    };
    match run(&state, &id, command).await? {
        GroupOutcome::PictureId(picture_id) => Ok(Json(PictureSet { picture_id })),
        other => Err(unexpected("set_photo", &other).into()),
    }
}

/// POST /sessions/{id}/groups/settings/locked
pub async fn set_locked(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<LockedRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let command = GroupCommand::SetLocked {
        group,
        locked: req.locked,
    };
    run_action(&state, &id, command, "group locked setting updated").await
}

/// POST /sessions/{id}/groups/settings/announce
pub async fn set_announce(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AnnounceRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let command = GroupCommand::SetAnnounce {
        group,
        announce: req.announce,
    };
    run_action(&state, &id, command, "group announce setting updated").await
}

/// POST /sessions/{id}/groups/settings/disappearing
pub async fn set_disappearing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<DisappearingRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let group = ChatAddress::parse_group(&req.group_jid)?;
    let command = GroupCommand::SetDisappearing {
        group,
        duration: req.duration,
    };
    run_action(&state, &id, command, "disappearing timer updated").await
}
