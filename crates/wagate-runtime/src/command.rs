// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages accepted by a session supervisor's inbox.

use tokio::sync::oneshot;
use wagate_core::{ChatAddress, GroupCommand, GroupOutcome, MessageBody, SendReceipt, WagateError};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, WagateError>>;

pub(crate) enum Command {
    Connect { reply: Reply<()> },
    Disconnect { reply: Reply<()> },
    Logout { reply: Reply<()> },
    Send {
        to: ChatAddress,
        body: Box<MessageBody>,
        reply: Reply<SendReceipt>,
    },
    Group {
        command: GroupCommand,
        reply: Reply<GroupOutcome>,
    },
    /// Remove every persisted trace of the session, then stop.
    Delete { reply: Reply<()> },
    /// Disconnect keeping the device, then stop.
    Shutdown { reply: oneshot::Sender<()> },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::Disconnect { .. } => "disconnect",
            Command::Logout { .. } => "logout",
            Command::Send { .. } => "send",
            Command::Group { .. } => "group",
            Command::Delete { .. } => "delete",
            Command::Shutdown { .. } => "shutdown",
        }
    }
}
