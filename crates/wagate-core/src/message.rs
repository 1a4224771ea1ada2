// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message bodies, one variant per sendable kind.
//!
//! The REST layer resolves the `{kind}` path segment into a [`MessageKind`]
//! and hands the remaining JSON fields to [`MessageBody::from_fields`].
//! Validation happens here so every remote backend sees well-formed bodies.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::WagateError;

/// Sendable message kinds, named as they appear in the send path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Sticker,
    Location,
    Contact,
    Contacts,
    Reaction,
    Poll,
    Buttons,
    List,
    Template,
    ViewOnce,
}

/// Media attached to a message: either fetched from a URL or inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Media {
    Url {
        url: String,
    },
    Inline {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl Media {
    pub fn validate(&self, field: &str) -> Result<(), WagateError> {
        match self {
            Media::Url { url } => {
                let rest = url
                    .strip_prefix("https://")
                    .or_else(|| url.strip_prefix("http://"));
                match rest {
                    Some(host) if !host.is_empty() => Ok(()),
                    _ => Err(WagateError::Validation(format!(
                        "{field}.url must be an http or https URL"
                    ))),
                }
            }
            Media::Inline { data, mime_type } => {
                if mime_type.trim().is_empty() {
                    return Err(WagateError::Validation(format!(
                        "{field}.mimeType must not be empty"
                    )));
                }
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|_| {
                        WagateError::Validation(format!("{field}.data must be valid base64"))
                    })?;
                if bytes.is_empty() {
                    return Err(WagateError::Validation(format!(
                        "{field}.data must not be empty"
                    )));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionedMedia {
    pub media: Media,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBody {
    pub media: Media,
    /// Send as a voice note.
    #[serde(default)]
    pub ptt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    pub media: Media,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerBody {
    pub media: Media,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBody {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCard {
    pub name: String,
    pub phone: String,
}

impl ContactCard {
    fn validate(&self, field: &str) -> Result<(), WagateError> {
        if self.name.trim().is_empty() {
            return Err(WagateError::Validation(format!("{field}.name must not be empty")));
        }
        let digits = self.phone.strip_prefix('+').unwrap_or(&self.phone);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WagateError::Validation(format!(
                "{field}.phone must be a phone number"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBody {
    pub contact: ContactCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsBody {
    pub contacts: Vec<ContactCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionBody {
    pub message_id: String,
    /// An empty emoji removes a previous reaction.
    #[serde(default)]
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollBody {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonsBody {
    pub text: String,
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBody {
    pub text: String,
    pub button_text: String,
    pub sections: Vec<ListSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateBody {
    pub text: String,
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewOnceKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOnceBody {
    pub media: Media,
    pub kind: ViewOnceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A validated outbound message body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum MessageBody {
    Text(TextBody),
    Image(CaptionedMedia),
    Audio(AudioBody),
    Video(CaptionedMedia),
    Document(DocumentBody),
    Sticker(StickerBody),
    Location(LocationBody),
    Contact(ContactBody),
    Contacts(ContactsBody),
    Reaction(ReactionBody),
    Poll(PollBody),
    Buttons(ButtonsBody),
    List(ListBody),
    Template(TemplateBody),
    ViewOnce(ViewOnceBody),
}

fn parse<T: serde::de::DeserializeOwned>(
    kind: MessageKind,
    fields: serde_json::Value,
) -> Result<T, WagateError> {
    serde_json::from_value(fields)
        .map_err(|e| WagateError::Validation(format!("invalid {kind} message: {e}")))
}

fn require_non_empty(value: &str, field: &str) -> Result<(), WagateError> {
    if value.trim().is_empty() {
        return Err(WagateError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_buttons(buttons: &[Button], max: Option<usize>) -> Result<(), WagateError> {
    if buttons.is_empty() {
        return Err(WagateError::Validation(
            "buttons must contain at least one button".to_string(),
        ));
    }
    if let Some(max) = max {
        if buttons.len() > max {
            return Err(WagateError::Validation(format!(
                "buttons must contain at most {max} buttons"
            )));
        }
    }
    for (i, b) in buttons.iter().enumerate() {
        require_non_empty(&b.id, &format!("buttons[{i}].id"))?;
        require_non_empty(&b.text, &format!("buttons[{i}].text"))?;
    }
    Ok(())
}

impl MessageBody {
    /// Decode and validate the kind-specific fields of a send request.
    pub fn from_fields(kind: MessageKind, fields: serde_json::Value) -> Result<Self, WagateError> {
        let body = match kind {
            MessageKind::Text => MessageBody::Text(parse(kind, fields)?),
            MessageKind::Image => MessageBody::Image(parse(kind, fields)?),
            MessageKind::Audio => MessageBody::Audio(parse(kind, fields)?),
            MessageKind::Video => MessageBody::Video(parse(kind, fields)?),
            MessageKind::Document => MessageBody::Document(parse(kind, fields)?),
            MessageKind::Sticker => MessageBody::Sticker(parse(kind, fields)?),
            MessageKind::Location => MessageBody::Location(parse(kind, fields)?),
            MessageKind::Contact => MessageBody::Contact(parse(kind, fields)?),
            MessageKind::Contacts => MessageBody::Contacts(parse(kind, fields)?),
            MessageKind::Reaction => MessageBody::Reaction(parse(kind, fields)?),
            MessageKind::Poll => MessageBody::Poll(parse(kind, fields)?),
            MessageKind::Buttons => MessageBody::Buttons(parse(kind, fields)?),
            MessageKind::List => MessageBody::List(parse(kind, fields)?),
            MessageKind::Template => MessageBody::Template(parse(kind, fields)?),
            MessageKind::ViewOnce => MessageBody::ViewOnce(parse(kind, fields)?),
        };
        body.validate()?;
        Ok(body)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Text(_) => MessageKind::Text,
            MessageBody::Image(_) => MessageKind::Image,
            MessageBody::Audio(_) => MessageKind::Audio,
            MessageBody::Video(_) => MessageKind::Video,
            MessageBody::Document(_) => MessageKind::Document,
            MessageBody::Sticker(_) => MessageKind::Sticker,
            MessageBody::Location(_) => MessageKind::Location,
            MessageBody::Contact(_) => MessageKind::Contact,
            MessageBody::Contacts(_) => MessageKind::Contacts,
            MessageBody::Reaction(_) => MessageKind::Reaction,
            MessageBody::Poll(_) => MessageKind::Poll,
            MessageBody::Buttons(_) => MessageKind::Buttons,
            MessageBody::List(_) => MessageKind::List,
            MessageBody::Template(_) => MessageKind::Template,
            MessageBody::ViewOnce(_) => MessageKind::ViewOnce,
        }
    }

    /// Check the per-kind constraints.
    pub fn validate(&self) -> Result<(), WagateError> {
        match self {
            MessageBody::Text(b) => require_non_empty(&b.text, "text"),
            MessageBody::Image(b) | MessageBody::Video(b) => b.media.validate("media"),
            MessageBody::Audio(b) => b.media.validate("media"),
            MessageBody::Document(b) => {
                b.media.validate("media")?;
                require_non_empty(&b.file_name, "fileName")
            }
            MessageBody::Sticker(b) => b.media.validate("media"),
            MessageBody::Location(b) => {
                if !(-90.0..=90.0).contains(&b.latitude) {
                    return Err(WagateError::Validation(
                        "latitude must be between -90 and 90".to_string(),
                    ));
                }
                if !(-180.0..=180.0).contains(&b.longitude) {
                    return Err(WagateError::Validation(
                        "longitude must be between -180 and 180".to_string(),
                    ));
                }
                Ok(())
            }
            MessageBody::Contact(b) => b.contact.validate("contact"),
            MessageBody::Contacts(b) => {
                if b.contacts.is_empty() {
                    return Err(WagateError::Validation(
                        "contacts must contain at least one contact".to_string(),
                    ));
                }
                for (i, c) in b.contacts.iter().enumerate() {
                    c.validate(&format!("contacts[{i}]"))?;
                }
                Ok(())
            }
            MessageBody::Reaction(b) => require_non_empty(&b.message_id, "messageId"),
            MessageBody::Poll(b) => {
                require_non_empty(&b.question, "question")?;
                if !(2..=12).contains(&b.options.len()) {
                    return Err(WagateError::Validation(
                        "options must contain between 2 and 12 entries".to_string(),
                    ));
                }
                if b.options.iter().any(|o| o.trim().is_empty()) {
                    return Err(WagateError::Validation(
                        "options must not contain empty entries".to_string(),
                    ));
                }
                if let Some(n) = b.selectable_count {
                    if n == 0 || n as usize > b.options.len() {
                        return Err(WagateError::Validation(
                            "selectableCount must be between 1 and the number of options"
                                .to_string(),
                        ));
                    }
                }
                Ok(())
            }
            MessageBody::Buttons(b) => {
                require_non_empty(&b.text, "text")?;
                validate_buttons(&b.buttons, Some(3))
            }
            MessageBody::List(b) => {
                require_non_empty(&b.text, "text")?;
                require_non_empty(&b.button_text, "buttonText")?;
                if b.sections.is_empty() {
                    return Err(WagateError::Validation(
                        "sections must contain at least one section".to_string(),
                    ));
                }
                for (i, section) in b.sections.iter().enumerate() {
                    if section.rows.is_empty() {
                        return Err(WagateError::Validation(format!(
                            "sections[{i}].rows must contain at least one row"
                        )));
                    }
                    for (j, row) in section.rows.iter().enumerate() {
                        require_non_empty(&row.id, &format!("sections[{i}].rows[{j}].id"))?;
                        require_non_empty(&row.title, &format!("sections[{i}].rows[{j}].title"))?;
                    }
                }
                Ok(())
            }
            MessageBody::Template(b) => {
                require_non_empty(&b.text, "text")?;
                validate_buttons(&b.buttons, None)
            }
            MessageBody::ViewOnce(b) => b.media.validate("media"),
        }
    }

    /// Short human-readable preview, used by the message ledger.
    pub fn preview(&self) -> Option<String> {
        match self {
            MessageBody::Text(b) => Some(b.text.clone()),
            MessageBody::Image(b) | MessageBody::Video(b) => b.caption.clone(),
            MessageBody::ViewOnce(b) => b.caption.clone(),
            MessageBody::Document(b) => Some(b.file_name.clone()),
            MessageBody::Location(b) => b.name.clone(),
            MessageBody::Contact(b) => Some(b.contact.name.clone()),
            MessageBody::Reaction(b) => Some(b.emoji.clone()),
            MessageBody::Poll(b) => Some(b.question.clone()),
            MessageBody::Buttons(b) => Some(b.text.clone()),
            MessageBody::List(b) => Some(b.text.clone()),
            MessageBody::Template(b) => Some(b.text.clone()),
            MessageBody::Audio(_) | MessageBody::Sticker(_) | MessageBody::Contacts(_) => None,
        }
    }
}

/// What the remote network returns for an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
