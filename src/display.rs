//! Display states handed to the chip widget

use serde::{Deserialize, Serialize};

use crate::subject::SpecificityFailure;

/// Why a lane is hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenReason {
    WrongPageType,
    UrlCooldown,
    UserDismissed,
    LowIntent,
    NoSubject,
    RenderFailed,
    Error,
}

impl HiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiddenReason::WrongPageType => "wrong_page_type",
            HiddenReason::UrlCooldown => "url_cooldown",
            HiddenReason::UserDismissed => "user_dismissed",
            HiddenReason::LowIntent => "low_intent",
            HiddenReason::NoSubject => "no_subject",
            HiddenReason::RenderFailed => "render_failed",
            HiddenReason::Error => "error",
        }
    }
}

impl std::fmt::Display for HiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the widget should render for one lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayState {
    Hidden {
        reason: HiddenReason,
    },
    ReadyConfirmed {
        subject: String,
    },
    ReadyEditable {
        subject: String,
        fail_reason: Option<SpecificityFailure>,
    },
}

impl DisplayState {
    pub fn hidden(reason: HiddenReason) -> Self {
        DisplayState::Hidden { reason }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, DisplayState::Hidden { .. })
    }

    pub fn hidden_reason(&self) -> Option<HiddenReason> {
        match self {
            DisplayState::Hidden { reason } => Some(*reason),
            _ => None,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            DisplayState::ReadyConfirmed { subject } | DisplayState::ReadyEditable { subject, .. } => {
                Some(subject)
            }
            DisplayState::Hidden { .. } => None,
        }
    }
}
