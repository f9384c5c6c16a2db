use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::lane::Lane;
use crate::error::BoardError;

/// Maximum title length, in code points
pub const TITLE_MAX_CHARS: usize = 120;

/// Maximum description length, in code points
pub const DESCRIPTION_MAX_CHARS: usize = 300;

/// Largest position a patch may set. Appends past it still fit in an `i64`.
pub const POSITION_MAX: i64 = i32::MAX as i64;

/// Database-assigned identity of a card. Always positive, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(i64);

impl CardId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl FromStr for CardId {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(BoardError::validation("Invalid card id.")),
        }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub description: String,
    pub lane: Lane,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Applies validated field changes in place and bumps `updated_at`.
    ///
    /// Lane and position are copied as given; siblings are not renumbered.
    pub fn apply(&mut self, changes: CardChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(lane) = changes.lane {
            self.lane = lane;
        }
        if let Some(position) = changes.position {
            self.position = position;
        }
        self.updated_at = Utc::now();
    }
}

/// Body of a create request, as sent by a client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCard {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "status")]
    pub lane: Option<String>,
}

impl CreateCard {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane.as_str().to_string());
        self
    }

    /// Checks every field and produces the insertable card
    pub fn validate(self) -> Result<NewCard, BoardError> {
        let title = clean_text(self.title.as_deref());
        if title.is_empty() {
            return Err(BoardError::validation("Title is required."));
        }
        if exceeds(&title, TITLE_MAX_CHARS) {
            return Err(BoardError::validation("Title is too long."));
        }

        let description = clean_text(self.description.as_deref());
        if exceeds(&description, DESCRIPTION_MAX_CHARS) {
            return Err(BoardError::validation("Description is too long."));
        }

        let lane = Lane::from_hint(self.lane.as_deref())?;

        Ok(NewCard {
            title,
            description,
            lane,
        })
    }
}

/// A validated card awaiting insertion; its position is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub title: String,
    pub description: String,
    pub lane: Lane,
}

/// Body of a patch request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "status")]
    pub lane: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

impl CardPatch {
    pub fn validate(self) -> Result<CardChanges, BoardError> {
        let title = match self.title {
            Some(raw) => {
                let title = clean_text(Some(&raw));
                if title.is_empty() {
                    return Err(BoardError::validation("Title cannot be empty."));
                }
                if exceeds(&title, TITLE_MAX_CHARS) {
                    return Err(BoardError::validation("Title is too long."));
                }
                Some(title)
            }
            None => None,
        };

        let description = match self.description {
            Some(raw) => {
                let description = clean_text(Some(&raw));
                if exceeds(&description, DESCRIPTION_MAX_CHARS) {
                    return Err(BoardError::validation("Description is too long."));
                }
                Some(description)
            }
            None => None,
        };

        let lane = self.lane.as_deref().map(str::parse::<Lane>).transpose()?;

        if let Some(position) = self.position {
            if position < 0 {
                return Err(BoardError::validation(
                    "Position must be a non-negative integer.",
                ));
            }
            if position > POSITION_MAX {
                return Err(BoardError::validation("Position is too large."));
            }
        }

        let changes = CardChanges {
            title,
            description,
            lane,
            position: self.position,
        };
        if changes.is_empty() {
            return Err(BoardError::validation("No valid updates provided."));
        }
        Ok(changes)
    }
}

/// Validated, sparse set of field changes for one card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lane: Option<Lane>,
    pub position: Option<i64>,
}

impl CardChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.lane.is_none()
            && self.position.is_none()
    }
}

fn clean_text(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_string()
}

fn exceeds(value: &str, max_chars: usize) -> bool {
    value.chars().count() > max_chars
}
