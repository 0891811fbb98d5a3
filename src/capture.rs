//! The browser side of the pipeline, seen from the extractors.
//!
//! A live session hands out containers through [`ContainerSource`]; the JSON
//! capture types below replay what such a session recorded, one [`Snapshot`]
//! per scroll step.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Which DOM query produced a batch of containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorTier {
    /// Class-name card selectors (`section.note-item` and friends)
    Card,
    /// Bare note/profile anchors with their nearest enclosing block
    Anchor,
}

/// Sub-elements a card selector can address by class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Title,
    Author,
    Like,
    Time,
}

impl CardField {
    pub fn as_str(self) -> &'static str {
        match self {
            CardField::Title => "title",
            CardField::Author => "author",
            CardField::Like => "like",
            CardField::Time => "time",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// One UI container, read-only for the duration of an extraction call.
pub trait RawContainer {
    fn text(&self) -> Result<String, CaptureError>;

    fn links(&self) -> Result<Vec<Link>, CaptureError>;

    fn attribute(&self, name: &str) -> Option<String>;

    fn primary_link(&self) -> Option<Link> {
        self.links().ok()?.into_iter().next()
    }

    /// Attribute of the element designated as the card cover.
    fn cover_attribute(&self, name: &str) -> Option<String>;

    /// Text of a class-addressed sub-element; only card-tier containers have these.
    fn field_text(&self, _field: CardField) -> Option<String> {
        None
    }

    /// Re-fetch capability: text of a wider enclosing element, for anchors
    /// whose own block is too small to carry the card.
    fn expanded_text(&self) -> Option<String> {
        None
    }
}

impl<T: RawContainer + ?Sized> RawContainer for &T {
    fn text(&self) -> Result<String, CaptureError> {
        (**self).text()
    }

    fn links(&self) -> Result<Vec<Link>, CaptureError> {
        (**self).links()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        (**self).attribute(name)
    }

    fn primary_link(&self) -> Option<Link> {
        (**self).primary_link()
    }

    fn cover_attribute(&self, name: &str) -> Option<String> {
        (**self).cover_attribute(name)
    }

    fn field_text(&self, field: CardField) -> Option<String> {
        (**self).field_text(field)
    }

    fn expanded_text(&self) -> Option<String> {
        (**self).expanded_text()
    }
}

/// One scroll step's worth of containers.
pub trait ContainerSource {
    type Container: RawContainer;

    fn list_candidate_containers(
        &self,
        tier: SelectorTier,
    ) -> Result<Vec<Self::Container>, CaptureError>;
}

// ── JSON captures ──

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapturedContainer {
    /// `null` when the browser failed to read the container
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub cover: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub expanded_text: Option<String>,
}

impl RawContainer for CapturedContainer {
    fn text(&self) -> Result<String, CaptureError> {
        self.text
            .clone()
            .ok_or_else(|| CaptureError::Unreadable("container text missing".into()))
    }

    fn links(&self) -> Result<Vec<Link>, CaptureError> {
        Ok(self.links.clone())
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn cover_attribute(&self, name: &str) -> Option<String> {
        self.cover.get(name).cloned()
    }

    fn field_text(&self, field: CardField) -> Option<String> {
        self.fields.get(field.as_str()).cloned()
    }

    fn expanded_text(&self) -> Option<String> {
        self.expanded_text.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SessionClosed,
    Timeout,
}

/// A step where the browser gave up instead of returning containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub card: Vec<CapturedContainer>,
    #[serde(default)]
    pub anchor: Vec<CapturedContainer>,
    #[serde(default)]
    pub failure: Option<StepFailure>,
}

impl<'a> ContainerSource for &'a Snapshot {
    type Container = &'a CapturedContainer;

    fn list_candidate_containers(
        &self,
        tier: SelectorTier,
    ) -> Result<Vec<Self::Container>, CaptureError> {
        if let Some(failure) = &self.failure {
            return Err(match failure.kind {
                FailureKind::SessionClosed => CaptureError::SessionClosed(failure.message.clone()),
                FailureKind::Timeout => CaptureError::Timeout(failure.message.clone()),
            });
        }
        let containers = match tier {
            SelectorTier::Card => &self.card,
            SelectorTier::Anchor => &self.anchor,
        };
        Ok(containers.iter().collect())
    }
}

/// What a note's detail page showed, for filling card gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailPage {
    #[serde(default)]
    pub meta_description: Option<String>,
    /// `og:updated_time`
    #[serde(default)]
    pub updated_time: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
}

/// Scroll steps for one keyword; `keyword: null` is the explore feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordRun {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub steps: Vec<Snapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostCapture {
    #[serde(default)]
    pub runs: Vec<KeywordRun>,
    /// Detail pages keyed by note URL (tracking suffix stripped)
    #[serde(default)]
    pub details: BTreeMap<String, DetailPage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCapture {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identifier: String,
    /// The search page's user tab, one snapshot per scroll step
    #[serde(default)]
    pub search_steps: Vec<Snapshot>,
    /// Profile feeds keyed by profile URL
    #[serde(default)]
    pub profiles: BTreeMap<String, Vec<Snapshot>>,
}

pub fn load_post_capture(path: &Path) -> Result<PostCapture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse post capture: {}", path.display()))
}

pub fn load_user_capture(path: &Path) -> Result<UserCapture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse user capture: {}", path.display()))
}
