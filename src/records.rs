use serde::Serialize;

// ── Posts ──

/// One note card from a search or explore feed.
///
/// Every field serializes, nulls included, so consumers always see the same keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub keyword: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub like_text: Option<String>,
    pub like_count: Option<u64>,
    pub publish_time: Option<String>,
    pub raw_text: Option<String>,
}

// ── Users ──

/// Precedence levels of the user matching chain, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    IdExact,
    NameExact,
    NameContains,
    TopFans,
    None,
}

impl MatchTier {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchTier::IdExact => "id_exact",
            MatchTier::NameExact => "name_exact",
            MatchTier::NameContains => "name_contains",
            MatchTier::TopFans => "top_fans",
            MatchTier::None => "none",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserCandidate {
    pub query: String,
    pub username: Option<String>,
    pub profile_url: Option<String>,
    pub fans_text: Option<String>,
    pub fans_count: Option<u64>,
    pub matched_by: Option<MatchTier>,
    pub raw_text: Option<String>,
}

/// A note card taken from one resolved user's profile feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPost {
    pub query: String,
    pub username: Option<String>,
    pub profile_url: Option<String>,
    pub post_url: Option<String>,
    pub title: Option<String>,
    pub cover_url: Option<String>,
    pub like_text: Option<String>,
    pub like_count: Option<u64>,
    pub publish_time: Option<String>,
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub name: String,
    pub identifier: String,
    pub matched_by: MatchTier,
    pub selected_user: Option<UserCandidate>,
    pub candidates_top_k: Vec<UserCandidate>,
    pub posts: Vec<UserPost>,
}

impl ResolutionReport {
    pub fn is_resolved(&self) -> bool {
        self.matched_by != MatchTier::None
    }
}

// ── Diagnostics ──

/// How much the layout evidence behind a record can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// No time line; fields guessed from line count alone
    Low,
    /// Positional layout anchored on a time line
    Medium,
    /// Class-name selectors supplied the fields
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    NoTimeLine,
    NoTitleLines,
    NoAuthorLine,
    AuthorLooksLikeTime,
    NoLikeLine,
    UnparsableNumeral,
    InlineDataCover,
    NoCover,
}

/// Why a field was left null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMiss {
    pub field: &'static str,
    pub reason: MissReason,
}

impl FieldMiss {
    pub fn new(field: &'static str, reason: MissReason) -> Self {
        Self { field, reason }
    }
}

/// Best-effort extraction output: the (possibly partial) value plus the
/// reasons behind every field that stayed empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted<T> {
    #[serde(flatten)]
    pub value: T,
    pub confidence: Confidence,
    pub misses: Vec<FieldMiss>,
}
