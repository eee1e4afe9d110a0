/// ID types for Podline entities
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id! {
    /// Episode identifier assigned by the podcast catalog
    EpisodeId
}

string_id! {
    /// Clip identifier (a bounded excerpt of an episode, "media ref" on the wire)
    ClipId
}

string_id! {
    /// Podcast identifier assigned by the podcast catalog
    PodcastId
}

/// Identity of a playable record: exactly one of episode or clip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum PlaybackIdentity {
    Episode(EpisodeId),
    Clip(ClipId),
}

impl PlaybackIdentity {
    pub fn is_clip(&self) -> bool {
        matches!(self, Self::Clip(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Episode(id) => id.as_str(),
            Self::Clip(id) => id.as_str(),
        }
    }

    /// Stable track id handed to native players (`episode:<id>` / `clip:<id>`)
    pub fn track_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PlaybackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Episode(id) => write!(f, "episode:{}", id),
            Self::Clip(id) => write!(f, "clip:{}", id),
        }
    }
}
