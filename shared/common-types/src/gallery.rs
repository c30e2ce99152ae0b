use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares an open category: a set of well-known slugs plus `Other` for
/// anything the store holds that this build does not know about.
macro_rules! open_category {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $slug:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
            /// Value outside the known set, kept verbatim
            Other(String),
        }

        impl $name {
            /// Every well-known value, in display order
            pub const KNOWN: &'static [Self] = &[$(Self::$variant),+];

            /// The stored text for this category
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $slug,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($slug => Self::$variant,)+
                    _ => Self::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(value) => value,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_category! {
    /// Room a gallery entry shows
    RoomType {
        LivingRoom => "living_room",
        Bedroom => "bedroom",
        Kitchen => "kitchen",
        Bathroom => "bathroom",
        DiningRoom => "dining_room",
        Office => "office",
        Outdoor => "outdoor",
    }
}

open_category! {
    /// Design style of a gallery entry
    DesignStyle {
        Modern => "modern",
        Scandinavian => "scandinavian",
        Industrial => "industrial",
        Minimalist => "minimalist",
        Traditional => "traditional",
        Bohemian => "bohemian",
        MidCentury => "mid_century",
    }
}

/// Row of the `gallery_items` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    /// Store-assigned identifier
    pub id: String,
    pub title: String,
    pub description: String,
    pub room_type: RoomType,
    pub style: DesignStyle,
    /// Playable video or viewable image
    pub video_url: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gallery entry as submitted for creation; the store fills in id and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGalleryEntry {
    pub title: String,
    pub description: String,
    pub room_type: RoomType,
    pub style: DesignStyle,
    pub video_url: String,
    pub thumbnail_url: String,
    pub featured: bool,
}

/// Partial update of a gallery entry. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<DesignStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl GalleryEntryPatch {
    /// True when the patch would not change any column
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.room_type.is_none()
            && self.style.is_none()
            && self.video_url.is_none()
            && self.thumbnail_url.is_none()
            && self.featured.is_none()
    }
}
