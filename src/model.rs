use serde::{Deserialize, Serialize};

/// Catalog entry as served by the API. Songs are immutable once fetched;
/// whole lists are replaced on refetch, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
    /// File name of the audio track, resolved against the media base URL.
    pub track: String,
    pub albums: AlbumSummary,
    pub artists: ArtistSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub name: String,
    pub image: String,
}
