//! Records stored in the movie catalog.
//!
//! Field names on the wire are fixed by the existing data in the store, so
//! every field carries an explicit `serde` rename. The store is schemaless:
//! a missing field deserializes to its default.

use cinedex_common::{Error, MovieId, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Wire names of the [`Movie`] fields.
pub mod fields {
    pub const ID: &str = "MovieId";
    pub const NAME: &str = "MovieName";
    pub const DESCRIPTION: &str = "description";
    pub const RATING: &str = "Rating";
    pub const IMAGE_URL: &str = "imageUrl";
    pub const TRAILER_URL: &str = "trailerUrl";
    pub const RELEASE_YEAR: &str = "releaseYear";
    pub const DURATION: &str = "duration";
    pub const AGE_RATING: &str = "ageRating";
    pub const GENRES: &str = "genres";

    /// Every field a merge-patch may touch. The identifier is excluded.
    pub const MUTABLE: &[&str] = &[
        NAME,
        DESCRIPTION,
        RATING,
        IMAGE_URL,
        TRAILER_URL,
        RELEASE_YEAR,
        DURATION,
        AGE_RATING,
        GENRES,
    ];
}

/// A movie entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Movie {
    /// Store-assigned key; empty until the record is persisted.
    #[serde(rename = "MovieId")]
    pub id: MovieId,
    #[serde(rename = "MovieName")]
    pub name: String,
    pub description: String,
    /// Nominally 1 to 10. Not enforced here.
    #[serde(rename = "Rating")]
    pub rating: f64,
    /// Poster URL; empty until the upload completes.
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "trailerUrl")]
    pub trailer_url: String,
    #[serde(rename = "releaseYear")]
    pub release_year: String,
    /// Free-form running time, e.g. "2h 10m".
    pub duration: String,
    #[serde(rename = "ageRating")]
    pub age_rating: String,
    #[serde(deserialize_with = "genres_from_any")]
    pub genres: Vec<String>,
}

impl Movie {
    /// Whether the store has assigned this record a key.
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// Decode a record read from the store at `key`.
    ///
    /// The key is the record's identity. An embedded `MovieId` that
    /// disagrees with it (or is missing) is replaced by the key.
    pub fn from_record(key: &str, value: Value) -> Result<Self> {
        let mut movie: Movie = serde_json::from_value(value)?;
        if !movie.id.is_empty() && movie.id.as_str() != key {
            tracing::warn!(key, embedded = %movie.id, "Record id disagrees with its key; using the key");
        }
        movie.id = MovieId::from(key);
        Ok(movie)
    }
}

/// Accepts `["Action", "Drama"]`, the legacy `"Action, Drama"` string, or null.
fn genres_from_any<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Genres {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Genres>::deserialize(deserializer)? {
        Some(Genres::List(list)) => list,
        Some(Genres::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    })
}

/// Sparse merge-patch of a movie's fields.
///
/// Only the fields set on the patch are sent to the store. The identifier
/// can never be part of a patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoviePatch {
    fields: Map<String, Value>,
}

impl MoviePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch from a raw field map, rejecting unknown field names,
    /// the identifier, and values of the wrong type.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::validation("update contains no fields"));
        }

        for key in fields.keys() {
            if key == fields::ID {
                return Err(Error::validation("MovieId cannot be changed"));
            }
            if !fields::MUTABLE.contains(&key.as_str()) {
                return Err(Error::validation(format!("unknown movie field: {key}")));
            }
        }

        // Type-check by decoding a default record with the patch applied.
        let mut probe = serde_json::to_value(Movie::default())?;
        if let Value::Object(ref mut map) = probe {
            for (k, v) in &fields {
                map.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value::<Movie>(probe)
            .map_err(|e| Error::validation(format!("invalid field value: {e}")))?;

        Ok(Self { fields })
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.set(fields::NAME, Value::String(name.into()))
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.set(fields::DESCRIPTION, Value::String(description.into()))
    }

    pub fn rating(self, rating: f64) -> Self {
        self.set(fields::RATING, Value::from(rating))
    }

    pub fn image_url(self, url: impl Into<String>) -> Self {
        self.set(fields::IMAGE_URL, Value::String(url.into()))
    }

    pub fn trailer_url(self, url: impl Into<String>) -> Self {
        self.set(fields::TRAILER_URL, Value::String(url.into()))
    }

    pub fn release_year(self, year: impl Into<String>) -> Self {
        self.set(fields::RELEASE_YEAR, Value::String(year.into()))
    }

    pub fn duration(self, duration: impl Into<String>) -> Self {
        self.set(fields::DURATION, Value::String(duration.into()))
    }

    pub fn age_rating(self, age_rating: impl Into<String>) -> Self {
        self.set(fields::AGE_RATING, Value::String(age_rating.into()))
    }

    pub fn genres<I, S>(self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = genres
            .into_iter()
            .map(|g| Value::String(g.into()))
            .collect();
        self.set(fields::GENRES, Value::Array(list))
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Apply the patch to a local copy, the same way the store merges it.
    pub fn apply_to(&self, movie: &Movie) -> Result<Movie> {
        let mut value = serde_json::to_value(movie)?;
        if let Value::Object(ref mut map) = value {
            for (k, v) in &self.fields {
                map.insert(k.clone(), v.clone());
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Built-in catalog used to populate an empty database.
pub fn sample_movies() -> Vec<Movie> {
    let sample = |name: &str, genres: &[&str], description: &str, rating: f64, duration: &str| {
        Movie {
            name: name.to_string(),
            description: description.to_string(),
            rating,
            image_url: format!(
                "https://via.placeholder.com/300x450?text={}",
                name.replace(' ', "+")
            ),
            release_year: "2022".to_string(),
            duration: duration.to_string(),
            age_rating: "PG-13".to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    };

    vec![
        sample(
            "Avatar: The Way of Water",
            &["Action", "Adventure", "Sci-Fi"],
            "Jake Sully lives with his newfound family formed on the extrasolar moon Pandora.",
            7.6,
            "3h 12m",
        ),
        sample(
            "Top Gun: Maverick",
            &["Action", "Drama"],
            "After thirty years, Maverick is still pushing the envelope as a top naval aviator.",
            8.3,
            "2h 10m",
        ),
        sample(
            "Black Panther: Wakanda Forever",
            &["Action", "Adventure", "Drama"],
            "The people of Wakanda fight to protect their home from intervening world powers.",
            6.7,
            "2h 41m",
        ),
        sample(
            "The Batman",
            &["Action", "Crime", "Drama"],
            "When a sadistic serial killer begins murdering key political figures in Gotham.",
            7.8,
            "2h 56m",
        ),
    ]
}
