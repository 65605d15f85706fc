use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mode::{TrainingMode, IMAGE_CANDIDATES, SHAPE_CANDIDATES};

/// Symbolic shape identifiers used by the shape protocol
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Shape {
    Circle,
    Square,
    Star,
    Waves,
    Cross,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Circle,
        Shape::Square,
        Shape::Star,
        Shape::Waves,
        Shape::Cross,
    ];

    pub fn symbol(self) -> char {
        match self {
            Shape::Circle => '◯',
            Shape::Square => '◻',
            Shape::Star => '★',
            Shape::Waves => '≋',
            Shape::Cross => '✚',
        }
    }

    /// Parse a shape from its lowercase identifier
    pub fn from_name(name: &str) -> Option<Shape> {
        let name = name.trim().to_lowercase();
        Shape::ALL.into_iter().find(|s| s.to_string() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeTarget {
    pub session_id: String,
    pub target: Shape,
    pub options: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub id: u32,
    pub url: String,
    pub seed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTarget {
    pub session_id: String,
    pub images: Vec<ImageData>,
    pub target_index: usize,
    pub target_seed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Hemisphere-suffixed display, e.g. `48.8566°N, 2.3522°E`
    pub fn display(&self) -> String {
        format!(
            "{:.4}°{}, {:.4}°{}",
            self.lat.abs(),
            if self.lat >= 0.0 { 'N' } else { 'S' },
            self.lng.abs(),
            if self.lng >= 0.0 { 'E' } else { 'W' },
        )
    }

    pub fn map_url(&self, zoom: u8) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lng}#map={zoom}/{lat}/{lng}",
            lat = self.lat,
            lng = self.lng,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTarget {
    pub session_id: String,
    pub coords: Coords,
    pub coords_display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
}

/// A hidden target as handed out by a fetcher, tagged by mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Target {
    Shape(ShapeTarget),
    Image(ImageTarget),
    Location(LocationTarget),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetError {
    #[error("target has an empty session id")]
    MissingSessionId,
    #[error("expected {expected} candidates, got {actual}")]
    CandidateCount { expected: usize, actual: usize },
    #[error("candidate list contains duplicates")]
    DuplicateCandidates,
    #[error("target is not among the candidates")]
    TargetNotOffered,
    #[error("target seed {seed} does not match image {index}")]
    SeedMismatch { index: usize, seed: u32 },
    #[error("coordinates out of range: {lat}, {lng}")]
    CoordsOutOfRange { lat: f64, lng: f64 },
}

impl Target {
    pub fn mode(&self) -> TrainingMode {
        match self {
            Target::Shape(_) => TrainingMode::Shape,
            Target::Image(_) => TrainingMode::Image,
            Target::Location(_) => TrainingMode::Location,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Target::Shape(t) => &t.session_id,
            Target::Image(t) => &t.session_id,
            Target::Location(t) => &t.session_id,
        }
    }

    /// Number of candidate media that must finish loading before a choice is accepted
    pub fn media_count(&self) -> usize {
        match self {
            Target::Image(t) => t.images.len(),
            Target::Shape(_) | Target::Location(_) => 0,
        }
    }

    /// Check the structural shape of a fetched target
    pub fn validate(&self) -> Result<(), TargetError> {
        if self.session_id().trim().is_empty() {
            return Err(TargetError::MissingSessionId);
        }

        match self {
            Target::Shape(t) => {
                if t.options.len() != SHAPE_CANDIDATES {
                    return Err(TargetError::CandidateCount {
                        expected: SHAPE_CANDIDATES,
                        actual: t.options.len(),
                    });
                }
                if !all_distinct(&t.options) {
                    return Err(TargetError::DuplicateCandidates);
                }
                if !t.options.contains(&t.target) {
                    return Err(TargetError::TargetNotOffered);
                }
            }
            Target::Image(t) => {
                if t.images.len() != IMAGE_CANDIDATES {
                    return Err(TargetError::CandidateCount {
                        expected: IMAGE_CANDIDATES,
                        actual: t.images.len(),
                    });
                }
                let seeds: Vec<u32> = t.images.iter().map(|i| i.seed).collect();
                if !all_distinct(&seeds) {
                    return Err(TargetError::DuplicateCandidates);
                }
                match t.images.get(t.target_index) {
                    None => return Err(TargetError::TargetNotOffered),
                    Some(img) if img.seed != t.target_seed => {
                        return Err(TargetError::SeedMismatch {
                            index: t.target_index,
                            seed: t.target_seed,
                        })
                    }
                    Some(_) => {}
                }
            }
            Target::Location(t) => {
                if !t.coords.is_valid() {
                    return Err(TargetError::CoordsOutOfRange {
                        lat: t.coords.lat,
                        lng: t.coords.lng,
                    });
                }
            }
        }

        Ok(())
    }
}

fn all_distinct<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, a)| items[i + 1..].iter().all(|b| a != b))
}
