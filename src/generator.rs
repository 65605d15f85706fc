use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::fetch::{ConnectionError, TargetFetcher};
use crate::mode::{TrainingMode, IMAGE_CANDIDATES};
use crate::target::{Coords, ImageData, ImageTarget, LocationTarget, Shape, ShapeTarget, Target};

/// Configuration for target generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub image_width: u32,
    pub image_height: u32,
    pub map_zoom: u8,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            image_width: 400,
            image_height: 300,
            map_zoom: 12,
            seed: None,
        }
    }
}

impl From<&Config> for GeneratorConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            image_width: cfg.image_width,
            image_height: cfg.image_height,
            map_zoom: cfg.map_zoom,
            seed: None,
        }
    }
}

/// Produces random hidden targets locally
pub struct TargetGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl TargetGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    fn session_id(&mut self, prefix: &str) -> String {
        format!("{prefix}-{}", self.rng.gen_range(10000..=99999))
    }

    pub fn shape_target(&mut self) -> ShapeTarget {
        let target = *Shape::ALL.choose(&mut self.rng).unwrap_or(&Shape::Circle);
        ShapeTarget {
            session_id: self.session_id("SHP"),
            target,
            options: Shape::ALL.to_vec(),
        }
    }

    /// Four distinct Lorem Picsum seeds, one of them the target
    pub fn image_target(&mut self) -> ImageTarget {
        let seeds: Vec<u32> = index::sample(&mut self.rng, 999, IMAGE_CANDIDATES)
            .into_iter()
            .map(|i| i as u32 + 1)
            .collect();
        let target_index = self.rng.gen_range(0..IMAGE_CANDIDATES);

        let images = seeds
            .iter()
            .enumerate()
            .map(|(id, &seed)| ImageData {
                id: id as u32,
                url: format!(
                    "https://picsum.photos/seed/{seed}/{}/{}",
                    self.config.image_width, self.config.image_height
                ),
                seed,
            })
            .collect();

        ImageTarget {
            session_id: self.session_id("IMG"),
            images,
            target_index,
            target_seed: seeds[target_index],
        }
    }

    /// A uniformly random point anywhere on Earth, rounded to 4 decimals
    pub fn location_target(&mut self) -> LocationTarget {
        let lat = round4(self.rng.gen_range(-90.0..=90.0));
        let lng = round4(self.rng.gen_range(-180.0..=180.0));
        let coords = Coords::new(lat, lng);

        LocationTarget {
            session_id: self.session_id("LOC"),
            coords,
            coords_display: coords.display(),
            region: None,
            map_url: Some(coords.map_url(self.config.map_zoom)),
        }
    }

    pub fn generate(&mut self, mode: TrainingMode) -> Target {
        match mode {
            TrainingMode::Shape => Target::Shape(self.shape_target()),
            TrainingMode::Image => Target::Image(self.image_target()),
            TrainingMode::Location => Target::Location(self.location_target()),
        }
    }
}

impl TargetFetcher for TargetGenerator {
    fn fetch_target(&mut self, mode: TrainingMode) -> Result<Target, ConnectionError> {
        Ok(self.generate(mode))
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
