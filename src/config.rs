use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Slowest allowed base speed in px/ms; every fish must eventually reach the left edge.
pub const MIN_SPEED: f32 = 0.02;

/// Pointer-repulsion field. Absent from [`Config`] means the feature is off.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repulsion {
    /// Radius of the field around the pointer, in pixels.
    pub mouse_radius: f32,
    /// Push in px/ms applied at the pointer, falling off linearly to zero at the radius.
    pub mouse_force: f32,
}

impl Default for Repulsion {
    fn default() -> Self {
        Self {
            mouse_radius: 160.0,
            mouse_force: 0.25,
        }
    }
}

/// Tunables for one simulation. Sizes are pixels, speeds px/ms, delays ms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sprite: String,
    pub min_size: f32,
    pub max_size: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub opacity: f32,
    pub vertical_margin: f32,
    pub jitter_y: f32,
    pub spawn_min_delay: f32,
    pub spawn_max_delay: f32,
    pub initial_burst: usize,
    pub max_concurrent: usize,
    pub adapt_max_on_small: usize,
    pub repulsion: Option<Repulsion>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sprite: "goldfish".to_string(),
            min_size: 150.0,
            max_size: 350.0,
            min_speed: 0.055,
            max_speed: 0.105,
            opacity: 1.0,
            vertical_margin: 0.0,
            jitter_y: 12.0,
            spawn_min_delay: 100.0,
            spawn_max_delay: 2000.0,
            initial_burst: 4,
            max_concurrent: 10,
            adapt_max_on_small: 2,
            repulsion: None,
        }
    }
}

impl Config {
    /// Clamp every field into a usable range instead of rejecting bad values.
    pub fn normalized(mut self) -> Self {
        fn ordered(a: f32, b: f32) -> (f32, f32) {
            let (a, b) = (a.max(0.0), b.max(0.0));
            if a <= b {
                (a, b)
            } else {
                (b, a)
            }
        }

        (self.min_size, self.max_size) = ordered(self.min_size, self.max_size);
        self.max_size = self.max_size.max(1.0);
        self.min_size = self.min_size.max(1.0).min(self.max_size);
        (self.min_speed, self.max_speed) = ordered(self.min_speed, self.max_speed);
        self.min_speed = self.min_speed.max(MIN_SPEED);
        self.max_speed = self.max_speed.max(self.min_speed);
        (self.spawn_min_delay, self.spawn_max_delay) =
            ordered(self.spawn_min_delay, self.spawn_max_delay);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.vertical_margin = self.vertical_margin.clamp(0.0, 0.49);
        self.jitter_y = self.jitter_y.max(4.0);
        self.initial_burst = self.initial_burst.max(1);
        self.max_concurrent = self.max_concurrent.max(1);
        self.adapt_max_on_small = self.adapt_max_on_small.max(1);
        self.repulsion = self.repulsion.and_then(|r| {
            (r.mouse_radius > 0.0).then_some(Repulsion {
                mouse_radius: r.mouse_radius,
                mouse_force: r.mouse_force.max(0.0),
            })
        });
        self
    }

    /// Midpoint of the size range; speeds scale by `size / mid_size`.
    pub fn mid_size(&self) -> f32 {
        (self.min_size + self.max_size) / 2.0
    }
}

/// Missing file yields defaults; a present but broken file is an error.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let cfg = serde_json::from_str::<Config>(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cfg.normalized())
}

pub struct Paths {
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

pub fn project_paths() -> Option<Paths> {
    let proj = ProjectDirs::from("com", "shoal", "Shoal")?;
    let data = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&data).ok();
    Some(Paths {
        config_path: proj.config_dir().join("config.json"),
        log_path: data.join("shoal.log"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "max_concurrent": 3 }"#).unwrap();
        assert_eq!(cfg.max_concurrent, 3);
        assert_eq!(cfg.min_size, 150.0);
        assert!(cfg.repulsion.is_none());
    }

    #[test]
    fn repulsion_block_enables_feature() {
        let cfg: Config =
            serde_json::from_str(r#"{ "repulsion": { "mouse_radius": 90 } }"#).unwrap();
        let r = cfg.repulsion.unwrap();
        assert_eq!(r.mouse_radius, 90.0);
        assert_eq!(r.mouse_force, Repulsion::default().mouse_force);
    }

    #[test]
    fn normalized_clamps_instead_of_rejecting() {
        let cfg = Config {
            min_size: 400.0,
            max_size: 100.0,
            opacity: 3.0,
            vertical_margin: 0.9,
            jitter_y: 1.0,
            max_concurrent: 0,
            adapt_max_on_small: 0,
            repulsion: Some(Repulsion {
                mouse_radius: 0.0,
                mouse_force: 1.0,
            }),
            ..Config::default()
        }
        .normalized();
        assert_eq!((cfg.min_size, cfg.max_size), (100.0, 400.0));
        assert_eq!(cfg.opacity, 1.0);
        assert_eq!(cfg.vertical_margin, 0.49);
        assert_eq!(cfg.jitter_y, 4.0);
        assert_eq!(cfg.max_concurrent, 1);
        assert_eq!(cfg.adapt_max_on_small, 1);
        assert!(cfg.repulsion.is_none());
    }

    #[test]
    fn stalled_speeds_get_a_floor() {
        let cfg = Config {
            min_speed: -1.0,
            max_speed: 0.0,
            ..Config::default()
        }
        .normalized();
        assert_eq!((cfg.min_speed, cfg.max_speed), (MIN_SPEED, MIN_SPEED));

        let cfg = Config {
            min_speed: 0.0,
            max_speed: 0.08,
            ..Config::default()
        }
        .normalized();
        assert_eq!((cfg.min_speed, cfg.max_speed), (MIN_SPEED, 0.08));
    }

    #[test]
    fn missing_file_is_default() {
        let cfg = load_config(Path::new("/definitely/not/here/shoal.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn broken_file_is_parse_error() {
        let path = std::env::temp_dir().join(format!("shoal-broken-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
