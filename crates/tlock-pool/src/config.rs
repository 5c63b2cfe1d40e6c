//! Pool and system configuration.
//!
//! Fixed-point fields (`max_bonus`, curve samples, escrow portion) are
//! written as decimal strings such as `"1.5"` and parsed into WAD values.
//! A [`SystemConfig`] is loaded from a TOML file layered with `TLOCK_`
//! environment overrides (e.g. `TLOCK_LOG_LEVEL=debug`).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tlock_core::constants::{DEFAULT_LOG_LEVEL, DEFAULT_MAX_LOCK_DURATION, MIN_CURVE_LEN, MIN_LOCK_DURATION, WAD};
use tlock_core::error::PoolError;
use tlock_core::types::AssetId;
use tlock_curve::{Curve, MultiplierEngine};

/// Escrow wiring of a pool, by name of the receiving pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    pub pool_name: String,
    /// Fraction of each claim that is re-locked, WAD-scaled in `[0, 1]`.
    #[serde(with = "wad_serde")]
    pub portion: u128,
    /// Lock applied to every escrow deposit, in seconds.
    pub duration: u64,
}

/// Configuration of a single pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    #[serde(default = "default_min_lock")]
    pub min_lock_duration: u64,
    #[serde(default = "default_max_lock")]
    pub max_lock_duration: u64,
    #[serde(with = "wad_serde")]
    pub max_bonus: u128,
    #[serde(with = "wad_vec_serde")]
    pub curve: Vec<u128>,
    pub deposit_asset: AssetId,
    pub reward_asset: AssetId,
    #[serde(default)]
    pub escrow: Option<EscrowConfig>,
}

fn default_min_lock() -> u64 {
    MIN_LOCK_DURATION
}

fn default_max_lock() -> u64 {
    DEFAULT_MAX_LOCK_DURATION
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl PoolConfig {
    /// Flat, bonus-free pool: every lock mints shares 1:1.
    ///
    /// The usual shape of an escrow pool.
    pub fn flat(name: impl Into<String>, deposit_asset: AssetId, reward_asset: AssetId) -> Self {
        Self {
            name: name.into(),
            min_lock_duration: MIN_LOCK_DURATION,
            max_lock_duration: DEFAULT_MAX_LOCK_DURATION,
            max_bonus: 0,
            curve: vec![WAD, WAD],
            deposit_asset,
            reward_asset,
            escrow: None,
        }
    }

    /// Check everything a pool needs to uphold its invariants.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.name.trim().is_empty() {
            return Err(PoolError::InvalidConfig("pool name is empty".into()));
        }
        if self.curve.len() < MIN_CURVE_LEN {
            return Err(PoolError::InvalidConfig(format!(
                "pool {}: curve needs at least {MIN_CURVE_LEN} points, got {}",
                self.name,
                self.curve.len()
            )));
        }
        if self.max_lock_duration < self.min_lock_duration {
            return Err(PoolError::InvalidConfig(format!(
                "pool {}: max_lock_duration {} is below min_lock_duration {}",
                self.name, self.max_lock_duration, self.min_lock_duration
            )));
        }
        if let Some(escrow) = &self.escrow {
            if escrow.portion > WAD {
                return Err(PoolError::InvalidConfig(format!(
                    "pool {}: escrow portion above 1.0",
                    self.name
                )));
            }
            if escrow.pool_name == self.name {
                return Err(PoolError::InvalidConfig(format!(
                    "pool {}: cannot escrow into itself",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Engine for this pool's duration bounds and cap.
    pub fn engine(&self) -> Result<MultiplierEngine, PoolError> {
        MultiplierEngine::new(self.min_lock_duration, self.max_lock_duration, self.max_bonus)
    }

    pub fn initial_curve(&self) -> Result<Curve, PoolError> {
        Ok(Curve::new(self.curve.clone())?)
    }
}

/// Top-level configuration: logging plus every pool to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pools: Vec::new(),
        }
    }
}

impl SystemConfig {
    /// Load from an optional TOML file, then apply `TLOCK_*` environment
    /// overrides. Nested keys use `__` as separator.
    pub fn load(path: Option<&Path>) -> Result<Self, PoolError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("TLOCK").separator("__"));
        let cfg: SystemConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, PoolError> {
        let cfg: SystemConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate every pool plus cross-pool references.
    pub fn validate(&self) -> Result<(), PoolError> {
        for (i, pool) in self.pools.iter().enumerate() {
            pool.validate()?;
            if self.pools[..i].iter().any(|p| p.name == pool.name) {
                return Err(PoolError::InvalidConfig(format!("duplicate pool name {}", pool.name)));
            }
        }
        for pool in &self.pools {
            if let Some(escrow) = &pool.escrow {
                let target = self.pool(&escrow.pool_name).ok_or_else(|| {
                    PoolError::InvalidConfig(format!(
                        "pool {}: escrow pool {} is not configured",
                        pool.name, escrow.pool_name
                    ))
                })?;
                if target.deposit_asset != pool.reward_asset {
                    return Err(PoolError::InvalidConfig(format!(
                        "pool {}: escrow pool {} does not accept {}",
                        pool.name, escrow.pool_name, pool.reward_asset
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }
}

/// Accepts `"1.5"` strings and plain integers; writes strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum WadRepr {
    Text(String),
    Int(u64),
}

impl WadRepr {
    fn into_wad<E: serde::de::Error>(self) -> Result<u128, E> {
        match self {
            WadRepr::Text(s) => tlock_core::math::parse_wad(&s)
                .ok_or_else(|| E::custom(format!("invalid decimal value {s:?}"))),
            WadRepr::Int(v) => (v as u128)
                .checked_mul(WAD)
                .ok_or_else(|| E::custom("decimal value out of range")),
        }
    }
}

mod wad_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use tlock_core::math::format_wad;

    use super::WadRepr;

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_wad(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        WadRepr::deserialize(d)?.into_wad()
    }
}

mod wad_vec_serde {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};
    use tlock_core::math::format_wad;

    use super::WadRepr;

    pub fn serialize<S: Serializer>(values: &[u128], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&format_wad(*v))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u128>, D::Error> {
        Vec::<WadRepr>::deserialize(d)?
            .into_iter()
            .map(WadRepr::into_wad)
            .collect()
    }
}
