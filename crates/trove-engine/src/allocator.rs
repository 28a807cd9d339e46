//! Asset code allocation
//!
//! Assigns codes to assets, either validating a provided code or
//! generating one with collision retry. Each generation attempt runs in
//! its own transaction: a uniqueness conflict rolls back only that
//! attempt, and the loop draws a fresh candidate.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use trove_core::{AssetCode, AssetId, CodeRegistry, CodeRng, CodeType};
use trove_db::Store;

/// Assigns asset codes against a store
pub struct CodeAllocator<'s> {
    store: &'s Store,
    registry: CodeRegistry,
    rng: CodeRng,
    max_attempts: u32,
}

impl<'s> CodeAllocator<'s> {
    /// Create an allocator seeded from the system clock
    pub fn new(store: &'s Store, config: &EngineConfig) -> Self {
        Self::with_rng(store, config, CodeRng::from_entropy())
    }

    /// Create an allocator with an explicit RNG, for reproducible runs
    pub fn with_rng(store: &'s Store, config: &EngineConfig, rng: CodeRng) -> Self {
        Self {
            store,
            registry: CodeRegistry::new(config.code_config.clone()),
            rng,
            max_attempts: config.max_generate_attempts,
        }
    }

    /// Assign a code to an asset.
    ///
    /// With an explicit code, validation failures surface as
    /// [`Error::InvalidCode`] and a store uniqueness violation
    /// propagates unchanged. Without one, a code is generated and
    /// retried on collision up to the configured bound.
    pub fn add_code(
        &mut self,
        asset: AssetId,
        code_type: CodeType,
        explicit: Option<&str>,
    ) -> Result<AssetCode> {
        match explicit {
            Some(code) => self.add_explicit(asset, code_type, code),
            None => self.add_generated(asset, code_type),
        }
    }

    fn add_explicit(&self, asset: AssetId, code_type: CodeType, code: &str) -> Result<AssetCode> {
        self.registry
            .validate(code_type, code)
            .map_err(Error::InvalidCode)?;

        let txn = self.store.begin_write()?;
        if txn.asset(asset)?.is_none() {
            return Err(Error::AssetNotFound(asset));
        }
        let row = AssetCode {
            id: txn.next_code_id()?,
            code: code.to_string(),
            code_type,
            asset,
        };
        txn.insert_code(&row)?;
        txn.commit()?;
        Ok(row)
    }

    fn add_generated(&mut self, asset: AssetId, code_type: CodeType) -> Result<AssetCode> {
        for _ in 0..self.max_attempts {
            let candidate = self
                .registry
                .generate(code_type, &mut self.rng)
                .ok_or(Error::GenerationUnsupported)?;

            // One attempt, one transaction: a collision rolls back this
            // attempt only.
            let txn = self.store.begin_write()?;
            if txn.asset(asset)?.is_none() {
                return Err(Error::AssetNotFound(asset));
            }
            let row = AssetCode {
                id: txn.next_code_id()?,
                code: candidate,
                code_type,
                asset,
            };
            match txn.insert_code(&row) {
                Ok(()) => {
                    txn.commit()?;
                    return Ok(row);
                }
                Err(e) if e.is_duplicate_key() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::ExhaustedRetries(self.max_attempts))
    }
}
