// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend selection policy and manager configuration.

use kurbo::Rect;

use crate::backends::spatial_hash::DEFAULT_CELL_SIZE;
use crate::bounds::is_queryable;

/// Backend selection policy for [`SpatialManager`](crate::SpatialManager).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpatialStrategy {
    /// Choose by object count, with hysteresis between the two thresholds.
    #[default]
    Auto,
    /// Always use the quadtree.
    QuadTree,
    /// Always use the spatial hash.
    SpatialHash,
}

/// A concrete backend the manager can run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackendKind {
    /// [`QuadTree`](crate::QuadTree).
    QuadTree,
    /// [`SpatialHash`](crate::SpatialHash).
    SpatialHash,
}

impl BackendKind {
    /// Human-readable backend name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::QuadTree => "QuadTree",
            Self::SpatialHash => "SpatialHash",
        }
    }
}

/// Errors reported when validating a [`SpatialConfig`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Cell size was not a finite positive number.
    #[error("cell size must be finite and positive, got {0}")]
    InvalidCellSize(f64),
    /// World bounds were not finite or had no area.
    #[error("world bounds must be finite with positive width and height, got {0:?}")]
    InvalidWorldBounds(Rect),
    /// The quadtree threshold exceeded the spatial hash threshold.
    #[error("quadtree threshold {quad_tree} exceeds spatial hash threshold {hash}")]
    InvertedThresholds {
        /// Requested quadtree threshold.
        quad_tree: usize,
        /// Requested spatial hash threshold.
        hash: usize,
    },
}

/// Configuration recognized by [`SpatialManager`](crate::SpatialManager).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpatialConfig {
    /// Backend selection policy.
    pub strategy: SpatialStrategy,
    /// In `Auto` mode, object counts below this select the quadtree.
    pub quad_tree_threshold: usize,
    /// In `Auto` mode, object counts above this select the spatial hash.
    pub hash_threshold: usize,
    /// Root extent of the quadtree backend.
    pub world_bounds: Rect,
    /// Bucket size of the spatial hash backend.
    pub cell_size: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            strategy: SpatialStrategy::Auto,
            quad_tree_threshold: 1000,
            hash_threshold: 5000,
            world_bounds: Rect::new(0.0, 0.0, 10_000.0, 10_000.0),
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl SpatialConfig {
    /// Set the backend selection policy.
    pub fn with_strategy(mut self, strategy: SpatialStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the `Auto` thresholds.
    pub fn with_auto_thresholds(mut self, quad_tree: usize, hash: usize) -> Self {
        self.quad_tree_threshold = quad_tree;
        self.hash_threshold = hash;
        self
    }

    /// Set the quadtree root extent.
    pub fn with_world_bounds(mut self, world_bounds: Rect) -> Self {
        self.world_bounds = world_bounds;
        self
    }

    /// Set the spatial hash cell size.
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        if !is_queryable(&self.world_bounds) {
            return Err(ConfigError::InvalidWorldBounds(self.world_bounds));
        }
        if self.quad_tree_threshold > self.hash_threshold {
            return Err(ConfigError::InvertedThresholds {
                quad_tree: self.quad_tree_threshold,
                hash: self.hash_threshold,
            });
        }
        Ok(())
    }
}
