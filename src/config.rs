//! Responder configuration.
//!
//! [`ResponderConfig`] bounds outbound frame sizes, enables fragmentation via
//! the MTU and caps the size of reassembled inbound payloads. Values can be
//! built programmatically through [`ResponderConfigBuilder`] or deserialized
//! with `serde` and then checked with [`ResponderConfig::validate`].

use std::num::NonZeroUsize;

use serde::Deserialize;
use thiserror::Error;

use crate::frame::{FRAME_LENGTH_MASK, MIN_MTU_SIZE};

/// Default cap on reassembled inbound payloads.
pub const DEFAULT_MAX_INBOUND_PAYLOAD_SIZE: usize = i32::MAX as usize;

/// Errors returned when a configuration violates the protocol limits.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The MTU was neither zero nor within `[MIN_MTU_SIZE, max_frame_length]`.
    #[error(
        "invalid mtu {mtu}; must be 0 or between {min} and {max_frame_length}",
        min = MIN_MTU_SIZE
    )]
    InvalidMtu { mtu: usize, max_frame_length: usize },
    /// The maximum frame length was outside `[MIN_MTU_SIZE, FRAME_LENGTH_MASK]`.
    #[error(
        "invalid max frame length {0}; must be between {min} and {max}",
        min = MIN_MTU_SIZE,
        max = FRAME_LENGTH_MASK
    )]
    InvalidMaxFrameLength(usize),
    /// The inbound payload cap was smaller than [`MIN_MTU_SIZE`].
    #[error(
        "invalid max inbound payload size {0}; must be at least {min}",
        min = MIN_MTU_SIZE
    )]
    InvalidMaxInboundPayloadSize(usize),
}

/// Limits applied by every request-stream responder on a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Fragment outbound frames larger than this many bytes; 0 disables
    /// fragmentation.
    pub mtu: usize,
    /// Largest frame the peer accepts, including the length prefix.
    pub max_frame_length: usize,
    /// Hard cap on a reassembled inbound payload.
    pub max_inbound_payload_size: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            mtu: 0,
            max_frame_length: FRAME_LENGTH_MASK,
            max_inbound_payload_size: DEFAULT_MAX_INBOUND_PAYLOAD_SIZE,
        }
    }
}

impl ResponderConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> ResponderConfigBuilder { ResponderConfigBuilder::default() }

    /// Check the configuration against the protocol limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_MTU_SIZE..=FRAME_LENGTH_MASK).contains(&self.max_frame_length) {
            return Err(ConfigError::InvalidMaxFrameLength(self.max_frame_length));
        }
        if self.mtu != 0 && !(MIN_MTU_SIZE..=self.max_frame_length).contains(&self.mtu) {
            return Err(ConfigError::InvalidMtu {
                mtu: self.mtu,
                max_frame_length: self.max_frame_length,
            });
        }
        if self.max_inbound_payload_size < MIN_MTU_SIZE {
            return Err(ConfigError::InvalidMaxInboundPayloadSize(
                self.max_inbound_payload_size,
            ));
        }
        Ok(())
    }

    /// The inbound cap as a non-zero value.
    ///
    /// Validated configurations always return the configured value; an
    /// unvalidated zero falls back to [`MIN_MTU_SIZE`].
    #[must_use]
    pub fn inbound_limit(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_inbound_payload_size)
            .or(NonZeroUsize::new(MIN_MTU_SIZE))
            .unwrap_or(NonZeroUsize::MIN)
    }
}

/// Builder for [`ResponderConfig`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponderConfigBuilder {
    config: ResponderConfig,
}

impl ResponderConfigBuilder {
    /// Set the fragmentation MTU; 0 disables fragmentation.
    #[must_use]
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.config.mtu = mtu;
        self
    }

    /// Set the maximum outbound frame length.
    #[must_use]
    pub fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.config.max_frame_length = max_frame_length;
        self
    }

    /// Set the cap on reassembled inbound payloads.
    #[must_use]
    pub fn max_inbound_payload_size(mut self, size: usize) -> Self {
        self.config.max_inbound_payload_size = size;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any limit is out of range.
    pub fn build(self) -> Result<ResponderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
