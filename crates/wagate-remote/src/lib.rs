// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote client backends.
//!
//! The session runtime only sees [`wagate_core::RemoteClientFactory`]. This
//! crate provides the loopback backend, a deterministic in-process network
//! used for development and tests.

pub mod loopback;

use std::sync::Arc;

use tracing::info;
use wagate_config::model::{RemoteBackend, RemoteConfig};
use wagate_core::{DeviceKeystore, RemoteClientFactory};

pub use loopback::{LoopbackClient, LoopbackFactory, LoopbackNetwork, LoopbackSettings, SentMessage};

/// A constructed backend: the factory the runtime uses, plus the loopback
/// controller when that backend is selected.
pub struct RemoteBackendHandle {
    pub factory: Arc<dyn RemoteClientFactory>,
    pub loopback: Option<LoopbackNetwork>,
}

/// Build the configured remote backend over the given keystore.
pub fn build_backend(config: &RemoteConfig, keystore: Arc<dyn DeviceKeystore>) -> RemoteBackendHandle {
    match config.backend {
        RemoteBackend::Loopback => {
            let settings = LoopbackSettings::from_config(config);
            info!(
                qr_interval_secs = settings.qr_interval.as_secs(),
                qr_codes = settings.qr_codes,
                auto_pair = ?settings.auto_pair,
                "using loopback remote backend"
            );
            let network = LoopbackNetwork::new(settings);
            RemoteBackendHandle {
                factory: Arc::new(LoopbackFactory::new(network.clone(), keystore)),
                loopback: Some(network),
            }
        }
    }
}
