// crates/kosli-provider/src/provider.rs
// ============================================================================
// Module: Provider
// Description: Configured entry point handing out resources and data sources.
// Purpose: Resolve configuration once and share one client across handlers.
// Dependencies: kosli-client, kosli-config, tracing
// ============================================================================

//! ## Overview
//! [`KosliProvider`] is built once per engine session. Every handler it hands
//! out shares the same [`KosliClient`], so the transport and its connection
//! pool are shared too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use kosli_client::KosliClient;
use kosli_config::ProviderConfig;
use tracing::info;

use crate::attestation_type::CustomAttestationTypeResource;
use crate::data_sources::ATTESTATION_TYPE_DATA_SOURCE;
use crate::data_sources::DataSources;
use crate::data_sources::ENVIRONMENT_DATA_SOURCE;
use crate::data_sources::LOGICAL_ENVIRONMENT_DATA_SOURCE;
use crate::environment::EnvironmentResource;
use crate::error::ProviderError;
use crate::lifecycle::Resource;
use crate::logical_environment::LogicalEnvironmentResource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider version reported in the user agent.
pub const PROVIDER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Configured provider.
#[derive(Debug, Clone)]
pub struct KosliProvider {
    /// Organization-scoped API client shared by all handlers.
    client: KosliClient,
}

impl KosliProvider {
    /// Builds the provider from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] when the configuration is
    /// incomplete or the HTTP client cannot be built.
    pub fn configure(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = config
            .build_client(PROVIDER_VERSION)
            .map_err(|err| ProviderError::Configuration(err.to_string()))?;
        info!(
            org = client.organization(),
            base_url = config.base_url(),
            version = PROVIDER_VERSION,
            "kosli provider configured"
        );
        Ok(Self::from_client(client))
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn from_client(client: KosliClient) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    #[must_use]
    pub const fn client(&self) -> &KosliClient {
        &self.client
    }

    /// Returns the custom attestation type resource.
    #[must_use]
    pub fn custom_attestation_types(&self) -> CustomAttestationTypeResource {
        CustomAttestationTypeResource::new(self.client.clone())
    }

    /// Returns the physical environment resource.
    #[must_use]
    pub fn environments(&self) -> EnvironmentResource {
        EnvironmentResource::new(self.client.clone())
    }

    /// Returns the logical environment resource.
    #[must_use]
    pub fn logical_environments(&self) -> LogicalEnvironmentResource {
        LogicalEnvironmentResource::new(self.client.clone())
    }

    /// Returns the data source lookups.
    #[must_use]
    pub fn data_sources(&self) -> DataSources {
        DataSources::new(self.client.clone())
    }

    /// Lists the managed resource type names.
    #[must_use]
    pub const fn resource_types() -> [&'static str; 3] {
        [
            CustomAttestationTypeResource::TYPE_NAME,
            EnvironmentResource::TYPE_NAME,
            LogicalEnvironmentResource::TYPE_NAME,
        ]
    }

    /// Lists the data source type names.
    #[must_use]
    pub const fn data_source_types() -> [&'static str; 3] {
        [ATTESTATION_TYPE_DATA_SOURCE, ENVIRONMENT_DATA_SOURCE, LOGICAL_ENVIRONMENT_DATA_SOURCE]
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
