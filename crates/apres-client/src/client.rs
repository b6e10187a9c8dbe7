//! ApRES client facade

use std::sync::Arc;

use url::Url;

use crate::burst::BurstController;
use crate::data::DataResource;
use crate::error::Result;
use crate::radar_config::RadarConfigResource;
use crate::settings::ClientSettings;
use crate::system::SystemResource;
use crate::transport::Transport;

/// Client for one ApRES device
///
/// Resources share a single transport, so the API key set here applies to
/// every subsequent request.
#[derive(Debug, Clone)]
pub struct ApresClient {
    transport: Arc<Transport>,
    system: SystemResource,
    radar: BurstController,
    data: DataResource,
}

impl ApresClient {
    /// Create a client with default settings
    ///
    /// # Arguments
    /// * `root` - Device root URL (e.g., "http://radar.localnet"); `http://` is
    ///   assumed when no scheme is given
    pub fn new(root: &str) -> Result<Self> {
        Self::with_settings(ClientSettings::new(root))
    }

    /// Create a client from explicit settings
    pub fn with_settings(settings: ClientSettings) -> Result<Self> {
        let transport = Arc::new(Transport::new(settings)?);
        let config = RadarConfigResource::new(transport.clone());

        Ok(Self {
            system: SystemResource::new(transport.clone()),
            radar: BurstController::new(transport.clone(), config),
            data: DataResource::new(transport.clone()),
            transport,
        })
    }

    /// Normalised device root
    pub fn root(&self) -> &Url {
        self.transport.root()
    }

    pub fn settings(&self) -> &ClientSettings {
        self.transport.settings()
    }

    pub fn api_key(&self) -> String {
        self.transport.api_key()
    }

    /// Replace the API key; empty keys are rejected
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        self.transport.set_api_key(key)
    }

    /// Absolute URL of an endpoint path such as `radar/results`
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.transport.endpoint_url(path)
    }

    pub fn system(&self) -> &SystemResource {
        &self.system
    }

    /// Burst start and results polling
    pub fn radar(&self) -> &BurstController {
        &self.radar
    }

    pub fn radar_config(&self) -> &RadarConfigResource {
        self.radar.config()
    }

    pub fn data(&self) -> &DataResource {
        &self.data
    }
}
