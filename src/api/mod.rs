#[cfg(test)]
mod api_test;

pub mod interceptor_registry;
pub mod media_engine;
pub mod setting_engine;

use std::sync::Arc;

use media_engine::*;
use setting_engine::*;

use crate::connection::MediaConnection;
use crate::interceptor::registry::Registry;
use crate::transport::SecureTransport;

/// API bundles the configuration a MediaConnection is built from. Each API builds exactly
/// one connection: its interceptor registry is consumed when the connection is created.
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) media_engine: Arc<MediaEngine>,
    pub(crate) interceptor_registry: Registry,
}

impl API {
    /// new_media_connection creates a MediaConnection over an established secure transport.
    pub async fn new_media_connection(
        self,
        transport: Arc<dyn SecureTransport + Send + Sync>,
    ) -> Arc<MediaConnection> {
        MediaConnection::new(self, transport).await
    }
}

#[derive(Default)]
pub struct APIBuilder {
    setting_engine: Option<Arc<SettingEngine>>,
    media_engine: Option<Arc<MediaEngine>>,
    interceptor_registry: Option<Registry>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    pub fn build(self) -> API {
        API {
            setting_engine: self
                .setting_engine
                .unwrap_or_else(|| Arc::new(SettingEngine::default())),
            media_engine: self
                .media_engine
                .unwrap_or_else(|| Arc::new(MediaEngine::default())),
            interceptor_registry: self.interceptor_registry.unwrap_or_default(),
        }
    }

    /// with_setting_engine allows providing a SettingEngine to the API.
    /// Settings should not be changed after passing the engine to an API.
    pub fn with_setting_engine(mut self, setting_engine: SettingEngine) -> Self {
        self.setting_engine = Some(Arc::new(setting_engine));
        self
    }

    /// with_media_engine allows providing a MediaEngine to the API.
    pub fn with_media_engine(mut self, media_engine: MediaEngine) -> Self {
        self.media_engine = Some(Arc::new(media_engine));
        self
    }

    /// with_interceptor_registry allows providing Interceptors to the API.
    pub fn with_interceptor_registry(mut self, interceptor_registry: Registry) -> Self {
        self.interceptor_registry = Some(interceptor_registry);
        self
    }
}
