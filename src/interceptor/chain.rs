use std::sync::Arc;

use super::*;
use crate::error::flatten_errs;

/// Chain composes plugins into one Interceptor.
///
/// Binding folds the stage through the plugins in registration order, each wrapping what the
/// previous one returned. At call time the last registered plugin therefore runs first and the
/// first registered one sits next to the transport. This holds for every bind kind.
#[derive(Default)]
pub struct Chain {
    plugins: Vec<Arc<dyn Interceptor + Send + Sync>>,
}

impl Chain {
    /// new builds a Chain over `plugins`, in registration order.
    pub fn new(plugins: Vec<Arc<dyn Interceptor + Send + Sync>>) -> Self {
        Chain { plugins }
    }

    /// len is the number of plugins in the chain.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[async_trait]
impl Interceptor for Chain {
    async fn bind_rtcp_reader(
        &self,
        mut reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        for plugin in &self.plugins {
            reader = plugin.bind_rtcp_reader(reader).await;
        }
        reader
    }

    async fn bind_rtcp_writer(
        &self,
        mut writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        for plugin in &self.plugins {
            writer = plugin.bind_rtcp_writer(writer).await;
        }
        writer
    }

    /// bind_local_stream hands every plugin the same StreamInfo. The writer returned to the
    /// sender belongs to the last plugin.
    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        mut writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        for plugin in &self.plugins {
            writer = plugin.bind_local_stream(info, writer).await;
        }
        writer
    }

    /// Unbinds reach every plugin, in registration order.
    async fn unbind_local_stream(&self, info: &StreamInfo) {
        for plugin in &self.plugins {
            plugin.unbind_local_stream(info).await;
        }
    }

    /// bind_remote_stream wraps the track's raw reader; the track reads through the last
    /// plugin's reader.
    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        mut reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        for plugin in &self.plugins {
            reader = plugin.bind_remote_stream(info, reader).await;
        }
        reader
    }

    async fn unbind_remote_stream(&self, info: &StreamInfo) {
        for plugin in &self.plugins {
            plugin.unbind_remote_stream(info).await;
        }
    }

    /// close closes every plugin, even after one fails, and joins the failures into one
    /// error.
    async fn close(&self) -> Result<()> {
        let mut errs = vec![];
        for plugin in &self.plugins {
            if let Err(err) = plugin.close().await {
                log::warn!("failed to close plugin: {}", err);
                errs.push(err);
            }
        }
        flatten_errs(errs)
    }
}
