use util::sync::Mutex as SyncMutex;

use super::*;
use crate::error::Result;
use crate::mock::mock_interceptor::MockInterceptor;
use crate::mock::mock_transport::MockTransport;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::RECEIVE_MTU;

#[test]
fn test_new_api() {
    let api = APIBuilder::new().build();

    assert_eq!(api.setting_engine.get_receive_mtu(), RECEIVE_MTU);
    assert!(api.media_engine.get_codecs_by_kind(RTPCodecType::Video).is_empty());
    assert!(api.interceptor_registry.is_empty());
}

#[test]
fn test_new_api_with_options() -> Result<()> {
    let mut s = SettingEngine::default();
    s.set_receive_mtu(8192);
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;

    let api = APIBuilder::new()
        .with_setting_engine(s)
        .with_media_engine(m)
        .build();

    assert_eq!(api.setting_engine.get_receive_mtu(), 8192);
    assert!(!api.media_engine.get_codecs_by_kind(RTPCodecType::Video).is_empty());
    assert!(!api.media_engine.get_codecs_by_kind(RTPCodecType::Audio).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_new_media_connection_binds_rtcp_writer_once() -> Result<()> {
    let events = Arc::new(SyncMutex::new(vec![]));
    let mut registry = Registry::new();
    registry.add(Arc::new(MockInterceptor::new("mock", Arc::clone(&events))));

    let api = APIBuilder::new().with_interceptor_registry(registry).build();
    let connection = api
        .new_media_connection(Arc::new(MockTransport::new()))
        .await;

    assert_eq!(*events.lock(), vec!["mock:bind_rtcp_writer"]);
    assert!(!connection.is_closed());
    connection.close().await?;
    assert_eq!(*events.lock(), vec!["mock:bind_rtcp_writer", "mock:close"]);

    Ok(())
}
