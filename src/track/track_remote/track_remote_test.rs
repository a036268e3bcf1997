use util::sync::Mutex as SyncMutex;

use super::*;
use crate::interceptor::registry::Registry;
use crate::mock::mock_interceptor::{count_events, MockInterceptor};
use crate::RECEIVE_MTU;

async fn detached_track(
    interceptor: &Arc<dyn Interceptor + Send + Sync>,
) -> Result<Arc<TrackRemote>> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;

    let stream_info = StreamInfo {
        ssrc: 5000,
        ..Default::default()
    };
    Ok(TrackRemote::new(
        RECEIVE_MTU,
        RTPCodecType::Audio,
        5000,
        "hi".to_owned(),
        Weak::new(),
        Arc::new(m),
        interceptor,
        &stream_info,
    )
    .await)
}

#[tokio::test]
async fn test_track_remote_binds_once_at_construction() -> Result<()> {
    let events = Arc::new(SyncMutex::new(vec![]));
    let mut registry = Registry::new();
    registry.add(Arc::new(MockInterceptor::new("mock", Arc::clone(&events))));
    let interceptor = registry.build();

    let track = detached_track(&interceptor).await?;
    assert_eq!(*events.lock(), vec!["mock:bind_remote_stream:5000"]);

    // without a receiver every read fails, but never binds again
    assert_eq!(track.read_rtp().await.err(), Some(Error::ErrRTPReceiverNil));
    assert_eq!(track.read_rtp().await.err(), Some(Error::ErrRTPReceiverNil));
    assert_eq!(count_events(&events, "mock:bind_remote_stream:5000"), 1);
    assert_eq!(count_events(&events, "mock:read"), 2);

    Ok(())
}

#[tokio::test]
async fn test_track_remote_accessors() -> Result<()> {
    let interceptor = Registry::new().build();
    let track = detached_track(&interceptor).await?;

    assert_eq!(track.rid(), "hi");
    assert_eq!(track.ssrc(), 5000);
    assert_eq!(track.kind(), RTPCodecType::Audio);

    track.set_id("audio".to_owned());
    track.set_stream_id("desktop".to_owned());
    assert_eq!(track.msid(), "desktop audio");

    track.set_kind(RTPCodecType::Video);
    track.set_ssrc(6000);
    track.set_payload_type(111);
    assert_eq!(track.kind(), RTPCodecType::Video);
    assert_eq!(track.ssrc(), 6000);
    assert_eq!(track.payload_type(), 111);

    Ok(())
}

#[tokio::test]
async fn test_track_remote_read_without_receiver() -> Result<()> {
    let interceptor = Registry::new().build();
    let track = detached_track(&interceptor).await?;

    let mut b = vec![0u8; RECEIVE_MTU];
    assert_eq!(track.read(&mut b).await, Err(Error::ErrRTPReceiverNil));
    assert_eq!(
        track.determine_payload_type().await,
        Err(Error::ErrRTPReceiverNil)
    );

    Ok(())
}
