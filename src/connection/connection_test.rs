use std::time::Duration;

use bytes::Bytes;
use rtcp::transport_feedbacks::transport_layer_nack::{NackPair, TransportLayerNack};
use util::sync::Mutex as SyncMutex;

use super::*;
use crate::api::interceptor_registry::configure_nack;
use crate::api::media_engine::MIME_TYPE_VP8;
use crate::api::APIBuilder;
use crate::error::Error;
use crate::interceptor::registry::Registry;
use crate::mock::mock_interceptor::{count_events, MockInterceptor};
use crate::mock::mock_transport::MockTransport;
use crate::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use crate::rtp_transceiver::{
    RTCRtpDecodingParameters, RTCRtpEncodingParameters, RTCRtpReceiveParameters,
    RTCRtpSendParameters,
};
use crate::test::timeout_or_fail;
use crate::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use crate::track::track_local::TrackLocalWriter;

fn vp8_track() -> Arc<TrackLocalStaticRTP> {
    Arc::new(TrackLocalStaticRTP::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    ))
}

fn packet(ssrc: u32, sequence_number: u16) -> rtp::packet::Packet {
    rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            payload_type: 96,
            sequence_number,
            ssrc,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0xAA, 0xBB]),
    }
}

async fn nack_connection() -> Result<(Arc<MediaConnection>, Arc<MockTransport>)> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let registry = configure_nack(Registry::new(), &mut m);

    let api = APIBuilder::new()
        .with_media_engine(m)
        .with_interceptor_registry(registry)
        .build();
    let transport = Arc::new(MockTransport::new());
    let connection = api
        .new_media_connection(Arc::clone(&transport) as Arc<dyn SecureTransport + Send + Sync>)
        .await;

    Ok((connection, transport))
}

#[tokio::test]
async fn test_media_connection_mock_sees_both_directions() -> Result<()> {
    let events = Arc::new(SyncMutex::new(vec![]));
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let mut registry = Registry::new();
    registry.add(Arc::new(
        MockInterceptor::new("mock", Arc::clone(&events)).with_header_extension(1, "tag"),
    ));

    let api = APIBuilder::new()
        .with_media_engine(m)
        .with_interceptor_registry(registry)
        .build();
    let transport = Arc::new(MockTransport::new());
    let connection = api
        .new_media_connection(Arc::clone(&transport) as Arc<dyn SecureTransport + Send + Sync>)
        .await;
    assert_eq!(*events.lock(), vec!["mock:bind_rtcp_writer"]);

    // outbound
    let track = vp8_track();
    let sender = connection
        .new_rtp_sender(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
        .await?;
    sender.send(&RTCRtpSendParameters::default()).await?;
    track.write_rtp(&packet(0, 1)).await?;

    let written = timeout_or_fail(Duration::from_millis(100), transport.written_rtp())
        .await
        .expect("a written packet");
    assert_eq!(written.header.ssrc, sender.ssrc());
    assert_eq!(
        written.header.get_extension(1),
        Some(Bytes::from_static(b"tag"))
    );

    // inbound
    let receiver = connection.new_rtp_receiver(RTPCodecType::Video);
    receiver
        .receive(&RTCRtpReceiveParameters {
            encodings: vec![RTCRtpDecodingParameters {
                ssrc: 2000,
                ..Default::default()
            }],
        })
        .await?;
    transport.inject_rtp(2000, &packet(2000, 5))?;

    let track_remote = receiver.track().expect("a track after receive");
    let pkt = timeout_or_fail(Duration::from_millis(100), track_remote.read_rtp()).await?;
    assert_eq!(pkt.header.sequence_number, 5);
    assert_eq!(pkt.header.get_extension(1), Some(Bytes::from_static(b"tag")));

    // rtcp
    let nack: Box<dyn rtcp::packet::Packet + Send + Sync> = Box::new(TransportLayerNack {
        sender_ssrc: 1,
        media_ssrc: 2000,
        nacks: vec![NackPair {
            packet_id: 5,
            lost_packets: 0,
        }],
    });
    connection.write_rtcp(&[nack]).await?;
    assert!(
        timeout_or_fail(Duration::from_millis(100), transport.written_rtcp())
            .await
            .is_some()
    );
    assert_eq!(count_events(&events, "mock:rtcp_write"), 1);

    Ok(())
}

#[tokio::test]
async fn test_media_connection_nack_generator_reports_gaps() -> Result<()> {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();

    let (connection, transport) = nack_connection().await?;

    let receiver = connection.new_rtp_receiver(RTPCodecType::Video);
    receiver
        .receive(&RTCRtpReceiveParameters {
            encodings: vec![RTCRtpDecodingParameters {
                ssrc: 3000,
                ..Default::default()
            }],
        })
        .await?;
    let track = receiver.track().expect("a track after receive");

    transport.inject_rtp(3000, &packet(3000, 10))?;
    transport.inject_rtp(3000, &packet(3000, 12))?;
    for _ in 0..2 {
        timeout_or_fail(Duration::from_millis(100), track.read_rtp()).await?;
    }

    let pkts = timeout_or_fail(Duration::from_millis(500), transport.written_rtcp())
        .await
        .expect("a nack");
    let nack = pkts[0]
        .as_any()
        .downcast_ref::<TransportLayerNack>()
        .expect("a TransportLayerNack");
    assert_eq!(nack.media_ssrc, 3000);
    assert_eq!(
        nack.nacks,
        vec![NackPair {
            packet_id: 11,
            lost_packets: 0,
        }]
    );

    connection.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_media_connection_nack_responder_resends() -> Result<()> {
    let (connection, transport) = nack_connection().await?;

    let track = vp8_track();
    let sender = connection
        .new_rtp_sender(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
        .await?;
    sender
        .send(&RTCRtpSendParameters {
            encodings: vec![RTCRtpEncodingParameters {
                ssrc: 4000,
                ..Default::default()
            }],
            ..Default::default()
        })
        .await?;

    for seq in 1..=3u16 {
        track.write_rtp(&packet(0, seq)).await?;
        timeout_or_fail(Duration::from_millis(100), transport.written_rtp()).await;
    }

    let nack: Box<dyn rtcp::packet::Packet + Send + Sync> = Box::new(TransportLayerNack {
        sender_ssrc: 1,
        media_ssrc: 4000,
        nacks: vec![NackPair {
            packet_id: 2,
            lost_packets: 0,
        }],
    });
    transport.inject_rtcp(4000, &[nack])?;
    timeout_or_fail(Duration::from_millis(100), sender.read_rtcp()).await?;

    let resent = timeout_or_fail(Duration::from_millis(100), transport.written_rtp())
        .await
        .expect("a resent packet");
    assert_eq!(resent.header.ssrc, 4000);
    assert_eq!(resent.header.sequence_number, 2);

    connection.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_media_connection_close_is_idempotent() -> Result<()> {
    let events = Arc::new(SyncMutex::new(vec![]));
    let mut registry = Registry::new();
    registry.add(Arc::new(MockInterceptor::new("a", Arc::clone(&events))));
    registry.add(Arc::new(
        MockInterceptor::new("b", Arc::clone(&events)).with_close_error("b failed"),
    ));
    registry.add(Arc::new(MockInterceptor::new("c", Arc::clone(&events))));

    let api = APIBuilder::new().with_interceptor_registry(registry).build();
    let connection = api.new_media_connection(Arc::new(MockTransport::new())).await;

    assert_eq!(
        connection.close().await,
        Err(Error::Other("b failed".to_owned()))
    );
    assert!(connection.is_closed());
    connection.close().await?;

    for name in ["a", "b", "c"] {
        assert_eq!(count_events(&events, &format!("{name}:close")), 1);
    }

    Ok(())
}

#[tokio::test]
async fn test_media_connection_uses_receive_mtu() -> Result<()> {
    let mut s = crate::api::setting_engine::SettingEngine::default();
    s.set_receive_mtu(4);
    let api = APIBuilder::new().with_setting_engine(s).build();
    let transport = Arc::new(MockTransport::new());
    let connection = api
        .new_media_connection(Arc::clone(&transport) as Arc<dyn SecureTransport + Send + Sync>)
        .await;

    let receiver = connection.new_rtp_receiver(RTPCodecType::Video);
    receiver
        .receive(&RTCRtpReceiveParameters {
            encodings: vec![RTCRtpDecodingParameters {
                ssrc: 5000,
                ..Default::default()
            }],
        })
        .await?;
    transport.inject_rtp(5000, &packet(5000, 1))?;

    let track = receiver.track().expect("a track after receive");
    assert_eq!(track.read_rtp().await.err(), Some(Error::ErrShortBuffer));

    Ok(())
}
