use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// ErrUnknownType indicates an error with Unknown info.
    #[error("unknown")]
    ErrUnknownType,

    /// ErrRTPSenderTrackNil indicates the RTPSender was created without a track.
    #[error("Track must not be nil")]
    ErrRTPSenderTrackNil,

    /// ErrRTPSenderTransportNil indicates the RTPSender was created without a transport.
    #[error("Transport must not be nil")]
    ErrRTPSenderTransportNil,

    /// ErrUnsupportedCodec indicates the remote peer doesn't support the requested codec
    #[error("unable to start track, codec is not supported by remote")]
    ErrUnsupportedCodec,

    /// ErrCodecNotFound indicates no codec is registered for a payload type
    #[error("codec not found")]
    ErrCodecNotFound,

    /// ErrRegisterHeaderExtensionNoFreeID indicates that there was no extension ID available which
    /// in turn means that all 14 available id(1..14) has been used.
    #[error("no header extension ID was free to use(this means the maximum of 14 extensions have been registered)")]
    ErrRegisterHeaderExtensionNoFreeID,

    /// ErrRTPSenderSendAlreadyCalled indicates send was called more than once.
    #[error("Send has already been called")]
    ErrRTPSenderSendAlreadyCalled,

    /// ErrRTPSenderStopped indicates an operation on an RTPSender that has been stopped.
    #[error("Sender has already been stopped")]
    ErrRTPSenderStopped,

    /// ErrRTPReceiverReceiveAlreadyCalled indicates receive was called more than once.
    #[error("Receive has already been called")]
    ErrRTPReceiverReceiveAlreadyCalled,

    /// ErrRTPReceiverNil indicates a track read outlived its receiver.
    #[error("RTPReceiver must not be nil")]
    ErrRTPReceiverNil,

    /// ErrUnbindFailed indicates that a TrackLocal was not able to be unbind
    #[error("failed to unbind TrackLocal from PeerConnection")]
    ErrUnbindFailed,

    #[error("Interceptor is not bind")]
    ErrInterceptorNotBind,

    /// ErrClosedPipe is returned once a sender or receiver has been stopped.
    #[error("io: read/write on closed pipe")]
    ErrClosedPipe,

    #[error("IO EOF")]
    ErrIoEOF,
    #[error("Buffer is too short")]
    ErrShortBuffer,
    #[error("not long enough to be a RTP Packet")]
    ErrRTPTooShort,

    #[error("{0}")]
    Rtcp(#[from] rtcp::Error),
    #[error("{0}")]
    Rtp(#[from] rtp::Error),
    #[error("{0}")]
    Util(#[from] util::Error),

    #[error("{0}")]
    Other(String),
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::Other(errs_strs.join("\n")))
    }
}
