#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export sub-crates
pub use rtcp;
pub use rtp;
pub use util;

pub mod api;
pub mod connection;
pub mod error;
pub mod interceptor;
pub mod mock;
pub mod rtp_transceiver;
pub mod track;
pub mod transport;
pub(crate) mod utilities;

pub use error::Error;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Equal to UDP MTU
pub(crate) const RECEIVE_MTU: usize = 1460;

/// Helper for the tests.
#[cfg(test)]
mod test {
    use std::future::Future;
    use std::time::Duration;

    pub async fn timeout_or_fail<T>(duration: Duration, future: T) -> T::Output
    where
        T: Future,
    {
        tokio::time::timeout(duration, future)
            .await
            .expect("should not time out")
    }
}
