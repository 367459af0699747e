//! Implementation details of the nRF crypto driver crates.
//!
//! Use one of the chip crates (`nrf52840-crypto`, `nrf54l15-crypto`) instead of depending on
//! this crate directly.

#![cfg_attr(not(test), no_std)]
#![doc(html_root_url = "https://docs.rs/nrf-crypto-common/0.1.0")]

// Must come first, the logging macros are textually scoped.
mod fmt;

cfg_if::cfg_if! {
    if #[cfg(feature = "52810")] {
        pub use nrf52810_pac as pac;
    } else if #[cfg(feature = "52832")] {
        pub use nrf52832_pac as pac;
    } else if #[cfg(feature = "52833")] {
        pub use nrf52833_pac as pac;
    } else if #[cfg(feature = "52840")] {
        pub use nrf52840_pac as pac;
    }
}

pub mod cipher;
pub mod ecb;

pub use crate::cipher::{
    Capabilities, CipherAlgo, CipherDevice, CipherMode, CipherOp, CipherPacket, CipherSession,
    SessionConfig,
};
pub use crate::ecb::{Config, Ecb, EcbData, Error, Session};
