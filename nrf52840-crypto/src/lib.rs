#![no_std]
#![doc(html_root_url = "https://docs.rs/nrf52840-crypto/0.1.0")]

pub use nrf_crypto_common::*;

/// ECB driver on the nRF52840 `ECB` peripheral.
pub type Ecb = nrf_crypto_common::Ecb<pac::ECB>;
