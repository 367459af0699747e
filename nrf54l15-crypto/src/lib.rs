#![no_std]
#![doc(html_root_url = "https://docs.rs/nrf54l15-crypto/0.1.0")]

pub use nrf_crypto_common::*;

use nrf_crypto_common::ecb::{Ecb00, EcbData};

/// ECB driver on the nRF54L15 `ECB00` peripheral.
pub type Ecb = nrf_crypto_common::Ecb<Ecb00>;

/// Takes the secure `ECB00` instance.
///
/// # Safety
///
/// Must be called at most once, and only from the secure domain.
pub unsafe fn take(data: &'static mut EcbData) -> Ecb {
    Ecb::new(Ecb00::steal(Ecb00::ADDRESS), data)
}
