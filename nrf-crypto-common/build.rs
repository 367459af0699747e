use std::{env, process};

fn main() {
    let target = env::var("TARGET").unwrap_or_default();

    if env::var_os("CARGO_FEATURE_54L15").is_some() && target.starts_with("thumbv7em") {
        // The nRF54L application core is a Cortex-M33.
        eprintln!(
            "the nRF54L15 does not support the `{}` target; \
            build for `thumbv8m.main-none-eabihf` instead",
            target
        );
        process::exit(1);
    }

    if target == "thumbv6m-none-eabi" {
        // The session flag needs compare-and-swap, which ARMv6-M lacks.
        eprintln!(
            "the `thumbv6m-none-eabi` target is not supported; \
            build for `thumbv7em-none-eabi(hf)` instead"
        );
        process::exit(1);
    }
}
