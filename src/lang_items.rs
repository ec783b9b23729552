//! Target panic and fault handlers
//!
//! A panic or hard fault on target ends the same way a detected deadlock
//! does: the core is reset.

// When defmt feature is enabled on ARM targets, use defmt_rtt and panic_probe
#[cfg(all(feature = "defmt", target_arch = "arm"))]
use defmt_rtt as _;

#[cfg(all(feature = "defmt", target_arch = "arm"))]
use panic_probe as _;

#[cfg(all(feature = "defmt", target_arch = "arm"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    crate::port::cortex_m4::system_reset()
}

#[cfg(all(not(feature = "defmt"), not(feature = "std"), target_arch = "arm"))]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    crate::port::cortex_m4::system_reset()
}

#[cfg(all(target_arch = "arm", not(feature = "std")))]
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    crate::port::cortex_m4::system_reset()
}
