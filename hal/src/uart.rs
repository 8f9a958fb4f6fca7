//! Universal synchronous/asynchronous receiver transmitter.
//!
//! Only the transmit-only debug console on USART1/PA9 is implemented; it is
//! what the demonstration programs report through.

use crate::bus::Bus;
use core::fmt;

// register addresses
mod reg {
    /// APB2 peripheral clock enable (RCC).
    pub const APB2PCENR: u32 = 0x4002_1018;
    /// Port A configuration, pins 8..=15.
    pub const GPIOA_CFGHR: u32 = 0x4001_0804;
    pub const USART1_STATR: u32 = 0x4001_3800;
    pub const USART1_DATAR: u32 = 0x4001_3804;
    pub const USART1_BRR: u32 = 0x4001_3808;
    pub const USART1_CTLR1: u32 = 0x4001_380C;
}

// APB2PCENR bits
mod en {
    pub const AFIO: u32 = 1 << 0;
    pub const IOPA: u32 = 1 << 2;
    pub const USART1: u32 = 1 << 14;
}

// status register (STATR) flags
mod sr {
    pub const TC: u32 = 1 << 6;
    pub const TXE: u32 = 1 << 7;
}

// control register 1 (CTLR1) bits
mod cr {
    pub const TE: u32 = 1 << 3;
    pub const UE: u32 = 1 << 13;
}

// PA9 configuration field in GPIOA_CFGHR: alternate function push-pull,
// 50 MHz
const PA9_CFG_MASK: u32 = 0x0000_00F0;
const PA9_CFG_AF_PP: u32 = 0x0000_00B0;

/// Compute the baud rate register value for a peripheral clock.
///
/// # Example
///
/// ```
/// use ch32v20x_hal::uart::brr;
///
/// assert_eq!(brr(72_000_000, 115_200), 625);
/// assert_eq!(brr(8_000_000, 115_200), 69);
/// ```
pub const fn brr(pclk_hz: u32, baud: u32) -> u32 {
    pclk_hz / baud
}

/// USART1 transmit-only console.
#[derive(Debug)]
pub struct Uart1<B: Bus> {
    bus: B,
}

impl<B: Bus> Uart1<B> {
    /// Configure USART1 on PA9 at 8N1.
    ///
    /// `pclk_hz` is the APB2 clock; re-create the console after clock
    /// changes so the baud rate register matches.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ch32v20x_hal::{bus::Mmio, uart::Uart1};
    ///
    /// let console: Uart1<Mmio> =
    ///     Uart1::console(unsafe { Mmio::steal() }, 72_000_000, 115_200);
    /// ```
    pub fn console(mut bus: B, pclk_hz: u32, baud: u32) -> Self {
        bus.modify32(reg::APB2PCENR, |pcenr| {
            pcenr | en::USART1 | en::IOPA | en::AFIO
        });
        bus.modify32(reg::GPIOA_CFGHR, |cfg| {
            (cfg & !PA9_CFG_MASK) | PA9_CFG_AF_PP
        });
        bus.write32(reg::USART1_BRR, brr(pclk_hz, baud));
        bus.write32(reg::USART1_CTLR1, cr::UE | cr::TE);
        Uart1 { bus }
    }

    fn write_byte(&mut self, byte: u8) {
        while self.bus.read32(reg::USART1_STATR) & sr::TXE == 0 {}
        self.bus.write32(reg::USART1_DATAR, u32::from(byte));
    }

    /// Block until the transmit shifter is empty.
    pub fn flush(&mut self) {
        while self.bus.read32(reg::USART1_STATR) & sr::TC == 0 {}
    }
}

impl<B: Bus> fmt::Write for Uart1<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}
