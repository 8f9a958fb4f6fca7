//! Reset and clock control.

use crate::bus::Bus;

// RCC register addresses
pub(crate) mod reg {
    pub const CFGR0: u32 = 0x4002_1004;
}

// clock configuration register (CFGR0) fields
pub(crate) mod cfg {
    /// AHB prescaler field.
    pub const HPRE_MASK: u32 = 0x0000_00F0;
    /// AHB prescaler: SYSCLK divided by 2.
    pub const HPRE_DIV2: u32 = 0x0000_0080;
}

/// Highest HCLK frequency at which the flash controller may be driven.
///
/// Above this the AHB clock must be halved for the duration of the flash
/// operation; see [`HclkDiv2`].
pub const FLASH_HCLK_MAX_HZ: u32 = 100_000_000;

/// Scoped AHB divide-by-2 for flash operations.
///
/// The previous prescaler is restored when the guard is dropped, on every
/// exit path.
///
/// # Example
///
/// ```no_run
/// use ch32v20x_hal::{bus::Mmio, rcc::HclkDiv2};
///
/// {
///     let _guard: HclkDiv2<Mmio> = HclkDiv2::enter(unsafe { Mmio::steal() });
///     // flash operations run at the halved clock here
/// }
/// // prescaler restored
/// ```
#[derive(Debug)]
pub struct HclkDiv2<B: Bus> {
    bus: B,
    saved: u32,
}

impl<B: Bus> HclkDiv2<B> {
    /// Halve the AHB clock, remembering the previous prescaler.
    pub fn enter(mut bus: B) -> Self {
        let mut saved: u32 = 0;
        bus.modify32(reg::CFGR0, |cfgr| {
            saved = cfgr & cfg::HPRE_MASK;
            (cfgr & !cfg::HPRE_MASK) | cfg::HPRE_DIV2
        });
        HclkDiv2 { bus, saved }
    }
}

impl<B: Bus> Drop for HclkDiv2<B> {
    fn drop(&mut self) {
        let saved: u32 = self.saved;
        self.bus
            .modify32(reg::CFGR0, |cfgr| (cfgr & !cfg::HPRE_MASK) | saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SimRcc {
        cfgr0: u32,
    }

    impl Bus for &mut SimRcc {
        fn read8(&mut self, _addr: u32) -> u8 {
            unreachable!()
        }
        fn write8(&mut self, _addr: u32, _val: u8) {
            unreachable!()
        }
        fn read16(&mut self, _addr: u32) -> u16 {
            unreachable!()
        }
        fn write16(&mut self, _addr: u32, _val: u16) {
            unreachable!()
        }
        fn read32(&mut self, addr: u32) -> u32 {
            assert_eq!(addr, reg::CFGR0);
            self.cfgr0
        }
        fn write32(&mut self, addr: u32, val: u32) {
            assert_eq!(addr, reg::CFGR0);
            self.cfgr0 = val;
        }
    }

    #[test]
    fn divider_applied_and_restored() {
        // HPRE starts at divide-by-4, with unrelated bits set
        let mut rcc = SimRcc { cfgr0: 0x0000_0092 };
        {
            let _guard = HclkDiv2::enter(&mut rcc);
        }
        assert_eq!(rcc.cfgr0, 0x0000_0092);
    }

    #[test]
    fn divider_set_inside_scope() {
        let mut rcc = SimRcc { cfgr0: 0x0000_0002 };
        let guard = HclkDiv2::enter(&mut rcc);
        assert_eq!(guard.bus.cfgr0 & cfg::HPRE_MASK, cfg::HPRE_DIV2);
        assert_eq!(guard.bus.cfgr0 & !cfg::HPRE_MASK, 0x0000_0002);
        drop(guard);
        assert_eq!(rcc.cfgr0, 0x0000_0002);
    }

    #[test]
    fn restored_on_early_exit() {
        fn bail_early(rcc: &mut SimRcc) -> Result<(), ()> {
            let _guard = HclkDiv2::enter(&mut *rcc);
            Err(())
        }

        let mut rcc = SimRcc { cfgr0: 0x0000_0080 };
        assert!(bail_early(&mut rcc).is_err());
        assert_eq!(rcc.cfgr0, 0x0000_0080);
    }
}
