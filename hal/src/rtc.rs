//! Real-time clock.
//!
//! The RTC is a 32-bit counter clocked from the 20-bit prescaler, exposed as
//! high/low register halves. Counter, prescaler, and alarm writes must be
//! bracketed by configuration mode; the driver does this internally.
//!
//! This module also carries the LSI oscillator calibration routine and its
//! register surface; see [`calibrate_lsi`].

use crate::bus::Bus;

// RTC register addresses
pub(crate) mod reg {
    pub const CTLRH: u32 = 0x4000_2800;
    pub const CTLRL: u32 = 0x4000_2804;
    pub const PSCRH: u32 = 0x4000_2808;
    pub const PSCRL: u32 = 0x4000_280C;
    pub const DIVH: u32 = 0x4000_2810;
    pub const DIVL: u32 = 0x4000_2814;
    pub const CNTH: u32 = 0x4000_2818;
    pub const CNTL: u32 = 0x4000_281C;
    pub const ALRMH: u32 = 0x4000_2820;
    pub const ALRML: u32 = 0x4000_2824;
}

/// Interrupt source masks (CTLRH enable bits and CTLRL flag bits share
/// positions).
pub mod irq {
    /// Second interrupt.
    pub const SEC: u16 = 0x0001;
    /// Alarm interrupt.
    pub const ALR: u16 = 0x0002;
    /// Overflow interrupt.
    pub const OW: u16 = 0x0004;
}

/// Status flag masks (CTLRL).
pub mod flag {
    /// Second flag.
    pub const SEC: u16 = 0x0001;
    /// Alarm flag.
    pub const ALR: u16 = 0x0002;
    /// Overflow flag.
    pub const OW: u16 = 0x0004;
    /// Registers synchronized flag.
    pub const RSF: u16 = 0x0008;
    /// RTC operation off flag; set when the last register write has
    /// finished.
    pub const RTOFF: u16 = 0x0020;
}

/// Configuration mode bit (CTLRL).
const CNF: u16 = 0x0010;

const LSB_MASK: u32 = 0x0000_FFFF;
const PRL_MSB_MASK: u32 = 0x000F_0000;
const DIV_MSB_MASK: u16 = 0x000F;

/// Poll budget for RTC register synchronization waits.
pub const SYNC_POLLS: u32 = 0x0001_0000;

/// RTC errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A synchronization poll budget was exhausted.
    Timeout,
}

/// RTC driver.
#[derive(Debug)]
pub struct Rtc<'a, B: Bus> {
    bus: &'a mut B,
}

impl<'a, B: Bus> Rtc<'a, B> {
    /// Create the RTC driver.
    pub fn new(bus: &'a mut B) -> Self {
        Rtc { bus }
    }

    /// Enable the interrupt sources in `mask` without disturbing the others.
    pub fn enable_irq(&mut self, mask: u16) {
        self.bus.modify16(reg::CTLRH, |ctlrh| ctlrh | mask);
    }

    /// Disable the interrupt sources in `mask` without disturbing the
    /// others.
    pub fn disable_irq(&mut self, mask: u16) {
        self.bus.modify16(reg::CTLRH, |ctlrh| ctlrh & !mask);
    }

    /// Enter configuration mode, allowing counter, prescaler, and alarm
    /// writes.
    pub fn enter_config_mode(&mut self) {
        self.bus.modify16(reg::CTLRL, |ctlrl| ctlrl | CNF);
    }

    /// Exit configuration mode, starting the transfer of the written values.
    pub fn exit_config_mode(&mut self) {
        self.bus.modify16(reg::CTLRL, |ctlrl| ctlrl & !CNF);
    }

    /// Read the 32-bit counter.
    ///
    /// The high half is re-read after the low half; a carry between the two
    /// reads cannot produce a torn value.
    pub fn counter(&mut self) -> u32 {
        let high1: u16 = self.bus.read16(reg::CNTH);
        let low: u16 = self.bus.read16(reg::CNTL);
        let high2: u16 = self.bus.read16(reg::CNTH);

        if high1 == high2 {
            (u32::from(high1) << 16) | u32::from(low)
        } else {
            (u32::from(high2) << 16) | u32::from(self.bus.read16(reg::CNTL))
        }
    }

    /// Set the 32-bit counter.
    pub fn set_counter(&mut self, value: u32) {
        self.enter_config_mode();
        self.bus.write16(reg::CNTH, (value >> 16) as u16);
        self.bus.write16(reg::CNTL, (value & LSB_MASK) as u16);
        self.exit_config_mode();
    }

    /// Set the 20-bit prescaler reload value.
    pub fn set_prescaler(&mut self, value: u32) {
        self.enter_config_mode();
        self.bus
            .write16(reg::PSCRH, ((value & PRL_MSB_MASK) >> 16) as u16);
        self.bus.write16(reg::PSCRL, (value & LSB_MASK) as u16);
        self.exit_config_mode();
    }

    /// Set the 32-bit alarm compare value.
    pub fn set_alarm(&mut self, value: u32) {
        self.enter_config_mode();
        self.bus.write16(reg::ALRMH, (value >> 16) as u16);
        self.bus.write16(reg::ALRML, (value & LSB_MASK) as u16);
        self.exit_config_mode();
    }

    /// Read the 20-bit prescaler divider.
    pub fn divider(&mut self) -> u32 {
        let high: u16 = self.bus.read16(reg::DIVH) & DIV_MSB_MASK;
        let low: u16 = self.bus.read16(reg::DIVL);
        (u32::from(high) << 16) | u32::from(low)
    }

    /// Wait until the last write to the RTC registers has finished.
    pub fn wait_for_last_task(&mut self) -> Result<(), Error> {
        for _ in 0..SYNC_POLLS {
            if self.bus.read16(reg::CTLRL) & flag::RTOFF != 0 {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }

    /// Wait until the RTC registers are synchronized with the RTC clock
    /// domain.
    pub fn wait_for_synchro(&mut self) -> Result<(), Error> {
        self.bus.modify16(reg::CTLRL, |ctlrl| ctlrl & !flag::RSF);
        for _ in 0..SYNC_POLLS {
            if self.bus.read16(reg::CTLRL) & flag::RSF != 0 {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }

    /// Returns `true` if any flag in `mask` is set.
    pub fn flag(&mut self, mask: u16) -> bool {
        self.bus.read16(reg::CTLRL) & mask != 0
    }

    /// Clear the flags in `mask` without disturbing the others.
    pub fn clear_flag(&mut self, mask: u16) {
        self.bus.modify16(reg::CTLRL, |ctlrl| ctlrl & !mask);
    }

    /// Returns `true` if an interrupt source in `mask` is both enabled and
    /// flagged.
    pub fn irq_pending(&mut self, mask: u16) -> bool {
        let enabled: u16 = self.bus.read16(reg::CTLRH);
        let flagged: u16 = self.bus.read16(reg::CTLRL);
        enabled & mask != 0 && flagged & mask != 0
    }

    /// Clear the interrupt pending bits in `mask`.
    pub fn clear_irq(&mut self, mask: u16) {
        self.clear_flag(mask);
    }

    /// Read the counter as a date and time.
    ///
    /// The counter holds seconds since 1970-01-01 00:00:00 UTC.
    #[cfg(feature = "chrono")]
    pub fn datetime(&mut self) -> Option<chrono::NaiveDateTime> {
        chrono::DateTime::from_timestamp(i64::from(self.counter()), 0).map(|dt| dt.naive_utc())
    }

    /// Set the counter from a date and time.
    ///
    /// Only dates between 1970-01-01 and 2106-02-07 are representable in
    /// the 32-bit counter; out-of-range timestamps are truncated.
    #[cfg(feature = "chrono")]
    pub fn set_datetime(&mut self, dt: &chrono::NaiveDateTime) {
        self.set_counter(dt.and_utc().timestamp() as u32);
    }
}

/// LSI oscillator calibration register surface.
///
/// The calibration counter measures the LSI period in HCLK cycles; the
/// measured count steers the tuning register until the oscillator is within
/// tolerance.
pub mod cal {
    /// 13-bit oscillator tuning register (16-bit access).
    pub const OSC32K_TUNE: u32 = 0x4002_2036;
    /// Coarse tuning field.
    pub const HTUNE_MASK: u16 = 0x1FE0;
    /// Fine tuning field.
    pub const LTUNE_MASK: u16 = 0x001F;

    /// Calibration configuration register (8-bit access).
    pub const CFG: u32 = 0x4002_2049;
    /// Low-power calibration enable.
    pub const CFG_LP_EN: u8 = 1 << 6;
    /// Wakeup calibration enable.
    pub const CFG_WKUP_EN: u8 = 1 << 5;
    /// Halt mode select.
    pub const CFG_HALT_MD: u8 = 1 << 4;
    /// Counting period select field.
    pub const CFG_CNT_VLU: u8 = 0x0F;

    /// Calibration count/status register (16-bit access).
    pub const CNT_ST: u32 = 0x4002_204C;
    /// End-of-count interrupt flag.
    pub const CNT_IF_END: u16 = 1 << 15;
    /// Counter overflow flag; write 1 to restart the count.
    pub const CNT_OV: u16 = 1 << 14;
    /// Counter value field.
    pub const CNT_MASK: u16 = 0x3FFF;

    /// Counter overflow count register (8-bit access).
    pub const OV_CNT: u32 = 0x4002_204E;

    /// Calibration control register (8-bit access).
    pub const CTRL: u32 = 0x4002_204F;
    /// Counter halted; a sample is ready while set.
    pub const CTRL_HALT: u8 = 1 << 7;
    /// Calibration counter enable.
    pub const CTRL_EN: u8 = 1 << 1;
    /// Calibration interrupt enable.
    pub const CTRL_INT_EN: u8 = 1 << 0;
}

/// LSI calibration accuracy level.
///
/// Longer counting periods trade calibration time for accuracy.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CalibrationLevel {
    /// 32 LSI periods, roughly 1.2 ms.
    Periods32 = 2,
    /// 64 LSI periods, roughly 2.2 ms.
    Periods64 = 3,
    /// 128 LSI periods, roughly 4.2 ms.
    Periods128 = 4,
}

fn wait_for_halt<B: Bus>(bus: &mut B, halted: bool) -> Result<(), Error> {
    for _ in 0..SYNC_POLLS {
        if (bus.read8(cal::CTRL) & cal::CTRL_HALT != 0) == halted {
            return Ok(());
        }
    }
    Err(Error::Timeout)
}

/// Tune the internal 32 kHz oscillator against the system clock.
///
/// A coarse pass at the shortest counting period pulls the oscillator into
/// tolerance (bounded at three adjustments), then one fine pass at `level`
/// applies the residual correction. The calibration counter is disabled on
/// return.
///
/// `sysclk_hz` must be at least 1 MHz; `lsi_hz` is the nominal oscillator
/// frequency (32768, or 32000 on parts with the 32.0 kHz option).
pub fn calibrate_lsi<B: Bus>(
    bus: &mut B,
    level: CalibrationLevel,
    sysclk_hz: u32,
    lsi_hz: u32,
) -> Result<(), Error> {
    let khz: i32 = (sysclk_hz / 1000) as i32;
    let lsi: i32 = lsi_hz as i32;
    let tolerance: i32 = 37 * khz / lsi;

    // coarse pass at the shortest counting period
    bus.modify8(cal::CFG, |cfg| (cfg & !cal::CFG_CNT_VLU) | 1);
    bus.modify8(cal::CTRL, |ctrl| ctrl | cal::CTRL_EN);
    bus.modify16(cal::CNT_ST, |st| st | cal::CNT_OV);

    let mut retry: u8 = 0;
    loop {
        wait_for_halt(bus, true)?;
        // the first capture after a configuration change is discarded
        let _ = bus.read16(cal::CNT_ST);
        wait_for_halt(bus, false)?;
        bus.modify16(cal::CNT_ST, |st| st | cal::CNT_OV);
        wait_for_halt(bus, true)?;
        let sample: i32 = i32::from(bus.read16(cal::CNT_ST) & cal::CNT_MASK);
        let overflows: i32 = i32::from(bus.read8(cal::OV_CNT));
        let offset: i32 = sample + overflows * 0x3FFF - 2000 * khz / lsi;

        if (offset > -tolerance && offset < tolerance) || retry > 2 {
            break;
        }
        retry += 1;
        let step: i32 = if offset > 0 {
            (offset * 2 / tolerance + 1) / 2
        } else {
            (offset * 2 / tolerance - 1) / 2
        };
        bus.modify16(cal::OSC32K_TUNE, |tune| tune.wrapping_add(step as u16));
    }

    // fine pass at the requested counting period
    wait_for_halt(bus, true)?;
    let _ = bus.read16(cal::CNT_ST);
    bus.modify16(cal::CNT_ST, |st| st | cal::CNT_OV);
    bus.modify8(cal::CFG, |cfg| (cfg & !cal::CFG_CNT_VLU) | level as u8);
    wait_for_halt(bus, false)?;
    wait_for_halt(bus, true)?;
    let sample: i32 = i32::from(bus.read16(cal::CNT_ST) & cal::CNT_MASK);
    let overflows: i32 = i32::from(bus.read8(cal::OV_CNT));

    let mhz: i32 = (sysclk_hz / 1_000_000) as i32;
    let periods: i32 = 1 << (level as u8);
    let expected: i32 = 4000 * periods * mhz / lsi * 1000;
    let offset: i64 = i64::from(sample + overflows * 0x3FFF - expected);
    let denom: i64 = i64::from(1366 * khz / lsi);
    let scaled: i64 = offset * i64::from(3200 / periods);
    let step: i64 = if offset > 0 {
        ((scaled / denom + 1) / 2) << 5
    } else {
        ((scaled / denom - 1) / 2) << 5
    };
    bus.modify16(cal::OSC32K_TUNE, |tune| tune.wrapping_add(step as u16));

    bus.modify8(cal::CTRL, |ctrl| ctrl & !cal::CTRL_EN);
    Ok(())
}
