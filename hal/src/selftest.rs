//! Flash program-and-verify exercisers.
//!
//! These drive the [`flash`](crate::flash) driver through full
//! erase/program/verify sequences and return explicit reports instead of
//! mutating shared state, so repeated runs and host tests do not alias.

use crate::bus::Bus;
use crate::flash::{BUF_WORDS, Block, Error, FastPage, Flash, Page};
use core::ops::Range;

/// Number of 4 KiB pages touched by a byte range.
///
/// # Example
///
/// ```
/// use ch32v20x_hal::selftest::page_count;
///
/// assert_eq!(page_count(&(0x0800_8000..0x0800_9000)), 1);
/// assert_eq!(page_count(&(0x0800_8000..0x0800_8000)), 0);
/// assert_eq!(page_count(&(0x0800_8000..0x0800_9004)), 2);
/// ```
pub const fn page_count(range: &Range<u32>) -> u32 {
    range.end.saturating_sub(range.start).div_ceil(Page::SIZE)
}

/// Outcome of [`program_verify`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
    /// Pages erased before the first erase failure.
    pub pages_erased: u32,
    /// Result of the erase phase.
    pub erase: Result<(), Error>,
    /// Result of the program phase.
    pub program: Result<(), Error>,
    /// `true` when every half-word in the range read back as written.
    pub verified: bool,
}

impl Report {
    /// Overall verdict.
    ///
    /// Follows the read-back comparison alone: an erase failure shortens the
    /// erase phase and is visible in [`erase`](Self::erase), but only a
    /// verification mismatch fails the run.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.verified
    }
}

/// Outcome of [`fast_program_verify`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FastReport {
    /// Result of the 32 KiB block erase.
    pub erase: Result<(), Error>,
    /// Pages programmed before the first program failure.
    pub pages_programmed: u32,
    /// Read-back verdict of the verification pass.
    ///
    /// One flag is shared by all page comparisons and overwritten per page,
    /// so only the final page's verdict is retained here; a mismatch in an
    /// earlier page does not stick.
    pub pattern_ok: bool,
}

impl FastReport {
    /// Overall verdict, as retained by the shared verification flag.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.pattern_ok
    }
}

/// Erase, program, and verify `range` with `value` in standard mode.
///
/// The sequence is unlock, clear pending flags, erase each page in the
/// range, program `value` at every half-word, re-read and compare every
/// half-word, lock. Each phase stops at its first failing operation, but a
/// failed erase does not prevent the program phase from starting; the
/// per-phase results are all reported.
///
/// `range.start` must be 4 KiB aligned.
pub fn program_verify<B: Bus>(bus: &mut B, range: Range<u32>, value: u16) -> Report {
    let pages: u32 = page_count(&range);

    let mut flash: Flash<B> = Flash::unlock(bus);
    flash.clear_pending_flags();

    let mut erase: Result<(), Error> = Ok(());
    let mut pages_erased: u32 = 0;
    while pages_erased < pages && erase.is_ok() {
        erase = match Page::from_addr(range.start + pages_erased * Page::SIZE) {
            Some(page) => flash.erase_page(page),
            // unaligned or out-of-range pages are refused like protected ones
            None => Err(Error::Wp),
        };
        if erase.is_ok() {
            pages_erased += 1;
        }
    }

    let mut program: Result<(), Error> = Ok(());
    let mut addr: u32 = range.start;
    while addr < range.end && program.is_ok() {
        program = flash.program_half_word(addr, value);
        addr += 2;
    }

    let mut verified: bool = true;
    let mut addr: u32 = range.start;
    while addr < range.end && verified {
        if flash.read_half_word(addr) != value {
            verified = false;
        }
        addr += 2;
    }

    flash.lock();

    Report {
        pages_erased,
        erase,
        program,
        verified,
    }
}

/// Erase, program, and verify a 32 KiB block in fast mode.
///
/// The block is erased in one operation, then programmed as 128 pages of
/// 256 B, each filled from the fixed pattern `word[j] = j`. Verification
/// re-reads all 64 words of every page into one shared flag; see
/// [`FastReport::pattern_ok`] for what survives of it.
pub fn fast_program_verify<B: Bus>(bus: &mut B, block: Block) -> FastReport {
    let pages: u32 = Block::SIZE / FastPage::SIZE;
    let first_page: u8 = block.to_index() * pages as u8;

    let mut pattern: [u32; BUF_WORDS] = [0; BUF_WORDS];
    for (j, word) in pattern.iter_mut().enumerate() {
        *word = j as u32;
    }

    let mut flash: Flash<B> = Flash::unlock_fast(bus);
    flash.clear_pending_flags();

    let erase: Result<(), Error> = flash.erase_block_32k(block);

    let mut program: Result<(), Error> = Ok(());
    let mut pages_programmed: u32 = 0;
    while pages_programmed < pages && program.is_ok() {
        let page: FastPage = FastPage::from_index(first_page + pages_programmed as u8);
        program = flash.program_page_fast(page, &pattern);
        if program.is_ok() {
            pages_programmed += 1;
        }
    }

    let mut pattern_ok: bool = false;
    for page in 0..pages {
        pattern_ok = true;
        for j in 0..BUF_WORDS as u32 {
            let word: u32 = flash.read_word(block.addr() + page * FastPage::SIZE + 4 * j);
            if word != j {
                pattern_ok = false;
                break;
            }
        }
    }

    flash.lock_fast();
    flash.lock();

    FastReport {
        erase,
        pages_programmed,
        pattern_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::ctl;
    use crate::sim::SimFlash;

    const START: u32 = 0x0800_8000;
    const END: u32 = 0x0800_9000;

    fn block() -> Block {
        Block::from_addr(START).unwrap()
    }

    #[test]
    fn standard_scenario_passes() {
        let mut sim = SimFlash::new();
        let report = program_verify(&mut sim, START..END, 0xAAAA);

        assert_eq!(report.pages_erased, 1);
        assert_eq!(report.erase, Ok(()));
        assert_eq!(report.program, Ok(()));
        assert!(report.passed());
        // 4096 bytes at half-word granularity
        assert_eq!(sim.program_writes(), 2048);
        assert_eq!(sim.data_reads16(), 2048);
        for offset in (0..Page::SIZE).step_by(2) {
            assert_eq!(sim.peek8(START + offset), 0xAA);
        }
    }

    #[test]
    fn zero_length_range_does_nothing() {
        let mut sim = SimFlash::new();
        let report = program_verify(&mut sim, START..START, 0xAAAA);

        assert_eq!(report.pages_erased, 0);
        assert_eq!(report.erase, Ok(()));
        assert_eq!(report.program, Ok(()));
        assert!(report.passed());
        assert_eq!(sim.program_writes(), 0);
        assert_eq!(sim.data_reads16(), 0);
    }

    #[test]
    fn locks_on_both_verdicts() {
        let mut sim = SimFlash::new();
        let report = program_verify(&mut sim, START..END, 0xAAAA);
        assert!(report.passed());
        assert_ne!(sim.ctlr() & ctl::LOCK, 0);

        let mut sim = SimFlash::new();
        sim.protect(START..END);
        let report = program_verify(&mut sim, START..END, 0xAAAA);
        assert!(!report.passed());
        assert_ne!(sim.ctlr() & ctl::LOCK, 0);
    }

    // An erase failure stops the erase loop early but does not gate the
    // program phase; each phase stops only on its own first failure.
    #[test]
    fn erase_failure_does_not_skip_programming() {
        let mut sim = SimFlash::new();
        // second page protected, first page erasable
        sim.protect(START + Page::SIZE..START + 2 * Page::SIZE);
        let report = program_verify(&mut sim, START..START + 2 * Page::SIZE, 0xAAAA);

        assert_eq!(report.pages_erased, 1);
        assert_eq!(report.erase, Err(crate::flash::Error::Wp));
        // programming was attempted; the sticky write-protect flag from the
        // failed erase stops it at its first operation
        assert_eq!(sim.program_writes(), 1);
        assert_eq!(report.program, Err(crate::flash::Error::Wp));
        assert!(!report.passed());
    }

    #[test]
    fn verify_stops_at_first_mismatch() {
        let mut sim = SimFlash::new();
        // corrupt the sixth half-word once programming finishes
        sim.poke_after_programs(2048, START + 10, 0xBEEF);
        let report = program_verify(&mut sim, START..END, 0xAAAA);

        assert!(!report.passed());
        assert_eq!(report.program, Ok(()));
        assert_eq!(sim.data_reads16(), 6);
    }

    #[test]
    fn fast_scenario_passes() {
        let mut sim = SimFlash::new();
        let report = fast_program_verify(&mut sim, block());

        assert_eq!(report.erase, Ok(()));
        assert_eq!(report.pages_programmed, 128);
        assert!(report.passed());
        // spot-check the pattern at both ends of the block
        for j in 0..64 {
            assert_eq!(sim.peek8(START + 4 * j), j as u8);
            assert_eq!(sim.peek8(START + Block::SIZE - FastPage::SIZE + 4 * j), j as u8);
        }
        let ctlr = sim.ctlr();
        assert_ne!(ctlr & ctl::LOCK, 0);
        assert_ne!(ctlr & ctl::FLOCK, 0);
    }

    // The verification flag is overwritten on every page, so a mismatch in
    // a non-final page is not retained.
    #[test]
    fn fast_flag_retains_last_page_only() {
        let mut sim = SimFlash::new();
        sim.poke_after_commits(128, START + 50 * FastPage::SIZE, 0xEE);
        let report = fast_program_verify(&mut sim, block());
        assert!(report.passed());

        let mut sim = SimFlash::new();
        sim.poke_after_commits(128, START + 127 * FastPage::SIZE, 0xEE);
        let report = fast_program_verify(&mut sim, block());
        assert!(!report.passed());
    }
}
