//! Flash memory.
//!
//! The flash memory controller has two programming interfaces gated by
//! separate key domains:
//!
//! * Standard: 4 KiB page erase, half-word programming, unlocked via `KEYR`.
//! * Fast: 256 B page programming through an internal staging buffer, 256 B
//!   page and 32 KiB block erase, unlocked via `MODEKEYR` after `KEYR`.
//!
//! Every erase or program command is followed by a bounded completion poll of
//! the status register; a controller that never reports completion surfaces
//! [`Error::Timeout`] instead of spinning forever.

use crate::bus::Bus;

/// Starting address of the flash memory.
pub const FLASH_START: u32 = 0x0800_0000;

/// Flash memory size in bytes.
pub const FLASH_SIZE: u32 = 64 * 1024;

/// Number of words in the fast mode staging buffer.
pub const BUF_WORDS: usize = 64;

/// Completion poll budget for erase operations.
pub const ERASE_POLLS: u32 = 0x000B_0000;

/// Completion poll budget for program operations.
pub const PROGRAM_POLLS: u32 = 0x0000_2000;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

// FMC register addresses
pub(crate) mod reg {
    pub const KEYR: u32 = 0x4002_2004;
    pub const STATR: u32 = 0x4002_200C;
    pub const CTLR: u32 = 0x4002_2010;
    pub const ADDR: u32 = 0x4002_2014;
    pub const MODEKEYR: u32 = 0x4002_2024;
}

// status register (STATR) flags
pub(crate) mod flags {
    pub const BUSY: u32 = 1 << 0;
    pub const WRBUSY: u32 = 1 << 1;
    pub const PGERR: u32 = 1 << 2;
    pub const WRPRTERR: u32 = 1 << 4;
    pub const EOP: u32 = 1 << 5;
}

// control register (CTLR) bits
pub(crate) mod ctl {
    pub const PG: u32 = 1 << 0;
    pub const PER: u32 = 1 << 1;
    pub const STRT: u32 = 1 << 6;
    pub const LOCK: u32 = 1 << 7;
    pub const FLOCK: u32 = 1 << 15;
    pub const FTPG: u32 = 1 << 16;
    pub const FTER: u32 = 1 << 17;
    pub const BUFLOAD: u32 = 1 << 18;
    pub const BUFRST: u32 = 1 << 19;
    pub const BER32: u32 = 1 << 20;
    pub const PGSTRT: u32 = 1 << 22;
}

/// 4 KiB page address, the standard mode erase unit.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Page(u8);

impl Page {
    /// Page size in bytes.
    pub const SIZE: u32 = 4096;

    /// Create a page address from an index.
    ///
    /// Returns `None` if the index is greater than 15 (the last page).
    ///
    /// # Example
    ///
    /// ```
    /// use ch32v20x_hal::flash::Page;
    ///
    /// assert!(Page::from_index(8).is_some());
    /// assert!(Page::from_index(16).is_none());
    /// ```
    pub const fn from_index(idx: u8) -> Option<Self> {
        if (idx as u32) < FLASH_SIZE / Self::SIZE {
            Some(Page(idx))
        } else {
            None
        }
    }

    /// Create a page address from an absolute address.
    ///
    /// Returns `None` if the address is out of bounds, or not page aligned.
    ///
    /// # Example
    ///
    /// ```
    /// use ch32v20x_hal::flash::Page;
    ///
    /// assert_eq!(Page::from_addr(0x0800_0000), Page::from_index(0));
    /// assert_eq!(Page::from_addr(0x0800_8000), Page::from_index(8));
    /// assert!(Page::from_addr(0).is_none());
    /// assert!(Page::from_addr(0x0800_0001).is_none());
    /// assert!(Page::from_addr(0x0801_0000).is_none());
    /// ```
    pub const fn from_addr(addr: u32) -> Option<Self> {
        if let Some(offset) = addr.checked_sub(FLASH_START) {
            if offset % Self::SIZE == 0 && offset < FLASH_SIZE {
                Some(Page((offset / Self::SIZE) as u8))
            } else {
                None
            }
        } else {
            None
        }
    }

    /// Get the page index.
    pub const fn to_index(self) -> u8 {
        self.0
    }

    /// Get the page address.
    ///
    /// # Example
    ///
    /// ```
    /// use ch32v20x_hal::flash::Page;
    ///
    /// assert_eq!(Page::from_index(0).unwrap().addr(), 0x0800_0000);
    /// assert_eq!(Page::from_index(15).unwrap().addr(), 0x0800_F000);
    /// ```
    pub const fn addr(&self) -> u32 {
        (self.0 as u32) * Self::SIZE + FLASH_START
    }
}

/// 256 B page address, the fast mode program and erase unit.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct FastPage(u8);

impl FastPage {
    /// Page size in bytes.
    pub const SIZE: u32 = 256;

    /// Create a fast page address from an index.
    ///
    /// Every index addresses a valid page; the flash memory holds exactly
    /// 256 fast pages.
    pub const fn from_index(idx: u8) -> Self {
        FastPage(idx)
    }

    /// Create a fast page address from an absolute address.
    ///
    /// Returns `None` if the address is out of bounds, or not page aligned.
    ///
    /// # Example
    ///
    /// ```
    /// use ch32v20x_hal::flash::FastPage;
    ///
    /// assert_eq!(FastPage::from_addr(0x0800_0100), Some(FastPage::from_index(1)));
    /// assert!(FastPage::from_addr(0x0800_0080).is_none());
    /// ```
    pub const fn from_addr(addr: u32) -> Option<Self> {
        if let Some(offset) = addr.checked_sub(FLASH_START) {
            if offset % Self::SIZE == 0 && offset < FLASH_SIZE {
                Some(FastPage((offset / Self::SIZE) as u8))
            } else {
                None
            }
        } else {
            None
        }
    }

    /// Get the page index.
    pub const fn to_index(self) -> u8 {
        self.0
    }

    /// Get the page address.
    pub const fn addr(&self) -> u32 {
        (self.0 as u32) * Self::SIZE + FLASH_START
    }
}

/// 32 KiB block address, the fast mode bulk erase unit.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Block(u8);

impl Block {
    /// Block size in bytes.
    pub const SIZE: u32 = 32 * 1024;

    /// Create a block address from an index.
    ///
    /// Returns `None` if the index is greater than 1 (the last block).
    ///
    /// # Example
    ///
    /// ```
    /// use ch32v20x_hal::flash::Block;
    ///
    /// assert!(Block::from_index(1).is_some());
    /// assert!(Block::from_index(2).is_none());
    /// ```
    pub const fn from_index(idx: u8) -> Option<Self> {
        if (idx as u32) < FLASH_SIZE / Self::SIZE {
            Some(Block(idx))
        } else {
            None
        }
    }

    /// Create a block address from an absolute address.
    ///
    /// Returns `None` if the address is out of bounds, or not block aligned.
    ///
    /// # Example
    ///
    /// ```
    /// use ch32v20x_hal::flash::Block;
    ///
    /// assert_eq!(Block::from_addr(0x0800_8000), Block::from_index(1));
    /// assert!(Block::from_addr(0x0800_9000).is_none());
    /// ```
    pub const fn from_addr(addr: u32) -> Option<Self> {
        if let Some(offset) = addr.checked_sub(FLASH_START) {
            if offset % Self::SIZE == 0 && offset < FLASH_SIZE {
                Some(Block((offset / Self::SIZE) as u8))
            } else {
                None
            }
        } else {
            None
        }
    }

    /// Get the block index.
    pub const fn to_index(self) -> u8 {
        self.0
    }

    /// Get the block address.
    pub const fn addr(&self) -> u32 {
        (self.0 as u32) * Self::SIZE + FLASH_START
    }
}

/// Flash errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Busy error.
    ///
    /// An operation was requested while the previous operation was still
    /// in-progress.
    Busy,
    /// Programming error.
    ///
    /// An address to be programmed contained a value different from the
    /// erased pattern before programming.
    Prog,
    /// Write protection error.
    ///
    /// An address to be erased or programmed belongs to a write-protected
    /// part of the flash memory, lies outside the flash memory, or the
    /// required key domain is locked.
    Wp,
    /// The completion poll budget was exhausted.
    ///
    /// Distinct from the hardware-reported errors; the controller never
    /// cleared its busy flag within [`ERASE_POLLS`] / [`PROGRAM_POLLS`]
    /// status reads.
    Timeout,
}

/// Flash driver.
///
/// Constructing the driver unlocks the flash memory; both key domains are
/// re-locked when the driver is dropped.
#[derive(Debug)]
pub struct Flash<'a, B: Bus> {
    bus: &'a mut B,
}

impl<B: Bus> Drop for Flash<'_, B> {
    fn drop(&mut self) {
        self.bus
            .modify32(reg::CTLR, |ctlr| ctlr | ctl::FLOCK | ctl::LOCK);
    }
}

impl<'a, B: Bus> Flash<'a, B> {
    /// Unlock the standard key domain for page erase and half-word
    /// programming.
    ///
    /// Unlocking an already-unlocked controller is a no-op.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ch32v20x_hal::{bus::Mmio, flash::Flash};
    ///
    /// let mut bus: Mmio = unsafe { Mmio::steal() };
    /// let mut flash: Flash<Mmio> = Flash::unlock(&mut bus);
    /// ```
    pub fn unlock(bus: &'a mut B) -> Self {
        bus.write32(reg::KEYR, KEY1);
        bus.write32(reg::KEYR, KEY2);
        Flash { bus }
    }

    /// Unlock both key domains for fast mode programming.
    ///
    /// The fast domain shares the key values with the standard domain; the
    /// `MODEKEYR` sequence is only accepted after the `KEYR` sequence.
    pub fn unlock_fast(bus: &'a mut B) -> Self {
        bus.write32(reg::KEYR, KEY1);
        bus.write32(reg::KEYR, KEY2);
        bus.write32(reg::MODEKEYR, KEY1);
        bus.write32(reg::MODEKEYR, KEY2);
        Flash { bus }
    }

    /// Lock the standard key domain.
    ///
    /// Locking an already-locked controller is a no-op.
    pub fn lock(&mut self) {
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::LOCK);
    }

    /// Lock the fast key domain.
    pub fn lock_fast(&mut self) {
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::FLOCK);
    }

    /// Returns `true` if the standard key domain is locked.
    pub fn is_locked(&mut self) -> bool {
        self.bus.read32(reg::CTLR) & ctl::LOCK != 0
    }

    /// Clear the completion and error flags left over from previous
    /// operations.
    ///
    /// The end-of-operation, programming error, and write protection error
    /// flags are sticky; call this before a batch of operations so stale
    /// flags cannot be misread as new results.
    pub fn clear_pending_flags(&mut self) {
        self.bus
            .write32(reg::STATR, flags::EOP | flags::PGERR | flags::WRPRTERR);
    }

    fn ready(&mut self) -> Result<(), Error> {
        if self.bus.read32(reg::STATR) & flags::BUSY != 0 {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    fn wait_for_completion(&mut self, polls: u32) -> Result<(), Error> {
        for _ in 0..polls {
            let statr: u32 = self.bus.read32(reg::STATR);
            if statr & flags::BUSY != 0 {
                continue;
            }
            if statr & flags::PGERR != 0 {
                return Err(Error::Prog);
            }
            if statr & flags::WRPRTERR != 0 {
                return Err(Error::Wp);
            }
            self.bus.write32(reg::STATR, flags::EOP);
            return Ok(());
        }
        Err(Error::Timeout)
    }

    fn wait_for_buffer(&mut self, polls: u32) -> Result<(), Error> {
        for _ in 0..polls {
            let statr: u32 = self.bus.read32(reg::STATR);
            if statr & flags::WRBUSY != 0 {
                continue;
            }
            if statr & flags::WRPRTERR != 0 {
                return Err(Error::Wp);
            }
            return Ok(());
        }
        Err(Error::Timeout)
    }

    /// Erase a 4 KiB page, setting every byte to `0xFF`.
    pub fn erase_page(&mut self, page: Page) -> Result<(), Error> {
        self.ready()?;
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::PER);
        self.bus.write32(reg::ADDR, page.addr());
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::STRT);
        let ret: Result<(), Error> = self.wait_for_completion(ERASE_POLLS);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::PER);
        ret
    }

    /// Program a half-word.
    ///
    /// `addr` must be half-word aligned and within an erased, unlocked
    /// region; addresses must be programmed in ascending, non-overlapping
    /// order.
    pub fn program_half_word(&mut self, addr: u32, data: u16) -> Result<(), Error> {
        self.ready()?;
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::PG);
        self.bus.write16(addr, data);
        let ret: Result<(), Error> = self.wait_for_completion(PROGRAM_POLLS);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::PG);
        ret
    }

    /// Program a word as two half-words, low half-word first.
    pub fn program_word(&mut self, addr: u32, data: u32) -> Result<(), Error> {
        self.program_half_word(addr, data as u16)?;
        self.program_half_word(addr + 2, (data >> 16) as u16)
    }

    /// Read back a half-word through the bus.
    pub fn read_half_word(&mut self, addr: u32) -> u16 {
        self.bus.read16(addr)
    }

    /// Read back a word through the bus.
    pub fn read_word(&mut self, addr: u32) -> u32 {
        self.bus.read32(addr)
    }

    /// Erase a 256 B page using the fast key domain.
    pub fn erase_page_fast(&mut self, page: FastPage) -> Result<(), Error> {
        self.ready()?;
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::FTER);
        self.bus.write32(reg::ADDR, page.addr());
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::STRT);
        let ret: Result<(), Error> = self.wait_for_completion(ERASE_POLLS);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::FTER);
        ret
    }

    /// Erase a 32 KiB block using the fast key domain.
    pub fn erase_block_32k(&mut self, block: Block) -> Result<(), Error> {
        self.ready()?;
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::BER32);
        self.bus.write32(reg::ADDR, block.addr());
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::STRT);
        let ret: Result<(), Error> = self.wait_for_completion(ERASE_POLLS);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::BER32);
        ret
    }

    /// Reset the fast mode staging buffer to the erased pattern.
    pub fn buf_reset(&mut self) -> Result<(), Error> {
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::FTPG);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::BUFRST);
        let ret: Result<(), Error> = self.wait_for_completion(PROGRAM_POLLS);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::FTPG);
        ret
    }

    /// Load four consecutive words into the staging buffer.
    ///
    /// `addr` selects the buffer offset within the target page. The buffer
    /// covers [`BUF_WORDS`] words; a full page load is 16 calls at
    /// ascending 16-byte offsets.
    pub fn buf_load(&mut self, addr: u32, data: [u32; 4]) -> Result<(), Error> {
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::FTPG);
        for (i, word) in data.iter().enumerate() {
            self.bus.write32(addr + 4 * i as u32, *word);
        }
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::BUFLOAD);
        let ret: Result<(), Error> = self.wait_for_completion(PROGRAM_POLLS);
        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::FTPG);
        ret
    }

    /// Program a 256 B page from `data` in one fast mode operation.
    ///
    /// The 64 words are streamed through the staging buffer, each gated on
    /// the buffer-busy flag, then committed to the page.
    pub fn program_page_fast(
        &mut self,
        page: FastPage,
        data: &[u32; BUF_WORDS],
    ) -> Result<(), Error> {
        self.ready()?;
        self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::FTPG);

        let mut ret: Result<(), Error> = Ok(());
        let mut addr: u32 = page.addr();
        for word in data {
            self.bus.write32(addr, *word);
            ret = self.wait_for_buffer(PROGRAM_POLLS);
            if ret.is_err() {
                break;
            }
            addr += 4;
        }

        if ret.is_ok() {
            self.bus.modify32(reg::CTLR, |ctlr| ctlr | ctl::PGSTRT);
            ret = self.wait_for_completion(PROGRAM_POLLS);
        }

        self.bus.modify32(reg::CTLR, |ctlr| ctlr & !ctl::FTPG);
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimFlash;
    use static_assertions::const_assert_eq;

    const PAGE: u32 = 0x0800_8000;

    const_assert_eq!(FLASH_SIZE % Block::SIZE, 0);
    const_assert_eq!(Block::SIZE % Page::SIZE, 0);
    const_assert_eq!(Block::SIZE / FastPage::SIZE, 128);
    const_assert_eq!(FastPage::SIZE as usize, 4 * BUF_WORDS);

    fn page() -> Page {
        Page::from_addr(PAGE).unwrap()
    }

    fn fast_page() -> FastPage {
        FastPage::from_addr(PAGE).unwrap()
    }

    fn block() -> Block {
        Block::from_addr(PAGE).unwrap()
    }

    #[test]
    fn unlock_lock_idempotent() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        assert!(!flash.is_locked());

        flash.lock();
        assert!(flash.is_locked());
        flash.lock();
        assert!(flash.is_locked());
    }

    #[test]
    fn drop_locks_both_domains() {
        let mut sim = SimFlash::new();
        {
            let _flash = Flash::unlock_fast(&mut sim);
        }
        let ctlr: u32 = sim.ctlr();
        assert_ne!(ctlr & ctl::LOCK, 0);
        assert_ne!(ctlr & ctl::FLOCK, 0);
    }

    #[test]
    fn erase_page_sets_all_bytes() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_page(page()), Ok(()));
        drop(flash);

        for offset in 0..Page::SIZE {
            assert_eq!(sim.peek8(PAGE + offset), 0xFF);
        }
    }

    #[test]
    fn program_half_word_roundtrip() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_page(page()), Ok(()));
        assert_eq!(flash.program_half_word(PAGE, 0x1234), Ok(()));
        assert_eq!(flash.read_half_word(PAGE), 0x1234);
    }

    #[test]
    fn program_word_roundtrip() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_page(page()), Ok(()));
        assert_eq!(flash.program_word(PAGE + 8, 0xDEAD_BEEF), Ok(()));
        assert_eq!(flash.read_word(PAGE + 8), 0xDEAD_BEEF);
    }

    #[test]
    fn reprogram_requires_fresh_erase() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_page(page()), Ok(()));
        assert_eq!(flash.program_half_word(PAGE, 0xAAAA), Ok(()));
        assert_eq!(flash.program_half_word(PAGE, 0x5555), Err(Error::Prog));
        flash.lock();
        drop(flash);

        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();
        assert_eq!(flash.erase_page(page()), Ok(()));
        assert_eq!(flash.program_half_word(PAGE, 0x5555), Ok(()));
        assert_eq!(flash.read_half_word(PAGE), 0x5555);
    }

    #[test]
    fn program_while_locked_reports_wp() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();
        assert_eq!(flash.erase_page(page()), Ok(()));

        flash.lock();
        assert_eq!(flash.program_half_word(PAGE, 0xAAAA), Err(Error::Wp));
    }

    #[test]
    fn protected_page_reports_wp() {
        let mut sim = SimFlash::new();
        sim.protect(PAGE..PAGE + Page::SIZE);
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_page(page()), Err(Error::Wp));
    }

    #[test]
    fn hung_controller_times_out() {
        let mut sim = SimFlash::new();
        sim.hang();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_page(page()), Err(Error::Timeout));
        // busy flag is still asserted, so the next request is refused
        assert_eq!(flash.program_half_word(PAGE, 0xAAAA), Err(Error::Busy));
    }

    #[test]
    fn fast_block_erase() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock_fast(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_block_32k(block()), Ok(()));
        drop(flash);

        for offset in (0..Block::SIZE).step_by(1024) {
            assert_eq!(sim.peek8(PAGE + offset), 0xFF);
        }
    }

    #[test]
    fn fast_ops_require_fast_domain() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock(&mut sim);
        flash.clear_pending_flags();

        assert_eq!(flash.erase_block_32k(block()), Err(Error::Wp));
    }

    #[test]
    fn fast_page_roundtrip() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock_fast(&mut sim);
        flash.clear_pending_flags();

        let mut data: [u32; BUF_WORDS] = [0; BUF_WORDS];
        for (i, word) in data.iter_mut().enumerate() {
            *word = 0x1000_0000 + i as u32;
        }

        assert_eq!(flash.erase_page_fast(fast_page()), Ok(()));
        assert_eq!(flash.program_page_fast(fast_page(), &data), Ok(()));

        for (i, word) in data.iter().enumerate() {
            assert_eq!(flash.read_word(PAGE + 4 * i as u32), *word);
        }
    }

    #[test]
    fn buf_load_commits_at_word_offsets() {
        let mut sim = SimFlash::new();
        let mut flash = Flash::unlock_fast(&mut sim);
        flash.clear_pending_flags();

        let mut data: [u32; BUF_WORDS] = [0; BUF_WORDS];
        for (i, word) in data.iter_mut().enumerate() {
            *word = !(i as u32);
        }

        assert_eq!(flash.erase_page_fast(fast_page()), Ok(()));
        assert_eq!(flash.buf_reset(), Ok(()));
        for chunk in 0..16usize {
            let base: usize = chunk * 4;
            assert_eq!(
                flash.buf_load(
                    PAGE + 16 * chunk as u32,
                    [data[base], data[base + 1], data[base + 2], data[base + 3]],
                ),
                Ok(()),
            );
        }
        assert_eq!(flash.program_page_fast(fast_page(), &data), Ok(()));

        for (j, word) in data.iter().enumerate() {
            assert_eq!(flash.read_word(PAGE + 4 * j as u32), *word);
        }
    }
}
