//! Software-simulated flash memory controller for host tests.
//!
//! Models the observable behavior the drivers depend on: key-sequence
//! unlocking for both domains, busy latency on every command, erase to the
//! `0xFF` pattern, programming restricted to erased locations, the fast mode
//! staging buffer, write protection, and a hang mode for timeout coverage.

use crate::bus::Bus;
use crate::flash::{Block, FastPage, Page, ctl, flags, reg};
use std::ops::Range;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

/// Simulated flash window.
pub(crate) const MEM_BASE: u32 = 0x0800_8000;
pub(crate) const MEM_SIZE: usize = 32 * 1024;

/// Status reads a command stays busy for before completing.
const BUSY_LATENCY: u32 = 3;

pub(crate) struct SimFlash {
    mem: Vec<u8>,
    statr: u32,
    ctlr: u32,
    addr: u32,
    key_stage: u8,
    modekey_stage: u8,
    buf: [u8; FastPage::SIZE as usize],
    buf_page: u32,
    busy: u32,
    hang: bool,
    protected: Vec<Range<u32>>,
    program_writes: u32,
    data_reads16: u32,
    commits: u32,
    poke_after_programs: Option<(u32, u32, u16)>,
    poke_after_commits: Option<(u32, u32, u8)>,
}

impl SimFlash {
    pub fn new() -> Self {
        SimFlash {
            // not the erased pattern, so erases are observable
            mem: vec![0x00; MEM_SIZE],
            statr: 0,
            ctlr: ctl::LOCK | ctl::FLOCK,
            addr: 0,
            key_stage: 0,
            modekey_stage: 0,
            buf: [0xFF; FastPage::SIZE as usize],
            buf_page: MEM_BASE,
            busy: 0,
            hang: false,
            protected: Vec::new(),
            program_writes: 0,
            data_reads16: 0,
            commits: 0,
            poke_after_programs: None,
            poke_after_commits: None,
        }
    }

    /// Keep the busy flag asserted forever once the next command starts.
    pub fn hang(&mut self) {
        self.hang = true;
    }

    /// Mark an address range write-protected.
    pub fn protect(&mut self, range: Range<u32>) {
        self.protected.push(range);
    }

    /// Overwrite a half-word after the `n`th program write completes.
    pub fn poke_after_programs(&mut self, n: u32, addr: u32, val: u16) {
        self.poke_after_programs = Some((n, addr, val));
    }

    /// Overwrite a byte after the `n`th fast page commit completes.
    pub fn poke_after_commits(&mut self, n: u32, addr: u32, val: u8) {
        self.poke_after_commits = Some((n, addr, val));
    }

    pub fn ctlr(&self) -> u32 {
        self.ctlr
    }

    pub fn program_writes(&self) -> u32 {
        self.program_writes
    }

    pub fn data_reads16(&self) -> u32 {
        self.data_reads16
    }

    pub fn peek8(&self, addr: u32) -> u8 {
        self.mem[self.index(addr)]
    }

    fn index(&self, addr: u32) -> usize {
        let offset = addr
            .checked_sub(MEM_BASE)
            .unwrap_or_else(|| panic!("address {addr:#010x} below sim window"));
        let offset = offset as usize;
        assert!(offset < MEM_SIZE, "address {addr:#010x} above sim window");
        offset
    }

    fn in_window(&self, addr: u32) -> bool {
        (MEM_BASE..MEM_BASE + MEM_SIZE as u32).contains(&addr)
    }

    fn is_protected(&self, range: Range<u32>) -> bool {
        self.protected
            .iter()
            .any(|p| p.start < range.end && range.start < p.end)
    }

    fn start_command(&mut self) {
        self.statr |= flags::BUSY;
        self.busy = BUSY_LATENCY;
    }

    fn tick(&mut self) {
        if self.busy > 0 && !self.hang {
            self.busy -= 1;
            if self.busy == 0 {
                self.statr &= !(flags::BUSY | flags::WRBUSY);
                self.statr |= flags::EOP;
            }
        }
    }

    fn erase(&mut self, base: u32, len: u32) {
        if self.is_protected(base..base + len) {
            self.statr |= flags::WRPRTERR;
            return;
        }
        let start = self.index(base);
        self.mem[start..start + len as usize].fill(0xFF);
    }

    fn commit_page(&mut self) {
        if self.ctlr & ctl::FLOCK != 0 {
            self.statr |= flags::WRPRTERR;
            return;
        }
        let page = self.buf_page;
        if self.is_protected(page..page + FastPage::SIZE) {
            self.statr |= flags::WRPRTERR;
            return;
        }
        let start = self.index(page);
        let end = start + FastPage::SIZE as usize;
        if self.mem[start..end].iter().any(|&b| b != 0xFF) {
            self.statr |= flags::PGERR;
            return;
        }
        self.mem[start..end].copy_from_slice(&self.buf);
        self.commits += 1;
        if let Some((n, addr, val)) = self.poke_after_commits {
            if self.commits == n {
                let idx = self.index(addr);
                self.mem[idx] = val;
            }
        }
    }

    fn ctlr_write(&mut self, val: u32) {
        if self.ctlr & ctl::LOCK != 0 {
            // writes while locked are ignored, except re-asserting the locks
            self.ctlr |= val & (ctl::LOCK | ctl::FLOCK);
            return;
        }
        let rising = val & !self.ctlr;
        self.ctlr = val;

        if rising & ctl::STRT != 0 {
            if self.ctlr & ctl::PER != 0 {
                self.erase(self.addr & !(Page::SIZE - 1), Page::SIZE);
            } else if self.ctlr & ctl::FTER != 0 {
                if self.ctlr & ctl::FLOCK != 0 {
                    self.statr |= flags::WRPRTERR;
                } else {
                    self.erase(self.addr & !(FastPage::SIZE - 1), FastPage::SIZE);
                }
            } else if self.ctlr & ctl::BER32 != 0 {
                if self.ctlr & ctl::FLOCK != 0 {
                    self.statr |= flags::WRPRTERR;
                } else {
                    self.erase(self.addr & !(Block::SIZE - 1), Block::SIZE);
                }
            }
            self.start_command();
        }

        if self.ctlr & ctl::FTPG != 0 {
            if rising & ctl::BUFRST != 0 {
                self.buf.fill(0xFF);
                self.start_command();
            }
            if rising & ctl::BUFLOAD != 0 {
                // words were captured at write time
                self.start_command();
            }
            if rising & ctl::PGSTRT != 0 {
                self.commit_page();
                self.start_command();
            }
        }
    }
}

impl Bus for SimFlash {
    fn read8(&mut self, addr: u32) -> u8 {
        if self.in_window(addr) {
            return self.mem[self.index(addr)];
        }
        panic!("read8 of unmapped address {addr:#010x}");
    }

    fn write8(&mut self, addr: u32, _val: u8) {
        panic!("write8 of unmapped address {addr:#010x}");
    }

    fn read16(&mut self, addr: u32) -> u16 {
        if self.in_window(addr) {
            self.data_reads16 += 1;
            let idx = self.index(addr);
            return u16::from_le_bytes([self.mem[idx], self.mem[idx + 1]]);
        }
        panic!("read16 of unmapped address {addr:#010x}");
    }

    fn write16(&mut self, addr: u32, val: u16) {
        if !self.in_window(addr) {
            panic!("write16 of unmapped address {addr:#010x}");
        }
        self.program_writes += 1;
        if self.ctlr & ctl::LOCK != 0 || self.ctlr & ctl::PG == 0 {
            self.statr |= flags::WRPRTERR;
        } else if self.is_protected(addr..addr + 2) {
            self.statr |= flags::WRPRTERR;
        } else {
            let idx = self.index(addr);
            if self.mem[idx] == 0xFF && self.mem[idx + 1] == 0xFF {
                let bytes = val.to_le_bytes();
                self.mem[idx] = bytes[0];
                self.mem[idx + 1] = bytes[1];
            } else {
                self.statr |= flags::PGERR;
            }
        }
        if let Some((n, poke_addr, poke_val)) = self.poke_after_programs {
            if self.program_writes == n {
                let idx = self.index(poke_addr);
                let bytes = poke_val.to_le_bytes();
                self.mem[idx] = bytes[0];
                self.mem[idx + 1] = bytes[1];
            }
        }
        self.start_command();
    }

    fn read32(&mut self, addr: u32) -> u32 {
        match addr {
            reg::STATR => {
                self.tick();
                self.statr
            }
            reg::CTLR => self.ctlr,
            reg::ADDR => self.addr,
            reg::KEYR | reg::MODEKEYR => 0,
            _ => {
                if self.in_window(addr) {
                    let idx = self.index(addr);
                    return u32::from_le_bytes([
                        self.mem[idx],
                        self.mem[idx + 1],
                        self.mem[idx + 2],
                        self.mem[idx + 3],
                    ]);
                }
                panic!("read32 of unmapped address {addr:#010x}");
            }
        }
    }

    fn write32(&mut self, addr: u32, val: u32) {
        match addr {
            reg::KEYR => {
                if val == KEY1 {
                    self.key_stage = 1;
                } else if val == KEY2 && self.key_stage == 1 {
                    self.ctlr &= !ctl::LOCK;
                    self.key_stage = 0;
                } else {
                    self.key_stage = 0;
                }
            }
            reg::MODEKEYR => {
                // the fast key sequence is only accepted once the standard
                // domain is unlocked
                if self.ctlr & ctl::LOCK != 0 {
                    self.modekey_stage = 0;
                } else if val == KEY1 {
                    self.modekey_stage = 1;
                } else if val == KEY2 && self.modekey_stage == 1 {
                    self.ctlr &= !ctl::FLOCK;
                    self.modekey_stage = 0;
                } else {
                    self.modekey_stage = 0;
                }
            }
            reg::STATR => {
                // write-1-to-clear
                self.statr &= !(val & (flags::EOP | flags::PGERR | flags::WRPRTERR));
            }
            reg::CTLR => self.ctlr_write(val),
            reg::ADDR => self.addr = val,
            _ => {
                if !self.in_window(addr) {
                    panic!("write32 of unmapped address {addr:#010x}");
                }
                if self.ctlr & ctl::FTPG != 0 && self.ctlr & ctl::FLOCK == 0 {
                    self.buf_page = addr & !(FastPage::SIZE - 1);
                    let off = (addr - self.buf_page) as usize;
                    self.buf[off..off + 4].copy_from_slice(&val.to_le_bytes());
                    self.statr |= flags::WRBUSY;
                    self.busy = BUSY_LATENCY;
                } else {
                    self.statr |= flags::WRPRTERR;
                }
            }
        }
    }
}
