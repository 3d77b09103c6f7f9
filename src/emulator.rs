use log::{trace, warn};
use rand::Rng;

use crate::{
    decode::OpCodes,
    display::FrameBuffer,
    error::{ExecError, LoadError},
    keyboard::Keyboard,
    memory::{Memory, TypeAddr, MAX_ROM_SIZE, PROGRAM_START},
    registers::{IndexRegister, ProgramCounter, Registers, Stack},
    timer::Timers,
};

/// Historically ambiguous instruction behaviors. The defaults follow the
/// reference console this machine reimplements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quirks {
    /// 8XY6/8XYE read their operand from VY instead of VX, as the oldest
    /// console revision did. The result always lands in VX either way.
    pub shift_reads_vy: bool,
}

/// The whole machine: memory, register file, call stack, timers,
/// framebuffer and input latch, stepped by the instruction dispatcher.
/// The dispatcher is the only mutator of this state; hosts drive it
/// through `step` and `tick_timers` and observe the framebuffer, redraw
/// flag and sound edge between steps.
pub struct Emulator {
    fb: FrameBuffer,
    regs: Registers,
    mem: Memory,
    pc: ProgramCounter,
    index: IndexRegister,
    stack: Stack,
    timers: Timers,
    keyboard: Keyboard,
    // FX0A target register while the machine is blocked on input
    awaiting_key: Option<u8>,
    quirks: Quirks,
}

impl Emulator {
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        Self {
            fb: FrameBuffer::new(),
            regs: Registers::new(),
            mem: Memory::new(),
            pc: ProgramCounter(PROGRAM_START),
            index: IndexRegister(0),
            stack: Stack::new(),
            timers: Timers::new(),
            keyboard: Keyboard::new(),
            awaiting_key: None,
            quirks,
        }
    }

    /// Zero every component and re-preload the glyph font.
    pub fn reset(&mut self) {
        self.fb.reset();
        self.regs.reset();
        self.mem.reset();
        self.pc.set_addr(PROGRAM_START);
        self.index.set_addr(0);
        self.stack.clear();
        self.timers.reset();
        self.keyboard.reset();
        self.awaiting_key = None;
    }

    /// Reset the machine and copy `rom` to the program region. An oversized
    /// image is rejected before any state changes.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.reset();
        self.mem.load_rom(rom)
    }

    /// One fetch-decode-execute cycle. While the machine is awaiting a key
    /// press the program counter holds still and this returns without
    /// executing anything, so hosts keep their stepping cadence.
    pub fn step(&mut self) -> Result<(), ExecError> {
        if let Some(vx) = self.awaiting_key {
            if let Some(key) = self.keyboard.first_pressed() {
                self.regs.set_register(vx, key);
                self.awaiting_key = None;
                self.pc.advance();
            }
            return Ok(());
        }

        let word = self.mem.read_word(self.pc.0)?;
        let ins = OpCodes::decode_raw(word);
        trace!("{:03X}: {:04X} {:?}", self.pc.0, word, ins);
        self.execute_ins(ins)
    }

    /// One 60Hz timer decrement. Cadence belongs to the host and is
    /// independent of how many instructions run per frame.
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    /// True exactly on the tick where the sound timer went from 1 to 0.
    pub fn is_sound_pending(&self) -> bool {
        self.timers.sound_pending()
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    /// Checks and clears the redraw flag.
    pub fn consume_redraw_flag(&mut self) -> bool {
        self.fb.take_redraw()
    }

    pub fn set_key_state(&mut self, key: u8, pressed: bool) {
        self.keyboard.set_key_state(key, pressed);
    }

    fn skip_if(&mut self, cond: bool) {
        self.pc.set_addr(self.pc.0.wrapping_add(if cond { 4 } else { 2 }));
    }

    fn offset_addr(&self, base: TypeAddr, offset: u16) -> Result<TypeAddr, ExecError> {
        base.checked_add(offset)
            .ok_or(ExecError::OutOfBounds { addr: base })
    }

    fn execute_ins(&mut self, ins: OpCodes) -> Result<(), ExecError> {
        match ins {
            OpCodes::ClearScreen => {
                self.fb.clear_buffer();
                self.pc.advance();
            }
            OpCodes::Jump(addr) => {
                self.pc.set_addr(addr);
            }
            OpCodes::PushSubroutine(addr) => {
                self.stack.push(self.pc.0)?;
                self.pc.set_addr(addr);
            }
            OpCodes::PopSubroutine => {
                let addr = self
                    .stack
                    .pop()
                    .ok_or(ExecError::StackUnderflow { pc: self.pc.0 })?;
                self.pc.set_addr(addr);
                self.pc.advance();
            }
            OpCodes::SkipEqualConstant(vx, kk) => {
                self.skip_if(self.regs.get(vx) == kk);
            }
            OpCodes::SkipNotEqualConstant(vx, kk) => {
                self.skip_if(self.regs.get(vx) != kk);
            }
            OpCodes::SkipEqualRegister(vx, vy) => {
                self.skip_if(self.regs.get(vx) == self.regs.get(vy));
            }
            OpCodes::SkipNotEqualRegister(vx, vy) => {
                self.skip_if(self.regs.get(vx) != self.regs.get(vy));
            }
            OpCodes::SetRegister(vx, kk) => {
                self.regs.set_register(vx, kk);
                self.pc.advance();
            }
            OpCodes::AddToRegister(vx, kk) => {
                self.regs.add_to_register(vx, kk);
                self.pc.advance();
            }
            OpCodes::CopyRegister(vx, vy) => {
                self.regs.set_register(vx, self.regs.get(vy));
                self.pc.advance();
            }
            OpCodes::Or(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) | self.regs.get(vy));
                self.pc.advance();
            }
            OpCodes::And(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) & self.regs.get(vy));
                self.pc.advance();
            }
            OpCodes::XOr(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) ^ self.regs.get(vy));
                self.pc.advance();
            }
            // flags are computed from the pre-operation operands and VF is
            // always written after the destination, so the flag wins when
            // the destination is VF itself
            OpCodes::Add(vx, vy) => {
                let (sum, carry) = self.regs.get(vx).overflowing_add(self.regs.get(vy));
                self.regs.set_register(vx, sum);
                self.regs.set_flag(carry as u8);
                self.pc.advance();
            }
            OpCodes::SubtractForward(vx, vy) => {
                let (x, y) = (self.regs.get(vx), self.regs.get(vy));
                self.regs.set_register(vx, x.wrapping_sub(y));
                self.regs.set_flag((x >= y) as u8);
                self.pc.advance();
            }
            OpCodes::SubtractBackward(vx, vy) => {
                let (x, y) = (self.regs.get(vx), self.regs.get(vy));
                self.regs.set_register(vx, y.wrapping_sub(x));
                self.regs.set_flag((y >= x) as u8);
                self.pc.advance();
            }
            OpCodes::RightShift(vx, vy) => {
                let src = self.shift_source(vx, vy);
                self.regs.set_register(vx, src >> 1);
                self.regs.set_flag(src & 1);
                self.pc.advance();
            }
            OpCodes::LeftShift(vx, vy) => {
                let src = self.shift_source(vx, vy);
                self.regs.set_register(vx, src << 1);
                self.regs.set_flag(src >> 7);
                self.pc.advance();
            }
            OpCodes::SetIndexRegister(addr) => {
                self.index.set_addr(addr);
                self.pc.advance();
            }
            OpCodes::JumpWithOffset(addr) => {
                self.pc.set_addr(addr.wrapping_add(self.regs.get(0x0) as u16));
            }
            OpCodes::Random(vx, kk) => {
                let byte: u8 = rand::thread_rng().gen();
                self.regs.set_register(vx, byte & kk);
                self.pc.advance();
            }
            OpCodes::Display(rx, ry, height) => {
                let (x, y) = (self.regs.get(rx), self.regs.get(ry));
                let mut sprite = Vec::with_capacity(height as usize);
                for row in 0..height as u16 {
                    let addr = self.offset_addr(self.index.0, row)?;
                    sprite.push(self.mem.get(addr)?);
                }
                let collision = self.fb.paint(x, y, &sprite);
                self.regs.set_flag(collision as u8);
                self.pc.advance();
            }
            OpCodes::SkipIfPressed(vx) => {
                // low nibble selects the pad key
                let key = self.regs.get(vx) & 0xF;
                self.skip_if(self.keyboard.is_pressed(key));
            }
            OpCodes::SkipIfNotPressed(vx) => {
                let key = self.regs.get(vx) & 0xF;
                self.skip_if(!self.keyboard.is_pressed(key));
            }
            OpCodes::CopyDelayToRegister(vx) => {
                self.regs.set_register(vx, self.timers.delay());
                self.pc.advance();
            }
            OpCodes::CopyRegisterToDelay(vx) => {
                self.timers.set_delay(self.regs.get(vx));
                self.pc.advance();
            }
            OpCodes::CopyRegisterToSound(vx) => {
                self.timers.set_sound(self.regs.get(vx));
                self.pc.advance();
            }
            OpCodes::AddToIndex(vx) => {
                // I keeps the full 16-bit sum; VF reports escaping the
                // 12-bit address space, which some programs rely on
                let sum = self.index.0 as u32 + self.regs.get(vx) as u32;
                self.index.set_addr(sum as TypeAddr);
                self.regs.set_flag((sum > 0xFFF) as u8);
                self.pc.advance();
            }
            OpCodes::GetKey(vx) => {
                self.awaiting_key = Some(vx);
                // pc holds still until a key is latched
            }
            OpCodes::PointChar(vx) => {
                self.index.set_addr(Memory::glyph_addr(self.regs.get(vx)));
                self.pc.advance();
            }
            OpCodes::ToDecimal(vx) => {
                let value = self.regs.get(vx);
                for (offset, digit) in [value / 100, value / 10 % 10, value % 10]
                    .into_iter()
                    .enumerate()
                {
                    let addr = self.offset_addr(self.index.0, offset as u16)?;
                    self.mem.set(addr, digit)?;
                }
                self.pc.advance();
            }
            OpCodes::StoreRegisterToMemory(vx) => {
                for reg in 0..=vx {
                    let addr = self.offset_addr(self.index.0, reg as u16)?;
                    self.mem.set(addr, self.regs.get(reg))?;
                }
                self.pc.advance();
            }
            OpCodes::LoadRegisterFromMemory(vx) => {
                for reg in 0..=vx {
                    let addr = self.offset_addr(self.index.0, reg as u16)?;
                    self.regs.set_register(reg, self.mem.get(addr)?);
                }
                self.pc.advance();
            }
            OpCodes::Unknown(word) => {
                warn!("unknown opcode {:04X} at {:03X}", word, self.pc.0);
                self.pc.advance();
            }
        }
        Ok(())
    }

    fn shift_source(&self, vx: u8, vy: u8) -> u8 {
        if self.quirks.shift_reads_vy {
            self.regs.get(vy)
        } else {
            self.regs.get(vx)
        }
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}
