//! Software stand-in for the UNI/O line and a Microchip 11AA-series
//! slave, driven through the same `Hardware` trait as a real board.
//!
//! Time is virtual: `delay_us` advances a microsecond counter, so a
//! write plus completion poll that takes milliseconds on hardware runs
//! instantly in tests.
//!
//! The slave decodes the master's output-latch updates instead of a
//! continuously sampled waveform. The master updates its latch exactly
//! twice per bit slot (it keeps doing so, masked, while the line is
//! released), so every `set_line` call marks a half-slot boundary; the
//! hold time since the previous update distinguishes standby pulses,
//! header low periods and ordinary half slots. When it is the slave's
//! turn to drive (read data and SAK slots) it schedules the two-phase
//! pattern for the running slot and `read_line` samples that instead of
//! the pull-up.

use crate::unio::consts::*;
use crate::unio::{
	Hardware,
	LineDirection,
};

const HALF_SLOT_US: u64 = 2 * QUARTER_BIT_US as u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ByteKind {
	/// Start header byte; its SAK slot is driven by nobody.
	Header,
	/// Device address, opcode, memory address, WRSR status.
	Command,
	/// WRITE payload received from the master.
	DataIn,
	/// Memory or status bytes driven by the slave.
	DataOut,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
	/// Waiting for a standby pulse after power-on or a protocol error.
	Unsynced,
	/// Synced, waiting for the line to go low ahead of a header.
	Idle,
	/// Line held low; the first half slot ends the Thdr period.
	HeaderLow,
	Bits(ByteKind),
	Mak(ByteKind),
	Sak(ByteKind),
}

/// Behavioral model of one 11AA-series EEPROM.
pub struct SlaveModel {
	pub memory: Vec<u8>,
	device_address: u8,

	phase: Phase,
	first_half: Option<bool>,
	bit_count: u8,
	shift: u8,
	out_shift: u8,
	pending_mak: bool,
	/// Slot the slave currently drives: (slot start, bit value).
	drive: Option<(u64, bool)>,

	selected: bool,
	opcode: Option<u8>,
	command_index: usize,
	address: u16,
	write_start: u16,
	write_latch: Vec<u8>,
	wel: bool,
	block_protect: u8,
	busy_left: u32,

	/// How many status polls report WIP after each committed write.
	pub busy_polls: u32,
	/// Refuse the SAK for the write payload byte with this index.
	pub fail_payload_at: Option<usize>,

	/// Committed writes as (start address, length), in order.
	pub write_log: Vec<(u16, usize)>,
	/// Status bytes handed out via RDSR.
	pub status_reads: usize,
	/// Payload bytes of the current/last WRITE accepted with SAK.
	pub payload_seen: usize,
}

impl SlaveModel {
	fn new(memory_size: usize) -> Self {
		SlaveModel {
			// an empty array cannot model a device; clamp to one byte
			memory: vec![0xff; memory_size.max(1)],
			device_address: EEPROM_ADDRESS,
			phase: Phase::Unsynced,
			first_half: None,
			bit_count: 0,
			shift: 0,
			out_shift: 0,
			pending_mak: false,
			drive: None,
			selected: false,
			opcode: None,
			command_index: 0,
			address: 0,
			write_start: 0,
			write_latch: Vec::new(),
			wel: false,
			block_protect: 0,
			busy_left: 0,
			busy_polls: 0,
			fail_payload_at: None,
			write_log: Vec::new(),
			status_reads: 0,
			payload_seen: 0,
		}
	}

	pub fn write_enabled(&self) -> bool {
		self.wel
	}

	/// Level the slave drives at `now`, if it drives at all.
	fn drive_level(&self, now: u64) -> Option<bool> {
		self.drive.map(|(start, value)| {
			if now < start + HALF_SLOT_US {
				!value
			} else {
				value
			}
		})
	}

	fn on_half(&mut self, now: u64, level: bool, driving: bool, prev: bool, held: u64) {
		// a long high period resynchronizes the device from any state
		if prev && held >= u64::from(STANDBY_PULSE_US) {
			self.end_command();
		}
		match self.phase {
			Phase::Unsynced => {},
			Phase::Idle => {
				if driving && !level {
					self.phase = Phase::HeaderLow;
				}
			},
			Phase::HeaderLow => {
				if !prev && held >= u64::from(HEADER_LOW_US) {
					self.begin_byte(ByteKind::Header);
					self.master_half(level);
				} else {
					self.fault();
				}
			},
			Phase::Bits(ByteKind::DataOut) => self.slave_half(now),
			Phase::Bits(_) | Phase::Mak(_) => self.master_half(level),
			Phase::Sak(kind) => self.sak_half(now, kind),
		}
	}

	fn master_half(&mut self, level: bool) {
		match self.first_half.take() {
			None => self.first_half = Some(level),
			Some(first) => {
				let bit = match (first, level) {
					(false, true) => true,
					(true, false) => false,
					// both halves at the same level is not a bit
					_ => return self.fault(),
				};
				self.complete_bit(bit);
			},
		}
	}

	fn complete_bit(&mut self, bit: bool) {
		match self.phase {
			Phase::Bits(kind) => {
				self.shift = (self.shift << 1) | bit as u8;
				self.bit_count += 1;
				if self.bit_count == 8 {
					if kind == ByteKind::Header && self.shift != START_HEADER {
						self.fault();
					} else {
						self.phase = Phase::Mak(kind);
					}
				}
			},
			Phase::Mak(kind) => {
				self.pending_mak = bit;
				self.phase = Phase::Sak(kind);
			},
			_ => self.fault(),
		}
	}

	/// One half of a slave-driven data byte slot. The levels the master
	/// latches while the line is released are ignored; only the event
	/// itself clocks the byte out.
	fn slave_half(&mut self, now: u64) {
		match self.first_half.take() {
			None => {
				let bit = 0 != self.out_shift & 0x80;
				self.drive = Some((now, bit));
				self.first_half = Some(bit);
			},
			Some(_) => {
				self.out_shift <<= 1;
				self.bit_count += 1;
				if self.bit_count == 8 {
					self.phase = Phase::Mak(ByteKind::DataOut);
				}
			},
		}
	}

	fn sak_half(&mut self, now: u64, kind: ByteKind) {
		match self.first_half.take() {
			None => {
				let ack = self.decide_ack(kind);
				self.drive = if ack { Some((now, true)) } else { None };
				self.first_half = Some(ack);
			},
			Some(ack) => self.byte_done(kind, ack),
		}
	}

	fn decide_ack(&mut self, kind: ByteKind) -> bool {
		match kind {
			ByteKind::Header => false,
			ByteKind::Command => match self.command_index {
				0 => {
					self.selected = self.shift == self.device_address;
					self.selected
				},
				1 => self.selected && known_opcode(self.shift),
				_ => self.selected,
			},
			ByteKind::DataIn => {
				self.selected && Some(self.payload_seen) != self.fail_payload_at
			},
			ByteKind::DataOut => self.selected,
		}
	}

	fn byte_done(&mut self, kind: ByteKind, ack: bool) {
		let mak = self.pending_mak;
		match kind {
			ByteKind::Header => {
				if mak {
					self.command_index = 0;
					self.begin_byte(ByteKind::Command);
				} else {
					self.fault();
				}
			},
			ByteKind::Command => {
				if !ack {
					return self.end_command();
				}
				self.accept_command_byte(mak);
			},
			ByteKind::DataIn => {
				if !ack {
					return self.end_command();
				}
				self.write_latch.push(self.shift);
				self.payload_seen += 1;
				if mak {
					self.begin_byte(ByteKind::DataIn);
				} else {
					self.commit_write();
					self.end_command();
				}
			},
			ByteKind::DataOut => {
				if mak {
					self.load_out_byte();
					self.begin_byte(ByteKind::DataOut);
				} else {
					self.end_command();
				}
			},
		}
	}

	fn accept_command_byte(&mut self, mak: bool) {
		let value = self.shift;
		match self.command_index {
			0 => {
				// device address byte; selection happened in the SAK slot
				self.command_index = 1;
				self.begin_byte(ByteKind::Command);
			},
			1 => {
				self.opcode = Some(value);
				match value {
					WRITE_ENABLE_OPCODE if !mak => {
						self.wel = true;
						self.end_command();
					},
					WRITE_DISABLE_OPCODE if !mak => {
						self.wel = false;
						self.end_command();
					},
					READ_STATUS_OPCODE if mak => {
						self.load_out_byte();
						self.begin_byte(ByteKind::DataOut);
					},
					READ_OPCODE | WRITE_OPCODE | WRITE_STATUS_OPCODE if mak => {
						self.command_index = 2;
						self.begin_byte(ByteKind::Command);
					},
					_ => self.fault(),
				}
			},
			2 => {
				if self.opcode == Some(WRITE_STATUS_OPCODE) {
					// only the block protection bits are writable
					self.block_protect = value & 0x0c;
					if mak {
						self.fault();
					} else {
						self.end_command();
					}
				} else {
					self.address = u16::from(value) << 8;
					self.command_index = 3;
					self.begin_byte(ByteKind::Command);
				}
			},
			3 => {
				self.address |= u16::from(value);
				match self.opcode {
					Some(READ_OPCODE) if mak => {
						self.load_out_byte();
						self.begin_byte(ByteKind::DataOut);
					},
					Some(WRITE_OPCODE) if mak => {
						self.write_start = self.address;
						self.write_latch.clear();
						self.payload_seen = 0;
						self.begin_byte(ByteKind::DataIn);
					},
					_ => self.fault(),
				}
			},
			_ => self.fault(),
		}
	}

	fn load_out_byte(&mut self) {
		match self.opcode {
			Some(READ_STATUS_OPCODE) => {
				self.status_reads += 1;
				let wip = self.busy_left > 0;
				if wip {
					self.busy_left -= 1;
				}
				self.out_shift = self.block_protect
					| if self.wel { STATUS_WEL } else { 0 }
					| if wip { STATUS_WIP } else { 0 };
			},
			Some(READ_OPCODE) => {
				let index = self.address as usize % self.memory.len();
				self.out_shift = self.memory[index];
				self.address = self.address.wrapping_add(1);
			},
			_ => self.fault(),
		}
	}

	/// NoMAK after a payload byte commits the write latch. Without a
	/// prior WREN the command is silently ignored, like the real part.
	/// Addressing wraps inside the page.
	fn commit_write(&mut self) {
		if !self.wel || self.write_latch.is_empty() {
			return;
		}
		let page = self.write_start as usize & !(PAGE_SIZE - 1);
		let offset = self.write_start as usize % PAGE_SIZE;
		for (i, b) in self.write_latch.iter().enumerate() {
			let a = (page + (offset + i) % PAGE_SIZE) % self.memory.len();
			self.memory[a] = *b;
		}
		debug!(
			"sim: committed {} bytes at 0x{:04x}",
			self.write_latch.len(), self.write_start
		);
		self.write_log.push((self.write_start, self.write_latch.len()));
		self.busy_left = self.busy_polls;
		self.wel = false;
	}

	fn begin_byte(&mut self, kind: ByteKind) {
		self.shift = 0;
		self.bit_count = 0;
		self.first_half = None;
		self.phase = Phase::Bits(kind);
	}

	fn end_command(&mut self) {
		self.phase = Phase::Idle;
		self.first_half = None;
		self.drive = None;
		self.selected = false;
		self.opcode = None;
		self.command_index = 0;
	}

	/// Protocol violation; stay deaf until the next standby pulse.
	fn fault(&mut self) {
		warn!("sim: protocol fault in phase {:?}", self.phase);
		self.phase = Phase::Unsynced;
		self.first_half = None;
		self.drive = None;
		self.selected = false;
	}
}

fn known_opcode(op: u8) -> bool {
	match op {
		READ_OPCODE
		| WRITE_OPCODE
		| WRITE_ENABLE_OPCODE
		| WRITE_DISABLE_OPCODE
		| READ_STATUS_OPCODE
		| WRITE_STATUS_OPCODE => true,
		_ => false,
	}
}

/// The bus line, the master's pin latch and one attached `SlaveModel`.
pub struct SimBus {
	now_us: u64,
	direction: LineDirection,
	latch: bool,
	last_event_at: u64,
	last_latch: bool,
	bus_ops: usize,
	irq_enabled: bool,
	irq_depth: i32,
	irq_suspends: usize,
	pub slave: SlaveModel,
}

impl SimBus {
	pub fn new(memory_size: usize) -> Self {
		SimBus {
			now_us: 0,
			direction: LineDirection::Drive,
			latch: true,
			last_event_at: 0,
			last_latch: true,
			bus_ops: 0,
			irq_enabled: true,
			irq_depth: 0,
			irq_suspends: 0,
			slave: SlaveModel::new(memory_size),
		}
	}

	/// Virtual microseconds spent on the bus so far.
	pub fn elapsed_us(&self) -> u64 {
		self.now_us
	}

	/// Pin accesses and delays since construction; zero means the
	/// driver never touched the bus.
	pub fn bus_ops(&self) -> usize {
		self.bus_ops
	}

	/// Nesting depth of suspend/restore; zero when every critical
	/// section was exited on all paths.
	pub fn irq_depth(&self) -> i32 {
		self.irq_depth
	}

	pub fn irq_suspends(&self) -> usize {
		self.irq_suspends
	}
}

impl Hardware for SimBus {
	type InterruptState = bool;

	fn set_direction(&mut self, direction: LineDirection) {
		self.bus_ops += 1;
		self.direction = direction;
	}

	fn set_line(&mut self, level: bool) {
		self.bus_ops += 1;
		let held = self.now_us - self.last_event_at;
		let driving = self.direction == LineDirection::Drive;
		self.slave
			.on_half(self.now_us, level, driving, self.last_latch, held);
		self.latch = level;
		self.last_latch = level;
		self.last_event_at = self.now_us;
	}

	fn read_line(&mut self) -> bool {
		self.bus_ops += 1;
		match self.direction {
			LineDirection::Drive => self.latch,
			LineDirection::Release => {
				self.slave.drive_level(self.now_us).unwrap_or(true)
			},
		}
	}

	fn delay_us(&mut self, us: u32) {
		self.bus_ops += 1;
		self.now_us += u64::from(us);
	}

	fn suspend_interrupts(&mut self) -> bool {
		let prior = self.irq_enabled;
		self.irq_enabled = false;
		self.irq_depth += 1;
		self.irq_suspends += 1;
		prior
	}

	fn restore_interrupts(&mut self, saved: bool) {
		self.irq_enabled = saved;
		self.irq_depth -= 1;
	}
}
