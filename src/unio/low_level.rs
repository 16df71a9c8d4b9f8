use std::ops::{
	Deref,
	DerefMut,
};

use super::consts::*;
use super::hardware::{
	Hardware,
	LineDirection,
};

/// Critical section around one header+command+payload exchange.
///
/// The slave samples with tight tolerances relative to instruction
/// timing, so a preemption in the middle of an exchange corrupts the
/// waveform it observes. Interrupt state is captured on entry and
/// restored when the grant is dropped, which covers early `?` returns
/// inside an operation as well as the success path.
pub struct BusGrant<'a, H: ?Sized + Hardware + 'a> {
	hardware: &'a mut H,
	saved: Option<H::InterruptState>,
}

impl<'a, H: ?Sized + Hardware> Drop for BusGrant<'a, H> {
	fn drop(&mut self) {
		if let Some(saved) = self.saved.take() {
			self.hardware.restore_interrupts(saved);
		}
	}
}

impl<'a, H: ?Sized + Hardware> Deref for BusGrant<'a, H> {
	type Target = H;

	fn deref(&self) -> &Self::Target {
		&self.hardware
	}
}

impl<'a, H: ?Sized + Hardware> DerefMut for BusGrant<'a, H> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.hardware
	}
}

/// Bit slots, byte frames and the bus sequences between commands.
///
/// All delays are expressed in quarter bits. The same slot code path is
/// used for reading and writing: during a write we perform dummy reads
/// at 1/4 and 3/4 of the bit time, during a read we perform dummy latch
/// writes at the start and 1/2 way through.
pub trait LowLevel: Hardware {
	/// One bit slot: drive the complement of `value` for a quarter bit,
	/// sample, drive `value` for a quarter bit, sample again. True iff
	/// the samples saw low-then-high, i.e. a well-formed "1".
	fn exchange_bit(&mut self, value: bool) -> bool {
		self.set_line(!value);
		self.delay_us(QUARTER_BIT_US);
		let first = self.read_line();
		self.delay_us(QUARTER_BIT_US);
		self.set_line(value);
		self.delay_us(QUARTER_BIT_US);
		let second = self.read_line();
		self.delay_us(QUARTER_BIT_US);
		second && !first
	}

	/// Release the line for one slot and let the slave encode the bit.
	fn read_bit(&mut self) -> bool {
		self.set_direction(LineDirection::Release);
		let bit = self.exchange_bit(true);
		self.set_direction(LineDirection::Drive);
		bit
	}

	/// Send 8 bits MSB first, then the MAK/NoMAK bit; returns the SAK.
	fn send_byte(&mut self, value: u8, more: bool) -> bool {
		let mut value = value;
		for _ in 0..8 {
			self.exchange_bit(0 != value & 0x80);
			value <<= 1;
		}
		self.exchange_bit(more);
		self.read_bit()
	}

	/// Receive 8 bits MSB first, then send the MAK/NoMAK bit; returns
	/// the byte and the SAK.
	fn receive_byte(&mut self, more: bool) -> (u8, bool) {
		let mut value = 0u8;
		self.set_direction(LineDirection::Release);
		for _ in 0..8 {
			value = (value << 1) | self.exchange_bit(true) as u8;
		}
		self.set_direction(LineDirection::Drive);
		self.exchange_bit(more);
		(value, self.read_bit())
	}

	/// Send `data` with MAK after each byte; the last byte gets NoMAK
	/// when `end` terminates the command. Stops at the first missing
	/// slave acknowledge without sending the remaining bytes.
	fn send_bytes(&mut self, data: &[u8], end: bool) -> crate::AResult<()> {
		for (i, b) in data.iter().enumerate() {
			let last = i + 1 == data.len();
			ensure!(
				self.send_byte(*b, !(last && end)),
				"no slave acknowledge after byte {} of {}", i, data.len()
			);
		}
		Ok(())
	}

	/// Receive into `target`; NoMAK after the final byte terminates the
	/// command.
	fn receive_bytes(&mut self, target: &mut [u8]) -> crate::AResult<()> {
		let count = target.len();
		for (i, t) in target.iter_mut().enumerate() {
			let (value, ack) = self.receive_byte(i + 1 != count);
			*t = value;
			ensure!(ack, "no slave acknowledge after byte {} of {}", i, count);
		}
		Ok(())
	}

	/// Send a standby pulse. After power-on or brown-out reset the
	/// device wants a low-to-high transition at the start of the pulse,
	/// so the line is taken low for Tss first.
	fn standby_pulse(&mut self) {
		self.set_line(false);
		self.set_direction(LineDirection::Drive);
		self.delay_us(COMMAND_GAP_US + TIMING_MARGIN_US);
		self.set_line(true);
		self.delay_us(STANDBY_PULSE_US + TIMING_MARGIN_US);
	}

	/// Between chained commands without a standby pulse the bus must be
	/// held high for at least Tss.
	fn inter_command_gap(&mut self) {
		self.set_line(true);
		self.delay_us(COMMAND_GAP_US + TIMING_MARGIN_US);
	}

	/// Hold the bus low for Thdr, then transmit the start byte. There
	/// is a SAK slot after the header, but with more than one device on
	/// the line no single slave drives it reliably, so the value is not
	/// examined.
	fn start_header(&mut self) {
		self.set_line(false);
		self.delay_us(HEADER_LOW_US + TIMING_MARGIN_US);
		self.send_byte(START_HEADER, true);
	}

	/// Suspend preemption for the duration of one exchange.
	fn grant(&mut self) -> BusGrant<Self> {
		let saved = self.suspend_interrupts();
		BusGrant {
			hardware: self,
			saved: Some(saved),
		}
	}
}

impl<H: Hardware + ?Sized> LowLevel for H {
}
