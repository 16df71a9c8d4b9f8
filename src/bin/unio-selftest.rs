#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate unio_eeprom;
use unio_eeprom::*;

use std::process::exit;

use unio_eeprom::sim::SimBus;
use unio_eeprom::unio::consts::{
	EEPROM_ADDRESS,
	STATUS_WEL,
};
use unio_eeprom::unio::EepromOperations;

fn get_param<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(default),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn verify(bus: &mut SimBus, address: u16, expected: &[u8]) -> AResult<()> {
	let mut readback = vec![0u8; expected.len()];
	bus.read(EEPROM_ADDRESS, address, &mut readback)?;
	ensure!(
		readback == expected,
		"verify failed at 0x{:04x}: expected {:02x?}, read {:02x?}",
		address, expected, readback
	);
	Ok(())
}

fn dump(bus: &mut SimBus, length: usize) -> AResult<()> {
	let mut buffer = vec![0u8; length];
	bus.read(EEPROM_ADDRESS, 0, &mut buffer)?;
	for (offset, row) in buffer.chunks(16).enumerate() {
		let bytes: Vec<String> = row.iter().map(|b| format!("{:02x}", b)).collect();
		info!("0x{:04x}: {}", offset * 16, bytes.join(" "));
	}
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@arg size: --size +takes_value "EEPROM size in bytes (default 256)")
		(@arg busy_polls: --("busy-polls") +takes_value "status polls reporting WIP after each page write (default 2)")
		(@arg dump: --dump "dump the first 64 bytes after each stage")
	).get_matches();

	let size: usize = get_param(&matches, "size", 256)?;
	let busy_polls: u32 = get_param(&matches, "busy_polls", 2)?;
	let want_dump = matches.is_present("dump");

	let mut bus = SimBus::new(size);
	bus.slave.busy_polls = busy_polls;
	bus.init();

	info!("status register access");
	let status = bus.read_status(EEPROM_ADDRESS)?;
	ensure!(0 == status & STATUS_WEL, "fresh device has WEL set");
	bus.enable_write(EEPROM_ADDRESS)?;
	let status = bus.read_status(EEPROM_ADDRESS)?;
	ensure!(0 != status & STATUS_WEL, "WEL not set after WREN");
	bus.disable_write(EEPROM_ADDRESS)?;
	let status = bus.read_status(EEPROM_ADDRESS)?;
	ensure!(0 == status & STATUS_WEL, "WEL still set after WRDI");

	info!("writing DE AD BE EF at 0x0003");
	bus.simple_write(EEPROM_ADDRESS, 0x0003, &[0xde, 0xad, 0xbe, 0xef])?;
	verify(&mut bus, 0x0003, &[0xde, 0xad, 0xbe, 0xef])?;

	info!("writing FE ED BA BE at 0x001e (crosses a page boundary)");
	bus.simple_write(EEPROM_ADDRESS, 0x001e, &[0xfe, 0xed, 0xba, 0xbe])?;
	verify(&mut bus, 0x001e, &[0xfe, 0xed, 0xba, 0xbe])?;
	if want_dump {
		dump(&mut bus, 64)?;
	}

	info!("page boundary pre-check");
	ensure!(
		bus.start_write(EEPROM_ADDRESS, 0x000d, &[0u8; 4]).is_err(),
		"boundary-crossing write was not rejected"
	);

	info!("writing 51-byte counting pattern at 0x0000");
	let pattern: Vec<u8> = (0..51).collect();
	bus.simple_write(EEPROM_ADDRESS, 0x0000, &pattern)?;
	verify(&mut bus, 0x0000, &pattern)?;
	if want_dump {
		dump(&mut bus, 64)?;
	}

	ensure!(
		0 == bus.irq_depth(),
		"unbalanced critical sections (depth {})", bus.irq_depth()
	);
	info!(
		"self-test passed: {} page writes, {} status polls, {} µs of simulated bus time",
		bus.slave.write_log.len(),
		bus.slave.status_reads,
		bus.elapsed_us()
	);
	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
