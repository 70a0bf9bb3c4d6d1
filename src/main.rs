//! Aura keyboard RGB CLI tool
//!
//! Encodes lighting commands for the ASUS ROG Aura laptop keyboards into the
//! vendor's 17-byte HID feature-report protocol and writes them to the first
//! supported device on the bus.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::process;
use std::str::FromStr;

use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use hidapi::{HidApi, HidDevice};

use crate::commands::{find_command, parse_arguments, CommandArguments, CommandSpec, COMMANDS};
use crate::protocol::{EncodedOutput, MESSAGE_APPLY, MESSAGE_SET};
use crate::state::BrightnessStore;

mod commands;
mod protocol;
mod state;

/// ASUS HID vendor ID.
const ASUS_VENDOR_ID: u16 = 0x0b05;

/// Product IDs of the supported Aura keyboards.
const ASUS_PRODUCT_IDS: [u16; 4] = [0x1854, 0x1869, 0x1866, 0x19b6];

/// RGB color.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl FromStr for Rgb {
    type Err = ();

    fn from_str(s: &str) -> Result<Rgb, ()> {
        // Exactly six hex digits, case-insensitive, no prefix.
        if s.len() != 6 || !s.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(());
        }

        match u32::from_str_radix(s, 16) {
            Ok(mut color) => {
                let b = (color & 0xff) as u8;
                color >>= 8;
                let g = (color & 0xff) as u8;
                color >>= 8;
                let r = color as u8;
                Ok(Rgb { r, g, b })
            },
            Err(_) => Err(()),
        }
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn main() {
    let matches = cli();
    let verbose = matches.get_flag("verbose");

    let name = matches.get_one::<String>("command").expect("clap requires the command");
    let spec = match find_command(name) {
        Some(spec) => spec,
        None => {
            eprintln!("\x1b[31mError:\x1b[0m unknown command '{}'", name);
            eprintln!("\nCOMMAND should be one of:\n{}", command_list());
            process::exit(1);
        },
    };

    let raw: Vec<String> =
        matches.get_many::<String>("args").unwrap_or_default().cloned().collect();
    let args = match parse_arguments(spec, &raw) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", err);
            process::exit(1);
        },
    };

    if verbose {
        print_arguments(spec, &args);
    }

    let store = BrightnessStore::default();
    let output = protocol::encode(spec.kind, &args, &store);

    if verbose {
        for (i, message) in output.messages.iter().enumerate() {
            println!("message {}: {}", i, hex_dump(message));
        }
    }

    match write_messages(&output, verbose) {
        Ok(()) => println!("\x1b[32mSuccessfully applied changes.\x1b[0m"),
        Err(err) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", err);
            process::exit(1);
        },
    }
}

/// Write an encoded command to the keyboard as HID feature reports.
fn write_messages(output: &EncodedOutput, verbose: bool) -> Result<(), Box<dyn Error>> {
    let api = HidApi::new()?;
    let device = open_keyboard(&api)?;

    for message in &output.messages {
        send_report(&device, message)?;
    }

    // The brightness family embeds its own apply step; everything else
    // commits the staged configuration with the SET/APPLY pair.
    if output.set_and_apply {
        send_report(&device, &MESSAGE_SET)?;
        send_report(&device, &MESSAGE_APPLY)?;
    }

    if verbose {
        let sent = output.messages.len() + if output.set_and_apply { 2 } else { 0 };
        println!("sent {} messages", sent);
    }

    Ok(())
}

/// Find and open the first supported Aura keyboard on the HID bus.
fn open_keyboard(api: &HidApi) -> Result<HidDevice, Box<dyn Error>> {
    for info in api.device_list() {
        if info.vendor_id() != ASUS_VENDOR_ID || !ASUS_PRODUCT_IDS.contains(&info.product_id()) {
            continue;
        }

        println!(
            "Found ROG Aura keyboard: {} [{:04x}:{:04x}]",
            info.product_string().unwrap_or("unknown"),
            info.vendor_id(),
            info.product_id()
        );

        return match info.open_device(api) {
            Ok(device) => Ok(device),
            Err(err) => {
                Err(format!("unable to open device: {} (root permissions required)", err).into())
            },
        };
    }

    Err("no supported ROG Aura keyboard found".into())
}

/// Send one feature report; the report ID is the message's first byte.
fn send_report(device: &HidDevice, message: &[u8]) -> Result<(), Box<dyn Error>> {
    if let Err(err) = device.send_feature_report(message) {
        return Err(format!("unable to write message: {}", err).into());
    }

    Ok(())
}

/// Get clap CLI parameters.
fn cli() -> ArgMatches {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .after_help(format!("COMMAND should be one of:\n{}", command_list()))
        .arg(
            Arg::new("verbose")
                .help("Print parsed arguments and constructed messages")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("command").help("Lighting command").required(true))
        .arg(
            Arg::new("args")
                .help("Hex colors [RRGGBB] followed by integer parameters")
                .num_args(0..),
        )
        .get_matches()
}

/// One usage line per supported command, derived from the dispatch table.
fn command_list() -> String {
    let mut list = String::new();

    for spec in COMMANDS {
        list.push_str("   ");
        list.push_str(spec.name);
        for _ in 0..spec.colors {
            list.push_str(" RRGGBB");
        }
        for scalar in spec.scalars {
            list.push_str(" [");
            list.push_str(scalar.name);
            list.push(']');
        }
        list.push('\n');
    }

    list
}

/// Echo the parsed arguments, mirroring the wire order.
fn print_arguments(spec: &CommandSpec, args: &CommandArguments) {
    for (i, color) in args.colors().iter().enumerate() {
        println!("color{} {}", i + 1, color);
    }
    for (def, value) in spec.scalars.iter().zip(args.scalars()) {
        println!("{} {}", def.name, value);
    }
}

/// Format a message as space-separated hex bytes.
fn hex_dump(message: &[u8]) -> String {
    message.iter().map(|byte| format!("{:02x}", byte)).collect::<Vec<_>>().join(" ")
}
