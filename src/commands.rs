//! Command dispatch table and argument validation.

use std::error::Error;
use std::str::FromStr;

use crate::Rgb;

/// Capacity of the argument block accepted by any command.
pub const MAX_NUM_COLORS: usize = 8;
pub const MAX_NUM_SCALARS: usize = 4;

const RED: Rgb = Rgb { r: 0xff, g: 0x00, b: 0x00 };
const GREEN: Rgb = Rgb { r: 0x00, g: 0xff, b: 0x00 };
const BLUE: Rgb = Rgb { r: 0x00, g: 0x00, b: 0xff };
const YELLOW: Rgb = Rgb { r: 0xff, g: 0xff, b: 0x00 };
const GOLD: Rgb = Rgb { r: 0xff, g: 0x8c, b: 0x00 };
const CYAN: Rgb = Rgb { r: 0x00, g: 0xff, b: 0xff };
const MAGENTA: Rgb = Rgb { r: 0xff, g: 0x00, b: 0xff };
const WHITE: Rgb = Rgb { r: 0xff, g: 0xff, b: 0xff };
const BLACK: Rgb = Rgb { r: 0x00, g: 0x00, b: 0x00 };

/// Bounded integer parameter accepted by a command.
pub struct ScalarDef {
    pub name: &'static str,
    pub min: u8,
    pub max: u8,
}

const SPEED: ScalarDef = ScalarDef { name: "speed", min: 1, max: 3 };
const BRIGHTNESS: ScalarDef = ScalarDef { name: "brightness", min: 0, max: 3 };

/// Encoder selector for a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandKind {
    InitializeKeyboard,
    SetBrightness,
    CycleBrightness,
    SingleStatic,
    SingleBreathing,
    SingleColorcycle,
    MultiStatic,
    Rainbow,
    /// Constant-color shortcut delegating to the static encoder.
    NamedColor(Rgb),
}

/// One entry of the command dispatch table.
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    /// Mandatory color arguments.
    pub colors: usize,
    /// Optional scalar arguments, consumed after the colors.
    pub scalars: &'static [ScalarDef],
}

/// Every supported command, in the order shown by the usage text.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "initialize_keyboard",
        kind: CommandKind::InitializeKeyboard,
        colors: 0,
        scalars: &[],
    },
    CommandSpec {
        name: "brightness",
        kind: CommandKind::SetBrightness,
        colors: 0,
        scalars: &[BRIGHTNESS],
    },
    CommandSpec {
        name: "cycle_brightness",
        kind: CommandKind::CycleBrightness,
        colors: 0,
        scalars: &[],
    },
    CommandSpec { name: "on", kind: CommandKind::NamedColor(RED), colors: 0, scalars: &[] },
    CommandSpec { name: "off", kind: CommandKind::NamedColor(BLACK), colors: 0, scalars: &[] },
    CommandSpec { name: "single_static", kind: CommandKind::SingleStatic, colors: 1, scalars: &[] },
    CommandSpec {
        name: "single_breathing",
        kind: CommandKind::SingleBreathing,
        colors: 2,
        scalars: &[SPEED],
    },
    CommandSpec {
        name: "single_colorcycle",
        kind: CommandKind::SingleColorcycle,
        colors: 0,
        scalars: &[SPEED],
    },
    CommandSpec { name: "multi_static", kind: CommandKind::MultiStatic, colors: 4, scalars: &[] },
    CommandSpec { name: "red", kind: CommandKind::NamedColor(RED), colors: 0, scalars: &[] },
    CommandSpec { name: "green", kind: CommandKind::NamedColor(GREEN), colors: 0, scalars: &[] },
    CommandSpec { name: "blue", kind: CommandKind::NamedColor(BLUE), colors: 0, scalars: &[] },
    CommandSpec { name: "yellow", kind: CommandKind::NamedColor(YELLOW), colors: 0, scalars: &[] },
    CommandSpec { name: "gold", kind: CommandKind::NamedColor(GOLD), colors: 0, scalars: &[] },
    CommandSpec { name: "cyan", kind: CommandKind::NamedColor(CYAN), colors: 0, scalars: &[] },
    CommandSpec {
        name: "magenta",
        kind: CommandKind::NamedColor(MAGENTA),
        colors: 0,
        scalars: &[],
    },
    CommandSpec { name: "white", kind: CommandKind::NamedColor(WHITE), colors: 0, scalars: &[] },
    CommandSpec { name: "black", kind: CommandKind::NamedColor(BLACK), colors: 0, scalars: &[] },
    CommandSpec { name: "rainbow", kind: CommandKind::Rainbow, colors: 0, scalars: &[SPEED] },
];

/// Look up a command by its exact name; the first match wins.
pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Parsed positional arguments for one invocation.
///
/// The scalar count distinguishes an omitted optional parameter from an
/// explicit zero; encoders apply their own defaults for absent scalars.
#[derive(Default)]
pub struct CommandArguments {
    colors: Vec<Rgb>,
    scalars: Vec<u8>,
}

impl CommandArguments {
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn scalars(&self) -> &[u8] {
        &self.scalars
    }

    /// Color at `index`, black when absent.
    pub fn color(&self, index: usize) -> Rgb {
        self.colors.get(index).copied().unwrap_or_default()
    }

    /// Scalar at `index`, `None` when the caller omitted it.
    pub fn scalar(&self, index: usize) -> Option<u8> {
        self.scalars.get(index).copied()
    }
}

/// Parse and validate raw CLI tokens against a command's declared arity.
///
/// Colors are consumed before scalars, and the token count must lie in
/// `[colors, colors + scalars]`: colors are mandatory, scalars optional.
pub fn parse_arguments(
    spec: &CommandSpec,
    raw: &[String],
) -> Result<CommandArguments, Box<dyn Error>> {
    debug_assert!(spec.colors <= MAX_NUM_COLORS && spec.scalars.len() <= MAX_NUM_SCALARS);

    let max = spec.colors + spec.scalars.len();
    if raw.len() < spec.colors || raw.len() > max {
        return Err(format!(
            "wrong number of arguments for '{}': expected {} color(s) and up to {} scalar(s), \
            got {} argument(s)",
            spec.name,
            spec.colors,
            spec.scalars.len(),
            raw.len()
        )
        .into());
    }

    let mut args = CommandArguments::default();
    for (i, token) in raw.iter().enumerate() {
        if i < spec.colors {
            args.colors.push(parse_color(token)?);
        } else {
            args.scalars.push(parse_scalar(token, &spec.scalars[i - spec.colors])?);
        }
    }

    Ok(args)
}

fn parse_color(token: &str) -> Result<Rgb, Box<dyn Error>> {
    Rgb::from_str(token).map_err(|_| {
        format!(
            "could not interpret color parameter value '{}'\n\
            Please give this value as a six-character hex string like ff0000",
            token
        )
        .into()
    })
}

fn parse_scalar(token: &str, def: &ScalarDef) -> Result<u8, Box<dyn Error>> {
    match u8::from_str(token) {
        Ok(value) if value >= def.min && value <= def.max => Ok(value),
        _ => Err(format!(
            "could not interpret {} parameter value '{}'\n\
            Please give this value as an integer from {} to {}",
            def.name, token, def.min, def.max
        )
        .into()),
    }
}
