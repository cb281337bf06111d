extern crate bootimgtool;
#[macro_use]
extern crate clap;
extern crate humansize;
extern crate termcolor;

use bootimgtool::item::{self, ITEMS};
use bootimgtool::{
    pack, unpack, BootImageType, Item, Origin, PackOptions, Prefix, StandardCodec, Summary,
    UnpackOptions, Value,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::ConsoleOutputHandler;
use std::path::PathBuf;
use termcolor::ColorChoice;

const ARG_PREFIX_LONG_HELP: &str = "
Prefix put in front of every item file name, followed by a dash. Defaults to the file name of the boot image, so the kernel of 'boot.img' is read from or written to 'boot.img-kernel'.
";

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));
    let console = ConsoleOutputHandler::new(ColorChoice::Auto);

    match create_app().get_matches().subcommand() {
        Some(("unpack", arguments)) => main_unpack(arguments, console),
        Some(("pack", arguments)) => main_pack(arguments, console),
        _ => unreachable!(),
    }
}

fn create_app() -> Command {
    Command::new("bootimgtool")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .version(crate_version!())
        .author(crate_authors!())
        .about("Unpacks and packs Android, Bump, Loki and Sony ELF boot images.")
        .after_help(items_legend())
        .subcommand(create_app_unpack())
        .subcommand(create_app_pack())
}

fn create_app_unpack() -> Command {
    let command = Command::new("unpack")
        .about("Unpacks a boot image into one file per item.")
        .after_help(items_legend())
        .arg(
            Arg::new("input_file")
                .required(true)
                .help("The boot image, for example 'boot.img'")
                .value_name("INPUT_FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Directory to write the item files into")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .args(prefix_args());

    item::extracted().fold(command, |command, descriptor| {
        command.arg(
            Arg::new(output_id(descriptor.item))
                .long(output_id(descriptor.item))
                .help(format!("File to write the {} into", descriptor.description.to_lowercase()))
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
    })
}

fn create_app_pack() -> Command {
    let command = Command::new("pack")
        .about("Packs item files into a boot image.")
        .after_help(items_legend())
        .arg(
            Arg::new("output_file")
                .required(true)
                .help("The boot image to create, for example 'boot.img'")
                .value_name("OUTPUT_FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("Directory to read the item files from")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .help("Type of boot image to create: android, bump, loki or sonyelf")
                .value_name("TYPE")
                .default_value("android")
                .value_parser(|s: &str| s.parse::<BootImageType>()),
        )
        .args(prefix_args());

    ITEMS.iter().fold(command, |command, descriptor| {
        let item = descriptor.item;
        let command = command.arg(
            Arg::new(input_id(item))
                .long(input_id(item))
                .help(format!("File to read the {} from", descriptor.description.to_lowercase()))
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        );
        if !descriptor.kind.is_scalar() {
            return command;
        }
        command.arg(
            Arg::new(value_id(item))
                .long(value_id(item))
                .help(format!("Use this {} instead of reading it", descriptor.description.to_lowercase()))
                .value_name("VALUE")
                .value_parser(move |s: &str| Value::parse_literal(item, s)),
        )
    })
}

fn prefix_args() -> [Arg; 2] {
    [
        Arg::new("prefix")
            .short('p')
            .long("prefix")
            .help("Prefix of the item file names")
            .long_help(ARG_PREFIX_LONG_HELP)
            .value_name("PREFIX"),
        Arg::new("noprefix")
            .short('n')
            .long("noprefix")
            .help("Do not prefix the item file names")
            .action(ArgAction::SetTrue),
    ]
}

fn items_legend() -> String {
    let mut legend = String::from(
        "Items (A: Android, B: Bump, L: Loki, S: Sony ELF; aboot is only read when packing):\n",
    );
    for descriptor in ITEMS.iter() {
        legend.push_str(&format!(
            "  {} {: <16} {}\n",
            descriptor.formats.legend(),
            descriptor.name,
            descriptor.description
        ));
    }
    legend
}

fn output_id(item: Item) -> String {
    format!("output-{}", item)
}

fn input_id(item: Item) -> String {
    format!("input-{}", item)
}

fn value_id(item: Item) -> String {
    format!("value-{}", item)
}

fn prefix_from(arguments: &ArgMatches) -> Prefix {
    Prefix::from_options(
        arguments.get_one::<String>("prefix").cloned(),
        arguments.get_flag("noprefix"),
    )
}

fn describe(summary: &Summary) -> String {
    match summary {
        Summary::Scalar(text) => format!("'{}'", text),
        Summary::Bytes(size) => humansize::format_size(*size, humansize::BINARY),
    }
}

fn main_unpack(arguments: &ArgMatches, mut console: ConsoleOutputHandler) {
    let input_path = match arguments.get_one::<PathBuf>("input_file") {
        Some(path) => path.clone(),
        None => unreachable!(),
    };

    let mut options = UnpackOptions::new(input_path).prefix(prefix_from(arguments));
    if let Some(output_dir) = arguments.get_one::<PathBuf>("output") {
        options = options.output_dir(output_dir);
    }
    for descriptor in item::extracted() {
        if let Some(path) = arguments.get_one::<PathBuf>(&output_id(descriptor.item)) {
            options = options.output(descriptor.item, path);
        }
    }

    let creates_directory = !options.output_dir.exists();
    let report = match unpack(&StandardCodec, &options) {
        Ok(report) => report,
        Err(error) => console.print_fatal_error(
            &format!("Failed to unpack boot image '{}'.", options.input.display()),
            Some(&error),
        ),
    };

    if creates_directory {
        console.print_status_success(
            "Created",
            &format!("directory '{}'.", options.output_dir.display()),
        );
    }
    console.print_status_success(
        "Loaded",
        &format!("{} image '{}'.", report.image_type, options.input.display()),
    );
    for (item, path, summary) in &report.files {
        console.print_status_success(
            "Unpacked",
            &format!("{} ({}) into '{}'.", item, describe(summary), path.display()),
        );
    }
}

fn main_pack(arguments: &ArgMatches, mut console: ConsoleOutputHandler) {
    let output_path = match arguments.get_one::<PathBuf>("output_file") {
        Some(path) => path.clone(),
        None => unreachable!(),
    };
    let target = arguments
        .get_one::<BootImageType>("type")
        .copied()
        .unwrap_or_default();

    let mut options = PackOptions::new(output_path)
        .prefix(prefix_from(arguments))
        .target(target);
    if let Some(input_dir) = arguments.get_one::<PathBuf>("input") {
        options = options.input_dir(input_dir);
    }
    for descriptor in ITEMS.iter() {
        let item = descriptor.item;
        let given_path = arguments.get_one::<PathBuf>(&input_id(item));
        let given_value = if descriptor.kind.is_scalar() {
            arguments.get_one::<Value>(&value_id(item))
        } else {
            None
        };
        if (given_path.is_some() || given_value.is_some()) && !descriptor.formats.contains(target) {
            console.print_warning_message(&format!(
                "The {} item is not used by {} images, ignoring it.",
                item, target
            ));
        }
        if let Some(path) = given_path {
            options = options.input(item, path);
        }
        if let Some(value) = given_value {
            options = options.value(item, value.clone());
        }
    }

    let report = match pack(&StandardCodec, &options) {
        Ok(report) => report,
        Err(error) => console.print_fatal_error(
            &format!("Failed to pack boot image '{}'.", options.output.display()),
            Some(&error),
        ),
    };

    for (item, origin, summary) in &report.items {
        match origin {
            Origin::Value => {
                console.print_status_success("Given", &format!("{} = {}.", item, describe(summary)))
            }
            Origin::File(path) => console.print_status_success(
                "Loaded",
                &format!("{} ({}) from '{}'.", item, describe(summary), path.display()),
            ),
            Origin::Defaulted(path) => console.print_status_note(
                "Defaulted",
                &format!("{} to {}, '{}' not found.", item, describe(summary), path.display()),
            ),
            Origin::Empty(path) => console.print_status_note(
                "Empty",
                &format!("{}, '{}' not found.", item, path.display()),
            ),
        }
    }
    console.print_status_success(
        "Created",
        &format!("{} image '{}'.", report.target, options.output.display()),
    );
}

mod console {
    use std::error::Error;
    use std::io::Write;
    use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

    /// An interface for the application to the console output. Status lines
    /// go to stdout, warnings and errors to stderr.
    ///
    /// If this structure ever fails writing, the error will be silently
    /// ignored.
    pub struct ConsoleOutputHandler {
        stdout: StandardStream,
        stderr: StandardStream,
    }

    impl ConsoleOutputHandler {
        /// Creates a new structure.
        pub fn new(color: ColorChoice) -> Self {
            ConsoleOutputHandler {
                stdout: StandardStream::stdout(color),
                stderr: StandardStream::stderr(color),
            }
        }

        fn print_labelled(&mut self, colour: Color, label: &str, message: &str) {
            let _ = self
                .stderr
                .set_color(ColorSpec::new().set_fg(Some(colour)).set_bold(true));
            let _ = write!(self.stderr, "{}: ", label);
            let _ = self.stderr.set_color(&ColorSpec::new());
            let _ = writeln!(self.stderr, "{}", message);
        }

        pub fn print_error_message(&mut self, message: &str) {
            self.print_labelled(Color::Red, "error", message);
        }

        pub fn print_warning_message(&mut self, message: &str) {
            self.print_labelled(Color::Yellow, "warning", message);
        }

        fn print_status(&mut self, colour: &ColorSpec, status: &str, message: &str) {
            let _ = self.stdout.set_color(colour);
            let _ = write!(self.stdout, "{: >12}", status);
            let _ = self.stdout.set_color(&ColorSpec::new());
            let _ = writeln!(self.stdout, " {}", message);
        }

        pub fn print_status_success(&mut self, status: &str, message: &str) {
            self.print_status(
                ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true),
                status,
                message,
            );
        }

        /// A status that is not a failure, but may not be what was intended.
        pub fn print_status_note(&mut self, status: &str, message: &str) {
            self.print_status(
                ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true),
                status,
                message,
            );
        }

        fn print_error_cause(&mut self, mut error_opt: Option<&dyn Error>) {
            let colour_spec = {
                let mut colour_spec = ColorSpec::new();
                colour_spec.set_fg(Some(Color::Red));
                colour_spec
            };

            while let Some(error) = error_opt {
                let _ = self.stderr.set_color(&colour_spec);
                let _ = write!(self.stderr, "caused by: ");
                let _ = self.stderr.set_color(&ColorSpec::new());
                let _ = writeln!(self.stderr, "{}", error);
                error_opt = error.source();
            }
        }

        pub fn print_error_as_error(&mut self, message: &str, error_opt: Option<&dyn Error>) {
            self.print_error_message(message);
            self.print_error_cause(error_opt);
        }

        pub fn print_fatal_error(&mut self, message: &str, error_opt: Option<&dyn Error>) -> ! {
            use std::process::exit;
            self.print_error_as_error(message, error_opt);
            exit(1);
        }
    }
}
