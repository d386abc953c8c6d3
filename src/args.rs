use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

pub fn parse_args() -> ArgMatches {
    command().get_matches()
}

fn command() -> Command {
    // Morse tokens start with `-`, so they must not be taken for flags
    let text = || {
        Arg::new("text")
            .required(true)
            .num_args(1..)
            .allow_hyphen_values(true)
    };

    Command::new("morse-tone")
        .about("Translates text to and from Morse code and plays it.")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .args([
            Arg::new("wpm")
                .long("wpm")
                .short('w')
                .global(true)
                .value_parser(value_parser!(f64))
                .default_value("20")
                .help("Speed in words per minute (PARIS timing)"),
            Arg::new("unit")
                .long("unit")
                .short('u')
                .global(true)
                .value_parser(value_parser!(f64))
                .help("Length of a dot in milliseconds, overrides --wpm"),
            Arg::new("frequency")
                .long("frequency")
                .short('f')
                .global(true)
                .value_parser(value_parser!(f32))
                .default_value("800")
                .help("Tone frequency in Hz"),
            Arg::new("strict")
                .long("strict")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Fail on unknown Morse tokens instead of copying them through"),
            Arg::new("device")
                .long("device")
                .short('d')
                .global(true)
                .default_value("default")
                .help("Output device, matched by name"),
            Arg::new("gain")
                .long("gain")
                .short('g')
                .global(true)
                .value_parser(value_parser!(f32))
                .default_value("0.5")
                .help("Output volume from 0 to 1"),
        ])
        .subcommands([
            Command::new("encode")
                .alias("e")
                .about("Prints the Morse code for some text.")
                .arg(text()),
            Command::new("decode")
                .alias("d")
                .about("Turns Morse code (`.-` tokens, `/` between words) back into text.")
                .arg(text()),
            Command::new("schedule")
                .alias("s")
                .about("Prints the timed tone events for some text as JSON.")
                .arg(text()),
            Command::new("play")
                .alias("p")
                .about("Plays some text as Morse code on an audio device.")
                .arg(text()),
        ])
}

/// The positional text, with multiple words joined back together.
pub fn text(args: &ArgMatches) -> String {
    args.get_many::<String>("text")
        .map(|x| x.cloned().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}
